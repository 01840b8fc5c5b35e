//! Tool adapters for Concierge.
//!
//! Each adapter maps its failures into the uniform `ToolError` set:
//!
//! - [`weather`]: OpenWeatherMap, or simulated data without a key
//! - [`calendar`]: an in-memory event store
//! - [`email`]: a seeded mock mailbox with drafts, replies and summaries
//!
//! [`ToolDispatcher`] parses a model-issued call into a typed request and
//! routes it to the right adapter.

pub mod calendar;
pub mod dispatcher;
pub mod email;
pub mod weather;

pub use calendar::CalendarStore;
pub use dispatcher::ToolDispatcher;
pub use email::{InboxSummary, Mailbox};
pub use weather::{OpenWeatherMapSource, SimulatedWeather, Units, WeatherReport, WeatherSource};
