//! Memory for Concierge.
//!
//! - [`preferences`]: the per-user preference store, with JSON export/import
//! - [`recall`]: keyword recall of earlier exchanges from the turn log
//! - [`stats`]: counts behind the `/stats` report
//!
//! The turn log itself lives on `concierge_core::Session`.

pub mod preferences;
pub mod recall;
pub mod stats;

pub use preferences::{PreferenceSnapshot, PreferenceStore};
pub use recall::{RECALL_LIMIT, Recollection, recall};
pub use stats::MemoryStats;
