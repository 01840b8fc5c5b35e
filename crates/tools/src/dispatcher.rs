//! Routes a parsed tool request to its adapter.

use chrono::{Local, NaiveDate};
use concierge_config::AppConfig;
use concierge_core::error::ToolError;
use concierge_core::tool::{ToolCall, ToolKind, ToolRequest, ToolResult};
use std::time::Duration;
use tracing::{debug, warn};

use crate::calendar::CalendarStore;
use crate::email::Mailbox;
use crate::weather::{OpenWeatherMapSource, SimulatedWeather, Units, WeatherSource};

/// Owns every adapter. One dispatcher per conversation.
pub struct ToolDispatcher {
    weather: Box<dyn WeatherSource>,
    calendar: CalendarStore,
    mailbox: Mailbox,
}

impl ToolDispatcher {
    pub fn new(weather: Box<dyn WeatherSource>) -> Self {
        Self {
            weather,
            calendar: CalendarStore::new(),
            mailbox: Mailbox::seeded(),
        }
    }

    /// Live weather when a key is configured, simulated otherwise.
    pub fn from_config(config: &AppConfig) -> Self {
        let units = Units::parse(&config.weather.units);
        let weather: Box<dyn WeatherSource> = match &config.weather.api_key {
            Some(key) if !key.trim().is_empty() => Box::new(OpenWeatherMapSource::new(
                key.clone(),
                config.weather.api_url.clone(),
                units,
                Duration::from_secs(config.request_timeout_secs),
            )),
            _ => Box::new(SimulatedWeather::new(units)),
        };
        Self::new(weather)
    }

    pub fn weather_source(&self) -> &str {
        self.weather.name()
    }

    pub fn calendar(&self) -> &CalendarStore {
        &self.calendar
    }

    pub fn mailbox(&self) -> &Mailbox {
        &self.mailbox
    }

    /// Parse and execute one model-issued call.
    pub async fn dispatch(&mut self, call: &ToolCall) -> Result<ToolResult, ToolError> {
        self.dispatch_on(call, Local::now().date_naive()).await
    }

    /// Like [`dispatch`](Self::dispatch) with an explicit "today" for relative dates.
    pub async fn dispatch_on(&mut self, call: &ToolCall, today: NaiveDate) -> Result<ToolResult, ToolError> {
        let result = match ToolRequest::parse(call) {
            Ok(request) => {
                debug!(tool = %request.kind(), call_id = %call.id, "Dispatching tool request");
                self.execute(request, today).await
            }
            Err(e) => Err(e),
        };

        if let Err(e) = &result {
            warn!(tool = %call.name, kind = e.kind(), error = %e, "Tool call failed");
        }
        result
    }

    async fn execute(&mut self, request: ToolRequest, today: NaiveDate) -> Result<ToolResult, ToolError> {
        match request {
            ToolRequest::Weather(query) => {
                let report = self.weather.current(&query.city).await?;
                Ok(ToolResult {
                    tool: ToolKind::Weather,
                    summary: report.summary(),
                    data: report.to_json(),
                })
            }
            ToolRequest::Calendar(action) => self.calendar.execute(action, today),
            ToolRequest::Email(action) => self.mailbox.execute(action),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use crate::weather::WeatherReport;
    use std::sync::{Arc, Mutex};

    /// Records every city it is asked about and fails on demand.
    struct StubWeather {
        cities: Arc<Mutex<Vec<String>>>,
        fail_with: Option<ToolError>,
    }

    #[async_trait]
    impl WeatherSource for StubWeather {
        fn name(&self) -> &str {
            "stub"
        }

        async fn current(&self, city: &str) -> Result<WeatherReport, ToolError> {
            self.cities.lock().unwrap().push(city.to_string());
            if let Some(e) = &self.fail_with {
                return Err(e.clone());
            }
            Ok(WeatherReport {
                city: city.to_string(),
                temperature: 18,
                feels_like: 17,
                condition: "clear sky".into(),
                humidity: 60,
                wind_speed: 2.0,
                pressure: 1013,
                units: Units::Metric,
                simulated: false,
            })
        }
    }

    fn call(name: &str, arguments: serde_json::Value) -> ToolCall {
        ToolCall {
            id: "call_1".into(),
            name: name.into(),
            arguments,
        }
    }

    fn dispatcher(fail_with: Option<ToolError>) -> (ToolDispatcher, Arc<Mutex<Vec<String>>>) {
        let cities = Arc::new(Mutex::new(Vec::new()));
        let stub = StubWeather {
            cities: cities.clone(),
            fail_with,
        };
        (ToolDispatcher::new(Box::new(stub)), cities)
    }

    #[tokio::test]
    async fn weather_goes_to_weather_source() {
        let (mut d, cities) = dispatcher(None);
        let result = d.dispatch(&call("weather", serde_json::json!({"city": "Tokyo"}))).await.unwrap();
        assert_eq!(result.tool, ToolKind::Weather);
        assert_eq!(result.data["condition"], "clear sky");
        assert_eq!(*cities.lock().unwrap(), vec!["Tokyo"]);
    }

    #[tokio::test]
    async fn adapter_errors_pass_through() {
        let (mut d, _) = dispatcher(Some(ToolError::Unauthorized("bad key".into())));
        let err = d.dispatch(&call("weather", serde_json::json!({"city": "Tokyo"}))).await.unwrap_err();
        assert!(matches!(err, ToolError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn unknown_tool_never_reaches_adapters() {
        let (mut d, cities) = dispatcher(None);
        let err = d.dispatch(&call("shell", serde_json::json!({"cmd": "ls"}))).await.unwrap_err();
        assert!(matches!(err, ToolError::NotFound(_)));
        assert!(cities.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn calendar_state_persists_across_calls() {
        let (mut d, _) = dispatcher(None);
        let today = NaiveDate::from_ymd_opt(2024, 6, 12).unwrap();
        d.dispatch_on(
            &call("calendar", serde_json::json!({"action": "add", "title": "Standup", "date": "today"})),
            today,
        )
        .await
        .unwrap();
        let listed = d
            .dispatch_on(&call("calendar", serde_json::json!({"action": "list", "range": "today"})), today)
            .await
            .unwrap();
        assert_eq!(listed.data["count"], 1);
        assert_eq!(d.calendar().len(), 1);
    }

    #[tokio::test]
    async fn email_read_updates_mailbox() {
        let (mut d, _) = dispatcher(None);
        d.dispatch(&call("email", serde_json::json!({"action": "read", "id": 1}))).await.unwrap();
        assert_eq!(d.mailbox().unread_count(), 1);
    }

    #[test]
    fn simulated_without_weather_key() {
        let d = ToolDispatcher::from_config(&AppConfig::default());
        assert_eq!(d.weather_source(), "simulated");

        let mut config = AppConfig::default();
        config.weather.api_key = Some("owm-key".into());
        assert_eq!(ToolDispatcher::from_config(&config).weather_source(), "openweathermap");
    }
}
