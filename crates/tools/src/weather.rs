//! Weather adapter.
//!
//! [`OpenWeatherMapSource`] queries the OpenWeatherMap current-weather API.
//! [`SimulatedWeather`] returns deterministic, plausible data when no key is
//! configured, so the assistant stays usable offline.

use async_trait::async_trait;
use concierge_core::error::ToolError;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Anything that can report the current weather for a city.
#[async_trait]
pub trait WeatherSource: Send + Sync {
    fn name(&self) -> &str;

    async fn current(&self, city: &str) -> Result<WeatherReport, ToolError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Units {
    Metric,
    Imperial,
}

impl Units {
    pub fn parse(s: &str) -> Self {
        if s.eq_ignore_ascii_case("imperial") {
            Self::Imperial
        } else {
            Self::Metric
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            Self::Metric => "metric",
            Self::Imperial => "imperial",
        }
    }

    fn temperature_label(&self) -> &'static str {
        match self {
            Self::Metric => "°C",
            Self::Imperial => "°F",
        }
    }

    fn speed_label(&self) -> &'static str {
        match self {
            Self::Metric => "m/s",
            Self::Imperial => "mph",
        }
    }
}

/// Current conditions for one city.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherReport {
    pub city: String,
    pub temperature: i32,
    pub feels_like: i32,
    pub condition: String,
    pub humidity: u32,
    pub wind_speed: f64,
    pub pressure: u32,
    pub units: Units,
    /// True when the data did not come from a live service
    pub simulated: bool,
}

impl WeatherReport {
    /// One-paragraph rendering used when the model cannot phrase the answer.
    pub fn summary(&self) -> String {
        let t = self.units.temperature_label();
        let wind = if self.wind_speed > 0.0 {
            format!("wind {:.1} {}", self.wind_speed, self.units.speed_label())
        } else {
            "no wind".to_string()
        };
        let mut out = format!(
            "{}: {}{t} (feels like {}{t}), {}, humidity {}%, {wind}, pressure {} hPa.",
            self.city, self.temperature, self.feels_like, self.condition, self.humidity, self.pressure
        );
        let advice = self.advice();
        if !advice.is_empty() {
            out.push(' ');
            out.push_str(&advice);
        }
        if self.simulated {
            out.push_str(" (Simulated data: set WEATHER_API_KEY for live weather.)");
        }
        out
    }

    /// A short tip derived from temperature, condition and humidity.
    pub fn advice(&self) -> String {
        let celsius = match self.units {
            Units::Metric => self.temperature,
            Units::Imperial => ((self.temperature - 32) as f64 * 5.0 / 9.0).round() as i32,
        };
        let condition = self.condition.to_lowercase();
        let mut tips: Vec<&str> = Vec::new();

        if celsius < 10 {
            tips.push("It's cold, dress warmly.");
        } else if celsius > 30 {
            tips.push("It's hot, stay hydrated and use sun protection.");
        } else if (15..=25).contains(&celsius) {
            tips.push("Comfortable temperatures, a good day to be outside.");
        }

        if condition.contains("thunderstorm") {
            tips.push("Thunderstorms expected, avoid outdoor activities.");
        } else if condition.contains("rain") || condition.contains("drizzle") {
            tips.push("Bring an umbrella.");
        } else if condition.contains("snow") {
            tips.push("Roads may be slippery.");
        }

        if self.humidity > 80 {
            tips.push("High humidity may feel muggy.");
        } else if self.humidity < 30 {
            tips.push("Dry air, drink some water.");
        }

        tips.join(" ")
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "city": self.city,
            "temperature": self.temperature,
            "feels_like": self.feels_like,
            "condition": self.condition,
            "humidity": self.humidity,
            "wind_speed": self.wind_speed,
            "pressure": self.pressure,
            "units": self.units.as_str(),
            "simulated": self.simulated,
            "advice": self.advice(),
        })
    }
}

/// Map common Chinese city names to the names the weather service expects.
pub fn resolve_city(city: &str) -> &str {
    match city.trim() {
        "台北" | "臺北" => "Taipei",
        "台中" | "臺中" => "Taichung",
        "台南" | "臺南" => "Tainan",
        "高雄" => "Kaohsiung",
        "桃園" => "Taoyuan",
        "新竹" => "Hsinchu",
        "台東" | "臺東" => "Taitung",
        "花蓮" => "Hualien",
        "香港" => "Hong Kong",
        "澳門" => "Macau",
        "北京" => "Beijing",
        "上海" => "Shanghai",
        "廣州" => "Guangzhou",
        "深圳" => "Shenzhen",
        "東京" => "Tokyo",
        "大阪" => "Osaka",
        "首爾" => "Seoul",
        "新加坡" => "Singapore",
        "曼谷" => "Bangkok",
        other => other,
    }
}

fn require_city(city: &str) -> Result<&str, ToolError> {
    let city = city.trim();
    if city.is_empty() {
        return Err(ToolError::InvalidParameters("city must not be empty".into()));
    }
    Ok(city)
}

/// Live data from OpenWeatherMap.
pub struct OpenWeatherMapSource {
    client: reqwest::Client,
    api_key: String,
    api_url: String,
    units: Units,
}

impl OpenWeatherMapSource {
    pub fn new(api_key: impl Into<String>, api_url: impl Into<String>, units: Units, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            api_key: api_key.into(),
            api_url: api_url.into(),
            units,
        }
    }

    pub(crate) fn parse_body(&self, requested: &str, body: OwmResponse) -> Result<WeatherReport, ToolError> {
        let weather = body
            .weather
            .first()
            .ok_or_else(|| ToolError::Unavailable("weather response has no conditions".into()))?;

        Ok(WeatherReport {
            city: if body.name.is_empty() { requested.to_string() } else { body.name },
            temperature: body.main.temp.round() as i32,
            feels_like: body.main.feels_like.round() as i32,
            condition: weather.description.clone(),
            humidity: body.main.humidity,
            wind_speed: body.wind.map(|w| w.speed).unwrap_or(0.0),
            pressure: body.main.pressure,
            units: self.units,
            simulated: false,
        })
    }
}

#[async_trait]
impl WeatherSource for OpenWeatherMapSource {
    fn name(&self) -> &str {
        "openweathermap"
    }

    async fn current(&self, city: &str) -> Result<WeatherReport, ToolError> {
        let city = require_city(city)?;
        let query = resolve_city(city);
        let url = reqwest::Url::parse_with_params(
            &self.api_url,
            &[("q", query), ("appid", self.api_key.as_str()), ("units", self.units.as_str())],
        )
        .map_err(|e| ToolError::Unavailable(format!("bad weather endpoint: {e}")))?;

        debug!(city = %query, "Querying OpenWeatherMap");

        // The request URL carries the key, so errors are rendered without it.
        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                ToolError::Unavailable("weather service timed out".into())
            } else {
                ToolError::Unavailable(format!("weather service unreachable: {}", e.without_url()))
            }
        })?;

        let status = response.status().as_u16();
        if let Some(err) = ToolError::from_status(status, format!("weather lookup for '{city}'")) {
            return Err(err);
        }

        let body: OwmResponse = response
            .json()
            .await
            .map_err(|e| ToolError::Unavailable(format!("unreadable weather response: {}", e.without_url())))?;

        self.parse_body(city, body)
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct OwmResponse {
    #[serde(default)]
    name: String,
    main: OwmMain,
    #[serde(default)]
    weather: Vec<OwmCondition>,
    #[serde(default)]
    wind: Option<OwmWind>,
}

#[derive(Debug, Deserialize)]
struct OwmMain {
    temp: f64,
    feels_like: f64,
    humidity: u32,
    pressure: u32,
}

#[derive(Debug, Deserialize)]
struct OwmCondition {
    description: String,
}

#[derive(Debug, Deserialize)]
struct OwmWind {
    #[serde(default)]
    speed: f64,
}

/// Deterministic stand-in used when no weather key is configured.
pub struct SimulatedWeather {
    units: Units,
}

impl SimulatedWeather {
    pub fn new(units: Units) -> Self {
        Self { units }
    }
}

#[async_trait]
impl WeatherSource for SimulatedWeather {
    fn name(&self) -> &str {
        "simulated"
    }

    async fn current(&self, city: &str) -> Result<WeatherReport, ToolError> {
        let city = resolve_city(require_city(city)?);

        // Simple hash for deterministic but varied results.
        let hash: u32 = city
            .to_lowercase()
            .bytes()
            .fold(0u32, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u32));

        let conditions = ["clear sky", "few clouds", "overcast clouds", "light rain"];
        let celsius = 15 + (hash % 14) as i32; // 15 to 28°C
        let feels_celsius = celsius - 1 + (hash % 3) as i32;
        let to_units = |c: i32| match self.units {
            Units::Metric => c,
            Units::Imperial => (c as f64 * 9.0 / 5.0 + 32.0).round() as i32,
        };

        Ok(WeatherReport {
            city: city.to_string(),
            temperature: to_units(celsius),
            feels_like: to_units(feels_celsius),
            condition: conditions[(hash as usize / 7) % conditions.len()].to_string(),
            humidity: 45 + (hash % 41),
            wind_speed: ((hash % 60) as f64) / 10.0,
            pressure: 1000 + (hash % 25),
            units: self.units,
            simulated: true,
        })
    }
}
