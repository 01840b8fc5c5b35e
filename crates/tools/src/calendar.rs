//! In-memory calendar.
//!
//! Events live for the lifetime of the process. Ids increase monotonically
//! and are never reused, even after a delete.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Utc};
use concierge_core::error::ToolError;
use concierge_core::tool::{CalendarAction, CalendarRange, ToolKind, ToolResult};
use serde::Serialize;
use serde_json::json;

#[derive(Debug, Clone, Serialize)]
pub struct Event {
    pub id: u64,
    pub title: String,
    pub date: Option<NaiveDate>,
    #[serde(serialize_with = "serialize_time")]
    pub time: Option<NaiveTime>,
    pub duration: String,
    pub location: Option<String>,
    pub created_at: DateTime<Utc>,
}

fn serialize_time<S: serde::Serializer>(time: &Option<NaiveTime>, s: S) -> Result<S::Ok, S::Error> {
    match time {
        Some(t) => s.serialize_str(&t.format("%H:%M").to_string()),
        None => s.serialize_none(),
    }
}

impl Event {
    fn line(&self) -> String {
        let date = self.date.map(|d| d.to_string()).unwrap_or_else(|| "unscheduled".into());
        let mut line = format!("#{} {} on {date}", self.id, self.title);
        if let Some(time) = self.time {
            line.push_str(&format!(" at {}", time.format("%H:%M")));
        }
        line.push_str(&format!(" ({})", self.duration));
        if let Some(location) = &self.location {
            line.push_str(&format!(" @ {location}"));
        }
        line
    }
}

/// Turn `today`, `tomorrow`, `day_after_tomorrow` or `YYYY-MM-DD` into a date.
pub fn resolve_date(input: &str, today: NaiveDate) -> Result<NaiveDate, ToolError> {
    let normalized = input.trim().to_lowercase().replace([' ', '-'], "_");
    match normalized.as_str() {
        "today" => Ok(today),
        "tomorrow" => Ok(today + Duration::days(1)),
        "day_after_tomorrow" => Ok(today + Duration::days(2)),
        _ => NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d").map_err(|_| {
            ToolError::InvalidParameters(format!(
                "unrecognized date '{input}', use YYYY-MM-DD, today, tomorrow or day_after_tomorrow"
            ))
        }),
    }
}

/// Parse a 24-hour `HH:MM` time.
pub fn parse_time(input: &str) -> Result<NaiveTime, ToolError> {
    NaiveTime::parse_from_str(input.trim(), "%H:%M")
        .map_err(|_| ToolError::InvalidParameters(format!("unrecognized time '{input}', use HH:MM")))
}

/// Preparation tips for well-known event types.
fn tips(event: &Event) -> Vec<&'static str> {
    let title = event.title.to_lowercase();
    let mut tips = Vec::new();
    if title.contains("meeting") || title.contains("會議") {
        tips.push("Arrive 5-10 minutes early.");
        tips.push("Prepare the agenda and any materials.");
    } else if title.contains("interview") || title.contains("面試") {
        tips.push("Arrive 15 minutes early.");
        tips.push("Bring your resume and ID.");
    } else if title.contains("doctor") || title.contains("看診") || title.contains("醫生") {
        tips.push("Bring your insurance card and medical records.");
        tips.push("Arrive 10 minutes early.");
    }
    tips
}

#[derive(Debug)]
pub struct CalendarStore {
    events: Vec<Event>,
    next_id: u64,
}

impl Default for CalendarStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CalendarStore {
    pub fn new() -> Self {
        Self {
            events: Vec::new(),
            next_id: 1,
        }
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Schedule an event. The title is required; everything else is optional.
    pub fn add(
        &mut self,
        title: &str,
        date: Option<&str>,
        time: Option<&str>,
        duration: Option<&str>,
        location: Option<&str>,
        today: NaiveDate,
    ) -> Result<&Event, ToolError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(ToolError::InvalidParameters("event title must not be empty".into()));
        }
        let date = date
            .filter(|d| !d.trim().is_empty())
            .map(|d| resolve_date(d, today))
            .transpose()?;
        let time = time.filter(|t| !t.trim().is_empty()).map(parse_time).transpose()?;

        let event = Event {
            id: self.next_id,
            title: title.to_string(),
            date,
            time,
            duration: duration
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .unwrap_or("1 hour")
                .to_string(),
            location: location.map(str::trim).filter(|l| !l.is_empty()).map(String::from),
            created_at: Utc::now(),
        };
        self.next_id += 1;
        self.events.push(event);
        Ok(&self.events[self.events.len() - 1])
    }

    /// Events in `range`, in insertion order. Undated events only show up in `All`.
    pub fn list(&self, range: CalendarRange, today: NaiveDate) -> Vec<&Event> {
        let week_start = today - Duration::days(today.weekday().num_days_from_monday() as i64);
        let week_end = week_start + Duration::days(6);

        self.events
            .iter()
            .filter(|e| match (range, e.date) {
                (CalendarRange::All, _) => true,
                (_, None) => false,
                (CalendarRange::Today, Some(d)) => d == today,
                (CalendarRange::Tomorrow, Some(d)) => d == today + Duration::days(1),
                (CalendarRange::Week, Some(d)) => d >= week_start && d <= week_end,
            })
            .collect()
    }

    pub fn delete(&mut self, id: u64) -> Result<Event, ToolError> {
        let index = self
            .events
            .iter()
            .position(|e| e.id == id)
            .ok_or_else(|| ToolError::NotFound(format!("no event with id {id}")))?;
        Ok(self.events.remove(index))
    }

    /// Run a typed calendar action.
    pub fn execute(&mut self, action: CalendarAction, today: NaiveDate) -> Result<ToolResult, ToolError> {
        match action {
            CalendarAction::Add {
                title,
                date,
                time,
                duration,
                location,
            } => {
                let event = self.add(
                    &title,
                    date.as_deref(),
                    time.as_deref(),
                    duration.as_deref(),
                    location.as_deref(),
                    today,
                )?;
                let tips = tips(event);
                let mut summary = format!("Added event {}.", event.line());
                if !tips.is_empty() {
                    summary.push_str(" Tips: ");
                    summary.push_str(&tips.join(" "));
                }
                Ok(ToolResult {
                    tool: ToolKind::Calendar,
                    summary,
                    data: json!({ "added": event, "tips": tips }),
                })
            }
            CalendarAction::List { range } => {
                let events = self.list(range, today);
                let label = serde_json::to_value(range)
                    .ok()
                    .and_then(|v| v.as_str().map(String::from))
                    .unwrap_or_default();
                let summary = if events.is_empty() {
                    format!("No events scheduled ({label}).")
                } else {
                    let lines: Vec<String> = events.iter().map(|e| e.line()).collect();
                    format!("{} event(s) ({label}): {}", events.len(), lines.join("; "))
                };
                Ok(ToolResult {
                    tool: ToolKind::Calendar,
                    summary,
                    data: json!({ "range": label, "count": events.len(), "events": events }),
                })
            }
            CalendarAction::Delete { id } => {
                let event = self.delete(id)?;
                Ok(ToolResult {
                    tool: ToolKind::Calendar,
                    summary: format!("Deleted event \"{}\".", event.title),
                    data: json!({ "deleted": event }),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        // A Wednesday
        NaiveDate::from_ymd_opt(2024, 6, 12).unwrap()
    }

    #[test]
    fn relative_dates() {
        assert_eq!(resolve_date("today", today()).unwrap(), today());
        assert_eq!(resolve_date("Tomorrow", today()).unwrap().to_string(), "2024-06-13");
        assert_eq!(resolve_date("day after tomorrow", today()).unwrap().to_string(), "2024-06-14");
        assert_eq!(resolve_date("2024-07-01", today()).unwrap().to_string(), "2024-07-01");
        assert!(matches!(resolve_date("someday", today()), Err(ToolError::InvalidParameters(_))));
    }

    #[test]
    fn times() {
        assert_eq!(parse_time("14:00").unwrap(), NaiveTime::from_hms_opt(14, 0, 0).unwrap());
        assert_eq!(parse_time("9:30").unwrap(), NaiveTime::from_hms_opt(9, 30, 0).unwrap());
        assert!(parse_time("25:00").is_err());
        assert!(parse_time("2pm").is_err());
    }

    #[test]
    fn ids_are_monotonic() {
        let mut cal = CalendarStore::new();
        let a = cal.add("A", None, None, None, None, today()).unwrap().id;
        let b = cal.add("B", None, None, None, None, today()).unwrap().id;
        cal.delete(b).unwrap();
        let c = cal.add("C", None, None, None, None, today()).unwrap().id;
        assert_eq!((a, b, c), (1, 2, 3));
    }

    #[test]
    fn add_requires_title() {
        let mut cal = CalendarStore::new();
        assert!(matches!(
            cal.add("  ", Some("today"), None, None, None, today()),
            Err(ToolError::InvalidParameters(_))
        ));
        assert!(cal.is_empty());
    }

    #[test]
    fn add_rejects_bad_time_without_side_effects() {
        let mut cal = CalendarStore::new();
        assert!(cal.add("Lunch", Some("today"), Some("noonish"), None, None, today()).is_err());
        assert!(cal.is_empty());
    }

    #[test]
    fn list_by_range() {
        let mut cal = CalendarStore::new();
        cal.add("Standup", Some("today"), Some("09:00"), None, None, today()).unwrap();
        cal.add("Dentist", Some("tomorrow"), None, None, None, today()).unwrap();
        cal.add("Review", Some("2024-06-16"), None, None, None, today()).unwrap(); // Sunday
        cal.add("Trip", Some("2024-06-17"), None, None, None, today()).unwrap(); // next Monday
        cal.add("Someday", None, None, None, None, today()).unwrap();

        let titles = |r| -> Vec<String> { cal.list(r, today()).iter().map(|e| e.title.clone()).collect() };
        assert_eq!(titles(CalendarRange::Today), vec!["Standup"]);
        assert_eq!(titles(CalendarRange::Tomorrow), vec!["Dentist"]);
        assert_eq!(titles(CalendarRange::Week), vec!["Standup", "Dentist", "Review"]);
        assert_eq!(titles(CalendarRange::All).len(), 5);
    }

    #[test]
    fn delete_unknown_is_not_found() {
        let mut cal = CalendarStore::new();
        assert!(matches!(cal.delete(42), Err(ToolError::NotFound(_))));
    }

    #[test]
    fn execute_add_includes_tips() {
        let mut cal = CalendarStore::new();
        let result = cal
            .execute(
                CalendarAction::Add {
                    title: "Client meeting".into(),
                    date: Some("tomorrow".into()),
                    time: Some("14:00".into()),
                    duration: None,
                    location: Some("Room A".into()),
                },
                today(),
            )
            .unwrap();
        assert_eq!(result.tool, ToolKind::Calendar);
        assert!(result.summary.contains("#1 Client meeting on 2024-06-13 at 14:00 (1 hour) @ Room A"));
        assert!(result.summary.contains("early"));
        assert_eq!(result.data["added"]["time"], "14:00");
        assert_eq!(result.data["added"]["date"], "2024-06-13");
    }

    #[test]
    fn execute_list_empty() {
        let mut cal = CalendarStore::new();
        let result = cal
            .execute(CalendarAction::List { range: CalendarRange::Today }, today())
            .unwrap();
        assert_eq!(result.summary, "No events scheduled (today).");
        assert_eq!(result.data["count"], 0);
    }
}
