//! The tool boundary between the model and the adapters.
//!
//! The model names a tool and passes JSON arguments ([`ToolCall`]). Before
//! anything runs, the call is parsed into [`ToolRequest`], a closed set of
//! typed variants, so an adapter never sees loosely-typed input.

use serde::{Deserialize, Serialize};

use crate::error::ToolError;
use crate::provider::ToolDefinition;

/// A raw function call as emitted by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Call ID (matches the provider's tool_call id, or a generated one)
    pub id: String,

    /// Name of the tool to execute
    pub name: String,

    /// Arguments as a JSON value
    pub arguments: serde_json::Value,
}

/// The fixed set of tools the assistant offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolKind {
    Weather,
    Calendar,
    Email,
}

impl ToolKind {
    pub const ALL: [ToolKind; 3] = [ToolKind::Weather, ToolKind::Calendar, ToolKind::Email];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Weather => "weather",
            Self::Calendar => "calendar",
            Self::Email => "email",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.name() == name)
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Weather => {
                "Get the current weather for a city: temperature, feels-like temperature, \
                 condition, humidity, wind speed and pressure."
            }
            Self::Calendar => {
                "Manage the user's calendar. action=add schedules an event (title required, \
                 date as YYYY-MM-DD or today/tomorrow/day_after_tomorrow, time as HH:MM); \
                 action=list shows events for a range; action=delete removes an event by id."
            }
            Self::Email => {
                "Work with the user's mailbox. action=list shows messages (filter all, unread \
                 or important); action=read opens one message by id; action=compose saves a \
                 draft; action=reply drafts a reply to a message by id; action=search finds \
                 messages by keyword; action=summarize gives inbox counts and the latest unread."
            }
        }
    }

    /// JSON Schema for this tool's parameters.
    pub fn parameters_schema(&self) -> serde_json::Value {
        match self {
            Self::Weather => serde_json::json!({
                "type": "object",
                "properties": {
                    "city": {
                        "type": "string",
                        "description": "City name, e.g. Tokyo or 台北"
                    }
                },
                "required": ["city"]
            }),
            Self::Calendar => serde_json::json!({
                "type": "object",
                "properties": {
                    "action": { "type": "string", "enum": ["add", "list", "delete"] },
                    "title": { "type": "string", "description": "Event title (add)" },
                    "date": { "type": "string", "description": "YYYY-MM-DD, today, tomorrow or day_after_tomorrow (add)" },
                    "time": { "type": "string", "description": "24h HH:MM (add)" },
                    "duration": { "type": "string", "description": "Free-form duration such as '1 hour' (add)" },
                    "location": { "type": "string", "description": "Where the event happens (add)" },
                    "range": { "type": "string", "enum": ["today", "tomorrow", "week", "all"], "description": "Which events to show (list)" },
                    "id": { "type": "integer", "description": "Event id (delete)" }
                },
                "required": ["action"]
            }),
            Self::Email => serde_json::json!({
                "type": "object",
                "properties": {
                    "action": { "type": "string", "enum": ["list", "read", "compose", "reply", "search", "summarize"] },
                    "filter": { "type": "string", "enum": ["all", "unread", "important"], "description": "Which messages to show (list)" },
                    "id": { "type": "integer", "description": "Message id (read, reply)" },
                    "to": { "type": "string", "description": "Recipient address (compose)" },
                    "subject": { "type": "string", "description": "Subject line (compose)" },
                    "body": { "type": "string", "description": "Message body (compose, reply)" },
                    "query": { "type": "string", "description": "Keyword to look for (search)" }
                },
                "required": ["action"]
            }),
        }
    }

    /// Convert this tool into a ToolDefinition for sending to the model.
    pub fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

impl std::fmt::Display for ToolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherQuery {
    pub city: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum CalendarAction {
    Add {
        title: String,
        #[serde(default)]
        date: Option<String>,
        #[serde(default)]
        time: Option<String>,
        #[serde(default)]
        duration: Option<String>,
        #[serde(default)]
        location: Option<String>,
    },
    List {
        #[serde(default)]
        range: CalendarRange,
    },
    Delete {
        id: u64,
    },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalendarRange {
    Today,
    Tomorrow,
    Week,
    #[default]
    All,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum EmailAction {
    List {
        #[serde(default)]
        filter: EmailFilter,
    },
    Read {
        id: u64,
    },
    Compose {
        to: String,
        subject: String,
        #[serde(default)]
        body: String,
    },
    Reply {
        id: u64,
        #[serde(default)]
        body: Option<String>,
    },
    Search {
        query: String,
    },
    Summarize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmailFilter {
    #[default]
    All,
    Unread,
    Important,
}

/// A fully typed tool invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "tool", content = "arguments", rename_all = "snake_case")]
pub enum ToolRequest {
    Weather(WeatherQuery),
    Calendar(CalendarAction),
    Email(EmailAction),
}

impl ToolRequest {
    /// Parse a model-issued call into a typed request.
    ///
    /// Unknown tool names map to [`ToolError::NotFound`]; arguments that do
    /// not fit the tool's schema map to [`ToolError::InvalidParameters`].
    pub fn parse(call: &ToolCall) -> Result<Self, ToolError> {
        let kind = ToolKind::from_name(&call.name)
            .ok_or_else(|| ToolError::NotFound(format!("unknown tool '{}'", call.name)))?;

        let arguments = match &call.arguments {
            serde_json::Value::Null => serde_json::json!({}),
            other => other.clone(),
        };
        let invalid = |e: serde_json::Error| ToolError::InvalidParameters(format!("{kind}: {e}"));

        match kind {
            ToolKind::Weather => serde_json::from_value(arguments).map(Self::Weather).map_err(invalid),
            ToolKind::Calendar => serde_json::from_value(arguments).map(Self::Calendar).map_err(invalid),
            ToolKind::Email => serde_json::from_value(arguments).map(Self::Email).map_err(invalid),
        }
    }

    pub fn kind(&self) -> ToolKind {
        match self {
            Self::Weather(_) => ToolKind::Weather,
            Self::Calendar(_) => ToolKind::Calendar,
            Self::Email(_) => ToolKind::Email,
        }
    }
}

/// The outcome of a successful tool execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    pub tool: ToolKind,

    /// Human-readable rendering, used when the model cannot be reached
    pub summary: String,

    /// Structured payload handed back to the model
    pub data: serde_json::Value,
}

/// All tool definitions, in a stable order.
pub fn definitions() -> Vec<ToolDefinition> {
    ToolKind::ALL.iter().map(ToolKind::definition).collect()
}
