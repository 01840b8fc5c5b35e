//! Mock mailbox.
//!
//! Starts with a small seeded inbox. Composing saves a draft; nothing is
//! ever sent.

use chrono::{DateTime, NaiveDate, Utc};
use concierge_core::error::ToolError;
use concierge_core::tool::{EmailAction, EmailFilter, ToolKind, ToolResult};
use serde::Serialize;
use serde_json::json;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Normal,
    High,
    Urgent,
}

#[derive(Debug, Clone, Serialize)]
pub struct Email {
    pub id: u64,
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body: String,
    pub date: NaiveDate,
    pub read: bool,
    pub priority: Priority,
}

impl Email {
    fn is_important(&self) -> bool {
        matches!(self.priority, Priority::High | Priority::Urgent)
    }

    fn line(&self) -> String {
        let flag = if self.read { "" } else { " [unread]" };
        format!("#{} \"{}\" from {} ({}){flag}", self.id, self.subject, self.from, self.date)
    }

    /// Listing entry: headers plus a short body preview.
    fn preview(&self) -> serde_json::Value {
        let preview: String = self.body.chars().take(50).collect();
        json!({
            "id": self.id,
            "from": self.from,
            "subject": self.subject,
            "date": self.date,
            "read": self.read,
            "priority": self.priority,
            "preview": preview,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Draft {
    pub id: u64,
    pub to: String,
    pub subject: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub struct Mailbox {
    inbox: Vec<Email>,
    drafts: Vec<Draft>,
}

/// Newest messages shown for an unfiltered listing.
const LIST_LIMIT: usize = 5;

/// Unread messages named in an inbox summary.
const SUMMARY_UNREAD: usize = 3;

const REPLY_PLACEHOLDER: &str = "Hello,\n\nThank you for your message.\n\n[Write your reply here]\n\nBest regards";

/// Counts shown by the `summarize` action.
#[derive(Debug)]
pub struct InboxSummary<'a> {
    pub total: usize,
    pub unread: usize,
    pub urgent: usize,
    /// Newest unread messages, oldest of them first
    pub latest_unread: Vec<&'a Email>,
}

fn seed(id: u64, from: &str, subject: &str, body: &str, date: (i32, u32, u32), read: bool, priority: Priority) -> Option<Email> {
    Some(Email {
        id,
        from: from.into(),
        to: "user@example.com".into(),
        subject: subject.into(),
        body: body.into(),
        date: NaiveDate::from_ymd_opt(date.0, date.1, date.2)?,
        read,
        priority,
    })
}

impl Mailbox {
    /// An empty mailbox.
    pub fn new() -> Self {
        Self::default()
    }

    /// The demo inbox: three messages with mixed priority and read state.
    pub fn seeded() -> Self {
        let inbox = [
            seed(
                1,
                "john.doe@company.com",
                "Weekly meeting agenda",
                "Please confirm the agenda for tomorrow's weekly meeting at 10 AM.",
                (2024, 6, 11),
                false,
                Priority::Normal,
            ),
            seed(
                2,
                "hr@company.com",
                "Annual leave approved",
                "Your annual leave request has been approved. See the attachment for details.",
                (2024, 6, 10),
                true,
                Priority::High,
            ),
            seed(
                3,
                "client@external.com",
                "Project status question",
                "Could you share where the project stands and when you expect to finish?",
                (2024, 6, 9),
                false,
                Priority::Urgent,
            ),
        ]
        .into_iter()
        .flatten()
        .collect();

        Self {
            inbox,
            drafts: Vec::new(),
        }
    }

    pub fn unread_count(&self) -> usize {
        self.inbox.iter().filter(|e| !e.read).count()
    }

    pub fn drafts(&self) -> &[Draft] {
        &self.drafts
    }

    pub fn list(&self, filter: EmailFilter) -> Vec<&Email> {
        match filter {
            EmailFilter::All => {
                let skip = self.inbox.len().saturating_sub(LIST_LIMIT);
                self.inbox.iter().skip(skip).collect()
            }
            EmailFilter::Unread => self.inbox.iter().filter(|e| !e.read).collect(),
            EmailFilter::Important => self.inbox.iter().filter(|e| e.is_important()).collect(),
        }
    }

    /// Open a message and mark it read.
    pub fn read(&mut self, id: u64) -> Result<&Email, ToolError> {
        let email = self
            .inbox
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or_else(|| ToolError::NotFound(format!("no message with id {id}")))?;
        email.read = true;
        Ok(&*email)
    }

    /// Save a draft. The recipient must look like an address.
    pub fn compose(&mut self, to: &str, subject: &str, body: &str) -> Result<&Draft, ToolError> {
        let to = to.trim();
        if !to.contains('@') || to.starts_with('@') || to.ends_with('@') {
            return Err(ToolError::InvalidParameters(format!("'{to}' is not an email address")));
        }
        let subject = subject.trim();
        if subject.is_empty() {
            return Err(ToolError::InvalidParameters("subject must not be empty".into()));
        }
        self.drafts.push(Draft {
            id: self.drafts.len() as u64 + 1,
            to: to.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
            created_at: Utc::now(),
        });
        Ok(&self.drafts[self.drafts.len() - 1])
    }

    /// Draft a reply to message `id`, addressed to its sender.
    ///
    /// Without a body the draft gets a fill-in template. The first 100
    /// characters of the original are quoted below it.
    pub fn reply(&mut self, id: u64, body: Option<&str>) -> Result<&Draft, ToolError> {
        let original = self
            .inbox
            .iter()
            .find(|e| e.id == id)
            .ok_or_else(|| ToolError::NotFound(format!("no message with id {id}")))?;

        let to = original.from.clone();
        let subject = if original.subject.to_lowercase().starts_with("re:") {
            original.subject.clone()
        } else {
            format!("Re: {}", original.subject)
        };
        let quoted: String = original.body.chars().take(100).collect();
        let text = body.map(str::trim).filter(|b| !b.is_empty()).unwrap_or(REPLY_PLACEHOLDER);
        let body = format!("{text}\n\n--- Original message from {to} ---\n{quoted}");

        self.compose(&to, &subject, &body)
    }

    pub fn summarize(&self) -> InboxSummary<'_> {
        let unread: Vec<&Email> = self.inbox.iter().filter(|e| !e.read).collect();
        let skip = unread.len().saturating_sub(SUMMARY_UNREAD);
        InboxSummary {
            total: self.inbox.len(),
            unread: unread.len(),
            urgent: self.inbox.iter().filter(|e| e.priority == Priority::Urgent).count(),
            latest_unread: unread.into_iter().skip(skip).collect(),
        }
    }

    /// Case-insensitive keyword match over sender, subject and body.
    pub fn search(&self, query: &str) -> Result<Vec<&Email>, ToolError> {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return Err(ToolError::InvalidParameters("search query must not be empty".into()));
        }
        Ok(self
            .inbox
            .iter()
            .filter(|e| {
                e.from.to_lowercase().contains(&query)
                    || e.subject.to_lowercase().contains(&query)
                    || e.body.to_lowercase().contains(&query)
            })
            .collect())
    }

    /// Run a typed email action.
    pub fn execute(&mut self, action: EmailAction) -> Result<ToolResult, ToolError> {
        match action {
            EmailAction::List { filter } => {
                let emails = self.list(filter);
                let label = match filter {
                    EmailFilter::All => "latest",
                    EmailFilter::Unread => "unread",
                    EmailFilter::Important => "important",
                };
                let summary = if emails.is_empty() {
                    format!("No {label} messages.")
                } else {
                    let lines: Vec<String> = emails.iter().map(|e| e.line()).collect();
                    format!("{} {label} message(s): {}", emails.len(), lines.join("; "))
                };
                let previews: Vec<_> = emails.iter().map(|e| e.preview()).collect();
                Ok(ToolResult {
                    tool: ToolKind::Email,
                    summary,
                    data: json!({ "filter": label, "count": previews.len(), "messages": previews }),
                })
            }
            EmailAction::Read { id } => {
                let email = self.read(id)?;
                Ok(ToolResult {
                    tool: ToolKind::Email,
                    summary: format!(
                        "From {} on {}: \"{}\"\n{}",
                        email.from, email.date, email.subject, email.body
                    ),
                    data: json!({ "message": email }),
                })
            }
            EmailAction::Compose { to, subject, body } => {
                let draft = self.compose(&to, &subject, &body)?;
                Ok(ToolResult {
                    tool: ToolKind::Email,
                    summary: format!("Saved draft #{} to {}: \"{}\".", draft.id, draft.to, draft.subject),
                    data: json!({ "draft": draft, "sent": false }),
                })
            }
            EmailAction::Reply { id, body } => {
                let draft = self.reply(id, body.as_deref())?;
                Ok(ToolResult {
                    tool: ToolKind::Email,
                    summary: format!("Saved reply draft #{} to {}: \"{}\".", draft.id, draft.to, draft.subject),
                    data: json!({ "draft": draft, "in_reply_to": id, "sent": false }),
                })
            }
            EmailAction::Summarize => {
                let inbox = self.summarize();
                let mut summary = format!(
                    "{} message(s), {} unread, {} urgent.",
                    inbox.total, inbox.unread, inbox.urgent
                );
                if !inbox.latest_unread.is_empty() {
                    let lines: Vec<String> = inbox.latest_unread.iter().map(|e| e.line()).collect();
                    summary.push_str(&format!(" Latest unread: {}", lines.join("; ")));
                }
                let latest: Vec<_> = inbox.latest_unread.iter().map(|e| e.preview()).collect();
                Ok(ToolResult {
                    tool: ToolKind::Email,
                    summary,
                    data: json!({
                        "total": inbox.total,
                        "unread": inbox.unread,
                        "urgent": inbox.urgent,
                        "latest_unread": latest,
                    }),
                })
            }
            EmailAction::Search { query } => {
                let hits = self.search(&query)?;
                let summary = if hits.is_empty() {
                    format!("No messages match \"{}\".", query.trim())
                } else {
                    let lines: Vec<String> = hits.iter().map(|e| e.line()).collect();
                    format!("{} message(s) match \"{}\": {}", hits.len(), query.trim(), lines.join("; "))
                };
                let previews: Vec<_> = hits.iter().map(|e| e.preview()).collect();
                Ok(ToolResult {
                    tool: ToolKind::Email,
                    summary,
                    data: json!({ "query": query.trim(), "count": previews.len(), "messages": previews }),
                })
            }
        }
    }
}
