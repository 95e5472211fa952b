use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A reply on a ticket. Append-only: replies are never edited or deleted by
/// this core. Internal replies are agent notes invisible to the client and
/// do not count as a first response for SLA purposes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketReply {
    pub id: String,
    pub ticket_id: String,
    pub author_id: String,
    pub content: String,
    pub is_internal: bool,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    pub created_at: DateTime<Utc>,
}

/// Attachment metadata; the blob itself lives with the storage collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attachment {
    pub filename: String,
    pub url: String,
    pub size: u64,
    pub mime_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateReply {
    pub ticket_id: String,
    pub author_id: String,
    pub content: String,
    #[serde(default)]
    pub is_internal: bool,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

impl CreateReply {
    pub fn validate(&self) -> Result<(), String> {
        if self.content.len() < 5 || self.content.len() > 5000 {
            return Err("Reply content must be between 5 and 5,000 characters".to_string());
        }
        Ok(())
    }
}
