use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    Open,
    InProgress,
    WaitingClient,
    Resolved,
    Closed,
}

impl TicketStatus {
    /// A ticket in a terminal state no longer participates in SLA tracking.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TicketStatus::Resolved | TicketStatus::Closed)
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TicketStatus::Open => write!(f, "open"),
            TicketStatus::InProgress => write!(f, "in_progress"),
            TicketStatus::WaitingClient => write!(f, "waiting_client"),
            TicketStatus::Resolved => write!(f, "resolved"),
            TicketStatus::Closed => write!(f, "closed"),
        }
    }
}

impl std::str::FromStr for TicketStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(TicketStatus::Open),
            "in_progress" => Ok(TicketStatus::InProgress),
            "waiting_client" => Ok(TicketStatus::WaitingClient),
            "resolved" => Ok(TicketStatus::Resolved),
            "closed" => Ok(TicketStatus::Closed),
            _ => Err(format!("Invalid ticket status: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TicketPriority {
    Low,
    Medium,
    High,
    Urgent,
}

impl TicketPriority {
    /// The next priority up, used by escalation. `Urgent` stays `Urgent`.
    pub fn escalated(&self) -> TicketPriority {
        match self {
            TicketPriority::Low => TicketPriority::Medium,
            TicketPriority::Medium => TicketPriority::High,
            TicketPriority::High | TicketPriority::Urgent => TicketPriority::Urgent,
        }
    }
}

impl fmt::Display for TicketPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TicketPriority::Low => write!(f, "low"),
            TicketPriority::Medium => write!(f, "medium"),
            TicketPriority::High => write!(f, "high"),
            TicketPriority::Urgent => write!(f, "urgent"),
        }
    }
}

impl std::str::FromStr for TicketPriority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(TicketPriority::Low),
            "medium" => Ok(TicketPriority::Medium),
            "high" => Ok(TicketPriority::High),
            "urgent" => Ok(TicketPriority::Urgent),
            _ => Err(format!("Invalid ticket priority: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ticket {
    pub id: String,
    pub organization_id: String,
    pub category_id: Option<String>,
    pub title: String,
    pub description: String,
    pub status: TicketStatus,
    pub priority: TicketPriority,
    pub created_by: String,
    pub assignee: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl Ticket {
    /// Title and description concatenated, the haystack for keyword and
    /// `content` condition matching.
    pub fn content(&self) -> String {
        format!("{} {}", self.title, self.description)
    }

    pub fn age_hours(&self, now: DateTime<Utc>) -> f64 {
        (now - self.created_at).num_seconds() as f64 / 3600.0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTicket {
    pub organization_id: String,
    pub category_id: Option<String>,
    pub title: String,
    pub description: String,
    #[serde(default = "default_priority")]
    pub priority: TicketPriority,
    pub created_by: String,
    pub assignee: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
}

fn default_priority() -> TicketPriority {
    TicketPriority::Medium
}

impl CreateTicket {
    pub fn validate(&self) -> Result<(), String> {
        if self.title.len() < 5 || self.title.len() > 255 {
            return Err("Ticket title must be between 5 and 255 characters".to_string());
        }
        if self.description.len() < 10 || self.description.len() > 5000 {
            return Err("Ticket description must be between 10 and 5,000 characters".to_string());
        }
        Ok(())
    }
}
