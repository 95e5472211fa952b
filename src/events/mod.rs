use crate::models::macros::MacroTrigger;
use crate::models::sla::SlaBreachKind;
use crate::models::ticket::{TicketPriority, TicketStatus};

/// Events that cause the macro engine to look for matching macros.
///
/// Every variant names the ticket it concerns; the engine re-reads the
/// ticket itself under the per-ticket lock, so events carry identifiers and
/// the before/after values useful for logging, not snapshots.
#[derive(Debug, Clone, PartialEq)]
pub enum TriggerEvent {
    TicketCreated {
        ticket_id: String,
    },
    ReplyAdded {
        ticket_id: String,
        reply_id: String,
        author_id: String,
    },
    StatusChanged {
        ticket_id: String,
        from: TicketStatus,
        to: TicketStatus,
    },
    PriorityChanged {
        ticket_id: String,
        from: TicketPriority,
        to: TicketPriority,
    },
    CategoryChanged {
        ticket_id: String,
        category_id: Option<String>,
    },
    SlaBreached {
        ticket_id: String,
        breach: SlaBreachKind,
    },
}

impl TriggerEvent {
    pub fn ticket_id(&self) -> &str {
        match self {
            TriggerEvent::TicketCreated { ticket_id }
            | TriggerEvent::ReplyAdded { ticket_id, .. }
            | TriggerEvent::StatusChanged { ticket_id, .. }
            | TriggerEvent::PriorityChanged { ticket_id, .. }
            | TriggerEvent::CategoryChanged { ticket_id, .. }
            | TriggerEvent::SlaBreached { ticket_id, .. } => ticket_id,
        }
    }

    /// Whether this event wakes macros of the given trigger type. Manual
    /// macros are never activated by events; they run only through
    /// `MacroEngine::run_macro`.
    pub fn activates(&self, trigger: MacroTrigger) -> bool {
        match self {
            TriggerEvent::TicketCreated { .. } => matches!(
                trigger,
                MacroTrigger::Keyword | MacroTrigger::Category | MacroTrigger::Priority
            ),
            TriggerEvent::ReplyAdded { .. } => trigger == MacroTrigger::Keyword,
            TriggerEvent::StatusChanged { .. } => trigger == MacroTrigger::StatusChange,
            TriggerEvent::PriorityChanged { .. } => trigger == MacroTrigger::Priority,
            TriggerEvent::CategoryChanged { .. } => trigger == MacroTrigger::Category,
            TriggerEvent::SlaBreached { .. } => trigger == MacroTrigger::SlaBreach,
        }
    }

    /// Trigger types this event can activate, in the order macro stores are
    /// queried.
    pub fn trigger_types(&self) -> &'static [MacroTrigger] {
        match self {
            TriggerEvent::TicketCreated { .. } => &[
                MacroTrigger::Keyword,
                MacroTrigger::Category,
                MacroTrigger::Priority,
            ],
            TriggerEvent::ReplyAdded { .. } => &[MacroTrigger::Keyword],
            TriggerEvent::StatusChanged { .. } => &[MacroTrigger::StatusChange],
            TriggerEvent::PriorityChanged { .. } => &[MacroTrigger::Priority],
            TriggerEvent::CategoryChanged { .. } => &[MacroTrigger::Category],
            TriggerEvent::SlaBreached { .. } => &[MacroTrigger::SlaBreach],
        }
    }

    /// Short name recorded on execution records.
    pub fn kind(&self) -> &'static str {
        match self {
            TriggerEvent::TicketCreated { .. } => "ticket_created",
            TriggerEvent::ReplyAdded { .. } => "reply_added",
            TriggerEvent::StatusChanged { .. } => "status_change",
            TriggerEvent::PriorityChanged { .. } => "priority_change",
            TriggerEvent::CategoryChanged { .. } => "category_change",
            TriggerEvent::SlaBreached { .. } => "sla_breach",
        }
    }
}
