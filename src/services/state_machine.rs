use crate::events::TriggerEvent;
use crate::models::ticket::{Ticket, TicketStatus};
use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransitionError {
    #[error("Invalid transition from {from} to {to}")]
    InvalidTransition {
        from: TicketStatus,
        to: TicketStatus,
    },
}

/// Validates if a status transition is allowed.
///
/// `resolved` and `closed` are reachable from any non-terminal state; there
/// is no transition out of `closed`. A transition to the current status is
/// treated as a valid no-op.
pub fn validate_transition(from: TicketStatus, to: TicketStatus) -> Result<(), TransitionError> {
    use TicketStatus::*;

    match (from, to) {
        // Same state is always valid (no-op)
        (a, b) if a == b => Ok(()),

        (Open, InProgress) => Ok(()),
        (Open, Resolved) => Ok(()),
        (Open, Closed) => Ok(()),

        (InProgress, Open) => Ok(()),
        (InProgress, WaitingClient) => Ok(()),
        (InProgress, Resolved) => Ok(()),
        (InProgress, Closed) => Ok(()),

        (WaitingClient, InProgress) => Ok(()),
        (WaitingClient, Resolved) => Ok(()),
        (WaitingClient, Closed) => Ok(()),

        // Reopening a resolved ticket is an explicit call; closing it ends it.
        (Resolved, Open) => Ok(()),
        (Resolved, Closed) => Ok(()),

        // closed is terminal
        _ => Err(TransitionError::InvalidTransition { from, to }),
    }
}

/// Apply a status transition to a ticket snapshot.
///
/// Returns the updated ticket and the `StatusChanged` trigger event the
/// caller must feed to the macro engine synchronously. A no-op transition
/// (to the current status) returns the ticket unchanged and no event, so
/// no macro pass runs for it.
///
/// Entering `resolved` stamps `resolved_at`; leaving it clears the stamp.
pub fn transition(
    ticket: &Ticket,
    to: TicketStatus,
    now: DateTime<Utc>,
) -> Result<(Ticket, Option<TriggerEvent>), TransitionError> {
    validate_transition(ticket.status, to)?;

    if ticket.status == to {
        return Ok((ticket.clone(), None));
    }

    let mut updated = ticket.clone();
    let from = ticket.status;

    if to == TicketStatus::Resolved {
        updated.resolved_at = Some(now);
    } else if from == TicketStatus::Resolved {
        updated.resolved_at = None;
    }

    updated.status = to;
    updated.updated_at = now;

    tracing::info!(
        ticket_id = %ticket.id,
        %from,
        %to,
        "ticket status transition"
    );

    let event = TriggerEvent::StatusChanged {
        ticket_id: ticket.id.clone(),
        from,
        to,
    };

    Ok((updated, Some(event)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ticket::TicketPriority;
    use chrono::TimeZone;

    fn ticket(status: TicketStatus) -> Ticket {
        let created = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();
        Ticket {
            id: "ticket-1".to_string(),
            organization_id: "org-1".to_string(),
            category_id: None,
            title: "Cannot log in".to_string(),
            description: "Password reset emails never arrive.".to_string(),
            status,
            priority: TicketPriority::Medium,
            created_by: "client-1".to_string(),
            assignee: None,
            due_date: None,
            tags: vec![],
            created_at: created,
            resolved_at: if status == TicketStatus::Resolved {
                Some(created)
            } else {
                None
            },
            updated_at: created,
        }
    }

    #[test]
    fn test_open_to_in_progress_valid() {
        assert!(validate_transition(TicketStatus::Open, TicketStatus::InProgress).is_ok());
    }

    #[test]
    fn test_waiting_client_round_trip_valid() {
        assert!(validate_transition(TicketStatus::InProgress, TicketStatus::WaitingClient).is_ok());
        assert!(validate_transition(TicketStatus::WaitingClient, TicketStatus::InProgress).is_ok());
    }

    #[test]
    fn test_resolve_and_close_reachable_from_any_non_terminal_state() {
        for from in [
            TicketStatus::Open,
            TicketStatus::InProgress,
            TicketStatus::WaitingClient,
        ] {
            assert!(validate_transition(from, TicketStatus::Resolved).is_ok());
            assert!(validate_transition(from, TicketStatus::Closed).is_ok());
        }
    }

    #[test]
    fn test_closed_is_terminal() {
        for to in [
            TicketStatus::Open,
            TicketStatus::InProgress,
            TicketStatus::WaitingClient,
            TicketStatus::Resolved,
        ] {
            let result = validate_transition(TicketStatus::Closed, to);
            assert!(matches!(
                result,
                Err(TransitionError::InvalidTransition { .. })
            ));
        }
    }

    #[test]
    fn test_open_to_waiting_client_invalid() {
        assert!(validate_transition(TicketStatus::Open, TicketStatus::WaitingClient).is_err());
    }

    #[test]
    fn test_self_transition_is_a_noop() {
        let t = ticket(TicketStatus::InProgress);
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let (updated, event) = transition(&t, TicketStatus::InProgress, now).unwrap();
        assert_eq!(updated.status, TicketStatus::InProgress);
        assert_eq!(updated.updated_at, t.updated_at);
        assert!(event.is_none());
    }

    #[test]
    fn test_resolving_stamps_resolved_at() {
        let t = ticket(TicketStatus::InProgress);
        let now = Utc.with_ymd_and_hms(2026, 3, 2, 10, 0, 0).unwrap();
        let (updated, event) = transition(&t, TicketStatus::Resolved, now).unwrap();
        assert_eq!(updated.resolved_at, Some(now));
        assert!(matches!(
            event,
            Some(TriggerEvent::StatusChanged {
                to: TicketStatus::Resolved,
                ..
            })
        ));
    }

    #[test]
    fn test_reopening_clears_resolved_at() {
        let t = ticket(TicketStatus::Resolved);
        let now = Utc.with_ymd_and_hms(2026, 3, 3, 8, 0, 0).unwrap();
        let (updated, _) = transition(&t, TicketStatus::Open, now).unwrap();
        assert_eq!(updated.status, TicketStatus::Open);
        assert!(updated.resolved_at.is_none());
    }

    #[test]
    fn test_closing_from_open_does_not_stamp_resolved_at() {
        let t = ticket(TicketStatus::Open);
        let now = Utc.with_ymd_and_hms(2026, 3, 2, 10, 0, 0).unwrap();
        let (updated, _) = transition(&t, TicketStatus::Closed, now).unwrap();
        assert_eq!(updated.status, TicketStatus::Closed);
        assert!(updated.resolved_at.is_none());
    }
}
