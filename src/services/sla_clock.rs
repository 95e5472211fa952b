use crate::models::sla::{SlaLimits, SlaStatus};
use crate::models::ticket::Ticket;
use chrono::{DateTime, Utc};

/// Compute a ticket's SLA clocks at `now`.
///
/// The response clock runs from creation until the first non-internal reply
/// (or `now` if none exists yet); the resolution clock runs from creation
/// until `resolved_at` (or `now`). A resolved or closed ticket is never
/// breached, whatever the elapsed time: breach is meaningless once the work
/// is done.
pub fn evaluate(
    ticket: &Ticket,
    first_public_reply_at: Option<DateTime<Utc>>,
    limits: &SlaLimits,
    now: DateTime<Utc>,
) -> SlaStatus {
    let response_end = first_public_reply_at.unwrap_or(now).min(now);
    let resolution_end = ticket.resolved_at.unwrap_or(now).min(now);

    let response_elapsed_hours = hours_between(ticket.created_at, response_end);
    let resolution_elapsed_hours = hours_between(ticket.created_at, resolution_end);

    let done = ticket.status.is_terminal();

    SlaStatus {
        response_elapsed_hours,
        resolution_elapsed_hours,
        response_breached: !done && response_elapsed_hours > limits.response_hours,
        resolution_breached: !done && resolution_elapsed_hours > limits.resolution_hours,
    }
}

fn hours_between(start: DateTime<Utc>, end: DateTime<Utc>) -> f64 {
    ((end - start).num_seconds().max(0)) as f64 / 3600.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ticket::{TicketPriority, TicketStatus};
    use chrono::{Duration, TimeZone};

    fn limits() -> SlaLimits {
        SlaLimits {
            response_hours: 8.0,
            resolution_hours: 48.0,
        }
    }

    fn ticket(status: TicketStatus) -> Ticket {
        let created = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();
        Ticket {
            id: "ticket-1".to_string(),
            organization_id: "org-1".to_string(),
            category_id: Some("cat-1".to_string()),
            title: "VPN drops hourly".to_string(),
            description: "Connection resets every hour on the hour.".to_string(),
            status,
            priority: TicketPriority::Medium,
            created_by: "client-1".to_string(),
            assignee: None,
            due_date: None,
            tags: vec![],
            created_at: created,
            resolved_at: None,
            updated_at: created,
        }
    }

    #[test]
    fn test_nine_hours_without_reply_breaches_response_only() {
        let t = ticket(TicketStatus::Open);
        let now = t.created_at + Duration::hours(9);
        let status = evaluate(&t, None, &limits(), now);
        assert!(status.response_breached);
        assert!(!status.resolution_breached);
        assert!((status.response_elapsed_hours - 9.0).abs() < 1e-9);
    }

    #[test]
    fn test_first_reply_stops_the_response_clock() {
        let t = ticket(TicketStatus::Open);
        let replied = t.created_at + Duration::hours(2);
        let now = t.created_at + Duration::hours(30);
        let status = evaluate(&t, Some(replied), &limits(), now);
        assert!(!status.response_breached);
        assert!((status.response_elapsed_hours - 2.0).abs() < 1e-9);
        assert!((status.resolution_elapsed_hours - 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_terminal_tickets_are_never_breached() {
        for status in [TicketStatus::Resolved, TicketStatus::Closed] {
            let mut t = ticket(status);
            if status == TicketStatus::Resolved {
                t.resolved_at = Some(t.created_at + Duration::hours(100));
            }
            let now = t.created_at + Duration::hours(500);
            let sla = evaluate(&t, None, &limits(), now);
            assert!(!sla.response_breached, "{status} must not breach response");
            assert!(
                !sla.resolution_breached,
                "{status} must not breach resolution"
            );
        }
    }

    #[test]
    fn test_resolution_clock_stops_at_resolved_at() {
        let mut t = ticket(TicketStatus::Resolved);
        t.resolved_at = Some(t.created_at + Duration::hours(10));
        let now = t.created_at + Duration::hours(200);
        let status = evaluate(&t, None, &limits(), now);
        assert!((status.resolution_elapsed_hours - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_resolution_breach_past_forty_eight_hours() {
        let t = ticket(TicketStatus::InProgress);
        let replied = t.created_at + Duration::hours(1);
        let now = t.created_at + Duration::hours(49);
        let status = evaluate(&t, Some(replied), &limits(), now);
        assert!(!status.response_breached);
        assert!(status.resolution_breached);
    }
}
