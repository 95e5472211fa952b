use crate::config::{Config, SlaDefaults};
use crate::errors::CoreResult;
use crate::events::TriggerEvent;
use crate::models::macros::ExecutionMode;
use crate::models::sla::{SlaBreachKind, SlaLimits};
use crate::models::ticket::Ticket;
use crate::ports::{Clock, TicketStore, TimeService};
use crate::services::macro_engine::MacroEngine;
use crate::services::sla_clock;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Periodic sweep over non-terminal tickets that recomputes SLA clocks and
/// feeds `sla_breach` triggers into the macro engine.
///
/// A breach is raised once, on the false-to-true edge: the scanner
/// remembers which (ticket, deadline) pairs it has already raised and
/// forgets them when the ticket leaves the open set. Tickets are scanned
/// concurrently; each ticket's cascade is serialized by the engine's
/// per-ticket lock.
pub struct SlaScanner {
    tickets: Arc<dyn TicketStore>,
    engine: Arc<MacroEngine>,
    clock: Arc<dyn Clock>,
    time: Arc<dyn TimeService>,
    sla_defaults: SlaDefaults,
    interval: Duration,
    raised: Mutex<HashMap<String, HashSet<SlaBreachKind>>>,
}

impl SlaScanner {
    pub fn new(
        tickets: Arc<dyn TicketStore>,
        engine: Arc<MacroEngine>,
        clock: Arc<dyn Clock>,
        time: Arc<dyn TimeService>,
        config: &Config,
    ) -> Self {
        Self {
            tickets,
            engine,
            clock,
            time,
            sla_defaults: config.sla_defaults,
            interval: Duration::from_secs(config.scan_interval_secs),
            raised: Mutex::new(HashMap::new()),
        }
    }

    /// Scan forever at the configured interval. Errors are logged and the
    /// next tick proceeds; the scanner never dies on a bad sweep.
    pub async fn run(&self) {
        tracing::info!(interval_secs = self.interval.as_secs(), "SLA scanner started");
        loop {
            match self.scan_once().await {
                Ok(raised) if raised > 0 => {
                    tracing::info!(raised, "SLA scan raised breach triggers");
                }
                Ok(_) => {}
                Err(err) => {
                    tracing::error!(error = %err, "SLA scan failed");
                }
            }
            self.time.sleep(self.interval).await;
        }
    }

    /// One sweep. Returns how many breach triggers were raised.
    pub async fn scan_once(&self) -> CoreResult<usize> {
        let open = self.tickets.list_open_tickets().await?;
        let now = self.clock.now();

        self.forget_departed(&open);

        let scans = open.iter().map(|ticket| self.scan_ticket(ticket, now));
        let raised: usize = futures::future::join_all(scans).await.iter().sum();

        Ok(raised)
    }

    async fn scan_ticket(&self, ticket: &Ticket, now: chrono::DateTime<chrono::Utc>) -> usize {
        let limits = match self.limits_for(ticket).await {
            Ok(limits) => limits,
            Err(err) => {
                tracing::warn!(ticket_id = %ticket.id, error = %err, "skipping ticket in SLA scan");
                return 0;
            }
        };

        let first_reply = match self.tickets.first_public_reply_at(&ticket.id).await {
            Ok(at) => at,
            Err(err) => {
                tracing::warn!(ticket_id = %ticket.id, error = %err, "skipping ticket in SLA scan");
                return 0;
            }
        };

        let status = sla_clock::evaluate(ticket, first_reply, &limits, now);

        let mut pending = Vec::new();
        if status.response_breached {
            pending.push(SlaBreachKind::Response);
        }
        if status.resolution_breached {
            pending.push(SlaBreachKind::Resolution);
        }

        let mut raised = 0;
        for kind in pending {
            if self.already_raised(&ticket.id, kind) {
                continue;
            }

            tracing::warn!(
                ticket_id = %ticket.id,
                breach = %kind,
                elapsed_response_hours = status.response_elapsed_hours,
                elapsed_resolution_hours = status.resolution_elapsed_hours,
                "SLA breached"
            );

            let event = TriggerEvent::SlaBreached {
                ticket_id: ticket.id.clone(),
                breach: kind,
            };
            match self.engine.run(&event, ExecutionMode::Automatic).await {
                Ok(_) => {
                    self.mark_raised(&ticket.id, kind);
                    raised += 1;
                }
                Err(err) => {
                    // Left unmarked so the next sweep retries the trigger.
                    tracing::error!(
                        ticket_id = %ticket.id,
                        breach = %kind,
                        error = %err,
                        "failed to run sla_breach macro pass"
                    );
                }
            }
        }

        raised
    }

    async fn limits_for(&self, ticket: &Ticket) -> CoreResult<SlaLimits> {
        if let Some(category_id) = &ticket.category_id {
            if let Some(category) = self.tickets.get_category(category_id).await? {
                return Ok(category.sla_limits());
            }
        }
        Ok(SlaLimits::from_defaults(&self.sla_defaults))
    }

    fn already_raised(&self, ticket_id: &str, kind: SlaBreachKind) -> bool {
        self.raised
            .lock()
            .map(|raised| {
                raised
                    .get(ticket_id)
                    .is_some_and(|kinds| kinds.contains(&kind))
            })
            .unwrap_or(false)
    }

    fn mark_raised(&self, ticket_id: &str, kind: SlaBreachKind) {
        if let Ok(mut raised) = self.raised.lock() {
            raised.entry(ticket_id.to_string()).or_default().insert(kind);
        }
    }

    fn forget_departed(&self, open: &[Ticket]) {
        if let Ok(mut raised) = self.raised.lock() {
            let open_ids: HashSet<&str> = open.iter().map(|t| t.id.as_str()).collect();
            raised.retain(|id, _| open_ids.contains(id.as_str()));
        }
    }
}
