use crate::config::Config;
use crate::errors::{CoreError, CoreResult};
use crate::events::TriggerEvent;
use crate::models::macros::{
    ActionOutcome, ExecutionMode, Macro, MacroExecution, OutcomeStatus,
};
use crate::models::ticket::Ticket;
use crate::ports::{
    AgentDirectory, Clock, ExecutionLog, MacroStore, Notifier, TaskCollaborator, TicketLock,
    TicketStore,
};
use crate::services::action_executor::ActionExecutor;
use crate::services::{condition_evaluator, macro_selector};
use std::sync::Arc;
use std::time::Duration;

const LOCK_RETRIES: u32 = 50;
const LOCK_RETRY_DELAY: Duration = Duration::from_millis(20);

/// Orchestrates one macro pass per trigger event.
///
/// The engine owns the per-ticket lock discipline: it acquires the ticket's
/// lock before the first read and releases it after the last execution
/// record is appended, so a scanner tick and an inline mutation can never
/// race on the same ticket. Within a pass the ticket is re-fetched before
/// every macro (and between actions), because earlier macros may have
/// mutated it and later ones must evaluate against the current snapshot.
pub struct MacroEngine {
    tickets: Arc<dyn TicketStore>,
    macros: Arc<dyn MacroStore>,
    executions: Arc<dyn ExecutionLog>,
    locks: Arc<dyn TicketLock>,
    clock: Arc<dyn Clock>,
    executor: ActionExecutor,
    lock_ttl_secs: u64,
}

impl MacroEngine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        tickets: Arc<dyn TicketStore>,
        macros: Arc<dyn MacroStore>,
        executions: Arc<dyn ExecutionLog>,
        notifier: Arc<dyn Notifier>,
        tasks: Arc<dyn TaskCollaborator>,
        agents: Arc<dyn AgentDirectory>,
        locks: Arc<dyn TicketLock>,
        clock: Arc<dyn Clock>,
        config: &Config,
    ) -> Self {
        let executor = ActionExecutor::new(
            tickets.clone(),
            notifier,
            tasks,
            agents,
            clock.clone(),
        );
        Self {
            tickets,
            macros,
            executions,
            locks,
            clock,
            executor,
            lock_ttl_secs: config.lock_ttl_secs,
        }
    }

    /// Run every matching macro for one trigger event, in selector order.
    ///
    /// Macros whose conditions do not match the current snapshot are not
    /// attempted and leave no execution record. Action and transition
    /// failures are recorded as outcomes, never returned as errors; an
    /// `Err` here means the pass itself could not run (ticket missing,
    /// store down, lock unobtainable).
    pub async fn run(
        &self,
        event: &TriggerEvent,
        mode: ExecutionMode,
    ) -> CoreResult<Vec<MacroExecution>> {
        let ticket_id = event.ticket_id();
        let owner = uuid::Uuid::new_v4().to_string();

        self.lock_ticket(ticket_id, &owner).await?;
        let result = self.run_locked(event, mode).await;
        self.unlock_ticket(ticket_id, &owner).await;
        result
    }

    async fn run_locked(
        &self,
        event: &TriggerEvent,
        mode: ExecutionMode,
    ) -> CoreResult<Vec<MacroExecution>> {
        let ticket = self.tickets.get(event.ticket_id()).await?;

        let mut candidates = Vec::new();
        for trigger in event.trigger_types() {
            candidates.extend(self.macros.list_active_by_trigger(*trigger).await?);
        }
        let selected = macro_selector::select(candidates, event, &ticket);

        tracing::debug!(
            ticket_id = %ticket.id,
            trigger = event.kind(),
            candidates = selected.len(),
            "macro pass starting"
        );

        let mut executions = Vec::with_capacity(selected.len());
        for macro_def in &selected {
            // Earlier macros may have mutated the ticket; evaluate against
            // the current snapshot.
            let snapshot = self.tickets.get(event.ticket_id()).await?;
            let matched = condition_evaluator::matches_all(
                &snapshot,
                &macro_def.conditions,
                macro_def.combinator,
                self.clock.now(),
            );
            if !matched {
                tracing::debug!(
                    ticket_id = %snapshot.id,
                    macro_id = %macro_def.id,
                    "conditions not met, macro not attempted"
                );
                continue;
            }

            let execution = self
                .execute_macro(macro_def, &snapshot, event.kind(), mode)
                .await;
            self.executions.append(&execution).await?;
            executions.push(execution);
        }

        Ok(executions)
    }

    /// Run exactly one named macro against a ticket, bypassing the
    /// selector's trigger/keyword filter. Conditions are still evaluated
    /// unless `skip_conditions` is set; a manual run of a non-matching
    /// macro records an all-skipped execution so the operator can see why
    /// nothing happened.
    pub async fn run_macro(
        &self,
        macro_id: &str,
        ticket_id: &str,
        mode: ExecutionMode,
        skip_conditions: bool,
    ) -> CoreResult<MacroExecution> {
        let macro_def = self.macros.get(macro_id).await?;
        if !macro_def.active {
            return Err(CoreError::Validation(format!(
                "Macro {macro_id} is not active"
            )));
        }

        let owner = uuid::Uuid::new_v4().to_string();
        self.lock_ticket(ticket_id, &owner).await?;
        let result = self
            .run_macro_locked(&macro_def, ticket_id, mode, skip_conditions)
            .await;
        self.unlock_ticket(ticket_id, &owner).await;
        result
    }

    async fn run_macro_locked(
        &self,
        macro_def: &Macro,
        ticket_id: &str,
        mode: ExecutionMode,
        skip_conditions: bool,
    ) -> CoreResult<MacroExecution> {
        let ticket = self.tickets.get(ticket_id).await?;

        let matched = skip_conditions
            || condition_evaluator::matches_all(
                &ticket,
                &macro_def.conditions,
                macro_def.combinator,
                self.clock.now(),
            );

        let execution = if matched {
            self.execute_macro(macro_def, &ticket, "manual", mode).await
        } else {
            self.skipped_execution(macro_def, &ticket, "manual", mode, "conditions not met")
        };

        self.executions.append(&execution).await?;
        Ok(execution)
    }

    /// Execute the full action list of one macro. Failures are aggregated,
    /// never propagated: a macro pass always completes and is audited.
    async fn execute_macro(
        &self,
        macro_def: &Macro,
        ticket: &Ticket,
        trigger: &str,
        mode: ExecutionMode,
    ) -> MacroExecution {
        let started_at = self.clock.now();
        let mut current = ticket.clone();
        let mut outcomes = Vec::with_capacity(macro_def.actions.len());

        for action in &macro_def.actions {
            let outcome = self.executor.apply(&current, action, mode).await;
            outcomes.push(outcome);

            // Later actions of the same macro see earlier mutations.
            if mode != ExecutionMode::DryRun {
                if let Ok(snapshot) = self.tickets.get(&ticket.id).await {
                    current = snapshot;
                }
            }
        }

        let status = MacroExecution::aggregate_status(&outcomes);
        tracing::info!(
            ticket_id = %ticket.id,
            macro_id = %macro_def.id,
            trigger,
            ?status,
            actions = outcomes.len(),
            "macro executed"
        );

        MacroExecution {
            id: uuid::Uuid::new_v4().to_string(),
            macro_id: macro_def.id.clone(),
            ticket_id: ticket.id.clone(),
            trigger: trigger.to_string(),
            mode,
            outcomes,
            status,
            started_at,
            completed_at: self.clock.now(),
        }
    }

    fn skipped_execution(
        &self,
        macro_def: &Macro,
        ticket: &Ticket,
        trigger: &str,
        mode: ExecutionMode,
        reason: &str,
    ) -> MacroExecution {
        let now = self.clock.now();
        let outcomes = macro_def
            .actions
            .iter()
            .map(|action| ActionOutcome {
                action: action.kind().to_string(),
                status: OutcomeStatus::Skipped,
                message: reason.to_string(),
            })
            .collect::<Vec<_>>();
        let status = MacroExecution::aggregate_status(&outcomes);

        MacroExecution {
            id: uuid::Uuid::new_v4().to_string(),
            macro_id: macro_def.id.clone(),
            ticket_id: ticket.id.clone(),
            trigger: trigger.to_string(),
            mode,
            outcomes,
            status,
            started_at: now,
            completed_at: now,
        }
    }

    async fn lock_ticket(&self, ticket_id: &str, owner: &str) -> CoreResult<()> {
        for _ in 0..LOCK_RETRIES {
            if self
                .locks
                .acquire(ticket_id, owner, self.lock_ttl_secs)
                .await?
            {
                return Ok(());
            }
            tokio::time::sleep(LOCK_RETRY_DELAY).await;
        }
        Err(CoreError::Unavailable(format!(
            "could not acquire lock for ticket {ticket_id}"
        )))
    }

    async fn unlock_ticket(&self, ticket_id: &str, owner: &str) {
        if let Err(err) = self.locks.release(ticket_id, owner).await {
            // The TTL will reclaim it; nothing else to do here.
            tracing::warn!(ticket_id, error = %err, "failed to release ticket lock");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{
        ManualClock, MemoryAgentDirectory, MemoryExecutionLog, MemoryMacroStore, MemoryTicketLock,
        MemoryTicketStore, RecordingNotifier, RecordingTasks,
    };
    use crate::models::macros::{
        Combinator, ConditionField, ConditionOperator, ExecutionStatus, MacroAction,
        MacroCondition, MacroTrigger,
    };
    use crate::models::sla::SlaBreachKind;
    use crate::models::ticket::{TicketPriority, TicketStatus};
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    struct Harness {
        tickets: Arc<MemoryTicketStore>,
        macros: Arc<MemoryMacroStore>,
        log: Arc<MemoryExecutionLog>,
        notifier: Arc<RecordingNotifier>,
        tasks: Arc<RecordingTasks>,
        agents: Arc<MemoryAgentDirectory>,
        locks: Arc<MemoryTicketLock>,
        engine: MacroEngine,
    }

    fn harness() -> Harness {
        let tickets = Arc::new(MemoryTicketStore::new());
        let macros = Arc::new(MemoryMacroStore::new());
        let log = Arc::new(MemoryExecutionLog::new());
        let notifier = Arc::new(RecordingNotifier::new());
        let tasks = Arc::new(RecordingTasks::new());
        let agents = Arc::new(MemoryAgentDirectory::new());
        let locks = Arc::new(MemoryTicketLock::new());
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap(),
        ));
        let engine = MacroEngine::new(
            tickets.clone(),
            macros.clone(),
            log.clone(),
            notifier.clone(),
            tasks.clone(),
            agents.clone(),
            locks.clone(),
            clock,
            &Config::default(),
        );
        Harness {
            tickets,
            macros,
            log,
            notifier,
            tasks,
            agents,
            locks,
            engine,
        }
    }

    fn seed_ticket(h: &Harness, id: &str) -> Ticket {
        let created = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();
        let ticket = Ticket {
            id: id.to_string(),
            organization_id: "org-1".to_string(),
            category_id: None,
            title: "Payment page errors".to_string(),
            description: "Checkout fails with a 502 on submit.".to_string(),
            status: TicketStatus::Open,
            priority: TicketPriority::Medium,
            created_by: "client-1".to_string(),
            assignee: None,
            due_date: None,
            tags: vec![],
            created_at: created,
            resolved_at: None,
            updated_at: created,
        };
        h.tickets.insert_ticket(ticket.clone());
        ticket
    }

    fn macro_def(id: &str, trigger: MacroTrigger, priority: i32, actions: Vec<MacroAction>) -> Macro {
        Macro {
            id: id.to_string(),
            name: format!("macro {id}"),
            description: None,
            trigger,
            conditions: vec![],
            combinator: Combinator::And,
            actions,
            keywords: vec![],
            active: true,
            priority,
            created_at: Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap(),
            updated_at: Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap(),
        }
    }

    fn status_change_event(ticket_id: &str) -> TriggerEvent {
        TriggerEvent::StatusChanged {
            ticket_id: ticket_id.to_string(),
            from: TicketStatus::InProgress,
            to: TicketStatus::Open,
        }
    }

    #[tokio::test]
    async fn test_later_macro_sees_earlier_macros_mutation() {
        let h = harness();
        seed_ticket(&h, "ticket-1");

        let m1 = macro_def(
            "m-1",
            MacroTrigger::StatusChange,
            100,
            vec![MacroAction::ChangeStatus {
                status: TicketStatus::InProgress,
            }],
        );
        let mut m2 = macro_def(
            "m-2",
            MacroTrigger::StatusChange,
            50,
            vec![MacroAction::ChangePriority {
                priority: TicketPriority::Urgent,
            }],
        );
        m2.conditions = vec![MacroCondition {
            field: ConditionField::Status,
            operator: ConditionOperator::Equals,
            value: json!("in_progress"),
        }];
        h.macros.insert(m1);
        h.macros.insert(m2);

        let executions = h
            .engine
            .run(&status_change_event("ticket-1"), ExecutionMode::Automatic)
            .await
            .unwrap();

        // M2 evaluated against the post-M1 snapshot and fired.
        assert_eq!(executions.len(), 2);
        assert_eq!(executions[0].macro_id, "m-1");
        assert_eq!(executions[1].macro_id, "m-2");

        let ticket = h.tickets.get("ticket-1").await.unwrap();
        assert_eq!(ticket.status, TicketStatus::InProgress);
        assert_eq!(ticket.priority, TicketPriority::Urgent);
    }

    #[tokio::test]
    async fn test_one_outcome_per_action_in_order() {
        let h = harness();
        seed_ticket(&h, "ticket-1");
        h.agents.add_agent("agent-7");

        let m = macro_def(
            "m-1",
            MacroTrigger::StatusChange,
            10,
            vec![
                MacroAction::AddReply {
                    content: "We are on it.".to_string(),
                    is_internal: false,
                },
                MacroAction::AssignAgent {
                    agent_id: "agent-7".to_string(),
                },
                MacroAction::CreateTask {
                    description: "Check load balancer logs".to_string(),
                    assignee: None,
                },
            ],
        );
        h.macros.insert(m);

        let executions = h
            .engine
            .run(&status_change_event("ticket-1"), ExecutionMode::Automatic)
            .await
            .unwrap();

        assert_eq!(executions.len(), 1);
        let outcomes = &executions[0].outcomes;
        assert_eq!(outcomes.len(), 3);
        assert_eq!(outcomes[0].action, "add_reply");
        assert_eq!(outcomes[1].action, "assign_agent");
        assert_eq!(outcomes[2].action, "create_task");
        assert!(outcomes.iter().all(|o| o.status == OutcomeStatus::Success));
        assert_eq!(executions[0].status, ExecutionStatus::Success);
    }

    #[tokio::test]
    async fn test_dry_run_skips_actions_and_mutates_nothing() {
        let h = harness();
        seed_ticket(&h, "ticket-1");

        let m = macro_def(
            "m-1",
            MacroTrigger::Manual,
            10,
            vec![
                MacroAction::AddReply {
                    content: "Thanks for reaching out.".to_string(),
                    is_internal: false,
                },
                MacroAction::ChangePriority {
                    priority: TicketPriority::High,
                },
                MacroAction::SendEmail {
                    recipient: None,
                    template: "ack".to_string(),
                    variables: Default::default(),
                },
            ],
        );
        h.macros.insert(m);

        let execution = h
            .engine
            .run_macro("m-1", "ticket-1", ExecutionMode::DryRun, false)
            .await
            .unwrap();

        assert_eq!(execution.outcomes.len(), 3);
        assert!(execution
            .outcomes
            .iter()
            .all(|o| o.status == OutcomeStatus::Skipped));

        // No mutation, no collaborator call; only the audit record exists.
        assert_eq!(h.tickets.save_count(), 0);
        assert_eq!(h.tickets.reply_count(), 0);
        assert!(h.notifier.sent().is_empty());
        assert!(h.tasks.created().is_empty());
        assert_eq!(h.log.records().len(), 1);

        let ticket = h.tickets.get("ticket-1").await.unwrap();
        assert_eq!(ticket.priority, TicketPriority::Medium);
    }

    #[tokio::test]
    async fn test_unknown_agent_fails_action_and_pass_is_partial() {
        let h = harness();
        seed_ticket(&h, "ticket-1");

        let m = macro_def(
            "m-1",
            MacroTrigger::StatusChange,
            10,
            vec![
                MacroAction::AssignAgent {
                    agent_id: "ghost".to_string(),
                },
                MacroAction::ChangePriority {
                    priority: TicketPriority::High,
                },
            ],
        );
        h.macros.insert(m);

        let executions = h
            .engine
            .run(&status_change_event("ticket-1"), ExecutionMode::Automatic)
            .await
            .unwrap();

        let execution = &executions[0];
        assert_eq!(execution.outcomes[0].status, OutcomeStatus::Failed);
        assert!(execution.outcomes[0].message.contains("ghost"));
        assert_eq!(execution.outcomes[1].status, OutcomeStatus::Success);
        assert_eq!(execution.status, ExecutionStatus::Partial);

        // The failed assignment did not abort the rest of the macro.
        let ticket = h.tickets.get("ticket-1").await.unwrap();
        assert_eq!(ticket.priority, TicketPriority::High);
        assert!(ticket.assignee.is_none());
    }

    #[tokio::test]
    async fn test_every_action_failing_marks_execution_failed() {
        let h = harness();
        seed_ticket(&h, "ticket-1");
        h.notifier.fail_next_sends(true);

        let m = macro_def(
            "m-1",
            MacroTrigger::StatusChange,
            10,
            vec![
                MacroAction::AssignAgent {
                    agent_id: "ghost".to_string(),
                },
                MacroAction::SendEmail {
                    recipient: None,
                    template: "ack".to_string(),
                    variables: Default::default(),
                },
            ],
        );
        h.macros.insert(m);

        let executions = h
            .engine
            .run(&status_change_event("ticket-1"), ExecutionMode::Automatic)
            .await
            .unwrap();

        assert_eq!(executions[0].status, ExecutionStatus::Failed);
        assert!(executions[0]
            .outcomes
            .iter()
            .all(|o| o.status == OutcomeStatus::Failed));
    }

    #[tokio::test]
    async fn test_invalid_transition_is_recorded_not_thrown() {
        let h = harness();
        let mut ticket = seed_ticket(&h, "ticket-1");
        ticket.status = TicketStatus::Closed;
        h.tickets.insert_ticket(ticket);

        let m = macro_def(
            "m-1",
            MacroTrigger::SlaBreach,
            10,
            vec![MacroAction::ChangeStatus {
                status: TicketStatus::Open,
            }],
        );
        h.macros.insert(m);

        let event = TriggerEvent::SlaBreached {
            ticket_id: "ticket-1".to_string(),
            breach: SlaBreachKind::Response,
        };
        let executions = h.engine.run(&event, ExecutionMode::Automatic).await.unwrap();

        assert_eq!(executions[0].status, ExecutionStatus::Failed);
        assert!(executions[0].outcomes[0].message.contains("Invalid transition"));
    }

    #[tokio::test]
    async fn test_non_matching_macro_is_not_attempted() {
        let h = harness();
        seed_ticket(&h, "ticket-1");

        let mut m = macro_def(
            "m-1",
            MacroTrigger::SlaBreach,
            10,
            vec![MacroAction::ChangePriority {
                priority: TicketPriority::Urgent,
            }],
        );
        m.conditions = vec![MacroCondition {
            field: ConditionField::Priority,
            operator: ConditionOperator::Equals,
            value: json!("high"),
        }];
        h.macros.insert(m);

        let event = TriggerEvent::SlaBreached {
            ticket_id: "ticket-1".to_string(),
            breach: SlaBreachKind::Response,
        };
        // The ticket is medium priority, so the macro must not execute.
        let executions = h.engine.run(&event, ExecutionMode::Automatic).await.unwrap();
        assert!(executions.is_empty());
        assert!(h.log.records().is_empty());

        let ticket = h.tickets.get("ticket-1").await.unwrap();
        assert_eq!(ticket.priority, TicketPriority::Medium);
    }

    #[tokio::test]
    async fn test_manual_run_with_unmet_conditions_records_skips() {
        let h = harness();
        seed_ticket(&h, "ticket-1");

        let mut m = macro_def(
            "m-1",
            MacroTrigger::Manual,
            10,
            vec![
                MacroAction::ChangePriority {
                    priority: TicketPriority::Urgent,
                },
                MacroAction::AddReply {
                    content: "Escalated.".to_string(),
                    is_internal: true,
                },
            ],
        );
        m.conditions = vec![MacroCondition {
            field: ConditionField::Priority,
            operator: ConditionOperator::Equals,
            value: json!("urgent"),
        }];
        h.macros.insert(m.clone());

        let execution = h
            .engine
            .run_macro("m-1", "ticket-1", ExecutionMode::Manual, false)
            .await
            .unwrap();
        assert_eq!(execution.outcomes.len(), 2);
        assert!(execution
            .outcomes
            .iter()
            .all(|o| o.status == OutcomeStatus::Skipped && o.message == "conditions not met"));
        assert_eq!(h.tickets.save_count(), 0);

        // The caller can override the condition check explicitly.
        let execution = h
            .engine
            .run_macro("m-1", "ticket-1", ExecutionMode::Manual, true)
            .await
            .unwrap();
        assert_eq!(execution.status, ExecutionStatus::Success);
        let ticket = h.tickets.get("ticket-1").await.unwrap();
        assert_eq!(ticket.priority, TicketPriority::Urgent);
    }

    #[tokio::test]
    async fn test_manual_run_of_inactive_macro_is_rejected() {
        let h = harness();
        seed_ticket(&h, "ticket-1");

        let mut m = macro_def(
            "m-1",
            MacroTrigger::Manual,
            10,
            vec![MacroAction::ChangePriority {
                priority: TicketPriority::High,
            }],
        );
        m.active = false;
        h.macros.insert(m);

        let result = h
            .engine
            .run_macro("m-1", "ticket-1", ExecutionMode::Manual, false)
            .await;
        assert!(matches!(result, Err(CoreError::Validation(_))));
    }

    #[tokio::test]
    async fn test_lock_is_released_after_a_pass() {
        let h = harness();
        seed_ticket(&h, "ticket-1");

        h.engine
            .run(&status_change_event("ticket-1"), ExecutionMode::Automatic)
            .await
            .unwrap();

        assert!(h.locks.acquire("ticket-1", "probe", 30).await.unwrap());
    }

    #[tokio::test]
    async fn test_pass_fails_fast_when_ticket_is_locked_elsewhere() {
        let h = harness();
        seed_ticket(&h, "ticket-1");
        h.locks.acquire("ticket-1", "someone-else", 30).await.unwrap();

        let result = h
            .engine
            .run(&status_change_event("ticket-1"), ExecutionMode::Automatic)
            .await;
        assert!(matches!(result, Err(CoreError::Unavailable(_))));
    }
}
