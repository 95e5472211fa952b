use crate::errors::CoreError;
use crate::models::macros::{ActionOutcome, ExecutionMode, MacroAction, OutcomeStatus};
use crate::models::reply::TicketReply;
use crate::models::ticket::Ticket;
use crate::ports::{AgentDirectory, Clock, Notifier, TaskCollaborator, TicketStore};
use crate::services::state_machine;
use regex::Regex;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use thiserror::Error;

/// Author id recorded on replies created by macro actions.
const AUTOMATION_AUTHOR: &str = "automation";

#[derive(Debug, Error)]
pub enum ActionError {
    #[error("Agent not found: {0}")]
    AgentNotFound(String),
    #[error(transparent)]
    Transition(#[from] state_machine::TransitionError),
    #[error("{0}")]
    Collaborator(String),
}

impl From<CoreError> for ActionError {
    fn from(err: CoreError) -> Self {
        ActionError::Collaborator(err.to_string())
    }
}

/// Applies one macro action to one ticket.
///
/// Every failure is converted into a `failed` outcome so an automation pass
/// always runs to completion and stays auditable; nothing here aborts the
/// remaining actions of a macro.
pub struct ActionExecutor {
    tickets: Arc<dyn TicketStore>,
    notifier: Arc<dyn Notifier>,
    tasks: Arc<dyn TaskCollaborator>,
    agents: Arc<dyn AgentDirectory>,
    clock: Arc<dyn Clock>,
}

impl ActionExecutor {
    pub fn new(
        tickets: Arc<dyn TicketStore>,
        notifier: Arc<dyn Notifier>,
        tasks: Arc<dyn TaskCollaborator>,
        agents: Arc<dyn AgentDirectory>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            tickets,
            notifier,
            tasks,
            agents,
            clock,
        }
    }

    /// Apply `action` to `ticket`. In dry-run mode nothing is mutated and
    /// no collaborator is called; the outcome is recorded as skipped.
    pub async fn apply(
        &self,
        ticket: &Ticket,
        action: &MacroAction,
        mode: ExecutionMode,
    ) -> ActionOutcome {
        if mode == ExecutionMode::DryRun {
            return ActionOutcome {
                action: action.kind().to_string(),
                status: OutcomeStatus::Skipped,
                message: "dry run".to_string(),
            };
        }

        match self.apply_inner(ticket, action).await {
            Ok(message) => {
                tracing::info!(
                    ticket_id = %ticket.id,
                    action = action.kind(),
                    "macro action applied"
                );
                ActionOutcome {
                    action: action.kind().to_string(),
                    status: OutcomeStatus::Success,
                    message,
                }
            }
            Err(err) => {
                tracing::warn!(
                    ticket_id = %ticket.id,
                    action = action.kind(),
                    error = %err,
                    "macro action failed"
                );
                ActionOutcome {
                    action: action.kind().to_string(),
                    status: OutcomeStatus::Failed,
                    message: err.to_string(),
                }
            }
        }
    }

    async fn apply_inner(
        &self,
        ticket: &Ticket,
        action: &MacroAction,
    ) -> Result<String, ActionError> {
        match action {
            MacroAction::AddReply {
                content,
                is_internal,
            } => {
                let reply = TicketReply {
                    id: uuid::Uuid::new_v4().to_string(),
                    ticket_id: ticket.id.clone(),
                    author_id: AUTOMATION_AUTHOR.to_string(),
                    content: render_template(content, ticket),
                    is_internal: *is_internal,
                    attachments: vec![],
                    created_at: self.clock.now(),
                };
                self.tickets.append_reply(&reply).await?;
                Ok("Reply added to ticket".to_string())
            }

            MacroAction::ChangeStatus { status } => {
                // Transitions requested by an action go through the same
                // state machine as external calls, but the resulting event
                // does not start a nested engine pass; later macros in the
                // current pass observe the change via the re-fetched
                // snapshot.
                let (updated, _event) =
                    state_machine::transition(ticket, *status, self.clock.now())?;
                self.tickets.save(&updated).await?;
                Ok(format!("Status changed to {status}"))
            }

            MacroAction::AssignAgent { agent_id } => {
                if !self.agents.agent_exists(agent_id).await? {
                    return Err(ActionError::AgentNotFound(agent_id.clone()));
                }
                let mut updated = ticket.clone();
                updated.assignee = Some(agent_id.clone());
                updated.updated_at = self.clock.now();
                self.tickets.save(&updated).await?;
                Ok(format!("Agent {agent_id} assigned to ticket"))
            }

            MacroAction::ChangePriority { priority } => {
                let mut updated = ticket.clone();
                updated.priority = *priority;
                updated.updated_at = self.clock.now();
                self.tickets.save(&updated).await?;
                Ok(format!("Priority changed to {priority}"))
            }

            MacroAction::AddTags { tags } => {
                let mut updated = ticket.clone();
                for tag in tags {
                    if !updated.tags.iter().any(|t| t.eq_ignore_ascii_case(tag)) {
                        updated.tags.push(tag.clone());
                    }
                }
                updated.updated_at = self.clock.now();
                self.tickets.save(&updated).await?;
                Ok(format!("Added {} tag(s)", tags.len()))
            }

            MacroAction::SendEmail {
                recipient,
                template,
                variables,
            } => {
                let recipient = recipient.as_deref().unwrap_or(&ticket.created_by);
                let mut rendered: HashMap<String, String> = variables
                    .iter()
                    .map(|(k, v)| (k.clone(), render_template(v, ticket)))
                    .collect();
                rendered
                    .entry("ticket_id".to_string())
                    .or_insert_with(|| ticket.id.clone());
                rendered
                    .entry("ticket_title".to_string())
                    .or_insert_with(|| ticket.title.clone());
                self.notifier
                    .send_email(recipient, template, &rendered)
                    .await?;
                Ok(format!("Email '{template}' sent to {recipient}"))
            }

            MacroAction::CreateTask {
                description,
                assignee,
            } => {
                self.tasks
                    .create_follow_up_task(
                        &ticket.id,
                        &render_template(description, ticket),
                        assignee.as_deref(),
                    )
                    .await?;
                Ok("Follow-up task created".to_string())
            }

            MacroAction::Escalate { assignee } => {
                if let Some(agent_id) = assignee {
                    if !self.agents.agent_exists(agent_id).await? {
                        return Err(ActionError::AgentNotFound(agent_id.clone()));
                    }
                }
                let mut updated = ticket.clone();
                updated.priority = ticket.priority.escalated();
                if let Some(agent_id) = assignee {
                    updated.assignee = Some(agent_id.clone());
                }
                updated.updated_at = self.clock.now();
                self.tickets.save(&updated).await?;
                Ok(format!("Ticket escalated to {} priority", updated.priority))
            }
        }
    }
}

/// Substitute `{{variable}}` placeholders against the current ticket
/// snapshot. Whitespace inside the braces is tolerated; unknown variables
/// are left intact for the reader to notice.
pub fn render_template(template: &str, ticket: &Ticket) -> String {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    let re = PLACEHOLDER.get_or_init(|| Regex::new(r"\{\{\s*(\w+)\s*\}\}").unwrap());

    re.replace_all(template, |caps: &regex::Captures<'_>| {
        match &caps[1] {
            "ticket_id" => ticket.id.clone(),
            "ticket_title" => ticket.title.clone(),
            "ticket_status" => ticket.status.to_string(),
            "ticket_priority" => ticket.priority.to_string(),
            _ => caps[0].to_string(),
        }
    })
    .into_owned()
}
