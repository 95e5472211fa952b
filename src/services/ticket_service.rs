use crate::config::{Config, SlaDefaults};
use crate::errors::{CoreError, CoreResult};
use crate::events::TriggerEvent;
use crate::models::macros::ExecutionMode;
use crate::models::reply::{CreateReply, TicketReply};
use crate::models::sla::{SlaLimits, SlaStatus};
use crate::models::ticket::{CreateTicket, Ticket, TicketStatus};
use crate::ports::{AgentDirectory, Clock, TicketStore};
use crate::services::macro_engine::MacroEngine;
use crate::services::{sla_clock, state_machine};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TicketServiceError {
    #[error(transparent)]
    Transition(#[from] state_machine::TransitionError),
    #[error(transparent)]
    Core(#[from] CoreError),
}

/// External entry points for ticket mutations. Every mutation that has a
/// trigger type runs its macro pass inline, so callers observe the full
/// cascade of effects before the call returns.
pub struct TicketService {
    tickets: Arc<dyn TicketStore>,
    agents: Arc<dyn AgentDirectory>,
    engine: Arc<MacroEngine>,
    clock: Arc<dyn Clock>,
    sla_defaults: SlaDefaults,
}

impl TicketService {
    pub fn new(
        tickets: Arc<dyn TicketStore>,
        agents: Arc<dyn AgentDirectory>,
        engine: Arc<MacroEngine>,
        clock: Arc<dyn Clock>,
        config: &Config,
    ) -> Self {
        Self {
            tickets,
            agents,
            engine,
            clock,
            sla_defaults: config.sla_defaults,
        }
    }

    pub async fn get_ticket(&self, ticket_id: &str) -> CoreResult<Ticket> {
        self.tickets.get(ticket_id).await
    }

    pub async fn create_ticket(&self, input: CreateTicket) -> CoreResult<Ticket> {
        input.validate().map_err(CoreError::Validation)?;

        if let Some(category_id) = &input.category_id {
            if self.tickets.get_category(category_id).await?.is_none() {
                return Err(CoreError::NotFound(format!(
                    "Category not found: {category_id}"
                )));
            }
        }

        let now = self.clock.now();
        let ticket = Ticket {
            id: uuid::Uuid::new_v4().to_string(),
            organization_id: input.organization_id,
            category_id: input.category_id,
            title: input.title,
            description: input.description,
            status: TicketStatus::Open,
            priority: input.priority,
            created_by: input.created_by,
            assignee: input.assignee,
            due_date: input.due_date,
            tags: vec![],
            created_at: now,
            resolved_at: None,
            updated_at: now,
        };
        self.tickets.save(&ticket).await?;

        tracing::info!(ticket_id = %ticket.id, organization_id = %ticket.organization_id, "ticket created");

        let event = TriggerEvent::TicketCreated {
            ticket_id: ticket.id.clone(),
        };
        self.engine.run(&event, ExecutionMode::Automatic).await?;

        // Intake macros may already have mutated the ticket.
        self.tickets.get(&ticket.id).await
    }

    /// Append a reply and run keyword macros against the ticket.
    ///
    /// A client reply on a resolved ticket does not reopen it; reopening is
    /// an explicit `change_status` call.
    pub async fn add_reply(&self, input: CreateReply) -> CoreResult<TicketReply> {
        input.validate().map_err(CoreError::Validation)?;

        let ticket = self.tickets.get(&input.ticket_id).await?;

        let reply = TicketReply {
            id: uuid::Uuid::new_v4().to_string(),
            ticket_id: ticket.id.clone(),
            author_id: input.author_id,
            content: input.content,
            is_internal: input.is_internal,
            attachments: input.attachments,
            created_at: self.clock.now(),
        };
        self.tickets.append_reply(&reply).await?;

        let event = TriggerEvent::ReplyAdded {
            ticket_id: ticket.id.clone(),
            reply_id: reply.id.clone(),
            author_id: reply.author_id.clone(),
        };
        self.engine.run(&event, ExecutionMode::Automatic).await?;

        Ok(reply)
    }

    /// Change a ticket's status through the state machine and run the
    /// resulting `status_change` pass before returning.
    pub async fn change_status(
        &self,
        ticket_id: &str,
        to: TicketStatus,
    ) -> Result<Ticket, TicketServiceError> {
        let ticket = self.tickets.get(ticket_id).await?;
        let (updated, event) = state_machine::transition(&ticket, to, self.clock.now())?;

        if let Some(event) = event {
            self.tickets.save(&updated).await?;
            self.engine.run(&event, ExecutionMode::Automatic).await?;
            Ok(self.tickets.get(ticket_id).await?)
        } else {
            // No-op transition: nothing to save, no pass to run.
            Ok(updated)
        }
    }

    pub async fn set_priority(
        &self,
        ticket_id: &str,
        priority: crate::models::ticket::TicketPriority,
    ) -> CoreResult<Ticket> {
        let ticket = self.tickets.get(ticket_id).await?;
        if ticket.priority == priority {
            return Ok(ticket);
        }

        let from = ticket.priority;
        let mut updated = ticket;
        updated.priority = priority;
        updated.updated_at = self.clock.now();
        self.tickets.save(&updated).await?;

        let event = TriggerEvent::PriorityChanged {
            ticket_id: updated.id.clone(),
            from,
            to: priority,
        };
        self.engine.run(&event, ExecutionMode::Automatic).await?;

        self.tickets.get(ticket_id).await
    }

    pub async fn assign(&self, ticket_id: &str, agent_id: Option<String>) -> CoreResult<Ticket> {
        if let Some(agent_id) = &agent_id {
            if !self.agents.agent_exists(agent_id).await? {
                return Err(CoreError::NotFound(format!("Agent not found: {agent_id}")));
            }
        }

        let mut updated = self.tickets.get(ticket_id).await?;
        updated.assignee = agent_id;
        updated.updated_at = self.clock.now();
        self.tickets.save(&updated).await?;
        Ok(updated)
    }

    pub async fn set_category(
        &self,
        ticket_id: &str,
        category_id: Option<String>,
    ) -> CoreResult<Ticket> {
        if let Some(category_id) = &category_id {
            if self.tickets.get_category(category_id).await?.is_none() {
                return Err(CoreError::NotFound(format!(
                    "Category not found: {category_id}"
                )));
            }
        }

        let mut updated = self.tickets.get(ticket_id).await?;
        if updated.category_id == category_id {
            return Ok(updated);
        }
        updated.category_id = category_id.clone();
        updated.updated_at = self.clock.now();
        self.tickets.save(&updated).await?;

        let event = TriggerEvent::CategoryChanged {
            ticket_id: updated.id.clone(),
            category_id,
        };
        self.engine.run(&event, ExecutionMode::Automatic).await?;

        self.tickets.get(ticket_id).await
    }

    /// On-demand SLA snapshot for one ticket.
    pub async fn sla_status(&self, ticket_id: &str) -> CoreResult<SlaStatus> {
        let ticket = self.tickets.get(ticket_id).await?;

        let limits = if let Some(category_id) = &ticket.category_id {
            match self.tickets.get_category(category_id).await? {
                Some(category) => category.sla_limits(),
                None => SlaLimits::from_defaults(&self.sla_defaults),
            }
        } else {
            SlaLimits::from_defaults(&self.sla_defaults)
        };

        let first_reply = self.tickets.first_public_reply_at(ticket_id).await?;
        Ok(sla_clock::evaluate(
            &ticket,
            first_reply,
            &limits,
            self.clock.now(),
        ))
    }
}
