//! In-memory implementations of every port. They back the integration
//! tests and let embedders run the core without external infrastructure;
//! durable implementations belong to the surrounding application.

use crate::errors::{CoreError, CoreResult};
use crate::models::category::TicketCategory;
use crate::models::macros::{Macro, MacroExecution, MacroTrigger};
use crate::models::reply::TicketReply;
use crate::models::ticket::Ticket;
use crate::ports::{
    AgentDirectory, Clock, ExecutionLog, MacroStore, Notifier, TaskCollaborator, TicketLock,
    TicketStore, TimeService,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Default)]
pub struct MemoryTicketStore {
    tickets: Mutex<HashMap<String, Ticket>>,
    replies: Mutex<Vec<TicketReply>>,
    categories: Mutex<HashMap<String, TicketCategory>>,
    saves: AtomicUsize,
}

impl MemoryTicketStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a ticket without counting it as a save.
    pub fn insert_ticket(&self, ticket: Ticket) {
        lock(&self.tickets).insert(ticket.id.clone(), ticket);
    }

    pub fn insert_category(&self, category: TicketCategory) {
        lock(&self.categories).insert(category.id.clone(), category);
    }

    /// Number of `save` calls since construction, for asserting that a dry
    /// run mutated nothing.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    pub fn reply_count(&self) -> usize {
        lock(&self.replies).len()
    }
}

#[async_trait]
impl TicketStore for MemoryTicketStore {
    async fn get(&self, ticket_id: &str) -> CoreResult<Ticket> {
        lock(&self.tickets)
            .get(ticket_id)
            .cloned()
            .ok_or_else(|| CoreError::NotFound(format!("Ticket not found: {ticket_id}")))
    }

    async fn save(&self, ticket: &Ticket) -> CoreResult<()> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        lock(&self.tickets).insert(ticket.id.clone(), ticket.clone());
        Ok(())
    }

    async fn append_reply(&self, reply: &TicketReply) -> CoreResult<()> {
        lock(&self.replies).push(reply.clone());
        Ok(())
    }

    async fn replies(&self, ticket_id: &str) -> CoreResult<Vec<TicketReply>> {
        Ok(lock(&self.replies)
            .iter()
            .filter(|r| r.ticket_id == ticket_id)
            .cloned()
            .collect())
    }

    async fn first_public_reply_at(&self, ticket_id: &str) -> CoreResult<Option<DateTime<Utc>>> {
        Ok(lock(&self.replies)
            .iter()
            .filter(|r| r.ticket_id == ticket_id && !r.is_internal)
            .map(|r| r.created_at)
            .min())
    }

    async fn list_open_tickets(&self) -> CoreResult<Vec<Ticket>> {
        Ok(lock(&self.tickets)
            .values()
            .filter(|t| !t.status.is_terminal())
            .cloned()
            .collect())
    }

    async fn get_category(&self, category_id: &str) -> CoreResult<Option<TicketCategory>> {
        Ok(lock(&self.categories).get(category_id).cloned())
    }
}

#[derive(Default)]
pub struct MemoryMacroStore {
    macros: Mutex<HashMap<String, Macro>>,
}

impl MemoryMacroStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, macro_def: Macro) {
        lock(&self.macros).insert(macro_def.id.clone(), macro_def);
    }
}

#[async_trait]
impl MacroStore for MemoryMacroStore {
    async fn list_active_by_trigger(&self, trigger: MacroTrigger) -> CoreResult<Vec<Macro>> {
        Ok(lock(&self.macros)
            .values()
            .filter(|m| m.active && m.trigger == trigger)
            .cloned()
            .collect())
    }

    async fn get(&self, macro_id: &str) -> CoreResult<Macro> {
        lock(&self.macros)
            .get(macro_id)
            .cloned()
            .ok_or_else(|| CoreError::NotFound(format!("Macro not found: {macro_id}")))
    }

    async fn save(&self, macro_def: &Macro) -> CoreResult<()> {
        lock(&self.macros).insert(macro_def.id.clone(), macro_def.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryExecutionLog {
    records: Mutex<Vec<MacroExecution>>,
}

impl MemoryExecutionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<MacroExecution> {
        lock(&self.records).clone()
    }
}

#[async_trait]
impl ExecutionLog for MemoryExecutionLog {
    async fn append(&self, execution: &MacroExecution) -> CoreResult<()> {
        lock(&self.records).push(execution.clone());
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SentEmail {
    pub recipient: String,
    pub template: String,
    pub variables: HashMap<String, String>,
}

/// Notifier that records accepted messages and can be told to fail, for
/// exercising the failed-outcome paths.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<SentEmail>>,
    fail: AtomicBool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_next_sends(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<SentEmail> {
        lock(&self.sent).clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send_email(
        &self,
        recipient: &str,
        template: &str,
        variables: &HashMap<String, String>,
    ) -> CoreResult<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(CoreError::Unavailable("email delivery failed".to_string()));
        }
        lock(&self.sent).push(SentEmail {
            recipient: recipient.to_string(),
            template: template.to_string(),
            variables: variables.clone(),
        });
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreatedTask {
    pub ticket_id: String,
    pub description: String,
    pub assignee: Option<String>,
}

#[derive(Default)]
pub struct RecordingTasks {
    created: Mutex<Vec<CreatedTask>>,
    fail: AtomicBool,
}

impl RecordingTasks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_next_creates(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn created(&self) -> Vec<CreatedTask> {
        lock(&self.created).clone()
    }
}

#[async_trait]
impl TaskCollaborator for RecordingTasks {
    async fn create_follow_up_task(
        &self,
        ticket_id: &str,
        description: &str,
        assignee: Option<&str>,
    ) -> CoreResult<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(CoreError::Unavailable("task system unavailable".to_string()));
        }
        lock(&self.created).push(CreatedTask {
            ticket_id: ticket_id.to_string(),
            description: description.to_string(),
            assignee: assignee.map(str::to_string),
        });
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryAgentDirectory {
    agents: Mutex<HashSet<String>>,
}

impl MemoryAgentDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_agent(&self, agent_id: &str) {
        lock(&self.agents).insert(agent_id.to_string());
    }
}

#[async_trait]
impl AgentDirectory for MemoryAgentDirectory {
    async fn agent_exists(&self, agent_id: &str) -> CoreResult<bool> {
        Ok(lock(&self.agents).contains(agent_id))
    }
}

/// Clock that only moves when told to, so SLA breach logic is testable
/// without real delays.
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *lock(&self.now) = now;
    }

    pub fn advance(&self, duration: chrono::Duration) {
        let mut now = lock(&self.now);
        *now += duration;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *lock(&self.now)
    }
}

/// Keyed lock honoring the acquire/release contract of `TicketLock`.
/// TTLs are ignored; an in-process owner cannot crash without the whole
/// process going with it.
#[derive(Default)]
pub struct MemoryTicketLock {
    held: Mutex<HashMap<String, String>>,
}

impl MemoryTicketLock {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TicketLock for MemoryTicketLock {
    async fn acquire(&self, key: &str, owner: &str, _ttl_seconds: u64) -> CoreResult<bool> {
        let mut held = lock(&self.held);
        match held.get(key) {
            Some(current) if current != owner => Ok(false),
            _ => {
                held.insert(key.to_string(), owner.to_string());
                Ok(true)
            }
        }
    }

    async fn release(&self, key: &str, owner: &str) -> CoreResult<()> {
        let mut held = lock(&self.held);
        if held.get(key).map(String::as_str) == Some(owner) {
            held.remove(key);
        }
        Ok(())
    }
}

/// TimeService that returns immediately, for driving the scanner loop in
/// tests without waiting out the interval.
#[derive(Debug, Clone, Copy, Default)]
pub struct InstantTime;

#[async_trait]
impl TimeService for InstantTime {
    async fn sleep(&self, _duration: Duration) {}
}
