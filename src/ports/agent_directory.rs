use crate::errors::CoreResult;
use async_trait::async_trait;

/// Lookup into the surrounding user system, used to reject `assign_agent`
/// and `escalate` actions naming unknown agents.
#[async_trait]
pub trait AgentDirectory: Send + Sync {
    async fn agent_exists(&self, agent_id: &str) -> CoreResult<bool>;
}
