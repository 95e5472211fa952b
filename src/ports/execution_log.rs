use crate::errors::CoreResult;
use crate::models::macros::MacroExecution;
use async_trait::async_trait;

/// Append-only audit log of macro executions. Records are never updated.
#[async_trait]
pub trait ExecutionLog: Send + Sync {
    async fn append(&self, execution: &MacroExecution) -> CoreResult<()>;
}
