use crate::errors::CoreResult;
use async_trait::async_trait;

/// Follow-up task collaborator backing the `create_task` action.
#[async_trait]
pub trait TaskCollaborator: Send + Sync {
    async fn create_follow_up_task(
        &self,
        ticket_id: &str,
        description: &str,
        assignee: Option<&str>,
    ) -> CoreResult<()>;
}
