use crate::errors::CoreResult;
use async_trait::async_trait;
use std::collections::HashMap;

/// Email delivery collaborator. A successful return means the message was
/// accepted for delivery, not that it arrived; the engine records the action
/// as succeeded on handoff.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_email(
        &self,
        recipient: &str,
        template: &str,
        variables: &HashMap<String, String>,
    ) -> CoreResult<()>;
}
