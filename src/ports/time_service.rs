use async_trait::async_trait;
use std::time::Duration;

/// Pacing for background loops, separate from `Clock` so tests can drive
/// the scanner without sleeping.
#[async_trait]
pub trait TimeService: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TokioTime;

#[async_trait]
impl TimeService for TokioTime {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
