pub mod message;
pub mod sns;

#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    /// Publishes one message; returns the provider's message id when it reports one.
    async fn publish(&self, subject: &str, message: &str) -> anyhow::Result<Option<String>>;
}
