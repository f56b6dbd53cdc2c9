use crate::notify::Notifier;
use anyhow::Context;
use aws_sdk_sns::Client;

#[derive(Debug, Clone)]
pub struct SnsNotifier {
    client: Client,
    topic_arn: String,
}

impl SnsNotifier {
    pub fn new(shared: &aws_config::SdkConfig, topic_arn: &str) -> Self {
        tracing::debug!(topic_arn, "SNS notifier initialized");
        Self {
            client: Client::new(shared),
            topic_arn: topic_arn.to_string(),
        }
    }
}

#[async_trait::async_trait]
impl Notifier for SnsNotifier {
    async fn publish(&self, subject: &str, message: &str) -> anyhow::Result<Option<String>> {
        let out = self
            .client
            .publish()
            .topic_arn(&self.topic_arn)
            .subject(subject)
            .message(message)
            .send()
            .await
            .with_context(|| format!("SNS Publish failed (topic={})", self.topic_arn))?;

        Ok(out.message_id().map(str::to_string))
    }
}
