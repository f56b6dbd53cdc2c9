pub mod s3;

use crate::domain::cost::{ArtifactLocation, ReportArtifact};

#[async_trait::async_trait]
pub trait ReportStore: Send + Sync {
    /// Writes the artifact under its key, replacing any object already stored there.
    async fn put_report(&self, artifact: &ReportArtifact) -> anyhow::Result<ArtifactLocation>;
}
