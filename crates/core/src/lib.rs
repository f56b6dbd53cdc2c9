pub mod billing;
pub mod call;
pub mod domain;
pub mod error;
pub mod notify;
pub mod pipeline;
pub mod report;
pub mod storage;
pub mod time;

pub mod config {
    use anyhow::Context;

    pub const DEFAULT_BILLING_REGION: &str = "us-east-1";

    #[derive(Debug, Clone)]
    pub struct Settings {
        pub report_bucket: Option<String>,
        pub notify_topic_arn: Option<String>,
        pub billing_region: Option<String>,
        pub sentry_dsn: Option<String>,
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            Ok(Self {
                report_bucket: non_empty_var("REPORT_BUCKET"),
                notify_topic_arn: non_empty_var("NOTIFY_TOPIC_ARN"),
                billing_region: non_empty_var("BILLING_REGION"),
                sentry_dsn: non_empty_var("SENTRY_DSN"),
            })
        }

        pub fn require_report_bucket(&self) -> anyhow::Result<&str> {
            self.report_bucket
                .as_deref()
                .context("REPORT_BUCKET is required")
        }

        pub fn require_notify_topic_arn(&self) -> anyhow::Result<&str> {
            self.notify_topic_arn
                .as_deref()
                .context("NOTIFY_TOPIC_ARN is required")
        }

        /// Cost Explorer is only served from a single region, independent of where the job runs.
        pub fn billing_region(&self) -> &str {
            self.billing_region
                .as_deref()
                .unwrap_or(DEFAULT_BILLING_REGION)
        }
    }

    fn non_empty_var(name: &str) -> Option<String> {
        std::env::var(name)
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }
}
