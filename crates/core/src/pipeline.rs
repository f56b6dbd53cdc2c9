use crate::billing::BillingClient;
use crate::call::CallPolicy;
use crate::domain::cost::{AlertBatch, ArtifactLocation, CostRecord};
use crate::error::{Stage, StageError};
use crate::notify::message::{self, Notification};
use crate::notify::Notifier;
use crate::report::{classify, export, flatten};
use crate::storage::ReportStore;
use crate::time::window::{QueryWindow, DEFAULT_WINDOW_DAYS, MAX_WINDOW_DAYS};
use anyhow::Context;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

// The threshold has been both 2 and 50 in past deployments. 50 matches the alert wording;
// operators override it with COST_THRESHOLD.
const DEFAULT_THRESHOLD_USD: i64 = 50;

pub fn default_threshold() -> Decimal {
    Decimal::from(DEFAULT_THRESHOLD_USD)
}

#[derive(Debug, Clone)]
pub struct ReportOptions {
    /// Records strictly above this amount are alerted on.
    pub threshold: Decimal,

    /// Lookback length in days.
    pub window_days: u32,

    /// Optional key prefix ("folder") inside the bucket.
    pub key_prefix: Option<String>,

    pub call: CallPolicy,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
            window_days: DEFAULT_WINDOW_DAYS,
            key_prefix: None,
            call: CallPolicy::default(),
        }
    }
}

impl ReportOptions {
    pub fn from_env() -> anyhow::Result<Self> {
        let mut out = Self {
            call: CallPolicy::from_env()?,
            ..Self::default()
        };

        if let Ok(s) = std::env::var("COST_THRESHOLD") {
            out.threshold = crate::report::flatten::parse_amount(&s)
                .context("COST_THRESHOLD must be a decimal amount")?;
        }

        if let Ok(s) = std::env::var("REPORT_WINDOW_DAYS") {
            out.window_days = s
                .trim()
                .parse::<u32>()
                .with_context(|| format!("REPORT_WINDOW_DAYS is not an integer: {s}"))?;
        }

        if let Ok(s) = std::env::var("REPORT_KEY_PREFIX") {
            out.key_prefix = Some(s).filter(|s| !s.trim().is_empty());
        }

        out.validate()?;
        Ok(out)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            !self.threshold.is_sign_negative(),
            "threshold must be >= 0 (got {})",
            self.threshold
        );
        anyhow::ensure!(
            (1..=MAX_WINDOW_DAYS).contains(&self.window_days),
            "window_days must be 1..={MAX_WINDOW_DAYS} (got {})",
            self.window_days
        );
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    ReportGenerated,
    HighCostAlert,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum NotificationOutcome {
    Published {
        kind: NotificationKind,
        message_id: Option<String>,
    },
    Failed {
        kind: NotificationKind,
        error: String,
    },
}

impl NotificationOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, NotificationOutcome::Failed { .. })
    }
}

/// Result of one invocation. `records` is the full report in source order.
#[derive(Debug, Clone, Serialize)]
pub struct ReportRun {
    pub report_date: NaiveDate,
    pub window: QueryWindow,
    pub location: ArtifactLocation,
    pub records: Vec<CostRecord>,
    pub alerts: AlertBatch,
    pub notifications: Vec<NotificationOutcome>,
}

impl ReportRun {
    pub fn notify_failures(&self) -> impl Iterator<Item = &NotificationOutcome> {
        self.notifications.iter().filter(|n| n.is_failed())
    }
}

/// Query and transform only; shared by the full run and dry runs.
pub async fn fetch_records(
    billing: &dyn BillingClient,
    window: &QueryWindow,
    call: &CallPolicy,
) -> anyhow::Result<Vec<CostRecord>> {
    let resp = call
        .run("billing_query", || billing.get_daily_costs(window))
        .await
        .with_context(|| format!("{} query failed", billing.provider_name()))?;
    flatten(&resp, window)
}

pub struct ReportJob<'a> {
    pub billing: &'a dyn BillingClient,
    pub store: &'a dyn ReportStore,
    pub notifier: &'a dyn Notifier,
    pub options: &'a ReportOptions,
}

impl ReportJob<'_> {
    /// Query, persist, then notify. Query and persist failures are returned as a `StageError`;
    /// notification failures are recorded on the returned run.
    pub async fn run(&self, report_date: NaiveDate) -> anyhow::Result<ReportRun> {
        let opts = self.options;
        let window = QueryWindow::trailing(report_date, opts.window_days)?;

        let records = fetch_records(self.billing, &window, &opts.call)
            .await
            .map_err(|e| StageError::new(Stage::Query, &e))?;
        let alerts = classify(&records, opts.threshold);

        tracing::info!(
            %report_date,
            window_start = %window.start,
            window_end = %window.end,
            records = records.len(),
            alerts = alerts.len(),
            "billing data fetched"
        );

        let location = self
            .persist(report_date, &records)
            .await
            .map_err(|e| StageError::new(Stage::Persist, &e))?;

        tracing::info!(%report_date, %location, "cost report stored");

        let mut notifications = Vec::with_capacity(2);
        notifications.push(
            self.notify(
                NotificationKind::ReportGenerated,
                message::report_notice(&location, opts.window_days),
            )
            .await,
        );
        if !alerts.is_empty() {
            notifications.push(
                self.notify(NotificationKind::HighCostAlert, message::high_cost_alert(&alerts))
                    .await,
            );
        }

        Ok(ReportRun {
            report_date,
            window,
            location,
            records,
            alerts,
            notifications,
        })
    }

    async fn persist(
        &self,
        report_date: NaiveDate,
        records: &[CostRecord],
    ) -> anyhow::Result<ArtifactLocation> {
        let artifact =
            export::build_artifact(self.options.key_prefix.as_deref(), report_date, records)?;
        self.options
            .call
            .run("report_store", || self.store.put_report(&artifact))
            .await
    }

    async fn notify(&self, kind: NotificationKind, n: Notification) -> NotificationOutcome {
        let res = self
            .options
            .call
            .run("notify", || self.notifier.publish(n.subject, &n.message))
            .await;

        match res {
            Ok(message_id) => {
                tracing::info!(?kind, message_id = message_id.as_deref(), "notification published");
                NotificationOutcome::Published { kind, message_id }
            }
            Err(err) => {
                let err = StageError::new(Stage::Notify, &err);
                tracing::warn!(?kind, error = %err, "notification failed; report is already stored");
                NotificationOutcome::Failed {
                    kind,
                    error: err.detail,
                }
            }
        }
    }
}
