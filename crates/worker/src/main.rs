use anyhow::Context;
use clap::Parser;
use costwatch_core::error::StageError;
use costwatch_core::pipeline::{ReportJob, ReportOptions, ReportRun};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "costwatch_worker")]
struct Args {
    /// Report date (YYYY-MM-DD). Defaults to today's UTC date.
    #[arg(long)]
    report_date: Option<String>,

    /// Alert on records strictly above this amount. Overrides COST_THRESHOLD.
    #[arg(long)]
    threshold: Option<String>,

    /// Lookback length in days. Overrides REPORT_WINDOW_DAYS.
    #[arg(long)]
    window_days: Option<u32>,

    /// Query and transform only; nothing is written or published.
    #[arg(long)]
    dry_run: bool,

    /// Print the run result as JSON on stdout.
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = costwatch_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();

    let res = tokio::select! {
        res = run(&args, &settings) => res,
        _ = shutdown_signal() => Err(anyhow::anyhow!("cost report cancelled by shutdown signal")),
    };

    if let Err(err) = &res {
        sentry_anyhow::capture_anyhow(err);
        match err.downcast_ref::<StageError>() {
            Some(stage_err) => {
                tracing::error!(stage = stage_err.stage.as_str(), error = %stage_err, "cost report run failed")
            }
            None => {
                let detail = format!("{err:#}");
                tracing::error!(error = %detail, "cost report run failed")
            }
        }
    }
    res
}

async fn run(args: &Args, settings: &costwatch_core::config::Settings) -> anyhow::Result<()> {
    let report_date = costwatch_core::time::window::resolve_report_date(
        args.report_date.as_deref(),
        chrono::Utc::now(),
    )?;

    let mut options = ReportOptions::from_env()?;
    if let Some(s) = args.threshold.as_deref() {
        options.threshold = costwatch_core::report::flatten::parse_amount(s)
            .context("--threshold must be a decimal amount")?;
    }
    if let Some(days) = args.window_days {
        options.window_days = days;
    }
    options.validate()?;

    let shared = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .load()
        .await;

    let billing = costwatch_core::billing::cost_explorer::CostExplorerBilling::new(
        &shared,
        settings.billing_region(),
    );

    if args.dry_run {
        let window =
            costwatch_core::time::window::QueryWindow::trailing(report_date, options.window_days)?;
        let records =
            costwatch_core::pipeline::fetch_records(&billing, &window, &options.call).await?;
        let alerts = costwatch_core::report::classify(&records, options.threshold);

        tracing::info!(
            %report_date,
            dry_run = true,
            records = records.len(),
            alerts = alerts.len(),
            "cost report (dry-run)"
        );
        if args.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&serde_json::json!({
                    "report_date": report_date,
                    "window": window,
                    "records": records,
                    "alerts": alerts,
                }))?
            );
        }
        return Ok(());
    }

    let store = costwatch_core::storage::s3::S3ReportStore::new(
        &shared,
        settings.require_report_bucket()?,
    );
    let notifier = costwatch_core::notify::sns::SnsNotifier::new(
        &shared,
        settings.require_notify_topic_arn()?,
    );

    let job = ReportJob {
        billing: &billing,
        store: &store,
        notifier: &notifier,
        options: &options,
    };
    let report = job.run(report_date).await?;

    log_summary(&report);
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    Ok(())
}

fn log_summary(report: &ReportRun) {
    let failed = report.notify_failures().count();
    if failed > 0 {
        tracing::warn!(
            report_date = %report.report_date,
            location = %report.location,
            failed_notifications = failed,
            "report stored but some notifications failed"
        );
    }

    tracing::info!(
        report_date = %report.report_date,
        location = %report.location,
        records = report.records.len(),
        alerts = report.alerts.len(),
        notifications = report.notifications.len(),
        "saved cost report and notified topic"
    );
}

fn init_sentry(settings: &costwatch_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(err) => {
                tracing::warn!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
