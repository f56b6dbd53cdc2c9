use crate::billing::types::{CostAndUsage, UNBLENDED_COST};
use crate::domain::cost::{AlertBatch, CostRecord};
use crate::time::window::QueryWindow;
use anyhow::Context;
use chrono::NaiveDate;
use rust_decimal::Decimal;

/// Flattens the day -> service response into records, keeping source order.
pub fn flatten(resp: &CostAndUsage, window: &QueryWindow) -> anyhow::Result<Vec<CostRecord>> {
    let total_groups: usize = resp.results_by_time.iter().map(|d| d.groups.len()).sum();
    let mut out = Vec::with_capacity(total_groups);

    for day in &resp.results_by_time {
        let date = NaiveDate::parse_from_str(&day.time_period.start, "%Y-%m-%d")
            .with_context(|| format!("invalid TimePeriod.Start: {}", day.time_period.start))?;
        anyhow::ensure!(
            window.contains(date),
            "billing day {date} is outside the query window {}..{}",
            window.start,
            window.end
        );

        for group in &day.groups {
            let service = group
                .keys
                .first()
                .map(|s| s.trim())
                .filter(|s| !s.is_empty())
                .with_context(|| format!("cost group on {date} has no service key"))?;

            let metric = group.metrics.get(UNBLENDED_COST).with_context(|| {
                format!("cost group {service} on {date} has no {UNBLENDED_COST} metric")
            })?;

            let amount = parse_amount(&metric.amount).with_context(|| {
                format!("cost group {service} on {date} has an invalid amount")
            })?;

            out.push(CostRecord {
                date,
                service: service.to_string(),
                amount,
            });
        }
    }

    Ok(out)
}

/// Parses a decimal string exactly; scientific notation is accepted because the billing API
/// occasionally emits it for sub-cent amounts.
pub fn parse_amount(s: &str) -> anyhow::Result<Decimal> {
    let s = s.trim();
    s.parse::<Decimal>()
        .or_else(|_| Decimal::from_scientific(s))
        .with_context(|| format!("not a decimal amount: {s:?}"))
}

pub fn classify(records: &[CostRecord], threshold: Decimal) -> AlertBatch {
    AlertBatch {
        threshold,
        records: records
            .iter()
            .filter(|r| r.amount > threshold)
            .cloned()
            .collect(),
    }
}
