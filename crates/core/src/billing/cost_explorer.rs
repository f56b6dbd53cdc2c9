use crate::billing::types::{
    CostAndUsage, CostGroup, MetricValue, ResultByTime, TimePeriod, SERVICE_DIMENSION,
    UNBLENDED_COST,
};
use crate::billing::BillingClient;
use crate::time::window::QueryWindow;
use anyhow::Context;
use aws_sdk_costexplorer::config::Region;
use aws_sdk_costexplorer::types::{DateInterval, Granularity, GroupDefinition, GroupDefinitionType};
use aws_sdk_costexplorer::Client;
use std::collections::BTreeMap;

const DATE_FORMAT: &str = "%Y-%m-%d";

// Guards against a token that never terminates.
const MAX_PAGES: usize = 100;

#[derive(Debug, Clone)]
pub struct CostExplorerBilling {
    client: Client,
    region: String,
}

impl CostExplorerBilling {
    /// Builds a client pinned to `region`, overriding whatever region the shared config carries.
    pub fn new(shared: &aws_config::SdkConfig, region: &str) -> Self {
        let conf = aws_sdk_costexplorer::config::Builder::from(shared)
            .region(Region::new(region.to_string()))
            .build();

        tracing::debug!(region, "cost explorer client initialized");

        Self {
            client: Client::from_conf(conf),
            region: region.to_string(),
        }
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    async fn fetch_page(
        &self,
        interval: DateInterval,
        next_page_token: Option<String>,
    ) -> anyhow::Result<(Vec<ResultByTime>, Option<String>)> {
        let out = self
            .client
            .get_cost_and_usage()
            .time_period(interval)
            .granularity(Granularity::Daily)
            .metrics(UNBLENDED_COST)
            .group_by(
                GroupDefinition::builder()
                    .r#type(GroupDefinitionType::Dimension)
                    .key(SERVICE_DIMENSION)
                    .build(),
            )
            .set_next_page_token(next_page_token)
            .send()
            .await
            .context("Cost Explorer GetCostAndUsage request failed")?;

        let mut results = Vec::with_capacity(out.results_by_time().len());
        for r in out.results_by_time() {
            results.push(convert_result(r)?);
        }

        Ok((results, out.next_page_token().map(str::to_string)))
    }
}

#[async_trait::async_trait]
impl BillingClient for CostExplorerBilling {
    fn provider_name(&self) -> &'static str {
        "aws_cost_explorer"
    }

    async fn get_daily_costs(&self, window: &QueryWindow) -> anyhow::Result<CostAndUsage> {
        let interval = DateInterval::builder()
            .start(window.start.format(DATE_FORMAT).to_string())
            .end(window.end.format(DATE_FORMAT).to_string())
            .build()
            .context("invalid Cost Explorer date interval")?;

        let mut out = CostAndUsage::default();
        let mut token: Option<String> = None;
        for page in 1..=MAX_PAGES {
            let (results, next) = self.fetch_page(interval.clone(), token).await?;
            tracing::debug!(page, days = results.len(), "cost explorer page received");
            out.results_by_time.extend(results);

            match next.filter(|t| !t.is_empty()) {
                Some(t) => token = Some(t),
                None => return Ok(out),
            }
        }

        anyhow::bail!("Cost Explorer pagination exceeded {MAX_PAGES} pages")
    }
}

fn convert_result(r: &aws_sdk_costexplorer::types::ResultByTime) -> anyhow::Result<ResultByTime> {
    let period = r
        .time_period()
        .context("Cost Explorer result is missing TimePeriod")?;

    let groups = r
        .groups()
        .iter()
        .map(|g| {
            let metrics: BTreeMap<String, MetricValue> = g
                .metrics()
                .map(|m| {
                    m.iter()
                        .filter_map(|(name, v)| {
                            Some((
                                name.clone(),
                                MetricValue {
                                    amount: v.amount()?.to_string(),
                                    unit: v.unit().map(str::to_string),
                                },
                            ))
                        })
                        .collect()
                })
                .unwrap_or_default();

            CostGroup {
                keys: g.keys().to_vec(),
                metrics,
            }
        })
        .collect();

    Ok(ResultByTime {
        time_period: TimePeriod {
            start: period.start().to_string(),
            end: period.end().to_string(),
        },
        groups,
    })
}
