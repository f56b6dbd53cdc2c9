use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const UNBLENDED_COST: &str = "UnblendedCost";
pub const SERVICE_DIMENSION: &str = "SERVICE";

/// Grouped daily cost, shaped like the Cost Explorer `GetCostAndUsage` response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CostAndUsage {
    #[serde(default)]
    pub results_by_time: Vec<ResultByTime>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ResultByTime {
    pub time_period: TimePeriod,
    #[serde(default)]
    pub groups: Vec<CostGroup>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TimePeriod {
    pub start: String,
    pub end: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CostGroup {
    #[serde(default)]
    pub keys: Vec<String>,
    #[serde(default)]
    pub metrics: BTreeMap<String, MetricValue>,
}

/// Amounts stay as the decimal strings the API returns until they are parsed into `Decimal`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MetricValue {
    pub amount: String,
    #[serde(default)]
    pub unit: Option<String>,
}
