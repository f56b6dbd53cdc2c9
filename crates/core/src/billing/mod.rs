pub mod cost_explorer;
pub mod types;

use crate::billing::types::CostAndUsage;
use crate::time::window::QueryWindow;

#[async_trait::async_trait]
pub trait BillingClient: Send + Sync {
    fn provider_name(&self) -> &'static str;

    /// Daily unblended cost grouped by service for `window`, in the order the API returns it.
    async fn get_daily_costs(&self, window: &QueryWindow) -> anyhow::Result<CostAndUsage>;
}
