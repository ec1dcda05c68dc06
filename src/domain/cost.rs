use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Reserved agent id for app-wide cost rollups (usage reconciliation).
pub const APP_AGENT_ID: i64 = 0;

/// One row per (agent, date). Mutated only by ledger commits and the usage
/// reconciler, always under a read-modify-write transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostLog {
    pub id: i64,
    pub agent_id: i64,
    pub date: NaiveDate,
    pub x_api_cost: Decimal,
    pub x_api_cost_estimate: Decimal,
    pub llm_cost: Decimal,
    pub image_gen_cost: Decimal,
    pub total: Decimal,
    pub x_usage_units: i64,
    pub x_usage_raw: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x_api_cost_actual: Option<Decimal>,
}

impl CostLog {
    pub fn empty(agent_id: i64, date: NaiveDate) -> Self {
        Self {
            id: 0,
            agent_id,
            date,
            x_api_cost: Decimal::ZERO,
            x_api_cost_estimate: Decimal::ZERO,
            llm_cost: Decimal::ZERO,
            image_gen_cost: Decimal::ZERO,
            total: Decimal::ZERO,
            x_usage_units: 0,
            x_usage_raw: Value::Object(Default::default()),
            x_api_cost_actual: None,
        }
    }
}
