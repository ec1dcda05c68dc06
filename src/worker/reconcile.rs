//! Daily reconciliation of platform usage-units into the app-wide cost row.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;

use crate::adapters::UsageClient;
use crate::domain::{Result, APP_AGENT_ID};
use crate::storage::Store;

/// Outcome surfaced to callers; failures are theirs to record, not ours to
/// raise past the audit row.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReconcileReport {
    pub x_usage_reconciled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x_usage_units: Option<i64>,
    pub usage_fetch_failed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage_error: Option<String>,
}

/// Writes usage-units and measured cost onto the `(agent 0, date)` row.
pub struct UsageReconciler {
    store: Store,
    unit_price: Option<Decimal>,
}

impl UsageReconciler {
    pub fn new(store: Store, unit_price: Option<Decimal>) -> Self {
        Self { store, unit_price }
    }

    /// Persist one day's units; `x_api_cost_actual = round2(units × price)`
    /// when a unit price is configured, else null.
    pub async fn reconcile_x_usage(
        &self,
        target_date: NaiveDate,
        units: i64,
        raw: &Value,
    ) -> Result<()> {
        let actual = self
            .unit_price
            .filter(|price| *price > Decimal::ZERO)
            .map(|price| (Decimal::from(units) * price).round_dp(2));
        self.store
            .record_usage(APP_AGENT_ID, target_date, units, raw, actual)
            .await
    }

    /// Fetch-and-persist convenience used by the workers. A missing client
    /// means usage accounting is disabled and reports as not-reconciled.
    pub async fn run(
        &self,
        usage_client: Option<&dyn UsageClient>,
        usage_date: NaiveDate,
    ) -> ReconcileReport {
        let Some(client) = usage_client else {
            return ReconcileReport::default();
        };

        let snapshot = match client.fetch_daily_usage(usage_date).await {
            Ok(snapshot) => snapshot,
            Err(err) => {
                return ReconcileReport {
                    usage_fetch_failed: true,
                    usage_error: Some(err.to_string()),
                    ..Default::default()
                }
            }
        };

        match self
            .reconcile_x_usage(usage_date, snapshot.units, &snapshot.raw)
            .await
        {
            Ok(()) => ReconcileReport {
                x_usage_reconciled: true,
                x_usage_units: Some(snapshot.units),
                ..Default::default()
            },
            Err(err) => ReconcileReport {
                usage_fetch_failed: true,
                usage_error: Some(err.to_string()),
                ..Default::default()
            },
        }
    }
}
