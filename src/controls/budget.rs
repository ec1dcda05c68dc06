use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::{Agent, PostOpsError, Result};
use crate::storage::Store;

/// Point-in-time view of committed spend, reservations and limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetStatus {
    pub total_spent: Decimal,
    pub x_spent: Decimal,
    pub llm_spent: Decimal,
    pub total_reserved: Decimal,
    pub x_reserved: Decimal,
    pub llm_reserved: Decimal,
    pub daily_limit: Decimal,
    pub x_limit: Decimal,
    pub llm_limit: Decimal,
}

/// Two-phase budget accounting for one (agent, date).
///
/// Reservations live in memory until [`BudgetLedger::commit`] folds them into
/// the agent-day cost row; a dropped ledger loses its uncommitted
/// reservations. One instance per task — the ledger is deliberately not
/// shared across concurrent workers, the cost-row transaction is the
/// cross-task arbiter.
pub struct BudgetLedger {
    store: Store,
    agent_id: i64,
    target_date: NaiveDate,
    daily_limit: Decimal,
    x_limit: Decimal,
    llm_limit: Decimal,
    x_reserved: Decimal,
    llm_reserved: Decimal,
}

impl BudgetLedger {
    pub fn new(
        store: Store,
        agent_id: i64,
        target_date: NaiveDate,
        daily_budget: i64,
        split_x: i64,
        split_llm: i64,
    ) -> Self {
        Self {
            store,
            agent_id,
            target_date,
            daily_limit: Decimal::from(daily_budget),
            x_limit: Decimal::from(split_x),
            llm_limit: Decimal::from(split_llm),
            x_reserved: Decimal::ZERO,
            llm_reserved: Decimal::ZERO,
        }
    }

    pub fn for_agent(store: Store, agent: &Agent, target_date: NaiveDate) -> Self {
        Self::new(
            store,
            agent.id,
            target_date,
            agent.daily_budget,
            agent.budget_split_x,
            agent.budget_split_llm,
        )
    }

    async fn spent(&self) -> Result<(Decimal, Decimal, Decimal)> {
        self.store.sum_costs(self.agent_id, self.target_date).await
    }

    /// Reserve against all three caps jointly; nothing is persisted.
    pub async fn reserve(&mut self, x_cost: Decimal, llm_cost: Decimal) -> Result<()> {
        let (x_spent, llm_spent, total_spent) = self.spent().await?;
        let next_x = x_spent + self.x_reserved + x_cost;
        let next_llm = llm_spent + self.llm_reserved + llm_cost;
        let next_total = total_spent + self.x_reserved + self.llm_reserved + x_cost + llm_cost;

        if next_x > self.x_limit || next_llm > self.llm_limit || next_total > self.daily_limit {
            return Err(PostOpsError::BudgetExceeded { x_cost, llm_cost });
        }

        self.x_reserved += x_cost;
        self.llm_reserved += llm_cost;
        Ok(())
    }

    /// Fold reservations into the cost row; no-op when nothing is reserved.
    pub async fn commit(&mut self) -> Result<()> {
        if self.x_reserved.is_zero() && self.llm_reserved.is_zero() {
            return Ok(());
        }
        self.store
            .add_costs(
                self.agent_id,
                self.target_date,
                self.x_reserved,
                self.llm_reserved,
            )
            .await?;
        self.x_reserved = Decimal::ZERO;
        self.llm_reserved = Decimal::ZERO;
        Ok(())
    }

    pub async fn status(&self) -> Result<BudgetStatus> {
        let (x_spent, llm_spent, total_spent) = self.spent().await?;
        Ok(BudgetStatus {
            total_spent,
            x_spent,
            llm_spent,
            total_reserved: self.x_reserved + self.llm_reserved,
            x_reserved: self.x_reserved,
            llm_reserved: self.llm_reserved,
            daily_limit: self.daily_limit,
            x_limit: self.x_limit,
            llm_limit: self.llm_limit,
        })
    }
}
