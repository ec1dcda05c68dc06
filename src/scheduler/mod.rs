//! Process-level scheduling: a daily cron trigger fanning the routine out
//! over active agents, and an interval trigger draining due posts.
//!
//! The scheduler itself is single-process; multi-instance scale comes from
//! the posting worker's row-locked claim, not from here.

use chrono::{DateTime, NaiveDate, Utc};
use cron::Schedule;
use serde_json::Value;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

use crate::config::Config;
use crate::controls::read_int_toggle;
use crate::domain::{DailyPdca, ErrorPayload, PostOpsError, Result};
use crate::storage::Store;
use crate::worker::{run_log, DailyRoutine, PostingWorker, METRICS_LAG_DAYS};

/// Cron + interval driver over the two workers.
pub struct Scheduler {
    store: Store,
    config: Config,
    routine: Arc<DailyRoutine>,
    posting: Arc<PostingWorker>,
}

impl Scheduler {
    pub fn new(
        store: Store,
        config: Config,
        routine: Arc<DailyRoutine>,
        posting: Arc<PostingWorker>,
    ) -> Self {
        Self {
            store,
            config,
            routine,
            posting,
        }
    }

    fn daily_schedule(&self) -> Result<Schedule> {
        let expr = format!(
            "0 {} {} * * *",
            self.config.worker.daily_minute, self.config.worker.daily_hour
        );
        Schedule::from_str(&expr)
            .map_err(|e| PostOpsError::config(format!("invalid daily schedule: {e}")))
    }

    /// Posting poll cadence: the minimum `posting_poll_seconds` toggle over
    /// active agents, floored by the configured default.
    async fn posting_poll_seconds(&self) -> Result<u64> {
        let mut seconds = self.config.worker.posting_poll_seconds;
        for agent in self.store.list_agents().await? {
            if agent.status == crate::domain::AgentStatus::Active {
                let toggle = read_int_toggle(
                    &agent,
                    "posting_poll_seconds",
                    self.config.worker.posting_poll_seconds as i64,
                );
                seconds = seconds.min(toggle.max(1) as u64);
            }
        }
        Ok(seconds.max(1))
    }

    /// Run the daily routine once for every active agent, id ascending. Each
    /// agent's outcome becomes one structured log event; failures are
    /// captured into an error PDCA and an error run-log file.
    pub async fn run_all_agents(&self, base_date: NaiveDate) -> Result<Vec<Value>> {
        let agent_ids = self.store.list_active_agent_ids().await?;
        let target_date = base_date - chrono::Duration::days(METRICS_LAG_DAYS);
        let mut results = Vec::new();

        for agent_id in agent_ids {
            let payload = match self.routine.run(agent_id, base_date).await {
                Ok(outcome) => {
                    info!(
                        event = "agent_daily_routine",
                        status = %outcome.status,
                        agent_id,
                        target_date = %outcome.target_date,
                        log_path = ?outcome.log_path,
                        "daily routine finished"
                    );
                    serde_json::json!({
                        "event": "agent_daily_routine",
                        "status": outcome.status,
                        "reason": outcome.reason,
                        "agent_id": agent_id,
                        "target_date": outcome.target_date,
                        "log_path": outcome.log_path,
                    })
                }
                Err(err) => {
                    let error_payload = ErrorPayload::new(err.kind(), err.to_string());
                    error!(
                        event = "agent_daily_routine",
                        agent_id,
                        error = %err,
                        "daily routine failed"
                    );
                    self.record_pdca_error(agent_id, target_date, &error_payload)
                        .await?;
                    let log_path = run_log::write_error_log(
                        &self.config.worker.log_dir,
                        agent_id,
                        target_date,
                        &error_payload,
                    )?;
                    serde_json::json!({
                        "event": "agent_daily_routine",
                        "status": "failed",
                        "agent_id": agent_id,
                        "target_date": target_date,
                        "log_path": log_path,
                        "error": error_payload,
                    })
                }
            };
            results.push(payload);
        }

        Ok(results)
    }

    async fn record_pdca_error(
        &self,
        agent_id: i64,
        target_date: NaiveDate,
        error: &ErrorPayload,
    ) -> Result<()> {
        let mut pdca = match self.store.get_pdca(agent_id, target_date).await? {
            Some(pdca) => pdca,
            None => DailyPdca::new(agent_id, target_date),
        };
        pdca.analytics_summary.error = Some(error.clone());
        pdca.analysis.status = Some("failed".to_string());
        self.store.upsert_pdca(&pdca).await
    }

    /// Run one posting batch now.
    pub async fn run_posting_once(&self, now: DateTime<Utc>) -> Result<Vec<Value>> {
        let results = self.posting.run(now).await?;
        Ok(results
            .into_iter()
            .map(|entry| serde_json::to_value(entry).unwrap_or(Value::Null))
            .collect())
    }

    /// Blocking scheduler loop: the daily cron slot in the worker timezone
    /// plus the posting poll interval.
    pub async fn run(&self) -> Result<()> {
        let schedule = self.daily_schedule()?;
        let tz = self.config.worker.timezone;
        let poll_seconds = self.posting_poll_seconds().await?;
        let active_count = self.store.list_active_agent_ids().await?.len();

        info!(
            event = "scheduler_start",
            timezone = %tz,
            poll_seconds,
            active_agent_count = active_count,
            "scheduler started"
        );

        let mut poll = tokio::time::interval(Duration::from_secs(poll_seconds));
        poll.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            let next_daily = schedule
                .upcoming(tz)
                .next()
                .ok_or_else(|| PostOpsError::internal("cron schedule yielded no next slot"))?;
            let until_daily = (next_daily.with_timezone(&Utc) - Utc::now())
                .to_std()
                .unwrap_or(Duration::ZERO);

            tokio::select! {
                _ = tokio::time::sleep(until_daily) => {
                    let base_date = Utc::now().with_timezone(&tz).date_naive();
                    if let Err(err) = self.run_all_agents(base_date).await {
                        error!(error = %err, "daily fan-out failed");
                    }
                }
                _ = poll.tick() => {
                    if let Err(err) = self.posting.run(Utc::now()).await {
                        error!(error = %err, "posting batch failed");
                    }
                }
            }
        }
    }
}
