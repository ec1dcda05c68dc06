use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value;
use tracing::warn;

use crate::domain::{Agent, AgentStatus, AuditStatus, AutoStopNote, Result};
use crate::storage::Store;

/// Number of consecutive failures of one (source, event_type) that arms the
/// circuit breaker.
pub const AUTO_STOP_THRESHOLD: usize = 3;

/// Stop/resume guard and audit writer.
pub struct GuardManager {
    store: Store,
}

impl GuardManager {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// An agent is runnable iff it is `active` and any stop window has
    /// elapsed. Paused and disabled agents are never runnable and are not
    /// time-bounded.
    pub fn is_agent_runnable(&self, agent: &Agent, now: DateTime<Utc>) -> bool {
        if agent.status != AgentStatus::Active {
            return false;
        }
        match agent.stop_until {
            None => true,
            Some(stop_until) => stop_until <= now,
        }
    }

    /// Skip reason used by the gates: `agent_stopped` for stopped agents,
    /// `agent_status_<v>` otherwise.
    pub fn skip_reason(&self, agent: &Agent) -> String {
        if agent.status == AgentStatus::Stopped {
            "agent_stopped".to_string()
        } else {
            format!("agent_status_{}", agent.status.as_str())
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn record_audit(
        &self,
        agent_id: i64,
        target_date: NaiveDate,
        source: &str,
        event_type: &str,
        status: AuditStatus,
        reason: Option<&str>,
        payload: Value,
    ) -> Result<()> {
        self.store
            .insert_audit(
                agent_id,
                target_date,
                source,
                event_type,
                status,
                reason,
                &payload,
                Utc::now(),
            )
            .await
    }

    /// Count of trailing consecutive failures over the last
    /// [`AUTO_STOP_THRESHOLD`] audit rows of (source, event_type); zero
    /// unless the whole window failed.
    pub async fn consecutive_failures(
        &self,
        agent_id: i64,
        source: &str,
        event_type: &str,
    ) -> Result<usize> {
        let statuses = self
            .store
            .recent_audit_statuses(agent_id, source, event_type, AUTO_STOP_THRESHOLD as i64)
            .await?;
        if statuses.len() < AUTO_STOP_THRESHOLD {
            return Ok(0);
        }
        if statuses.iter().all(|status| *status == AuditStatus::Failed) {
            Ok(statuses.len())
        } else {
            Ok(0)
        }
    }

    /// Idempotent circuit breaker: an agent already stopped with the same
    /// reason is left untouched (no duplicate audit row). Otherwise the
    /// agent is stopped, a `auto_stop`/`triggered` audit row is appended and
    /// the day's analytics are annotated.
    pub async fn maybe_auto_stop(
        &self,
        agent_id: i64,
        now: DateTime<Utc>,
        reason: &str,
        source: &str,
        payload: Value,
    ) -> Result<Option<Agent>> {
        let Some(agent) = self.store.get_agent(agent_id).await? else {
            return Ok(None);
        };
        if agent.status == AgentStatus::Stopped && agent.stop_reason.as_deref() == Some(reason) {
            return Ok(Some(agent));
        }

        warn!(agent_id, reason, source, "auto-stopping agent");
        self.store.stop_agent(agent_id, reason, now, None).await?;
        self.record_audit(
            agent_id,
            now.date_naive(),
            source,
            "auto_stop",
            AuditStatus::Triggered,
            Some(reason),
            payload,
        )
        .await?;

        let today = now.date_naive();
        if let Some(mut pdca) = self.store.get_pdca(agent_id, today).await? {
            pdca.analytics_summary.auto_stop = Some(AutoStopNote {
                reason: reason.to_string(),
                source: source.to_string(),
            });
            self.store.upsert_pdca(&pdca).await?;
        }

        self.store.get_agent(agent_id).await
    }
}
