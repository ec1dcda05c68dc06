use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Account kind, one of the two billing shapes the platform supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    Individual,
    Business,
}

impl AccountType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Individual => "individual",
            Self::Business => "business",
        }
    }

    pub fn parse(value: &str) -> Self {
        match value {
            "individual" => Self::Individual,
            _ => Self::Business,
        }
    }
}

/// A tenant account; one-to-many with agents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    pub name: String,
    pub account_type: AccountType,
    /// Opaque API-key mapping; never interpreted beyond lookup.
    pub api_keys: Map<String, Value>,
    pub media_assets_path: String,
}

/// Runtime state of an agent. Only `active` agents are runnable; `stopped`
/// additionally carries stop metadata set by manual stop or auto-stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    Active,
    Paused,
    Disabled,
    Stopped,
}

impl AgentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Paused => "paused",
            Self::Disabled => "disabled",
            Self::Stopped => "stopped",
        }
    }

    pub fn parse(value: &str) -> Self {
        match value {
            "active" => Self::Active,
            "paused" => Self::Paused,
            "disabled" => Self::Disabled,
            _ => Self::Stopped,
        }
    }
}

/// A tenant's automation profile: one posting persona with its own budget,
/// toggles and guard state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    pub id: i64,
    pub account_id: i64,
    pub status: AgentStatus,
    /// Toggle bag; read only through the allowlisted resolver.
    pub feature_toggles: Map<String, Value>,
    pub daily_budget: i64,
    pub budget_split_x: i64,
    pub budget_split_llm: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stopped_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_until: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip() {
        for status in [
            AgentStatus::Active,
            AgentStatus::Paused,
            AgentStatus::Disabled,
            AgentStatus::Stopped,
        ] {
            assert_eq!(AgentStatus::parse(status.as_str()), status);
        }
    }
}
