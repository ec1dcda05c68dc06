//! Allowlisted, range-checked reader over an agent's feature-toggle bag.
//!
//! Unknown keys are refused; invalid values emit one structured fallback
//! event and resolve to the default. Nothing else in the crate touches the
//! raw toggle map.

use once_cell::sync::Lazy;
use serde_json::Value;
use std::collections::HashMap;
use tracing::warn;

use crate::domain::Agent;

/// (min, max) inclusive ranges for the allowlisted integer toggles.
static TOGGLE_RULES: Lazy<HashMap<&'static str, (i64, i64)>> = Lazy::new(|| {
    HashMap::from([
        ("posts_per_day", (0, 20)),
        ("x_search_max", (0, 50)),
        ("web_search_max", (0, 50)),
        ("web_fetch_max", (0, 20)),
        ("posting_poll_seconds", (1, 86_400)),
        ("reply_quote_daily_max", (0, 100)),
    ])
});

fn toggle_fallback(agent_id: i64, key: &str, reason: &str, default: i64, raw: Option<&Value>) {
    let raw_repr = raw.map(|value| {
        let mut repr = value.to_string();
        repr.truncate(64);
        repr
    });
    warn!(
        event = "feature_toggle_fallback",
        agent_id,
        key,
        reason,
        default,
        raw = raw_repr.as_deref(),
        "feature toggle fallback"
    );
}

/// Read an integer toggle, falling back to `default` on unknown keys,
/// non-integer values or out-of-range values.
pub fn read_int_toggle(agent: &Agent, key: &str, default: i64) -> i64 {
    let Some((min, max)) = TOGGLE_RULES.get(key).copied() else {
        toggle_fallback(agent.id, key, "key_not_allowlisted", default, None);
        return default;
    };

    let Some(raw) = agent.feature_toggles.get(key) else {
        return default;
    };

    // Booleans are numbers in JSON-adjacent bags; refuse them explicitly.
    if raw.is_boolean() {
        toggle_fallback(agent.id, key, "invalid_int", default, Some(raw));
        return default;
    }

    let value = match raw {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    let Some(value) = value else {
        toggle_fallback(agent.id, key, "invalid_int", default, Some(raw));
        return default;
    };

    if value < min || value > max {
        toggle_fallback(agent.id, key, "out_of_range", default, Some(raw));
        return default;
    }

    value
}

/// Validate a toggle patch for the dashboard PATCH endpoint. Returns the
/// offending key on the first unknown key or invalid value.
pub fn validate_toggle_patch(patch: &serde_json::Map<String, Value>) -> Result<(), String> {
    for (key, raw) in patch {
        let Some((min, max)) = TOGGLE_RULES.get(key.as_str()).copied() else {
            return Err(key.clone());
        };
        if raw.is_boolean() {
            return Err(key.clone());
        }
        let value = match raw {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse::<i64>().ok(),
            _ => None,
        };
        match value {
            Some(value) if value >= min && value <= max => {}
            _ => return Err(key.clone()),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AgentStatus, Agent};

    fn agent_with_toggles(toggles: serde_json::Value) -> Agent {
        Agent {
            id: 7,
            account_id: 1,
            status: AgentStatus::Active,
            feature_toggles: toggles.as_object().cloned().unwrap_or_default(),
            daily_budget: 300,
            budget_split_x: 100,
            budget_split_llm: 200,
            stop_reason: None,
            stopped_at: None,
            stop_until: None,
        }
    }

    #[test]
    fn test_missing_key_uses_default() {
        let agent = agent_with_toggles(serde_json::json!({}));
        assert_eq!(read_int_toggle(&agent, "posts_per_day", 1), 1);
    }

    #[test]
    fn test_valid_value_is_read() {
        let agent = agent_with_toggles(serde_json::json!({"posts_per_day": 4}));
        assert_eq!(read_int_toggle(&agent, "posts_per_day", 1), 4);
    }

    #[test]
    fn test_string_value_is_coerced() {
        let agent = agent_with_toggles(serde_json::json!({"posts_per_day": "5"}));
        assert_eq!(read_int_toggle(&agent, "posts_per_day", 1), 5);
    }

    #[test]
    fn test_unknown_key_is_refused() {
        let agent = agent_with_toggles(serde_json::json!({"surprise": 4}));
        assert_eq!(read_int_toggle(&agent, "surprise", 9), 9);
    }

    #[test]
    fn test_out_of_range_falls_back() {
        let agent = agent_with_toggles(serde_json::json!({"posts_per_day": 9000}));
        assert_eq!(read_int_toggle(&agent, "posts_per_day", 1), 1);
        let agent = agent_with_toggles(serde_json::json!({"posting_poll_seconds": 0}));
        assert_eq!(read_int_toggle(&agent, "posting_poll_seconds", 60), 60);
    }

    #[test]
    fn test_bool_is_not_an_int() {
        let agent = agent_with_toggles(serde_json::json!({"posts_per_day": true}));
        assert_eq!(read_int_toggle(&agent, "posts_per_day", 1), 1);
    }

    #[test]
    fn test_patch_validation() {
        let ok = serde_json::json!({"posts_per_day": 3, "web_fetch_max": 0});
        assert!(validate_toggle_patch(ok.as_object().unwrap()).is_ok());

        let unknown = serde_json::json!({"nope": 3});
        assert_eq!(
            validate_toggle_patch(unknown.as_object().unwrap()),
            Err("nope".to_string())
        );

        let out_of_range = serde_json::json!({"reply_quote_daily_max": 101});
        assert!(validate_toggle_patch(out_of_range.as_object().unwrap()).is_err());
    }
}
