use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// What the run reports as its answer when the step budget runs out.
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ExhaustionPolicy {
    #[default]
    LeaveEmpty,
    /// Use the text of the most recent successful tool observation.
    LastObservation,
}

impl FromStr for ExhaustionPolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "leave_empty" | "none" => Ok(ExhaustionPolicy::LeaveEmpty),
            "last_observation" => Ok(ExhaustionPolicy::LastObservation),
            other => Err(format!(
                "unknown exhaustion policy `{other}` (expected leave_empty or last_observation)"
            )),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct AgentConfig {
    pub max_steps: u32,
    /// Bound on the decision call and on every single tool attempt.
    pub step_timeout: Duration,
    /// Immediate retries after a retryable tool failure, per step.
    pub tool_retry_limit: u32,
    pub exhaustion: ExhaustionPolicy,
    pub max_observation_chars: usize,
    pub reject_repeated_calls: bool,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_steps: 10,
            step_timeout: Duration::from_secs(45),
            tool_retry_limit: 2,
            exhaustion: ExhaustionPolicy::LeaveEmpty,
            max_observation_chars: 10_000,
            reject_repeated_calls: false,
        }
    }
}

impl AgentConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.max_steps == 0 {
            return Err("max_steps must be greater than zero".to_string());
        }
        if self.step_timeout.is_zero() {
            return Err("step_timeout must be greater than zero".to_string());
        }
        if self.max_observation_chars == 0 {
            return Err("max_observation_chars must be greater than zero".to_string());
        }
        Ok(())
    }

    /// Applies `overrides` with `self` as the ceiling: a caller may tighten
    /// the budget but never raise it.
    pub fn merge(&self, overrides: &AgentOverrides) -> Self {
        Self {
            max_steps: overrides
                .max_steps
                .map_or(self.max_steps, |steps| steps.min(self.max_steps)),
            step_timeout: overrides
                .step_timeout
                .map_or(self.step_timeout, |timeout| timeout.min(self.step_timeout)),
            tool_retry_limit: overrides
                .tool_retry_limit
                .map_or(self.tool_retry_limit, |limit| limit.min(self.tool_retry_limit)),
            ..self.clone()
        }
    }
}

/// Per-request adjustments layered over a base [`AgentConfig`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AgentOverrides {
    pub max_steps: Option<u32>,
    pub step_timeout: Option<Duration>,
    pub tool_retry_limit: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_prefers_overrides() {
        let base = AgentConfig::default();
        let merged = base.merge(&AgentOverrides {
            max_steps: Some(3),
            step_timeout: None,
            tool_retry_limit: Some(0),
        });
        assert_eq!(merged.max_steps, 3);
        assert_eq!(merged.step_timeout, base.step_timeout);
        assert_eq!(merged.tool_retry_limit, 0);
    }

    #[test]
    fn merge_never_raises_the_base_budget() {
        let base = AgentConfig::default();
        let merged = base.merge(&AgentOverrides {
            max_steps: Some(20_000),
            step_timeout: Some(Duration::from_secs(u64::MAX)),
            tool_retry_limit: Some(u32::MAX),
        });
        assert_eq!(merged, base);
    }

    #[test]
    fn zero_budget_is_rejected() {
        let config = AgentConfig {
            max_steps: 0,
            ..AgentConfig::default()
        };
        assert!(config.validate().is_err());
        assert!(AgentConfig::default().validate().is_ok());
    }

    #[test]
    fn exhaustion_policy_parses_from_env_style_strings() {
        assert_eq!(
            "last-observation".parse::<ExhaustionPolicy>(),
            Ok(ExhaustionPolicy::LastObservation)
        );
        assert_eq!(
            "LEAVE_EMPTY".parse::<ExhaustionPolicy>(),
            Ok(ExhaustionPolicy::LeaveEmpty)
        );
        assert!("sometimes".parse::<ExhaustionPolicy>().is_err());
    }
}
