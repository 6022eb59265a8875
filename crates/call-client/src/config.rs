//! Call client configuration.
//!
//! Configuration is loaded from environment variables with defaults for
//! everything except the replay script path, which only the binary needs.

use std::collections::HashMap;
use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

/// Default bound of the actor command mailbox.
pub const DEFAULT_MAILBOX_CAPACITY: usize = 500;

/// Default bound of the pre-join track update queue (replay policy only).
pub const DEFAULT_EARLY_TRACK_QUEUE_LIMIT: usize = 64;

/// Default author label for the local user's own chat messages.
pub const DEFAULT_SELF_CHAT_LABEL: &str = "Me";

/// Default tracing filter when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "call_client=info";

/// What to do with track notifications delivered before join completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EarlyTrackPolicy {
    /// Discard them.
    #[default]
    Drop,
    /// Queue them and apply in delivery order after joining.
    Replay,
}

impl fmt::Display for EarlyTrackPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EarlyTrackPolicy::Drop => f.write_str("drop"),
            EarlyTrackPolicy::Replay => f.write_str("replay"),
        }
    }
}

impl FromStr for EarlyTrackPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "drop" => Ok(EarlyTrackPolicy::Drop),
            "replay" => Ok(EarlyTrackPolicy::Replay),
            other => Err(ConfigError::InvalidValue(format!(
                "CALL_EARLY_TRACK_POLICY must be 'drop' or 'replay', got '{other}'"
            ))),
        }
    }
}

/// Call client configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Bound of the actor command mailbox (default: 500).
    pub mailbox_capacity: usize,

    /// Handling of track notifications that arrive before join (default: drop).
    pub early_track_policy: EarlyTrackPolicy,

    /// Maximum queued pre-join track notifications; oldest are dropped first.
    pub early_track_queue_limit: usize,

    /// Author label for the local user's own chat messages (default: "Me").
    pub self_chat_label: String,

    /// Fallback tracing filter.
    pub log_filter: String,

    /// Replay script for the binary.
    pub replay_script: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mailbox_capacity: DEFAULT_MAILBOX_CAPACITY,
            early_track_policy: EarlyTrackPolicy::default(),
            early_track_queue_limit: DEFAULT_EARLY_TRACK_QUEUE_LIMIT,
            self_chat_label: DEFAULT_SELF_CHAT_LABEL.to_string(),
            log_filter: DEFAULT_LOG_FILTER.to_string(),
            replay_script: None,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

fn parse_positive(
    vars: &HashMap<String, String>,
    key: &str,
    default: usize,
) -> Result<usize, ConfigError> {
    match vars.get(key) {
        None => Ok(default),
        Some(raw) => match raw.trim().parse::<usize>() {
            Ok(0) | Err(_) => Err(ConfigError::InvalidValue(format!(
                "{key} must be a positive integer, got '{raw}'"
            ))),
            Ok(value) => Ok(value),
        },
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a `HashMap` (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let mailbox_capacity =
            parse_positive(vars, "CALL_MAILBOX_CAPACITY", DEFAULT_MAILBOX_CAPACITY)?;

        let early_track_policy = vars
            .get("CALL_EARLY_TRACK_POLICY")
            .map(|s| s.parse::<EarlyTrackPolicy>())
            .transpose()?
            .unwrap_or_default();

        let early_track_queue_limit = parse_positive(
            vars,
            "CALL_EARLY_TRACK_QUEUE_LIMIT",
            DEFAULT_EARLY_TRACK_QUEUE_LIMIT,
        )?;

        let self_chat_label = vars
            .get("CALL_SELF_CHAT_LABEL")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_SELF_CHAT_LABEL.to_string());

        let log_filter = vars
            .get("CALL_LOG_FILTER")
            .cloned()
            .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());

        let replay_script = vars
            .get("CALL_REPLAY_SCRIPT")
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from);

        Ok(Config {
            mailbox_capacity,
            early_track_policy,
            early_track_queue_limit,
            self_chat_label,
            log_filter,
            replay_script,
        })
    }

    /// The replay script path, required by the binary.
    pub fn require_replay_script(&self) -> Result<&PathBuf, ConfigError> {
        self.replay_script
            .as_ref()
            .ok_or_else(|| ConfigError::MissingEnvVar("CALL_REPLAY_SCRIPT".to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_from_vars_success_with_defaults() {
        let config = Config::from_vars(&HashMap::new()).expect("Config should load successfully");

        assert_eq!(config, Config::default());
        assert_eq!(config.mailbox_capacity, DEFAULT_MAILBOX_CAPACITY);
        assert_eq!(config.early_track_policy, EarlyTrackPolicy::Drop);
        assert_eq!(config.self_chat_label, "Me");
        assert!(config.replay_script.is_none());
    }

    #[test]
    fn test_from_vars_success_with_custom_values() {
        let vars = HashMap::from([
            ("CALL_MAILBOX_CAPACITY".to_string(), "32".to_string()),
            ("CALL_EARLY_TRACK_POLICY".to_string(), "Replay".to_string()),
            ("CALL_EARLY_TRACK_QUEUE_LIMIT".to_string(), "8".to_string()),
            ("CALL_SELF_CHAT_LABEL".to_string(), "You".to_string()),
            ("CALL_LOG_FILTER".to_string(), "call_client=trace".to_string()),
            ("CALL_REPLAY_SCRIPT".to_string(), "/tmp/script.json".to_string()),
        ]);

        let config = Config::from_vars(&vars).expect("Config should load successfully");

        assert_eq!(config.mailbox_capacity, 32);
        assert_eq!(config.early_track_policy, EarlyTrackPolicy::Replay);
        assert_eq!(config.early_track_queue_limit, 8);
        assert_eq!(config.self_chat_label, "You");
        assert_eq!(config.log_filter, "call_client=trace");
        assert_eq!(
            config.require_replay_script().unwrap(),
            &PathBuf::from("/tmp/script.json")
        );
    }

    #[test]
    fn test_invalid_policy_rejected() {
        let vars = HashMap::from([(
            "CALL_EARLY_TRACK_POLICY".to_string(),
            "queue-forever".to_string(),
        )]);
        assert!(matches!(
            Config::from_vars(&vars),
            Err(ConfigError::InvalidValue(_))
        ));
    }

    #[test]
    fn test_zero_mailbox_capacity_rejected() {
        let vars = HashMap::from([("CALL_MAILBOX_CAPACITY".to_string(), "0".to_string())]);
        assert!(matches!(
            Config::from_vars(&vars),
            Err(ConfigError::InvalidValue(msg)) if msg.contains("CALL_MAILBOX_CAPACITY")
        ));
    }

    #[test]
    fn test_blank_chat_label_falls_back_to_default() {
        let vars = HashMap::from([("CALL_SELF_CHAT_LABEL".to_string(), "   ".to_string())]);
        let config = Config::from_vars(&vars).unwrap();
        assert_eq!(config.self_chat_label, DEFAULT_SELF_CHAT_LABEL);
    }

    #[test]
    fn test_missing_replay_script() {
        let config = Config::default();
        assert_eq!(
            config.require_replay_script(),
            Err(ConfigError::MissingEnvVar("CALL_REPLAY_SCRIPT".to_string()))
        );
    }
}
