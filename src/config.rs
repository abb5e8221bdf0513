use crate::eligibility::{EligibilityPolicy, DEFAULT_COOLDOWN_DAYS, MAX_COOLDOWN_DAYS};
use crate::lifecycle::ResolutionPolicy;
use serde::Deserialize;
use std::time::Duration;

/// Credit policy and runtime settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Config {
    /// Days between two credit requests of the same client.
    pub credit_cooldown_days: i64,
    /// Reject approvals that carry no score.
    pub require_score_on_approval: bool,
    /// Reject denials that carry no justification.
    pub require_justification_on_denial: bool,
    /// Idle time after which an unused per-client lock is dropped.
    pub client_lock_idle_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            credit_cooldown_days: DEFAULT_COOLDOWN_DAYS,
            require_score_on_approval: true,
            require_justification_on_denial: false,
            client_lock_idle_secs: 600,
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    ///
    /// Missing or blank keys take their default; malformed values fail.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let config = Self {
            credit_cooldown_days: match get("CREDIT_COOLDOWN_DAYS") {
                Some(raw) => raw
                    .trim()
                    .parse::<i64>()
                    .map_err(|_| anyhow::anyhow!("CREDIT_COOLDOWN_DAYS must be a whole number"))
                    .and_then(|days| {
                        if days < 1 {
                            anyhow::bail!("CREDIT_COOLDOWN_DAYS must be at least 1");
                        }
                        if days > MAX_COOLDOWN_DAYS {
                            anyhow::bail!(
                                "CREDIT_COOLDOWN_DAYS must be at most {}",
                                MAX_COOLDOWN_DAYS
                            );
                        }
                        Ok(days)
                    })?,
                None => defaults.credit_cooldown_days,
            },
            require_score_on_approval: match get("REQUIRE_SCORE_ON_APPROVAL") {
                Some(raw) => parse_flag("REQUIRE_SCORE_ON_APPROVAL", &raw)?,
                None => defaults.require_score_on_approval,
            },
            require_justification_on_denial: match get("REQUIRE_JUSTIFICATION_ON_DENIAL") {
                Some(raw) => parse_flag("REQUIRE_JUSTIFICATION_ON_DENIAL", &raw)?,
                None => defaults.require_justification_on_denial,
            },
            client_lock_idle_secs: match get("CLIENT_LOCK_IDLE_SECS") {
                Some(raw) => raw
                    .trim()
                    .parse::<u64>()
                    .map_err(|_| anyhow::anyhow!("CLIENT_LOCK_IDLE_SECS must be a positive number"))
                    .and_then(|secs| {
                        if secs == 0 {
                            anyhow::bail!("CLIENT_LOCK_IDLE_SECS must be at least 1");
                        }
                        Ok(secs)
                    })?,
                None => defaults.client_lock_idle_secs,
            },
        };

        tracing::info!("Configuration loaded successfully");
        tracing::debug!("Credit cooldown: {} days", config.credit_cooldown_days);
        tracing::debug!(
            "Resolution guards: score on approval = {}, justification on denial = {}",
            config.require_score_on_approval,
            config.require_justification_on_denial
        );

        Ok(config)
    }

    pub fn eligibility_policy(&self) -> EligibilityPolicy {
        EligibilityPolicy::with_cooldown_days(self.credit_cooldown_days)
    }

    pub fn resolution_policy(&self) -> ResolutionPolicy {
        ResolutionPolicy {
            require_score_on_approval: self.require_score_on_approval,
            require_justification_on_denial: self.require_justification_on_denial,
        }
    }

    pub fn client_lock_idle(&self) -> Duration {
        Duration::from_secs(self.client_lock_idle_secs)
    }
}

fn parse_flag(key: &str, raw: &str) -> anyhow::Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => anyhow::bail!("{} must be true or false", key),
    }
}
