//! Process configuration, read once from the environment at start-up.
//!
//! | variable | values | default |
//! |---|---|---|
//! | `GRADEBOOKD_PUBLISH_POLICY` | `warn`, `block` | `warn` |
//! | `GRADEBOOKD_GRADE_SCALE` | `cbse`, `school` | `cbse` |
//! | `GRADEBOOKD_LOG` | `EnvFilter` directives | `RUST_LOG`, then `gradebookd=info` |
//! | `GRADEBOOKD_LOG_FORMAT` | `pretty`, `compact`, `json` | `compact` |

use anyhow::{anyhow, Context, Result};

use crate::gradebook::PublishPolicy;
use crate::grading::GradeScale;
use crate::logging::LogFormat;

pub const PUBLISH_POLICY_ENV: &str = "GRADEBOOKD_PUBLISH_POLICY";
pub const GRADE_SCALE_ENV: &str = "GRADEBOOKD_GRADE_SCALE";
pub const LOG_FILTER_ENV: &str = "GRADEBOOKD_LOG";
pub const LOG_FORMAT_ENV: &str = "GRADEBOOKD_LOG_FORMAT";

const DEFAULT_LOG_FILTER: &str = "gradebookd=info";

#[derive(Debug, Clone)]
pub struct Config {
    pub publish_policy: PublishPolicy,
    pub grade_scale: GradeScale,
    pub log_filter: String,
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            publish_policy: PublishPolicy::default(),
            grade_scale: GradeScale::cbse(),
            log_filter: DEFAULT_LOG_FILTER.to_string(),
            log_format: LogFormat::default(),
        }
    }
}

impl Config {
    /// Loads `.env` if present, then the process environment.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from any key lookup; unset or blank keys keep defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut cfg = Self::default();

        if let Some(v) = get(PUBLISH_POLICY_ENV) {
            cfg.publish_policy = v
                .parse()
                .map_err(|e: String| anyhow!(e))
                .with_context(|| format!("invalid {PUBLISH_POLICY_ENV}"))?;
        }
        if let Some(v) = get(GRADE_SCALE_ENV) {
            cfg.grade_scale =
                GradeScale::by_name(&v).with_context(|| format!("invalid {GRADE_SCALE_ENV}"))?;
        }
        if let Some(v) = get(LOG_FILTER_ENV).or_else(|| get("RUST_LOG")) {
            cfg.log_filter = v;
        }
        if let Some(v) = get(LOG_FORMAT_ENV) {
            cfg.log_format = v
                .parse()
                .map_err(|e: String| anyhow!(e))
                .with_context(|| format!("invalid {LOG_FORMAT_ENV}"))?;
        }
        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let cfg = Config::from_lookup(lookup(&[])).expect("config");
        assert_eq!(cfg.publish_policy, PublishPolicy::Warn);
        assert_eq!(cfg.grade_scale.name(), "cbse");
        assert_eq!(cfg.log_filter, "gradebookd=info");
        assert_eq!(cfg.log_format, LogFormat::Compact);
    }

    #[test]
    fn reads_overrides() {
        let cfg = Config::from_lookup(lookup(&[
            (PUBLISH_POLICY_ENV, "Block"),
            (GRADE_SCALE_ENV, "school"),
            ("RUST_LOG", "debug"),
            (LOG_FORMAT_ENV, "json"),
        ]))
        .expect("config");
        assert_eq!(cfg.publish_policy, PublishPolicy::Block);
        assert_eq!(cfg.grade_scale.name(), "school");
        assert_eq!(cfg.log_filter, "debug");
        assert_eq!(cfg.log_format, LogFormat::Json);
    }

    #[test]
    fn rejects_unknown_values() {
        assert!(Config::from_lookup(lookup(&[(PUBLISH_POLICY_ENV, "sometimes")])).is_err());
        assert!(Config::from_lookup(lookup(&[(GRADE_SCALE_ENV, "ib")])).is_err());
    }
}
