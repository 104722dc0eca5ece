//! # Configuration — Season Window, Caps, and Reward Tables
//!
//! Everything that varied between observed seasons is load-time configuration:
//! the calendar window (start date, end date, door count are three independent
//! parameters), the per-bucket point caps, the two reward threshold tables,
//! and the upload extension allow-list.
//!
//! Configuration is loaded once at startup from a TOML file. A missing or
//! invalid configuration is fatal: the server refuses to start without a
//! usable calendar window and non-empty reward tables.

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// The bounded date range during which doors may be opened.
///
/// `end` is deliberately not derived from `start + days`: real seasons have
/// shipped with an end date earlier than the door count would imply, cutting
/// the tail of the calendar short.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeasonConfig {
    /// Calendar date of door 1.
    pub start: NaiveDate,
    /// Last date on which any door may be interacted with.
    pub end: NaiveDate,
    /// Number of doors (1..=days).
    pub days: u32,
}

/// Upper bounds for the point ledgers. Season-specific, never universal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PointsPolicy {
    pub free_cap: i32,
    pub paid_cap: i32,
    pub global_cap: i32,
}

/// One threshold entry: crossing `threshold` grants the prize tagged `key`
/// exactly once per user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewardTarget {
    pub key: String,
    pub name: String,
    pub threshold: i32,
}

/// The personal and global threshold tables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewardTables {
    #[serde(default)]
    pub personal: Vec<RewardTarget>,
    #[serde(default)]
    pub global: Vec<RewardTarget>,
}

/// File-response submissions must carry a reference whose extension is in
/// this allow-list. The upload collaborator stores bytes; the core only sees
/// the reference string.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadPolicy {
    pub allowed_extensions: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub season: SeasonConfig,
    pub points: PointsPolicy,
    pub rewards: RewardTables,
    pub uploads: UploadPolicy,
}

impl AppConfig {
    /// Load and validate configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config: AppConfig = toml::from_str(&content)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the calendar and ledger cannot operate on.
    pub fn validate(&self) -> Result<()> {
        if self.season.days == 0 {
            bail!("season.days must be at least 1");
        }
        if self.season.end < self.season.start {
            bail!(
                "season.end ({}) is before season.start ({})",
                self.season.end,
                self.season.start
            );
        }
        if self.points.free_cap < 0 || self.points.paid_cap < 0 || self.points.global_cap < 0 {
            bail!("point caps must be non-negative");
        }
        if self.rewards.personal.is_empty() && self.rewards.global.is_empty() {
            bail!("at least one reward threshold table must be non-empty");
        }
        for target in self.rewards.personal.iter().chain(&self.rewards.global) {
            if target.key.trim().is_empty() {
                bail!("reward target {:?} has an empty key", target.name);
            }
            if target.threshold < 0 {
                bail!("reward target {:?} has a negative threshold", target.key);
            }
        }
        if self.uploads.allowed_extensions.is_empty() {
            bail!("uploads.allowed_extensions must not be empty");
        }
        Ok(())
    }
}

impl UploadPolicy {
    /// Case-insensitive extension check against the allow-list.
    pub fn is_allowed(&self, extension: &str) -> bool {
        let ext = extension.to_ascii_lowercase();
        self.allowed_extensions.iter().any(|a| a.eq_ignore_ascii_case(&ext))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> AppConfig {
        AppConfig {
            season: SeasonConfig {
                start: NaiveDate::from_ymd_opt(2025, 12, 15).unwrap(),
                end: NaiveDate::from_ymd_opt(2026, 1, 14).unwrap(),
                days: 31,
            },
            points: PointsPolicy {
                free_cap: 1015,
                paid_cap: 1001,
                global_cap: 2026,
            },
            rewards: RewardTables {
                personal: vec![RewardTarget {
                    key: "small".into(),
                    name: "Small prize".into(),
                    threshold: 555,
                }],
                global: vec![RewardTarget {
                    key: "sale".into(),
                    name: "Storewide sale".into(),
                    threshold: 226,
                }],
            },
            uploads: UploadPolicy {
                allowed_extensions: vec!["png".into(), "jpg".into(), "pdf".into()],
            },
        }
    }

    #[test]
    fn valid_config_passes_validation() {
        sample().validate().unwrap();
    }

    #[test]
    fn toml_roundtrip() {
        let config = sample();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.season.start, config.season.start);
        assert_eq!(parsed.season.days, 31);
        assert_eq!(parsed.points.global_cap, 2026);
        assert_eq!(parsed.rewards.personal[0].key, "small");
    }

    #[test]
    fn rejects_zero_day_season() {
        let mut config = sample();
        config.season.days = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_end_before_start() {
        let mut config = sample();
        config.season.end = NaiveDate::from_ymd_opt(2025, 12, 1).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_empty_reward_tables() {
        let mut config = sample();
        config.rewards.personal.clear();
        config.rewards.global.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_negative_threshold() {
        let mut config = sample();
        config.rewards.personal[0].threshold = -1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn extension_check_is_case_insensitive() {
        let uploads = sample().uploads;
        assert!(uploads.is_allowed("png"));
        assert!(uploads.is_allowed("PNG"));
        assert!(uploads.is_allowed("Jpg"));
        assert!(!uploads.is_allowed("exe"));
    }
}
