//! Configuration loading and management.

use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::FixedOffset;
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use rollcall_core::{ClassifyConfig, EngineConfig, LevelPolicy, PeriodTable};
use serde::{Deserialize, Serialize};

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// What to do with unrecognized severity values.
    pub level_policy: LevelPolicy,
    /// Institutional UTC offset the timetable resolves against.
    pub tz_offset: String,
    /// Presence snapshot cadence in minutes.
    pub snapshot_interval_min: i64,
    /// Latest arrival delay still classified late rather than absent.
    pub late_grace_min: i64,
    /// How far past the period end a sighting still counts.
    pub end_tolerance_min: i64,
}

impl Default for Config {
    fn default() -> Self {
        let classify = ClassifyConfig::default();
        Self {
            level_policy: LevelPolicy::default(),
            tz_offset: "+09:00".to_string(),
            snapshot_interval_min: classify.snapshot_interval_min,
            late_grace_min: classify.late_grace_min,
            end_tolerance_min: classify.end_tolerance_min,
        }
    }
}

impl Config {
    /// Loads configuration, optionally from a specific file.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        // Load from default config location
        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        // Load from specified config file
        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // Load from environment variables (ROLLCALL_*)
        figment = figment.merge(Env::prefixed("ROLLCALL_"));

        figment.extract()
    }

    /// Turns the flat file/env representation into the engine's config.
    pub fn engine_config(&self) -> anyhow::Result<EngineConfig> {
        let tz_offset: FixedOffset = self
            .tz_offset
            .parse()
            .with_context(|| format!("invalid tz_offset: {}", self.tz_offset))?;

        Ok(EngineConfig {
            level_policy: self.level_policy,
            classify: ClassifyConfig {
                snapshot_interval_min: self.snapshot_interval_min,
                late_grace_min: self.late_grace_min,
                end_tolerance_min: self.end_tolerance_min,
            },
            periods: PeriodTable::with_offset(tz_offset),
        })
    }
}

/// Returns the platform-specific config directory for rollcall.
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("rollcall"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config_matches_engine_defaults() {
        let config = Config::default();
        assert_eq!(config.tz_offset, "+09:00");
        assert_eq!(config.snapshot_interval_min, 10);
        assert_eq!(config.late_grace_min, 20);
        assert_eq!(config.end_tolerance_min, 10);
        assert_eq!(config.level_policy, LevelPolicy::Passthrough);
    }

    #[test]
    fn engine_config_parses_offset() {
        let engine = Config::default().engine_config().unwrap();
        assert_eq!(
            engine.periods.tz_offset(),
            FixedOffset::east_opt(9 * 3600).unwrap()
        );
    }

    #[test]
    fn engine_config_rejects_bad_offset() {
        let config = Config {
            tz_offset: "tokyo".to_string(),
            ..Config::default()
        };
        assert!(config.engine_config().is_err());
    }

    #[test]
    fn config_file_overrides_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "level_policy = \"null\"\nlate_grace_min = 30").unwrap();

        let config = Config::load_from(Some(file.path())).unwrap();
        assert_eq!(config.level_policy, LevelPolicy::Null);
        assert_eq!(config.late_grace_min, 30);
        // untouched fields keep their defaults
        assert_eq!(config.snapshot_interval_min, 10);
    }
}
