// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use pitlane_app::{
    BeastRules, REMINDER_RECHECK_DELAY, RowSchema, ValidationMode, WARRANTY_MILEAGE_LIMIT,
    WARRANTY_REPAIR_SYSTEM,
};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const CONFIG_VERSION: i64 = 1;
const DEFAULT_LOG_LEVEL: &str = "info";
const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub version: i64,
    #[serde(default)]
    pub storage: Storage,
    #[serde(default)]
    pub validation: Validation,
    #[serde(default)]
    pub reminders: Reminders,
    #[serde(default)]
    pub log: Log,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            storage: Storage::default(),
            validation: Validation::default(),
            reminders: Reminders::default(),
            log: Log::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Storage {
    pub db_path: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Validation {
    pub mode: Option<String>,
    pub warranty_tag: Option<String>,
    pub mileage_limit: Option<f64>,
}

impl Default for Validation {
    fn default() -> Self {
        Self {
            mode: Some("standard".to_owned()),
            warranty_tag: Some(WARRANTY_REPAIR_SYSTEM.to_owned()),
            mileage_limit: Some(WARRANTY_MILEAGE_LIMIT),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Reminders {
    pub recheck_delay: Option<String>,
}

impl Default for Reminders {
    fn default() -> Self {
        Self {
            recheck_delay: Some("500ms".to_owned()),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Log {
    pub level: Option<String>,
}

impl Default for Log {
    fn default() -> Self {
        Self {
            level: Some(DEFAULT_LOG_LEVEL.to_owned()),
        }
    }
}

impl Config {
    pub fn default_path() -> Result<PathBuf> {
        if let Some(path) = env::var_os("PITLANE_CONFIG_PATH") {
            return Ok(PathBuf::from(path));
        }

        let config_root = dirs::config_dir().ok_or_else(|| {
            anyhow!("cannot resolve config directory; set PITLANE_CONFIG_PATH to the config file")
        })?;

        let app_dir = config_root.join(pitlane_db::APP_NAME);
        fs::create_dir_all(&app_dir)
            .with_context(|| format!("create config directory {}", app_dir.display()))?;
        Ok(app_dir.join("config.toml"))
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(path)
            .with_context(|| format!("read config file {}", path.display()))?;
        let value: toml::Value = toml::from_str(&raw)
            .with_context(|| format!("parse TOML config {}", path.display()))?;

        let version = value
            .get("version")
            .and_then(toml::Value::as_integer)
            .ok_or_else(|| {
                anyhow!(
                    "config file {} is not versioned. Add `version = 1` and keep values under [storage], [validation], [reminders], and [log]",
                    path.display()
                )
            })?;

        if version != CONFIG_VERSION {
            bail!(
                "unsupported config version {} in {}; expected version = 1",
                version,
                path.display()
            );
        }

        let config: Config = value
            .try_into()
            .with_context(|| format!("decode config {}", path.display()))?;
        config.validate(path)?;
        Ok(config)
    }

    fn validate(&self, path: &Path) -> Result<()> {
        if let Some(db_path) = &self.storage.db_path {
            pitlane_db::validate_db_path(db_path)?;
        }

        if let Some(mode) = &self.validation.mode
            && !matches!(mode.as_str(), "standard" | "beast")
        {
            bail!(
                "validation.mode in {} must be \"standard\" or \"beast\", got {mode:?}",
                path.display()
            );
        }

        if let Some(limit) = self.validation.mileage_limit
            && !(limit.is_finite() && limit > 0.0)
        {
            bail!(
                "validation.mileage_limit in {} must be positive, got {limit}",
                path.display()
            );
        }

        if let Some(delay) = &self.reminders.recheck_delay {
            parse_duration(delay).with_context(|| {
                format!("reminders.recheck_delay in {} is invalid", path.display())
            })?;
        }

        if let Some(level) = &self.log.level
            && !LOG_LEVELS.contains(&level.as_str())
        {
            bail!(
                "log.level in {} must be one of {}, got {level:?}",
                path.display(),
                LOG_LEVELS.join(", ")
            );
        }

        Ok(())
    }

    pub fn db_path(&self) -> Result<PathBuf> {
        match &self.storage.db_path {
            Some(path) => Ok(PathBuf::from(path)),
            None => pitlane_db::default_db_path(),
        }
    }

    pub fn beast_rules(&self) -> BeastRules {
        let defaults = BeastRules::default();
        BeastRules {
            warranty_tag: self
                .validation
                .warranty_tag
                .clone()
                .unwrap_or(defaults.warranty_tag),
            mileage_limit: self
                .validation
                .mileage_limit
                .unwrap_or(defaults.mileage_limit),
        }
    }

    pub fn validation_mode(&self) -> ValidationMode {
        match self.validation.mode.as_deref() {
            Some("beast") => ValidationMode::Beast(self.beast_rules()),
            _ => ValidationMode::Standard,
        }
    }

    pub fn schema(&self) -> RowSchema {
        RowSchema::new(self.validation_mode())
    }

    pub fn recheck_delay(&self) -> Result<Duration> {
        match &self.reminders.recheck_delay {
            Some(raw) => parse_duration(raw),
            None => Ok(REMINDER_RECHECK_DELAY),
        }
    }

    pub fn log_level(&self) -> &str {
        self.log.level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL)
    }

    pub fn example_config(path: &Path) -> String {
        format!(
            "# pitlane config\n# Place this file at: {}\n\nversion = 1\n\n[storage]\n# Optional. Default is platform data dir (for example ~/.local/share/pitlane/pitlane.db)\n# db_path = \"/absolute/path/to/pitlane.db\"\n\n[validation]\n# \"standard\" or \"beast\" (all order fields required, warranty mileage cap)\nmode = \"standard\"\nwarranty_tag = \"{}\"\nmileage_limit = {}\n\n[reminders]\nrecheck_delay = \"500ms\"\n\n[log]\n# RUST_LOG overrides this when set\nlevel = \"{}\"\n",
            path.display(),
            WARRANTY_REPAIR_SYSTEM,
            WARRANTY_MILEAGE_LIMIT,
            DEFAULT_LOG_LEVEL,
        )
    }
}

fn parse_duration(raw: &str) -> Result<Duration> {
    if let Some(value) = raw.strip_suffix("ms") {
        let millis: u64 = value
            .parse()
            .with_context(|| format!("invalid duration {raw:?}"))?;
        return Ok(Duration::from_millis(millis));
    }
    if let Some(value) = raw.strip_suffix('s') {
        let secs: u64 = value
            .parse()
            .with_context(|| format!("invalid duration {raw:?}"))?;
        return Ok(Duration::from_secs(secs));
    }
    if let Some(value) = raw.strip_suffix('m') {
        let mins: u64 = value
            .parse()
            .with_context(|| format!("invalid duration {raw:?}"))?;
        let Some(secs) = mins.checked_mul(60) else {
            bail!("duration {raw:?} is too large");
        };
        return Ok(Duration::from_secs(secs));
    }

    bail!("invalid duration {raw:?}; use one of: <N>ms, <N>s, <N>m (for example 500ms or 5s)")
}

#[cfg(test)]
mod tests {
    use super::{Config, parse_duration};
    use anyhow::Result;
    use pitlane_app::{BeastRules, ValidationMode, WARRANTY_REPAIR_SYSTEM};
    use std::path::PathBuf;
    use std::sync::{Mutex, OnceLock};
    use std::time::Duration;

    fn write_config(content: &str) -> Result<(tempfile::TempDir, PathBuf)> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("config.toml");
        std::fs::write(&path, content)?;
        Ok((temp, path))
    }

    fn env_lock() -> std::sync::MutexGuard<'static, ()> {
        static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
        match ENV_LOCK.get_or_init(|| Mutex::new(())).lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    #[test]
    fn missing_config_uses_defaults() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let config = Config::load(&temp.path().join("missing.toml"))?;
        assert_eq!(config.version, 1);
        assert_eq!(config.validation_mode(), ValidationMode::Standard);
        assert_eq!(config.recheck_delay()?, Duration::from_millis(500));
        assert_eq!(config.log_level(), "info");
        Ok(())
    }

    #[test]
    fn unversioned_config_is_rejected_with_actionable_message() -> Result<()> {
        let (_temp, path) = write_config("[validation]\nmode = \"beast\"\n")?;
        let error = Config::load(&path).expect_err("unversioned config should fail");
        let message = error.to_string();
        assert!(message.contains("version = 1"));
        assert!(message.contains("[validation]"));
        Ok(())
    }

    #[test]
    fn unsupported_config_version_is_rejected() -> Result<()> {
        let (_temp, path) = write_config("version = 2\n")?;
        let error = Config::load(&path).expect_err("v2 config should fail");
        assert!(error.to_string().contains("unsupported config version 2"));
        Ok(())
    }

    #[test]
    fn malformed_config_returns_parse_error() -> Result<()> {
        let (_temp, path) = write_config("{{not toml")?;
        let error = Config::load(&path).expect_err("malformed config should fail");
        assert!(error.to_string().contains("parse TOML config"));
        Ok(())
    }

    #[test]
    fn beast_mode_carries_configured_rules() -> Result<()> {
        let (_temp, path) = write_config(
            "version = 1\n[validation]\nmode = \"beast\"\nwarranty_tag = \"WTY\"\nmileage_limit = 60000\n",
        )?;
        let config = Config::load(&path)?;
        assert_eq!(
            config.validation_mode(),
            ValidationMode::Beast(BeastRules {
                warranty_tag: "WTY".to_owned(),
                mileage_limit: 60_000.0,
            })
        );
        Ok(())
    }

    #[test]
    fn beast_rules_default_to_warranty_tag_and_limit() -> Result<()> {
        let (_temp, path) = write_config("version = 1\n[validation]\nmode = \"beast\"\n")?;
        let config = Config::load(&path)?;
        let rules = config.beast_rules();
        assert_eq!(rules.warranty_tag, WARRANTY_REPAIR_SYSTEM);
        assert_eq!(rules.mileage_limit, 100_000.0);
        Ok(())
    }

    #[test]
    fn unknown_validation_mode_is_rejected() -> Result<()> {
        let (_temp, path) = write_config("version = 1\n[validation]\nmode = \"strict\"\n")?;
        let error = Config::load(&path).expect_err("unknown mode should fail");
        assert!(error.to_string().contains("\"standard\" or \"beast\""));
        Ok(())
    }

    #[test]
    fn non_positive_mileage_limit_is_rejected() -> Result<()> {
        let (_temp, path) = write_config("version = 1\n[validation]\nmileage_limit = 0\n")?;
        let error = Config::load(&path).expect_err("zero limit should fail");
        assert!(error.to_string().contains("must be positive"));
        Ok(())
    }

    #[test]
    fn invalid_log_level_is_rejected() -> Result<()> {
        let (_temp, path) = write_config("version = 1\n[log]\nlevel = \"loud\"\n")?;
        let error = Config::load(&path).expect_err("unknown level should fail");
        assert!(error.to_string().contains("log.level"));
        Ok(())
    }

    #[test]
    fn invalid_recheck_delay_is_rejected() -> Result<()> {
        let (_temp, path) =
            write_config("version = 1\n[reminders]\nrecheck_delay = \"soon\"\n")?;
        let error = Config::load(&path).expect_err("bad delay should fail");
        assert!(format!("{error:#}").contains("invalid duration"));
        Ok(())
    }

    #[test]
    fn default_path_honors_env_override() -> Result<()> {
        let _guard = env_lock();
        let temp = tempfile::tempdir()?;
        let override_path = temp.path().join("custom-config.toml");
        // SAFETY: test-only process-local env mutation.
        unsafe {
            std::env::set_var("PITLANE_CONFIG_PATH", &override_path);
        }
        let resolved = Config::default_path()?;
        // SAFETY: test cleanup for process-local env mutation.
        unsafe {
            std::env::remove_var("PITLANE_CONFIG_PATH");
        }
        assert_eq!(resolved, override_path);
        Ok(())
    }

    #[test]
    fn db_path_prefers_storage_config_over_env_override() -> Result<()> {
        let _guard = env_lock();
        let (_temp, path) =
            write_config("version = 1\n[storage]\ndb_path = \"/explicit/from-config.db\"\n")?;
        // SAFETY: test-only process-local env mutation.
        unsafe {
            std::env::set_var("PITLANE_DB_PATH", "/from/env.db");
        }
        let config = Config::load(&path)?;
        // SAFETY: test cleanup for process-local env mutation.
        unsafe {
            std::env::remove_var("PITLANE_DB_PATH");
        }
        assert_eq!(config.db_path()?, PathBuf::from("/explicit/from-config.db"));
        Ok(())
    }

    #[test]
    fn db_path_uses_env_override_when_storage_db_path_missing() -> Result<()> {
        let _guard = env_lock();
        let (_temp, path) = write_config("version = 1\n")?;
        // SAFETY: test-only process-local env mutation.
        unsafe {
            std::env::set_var("PITLANE_DB_PATH", "/from/env-only.db");
        }
        let config = Config::load(&path)?;
        let resolved = config.db_path()?;
        // SAFETY: test cleanup for process-local env mutation.
        unsafe {
            std::env::remove_var("PITLANE_DB_PATH");
        }
        assert_eq!(resolved, PathBuf::from("/from/env-only.db"));
        Ok(())
    }

    #[test]
    fn db_path_rejects_uri_style_storage_value() -> Result<()> {
        let (_temp, path) =
            write_config("version = 1\n[storage]\ndb_path = \"https://evil.example/pitlane.db\"\n")?;
        let error = Config::load(&path).expect_err("URI db_path should fail validation");
        assert!(error.to_string().contains("looks like a URI"));
        Ok(())
    }

    #[test]
    fn durations_parse_ms_seconds_and_minutes() -> Result<()> {
        assert_eq!(parse_duration("500ms")?, Duration::from_millis(500));
        assert_eq!(parse_duration("5s")?, Duration::from_secs(5));
        assert_eq!(parse_duration("2m")?, Duration::from_secs(120));
        assert!(parse_duration("oops").is_err());
        Ok(())
    }

    #[test]
    fn oversized_minute_durations_are_rejected() {
        let error = parse_duration("307445734561825861m").expect_err("overflow should fail");
        assert!(error.to_string().contains("too large"));
    }

    #[test]
    fn example_config_round_trips_through_load() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("config.toml");
        std::fs::write(&path, Config::example_config(&path))?;

        let config = Config::load(&path)?;
        assert_eq!(config.validation_mode(), ValidationMode::Standard);
        assert_eq!(config.beast_rules().warranty_tag, WARRANTY_REPAIR_SYSTEM);
        Ok(())
    }
}
