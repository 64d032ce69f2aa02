//! Daemon configuration management

use crate::usb::{DeviceFilter, parse_filters};
use anyhow::{Context, Result, anyhow};
use monitor::timing::{ADD_SETTLE, MAX_SCROLL_ATTEMPTS, REMOVE_SETTLE, STEP_SETTLE, UNAUTHORIZED_POLL_INTERVAL};
use monitor::{DEFAULT_DIAL_TEMPLATE, MatchMode, Timings, WorkflowSettings};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuroraConfig {
    pub server: ServerSettings,
    #[serde(default)]
    pub adb: AdbSettings,
    #[serde(default)]
    pub usb: UsbSettings,
    /// Settle and poll delays
    #[serde(default)]
    pub timing: TimingSettings,
    /// What to customize devices to and how
    #[serde(default)]
    pub customization: CustomizationSettings,
    #[serde(default)]
    pub reports: ReportSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerSettings {
    pub log_level: String,
    /// Also append logs to this file
    #[serde(default)]
    pub log_file: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdbSettings {
    /// `adb` executable, looked up on `PATH` when not absolute
    #[serde(default = "AdbSettings::default_path")]
    pub path: String,
}

impl Default for AdbSettings {
    fn default() -> Self {
        Self {
            path: Self::default_path(),
        }
    }
}

impl AdbSettings {
    fn default_path() -> String {
        "adb".to_string()
    }
}

/// Which bus events wake the watcher
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct UsbSettings {
    /// VID:PID patterns (e.g. "0x04e8:*"); empty matches every device
    #[serde(default)]
    pub filters: Vec<String>,
}

/// Delays in milliseconds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingSettings {
    #[serde(default = "TimingSettings::default_add_settle")]
    pub add_settle_ms: u64,
    #[serde(default = "TimingSettings::default_remove_settle")]
    pub remove_settle_ms: u64,
    #[serde(default = "TimingSettings::default_poll_interval")]
    pub unauthorized_poll_ms: u64,
    #[serde(default = "TimingSettings::default_step_settle")]
    pub step_settle_ms: u64,
    /// Rescan interval when libusb has no hotplug support
    #[serde(default = "TimingSettings::default_fallback_poll")]
    pub fallback_poll_ms: u64,
}

impl Default for TimingSettings {
    fn default() -> Self {
        Self {
            add_settle_ms: Self::default_add_settle(),
            remove_settle_ms: Self::default_remove_settle(),
            unauthorized_poll_ms: Self::default_poll_interval(),
            step_settle_ms: Self::default_step_settle(),
            fallback_poll_ms: Self::default_fallback_poll(),
        }
    }
}

impl TimingSettings {
    fn default_add_settle() -> u64 {
        ADD_SETTLE.as_millis() as u64
    }

    fn default_remove_settle() -> u64 {
        REMOVE_SETTLE.as_millis() as u64
    }

    fn default_poll_interval() -> u64 {
        UNAUTHORIZED_POLL_INTERVAL.as_millis() as u64
    }

    fn default_step_settle() -> u64 {
        STEP_SETTLE.as_millis() as u64
    }

    fn default_fallback_poll() -> u64 {
        5000
    }

    pub fn fallback_poll(&self) -> Duration {
        Duration::from_millis(self.fallback_poll_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomizationSettings {
    /// Start a job for every newly authorized device
    #[serde(default = "CustomizationSettings::default_enabled")]
    pub enabled: bool,
    /// Dialer code opening the provisioning menu; `{imei}` is substituted
    #[serde(default = "CustomizationSettings::default_dial_template")]
    pub dial_template: String,
    /// Profile for models without an entry in `profiles`
    #[serde(default)]
    pub default_profile: Option<String>,
    /// Model name -> profile label
    #[serde(default)]
    pub profiles: BTreeMap<String, String>,
    #[serde(default)]
    pub match_mode: MatchMode,
    #[serde(default = "CustomizationSettings::default_install_label")]
    pub install_label: String,
    #[serde(default = "CustomizationSettings::default_confirm_label")]
    pub confirm_label: String,
    #[serde(default = "CustomizationSettings::default_max_scroll_attempts")]
    pub max_scroll_attempts: u32,
}

impl Default for CustomizationSettings {
    fn default() -> Self {
        Self {
            enabled: Self::default_enabled(),
            dial_template: Self::default_dial_template(),
            default_profile: None,
            profiles: BTreeMap::new(),
            match_mode: MatchMode::default(),
            install_label: Self::default_install_label(),
            confirm_label: Self::default_confirm_label(),
            max_scroll_attempts: Self::default_max_scroll_attempts(),
        }
    }
}

impl CustomizationSettings {
    fn default_enabled() -> bool {
        true
    }

    fn default_dial_template() -> String {
        DEFAULT_DIAL_TEMPLATE.to_string()
    }

    fn default_install_label() -> String {
        "Install".to_string()
    }

    fn default_confirm_label() -> String {
        "OK".to_string()
    }

    fn default_max_scroll_attempts() -> u32 {
        MAX_SCROLL_ATTEMPTS
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSettings {
    /// Directory holding one TSV per day
    #[serde(default = "ReportSettings::default_directory")]
    pub directory: String,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            directory: Self::default_directory(),
        }
    }
}

impl ReportSettings {
    fn default_directory() -> String {
        if let Some(data_dir) = dirs::data_local_dir() {
            data_dir.join("aurora").join("reports").display().to_string()
        } else {
            "/var/lib/aurora/reports".to_string()
        }
    }
}

impl Default for AuroraConfig {
    fn default() -> Self {
        Self {
            server: ServerSettings {
                log_level: "info".to_string(),
                log_file: None,
            },
            adb: AdbSettings::default(),
            usb: UsbSettings::default(),
            timing: TimingSettings::default(),
            customization: CustomizationSettings::default(),
            reports: ReportSettings::default(),
        }
    }
}

impl AuroraConfig {
    /// Read and validate the file at `path`, or the first file found in
    /// the search locations when `path` is `None`
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        let path = match path {
            Some(path) => path,
            None => Self::search_paths()
                .into_iter()
                .find(|candidate| candidate.is_file())
                .ok_or_else(|| anyhow!("no aurora.toml in the search locations"))?,
        };

        let text = fs::read_to_string(&path)
            .with_context(|| format!("Cannot read {}", path.display()))?;
        let config =
            Self::parse(&text).with_context(|| format!("Invalid config {}", path.display()))?;

        tracing::info!("Configuration: {}", path.display());
        Ok(config)
    }

    /// Parse and validate TOML text
    pub fn parse(content: &str) -> Result<Self> {
        let config: AuroraConfig = toml::from_str(content).context("Failed to parse TOML")?;
        config.validate()?;
        Ok(config)
    }

    /// Like [`load`](Self::load) over the search locations, falling back to
    /// built-in defaults
    pub fn load_or_default() -> Self {
        Self::load(None).unwrap_or_else(|e| {
            tracing::warn!("{:#}, running with defaults", e);
            Self::default()
        })
    }

    /// Write this configuration as TOML, creating parent directories
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).with_context(|| format!("Cannot create {}", dir.display()))?;
        }

        let text = toml::to_string_pretty(self).context("Cannot serialize configuration")?;
        fs::write(path, text).with_context(|| format!("Cannot write {}", path.display()))?;

        tracing::info!("Wrote configuration to {}", path.display());
        Ok(())
    }

    /// `aurora/aurora.toml` under the user's config directory
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join("aurora")
            .join("aurora.toml")
    }

    fn search_paths() -> [PathBuf; 2] {
        [Self::default_path(), PathBuf::from("/etc/aurora/aurora.toml")]
    }

    /// Parsed `usb.filters`
    pub fn usb_filters(&self) -> Result<Vec<DeviceFilter>> {
        parse_filters(&self.usb.filters)
    }

    pub fn timings(&self) -> Timings {
        Timings {
            add_settle: Duration::from_millis(self.timing.add_settle_ms),
            remove_settle: Duration::from_millis(self.timing.remove_settle_ms),
            poll_interval: Duration::from_millis(self.timing.unauthorized_poll_ms),
        }
    }

    pub fn workflow_settings(&self) -> WorkflowSettings {
        let c = &self.customization;
        WorkflowSettings {
            dial_template: c.dial_template.clone(),
            match_mode: c.match_mode,
            install_label: c.install_label.clone(),
            confirm_label: c.confirm_label.clone(),
            max_scroll_attempts: c.max_scroll_attempts,
            step_settle: Duration::from_millis(self.timing.step_settle_ms),
        }
    }

    /// Report directory with `~` expanded
    pub fn report_dir(&self) -> PathBuf {
        expand_path(&self.reports.directory)
    }

    /// Log file with `~` expanded
    pub fn log_file(&self) -> Option<PathBuf> {
        self.server.log_file.as_deref().map(expand_path)
    }

    /// Validate configuration values
    fn validate(&self) -> Result<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.server.log_level.as_str()) {
            return Err(anyhow!(
                "Invalid log level '{}', must be one of: {}",
                self.server.log_level,
                valid_levels.join(", ")
            ));
        }

        if self.adb.path.trim().is_empty() {
            return Err(anyhow!("adb.path must not be empty"));
        }

        self.usb_filters().context("Invalid usb.filters")?;

        if self.timing.unauthorized_poll_ms == 0 || self.timing.fallback_poll_ms == 0 {
            return Err(anyhow!("Poll intervals must be greater than 0"));
        }

        let customization = &self.customization;
        if !customization.dial_template.contains("{imei}") {
            return Err(anyhow!(
                "Invalid dial_template '{}', must contain {{imei}}",
                customization.dial_template
            ));
        }
        if customization.max_scroll_attempts == 0 {
            return Err(anyhow!("max_scroll_attempts must be greater than 0"));
        }
        for (model, profile) in &customization.profiles {
            if profile.trim().is_empty() {
                return Err(anyhow!("Empty profile for model '{}'", model));
            }
        }

        Ok(())
    }
}

fn expand_path(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AuroraConfig::default();
        assert_eq!(config.server.log_level, "info");
        assert_eq!(config.adb.path, "adb");
        assert!(config.customization.enabled);
        assert!(config.validate().is_ok());
        assert_eq!(config.timings(), Timings::default());
        assert_eq!(config.workflow_settings(), WorkflowSettings::default());
    }

    #[test]
    fn test_minimal_config_fills_defaults() {
        let config = AuroraConfig::parse("[server]\nlog_level = \"debug\"\n").unwrap();
        assert_eq!(config.server.log_level, "debug");
        assert_eq!(config.timing, TimingSettings::default());
        assert_eq!(config.customization.max_scroll_attempts, MAX_SCROLL_ATTEMPTS);
    }

    #[test]
    fn test_full_config() {
        let config = AuroraConfig::parse(
            r#"
[server]
log_level = "warn"
log_file = "~/aurora.log"

[adb]
path = "/opt/platform-tools/adb"

[usb]
filters = ["0x04e8:*", "0x18d1:0x4ee7"]

[timing]
add_settle_ms = 3000
step_settle_ms = 500

[customization]
dial_template = "*#272*{imei}#"
default_profile = "XSP"
match_mode = "starts_with"
max_scroll_attempts = 4

[customization.profiles]
"SM-A515F" = "XME"

[reports]
directory = "/srv/aurora/reports"
"#,
        )
        .unwrap();

        assert_eq!(config.usb.filters.len(), 2);
        assert_eq!(config.timings().add_settle, Duration::from_secs(3));
        assert_eq!(config.timings().remove_settle, REMOVE_SETTLE);
        assert_eq!(config.customization.match_mode, MatchMode::StartsWith);
        assert_eq!(config.customization.profiles["SM-A515F"], "XME");
        assert_eq!(config.report_dir(), PathBuf::from("/srv/aurora/reports"));

        let settings = config.workflow_settings();
        assert_eq!(settings.step_settle, Duration::from_millis(500));
        assert_eq!(settings.max_scroll_attempts, 4);

        let log_file = config.log_file().unwrap();
        assert!(!log_file.to_string_lossy().starts_with('~'));
    }

    #[test]
    fn test_example_config_is_valid() {
        let config = AuroraConfig::parse(include_str!("../../../aurora.example.toml")).unwrap();
        assert_eq!(config.customization.default_profile.as_deref(), Some("XSP"));
        assert_eq!(config.timings(), Timings::default());
    }

    #[test]
    fn test_bad_usb_filter_rejected() {
        let mut config = AuroraConfig::default();
        config.usb.filters = vec!["0x04e8:*".to_string(), "04e8:6860".to_string()];
        assert!(config.validate().is_err());

        config.usb.filters.pop();
        assert_eq!(config.usb_filters().unwrap().len(), 1);
    }

    #[test]
    fn test_dial_template_needs_imei() {
        let mut config = AuroraConfig::default();
        config.customization.dial_template = "*#272#".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_scroll_attempts_rejected() {
        let mut config = AuroraConfig::default();
        config.customization.max_scroll_attempts = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_log_level() {
        let mut config = AuroraConfig::default();
        config.server.log_level = "verbose".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_round_trip() {
        let mut config = AuroraConfig::default();
        config.customization.default_profile = Some("XSP".to_string());
        config
            .customization
            .profiles
            .insert("SM-G991B".to_string(), "XSP".to_string());

        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert_eq!(AuroraConfig::parse(&toml_str).unwrap(), config);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("aurora.toml");

        AuroraConfig::default().save(&path).unwrap();
        let loaded = AuroraConfig::load(Some(path)).unwrap();
        assert_eq!(loaded, AuroraConfig::default());
    }

    #[test]
    fn test_load_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(AuroraConfig::load(Some(dir.path().join("absent.toml"))).is_err());
    }
}
