use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::application::{LifecycleOptions, RunOptions};
use crate::domain::{Protocol, ReportFormat, SdkKind};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub target: Option<PathBuf>,
    pub pid: Option<u32>,
    pub args: Vec<String>,
    pub sdk: SdkKind,
    pub protocol: Protocol,
    pub format: ReportFormat,
    pub output: Option<PathBuf>,
    pub upload_url: Option<String>,
    pub poll_interval_ms: u64,
    pub settle_ms: u64,
    pub resolve_timeout_ms: u64,
    pub grace_ms: u64,
    pub max_polls: u32,
    pub buckets: usize,
    pub detailed: bool,
    pub network: bool,
    pub msg_size: u32,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            target: None,
            pid: None,
            args: Vec::new(),
            sdk: SdkKind::Native,
            protocol: Protocol::Unknown,
            format: ReportFormat::Json,
            output: None,
            upload_url: None,
            poll_interval_ms: 1000,
            settle_ms: 250,
            resolve_timeout_ms: 2000,
            grace_ms: 2000,
            max_polls: 0,
            buckets: 32,
            detailed: false,
            network: false,
            msg_size: 0,
            log_level: "info".to_string(),
        }
    }
}

fn parsed<T: FromStr>(var: &impl Fn(&str) -> Option<String>, name: &str) -> Option<T> {
    var(name).and_then(|s| s.trim().parse().ok())
}

fn flag(var: &impl Fn(&str) -> Option<String>, name: &str) -> Option<bool> {
    var(name).map(|s| matches!(s.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
}

impl Config {
    /// Read the TOML file named by `PROCSAMPLER_CONFIG` (if any), then apply
    /// `PROCSAMPLER_*` environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        match env::var("PROCSAMPLER_CONFIG") {
            Ok(path) => Ok(Self::from_file(path)?.with_overrides(|name| env::var(name).ok())),
            Err(_) => Ok(Self::from_env()),
        }
    }

    pub fn from_env() -> Self {
        Self::default().with_overrides(|name| env::var(name).ok())
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    fn with_overrides(mut self, var: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(target) = var("PROCSAMPLER_TARGET") {
            self.target = Some(PathBuf::from(target));
        }
        if let Some(pid) = parsed(&var, "PROCSAMPLER_PID") {
            self.pid = Some(pid);
        }
        if let Some(args) = var("PROCSAMPLER_ARGS") {
            self.args = args.split_whitespace().map(str::to_string).collect();
        }
        if let Some(sdk) = var("PROCSAMPLER_SDK") {
            self.sdk = SdkKind::parse(&sdk);
        }
        if let Some(protocol) = var("PROCSAMPLER_PROTOCOL") {
            self.protocol = Protocol::parse(&protocol);
        }
        if let Some(format) = var("PROCSAMPLER_FORMAT").and_then(|s| ReportFormat::parse(&s)) {
            self.format = format;
        }
        if let Some(output) = var("PROCSAMPLER_OUTPUT") {
            self.output = Some(PathBuf::from(output));
        }
        if let Some(url) = var("PROCSAMPLER_UPLOAD_URL") {
            self.upload_url = Some(url);
        }
        self.poll_interval_ms = parsed(&var, "PROCSAMPLER_POLL_INTERVAL_MS").unwrap_or(self.poll_interval_ms);
        self.settle_ms = parsed(&var, "PROCSAMPLER_SETTLE_MS").unwrap_or(self.settle_ms);
        self.resolve_timeout_ms =
            parsed(&var, "PROCSAMPLER_RESOLVE_TIMEOUT_MS").unwrap_or(self.resolve_timeout_ms);
        self.grace_ms = parsed(&var, "PROCSAMPLER_GRACE_MS").unwrap_or(self.grace_ms);
        self.max_polls = parsed(&var, "PROCSAMPLER_MAX_POLLS").unwrap_or(self.max_polls);
        self.buckets = parsed(&var, "PROCSAMPLER_BUCKETS").unwrap_or(self.buckets);
        self.detailed = flag(&var, "PROCSAMPLER_DETAILED").unwrap_or(self.detailed);
        self.network = flag(&var, "PROCSAMPLER_NETWORK").unwrap_or(self.network);
        self.msg_size = parsed(&var, "PROCSAMPLER_MSG_SIZE").unwrap_or(self.msg_size);
        if let Some(level) = var("PROCSAMPLER_LOG_LEVEL") {
            self.log_level = level;
        }
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        match (&self.target, self.pid) {
            (None, None) => {
                return Err(ConfigError::Invalid(
                    "either a target executable or a pid is required".to_string(),
                ))
            }
            (Some(_), Some(_)) => {
                return Err(ConfigError::Invalid(
                    "target and pid are mutually exclusive".to_string(),
                ))
            }
            _ => {}
        }
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid("poll_interval_ms must be positive".to_string()));
        }
        Ok(())
    }

    pub fn lifecycle_options(&self) -> LifecycleOptions {
        LifecycleOptions {
            settle: Duration::from_millis(self.settle_ms),
            resolve_timeout: Duration::from_millis(self.resolve_timeout_ms),
            grace: Duration::from_millis(self.grace_ms),
            ..LifecycleOptions::default()
        }
    }

    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            max_polls: self.max_polls,
            detailed: self.detailed,
            network: self.network,
            msg_size: self.msg_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn overrides(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.poll_interval_ms, 1000);
        assert_eq!(config.buckets, 32);
        assert_eq!(config.format, ReportFormat::Json);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_toml() {
        let config = Config::from_toml(
            r#"
            target = "/opt/app/test_app"
            args = ["--iterations", "10"]
            sdk = "c"
            protocol = "mqtt_ws"
            format = "csv"
            poll_interval_ms = 500
            detailed = true
            "#,
        )
        .unwrap();

        assert_eq!(config.target, Some(PathBuf::from("/opt/app/test_app")));
        assert_eq!(config.args, vec!["--iterations", "10"]);
        assert_eq!(config.sdk, SdkKind::Native);
        assert_eq!(config.protocol, Protocol::MqttWs);
        assert_eq!(config.format, ReportFormat::Csv);
        assert_eq!(config.run_options().poll_interval, Duration::from_millis(500));
        assert!(config.detailed);
        // untouched keys keep their defaults
        assert_eq!(config.grace_ms, 2000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_bad_toml_is_parse_error() {
        assert!(matches!(
            Config::from_toml("poll_interval_ms = \"soon\""),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            Config::from_file(dir.path().join("nope.toml")),
            Err(ConfigError::Read { .. })
        ));
    }

    #[test]
    fn test_env_overrides_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("procsampler.toml");
        fs::write(&path, "target = \"./app\"\nmax_polls = 3\nsdk = \"node\"\n").unwrap();

        let config = Config::from_file(&path).unwrap().with_overrides(overrides(&[
            ("PROCSAMPLER_MAX_POLLS", "7"),
            ("PROCSAMPLER_ARGS", "-v  --fast"),
            ("PROCSAMPLER_FORMAT", "yaml"),
            ("PROCSAMPLER_NETWORK", "true"),
        ]));

        assert_eq!(config.target, Some(PathBuf::from("./app")));
        assert_eq!(config.sdk, SdkKind::Node);
        assert_eq!(config.max_polls, 7);
        assert_eq!(config.args, vec!["-v", "--fast"]);
        // unknown format falls back to the current value
        assert_eq!(config.format, ReportFormat::Json);
        assert!(config.network);
    }

    #[test]
    fn test_validate_target_or_pid() {
        let both = Config::default().with_overrides(overrides(&[
            ("PROCSAMPLER_TARGET", "/bin/true"),
            ("PROCSAMPLER_PID", "1"),
        ]));
        assert!(matches!(both.validate(), Err(ConfigError::Invalid(_))));

        let pid_only = Config::default().with_overrides(overrides(&[("PROCSAMPLER_PID", "1")]));
        assert!(pid_only.validate().is_ok());

        let mut zero_interval = pid_only.clone();
        zero_interval.poll_interval_ms = 0;
        assert!(zero_interval.validate().is_err());
    }
}
