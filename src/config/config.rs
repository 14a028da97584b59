//! Config file handling

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::batch::BatchMode;
use crate::errors::AxiomError;
use crate::transmit::Strategy;
use crate::workbench::DEFAULT_HISTORY_LIMIT;

/// Values from the `[defaults]` table
#[derive(Debug, Clone, PartialEq)]
pub struct Defaults {
    /// Per-request timeout, written as a humantime span (`"30s"`, `"1m 30s"`)
    pub timeout: Option<Duration>,
    pub strategy: Strategy,
    pub mode: BatchMode,
    pub history_limit: usize,
    /// Workbench backup to load environments from
    pub workbench: Option<PathBuf>,
    pub insecure: bool,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            timeout: Some(Duration::from_secs(30)),
            strategy: Strategy::Sequential,
            mode: BatchMode::Linear,
            history_limit: DEFAULT_HISTORY_LIMIT,
            workbench: None,
            insecure: false,
        }
    }
}

/// Axiom configuration
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub config_dir: PathBuf,
    pub defaults: Defaults,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            config_dir: Self::default_config_dir(),
            defaults: Defaults::default(),
        }
    }
}

impl Config {
    /// Load configuration from the config file (TOML format)
    pub fn load() -> Result<Self, AxiomError> {
        let config_dir = Self::default_config_dir();
        let config_file = config_dir.join("config.toml");

        if !config_file.exists() {
            return Ok(Self::default());
        }

        let mut config = Self::load_from(&config_file)?;
        config.config_dir = config_dir;
        Ok(config)
    }

    /// Load a specific config file
    pub fn load_from(path: &Path) -> Result<Self, AxiomError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AxiomError::Config(format!("Failed to read config: {}", e)))?;
        let config_dir = path.parent().map(Path::to_path_buf).unwrap_or_else(Self::default_config_dir);
        Self::parse(&content, config_dir)
    }

    /// Parse config TOML; relative paths resolve against `config_dir`
    pub fn parse(content: &str, config_dir: PathBuf) -> Result<Self, AxiomError> {
        let toml_value: toml::Value = toml::from_str(content)
            .map_err(|e| AxiomError::Config(format!("Invalid config TOML: {}", e)))?;

        let mut defaults = Defaults::default();
        let Some(section) = toml_value.get("defaults") else {
            return Ok(Self { config_dir, defaults });
        };

        if let Some(timeout) = section.get("timeout").and_then(|v| v.as_str()) {
            defaults.timeout = parse_timeout(timeout)?;
        }

        if let Some(strategy) = section.get("strategy").and_then(|v| v.as_str()) {
            defaults.strategy = parse_enum(strategy, "strategy")?;
        }

        if let Some(mode) = section.get("mode").and_then(|v| v.as_str()) {
            defaults.mode = parse_enum(mode, "mode")?;
        }

        if let Some(limit) = section.get("history_limit").and_then(|v| v.as_integer()) {
            defaults.history_limit = usize::try_from(limit)
                .map_err(|_| AxiomError::Config(format!("history_limit must be non-negative, got {}", limit)))?;
        }

        if let Some(path) = section.get("workbench").and_then(|v| v.as_str()) {
            let path = PathBuf::from(path);
            defaults.workbench = Some(if path.is_absolute() { path } else { config_dir.join(path) });
        }

        defaults.insecure = section
            .get("insecure")
            .and_then(|v| v.as_bool())
            .unwrap_or(false);

        Ok(Self { config_dir, defaults })
    }

    /// `AXIOM_CONFIG_DIR`, else the platform config directory
    fn default_config_dir() -> PathBuf {
        if let Some(dir) = std::env::var_os("AXIOM_CONFIG_DIR") {
            return PathBuf::from(dir);
        }
        dirs::config_dir()
            .map(|p| p.join("axiom"))
            .unwrap_or_else(|| PathBuf::from(".axiom"))
    }

    /// Where the workbench lives when none is configured
    pub fn default_workbench_path(&self) -> PathBuf {
        self.config_dir.join("workbench.json")
    }
}

/// `"off"` or `"none"` disables the timeout
fn parse_timeout(s: &str) -> Result<Option<Duration>, AxiomError> {
    match s.trim() {
        "off" | "none" => Ok(None),
        other => humantime::parse_duration(other)
            .map(Some)
            .map_err(|e| AxiomError::Config(format!("Invalid timeout '{}': {}", other, e))),
    }
}

fn parse_enum<E: clap::ValueEnum>(s: &str, what: &str) -> Result<E, AxiomError> {
    E::from_str(s, true).map_err(|_| AxiomError::Config(format!("Invalid {} '{}'", what, s)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::parse("", PathBuf::from("/cfg")).unwrap();
        assert_eq!(config.defaults, Defaults::default());
        assert_eq!(config.default_workbench_path(), PathBuf::from("/cfg/workbench.json"));
    }

    #[test]
    fn test_full_defaults_section() {
        let toml = r#"
[defaults]
timeout = "1m 30s"
strategy = "burst"
mode = "Chaotic"
history_limit = 20
workbench = "backup.json"
insecure = true
"#;
        let config = Config::parse(toml, PathBuf::from("/cfg")).unwrap();
        assert_eq!(config.defaults.timeout, Some(Duration::from_secs(90)));
        assert_eq!(config.defaults.strategy, Strategy::Burst);
        assert_eq!(config.defaults.mode, BatchMode::Chaotic);
        assert_eq!(config.defaults.history_limit, 20);
        assert_eq!(config.defaults.workbench, Some(PathBuf::from("/cfg/backup.json")));
        assert!(config.defaults.insecure);
    }

    #[test]
    fn test_timeout_off() {
        let config = Config::parse("[defaults]\ntimeout = \"off\"", PathBuf::new()).unwrap();
        assert_eq!(config.defaults.timeout, None);
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(Config::parse("[defaults]\nstrategy = \"parallel\"", PathBuf::new()), Err(AxiomError::Config(_))));
        assert!(matches!(Config::parse("[defaults]\ntimeout = \"soon\"", PathBuf::new()), Err(AxiomError::Config(_))));
        assert!(matches!(Config::parse("[defaults]\nhistory_limit = -1", PathBuf::new()), Err(AxiomError::Config(_))));
        assert!(matches!(Config::parse("not = [toml", PathBuf::new()), Err(AxiomError::Config(_))));
    }
}
