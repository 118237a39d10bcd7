use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Placeholder replaced by the wrapper document path in converter arguments
pub const INPUT_PLACEHOLDER: &str = "{input}";

/// Runtime configuration for minutex
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub conversion: ConversionConfig,
    pub validation: ValidationThresholds,
    pub locator: LocatorConfig,
    pub decisions: DecisionConfig,
}

/// External converter invocation and worker pool bounds
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ConversionConfig {
    pub program: String,
    pub args: Vec<String>,
    pub timeout_ms: u64,
    pub workers: usize,
    /// Wall-clock cap for a whole document's batch
    pub batch_timeout_ms: Option<u64>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        ConversionConfig {
            program: "pandoc".to_string(),
            args: vec![
                INPUT_PLACEHOLDER.to_string(),
                "--from".to_string(),
                "docx".to_string(),
                "--to".to_string(),
                "latex".to_string(),
                "--wrap=none".to_string(),
            ],
            timeout_ms: 10_000,
            workers: 4,
            batch_timeout_ms: None,
        }
    }
}

impl ConversionConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn batch_timeout(&self) -> Option<Duration> {
        self.batch_timeout_ms.map(Duration::from_millis)
    }
}

/// Tolerated bracket imbalance per bracket class.
///
/// Parentheses are looser because converters split text at internal markup
/// boundaries and leave stray parentheses behind.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ValidationThresholds {
    pub max_paren_imbalance: usize,
    pub max_brace_imbalance: usize,
    pub max_bracket_imbalance: usize,
}

impl Default for ValidationThresholds {
    fn default() -> Self {
        ValidationThresholds {
            max_paren_imbalance: 5,
            max_brace_imbalance: 1,
            max_bracket_imbalance: 1,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LocatorConfig {
    /// Titles are truncated to this many characters before searching
    pub title_prefix_len: usize,
}

impl Default for LocatorConfig {
    fn default() -> Self {
        LocatorConfig {
            title_prefix_len: 50,
        }
    }
}

/// One decision category recognised at the start of a paragraph
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DecisionType {
    pub name: String,
    pub id_prefix: String,
    /// Case-insensitive regex matched at the start of the paragraph
    pub pattern: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DecisionConfig {
    pub types: Vec<DecisionType>,
    pub reference_pattern: String,
}

impl Default for DecisionConfig {
    fn default() -> Self {
        DecisionConfig {
            types: vec![
                DecisionType {
                    name: "agreement".to_string(),
                    id_prefix: "AGR".to_string(),
                    pattern: r"agreements?".to_string(),
                },
                DecisionType {
                    name: "conclusion".to_string(),
                    id_prefix: "CON".to_string(),
                    pattern: r"conclusions?".to_string(),
                },
                DecisionType {
                    name: "working_assumption".to_string(),
                    id_prefix: "WA".to_string(),
                    pattern: r"working\s+assumptions?".to_string(),
                },
            ],
            reference_pattern: r"\b[RS][1-6P]-\d{6,7}\b".to_string(),
        }
    }
}

impl Config {
    /// Load config from the user config directory, falling back to defaults
    pub fn load() -> Result<Self> {
        if let Some(config_path) = Self::get_config_path() {
            if config_path.exists() {
                return Self::from_path(&config_path);
            }
        }

        Ok(Config::default())
    }

    /// Load config from an explicit file
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("failed to parse config {}", path.display()))?;
        Ok(config)
    }

    /// Save config to the user config directory
    pub fn save(&self) -> Result<Option<PathBuf>> {
        let Some(config_path) = Self::get_config_path() else {
            return Ok(None);
        };

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(&config_path, content)?;
        Ok(Some(config_path))
    }

    pub fn get_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("minutex").join("config.toml"))
    }

    /// Write the default config file
    pub fn init_default() -> Result<Option<PathBuf>> {
        Config::default().save()
    }
}
