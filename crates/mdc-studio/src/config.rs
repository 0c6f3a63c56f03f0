//! Configuration file support for the mdc-studio CLI
//!
//! Loads settings from `_mdc-studio.toml`.

use anyhow::{Context, Result};
use mdc_editor::{DiffOptions, ForwardOptions, HighlightThemes};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Default configuration file name
pub const CONFIG_FILE_NAME: &str = "_mdc-studio.toml";

/// Schema URL for the configuration file
pub const SCHEMA_URL: &str =
    "https://raw.githubusercontent.com/mdc-studio/mdc-studio/main/crates/mdc-studio/schema/mdc-studio.schema.json";

/// Root configuration structure
#[derive(Debug, Default, Clone, Deserialize, Serialize, JsonSchema)]
#[serde(default)]
pub struct Config {
    /// Code block highlighting on save
    #[serde(skip_serializing_if = "HighlightConfig::is_empty")]
    pub highlight: HighlightConfig,
    /// Editor document options
    #[serde(skip_serializing_if = "EditorConfig::is_empty")]
    pub editor: EditorConfig,
    /// Output formatting
    #[serde(skip_serializing_if = "OutputConfig::is_empty")]
    pub output: OutputConfig,
    /// Word diff options
    #[serde(skip_serializing_if = "DiffConfig::is_empty")]
    pub diff: DiffConfig,
}

/// Highlighting configuration
#[derive(Debug, Default, Clone, Deserialize, Serialize, JsonSchema)]
#[serde(default)]
pub struct HighlightConfig {
    /// Decorate code blocks when saving (default: false)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    /// Default theme name (default: "InspiredGitHub")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub theme: Option<String>,
    /// Extra themes exposed as CSS variables, keyed by variant name (e.g. dark)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variants: Option<BTreeMap<String, String>>,
}

impl HighlightConfig {
    fn is_empty(&self) -> bool {
        self.enabled.is_none() && self.theme.is_none() && self.variants.is_none()
    }
}

/// Editor document configuration
#[derive(Debug, Default, Clone, Deserialize, Serialize, JsonSchema)]
#[serde(default)]
pub struct EditorConfig {
    /// Turn `:shortcode:` text into emoji nodes (default: true)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emoji: Option<bool>,
}

impl EditorConfig {
    fn is_empty(&self) -> bool {
        self.emoji.is_none()
    }
}

/// Output configuration
#[derive(Debug, Default, Clone, Deserialize, Serialize, JsonSchema)]
#[serde(default)]
pub struct OutputConfig {
    /// Pretty-print JSON output (default: true)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pretty: Option<bool>,
}

impl OutputConfig {
    fn is_empty(&self) -> bool {
        self.pretty.is_none()
    }
}

/// Word diff configuration
#[derive(Debug, Default, Clone, Deserialize, Serialize, JsonSchema)]
#[serde(default)]
pub struct DiffConfig {
    /// Largest token count per side before the diff is skipped (default: 2000)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<usize>,
}

impl DiffConfig {
    fn is_empty(&self) -> bool {
        self.max_tokens.is_none()
    }
}

impl Config {
    /// Load configuration from a specific file path
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Try to load configuration from a directory (looks for `_mdc-studio.toml`)
    ///
    /// Returns `Ok(None)` if the config file doesn't exist.
    pub fn load_from_dir(dir: &Path) -> Result<Option<Self>> {
        let config_path = dir.join(CONFIG_FILE_NAME);
        if config_path.exists() {
            Ok(Some(Self::load(&config_path)?))
        } else {
            Ok(None)
        }
    }

    /// Generate JSON schema for the configuration
    pub fn json_schema() -> schemars::Schema {
        schemars::schema_for!(Config)
    }

    /// Generate JSON schema as a string
    pub fn json_schema_string() -> Result<String> {
        let schema = Self::json_schema();
        serde_json::to_string_pretty(&schema).context("Failed to serialize JSON schema")
    }

    /// Serialize configuration to TOML string with schema directive
    pub fn to_toml_with_schema(&self) -> Result<String> {
        let toml_content =
            toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;

        Ok(format!("#:schema {}\n\n{}", SCHEMA_URL, toml_content))
    }

    /// Create a sample configuration with common defaults for init command
    pub fn sample() -> Self {
        let mut variants = BTreeMap::new();
        variants.insert("dark".to_string(), "base16-ocean.dark".to_string());

        Config {
            highlight: HighlightConfig {
                enabled: Some(false),
                theme: Some("InspiredGitHub".to_string()),
                variants: Some(variants),
            },
            editor: EditorConfig { emoji: Some(true) },
            output: OutputConfig { pretty: Some(true) },
            diff: DiffConfig {
                max_tokens: Some(mdc_editor::diff::MAX_DIFF_TOKENS),
            },
        }
    }

    pub fn forward_options(&self) -> ForwardOptions {
        ForwardOptions {
            resolve_emoji: self.editor.emoji.unwrap_or(true),
        }
    }

    pub fn themes(&self) -> HighlightThemes {
        let mut themes = match &self.highlight.theme {
            Some(theme) => HighlightThemes::new(theme.as_str()),
            None => HighlightThemes::default(),
        };
        for (name, theme) in self.highlight.variants.iter().flatten() {
            themes = themes.with_variant(name.as_str(), theme.as_str());
        }
        themes
    }

    pub fn diff_options(&self) -> DiffOptions {
        match self.diff.max_tokens {
            Some(max_tokens) => DiffOptions { max_tokens },
            None => DiffOptions::default(),
        }
    }

    pub fn highlight_enabled(&self) -> bool {
        self.highlight.enabled.unwrap_or(false)
    }

    pub fn pretty(&self) -> bool {
        self.output.pretty.unwrap_or(true)
    }
}
