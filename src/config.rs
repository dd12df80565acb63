use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Default, Deserialize, Clone)]
#[serde(default)]
pub struct JotterConfig {
    pub llm: LlmConfig,
    pub agent: AgentConfig,
    pub storage: StorageConfig,
    pub embedding: EmbeddingConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LlmConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AgentConfig {
    /// Model requests per user turn that may come back with tool calls.
    pub max_tool_rounds: usize,
    /// Replaces the built-in system prompt template when set.
    pub system_prompt_path: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    pub db_path: String,
    pub items_collection: String,
    pub context_collection: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub provider: String,
    pub model: String,
    pub cache_dir: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing` level for this crate.
    pub app_level: String,
    /// `tracing` level for everything else.
    pub deps_level: String,
    pub to_console: bool,
    pub file_path: Option<String>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: String::new(),
            base_url: "https://openrouter.ai/api/v1".into(),
            timeout_secs: 120,
        }
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_tool_rounds: 25,
            system_prompt_path: None,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        let db_path = default_jotter_dir()
            .join("jotter.db")
            .to_string_lossy()
            .into_owned();
        Self {
            db_path,
            items_collection: "items".into(),
            context_collection: "global_context".into(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        let cache_dir = default_jotter_dir()
            .join("models")
            .to_string_lossy()
            .into_owned();
        Self {
            provider: "local".into(),
            model: "all-MiniLM-L6-v2".into(),
            cache_dir,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            app_level: "debug".into(),
            deps_level: "info".into(),
            to_console: true,
            file_path: None,
        }
    }
}

impl EmbeddingConfig {
    pub fn resolved_cache_dir(&self) -> PathBuf {
        expand_tilde(&self.cache_dir)
    }
}

/// Returns `~/.jotter/`, or `./.jotter/` when no home directory is known.
pub fn default_jotter_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".jotter")
}

/// Returns the default config file path: `~/.jotter/config.toml`
pub fn default_config_path() -> PathBuf {
    default_jotter_dir().join("config.toml")
}

/// Map a level name (`DEBUG`, `warning`, ...) onto a `tracing` directive.
/// Unknown or empty names yield `None`.
pub fn parse_level(value: &str) -> Option<&'static str> {
    match value.trim().to_ascii_lowercase().as_str() {
        "trace" => Some("trace"),
        "debug" => Some("debug"),
        "info" => Some("info"),
        "warn" | "warning" => Some("warn"),
        "error" | "critical" => Some("error"),
        "off" => Some("off"),
        _ => None,
    }
}

/// `true`, `1`, `yes` and `on` (any case) are true; any other non-empty value
/// is false; empty keeps `default`.
pub fn parse_flag(value: &str, default: bool) -> bool {
    let value = value.trim().to_ascii_lowercase();
    if value.is_empty() {
        return default;
    }
    matches!(value.as_str(), "true" | "1" | "yes" | "on")
}

impl JotterConfig {
    /// Load config from TOML file (if it exists) then apply env var overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Load from a specific path, then apply env var overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents =
                std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str(&contents).context("failed to parse config TOML")?
        } else {
            info!("no config file at {}, using defaults", path.display());
            JotterConfig::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from `lookup`. Blank values are ignored, as are log
    /// levels that do not parse.
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        if let Some(val) = get("OPENROUTER_API_KEY") {
            self.llm.api_key = val;
        }
        if let Some(val) = get("OPENROUTER_MODEL") {
            self.llm.model = val;
        }
        if let Some(val) = get("OPENROUTER_BASE_URL") {
            self.llm.base_url = val;
        }
        if let Some(val) = get("JOTTER_DB") {
            self.storage.db_path = val;
        }
        if let Some(val) = get("JOTTER_EMBEDDING") {
            self.embedding.provider = val;
        }
        if let Some(level) = get("LOG_LEVEL_APP").as_deref().and_then(parse_level) {
            self.logging.app_level = level.into();
        }
        if let Some(level) = get("LOG_LEVEL_DEPS").as_deref().and_then(parse_level) {
            self.logging.deps_level = level.into();
        }
        if let Some(val) = get("LOG_TO_CONSOLE") {
            self.logging.to_console = parse_flag(&val, self.logging.to_console);
        }
        if let Some(val) = get("LOG_FILE_PATH") {
            self.logging.file_path = Some(val);
        }
    }

    /// Check the settings the chat loop cannot run without. Every problem is
    /// reported at once, one per line.
    pub fn validate_llm(&self) -> Result<()> {
        let mut errors = Vec::new();
        if self.llm.api_key.trim().is_empty() {
            errors.push("OPENROUTER_API_KEY is required. Get one at https://openrouter.ai/keys");
        }
        if self.llm.model.trim().is_empty() {
            errors.push("OPENROUTER_MODEL is required (e.g., anthropic/claude-sonnet-4)");
        }
        if !errors.is_empty() {
            anyhow::bail!("{}", errors.join("\n"));
        }
        Ok(())
    }

    /// Resolve the database path, expanding `~` if needed.
    pub fn resolved_db_path(&self) -> PathBuf {
        expand_tilde(&self.storage.db_path)
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn overrides(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn default_config_is_valid() {
        let config = JotterConfig::default();
        assert_eq!(config.llm.base_url, "https://openrouter.ai/api/v1");
        assert_eq!(config.agent.max_tool_rounds, 25);
        assert_eq!(config.storage.items_collection, "items");
        assert_eq!(config.storage.context_collection, "global_context");
        assert_eq!(config.logging.app_level, "debug");
        assert_eq!(config.logging.deps_level, "info");
        assert!(config.logging.to_console);
        assert!(config.storage.db_path.ends_with("jotter.db"));
    }

    #[test]
    fn parse_toml_config() {
        let toml_str = r#"
[llm]
model = "anthropic/claude-sonnet-4"

[agent]
max_tool_rounds = 5

[embedding]
provider = "hashing"
"#;
        let config: JotterConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.llm.model, "anthropic/claude-sonnet-4");
        assert_eq!(config.agent.max_tool_rounds, 5);
        assert_eq!(config.embedding.provider, "hashing");
        // defaults still apply for unset fields
        assert_eq!(config.llm.timeout_secs, 120);
        assert_eq!(config.embedding.model, "all-MiniLM-L6-v2");
    }

    #[test]
    fn overrides_apply() {
        let mut config = JotterConfig::default();
        config.apply_overrides(overrides(&[
            ("OPENROUTER_API_KEY", " sk-test "),
            ("OPENROUTER_MODEL", "openai/gpt-4o"),
            ("JOTTER_DB", "/tmp/override.db"),
            ("LOG_LEVEL_APP", "WARNING"),
            ("LOG_LEVEL_DEPS", "bogus"),
            ("LOG_TO_CONSOLE", "off"),
            ("LOG_FILE_PATH", "/tmp/jotter.log"),
        ]));

        assert_eq!(config.llm.api_key, "sk-test");
        assert_eq!(config.llm.model, "openai/gpt-4o");
        assert_eq!(config.storage.db_path, "/tmp/override.db");
        assert_eq!(config.logging.app_level, "warn");
        assert_eq!(config.logging.deps_level, "info");
        assert!(!config.logging.to_console);
        assert_eq!(config.logging.file_path.as_deref(), Some("/tmp/jotter.log"));
    }

    #[test]
    fn blank_overrides_are_ignored() {
        let mut config = JotterConfig::default();
        config.apply_overrides(overrides(&[("OPENROUTER_BASE_URL", "  "), ("LOG_TO_CONSOLE", "")]));
        assert_eq!(config.llm.base_url, "https://openrouter.ai/api/v1");
        assert!(config.logging.to_console);
    }

    #[test]
    fn validation_lists_every_missing_value() {
        let err = JotterConfig::default().validate_llm().unwrap_err().to_string();
        assert!(err.contains("OPENROUTER_API_KEY is required"));
        assert!(err.contains("OPENROUTER_MODEL is required"));
        assert_eq!(err.lines().count(), 2);

        let mut config = JotterConfig::default();
        config.llm.api_key = "sk".into();
        config.llm.model = "m".into();
        assert!(config.validate_llm().is_ok());
    }

    #[test]
    fn level_and_flag_parsing() {
        assert_eq!(parse_level("CRITICAL"), Some("error"));
        assert_eq!(parse_level(" Info "), Some("info"));
        assert_eq!(parse_level(""), None);
        assert!(parse_flag("Yes", false));
        assert!(!parse_flag("nope", true));
        assert!(parse_flag("", true));
    }

    #[test]
    fn load_from_missing_file_uses_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = JotterConfig::load_from(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.storage.items_collection, "items");
    }
}
