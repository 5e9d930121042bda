//! Persisted scoring preferences.
//!
//! Only the LLM scorer reads these. The document is plain JSON so it can be
//! edited by hand; environment variables override whatever is on disk.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::gateway::openrouter::DEFAULT_BASE_URL;

pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_MAX_TOKENS: u32 = 1000;
pub const MAX_TOKENS_LIMIT: u32 = 16_000;
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 120;
pub const MAX_TIMEOUT_SECONDS: u64 = 600;
/// Upper bound for opt-in transport retries.
pub const MAX_RETRIES_LIMIT: u32 = 5;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("settings document is not valid JSON: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("invalid setting: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ModelChoice {
    #[default]
    #[serde(rename = "gpt-4")]
    Gpt4,
    #[serde(rename = "gpt-3.5-turbo")]
    Gpt35Turbo,
    #[serde(rename = "claude-2")]
    Claude2,
    #[serde(rename = "llama-2")]
    Llama2,
    /// Uses `custom_model_name` verbatim.
    #[serde(rename = "custom")]
    Custom,
}

impl ModelChoice {
    pub const ALL: [ModelChoice; 5] = [
        ModelChoice::Gpt4,
        ModelChoice::Gpt35Turbo,
        ModelChoice::Claude2,
        ModelChoice::Llama2,
        ModelChoice::Custom,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ModelChoice::Gpt4 => "gpt-4",
            ModelChoice::Gpt35Turbo => "gpt-3.5-turbo",
            ModelChoice::Claude2 => "claude-2",
            ModelChoice::Llama2 => "llama-2",
            ModelChoice::Custom => "custom",
        }
    }

    /// OpenRouter route for the preset models.
    pub fn route(self) -> Option<&'static str> {
        match self {
            ModelChoice::Gpt4 => Some("openai/gpt-4"),
            ModelChoice::Gpt35Turbo => Some("openai/gpt-3.5-turbo"),
            ModelChoice::Claude2 => Some("anthropic/claude-2"),
            ModelChoice::Llama2 => Some("meta-llama/llama-2-70b-chat"),
            ModelChoice::Custom => None,
        }
    }
}

impl fmt::Display for ModelChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelChoice {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        ModelChoice::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| SettingsError::Invalid(format!("unknown model choice: {s}")))
    }
}

#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringSettings {
    pub model: ModelChoice,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_model_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
    pub base_url: String,
    /// Per-request HTTP timeout.
    pub timeout_seconds: u64,
    /// Transport-level retries per request. Zero means a failed call surfaces
    /// to the caller as-is; raising it is an explicit opt-in.
    pub max_retries: u32,
}

impl Default for ScoringSettings {
    fn default() -> Self {
        Self {
            model: ModelChoice::default(),
            custom_model_name: None,
            api_key: None,
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
            max_retries: 0,
        }
    }
}

// Keeps the key out of logs.
impl fmt::Debug for ScoringSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScoringSettings")
            .field("model", &self.model)
            .field("custom_model_name", &self.custom_model_name)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("base_url", &self.base_url)
            .field("timeout_seconds", &self.timeout_seconds)
            .field("max_retries", &self.max_retries)
            .finish()
    }
}

impl ScoringSettings {
    pub fn default_path() -> PathBuf {
        if let Ok(path) = std::env::var("UX_TRIAGE_SETTINGS_PATH") {
            return PathBuf::from(path);
        }
        PathBuf::from(".ux_triage_settings.json")
    }

    /// Reads and validates a settings document. A missing file yields defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        let settings: Self = match std::fs::read_to_string(path) {
            Ok(raw) => serde_json::from_str(&raw)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no settings file; using defaults");
                Self::default()
            }
            Err(e) => return Err(e.into()),
        };
        settings.validate()?;
        Ok(settings)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), SettingsError> {
        self.validate()?;
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Applies environment overrides, then re-validates.
    pub fn apply_env(self) -> Result<Self, SettingsError> {
        self.apply_env_from(|name| std::env::var(name).ok())
    }

    /// [`ScoringSettings::apply_env`] over an arbitrary variable lookup.
    pub fn apply_env_from(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, SettingsError> {
        let key = lookup("UX_TRIAGE_API_KEY")
            .or_else(|| lookup("OPENROUTER_API_KEY"))
            .filter(|k| !k.trim().is_empty());
        if key.is_some() {
            self.api_key = key;
        }

        if let Some(model) = lookup("UX_TRIAGE_MODEL") {
            match model.parse::<ModelChoice>() {
                Ok(choice) => self.model = choice,
                // Anything that isn't a preset is taken as a custom model id.
                Err(_) => {
                    self.model = ModelChoice::Custom;
                    self.custom_model_name = Some(model);
                }
            }
        }

        if let Some(base_url) = lookup("UX_TRIAGE_BASE_URL") {
            self.base_url = base_url;
        }

        if let Some(raw) = lookup("UX_TRIAGE_TIMEOUT_SECONDS") {
            self.timeout_seconds = raw.trim().parse().map_err(|_| {
                SettingsError::Invalid(format!("UX_TRIAGE_TIMEOUT_SECONDS is not a number: {raw}"))
            })?;
        }

        if let Some(raw) = lookup("UX_TRIAGE_MAX_RETRIES") {
            self.max_retries = raw.trim().parse().map_err(|_| {
                SettingsError::Invalid(format!("UX_TRIAGE_MAX_RETRIES is not a number: {raw}"))
            })?;
        }

        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(SettingsError::Invalid(format!(
                "temperature {} outside [0, 2]",
                self.temperature
            )));
        }
        if !(1..=MAX_TOKENS_LIMIT).contains(&self.max_tokens) {
            return Err(SettingsError::Invalid(format!(
                "max_tokens {} outside [1, {MAX_TOKENS_LIMIT}]",
                self.max_tokens
            )));
        }
        if !(1..=MAX_TIMEOUT_SECONDS).contains(&self.timeout_seconds) {
            return Err(SettingsError::Invalid(format!(
                "timeout_seconds {} outside [1, {MAX_TIMEOUT_SECONDS}]",
                self.timeout_seconds
            )));
        }
        if self.max_retries > MAX_RETRIES_LIMIT {
            return Err(SettingsError::Invalid(format!(
                "max_retries {} above {MAX_RETRIES_LIMIT}",
                self.max_retries
            )));
        }
        if self.base_url.trim().is_empty() {
            return Err(SettingsError::Invalid("base_url is empty".into()));
        }
        self.model_id().map(|_| ())
    }

    /// Provider model id for the chosen model.
    pub fn model_id(&self) -> Result<String, SettingsError> {
        match self.model.route() {
            Some(route) => Ok(route.to_string()),
            None => self
                .custom_model_name
                .as_deref()
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(str::to_string)
                .ok_or_else(|| {
                    SettingsError::Invalid("custom model selected without custom_model_name".into())
                }),
        }
    }
}
