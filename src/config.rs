use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use url::Url;

const DIRECT_ENDPOINT: &str = "http://localhost:6060/chat";
const RELAY_PATH: &str = "/api/chat";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(try_from = "String")]
pub enum Variant {
    /// Posts `{ message }` straight to the chat service and reports failures inline.
    Direct,
    /// Posts through the page's relay with a persisted conversation hash; failures are only logged.
    #[default]
    Relay,
}

impl Variant {
    pub fn welcome(self) -> &'static str {
        match self {
            Variant::Direct => "Welcome! How can I help you today?",
            Variant::Relay => "Hello! How can I help you today?",
        }
    }

    pub fn shows_timestamps(self) -> bool {
        matches!(self, Variant::Direct)
    }

    pub fn shows_typing_indicator(self) -> bool {
        matches!(self, Variant::Relay)
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Variant::Direct => write!(f, "direct"),
            Variant::Relay => write!(f, "relay"),
        }
    }
}

impl FromStr for Variant {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "direct" | "a" => Ok(Variant::Direct),
            "relay" | "b" => Ok(Variant::Relay),
            other => bail!("unknown variant: {other} (expected direct or relay)"),
        }
    }
}

impl TryFrom<String> for Variant {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub widget: WidgetConfig,
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct WidgetConfig {
    #[serde(default)]
    pub variant: Variant,
    pub welcome: Option<String>,
    pub show_timestamps: Option<bool>,
    pub typing_indicator: Option<bool>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BackendConfig {
    pub endpoint: Option<String>,
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    #[serde(default = "default_storage_path")]
    pub path: PathBuf,
}

/// Presentation switches after per-variant defaults have been applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WidgetSettings {
    pub variant: Variant,
    pub welcome: String,
    pub show_timestamps: bool,
    pub typing_indicator: bool,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            base_url: default_base_url(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: default_storage_path(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read config: {}", path.display()))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let cfg: Config = toml::from_str(content).context("failed to parse config toml")?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        self.endpoint().map(|_| ())
    }

    pub fn settings(&self) -> WidgetSettings {
        let variant = self.widget.variant;
        WidgetSettings {
            variant,
            welcome: self
                .widget
                .welcome
                .clone()
                .unwrap_or_else(|| variant.welcome().to_string()),
            show_timestamps: self
                .widget
                .show_timestamps
                .unwrap_or(variant.shows_timestamps()),
            typing_indicator: self
                .widget
                .typing_indicator
                .unwrap_or(variant.shows_typing_indicator()),
        }
    }

    /// Resolves the chat endpoint. A path starting with `/` is joined to
    /// `backend.base_url`, the way a page resolves a relative fetch.
    pub fn endpoint(&self) -> Result<Url> {
        let raw = match (&self.backend.endpoint, self.widget.variant) {
            (Some(endpoint), _) => endpoint.trim(),
            (None, Variant::Direct) => DIRECT_ENDPOINT,
            (None, Variant::Relay) => RELAY_PATH,
        };
        if raw.is_empty() {
            bail!("backend.endpoint must not be empty");
        }

        if raw.starts_with('/') {
            let base = Url::parse(&self.backend.base_url)
                .with_context(|| format!("invalid backend.base_url: {}", self.backend.base_url))?;
            return base
                .join(raw)
                .with_context(|| format!("failed to resolve endpoint {raw} against {base}"));
        }

        Url::parse(raw).with_context(|| format!("invalid backend.endpoint: {raw}"))
    }
}

fn default_base_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_cwd() -> PathBuf {
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

fn default_storage_path() -> PathBuf {
    default_cwd().join(".chatpane/storage.json")
}
