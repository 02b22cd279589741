//! Configuration management for the notebook client

use serde::Deserialize;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    pub api: ApiConfig,
    pub autosave: AutosaveConfig,
    pub anchors: AnchorConfig,
    pub highlights: HighlightSettings,
    pub preferences_path: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Scheme and host, e.g. `http://localhost:8000`
    pub base_url: String,
    /// Deployment prefix in front of `/api/v1`, empty for local development
    pub root_path: String,
    /// Bearer token attached to every request
    pub token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AutosaveConfig {
    pub debounce_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnchorConfig {
    /// UTF-16 code units of the anchor used for persistent matching
    pub prefix_units: usize,
    /// UTF-16 code units used for hover previews
    pub preview_prefix_units: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HighlightSettings {
    pub default_color: String,
    pub pulse_ms: u64,
}

impl AutosaveConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

impl HighlightSettings {
    pub fn pulse(&self) -> Duration {
        Duration::from_millis(self.pulse_ms)
    }
}

impl ApiConfig {
    /// Base of every API path
    pub fn api_root(&self) -> String {
        format!(
            "{}{}/api/v1",
            self.base_url.trim_end_matches('/'),
            self.root_path.trim_end_matches('/')
        )
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        ApiConfig {
            base_url: "http://localhost:8000".to_string(),
            root_path: String::new(),
            token: None,
        }
    }
}

impl Default for AutosaveConfig {
    fn default() -> Self {
        AutosaveConfig { debounce_ms: 2000 }
    }
}

impl Default for AnchorConfig {
    fn default() -> Self {
        AnchorConfig {
            prefix_units: 80,
            preview_prefix_units: 50,
        }
    }
}

impl Default for HighlightSettings {
    fn default() -> Self {
        HighlightSettings {
            default_color: "#fff59d".to_string(),
            pulse_ms: 2000,
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            api: ApiConfig::default(),
            autosave: AutosaveConfig::default(),
            anchors: AnchorConfig::default(),
            highlights: HighlightSettings::default(),
            preferences_path: PathBuf::from("./notebook-preferences.json"),
        }
    }
}

impl ClientConfig {
    /// Build configuration from the environment, falling back to defaults
    /// for anything unset or unparsable.
    pub fn from_env() -> Self {
        let defaults = ClientConfig::default();

        ClientConfig {
            api: ApiConfig {
                base_url: env::var("NOTEBOOK_API_URL").unwrap_or(defaults.api.base_url),
                root_path: env::var("NOTEBOOK_ROOT_PATH").unwrap_or_default(),
                token: env::var("NOTEBOOK_API_TOKEN").ok().filter(|t| !t.is_empty()),
            },
            autosave: AutosaveConfig {
                debounce_ms: parse_var("NOTEBOOK_AUTOSAVE_DELAY_MS")
                    .unwrap_or(defaults.autosave.debounce_ms),
            },
            anchors: AnchorConfig {
                prefix_units: parse_var("NOTEBOOK_ANCHOR_PREFIX")
                    .unwrap_or(defaults.anchors.prefix_units),
                preview_prefix_units: parse_var("NOTEBOOK_PREVIEW_PREFIX")
                    .unwrap_or(defaults.anchors.preview_prefix_units),
            },
            highlights: HighlightSettings {
                default_color: defaults.highlights.default_color,
                pulse_ms: parse_var("NOTEBOOK_PULSE_MS").unwrap_or(defaults.highlights.pulse_ms),
            },
            preferences_path: env::var("NOTEBOOK_PREFERENCES_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.preferences_path),
        }
    }
}

fn parse_var<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.trim().parse().ok())
}
