use std::{
    env, fs,
    path::{Path, PathBuf},
    sync::{Mutex, PoisonError},
};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::StoreError;

pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const CUSTOM_URL_TYPE: &str = "Custom";

#[derive(Debug, Clone, Copy)]
pub struct PredefinedUrl {
    pub name: &'static str,
    pub url: &'static str,
}

pub const PREDEFINED_URLS: &[PredefinedUrl] = &[PredefinedUrl {
    name: "OpenAI Official",
    url: OPENAI_BASE_URL,
}];

/// Where the backend base URL comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UrlMode {
    Predefined(String),
    Custom,
}

impl Default for UrlMode {
    fn default() -> Self {
        UrlMode::Predefined(OPENAI_BASE_URL.to_string())
    }
}

impl UrlMode {
    /// Parses the persisted `apiUrlType` value: either a predefined URL or `"Custom"`.
    #[must_use]
    pub fn from_url_type(value: &str) -> Self {
        if value == CUSTOM_URL_TYPE {
            UrlMode::Custom
        } else {
            UrlMode::Predefined(value.to_string())
        }
    }

    #[must_use]
    pub fn as_url_type(&self) -> &str {
        match self {
            UrlMode::Predefined(url) => url,
            UrlMode::Custom => CUSTOM_URL_TYPE,
        }
    }

    #[must_use]
    pub fn is_custom(&self) -> bool {
        matches!(self, UrlMode::Custom)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settings {
    pub api_key: String,
    pub custom_url: String,
    pub url_mode: UrlMode,
    pub selected_model: Option<String>,
    pub debug_enabled: bool,
}

impl Settings {
    /// The base URL requests are sent to.
    #[must_use]
    pub fn effective_base_url(&self) -> &str {
        match &self.url_mode {
            UrlMode::Predefined(url) => url,
            UrlMode::Custom => &self.custom_url,
        }
    }

    #[must_use]
    pub fn has_api_key(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    #[must_use]
    pub fn selected_model(&self) -> Option<&str> {
        self.selected_model
            .as_deref()
            .filter(|model| !model.is_empty())
    }

    /// Overlays a stored record; unset or empty fields keep their current value.
    #[must_use]
    pub fn merge_stored(mut self, stored: StoredSettings) -> Self {
        if let Some(api_key) = stored.api_key.filter(|v| !v.is_empty()) {
            self.api_key = api_key;
        }
        if let Some(api_url) = stored.api_url.filter(|v| !v.is_empty()) {
            self.custom_url = api_url;
        }
        if let Some(model) = stored.selected_model.filter(|v| !v.is_empty()) {
            self.selected_model = Some(model);
        }
        if let Some(url_type) = stored.api_url_type.filter(|v| !v.is_empty()) {
            self.url_mode = UrlMode::from_url_type(&url_type);
        }
        if let Some(debug_mode) = stored.debug_mode {
            self.debug_enabled = debug_mode;
        }
        self
    }

    #[must_use]
    pub fn to_stored(&self) -> StoredSettings {
        StoredSettings {
            api_key: Some(self.api_key.clone()),
            api_url: Some(self.custom_url.clone()),
            selected_model: Some(self.selected_model.clone().unwrap_or_default()),
            api_url_type: Some(self.url_mode.as_url_type().to_string()),
            debug_mode: Some(self.debug_enabled),
        }
    }
}

/// The keyed record exchanged with a settings store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debug_mode: Option<bool>,
}

pub trait SettingsStore: Send + Sync {
    /// # Errors
    /// Returns a [`StoreError`] when the backing storage cannot be read or parsed.
    fn load(&self) -> Result<StoredSettings, StoreError>;

    /// # Errors
    /// Returns a [`StoreError`] when the record cannot be written.
    fn save(&self, record: &StoredSettings) -> Result<(), StoreError>;
}

#[derive(Debug, Default)]
pub struct MemorySettingsStore {
    record: Mutex<StoredSettings>,
}

impl MemorySettingsStore {
    #[must_use]
    pub fn new(record: StoredSettings) -> Self {
        Self {
            record: Mutex::new(record),
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> StoredSettings {
        self.record
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl SettingsStore for MemorySettingsStore {
    fn load(&self) -> Result<StoredSettings, StoreError> {
        Ok(self.snapshot())
    }

    fn save(&self, record: &StoredSettings) -> Result<(), StoreError> {
        *self.record.lock().unwrap_or_else(PoisonError::into_inner) = record.clone();
        Ok(())
    }
}

/// Persists the settings record as pretty-printed JSON.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `SUMMARIZER_SETTINGS`, else the user config directory, else the working directory.
    #[must_use]
    pub fn default_path() -> PathBuf {
        if let Ok(path) = env::var("SUMMARIZER_SETTINGS") {
            return PathBuf::from(path);
        }
        dirs::config_dir().map_or_else(
            || PathBuf::from("summarizer-ng-settings.json"),
            |dir| dir.join("summarizer-ng").join("settings.json"),
        )
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SettingsStore for JsonFileStore {
    fn load(&self) -> Result<StoredSettings, StoreError> {
        if !self.path.exists() {
            debug!("No settings file at {}", self.path.display());
            return Ok(StoredSettings::default());
        }
        let content = fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&content)?)
    }

    fn save(&self, record: &StoredSettings) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_string_pretty(record)?)?;
        debug!("Settings written to {}", self.path.display());
        Ok(())
    }
}
