//! Sequences extraction, prompting and the backend round-trip, and turns every
//! outcome into a [`SummaryState`] plus a [`Notification`].
//!
//! Runs on a single event context: methods take `&mut self`, and a new run is
//! refused while one is in flight. Dropping a run's future mid-flight puts its
//! state back to idle, so the next call starts over.

use std::sync::Arc;

use reqwest::Client;
use serde_json::json;
use tracing::{debug, error, info, warn};

use crate::{
    client::BackendClient,
    diagnostics::{DiagnosticLog, LogExport, LogKind},
    error::{ConfigurationError, PipelineError, SettingsError, StoreError},
    extractor::{ContentExtractor, PageBridge},
    models::{
        ModelDescriptor, SamplingParams,
        settings::{Settings, SettingsStore, UrlMode},
    },
    prompt::{MAX_CONTENT_CHARS, build_prompt},
    state::{Notification, Severity, SummaryState},
};

/// Holds a field in its busy value until dropped, then puts back the default.
struct InFlight<'a, T: Default>(&'a mut T);

impl<'a, T: Default> InFlight<'a, T> {
    fn start(slot: &'a mut T, busy: T) -> Self {
        *slot = busy;
        Self(slot)
    }
}

impl<T: Default> Drop for InFlight<'_, T> {
    fn drop(&mut self) {
        *self.0 = T::default();
    }
}

pub struct Orchestrator {
    settings: Settings,
    models: Vec<ModelDescriptor>,
    summary: SummaryState,
    notification: Option<Notification>,
    settings_requested: bool,
    refreshing_models: bool,
    sampling: SamplingParams,
    store: Arc<dyn SettingsStore>,
    extractor: ContentExtractor,
    client: BackendClient,
    diagnostics: Arc<DiagnosticLog>,
}

impl Orchestrator {
    #[must_use]
    pub fn new(
        http_client: Client,
        bridge: Arc<dyn PageBridge>,
        store: Arc<dyn SettingsStore>,
    ) -> Self {
        let diagnostics = Arc::new(DiagnosticLog::new(false));
        Self {
            settings: Settings::default(),
            models: Vec::new(),
            summary: SummaryState::Idle,
            notification: None,
            settings_requested: false,
            refreshing_models: false,
            sampling: SamplingParams::default(),
            store,
            extractor: ContentExtractor::new(bridge),
            client: BackendClient::new(http_client, Arc::clone(&diagnostics)),
            diagnostics,
        }
    }

    /// Merges the stored record over the defaults. An unreadable store leaves defaults in place.
    pub fn load_settings(&mut self) {
        match self.store.load() {
            Ok(stored) => {
                self.settings = Settings::default().merge_stored(stored);
                debug!("Loaded settings for {}", self.settings.effective_base_url());
            }
            Err(e) => warn!("Failed to load settings, using defaults: {e}"),
        }
        self.diagnostics.set_enabled(self.settings.debug_enabled);
        self.diagnostics.record(
            LogKind::Info,
            "Settings loaded",
            Some(json!(self.settings.to_stored())),
        );
    }

    /// Loads settings and fetches models when enough is configured to do so.
    pub async fn startup(&mut self) {
        self.load_settings();
        if self.settings.has_api_key() && !self.settings.effective_base_url().is_empty() {
            self.refresh_models().await;
        }
    }

    pub async fn run_summarization(&mut self) -> &SummaryState {
        if self.summary.is_loading() {
            debug!("Summarization already in progress, ignoring request");
            return &self.summary;
        }
        self.diagnostics
            .record(LogKind::ActionStart, "Summarization requested", None);

        if let Err(err) = self.summary_preconditions() {
            warn!("Summarization blocked: {err}");
            self.settings_requested = true;
            self.notify(Severity::Warning, err.to_string());
            self.summary = SummaryState::Failed(err.into());
            return &self.summary;
        }

        let outcome = {
            let _loading = InFlight::start(&mut self.summary, SummaryState::Loading);
            summarize(
                &self.settings,
                &self.extractor,
                &self.client,
                &self.diagnostics,
                self.sampling,
            )
            .await
        };
        match outcome {
            Ok(text) => {
                info!("Summary generated ({} chars)", text.len());
                self.diagnostics.record(
                    LogKind::Success,
                    "Summary generated",
                    Some(json!({ "chars": text.chars().count() })),
                );
                self.summary = SummaryState::Ready(text);
                self.notify(Severity::Success, "Summary generated successfully!");
            }
            Err(err) => {
                error!("Summarization failed: {err}");
                self.diagnostics.record(
                    LogKind::Error,
                    format!("Summarization failed: {err}"),
                    Some(json!({ "cause": format!("{err:?}") })),
                );
                self.notify(
                    Severity::Error,
                    format!("Failed to generate summary: {err}"),
                );
                self.summary = SummaryState::Failed(err);
            }
        }
        &self.summary
    }

    fn summary_preconditions(&self) -> Result<(), ConfigurationError> {
        if !self.settings.has_api_key() {
            return Err(ConfigurationError::MissingApiKey);
        }
        if self.settings.selected_model().is_none() {
            return Err(ConfigurationError::MissingModel);
        }
        if self.settings.effective_base_url().trim().is_empty() {
            return Err(ConfigurationError::MissingBaseUrl);
        }
        Ok(())
    }

    pub async fn refresh_models(&mut self) -> &[ModelDescriptor] {
        if self.refreshing_models {
            debug!("Model refresh already in progress, ignoring request");
            return &self.models;
        }
        self.diagnostics
            .record(LogKind::ActionStart, "Model refresh requested", None);

        let blocked = if !self.settings.has_api_key() {
            Some(ConfigurationError::MissingApiKey)
        } else if self.settings.effective_base_url().trim().is_empty() {
            Some(ConfigurationError::MissingBaseUrl)
        } else {
            None
        };
        if let Some(err) = blocked {
            warn!("Model refresh blocked: {err}");
            self.notify(Severity::Warning, err.to_string());
            return &self.models;
        }

        let result = {
            let _refreshing = InFlight::start(&mut self.refreshing_models, true);
            self.client
                .list_models(self.settings.effective_base_url(), &self.settings.api_key)
                .await
        };

        match result {
            Ok(models) => {
                info!("Loaded {} models", models.len());
                self.models = models;
                self.notify(Severity::Success, "Models loaded successfully");
                if self.settings.selected_model().is_none()
                    && let Some(newest) = self.models.first()
                {
                    debug!("Auto-selecting model {}", newest.id);
                    self.diagnostics.record(
                        LogKind::Info,
                        format!("Auto-selected model {}", newest.id),
                        None,
                    );
                    self.settings.selected_model = Some(newest.id.clone());
                }
            }
            Err(err) => {
                error!("Failed to fetch models: {err}");
                self.diagnostics.record(
                    LogKind::Error,
                    format!("Failed to fetch models: {err}"),
                    Some(json!({ "cause": format!("{err:?}") })),
                );
                self.models.clear();
                self.notify(Severity::Error, format!("Failed to fetch models: {err}"));
            }
        }
        &self.models
    }

    /// Models from one backend never carry over to another.
    pub fn set_url_mode(&mut self, mode: UrlMode) {
        if self.settings.url_mode == mode {
            return;
        }
        debug!("URL mode changed to {}", mode.as_url_type());
        self.diagnostics.record(
            LogKind::Info,
            format!("API URL type changed to {}", mode.as_url_type()),
            None,
        );
        if !mode.is_custom() {
            self.settings.custom_url.clear();
        }
        self.settings.url_mode = mode;
        self.models.clear();
        self.settings.selected_model = None;
    }

    pub fn set_api_key(&mut self, api_key: impl Into<String>) {
        self.settings.api_key = api_key.into();
    }

    pub fn set_custom_url(&mut self, url: impl Into<String>) {
        self.settings.custom_url = url.into();
    }

    pub fn select_model(&mut self, model: Option<String>) {
        self.settings.selected_model = model.filter(|m| !m.is_empty());
    }

    pub fn set_debug_enabled(&mut self, enabled: bool) {
        self.settings.debug_enabled = enabled;
    }

    /// Persists the current settings, then refreshes models for the saved backend.
    ///
    /// # Errors
    /// [`SettingsError::Configuration`] for a missing key or custom URL (nothing is
    /// written), [`SettingsError::Store`] when the store rejects the record.
    pub async fn save_settings(&mut self) -> Result<(), SettingsError> {
        if !self.settings.has_api_key() {
            let err = ConfigurationError::MissingApiKey;
            self.notify(Severity::Warning, err.to_string());
            return Err(err.into());
        }
        if self.settings.url_mode.is_custom() && self.settings.custom_url.trim().is_empty() {
            let err = ConfigurationError::MissingBaseUrl;
            self.notify(Severity::Warning, err.to_string());
            return Err(err.into());
        }

        let record = self.settings.to_stored();
        if let Err(e) = self.store.save(&record) {
            error!("Failed to save settings: {e}");
            self.notify(Severity::Error, format!("Failed to save settings: {e}"));
            return Err(e.into());
        }
        self.diagnostics.set_enabled(self.settings.debug_enabled);
        self.diagnostics
            .record(LogKind::Info, "Settings saved", Some(json!(record)));
        self.settings_requested = false;
        self.notify(Severity::Success, "Settings saved successfully");

        if self.settings.has_api_key() && !self.settings.effective_base_url().is_empty() {
            self.refresh_models().await;
            self.persist_selected_model()?;
        }
        Ok(())
    }

    /// Writes the current model selection into the stored record, leaving every
    /// other stored field as it was. Returns whether anything was written.
    ///
    /// # Errors
    /// Returns an error if the store cannot be read or written.
    pub fn persist_selected_model(&self) -> Result<bool, StoreError> {
        let mut record = self.store.load()?;
        let selected = self.settings.selected_model();
        if record.selected_model.as_deref().filter(|m| !m.is_empty()) == selected {
            return Ok(false);
        }
        record.selected_model = Some(selected.unwrap_or_default().to_string());
        self.store.save(&record)?;
        debug!("Persisted model selection {selected:?}");
        self.diagnostics.record(
            LogKind::Info,
            "Model selection saved",
            Some(json!({ "selectedModel": selected })),
        );
        Ok(true)
    }

    fn notify(&mut self, severity: Severity, message: impl Into<String>) {
        let notification = Notification::new(message, severity);
        debug!("Notification ({severity}): {}", notification.message);
        self.diagnostics.record(
            LogKind::Notification,
            &notification.message,
            Some(json!({ "severity": severity })),
        );
        self.notification = Some(notification);
    }

    pub fn dismiss_notification(&mut self) {
        self.notification = None;
    }

    /// # Errors
    /// Returns an error if the log cannot be serialized.
    pub fn export_log(&self) -> Result<LogExport, serde_json::Error> {
        self.diagnostics.export()
    }

    pub fn clear_log(&self) {
        self.diagnostics.clear();
    }

    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    #[must_use]
    pub fn models(&self) -> &[ModelDescriptor] {
        &self.models
    }

    #[must_use]
    pub fn summary(&self) -> &SummaryState {
        &self.summary
    }

    #[must_use]
    pub fn notification(&self) -> Option<&Notification> {
        self.notification.as_ref()
    }

    /// Set when a configuration gap should send the user to the settings form.
    #[must_use]
    pub fn settings_requested(&self) -> bool {
        self.settings_requested
    }

    #[must_use]
    pub fn diagnostics(&self) -> &Arc<DiagnosticLog> {
        &self.diagnostics
    }
}

async fn summarize(
    settings: &Settings,
    extractor: &ContentExtractor,
    client: &BackendClient,
    diagnostics: &DiagnosticLog,
    sampling: SamplingParams,
) -> Result<String, PipelineError> {
    let model = settings
        .selected_model()
        .ok_or(ConfigurationError::MissingModel)?;

    diagnostics.record(LogKind::Info, "Extracting active tab content", None);
    let raw_text = extractor.extract_active_tab_text().await?;
    if raw_text.trim().is_empty() {
        return Err(PipelineError::NoContent);
    }

    let content_chars = raw_text.chars().count();
    let prompt = build_prompt(&raw_text);
    diagnostics.record(
        LogKind::Info,
        "Prompt built",
        Some(json!({
            "content_chars": content_chars,
            "truncated": content_chars > MAX_CONTENT_CHARS,
            "prompt_chars": prompt.chars().count(),
        })),
    );

    Ok(client
        .create_completion(
            settings.effective_base_url(),
            &settings.api_key,
            model,
            &prompt,
            sampling,
        )
        .await?)
}
