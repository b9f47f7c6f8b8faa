use std::{collections::HashSet, sync::Arc};

use reqwest::{
    Client, Response,
    header::{AUTHORIZATION, CONTENT_TYPE},
};
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use crate::{
    diagnostics::{DiagnosticLog, LogKind},
    error::ApiError,
    models::{
        ModelDescriptor, SamplingParams,
        openai::{CompletionRequest, CompletionResponse, ErrorEnvelope, ModelEntry},
    },
    utils::endpoint_url,
};

/// Talks to an OpenAI-compatible backend. No retries; a failed call is reported once.
#[derive(Clone)]
pub struct BackendClient {
    http_client: Client,
    diagnostics: Arc<DiagnosticLog>,
}

impl BackendClient {
    #[must_use]
    pub fn new(http_client: Client, diagnostics: Arc<DiagnosticLog>) -> Self {
        Self {
            http_client,
            diagnostics,
        }
    }

    /// Lists models newest first.
    ///
    /// # Errors
    /// Any [`ApiError`]; a body without a `data` list is [`ApiError::MalformedResponse`].
    pub async fn list_models(
        &self,
        base_url: &str,
        api_key: &str,
    ) -> Result<Vec<ModelDescriptor>, ApiError> {
        let url = endpoint_url(base_url, "models");
        info!("Fetching models from {url}");
        self.diagnostics.record(
            LogKind::Request,
            format!("GET {url}"),
            Some(json!({
                "method": "GET",
                "url": url,
                "headers": request_headers(api_key),
            })),
        );

        let response = self
            .http_client
            .get(&url)
            .header(AUTHORIZATION, format!("Bearer {api_key}"))
            .header(CONTENT_TYPE, "application/json")
            .send()
            .await
            .map_err(|e| self.transport_failure(e))?;
        let body = self.read_success_body(response).await?;

        let Some(data) = body.get("data").and_then(Value::as_array) else {
            return Err(self.malformed("expected a `data` list of models"));
        };
        let entries: Vec<ModelEntry> = serde_json::from_value(Value::Array(data.clone()))
            .map_err(|e| self.malformed(&e.to_string()))?;
        let models = sort_models(entries);
        debug!("Received {} models", models.len());
        Ok(models)
    }

    /// Requests a completion and returns the first choice's text.
    ///
    /// # Errors
    /// Any [`ApiError`]; missing or empty `choices` is [`ApiError::MalformedResponse`].
    pub async fn create_completion(
        &self,
        base_url: &str,
        api_key: &str,
        model: &str,
        prompt: &str,
        params: SamplingParams,
    ) -> Result<String, ApiError> {
        let url = endpoint_url(base_url, "completions");
        let request = CompletionRequest {
            model: model.to_string(),
            prompt: prompt.to_string(),
            temperature: params.temperature,
            max_tokens: params.max_tokens,
            top_p: params.top_p,
            frequency_penalty: params.frequency_penalty,
            presence_penalty: params.presence_penalty,
        };
        info!("Requesting completion from {url} with model {model}");
        self.diagnostics.record(
            LogKind::Request,
            format!("POST {url}"),
            Some(json!({
                "method": "POST",
                "url": url,
                "headers": request_headers(api_key),
                "body": request,
            })),
        );

        let response = self
            .http_client
            .post(&url)
            .header(AUTHORIZATION, format!("Bearer {api_key}"))
            .header(CONTENT_TYPE, "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| self.transport_failure(e))?;
        let body = self.read_success_body(response).await?;

        let completion: CompletionResponse =
            serde_json::from_value(body).map_err(|e| self.malformed(&e.to_string()))?;
        let Some(choice) = completion.choices.into_iter().next() else {
            return Err(self.malformed("response contained no choices"));
        };
        choice
            .text
            .ok_or_else(|| self.malformed("first choice has no text"))
    }

    /// Parses a successful body as JSON, or turns a failed status into an [`ApiError`].
    async fn read_success_body(&self, response: Response) -> Result<Value, ApiError> {
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| self.transport_failure(e))?;
        let body: Option<Value> = serde_json::from_str(&text).ok();
        self.diagnostics.record(
            LogKind::Response,
            format!("Response status {}", status.as_u16()),
            Some(json!({
                "status": status.as_u16(),
                "body": body.clone().unwrap_or_else(|| Value::String(text.clone())),
            })),
        );

        if status.is_success() {
            return body.ok_or_else(|| self.malformed("response body is not valid JSON"));
        }

        let message = body
            .and_then(|value| serde_json::from_value::<ErrorEnvelope>(value).ok())
            .and_then(|envelope| envelope.message().map(str::to_string))
            .unwrap_or_else(|| format!("API request failed with status {}", status.as_u16()));
        warn!("Backend responded with {status}: {message}");
        Err(ApiError::from_status(status, message))
    }

    fn transport_failure(&self, err: reqwest::Error) -> ApiError {
        let err = ApiError::from(err);
        warn!("Transport failure: {err}");
        self.diagnostics
            .record(LogKind::Error, format!("Transport failure: {err}"), None);
        err
    }

    fn malformed(&self, detail: &str) -> ApiError {
        warn!("Malformed backend response: {detail}");
        self.diagnostics.record(
            LogKind::Error,
            format!("Malformed backend response: {detail}"),
            None,
        );
        ApiError::MalformedResponse(detail.to_string())
    }
}

fn request_headers(api_key: &str) -> Value {
    json!({
        "Authorization": format!("Bearer {api_key}"),
        "Content-Type": "application/json",
    })
}

/// Newest first; equal timestamps keep response order. Later duplicates of an id are dropped.
#[must_use]
pub fn sort_models(entries: Vec<ModelEntry>) -> Vec<ModelDescriptor> {
    let mut models: Vec<ModelDescriptor> = entries.into_iter().map(ModelDescriptor::from).collect();
    models.sort_by(|a, b| b.created_at.total_cmp(&a.created_at));
    let mut seen = HashSet::new();
    models.retain(|model| seen.insert(model.id.clone()));
    models
}
