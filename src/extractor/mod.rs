//! Reads the visible text of the active page.
//!
//! The page lives in a different execution context than the pipeline. All access
//! goes through [`PageBridge`], a request/response boundary that can fail on its
//! own terms (restricted pages, denied script execution) independently of any
//! backend traffic.

pub mod html;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::{BridgeError, ExtractionError};

/// A tab as reported by the boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tab {
    pub id: u32,
    pub url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TabQuery {
    ActiveInCurrentWindow,
}

/// The read-only script the page context is asked to evaluate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionScript {
    /// Equivalent of reading `document.documentElement.innerText`.
    DocumentInnerText,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionRequest {
    pub tab_id: u32,
    pub script: ExtractionScript,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExtractionResponse {
    /// `None` when the script produced no value.
    pub result: Option<String>,
}

#[async_trait]
pub trait PageBridge: Send + Sync {
    async fn query_tabs(&self, query: TabQuery) -> Result<Vec<Tab>, BridgeError>;

    async fn execute_script(
        &self,
        request: ExtractionRequest,
    ) -> Result<ExtractionResponse, BridgeError>;
}

#[derive(Clone)]
pub struct ContentExtractor {
    bridge: Arc<dyn PageBridge>,
}

impl ContentExtractor {
    #[must_use]
    pub fn new(bridge: Arc<dyn PageBridge>) -> Self {
        Self { bridge }
    }

    /// Returns the page text, or an empty string when the page has none.
    ///
    /// # Errors
    /// [`ExtractionError::NoActiveTab`] when no tab is focused, and
    /// [`ExtractionError::ScriptExecutionError`] when the boundary refuses or fails.
    pub async fn extract_active_tab_text(&self) -> Result<String, ExtractionError> {
        let tabs = self
            .bridge
            .query_tabs(TabQuery::ActiveInCurrentWindow)
            .await
            .map_err(|e| {
                warn!("Active tab query failed: {e}");
                ExtractionError::ScriptExecutionError(e.0)
            })?;
        let tab = tabs.into_iter().next().ok_or(ExtractionError::NoActiveTab)?;
        debug!("Extracting text from tab {} ({:?})", tab.id, tab.url);

        let response = self
            .bridge
            .execute_script(ExtractionRequest {
                tab_id: tab.id,
                script: ExtractionScript::DocumentInnerText,
            })
            .await
            .map_err(|e| {
                warn!("Script execution error: {e}");
                ExtractionError::ScriptExecutionError(e.0)
            })?;

        Ok(response.result.unwrap_or_default())
    }
}
