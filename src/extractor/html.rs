//! A [`PageBridge`] that treats a fetched URL as the active tab.

use async_trait::async_trait;
use reqwest::Client;
use scraper::{ElementRef, Html};
use tracing::{debug, info};

use super::{ExtractionRequest, ExtractionResponse, ExtractionScript, PageBridge, Tab, TabQuery};
use crate::error::BridgeError;

const PAGE_TAB_ID: u32 = 1;

/// Elements whose text is never rendered.
const HIDDEN_ELEMENTS: &[&str] = &["head", "script", "style", "noscript", "template", "iframe"];

/// Elements that sit on their own line(s) when rendered.
const BLOCK_ELEMENTS: &[&str] = &[
    "address", "article", "aside", "blockquote", "body", "dd", "details", "div", "dl", "dt",
    "fieldset", "figcaption", "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6",
    "header", "hr", "html", "li", "main", "nav", "ol", "p", "pre", "section", "summary", "table",
    "td", "th", "tr", "ul",
];

pub struct HttpPageBridge {
    client: Client,
    url: Option<String>,
}

impl HttpPageBridge {
    #[must_use]
    pub fn new(client: Client, url: Option<String>) -> Self {
        Self { client, url }
    }
}

#[async_trait]
impl PageBridge for HttpPageBridge {
    async fn query_tabs(&self, query: TabQuery) -> Result<Vec<Tab>, BridgeError> {
        match query {
            TabQuery::ActiveInCurrentWindow => Ok(self
                .url
                .iter()
                .map(|url| Tab {
                    id: PAGE_TAB_ID,
                    url: Some(url.clone()),
                })
                .collect()),
        }
    }

    async fn execute_script(
        &self,
        request: ExtractionRequest,
    ) -> Result<ExtractionResponse, BridgeError> {
        let url = match (&self.url, request.tab_id) {
            (Some(url), PAGE_TAB_ID) => url,
            _ => return Err(BridgeError(format!("No tab with id: {}", request.tab_id))),
        };
        info!("Fetching page {url}");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| BridgeError(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(BridgeError(format!("page responded with status {status}")));
        }
        let body = response
            .text()
            .await
            .map_err(|e| BridgeError(e.to_string()))?;
        debug!("Fetched {} bytes of markup", body.len());

        let result = match request.script {
            ExtractionScript::DocumentInnerText => visible_text(&body),
        };
        Ok(ExtractionResponse {
            result: Some(result),
        })
    }
}

/// Approximates `innerText`: inline runs share a line with whitespace collapsed,
/// and block elements and `<br>` start a new one.
#[must_use]
pub fn visible_text(markup: &str) -> String {
    let document = Html::parse_document(markup);
    let mut lines = Vec::new();
    let mut line = String::new();
    collect_text(document.root_element(), &mut lines, &mut line);
    flush_line(&mut lines, &mut line);
    lines.join("\n")
}

fn collect_text(element: ElementRef<'_>, lines: &mut Vec<String>, line: &mut String) {
    let name = element.value().name();
    if HIDDEN_ELEMENTS.contains(&name) || element.value().attr("hidden").is_some() {
        return;
    }
    if name == "br" {
        flush_line(lines, line);
        return;
    }
    let block = BLOCK_ELEMENTS.contains(&name);
    if block {
        flush_line(lines, line);
    }
    for child in element.children() {
        if let Some(text) = child.value().as_text() {
            line.push_str(text);
        } else if let Some(child) = ElementRef::wrap(child) {
            collect_text(child, lines, line);
        }
    }
    if block {
        flush_line(lines, line);
    }
}

fn flush_line(lines: &mut Vec<String>, line: &mut String) {
    let collapsed = line.split_whitespace().collect::<Vec<_>>().join(" ");
    if !collapsed.is_empty() {
        lines.push(collapsed);
    }
    line.clear();
}
