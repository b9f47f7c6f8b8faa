use anyhow::{Result, bail};
use reqwest::Client;
use std::{env, fs, path::PathBuf, sync::Arc, time::Duration};
use tracing::{info, warn};

use summarizer_ng::{
    extractor::html::HttpPageBridge,
    logging,
    models::settings::{JsonFileStore, PREDEFINED_URLS, UrlMode},
    orchestrator::Orchestrator,
    state::SummaryState,
    utils::mask_secret,
};

const USAGE: &str = "usage: summarizer-ng <command>

commands:
  summarize <url>        summarize the page at <url>
  models                 refresh and list available models
  set <field> <value>    update a setting (apiKey, apiUrl, apiUrlType, selectedModel, debugMode)
  show                   print the current settings";

fn env_secs(name: &str, default: u64) -> u64 {
    env::var(name)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();

    let http_client = Client::builder()
        .connect_timeout(Duration::from_secs(env_secs("CONNECTION_TIMEOUT", 10)))
        .timeout(Duration::from_secs(env_secs("REQUEST_TIMEOUT", 120)))
        .build()?;

    let args: Vec<String> = env::args().skip(1).collect();
    let command = args.first().map(String::as_str);
    let page_url = match command {
        Some("summarize") => args.get(1).cloned(),
        _ => None,
    };

    let store = Arc::new(JsonFileStore::new(JsonFileStore::default_path()));
    info!("Using settings at {}", store.path().display());
    let bridge = Arc::new(HttpPageBridge::new(http_client.clone(), page_url.clone()));
    let mut orchestrator = Orchestrator::new(http_client, bridge, store);
    if command == Some("summarize") && page_url.is_some() {
        orchestrator.startup().await;
    } else {
        orchestrator.load_settings();
    }

    let outcome = match command {
        Some("summarize") => summarize(&mut orchestrator).await,
        Some("models") => list_models(&mut orchestrator).await,
        Some("set") => set_field(&mut orchestrator, args.get(1), args.get(2)).await,
        Some("show") => {
            show(&orchestrator);
            Ok(())
        }
        _ => {
            eprintln!("{USAGE}");
            bail!("no command given");
        }
    };

    if let Some(notification) = orchestrator.notification() {
        eprintln!("[{}] {}", notification.severity, notification.message);
    }
    write_log_export(&orchestrator)?;
    outcome
}

async fn summarize(orchestrator: &mut Orchestrator) -> Result<()> {
    persist_auto_selection(orchestrator);
    match orchestrator.run_summarization().await {
        SummaryState::Ready(text) => {
            println!("{text}");
            Ok(())
        }
        SummaryState::Failed(err) => bail!("{err}"),
        SummaryState::Idle | SummaryState::Loading => bail!("summarization did not complete"),
    }
}

async fn list_models(orchestrator: &mut Orchestrator) -> Result<()> {
    let models = orchestrator.refresh_models().await.to_vec();
    if models.is_empty() {
        bail!("no models available");
    }
    persist_auto_selection(orchestrator);
    let selected = orchestrator.settings().selected_model();
    for model in &models {
        let marker = if Some(model.id.as_str()) == selected {
            "*"
        } else {
            " "
        };
        println!("{marker} {}", model.id);
    }
    Ok(())
}

async fn set_field(
    orchestrator: &mut Orchestrator,
    field: Option<&String>,
    value: Option<&String>,
) -> Result<()> {
    let (Some(field), Some(value)) = (field, value) else {
        eprintln!("{USAGE}");
        bail!("set requires a field and a value");
    };
    match field.as_str() {
        "apiKey" => orchestrator.set_api_key(value.as_str()),
        "apiUrl" => orchestrator.set_custom_url(value.as_str()),
        "apiUrlType" => orchestrator.set_url_mode(UrlMode::from_url_type(value)),
        "selectedModel" => orchestrator.select_model(Some(value.clone())),
        "debugMode" => orchestrator.set_debug_enabled(value.parse()?),
        other => bail!("unknown setting: {other}"),
    }
    orchestrator.save_settings().await?;
    Ok(())
}

/// Keeps a model picked during refresh for the next invocation.
fn persist_auto_selection(orchestrator: &Orchestrator) {
    match orchestrator.persist_selected_model() {
        Ok(true) => info!(
            "Saved model selection {}",
            orchestrator.settings().selected_model().unwrap_or_default()
        ),
        Ok(false) => {}
        Err(e) => warn!("Failed to save model selection: {e}"),
    }
}

fn show(orchestrator: &Orchestrator) {
    let settings = orchestrator.settings();
    let provider = match &settings.url_mode {
        UrlMode::Custom => "Custom",
        UrlMode::Predefined(url) => PREDEFINED_URLS
            .iter()
            .find(|p| p.url == url)
            .map_or("Unknown", |p| p.name),
    };
    println!("provider:      {provider}");
    println!("api url:       {}", settings.effective_base_url());
    println!("api key:       {}", mask_secret(&settings.api_key));
    println!(
        "model:         {}",
        settings.selected_model().unwrap_or("(none)")
    );
    println!("debug logging: {}", settings.debug_enabled);
}

fn write_log_export(orchestrator: &Orchestrator) -> Result<()> {
    let diagnostics = orchestrator.diagnostics();
    if !diagnostics.is_enabled() || diagnostics.is_empty() {
        return Ok(());
    }
    let export = orchestrator.export_log()?;
    let dir = env::var("SUMMARIZER_LOG_DIR").map_or_else(|_| PathBuf::from("."), PathBuf::from);
    let path = dir.join(&export.file_name);
    fs::write(&path, export.contents)?;
    info!("Debug log written to {}", path.display());
    eprintln!("debug log written to {}", path.display());
    Ok(())
}
