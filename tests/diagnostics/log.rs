use crate::helpers::{StaticBridge, TEST_API_KEY, configured_record, orchestrator_with};
use rstest::rstest;
use serde_json::{Value, json};
use summarizer_ng::{
    diagnostics::{DiagnosticLog, LogEntry, LogKind, redact::REDACTION_MASK},
    models::settings::StoredSettings,
};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path},
};

const TOKEN: &str = "sk-proj-Zx81yQkP0d9sLmN3";
/// Carries no `sk-` prefix, so only key- and bearer-based masking can catch it.
const OPAQUE_TOKEN: &str = "abcDEF123456tokenvalue";

#[rstest]
#[case::authorization_header(json!({ "headers": { "Authorization": format!("Bearer {TOKEN}") } }))]
#[case::lowercase_header(json!({ "headers": { "authorization": format!("bearer {TOKEN}") } }))]
#[case::api_key_field(json!({ "apiKey": TOKEN }))]
#[case::nested_list(json!({ "requests": [{ "x-api-key": TOKEN }] }))]
#[case::free_text(json!({ "note": format!("curl -H 'Authorization: Bearer {TOKEN}'") }))]
#[case::auth_token_header(json!({ "headers": { "X-Auth-Token": OPAQUE_TOKEN } }))]
#[case::api_token_field(json!({ "api-token": OPAQUE_TOKEN }))]
#[case::client_secret(json!({ "oauth": { "client_secret": OPAQUE_TOKEN } }))]
#[case::password_field(json!({ "proxy": { "password": OPAQUE_TOKEN } }))]
#[case::bearer_with_comma(json!({ "note": format!("Bearer a,{OPAQUE_TOKEN}") }))]
#[case::bearer_with_semicolon(json!({ "note": format!("bearer {OPAQUE_TOKEN};rest") }))]
fn stored_entries_never_hold_the_token(#[case] payload: Value) {
    let log = DiagnosticLog::new(true);
    log.record(LogKind::Request, "request sent", Some(payload));

    let stored = serde_json::to_string(&log.entries()).expect("entries serialize");
    assert!(!stored.contains(TOKEN), "token leaked: {stored}");
    assert!(!stored.contains(OPAQUE_TOKEN), "token leaked: {stored}");
    assert!(stored.contains(REDACTION_MASK));
}

#[test]
fn message_text_is_redacted_too() {
    let log = DiagnosticLog::new(true);
    log.record(
        LogKind::Error,
        format!("failed with header Authorization: Bearer {TOKEN}"),
        None,
    );
    let entries = log.entries();
    assert_eq!(
        entries[0].message,
        "failed with header Authorization: Bearer [REDACTED]"
    );
}

#[test]
fn export_is_an_ordered_json_array() {
    let log = DiagnosticLog::new(true);
    log.record(LogKind::ActionStart, "start", None);
    log.record(LogKind::Response, "done", Some(json!({ "status": 200 })));

    let export = log.export().expect("export serializes");
    assert!(export.file_name.starts_with("summarizer-debug-log-"));
    assert!(export.file_name.ends_with(".json"));
    assert!(!export.file_name.contains(':'));

    let entries: Vec<LogEntry> =
        serde_json::from_slice(&export.contents).expect("export is valid json");
    let messages: Vec<&str> = entries.iter().map(|e| e.message.as_str()).collect();
    assert_eq!(messages, vec!["start", "done"]);
    assert_eq!(entries[1].kind, LogKind::Response);
    assert_eq!(entries[1].payload, Some(json!({ "status": 200 })));

    let raw: Value = serde_json::from_slice(&export.contents).expect("valid json");
    assert_eq!(raw[0]["kind"], "action_start");
}

#[test]
fn cleared_log_exports_empty_array() {
    let log = DiagnosticLog::new(true);
    log.record(LogKind::Info, "something", None);
    log.clear();

    assert!(log.is_empty());
    let export = log.export().expect("export serializes");
    let raw: Value = serde_json::from_slice(&export.contents).expect("valid json");
    assert_eq!(raw, json!([]));
}

#[test]
fn disabled_log_stays_empty() {
    let log = DiagnosticLog::new(false);
    log.record(LogKind::Warning, "ignored", None);
    log.set_enabled(true);
    log.record(LogKind::Warning, "kept", None);
    log.set_enabled(false);
    log.record(LogKind::Warning, "ignored again", None);
    assert_eq!(log.len(), 1);
}

#[tokio::test]
async fn pipeline_run_is_logged_without_credentials() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/completions"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "choices": [{ "text": "Summary." }] })),
        )
        .mount(&server)
        .await;

    let record = StoredSettings {
        debug_mode: Some(true),
        ..configured_record(&format!("{}/v1", server.uri()))
    };
    let (mut orchestrator, _) = orchestrator_with(StaticBridge::with_text("Hello world"), record);
    orchestrator.run_summarization().await;

    let export = orchestrator.export_log().expect("export serializes");
    let contents = String::from_utf8(export.contents).expect("utf-8 export");
    assert!(!contents.contains(TEST_API_KEY));

    let kinds: Vec<LogKind> = orchestrator
        .diagnostics()
        .entries()
        .into_iter()
        .map(|e| e.kind)
        .collect();
    for expected in [
        LogKind::ActionStart,
        LogKind::Request,
        LogKind::Response,
        LogKind::Success,
        LogKind::Notification,
    ] {
        assert!(kinds.contains(&expected), "missing {expected:?} in {kinds:?}");
    }

    orchestrator.clear_log();
    assert!(orchestrator.diagnostics().is_empty());
}

#[tokio::test]
async fn debug_disabled_pipeline_records_nothing() {
    let (mut orchestrator, _) = orchestrator_with(
        StaticBridge::with_text(""),
        configured_record("http://127.0.0.1:9/v1"),
    );
    orchestrator.run_summarization().await;
    assert!(orchestrator.diagnostics().is_empty());
}
