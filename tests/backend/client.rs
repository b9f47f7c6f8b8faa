use crate::helpers::TEST_API_KEY;
use reqwest::Client;
use rstest::rstest;
use serde_json::json;
use std::{sync::Arc, time::Duration};
use summarizer_ng::{
    client::BackendClient,
    diagnostics::DiagnosticLog,
    error::ApiError,
    models::{ModelDescriptor, SamplingParams},
};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_json, header, method, path},
};

fn client() -> BackendClient {
    BackendClient::new(Client::new(), Arc::new(DiagnosticLog::new(false)))
}

async fn backend() -> (MockServer, String) {
    let server = MockServer::start().await;
    let base_url = format!("{}/v1", server.uri());
    (server, base_url)
}

#[tokio::test]
async fn list_models_is_newest_first() {
    let (server, base_url) = backend().await;
    Mock::given(method("GET"))
        .and(path("/v1/models"))
        .and(header("authorization", format!("Bearer {TEST_API_KEY}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "object": "list",
            "data": [
                { "id": "a", "created": 100, "owned_by": "org" },
                { "id": "b", "created": 200, "owned_by": "org" },
                { "id": "c", "created": 200 },
                { "id": "d", "created": 50 }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let models = client()
        .list_models(&base_url, TEST_API_KEY)
        .await
        .expect("models listed");

    assert!(
        models
            .windows(2)
            .all(|pair| pair[0].created_at >= pair[1].created_at)
    );
    let ids: Vec<&str> = models.iter().map(|m| m.id.as_str()).collect();
    assert_eq!(ids, vec!["b", "c", "a", "d"]);
}

#[tokio::test]
async fn list_models_accepts_fractional_created() {
    let (server, base_url) = backend().await;
    Mock::given(method("GET"))
        .and(path("/v1/models"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{ "id": "a", "created": 100 }, { "id": "b", "created": 1.7e9 }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let models = client()
        .list_models(&base_url, TEST_API_KEY)
        .await
        .expect("fractional timestamps are accepted");

    let ids: Vec<&str> = models.iter().map(|m| m.id.as_str()).collect();
    assert_eq!(ids, vec!["b", "a"]);
    assert!((models[0].created_at - 1.7e9).abs() < f64::EPSILON);
}

#[tokio::test]
async fn list_models_accepts_trailing_slash_in_base_url() {
    let (server, base_url) = backend().await;
    Mock::given(method("GET"))
        .and(path("/v1/models"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": [] })))
        .expect(1)
        .mount(&server)
        .await;

    let models = client()
        .list_models(&format!("{base_url}/"), TEST_API_KEY)
        .await
        .expect("models listed");
    assert_eq!(models, Vec::<ModelDescriptor>::new());
}

#[rstest]
#[case::missing_data(json!({ "object": "list" }))]
#[case::data_not_a_list(json!({ "data": { "id": "a" } }))]
#[case::entry_without_id(json!({ "data": [{ "created": 1 }] }))]
#[tokio::test]
async fn list_models_rejects_bad_shapes(#[case] body: serde_json::Value) {
    let (server, base_url) = backend().await;
    Mock::given(method("GET"))
        .and(path("/v1/models"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(&server)
        .await;

    let err = client()
        .list_models(&base_url, TEST_API_KEY)
        .await
        .expect_err("malformed body");
    assert!(matches!(err, ApiError::MalformedResponse(_)));
}

#[rstest]
#[case::unauthorized(401, "invalid api key")]
#[case::forbidden(403, "forbidden")]
#[case::not_found(404, "model not found")]
#[case::rate_limited(429, "rate limit reached")]
#[case::server(503, "overloaded")]
#[tokio::test]
async fn error_status_is_classified(#[case] status: u16, #[case] message: &str) {
    let (server, base_url) = backend().await;
    Mock::given(method("POST"))
        .and(path("/v1/completions"))
        .respond_with(
            ResponseTemplate::new(status)
                .set_body_json(json!({ "error": { "message": message, "type": "x" } })),
        )
        .mount(&server)
        .await;

    let err = client()
        .create_completion(&base_url, TEST_API_KEY, "m", "p", SamplingParams::default())
        .await
        .expect_err("error status");

    assert_eq!(err.status(), Some(status));
    assert_eq!(err.to_string(), message);
    let expected_variant = match status {
        401 | 403 => matches!(err, ApiError::Unauthorized { .. }),
        404 => matches!(err, ApiError::NotFound { .. }),
        429 => matches!(err, ApiError::RateLimited { .. }),
        _ => matches!(err, ApiError::ServerError { .. }),
    };
    assert!(expected_variant, "unexpected variant {err:?}");
}

#[rstest]
#[case::empty_body(ResponseTemplate::new(500))]
#[case::html_body(ResponseTemplate::new(502).set_body_string("<html>Bad gateway</html>"))]
#[case::no_message(ResponseTemplate::new(500).set_body_json(json!({ "error": {} })))]
#[tokio::test]
async fn error_without_message_falls_back_to_status(#[case] template: ResponseTemplate) {
    let (server, base_url) = backend().await;
    Mock::given(method("GET"))
        .and(path("/v1/models"))
        .respond_with(template)
        .mount(&server)
        .await;

    let err = client()
        .list_models(&base_url, TEST_API_KEY)
        .await
        .expect_err("error status");
    let status = err.status().expect("status-coded error");
    assert_eq!(
        err.to_string(),
        format!("API request failed with status {status}")
    );
}

#[tokio::test]
async fn completion_sends_fixed_sampling_parameters() {
    let (server, base_url) = backend().await;
    Mock::given(method("POST"))
        .and(path("/v1/completions"))
        .and(header("authorization", format!("Bearer {TEST_API_KEY}").as_str()))
        .and(header("content-type", "application/json"))
        .and(body_json(json!({
            "model": "gpt-3.5-turbo-instruct",
            "prompt": "Summarize this",
            "temperature": 0.7,
            "max_tokens": 500,
            "top_p": 1.0,
            "frequency_penalty": 0.0,
            "presence_penalty": 0.0
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "cmpl-1",
            "object": "text_completion",
            "choices": [
                { "text": "First.", "index": 0, "finish_reason": "stop" },
                { "text": "Second.", "index": 1, "finish_reason": "stop" }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let text = client()
        .create_completion(
            &base_url,
            TEST_API_KEY,
            "gpt-3.5-turbo-instruct",
            "Summarize this",
            SamplingParams::default(),
        )
        .await
        .expect("completion returned");
    assert_eq!(text, "First.");
}

#[rstest]
#[case::no_choices(json!({ "id": "cmpl-1" }))]
#[case::empty_choices(json!({ "choices": [] }))]
#[case::null_choices(json!({ "choices": null }))]
#[case::choice_without_text(json!({ "choices": [{ "index": 0 }] }))]
#[tokio::test]
async fn completion_rejects_missing_text(#[case] body: serde_json::Value) {
    let (server, base_url) = backend().await;
    Mock::given(method("POST"))
        .and(path("/v1/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(&server)
        .await;

    let err = client()
        .create_completion(&base_url, TEST_API_KEY, "m", "p", SamplingParams::default())
        .await
        .expect_err("no usable choice");
    assert!(matches!(err, ApiError::MalformedResponse(_)));
}

#[tokio::test]
async fn success_with_invalid_json_is_malformed() {
    let (server, base_url) = backend().await;
    Mock::given(method("POST"))
        .and(path("/v1/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let err = client()
        .create_completion(&base_url, TEST_API_KEY, "m", "p", SamplingParams::default())
        .await
        .expect_err("not json");
    assert!(matches!(err, ApiError::MalformedResponse(_)));
}

#[tokio::test]
async fn unreachable_backend_is_network_failure() {
    let err = client()
        .list_models("http://127.0.0.1:9/v1", TEST_API_KEY)
        .await
        .expect_err("nothing listens there");
    assert!(matches!(err, ApiError::NetworkFailure(_)));
}

#[tokio::test]
async fn slow_backend_times_out_once() {
    let (server, base_url) = backend().await;
    Mock::given(method("POST"))
        .and(path("/v1/completions"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "choices": [{ "text": "late" }] }))
                .set_delay(Duration::from_secs(5)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let http_client = Client::builder()
        .timeout(Duration::from_millis(200))
        .build()
        .expect("client builds");
    let client = BackendClient::new(http_client, Arc::new(DiagnosticLog::new(false)));
    let err = client
        .create_completion(&base_url, TEST_API_KEY, "m", "p", SamplingParams::default())
        .await
        .expect_err("timed out");
    assert_eq!(err, ApiError::NetworkFailure("request timed out".to_string()));
}
