use axum::{Json, Router, extract::State, http::StatusCode, routing::post};
use infernum_relay::{
    GenerateRequest, ModelConfiguration, ModelRuntime, OllamaError, OllamaRuntime,
    command_schema, runtime::DecodingOptions,
};
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};

type Recorded = Arc<Mutex<Vec<(String, Value)>>>;

/// Minimal stand-in for the Ollama HTTP API that records request bodies.
async fn spawn_fake_ollama(fail_generate: bool) -> (OllamaRuntime, Recorded) {
    let recorded: Recorded = Arc::default();

    let app = Router::new()
        .route(
            "/api/create",
            post(|State(rec): State<Recorded>, Json(body): Json<Value>| async move {
                rec.lock().unwrap().push(("create".to_string(), body));
                Json(json!({ "status": "success" }))
            }),
        )
        .route(
            "/api/generate",
            post(
                move |State(rec): State<Recorded>, Json(body): Json<Value>| async move {
                    rec.lock().unwrap().push(("generate".to_string(), body));
                    if fail_generate {
                        return (
                            StatusCode::NOT_FOUND,
                            Json(json!({ "error": "model \"llava-custom\" not found" })),
                        );
                    }
                    (
                        StatusCode::OK,
                        Json(json!({
                            "model": "llava-custom",
                            "created_at": "2024-01-01T00:00:00Z",
                            "response": "{\"m\":\"S\",\"s\":0,\"t\":0,\"d\":0}",
                            "done": true,
                            "done_reason": "stop",
                            "context": [1, 2],
                            "total_duration": 5_000_000_000u64,
                            "load_duration": 2_500_000_000u64,
                            "prompt_eval_count": 7,
                            "prompt_eval_duration": 1_000_000u64,
                            "eval_count": 9,
                            "eval_duration": 2_000_000u64
                        })),
                    )
                },
            ),
        )
        .with_state(recorded.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (OllamaRuntime::new(format!("http://{addr}/")), recorded)
}

#[tokio::test]
async fn create_model_posts_variant_definition() {
    let (runtime, recorded) = spawn_fake_ollama(false).await;
    assert!(!runtime.base_url().ends_with('/'));

    runtime
        .create_model(&ModelConfiguration {
            name: "llava-custom".to_string(),
            base_model: "llava".to_string(),
            system_prompt: "drive".to_string(),
        })
        .await
        .unwrap();

    let recorded = recorded.lock().unwrap();
    let (kind, body) = &recorded[0];
    assert_eq!(kind, "create");
    assert_eq!(
        body,
        &json!({ "model": "llava-custom", "from": "llava", "system": "drive", "stream": false })
    );
}

#[tokio::test]
async fn generate_forwards_schema_and_parses_result() {
    let (runtime, recorded) = spawn_fake_ollama(false).await;

    let response = runtime
        .generate(GenerateRequest {
            model: "llava-custom".to_string(),
            prompt: "where to?".to_string(),
            images: vec!["aGVsbG8=".to_string()],
            stream: true,
            format: Some(command_schema()),
            options: Some(DecodingOptions::default()),
        })
        .await
        .unwrap();

    assert_eq!(response.eval_count, Some(9));
    assert_eq!(response.load_duration, Some(2_500_000_000));
    assert_eq!(response.done_reason.as_deref(), Some("stop"));

    let recorded = recorded.lock().unwrap();
    let (_, body) = &recorded[0];
    assert_eq!(body["stream"], false);
    assert_eq!(body["images"][0], "aGVsbG8=");
    assert_eq!(body["options"]["seed"], 42);
    assert_eq!(body["options"]["temperature"], 0.0);
    assert_eq!(body["format"], command_schema());
}

#[tokio::test]
async fn generate_surfaces_runtime_error_text() {
    let (runtime, _) = spawn_fake_ollama(true).await;

    let err = runtime
        .generate(GenerateRequest {
            model: "llava-custom".to_string(),
            prompt: String::new(),
            images: Vec::new(),
            stream: false,
            format: None,
            options: None,
        })
        .await
        .unwrap_err();

    match &err {
        OllamaError::Status { status, message } => {
            assert_eq!(status.as_u16(), 404);
            assert_eq!(message, "model \"llava-custom\" not found");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(err.to_string().contains("not found"));
}

#[tokio::test]
async fn unreachable_runtime_is_a_transport_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let runtime = OllamaRuntime::new(format!("http://{addr}"));
    let err = runtime
        .create_model(&ModelConfiguration {
            name: "x".to_string(),
            base_model: "y".to_string(),
            system_prompt: String::new(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, OllamaError::Http(_)));
}
