//! HTTP gateway tests against an in-process chat route.

use avatar_core::{Emotion, Language, Persona};
use avatar_voice::{ChatRequest, CompletionGateway, GatewayError, HttpCompletionGateway};
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};
use std::time::Duration;

/// Mirrors the production route: 400 without a message, 500 with a fallback for
/// messages containing "boom", otherwise an echo tagged happy.
async fn chat(Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    let message = body.get("message").and_then(Value::as_str).unwrap_or("");
    if message.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "Message is required"})),
        );
    }
    if message.contains("boom") {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({
                "error": "Failed to get AI response",
                "response": "Desculpe, estou com dificuldades técnicas no momento.",
                "emotion": "sad"
            })),
        );
    }
    let persona = body.get("avatarType").and_then(Value::as_str).unwrap_or("?");
    let language = body.get("language").and_then(Value::as_str).unwrap_or("?");
    (
        StatusCode::OK,
        Json(json!({
            "response": format!("{}|{}|{}", persona, language, message),
            "emotion": "surprised"
        })),
    )
}

async fn spawn_server() -> String {
    let app = Router::new().route("/api/chat", post(chat));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}/api", addr)
}

fn client(base: &str) -> HttpCompletionGateway {
    HttpCompletionGateway::new(base, Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn sends_wire_fields_and_parses_reply() {
    let base = spawn_server().await;
    let reply = client(&base)
        .send(&ChatRequest::new("Olá", Persona::Accessibility, Language::Fr))
        .await
        .unwrap();
    assert_eq!(reply.response, "accessibility|fr|Olá");
    assert_eq!(reply.emotion, Emotion::Surprised);
}

#[tokio::test]
async fn bad_request_is_reported() {
    let base = spawn_server().await;
    let err = client(&base)
        .send(&ChatRequest::new("", Persona::Text, Language::Pt))
        .await
        .unwrap_err();
    match err {
        GatewayError::BadRequest(message) => assert_eq!(message, "Message is required"),
        other => panic!("expected bad request, got {:?}", other),
    }
}

#[tokio::test]
async fn server_error_carries_fallback() {
    let base = spawn_server().await;
    let err = client(&base)
        .send(&ChatRequest::new("boom", Persona::Voice, Language::Pt))
        .await
        .unwrap_err();
    assert_eq!(
        err.fallback_text(),
        Some("Desculpe, estou com dificuldades técnicas no momento.")
    );
    match err {
        GatewayError::Service {
            status,
            fallback_emotion,
            ..
        } => {
            assert_eq!(status, 500);
            assert_eq!(fallback_emotion, Some(Emotion::Sad));
        }
        other => panic!("expected service error, got {:?}", other),
    }
}

#[tokio::test]
async fn unknown_route_is_a_service_error_without_fallback() {
    let base = spawn_server().await;
    let err = client(&format!("{}/missing", base))
        .send(&ChatRequest::new("Olá", Persona::Text, Language::Pt))
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::Service { status: 404, .. }));
    assert_eq!(err.fallback_text(), None);
}

#[tokio::test]
async fn unreachable_service_is_transport_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = client(&format!("http://{}/api", addr))
        .send(&ChatRequest::new("Olá", Persona::Text, Language::Pt))
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::Transport(_)));
}
