use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use chatpane::config::{Config, Variant, WidgetSettings};
use chatpane::identity::{IdentityProvider, MemoryStore, StoredIdentity};
use chatpane::transport::{ChatBackend, HttpBackend, TransportError};
use chatpane::types::{ChatRequest, Sender};
use chatpane::view::Transcript;
use chatpane::widget::{ChatWidget, InputField};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use url::Url;

#[derive(Clone, Default)]
struct Captured {
    bodies: Arc<Mutex<Vec<Value>>>,
}

async fn reply_ok(State(captured): State<Captured>, Json(body): Json<Value>) -> impl IntoResponse {
    captured.bodies.lock().unwrap().push(body);
    Json(json!({ "response": "hi there" }))
}

async fn reply_500(State(captured): State<Captured>, Json(body): Json<Value>) -> impl IntoResponse {
    captured.bodies.lock().unwrap().push(body);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "response": "I apologize, but I'm having trouble processing your request." })),
    )
}

async fn reply_html() -> impl IntoResponse {
    "<html>not json</html>"
}

async fn reply_wrong_shape() -> impl IntoResponse {
    Json(json!({ "answer": "hi there" }))
}

// Binds an ephemeral port and returns its base URL.
async fn spawn_server(captured: Captured) -> Url {
    let app = Router::new()
        .route("/chat", post(reply_ok))
        .route("/api/chat", post(reply_ok))
        .route("/broken", post(reply_500))
        .route("/html", post(reply_html))
        .route("/shape", post(reply_wrong_shape))
        .with_state(captured);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    Url::parse(&format!("http://{addr}")).unwrap()
}

#[tokio::test]
async fn direct_request_posts_message_only() {
    let captured = Captured::default();
    let base = spawn_server(captured.clone()).await;
    let backend = HttpBackend::new(base.join("/chat").unwrap());

    let reply = backend.send(&ChatRequest::direct("hello")).await.unwrap();
    assert_eq!(reply.response, "hi there");
    assert_eq!(*captured.bodies.lock().unwrap(), vec![json!({ "message": "hello" })]);
}

#[tokio::test]
async fn relay_request_posts_hash_message_and_timestamp() {
    let captured = Captured::default();
    let base = spawn_server(captured.clone()).await;
    let backend = HttpBackend::new(base.join("/api/chat").unwrap());

    backend
        .send(&ChatRequest::relay("k3x9q", "hello"))
        .await
        .unwrap();

    let bodies = captured.bodies.lock().unwrap();
    let body = bodies[0].as_object().unwrap();
    assert_eq!(body.len(), 3);
    assert_eq!(body["conversation_hash"], "k3x9q");
    assert_eq!(body["message"], "hello");
    assert!(body["request_timestamp"].as_str().unwrap().ends_with('Z'));
}

#[tokio::test]
async fn non_ok_status_is_reported_even_with_json_body() {
    let base = spawn_server(Captured::default()).await;
    let backend = HttpBackend::new(base.join("/broken").unwrap());

    let err = backend.send(&ChatRequest::direct("hello")).await.unwrap_err();
    assert!(matches!(err, TransportError::Status(500)), "got {err:?}");
}

#[tokio::test]
async fn malformed_bodies_are_decode_errors() {
    let base = spawn_server(Captured::default()).await;

    for path in ["/html", "/shape"] {
        let backend = HttpBackend::new(base.join(path).unwrap());
        let err = backend.send(&ChatRequest::direct("hello")).await.unwrap_err();
        assert!(matches!(err, TransportError::Decode(_)), "{path}: got {err:?}");
    }
}

#[tokio::test]
async fn unreachable_server_is_a_network_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let backend = HttpBackend::new(Url::parse(&format!("http://{addr}/chat")).unwrap());
    let err = backend.send(&ChatRequest::direct("hello")).await.unwrap_err();
    assert!(matches!(err, TransportError::Network(_)), "got {err:?}");
}

#[tokio::test]
async fn relay_widget_round_trip_over_http() {
    let captured = Captured::default();
    let base = spawn_server(captured.clone()).await;
    let cfg = Config::parse(&format!("[backend]\nbase_url = \"{base}\"\n")).unwrap();
    let settings = cfg.settings();
    assert_eq!(settings.variant, Variant::Relay);

    let transcript = Arc::new(Mutex::new(Transcript::new()));
    let identity: Arc<dyn IdentityProvider> = Arc::new(StoredIdentity::new(MemoryStore::new()));
    let widget = ChatWidget::new(
        settings,
        transcript.clone(),
        Arc::new(HttpBackend::new(cfg.endpoint().unwrap())),
        Some(identity.clone()),
    )
    .unwrap();

    let mut field = InputField::new();
    field.set("hello");
    widget.submit(&mut field).unwrap().await.unwrap();

    let transcript = transcript.lock().unwrap();
    let bots: Vec<_> = transcript.by_sender(Sender::Bot).map(|e| e.text.clone()).collect();
    assert_eq!(bots, vec!["hi there".to_string()]);
    assert!(transcript.entries().iter().all(|e| !e.typing));

    let bodies = captured.bodies.lock().unwrap();
    assert_eq!(bodies[0]["conversation_hash"], identity.get_or_create().unwrap());
}

#[tokio::test]
async fn direct_widget_shows_server_error_inline() {
    let base = spawn_server(Captured::default()).await;
    let settings = WidgetSettings {
        variant: Variant::Direct,
        welcome: Variant::Direct.welcome().to_string(),
        show_timestamps: true,
        typing_indicator: false,
    };
    let transcript = Arc::new(Mutex::new(Transcript::new()));
    let widget = ChatWidget::new(
        settings,
        transcript.clone(),
        Arc::new(HttpBackend::new(base.join("/broken").unwrap())),
        None,
    )
    .unwrap();

    let mut field = InputField::new();
    field.set("hello");
    widget.submit(&mut field).unwrap().await.unwrap();

    let transcript = transcript.lock().unwrap();
    let bots: Vec<_> = transcript.by_sender(Sender::Bot).collect();
    assert_eq!(bots.len(), 1);
    assert!(bots[0]
        .text
        .ends_with("Bot: Error: Could not get response from server"));
}
