/// HTTP server for the booking agent
/// - POST /api/chat: web chat
/// - POST /api/messages: Bot Framework style activities
/// - GET /api/conversations/:user_id: logged history
/// Idle sessions are swept in the background

use axum::{
    extract::{rejection::JsonRejection, Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;

use travel_agent::{AgentConfig, SessionStore, TurnOrchestrator};

const SERVICE_NAME: &str = "flight-hotel-chatbot";
const ANONYMOUS_USER: &str = "anonymous";
const DEFAULT_HISTORY_LIMIT: usize = 10;
const MAX_HISTORY_LIMIT: usize = 100;
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

type SharedOrchestrator = Arc<TurnOrchestrator>;

/// Chat request from the web chat
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChatRequest {
    #[serde(default)]
    user_id: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Serialize, PartialEq)]
struct ChatResponse {
    response: String,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    error: bool,
}

impl ChatResponse {
    fn invalid() -> Self {
        Self {
            response: "Mensagem inválida".to_string(),
            error: true,
        }
    }
}

#[derive(Debug, Deserialize)]
struct HistoryQuery {
    limit: Option<usize>,
}

async fn chat(
    Extension(orchestrator): Extension<SharedOrchestrator>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> impl IntoResponse {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(e) => {
            tracing::warn!("⚠ Rejected chat payload: {}", e);
            return (StatusCode::BAD_REQUEST, Json(ChatResponse::invalid()));
        }
    };

    let Some(message) = request.message else {
        return (StatusCode::BAD_REQUEST, Json(ChatResponse::invalid()));
    };

    let user_id = request
        .user_id
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| ANONYMOUS_USER.to_string());

    let reply = orchestrator.handle_turn(&user_id, &message).await;
    (
        StatusCode::OK,
        Json(ChatResponse {
            response: reply.text,
            error: reply.is_error,
        }),
    )
}

/// Bot Framework activity: `text` or `mensagem`, sender in `from.id`
async fn messages(
    Extension(orchestrator): Extension<SharedOrchestrator>,
    payload: Result<Json<Value>, JsonRejection>,
) -> impl IntoResponse {
    let Ok(Json(activity)) = payload else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "type": "message", "text": "Payload inválido" })),
        );
    };

    let text = ["text", "mensagem"]
        .iter()
        .filter_map(|key| activity.get(*key).and_then(Value::as_str))
        .find(|t| !t.is_empty())
        .unwrap_or("");
    let user_id = activity
        .pointer("/from/id")
        .and_then(Value::as_str)
        .filter(|id| !id.trim().is_empty())
        .unwrap_or(ANONYMOUS_USER);

    let reply = orchestrator.handle_turn(user_id, text).await;
    (StatusCode::OK, Json(json!({ "type": "message", "text": reply.text })))
}

async fn conversation_history(
    Extension(orchestrator): Extension<SharedOrchestrator>,
    Path(user_id): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> impl IntoResponse {
    let limit = query.limit.unwrap_or(DEFAULT_HISTORY_LIMIT).clamp(1, MAX_HISTORY_LIMIT);

    match orchestrator.conversation_log().recent(&user_id, limit).await {
        Ok(entries) => (StatusCode::OK, Json(json!(entries))),
        Err(e) => {
            tracing::warn!("⚠ Failed to read history for {}: {}", user_id, e);
            (
                StatusCode::BAD_GATEWAY,
                Json(json!({ "error": "Histórico indisponível" })),
            )
        }
    }
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok", "service": SERVICE_NAME }))
}

async fn index() -> Json<Value> {
    Json(json!({
        "service": "Flight & Hotel Chatbot API",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "/api/chat": "POST - Enviar mensagem ao chatbot",
            "/api/messages": "POST - Mensagem no formato Bot Framework",
            "/api/conversations/{userId}": "GET - Histórico da conversa",
            "/health": "GET - Status do serviço"
        }
    }))
}

fn router(orchestrator: SharedOrchestrator) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/api/chat", post(chat))
        .route("/api/messages", post(messages))
        .route("/api/conversations/:user_id", get(conversation_history))
        .layer(CorsLayer::permissive())
        .layer(Extension(orchestrator))
}

/// Periodically drop sessions nobody has touched within the TTL.
fn spawn_session_sweeper(store: Arc<dyn SessionStore>) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(SWEEP_INTERVAL);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let evicted = store.evict_idle().await;
            if evicted > 0 {
                tracing::info!("🧹 Evicted {} idle sessions ({} active)", evicted, store.len().await);
            }
        }
    });
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenv::dotenv();
    travel_agent::init_tracing();

    println!("\n╔════════════════════════════════════════════════════════════╗");
    println!("║        Flight & Hotel Booking Assistant - HTTP API         ║");
    println!("╚════════════════════════════════════════════════════════════╝\n");

    let config = AgentConfig::from_env()?;
    let orchestrator = Arc::new(TurnOrchestrator::from_config(&config)?);
    spawn_session_sweeper(orchestrator.store());

    let app = router(orchestrator);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port)).await?;

    tracing::info!("✓ Server running on http://0.0.0.0:{}", config.port);
    println!("  POST /api/chat                     — Send a message");
    println!("  POST /api/messages                 — Bot Framework activity");
    println!("  GET  /api/conversations/:user_id   — Conversation history");
    println!("  GET  /health                       — Check server health\n");

    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    fn app() -> Router {
        let config = AgentConfig::default();
        let orchestrator = TurnOrchestrator::from_config(&config).unwrap();
        router(Arc::new(orchestrator))
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn post_json(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = app()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!({"status": "ok", "service": SERVICE_NAME}));
    }

    #[tokio::test]
    async fn test_index_lists_endpoints() {
        let response = app()
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body = body_json(response).await;
        assert_eq!(body["service"], "Flight & Hotel Chatbot API");
        assert!(body["endpoints"]["/api/chat"].is_string());
    }

    #[tokio::test]
    async fn test_chat_greets() {
        let response = app()
            .oneshot(post_json("/api/chat", r#"{"userId": "maria", "message": "Olá"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert!(body["response"].as_str().unwrap().starts_with("Olá! 👋"));
        assert!(body.get("error").is_none());
    }

    #[tokio::test]
    async fn test_chat_missing_message() {
        let response = app()
            .oneshot(post_json("/api/chat", r#"{"userId": "maria"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await,
            json!({"response": "Mensagem inválida", "error": true})
        );
    }

    #[tokio::test]
    async fn test_chat_invalid_json() {
        let response = app().oneshot(post_json("/api/chat", "{not json")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_chat_empty_message() {
        let response = app()
            .oneshot(post_json("/api/chat", r#"{"message": "   "}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await,
            json!({"response": "Mensagem vazia", "error": true})
        );
    }

    #[tokio::test]
    async fn test_bot_framework_activity() {
        let response = app()
            .oneshot(post_json(
                "/api/messages",
                r#"{"type": "message", "mensagem": "cancelar hotel", "from": {"id": "u1"}}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["type"], "message");
        assert!(body["text"].as_str().unwrap().contains("cancelamento da sua reserva de hotel"));
    }

    #[tokio::test]
    async fn test_bot_framework_invalid_payload() {
        let response = app().oneshot(post_json("/api/messages", "oops")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await,
            json!({"type": "message", "text": "Payload inválido"})
        );
    }

    #[tokio::test]
    async fn test_conversation_history() {
        let config = AgentConfig::default();
        let orchestrator = Arc::new(TurnOrchestrator::from_config(&config).unwrap());
        orchestrator.handle_turn("maria", "Olá").await;

        let app = router(orchestrator);
        let mut entries = Value::Null;
        for _ in 0..50 {
            let response = app
                .clone()
                .oneshot(
                    Request::builder()
                        .uri("/api/conversations/maria?limit=5")
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            entries = body_json(response).await;
            if entries.as_array().map(Vec::len) == Some(2) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        let entries = entries.as_array().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0]["role"], "user");
        assert_eq!(entries[0]["userId"], "maria");
    }
}
