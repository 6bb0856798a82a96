use crate::agent::ChatAgent;
use crate::error::ChatError;
use crate::models::chat::ChatRequest;
use super::relay;

use std::error::Error;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use axum::{
    body::Bytes,
    routing::post,
    Router,
    extract::State,
    response::{ IntoResponse, Response },
};
use governor::{ RateLimiter, state::{ InMemoryState, NotKeyed }, clock::{ Clock, DefaultClock } };
use tokio::time::{ timeout_at, Instant };
use tower_http::cors::{ Any, CorsLayer };
use log::{ info, warn, error };

pub type RequestLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

#[derive(Clone)]
pub struct AppState {
    pub agent: Arc<ChatAgent>,
    /// Coarse bound on one request, measured from arrival to the end of the
    /// streamed reply.
    pub max_duration: Duration,
    pub limiter: Option<Arc<RequestLimiter>>,
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/chat", post(chat_handler))
        .layer(cors)
        .with_state(state)
}

pub async fn start_http_server(
    addr: SocketAddr,
    state: AppState,
    tls: Option<(String, String)>,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let app = router(state);

    if let Some((cert_path, key_path)) = tls {
        info!(
            "TLS enabled. Loading certificate from '{}' and key from '{}'",
            cert_path,
            key_path
        );
        let tls_config = axum_server::tls_rustls::RustlsConfig::from_pem_file(
            cert_path,
            key_path
        ).await?;

        info!("Starting HTTPS chat server on: https://{}", addr);
        axum_server::bind_rustls(addr, tls_config)
            .serve(app.into_make_service())
            .await?;
    } else {
        let listener = tokio::net::TcpListener::bind(addr).await.map_err(|e| {
            error!("Failed to bind HTTP server to {}: {}. Try a different port.", addr, e);
            e
        })?;
        info!("Starting HTTP chat server on: http://{}", addr);
        axum::serve(listener, app.into_make_service()).await?;
    }

    Ok(())
}

/// Whole seconds until `limiter` admits another request, or `None` if it
/// admits this one.
fn limiter_wait_secs(limiter: &RequestLimiter) -> Option<u64> {
    match limiter.check() {
        Ok(()) => None,
        Err(not_until) => {
            let wait = not_until.wait_time_from(DefaultClock::default().now());
            let secs = wait.as_secs() + u64::from(wait.subsec_nanos() > 0);
            Some(secs.max(1))
        }
    }
}

async fn chat_handler(State(state): State<AppState>, body: Bytes) -> Response {
    let deadline = Instant::now() + state.max_duration;

    if let Some(limiter) = &state.limiter {
        if let Some(retry_after) = limiter_wait_secs(limiter) {
            warn!("Inbound request limit reached; asking client to retry in {}s", retry_after);
            return ChatError::RateLimited { retry_after }.into_response();
        }
    }

    let request: ChatRequest = match serde_json::from_slice(&body) {
        Ok(req) => req,
        Err(e) => {
            error!("Rejecting chat request with unreadable body: {}", e);
            return ChatError::InvalidRequest(e.to_string()).into_response();
        }
    };

    let outcome = match timeout_at(deadline, state.agent.handle_chat(&request.messages)).await {
        Ok(outcome) => outcome,
        Err(_) => Err(ChatError::DeadlineExceeded(state.max_duration.as_secs())),
    };

    match outcome {
        Ok(stream) => relay::stream_response(stream, deadline),
        Err(e) => {
            match &e {
                ChatError::RateLimited { retry_after } => {
                    warn!("Upstream rate limit; client should retry in {}s", retry_after);
                }
                other => error!("Chat request failed: {}", other),
            }
            e.into_response()
        }
    }
}
