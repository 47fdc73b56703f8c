//! Server startup and routing
//!
//! All handlers share one `UnifiedAppState`. The only network calls leave
//! through the per-session LLM worker to the hosted embedding and
//! completion endpoints.

use std::time::Duration;
use tracing::info;

use crate::{config::Config, shared_state::UnifiedAppState};

/// Run the HTTP server until the process is stopped. Expects tracing to be
/// initialised by the caller.
pub async fn run_server(cfg: Config) -> anyhow::Result<()> {
    crate::metrics::init_metrics();
    cfg.print_config();

    if !std::path::Path::new(&cfg.source_pdf).exists() {
        tracing::warn!(
            "Source document {} not found; chats will report an initialization error",
            cfg.source_pdf
        );
    }

    let addr = cfg.api_addr()?;
    let state = UnifiedAppState::new(cfg);
    spawn_session_reaper(state.clone());

    info!("Starting HTTP server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let app = build_router(state);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Periodically drop sessions nobody has touched within the idle timeout.
fn spawn_session_reaper(state: UnifiedAppState) {
    let ttl = Duration::from_secs(state.config.session_idle_timeout_seconds);
    let period = (ttl / 4).max(Duration::from_secs(1));
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        loop {
            interval.tick().await;
            state.sessions.evict_idle(ttl);
        }
    });
}

pub fn build_router(state: UnifiedAppState) -> axum::Router {
    use axum::{
        Router,
        routing::{get, post, put},
    };
    use tower_http::{
        cors::{Any, CorsLayer},
        trace::TraceLayer,
        timeout::TimeoutLayer,
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([axum::http::Method::GET, axum::http::Method::POST, axum::http::Method::PUT])
        .allow_headers(Any);

    // Generation may wait on two remote calls plus a first-time index build.
    let request_timeout = Duration::from_secs(state.config.request_timeout_seconds.saturating_mul(3));

    Router::new()
        .route("/", get(crate::api::widget::index))
        .route("/sessions", post(crate::api::session_api::create_session))
        .route("/sessions/:id", get(crate::api::session_api::get_session))
        .route("/sessions/:id/api-key", put(crate::api::session_api::set_api_key))
        .route("/sessions/:id/messages", post(crate::api::chat_api::send_message))
        .route("/sessions/:id/new-chat", post(crate::api::session_api::start_new_chat))
        .route("/sessions/:id/history", get(crate::api::session_api::get_history))
        .route("/metrics", get(crate::metrics::get_metrics))
        .route("/healthz", get(|| async { "OK" }))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(request_timeout))
        .with_state(state)
}
