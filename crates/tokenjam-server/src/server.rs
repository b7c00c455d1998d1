//! `TokenjamServer`: Axum HTTP + `WebSocket` server.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use axum::Router;
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{RawQuery, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use axum::routing::get;
use tokenjam_core::ControlCommand;
use tokenjam_runtime::SessionHandle;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::config::ServerConfig;
use crate::errors::ServerError;
use crate::health;
use crate::shutdown::ShutdownCoordinator;
use crate::websocket;

/// Shared state accessible from Axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// The session every connection subscribes to.
    pub session: SessionHandle,
    /// Open `WebSocket` connections.
    pub connections: Arc<AtomicUsize>,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// When the server started.
    pub start_time: Instant,
}

/// The tokenjam server.
pub struct TokenjamServer {
    config: Arc<ServerConfig>,
    session: SessionHandle,
    shutdown: Arc<ShutdownCoordinator>,
    connections: Arc<AtomicUsize>,
    start_time: Instant,
}

impl TokenjamServer {
    /// Create a server in front of `session`.
    pub fn new(
        config: ServerConfig,
        session: SessionHandle,
        shutdown: Arc<ShutdownCoordinator>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            session,
            shutdown,
            connections: Arc::new(AtomicUsize::new(0)),
            start_time: Instant::now(),
        }
    }

    /// Build the Axum router with all routes.
    pub fn router(&self) -> Router {
        let state = AppState {
            session: self.session.clone(),
            connections: self.connections.clone(),
            config: self.config.clone(),
            start_time: self.start_time,
        };

        Router::new()
            .route("/ws", get(ws_handler))
            .route("/control", get(control_handler).post(control_handler))
            .route("/health", get(health_handler))
            .fallback_service(ServeDir::new(&self.config.static_dir))
            .with_state(state)
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive())
    }

    /// Bind the listener and serve until the shutdown token fires.
    ///
    /// The serve task is tracked by the coordinator as `http`. Returns the
    /// bound address, which matters with port `0`.
    pub async fn listen(&self) -> Result<SocketAddr, ServerError> {
        let addr = self.config.bind_addr();
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;
        let local_addr = listener.local_addr()?;

        info!(%local_addr, static_dir = %self.config.static_dir.display(), "tokenjam server listening");

        let router = self.router();
        let token = self.shutdown.token();
        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router)
                .with_graceful_shutdown(token.cancelled_owned())
                .await
            {
                error!(error = %e, "server exited with error");
            }
        });
        self.shutdown.track("http", handle);

        Ok(local_addr)
    }

    /// Open `WebSocket` connections.
    pub fn connection_count(&self) -> usize {
        self.connections.load(Ordering::Relaxed)
    }

    /// Get the shutdown coordinator.
    pub fn shutdown(&self) -> &Arc<ShutdownCoordinator> {
        &self.shutdown
    }

    /// Get the server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}

/// GET /ws
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.max_message_size(state.config.max_message_size)
        .on_upgrade(move |socket| {
            websocket::handle_socket(
                socket,
                state.session,
                state.config.heartbeat_interval,
                state.connections,
            )
        })
}

/// GET|POST /control?<command>
///
/// Always answers 204; unrecognized commands are logged by the session.
async fn control_handler(State(state): State<AppState>, RawQuery(query): RawQuery) -> StatusCode {
    let Ok(command) = query.unwrap_or_default().parse::<ControlCommand>();
    info!(%command, "control command received");
    if let Err(e) = state.session.control(command).await {
        warn!(error = %e, "failed to deliver control command");
    }
    StatusCode::NO_CONTENT
}

/// GET /health
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let session = state.session.status().await.ok();
    let resp = health::health_check(
        state.start_time,
        state.connections.load(Ordering::Relaxed),
        session,
    );
    let code = if resp.is_ok() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (code, Json(resp))
}
