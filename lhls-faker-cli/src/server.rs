//! HTTP server setup.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::extract::Request;
use lhls_engine::{LiveConfig, LiveWindow, Playlist, SegmentGate, StreamClock, TokioClock};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::Span;

use crate::error::{AppError, Result};
use crate::routes;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Source playlist, immutable after load
    pub playlist: Arc<Playlist>,
    /// Stream clock shared by manifest and segment requests
    pub clock: Arc<dyn StreamClock>,
    /// Window calculator for the simulated manifest
    pub window: LiveWindow,
    /// Gate and pacer for simulated segment delivery
    pub gate: SegmentGate,
}

impl AppState {
    pub fn new(playlist: Arc<Playlist>, config: LiveConfig) -> Self {
        Self::with_clock(playlist, config, Arc::new(TokioClock::new()))
    }

    pub fn with_clock(
        playlist: Arc<Playlist>,
        config: LiveConfig,
        clock: Arc<dyn StreamClock>,
    ) -> Self {
        Self {
            window: LiveWindow::new(playlist.clone(), config.clone()),
            gate: SegmentGate::new(playlist.clone(), config),
            playlist,
            clock,
        }
    }
}

/// Build the router with CORS and request tracing.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    routes::create_router(state).layer(cors).layer(
        TraceLayer::new_for_http()
            .make_span_with(|req: &Request| {
                let mut make_span =
                    tower_http::trace::DefaultMakeSpan::new().level(tracing::Level::INFO);
                use tower_http::trace::MakeSpan;
                make_span.make_span(req)
            })
            .on_response(
                |res: &axum::http::Response<_>, latency: Duration, span: &Span| {
                    let on_response =
                        tower_http::trace::DefaultOnResponse::new().level(tracing::Level::INFO);
                    use tower_http::trace::OnResponse;
                    on_response.on_response(res, latency, span);
                },
            ),
    )
}

/// The simulated live server.
pub struct LhlsServer {
    addr: SocketAddr,
    state: AppState,
    cancel_token: CancellationToken,
}

impl LhlsServer {
    pub fn new(addr: SocketAddr, state: AppState) -> Self {
        Self {
            addr,
            state,
            cancel_token: CancellationToken::new(),
        }
    }

    /// Get the cancellation token for graceful shutdown.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    /// Serve until the cancellation token fires.
    pub async fn run(&self) -> Result<()> {
        let router = build_router(self.state.clone());
        let listener = TcpListener::bind(self.addr).await?;

        tracing::info!("Simulated manifest at http://{}/lhls/manifest.m3u8", self.addr);
        tracing::info!("Unmodified files at http://{}/live/", self.addr);

        let cancel_token = self.cancel_token.clone();
        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                cancel_token.cancelled().await;
                tracing::info!("Server shutting down...");
            })
            .await
            .map_err(|e| AppError::Server(e.to_string()))?;

        Ok(())
    }

    pub fn shutdown(&self) {
        self.cancel_token.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn playlist() -> Arc<Playlist> {
        let text = "#EXTM3U\n#EXT-X-TARGETDURATION:10\n#EXTINF:10,\na.ts\n#EXTINF:10,\nb.ts\n";
        Arc::new(Playlist::parse(text.as_bytes(), "/media").unwrap())
    }

    #[tokio::test]
    async fn test_state_shares_playlist() {
        let state = AppState::new(playlist(), LiveConfig::default());
        assert!(std::ptr::eq(state.window.playlist(), &*state.playlist));
        assert!(state.clock.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_server_creation() {
        let state = AppState::new(playlist(), LiveConfig::default());
        let server = LhlsServer::new("127.0.0.1:0".parse().unwrap(), state);

        let token = server.cancel_token();
        assert!(!token.is_cancelled());
        server.shutdown();
        assert!(token.is_cancelled());
    }
}
