use std::{path::Path, sync::Arc};

use axum::{
    Json, Router,
    body::Body,
    extract::State,
    http::header,
    response::IntoResponse,
    routing::get,
};
use tokio::{
    signal,
    sync::{oneshot, watch},
};
use tower_http::services::{ServeDir, ServeFile};

mod capture;
mod config;
mod error;
mod feed;
mod session;

pub use capture::{FrameRenderer, capture_loop};
pub use config::{Config, FrameInput};
pub use error::AppError;
pub use feed::{Feed, FeedState};
pub use session::{DetectionStats, DetectionStatus, Session, ToggleResponse};

use crate::vision::ColourDetector;
use feed::feed_stream;

#[derive(Clone)]
pub struct ApiState {
    session: Arc<Session>,
    feed: Arc<watch::Sender<FeedState>>,
}

impl ApiState {
    pub fn new(session: Arc<Session>, feed: Arc<watch::Sender<FeedState>>) -> Self {
        Self { session, feed }
    }
}

pub struct ChromaCam {
    config: Config,
}

impl ChromaCam {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn routes(state: ApiState, static_dir: &Path) -> Router {
        let static_files = ServeDir::new(static_dir);
        let index = ServeFile::new(static_dir.join("index.html"));

        Router::new()
            .route_service("/", index)
            .nest_service("/static", static_files)
            .route("/video_feed", get(get_video_feed))
            .route("/toggle_detection", get(get_toggle_detection))
            .route("/stats", get(get_stats))
            .with_state(state)
    }

    pub async fn serve(self) -> Result<(), AppError> {
        let Config {
            bind,
            static_dir,
            colours,
            min_area,
            ..
        } = self.config.clone();

        // Device is acquired once here and handed to the capture thread
        let mut source = self.config.open_source()?;
        let session = Arc::new(Session::new(&colours));
        let (feed_tx, _) = watch::channel(FeedState::new());
        let feed_tx = Arc::new(feed_tx);
        let state = ApiState::new(session.clone(), feed_tx.clone());
        let renderer = FrameRenderer::new(ColourDetector::new(min_area), colours);

        let listener = tokio::net::TcpListener::bind(&bind)
            .await
            .map_err(|e| AppError::Server(format!("Couldn't bind {}: {}", bind, e)))?;
        log::info!("Listening on {}", bind);

        let (shutdown_tx, mut shutdown_rx) = oneshot::channel();
        let capture_thread = std::thread::spawn(move || {
            capture_loop(
                source.as_mut(),
                &renderer,
                &session,
                &feed_tx,
                &mut shutdown_rx,
            );
            log::info!("Capture thread complete");
        });

        let served = axum::serve(listener, Self::routes(state, &static_dir))
            .with_graceful_shutdown(shutdown(shutdown_tx))
            .await
            .map_err(|e| AppError::Server(e.to_string()));

        capture_thread
            .join()
            .map_err(|_| AppError::Server("Capture thread panicked".to_string()))?;

        served
    }
}

#[axum::debug_handler]
async fn get_video_feed(State(state): State<ApiState>) -> impl IntoResponse {
    log::debug!("Client connected to video feed");
    let headers = [
        (header::CONTENT_TYPE, feed::CONTENT_TYPE),
        (header::CACHE_CONTROL, "no-cache, no-store, must-revalidate"),
    ];
    (headers, Body::from_stream(feed_stream(state.feed.subscribe())))
}

#[axum::debug_handler]
async fn get_toggle_detection(State(state): State<ApiState>) -> Json<ToggleResponse> {
    let status = state.session.toggle();
    log::info!("Detection {:?}", status);
    Json(ToggleResponse { status })
}

#[axum::debug_handler]
async fn get_stats(State(state): State<ApiState>) -> Json<DetectionStats> {
    Json(state.session.stats())
}

async fn shutdown(shutdown_tx: oneshot::Sender<()>) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            log::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                log::error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    log::info!("Shutting down");
    if shutdown_tx.send(()).is_err() {
        log::warn!("Capture thread already stopped");
    }
}
