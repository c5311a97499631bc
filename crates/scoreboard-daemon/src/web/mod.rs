//! Web UI, score API and WebSocket updates.

use askama::Template;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};
use tower_http::trace::TraceLayer;
use tracing::{debug, warn};

use crate::scoring::{PlayerSnapshot, ScoreError, ScoreboardSnapshot};
use crate::state::AppState;

/// Scoreboard page template.
#[derive(Template)]
#[template(path = "index.html")]
struct HomeTemplate {
    sbid: usize,
    players: Vec<PlayerSnapshot>,
    step: i64,
    ws_url: String,
}

impl IntoResponse for ScoreError {
    fn into_response(self) -> Response {
        let status = match self {
            ScoreError::UnknownScoreboard(_) | ScoreError::UnknownPlayer { .. } => {
                StatusCode::NOT_FOUND
            }
            ScoreError::InvalidBoard(_) => StatusCode::BAD_REQUEST,
            ScoreError::Interrupted(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, self.to_string()).into_response()
    }
}

/// Creates the web router with all routes.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Main page
        .route("/", get(home))
        // Score API
        .route("/api/sb/:sbid", get(scoreboard_get))
        .route("/incr/:sbid/:pid/:amount", post(increase))
        .route("/decr/:sbid/:pid/:amount", post(decrease))
        .route("/reset/:sbid", post(reset))
        // Live updates
        .route("/ws/sb/:sbid", get(scoreboard_ws))
        .layer(TraceLayer::new_for_http())
        // State
        .with_state(state)
}

/// GET / - Scoreboard page
async fn home(State(state): State<Arc<AppState>>) -> Response {
    let sbid = 0;
    let snapshot = match state.snapshot(sbid) {
        Ok(snapshot) => snapshot,
        Err(e) => return e.into_response(),
    };
    let page = HomeTemplate {
        sbid,
        players: snapshot.players,
        step: state.step(),
        ws_url: format!("/ws/sb/{}", sbid),
    };
    match page.render() {
        Ok(html) => Html(html).into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to render page: {}", e),
        )
            .into_response(),
    }
}

/// GET /api/sb/:sbid - Current scores
async fn scoreboard_get(
    State(state): State<Arc<AppState>>,
    Path(sbid): Path<usize>,
) -> Result<Json<ScoreboardSnapshot>, ScoreError> {
    state.snapshot(sbid).map(Json)
}

/// Runs a score change off the async workers.
///
/// A change ends with a board push, which for a multiplexed board waits for
/// the refresh thread to finish its current digit.
async fn update<F>(state: Arc<AppState>, change: F) -> Result<Json<ScoreboardSnapshot>, ScoreError>
where
    F: FnOnce(&AppState) -> Result<ScoreboardSnapshot, ScoreError> + Send + 'static,
{
    tokio::task::spawn_blocking(move || change(&state))
        .await
        .map_err(|e| ScoreError::Interrupted(e.to_string()))?
        .map(Json)
}

/// POST /incr/:sbid/:pid/:amount - Add to a score
async fn increase(
    State(state): State<Arc<AppState>>,
    Path((sbid, pid, amount)): Path<(usize, usize, u32)>,
) -> Result<Json<ScoreboardSnapshot>, ScoreError> {
    update(state, move |state| state.increase(sbid, pid, i64::from(amount))).await
}

/// POST /decr/:sbid/:pid/:amount - Subtract from a score
async fn decrease(
    State(state): State<Arc<AppState>>,
    Path((sbid, pid, amount)): Path<(usize, usize, u32)>,
) -> Result<Json<ScoreboardSnapshot>, ScoreError> {
    update(state, move |state| state.decrease(sbid, pid, i64::from(amount))).await
}

/// POST /reset/:sbid - Reset every player
async fn reset(
    State(state): State<Arc<AppState>>,
    Path(sbid): Path<usize>,
) -> Result<Json<ScoreboardSnapshot>, ScoreError> {
    update(state, move |state| state.reset(sbid)).await
}

/// GET /ws/sb/:sbid - Current scores, then every change
async fn scoreboard_ws(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Path(sbid): Path<usize>,
) -> Response {
    // Subscribe first so no change between snapshot and stream is lost
    let updates = state.subscribe();
    let snapshot = match state.snapshot(sbid) {
        Ok(snapshot) => snapshot,
        Err(e) => return e.into_response(),
    };
    ws.on_upgrade(move |socket| stream_updates(socket, state, sbid, snapshot, updates))
}

async fn stream_updates(
    mut socket: WebSocket,
    state: Arc<AppState>,
    sbid: usize,
    initial: ScoreboardSnapshot,
    mut updates: broadcast::Receiver<ScoreboardSnapshot>,
) {
    debug!("WebSocket client joined scoreboard {}", sbid);
    if send_snapshot(&mut socket, &initial).await.is_err() {
        return;
    }

    loop {
        tokio::select! {
            update = updates.recv() => {
                let snapshot = match update {
                    Ok(snapshot) if snapshot.sbid == sbid => snapshot,
                    Ok(_) => continue,
                    Err(RecvError::Lagged(skipped)) => {
                        debug!("WebSocket client skipped {} updates", skipped);
                        match state.snapshot(sbid) {
                            Ok(snapshot) => snapshot,
                            Err(_) => break,
                        }
                    }
                    Err(RecvError::Closed) => break,
                };
                if send_snapshot(&mut socket, &snapshot).await.is_err() {
                    break;
                }
            }
            message = socket.recv() => match message {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }
    debug!("WebSocket client left scoreboard {}", sbid);
}

async fn send_snapshot(socket: &mut WebSocket, snapshot: &ScoreboardSnapshot) -> Result<(), ()> {
    let json = match serde_json::to_string(snapshot) {
        Ok(json) => json,
        Err(e) => {
            warn!("Failed to serialize scoreboard {}: {}", snapshot.sbid, e);
            return Err(());
        }
    };
    socket.send(Message::Text(json)).await.map_err(|_| ())
}
