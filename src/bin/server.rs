use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Context;
use axum::extract::ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use futures_util::{SinkExt, StreamExt};
use pacman_frame_server::config::GameConfig;
use pacman_frame_server::engine::GameEngine;
use pacman_frame_server::server_protocol::{parse_client_message, ParsedClientMessage};
use pacman_frame_server::server_utils::{normalize_seed, parse_port, session_label};
use pacman_frame_server::session::{GameSession, SessionHandle, SessionUpdate};
use pacman_frame_server::types::GameMode;
use rand::Rng;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tower_http::services::{ServeDir, ServeFile};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

const OUTBOUND_QUEUE_CAPACITY: usize = 256;

#[derive(Clone)]
struct AppState {
    base_config: Arc<GameConfig>,
    active_sessions: Arc<AtomicU64>,
}

#[derive(Clone, Debug)]
enum OutboundMessage {
    Text(String),
    Close { code: u16, reason: String },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum QueuePolicy {
    DropOnFull,
    DisconnectOnFull,
}

/// Per-socket state: at most one running game at a time.
struct Connection {
    label: String,
    tx: mpsc::Sender<OutboundMessage>,
    session: Option<SessionHandle>,
    forwarder: Option<JoinHandle<()>>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let port = parse_port(std::env::var("PORT").ok().as_deref());
    let base_config = match std::env::var("GAME_CONFIG") {
        Ok(path) => GameConfig::load(Path::new(&path))
            .with_context(|| format!("failed to load game config {path}"))?,
        Err(_) => GameConfig::default(),
    };
    log::info!(
        "default mode {}, frame {}ms",
        base_config.mode.key(),
        base_config.frame_ms
    );

    let state = AppState {
        base_config: Arc::new(base_config),
        active_sessions: Arc::new(AtomicU64::new(0)),
    };

    let app = Router::new()
        .route("/healthz", get(healthz))
        .route("/ws", get(ws_handler))
        .with_state(state);

    let app = if let Some(static_dir) = resolve_static_dir() {
        let index_file = static_dir.join("index.html");
        log::info!("static file root: {}", static_dir.to_string_lossy());
        app.fallback_service(
            ServeDir::new(static_dir).not_found_service(ServeFile::new(index_file)),
        )
    } else {
        log::warn!("static file root not found, serving the websocket api only");
        app
    };

    let bind_addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;

    log::info!("listening on :{port}");
    axum::serve(listener, app)
        .await
        .context("server runtime failed")?;
    Ok(())
}

fn resolve_static_dir() -> Option<PathBuf> {
    if let Ok(raw) = std::env::var("STATIC_DIR") {
        let path = PathBuf::from(raw);
        if path.join("index.html").is_file() {
            return Some(path);
        }
    }

    let candidates = [PathBuf::from("frame"), PathBuf::from("dist/frame")];
    candidates
        .into_iter()
        .find(|path| path.join("index.html").is_file())
}

async fn healthz(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "ok": true,
        "sessions": state.active_sessions.load(Ordering::Relaxed),
    }))
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(state, socket))
}

async fn handle_socket(state: AppState, socket: WebSocket) {
    let (tx, mut rx) = mpsc::channel::<OutboundMessage>(OUTBOUND_QUEUE_CAPACITY);
    let mut connection = Connection {
        label: session_label(NEXT_ID.fetch_add(1, Ordering::Relaxed)),
        tx: tx.clone(),
        session: None,
        forwarder: None,
    };
    log::info!("[{}] connected", connection.label);

    let (mut ws_sender, mut ws_receiver) = socket.split();
    let writer = tokio::spawn(async move {
        while let Some(outbound) = rx.recv().await {
            let should_close = matches!(outbound, OutboundMessage::Close { .. });
            let result = match outbound {
                OutboundMessage::Text(payload) => {
                    ws_sender.send(Message::Text(payload.into())).await
                }
                OutboundMessage::Close { code, reason } => {
                    let frame = CloseFrame {
                        code,
                        reason: reason.into(),
                    };
                    ws_sender.send(Message::Close(Some(frame))).await
                }
            };
            if result.is_err() || should_close {
                break;
            }
        }
    });

    while let Some(received) = ws_receiver.next().await {
        let Ok(message) = received else {
            break;
        };

        let keep_open = match message {
            Message::Text(raw) => handle_client_message(&state, &mut connection, raw.as_str()).await,
            Message::Binary(raw) => match String::from_utf8(raw.to_vec()) {
                Ok(text) => handle_client_message(&state, &mut connection, &text).await,
                Err(_) => send_error(&connection, "invalid utf8 message"),
            },
            Message::Close(_) => false,
            _ => true,
        };
        if !keep_open {
            break;
        }
    }

    stop_session(&state, &mut connection).await;
    log::info!("[{}] disconnected", connection.label);
    drop(connection);
    drop(tx);
    let _ = writer.await;
}

/// Returns false when the connection should be dropped.
async fn handle_client_message(state: &AppState, connection: &mut Connection, raw: &str) -> bool {
    let Some(message) = parse_client_message(raw) else {
        return send_error(connection, "invalid message");
    };

    match message {
        ParsedClientMessage::Hello { mode, seed } => {
            stop_session(state, connection).await;
            let config = session_config(&state.base_config, mode);
            let seed = normalize_seed(seed, rand::rng().random::<u32>());
            let engine = match GameEngine::new(config, seed) {
                Ok(engine) => engine,
                Err(error) => {
                    log::warn!("[{}] rejected hello: {error}", connection.label);
                    return send_error(connection, &error.to_string());
                }
            };
            let welcome = json!({
                "type": "welcome",
                "session": connection.label,
                "seed": seed,
                "board": engine.board_init(),
                "config": engine.config(),
            });
            if !enqueue(&connection.tx, &welcome, QueuePolicy::DisconnectOnFull) {
                return false;
            }

            let frame_ms = engine.config().frame_ms;
            log::info!(
                "[{}] session started: mode={} seed={seed}",
                connection.label,
                engine.mode().key()
            );
            let (handle, updates) = GameSession::spawn(engine, frame_ms);
            state.active_sessions.fetch_add(1, Ordering::Relaxed);
            connection.forwarder = Some(tokio::spawn(forward_updates(
                updates,
                connection.tx.clone(),
                connection.label.clone(),
            )));
            connection.session = Some(handle);
            true
        }
        ParsedClientMessage::Input { dir } => {
            let Some(session) = connection.session.as_ref() else {
                return send_error(connection, "send hello first");
            };
            if session.direction(dir).await.is_err() {
                return send_error(connection, "session has ended");
            }
            true
        }
        ParsedClientMessage::Pointer { input } => {
            let Some(session) = connection.session.as_ref() else {
                return send_error(connection, "send hello first");
            };
            if session.pointer(input).await.is_err() {
                return send_error(connection, "session has ended");
            }
            true
        }
        ParsedClientMessage::Reset => {
            let Some(session) = connection.session.as_ref() else {
                return send_error(connection, "send hello first");
            };
            if session.reset().await.is_err() {
                return send_error(connection, "session has ended");
            }
            true
        }
        ParsedClientMessage::Ping { t } => enqueue(
            &connection.tx,
            &json!({
                "type": "pong",
                "t": t,
                "serverTime": now_ms(),
            }),
            QueuePolicy::DisconnectOnFull,
        ),
    }
}

async fn forward_updates(
    mut updates: mpsc::Receiver<SessionUpdate>,
    tx: mpsc::Sender<OutboundMessage>,
    label: String,
) {
    while let Some(update) = updates.recv().await {
        let delivered = match update {
            SessionUpdate::State(snapshot) => enqueue(
                &tx,
                &json!({ "type": "state", "snapshot": snapshot }),
                QueuePolicy::DropOnFull,
            ),
            SessionUpdate::GameOver(summary) => {
                log::info!(
                    "[{label}] game over: reason={:?} outcome={:?} score={}",
                    summary.reason,
                    summary.outcome,
                    summary.score
                );
                enqueue(
                    &tx,
                    &json!({ "type": "game_over", "summary": summary }),
                    QueuePolicy::DisconnectOnFull,
                )
            }
        };
        if !delivered {
            let _ = tx.try_send(OutboundMessage::Close {
                code: 1013,
                reason: "client too slow".to_string(),
            });
            break;
        }
    }
}

async fn stop_session(state: &AppState, connection: &mut Connection) {
    if let Some(session) = connection.session.take() {
        session.shutdown().await;
        state.active_sessions.fetch_sub(1, Ordering::Relaxed);
        log::debug!("[{}] session stopped", connection.label);
    }
    if let Some(forwarder) = connection.forwarder.take() {
        let _ = forwarder.await;
    }
}

fn session_config(base: &GameConfig, mode: Option<GameMode>) -> GameConfig {
    GameConfig {
        mode: mode.unwrap_or(base.mode),
        ..base.clone()
    }
}

/// Queues a message; returns false only when `DisconnectOnFull` could not
/// deliver it.
fn enqueue(tx: &mpsc::Sender<OutboundMessage>, message: &Value, policy: QueuePolicy) -> bool {
    let send_failed = tx
        .try_send(OutboundMessage::Text(message.to_string()))
        .is_err();
    !(send_failed && policy == QueuePolicy::DisconnectOnFull)
}

fn send_error(connection: &Connection, message: &str) -> bool {
    enqueue(
        &connection.tx,
        &json!({ "type": "error", "message": message }),
        QueuePolicy::DisconnectOnFull,
    )
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_config_overrides_mode_only() {
        let base = GameConfig {
            initial_lives: 5,
            ..GameConfig::for_mode(GameMode::Maze)
        };
        let config = session_config(&base, Some(GameMode::Falling));
        assert_eq!(config.mode, GameMode::Falling);
        assert_eq!(config.initial_lives, 5);
        assert_eq!(session_config(&base, None).mode, GameMode::Maze);
    }

    #[test]
    fn enqueue_respects_queue_policy_when_full() {
        let (tx, _rx) = mpsc::channel::<OutboundMessage>(1);
        let message = json!({ "type": "state" });
        assert!(enqueue(&tx, &message, QueuePolicy::DisconnectOnFull));
        assert!(enqueue(&tx, &message, QueuePolicy::DropOnFull));
        assert!(!enqueue(&tx, &message, QueuePolicy::DisconnectOnFull));
    }

    #[test]
    fn enqueue_fails_on_closed_channel() {
        let (tx, rx) = mpsc::channel::<OutboundMessage>(4);
        drop(rx);
        assert!(!enqueue(&tx, &json!({}), QueuePolicy::DisconnectOnFull));
    }

    #[tokio::test(start_paused = true)]
    async fn forwarder_relays_session_updates() {
        let engine = GameEngine::new(GameConfig::for_mode(GameMode::Maze), 3).expect("valid");
        let (handle, updates) = GameSession::spawn(engine, 50);
        let (tx, mut rx) = mpsc::channel::<OutboundMessage>(16);
        let forwarder = tokio::spawn(forward_updates(updates, tx, "session_test".to_string()));

        let Some(OutboundMessage::Text(payload)) = rx.recv().await else {
            panic!("expected a state frame");
        };
        let value: Value = serde_json::from_str(&payload).expect("valid json");
        assert_eq!(value["type"], "state");
        assert_eq!(value["snapshot"]["mode"], "maze");

        handle.shutdown().await;
        forwarder.await.expect("forwarder exits cleanly");
    }
}
