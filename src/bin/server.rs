use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use futures_util::{SinkExt, StreamExt};
use robot_rescue::config::SimulationConfig;
use robot_rescue::constants::TICK_MS;
use robot_rescue::engine::Simulation;
use robot_rescue::leaderboard::Leaderboard;
use robot_rescue::server_protocol::{parse_client_message, ParsedClientMessage, Steering};
use robot_rescue::server_utils::{
    normalize_weight_steps, parse_leaderboard_limit, parse_seed, parse_weight_hundredths,
    sanitize_name,
};
use robot_rescue::types::GameState;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::{mpsc, Mutex};
use tower_http::services::{ServeDir, ServeFile};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

type SharedState = Arc<Mutex<ServerState>>;

#[derive(Clone)]
struct ClientContext {
    tx: mpsc::Sender<OutboundMessage>,
    name: Option<String>,
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

/// One shared session; every greeted client watches it and may steer it.
struct ServerState {
    clients: HashMap<String, ClientContext>,
    simulation: Simulation,
    pilot_name: String,
    result_recorded: bool,
    leaderboard: Leaderboard,
}

impl ServerState {
    fn new(config: SimulationConfig, leaderboard: Leaderboard) -> Self {
        Self {
            clients: HashMap::new(),
            simulation: Simulation::new(config),
            pilot_name: "Player".to_string(),
            result_recorded: false,
            leaderboard,
        }
    }
}

#[derive(Debug, Deserialize)]
struct LeaderboardQuery {
    limit: Option<String>,
}

#[tokio::main]
async fn main() {
    let port = std::env::var("PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);

    let leaderboard_path = std::env::var("LEADERBOARD_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(".data/leaderboard.txt"));

    let mut config = SimulationConfig {
        seed: parse_seed(std::env::var("SIM_SEED").ok().as_deref()),
        ..SimulationConfig::default()
    };
    if let Some(weight) = parse_weight_hundredths(std::env::var("SIM_WEIGHT").ok().as_deref()) {
        config.heuristic_weight_hundredths = weight;
    }
    println!(
        "[server] seed={} heuristic_weight={:.2}",
        config.seed,
        config.heuristic_weight_hundredths as f32 / 100.0
    );

    let state = Arc::new(Mutex::new(ServerState::new(
        config,
        Leaderboard::new(leaderboard_path),
    )));
    start_tick_loop(state.clone());

    let app = Router::new()
        .route("/healthz", get(healthz))
        .route("/api/leaderboard", get(leaderboard_handler))
        .route("/ws", get(ws_handler))
        .with_state(state);

    let app = if let Some(static_dir) = resolve_static_dir() {
        let index_file = static_dir.join("index.html");
        println!(
            "[server] static file root: {}",
            static_dir.to_string_lossy()
        );
        app.fallback_service(
            ServeDir::new(static_dir).not_found_service(ServeFile::new(index_file)),
        )
    } else {
        eprintln!("[server] static file root not found; serving the API only");
        app
    };

    let bind_addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .expect("failed to bind server socket");

    println!("[server] listening on :{port}");
    axum::serve(listener, app)
        .await
        .expect("server runtime failed");
}

fn resolve_static_dir() -> Option<PathBuf> {
    if let Ok(raw) = std::env::var("STATIC_DIR") {
        let path = PathBuf::from(raw);
        if path.join("index.html").is_file() {
            return Some(path);
        }
    }

    let candidates = [PathBuf::from("dist/client"), PathBuf::from("static")];
    candidates
        .into_iter()
        .find(|path| path.join("index.html").is_file())
}

async fn healthz() -> impl IntoResponse {
    Json(json!({ "ok": true }))
}

async fn leaderboard_handler(
    State(state): State<SharedState>,
    Query(query): Query<LeaderboardQuery>,
) -> impl IntoResponse {
    let guard = state.lock().await;
    Json(
        guard
            .leaderboard
            .build_response(parse_leaderboard_limit(query.limit.as_deref())),
    )
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<SharedState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(state, socket))
}

async fn handle_socket(state: SharedState, socket: WebSocket) {
    let client_id = make_id("client");
    let (tx, mut rx) = mpsc::channel::<OutboundMessage>(256);

    {
        let mut guard = state.lock().await;
        guard.clients.insert(
            client_id.clone(),
            ClientContext {
                tx: tx.clone(),
                name: None,
            },
        );
    }

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

        match message {
            Message::Text(raw) => {
                handle_client_message(state.clone(), &client_id, raw.to_string()).await;
            }
            Message::Binary(raw) => {
                if let Ok(text) = String::from_utf8(raw.to_vec()) {
                    handle_client_message(state.clone(), &client_id, text).await;
                } else {
                    send_error_to_client(&state, &client_id, "invalid utf8 message").await;
                }
            }
            Message::Close(_) => break,
            _ => {}
        }
    }

    {
        let mut guard = state.lock().await;
        disconnect_client_internal(&mut guard, &client_id);
    }
    drop(tx);
    let _ = writer.await;
}

async fn handle_client_message(state: SharedState, client_id: &str, raw: String) {
    let Some(message) = parse_client_message(&raw) else {
        send_error_to_client(&state, client_id, "invalid message").await;
        return;
    };

    let mut guard = state.lock().await;
    if let ParsedClientMessage::Hello { name } = &message {
        handle_hello(&mut guard, client_id, name);
        return;
    }
    if let ParsedClientMessage::Ping { t } = message {
        send_to_client(
            &mut guard,
            client_id,
            &json!({
                "type": "pong",
                "t": t,
            }),
            QueuePolicy::DisconnectOnFull,
        );
        return;
    }

    let greeted = guard
        .clients
        .get(client_id)
        .map(|ctx| ctx.name.is_some())
        .unwrap_or(false);
    if !greeted {
        send_error(&mut guard, client_id, "send hello first");
        return;
    }

    match message {
        ParsedClientMessage::Start => {
            if guard.simulation.state() == GameState::Playing {
                send_error(&mut guard, client_id, "session already running");
                return;
            }
            let pilot = guard
                .clients
                .get(client_id)
                .and_then(|ctx| ctx.name.clone());
            if let Some(name) = pilot {
                guard.pilot_name = name;
            }
            match guard.simulation.start_game() {
                Ok(()) => {
                    guard.result_recorded = false;
                    println!(
                        "[server] session started by {} ({client_id})",
                        guard.pilot_name
                    );
                }
                Err(error) => {
                    eprintln!("[server] failed to start session: {error}");
                    send_error(&mut guard, client_id, "failed to start session");
                }
            }
        }
        ParsedClientMessage::Input { steering } => match steering {
            Steering::Absolute(dir) => guard.simulation.set_direction(dir),
            Steering::Relative {
                input,
                camera_forward,
            } => guard
                .simulation
                .set_relative_direction(input, camera_forward),
        },
        ParsedClientMessage::Boost { on } => guard.simulation.set_boost(on),
        ParsedClientMessage::ToggleAi => {
            guard.simulation.toggle_ai();
        }
        ParsedClientMessage::TogglePause => {
            guard.simulation.toggle_pause();
        }
        ParsedClientMessage::Weight { delta } => {
            guard
                .simulation
                .adjust_heuristic_weight(normalize_weight_steps(delta));
        }
        ParsedClientMessage::Paint { from, to, erase } => {
            if !guard.simulation.ai_enabled() {
                send_error(&mut guard, client_id, "painting requires autopilot mode");
                return;
            }
            guard.simulation.paint_line(from, to, erase);
        }
        ParsedClientMessage::Quit => guard.simulation.end_session(),
        ParsedClientMessage::Menu => guard.simulation.return_to_menu(),
        ParsedClientMessage::Hello { .. } | ParsedClientMessage::Ping { .. } => {}
    }
}

fn handle_hello(state: &mut ServerState, client_id: &str, requested_name: &str) {
    let name = sanitize_name(requested_name);
    let Some(client) = state.clients.get_mut(client_id) else {
        return;
    };
    client.name = Some(name.clone());

    let snapshot = state.simulation.build_snapshot(false);
    send_to_client(
        state,
        client_id,
        &json!({
            "type": "welcome",
            "clientId": client_id,
            "name": name,
            "width": snapshot.width,
            "height": snapshot.height,
        }),
        QueuePolicy::DisconnectOnFull,
    );
    send_to_client(
        state,
        client_id,
        &json!({
            "type": "state",
            "snapshot": snapshot,
        }),
        QueuePolicy::DisconnectOnFull,
    );
}

fn disconnect_client_internal(state: &mut ServerState, client_id: &str) {
    let Some(client) = state.clients.remove(client_id) else {
        return;
    };
    let _ = client.tx.try_send(OutboundMessage::Close {
        code: 1000,
        reason: "disconnected".to_string(),
    });
    let any_greeted = state.clients.values().any(|ctx| ctx.name.is_some());
    if !any_greeted && !state.simulation.is_paused() {
        state.simulation.set_paused(true);
        println!("[server] last viewer left; session paused");
    }
}

fn start_tick_loop(state: SharedState) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_millis(TICK_MS));
        loop {
            interval.tick().await;
            let mut guard = state.lock().await;
            tick_session(&mut guard);
        }
    });
}

fn tick_session(state: &mut ServerState) {
    if let Err(error) = state.simulation.step(TICK_MS) {
        eprintln!("[server] simulation step failed: {error}");
        state.simulation.end_session();
    }
    let snapshot = state.simulation.build_snapshot(true);

    broadcast(
        state,
        &json!({
            "type": "state",
            "snapshot": snapshot,
        }),
        QueuePolicy::DropOnFull,
    );

    if !state.simulation.is_ended() || state.result_recorded {
        return;
    }
    state.result_recorded = true;

    let summary = state.simulation.build_summary();
    let pilot_name = state.pilot_name.clone();
    if let Err(error) = state.leaderboard.record(&pilot_name, &summary) {
        eprintln!("[server] failed to record leaderboard entry: {error}");
    }
    println!(
        "[server] session over: level={} duration={}s rescued={}",
        summary.level, summary.duration_seconds, summary.people_rescued
    );
    let leaderboard = state.leaderboard.build_response(None);
    broadcast(
        state,
        &json!({
            "type": "game_over",
            "summary": summary,
            "leaderboard": leaderboard,
        }),
        QueuePolicy::DisconnectOnFull,
    );
}

fn send_to_client(state: &mut ServerState, client_id: &str, message: &Value, policy: QueuePolicy) {
    let send_failed = if let Some(client) = state.clients.get(client_id) {
        client
            .tx
            .try_send(OutboundMessage::Text(message.to_string()))
            .is_err()
    } else {
        false
    };
    if send_failed && policy == QueuePolicy::DisconnectOnFull {
        disconnect_client_internal(state, client_id);
    }
}

fn send_error(state: &mut ServerState, client_id: &str, message: &str) {
    send_to_client(
        state,
        client_id,
        &json!({
            "type": "error",
            "message": message,
        }),
        QueuePolicy::DisconnectOnFull,
    );
}

async fn send_error_to_client(state: &SharedState, client_id: &str, message: &str) {
    let mut guard = state.lock().await;
    send_error(&mut guard, client_id, message);
}

fn broadcast(state: &mut ServerState, message: &Value, policy: QueuePolicy) {
    let payload = message.to_string();
    let mut failed_clients = Vec::new();
    for (client_id, client) in &state.clients {
        if client.name.is_none() {
            continue;
        }
        if client
            .tx
            .try_send(OutboundMessage::Text(payload.clone()))
            .is_err()
            && policy == QueuePolicy::DisconnectOnFull
        {
            failed_clients.push(client_id.clone());
        }
    }
    for client_id in failed_clients {
        disconnect_client_internal(state, &client_id);
    }
}

fn make_id(prefix: &str) -> String {
    let seq = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    format!("{prefix}_{seq}")
}
