pub mod channel;
pub mod config;
pub mod participants;
pub mod scheduler;

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, SecondsFormat, Utc};
use futures::SinkExt;
use futures::StreamExt;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;
use wheel_core::{
    confirm_chain, status_chain, GameError, GameSession, OwnerId, ParticipantRegistry,
    RngRotation, RotationSource, SessionStore, SpinPlan, ANONYMOUS_OWNER,
};

use crate::channel::{BroadcastChannel, ClientEvent, ConnectionId, GameStatus, ServerEvent};
use crate::scheduler::SpinScheduler;

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

type SharedRotation = Arc<Mutex<Box<dyn RotationSource>>>;

fn shared_rotation(rotation: impl RotationSource + 'static) -> SharedRotation {
    let boxed: Box<dyn RotationSource> = Box::new(rotation);
    Arc::new(Mutex::new(boxed))
}

#[derive(Clone)]
pub struct AppState {
    registry: Arc<ParticipantRegistry>,
    sessions: Arc<RwLock<SessionStore>>,
    rotation: SharedRotation,
    clock: Arc<dyn Clock>,
    scheduler: SpinScheduler,
    channel: BroadcastChannel,
}

impl AppState {
    pub fn new(registry: ParticipantRegistry, broadcast_capacity: usize) -> Self {
        Self {
            registry: Arc::new(registry),
            sessions: Arc::new(RwLock::new(SessionStore::new())),
            rotation: shared_rotation(RngRotation::from_entropy()),
            clock: Arc::new(SystemClock),
            scheduler: SpinScheduler::default(),
            channel: BroadcastChannel::new(broadcast_capacity),
        }
    }

    pub fn with_rotation(mut self, rotation: impl RotationSource + 'static) -> Self {
        self.rotation = shared_rotation(rotation);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn channel(&self) -> &BroadcastChannel {
        &self.channel
    }

    pub fn sessions(&self) -> &Arc<RwLock<SessionStore>> {
        &self.sessions
    }

    pub fn registry(&self) -> &ParticipantRegistry {
        &self.registry
    }

    /// Publishes the server's UTC wall clock to everyone every `period`.
    pub fn spawn_clock_tick(&self, period: Duration) -> JoinHandle<()> {
        let channel = self.channel.clone();
        let clock = self.clock.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            loop {
                interval.tick().await;
                channel.publish_all(ServerEvent::UpdateCurrentTime {
                    current_time: clock.now().format("%H:%M:%S").to_string(),
                });
            }
        })
    }
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/participants", get(get_participants))
        .route("/ws", get(ws_handler))
        .with_state(state)
}

/// Who is sending a control event, and on which connection.
#[derive(Clone, Debug)]
pub struct Caller {
    pub connection: ConnectionId,
    pub owner: OwnerId,
}

impl Caller {
    pub fn new(owner: impl Into<OwnerId>) -> Self {
        Self {
            connection: Uuid::new_v4(),
            owner: owner.into(),
        }
    }
}

#[derive(Deserialize)]
struct ConnectParams {
    user: Option<String>,
}

fn owner_from(user: Option<&str>) -> OwnerId {
    match user.map(str::trim) {
        Some(user) if !user.is_empty() => user.to_string(),
        _ => ANONYMOUS_OWNER.to_string(),
    }
}

#[derive(Serialize)]
struct SectorView {
    name: String,
    weight: f64,
    start: f64,
    end: f64,
    color: String,
}

#[derive(Serialize)]
struct WheelLayout {
    total_weight: f64,
    sectors: Vec<SectorView>,
}

async fn get_participants(State(state): State<AppState>) -> impl IntoResponse {
    let registry = state.registry();
    let count = registry.sectors().len();
    let sectors = registry
        .sectors()
        .iter()
        .zip(registry.participants())
        .enumerate()
        .map(|(i, (sector, participant))| SectorView {
            name: sector.name.clone(),
            weight: participant.weight,
            start: sector.start,
            end: sector.end,
            color: format!("hsl({}, 70%, 50%)", i as f64 * 360.0 / count as f64),
        })
        .collect();

    Json(WheelLayout {
        total_weight: registry.total_weight(),
        sectors,
    })
}

fn iso(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub async fn start_rotation(state: &AppState, caller: &Caller, time: &str) -> Result<(), GameError> {
    let now = state.clock.now();
    let plan = {
        let mut rotation = state.rotation.lock();
        SpinPlan::new(&state.registry, &mut **rotation, time, now)?
    };

    {
        let mut sessions = state.sessions.write().await;
        sessions.start(&caller.owner, &plan);
        state.scheduler.schedule(
            state.sessions.clone(),
            caller.owner.clone(),
            plan.spin_id,
            plan.duration(),
        );
    }

    info!(
        owner = %caller.owner,
        target = %iso(plan.target_time),
        rotation = plan.final_rotation,
        winner = %plan.winner,
        "spin started"
    );

    state.channel.publish_all(ServerEvent::StartGame {
        duration: plan.total_duration_seconds,
        final_angle: plan.final_rotation,
        winner: plan.winner.clone(),
    });
    state.channel.publish_all(ServerEvent::GameStatus(GameStatus {
        target_time: Some(iso(plan.target_time)),
        final_winner: Some(plan.winner),
        ..GameStatus::default()
    }));
    state.channel.publish_all(ServerEvent::PlayBeep);
    Ok(())
}

/// Announces the frozen winner once a client's animation has finished.
/// Repeated calls announce the same winner again.
pub async fn confirm_winner(state: &AppState, caller: &Caller) -> Result<(), GameError> {
    let winner = {
        let mut sessions = state.sessions.write().await;
        let found = sessions
            .resolve_active(&confirm_chain(&caller.owner))
            .and_then(|s| Some((s.owner_id.clone(), s.winner.clone()?)));
        let (owner, winner) = found.ok_or(GameError::WinnerNotFound)?;
        sessions.mark_announced(&owner);
        winner
    };

    info!(caller = %caller.owner, %winner, "winner confirmed");
    state.channel.publish_all(ServerEvent::UpdateWinner { winner });
    state.channel.publish_all(ServerEvent::PlayFanfare);
    Ok(())
}

/// Catches a late joiner up with the spin everyone else is watching.
pub async fn request_status(state: &AppState, caller: &Caller) -> Result<(), GameError> {
    let now = state.clock.now();
    let found: Option<GameSession> = state
        .sessions
        .read()
        .await
        .resolve_active(&status_chain(&caller.owner))
        .cloned();

    let Some(session) = found else {
        debug!(caller = %caller.owner, "no spin to report");
        state
            .channel
            .publish_to(caller.connection, ServerEvent::GameStatus(GameStatus::default()));
        return Ok(());
    };
    let target_time = session.target_time.map(iso);

    match session.remaining_seconds(now) {
        Some(remaining) => {
            let winner = session.winner.clone().ok_or(GameError::WinnerNotFound)?;
            debug!(caller = %caller.owner, remaining, "replaying spin in progress");
            state.channel.publish_all(ServerEvent::GameStatus(GameStatus {
                target_time,
                final_winner: Some(winner.clone()),
                is_running: Some(session.running),
                final_angle: Some(session.final_rotation),
                duration_left: Some(remaining),
                total_duration: Some(session.total_duration_seconds),
            }));
            state.channel.publish_to(
                caller.connection,
                ServerEvent::StartGame {
                    duration: remaining,
                    final_angle: session.final_rotation,
                    winner,
                },
            );
        }
        None => {
            state.channel.publish_to(
                caller.connection,
                ServerEvent::GameStatus(GameStatus {
                    target_time,
                    final_winner: session.winner,
                    is_running: Some(false),
                    ..GameStatus::default()
                }),
            );
        }
    }
    Ok(())
}

/// Acknowledges a reset and stops the caller's pending end-transition.
/// Recorded winners and target times are kept.
pub async fn reset_game(state: &AppState, caller: &Caller) -> Result<(), GameError> {
    if state.scheduler.cancel(&caller.owner) {
        state.sessions.write().await.settle(&caller.owner);
        info!(owner = %caller.owner, "spin reset");
    }
    state.channel.publish_all(ServerEvent::GameResetComplete);
    Ok(())
}

pub async fn handle_client_event(
    state: &AppState,
    caller: &Caller,
    event: ClientEvent,
) -> Result<(), GameError> {
    match event {
        ClientEvent::StartRotation { time } => start_rotation(state, caller, &time).await,
        ClientEvent::ConfirmWinner => confirm_winner(state, caller).await,
        ClientEvent::RequestGameStatus => request_status(state, caller).await,
        ClientEvent::ResetGame => reset_game(state, caller).await,
    }
}

/// Handler boundary: failures go back to the caller only and never escape.
pub async fn dispatch(state: &AppState, caller: &Caller, text: &str) {
    let event = match serde_json::from_str::<ClientEvent>(text) {
        Ok(event) => event,
        Err(err) => {
            warn!(caller = %caller.owner, %err, "malformed client message");
            state.channel.publish_to(
                caller.connection,
                ServerEvent::Error {
                    message: "malformed message".to_string(),
                },
            );
            return;
        }
    };

    if let Err(err) = handle_client_event(state, caller, event).await {
        warn!(caller = %caller.owner, %err, "request failed");
        state.channel.publish_to(
            caller.connection,
            ServerEvent::Error {
                message: err.to_string(),
            },
        );
    }
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(params): Query<ConnectParams>,
) -> impl IntoResponse {
    let caller = Caller::new(owner_from(params.user.as_deref()));
    ws.on_upgrade(move |socket| handle_socket(socket, state, caller))
}

async fn handle_socket(stream: WebSocket, state: AppState, caller: Caller) {
    let (mut sender, mut receiver) = stream.split();
    let mut rx = state.channel.subscribe();
    info!(owner = %caller.owner, connection = %caller.connection, "client connected");

    // Forward broadcasts meant for this connection
    let connection = caller.connection;
    let mut send_task = tokio::spawn(async move {
        loop {
            let envelope = match rx.recv().await {
                Ok(envelope) => envelope,
                Err(RecvError::Lagged(skipped)) => {
                    warn!(%connection, skipped, "client fell behind, dropping events");
                    continue;
                }
                Err(RecvError::Closed) => break,
            };
            if !envelope.is_for(connection) {
                continue;
            }
            let text = match serde_json::to_string(&envelope.event) {
                Ok(text) => text,
                Err(err) => {
                    warn!(%err, "could not encode event");
                    continue;
                }
            };
            if sender.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    let recv_state = state.clone();
    let recv_caller = caller.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(message)) = receiver.next().await {
            match message {
                Message::Text(text) => dispatch(&recv_state, &recv_caller, &text).await,
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }
    info!(owner = %caller.owner, connection = %caller.connection, "client disconnected");
}
