//! WebSocket upgrade handler

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::app::AppState;
use crate::game::session::MatchOutcome;
use crate::game::{FightInput, FightMatch, MatchHandle};
use crate::store::FighterApiError;
use crate::util::rate_limit::KeyRepeatThrottle;
use crate::util::time::unix_millis;
use crate::ws::protocol::{ClientMsg, ServerMsg};

/// WebSocket upgrade handler
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle the upgraded WebSocket connection
async fn handle_socket(socket: WebSocket, state: AppState) {
    let connection_id = Uuid::new_v4();
    info!(connection_id = %connection_id, "New WebSocket connection");

    let (ws_sink, ws_stream) = socket.split();
    let (out_tx, out_rx) = mpsc::channel::<ServerMsg>(128);

    let writer_handle = tokio::spawn(run_writer(connection_id, ws_sink, out_rx));

    let welcome = ServerMsg::Welcome {
        connection_id,
        server_time: unix_millis(),
        controls: state.config.controls.clone(),
    };

    if out_tx.send(welcome).await.is_err() {
        error!(connection_id = %connection_id, "Failed to queue welcome");
        return;
    }

    run_session(connection_id, &state, ws_stream, &out_tx).await;

    // Abort writer task
    writer_handle.abort();

    info!(connection_id = %connection_id, "WebSocket connection closed");
}

/// Writer task: outgoing messages -> WebSocket
async fn run_writer(
    connection_id: Uuid,
    mut ws_sink: futures::stream::SplitSink<WebSocket, Message>,
    mut out_rx: mpsc::Receiver<ServerMsg>,
) {
    while let Some(msg) = out_rx.recv().await {
        if let Err(e) = send_msg(&mut ws_sink, &msg).await {
            debug!(connection_id = %connection_id, error = %e, "WebSocket send failed");
            break;
        }
    }
}

/// Reader loop: WebSocket -> fight task
async fn run_session(
    connection_id: Uuid,
    state: &AppState,
    mut ws_stream: futures::stream::SplitStream<WebSocket>,
    out_tx: &mpsc::Sender<ServerMsg>,
) {
    let mut throttle = KeyRepeatThrottle::new(state.config.input_rate_limit);
    // Dropping the handle closes the fight's input channel
    let mut current: Option<MatchHandle> = None;

    while let Some(result) = ws_stream.next().await {
        let text = match result {
            Ok(Message::Text(text)) => text,
            Ok(Message::Binary(_)) => {
                warn!(connection_id = %connection_id, "Received binary message, ignoring");
                continue;
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => continue,
            Ok(Message::Close(_)) => {
                info!(connection_id = %connection_id, "Client initiated close");
                break;
            }
            Err(e) => {
                error!(connection_id = %connection_id, error = %e, "WebSocket error");
                break;
            }
        };

        let client_msg = match serde_json::from_str::<ClientMsg>(&text) {
            Ok(msg) => msg,
            Err(e) => {
                warn!(connection_id = %connection_id, error = %e, "Failed to parse client message");
                let _ = out_tx.send(ServerMsg::error("bad_message", e.to_string())).await;
                continue;
            }
        };

        match client_msg {
            ClientMsg::StartFight {
                left_fighter_id,
                right_fighter_id,
            } => {
                if current.as_ref().is_some_and(|h| !h.input_tx.is_closed()) {
                    let _ = out_tx
                        .send(ServerMsg::error("fight_running", "A fight is already running"))
                        .await;
                    continue;
                }

                match start_fight(state, &left_fighter_id, &right_fighter_id, out_tx).await {
                    Ok(handle) => {
                        info!(connection_id = %connection_id, match_id = %handle.id, "Fight created");
                        throttle.reset();
                        current = Some(handle);
                    }
                    Err(e) => {
                        warn!(connection_id = %connection_id, error = %e, "Failed to start fight");
                        let _ = out_tx.send(ServerMsg::error(e.code(), e.to_string())).await;
                    }
                }
            }
            ClientMsg::KeyDown { code } => {
                route_key(connection_id, &mut throttle, &mut current, FightInput::KeyDown(code)).await;
            }
            ClientMsg::KeyUp { code } => {
                route_key(connection_id, &mut throttle, &mut current, FightInput::KeyUp(code)).await;
            }
            ClientMsg::Ping { t } => {
                let _ = out_tx.send(ServerMsg::Pong { t }).await;
            }
        }
    }
}

/// Throttle auto-repeats, then hand the key to the fight
async fn route_key(
    connection_id: Uuid,
    throttle: &mut KeyRepeatThrottle,
    current: &mut Option<MatchHandle>,
    input: FightInput,
) {
    match &input {
        FightInput::KeyDown(code) => {
            if !throttle.admit_key_down(code) {
                debug!(connection_id = %connection_id, code = %code, "Throttled key repeat");
                return;
            }
        }
        FightInput::KeyUp(code) => throttle.key_up(code),
    }

    forward_key(connection_id, current, input).await;
}

/// Hand a key notification to the running fight; ignored when none is running
async fn forward_key(connection_id: Uuid, current: &mut Option<MatchHandle>, input: FightInput) {
    let Some(handle) = current.as_ref() else {
        return;
    };

    if handle.input_tx.send(input).await.is_err() {
        debug!(connection_id = %connection_id, match_id = %handle.id, "Fight already over");
        *current = None;
    }
}

/// Load both fighters and spawn the fight task
async fn start_fight(
    state: &AppState,
    left_fighter_id: &str,
    right_fighter_id: &str,
    out_tx: &mpsc::Sender<ServerMsg>,
) -> Result<MatchHandle, StartFightError> {
    let left = state
        .fighter_store
        .get_fighter(left_fighter_id)
        .await?
        .ok_or_else(|| StartFightError::UnknownFighter(left_fighter_id.to_string()))?;
    let right = state
        .fighter_store
        .get_fighter(right_fighter_id)
        .await?
        .ok_or_else(|| StartFightError::UnknownFighter(right_fighter_id.to_string()))?;

    let (fight, handle) = FightMatch::new(
        Uuid::new_v4(),
        rand::random::<u64>(),
        left,
        right,
        state.config.controls.clone(),
        state.match_registry.clone(),
    );

    // Subscribe before the task runs so the start message is not missed
    let events = fight.subscribe();
    let run = tokio::spawn(fight.run());
    tokio::spawn(forward_events(handle.id, events, run, out_tx.clone()));

    Ok(handle)
}

/// Forward fight notifications into the connection's outgoing queue.
///
/// Progress events may be skipped when the client lags, but the conclusion is
/// delivered exactly once: if the broadcast dropped it, it is rebuilt from the
/// fight's result.
async fn forward_events(
    match_id: Uuid,
    mut events: broadcast::Receiver<ServerMsg>,
    run: JoinHandle<Option<MatchOutcome>>,
    out_tx: mpsc::Sender<ServerMsg>,
) {
    let mut concluded_sent = false;

    loop {
        match events.recv().await {
            Ok(msg) => {
                let is_conclusion = matches!(msg, ServerMsg::MatchConcluded { .. });
                if out_tx.send(msg).await.is_err() {
                    return;
                }
                concluded_sent |= is_conclusion;
            }
            Err(broadcast::error::RecvError::Lagged(n)) => {
                warn!(match_id = %match_id, lagged_count = n, "Client lagged, skipping {} events", n);
            }
            Err(broadcast::error::RecvError::Closed) => {
                debug!(match_id = %match_id, "Fight event channel closed");
                break;
            }
        }
    }

    let outcome = match run.await {
        Ok(outcome) => outcome,
        Err(e) => {
            error!(match_id = %match_id, error = %e, "Fight task failed");
            None
        }
    };

    if let (Some(outcome), false) = (outcome, concluded_sent) {
        warn!(match_id = %match_id, "Conclusion lost in lag, resending");
        let _ = out_tx
            .send(ServerMsg::MatchConcluded {
                match_id,
                winner_side: outcome.winner_side,
                winner: outcome.winner,
            })
            .await;
    }
}

/// Send a message over WebSocket
async fn send_msg(
    sink: &mut futures::stream::SplitSink<WebSocket, Message>,
    msg: &ServerMsg,
) -> Result<(), String> {
    let json = serde_json::to_string(msg).map_err(|e| e.to_string())?;
    sink.send(Message::Text(json))
        .await
        .map_err(|e| e.to_string())
}

/// Reasons a fight could not be started
#[derive(Debug, thiserror::Error)]
pub enum StartFightError {
    #[error("Unknown fighter: {0}")]
    UnknownFighter(String),

    #[error("Fighter lookup failed: {0}")]
    Api(#[from] FighterApiError),
}

impl StartFightError {
    pub fn code(&self) -> &'static str {
        match self {
            StartFightError::UnknownFighter(_) => "unknown_fighter",
            StartFightError::Api(_) => "fighter_api",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::config::Controls;
    use crate::game::{Fighter, FighterSide, MatchRegistry};

    fn alpha_wins() -> MatchOutcome {
        MatchOutcome {
            winner_side: FighterSide::Left,
            winner: Fighter::new("1", "Alpha", 40.0, 10.0, 2.0),
        }
    }

    fn conclusions(out_rx: &mut mpsc::Receiver<ServerMsg>) -> usize {
        let mut count = 0;
        while let Ok(msg) = out_rx.try_recv() {
            if matches!(msg, ServerMsg::MatchConcluded { .. }) {
                count += 1;
            }
        }
        count
    }

    #[test]
    fn test_start_fight_error_codes() {
        let err = StartFightError::UnknownFighter("99".to_string());
        assert_eq!(err.code(), "unknown_fighter");
        assert_eq!(err.to_string(), "Unknown fighter: 99");

        let err = StartFightError::from(FighterApiError::MissingRoster);
        assert_eq!(err.code(), "fighter_api");
    }

    #[tokio::test]
    async fn test_forward_key_without_fight_is_ignored() {
        let mut current = None;
        forward_key(Uuid::new_v4(), &mut current, FightInput::KeyDown("KeyA".into())).await;
        assert!(current.is_none());
    }

    #[tokio::test]
    async fn test_forward_key_drops_finished_fight() {
        let (input_tx, input_rx) = mpsc::channel(4);
        drop(input_rx);

        let mut current = Some(MatchHandle {
            id: Uuid::new_v4(),
            input_tx,
        });
        forward_key(Uuid::new_v4(), &mut current, FightInput::KeyUp("KeyA".into())).await;
        assert!(current.is_none());
    }

    #[tokio::test]
    async fn test_press_after_repeat_burst_reaches_fight() {
        let left = Fighter::new("1", "Alpha", 100.0, 10.0, 2.0);
        let right = Fighter::new("2", "Bravo", 100.0, 3.0, 2.0);
        let registry = Arc::new(MatchRegistry::new());
        let (fight, handle) = FightMatch::new(Uuid::new_v4(), 7, left, right, Controls::default(), registry);
        let mut events = fight.subscribe();
        let task = tokio::spawn(fight.run());

        let connection_id = Uuid::new_v4();
        let mut throttle = KeyRepeatThrottle::default();
        let mut current = Some(handle);

        // Both players hold block while the browser auto-repeats
        for i in 0..200 {
            let code = if i % 2 == 0 { "KeyD" } else { "KeyL" };
            route_key(connection_id, &mut throttle, &mut current, FightInput::KeyDown(code.into())).await;
        }
        route_key(connection_id, &mut throttle, &mut current, FightInput::KeyUp("KeyD".into())).await;
        route_key(connection_id, &mut throttle, &mut current, FightInput::KeyDown("KeyA".into())).await;

        drop(current);
        assert!(task.await.unwrap().is_none());

        let mut received = Vec::new();
        while let Ok(msg) = events.try_recv() {
            received.push(msg);
        }
        assert!(received
            .iter()
            .any(|m| matches!(m, ServerMsg::AttackAttempted { attacker: FighterSide::Left })));
    }

    #[tokio::test]
    async fn test_conclusion_resent_when_lag_dropped_it() {
        let match_id = Uuid::new_v4();
        let (event_tx, events) = broadcast::channel(2);
        event_tx
            .send(ServerMsg::MatchConcluded {
                match_id,
                winner_side: FighterSide::Left,
                winner: alpha_wins().winner,
            })
            .unwrap();
        for _ in 0..3 {
            event_tx
                .send(ServerMsg::HealthChanged {
                    side: FighterSide::Right,
                    health_percentage: 0.0,
                })
                .unwrap();
        }
        drop(event_tx);

        let run = tokio::spawn(async { Some(alpha_wins()) });
        let (out_tx, mut out_rx) = mpsc::channel(16);
        forward_events(match_id, events, run, out_tx).await;

        assert_eq!(conclusions(&mut out_rx), 1);
    }

    #[tokio::test]
    async fn test_conclusion_forwarded_once() {
        let match_id = Uuid::new_v4();
        let (event_tx, events) = broadcast::channel(8);
        event_tx
            .send(ServerMsg::MatchConcluded {
                match_id,
                winner_side: FighterSide::Left,
                winner: alpha_wins().winner,
            })
            .unwrap();
        drop(event_tx);

        let run = tokio::spawn(async { Some(alpha_wins()) });
        let (out_tx, mut out_rx) = mpsc::channel(16);
        forward_events(match_id, events, run, out_tx).await;

        assert_eq!(conclusions(&mut out_rx), 1);
    }

    #[tokio::test]
    async fn test_no_conclusion_when_host_left() {
        let (event_tx, events) = broadcast::channel::<ServerMsg>(8);
        drop(event_tx);

        let run = tokio::spawn(async { None });
        let (out_tx, mut out_rx) = mpsc::channel(16);
        forward_events(Uuid::new_v4(), events, run, out_tx).await;

        assert_eq!(conclusions(&mut out_rx), 0);
    }
}
