//! Running fights: match task, handles, registry

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::Controls;
use crate::util::time::Timer;
use crate::ws::protocol::ServerMsg;

use super::combat::SeededRoll;
use super::session::{FightObserver, FightSession, MatchOutcome, Resolution};
use super::{FightInput, Fighter, FighterSide};

/// Forwards session notifications to everyone subscribed to the match
pub struct BroadcastObserver {
    match_id: Uuid,
    event_tx: broadcast::Sender<ServerMsg>,
}

impl BroadcastObserver {
    fn send(&self, msg: ServerMsg) {
        // No subscribers just means nobody is watching right now
        let _ = self.event_tx.send(msg);
    }
}

impl FightObserver for BroadcastObserver {
    fn attack_attempted(&mut self, attacker: FighterSide) {
        self.send(ServerMsg::AttackAttempted { attacker });
    }

    fn combo_executed(&mut self, attacker: FighterSide) {
        self.send(ServerMsg::ComboExecuted { attacker });
    }

    fn combo_not_ready(&mut self, attacker: FighterSide, remaining_ms: u64) {
        self.send(ServerMsg::ComboNotReady {
            attacker,
            remaining_ms,
        });
    }

    fn health_changed(&mut self, side: FighterSide, health_percentage: f64) {
        self.send(ServerMsg::HealthChanged {
            side,
            health_percentage,
        });
    }

    fn match_concluded(&mut self, outcome: &MatchOutcome) {
        self.send(ServerMsg::MatchConcluded {
            match_id: self.match_id,
            winner_side: outcome.winner_side,
            winner: outcome.winner.clone(),
        });
    }
}

/// Handle to a running fight. Dropping every handle ends the fight.
#[derive(Clone)]
pub struct MatchHandle {
    pub id: Uuid,
    pub input_tx: mpsc::Sender<FightInput>,
}

/// Listing entry for a running fight
#[derive(Debug, Clone, Serialize)]
pub struct MatchInfo {
    pub id: Uuid,
    pub left: String,
    pub right: String,
    pub started_at: DateTime<Utc>,
}

/// Registry of all active fights
pub struct MatchRegistry {
    matches: DashMap<Uuid, MatchInfo>,
}

impl MatchRegistry {
    pub fn new() -> Self {
        Self {
            matches: DashMap::new(),
        }
    }

    #[cfg(test)]
    pub fn get(&self, id: &Uuid) -> Option<MatchInfo> {
        self.matches.get(id).map(|m| m.value().clone())
    }

    pub fn insert(&self, info: MatchInfo) {
        self.matches.insert(info.id, info);
    }

    pub fn remove(&self, id: &Uuid) -> Option<MatchInfo> {
        self.matches.remove(id).map(|(_, info)| info)
    }

    pub fn active_matches(&self) -> usize {
        self.matches.len()
    }

    /// Running fights, oldest first
    pub fn list(&self) -> Vec<MatchInfo> {
        let mut matches: Vec<MatchInfo> = self
            .matches
            .iter()
            .map(|m| m.value().clone())
            .collect();
        matches.sort_by_key(|m| m.started_at);
        matches
    }
}

impl Default for MatchRegistry {
    fn default() -> Self {
        Self::new()
    }
}

const EVENT_BUFFER: usize = 64;

/// One fight, driven by key notifications from its host connection
pub struct FightMatch {
    id: Uuid,
    seed: u64,
    session: FightSession<SeededRoll, BroadcastObserver>,
    outcome_rx: tokio::sync::oneshot::Receiver<MatchOutcome>,
    input_rx: mpsc::Receiver<FightInput>,
    event_tx: broadcast::Sender<ServerMsg>,
    registry: Arc<MatchRegistry>,
}

impl FightMatch {
    /// Create a fight and register it
    pub fn new(
        id: Uuid,
        seed: u64,
        left: Fighter,
        right: Fighter,
        controls: Controls,
        registry: Arc<MatchRegistry>,
    ) -> (Self, MatchHandle) {
        let (input_tx, input_rx) = mpsc::channel(256);
        let (event_tx, _) = broadcast::channel(EVENT_BUFFER);

        let handle = MatchHandle { id, input_tx };

        registry.insert(MatchInfo {
            id,
            left: left.name.clone(),
            right: right.name.clone(),
            started_at: Utc::now(),
        });

        let observer = BroadcastObserver {
            match_id: id,
            event_tx: event_tx.clone(),
        };
        let (session, outcome_rx) =
            FightSession::new(left, right, controls, SeededRoll::new(seed), observer);

        let fight = Self {
            id,
            seed,
            session,
            outcome_rx,
            input_rx,
            event_tx,
            registry,
        };

        (fight, handle)
    }

    /// Receive this fight's notifications. The channel closes once `run` returns.
    pub fn subscribe(&self) -> broadcast::Receiver<ServerMsg> {
        self.event_tx.subscribe()
    }

    /// Process key notifications in arrival order until the fight concludes.
    ///
    /// Returns `None` when the host hung up before anyone won.
    pub async fn run(mut self) -> Option<MatchOutcome> {
        info!(
            match_id = %self.id,
            left = %self.session.fighter(FighterSide::Left).name,
            right = %self.session.fighter(FighterSide::Right).name,
            "Fight started"
        );

        let _ = self.event_tx.send(ServerMsg::FightStarted {
            match_id: self.id,
            seed: self.seed,
            left: self.session.fighter(FighterSide::Left).clone(),
            right: self.session.fighter(FighterSide::Right).clone(),
        });

        // Single clock for both players' combo cooldowns
        let clock = Timer::new();

        while let Some(input) = self.input_rx.recv().await {
            match input {
                FightInput::KeyDown(code) => {
                    let resolution = self.session.key_down(&code, clock.elapsed_ms());
                    if resolution != Resolution::NoAction {
                        debug!(match_id = %self.id, ?resolution, "Key press resolved");
                    }
                }
                FightInput::KeyUp(code) => self.session.key_up(&code),
            }

            if self.session.is_concluded() {
                break;
            }
        }

        self.registry.remove(&self.id);

        let Self {
            id,
            session,
            outcome_rx,
            ..
        } = self;
        // Dropping the session closes the outcome channel if nobody won
        drop(session);

        match outcome_rx.await {
            Ok(outcome) => {
                info!(match_id = %id, winner = %outcome.winner.name, "Fight ended");
                Some(outcome)
            }
            Err(_) => {
                info!(match_id = %id, "Host left before the fight ended");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn start(left: Fighter, right: Fighter) -> (FightMatch, MatchHandle, Arc<MatchRegistry>) {
        let registry = Arc::new(MatchRegistry::new());
        let (fight, handle) = FightMatch::new(
            Uuid::new_v4(),
            7,
            left,
            right,
            Controls::default(),
            registry.clone(),
        );
        (fight, handle, registry)
    }

    async fn press(handle: &MatchHandle, code: &str) {
        handle
            .input_tx
            .send(FightInput::KeyDown(code.to_string()))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_combo_finishes_fight() {
        let left = Fighter::new("1", "Alpha", 50.0, 10.0, 2.0);
        let right = Fighter::new("2", "Bravo", 15.0, 3.0, 2.0);
        let (fight, handle, registry) = start(left, right);
        let mut events = fight.subscribe();
        assert_eq!(registry.active_matches(), 1);

        let task = tokio::spawn(fight.run());
        for code in ["KeyQ", "KeyW", "KeyE"] {
            press(&handle, code).await;
        }

        let outcome = task.await.unwrap().expect("fight should conclude");
        assert_eq!(outcome.winner_side, FighterSide::Left);
        assert_eq!(outcome.winner.name, "Alpha");
        assert_eq!(registry.active_matches(), 0);

        let mut received = Vec::new();
        while let Ok(msg) = events.try_recv() {
            received.push(msg);
        }
        assert!(matches!(received.first(), Some(ServerMsg::FightStarted { seed: 7, .. })));
        assert!(received.iter().any(|m| matches!(
            m,
            ServerMsg::MatchConcluded { winner_side: FighterSide::Left, .. }
        )));
        assert!(received.iter().any(|m| matches!(
            m,
            ServerMsg::HealthChanged { side: FighterSide::Right, health_percentage } if *health_percentage == 0.0
        )));
        assert!(matches!(received.last(), Some(ServerMsg::ComboExecuted { attacker: FighterSide::Left })));
    }

    #[tokio::test]
    async fn test_late_input_after_conclusion_is_dropped() {
        let left = Fighter::new("1", "Alpha", 50.0, 10.0, 2.0);
        let right = Fighter::new("2", "Bravo", 15.0, 3.0, 2.0);
        let (fight, handle, _registry) = start(left, right);

        for code in ["KeyQ", "KeyW", "KeyE"] {
            press(&handle, code).await;
        }
        press(&handle, "KeyJ").await;

        let outcome = fight.run().await.expect("fight should conclude");
        assert_eq!(outcome.winner.health, 50.0);
    }

    #[tokio::test]
    async fn test_host_disconnect_ends_without_outcome() {
        let left = Fighter::new("1", "Alpha", 50.0, 10.0, 2.0);
        let right = Fighter::new("2", "Bravo", 50.0, 3.0, 2.0);
        let (fight, handle, registry) = start(left, right);

        press(&handle, "KeyA").await;
        drop(handle);

        assert!(fight.run().await.is_none());
        assert_eq!(registry.active_matches(), 0);
    }

    #[test]
    fn test_registry_listing() {
        let registry = MatchRegistry::new();
        let first = MatchInfo {
            id: Uuid::new_v4(),
            left: "Alpha".to_string(),
            right: "Bravo".to_string(),
            started_at: Utc::now() - chrono::Duration::seconds(5),
        };
        let second = MatchInfo {
            id: Uuid::new_v4(),
            left: "Charlie".to_string(),
            right: "Delta".to_string(),
            started_at: Utc::now(),
        };
        registry.insert(second.clone());
        registry.insert(first.clone());

        let listed = registry.list();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, first.id);
        assert_eq!(registry.get(&second.id).map(|m| m.left), Some("Charlie".to_string()));

        registry.remove(&first.id);
        assert_eq!(registry.active_matches(), 1);
    }
}
