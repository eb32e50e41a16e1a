//! Fight session: one match between two fighters on a shared keyboard
//!
//! The session is synchronous. Each key press is handled to completion
//! (classification, damage, match-end check, notifications) before the
//! next one is looked at, so a health change and the outcome check that
//! follows it can never interleave with another event.

use serde::Serialize;
use tokio::sync::oneshot;
use tracing::{debug, info};

use crate::config::Controls;

use super::classifier::{classify_press, Action, Classified};
use super::combat::{CombatSystem, PowerRoll};
use super::cooldown::ComboCooldowns;
use super::input::InputState;
use super::{Fighter, FighterSide};

/// Winner of a concluded match
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchOutcome {
    pub winner_side: FighterSide,
    pub winner: Fighter,
}

/// Notifications emitted while a fight is resolved
pub trait FightObserver {
    /// A swing happened, blocked or not
    fn attack_attempted(&mut self, _attacker: FighterSide) {}

    fn combo_executed(&mut self, _attacker: FighterSide) {}

    /// Combo keys were held while the cooldown was still running
    fn combo_not_ready(&mut self, _attacker: FighterSide, _remaining_ms: u64) {}

    /// `health_percentage` is the current health clamped to 0-100
    fn health_changed(&mut self, _side: FighterSide, _health_percentage: f64) {}

    /// Fired exactly once per session
    fn match_concluded(&mut self, _outcome: &MatchOutcome) {}
}

/// What one key press resolved to
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Resolution {
    /// The session had already concluded
    Ignored,
    NoAction,
    AttackBlocked { attacker: FighterSide },
    /// `damage` may be 0 when the defender's block power won the roll
    AttackLanded { attacker: FighterSide, damage: f64 },
    ComboExecuted { attacker: FighterSide, damage: f64 },
    ComboNotReady { attacker: FighterSide, remaining_ms: u64 },
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    Active,
    Concluded(MatchOutcome),
}

pub struct FightSession<R, O> {
    left: Fighter,
    right: Fighter,
    controls: Controls,
    input: InputState,
    cooldowns: ComboCooldowns,
    roll: R,
    observer: O,
    state: SessionState,
    outcome_tx: Option<oneshot::Sender<MatchOutcome>>,
}

impl<R: PowerRoll, O: FightObserver> FightSession<R, O> {
    /// Start a session. The receiver resolves once with the winner.
    pub fn new(
        left: Fighter,
        right: Fighter,
        controls: Controls,
        roll: R,
        observer: O,
    ) -> (Self, oneshot::Receiver<MatchOutcome>) {
        let (outcome_tx, outcome_rx) = oneshot::channel();
        let session = Self {
            left,
            right,
            controls,
            input: InputState::new(),
            cooldowns: ComboCooldowns::new(),
            roll,
            observer,
            state: SessionState::Active,
            outcome_tx: Some(outcome_tx),
        };
        (session, outcome_rx)
    }

    pub fn fighter(&self, side: FighterSide) -> &Fighter {
        match side {
            FighterSide::Left => &self.left,
            FighterSide::Right => &self.right,
        }
    }

    fn fighter_mut(&mut self, side: FighterSide) -> &mut Fighter {
        match side {
            FighterSide::Left => &mut self.left,
            FighterSide::Right => &mut self.right,
        }
    }

    pub fn is_concluded(&self) -> bool {
        matches!(self.state, SessionState::Concluded(_))
    }

    #[cfg(test)]
    pub fn outcome(&self) -> Option<&MatchOutcome> {
        match &self.state {
            SessionState::Active => None,
            SessionState::Concluded(outcome) => Some(outcome),
        }
    }

    #[cfg(test)]
    pub fn input(&self) -> &InputState {
        &self.input
    }

    #[cfg(test)]
    pub fn cooldowns(&self) -> &ComboCooldowns {
        &self.cooldowns
    }

    #[cfg(test)]
    pub fn observer(&self) -> &O {
        &self.observer
    }

    /// Handle a key press at `now_ms` on the match clock
    pub fn key_down(&mut self, code: &str, now_ms: u64) -> Resolution {
        if self.is_concluded() {
            return Resolution::Ignored;
        }

        let held = self.input.key_down(code);
        match classify_press(held, &self.controls) {
            None => Resolution::NoAction,
            Some(classified) => self.dispatch(classified, now_ms),
        }
    }

    /// Handle a key release; never triggers an action
    pub fn key_up(&mut self, code: &str) {
        if self.is_concluded() {
            return;
        }
        self.input.key_up(code);
    }

    fn dispatch(&mut self, classified: Classified, now_ms: u64) -> Resolution {
        let attacker = classified.attacker;
        let defender = attacker.opponent();

        match classified.action {
            Action::NoAction => Resolution::NoAction,
            Action::AttackBlocked => {
                debug!(%attacker, "Attack blocked");
                self.observer.attack_attempted(attacker);
                Resolution::AttackBlocked { attacker }
            }
            Action::AttackLanded => {
                let (attacking, defending) = match attacker {
                    FighterSide::Left => (&self.left, &self.right),
                    FighterSide::Right => (&self.right, &self.left),
                };
                let hit = CombatSystem::resolve_hit(attacking, defending, &mut self.roll);
                debug!(
                    %attacker,
                    hit_power = hit.hit_power,
                    block_power = hit.block_power,
                    damage = hit.damage,
                    "Attack landed"
                );

                if hit.damage > 0.0 {
                    self.apply_damage(defender, hit.damage);
                }
                self.observer.attack_attempted(attacker);
                Resolution::AttackLanded {
                    attacker,
                    damage: hit.damage,
                }
            }
            Action::ComboAttempt => {
                if !self.cooldowns.can_use(attacker, now_ms) {
                    let remaining_ms = self.cooldowns.remaining(attacker, now_ms);
                    debug!(%attacker, remaining_ms, "Critical combo not ready");
                    self.observer.combo_not_ready(attacker, remaining_ms);
                    return Resolution::ComboNotReady {
                        attacker,
                        remaining_ms,
                    };
                }

                let damage = CombatSystem::combo_damage(self.fighter(attacker));
                debug!(%attacker, damage, "Critical combo");
                self.apply_damage(defender, damage);
                self.observer.combo_executed(attacker);
                self.cooldowns.stamp(attacker, now_ms);
                Resolution::ComboExecuted { attacker, damage }
            }
        }
    }

    /// Subtract health, settle the match if needed, then report the new bar width
    fn apply_damage(&mut self, side: FighterSide, damage: f64) {
        let fighter = self.fighter_mut(side);
        let (new_health, _) = CombatSystem::apply_damage(fighter.health, damage);
        fighter.health = new_health;

        self.check_match_end();

        let health_percentage = self.fighter(side).health_percentage();
        self.observer.health_changed(side, health_percentage);
    }

    fn check_match_end(&mut self) {
        if self.is_concluded() {
            unreachable!("match-end check on a concluded fight session");
        }

        let loser = if self.left.is_defeated() {
            FighterSide::Left
        } else if self.right.is_defeated() {
            FighterSide::Right
        } else {
            return;
        };

        let winner_side = loser.opponent();
        let outcome = MatchOutcome {
            winner_side,
            winner: self.fighter(winner_side).clone(),
        };
        info!(
            winner = %outcome.winner.name,
            winner_side = %winner_side,
            "Fight concluded"
        );

        self.state = SessionState::Concluded(outcome.clone());
        self.input.clear();
        self.observer.match_concluded(&outcome);
        if let Some(tx) = self.outcome_tx.take() {
            let _ = tx.send(outcome);
        }
    }
}
