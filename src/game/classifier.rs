//! Turns the held-key set into at most one fight action per key press

use serde::Serialize;

use crate::config::{ControlMapping, Controls};

use super::input::InputState;
use super::FighterSide;

/// What a single key press means for one attacker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    NoAction,
    /// Attacker swings while the defender holds block
    AttackBlocked,
    /// Attacker swings into an open defender
    AttackLanded,
    /// Attacker holds the full critical combo
    ComboAttempt,
}

/// The action resolved for a press, with the side that performed it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classified {
    pub attacker: FighterSide,
    pub action: Action,
}

/// Classify one attacker against one defender.
///
/// The attack branch wins over the combo branch when both key sets are held.
pub fn classify(held: &InputState, attacker: &ControlMapping, defender: &ControlMapping) -> Action {
    if held.is_held(&attacker.block) {
        return Action::NoAction;
    }

    if held.is_held(&attacker.attack) {
        return if held.is_held(&defender.block) {
            Action::AttackBlocked
        } else {
            Action::AttackLanded
        };
    }

    if held.all_held(&attacker.critical_combo) {
        return Action::ComboAttempt;
    }

    Action::NoAction
}

/// Classify a press for both players, player one first.
///
/// Player two is only considered when player one produced no action, so a
/// single press never resolves both attackers.
pub fn classify_press(held: &InputState, controls: &Controls) -> Option<Classified> {
    [FighterSide::Left, FighterSide::Right]
        .into_iter()
        .find_map(|attacker| {
            let action = classify(
                held,
                controls.mapping(attacker),
                controls.mapping(attacker.opponent()),
            );
            (action != Action::NoAction).then_some(Classified { attacker, action })
        })
}
