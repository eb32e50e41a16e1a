//! Combat system - hit power, block power, damage

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use super::Fighter;

/// Lowest multiplier applied to attack/defense
pub const MIN_POWER_MULTIPLIER: f64 = 1.0;
/// Upper bound (exclusive) of the multiplier
pub const MAX_POWER_MULTIPLIER: f64 = 2.0;
/// Critical combo deals this many times the attacker's attack
pub const COMBO_MULTIPLIER: f64 = 2.0;

/// Source of the random multipliers used for hit and block power
pub trait PowerRoll {
    /// A value uniformly drawn from `[1, 2)`
    fn roll(&mut self) -> f64;
}

/// Seeded multiplier source for live matches
#[derive(Debug, Clone)]
pub struct SeededRoll {
    rng: ChaCha8Rng,
}

impl SeededRoll {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }
}

impl PowerRoll for SeededRoll {
    fn roll(&mut self) -> f64 {
        self.rng.gen_range(MIN_POWER_MULTIPLIER..MAX_POWER_MULTIPLIER)
    }
}

/// Outcome of one landed swing
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitResult {
    pub hit_power: f64,
    pub block_power: f64,
    pub damage: f64,
}

/// Combat system for computing damage
pub struct CombatSystem;

impl CombatSystem {
    pub fn hit_power(fighter: &Fighter, roll: &mut impl PowerRoll) -> f64 {
        fighter.attack * roll.roll()
    }

    pub fn block_power(fighter: &Fighter, roll: &mut impl PowerRoll) -> f64 {
        fighter.defense * roll.roll()
    }

    /// Damage left once block power is subtracted; 0 when the block holds
    pub fn damage_from_powers(hit_power: f64, block_power: f64) -> f64 {
        if block_power >= hit_power {
            0.0
        } else {
            hit_power - block_power
        }
    }

    /// Roll a landed attack. The defender's block is rolled first.
    pub fn resolve_hit(attacker: &Fighter, defender: &Fighter, roll: &mut impl PowerRoll) -> HitResult {
        let block_power = Self::block_power(defender, roll);
        let hit_power = Self::hit_power(attacker, roll);
        HitResult {
            hit_power,
            block_power,
            damage: Self::damage_from_powers(hit_power, block_power),
        }
    }

    /// Unblockable combo damage
    pub fn combo_damage(attacker: &Fighter) -> f64 {
        COMBO_MULTIPLIER * attacker.attack
    }

    /// Apply damage to health, returns (new_health, is_defeated).
    /// Health is not floored; the display clamps it.
    pub fn apply_damage(current_health: f64, damage: f64) -> (f64, bool) {
        let new_health = current_health - damage;
        (new_health, new_health <= 0.0)
    }
}
