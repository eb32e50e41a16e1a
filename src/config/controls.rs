//! Keyboard control layout for both players

use std::env;

use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::game::FighterSide;

/// Keys one player fights with
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlMapping {
    pub attack: String,
    pub block: String,
    /// Every key here must be held at once to fire the critical combo
    pub critical_combo: Vec<String>,
}

impl ControlMapping {
    pub fn new(attack: &str, block: &str, critical_combo: &[&str]) -> Self {
        Self {
            attack: attack.to_string(),
            block: block.to_string(),
            critical_combo: critical_combo.iter().map(|k| k.to_string()).collect(),
        }
    }

    /// Player one: attack `A`, block `D`, combo `Q`+`W`+`E`
    pub fn player_one() -> Self {
        Self::new("KeyA", "KeyD", &["KeyQ", "KeyW", "KeyE"])
    }

    /// Player two: attack `J`, block `L`, combo `U`+`I`+`O`
    pub fn player_two() -> Self {
        Self::new("KeyJ", "KeyL", &["KeyU", "KeyI", "KeyO"])
    }

    fn validate(&self, player: &'static str) -> Result<(), ConfigError> {
        if self.attack.is_empty() || self.block.is_empty() {
            return Err(ConfigError::InvalidControls {
                player,
                reason: "attack and block keys must be set",
            });
        }
        if self.attack == self.block {
            return Err(ConfigError::InvalidControls {
                player,
                reason: "attack and block must be different keys",
            });
        }
        if self.critical_combo.is_empty() {
            return Err(ConfigError::InvalidControls {
                player,
                reason: "critical combo needs at least one key",
            });
        }
        Ok(())
    }
}

/// Control layout for the whole match
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Controls {
    pub player_one: ControlMapping,
    pub player_two: ControlMapping,
}

impl Default for Controls {
    fn default() -> Self {
        Self {
            player_one: ControlMapping::player_one(),
            player_two: ControlMapping::player_two(),
        }
    }
}

impl Controls {
    /// Load the layout, letting `PLAYER_ONE_*` / `PLAYER_TWO_*` override defaults
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let controls = Self {
            player_one: mapping_from_lookup(&lookup, "PLAYER_ONE", ControlMapping::player_one()),
            player_two: mapping_from_lookup(&lookup, "PLAYER_TWO", ControlMapping::player_two()),
        };
        controls.player_one.validate("player_one")?;
        controls.player_two.validate("player_two")?;
        Ok(controls)
    }

    pub fn mapping(&self, side: FighterSide) -> &ControlMapping {
        match side {
            FighterSide::Left => &self.player_one,
            FighterSide::Right => &self.player_two,
        }
    }
}

fn mapping_from_lookup<F>(lookup: &F, prefix: &str, default: ControlMapping) -> ControlMapping
where
    F: Fn(&str) -> Option<String>,
{
    let attack = lookup(&format!("{prefix}_ATTACK")).map(|v| v.trim().to_string());
    let block = lookup(&format!("{prefix}_BLOCK")).map(|v| v.trim().to_string());
    let combo = lookup(&format!("{prefix}_COMBO")).map(|v| {
        v.split(',')
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(str::to_string)
            .collect::<Vec<_>>()
    });

    ControlMapping {
        attack: attack.unwrap_or(default.attack),
        block: block.unwrap_or(default.block),
        critical_combo: combo.unwrap_or(default.critical_combo),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let controls = Controls::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(controls, Controls::default());
        assert_eq!(controls.mapping(FighterSide::Left).attack, "KeyA");
        assert_eq!(controls.mapping(FighterSide::Right).block, "KeyL");
    }

    #[test]
    fn test_env_overrides() {
        let controls = Controls::from_lookup(lookup_from(&[
            ("PLAYER_TWO_ATTACK", "ArrowLeft"),
            ("PLAYER_TWO_COMBO", "Numpad1, Numpad2 ,Numpad3"),
        ]))
        .unwrap();
        assert_eq!(controls.player_two.attack, "ArrowLeft");
        assert_eq!(controls.player_two.block, "KeyL");
        assert_eq!(controls.player_two.critical_combo, vec!["Numpad1", "Numpad2", "Numpad3"]);
        assert_eq!(controls.player_one, ControlMapping::player_one());
    }

    #[test]
    fn test_empty_combo_rejected() {
        let result = Controls::from_lookup(lookup_from(&[("PLAYER_ONE_COMBO", " , ")]));
        assert!(matches!(
            result,
            Err(ConfigError::InvalidControls { player: "player_one", .. })
        ));
    }

    #[test]
    fn test_same_attack_and_block_rejected() {
        let result = Controls::from_lookup(lookup_from(&[("PLAYER_TWO_BLOCK", "KeyJ")]));
        assert!(matches!(
            result,
            Err(ConfigError::InvalidControls { player: "player_two", .. })
        ));
    }
}
