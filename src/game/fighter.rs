//! Fighter records and arena sides

use serde::{Deserialize, Serialize};

/// Fighter record as served by the fighter API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fighter {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    /// Current health; may drop below zero on the killing blow
    pub health: f64,
    pub attack: f64,
    pub defense: f64,
    /// Sprite URL used by the arena view
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl Fighter {
    pub fn new(id: impl Into<String>, name: impl Into<String>, health: f64, attack: f64, defense: f64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            health,
            attack,
            defense,
            source: None,
        }
    }

    /// Health clamped to the 0-100 width of a health bar
    pub fn health_percentage(&self) -> f64 {
        self.health.clamp(0.0, 100.0)
    }

    pub fn is_defeated(&self) -> bool {
        self.health <= 0.0
    }
}

/// Lightweight roster entry from the fighter list endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FighterSummary {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

/// Arena side; player one fights on the left
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FighterSide {
    Left,
    Right,
}

impl FighterSide {
    pub fn opponent(self) -> Self {
        match self {
            Self::Left => Self::Right,
            Self::Right => Self::Left,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Right => "right",
        }
    }
}

impl std::fmt::Display for FighterSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
