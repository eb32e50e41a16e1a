//! WebSocket protocol message definitions
//! These are the wire types for host client <-> server communication

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::Controls;
use crate::game::{Fighter, FighterSide};

/// Messages sent from the host client to the server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMsg {
    /// Start a fight between two fighters from the roster
    StartFight {
        /// Player one, shown on the left
        left_fighter_id: String,
        /// Player two, shown on the right
        right_fighter_id: String,
    },

    /// A key went down (`KeyboardEvent.code`)
    KeyDown { code: String },

    /// A key was released
    KeyUp { code: String },

    /// Ping for latency measurement
    Ping {
        /// Client timestamp
        t: u64,
    },
}

/// Messages sent from server to client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMsg {
    /// Welcome message after connection
    Welcome {
        connection_id: Uuid,
        server_time: u64,
        /// Key layout the host should forward
        controls: Controls,
    },

    /// A fight is running and accepting keys
    FightStarted {
        match_id: Uuid,
        /// Seed of the hit/block power rolls
        seed: u64,
        left: Fighter,
        right: Fighter,
    },

    /// A swing happened; the host plays one of its attack sounds
    AttackAttempted { attacker: FighterSide },

    /// Critical combo went through; the host plays the combo sound
    ComboExecuted { attacker: FighterSide },

    /// Critical combo still cooling down
    ComboNotReady {
        attacker: FighterSide,
        remaining_ms: u64,
    },

    /// Health bar width for one side (0-100)
    HealthChanged {
        side: FighterSide,
        health_percentage: f64,
    },

    /// The fight is over
    MatchConcluded {
        match_id: Uuid,
        winner_side: FighterSide,
        winner: Fighter,
    },

    /// Error message
    Error { code: String, message: String },

    /// Pong response
    Pong {
        /// Echo back client timestamp
        t: u64,
    },
}

impl ServerMsg {
    pub fn error(code: &str, message: impl Into<String>) -> Self {
        Self::Error {
            code: code.to_string(),
            message: message.into(),
        }
    }
}
