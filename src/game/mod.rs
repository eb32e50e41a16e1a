//! Fight resolution modules

pub mod classifier;
pub mod combat;
pub mod cooldown;
pub mod fighter;
pub mod input;
pub mod r#match;
pub mod session;

pub use fighter::{Fighter, FighterSide, FighterSummary};
pub use r#match::{FightMatch, MatchHandle, MatchInfo, MatchRegistry};

/// Key notification forwarded from the host connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FightInput {
    KeyDown(String),
    KeyUp(String),
}
