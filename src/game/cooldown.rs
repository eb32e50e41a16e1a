//! Critical combo cooldowns

use super::FighterSide;

/// Milliseconds that must pass (strictly) between two combos of one player
pub const COMBO_COOLDOWN_MS: u64 = 10_000;

/// Last successful combo per player, in match-clock milliseconds.
///
/// `None` means the combo was never used and is available right away.
#[derive(Debug, Clone, Default)]
pub struct ComboCooldowns {
    left: Option<u64>,
    right: Option<u64>,
}

impl ComboCooldowns {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, side: FighterSide) -> Option<u64> {
        match side {
            FighterSide::Left => self.left,
            FighterSide::Right => self.right,
        }
    }

    pub fn can_use(&self, side: FighterSide, now_ms: u64) -> bool {
        match self.slot(side) {
            None => true,
            Some(last) => now_ms.saturating_sub(last) > COMBO_COOLDOWN_MS,
        }
    }

    /// Record a successful combo
    pub fn stamp(&mut self, side: FighterSide, now_ms: u64) {
        match side {
            FighterSide::Left => self.left = Some(now_ms),
            FighterSide::Right => self.right = Some(now_ms),
        }
    }

    #[cfg(test)]
    pub fn last_used(&self, side: FighterSide) -> Option<u64> {
        self.slot(side)
    }

    /// Milliseconds until the combo is available again (0 when ready)
    pub fn remaining(&self, side: FighterSide, now_ms: u64) -> u64 {
        match self.slot(side) {
            None => 0,
            Some(last) => (last + COMBO_COOLDOWN_MS + 1).saturating_sub(now_ms),
        }
    }
}
