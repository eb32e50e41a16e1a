//! Fighter store with an in-memory cache over the fighter API

use dashmap::DashMap;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::debug;

use crate::game::{Fighter, FighterSummary};

use super::api::{FighterApiClient, FighterApiError};

/// Fighter store operations
#[derive(Clone)]
pub struct FighterStore {
    client: FighterApiClient,
    roster: Arc<RwLock<Option<Vec<FighterSummary>>>>,
    details: Arc<DashMap<String, Fighter>>,
}

impl FighterStore {
    pub fn new(client: FighterApiClient) -> Self {
        Self {
            client,
            roster: Arc::new(RwLock::new(None)),
            details: Arc::new(DashMap::new()),
        }
    }

    /// Get the roster, fetching it on first use
    pub async fn list_fighters(&self) -> Result<Vec<FighterSummary>, FighterApiError> {
        let cached = self.roster.read().clone();
        if let Some(roster) = cached {
            return Ok(roster);
        }

        let roster = self.client.list_fighters().await?;
        debug!(count = roster.len(), "Fetched fighter roster");
        *self.roster.write() = Some(roster.clone());
        Ok(roster)
    }

    /// Get a fighter by ID with full stats, fetching it on first use.
    ///
    /// Each call returns a fresh copy at full health.
    pub async fn get_fighter(&self, id: &str) -> Result<Option<Fighter>, FighterApiError> {
        if let Some(fighter) = self.details.get(id) {
            return Ok(Some(fighter.value().clone()));
        }

        let Some(fighter) = self.client.fighter_details(id).await? else {
            return Ok(None);
        };
        validate_fighter(&fighter)?;

        debug!(fighter_id = %id, name = %fighter.name, "Fetched fighter details");
        self.details.insert(id.to_string(), fighter.clone());
        Ok(Some(fighter))
    }

    pub fn cached_fighters(&self) -> usize {
        self.details.len()
    }

    #[cfg(test)]
    pub(crate) fn insert_cached(&self, fighter: Fighter) {
        self.details.insert(fighter.id.clone(), fighter);
    }
}

/// Reject records the fight engine cannot use
pub fn validate_fighter(fighter: &Fighter) -> Result<(), FighterApiError> {
    let reason = if !is_positive(fighter.health) {
        "health must be positive"
    } else if !is_positive(fighter.attack) {
        "attack must be positive"
    } else if !is_positive(fighter.defense) {
        "defense must be positive"
    } else {
        return Ok(());
    };

    Err(FighterApiError::InvalidRecord {
        id: fighter.id.clone(),
        reason,
    })
}

/// Finite and strictly above zero; NaN fails
fn is_positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}
