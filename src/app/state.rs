//! Application state shared across routes

use std::sync::Arc;

use crate::config::Config;
use crate::game::MatchRegistry;
use crate::store::{FighterApiClient, FighterStore};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub fighter_store: FighterStore,
    pub match_registry: Arc<MatchRegistry>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let config = Arc::new(config);

        // Initialize fighter API client and cache
        let fighter_store = FighterStore::new(FighterApiClient::new(&config));

        // Initialize match registry
        let match_registry = Arc::new(MatchRegistry::new());

        Self {
            config,
            fighter_store,
            match_registry,
        }
    }
}
