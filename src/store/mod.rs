//! Fighter data retrieval from the fighter API

pub mod api;
pub mod fighters;

pub use api::{FighterApiClient, FighterApiError};
pub use fighters::FighterStore;
