//! Fighter API client (static JSON endpoints)

use reqwest::Client;
use serde::de::DeserializeOwned;

use crate::config::Config;
use crate::game::{Fighter, FighterSummary};

/// Client for the fighter API
#[derive(Clone)]
pub struct FighterApiClient {
    client: Client,
    base_url: String,
}

impl FighterApiClient {
    pub fn new(config: &Config) -> Self {
        Self::with_base_url(&config.fighter_api_url)
    }

    pub fn with_base_url(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Get the URL for an endpoint path
    fn endpoint_url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// GET a JSON document, `None` on 404
    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>, FighterApiError> {
        let url = self.endpoint_url(path);

        let response = self
            .client
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(FighterApiError::Request)?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(FighterApiError::Api { status: status.as_u16(), body });
        }

        response.json().await.map(Some).map_err(FighterApiError::Parse)
    }

    /// Fetch the roster
    pub async fn list_fighters(&self) -> Result<Vec<FighterSummary>, FighterApiError> {
        self.get_json("fighters.json")
            .await?
            .ok_or(FighterApiError::MissingRoster)
    }

    /// Fetch one fighter's full record
    pub async fn fighter_details(&self, id: &str) -> Result<Option<Fighter>, FighterApiError> {
        self.get_json(&fighter_details_path(id)).await
    }
}

fn fighter_details_path(id: &str) -> String {
    format!("details/fighter/{}.json", id)
}

/// Fighter API errors
#[derive(Debug, thiserror::Error)]
pub enum FighterApiError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("API error (status {status}): {body}")]
    Api { status: u16, body: String },

    #[error("Failed to parse response: {0}")]
    Parse(reqwest::Error),

    #[error("Fighter roster not found")]
    MissingRoster,

    #[error("Invalid fighter record {id}: {reason}")]
    InvalidRecord { id: String, reason: &'static str },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_urls() {
        let client = FighterApiClient::with_base_url("http://localhost:8000/api/");
        assert_eq!(
            client.endpoint_url("fighters.json"),
            "http://localhost:8000/api/fighters.json"
        );
        assert_eq!(
            client.endpoint_url(&fighter_details_path("3")),
            "http://localhost:8000/api/details/fighter/3.json"
        );
    }
}
