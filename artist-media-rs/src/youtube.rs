pub mod matching;

use crate::error::{MediaError, Result};
use crate::models::*;
use reqwest::Client;
use tracing::{debug, info, instrument, warn};

const SEARCH_URL: &str = "https://www.googleapis.com/youtube/v3/search";

/// YouTube Data API v3 client (API key auth)
#[derive(Clone)]
pub struct YouTubeApi {
    client: Client,
    api_key: String,
}

impl YouTubeApi {
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(MediaError::MissingCredentials(
                "Google API key is required".to_string(),
            ));
        }

        info!("Initializing YouTube API client");
        Ok(Self {
            client: Client::builder().build()?,
            api_key,
        })
    }

    /// Search videos matching a free-text query
    #[instrument(skip(self), fields(service = "youtube"))]
    pub async fn search_videos(&self, query: &str, max_results: u32) -> Result<Vec<YouTubeVideo>> {
        info!("Searching videos for '{}'", query);
        let max_results = max_results.clamp(1, 50).to_string();

        let response = self
            .client
            .get(SEARCH_URL)
            .query(&[
                ("part", "snippet"),
                ("q", query),
                ("type", "video"),
                ("maxResults", max_results.as_str()),
                ("key", self.api_key.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("YouTube search failed with status {}", status);
            return Err(MediaError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let text = response.text().await?;
        let body: VideoSearchResponse = serde_json::from_str(&text)?;
        debug!("YouTube returned {} videos", body.items.len());
        Ok(body.items)
    }
}
