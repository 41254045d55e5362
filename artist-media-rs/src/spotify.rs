use crate::error::{MediaError, Result};
use crate::models::*;
use base64::{engine::general_purpose, Engine as _};
use reqwest::{Client, Url};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

const TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
const API_BASE: &str = "https://api.spotify.com/v1";
const ARTIST_URI_PREFIX: &str = "spotify:artist:";

/// Tokens are refreshed this long before Spotify says they expire.
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);

#[derive(Clone)]
struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

/// Spotify Web API client using the client-credentials flow.
///
/// The access token lives inside the client, so every handle cloned from the
/// same instance shares one token.
#[derive(Clone)]
pub struct SpotifyApi {
    client: Client,
    client_id: String,
    client_secret: String,
    token: Arc<RwLock<Option<CachedToken>>>,
}

impl SpotifyApi {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Result<Self> {
        let client_id = client_id.into();
        let client_secret = client_secret.into();

        if client_id.trim().is_empty() || client_secret.trim().is_empty() {
            return Err(MediaError::MissingCredentials(
                "Spotify client id and secret are required".to_string(),
            ));
        }

        info!("Initializing Spotify API client");
        Ok(Self {
            client: Client::builder().build()?,
            client_id,
            client_secret,
            token: Arc::new(RwLock::new(None)),
        })
    }

    /// Returns a valid access token, requesting a new one when the cached token is stale
    async fn access_token(&self) -> Result<String> {
        {
            let guard = self.token.read().await;
            if let Some(token) = guard.as_ref() {
                if token.expires_at > Instant::now() {
                    return Ok(token.access_token.clone());
                }
            }
        }

        let token = self.fetch_token().await?;
        let access_token = token.access_token.clone();
        *self.token.write().await = Some(token);
        Ok(access_token)
    }

    #[instrument(skip(self), fields(service = "spotify"))]
    async fn fetch_token(&self) -> Result<CachedToken> {
        debug!("Requesting client-credentials token");
        let auth = general_purpose::STANDARD
            .encode(format!("{}:{}", self.client_id, self.client_secret).as_bytes());

        let response = self
            .client
            .post(TOKEN_URL)
            .header("Authorization", format!("Basic {}", auth))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("Token request failed with status {}", status);
            return Err(MediaError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let body: TokenResponse = response.json().await?;
        if body.access_token.is_empty() {
            return Err(MediaError::InvalidResponse(
                "Empty access token received from Spotify".to_string(),
            ));
        }

        let lifetime = Duration::from_secs(body.expires_in).saturating_sub(TOKEN_EXPIRY_MARGIN);
        info!("New Spotify token fetched, valid for {}s", lifetime.as_secs());

        Ok(CachedToken {
            access_token: body.access_token,
            expires_at: Instant::now() + lifetime,
        })
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: Url,
        query: &[(&str, &str)],
    ) -> Result<T> {
        let token = self.access_token().await?;
        let response = self
            .client
            .get(url.clone())
            .bearer_auth(token)
            .query(query)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("Spotify API error {} for {}", status, url);
            return Err(MediaError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let text = response.text().await?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Get an artist's top tracks for a market
    #[instrument(skip(self), fields(service = "spotify"))]
    pub async fn artist_top_tracks(&self, artist_id: &str, market: &str) -> Result<Vec<SpotifyTrack>> {
        if !is_artist_id(artist_id) {
            return Err(MediaError::InvalidArtistId(artist_id.to_string()));
        }

        info!("Fetching top tracks for artist {}", artist_id);
        let url = api_url(&["artists", artist_id, "top-tracks"])?;
        let body: TopTracksResponse = self.get_json(url, &[("market", market)]).await?;
        debug!("Received {} top tracks", body.tracks.len());
        Ok(body.tracks)
    }

    /// Search for an artist by name and return the best match
    #[instrument(skip(self), fields(service = "spotify"))]
    pub async fn search_artist(&self, name: &str) -> Result<Option<SpotifyArtist>> {
        info!("Searching artist '{}'", name);
        let url = api_url(&["search"])?;
        let body: ArtistSearchResponse = self
            .get_json(url, &[("q", name), ("type", "artist"), ("limit", "1")])
            .await?;

        let artist = body.artists.items.into_iter().next();
        match &artist {
            Some(a) => debug!("Found '{}' with ID {}", name, a.id),
            None => debug!("No artist found for '{}'", name),
        }
        Ok(artist)
    }
}

/// API endpoint built from escaped path segments
fn api_url(segments: &[&str]) -> Result<Url> {
    let mut url = Url::parse(API_BASE).map_err(|e| MediaError::InvalidUrl(e.to_string()))?;
    url.path_segments_mut()
        .map_err(|_| MediaError::InvalidUrl(API_BASE.to_string()))?
        .extend(segments);
    Ok(url)
}

/// Spotify ids are base62
pub fn is_artist_id(id: &str) -> bool {
    !id.is_empty() && id.chars().all(|c| c.is_ascii_alphanumeric())
}

/// Extract the artist ID from a Spotify profile link.
///
/// Accepts `https://open.spotify.com/artist/<id>` with optional query string or
/// trailing slash, a `spotify:artist:<id>` URI, or a bare ID. Returns `None`
/// unless the result is a base62 ID.
pub fn artist_id_from_url(link: &str) -> Option<String> {
    let link = link.trim();

    let id = if let Some(id) = link.strip_prefix(ARTIST_URI_PREFIX) {
        id.to_string()
    } else {
        match Url::parse(link) {
            Ok(url) => url
                .path_segments()
                .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
                .map(str::to_string)?,
            Err(_) => link.to_string(),
        }
    };

    is_artist_id(&id).then_some(id)
}
