use serde::{Deserialize, Serialize};

/// Spotify image reference
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpotifyImage {
    pub url: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExternalUrls {
    pub spotify: Option<String>,
}

/// Album information attached to a track
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpotifyAlbum {
    pub name: String,
    #[serde(default)]
    pub images: Vec<SpotifyImage>,
}

/// Artist reference as it appears inside a track
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpotifyArtistRef {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
}

/// Track information
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpotifyTrack {
    pub id: String,
    pub name: String,
    pub preview_url: Option<String>,
    #[serde(default)]
    pub external_urls: ExternalUrls,
    pub album: SpotifyAlbum,
    #[serde(default)]
    pub artists: Vec<SpotifyArtistRef>,
    /// Duration in milliseconds
    #[serde(default)]
    pub duration_ms: Option<u64>,
}

/// Full artist object returned by search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpotifyArtist {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub external_urls: ExternalUrls,
    #[serde(default)]
    pub images: Vec<SpotifyImage>,
    #[serde(default)]
    pub genres: Vec<String>,
}

impl SpotifyArtist {
    /// Public profile link, falling back to the canonical artist URL
    pub fn profile_url(&self) -> String {
        self.external_urls
            .spotify
            .clone()
            .unwrap_or_else(|| format!("https://open.spotify.com/artist/{}", self.id))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct TopTracksResponse {
    pub tracks: Vec<SpotifyTrack>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ArtistSearchResponse {
    pub artists: Paging<SpotifyArtist>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct Paging<T> {
    pub items: Vec<T>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: String,
    pub expires_in: u64,
}

/// YouTube video identifier wrapper
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoId {
    pub video_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thumbnail {
    pub url: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Thumbnails {
    pub default: Option<Thumbnail>,
    pub medium: Option<Thumbnail>,
    pub high: Option<Thumbnail>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoSnippet {
    pub title: String,
    pub channel_title: String,
    #[serde(default)]
    pub thumbnails: Thumbnails,
    pub published_at: String,
}

/// One video search hit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YouTubeVideo {
    pub id: VideoId,
    pub snippet: VideoSnippet,
}

impl YouTubeVideo {
    pub fn watch_url(&self) -> String {
        format!("https://www.youtube.com/watch?v={}", self.id.video_id)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct VideoSearchResponse {
    #[serde(default)]
    pub items: Vec<YouTubeVideo>,
}
