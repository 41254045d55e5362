//! Artist media lookups behind provider traits: Spotify top tracks and
//! YouTube live-set search.

pub mod cache;

use anyhow::{Context, Result};
use artist_media_rs::youtube::matching;
use artist_media_rs::{SpotifyApi, SpotifyTrack, YouTubeApi, YouTubeVideo};
use async_trait::async_trait;
use std::sync::Arc;

pub use cache::{LIVE_SET_TTL, TtlCache};

/// Market used for top-track lookups
pub const DEFAULT_MARKET: &str = "US";
/// Search results fetched before relevance filtering
pub const LIVE_SET_SEARCH_RESULTS: u32 = 15;
/// Relevant results kept per artist
pub const LIVE_SET_LIMIT: usize = 5;

#[async_trait]
pub trait TopTracksProvider: Send + Sync {
    async fn top_tracks(&self, artist_id: &str) -> Result<Vec<SpotifyTrack>>;
}

#[async_trait]
pub trait VideoSearchProvider: Send + Sync {
    async fn search_videos(&self, query: &str, max_results: u32) -> Result<Vec<YouTubeVideo>>;
}

#[async_trait]
impl TopTracksProvider for SpotifyApi {
    async fn top_tracks(&self, artist_id: &str) -> Result<Vec<SpotifyTrack>> {
        self.artist_top_tracks(artist_id, DEFAULT_MARKET)
            .await
            .with_context(|| format!("Spotify top tracks failed for {}", artist_id))
    }
}

#[async_trait]
impl VideoSearchProvider for YouTubeApi {
    async fn search_videos(&self, query: &str, max_results: u32) -> Result<Vec<YouTubeVideo>> {
        YouTubeApi::search_videos(self, query, max_results)
            .await
            .with_context(|| format!("YouTube search failed for '{}'", query))
    }
}

/// Media lookups for the API; either provider may be absent
#[derive(Clone)]
pub struct ArtistMedia {
    top_tracks: Option<Arc<dyn TopTracksProvider>>,
    videos: Option<Arc<dyn VideoSearchProvider>>,
    live_set_cache: TtlCache<Vec<YouTubeVideo>>,
}

impl ArtistMedia {
    pub fn new(
        top_tracks: Option<Arc<dyn TopTracksProvider>>,
        videos: Option<Arc<dyn VideoSearchProvider>>,
        live_set_cache: TtlCache<Vec<YouTubeVideo>>,
    ) -> Self {
        Self {
            top_tracks,
            videos,
            live_set_cache,
        }
    }

    /// No providers configured
    pub fn disabled() -> Self {
        Self::new(None, None, TtlCache::new(LIVE_SET_TTL))
    }

    pub fn has_top_tracks(&self) -> bool {
        self.top_tracks.is_some()
    }

    pub fn has_videos(&self) -> bool {
        self.videos.is_some()
    }

    /// Top tracks for a Spotify artist id, `None` when Spotify is not configured
    pub async fn top_tracks(&self, artist_id: &str) -> Option<Result<Vec<SpotifyTrack>>> {
        let provider = self.top_tracks.as_ref()?;
        Some(provider.top_tracks(artist_id).await)
    }

    /// Recorded sets for an artist, `None` when YouTube is not configured.
    ///
    /// Results are cached per artist name, including empty ones.
    pub async fn live_sets(&self, artist_name: &str) -> Option<Result<Vec<YouTubeVideo>>> {
        let provider = self.videos.as_ref()?;

        if let Some(cached) = self.live_set_cache.get(artist_name).await {
            tracing::debug!("Live set cache hit for {}", artist_name);
            return Some(Ok(cached));
        }

        let query = matching::live_set_query(artist_name);
        let result = provider
            .search_videos(&query, LIVE_SET_SEARCH_RESULTS)
            .await
            .map(|videos| {
                let fetched = videos.len();
                let relevant: Vec<YouTubeVideo> = videos
                    .into_iter()
                    .filter(|v| matching::is_relevant(artist_name, &v.snippet.title))
                    .take(LIVE_SET_LIMIT)
                    .collect();
                tracing::debug!(
                    "Live sets for {}: {} of {} results relevant",
                    artist_name,
                    relevant.len(),
                    fetched
                );
                relevant
            });

        if let Ok(videos) = &result {
            let purged = self.live_set_cache.purge_expired().await;
            if purged > 0 {
                tracing::debug!("Purged {} expired live set entries", purged);
            }
            self.live_set_cache.insert(artist_name, videos.clone()).await;
            tracing::debug!(
                "Cached live sets for {} for {}s",
                artist_name,
                self.live_set_cache.ttl().as_secs()
            );
        }

        Some(result)
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::{FakeVideoSearch, video};
    use super::*;
    use std::time::Duration;

    fn media_with(search: Arc<FakeVideoSearch>, ttl: Duration) -> ArtistMedia {
        ArtistMedia::new(None, Some(search), TtlCache::new(ttl))
    }

    #[tokio::test]
    async fn test_live_sets_filters_and_limits() {
        let mut videos = vec![
            video("a", "Cooking with grandma"),
            video("b", "Charlotte de Witte @ Tomorrowland"),
        ];
        for i in 0..6 {
            videos.push(video(&format!("c{}", i), "Charlotte de Witte live set"));
        }
        let search = Arc::new(FakeVideoSearch::new(videos));
        let media = media_with(search.clone(), LIVE_SET_TTL);

        let sets = media.live_sets("Charlotte de Witte (BE)").await.unwrap().unwrap();
        assert_eq!(sets.len(), LIVE_SET_LIMIT);
        assert_eq!(sets[0].id.video_id, "b");
        assert!(sets.iter().all(|v| v.id.video_id != "a"));
    }

    #[tokio::test]
    async fn test_live_sets_cached_by_lowercase_name() {
        let search = Arc::new(FakeVideoSearch::new(vec![video("a", "Amelie Lens live")]));
        let media = media_with(search.clone(), LIVE_SET_TTL);
        assert!(media.has_videos());

        media.live_sets("Amelie Lens").await.unwrap().unwrap();
        let again = media.live_sets("AMELIE LENS").await.unwrap().unwrap();

        assert_eq!(again.len(), 1);
        assert_eq!(search.calls(), 1);
    }

    #[tokio::test]
    async fn test_expired_cache_searches_again() {
        let search = Arc::new(FakeVideoSearch::new(vec![]));
        let media = media_with(search.clone(), Duration::ZERO);

        media.live_sets("Artist").await.unwrap().unwrap();
        media.live_sets("Artist").await.unwrap().unwrap();

        assert_eq!(search.calls(), 2);
    }

    #[tokio::test]
    async fn test_expired_entries_do_not_accumulate() {
        let search = Arc::new(FakeVideoSearch::new(vec![]));
        let media = media_with(search.clone(), Duration::ZERO);

        for i in 0..50 {
            media.live_sets(&format!("Artist {}", i)).await.unwrap().unwrap();
        }

        assert_eq!(search.calls(), 50);
        assert_eq!(media.live_set_cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_unconfigured_providers() {
        let media = ArtistMedia::disabled();
        assert!(!media.has_top_tracks());
        assert!(!media.has_videos());
        assert!(media.top_tracks("id").await.is_none());
        assert!(media.live_sets("Artist").await.is_none());
    }
}
