//! Clients for the artist media services used by the lineup browser:
//! Spotify (top tracks, artist lookup) and YouTube (recorded live sets).

pub mod error;
pub mod models;
pub mod spotify;
pub mod youtube;

pub use error::{MediaError, Result};
pub use models::*;
pub use spotify::{artist_id_from_url, SpotifyApi};
pub use youtube::YouTubeApi;
