use std::hash::{Hash, Hasher};

use color_eyre::eyre::Result;
use serde::{Deserialize, Serialize};

/// A track as seen by one streaming service.
///
/// `id` is the cross-service identifier (an ISRC for the adapters in this crate) and is the only
/// field used for equality and matching. `local_id` is the service's own handle for the track and
/// is only meaningful to the connector that produced it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Track {
    pub id: String,
    pub title: String,
    pub artist: String,
    pub album: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_id: Option<String>,
}

impl Track {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        artist: impl Into<String>,
        album: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            artist: artist.into(),
            album: album.into(),
            local_id: None,
        }
    }

    pub fn with_local_id(mut self, local_id: impl Into<String>) -> Self {
        self.local_id = Some(local_id.into());
        self
    }

    /// The handle the owning service expects in mutations.
    pub fn service_id(&self) -> &str {
        self.local_id.as_deref().unwrap_or(&self.id)
    }
}

impl PartialEq for Track {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Track {}

impl Hash for Track {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// A playlist as seen by one streaming service. `id` is service-local, `name` is what pairs
/// playlists across services.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Playlist {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub tracks: Vec<Track>,
}

impl Playlist {
    pub fn new(id: impl Into<String>, name: impl Into<String>, tracks: Vec<Track>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            tracks,
        }
    }
}

/// Search predicate for [`Connector::search_track`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackFilters {
    pub id: String,
}

impl TrackFilters {
    pub fn by_id(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

/// Port trait for one music-streaming backend.
///
/// Implementations live in `services::spotify` and `services::tidal` (production) or test mocks.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait Connector: Send + Sync {
    async fn get_playlists(&self) -> Result<Vec<Playlist>>;

    /// `Ok(None)` when the service has no playlist with exactly this name.
    async fn get_playlist_by_name(&self, name: &str) -> Result<Option<Playlist>>;

    async fn create_playlist(&self, name: &str) -> Result<Playlist>;

    async fn add_tracks_to_playlist(&self, playlist_id: &str, tracks: &[Track]) -> Result<()>;

    async fn delete_tracks_from_playlist(&self, playlist_id: &str, tracks: &[Track])
    -> Result<()>;

    async fn search_track(&self, filters: &TrackFilters) -> Result<Vec<Track>>;
}
