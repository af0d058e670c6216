use serde::{Deserialize, Serialize};

/// Spotify user profile
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpotifyUser {
    pub id: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

/// Spotify playlist from API. `/me/playlists` lists followed playlists too, so `owner` decides
/// whether the user can edit it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpotifyPlaylist {
    pub id: String,
    pub name: String,
    pub owner: SpotifyUser,
}

/// Spotify track from API. Local files and unavailable tracks come back without an id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpotifyTrack {
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub artists: Vec<SpotifyArtist>,
    #[serde(default)]
    pub album: Option<SpotifyAlbum>,
    pub external_ids: Option<SpotifyExternalIds>,
    #[serde(rename = "type", default)]
    pub item_type: Option<String>,
}

impl SpotifyTrack {
    pub fn isrc(&self) -> Option<&str> {
        self.external_ids
            .as_ref()
            .and_then(|ids| ids.isrc.as_deref())
            .filter(|isrc| !isrc.is_empty())
    }

    /// Playlist items can also be podcast episodes.
    pub fn is_track(&self) -> bool {
        self.item_type.as_deref().is_none_or(|t| t == "track")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpotifyArtist {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpotifyAlbum {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpotifyExternalIds {
    pub isrc: Option<String>,
}

/// Generic paging object wrapping every list endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyPage<T> {
    pub items: Vec<T>,
    pub next: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyPlaylistItem {
    pub track: Option<SpotifyTrack>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpotifySearchResponse {
    pub tracks: Option<SpotifyPage<SpotifyTrack>>,
}
