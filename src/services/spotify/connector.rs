use color_eyre::eyre::{Result, WrapErr};

use crate::ports::connector::{Connector, Playlist, Track, TrackFilters};
use crate::spotify_rs::client::{SpotifyClient, track_uri};
use crate::spotify_rs::types::{SpotifyPlaylist, SpotifyTrack, SpotifyUser};
#[cfg(test)]
use crate::spotify_rs::types::SpotifyPage;

const SEARCH_LIMIT: u32 = 10;

/// [`Connector`] backed by the Spotify Web API.
///
/// Tracks are identified by ISRC; the Spotify track id rides along as `local_id` for mutations.
pub struct SpotifyConnector {
    client: SpotifyClient,
    user: SpotifyUser,
}

impl SpotifyConnector {
    /// Resolves the token's user up front, since playlist creation is scoped to a user.
    pub async fn connect(client: SpotifyClient) -> Result<Self> {
        let user = client
            .get_current_user()
            .await
            .wrap_err("Failed to get current Spotify user")?;
        log::debug!(
            "Connected to Spotify as {} ({})",
            user.display_name.as_deref().unwrap_or("unnamed"),
            user.id
        );

        Ok(Self { client, user })
    }

    async fn with_tracks(&self, playlist: SpotifyPlaylist) -> Result<Playlist> {
        let tracks = self
            .client
            .get_playlist_tracks(&playlist.id)
            .await
            .wrap_err_with(|| format!("Failed to get tracks for playlist {}", playlist.name))?;

        Ok(Playlist::new(
            playlist.id,
            playlist.name,
            tracks.into_iter().filter_map(to_domain_track).collect(),
        ))
    }

    fn uris(tracks: &[Track]) -> Vec<String> {
        tracks.iter().map(|t| track_uri(t.service_id())).collect()
    }
}

/// Followed playlists owned by someone else are skipped, since the user cannot write to them.
fn find_owned(playlists: Vec<SpotifyPlaylist>, user_id: &str, name: &str) -> Option<SpotifyPlaylist> {
    playlists
        .into_iter()
        .find(|p| p.name == name && p.owner.id == user_id)
}

/// `None` for items without a Spotify id (local files), which cannot be addressed anyway.
pub(crate) fn to_domain_track(track: SpotifyTrack) -> Option<Track> {
    let spotify_id = track.id.clone()?;
    let id = track.isrc().unwrap_or(&spotify_id).to_string();
    let artist = track
        .artists
        .first()
        .map(|a| a.name.clone())
        .unwrap_or_default();
    let album = track.album.map(|a| a.name).unwrap_or_default();

    Some(Track::new(id, track.name, artist, album).with_local_id(spotify_id))
}

#[async_trait::async_trait]
impl Connector for SpotifyConnector {
    async fn get_playlists(&self) -> Result<Vec<Playlist>> {
        let playlists = self
            .client
            .get_user_playlists()
            .await
            .wrap_err("Failed to get playlists for user")?;

        let mut result = Vec::with_capacity(playlists.len());
        for playlist in playlists {
            result.push(self.with_tracks(playlist).await?);
        }
        Ok(result)
    }

    async fn get_playlist_by_name(&self, name: &str) -> Result<Option<Playlist>> {
        let playlists = self
            .client
            .get_user_playlists()
            .await
            .wrap_err("Failed to get playlists for user")?;

        match find_owned(playlists, &self.user.id, name) {
            Some(playlist) => Ok(Some(self.with_tracks(playlist).await?)),
            None => Ok(None),
        }
    }

    async fn create_playlist(&self, name: &str) -> Result<Playlist> {
        let playlist = self
            .client
            .create_playlist(&self.user.id, name)
            .await
            .wrap_err("Failed to create playlist")?;

        Ok(Playlist::new(playlist.id, playlist.name, vec![]))
    }

    async fn add_tracks_to_playlist(&self, playlist_id: &str, tracks: &[Track]) -> Result<()> {
        self.client
            .add_tracks_to_playlist(playlist_id, &Self::uris(tracks))
            .await
    }

    async fn delete_tracks_from_playlist(
        &self,
        playlist_id: &str,
        tracks: &[Track],
    ) -> Result<()> {
        self.client
            .remove_tracks_from_playlist(playlist_id, &Self::uris(tracks))
            .await
    }

    async fn search_track(&self, filters: &TrackFilters) -> Result<Vec<Track>> {
        let results = self
            .client
            .search_tracks(&format!("isrc:{}", filters.id), SEARCH_LIMIT)
            .await
            .wrap_err("Failed to search track")?;

        // The search endpoint is fuzzy; keep exact ISRC hits only.
        Ok(results
            .into_iter()
            .filter_map(to_domain_track)
            .filter(|t| t.id == filters.id)
            .collect())
    }
}
