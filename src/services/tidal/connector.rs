use std::collections::{HashMap, HashSet};

use color_eyre::eyre::{Result, WrapErr};

use crate::ports::connector::{Connector, Playlist, Track, TrackFilters};
use crate::tidal_rs::client::TidalClient;
use crate::tidal_rs::types::{
    TidalDocument, TidalPlaylistItem, TidalRelationship, TidalResource,
};

/// [`Connector`] backed by the TIDAL OpenAPI.
///
/// Same identity scheme as the Spotify connector: ISRC as `id`, TIDAL track id as `local_id`.
pub struct TidalConnector {
    client: TidalClient,
}

impl TidalConnector {
    pub fn new(client: TidalClient) -> Self {
        Self { client }
    }

    async fn with_tracks(&self, playlist: TidalResource) -> Result<Playlist> {
        let name = playlist.attributes.name.unwrap_or_default();
        let items = self
            .client
            .get_playlist_items(&playlist.id)
            .await
            .wrap_err_with(|| format!("Failed to get tracks for playlist {}", name))?;

        let ids: Vec<String> = items.iter().map(|item| item.track_id.clone()).collect();
        let catalog = self
            .client
            .get_tracks(&ids)
            .await
            .wrap_err_with(|| format!("Failed to get track details for playlist {}", name))?;

        Ok(Playlist::new(playlist.id, name, playlist_tracks(items, &catalog)))
    }
}

/// Tracks in playlist order, taking artist and album names from `catalog`. Items missing from the
/// catalog fall back to the bare resource included with the playlist.
pub(crate) fn playlist_tracks(
    items: Vec<TidalPlaylistItem>,
    catalog: &TidalDocument<Vec<TidalResource>>,
) -> Vec<Track> {
    let included: HashMap<&str, &TidalResource> =
        catalog.included.iter().map(|r| (r.id.as_str(), r)).collect();
    let details: HashMap<&str, &TidalResource> =
        catalog.data.iter().map(|r| (r.id.as_str(), r)).collect();

    items
        .into_iter()
        .filter_map(|item| match details.get(item.track_id.as_str()) {
            Some(track) => Some((*track).clone()),
            None => item.track,
        })
        .map(|track| to_domain_track(track, &included))
        .collect()
}

/// `included` resolves artist and album names; missing entries leave those fields empty.
pub(crate) fn to_domain_track(track: TidalResource, included: &HashMap<&str, &TidalResource>) -> Track {
    let name_of = |relationship: Option<&TidalRelationship>| {
        relationship
            .and_then(|r| r.first_id())
            .and_then(|id| included.get(id))
            .and_then(|r| r.attributes.name.clone().or_else(|| r.attributes.title.clone()))
            .unwrap_or_default()
    };
    let artist = name_of(track.relationships.artists.as_ref());
    let album = name_of(track.relationships.albums.as_ref());

    let id = track
        .attributes
        .isrc
        .filter(|isrc| !isrc.is_empty())
        .unwrap_or_else(|| track.id.clone());

    Track::new(id, track.attributes.title.unwrap_or_default(), artist, album)
        .with_local_id(track.id)
}

#[async_trait::async_trait]
impl Connector for TidalConnector {
    async fn get_playlists(&self) -> Result<Vec<Playlist>> {
        let playlists = self
            .client
            .get_my_playlists()
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
            .get_my_playlists()
            .await
            .wrap_err("Failed to get playlists for user")?;

        match playlists
            .into_iter()
            .find(|p| p.attributes.name.as_deref() == Some(name))
        {
            Some(playlist) => Ok(Some(self.with_tracks(playlist).await?)),
            None => Ok(None),
        }
    }

    async fn create_playlist(&self, name: &str) -> Result<Playlist> {
        let playlist = self
            .client
            .create_playlist(name)
            .await
            .wrap_err("Failed to create playlist")?;

        let name = playlist.attributes.name.unwrap_or_else(|| name.to_string());
        Ok(Playlist::new(playlist.id, name, vec![]))
    }

    async fn add_tracks_to_playlist(&self, playlist_id: &str, tracks: &[Track]) -> Result<()> {
        let ids: Vec<String> = tracks.iter().map(|t| t.service_id().to_string()).collect();
        self.client.add_tracks(playlist_id, &ids).await
    }

    /// Deletion is addressed by playlist item id, so the current items are fetched first.
    async fn delete_tracks_from_playlist(
        &self,
        playlist_id: &str,
        tracks: &[Track],
    ) -> Result<()> {
        let wanted: HashSet<&str> = tracks.iter().map(|t| t.service_id()).collect();
        let items: Vec<_> = self
            .client
            .get_playlist_items(playlist_id)
            .await
            .wrap_err("Failed to resolve playlist items for removal")?
            .into_iter()
            .filter(|item| wanted.contains(item.track_id.as_str()))
            .collect();

        if items.is_empty() {
            log::debug!("No items in playlist {} match the tracks to remove", playlist_id);
            return Ok(());
        }

        self.client.remove_items(playlist_id, &items).await
    }

    async fn search_track(&self, filters: &TrackFilters) -> Result<Vec<Track>> {
        let document = self
            .client
            .tracks_by_isrc(&filters.id)
            .await
            .wrap_err("Failed to search track")?;

        let included: HashMap<&str, &TidalResource> = document
            .included
            .iter()
            .map(|r| (r.id.as_str(), r))
            .collect();

        Ok(document
            .data
            .into_iter()
            .map(|track| to_domain_track(track, &included))
            .filter(|t| t.id == filters.id)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_maps_search_document_with_included_names() {
        let document: TidalDocument<Vec<TidalResource>> = serde_json::from_str(
            r#"{
                "data": [{
                    "id": "77646290",
                    "type": "tracks",
                    "attributes": { "title": "Never Gonna Give You Up", "isrc": "GBARL9300135" },
                    "relationships": {
                        "artists": { "data": [{ "id": "7170", "type": "artists" }] },
                        "albums": { "data": [{ "id": "77646283", "type": "albums" }] }
                    }
                }],
                "included": [
                    { "id": "7170", "type": "artists", "attributes": { "name": "Rick Astley" } },
                    { "id": "77646283", "type": "albums",
                      "attributes": { "title": "Whenever You Need Somebody" } }
                ]
            }"#,
        )
        .unwrap();
        let included: HashMap<&str, &TidalResource> = document
            .included
            .iter()
            .map(|r| (r.id.as_str(), r))
            .collect();

        let track = to_domain_track(document.data[0].clone(), &included);

        assert_eq!(track.id, "GBARL9300135");
        assert_eq!(track.local_id.as_deref(), Some("77646290"));
        assert_eq!(track.title, "Never Gonna Give You Up");
        assert_eq!(track.artist, "Rick Astley");
        assert_eq!(track.album, "Whenever You Need Somebody");
    }

    #[test]
    fn test_playlist_tracks_carry_artist_and_album() {
        let items = vec![
            TidalPlaylistItem {
                track_id: "101".into(),
                item_id: Some("item-a".into()),
                track: None,
            },
            TidalPlaylistItem {
                track_id: "102".into(),
                item_id: Some("item-b".into()),
                track: serde_json::from_str(
                    r#"{ "id": "102", "type": "tracks",
                         "attributes": { "title": "Bare", "isrc": "USRC2" } }"#,
                )
                .unwrap(),
            },
        ];
        let catalog: TidalDocument<Vec<TidalResource>> = serde_json::from_str(
            r#"{
                "data": [{
                    "id": "101",
                    "type": "tracks",
                    "attributes": { "title": "Full", "isrc": "USRC1" },
                    "relationships": {
                        "artists": { "data": [{ "id": "9", "type": "artists" }] },
                        "albums": { "data": [{ "id": "8", "type": "albums" }] }
                    }
                }],
                "included": [
                    { "id": "9", "type": "artists", "attributes": { "name": "Band" } },
                    { "id": "8", "type": "albums", "attributes": { "title": "Record" } }
                ]
            }"#,
        )
        .unwrap();

        let tracks = playlist_tracks(items, &catalog);

        assert_eq!(tracks.len(), 2);
        assert_eq!(tracks[0].id, "USRC1");
        assert_eq!(tracks[0].artist, "Band");
        assert_eq!(tracks[0].album, "Record");
        assert_eq!(tracks[1].id, "USRC2");
        assert_eq!(tracks[1].artist, "");
    }

    #[test]
    fn test_falls_back_to_tidal_id_without_isrc() {
        let resource: TidalResource = serde_json::from_str(
            r#"{ "id": "123", "type": "tracks", "attributes": { "title": "Demo" } }"#,
        )
        .unwrap();

        let track = to_domain_track(resource, &HashMap::new());

        assert_eq!(track.id, "123");
        assert_eq!(track.service_id(), "123");
        assert_eq!(track.artist, "");
    }
}
