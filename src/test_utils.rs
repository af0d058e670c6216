use std::collections::HashSet;
use std::sync::Mutex;

use color_eyre::eyre::{Result, eyre};

use crate::ports::connector::{Connector, Playlist, Track, TrackFilters};

pub fn track(id: &str) -> Track {
    Track::new(id, format!("Track {}", id), "Artist", "Album")
}

pub fn tracks(ids: &[&str]) -> Vec<Track> {
    ids.iter().map(|id| track(id)).collect()
}

#[derive(Debug, Default)]
struct State {
    playlists: Vec<Playlist>,
    catalog: Vec<Track>,
    searches: usize,
    created: usize,
    failing_adds: HashSet<String>,
}

/// A connector backed by memory: playlists are mutated in place and `search_track` resolves
/// against a fixed catalog.
#[derive(Debug, Default)]
pub struct InMemoryConnector {
    state: Mutex<State>,
}

impl InMemoryConnector {
    pub fn with_playlists(playlists: Vec<Playlist>) -> Self {
        let connector = Self::default();
        connector.state.lock().unwrap().playlists = playlists;
        connector
    }

    pub fn with_catalog(catalog: Vec<Track>) -> Self {
        Self::default().and_catalog(catalog)
    }

    pub fn and_catalog(self, catalog: Vec<Track>) -> Self {
        self.state.lock().unwrap().catalog = catalog;
        self
    }

    /// Makes `add_tracks_to_playlist` fail for the given playlist id.
    pub fn failing_adds_to(self, playlist_id: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .failing_adds
            .insert(playlist_id.to_string());
        self
    }

    pub fn search_count(&self) -> usize {
        self.state.lock().unwrap().searches
    }

    pub fn playlist_named(&self, name: &str) -> Option<Playlist> {
        self.state
            .lock()
            .unwrap()
            .playlists
            .iter()
            .find(|p| p.name == name)
            .cloned()
    }
}

#[async_trait::async_trait]
impl Connector for InMemoryConnector {
    async fn get_playlists(&self) -> Result<Vec<Playlist>> {
        Ok(self.state.lock().unwrap().playlists.clone())
    }

    async fn get_playlist_by_name(&self, name: &str) -> Result<Option<Playlist>> {
        Ok(self.playlist_named(name))
    }

    async fn create_playlist(&self, name: &str) -> Result<Playlist> {
        let mut state = self.state.lock().unwrap();
        state.created += 1;
        let playlist = Playlist::new(format!("created-{}", state.created), name, vec![]);
        state.playlists.push(playlist.clone());
        Ok(playlist)
    }

    async fn add_tracks_to_playlist(&self, playlist_id: &str, tracks: &[Track]) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.failing_adds.contains(playlist_id) {
            return Err(eyre!("add rejected for playlist {}", playlist_id));
        }
        let playlist = state
            .playlists
            .iter_mut()
            .find(|p| p.id == playlist_id)
            .ok_or_else(|| eyre!("playlist with id {} not found", playlist_id))?;
        playlist.tracks.extend_from_slice(tracks);
        Ok(())
    }

    async fn delete_tracks_from_playlist(
        &self,
        playlist_id: &str,
        tracks: &[Track],
    ) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let playlist = state
            .playlists
            .iter_mut()
            .find(|p| p.id == playlist_id)
            .ok_or_else(|| eyre!("playlist with id {} not found", playlist_id))?;
        playlist.tracks.retain(|t| !tracks.contains(t));
        Ok(())
    }

    async fn search_track(&self, filters: &TrackFilters) -> Result<Vec<Track>> {
        let mut state = self.state.lock().unwrap();
        state.searches += 1;
        Ok(state
            .catalog
            .iter()
            .filter(|t| t.id == filters.id)
            .take(1)
            .cloned()
            .collect())
    }
}
