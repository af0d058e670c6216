use crate::ports::connector::{Playlist, Track};
use crate::services::sync::changelog::PlaylistRef;

/// Observer for planner and applier progress. Every method defaults to doing nothing, so the sync
/// core stays silent unless the caller passes a reporter.
pub trait SyncReporter: Send + Sync {
    /// A source playlist was paired with a destination playlist of the same name.
    fn playlist_matched(&self, _source: &Playlist, _destination: &Playlist) {}

    /// A source playlist has no destination counterpart and will be created.
    fn playlist_missing(&self, _source: &Playlist) {}

    /// Another source playlist already has this name. Both map to the same destination playlist.
    fn duplicate_playlist_name(&self, _source: &Playlist) {}

    /// A source track could not be resolved in the destination catalog.
    fn track_missing(&self, _playlist: &Playlist, _track: &Track) {}

    fn playlist_created(&self, _requested: &PlaylistRef, _created: &Playlist) {}

    fn tracks_added(&self, _playlist: &PlaylistRef, _count: usize) {}

    fn tracks_removed(&self, _playlist: &PlaylistRef, _count: usize) {}
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopReporter;

impl SyncReporter for NoopReporter {}

/// Forwards sync events to `tracing` at info level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl SyncReporter for TracingReporter {
    fn playlist_matched(&self, source: &Playlist, destination: &Playlist) {
        tracing::info!(
            source_id = %source.id,
            destination_id = %destination.id,
            name = %source.name,
            "Matched playlist"
        );
    }

    fn playlist_missing(&self, source: &Playlist) {
        tracing::info!(
            source_id = %source.id,
            name = %source.name,
            "Playlist not found in destination, will create"
        );
    }

    fn duplicate_playlist_name(&self, source: &Playlist) {
        tracing::warn!(
            source_id = %source.id,
            name = %source.name,
            "Several source playlists share this name and will write to one destination playlist"
        );
    }

    fn track_missing(&self, playlist: &Playlist, track: &Track) {
        tracing::info!(
            playlist = %playlist.name,
            isrc = %track.id,
            title = %track.title,
            artist = %track.artist,
            "Track not found in destination, skipping"
        );
    }

    fn playlist_created(&self, requested: &PlaylistRef, created: &Playlist) {
        tracing::info!(
            name = %requested.name,
            id = %created.id,
            "Created playlist"
        );
    }

    fn tracks_added(&self, playlist: &PlaylistRef, count: usize) {
        tracing::info!(playlist = %playlist.name, count, "Added tracks");
    }

    fn tracks_removed(&self, playlist: &PlaylistRef, count: usize) {
        tracing::info!(playlist = %playlist.name, count, "Removed tracks");
    }
}
