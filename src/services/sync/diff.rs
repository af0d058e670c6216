use std::collections::HashSet;

use crate::ports::connector::{Connector, Playlist, TrackFilters};
use crate::services::sync::SyncContext;
use crate::services::sync::changelog::{DestinationPlaylist, TrackChangelog};
use crate::services::sync::error::{ConnectorOperation, Endpoint, SyncError};

/// Computes the track delta that turns `destination` into a mirror of `source`.
///
/// Source tracks already present in the destination (by id) are left alone. The rest are looked
/// up through `connector.search_track`: the first hit goes to `added` as the destination returned
/// it, no hit goes to `missing`. Destination tracks the source no longer has go to `removed`.
pub async fn diff_playlist(
    source: &Playlist,
    destination: &DestinationPlaylist,
    connector: &dyn Connector,
    context: &SyncContext<'_>,
) -> Result<TrackChangelog, SyncError> {
    let mut changelog = TrackChangelog::new(destination.target());

    let destination_ids: HashSet<&str> = destination
        .tracks()
        .iter()
        .map(|track| track.id.as_str())
        .collect();

    let mut seen: HashSet<&str> = HashSet::with_capacity(source.tracks.len());
    for track in &source.tracks {
        if !seen.insert(track.id.as_str()) || destination_ids.contains(track.id.as_str()) {
            continue;
        }

        context.ensure_active()?;
        let mut results = connector
            .search_track(&TrackFilters::by_id(track.id.as_str()))
            .await
            .map_err(|e| {
                SyncError::connector(ConnectorOperation::SearchTrack, Endpoint::Destination, e)
                    .for_track(&track.id)
            })?;

        if results.is_empty() {
            context.reporter.track_missing(source, track);
            changelog.missing.push(track.clone());
        } else {
            changelog.added.push(results.swap_remove(0));
        }
    }

    for track in destination.tracks() {
        if !seen.contains(track.id.as_str()) {
            changelog.removed.push(track.clone());
        }
    }

    tracing::debug!(
        playlist = %destination.name(),
        added = changelog.added.len(),
        removed = changelog.removed.len(),
        missing = changelog.missing.len(),
        "Diffed playlist"
    );
    Ok(changelog)
}
