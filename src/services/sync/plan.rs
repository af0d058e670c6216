use std::collections::{BTreeMap, HashSet};

use tokio_util::sync::CancellationToken;

use crate::ports::connector::Connector;
use crate::services::sync::SyncContext;
use crate::services::sync::changelog::{
    Changelog, DestinationPlaylist, PlaylistChangelog, PlaylistRef,
};
use crate::services::sync::diff::diff_playlist;
use crate::services::sync::error::{ConnectorOperation, Endpoint, SyncError};
use crate::services::sync::reporter::SyncReporter;

/// Diffs every source playlist against the destination playlist of the same name.
///
/// Planning only reads from both connectors and is all-or-nothing: the first failing call
/// discards the changelog built so far.
pub struct SyncPlanner<'a> {
    source: &'a dyn Connector,
    destination: &'a dyn Connector,
    context: SyncContext<'a>,
}

impl<'a> SyncPlanner<'a> {
    pub fn new(source: &'a dyn Connector, destination: &'a dyn Connector) -> Self {
        Self {
            source,
            destination,
            context: SyncContext::new(),
        }
    }

    pub fn with_reporter(mut self, reporter: &'a dyn SyncReporter) -> Self {
        self.context = self.context.with_reporter(reporter);
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.context = self.context.with_cancellation(cancel);
        self
    }

    pub async fn plan(&self) -> Result<Changelog, SyncError> {
        self.context.ensure_active()?;
        let playlists = self.source.get_playlists().await.map_err(|e| {
            SyncError::connector(ConnectorOperation::GetPlaylists, Endpoint::Source, e)
        })?;

        tracing::debug!("Planning sync for {} source playlists", playlists.len());

        let mut added = Vec::new();
        let mut tracks_by_playlist = BTreeMap::new();
        let mut names = HashSet::new();

        for source in &playlists {
            let first_with_name = names.insert(source.name.as_str());
            if !first_with_name {
                self.context.reporter.duplicate_playlist_name(source);
            }

            self.context.ensure_active()?;
            let found = self
                .destination
                .get_playlist_by_name(&source.name)
                .await
                .map_err(|e| {
                    SyncError::connector(
                        ConnectorOperation::GetPlaylistByName,
                        Endpoint::Destination,
                        e,
                    )
                    .in_playlist(&source.name)
                })?;

            let destination = match found {
                Some(playlist) => {
                    self.context.reporter.playlist_matched(source, &playlist);
                    DestinationPlaylist::Existing(playlist)
                }
                None => {
                    self.context.reporter.playlist_missing(source);
                    // Creation is keyed by name on apply.
                    if first_with_name {
                        added.push(PlaylistRef::from(source));
                    }
                    DestinationPlaylist::ToBeCreated {
                        name: source.name.clone(),
                    }
                }
            };

            let tracks = diff_playlist(source, &destination, self.destination, &self.context)
                .await
                .map_err(|e| e.in_playlist(&source.name))?;

            tracks_by_playlist.insert(PlaylistRef::from(source), tracks);
        }

        Ok(Changelog {
            playlists: PlaylistChangelog { added },
            tracks_by_playlist,
        })
    }
}
