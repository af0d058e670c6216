use std::collections::HashMap;

use tokio_util::sync::CancellationToken;

use crate::ports::connector::Connector;
use crate::services::sync::SyncContext;
use crate::services::sync::changelog::{Changelog, PlaylistRef, PlaylistTarget};
use crate::services::sync::error::{ConnectorOperation, Endpoint, SyncError};
use crate::services::sync::reporter::SyncReporter;

/// Counts of what an apply run changed on the destination.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplySummary {
    pub playlists_created: usize,
    pub tracks_added: usize,
    pub tracks_removed: usize,
}

/// Replays a [`Changelog`] against a destination connector.
///
/// Creates playlists first, then adds and removes tracks playlist by playlist. The first failing
/// call aborts the run and earlier mutations stay in place; re-plan before applying again.
pub struct ChangelogApplier<'a> {
    destination: &'a dyn Connector,
    context: SyncContext<'a>,
}

impl<'a> ChangelogApplier<'a> {
    pub fn new(destination: &'a dyn Connector) -> Self {
        Self {
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

    pub async fn apply(&self, changelog: &Changelog) -> Result<ApplySummary, SyncError> {
        let mut summary = ApplySummary::default();
        let mut created: HashMap<&str, PlaylistRef> = HashMap::new();

        for requested in &changelog.playlists.added {
            self.context.ensure_active()?;
            let playlist = self
                .destination
                .create_playlist(&requested.name)
                .await
                .map_err(|e| {
                    SyncError::connector(
                        ConnectorOperation::CreatePlaylist,
                        Endpoint::Destination,
                        e,
                    )
                    .in_playlist(&requested.name)
                })?;

            self.context.reporter.playlist_created(requested, &playlist);
            created.insert(requested.name.as_str(), PlaylistRef::from(&playlist));
            summary.playlists_created += 1;
        }

        for (source_ref, tracks) in &changelog.tracks_by_playlist {
            if !tracks.has_changes() {
                continue;
            }

            let target = match (created.get(source_ref.name.as_str()), &tracks.target) {
                (Some(created_ref), _) => created_ref.clone(),
                (None, PlaylistTarget::Existing { id }) => {
                    PlaylistRef::new(id.clone(), source_ref.name.clone())
                }
                (None, PlaylistTarget::ToBeCreated) => {
                    return Err(SyncError::PlaylistNotCreated {
                        name: source_ref.name.clone(),
                    });
                }
            };

            if !tracks.added.is_empty() {
                self.context.ensure_active()?;
                self.destination
                    .add_tracks_to_playlist(&target.id, &tracks.added)
                    .await
                    .map_err(|e| {
                        SyncError::connector(
                            ConnectorOperation::AddTracksToPlaylist,
                            Endpoint::Destination,
                            e,
                        )
                        .in_playlist(&target.name)
                    })?;
                self.context
                    .reporter
                    .tracks_added(&target, tracks.added.len());
                summary.tracks_added += tracks.added.len();
            }

            if !tracks.removed.is_empty() {
                self.context.ensure_active()?;
                self.destination
                    .delete_tracks_from_playlist(&target.id, &tracks.removed)
                    .await
                    .map_err(|e| {
                        SyncError::connector(
                            ConnectorOperation::DeleteTracksFromPlaylist,
                            Endpoint::Destination,
                            e,
                        )
                        .in_playlist(&target.name)
                    })?;
                self.context
                    .reporter
                    .tracks_removed(&target, tracks.removed.len());
                summary.tracks_removed += tracks.removed.len();
            }
        }

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use color_eyre::eyre::eyre;
    use mockall::Sequence;

    use super::*;
    use crate::ports::connector::{MockConnector, Playlist};
    use crate::services::sync::changelog::TrackChangelog;
    use crate::services::sync::plan::SyncPlanner;
    use crate::services::sync::reporter::testing::{RecordingReporter, SyncEvent};
    use crate::test_utils::{InMemoryConnector, tracks};

    fn new_playlist_changelog() -> Changelog {
        let mut entry = TrackChangelog::new(PlaylistTarget::ToBeCreated);
        entry.added = tracks(&["t1", "t2"]);
        entry.missing = tracks(&["t4"]);

        let mut changelog = Changelog::default();
        changelog
            .playlists
            .added
            .push(PlaylistRef::new("src-2", "Playlist 2"));
        changelog
            .tracks_by_playlist
            .insert(PlaylistRef::new("src-2", "Playlist 2"), entry);
        changelog
    }

    #[tokio::test]
    async fn test_creates_playlist_before_adding_tracks() {
        let mut seq = Sequence::new();
        let mut destination = MockConnector::new();
        destination
            .expect_create_playlist()
            .withf(|name| name == "Playlist 2")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|name| Ok(Playlist::new("dst-99", name, vec![])));
        destination
            .expect_add_tracks_to_playlist()
            .withf(|id, tracks| id == "dst-99" && tracks.len() == 2)
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(()));
        destination.expect_delete_tracks_from_playlist().never();

        let summary = ChangelogApplier::new(&destination)
            .apply(&new_playlist_changelog())
            .await
            .unwrap();

        assert_eq!(
            summary,
            ApplySummary {
                playlists_created: 1,
                tracks_added: 2,
                tracks_removed: 0,
            }
        );
    }

    #[tokio::test]
    async fn test_existing_playlist_uses_destination_id() {
        let mut entry = TrackChangelog::new(PlaylistTarget::Existing {
            id: "dst-5".into(),
        });
        entry.added = tracks(&["t1"]);
        entry.removed = tracks(&["t10"]);
        let mut changelog = Changelog::default();
        changelog
            .tracks_by_playlist
            .insert(PlaylistRef::new("src-5", "Focus"), entry);

        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut destination = MockConnector::new();
        let add_calls = calls.clone();
        destination
            .expect_add_tracks_to_playlist()
            .returning(move |id, _| {
                add_calls.lock().unwrap().push(format!("add:{}", id));
                Ok(())
            });
        let delete_calls = calls.clone();
        destination
            .expect_delete_tracks_from_playlist()
            .returning(move |id, _| {
                delete_calls.lock().unwrap().push(format!("delete:{}", id));
                Ok(())
            });

        ChangelogApplier::new(&destination)
            .apply(&changelog)
            .await
            .unwrap();

        assert_eq!(*calls.lock().unwrap(), vec!["add:dst-5", "delete:dst-5"]);
    }

    #[tokio::test]
    async fn test_missing_only_entries_make_no_calls() {
        let mut entry = TrackChangelog::new(PlaylistTarget::Existing { id: "d".into() });
        entry.missing = tracks(&["t4"]);
        let mut changelog = Changelog::default();
        changelog
            .tracks_by_playlist
            .insert(PlaylistRef::new("s", "Mix"), entry);

        let destination = MockConnector::new();
        let summary = ChangelogApplier::new(&destination)
            .apply(&changelog)
            .await
            .unwrap();

        assert_eq!(summary, ApplySummary::default());
    }

    #[tokio::test]
    async fn test_uncreated_target_is_rejected() {
        let mut changelog = new_playlist_changelog();
        changelog.playlists.added.clear();

        let destination = MockConnector::new();
        let err = ChangelogApplier::new(&destination)
            .apply(&changelog)
            .await
            .unwrap_err();

        assert!(matches!(err, SyncError::PlaylistNotCreated { name } if name == "Playlist 2"));
    }

    #[tokio::test]
    async fn test_failure_keeps_earlier_mutations() {
        let destination = InMemoryConnector::with_playlists(vec![Playlist::new(
            "d1",
            "Broken",
            vec![],
        )])
        .and_catalog(tracks(&["t1"]))
        .failing_adds_to("d1");

        let mut broken = TrackChangelog::new(PlaylistTarget::Existing { id: "d1".into() });
        broken.added = tracks(&["t1"]);
        let mut changelog = new_playlist_changelog();
        changelog
            .tracks_by_playlist
            .insert(PlaylistRef::new("src-1", "Broken"), broken);

        let err = ChangelogApplier::new(&destination)
            .apply(&changelog)
            .await
            .unwrap_err();

        assert_eq!(err.operation(), Some(ConnectorOperation::AddTracksToPlaylist));
        assert_eq!(err.playlist(), Some("Broken"));
        // The playlist created before the failure is not rolled back.
        assert!(destination.playlist_named("Playlist 2").is_some());
    }

    #[tokio::test]
    async fn test_cancelled_apply_makes_no_calls() {
        let destination = MockConnector::new();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = ChangelogApplier::new(&destination)
            .with_cancellation(cancel)
            .apply(&new_playlist_changelog())
            .await
            .unwrap_err();

        assert!(matches!(err, SyncError::Cancelled));
    }

    #[tokio::test]
    async fn test_cancel_after_create_skips_track_changes() {
        let cancel = CancellationToken::new();
        let mut destination = MockConnector::new();
        destination.expect_create_playlist().times(1).returning({
            let cancel = cancel.clone();
            move |name| {
                cancel.cancel();
                Ok(Playlist::new("dst-99", name, vec![]))
            }
        });
        destination.expect_add_tracks_to_playlist().never();
        destination.expect_delete_tracks_from_playlist().never();

        let err = ChangelogApplier::new(&destination)
            .with_cancellation(cancel)
            .apply(&new_playlist_changelog())
            .await
            .unwrap_err();

        assert!(matches!(err, SyncError::Cancelled));
    }

    #[tokio::test]
    async fn test_plan_then_apply_mirrors_source() {
        let source = InMemoryConnector::with_playlists(vec![
            Playlist::new("pl1", "Playlist 1", tracks(&["t1", "t2", "t3", "t4"])),
            Playlist::new("pl2", "Playlist 2", tracks(&["t1", "t2", "t3"])),
        ]);
        let destination = InMemoryConnector::with_playlists(vec![Playlist::new(
            "pl1",
            "Playlist 1",
            tracks(&["t10"]),
        )])
        .and_catalog(tracks(&["t1", "t2", "t3"]));
        let reporter = RecordingReporter::default();

        let changelog = SyncPlanner::new(&source, &destination).plan().await.unwrap();
        let summary = ChangelogApplier::new(&destination)
            .with_reporter(&reporter)
            .apply(&changelog)
            .await
            .unwrap();

        assert_eq!(summary.playlists_created, 1);
        assert_eq!(summary.tracks_added, 6);
        assert_eq!(summary.tracks_removed, 1);

        let pl1 = destination.playlist_named("Playlist 1").unwrap();
        let mut pl1_ids: Vec<_> = pl1.tracks.iter().map(|t| t.id.clone()).collect();
        pl1_ids.sort();
        assert_eq!(pl1_ids, vec!["t1", "t2", "t3"]);

        let pl2 = destination.playlist_named("Playlist 2").unwrap();
        assert_ne!(pl2.id, "pl2");
        assert_eq!(pl2.tracks.len(), 3);

        let events = reporter.events();
        assert_eq!(
            events[0],
            SyncEvent::PlaylistCreated {
                name: "Playlist 2".into(),
                id: pl2.id.clone()
            }
        );
        assert!(events.contains(&SyncEvent::TracksRemoved {
            playlist: "Playlist 1".into(),
            count: 1
        }));
    }

    #[tokio::test]
    async fn test_creation_failure_stops_before_track_changes() {
        let mut destination = MockConnector::new();
        destination
            .expect_create_playlist()
            .returning(|_| Err(eyre!("quota exceeded")));
        destination.expect_add_tracks_to_playlist().never();

        let err = ChangelogApplier::new(&destination)
            .apply(&new_playlist_changelog())
            .await
            .unwrap_err();

        assert_eq!(err.operation(), Some(ConnectorOperation::CreatePlaylist));
        assert_eq!(err.playlist(), Some("Playlist 2"));
    }
}
