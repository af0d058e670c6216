use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ports::connector::{Playlist, Track};

/// Identity of a playlist inside a changelog. Ordered by name first so changelogs render and
/// serialize in a stable order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlaylistRef {
    pub name: String,
    pub id: String,
}

impl PlaylistRef {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

impl From<&Playlist> for PlaylistRef {
    fn from(playlist: &Playlist) -> Self {
        Self::new(playlist.id.clone(), playlist.name.clone())
    }
}

/// Where track changes for one playlist get written on the destination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PlaylistTarget {
    /// Matched by name at plan time; `id` is the destination's own playlist id.
    Existing { id: String },
    /// Listed in [`PlaylistChangelog::added`]; the id is only known after creation.
    ToBeCreated,
}

/// The destination side of a playlist pairing during planning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DestinationPlaylist {
    Existing(Playlist),
    ToBeCreated { name: String },
}

impl DestinationPlaylist {
    pub fn name(&self) -> &str {
        match self {
            DestinationPlaylist::Existing(playlist) => &playlist.name,
            DestinationPlaylist::ToBeCreated { name } => name,
        }
    }

    pub fn tracks(&self) -> &[Track] {
        match self {
            DestinationPlaylist::Existing(playlist) => &playlist.tracks,
            DestinationPlaylist::ToBeCreated { .. } => &[],
        }
    }

    pub fn target(&self) -> PlaylistTarget {
        match self {
            DestinationPlaylist::Existing(playlist) => PlaylistTarget::Existing {
                id: playlist.id.clone(),
            },
            DestinationPlaylist::ToBeCreated { .. } => PlaylistTarget::ToBeCreated,
        }
    }
}

/// Track delta for one playlist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackChangelog {
    pub target: PlaylistTarget,
    #[serde(default)]
    pub added: Vec<Track>,
    #[serde(default)]
    pub removed: Vec<Track>,
    /// Source tracks the destination catalog could not resolve. Never created, never an error.
    #[serde(default)]
    pub missing: Vec<Track>,
}

impl TrackChangelog {
    pub fn new(target: PlaylistTarget) -> Self {
        Self {
            target,
            added: Vec::new(),
            removed: Vec::new(),
            missing: Vec::new(),
        }
    }

    /// True when applying this entry would mutate the destination.
    pub fn has_changes(&self) -> bool {
        !self.added.is_empty() || !self.removed.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        !self.has_changes() && self.missing.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistChangelog {
    #[serde(default)]
    pub added: Vec<PlaylistRef>,
}

/// Everything that must change on the destination, keyed by source playlist identity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Changelog {
    pub playlists: PlaylistChangelog,
    #[serde(with = "tracks_by_playlist")]
    pub tracks_by_playlist: BTreeMap<PlaylistRef, TrackChangelog>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChangelogStats {
    pub playlists_to_create: usize,
    pub tracks_to_add: usize,
    pub tracks_to_remove: usize,
    pub tracks_missing: usize,
}

impl Changelog {
    pub fn has_changes(&self) -> bool {
        !self.playlists.added.is_empty() || self.tracks_by_playlist.values().any(|t| t.has_changes())
    }

    pub fn stats(&self) -> ChangelogStats {
        self.tracks_by_playlist.values().fold(
            ChangelogStats {
                playlists_to_create: self.playlists.added.len(),
                ..ChangelogStats::default()
            },
            |mut stats, tracks| {
                stats.tracks_to_add += tracks.added.len();
                stats.tracks_to_remove += tracks.removed.len();
                stats.tracks_missing += tracks.missing.len();
                stats
            },
        )
    }
}

/// JSON object keys must be strings, so the map is written as a list of entries.
mod tracks_by_playlist {
    use std::collections::BTreeMap;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use super::{PlaylistRef, TrackChangelog};

    #[derive(Serialize)]
    struct EntryRef<'a> {
        playlist: &'a PlaylistRef,
        tracks: &'a TrackChangelog,
    }

    #[derive(Deserialize)]
    struct Entry {
        playlist: PlaylistRef,
        tracks: TrackChangelog,
    }

    pub fn serialize<S: Serializer>(
        map: &BTreeMap<PlaylistRef, TrackChangelog>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(
            map.iter()
                .map(|(playlist, tracks)| EntryRef { playlist, tracks }),
        )
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<BTreeMap<PlaylistRef, TrackChangelog>, D::Error> {
        let entries = Vec::<Entry>::deserialize(deserializer)?;
        Ok(entries
            .into_iter()
            .map(|entry| (entry.playlist, entry.tracks))
            .collect())
    }
}
