use std::fmt;

/// Which side of a sync a connector call went to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Source,
    Destination,
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Source => f.write_str("source"),
            Endpoint::Destination => f.write_str("destination"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectorOperation {
    GetPlaylists,
    GetPlaylistByName,
    CreatePlaylist,
    AddTracksToPlaylist,
    DeleteTracksFromPlaylist,
    SearchTrack,
}

impl fmt::Display for ConnectorOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = match self {
            ConnectorOperation::GetPlaylists => "get playlists",
            ConnectorOperation::GetPlaylistByName => "get playlist by name",
            ConnectorOperation::CreatePlaylist => "create playlist",
            ConnectorOperation::AddTracksToPlaylist => "add tracks to playlist",
            ConnectorOperation::DeleteTracksFromPlaylist => "delete tracks from playlist",
            ConnectorOperation::SearchTrack => "search track",
        };
        f.write_str(verb)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error(
        "Failed to {operation} on {endpoint}{}",
        describe_context(.playlist.as_deref(), .track.as_deref())
    )]
    Connector {
        operation: ConnectorOperation,
        endpoint: Endpoint,
        playlist: Option<String>,
        track: Option<String>,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },
    #[error("Playlist '{name}' is marked for creation but was not created by this changelog")]
    PlaylistNotCreated { name: String },
    #[error("Sync cancelled")]
    Cancelled,
}

impl SyncError {
    pub(crate) fn connector(
        operation: ConnectorOperation,
        endpoint: Endpoint,
        source: color_eyre::Report,
    ) -> Self {
        SyncError::Connector {
            operation,
            endpoint,
            playlist: None,
            track: None,
            source: source.into(),
        }
    }

    /// Attach the playlist being processed to a connector error.
    pub(crate) fn in_playlist(mut self, name: &str) -> Self {
        if let SyncError::Connector { playlist, .. } = &mut self {
            playlist.get_or_insert_with(|| name.to_string());
        }
        self
    }

    pub(crate) fn for_track(mut self, id: &str) -> Self {
        if let SyncError::Connector { track, .. } = &mut self {
            track.get_or_insert_with(|| id.to_string());
        }
        self
    }

    pub fn operation(&self) -> Option<ConnectorOperation> {
        match self {
            SyncError::Connector { operation, .. } => Some(*operation),
            _ => None,
        }
    }

    pub fn playlist(&self) -> Option<&str> {
        match self {
            SyncError::Connector { playlist, .. } => playlist.as_deref(),
            SyncError::PlaylistNotCreated { name } => Some(name),
            SyncError::Cancelled => None,
        }
    }
}

fn describe_context(playlist: Option<&str>, track: Option<&str>) -> String {
    match (playlist, track) {
        (Some(playlist), Some(track)) => format!(" (playlist '{}', track {})", playlist, track),
        (Some(playlist), None) => format!(" (playlist '{}')", playlist),
        (None, Some(track)) => format!(" (track {})", track),
        (None, None) => String::new(),
    }
}
