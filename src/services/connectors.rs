use std::fmt;

use color_eyre::eyre::{Result, WrapErr};

use crate::config::Config;
use crate::ports::connector::Connector;
use crate::services::spotify::SpotifyConnector;
use crate::services::tidal::TidalConnector;
use crate::spotify_rs::client::SpotifyClient;
use crate::tidal_rs::client::TidalClient;

/// Streaming services a playlist can be mirrored from or to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ConnectorKind {
    Spotify,
    Tidal,
}

impl fmt::Display for ConnectorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectorKind::Spotify => write!(f, "spotify"),
            ConnectorKind::Tidal => write!(f, "tidal"),
        }
    }
}

/// Builds an authenticated connector for `kind` from the loaded config.
pub async fn connect(kind: ConnectorKind, config: &Config) -> Result<Box<dyn Connector>> {
    log::debug!("Connecting to {}", kind);

    match kind {
        ConnectorKind::Spotify => {
            let settings = config.spotify_config();
            let client = SpotifyClient::new(
                settings.access_token()?.to_string(),
                settings.requests_per_second,
            )?;
            let connector = SpotifyConnector::connect(client)
                .await
                .wrap_err("Failed to connect to Spotify")?;
            Ok(Box::new(connector))
        }
        ConnectorKind::Tidal => {
            let settings = config.tidal_config();
            let client = TidalClient::new(
                settings.access_token()?.to_string(),
                settings.country_code.clone(),
                settings.requests_per_second,
            )?;
            Ok(Box::new(TidalConnector::new(client)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::ValueEnum;

    #[test]
    fn test_kind_parses_from_cli_names() {
        assert_eq!(
            ConnectorKind::from_str("spotify", false).unwrap(),
            ConnectorKind::Spotify
        );
        assert_eq!(
            ConnectorKind::from_str("TIDAL", true).unwrap(),
            ConnectorKind::Tidal
        );
        assert!(ConnectorKind::from_str("deezer", true).is_err());
    }

    #[test]
    fn test_display_matches_cli_name() {
        for kind in ConnectorKind::value_variants() {
            let name = kind.to_possible_value().unwrap();
            assert_eq!(kind.to_string(), name.get_name());
        }
    }

    #[tokio::test]
    async fn test_tidal_connects_without_network() {
        let config: Config = toml::from_str(
            r#"
            [connectors.tidal]
            access_token = "td-token"
            country_code = "SE"
            "#,
        )
        .unwrap();

        assert!(connect(ConnectorKind::Tidal, &config).await.is_ok());
    }

    #[tokio::test]
    async fn test_zero_rate_is_rejected() {
        let config: Config = toml::from_str(
            r#"
            [connectors.tidal]
            access_token = "td-token"
            requests_per_second = 0
            "#,
        )
        .unwrap();

        assert!(connect(ConnectorKind::Tidal, &config).await.is_err());
    }
}
