pub mod connector;

pub use connector::SpotifyConnector;
