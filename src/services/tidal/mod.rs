pub mod connector;

pub use connector::TidalConnector;
