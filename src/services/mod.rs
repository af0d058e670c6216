pub mod connectors;
pub mod spotify;
pub mod sync;
pub mod tidal;
