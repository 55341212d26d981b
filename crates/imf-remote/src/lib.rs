//! IMF Remote - HTTP persistence for IMF diagrams.

pub mod config;
pub mod http;

pub use config::{ConfigError, RemoteConfig};
pub use http::HttpRemote;
