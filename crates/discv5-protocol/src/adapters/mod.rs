//! # Adapters
//!
//! Implementations of the outbound ports for running a real node.
//!
//! ## Adapters Provided
//!
//! - `SystemTimeSource` - Wall-clock time source
//! - `StaticConfigProvider` - In-code configuration
//! - `ChannelLivenessChecker` - Forwards liveness checks to the service
//! - `NoOpTransport` / `RecordingTransport` - Transports for tests
//! - `UdpTransport` - tokio UDP socket (requires "network" feature)
//! - `TomlConfigProvider` - Config file loading (requires "network" feature)

/// Configuration providers
pub mod config;
/// Liveness checking
pub mod liveness;
/// Time source adapters
pub mod time;
/// Transport adapters
pub mod transport;

pub use config::StaticConfigProvider;
pub use liveness::ChannelLivenessChecker;
pub use time::SystemTimeSource;
pub use transport::{NoOpTransport, RecordingTransport};

#[cfg(feature = "network")]
pub use config::{ConfigError, TomlConfigProvider};

#[cfg(feature = "network")]
pub use transport::UdpTransport;

#[cfg(test)]
mod tests;
