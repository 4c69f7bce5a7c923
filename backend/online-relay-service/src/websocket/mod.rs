/// Gateway connection layer
///
/// The transport accept path creates connections and registers them here;
/// the relay service reads the registry and writes push envelopes through
/// each connection.
///
/// Architecture:
/// 1. ConnectionRegistry: live connections per user
/// 2. PushConnection: write side of one connection (bytes or kick frame)
/// 3. envelope: wire codec for pushed frames
pub mod connection;
pub mod envelope;
pub mod registry;

pub use connection::{
    ConnectionHandle, ConnectionId, OutboundFrame, PushConnection, SharedConnection,
};
pub use registry::{ConnectionRegistry, ConnectionStore};
