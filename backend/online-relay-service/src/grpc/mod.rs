pub mod server;

pub use server::{correlation_interceptor, CorrelationId, OnlineRelayServer};
