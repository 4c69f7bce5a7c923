pub mod config;
pub mod error;
pub mod grpc;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod services;
pub mod websocket;

// Re-export generated protobuf code
pub mod nova {
    pub mod online_relay {
        pub mod v1 {
            tonic::include_proto!("nova.online_relay.v1");
        }
    }
}

pub use error::{RelayError, Result};
pub use services::RelayService;
pub use websocket::ConnectionRegistry;
