pub mod auth;
pub mod filter;
pub mod relay;

pub use auth::ManagerAuthorizer;
pub use filter::{PlatformBatch, PlatformMessageFilter, SenderEchoFilter};
pub use relay::RelayService;
