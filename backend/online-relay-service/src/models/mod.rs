/// Domain types shared by the registry, the relay service and the gRPC layer
pub mod outcome;
pub mod platform;

pub use outcome::{DeliveryOutcome, OnlinePlatformStatus, PlatformOutcome, UserPushResult};
pub use platform::Platform;
