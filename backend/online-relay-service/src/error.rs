use thiserror::Error;
use tonic::{Code, Status};

pub type Result<T> = std::result::Result<T, RelayError>;

/// Error code reported in `GetUsersOnlineStatusResp` for non-manager callers
pub const ERR_ACCESS_CODE: i32 = 801;
pub const ERR_ACCESS_MSG: &str = "no permission";

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("no permission")]
    AccessDenied,

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("encode error: {0}")]
    Encode(#[from] prost::EncodeError),

    #[error("decode error: {0}")]
    Decode(#[from] prost::DecodeError),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl RelayError {
    /// Convert to gRPC Status for wire protocol
    pub fn to_status(&self) -> Status {
        match self {
            RelayError::AccessDenied => Status::new(Code::PermissionDenied, ERR_ACCESS_MSG),
            RelayError::InvalidArgument(msg) => Status::new(Code::InvalidArgument, msg.clone()),
            RelayError::Decode(e) => {
                Status::new(Code::InvalidArgument, format!("malformed payload: {}", e))
            }
            RelayError::Encode(_)
            | RelayError::Transport(_)
            | RelayError::Internal(_) => Status::new(Code::Internal, self.to_string()),
        }
    }
}

impl From<RelayError> for Status {
    fn from(err: RelayError) -> Self {
        err.to_status()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_access_denied_maps_to_permission_denied() {
        let status = RelayError::AccessDenied.to_status();
        assert_eq!(status.code(), Code::PermissionDenied);
        assert_eq!(status.message(), "no permission");
    }

    #[test]
    fn test_invalid_argument_keeps_message() {
        let status = RelayError::InvalidArgument("push_to_user_id is empty".into()).to_status();
        assert_eq!(status.code(), Code::InvalidArgument);
        assert_eq!(status.message(), "push_to_user_id is empty");
    }

    #[test]
    fn test_transport_is_internal() {
        let status: Status = RelayError::Transport("broken pipe".into()).into();
        assert_eq!(status.code(), Code::Internal);
    }
}
