use thiserror::Error;

use crate::media::{SenderId, TrackId};

/// Crate-wide error type
#[derive(Error, Debug)]
pub enum CompatError {
    #[error("track {track} already has a sender in this session")]
    AlreadyAttached { track: TrackId },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("sender {sender} is not owned by this session")]
    NotOwned { sender: SenderId },

    #[error("message of {size} bytes exceeds the negotiated maximum of {limit} bytes")]
    MessageTooLarge { size: usize, limit: u64 },

    #[error("native engine error: {0}")]
    Native(String),
}

/// Result type alias for the compatibility layer
pub type Result<T> = std::result::Result<T, CompatError>;
