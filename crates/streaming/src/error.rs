use corelib::NodeId;
use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, StreamingError>;

#[derive(Debug, Error)]
pub enum StreamingError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("codec error: {0}")]
    Codec(#[from] bincode::Error),

    #[error("frame of {size} bytes exceeds the {max} byte limit")]
    FrameTooLarge { size: usize, max: usize },

    #[error("connection closed before a reply arrived")]
    Closed,

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// The request went out but no reply came back in time.
    #[error("no reply within {0:?}")]
    ReplyTimeout(Duration),

    #[error("no address known for node {0}")]
    UnknownPeer(NodeId),

    #[error("unexpected {0} message")]
    Unexpected(&'static str),
}
