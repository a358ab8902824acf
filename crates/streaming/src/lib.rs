//! TCP transport between ring nodes.
//!
//! This crate provides the wire side of a node:
//! - Length-prefixed bincode frames
//! - A one-call-per-connection client and the [`routing::Transport`] built on it
//! - The server loop that feeds inbound calls to a [`routing::ChordNode`]
//! - Peer address resolution

pub mod codec;
pub mod endpoint;
pub mod error;
pub mod protocol;
pub mod receiver;
pub mod sender;

pub use endpoint::PeerDirectory;
pub use error::StreamingError;
pub use protocol::{Message, MessageType};
pub use receiver::StreamReceiver;
pub use sender::{StreamSender, TcpTransport};
