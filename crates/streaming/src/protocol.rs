//! Messages exchanged on a node connection.

use routing::{Reply, Request};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Message {
    Call(Request),
    Reply(Reply),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MessageType {
    Call,
    Reply,
}

impl Message {
    pub fn message_type(&self) -> MessageType {
        match self {
            Message::Call(_) => MessageType::Call,
            Message::Reply(_) => MessageType::Reply,
        }
    }

    pub fn label(&self) -> &'static str {
        match self.message_type() {
            MessageType::Call => "call",
            MessageType::Reply => "reply",
        }
    }
}
