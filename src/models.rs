use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// A chat peer shown in the sidebar
#[derive(Debug, Clone, PartialEq)]
pub struct Contact {
    pub id: u64,
    pub name: String,
    pub phone: String,
    pub avatar: String,
    pub online: bool,
    pub last_message: String,
    pub last_message_time: String,
    pub unread: u32,
}

/// Who authored a message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sender {
    Me,      // Local user
    Contact, // Remote contact
    Ai,      // Simulated assistant
}

impl Sender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sender::Me => "me",
            Sender::Contact => "contact",
            Sender::Ai => "ai",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub id: u64,
    pub text: String,
    pub sender: Sender,
    pub timestamp: String,
    pub status: DeliveryStatus,
}

impl Message {
    pub fn is_outgoing(&self) -> bool {
        self.sender == Sender::Me
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum DeliveryStatus {
    Sending = 1,   // Handed to the dispatcher
    Sent = 2,      // Accepted by the (simulated) network
    Delivered = 3, // Reached the other side
    Read = 4,      // Seen by the reader
    Error = 5,     // Failed, terminal
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("cannot move message status from {from:?} to {to:?}")]
pub struct StatusError {
    pub from: DeliveryStatus,
    pub to: DeliveryStatus,
}

impl DeliveryStatus {
    /// Whether `next` is a legal successor of this status.
    ///
    /// Statuses only move forward along sending -> sent -> delivered -> read.
    /// `Error` can be reached from `Sending` or `Sent` and nothing leaves it.
    pub fn can_advance_to(self, next: DeliveryStatus) -> bool {
        match (self, next) {
            (DeliveryStatus::Error, _) => false,
            (DeliveryStatus::Sending | DeliveryStatus::Sent, DeliveryStatus::Error) => true,
            (_, DeliveryStatus::Error) => false,
            (current, next) => (next as u8) > (current as u8),
        }
    }

    pub fn advance(&mut self, next: DeliveryStatus) -> Result<(), StatusError> {
        if !self.can_advance_to(next) {
            return Err(StatusError { from: *self, to: next });
        }
        *self = next;
        Ok(())
    }
}

/// Authenticated user as returned by the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
}

// Backends disagree on whether user ids are numbers or strings
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!("invalid user id: {}", other))),
    }
}
