// Client-side chat state: contacts, conversations, the selected contact and the
// single outstanding send. Dispatcher tasks report back through `ChatEvent`s
// which are applied here in arrival order.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::Result;
use log::{debug, info, warn};
use thiserror::Error;

pub mod contacts;
pub mod conversation;
pub mod dispatcher;

pub use contacts::ContactStore;
pub use conversation::ConversationStore;
pub use dispatcher::{CannedReplies, DispatchTiming, MessageDispatcher, RemoteReplies, ReplySource};

use crate::fixtures;
use crate::models::{Contact, DeliveryStatus, Message, Sender};

/// Longest contact preview shown in the sidebar before it is cut with "..."
pub const PREVIEW_LEN: usize = 50;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SendError {
    #[error("message is empty")]
    EmptyMessage,
    #[error("no contact selected")]
    NoContactSelected,
    #[error("a message is already being sent")]
    SendInFlight,
    #[error("unknown contact {0}")]
    UnknownContact(u64),
}

/// Progress reported by a dispatcher task
#[derive(Debug, Clone, PartialEq)]
pub enum ChatEvent {
    StatusChanged {
        contact_id: u64,
        message_id: u64,
        status: DeliveryStatus,
    },
    Received {
        contact_id: u64,
        message: Message,
    },
    /// The round trip for this contact is over, successful or not
    Finished { contact_id: u64 },
}

/// A locally authored message handed to the dispatcher
#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingMessage {
    pub contact_id: u64,
    pub message_id: u64,
    pub text: String,
    pub user_id: String,
}

/// Millisecond-clock id source. Never hands out the same id twice in a process.
#[derive(Clone, Default)]
pub struct IdGenerator {
    last: Arc<AtomicU64>,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&self) -> u64 {
        let now = chrono::Utc::now().timestamp_millis().max(0) as u64;
        let mut last = self.last.load(Ordering::Relaxed);
        loop {
            let candidate = now.max(last + 1);
            match self
                .last
                .compare_exchange(last, candidate, Ordering::SeqCst, Ordering::Relaxed)
            {
                Ok(_) => return candidate,
                Err(actual) => last = actual,
            }
        }
    }
}

/// Local wall-clock time as "HH:MM"
pub fn clock_time() -> String {
    chrono::Local::now().format("%H:%M").to_string()
}

/// Sidebar preview of a message text
pub fn preview(text: &str) -> String {
    if text.chars().count() > PREVIEW_LEN {
        let cut: String = text.chars().take(PREVIEW_LEN).collect();
        format!("{}...", cut)
    } else {
        text.to_string()
    }
}

pub struct ChatSession {
    contacts: ContactStore,
    conversations: ConversationStore,
    selected: Option<u64>,
    search_term: String,
    in_flight: Option<u64>, // Contact id of the outstanding send
    user_id: Option<String>,
    ids: IdGenerator,
}

impl ChatSession {
    pub fn new(contacts: ContactStore, conversations: ConversationStore) -> Self {
        ChatSession {
            contacts,
            conversations,
            selected: None,
            search_term: String::new(),
            in_flight: None,
            user_id: None,
            ids: IdGenerator::new(),
        }
    }

    /// Session seeded with the demo contacts and their histories
    pub fn with_fixtures() -> Self {
        Self::new(
            ContactStore::new(fixtures::contacts()),
            ConversationStore::new(fixtures::conversations()),
        )
    }

    /// Id source shared with the dispatcher so reply ids never collide with local ones
    pub fn ids(&self) -> IdGenerator {
        self.ids.clone()
    }

    pub fn set_user_id(&mut self, user_id: Option<String>) {
        self.user_id = user_id;
    }

    pub fn contacts(&self) -> &ContactStore {
        &self.contacts
    }

    pub fn search_term(&self) -> &str {
        &self.search_term
    }

    pub fn set_search_term(&mut self, term: &str) {
        self.search_term = term.to_string();
    }

    /// Contacts matching the current search term
    pub fn visible_contacts(&self) -> Vec<&Contact> {
        self.contacts.filter(&self.search_term)
    }

    pub fn selected_contact(&self) -> Option<&Contact> {
        self.selected.and_then(|id| self.contacts.get(id))
    }

    pub fn select_contact(&mut self, contact_id: u64) -> Result<(), SendError> {
        if self.contacts.get(contact_id).is_none() {
            return Err(SendError::UnknownContact(contact_id));
        }

        self.selected = Some(contact_id);
        self.contacts.mark_read(contact_id);
        let read = self.conversations.mark_incoming_read(contact_id);
        debug!("Selected contact {}, marked {} messages read", contact_id, read);
        Ok(())
    }

    pub fn messages_for(&self, contact_id: u64) -> &[Message] {
        self.conversations.messages_for(contact_id)
    }

    /// Messages of the selected contact, empty when nothing is selected
    pub fn current_messages(&self) -> &[Message] {
        match self.selected {
            Some(id) => self.conversations.messages_for(id),
            None => &[],
        }
    }

    pub fn add_contact(&mut self, name: &str, phone: &str) -> Result<u64> {
        let id = self.ids.next_id();
        self.contacts.add_contact(id, name, phone)?;
        Ok(id)
    }

    /// Whether a send is waiting for its reply. The input stays disabled meanwhile.
    pub fn is_sending(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn sending_to(&self) -> Option<u64> {
        self.in_flight
    }

    /// Append a local message to the selected conversation and return it for dispatch
    pub fn send_message(&mut self, text: &str) -> Result<OutgoingMessage, SendError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(SendError::EmptyMessage);
        }
        let contact_id = self.selected.ok_or(SendError::NoContactSelected)?;
        if self.in_flight.is_some() {
            return Err(SendError::SendInFlight);
        }

        let message = Message {
            id: self.ids.next_id(),
            text: text.to_string(),
            sender: Sender::Me,
            timestamp: clock_time(),
            status: DeliveryStatus::Sending,
        };
        let outgoing = OutgoingMessage {
            contact_id,
            message_id: message.id,
            text: message.text.clone(),
            user_id: self.user_id.clone().unwrap_or_else(|| "default".to_string()),
        };

        self.contacts
            .update_preview(contact_id, &preview(&message.text), &message.timestamp);
        self.conversations.append(contact_id, message);
        self.in_flight = Some(contact_id);

        info!("Queued message {} for contact {}", outgoing.message_id, contact_id);
        Ok(outgoing)
    }

    pub fn apply(&mut self, event: ChatEvent) {
        match event {
            ChatEvent::StatusChanged { contact_id, message_id, status } => {
                // Regressions are refused and logged by the store
                let _ = self.conversations.update_status(contact_id, message_id, status);
            }
            ChatEvent::Received { contact_id, mut message } => {
                if self.contacts.get(contact_id).is_none() {
                    warn!("Dropping message {} for unknown contact {}", message.id, contact_id);
                    return;
                }

                let is_open = self.selected == Some(contact_id);
                if is_open && message.status == DeliveryStatus::Delivered {
                    message.status = DeliveryStatus::Read;
                }

                self.contacts
                    .update_preview(contact_id, &preview(&message.text), &message.timestamp);
                if !is_open {
                    self.contacts.increment_unread(contact_id);
                }
                self.conversations.append(contact_id, message);
            }
            ChatEvent::Finished { contact_id } => {
                if self.in_flight == Some(contact_id) {
                    self.in_flight = None;
                }
            }
        }
    }
}
