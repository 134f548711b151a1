// Conversation store: per-contact ordered message history

use std::collections::HashMap;

use anyhow::{anyhow, Result};
use log::{debug, warn};

use crate::models::{DeliveryStatus, Message};

#[derive(Default)]
pub struct ConversationStore {
    conversations: HashMap<u64, Vec<Message>>,
}

impl ConversationStore {
    pub fn new(conversations: HashMap<u64, Vec<Message>>) -> Self {
        ConversationStore { conversations }
    }

    pub fn append(&mut self, contact_id: u64, message: Message) {
        debug!("Appending message {} to conversation {}", message.id, contact_id);
        self.conversations.entry(contact_id).or_default().push(message);
    }

    /// Messages for a contact, oldest first. Unknown contacts have an empty history.
    pub fn messages_for(&self, contact_id: u64) -> &[Message] {
        self.conversations
            .get(&contact_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn last_message(&self, contact_id: u64) -> Option<&Message> {
        self.messages_for(contact_id).last()
    }

    /// Move a message's status forward. Regressions are refused and leave the message as is.
    pub fn update_status(
        &mut self,
        contact_id: u64,
        message_id: u64,
        status: DeliveryStatus,
    ) -> Result<()> {
        let message = self
            .conversations
            .get_mut(&contact_id)
            .and_then(|msgs| msgs.iter_mut().find(|m| m.id == message_id))
            .ok_or_else(|| anyhow!("No message {} in conversation {}", message_id, contact_id))?;

        match message.status.advance(status) {
            Ok(()) => {
                debug!("Message {} in conversation {} is now {:?}", message_id, contact_id, status);
                Ok(())
            }
            Err(e) => {
                warn!("Ignoring status update for message {}: {}", message_id, e);
                Err(e.into())
            }
        }
    }

    /// Mark every incoming delivered message of a conversation as read, returning how many changed
    pub fn mark_incoming_read(&mut self, contact_id: u64) -> usize {
        let Some(messages) = self.conversations.get_mut(&contact_id) else {
            return 0;
        };

        let mut changed = 0;
        for message in messages.iter_mut() {
            if !message.is_outgoing() && message.status == DeliveryStatus::Delivered {
                message.status = DeliveryStatus::Read;
                changed += 1;
            }
        }
        changed
    }
}
