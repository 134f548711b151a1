// Seed data for offline use: the demo contact list, their histories and the
// canned assistant replies.

use std::collections::HashMap;

use crate::chat::contacts::avatar_url_with_background;
use crate::models::{Contact, DeliveryStatus, Message, Sender};

/// Replies the canned reply source picks from
pub const CANNED_REPLIES: [&str; 6] = [
    "Thanks for your message! How can I help you today?",
    "Got it. Let me check that for you.",
    "Great question! Let me look that up.",
    "Sure! I'd be glad to help with that.",
    "I'll forward your request to the right team.",
    "Thanks for reaching out! We'll get back to you shortly.",
];

/// Used when the remote chat endpoint answers without a reply text
pub const FALLBACK_REPLY: &str = "Sorry, I couldn't process your message.";

/// Appended as an assistant message when the send fails
pub const SEND_ERROR_REPLY: &str =
    "Sorry, something went wrong while sending your message. Check your connection and try again.";

struct SeedContact {
    id: u64,
    name: &'static str,
    phone: &'static str,
    background: &'static str,
    last_message_time: &'static str,
    unread: u32,
    online: bool,
}

const SEED_CONTACTS: [SeedContact; 4] = [
    SeedContact {
        id: 1,
        name: "João Silva",
        phone: "+55 11 99999-1234",
        background: "10b981",
        last_message_time: "14:30",
        unread: 2,
        online: true,
    },
    SeedContact {
        id: 2,
        name: "Maria Santos",
        phone: "+55 11 99999-5678",
        background: "3b82f6",
        last_message_time: "13:45",
        unread: 0,
        online: false,
    },
    SeedContact {
        id: 3,
        name: "Pedro Costa",
        phone: "+55 11 99999-9012",
        background: "f59e0b",
        last_message_time: "12:20",
        unread: 1,
        online: true,
    },
    SeedContact {
        id: 4,
        name: "Ana Oliveira",
        phone: "+55 11 99999-3456",
        background: "ef4444",
        last_message_time: "11:15",
        unread: 0,
        online: false,
    },
];

// (contact id, [(text, sender, time, status)])
type SeedHistory = (u64, &'static [(&'static str, Sender, &'static str, DeliveryStatus)]);

const SEED_MESSAGES: [SeedHistory; 4] = [
    (1, &[
        (
            "Hi! I'd like to know more about your products.",
            Sender::Contact,
            "14:25",
            DeliveryStatus::Read,
        ),
        (
            "Hi João! Sure, happy to help. What kind of product are you looking for?",
            Sender::Me,
            "14:26",
            DeliveryStatus::Read,
        ),
        (
            "I'm interested in AI solutions for my business.",
            Sender::Contact,
            "14:30",
            DeliveryStatus::Delivered,
        ),
    ]),
    (2, &[
        ("Hi! I got the quote, thank you so much!", Sender::Contact, "13:40", DeliveryStatus::Read),
        (
            "Glad you liked it, Maria! Any questions, I'm here.",
            Sender::Me,
            "13:42",
            DeliveryStatus::Read,
        ),
        ("Thanks for the support!", Sender::Contact, "13:45", DeliveryStatus::Read),
    ]),
    (3, &[
        ("When do you open?", Sender::Contact, "12:20", DeliveryStatus::Delivered),
    ]),
    (4, &[
        (
            "The product arrived today, it's perfect!",
            Sender::Contact,
            "11:10",
            DeliveryStatus::Read,
        ),
        ("Great news, Ana! So happy you liked it.", Sender::Me, "11:12", DeliveryStatus::Read),
        ("Perfect! Thank you so much", Sender::Contact, "11:15", DeliveryStatus::Read),
    ]),
];

/// The demo contact list, previews taken from the last message of each history
pub fn contacts() -> Vec<Contact> {
    let histories = conversations();
    SEED_CONTACTS
        .iter()
        .map(|seed| {
            let last_message = histories
                .get(&seed.id)
                .and_then(|msgs| msgs.last())
                .map(|m| m.text.clone())
                .unwrap_or_default();
            Contact {
                id: seed.id,
                name: seed.name.to_string(),
                phone: seed.phone.to_string(),
                avatar: avatar_url_with_background(seed.name, seed.background),
                online: seed.online,
                last_message,
                last_message_time: seed.last_message_time.to_string(),
                unread: seed.unread,
            }
        })
        .collect()
}

/// The demo conversations keyed by contact id
pub fn conversations() -> HashMap<u64, Vec<Message>> {
    SEED_MESSAGES
        .iter()
        .map(|(contact_id, msgs)| {
            let messages = msgs
                .iter()
                .enumerate()
                .map(|(i, (text, sender, time, status))| Message {
                    id: i as u64 + 1,
                    text: text.to_string(),
                    sender: *sender,
                    timestamp: time.to_string(),
                    status: *status,
                })
                .collect();
            (*contact_id, messages)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_seed_contact_has_a_history() {
        let histories = conversations();
        for contact in contacts() {
            assert!(histories.contains_key(&contact.id), "no history for {}", contact.name);
            assert!(!contact.last_message.is_empty());
        }
    }

    #[test]
    fn test_seed_previews_match_last_message() {
        let maria = contacts().into_iter().find(|c| c.id == 2).unwrap();
        assert_eq!(maria.last_message, "Thanks for the support!");
        assert_eq!(maria.last_message_time, "13:45");
    }
}
