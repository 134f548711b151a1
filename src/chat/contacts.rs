// Contact store: the sidebar's contact list, search and preview bookkeeping

use anyhow::{anyhow, Result};
use log::{debug, info};
use reqwest::Url;

use crate::models::Contact;

const AVATAR_BASE: &str = "https://ui-avatars.com/api/";
const DEFAULT_AVATAR_BACKGROUND: &str = "10b981";

/// Avatar URL for a contact name. The same name always maps to the same URL.
pub fn avatar_url(name: &str) -> String {
    avatar_url_with_background(name, DEFAULT_AVATAR_BACKGROUND)
}

pub fn avatar_url_with_background(name: &str, background: &str) -> String {
    let Ok(url) = Url::parse_with_params(
        AVATAR_BASE,
        &[("name", name), ("background", background), ("color", "fff")],
    ) else {
        return AVATAR_BASE.to_string();
    };

    match url.query() {
        Some(query) => format!("{}?{}", AVATAR_BASE, uri_component_escapes(query)),
        None => url.to_string(),
    }
}

// Form encoding differs from URI component encoding only in the space and these marks.
// A literal '+' or '%' is always escaped, so the swaps cannot collide with real text.
fn uri_component_escapes(query: &str) -> String {
    [
        ("+", "%20"),
        ("%21", "!"),
        ("%27", "'"),
        ("%28", "("),
        ("%29", ")"),
        ("%7E", "~"),
    ]
    .into_iter()
    .fold(query.to_string(), |q, (from, to)| q.replace(from, to))
}

pub struct ContactStore {
    contacts: Vec<Contact>,
}

impl ContactStore {
    pub fn new(contacts: Vec<Contact>) -> Self {
        ContactStore { contacts }
    }

    pub fn all(&self) -> &[Contact] {
        &self.contacts
    }

    pub fn len(&self) -> usize {
        self.contacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contacts.is_empty()
    }

    pub fn get(&self, id: u64) -> Option<&Contact> {
        self.contacts.iter().find(|c| c.id == id)
    }

    fn get_mut(&mut self, id: u64) -> Option<&mut Contact> {
        self.contacts.iter_mut().find(|c| c.id == id)
    }

    /// Contacts whose name or phone contains `term`, ignoring case.
    ///
    /// Linear scan, list order is kept. The term is matched as typed, surrounding
    /// whitespace included. Only an empty term matches everything.
    pub fn filter(&self, term: &str) -> Vec<&Contact> {
        if term.is_empty() {
            return self.contacts.iter().collect();
        }
        let needle = term.to_lowercase();

        self.contacts
            .iter()
            .filter(|c| {
                c.name.to_lowercase().contains(&needle) || c.phone.to_lowercase().contains(&needle)
            })
            .collect()
    }

    /// Add a new contact at the top of the list
    pub fn add_contact(&mut self, id: u64, name: &str, phone: &str) -> Result<&Contact> {
        let name = name.trim();
        if name.is_empty() {
            return Err(anyhow!("Contact name cannot be empty"));
        }
        if self.get(id).is_some() {
            return Err(anyhow!("Contact id {} already in use", id));
        }

        let contact = Contact {
            id,
            name: name.to_string(),
            phone: phone.trim().to_string(),
            avatar: avatar_url(name),
            online: false,
            last_message: String::new(),
            last_message_time: String::new(),
            unread: 0,
        };

        info!("Adding contact {} ({})", contact.name, id);
        self.contacts.insert(0, contact);
        Ok(&self.contacts[0])
    }

    pub fn update_preview(&mut self, id: u64, text: &str, time: &str) {
        if let Some(contact) = self.get_mut(id) {
            contact.last_message = text.to_string();
            contact.last_message_time = time.to_string();
        } else {
            debug!("Preview update for unknown contact {}", id);
        }
    }

    pub fn increment_unread(&mut self, id: u64) {
        if let Some(contact) = self.get_mut(id) {
            contact.unread += 1;
        }
    }

    pub fn mark_read(&mut self, id: u64) {
        if let Some(contact) = self.get_mut(id) {
            contact.unread = 0;
        }
    }
}
