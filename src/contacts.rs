use std::sync::Arc;

use anyhow::Result;
use log::{debug, error, info, warn};
use rand::Rng;
use serde_json::{Map, Value};

use crate::model::Contact;
use crate::store::{Document, DocumentStore, Subscription, CONTACTS};

/// Avatar badge colors, in assignment order.
pub const PALETTE: [&str; 15] = [
    "#FF7A00", // sunset orange
    "#930FFF", // electric purple
    "#6E52FF", // lavender blue
    "#FC71FF", // fuchsia pink
    "#FFBB2B", // golden yellow
    "#1FD7C1", // mint green
    "#0038FF", // deep blue
    "#FF4646", // light red
    "#00BEE8", // aqua blue
    "#FF5EB3", // soft pink
    "#FF745E", // peach
    "#FFA35E", // warm yellow
    "#FFC701", // bright yellow
    "#C3FF2B", // light green
    "#FFE62B", // bright yellow 2
];

/// First letter of the first word plus first letter of the last word,
/// upper-cased. One word gives one letter; a blank name gives "".
pub fn initials(name: &str) -> String {
    let words: Vec<&str> = name.split_whitespace().collect();
    let (Some(first), Some(last)) = (words.first(), words.last()) else {
        return String::new();
    };
    let mut out: String = first.chars().take(1).flat_map(char::to_uppercase).collect();
    if words.len() > 1 {
        out.extend(last.chars().take(1).flat_map(char::to_uppercase));
    }
    out
}

pub fn badge_color(index: usize) -> &'static str {
    PALETTE[index % PALETTE.len()]
}

/// Upper-cased first character of a name; "" for an empty name.
pub fn first_letter(name: &str) -> String {
    name.chars().take(1).flat_map(char::to_uppercase).collect()
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewContact {
    pub name: String,
    pub email: String,
    pub phone: String,
}

/// Replacement values for a contact. Blank fields keep the stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactUpdate {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub bg_color: String,
    pub initials: String,
}

#[derive(Debug, PartialEq, Eq)]
pub struct ContactGroup<'a> {
    pub letter: String,
    pub contacts: Vec<&'a Contact>,
}

fn decode(doc: &Document) -> Option<Contact> {
    match serde_json::from_value::<Contact>(doc.data.clone()) {
        Ok(mut contact) => {
            contact.id = Some(doc.id.clone());
            Some(contact)
        }
        Err(e) => {
            warn!("skipping contact '{}': {e}", doc.id);
            None
        }
    }
}

/// The address book, mirrored from the `contacts` collection, plus the
/// contact currently opened in the detail panel.
pub struct ContactRepository {
    store: Arc<dyn DocumentStore>,
    contacts: Vec<Contact>,
    subscription: Option<Subscription>,
    selected: Option<String>,
}

impl ContactRepository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            contacts: Vec::new(),
            subscription: None,
            selected: None,
        }
    }

    pub fn subscribe(&mut self) -> Result<()> {
        let sub = self.store.subscribe(CONTACTS)?;
        if let Some(old) = self.subscription.replace(sub) {
            self.store.unsubscribe(old.id());
        }
        Ok(())
    }

    /// Replace the list with the newest pushed snapshot, if any.
    /// Clears the selection when the selected contact is gone.
    pub fn sync(&mut self) -> bool {
        let Some(snapshot) = self.subscription.as_ref().and_then(|s| s.latest()) else {
            return false;
        };
        self.contacts = snapshot.iter().filter_map(decode).collect();
        if self
            .selected
            .as_deref()
            .is_some_and(|id| self.find(id).is_none())
        {
            self.selected = None;
        }
        true
    }

    pub fn close(&mut self) {
        if let Some(sub) = self.subscription.take() {
            self.store.unsubscribe(sub.id());
        }
    }

    pub fn contacts(&self) -> &[Contact] {
        &self.contacts
    }

    pub fn find(&self, id: &str) -> Option<&Contact> {
        self.contacts.iter().find(|c| c.id.as_deref() == Some(id))
    }

    /// Position of the contact with this email in the full list.
    pub fn index_of_email(&self, email: &str) -> Option<usize> {
        self.contacts.iter().position(|c| c.email == email)
    }

    /// Badge color for a contact. Records saved without one fall back to
    /// the palette entry at the contact's position in the list.
    pub fn badge<'a>(&self, contact: &'a Contact) -> &'a str {
        if !contact.bg_color.trim().is_empty() {
            return &contact.bg_color;
        }
        badge_color(self.index_of_email(&contact.email).unwrap_or(0))
    }

    pub fn add_contact(&self, contact: NewContact) -> Option<String> {
        self.add_contact_with(contact, &mut rand::rng())
    }

    /// Persist a new contact with a randomly picked badge color and initials
    /// derived from the name. A blank name is rejected.
    pub fn add_contact_with<R: Rng>(&self, contact: NewContact, rng: &mut R) -> Option<String> {
        if contact.name.trim().is_empty() {
            debug!("ignoring contact without a name");
            return None;
        }
        let record = Contact {
            id: None,
            initials: initials(&contact.name),
            bg_color: PALETTE[rng.random_range(0..PALETTE.len())].to_string(),
            name: contact.name,
            email: contact.email,
            phone: contact.phone,
        };
        let data = match serde_json::to_value(&record) {
            Ok(v) => v,
            Err(e) => {
                error!("error encoding contact '{}': {e}", record.name);
                return None;
            }
        };
        match self.store.insert(CONTACTS, data) {
            Ok(id) => {
                info!("added contact '{id}'");
                Some(id)
            }
            Err(e) => {
                error!("error adding contact: {e:#}");
                None
            }
        }
    }

    /// Overwrite a contact field by field; blank fields are left as stored.
    pub fn update_contact(&self, id: &str, update: ContactUpdate) -> bool {
        if id.is_empty() {
            return false;
        }
        let mut fields = Map::new();
        for (key, value) in [
            ("name", update.name),
            ("email", update.email),
            ("phone", update.phone),
            ("bgColor", update.bg_color),
            ("initials", update.initials),
        ] {
            if !value.trim().is_empty() {
                fields.insert(key.to_string(), Value::String(value));
            }
        }
        if fields.is_empty() {
            debug!("ignoring update of contact '{id}': all fields blank");
            return false;
        }
        match self.store.update(CONTACTS, id, Value::Object(fields)) {
            Ok(()) => {
                info!("updated contact '{id}'");
                true
            }
            Err(e) => {
                error!("error updating contact '{id}': {e:#}");
                false
            }
        }
    }

    /// Remove a contact. Ids that are not in the list are ignored.
    pub fn delete_contact(&mut self, id: &str) -> bool {
        if self.find(id).is_none() {
            return false;
        }
        match self.store.delete(CONTACTS, id) {
            Ok(()) => {
                info!("deleted contact '{id}'");
                if self.selected.as_deref() == Some(id) {
                    self.selected = None;
                }
                true
            }
            Err(e) => {
                error!("error deleting contact '{id}': {e:#}");
                false
            }
        }
    }

    /// Contacts bucketed by upper-cased first letter. Groups appear in order
    /// of first occurrence and keep list order inside.
    pub fn group_by_first_letter(&self) -> Vec<ContactGroup<'_>> {
        let mut groups: Vec<ContactGroup<'_>> = Vec::new();
        for contact in &self.contacts {
            let letter = first_letter(&contact.name);
            match groups.iter_mut().find(|g| g.letter == letter) {
                Some(group) => group.contacts.push(contact),
                None => groups.push(ContactGroup {
                    letter,
                    contacts: vec![contact],
                }),
            }
        }
        groups
    }

    /// Open a contact in the detail panel; selecting the open one closes it.
    pub fn select(&mut self, id: &str) {
        if self.selected.as_deref() == Some(id) {
            self.selected = None;
        } else {
            self.selected = Some(id.to_string());
        }
    }

    pub fn selected(&self) -> Option<&Contact> {
        self.selected.as_deref().and_then(|id| self.find(id))
    }
}

impl Drop for ContactRepository {
    fn drop(&mut self) {
        self.close();
    }
}
