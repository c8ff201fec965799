//! In-memory contact service for exercising the session without a network.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;

use crate::model::{Contact, ContactId, PageQuery, PageResponse};
use crate::remote::{ContactPayload, Remote, RemoteError};

#[derive(Debug, Default)]
struct State {
    contacts: Vec<Contact>,
    next_id: u64,
    failures: VecDeque<RemoteError>,
    latency: VecDeque<Duration>,
    calls: Vec<String>,
    payloads: Vec<ContactPayload>,
}

/// Shares its state between clones, like a handle to one service.
#[derive(Debug, Clone, Default)]
pub struct MemoryRemote {
    state: Rc<RefCell<State>>,
}

impl MemoryRemote {
    pub fn with_contacts(contacts: Vec<Contact>) -> Self {
        let next_id = contacts
            .iter()
            .filter_map(|c| c.id.as_str().parse::<u64>().ok())
            .max()
            .unwrap_or(0)
            + 1;
        let remote = Self::default();
        {
            let mut state = remote.state.borrow_mut();
            state.contacts = contacts;
            state.next_id = next_id;
        }
        remote
    }

    /// `count` contacts named "Contact 1".."Contact N" with ids 1..=N.
    pub fn seeded(count: u64) -> Self {
        Self::with_contacts((1..=count).map(contact).collect())
    }

    /// Make the next call fail with `err`.
    pub fn fail_next(&self, err: RemoteError) {
        self.state.borrow_mut().failures.push_back(err);
    }

    /// Delay the next listing by `delay`.
    pub fn delay_next_list(&self, delay: Duration) {
        self.state.borrow_mut().latency.push_back(delay);
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.borrow().calls.clone()
    }

    pub fn payloads(&self) -> Vec<ContactPayload> {
        self.state.borrow().payloads.clone()
    }

    pub fn contacts(&self) -> Vec<Contact> {
        self.state.borrow().contacts.clone()
    }

    fn begin(&self, call: String) -> Result<(), RemoteError> {
        let mut state = self.state.borrow_mut();
        state.calls.push(call);
        match state.failures.pop_front() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

pub fn contact(id: u64) -> Contact {
    Contact {
        id: ContactId::from(id),
        name: format!("Contact {id}"),
        email: format!("contact{id}@example.com"),
        phone: format!("+1 555 000 {id:04}"),
        avatar_url: None,
    }
}

fn not_found(id: &ContactId) -> RemoteError {
    RemoteError::Rejected {
        status: 404,
        message: format!("Contact {id} not found"),
    }
}

impl Remote for MemoryRemote {
    async fn list_contacts(&self, query: &PageQuery) -> Result<PageResponse, RemoteError> {
        self.begin(format!("list q={} page={} size={}", query.query, query.page, query.size))?;
        let delay = self.state.borrow_mut().latency.pop_front();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let state = self.state.borrow();
        let needle = query.query.to_lowercase();
        let matching: Vec<&Contact> = state
            .contacts
            .iter()
            .filter(|c| {
                needle.is_empty()
                    || c.name.to_lowercase().contains(&needle)
                    || c.email.to_lowercase().contains(&needle)
                    || c.phone.contains(&needle)
            })
            .collect();

        let size = query.size.max(1);
        let total_elements = matching.len();
        let total_pages = total_elements.div_ceil(size);
        let content = matching
            .into_iter()
            .skip(query.page * size)
            .take(size)
            .cloned()
            .collect();

        Ok(PageResponse {
            content,
            total_pages,
            total_elements,
        })
    }

    async fn get_contact(&self, id: &ContactId) -> Result<Contact, RemoteError> {
        self.begin(format!("get {id}"))?;
        let state = self.state.borrow();
        state
            .contacts
            .iter()
            .find(|c| &c.id == id)
            .cloned()
            .ok_or_else(|| not_found(id))
    }

    async fn create_contact(&self, payload: &ContactPayload) -> Result<Option<Contact>, RemoteError> {
        self.begin("create".to_string())?;
        let mut state = self.state.borrow_mut();
        state.payloads.push(payload.clone());
        let id = ContactId::from(state.next_id);
        state.next_id += 1;
        let created = Contact {
            id,
            name: payload.name.clone(),
            email: payload.email.clone(),
            phone: payload.phone.clone(),
            avatar_url: None,
        };
        state.contacts.push(created.clone());
        Ok(Some(created))
    }

    async fn update_contact(&self, id: &ContactId, payload: &ContactPayload) -> Result<(), RemoteError> {
        self.begin(format!("update {id}"))?;
        let mut state = self.state.borrow_mut();
        state.payloads.push(payload.clone());
        let existing = state
            .contacts
            .iter_mut()
            .find(|c| &c.id == id)
            .ok_or_else(|| not_found(id))?;
        existing.name = payload.name.clone();
        existing.email = payload.email.clone();
        existing.phone = payload.phone.clone();
        Ok(())
    }

    async fn delete_contact(&self, id: &ContactId) -> Result<(), RemoteError> {
        self.begin(format!("delete {id}"))?;
        let mut state = self.state.borrow_mut();
        let before = state.contacts.len();
        state.contacts.retain(|c| &c.id != id);
        if state.contacts.len() == before {
            return Err(not_found(id));
        }
        Ok(())
    }
}
