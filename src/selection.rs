use std::collections::HashSet;

use crate::error::Error;
use crate::model::{Contact, ContactId};

/// Identifiers of the selected rows on the visible page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionSet {
    selected: HashSet<ContactId>,
}

impl SelectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    pub fn contains(&self, id: &ContactId) -> bool {
        self.selected.contains(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ContactId> {
        self.selected.iter()
    }

    /// Add `id` if absent, remove it if present. Returns whether it is
    /// selected afterwards.
    pub fn toggle(&mut self, id: &ContactId) -> bool {
        if self.selected.remove(id) {
            false
        } else {
            self.selected.insert(id.clone());
            true
        }
    }

    /// Clear when the whole visible page is selected, otherwise select
    /// exactly the visible page.
    pub fn toggle_all(&mut self, visible: &[Contact]) {
        if self.is_all_selected(visible) {
            self.selected.clear();
        } else {
            self.selected = visible.iter().map(|c| c.id.clone()).collect();
        }
    }

    pub fn is_all_selected(&self, visible: &[Contact]) -> bool {
        !visible.is_empty() && self.selected.len() == visible.len()
    }

    pub fn clear(&mut self) {
        self.selected.clear();
    }

    /// Drop identifiers that are not on the visible page.
    pub fn retain_visible(&mut self, visible: &[Contact]) {
        self.selected
            .retain(|id| visible.iter().any(|contact| &contact.id == id));
    }

    /// The single selected identifier. Edit and delete need exactly one.
    pub fn single(&self) -> Result<ContactId, Error> {
        let mut iter = self.selected.iter();
        match (iter.next(), iter.next()) {
            (Some(id), None) => Ok(id.clone()),
            _ => Err(Error::Precondition {
                required: 1,
                actual: self.selected.len(),
            }),
        }
    }

    pub fn allows_single_action(&self) -> bool {
        self.selected.len() == 1
    }
}
