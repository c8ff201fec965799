//! The list view's state: query, page, loaded contacts and selection.
//!
//! A `DirectorySession` is the only owner of this state. Fetch results and
//! mutation outcomes replace collections wholesale; nothing outside the
//! session patches them.

use crate::error::Error;
use crate::model::{Contact, ContactId, PageQuery, PageResponse};
use crate::pagination::Pagination;
use crate::remote::RemoteError;
use crate::search::normalize_query;
use crate::selection::SelectionSet;

/// Monotonically increasing id of an issued fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestToken(u64);

impl RequestToken {
    pub fn value(self) -> u64 {
        self.0
    }
}

/// A fetch the session has asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    pub token: RequestToken,
    pub query: PageQuery,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The page was replaced. `clamped` is set when the current page no
    /// longer existed and was moved to the last page, which needs another
    /// fetch.
    Applied { clamped: bool },
    /// A newer fetch was issued after this one; the result was ignored.
    Stale,
    /// The fetch failed; the previous page is still shown.
    Failed(String),
}

/// A status line for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Info(String),
    Error(String),
}

#[derive(Debug)]
pub struct DirectorySession {
    query: String,
    pagination: Pagination,
    contacts: Vec<Contact>,
    selection: SelectionSet,
    pending_delete: Option<ContactId>,
    next_token: u64,
    latest: Option<FetchTicket>,
    loaded: bool,
    notice: Option<Notice>,
}

impl DirectorySession {
    pub fn new(page_size: usize) -> Self {
        Self {
            query: String::new(),
            pagination: Pagination::new(page_size),
            contacts: Vec::new(),
            selection: SelectionSet::new(),
            pending_delete: None,
            next_token: 1,
            latest: None,
            loaded: false,
            notice: None,
        }
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn pagination(&self) -> &Pagination {
        &self.pagination
    }

    pub fn contacts(&self) -> &[Contact] {
        &self.contacts
    }

    pub fn selection(&self) -> &SelectionSet {
        &self.selection
    }

    pub fn pending_delete(&self) -> Option<&ContactId> {
        self.pending_delete.as_ref()
    }

    /// Whether at least one fetch has been applied.
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn take_notice(&mut self) -> Option<Notice> {
        self.notice.take()
    }

    pub fn set_notice(&mut self, notice: Notice) {
        self.notice = Some(notice);
    }

    /// The request the current state calls for.
    pub fn current_query(&self) -> PageQuery {
        PageQuery {
            query: self.query.clone(),
            page: self.pagination.wire_page(),
            size: self.pagination.page_size(),
        }
    }

    // ------------------------------------------------------------------
    // Query, page and size transitions
    // ------------------------------------------------------------------

    /// Apply a settled search query. A different query goes back to the
    /// first page and clears the selection. Returns whether it changed.
    pub fn set_query(&mut self, settled: &str) -> bool {
        let query = normalize_query(settled);
        if query == self.query {
            return false;
        }
        self.query = query;
        self.pagination.reset();
        self.clear_selection();
        true
    }

    /// Open the list at a given query and page, before anything is loaded.
    /// A page past the end is clamped once the first fetch reports totals.
    pub fn start_at(&mut self, query: &str, page: usize) {
        self.query = normalize_query(query);
        self.pagination.seek(page);
        self.clear_selection();
    }

    /// Reset the query to empty and go to the first page.
    pub fn clear_search(&mut self) -> bool {
        let query_changed = !self.query.is_empty();
        self.query.clear();
        let page_changed = self.pagination.reset();
        if query_changed || page_changed {
            self.clear_selection();
        }
        query_changed || page_changed
    }

    pub fn go_to_page(&mut self, page: usize) -> bool {
        let changed = self.pagination.go_to_page(page);
        self.left_page(changed)
    }

    pub fn next_page(&mut self) -> bool {
        let changed = self.pagination.next_page();
        self.left_page(changed)
    }

    pub fn prev_page(&mut self) -> bool {
        let changed = self.pagination.prev_page();
        self.left_page(changed)
    }

    pub fn set_page_size(&mut self, size: usize) -> bool {
        let changed = self.pagination.set_page_size(size);
        self.left_page(changed)
    }

    fn left_page(&mut self, changed: bool) -> bool {
        if changed {
            self.clear_selection();
        }
        changed
    }

    /// Drop the selection together with any delete it was about to confirm.
    fn clear_selection(&mut self) {
        self.selection.clear();
        self.pending_delete = None;
    }

    /// A pending delete only stands while its contact is the single selection.
    fn release_stale_delete(&mut self) {
        let still_single = match (&self.pending_delete, self.selection.single()) {
            (Some(pending), Ok(selected)) => *pending == selected,
            _ => false,
        };
        if !still_single {
            self.pending_delete = None;
        }
    }

    // ------------------------------------------------------------------
    // Selection
    // ------------------------------------------------------------------

    /// Toggle a contact on the loaded page. Identifiers that are not on the
    /// page are ignored. Returns whether the contact is selected afterwards.
    pub fn toggle(&mut self, id: &ContactId) -> bool {
        if !self.contacts.iter().any(|c| &c.id == id) {
            tracing::debug!(%id, "ignoring toggle for contact not on the loaded page");
            return false;
        }
        let selected = self.selection.toggle(id);
        self.release_stale_delete();
        selected
    }

    /// Toggle the contact shown at 1-based `row`.
    pub fn toggle_row(&mut self, row: usize) -> Option<bool> {
        let id = self.contacts.get(row.checked_sub(1)?)?.id.clone();
        let selected = self.selection.toggle(&id);
        self.release_stale_delete();
        Some(selected)
    }

    pub fn toggle_all(&mut self) {
        self.selection.toggle_all(&self.contacts);
        self.release_stale_delete();
    }

    pub fn is_all_selected(&self) -> bool {
        self.selection.is_all_selected(&self.contacts)
    }

    pub fn can_edit(&self) -> bool {
        self.selection.allows_single_action()
    }

    pub fn can_delete(&self) -> bool {
        self.selection.allows_single_action()
    }

    /// The contact an edit action would open.
    pub fn edit_target(&self) -> Result<ContactId, Error> {
        self.selection.single()
    }

    // ------------------------------------------------------------------
    // Fetching
    // ------------------------------------------------------------------

    /// Issue a fetch for the current state, superseding any fetch still in
    /// flight.
    pub fn begin_fetch(&mut self) -> FetchTicket {
        let ticket = FetchTicket {
            token: RequestToken(self.next_token),
            query: self.current_query(),
        };
        self.next_token += 1;
        self.latest = Some(ticket.clone());
        tracing::debug!(
            token = ticket.token.value(),
            q = %ticket.query.query,
            page = ticket.query.page,
            size = ticket.query.size,
            "issuing fetch"
        );
        ticket
    }

    /// Issue a fetch only if the (query, page, size) tuple differs from the
    /// last one issued.
    pub fn fetch_if_changed(&mut self) -> Option<FetchTicket> {
        let current = self.current_query();
        match &self.latest {
            Some(latest) if latest.query == current => None,
            _ => Some(self.begin_fetch()),
        }
    }

    /// Apply a fetch result if it answers the most recently issued fetch.
    pub fn apply_fetch(
        &mut self,
        ticket: &FetchTicket,
        result: Result<PageResponse, RemoteError>,
    ) -> FetchOutcome {
        let is_latest = self
            .latest
            .as_ref()
            .is_some_and(|latest| latest.token == ticket.token);
        if !is_latest {
            tracing::debug!(token = ticket.token.value(), "discarding stale fetch result");
            return FetchOutcome::Stale;
        }

        match result {
            Ok(page) => {
                let mut content = page.content;
                if content.len() > ticket.query.size {
                    tracing::warn!(
                        received = content.len(),
                        size = ticket.query.size,
                        "service returned more contacts than requested; truncating"
                    );
                    content.truncate(ticket.query.size);
                }
                self.contacts = content;
                self.loaded = true;
                let clamped = self
                    .pagination
                    .apply_totals(page.total_pages, page.total_elements);
                if clamped {
                    self.clear_selection();
                } else {
                    self.selection.retain_visible(&self.contacts);
                    self.release_stale_delete();
                }
                tracing::debug!(
                    token = ticket.token.value(),
                    rows = self.contacts.len(),
                    total_pages = page.total_pages,
                    total_elements = page.total_elements,
                    "applied fetch"
                );
                FetchOutcome::Applied { clamped }
            }
            Err(err) => {
                let message = Error::from(err).to_string();
                tracing::warn!(token = ticket.token.value(), error = %message, "fetch failed");
                self.notice = Some(Notice::Error(message.clone()));
                FetchOutcome::Failed(message)
            }
        }
    }

    // ------------------------------------------------------------------
    // Mutation bookkeeping
    // ------------------------------------------------------------------

    /// Mark the single selected contact for deletion, pending confirmation.
    pub fn request_delete(&mut self) -> Result<ContactId, Error> {
        let id = self.selection.single()?;
        self.pending_delete = Some(id.clone());
        Ok(id)
    }

    pub fn cancel_delete(&mut self) {
        self.pending_delete = None;
    }

    pub fn take_pending_delete(&mut self) -> Option<ContactId> {
        self.pending_delete.take()
    }

    /// The service confirmed a deletion: drop the row locally.
    pub fn apply_deleted(&mut self, id: &ContactId) {
        self.contacts = self
            .contacts
            .iter()
            .filter(|c| &c.id != id)
            .cloned()
            .collect();
        self.pagination.record_removal();
        self.clear_selection();
        self.notice = Some(Notice::Info("Contact deleted".to_string()));
    }

    pub fn delete_failed(&mut self, message: impl Into<String>) {
        self.pending_delete = None;
        self.notice = Some(Notice::Error(message.into()));
    }

    /// Return to the list after a create or update: first page, nothing
    /// selected, fresh fetch.
    pub fn after_save(&mut self) -> FetchTicket {
        self.pagination.reset();
        self.clear_selection();
        self.begin_fetch()
    }

    // ------------------------------------------------------------------
    // Presentation helpers
    // ------------------------------------------------------------------

    /// Message for an empty result, once something has been loaded.
    pub fn empty_state(&self) -> Option<String> {
        if !self.loaded || !self.contacts.is_empty() {
            return None;
        }
        if self.query.is_empty() {
            Some("No contacts yet".to_string())
        } else {
            Some(format!("No contacts found for \"{}\"", self.query))
        }
    }

    /// Offer "Clear search" only when a search came back empty.
    pub fn show_clear_search(&self) -> bool {
        self.loaded && self.contacts.is_empty() && !self.query.is_empty()
    }

    pub fn summary(&self) -> String {
        format!(
            "{} contacts | {} selected",
            self.pagination.total_elements(),
            self.selection.len()
        )
    }
}
