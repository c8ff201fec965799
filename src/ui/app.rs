use std::io::Write;
use std::path::Path;

use anyhow::Result;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::config::Config;
use crate::error::Error;
use crate::form::{AvatarFile, AvatarRules, Draft};
use crate::model::{ContactId, PageResponse};
use crate::mutation::MutationCoordinator;
use crate::preview::PreviewStore;
use crate::remote::{Remote, RemoteError};
use crate::search::{wait_until, QueryDebouncer};
use crate::session::{DirectorySession, FetchOutcome, FetchTicket, Notice};

use super::draw;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum View {
    List,
    Add,
    Edit(ContactId),
}

/// One line of browse input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Search(String),
    NextPage,
    PrevPage,
    GoToPage(usize),
    PageSize(usize),
    ToggleRow(usize),
    ToggleAll,
    Add,
    Edit,
    RequestDelete,
    ConfirmDelete,
    CancelDelete,
    ClearSearch,
    Refresh,
    SetField(String, String),
    Save,
    Back,
    Help,
    Quit,
    Invalid(String),
}

impl Command {
    pub fn parse(line: &str) -> Self {
        let trimmed = line.trim();
        let Some(rest) = trimmed.strip_prefix(':') else {
            if let Some((field, value)) = trimmed.split_once('=') {
                let field = field.trim();
                if matches!(field, "name" | "email" | "phone" | "avatar") {
                    return Command::SetField(field.to_string(), value.trim().to_string());
                }
            }
            return Command::Search(line.to_string());
        };

        let mut parts = rest.split_whitespace();
        let name = parts.next().unwrap_or_default();
        let arg = parts.next();
        let number = || arg.and_then(|value| value.parse::<usize>().ok());

        match (name, arg) {
            ("n", None) => Command::NextPage,
            ("p", None) => Command::PrevPage,
            ("g", Some(_)) => number().map_or_else(|| Command::Invalid(trimmed.into()), Command::GoToPage),
            ("size", Some(_)) => number().map_or_else(|| Command::Invalid(trimmed.into()), Command::PageSize),
            ("x", Some(_)) => number().map_or_else(|| Command::Invalid(trimmed.into()), Command::ToggleRow),
            ("a", None) => Command::ToggleAll,
            ("add", None) => Command::Add,
            ("e", None) => Command::Edit,
            ("d", None) => Command::RequestDelete,
            ("y", None) => Command::ConfirmDelete,
            ("no", None) => Command::CancelDelete,
            ("clear", None) => Command::ClearSearch,
            ("r", None) => Command::Refresh,
            ("save", None) => Command::Save,
            ("back", None) => Command::Back,
            ("h", None) | ("help", None) => Command::Help,
            ("q", None) => Command::Quit,
            _ => Command::Invalid(trimmed.into()),
        }
    }
}

struct FetchReply {
    ticket: FetchTicket,
    result: Result<PageResponse, RemoteError>,
}

/// Drives a [`DirectorySession`] from user input.
///
/// Fetches run as local tasks, so the app must live inside a
/// `tokio::task::LocalSet`. Replies come back over a channel and go through
/// the session's token check before they touch any state.
pub struct DirectoryApp<R> {
    remote: R,
    rules: AvatarRules,
    page_sizes: Vec<usize>,
    session: DirectorySession,
    view: View,
    draft: Option<Draft>,
    debouncer: QueryDebouncer,
    previews: Option<PreviewStore>,
    replies_tx: mpsc::UnboundedSender<FetchReply>,
    replies_rx: mpsc::UnboundedReceiver<FetchReply>,
    in_flight: usize,
    show_help: bool,
}

impl<R> DirectoryApp<R>
where
    R: Remote + Clone + 'static,
{
    pub fn new(remote: R, config: &Config) -> Self {
        let (replies_tx, replies_rx) = mpsc::unbounded_channel();
        Self {
            remote,
            rules: config.avatar.clone(),
            page_sizes: config.list.page_sizes.clone(),
            session: DirectorySession::new(config.list.page_size),
            view: View::List,
            draft: None,
            debouncer: QueryDebouncer::new(config.list.debounce),
            previews: None,
            replies_tx,
            replies_rx,
            in_flight: 0,
            show_help: false,
        }
    }

    /// Stage attached avatars here so the form can point at a local copy.
    pub fn with_previews(mut self, store: PreviewStore) -> Self {
        self.previews = Some(store);
        self
    }

    pub fn session(&self) -> &DirectorySession {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut DirectorySession {
        &mut self.session
    }

    pub fn view(&self) -> &View {
        &self.view
    }

    pub fn draft(&self) -> Option<&Draft> {
        self.draft.as_ref()
    }

    pub fn draft_mut(&mut self) -> Option<&mut Draft> {
        self.draft.as_mut()
    }

    // ------------------------------------------------------------------
    // Fetching
    // ------------------------------------------------------------------

    /// Fetch if the current (query, page, size) has not been requested yet.
    pub fn sync(&mut self) {
        if let Some(ticket) = self.session.fetch_if_changed() {
            self.spawn_fetch(ticket);
        }
    }

    /// Fetch the current page again.
    pub fn refresh(&mut self) {
        let ticket = self.session.begin_fetch();
        self.spawn_fetch(ticket);
    }

    fn spawn_fetch(&mut self, ticket: FetchTicket) {
        let remote = self.remote.clone();
        let replies = self.replies_tx.clone();
        self.in_flight += 1;
        tokio::task::spawn_local(async move {
            let result = remote.list_contacts(&ticket.query).await;
            let _ = replies.send(FetchReply { ticket, result });
        });
    }

    fn handle_reply(&mut self, reply: FetchReply) -> FetchOutcome {
        self.in_flight = self.in_flight.saturating_sub(1);
        let outcome = self.session.apply_fetch(&reply.ticket, reply.result);
        if matches!(outcome, FetchOutcome::Applied { clamped: true }) {
            self.sync();
        }
        outcome
    }

    /// Wait for the next fetch reply and apply it. Returns `None` when no
    /// fetch is outstanding.
    pub async fn wait_for_fetch(&mut self) -> Option<FetchOutcome> {
        if self.in_flight == 0 {
            return None;
        }
        let reply = self.replies_rx.recv().await?;
        Some(self.handle_reply(reply))
    }

    /// Wait until every outstanding fetch has been answered.
    pub async fn settle(&mut self) {
        while self.wait_for_fetch().await.is_some() {}
    }

    // ------------------------------------------------------------------
    // Search
    // ------------------------------------------------------------------

    /// Raw search input; it only takes effect once it settles.
    pub fn on_search_input(&mut self, raw: &str) {
        self.debouncer.push(raw, Instant::now());
    }

    /// Apply any search input whose quiet window has passed.
    pub fn poll_search(&mut self) -> bool {
        match self.debouncer.poll(Instant::now()) {
            Some(settled) => self.settle_query(&settled),
            None => false,
        }
    }

    pub fn settle_query(&mut self, settled: &str) -> bool {
        let changed = self.session.set_query(settled);
        if changed {
            self.sync();
        }
        changed
    }

    pub fn clear_search(&mut self) {
        self.debouncer.cancel();
        if self.session.clear_search() {
            self.sync();
        }
    }

    // ------------------------------------------------------------------
    // Forms
    // ------------------------------------------------------------------

    pub fn open_add(&mut self) {
        self.draft = Some(Draft::new());
        self.view = View::Add;
    }

    /// Open the edit form for the single selected contact.
    pub async fn open_edit(&mut self) -> Result<(), Error> {
        let result = self.load_selected().await;
        if let Err(err) = &result {
            self.session.set_notice(Notice::Error(err.to_string()));
        }
        result
    }

    async fn load_selected(&mut self) -> Result<(), Error> {
        let id = self.session.edit_target()?;
        let coordinator = MutationCoordinator::new(&self.remote, &self.rules);
        let draft = coordinator.load_draft(&id).await?;
        self.draft = Some(draft);
        self.view = View::Edit(id);
        Ok(())
    }

    /// Leave the form without saving.
    pub fn back_to_list(&mut self) {
        self.draft = None;
        self.view = View::List;
    }

    pub fn attach_avatar(&mut self, path: &Path) -> Result<(), Error> {
        let Some(draft) = self.draft.as_mut() else {
            return Ok(());
        };
        let file = AvatarFile::from_path(path)
            .map_err(|err| Error::Transport(format!("cannot read {}: {err}", path.display())))?;
        draft.attach_avatar(file, &self.rules)?;
        if let Some(store) = &self.previews {
            if let Err(err) = draft.stage_preview(store) {
                tracing::warn!(error = %err, "failed to stage avatar preview");
            }
        }
        Ok(())
    }

    /// Submit the open form. On success the form closes and the list is
    /// fetched again from the first page.
    pub async fn submit(&mut self) -> Result<(), Error> {
        let Some(draft) = self.draft.as_mut() else {
            return Ok(());
        };
        let coordinator = MutationCoordinator::new(&self.remote, &self.rules);
        match coordinator.submit(draft).await {
            Ok(saved) => {
                self.draft = None;
                self.view = View::List;
                self.session.set_notice(Notice::Info(saved.notice().to_string()));
                let ticket = self.session.after_save();
                self.spawn_fetch(ticket);
                Ok(())
            }
            Err(Error::Validation(errors)) => {
                self.session.set_notice(Notice::Error(format!(
                    "Contact not saved: {} field(s) need attention",
                    errors.len()
                )));
                Err(Error::Validation(errors))
            }
            Err(err) => {
                self.session.set_notice(Notice::Error(err.to_string()));
                Err(err)
            }
        }
    }

    // ------------------------------------------------------------------
    // Delete
    // ------------------------------------------------------------------

    pub fn request_delete(&mut self) -> Result<ContactId, Error> {
        self.session.request_delete()
    }

    pub fn cancel_delete(&mut self) {
        self.session.cancel_delete();
    }

    pub async fn confirm_delete(&mut self) -> Result<ContactId, Error> {
        let coordinator = MutationCoordinator::new(&self.remote, &self.rules);
        coordinator.delete(&mut self.session).await
    }

    // ------------------------------------------------------------------
    // Browse loop
    // ------------------------------------------------------------------

    pub async fn run<I, W>(&mut self, input: I, out: &mut W) -> Result<()>
    where
        I: AsyncBufRead + Unpin,
        W: Write,
    {
        self.sync();
        self.event_loop(input, out).await
    }

    async fn event_loop<I, W>(&mut self, input: I, out: &mut W) -> Result<()>
    where
        I: AsyncBufRead + Unpin,
        W: Write,
    {
        let mut lines = input.lines();
        let mut input_open = true;
        loop {
            if !input_open && self.in_flight == 0 && !self.debouncer.is_pending() {
                break;
            }
            let deadline = self.debouncer.deadline();
            tokio::select! {
                line = lines.next_line(), if input_open => match line? {
                    Some(line) => {
                        if self.handle_line(&line).await {
                            break;
                        }
                        self.render(out)?;
                    }
                    None => input_open = false,
                },
                Some(reply) = self.replies_rx.recv(), if self.in_flight > 0 => {
                    if self.handle_reply(reply) != FetchOutcome::Stale && self.view == View::List {
                        self.render(out)?;
                    }
                }
                _ = wait_until(deadline) => {
                    if self.poll_search() {
                        self.render(out)?;
                    }
                }
            }
        }
        out.flush()?;
        Ok(())
    }

    /// Apply one line of input. Returns `true` to quit.
    async fn handle_line(&mut self, line: &str) -> bool {
        let command = Command::parse(line);
        if self.view == View::List {
            self.handle_list_command(command).await
        } else {
            self.handle_form_command(command).await
        }
    }

    async fn handle_list_command(&mut self, command: Command) -> bool {
        match command {
            Command::Quit => return true,
            Command::Search(text) => self.on_search_input(&text),
            Command::NextPage => {
                if self.session.next_page() {
                    self.sync();
                }
            }
            Command::PrevPage => {
                if self.session.prev_page() {
                    self.sync();
                }
            }
            Command::GoToPage(page) => {
                if self.session.go_to_page(page) {
                    self.sync();
                } else {
                    self.set_status(format!("No page {page}"));
                }
            }
            Command::PageSize(size) => {
                if self.session.set_page_size(size) {
                    self.sync();
                }
            }
            Command::ToggleRow(row) => {
                if self.session.toggle_row(row).is_none() {
                    self.set_status(format!("No row {row}"));
                }
            }
            Command::ToggleAll => self.session.toggle_all(),
            Command::Add => self.open_add(),
            Command::Edit => {
                if let Err(err) = self.open_edit().await {
                    tracing::debug!(error = %err, "edit form not opened");
                }
            }
            Command::RequestDelete => {
                if let Err(err) = self.request_delete() {
                    self.set_status(err.to_string());
                }
            }
            Command::ConfirmDelete => {
                if let Err(Error::Precondition { .. }) = self.confirm_delete().await {
                    self.set_status("Nothing to delete");
                }
            }
            Command::CancelDelete => self.cancel_delete(),
            Command::ClearSearch => self.clear_search(),
            Command::Refresh => self.refresh(),
            Command::Help => self.show_help = true,
            Command::SetField(..) | Command::Save | Command::Back => {
                self.set_status("No form is open")
            }
            Command::Invalid(text) => self.set_status(format!("Unknown command `{text}`")),
        }
        false
    }

    async fn handle_form_command(&mut self, command: Command) -> bool {
        match command {
            Command::Quit => return true,
            Command::Save => {
                if let Err(err) = self.submit().await {
                    tracing::debug!(error = %err, "form not saved");
                }
            }
            Command::Back => self.back_to_list(),
            Command::SetField(field, value) => self.set_field(&field, &value),
            _ => self.set_status("In the form: field=value, :save or :back"),
        }
        false
    }

    fn set_field(&mut self, field: &str, value: &str) {
        if field == "avatar" {
            if value == "-" {
                if let Some(draft) = self.draft.as_mut() {
                    draft.remove_avatar();
                }
            } else if let Err(err) = self.attach_avatar(Path::new(value)) {
                self.set_status(err.to_string());
            }
            return;
        }

        let Some(draft) = self.draft.as_mut() else {
            return;
        };
        match field {
            "name" => draft.name = value.to_string(),
            "email" => draft.email = value.to_string(),
            "phone" => draft.phone = value.to_string(),
            _ => {}
        }
    }

    fn set_status(&mut self, message: impl Into<String>) {
        self.session.set_notice(Notice::Error(message.into()));
    }

    fn render<W: Write>(&mut self, out: &mut W) -> std::io::Result<()> {
        match (&self.view, &self.draft) {
            (View::List, _) | (_, None) => draw::draw_list(out, &self.session, &self.page_sizes)?,
            (_, Some(draft)) => draw::draw_form(out, draft)?,
        }
        if std::mem::take(&mut self.show_help) {
            draw::draw_help(out)?;
        }
        if let Some(notice) = self.session.take_notice() {
            draw::draw_notice(out, &notice)?;
        }
        Ok(())
    }
}
