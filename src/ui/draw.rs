//! Plain-text rendering of the directory views.

use std::io::{self, Write};

use crate::form::{AvatarChange, Draft, DraftMode, Field};
use crate::model::Contact;
use crate::session::{DirectorySession, Notice};

const NAME_WIDTH: usize = 24;
const EMAIL_WIDTH: usize = 30;

pub fn draw_list<W: Write>(out: &mut W, session: &DirectorySession, page_sizes: &[usize]) -> io::Result<()> {
    let pagination = session.pagination();
    writeln!(
        out,
        "{} contacts | showing page {} of {}",
        pagination.total_elements(),
        pagination.current_page(),
        pagination.total_pages().max(1)
    )?;
    if !session.query().is_empty() {
        writeln!(out, "search: {}", session.query())?;
    }

    if let Some(message) = session.empty_state() {
        writeln!(out, "{message}")?;
        if session.show_clear_search() {
            writeln!(out, "Clear search (:clear)")?;
        }
    }

    let all = if session.is_all_selected() { "[x]" } else { "[ ]" };
    if !session.contacts().is_empty() {
        writeln!(
            out,
            "{all}  #  {:<name$} {:<email$} PHONE",
            "NAME",
            "EMAIL",
            name = NAME_WIDTH,
            email = EMAIL_WIDTH
        )?;
    }
    for (index, contact) in session.contacts().iter().enumerate() {
        let mark = if session.selection().contains(&contact.id) {
            "[x]"
        } else {
            "[ ]"
        };
        writeln!(
            out,
            "{mark} {:>2}  {:<name$} {:<email$} {}",
            index + 1,
            truncate(&contact.name, NAME_WIDTH),
            truncate(&contact.email, EMAIL_WIDTH),
            contact.phone,
            name = NAME_WIDTH,
            email = EMAIL_WIDTH
        )?;
    }

    writeln!(out, "{}", session.summary())?;
    let sizes: Vec<String> = page_sizes
        .iter()
        .map(|size| {
            if *size == pagination.page_size() {
                format!("[{size}]")
            } else {
                size.to_string()
            }
        })
        .collect();
    writeln!(out, "per page: {}", sizes.join(" "))?;

    if let Some(id) = session.pending_delete() {
        let name = session
            .contacts()
            .iter()
            .find(|c| &c.id == id)
            .map(|c| c.name.as_str())
            .unwrap_or("this contact");
        writeln!(out, "Delete {name}? This cannot be undone. (:y / :no)")?;
    }
    Ok(())
}

pub fn draw_contact<W: Write>(out: &mut W, contact: &Contact) -> io::Result<()> {
    writeln!(out, "id:     {}", contact.id)?;
    writeln!(out, "name:   {}", contact.name)?;
    writeln!(out, "email:  {}", contact.email)?;
    writeln!(out, "phone:  {}", contact.phone)?;
    writeln!(out, "avatar: {}", contact.avatar_url())?;
    if !contact.has_remote_avatar() {
        writeln!(out, "        ({})", contact.initials())?;
    }
    Ok(())
}

pub fn draw_form<W: Write>(out: &mut W, draft: &Draft) -> io::Result<()> {
    match draft.mode() {
        DraftMode::Create => writeln!(out, "New contact")?,
        DraftMode::Edit(id) => writeln!(out, "Edit contact {id}")?,
    }

    let errors = draft.errors();
    for (field, value) in [
        (Field::Name, draft.name.as_str()),
        (Field::Email, draft.email.as_str()),
        (Field::Phone, draft.phone.as_str()),
    ] {
        writeln!(out, "  {:<7}{}", format!("{field}:"), value)?;
        if let Some(message) = errors.get(field) {
            writeln!(out, "         ! {message}")?;
        }
    }

    let avatar = match (draft.avatar(), draft.displayed_avatar()) {
        (AvatarChange::Replaced(file), Some(shown)) => format!("{} ({shown})", file.file_name),
        (AvatarChange::Replaced(file), None) => file.file_name.clone(),
        (AvatarChange::Removed, _) => "(removed)".to_string(),
        (AvatarChange::Unchanged, Some(shown)) => shown,
        (AvatarChange::Unchanged, None) => "(none)".to_string(),
    };
    writeln!(out, "  avatar: {avatar}")?;
    if let Some(message) = errors.get(Field::Avatar) {
        writeln!(out, "         ! {message}")?;
    }
    writeln!(out, "field=value to edit, avatar=PATH or avatar=- ; :save, :back")
}

pub fn draw_notice<W: Write>(out: &mut W, notice: &Notice) -> io::Result<()> {
    match notice {
        Notice::Info(message) => writeln!(out, "{message}"),
        Notice::Error(message) => writeln!(out, "error: {message}"),
    }
}

pub fn draw_help<W: Write>(out: &mut W) -> io::Result<()> {
    const LINES: &[(&str, &str)] = &[
        ("text", "search (applies after a short pause)"),
        (":n / :p", "next / previous page"),
        (":g N", "go to page N"),
        (":size N", "contacts per page"),
        (":x N", "toggle row N"),
        (":a", "toggle all rows"),
        (":add", "new contact"),
        (":e", "edit the selected contact"),
        (":d", "delete the selected contact"),
        (":y / :no", "confirm / cancel delete"),
        (":clear", "clear search"),
        (":r", "refresh"),
        (":q", "quit"),
    ];
    for (keys, description) in LINES {
        writeln!(out, "  {keys:<10} {description}")?;
    }
    Ok(())
}

fn truncate(value: &str, width: usize) -> String {
    if value.chars().count() <= width {
        return value.to_string();
    }
    let mut cut: String = value.chars().take(width.saturating_sub(1)).collect();
    cut.push('…');
    cut
}
