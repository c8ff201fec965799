//! Create/edit form state and the checks it must pass before submission.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::Error;
use crate::model::{Contact, ContactId};
use crate::preview::{PreviewHandle, PreviewStore};
use crate::remote::ContactPayload;

pub const DEFAULT_AVATAR_MAX_BYTES: usize = 5 * 1024 * 1024;
pub const DEFAULT_AVATAR_TYPES: [&str; 3] = ["image/jpeg", "image/png", "image/webp"];

static EMAIL_SHAPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\S+@\S+\.\S+").expect("email pattern is valid")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Field {
    Name,
    Email,
    Phone,
    Avatar,
}

impl Field {
    pub fn as_str(self) -> &'static str {
        match self {
            Field::Name => "name",
            Field::Email => "email",
            Field::Phone => "phone",
            Field::Avatar => "avatar",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-field error messages. A draft is valid iff this is empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors(BTreeMap<Field, String>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, field: Field) -> Option<&str> {
        self.0.get(&field).map(String::as_str)
    }

    pub fn contains(&self, field: Field) -> bool {
        self.0.contains_key(&field)
    }

    pub fn insert(&mut self, field: Field, message: impl Into<String>) {
        self.0.insert(field, message.into());
    }

    pub fn remove(&mut self, field: Field) -> Option<String> {
        self.0.remove(&field)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Field, &str)> {
        self.0.iter().map(|(field, message)| (*field, message.as_str()))
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, message) in self.iter() {
            if !first {
                f.write_str("; ")?;
            }
            write!(f, "{}: {}", field, message)?;
            first = false;
        }
        Ok(())
    }
}

/// A local image picked for upload.
#[derive(Clone, PartialEq, Eq)]
pub struct AvatarFile {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl fmt::Debug for AvatarFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AvatarFile")
            .field("file_name", &self.file_name)
            .field("mime_type", &self.mime_type)
            .field("size", &self.bytes.len())
            .finish()
    }
}

impl AvatarFile {
    pub fn new(
        file_name: impl Into<String>,
        mime_type: impl Into<String>,
        bytes: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            mime_type: mime_type.into(),
            bytes: bytes.into(),
        }
    }

    /// Read a file from disk, inferring the media type from its extension.
    pub fn from_path(path: &Path) -> io::Result<Self> {
        let bytes = fs::read(path)?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mime_type = path
            .extension()
            .and_then(|ext| media_type_from_extension(&ext.to_string_lossy()))
            .unwrap_or("application/octet-stream");
        Ok(Self::new(file_name, mime_type, bytes))
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}

fn media_type_from_extension(value: &str) -> Option<&'static str> {
    match value.trim().to_ascii_uppercase().as_str() {
        "JPEG" | "JPG" => Some("image/jpeg"),
        "PNG" => Some("image/png"),
        "WEBP" => Some("image/webp"),
        "GIF" => Some("image/gif"),
        _ => None,
    }
}

/// What a submission should do with the avatar.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AvatarChange {
    /// Leave the stored avatar alone; the field is omitted from the payload.
    #[default]
    Unchanged,
    /// Upload a new image.
    Replaced(AvatarFile),
    /// Explicitly clear the stored avatar.
    Removed,
}

/// Constraints on attached avatar files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvatarRules {
    pub max_bytes: usize,
    pub allowed_types: Vec<String>,
}

impl Default for AvatarRules {
    fn default() -> Self {
        Self {
            max_bytes: DEFAULT_AVATAR_MAX_BYTES,
            allowed_types: DEFAULT_AVATAR_TYPES.iter().map(|t| t.to_string()).collect(),
        }
    }
}

impl AvatarRules {
    pub fn check(&self, file: &AvatarFile) -> Result<(), String> {
        let mime = file.mime_type.trim().to_ascii_lowercase();
        if !self.allowed_types.iter().any(|t| t.eq_ignore_ascii_case(&mime)) {
            return Err("Unsupported file type. Use JPG, PNG, or WebP.".to_string());
        }
        if file.size() > self.max_bytes {
            return Err(format!(
                "File size must be {} or less.",
                format_size(self.max_bytes)
            ));
        }
        Ok(())
    }
}

fn format_size(bytes: usize) -> String {
    const MIB: usize = 1024 * 1024;
    if bytes >= MIB && bytes % MIB == 0 {
        format!("{} MB", bytes / MIB)
    } else if bytes >= 1024 && bytes % 1024 == 0 {
        format!("{} KB", bytes / 1024)
    } else {
        format!("{} bytes", bytes)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DraftMode {
    Create,
    Edit(ContactId),
}

/// Unsaved contact data owned by the add/edit form.
///
/// Dropping a draft releases any staged avatar preview.
#[derive(Debug)]
pub struct Draft {
    mode: DraftMode,
    pub name: String,
    pub email: String,
    pub phone: String,
    avatar: AvatarChange,
    existing_avatar_url: Option<String>,
    rejected_avatar: Option<String>,
    errors: ValidationErrors,
    preview: Option<PreviewHandle>,
}

impl Default for Draft {
    fn default() -> Self {
        Self::new()
    }
}

impl Draft {
    pub fn new() -> Self {
        Self {
            mode: DraftMode::Create,
            name: String::new(),
            email: String::new(),
            phone: String::new(),
            avatar: AvatarChange::Unchanged,
            existing_avatar_url: None,
            rejected_avatar: None,
            errors: ValidationErrors::new(),
            preview: None,
        }
    }

    /// Pre-populate a draft from the service's copy of a contact.
    pub fn for_edit(contact: &Contact) -> Self {
        Self {
            mode: DraftMode::Edit(contact.id.clone()),
            name: contact.name.clone(),
            email: contact.email.clone(),
            phone: contact.phone.clone(),
            existing_avatar_url: contact
                .avatar_url
                .clone()
                .filter(|url| !url.trim().is_empty()),
            ..Self::new()
        }
    }

    pub fn mode(&self) -> &DraftMode {
        &self.mode
    }

    pub fn target(&self) -> Option<&ContactId> {
        match &self.mode {
            DraftMode::Create => None,
            DraftMode::Edit(id) => Some(id),
        }
    }

    pub fn avatar(&self) -> &AvatarChange {
        &self.avatar
    }

    pub fn errors(&self) -> &ValidationErrors {
        &self.errors
    }

    /// Attach a new avatar file. A file that breaks the rules is refused: the
    /// previous avatar state stays and the avatar error is recorded on the
    /// draft until a valid file is attached or the avatar is removed.
    pub fn attach_avatar(&mut self, file: AvatarFile, rules: &AvatarRules) -> Result<(), Error> {
        if let Err(message) = rules.check(&file) {
            self.rejected_avatar = Some(message.clone());
            self.errors.insert(Field::Avatar, message.clone());
            let mut errors = ValidationErrors::new();
            errors.insert(Field::Avatar, message);
            return Err(Error::Validation(errors));
        }

        self.rejected_avatar = None;
        self.errors.remove(Field::Avatar);
        self.preview = None;
        self.avatar = AvatarChange::Replaced(file);
        Ok(())
    }

    /// Drop the avatar. For a new contact there is nothing stored yet, so
    /// this only forgets any attached file.
    pub fn remove_avatar(&mut self) {
        self.rejected_avatar = None;
        self.errors.remove(Field::Avatar);
        self.preview = None;
        self.existing_avatar_url = None;
        self.avatar = match self.mode {
            DraftMode::Create => AvatarChange::Unchanged,
            DraftMode::Edit(_) => AvatarChange::Removed,
        };
    }

    /// Write the attached file to the preview store, superseding (and
    /// releasing) any earlier preview. Returns the preview location, if a
    /// file is attached.
    pub fn stage_preview(&mut self, store: &PreviewStore) -> io::Result<Option<&Path>> {
        self.preview = None;
        if let AvatarChange::Replaced(file) = &self.avatar {
            self.preview = Some(store.stage(file)?);
        }
        Ok(self.preview.as_ref().map(PreviewHandle::path))
    }

    pub fn preview_path(&self) -> Option<&Path> {
        self.preview.as_ref().map(PreviewHandle::path)
    }

    /// The image the form should show: a staged preview, otherwise the
    /// contact's current remote avatar.
    pub fn displayed_avatar(&self) -> Option<String> {
        if let Some(path) = self.preview_path() {
            return Some(path.display().to_string());
        }
        match self.avatar {
            AvatarChange::Unchanged => self.existing_avatar_url.clone(),
            _ => None,
        }
    }

    /// Run the validator and remember its findings on the draft.
    pub fn validate(&mut self, rules: &AvatarRules) -> Result<(), Error> {
        let errors = validate(self, rules);
        self.errors = errors.clone();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(Error::Validation(errors))
        }
    }

    pub fn to_payload(&self) -> ContactPayload {
        ContactPayload {
            name: self.name.trim().to_string(),
            email: self.email.trim().to_string(),
            phone: self.phone.trim().to_string(),
            avatar: self.avatar.clone(),
        }
    }

    /// Consume the draft, releasing everything it holds.
    pub fn discard(self) {}
}

/// Check a draft without touching the network.
pub fn validate(draft: &Draft, rules: &AvatarRules) -> ValidationErrors {
    let mut errors = ValidationErrors::new();

    if draft.name.trim().is_empty() {
        errors.insert(Field::Name, "Name is required.");
    }

    let email = draft.email.trim();
    if email.is_empty() {
        errors.insert(Field::Email, "Email is required.");
    } else if !EMAIL_SHAPE.is_match(email) {
        errors.insert(Field::Email, "Enter a valid email address.");
    }

    if draft.phone.trim().is_empty() {
        errors.insert(Field::Phone, "Phone is required.");
    }

    if let Some(message) = &draft.rejected_avatar {
        errors.insert(Field::Avatar, message.clone());
    } else if let AvatarChange::Replaced(file) = &draft.avatar {
        if let Err(message) = rules.check(file) {
            errors.insert(Field::Avatar, message);
        }
    }

    errors
}
