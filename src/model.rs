//! Wire and domain types for the remote contact directory.

use std::fmt;

use deunicode::deunicode;
use serde::de::Deserializer;
use serde::{Deserialize, Serialize, Serializer};
use sha1::{Digest, Sha1};

const PLACEHOLDER_AVATAR_BASE: &str = "https://ui-avatars.com/api/";

/// Identifier assigned by the remote service.
///
/// The service may send either a number or a string; both are kept in their
/// textual form so identifiers compare by value regardless of wire shape.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContactId(String);

impl ContactId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ContactId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<u64> for ContactId {
    fn from(value: u64) -> Self {
        Self(value.to_string())
    }
}

impl Serialize for ContactId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for ContactId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Helper {
            Unsigned(u64),
            Signed(i64),
            Text(String),
        }

        let helper = Helper::deserialize(deserializer)?;
        Ok(match helper {
            Helper::Unsigned(value) => ContactId(value.to_string()),
            Helper::Signed(value) => ContactId(value.to_string()),
            Helper::Text(value) => ContactId(value),
        })
    }
}

/// A complete contact snapshot as returned by the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    pub id: ContactId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

impl Contact {
    /// The remote avatar URL, or a placeholder derived from the name so a
    /// contact never renders without an image reference.
    pub fn avatar_url(&self) -> String {
        match self.avatar_url.as_deref().map(str::trim) {
            Some(url) if !url.is_empty() => url.to_string(),
            _ => placeholder_avatar_url(&self.name),
        }
    }

    pub fn has_remote_avatar(&self) -> bool {
        self.avatar_url
            .as_deref()
            .is_some_and(|url| !url.trim().is_empty())
    }

    pub fn initials(&self) -> String {
        initials(&self.name)
    }
}

/// Deterministic placeholder image URL for a display name.
pub fn placeholder_avatar_url(name: &str) -> String {
    let name = name.trim();
    let encoded: String = url::form_urlencoded::byte_serialize(name.as_bytes()).collect();
    format!(
        "{}?name={}&background={}",
        PLACEHOLDER_AVATAR_BASE,
        encoded,
        name_color(name)
    )
}

/// Six hex digits taken from the SHA-1 of the name.
fn name_color(name: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(name.as_bytes());
    let hash = hasher.finalize();
    hash.iter().take(3).map(|b| format!("{:02x}", b)).collect()
}

/// Up to two uppercase initials from the first two words of a name.
pub fn initials(name: &str) -> String {
    let ascii = deunicode(name);
    let letters: String = ascii
        .split_whitespace()
        .filter_map(|word| word.chars().find(|c| c.is_alphanumeric()))
        .take(2)
        .collect();

    if letters.is_empty() {
        "?".to_string()
    } else {
        letters.to_uppercase()
    }
}

/// Parameters of one list request as they appear on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PageQuery {
    pub query: String,
    /// 0-based page index.
    pub page: usize,
    pub size: usize,
}

/// Body of `GET /contacts`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageResponse {
    #[serde(default)]
    pub content: Vec<Contact>,
    #[serde(default)]
    pub total_pages: usize,
    #[serde(default)]
    pub total_elements: usize,
}
