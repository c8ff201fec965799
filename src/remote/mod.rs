//! The remote contact service.
//!
//! This module provides:
//! - `Remote` trait for the operations the directory needs from the service
//! - `HttpRemote`, the REST implementation using reqwest
//! - Payload and error types shared by every implementation

pub mod http;
#[cfg(test)]
pub mod memory;

use thiserror::Error;

use crate::form::AvatarChange;
use crate::model::{Contact, ContactId, PageQuery, PageResponse};

pub use http::HttpRemote;

/// Failure talking to the service.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RemoteError {
    /// Unreachable service, timeout, or a body that could not be decoded.
    #[error("transport error: {0}")]
    Transport(String),

    /// The service answered with a non-success status.
    #[error("{message}")]
    Rejected { status: u16, message: String },
}

/// Data submitted by create and update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactPayload {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub avatar: AvatarChange,
}

/// Operations on the remote contact collection
#[allow(async_fn_in_trait)]
pub trait Remote {
    /// Fetch one page of contacts matching a query
    async fn list_contacts(&self, query: &PageQuery) -> Result<PageResponse, RemoteError>;

    /// Fetch a single contact
    async fn get_contact(&self, id: &ContactId) -> Result<Contact, RemoteError>;

    /// Create a contact. Returns the stored contact when the service sends it back
    async fn create_contact(&self, payload: &ContactPayload) -> Result<Option<Contact>, RemoteError>;

    /// Replace a contact's fields
    async fn update_contact(&self, id: &ContactId, payload: &ContactPayload) -> Result<(), RemoteError>;

    /// Delete a contact
    async fn delete_contact(&self, id: &ContactId) -> Result<(), RemoteError>;
}
