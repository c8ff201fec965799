//! Create, update and delete round-trips, and what they do to local state.

use crate::error::{Error, Result};
use crate::form::{AvatarRules, Draft, DraftMode};
use crate::model::{Contact, ContactId};
use crate::remote::Remote;
use crate::session::DirectorySession;

/// What a successful submission did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Saved {
    Created(Option<Contact>),
    Updated(ContactId),
}

impl Saved {
    /// Notice shown on the list after navigating back.
    pub fn notice(&self) -> &'static str {
        match self {
            Saved::Created(_) => "Contact created successfully",
            Saved::Updated(_) => "Contact updated successfully",
        }
    }
}

pub struct MutationCoordinator<'r, R> {
    remote: &'r R,
    rules: &'r AvatarRules,
}

impl<'r, R: Remote> MutationCoordinator<'r, R> {
    pub fn new(remote: &'r R, rules: &'r AvatarRules) -> Self {
        Self { remote, rules }
    }

    /// Fetch the service's copy of a contact and open an edit draft on it.
    pub async fn load_draft(&self, id: &ContactId) -> Result<Draft> {
        let contact = self.remote.get_contact(id).await?;
        Ok(Draft::for_edit(&contact))
    }

    /// Validate and submit a draft, creating or updating depending on how it
    /// was opened. On failure the draft is left as it was, apart from the
    /// validator's findings.
    pub async fn submit(&self, draft: &mut Draft) -> Result<Saved> {
        match draft.mode().clone() {
            DraftMode::Create => self.create(draft).await.map(Saved::Created),
            DraftMode::Edit(id) => {
                self.update(&id, draft).await?;
                Ok(Saved::Updated(id))
            }
        }
    }

    pub async fn create(&self, draft: &mut Draft) -> Result<Option<Contact>> {
        draft.validate(self.rules)?;
        let payload = draft.to_payload();
        match self.remote.create_contact(&payload).await {
            Ok(created) => {
                tracing::info!(id = ?created.as_ref().map(|c| &c.id), "contact created");
                Ok(created)
            }
            Err(err) => {
                tracing::warn!(error = %err, "create failed; keeping draft");
                Err(err.into())
            }
        }
    }

    pub async fn update(&self, id: &ContactId, draft: &mut Draft) -> Result<()> {
        draft.validate(self.rules)?;
        let payload = draft.to_payload();
        match self.remote.update_contact(id, &payload).await {
            Ok(()) => {
                tracing::info!(%id, "contact updated");
                Ok(())
            }
            Err(err) => {
                tracing::warn!(%id, error = %err, "update failed; keeping draft");
                Err(err.into())
            }
        }
    }

    /// Carry out the session's pending delete.
    pub async fn delete(&self, session: &mut DirectorySession) -> Result<ContactId> {
        let id = session.take_pending_delete().ok_or(Error::Precondition {
            required: 1,
            actual: 0,
        })?;
        match self.delete_by_id(&id).await {
            Ok(()) => {
                session.apply_deleted(&id);
                Ok(id)
            }
            Err(err) => {
                session.delete_failed(err.to_string());
                Err(err)
            }
        }
    }

    /// Delete a contact the caller has already confirmed.
    pub async fn delete_by_id(&self, id: &ContactId) -> Result<()> {
        match self.remote.delete_contact(id).await {
            Ok(()) => {
                tracing::info!(%id, "contact deleted");
                Ok(())
            }
            Err(err) => {
                tracing::warn!(%id, error = %err, "delete failed");
                Err(err.into())
            }
        }
    }
}
