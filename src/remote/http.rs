//! REST client for the contact service using reqwest.

use std::time::Duration;

use reqwest::multipart::{Form, Part};
use reqwest::{Response, StatusCode};
use serde::Serialize;
use serde_json::Value;
use tracing::instrument;
use url::Url;

use crate::form::{AvatarChange, AvatarFile};
use crate::model::{Contact, ContactId, PageQuery, PageResponse};
use crate::remote::{ContactPayload, Remote, RemoteError};

const AVATAR_FIELD: &str = "avatar";
const EMPTY_FILE_MIME: &str = "application/octet-stream";

/// HTTP remote rooted at the service's API base URL (e.g.
/// `http://localhost:8080/api`).
#[derive(Debug, Clone)]
pub struct HttpRemote {
    client: reqwest::Client,
    base: Url,
}

#[derive(Serialize)]
struct JsonContactBody<'a> {
    name: &'a str,
    email: &'a str,
    phone: &'a str,
}

impl HttpRemote {
    pub fn new(base: Url, timeout: Duration) -> Result<Self, RemoteError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| RemoteError::Transport(format!("failed to build HTTP client: {err}")))?;
        Ok(Self { client, base })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, RemoteError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| RemoteError::Transport(format!("invalid base URL: {}", self.base)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

impl Remote for HttpRemote {
    #[instrument(
        name = "contactdesk.http.list_contacts",
        skip_all,
        fields(q = %query.query, page = query.page, size = query.size)
    )]
    async fn list_contacts(&self, query: &PageQuery) -> Result<PageResponse, RemoteError> {
        let url = self.endpoint(&["contacts"])?;
        let page = query.page.to_string();
        let size = query.size.to_string();

        let response = self
            .client
            .get(url)
            .query(&[
                ("q", query.query.as_str()),
                ("page", page.as_str()),
                ("size", size.as_str()),
            ])
            .send()
            .await
            .map_err(transport)?;

        let response = ensure_success(response).await?;
        response
            .json::<PageResponse>()
            .await
            .map_err(|err| RemoteError::Transport(format!("malformed contact page: {err}")))
    }

    #[instrument(name = "contactdesk.http.get_contact", skip_all, fields(id = %id))]
    async fn get_contact(&self, id: &ContactId) -> Result<Contact, RemoteError> {
        let url = self.endpoint(&["contacts", id.as_str()])?;
        let response = self.client.get(url).send().await.map_err(transport)?;
        let response = ensure_success(response).await?;
        response
            .json::<Contact>()
            .await
            .map_err(|err| RemoteError::Transport(format!("malformed contact: {err}")))
    }

    #[instrument(name = "contactdesk.http.create_contact", skip_all)]
    async fn create_contact(&self, payload: &ContactPayload) -> Result<Option<Contact>, RemoteError> {
        let url = self.endpoint(&["contacts"])?;
        let request = match &payload.avatar {
            AvatarChange::Replaced(file) => {
                let form = multipart_form(payload, Some(file_part(file)?));
                self.client.post(url).multipart(form)
            }
            AvatarChange::Unchanged | AvatarChange::Removed => {
                self.client.post(url).json(&JsonContactBody {
                    name: &payload.name,
                    email: &payload.email,
                    phone: &payload.phone,
                })
            }
        };

        let response = request.send().await.map_err(transport)?;
        let response = ensure_success(response).await?;
        let body = response.text().await.map_err(transport)?;
        if body.trim().is_empty() {
            return Ok(None);
        }
        match serde_json::from_str::<Contact>(&body) {
            Ok(contact) => Ok(Some(contact)),
            Err(err) => {
                tracing::debug!(error = %err, "create response did not contain a contact");
                Ok(None)
            }
        }
    }

    #[instrument(name = "contactdesk.http.update_contact", skip_all, fields(id = %id))]
    async fn update_contact(&self, id: &ContactId, payload: &ContactPayload) -> Result<(), RemoteError> {
        let url = self.endpoint(&["contacts", id.as_str()])?;
        let avatar = match &payload.avatar {
            AvatarChange::Unchanged => None,
            AvatarChange::Replaced(file) => Some(file_part(file)?),
            AvatarChange::Removed => Some(removal_part()?),
        };

        let response = self
            .client
            .put(url)
            .multipart(multipart_form(payload, avatar))
            .send()
            .await
            .map_err(transport)?;
        ensure_success(response).await?;
        Ok(())
    }

    #[instrument(name = "contactdesk.http.delete_contact", skip_all, fields(id = %id))]
    async fn delete_contact(&self, id: &ContactId) -> Result<(), RemoteError> {
        let url = self.endpoint(&["contacts", id.as_str()])?;
        let response = self.client.delete(url).send().await.map_err(transport)?;
        let status = response.status();
        if status == StatusCode::NO_CONTENT {
            return Ok(());
        }
        if status.is_success() {
            return Err(RemoteError::Rejected {
                status: status.as_u16(),
                message: format!("unexpected response to delete: HTTP {status}"),
            });
        }
        Err(rejection(response).await)
    }
}

fn multipart_form(payload: &ContactPayload, avatar: Option<Part>) -> Form {
    let form = Form::new()
        .text("name", payload.name.clone())
        .text("email", payload.email.clone())
        .text("phone", payload.phone.clone());
    match avatar {
        Some(part) => form.part(AVATAR_FIELD, part),
        None => form,
    }
}

fn file_part(file: &AvatarFile) -> Result<Part, RemoteError> {
    Part::bytes(file.bytes.clone())
        .file_name(file.file_name.clone())
        .mime_str(&file.mime_type)
        .map_err(|err| RemoteError::Transport(format!("invalid avatar media type: {err}")))
}

/// Empty, unnamed file: tells the service to clear the stored avatar.
fn removal_part() -> Result<Part, RemoteError> {
    Part::bytes(Vec::new())
        .file_name("")
        .mime_str(EMPTY_FILE_MIME)
        .map_err(|err| RemoteError::Transport(err.to_string()))
}

fn transport(err: reqwest::Error) -> RemoteError {
    RemoteError::Transport(err.to_string())
}

async fn ensure_success(response: Response) -> Result<Response, RemoteError> {
    if response.status().is_success() {
        Ok(response)
    } else {
        Err(rejection(response).await)
    }
}

async fn rejection(response: Response) -> RemoteError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let message = rejection_message(status, &body);
    tracing::warn!(status = status.as_u16(), %message, "service rejected request");
    RemoteError::Rejected {
        status: status.as_u16(),
        message,
    }
}

/// A JSON `message` field if present, else the body text, else the status.
pub(crate) fn rejection_message(status: StatusCode, body: &str) -> String {
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(body) {
        if let Some(Value::String(message)) = map.get("message") {
            if !message.trim().is_empty() {
                return message.clone();
            }
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        format!("HTTP {status}")
    } else {
        trimmed.to_string()
    }
}
