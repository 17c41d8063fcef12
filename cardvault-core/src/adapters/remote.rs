//! HTTP record store - talks to a CardVault REST server
//!
//! Error responses are mapped back onto the same [`Error`] variants the local
//! store produces, so callers see identical failures for both backends.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use url::Url;

use crate::domain::result::{Error, Result};
use crate::domain::{
    CardDetails, CardPatch, CardQuery, Deleted, ErrorBody, NewCard, NewUser, UserDetails,
    UserPatch,
};
use crate::ports::RecordStore;

/// REST client implementing [`RecordStore`]
#[derive(Debug, Clone)]
pub struct RemoteStore {
    client: Client,
    base_url: Url,
}

impl RemoteStore {
    /// Create a client for the server at `base_url`, e.g. `http://127.0.0.1:3000`
    ///
    /// A base path such as `/api` is kept and resource paths are appended to it.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| Error::config(format!("Invalid API URL '{}': {}", base_url, e)))?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(Error::config(format!(
                "API URL must use http or https, got '{}'",
                base_url.scheme()
            )));
        }

        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self { client, base_url })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| Error::config(format!("API URL '{}' cannot be a base", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = request.send().await.map_err(|e| {
            tracing::warn!(error = %e, "Request to record server failed");
            Error::from(e)
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }

        let body = response.text().await.unwrap_or_default();
        Err(error_from_response(status, &body))
    }
}

/// Map a non-success response onto a domain error
fn error_from_response(status: StatusCode, body: &str) -> Error {
    let parsed: Option<ErrorBody> = serde_json::from_str(body).ok();

    match (status.as_u16(), parsed) {
        (400, Some(body)) => match body.missing.or(body.required) {
            Some(fields) => Error::MissingFields(fields),
            None => Error::Validation(body.error),
        },
        (404, Some(body)) => Error::NotFound(body.error),
        (409, Some(body)) => Error::Conflict(body.error),
        (code, Some(body)) => Error::Remote {
            status: code,
            message: body.message.unwrap_or(body.error),
        },
        (code, None) => Error::Remote {
            status: code,
            message: if body.is_empty() {
                status.canonical_reason().unwrap_or("Unknown error").to_string()
            } else {
                body.to_string()
            },
        },
    }
}

#[async_trait]
impl RecordStore for RemoteStore {
    fn backend(&self) -> &'static str {
        "remote"
    }

    async fn list_cards(&self, query: &CardQuery) -> Result<Vec<CardDetails>> {
        let mut url = self.endpoint(&["cards"])?;
        {
            let mut pairs = url.query_pairs_mut();
            if let Some(user_id) = query.user_id.as_deref().filter(|id| !id.is_empty()) {
                pairs.append_pair("userId", user_id);
            }
            if query.include_owner {
                pairs.append_pair("include", "user");
            }
        }
        strip_empty_query(&mut url);
        self.send(self.client.get(url)).await
    }

    async fn get_card(&self, id: &str, include_owner: bool) -> Result<CardDetails> {
        let mut url = self.endpoint(&["cards", id])?;
        if include_owner {
            url.query_pairs_mut().append_pair("include", "user");
        }
        self.send(self.client.get(url)).await
    }

    async fn create_card(&self, card: NewCard) -> Result<CardDetails> {
        let url = self.endpoint(&["cards"])?;
        self.send(self.client.post(url).json(&card)).await
    }

    async fn update_card(&self, id: &str, patch: CardPatch) -> Result<CardDetails> {
        let url = self.endpoint(&["cards", id])?;
        self.send(self.client.put(url).json(&patch)).await
    }

    async fn delete_card(&self, id: &str) -> Result<Deleted> {
        let url = self.endpoint(&["cards", id])?;
        self.send(self.client.delete(url)).await
    }

    async fn list_users(&self, include_cards: bool) -> Result<Vec<UserDetails>> {
        let mut url = self.endpoint(&["users"])?;
        if include_cards {
            url.query_pairs_mut().append_pair("include", "cards");
        }
        self.send(self.client.get(url)).await
    }

    async fn get_user(&self, id: &str, include_cards: bool) -> Result<UserDetails> {
        let mut url = self.endpoint(&["users", id])?;
        if include_cards {
            url.query_pairs_mut().append_pair("include", "cards");
        }
        self.send(self.client.get(url)).await
    }

    async fn create_user(&self, user: NewUser) -> Result<UserDetails> {
        let url = self.endpoint(&["users"])?;
        self.send(self.client.post(url).json(&user)).await
    }

    async fn update_user(&self, id: &str, patch: UserPatch) -> Result<UserDetails> {
        let url = self.endpoint(&["users", id])?;
        self.send(self.client.put(url).json(&patch)).await
    }

    async fn delete_user(&self, id: &str) -> Result<Deleted> {
        let url = self.endpoint(&["users", id])?;
        self.send(self.client.delete(url)).await
    }
}

/// `query_pairs_mut` leaves a bare `?` behind when nothing was appended
fn strip_empty_query(url: &mut Url) {
    if url.query() == Some("") {
        url.set_query(None);
    }
}
