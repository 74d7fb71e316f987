//! HTTP engagement source.
//!
//! Talks to a JSON engagement API:
//!
//! ```text
//! GET {base_url}/targets/{target_id}/engagers?cursor={cursor}
//! Authorization: Bearer {token}
//!
//! {"users": [{"pk": 123, "username": "...", "follower_count": 10, ...}],
//!  "next_cursor": "QVFE..." | null}
//! ```
//!
//! User records accept the Instagram-style field names (`pk`,
//! `media_count`, `is_business_account`, ...) as aliases. Non-2xx answers are
//! source failures carrying the status; undecodable bodies are malformed.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use crate::error::{SourceError, SourceResult};
use crate::security::ApiCredentials;
use crate::traits::source::{Cursor, EngagementSource, Page};
use crate::types::actor::ActorProfile;

const MAX_ERROR_BODY_CHARS: usize = 200;

/// Engagement source backed by an HTTP API.
///
/// # Example
///
/// ```rust,ignore
/// use engagement::{ApiCredentials, HttpEngagementSource};
///
/// let creds = ApiCredentials::new("https://api.example.com/v1", token)?;
/// let source = HttpEngagementSource::new(creds)?;
/// ```
pub struct HttpEngagementSource {
    client: reqwest::Client,
    credentials: ApiCredentials,
    user_agent: String,
}

impl HttpEngagementSource {
    /// Create a source with a 30 second transport timeout.
    pub fn new(credentials: ApiCredentials) -> SourceResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| SourceError::Network(Box::new(e)))?;

        Ok(Self {
            client,
            credentials,
            user_agent: concat!("engagement/", env!("CARGO_PKG_VERSION")).to_string(),
        })
    }

    /// Set a custom user agent.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Set a custom HTTP client.
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    /// Build the engagers URL for a target and cursor.
    pub fn endpoint(&self, target_id: &str, cursor: Option<&Cursor>) -> Url {
        let mut url = self.credentials.base_url.clone();
        // Base URLs are validated as http(s) when credentials are built.
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend(["targets", target_id, "engagers"]);
        }
        if let Some(cursor) = cursor {
            url.query_pairs_mut().append_pair("cursor", cursor.as_str());
        }
        url
    }
}

#[async_trait]
impl EngagementSource for HttpEngagementSource {
    async fn fetch_page(&self, target_id: &str, cursor: Option<Cursor>) -> SourceResult<Page> {
        let url = self.endpoint(target_id, cursor.as_ref());
        debug!(target_id = %target_id, cursor = ?cursor, "HTTP fetch starting");

        let response = self
            .client
            .get(url)
            .bearer_auth(self.credentials.token.expose())
            .header(reqwest::header::USER_AGENT, &self.user_agent)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| {
                warn!(target_id = %target_id, error = %e, "HTTP request failed");
                SourceError::Network(Box::new(e))
            })?;

        let status = response.status().as_u16();
        page_from_response(status, response.text().await)
    }

    fn name(&self) -> &str {
        "http"
    }
}

#[derive(Debug, Deserialize)]
struct WirePage {
    users: Option<Vec<WireUser>>,

    #[serde(default, alias = "next_max_id", alias = "end_cursor")]
    next_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireUser {
    #[serde(default, alias = "pk", alias = "user_id")]
    id: Option<serde_json::Value>,

    #[serde(default)]
    username: Option<String>,

    #[serde(default)]
    full_name: Option<String>,

    #[serde(default, alias = "followers_count", alias = "followers")]
    follower_count: Option<u64>,

    #[serde(default, alias = "follows_count", alias = "followings_count")]
    following_count: Option<u64>,

    #[serde(default, alias = "media_count", alias = "posts_count")]
    post_count: Option<u64>,

    #[serde(default)]
    is_verified: Option<bool>,

    #[serde(default, alias = "is_business_account")]
    is_business: Option<bool>,

    #[serde(default)]
    is_private: Option<bool>,

    #[serde(default, alias = "bio")]
    biography: Option<String>,

    #[serde(default)]
    external_url: Option<String>,
}

impl WireUser {
    fn into_profile(self) -> ActorProfile {
        // Numeric ids are common upstream; an absent id stays empty and is
        // rejected when the extraction is classified.
        let id = match self.id {
            Some(serde_json::Value::String(id)) => id,
            Some(serde_json::Value::Number(id)) => id.to_string(),
            _ => String::new(),
        };

        ActorProfile {
            id,
            username: self.username.unwrap_or_default(),
            full_name: self.full_name.filter(|name| !name.trim().is_empty()),
            follower_count: self.follower_count.unwrap_or(0),
            following_count: self.following_count.unwrap_or(0),
            post_count: self.post_count.unwrap_or(0),
            is_verified: self.is_verified.unwrap_or(false),
            is_business: self.is_business.unwrap_or(false),
            is_private: self.is_private.unwrap_or(false),
            biography: self.biography.unwrap_or_default(),
            external_url: self.external_url.filter(|url| !url.trim().is_empty()),
        }
    }
}

/// Map a response status and its (possibly unreadable) body to a page.
///
/// A non-2xx status is reported even when the body cannot be read.
fn page_from_response<E>(status: u16, body: Result<String, E>) -> SourceResult<Page>
where
    E: std::error::Error + Send + Sync + 'static,
{
    if !(200..300).contains(&status) {
        let message: String = body
            .map(|body| body.chars().take(MAX_ERROR_BODY_CHARS).collect())
            .unwrap_or_default();
        return Err(SourceError::Status { status, message });
    }

    let body = body.map_err(|e| SourceError::Network(Box::new(e)))?;
    parse_page(&body)
}

/// Decode one page body.
pub fn parse_page(body: &str) -> SourceResult<Page> {
    let wire: WirePage = serde_json::from_str(body).map_err(|e| SourceError::Malformed {
        reason: format!("invalid page JSON: {e}"),
    })?;

    let users = wire.users.ok_or_else(|| SourceError::Malformed {
        reason: "missing `users` field".into(),
    })?;

    let actors = users.into_iter().map(WireUser::into_profile).collect();
    let next_cursor = wire
        .next_cursor
        .filter(|cursor| !cursor.is_empty())
        .map(Cursor::new);

    Ok(Page::new(actors, next_cursor))
}
