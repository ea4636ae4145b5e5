//! Typed client for the platform's mobile web API.

pub mod types;

use std::time::Duration;

use tracing::debug;

use crate::constants::USER_AGENT;
use crate::error::CrawlError;
use types::{CommentResponse, Mblog, SearchResponse};

/// Thin wrapper around [`reqwest::Client`] for the three endpoints the
/// crawler uses: topic search, post detail, and the comment feed.
///
/// The base URL is configurable so integration tests can point the client
/// at a mock server.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    cookie: String,
}

impl ApiClient {
    /// Build a client with the shared User-Agent and a 30 second timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be constructed.
    pub fn new(base_url: &str, cookie: &str) -> Result<Self, CrawlError> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            cookie: cookie.to_string(),
        })
    }

    /// The underlying HTTP client, for plain file downloads.
    #[must_use]
    pub const fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// Query the total number of posts matching `topic`.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, a non-success status, or an
    /// unusable payload.
    pub async fn fetch_total(&self, topic: &str) -> Result<i64, CrawlError> {
        let response = self
            .http
            .get(format!("{}/api/container/getIndex", self.base_url))
            .query(&[
                ("containerid", container_id(topic).as_str()),
                ("page_type", "searchall"),
            ])
            .send()
            .await?
            .error_for_status()?
            .json::<SearchResponse>()
            .await?;

        if response.ok != 1 {
            return Err(CrawlError::Schema(format!(
                "search count query returned ok={}",
                response.ok
            )));
        }
        let total = response
            .data
            .and_then(|d| d.cardlist_info)
            .map_or(0, |info| info.total);
        debug!(topic, total, "fetched topic result count");
        Ok(total)
    }

    /// Fetch one search-result page for `topic`.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, a non-success status, or a
    /// payload that does not parse.
    pub async fn fetch_search_page(
        &self,
        topic: &str,
        page: i64,
    ) -> Result<SearchResponse, CrawlError> {
        let response = self
            .http
            .get(format!("{}/api/container/getIndex", self.base_url))
            .query(&[
                ("containerid", container_id(topic).as_str()),
                ("page_type", "searchall"),
                ("page", page.to_string().as_str()),
            ])
            .send()
            .await?
            .error_for_status()?
            .json::<SearchResponse>()
            .await?;
        Ok(response)
    }

    /// Fetch a post's detail page and extract the full `status` record.
    ///
    /// Returns `Ok(None)` when the page carries no parseable status object;
    /// callers fall back to the summary record in that case.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or a non-success status.
    pub async fn fetch_detail(&self, id: &str) -> Result<Option<Mblog>, CrawlError> {
        let html = self
            .http
            .get(format!("{}/detail/{id}", self.base_url))
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        Ok(extract_status(&html))
    }

    /// Fetch one page of a post's comment feed.
    ///
    /// The first page omits `max_id`; later pages pass the cursor from the
    /// previous response. The configured cookie is sent on these requests
    /// (the comment endpoint requires a session).
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, a non-success status, or a
    /// payload that does not parse.
    pub async fn fetch_comment_page(
        &self,
        id: i64,
        max_id: Option<i64>,
    ) -> Result<CommentResponse, CrawlError> {
        let id = id.to_string();
        let mut query: Vec<(&str, String)> = vec![
            ("id", id.clone()),
            ("mid", id),
            ("max_id_type", "0".to_string()),
        ];
        if let Some(cursor) = max_id {
            query.push(("max_id", cursor.to_string()));
        }

        let response = self
            .http
            .get(format!("{}/comments/hotflow", self.base_url))
            .query(&query)
            .header("Cookie", &self.cookie)
            .send()
            .await?
            .error_for_status()?
            .json::<CommentResponse>()
            .await?;
        Ok(response)
    }
}

/// Container id for a topic search, as the mobile web UI builds it.
fn container_id(topic: &str) -> String {
    format!("100103type=1&q={topic}&t=0")
}

/// Extract the `status` object embedded in a detail page.
///
/// The page inlines its render data as JavaScript; rather than slicing
/// against fixed markers, locate the `"status":` key and deserialize
/// exactly one balanced JSON value from that point. Trailing script text
/// is ignored by the stream deserializer.
#[must_use]
pub fn extract_status(html: &str) -> Option<Mblog> {
    let start = html.find("\"status\":")? + "\"status\":".len();
    let mut stream = serde_json::Deserializer::from_str(&html[start..]).into_iter::<Mblog>();
    match stream.next()? {
        Ok(status) if !status.id.is_empty() => Some(status),
        _ => None,
    }
}
