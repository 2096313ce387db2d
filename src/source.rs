//! External search source interface
//!
//! The orchestrator only knows the [`SearchSource`] trait: one call to list
//! candidate items for a query, one batched call to fetch their details. The
//! built-in [`HttpSearchSource`] talks to a hosted search API over reqwest;
//! tests swap in mock implementations.
//!
//! Errors are mapped into [`SourceError`] so the retry executor can tell
//! quota signals, transient failures and fatal requests apart.

use crate::config::SourceConfig;
use crate::error::{Error, Result, SourceError};
use crate::types::{VideoDetails, VideoRef};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Deserialize;
use url::Url;

/// Options for a single search call
#[derive(Clone, Debug)]
pub struct SearchOptions {
    /// Maximum number of results to request
    pub max_results: u32,
    /// Result ordering ("relevance", "date", "rating", "viewCount", "title")
    pub order: String,
    /// Region code bias
    pub region_code: String,
    /// Relevance language bias
    pub relevance_language: String,
    /// Only include items published after this instant
    pub published_after: Option<DateTime<Utc>>,
    /// Only include items published before this instant
    pub published_before: Option<DateTime<Utc>>,
}

/// A source of candidate items and their details.
///
/// Implementations take the credential per call; credential selection and
/// rotation belong to the caller (see [`crate::retry::call_with_rotation`]).
#[async_trait]
pub trait SearchSource: Send + Sync {
    /// List candidate items for a query.
    async fn search(
        &self,
        credential: &str,
        query: &str,
        options: &SearchOptions,
    ) -> Result<Vec<VideoRef>>;

    /// Fetch full details for up to the API's per-call id limit.
    async fn fetch_details(&self, credential: &str, ids: &[String]) -> Result<Vec<VideoDetails>>;
}

/// reqwest-backed implementation of [`SearchSource`]
#[derive(Debug)]
pub struct HttpSearchSource {
    client: reqwest::Client,
    base_url: String,
}

impl HttpSearchSource {
    /// Per-request hard cap imposed by the external API
    const MAX_RESULTS_PER_CALL: u32 = 50;

    /// Build a source from configuration.
    pub fn new(config: &SourceConfig) -> Result<Self> {
        if config.base_url.is_empty() {
            return Err(Error::Config {
                message: "search source base URL is empty".to_string(),
                key: Some("source.base_url".to_string()),
            });
        }

        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Issue a GET and map HTTP/transport failures into the source taxonomy.
    async fn get_json(&self, url: Url) -> Result<serde_json::Value> {
        let response = self.client.get(url).send().await.map_err(map_transport_error)?;

        let status = response.status();
        if status.is_success() {
            return response
                .json::<serde_json::Value>()
                .await
                .map_err(|e| Error::Source(SourceError::Decode(e.to_string())));
        }

        let body = response.text().await.unwrap_or_default();
        Err(Error::Source(classify_http_failure(status.as_u16(), &body)))
    }
}

#[async_trait]
impl SearchSource for HttpSearchSource {
    async fn search(
        &self,
        credential: &str,
        query: &str,
        options: &SearchOptions,
    ) -> Result<Vec<VideoRef>> {
        let mut url = Url::parse(&format!("{}/search", self.base_url))
            .map_err(|e| Error::Source(SourceError::BadRequest(e.to_string())))?;

        {
            let mut pairs = url.query_pairs_mut();
            pairs
                .append_pair("part", "snippet")
                .append_pair("q", query)
                .append_pair(
                    "maxResults",
                    &options.max_results.min(Self::MAX_RESULTS_PER_CALL).to_string(),
                )
                .append_pair("type", "video")
                .append_pair("order", &options.order)
                .append_pair("regionCode", &options.region_code)
                .append_pair("relevanceLanguage", &options.relevance_language)
                .append_pair("key", credential);

            if let Some(after) = options.published_after {
                pairs.append_pair(
                    "publishedAfter",
                    &after.to_rfc3339_opts(SecondsFormat::Secs, true),
                );
            }
            if let Some(before) = options.published_before {
                pairs.append_pair(
                    "publishedBefore",
                    &before.to_rfc3339_opts(SecondsFormat::Secs, true),
                );
            }
        }

        tracing::info!(query, max_results = options.max_results, "Searching source");

        let body = self.get_json(url).await?;
        let items = body["items"].as_array().cloned().unwrap_or_default();

        let mut refs = Vec::with_capacity(items.len());
        for item in items {
            match serde_json::from_value::<WireSearchItem>(item) {
                Ok(wire) => {
                    let Some(video_id) = wire.id.video_id else {
                        continue;
                    };
                    refs.push(VideoRef {
                        video_id,
                        title: wire.snippet.title,
                        channel_id: wire.snippet.channel_id,
                    });
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Skipping malformed search result");
                }
            }
        }

        tracing::info!(count = refs.len(), query, "Search results retrieved");
        Ok(refs)
    }

    async fn fetch_details(&self, credential: &str, ids: &[String]) -> Result<Vec<VideoDetails>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut url = Url::parse(&format!("{}/videos", self.base_url))
            .map_err(|e| Error::Source(SourceError::BadRequest(e.to_string())))?;
        url.query_pairs_mut()
            .append_pair("part", "snippet,statistics,contentDetails,status")
            .append_pair("id", &ids.join(","))
            .append_pair("key", credential);

        let body = self.get_json(url).await?;
        let items = body["items"].as_array().cloned().unwrap_or_default();

        let mut details = Vec::with_capacity(items.len());
        for item in items {
            match serde_json::from_value::<WireVideoItem>(item) {
                Ok(wire) => details.push(wire.into_details()),
                Err(e) => {
                    tracing::warn!(error = %e, "Skipping malformed detail result");
                }
            }
        }

        tracing::info!(count = details.len(), "Detail results retrieved");
        Ok(details)
    }
}

fn map_transport_error(e: reqwest::Error) -> Error {
    if e.is_timeout() || e.is_connect() {
        Error::Source(SourceError::Transient(e.to_string()))
    } else {
        Error::Network(e)
    }
}

/// Map an HTTP failure status + body into the source error taxonomy.
///
/// 403 is ambiguous upstream: with a quota/rate reason in the body it means
/// rotation, without one it is a hard denial.
fn classify_http_failure(status: u16, body: &str) -> SourceError {
    match status {
        400 => SourceError::BadRequest(body.to_string()),
        403 if SourceError::is_quota_message(body) => SourceError::QuotaExceeded(body.to_string()),
        403 => SourceError::Denied(body.to_string()),
        429 => SourceError::QuotaExceeded(body.to_string()),
        500..=599 => SourceError::Transient(format!("upstream {}: {}", status, body)),
        _ => SourceError::BadRequest(format!("unexpected status {}: {}", status, body)),
    }
}

// --- wire format ----------------------------------------------------------

#[derive(Debug, Deserialize)]
struct WireSearchItem {
    id: WireSearchId,
    #[serde(default)]
    snippet: WireSnippet,
}

#[derive(Debug, Deserialize)]
struct WireSearchId {
    #[serde(rename = "videoId")]
    video_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct WireSnippet {
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
    #[serde(rename = "publishedAt")]
    published_at: Option<DateTime<Utc>>,
    #[serde(rename = "channelId", default)]
    channel_id: String,
    #[serde(rename = "channelTitle", default)]
    channel_title: String,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(rename = "categoryId")]
    category_id: Option<String>,
    #[serde(rename = "defaultLanguage")]
    default_language: Option<String>,
    #[serde(default)]
    country: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireVideoItem {
    id: String,
    #[serde(default)]
    snippet: WireSnippet,
    #[serde(default)]
    statistics: WireStatistics,
    #[serde(rename = "contentDetails", default)]
    content_details: WireContentDetails,
}

/// The upstream API serializes counters as decimal strings.
#[derive(Debug, Default, Deserialize)]
struct WireStatistics {
    #[serde(rename = "viewCount")]
    view_count: Option<String>,
    #[serde(rename = "likeCount")]
    like_count: Option<String>,
    #[serde(rename = "commentCount")]
    comment_count: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct WireContentDetails {
    #[serde(default)]
    duration: String,
    #[serde(default)]
    definition: String,
    #[serde(default)]
    caption: String,
}

impl WireVideoItem {
    fn into_details(self) -> VideoDetails {
        VideoDetails {
            video_id: self.id,
            title: self.snippet.title,
            description: self.snippet.description,
            published_at: self.snippet.published_at,
            channel_id: self.snippet.channel_id,
            channel_title: self.snippet.channel_title,
            channel_country: self.snippet.country,
            tags: self.snippet.tags,
            category_id: self.snippet.category_id,
            default_language: self.snippet.default_language,
            view_count: parse_count(self.statistics.view_count),
            like_count: parse_count(self.statistics.like_count),
            comment_count: parse_count(self.statistics.comment_count),
            duration: self.content_details.duration,
            hd: self.content_details.definition.eq_ignore_ascii_case("hd"),
            captions: self.content_details.caption.eq_ignore_ascii_case("true"),
        }
    }
}

fn parse_count(value: Option<String>) -> u64 {
    value.and_then(|v| v.parse().ok()).unwrap_or(0)
}
