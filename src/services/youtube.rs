//! YouTube Data API v3 client.
//!
//! Only two endpoints are used: `videos` (snippet, statistics and content
//! details for one id) and `commentThreads` (top-level comments, paged 100
//! at a time by relevance).

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use super::{ensure_success, ServiceError};
use crate::config::YouTubeConfig;

/// Longest description kept on [`VideoDetails`].
const DESCRIPTION_LIMIT: usize = 500;

/// Page size the API allows for `commentThreads`.
const COMMENT_PAGE_SIZE: usize = 100;

/// Metadata and statistics for one video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoDetails {
    pub video_id: String,
    pub title: String,
    pub description: String,
    pub channel: String,
    pub channel_id: String,
    pub published_at: String,
    pub view_count: u64,
    pub like_count: u64,
    pub comment_count: u64,
    pub thumbnail: Option<String>,
    /// ISO 8601 duration as reported, e.g. `PT4M13S`.
    pub duration: String,
    pub duration_seconds: u64,
    pub tags: Vec<String>,
    pub category_id: Option<String>,
    pub default_language: Option<String>,
}

/// A top-level comment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    pub author: String,
    pub text: String,
    pub published_at: String,
    pub like_count: u64,
    pub reply_count: u64,
}

/// Source of video data.
#[async_trait]
pub trait VideoSource: Send + Sync {
    /// Metadata for `video_id`. Unknown or private videos are
    /// [`ServiceError::NotFound`].
    async fn video_details(&self, video_id: &str) -> Result<VideoDetails, ServiceError>;

    /// Up to `max` top-level comments, most relevant first.
    async fn comments(&self, video_id: &str, max: usize) -> Result<Vec<Comment>, ServiceError>;
}

/// HTTP client for the YouTube Data API.
#[derive(Debug, Clone)]
pub struct YouTubeClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl YouTubeClient {
    /// Creates a client against `base_url` (normally
    /// `https://www.googleapis.com/youtube/v3`).
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, ServiceError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        })
    }

    pub fn from_config(config: &YouTubeConfig) -> Result<Self, ServiceError> {
        Self::new(
            config.base_url.clone(),
            config.api_key.clone(),
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    /// Returns `true` if an API key is configured.
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    fn endpoint(&self, resource: &str, params: &[(&str, &str)]) -> Result<Url, ServiceError> {
        let key = self
            .api_key
            .as_deref()
            .ok_or(ServiceError::MissingCredentials("YOUTUBE_API_KEY"))?;
        let mut url = Url::parse(&format!("{}/{resource}", self.base_url)).map_err(|e| {
            ServiceError::Connection {
                message: format!("invalid YouTube base URL: {e}"),
            }
        })?;
        url.query_pairs_mut()
            .extend_pairs(params.iter().copied())
            .append_pair("key", key);
        Ok(url)
    }
}

#[async_trait]
impl VideoSource for YouTubeClient {
    async fn video_details(&self, video_id: &str) -> Result<VideoDetails, ServiceError> {
        let url = self.endpoint(
            "videos",
            &[("part", "snippet,statistics,contentDetails"), ("id", video_id)],
        )?;
        let response = ensure_success(self.http.get(url).send().await?).await?;
        let list: VideoListResponse = response.json().await?;

        let item = list
            .items
            .into_iter()
            .next()
            .ok_or_else(|| ServiceError::NotFound {
                what: format!("video {video_id}"),
            })?;
        Ok(item.into_details())
    }

    async fn comments(&self, video_id: &str, max: usize) -> Result<Vec<Comment>, ServiceError> {
        let mut comments = Vec::new();
        let mut page_token: Option<String> = None;

        while comments.len() < max {
            let page_size = (max - comments.len()).min(COMMENT_PAGE_SIZE).to_string();
            let mut params = vec![
                ("part", "snippet"),
                ("videoId", video_id),
                ("maxResults", page_size.as_str()),
                ("order", "relevance"),
                ("textFormat", "plainText"),
            ];
            if let Some(token) = page_token.as_deref() {
                params.push(("pageToken", token));
            }
            let url = self.endpoint("commentThreads", &params)?;

            let response = ensure_success(self.http.get(url).send().await?).await?;
            let page: CommentThreadList = response.json().await?;
            debug!(video_id, fetched = page.items.len(), "comment page");

            comments.extend(page.items.into_iter().map(CommentThread::into_comment));
            match page.next_page_token {
                Some(next) if !next.is_empty() => page_token = Some(next),
                _ => break,
            }
        }

        comments.truncate(max);
        Ok(comments)
    }
}

/// Extracts an 11-character video id from a bare id or a YouTube URL.
///
/// Accepted URL shapes: `youtu.be/<id>`, `youtube.com/watch?v=<id>`,
/// `youtube.com/shorts/<id>`, `youtube.com/embed/<id>` and
/// `youtube.com/live/<id>`, on the `www.`, `m.` and `music.` hosts too.
///
/// # Examples
///
/// ```
/// use video_insights::services::youtube::extract_video_id;
///
/// assert_eq!(extract_video_id("dQw4w9WgXcQ").as_deref(), Some("dQw4w9WgXcQ"));
/// assert_eq!(
///     extract_video_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=42").as_deref(),
///     Some("dQw4w9WgXcQ")
/// );
/// assert_eq!(extract_video_id("https://youtu.be/dQw4w9WgXcQ").as_deref(), Some("dQw4w9WgXcQ"));
/// assert!(extract_video_id("https://example.com/watch?v=dQw4w9WgXcQ").is_none());
/// ```
pub fn extract_video_id(input: &str) -> Option<String> {
    let input = input.trim();
    if is_video_id(input) {
        return Some(input.to_string());
    }

    let url = Url::parse(input)
        .or_else(|_| Url::parse(&format!("https://{input}")))
        .ok()?;
    let host = url.host_str()?.to_ascii_lowercase();
    let mut segments = url.path_segments()?.filter(|s| !s.is_empty());

    let candidate = match host.as_str() {
        "youtu.be" | "www.youtu.be" => segments.next().map(str::to_string),
        "youtube.com" | "www.youtube.com" | "m.youtube.com" | "music.youtube.com" => {
            match segments.next() {
                Some("watch") => url
                    .query_pairs()
                    .find(|(key, _)| key == "v")
                    .map(|(_, value)| value.into_owned()),
                Some("shorts" | "embed" | "live" | "v") => segments.next().map(str::to_string),
                _ => None,
            }
        },
        _ => None,
    }?;

    is_video_id(&candidate).then_some(candidate)
}

fn is_video_id(candidate: &str) -> bool {
    candidate.len() == 11
        && candidate
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Seconds in an ISO 8601 duration such as `PT1H2M3S` or `P1DT30M`.
/// Unparseable input yields 0.
pub fn parse_iso8601_duration(value: &str) -> u64 {
    let Some(rest) = value.strip_prefix('P') else {
        return 0;
    };

    let mut total = 0u64;
    let mut number = String::new();
    let mut in_time = false;
    for c in rest.chars() {
        match c {
            '0'..='9' => number.push(c),
            'T' => in_time = true,
            unit => {
                let Ok(n) = number.parse::<u64>() else {
                    return 0;
                };
                number.clear();
                let scale = match (unit, in_time) {
                    ('W', false) => 7 * 86_400,
                    ('D', false) => 86_400,
                    ('H', true) => 3_600,
                    ('M', true) => 60,
                    ('S', true) => 1,
                    _ => return 0,
                };
                total = total.saturating_add(n.saturating_mul(scale));
            },
        }
    }
    total
}

// ---- API response shapes ----

#[derive(Deserialize)]
struct VideoListResponse {
    #[serde(default)]
    items: Vec<VideoItem>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoItem {
    id: String,
    snippet: VideoSnippet,
    #[serde(default)]
    statistics: VideoStatistics,
    #[serde(default)]
    content_details: ContentDetails,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoSnippet {
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    channel_title: String,
    #[serde(default)]
    channel_id: String,
    #[serde(default)]
    published_at: String,
    #[serde(default)]
    thumbnails: HashMap<String, Thumbnail>,
    #[serde(default)]
    tags: Vec<String>,
    category_id: Option<String>,
    default_language: Option<String>,
}

#[derive(Deserialize)]
struct Thumbnail {
    url: String,
}

/// Counts arrive as decimal strings.
#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct VideoStatistics {
    view_count: Option<String>,
    like_count: Option<String>,
    comment_count: Option<String>,
}

#[derive(Deserialize, Default)]
struct ContentDetails {
    #[serde(default)]
    duration: String,
}

fn count(value: Option<&String>) -> u64 {
    value.and_then(|v| v.parse().ok()).unwrap_or(0)
}

impl VideoItem {
    fn into_details(self) -> VideoDetails {
        let VideoItem {
            id,
            mut snippet,
            statistics,
            content_details,
        } = self;

        let thumbnail = ["medium", "high", "default"]
            .iter()
            .find_map(|size| snippet.thumbnails.remove(*size))
            .map(|t| t.url);
        let description = if snippet.description.chars().count() > DESCRIPTION_LIMIT {
            let cut: String = snippet.description.chars().take(DESCRIPTION_LIMIT).collect();
            format!("{cut}...")
        } else {
            snippet.description
        };

        VideoDetails {
            video_id: id,
            title: snippet.title,
            description,
            channel: snippet.channel_title,
            channel_id: snippet.channel_id,
            published_at: snippet.published_at,
            view_count: count(statistics.view_count.as_ref()),
            like_count: count(statistics.like_count.as_ref()),
            comment_count: count(statistics.comment_count.as_ref()),
            thumbnail,
            duration_seconds: parse_iso8601_duration(&content_details.duration),
            duration: content_details.duration,
            tags: snippet.tags,
            category_id: snippet.category_id,
            default_language: snippet.default_language,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommentThreadList {
    #[serde(default)]
    items: Vec<CommentThread>,
    next_page_token: Option<String>,
}

#[derive(Deserialize)]
struct CommentThread {
    snippet: ThreadSnippet,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ThreadSnippet {
    top_level_comment: TopLevelComment,
    #[serde(default)]
    total_reply_count: u64,
}

#[derive(Deserialize)]
struct TopLevelComment {
    id: String,
    snippet: CommentSnippet,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommentSnippet {
    #[serde(default)]
    author_display_name: String,
    #[serde(default)]
    text_display: String,
    text_original: Option<String>,
    #[serde(default)]
    published_at: String,
    #[serde(default)]
    like_count: u64,
}

impl CommentThread {
    fn into_comment(self) -> Comment {
        let ThreadSnippet {
            top_level_comment,
            total_reply_count,
        } = self.snippet;
        let snippet = top_level_comment.snippet;
        Comment {
            id: top_level_comment.id,
            author: snippet.author_display_name,
            text: snippet.text_original.unwrap_or(snippet.text_display),
            published_at: snippet.published_at,
            like_count: snippet.like_count,
            reply_count: total_reply_count,
        }
    }
}
