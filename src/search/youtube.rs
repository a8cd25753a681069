use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Deserialize;
use std::collections::HashMap;

use crate::config::ApiConfig;
use crate::{DeepSearchError, Result};

const API_BASE: &str = "https://www.googleapis.com/youtube/v3";

/// One page of video ids from a paginated listing endpoint
#[derive(Debug, Clone, PartialEq)]
pub struct SearchPage {
    pub video_ids: Vec<String>,
    pub next_page_token: Option<String>,
}

/// Full per-video detail from the item endpoint; subscriber counts come
/// separately from [`VideoDataApi::channel_statistics`].
#[derive(Debug, Clone, PartialEq)]
pub struct VideoDetail {
    pub video_id: String,
    pub title: String,
    pub channel_id: String,
    pub channel_title: String,
    pub published_at: DateTime<Utc>,
    pub description: String,
    pub thumbnail_url: String,
    pub view_count: u64,
    pub like_count: u64,
    pub comment_count: u64,
    /// Raw compact duration token (e.g. `PT15M33S`)
    pub duration: String,
}

/// Remote search/list/detail endpoints the pipeline runs against
#[async_trait]
pub trait VideoDataApi: Send + Sync {
    /// Fetch one page of keyword search results
    async fn search_page(
        &self,
        query: &str,
        page_size: u32,
        published_after: Option<DateTime<Utc>>,
        page_token: Option<&str>,
    ) -> Result<SearchPage>;

    /// Fetch one page of a playlist's items
    async fn playlist_page(
        &self,
        playlist_id: &str,
        page_size: u32,
        page_token: Option<&str>,
    ) -> Result<SearchPage>;

    /// Fetch full detail for a batch of video ids
    async fn video_details(&self, video_ids: &[String]) -> Result<Vec<VideoDetail>>;

    /// Fetch subscriber counts for a batch of channel ids
    async fn channel_statistics(&self, channel_ids: &[String]) -> Result<HashMap<String, u64>>;

    /// Resolve a channel's "all uploads" playlist id
    async fn uploads_playlist(&self, channel_id: &str) -> Result<Option<String>>;
}

/// YouTube Data API v3 client
pub struct YouTubeDataApi {
    client: reqwest::Client,
    api_key: String,
}

impl YouTubeDataApi {
    /// Build a client from configuration. Fails fast on a missing or
    /// placeholder API key rather than operating in a degraded mode.
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let api_key = config.require_key()?.to_string();

        let client = reqwest::Client::builder()
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self { client, api_key })
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str, what: &str) -> Result<T> {
        tracing::debug!(endpoint = what, "issuing Data API request");

        let response = self
            .client
            .get(url)
            .header("Accept", "application/json")
            .send()
            .await
            .with_context(|| format!("failed to reach the {what} endpoint"))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let snippet: String = body.chars().take(200).collect();
            return Err(DeepSearchError::ApiRequest(format!(
                "{what} request returned HTTP {status}: {snippet}"
            ))
            .into());
        }

        response
            .json::<T>()
            .await
            .with_context(|| format!("failed to parse the {what} response"))
    }
}

#[async_trait]
impl VideoDataApi for YouTubeDataApi {
    async fn search_page(
        &self,
        query: &str,
        page_size: u32,
        published_after: Option<DateTime<Utc>>,
        page_token: Option<&str>,
    ) -> Result<SearchPage> {
        let mut url = format!(
            "{API_BASE}/search?part=snippet&type=video&order=relevance&q={}&maxResults={}&key={}",
            urlencoding::encode(query),
            page_size,
            self.api_key,
        );
        if let Some(after) = published_after {
            url.push_str(&format!(
                "&publishedAfter={}",
                after.to_rfc3339_opts(SecondsFormat::Secs, true)
            ));
        }
        if let Some(token) = page_token {
            url.push_str(&format!("&pageToken={token}"));
        }

        let response: SearchListResponse = self.get_json(&url, "search.list").await?;

        Ok(SearchPage {
            video_ids: response
                .items
                .into_iter()
                .filter_map(|item| item.id.video_id)
                .collect(),
            next_page_token: response.next_page_token,
        })
    }

    async fn playlist_page(
        &self,
        playlist_id: &str,
        page_size: u32,
        page_token: Option<&str>,
    ) -> Result<SearchPage> {
        let mut url = format!(
            "{API_BASE}/playlistItems?part=snippet&playlistId={}&maxResults={}&key={}",
            urlencoding::encode(playlist_id),
            page_size,
            self.api_key,
        );
        if let Some(token) = page_token {
            url.push_str(&format!("&pageToken={token}"));
        }

        let response: PlaylistItemsResponse = self.get_json(&url, "playlistItems.list").await?;

        Ok(SearchPage {
            video_ids: response
                .items
                .into_iter()
                .filter_map(|item| item.snippet.resource_id.video_id)
                .collect(),
            next_page_token: response.next_page_token,
        })
    }

    async fn video_details(&self, video_ids: &[String]) -> Result<Vec<VideoDetail>> {
        if video_ids.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!(
            "{API_BASE}/videos?part=snippet,statistics,contentDetails&id={}&key={}",
            video_ids.join(","),
            self.api_key,
        );

        let response: VideoListResponse = self.get_json(&url, "videos.list").await?;

        Ok(response
            .items
            .into_iter()
            .map(|item| VideoDetail {
                video_id: item.id,
                title: item.snippet.title,
                channel_id: item.snippet.channel_id,
                channel_title: item.snippet.channel_title,
                published_at: item.snippet.published_at,
                description: item.snippet.description,
                thumbnail_url: item
                    .snippet
                    .thumbnails
                    .high
                    .map(|t| t.url)
                    .unwrap_or_default(),
                view_count: parse_stat(item.statistics.view_count.as_deref()),
                like_count: parse_stat(item.statistics.like_count.as_deref()),
                comment_count: parse_stat(item.statistics.comment_count.as_deref()),
                duration: item.content_details.duration,
            })
            .collect())
    }

    async fn channel_statistics(&self, channel_ids: &[String]) -> Result<HashMap<String, u64>> {
        if channel_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let url = format!(
            "{API_BASE}/channels?part=statistics&id={}&key={}",
            channel_ids.join(","),
            self.api_key,
        );

        let response: ChannelListResponse = self.get_json(&url, "channels.list").await?;

        Ok(response
            .items
            .into_iter()
            .map(|item| {
                let subscribers = parse_stat(item.statistics.subscriber_count.as_deref());
                (item.id, subscribers)
            })
            .collect())
    }

    async fn uploads_playlist(&self, channel_id: &str) -> Result<Option<String>> {
        let url = format!(
            "{API_BASE}/channels?part=contentDetails&id={}&key={}",
            urlencoding::encode(channel_id),
            self.api_key,
        );

        let response: ChannelContentResponse = self.get_json(&url, "channels.list").await?;

        Ok(response
            .items
            .into_iter()
            .next()
            .and_then(|item| item.content_details.related_playlists.uploads))
    }
}

// Statistics arrive as JSON strings; absent or unparsable values count as 0.
fn parse_stat(value: Option<&str>) -> u64 {
    value.and_then(|v| v.parse().ok()).unwrap_or(0)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchListResponse {
    next_page_token: Option<String>,
    #[serde(default)]
    items: Vec<SearchResultItem>,
}

#[derive(Debug, Deserialize)]
struct SearchResultItem {
    id: SearchResultId,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchResultId {
    video_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistItemsResponse {
    next_page_token: Option<String>,
    #[serde(default)]
    items: Vec<PlaylistItem>,
}

#[derive(Debug, Deserialize)]
struct PlaylistItem {
    snippet: PlaylistSnippet,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistSnippet {
    resource_id: PlaylistResourceId,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistResourceId {
    video_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct VideoListResponse {
    #[serde(default)]
    items: Vec<VideoItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoItem {
    id: String,
    snippet: VideoSnippet,
    #[serde(default)]
    statistics: VideoStatistics,
    content_details: VideoContentDetails,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoSnippet {
    title: String,
    channel_id: String,
    channel_title: String,
    published_at: DateTime<Utc>,
    #[serde(default)]
    description: String,
    #[serde(default)]
    thumbnails: Thumbnails,
}

#[derive(Debug, Default, Deserialize)]
struct Thumbnails {
    high: Option<Thumbnail>,
}

#[derive(Debug, Deserialize)]
struct Thumbnail {
    url: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoStatistics {
    view_count: Option<String>,
    like_count: Option<String>,
    comment_count: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoContentDetails {
    #[serde(default)]
    duration: String,
}

#[derive(Debug, Deserialize)]
struct ChannelListResponse {
    #[serde(default)]
    items: Vec<ChannelItem>,
}

#[derive(Debug, Deserialize)]
struct ChannelItem {
    id: String,
    #[serde(default)]
    statistics: ChannelStatistics,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChannelStatistics {
    subscriber_count: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChannelContentResponse {
    #[serde(default)]
    items: Vec<ChannelContentItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChannelContentItem {
    content_details: ChannelContentDetails,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChannelContentDetails {
    related_playlists: RelatedPlaylists,
}

#[derive(Debug, Deserialize)]
struct RelatedPlaylists {
    uploads: Option<String>,
}
