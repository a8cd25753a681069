use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

pub mod scoring;
pub mod youtube;

pub use scoring::assign_outlier_scores;
pub use youtube::{SearchPage, VideoDataApi, VideoDetail, YouTubeDataApi};

use crate::quota::{
    QuotaTracker, CHANNEL_LIST_COST, PLAYLIST_LIST_COST, SEARCH_LIST_COST, VIDEO_LIST_COST,
};
use crate::utils::parse_duration;
use crate::{ProgressFn, Result};

/// Per-request cap of the listing endpoints
pub const MAX_RESULTS_PER_REQUEST: usize = 50;

/// Default number of records a search gathers
pub const DEFAULT_MAX_RESULTS: usize = 100;

/// Videos at or under this many seconds count as shorts
pub const SHORTS_MAX_DURATION: u64 = 60;

/// Long-form videos must exceed this many seconds (20 minutes)
pub const LONG_FORM_MIN_DURATION: u64 = 1_200;

/// One enriched, scored search result.
///
/// `outlier_score` is set once per batch after the full result set is known;
/// it is only comparable to other scores from the same batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VideoRecord {
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
    pub subscriber_count: u64,
    pub duration_seconds: u64,
    pub outlier_score: f64,
    pub url: String,
}

impl VideoRecord {
    fn from_detail(detail: VideoDetail, subscriber_count: u64) -> Self {
        let duration_seconds = parse_duration(&detail.duration);
        let url = format!("https://www.youtube.com/watch?v={}", detail.video_id);
        Self {
            video_id: detail.video_id,
            title: detail.title,
            channel_id: detail.channel_id,
            channel_title: detail.channel_title,
            published_at: detail.published_at,
            description: detail.description,
            thumbnail_url: detail.thumbnail_url,
            view_count: detail.view_count,
            like_count: detail.like_count,
            comment_count: detail.comment_count,
            subscriber_count,
            duration_seconds,
            outlier_score: 0.0,
            url,
        }
    }
}

/// Duration-based video class filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum VideoType {
    #[default]
    Any,
    /// Short-form videos (60 seconds or less)
    Shorts,
    /// Videos over 20 minutes
    LongForm,
}

/// Lower bound on publish time, relative to now
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum UploadPeriod {
    #[default]
    Any,
    Day,
    Week,
    Month,
    ThreeMonths,
    Year,
}

impl UploadPeriod {
    /// Cutoff timestamp for the period; `Any` applies no bound
    pub fn cutoff(&self) -> Option<DateTime<Utc>> {
        let span = match self {
            UploadPeriod::Any => return None,
            UploadPeriod::Day => Duration::days(1),
            UploadPeriod::Week => Duration::weeks(1),
            UploadPeriod::Month => Duration::days(30),
            UploadPeriod::ThreeMonths => Duration::days(90),
            UploadPeriod::Year => Duration::days(365),
        };
        Some(Utc::now() - span)
    }
}

/// Ephemeral per-search criteria
#[derive(Debug, Clone)]
pub struct SearchFilter {
    pub keyword: String,
    pub video_type: VideoType,
    pub min_views: u64,
    pub max_subscribers: Option<u64>,
    pub upload_period: UploadPeriod,
    pub max_results: usize,
}

impl Default for SearchFilter {
    fn default() -> Self {
        Self {
            keyword: String::new(),
            video_type: VideoType::Any,
            min_views: 0,
            max_subscribers: None,
            upload_period: UploadPeriod::Any,
            max_results: DEFAULT_MAX_RESULTS,
        }
    }
}

impl SearchFilter {
    fn matches(&self, record: &VideoRecord, published_after: Option<DateTime<Utc>>) -> bool {
        if record.view_count < self.min_views {
            return false;
        }

        if let Some(max) = self.max_subscribers {
            if record.subscriber_count > max {
                return false;
            }
        }

        if let Some(cutoff) = published_after {
            if record.published_at < cutoff {
                return false;
            }
        }

        match self.video_type {
            VideoType::Any => true,
            VideoType::Shorts => record.duration_seconds <= SHORTS_MAX_DURATION,
            VideoType::LongForm => record.duration_seconds > LONG_FORM_MIN_DURATION,
        }
    }
}

/// Orchestrates paginated keyword search, enrichment, filtering and scoring
pub struct SearchPipeline {
    api: Arc<dyn VideoDataApi>,
    quota: Arc<QuotaTracker>,
}

impl SearchPipeline {
    pub fn new(api: Arc<dyn VideoDataApi>, quota: Arc<QuotaTracker>) -> Self {
        Self { api, quota }
    }

    /// Run a full search. On any remote failure the whole operation aborts
    /// and an empty list is returned - partial batches are never passed off
    /// as complete results.
    pub async fn search(
        &self,
        filter: &SearchFilter,
        progress: Option<ProgressFn<'_>>,
    ) -> Vec<VideoRecord> {
        match self.run_search(filter, progress).await {
            Ok(records) => records,
            Err(error) => {
                tracing::error!(error = %format!("{error:#}"), "search aborted");
                Vec::new()
            }
        }
    }

    async fn run_search(
        &self,
        filter: &SearchFilter,
        progress: Option<ProgressFn<'_>>,
    ) -> Result<Vec<VideoRecord>> {
        anyhow::ensure!(
            !filter.keyword.trim().is_empty(),
            "search keyword must not be empty"
        );

        report(progress, "Preparing search filters...");
        let published_after = filter.upload_period.cutoff();

        let mut records: Vec<VideoRecord> = Vec::new();
        let mut page_token: Option<String> = None;
        let mut page_count = 0u32;

        while records.len() < filter.max_results {
            page_count += 1;
            report(
                progress,
                &format!(
                    "Searching... page {page_count} ({}/{})",
                    records.len(),
                    filter.max_results
                ),
            );

            // The final page shrinks to exactly fill max_results.
            let page_size =
                (filter.max_results - records.len()).min(MAX_RESULTS_PER_REQUEST) as u32;

            let page_cost = SEARCH_LIST_COST + VIDEO_LIST_COST + CHANNEL_LIST_COST;
            if !self.quota.available(page_cost) {
                tracing::warn!(
                    page = page_count,
                    "insufficient quota for another page, stopping pagination"
                );
                break;
            }

            let page = self
                .api
                .search_page(
                    &filter.keyword,
                    page_size,
                    published_after,
                    page_token.as_deref(),
                )
                .await?;
            self.quota.consume(SEARCH_LIST_COST);

            if page.video_ids.is_empty() {
                break;
            }

            let enriched = enrich_ids(self.api.as_ref(), &self.quota, &page.video_ids).await?;
            report(
                progress,
                &format!("Analyzing video details... ({} videos)", enriched.len()),
            );

            records.extend(
                enriched
                    .into_iter()
                    .filter(|record| filter.matches(record, published_after)),
            );

            page_token = page.next_page_token;
            if page_token.is_none() {
                break;
            }
        }

        report(progress, "Computing outlier scores...");
        assign_outlier_scores(&mut records);
        records.truncate(filter.max_results);

        report(progress, "Search complete");
        Ok(records)
    }
}

/// Paginates a channel's full upload list through the same enrichment and
/// scoring path as [`SearchPipeline`], without keyword or date filtering
pub struct ChannelVideoLister {
    api: Arc<dyn VideoDataApi>,
    quota: Arc<QuotaTracker>,
}

impl ChannelVideoLister {
    pub fn new(api: Arc<dyn VideoDataApi>, quota: Arc<QuotaTracker>) -> Self {
        Self { api, quota }
    }

    /// List a channel's uploads, scored over the complete batch.
    /// Shares the abort-to-empty failure policy with search.
    pub async fn list(
        &self,
        channel_id: &str,
        max_results: usize,
        progress: Option<ProgressFn<'_>>,
    ) -> Vec<VideoRecord> {
        match self.run_list(channel_id, max_results, progress).await {
            Ok(records) => records,
            Err(error) => {
                tracing::error!(
                    channel_id,
                    error = %format!("{error:#}"),
                    "channel listing aborted"
                );
                Vec::new()
            }
        }
    }

    async fn run_list(
        &self,
        channel_id: &str,
        max_results: usize,
        progress: Option<ProgressFn<'_>>,
    ) -> Result<Vec<VideoRecord>> {
        if !self.quota.available(CHANNEL_LIST_COST) {
            tracing::warn!(channel_id, "insufficient quota to resolve the uploads playlist");
            return Ok(Vec::new());
        }

        let Some(playlist_id) = self.api.uploads_playlist(channel_id).await? else {
            tracing::warn!(channel_id, "channel has no uploads playlist");
            return Ok(Vec::new());
        };
        self.quota.consume(CHANNEL_LIST_COST);

        let mut records: Vec<VideoRecord> = Vec::new();
        let mut page_token: Option<String> = None;
        let mut page_count = 0u32;

        while records.len() < max_results {
            page_count += 1;
            report(
                progress,
                &format!(
                    "Loading channel videos... page {page_count} ({}/{max_results})",
                    records.len()
                ),
            );

            let page_size = (max_results - records.len()).min(MAX_RESULTS_PER_REQUEST) as u32;

            let page_cost = PLAYLIST_LIST_COST + VIDEO_LIST_COST + CHANNEL_LIST_COST;
            if !self.quota.available(page_cost) {
                tracing::warn!(
                    page = page_count,
                    "insufficient quota for another page, stopping pagination"
                );
                break;
            }

            let page = self
                .api
                .playlist_page(&playlist_id, page_size, page_token.as_deref())
                .await?;
            self.quota.consume(PLAYLIST_LIST_COST);

            if page.video_ids.is_empty() {
                break;
            }

            let enriched = enrich_ids(self.api.as_ref(), &self.quota, &page.video_ids).await?;
            records.extend(enriched);

            page_token = page.next_page_token;
            if page_token.is_none() {
                break;
            }
        }

        report(progress, "Computing outlier scores...");
        assign_outlier_scores(&mut records);
        records.truncate(max_results);

        Ok(records)
    }
}

/// Fetch item detail and channel statistics for one page of ids and build
/// records. Channel ids are deduplicated so each page costs one detail call
/// plus one statistics call. Any failure aborts the caller's whole operation.
async fn enrich_ids(
    api: &dyn VideoDataApi,
    quota: &QuotaTracker,
    video_ids: &[String],
) -> Result<Vec<VideoRecord>> {
    if video_ids.is_empty() {
        return Ok(Vec::new());
    }

    let details = api.video_details(video_ids).await?;
    quota.consume(VIDEO_LIST_COST);

    let mut channel_ids: Vec<String> = details.iter().map(|d| d.channel_id.clone()).collect();
    channel_ids.sort();
    channel_ids.dedup();

    let subscribers: HashMap<String, u64> = api.channel_statistics(&channel_ids).await?;
    quota.consume(CHANNEL_LIST_COST);

    Ok(details
        .into_iter()
        .map(|detail| {
            let subscriber_count = subscribers.get(&detail.channel_id).copied().unwrap_or(0);
            VideoRecord::from_detail(detail, subscriber_count)
        })
        .collect())
}

fn report(progress: Option<ProgressFn<'_>>, message: &str) {
    if let Some(callback) = progress {
        callback(message);
    }
}
