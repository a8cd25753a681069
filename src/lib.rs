//! YouTube DeepSearch - search YouTube, rank results by outlier score, extract transcripts
//!
//! This library provides a quota-aware search pipeline over the YouTube Data API,
//! z-score based outlier ranking of results, and tiered transcript acquisition
//! (manual captions, auto-generated captions, then audio download + speech recognition).

pub mod cli;
pub mod config;
pub mod output;
pub mod quota;
pub mod search;
pub mod transcript;
pub mod utils;

pub use cli::{Cli, Commands, OutputFormat};
pub use config::Config;
pub use quota::{QuotaStatus, QuotaTracker};
pub use search::{
    ChannelVideoLister, SearchFilter, SearchPipeline, UploadPeriod, VideoRecord, VideoType,
};
pub use transcript::{
    AcquiredTranscript, AcquirerSettings, BatchTranscriptCoordinator, TranscriptAcquirer,
    TranscriptOutcome, TranscriptTier,
};

/// Result type used throughout the library
pub type Result<T> = anyhow::Result<T>;

/// Best-effort progress hook handed into long-running operations.
/// Receives human-readable stage strings; delivery is lossy by design.
pub type ProgressFn<'a> = &'a (dyn Fn(&str) + Send + Sync);

/// Error types specific to the search/transcript core
#[derive(thiserror::Error, Debug)]
pub enum DeepSearchError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("remote API request failed: {0}")]
    ApiRequest(String),

    #[error("caption source error: {0}")]
    CaptionSource(String),

    #[error("audio download is restricted for this video")]
    DownloadRestricted,

    #[error("speech recognition failed: {0}")]
    Recognition(String),
}
