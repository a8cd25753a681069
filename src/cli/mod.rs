use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::search::{UploadPeriod, VideoType};

#[derive(Parser)]
#[command(
    name = "deepsearch",
    about = "YouTube DeepSearch - find outlier videos and extract their transcripts",
    version,
    long_about = "Searches YouTube through the Data API, ranks results by how far each video's view-to-subscriber ratio sits from its batch, and extracts transcripts via captions with an optional Whisper fallback."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable progress output
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Search videos by keyword and rank them by outlier score
    Search {
        /// Search keyword
        #[arg(value_name = "KEYWORD")]
        keyword: String,

        /// Restrict results by video length
        #[arg(long, value_enum, default_value = "any")]
        video_type: VideoType,

        /// Minimum view count
        #[arg(long, default_value = "0")]
        min_views: u64,

        /// Maximum channel subscriber count
        #[arg(long, value_name = "COUNT")]
        max_subscribers: Option<u64>,

        /// Only include videos uploaded within this period
        #[arg(long, value_enum, default_value = "any")]
        period: UploadPeriod,

        /// Number of results to gather (defaults to the configured value)
        #[arg(short = 'n', long, value_name = "COUNT")]
        max_results: Option<usize>,

        /// Output file path (prints to console if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// List a channel's uploads ranked by outlier score
    Channel {
        /// Channel id (UC...)
        #[arg(value_name = "CHANNEL_ID")]
        channel_id: String,

        /// Number of videos to gather
        #[arg(short = 'n', long, default_value = "50", value_name = "COUNT")]
        max_results: usize,

        /// Output file path (prints to console if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Extract transcripts for one or more videos
    Transcripts {
        /// Video ids or YouTube URLs
        #[arg(value_name = "VIDEO", required = true)]
        videos: Vec<String>,

        /// Never fall back to audio download + speech recognition
        #[arg(long)]
        captions_only: bool,

        /// Save each transcript as <video id>.txt in this directory
        #[arg(long, value_name = "DIR")]
        output_dir: Option<PathBuf>,
    },

    /// Show or initialize the configuration
    Config {
        /// Show current configuration
        #[arg(short, long)]
        show: bool,
    },
}

#[derive(ValueEnum, Clone, Debug)]
pub enum OutputFormat {
    /// Plain text table
    Text,
    /// JSON records
    Json,
    /// CSV rows
    Csv,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Csv => write!(f, "csv"),
        }
    }
}
