use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::quota::{DAILY_QUOTA_LIMIT, QUOTA_WARNING_THRESHOLD};
use crate::search::DEFAULT_MAX_RESULTS;
use crate::DeepSearchError;

const PLACEHOLDER_API_KEY: &str = "YOUR_YOUTUBE_API_KEY_HERE";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// YouTube Data API settings
    pub api: ApiConfig,

    /// Transcript acquisition settings
    pub transcript: TranscriptConfig,

    /// Application settings
    pub app: AppConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Data API key; may also come from the YOUTUBE_API_KEY environment variable
    pub key: String,

    /// Daily request budget
    pub quota_limit: u64,

    /// Budget level that starts emitting warnings
    pub quota_warning_threshold: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptConfig {
    /// Caption languages in priority order
    pub caption_languages: Vec<String>,

    /// Language speech recognition is fixed to
    pub recognition_language: String,

    /// Whether the audio + speech recognition fallback may run
    pub allow_audio_fallback: bool,

    /// Whisper model name for the fallback tier
    pub whisper_model: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Pause between remote calls in milliseconds
    pub request_pacing_ms: u64,

    /// Default number of search results to gather
    pub default_max_results: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api: ApiConfig {
                key: String::new(),
                quota_limit: DAILY_QUOTA_LIMIT,
                quota_warning_threshold: QUOTA_WARNING_THRESHOLD,
            },
            transcript: TranscriptConfig {
                caption_languages: vec![
                    "ko".to_string(),
                    "en".to_string(),
                    "ja".to_string(),
                    "zh".to_string(),
                ],
                recognition_language: "ko".to_string(),
                allow_audio_fallback: true,
                whisper_model: "base".to_string(),
            },
            app: AppConfig {
                request_pacing_ms: 500,
                default_max_results: DEFAULT_MAX_RESULTS,
            },
        }
    }
}

impl ApiConfig {
    /// The configured API key, or a configuration error when it is missing
    /// or still the placeholder. Callers that need the Data API fail fast
    /// here instead of running degraded.
    pub fn require_key(&self) -> Result<&str> {
        let key = self.key.trim();
        if key.is_empty() || key == PLACEHOLDER_API_KEY {
            return Err(DeepSearchError::InvalidConfig(
                "no YouTube Data API key configured; set api.key in the config file or the YOUTUBE_API_KEY environment variable".to_string(),
            )
            .into());
        }
        Ok(key)
    }
}

impl Config {
    /// Load configuration from file or create default
    pub async fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        let mut config = if config_path.exists() {
            let content =
                fs_err::read_to_string(&config_path).context("Failed to read config file")?;

            let config: Config =
                serde_yaml::from_str(&content).context("Failed to parse config file")?;

            config.validate()?;
            config
        } else {
            let config = Self::default();
            config.save().await?;
            config
        };

        // The environment wins over the file so keys stay out of dotfiles
        if let Ok(key) = std::env::var("YOUTUBE_API_KEY") {
            if !key.trim().is_empty() {
                config.api.key = key;
            }
        }

        Ok(config)
    }

    /// Save configuration to file
    pub async fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            fs_err::create_dir_all(parent)?;
        }

        let content = serde_yaml::to_string(self).context("Failed to serialize config")?;

        fs_err::write(&config_path, content).context("Failed to write config file")?;

        Ok(())
    }

    /// Path of the active configuration file
    pub fn location() -> Result<PathBuf> {
        Self::config_path()
    }

    /// Get configuration file path
    fn config_path() -> Result<PathBuf> {
        // First try current directory for easy testing
        let local_config = PathBuf::from("config.yaml");
        if local_config.exists() {
            return Ok(local_config);
        }

        let config_dir = dirs::config_dir().context("Could not determine config directory")?;

        Ok(config_dir.join("yt-deepsearch").join("config.yaml"))
    }

    /// Validate configuration
    fn validate(&self) -> Result<()> {
        if self.api.quota_warning_threshold > self.api.quota_limit {
            anyhow::bail!("quota warning threshold must not exceed the quota limit");
        }

        if self.transcript.caption_languages.is_empty() {
            anyhow::bail!("at least one caption language must be configured");
        }

        if self.transcript.recognition_language.trim().is_empty() {
            anyhow::bail!("a recognition language must be configured");
        }

        Ok(())
    }

    /// Display current configuration
    pub fn display(&self) {
        println!("Current Configuration:");
        println!(
            "  API Key: {}",
            if self.api.key.is_empty() {
                "(not set)"
            } else {
                "(set)"
            }
        );
        println!(
            "  Quota: {}/{} warning threshold",
            self.api.quota_warning_threshold, self.api.quota_limit
        );
        println!(
            "  Caption Languages: {}",
            self.transcript.caption_languages.join(", ")
        );
        println!(
            "  Recognition Language: {}",
            self.transcript.recognition_language
        );
        println!(
            "  Audio Fallback: {}",
            self.transcript.allow_audio_fallback
        );
        println!("  Whisper Model: {}", self.transcript.whisper_model);
        println!("  Request Pacing: {}ms", self.app.request_pacing_ms);
    }
}
