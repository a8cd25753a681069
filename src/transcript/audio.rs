use async_trait::async_trait;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

use crate::utils::check_command_available;
use crate::{DeepSearchError, Result};

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Source of downloadable audio for a video
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AudioSource: Send + Sync {
    /// Probe the video's duration in seconds without downloading it
    async fn probe_duration(&self, video_id: &str) -> Result<u64>;

    /// Download the best available audio as a wav file into `dest_dir`.
    /// Restricted downloads fail with [`DeepSearchError::DownloadRestricted`].
    async fn download_audio(&self, video_id: &str, dest_dir: &Path) -> Result<()>;
}

/// Speech-to-text backend. `load` warms the model and is called at most
/// once per acquirer instance before the first transcription.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SpeechRecognizer: Send + Sync {
    async fn load(&self) -> Result<()>;

    async fn transcribe(&self, audio_path: &Path, language: &str) -> Result<String>;
}

/// Audio extractor using yt-dlp
pub struct YtDlpAudioSource {
    yt_dlp_path: String,
}

impl YtDlpAudioSource {
    pub fn new() -> Self {
        Self {
            yt_dlp_path: "yt-dlp".to_string(),
        }
    }

    /// Get video metadata using yt-dlp
    async fn get_video_info(&self, video_id: &str) -> Result<Value> {
        tracing::debug!(video_id, "probing video metadata");

        let url = watch_url(video_id);
        let output = Command::new(&self.yt_dlp_path)
            .args(["--dump-json", "--no-playlist", &url])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await?;

        if !output.status.success() {
            let error = String::from_utf8_lossy(&output.stderr);
            if is_restricted_message(&error) {
                return Err(DeepSearchError::DownloadRestricted.into());
            }
            anyhow::bail!("yt-dlp failed to probe the video: {}", error);
        }

        let json_str = String::from_utf8(output.stdout)?;
        let info: Value = serde_json::from_str(&json_str)?;

        Ok(info)
    }
}

#[async_trait]
impl AudioSource for YtDlpAudioSource {
    async fn probe_duration(&self, video_id: &str) -> Result<u64> {
        let info = self.get_video_info(video_id).await?;
        Ok(info["duration"].as_f64().unwrap_or(0.0) as u64)
    }

    async fn download_audio(&self, video_id: &str, dest_dir: &Path) -> Result<()> {
        tracing::debug!(video_id, "downloading audio");

        let url = watch_url(video_id);
        let output_template = dest_dir.join(format!("{video_id}.%(ext)s"));

        let output = Command::new(&self.yt_dlp_path)
            .arg("--output")
            .arg(&output_template)
            .args([
                // Smallest stream that still transcribes well
                "--format",
                "bestaudio[ext=webm]/bestaudio[ext=m4a]/bestaudio",
                "--extract-audio",
                "--audio-format",
                "wav",
                "--no-playlist",
                "--retries",
                "3",
                "--fragment-retries",
                "3",
                "--no-warnings",
                "--quiet",
                "--user-agent",
                USER_AGENT,
                &url,
            ])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await?;

        if !output.status.success() {
            let error = String::from_utf8_lossy(&output.stderr);
            if is_restricted_message(&error) {
                return Err(DeepSearchError::DownloadRestricted.into());
            }
            anyhow::bail!("yt-dlp failed to download audio: {}", error);
        }

        Ok(())
    }
}

impl Default for YtDlpAudioSource {
    fn default() -> Self {
        Self::new()
    }
}

/// Speech recognizer shelling out to the whisper command-line tool
pub struct WhisperCliRecognizer {
    whisper_path: String,
    model: String,
}

impl WhisperCliRecognizer {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            whisper_path: "whisper".to_string(),
            model: model.into(),
        }
    }
}

#[async_trait]
impl SpeechRecognizer for WhisperCliRecognizer {
    async fn load(&self) -> Result<()> {
        if !check_command_available(&self.whisper_path).await {
            return Err(DeepSearchError::Recognition(
                "the whisper command-line tool is not available".to_string(),
            )
            .into());
        }

        tracing::info!(model = %self.model, "speech recognition ready");
        Ok(())
    }

    async fn transcribe(&self, audio_path: &Path, language: &str) -> Result<String> {
        let out_dir = audio_path.parent().unwrap_or_else(|| Path::new("."));

        tracing::debug!(audio = %audio_path.display(), language, "running speech recognition");

        let output = Command::new(&self.whisper_path)
            .arg(audio_path)
            .arg("--model")
            .arg(&self.model)
            .arg("--language")
            .arg(language)
            .arg("--task")
            .arg("transcribe")
            .arg("--output_format")
            .arg("txt")
            .arg("--output_dir")
            .arg(out_dir)
            .arg("--fp16")
            .arg("False")
            .arg("--verbose")
            .arg("False")
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await?;

        if !output.status.success() {
            let error = String::from_utf8_lossy(&output.stderr);
            return Err(DeepSearchError::Recognition(error.into_owned()).into());
        }

        // Whisper writes <input stem>.txt next to the audio file
        let stem = audio_path
            .file_stem()
            .ok_or_else(|| DeepSearchError::Recognition("audio path has no file stem".into()))?;
        let transcript_path = out_dir.join(stem).with_extension("txt");

        let text = fs_err::read_to_string(&transcript_path).map_err(|e| {
            DeepSearchError::Recognition(format!("no transcript output produced: {e}"))
        })?;

        Ok(text)
    }
}

/// Find the wav artifact a download produced for `video_id`, if any
pub(crate) fn find_audio_artifact(dir: &Path, video_id: &str) -> Option<PathBuf> {
    let entries = std::fs::read_dir(dir).ok()?;

    for entry in entries.flatten() {
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if name.starts_with(video_id) && name.ends_with(".wav") {
            return Some(entry.path());
        }
    }

    None
}

fn watch_url(video_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={video_id}")
}

fn is_restricted_message(stderr: &str) -> bool {
    stderr.contains("403") || stderr.contains("Forbidden")
}
