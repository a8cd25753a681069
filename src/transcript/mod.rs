use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use tokio::sync::OnceCell;

pub mod audio;
pub mod captions;

pub use audio::{AudioSource, SpeechRecognizer, WhisperCliRecognizer, YtDlpAudioSource};
pub use captions::{CaptionSource, CaptionTrack, InnerTubeCaptions};

use crate::quota::QuotaTracker;
use crate::{DeepSearchError, ProgressFn};
use audio::find_audio_artifact;
use captions::clean_caption_fragments;

/// Captions below this trimmed length carry no meaningful transcript
const MIN_CAPTION_CHARS: usize = 50;

/// Recognized text at or below this trimmed length is discarded
const MIN_RECOGNIZED_CHARS: usize = 10;

/// Videos longer than this are never downloaded for recognition
const MAX_AUDIO_DURATION_SECS: u64 = 600;

/// Cheapest paid Data API call; quota below this forces caption-only mode
const CHEAPEST_PAID_CALL_COST: u64 = 1;

/// Fixed diagnostic: no caption tier produced a transcript and the audio
/// fallback was unavailable, disabled, or skipped
pub const NO_CAPTIONS_AVAILABLE: &str = "no captions available";

/// Fixed diagnostic: the probed duration exceeds the recognition ceiling
pub const VIDEO_TOO_LONG: &str =
    "video too long for speech recognition, skipped (over 10 minutes)";

/// Fixed diagnostic: the audio download is access-restricted
pub const DOWNLOAD_RESTRICTED: &str =
    "audio download is restricted for this video, cannot extract a transcript";

/// Fixed diagnostic: recognition produced no meaningful text
pub const TRANSCRIPT_TOO_SHORT: &str = "recognized transcript too short to be meaningful";

/// Fixed diagnostic: the download finished but left no usable audio file
pub const AUDIO_EXTRACTION_FAILED: &str = "audio extraction produced no usable file";

/// The tier a transcript came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranscriptTier {
    ManualCaption,
    AutoCaption,
    SpeechRecognition,
}

impl std::fmt::Display for TranscriptTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TranscriptTier::ManualCaption => write!(f, "manual caption"),
            TranscriptTier::AutoCaption => write!(f, "auto caption"),
            TranscriptTier::SpeechRecognition => write!(f, "speech recognition"),
        }
    }
}

/// A successfully acquired transcript with its provenance
#[derive(Debug, Clone, PartialEq)]
pub struct AcquiredTranscript {
    pub text: String,
    pub tier: TranscriptTier,
    pub language: String,
}

impl AcquiredTranscript {
    /// Provenance tag, e.g. `manual caption, ko`
    pub fn provenance(&self) -> String {
        format!("{}, {}", self.tier, self.language)
    }
}

/// Per-call result of transcript acquisition: either a non-empty transcript
/// with provenance, or an explicit non-empty diagnostic. Never an empty
/// success.
#[derive(Debug, Clone, PartialEq)]
pub enum TranscriptOutcome {
    Transcript(AcquiredTranscript),
    Unavailable { reason: String },
}

impl TranscriptOutcome {
    fn unavailable(reason: impl Into<String>) -> Self {
        TranscriptOutcome::Unavailable {
            reason: reason.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, TranscriptOutcome::Transcript(_))
    }
}

/// How the audio-fallback tier will be handled, resolved once at the start
/// of each acquisition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackPolicy {
    Enabled,
    DisabledByCaller,
    /// Remaining quota cannot cover even the cheapest paid call; the
    /// expensive tier is skipped regardless of caller preference
    QuotaPreserving,
    RecognizerUnavailable,
}

/// Tuning knobs for [`TranscriptAcquirer`]
#[derive(Debug, Clone)]
pub struct AcquirerSettings {
    /// Caption languages in priority order
    pub caption_languages: Vec<String>,
    /// Language the recognizer is fixed to
    pub recognition_language: String,
    /// Caller preference for the audio-fallback tier
    pub allow_audio_fallback: bool,
    /// Pause between remote calls to avoid rate limiting
    pub pacing: Duration,
}

impl Default for AcquirerSettings {
    fn default() -> Self {
        Self {
            caption_languages: vec![
                "ko".to_string(),
                "en".to_string(),
                "ja".to_string(),
                "zh".to_string(),
            ],
            recognition_language: "ko".to_string(),
            allow_audio_fallback: true,
            pacing: Duration::from_millis(500),
        }
    }
}

/// Tiered transcript acquisition: manual captions, then auto-generated
/// captions, then (policy permitting) audio download + speech recognition.
///
/// Not safe for concurrent calls against one instance; serialize access or
/// use separate instances.
pub struct TranscriptAcquirer {
    quota: Arc<QuotaTracker>,
    captions: Arc<dyn CaptionSource>,
    audio: Arc<dyn AudioSource>,
    /// `None` means speech recognition capability is absent
    recognizer: Option<Arc<dyn SpeechRecognizer>>,
    recognizer_ready: OnceCell<()>,
    settings: AcquirerSettings,
}

impl TranscriptAcquirer {
    pub fn new(
        quota: Arc<QuotaTracker>,
        captions: Arc<dyn CaptionSource>,
        audio: Arc<dyn AudioSource>,
        recognizer: Option<Arc<dyn SpeechRecognizer>>,
        settings: AcquirerSettings,
    ) -> Self {
        Self {
            quota,
            captions,
            audio,
            recognizer,
            recognizer_ready: OnceCell::new(),
            settings,
        }
    }

    /// Resolve how the audio-fallback tier will be handled for one call.
    /// Quota preservation overrides the caller preference.
    pub fn resolve_fallback_policy(&self) -> FallbackPolicy {
        if !self.quota.available(CHEAPEST_PAID_CALL_COST) {
            tracing::warn!("quota nearly exhausted, forcing caption-only transcript mode");
            FallbackPolicy::QuotaPreserving
        } else if !self.settings.allow_audio_fallback {
            FallbackPolicy::DisabledByCaller
        } else if self.recognizer.is_none() {
            FallbackPolicy::RecognizerUnavailable
        } else {
            FallbackPolicy::Enabled
        }
    }

    /// Acquire a transcript for one video through the tier chain
    pub async fn acquire(&self, video_id: &str) -> TranscriptOutcome {
        let policy = self.resolve_fallback_policy();

        if let Some(transcript) = self.try_caption_tiers(video_id).await {
            tracing::info!(
                video_id,
                provenance = %transcript.provenance(),
                "transcript acquired from captions"
            );
            return TranscriptOutcome::Transcript(transcript);
        }

        match policy {
            FallbackPolicy::Enabled => self.audio_fallback(video_id).await,
            _ => {
                tracing::info!(video_id, ?policy, "no captions, audio fallback skipped");
                TranscriptOutcome::unavailable(NO_CAPTIONS_AVAILABLE)
            }
        }
    }

    /// Try manual caption tracks first, then auto-generated ones, walking
    /// the configured language priority within each tier
    async fn try_caption_tiers(&self, video_id: &str) -> Option<AcquiredTranscript> {
        let tracks = match self.captions.list_tracks(video_id).await {
            Ok(tracks) => tracks,
            Err(error) => {
                // Expected and non-fatal: advance to the next tier
                tracing::debug!(video_id, error = %format!("{error:#}"), "caption listing failed");
                return None;
            }
        };

        for auto_generated in [false, true] {
            let tier = if auto_generated {
                TranscriptTier::AutoCaption
            } else {
                TranscriptTier::ManualCaption
            };

            for language in &self.settings.caption_languages {
                let Some(track) = tracks
                    .iter()
                    .find(|t| t.auto_generated == auto_generated && t.language_code == *language)
                else {
                    continue;
                };

                self.pace().await;

                let fragments = match self.captions.fetch_track(video_id, track).await {
                    Ok(fragments) => fragments,
                    Err(error) => {
                        tracing::debug!(
                            video_id,
                            %language,
                            error = %format!("{error:#}"),
                            "caption fetch failed"
                        );
                        continue;
                    }
                };

                let Some(text) = clean_caption_fragments(&fragments) else {
                    continue;
                };
                if text.chars().count() <= MIN_CAPTION_CHARS {
                    continue;
                }

                return Some(AcquiredTranscript {
                    text,
                    tier,
                    language: language.clone(),
                });
            }
        }

        None
    }

    /// Download audio into a private working directory and run speech
    /// recognition over it. The directory is removed on every exit path.
    async fn audio_fallback(&self, video_id: &str) -> TranscriptOutcome {
        let Some(recognizer) = self.recognizer.as_ref() else {
            return TranscriptOutcome::unavailable(NO_CAPTIONS_AVAILABLE);
        };

        let workdir = match TempDir::new() {
            Ok(dir) => dir,
            Err(error) => {
                return TranscriptOutcome::unavailable(format!(
                    "failed to create a working directory: {error}"
                ))
            }
        };

        self.pace().await;

        let duration = match self.audio.probe_duration(video_id).await {
            Ok(duration) => duration,
            Err(error) if is_restricted(&error) => {
                return TranscriptOutcome::unavailable(DOWNLOAD_RESTRICTED)
            }
            Err(error) => {
                return TranscriptOutcome::unavailable(format!("audio probe failed: {error:#}"))
            }
        };

        // Cost control: never download long videos
        if duration > MAX_AUDIO_DURATION_SECS {
            tracing::info!(video_id, duration, "skipping speech recognition for long video");
            return TranscriptOutcome::unavailable(VIDEO_TOO_LONG);
        }

        self.pace().await;

        if let Err(error) = self.audio.download_audio(video_id, workdir.path()).await {
            if is_restricted(&error) {
                return TranscriptOutcome::unavailable(DOWNLOAD_RESTRICTED);
            }
            return TranscriptOutcome::unavailable(format!("audio download failed: {error:#}"));
        }

        let Some(artifact) = find_audio_artifact(workdir.path(), video_id) else {
            return TranscriptOutcome::unavailable(AUDIO_EXTRACTION_FAILED);
        };

        // The model is loaded at most once per acquirer and reused
        if let Err(error) = self
            .recognizer_ready
            .get_or_try_init(|| recognizer.load())
            .await
        {
            return TranscriptOutcome::unavailable(format!(
                "speech recognition unavailable: {error:#}"
            ));
        }

        match recognizer
            .transcribe(&artifact, &self.settings.recognition_language)
            .await
        {
            Ok(text) => {
                let trimmed = text.trim();
                if trimmed.chars().count() > MIN_RECOGNIZED_CHARS {
                    tracing::info!(video_id, "transcript acquired via speech recognition");
                    TranscriptOutcome::Transcript(AcquiredTranscript {
                        text: trimmed.to_string(),
                        tier: TranscriptTier::SpeechRecognition,
                        language: self.settings.recognition_language.clone(),
                    })
                } else {
                    TranscriptOutcome::unavailable(TRANSCRIPT_TOO_SHORT)
                }
            }
            Err(error) => {
                TranscriptOutcome::unavailable(format!("speech recognition failed: {error:#}"))
            }
        }
    }

    async fn pace(&self) {
        if !self.settings.pacing.is_zero() {
            tokio::time::sleep(self.settings.pacing).await;
        }
    }
}

fn is_restricted(error: &anyhow::Error) -> bool {
    matches!(
        error.downcast_ref::<DeepSearchError>(),
        Some(DeepSearchError::DownloadRestricted)
    )
}

/// Drives [`TranscriptAcquirer`] over many videos, strictly sequentially,
/// accumulating only successful transcripts. Failed ids are logged and
/// counted but omitted from the returned map.
pub struct BatchTranscriptCoordinator {
    acquirer: TranscriptAcquirer,
}

impl BatchTranscriptCoordinator {
    pub fn new(acquirer: TranscriptAcquirer) -> Self {
        Self { acquirer }
    }

    pub async fn acquire_many(
        &self,
        video_ids: &[String],
        progress: Option<ProgressFn<'_>>,
    ) -> HashMap<String, AcquiredTranscript> {
        let total = video_ids.len();
        let mut transcripts = HashMap::new();
        let mut failed = 0usize;

        for (index, video_id) in video_ids.iter().enumerate() {
            if let Some(callback) = progress {
                callback(&format!(
                    "Extracting transcript {} of {total} ({video_id})",
                    index + 1
                ));
            }

            match self.acquirer.acquire(video_id).await {
                TranscriptOutcome::Transcript(transcript) => {
                    transcripts.insert(video_id.clone(), transcript);
                }
                TranscriptOutcome::Unavailable { reason } => {
                    failed += 1;
                    tracing::warn!(%video_id, %reason, "transcript unavailable");
                }
            }

            if index + 1 < total {
                self.acquirer.pace().await;
            }
        }

        tracing::info!(
            succeeded = transcripts.len(),
            failed,
            total,
            "batch transcript extraction finished"
        );

        transcripts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::audio::{MockAudioSource, MockSpeechRecognizer};
    use super::captions::MockCaptionSource;

    fn track(language: &str, auto_generated: bool) -> CaptionTrack {
        CaptionTrack {
            language_code: language.to_string(),
            language: language.to_string(),
            auto_generated,
            base_url: format!("https://example.com/{language}"),
        }
    }

    fn long_text() -> Vec<String> {
        vec!["a".repeat(200)]
    }

    fn settings() -> AcquirerSettings {
        AcquirerSettings {
            pacing: Duration::ZERO,
            ..Default::default()
        }
    }

    fn acquirer_with(
        captions: MockCaptionSource,
        audio: MockAudioSource,
        recognizer: Option<MockSpeechRecognizer>,
        settings: AcquirerSettings,
    ) -> TranscriptAcquirer {
        TranscriptAcquirer::new(
            Arc::new(QuotaTracker::default()),
            Arc::new(captions),
            Arc::new(audio),
            recognizer.map(|r| Arc::new(r) as Arc<dyn SpeechRecognizer>),
            settings,
        )
    }

    #[tokio::test]
    async fn manual_caption_wins_with_provenance() {
        let mut captions = MockCaptionSource::new();
        captions
            .expect_list_tracks()
            .returning(|_| Ok(vec![track("ko", false)]));
        captions
            .expect_fetch_track()
            .times(1)
            .returning(|_, _| Ok(long_text()));

        // No expectations: any audio call would panic the test
        let audio = MockAudioSource::new();

        let acquirer = acquirer_with(captions, audio, None, settings());
        let outcome = acquirer.acquire("abc123def45").await;

        let TranscriptOutcome::Transcript(transcript) = outcome else {
            panic!("expected a transcript");
        };
        assert_eq!(transcript.provenance(), "manual caption, ko");
        assert_eq!(transcript.tier, TranscriptTier::ManualCaption);
        assert_eq!(transcript.text.chars().count(), 200);
    }

    #[tokio::test]
    async fn manual_captions_are_preferred_over_auto() {
        let mut captions = MockCaptionSource::new();
        captions
            .expect_list_tracks()
            .returning(|_| Ok(vec![track("en", true), track("en", false)]));
        captions
            .expect_fetch_track()
            .times(1)
            .withf(|_, track| !track.auto_generated)
            .returning(|_, _| Ok(long_text()));

        let acquirer = acquirer_with(captions, MockAudioSource::new(), None, settings());
        let outcome = acquirer.acquire("abc123def45").await;

        let TranscriptOutcome::Transcript(transcript) = outcome else {
            panic!("expected a transcript");
        };
        assert_eq!(transcript.provenance(), "manual caption, en");
    }

    #[tokio::test]
    async fn auto_caption_is_the_second_tier() {
        let mut captions = MockCaptionSource::new();
        captions
            .expect_list_tracks()
            .returning(|_| Ok(vec![track("en", true)]));
        captions
            .expect_fetch_track()
            .times(1)
            .returning(|_, _| Ok(long_text()));

        let acquirer = acquirer_with(captions, MockAudioSource::new(), None, settings());
        let outcome = acquirer.acquire("abc123def45").await;

        let TranscriptOutcome::Transcript(transcript) = outcome else {
            panic!("expected a transcript");
        };
        assert_eq!(transcript.provenance(), "auto caption, en");
    }

    #[tokio::test]
    async fn short_captions_fall_through_to_the_next_tier() {
        let mut captions = MockCaptionSource::new();
        captions
            .expect_list_tracks()
            .returning(|_| Ok(vec![track("ko", false), track("ko", true)]));
        captions
            .expect_fetch_track()
            .times(2)
            .returning(|_, track| {
                if track.auto_generated {
                    Ok(long_text())
                } else {
                    Ok(vec!["too short".to_string()])
                }
            });

        let acquirer = acquirer_with(captions, MockAudioSource::new(), None, settings());
        let outcome = acquirer.acquire("abc123def45").await;

        let TranscriptOutcome::Transcript(transcript) = outcome else {
            panic!("expected a transcript");
        };
        assert_eq!(transcript.provenance(), "auto caption, ko");
    }

    #[tokio::test]
    async fn no_captions_with_fallback_disabled_is_a_fixed_diagnostic() {
        let mut captions = MockCaptionSource::new();
        captions.expect_list_tracks().returning(|_| Ok(Vec::new()));

        // Would panic on any call: proves no audio download is attempted
        let audio = MockAudioSource::new();
        let recognizer = MockSpeechRecognizer::new();

        let acquirer = acquirer_with(
            captions,
            audio,
            Some(recognizer),
            AcquirerSettings {
                allow_audio_fallback: false,
                ..settings()
            },
        );
        let outcome = acquirer.acquire("abc123def45").await;

        assert_eq!(
            outcome,
            TranscriptOutcome::Unavailable {
                reason: NO_CAPTIONS_AVAILABLE.to_string()
            }
        );
    }

    #[tokio::test]
    async fn exhausted_quota_forces_caption_only_mode() {
        let quota = Arc::new(QuotaTracker::new(100, 80));
        quota.consume(100);

        let mut captions = MockCaptionSource::new();
        captions.expect_list_tracks().returning(|_| Ok(Vec::new()));

        let mut recognizer = MockSpeechRecognizer::new();
        recognizer.expect_load().never();
        recognizer.expect_transcribe().never();

        let acquirer = TranscriptAcquirer::new(
            quota,
            Arc::new(captions),
            Arc::new(MockAudioSource::new()),
            Some(Arc::new(recognizer)),
            settings(),
        );

        assert_eq!(
            acquirer.resolve_fallback_policy(),
            FallbackPolicy::QuotaPreserving
        );

        let outcome = acquirer.acquire("abc123def45").await;
        assert_eq!(
            outcome,
            TranscriptOutcome::Unavailable {
                reason: NO_CAPTIONS_AVAILABLE.to_string()
            }
        );
    }

    #[tokio::test]
    async fn long_videos_are_never_downloaded() {
        let mut captions = MockCaptionSource::new();
        captions.expect_list_tracks().returning(|_| Ok(Vec::new()));

        let mut audio = MockAudioSource::new();
        audio.expect_probe_duration().returning(|_| Ok(601));
        audio.expect_download_audio().never();

        let mut recognizer = MockSpeechRecognizer::new();
        recognizer.expect_load().never();
        recognizer.expect_transcribe().never();

        let acquirer = acquirer_with(captions, audio, Some(recognizer), settings());
        let outcome = acquirer.acquire("abc123def45").await;

        assert_eq!(
            outcome,
            TranscriptOutcome::Unavailable {
                reason: VIDEO_TOO_LONG.to_string()
            }
        );
    }

    #[tokio::test]
    async fn restricted_downloads_yield_a_fixed_diagnostic() {
        let mut captions = MockCaptionSource::new();
        captions.expect_list_tracks().returning(|_| Ok(Vec::new()));

        let mut audio = MockAudioSource::new();
        audio.expect_probe_duration().returning(|_| Ok(120));
        audio
            .expect_download_audio()
            .returning(|_, _| Err(DeepSearchError::DownloadRestricted.into()));

        let mut recognizer = MockSpeechRecognizer::new();
        recognizer.expect_load().never();
        recognizer.expect_transcribe().never();

        let acquirer = acquirer_with(captions, audio, Some(recognizer), settings());
        let outcome = acquirer.acquire("abc123def45").await;

        assert_eq!(
            outcome,
            TranscriptOutcome::Unavailable {
                reason: DOWNLOAD_RESTRICTED.to_string()
            }
        );
    }

    #[tokio::test]
    async fn missing_audio_artifact_is_reported() {
        let mut captions = MockCaptionSource::new();
        captions.expect_list_tracks().returning(|_| Ok(Vec::new()));

        let mut audio = MockAudioSource::new();
        audio.expect_probe_duration().returning(|_| Ok(120));
        // Download "succeeds" without leaving a wav behind
        audio.expect_download_audio().returning(|_, _| Ok(()));

        let mut recognizer = MockSpeechRecognizer::new();
        recognizer.expect_load().never();
        recognizer.expect_transcribe().never();

        let acquirer = acquirer_with(captions, audio, Some(recognizer), settings());
        let outcome = acquirer.acquire("abc123def45").await;

        assert_eq!(
            outcome,
            TranscriptOutcome::Unavailable {
                reason: AUDIO_EXTRACTION_FAILED.to_string()
            }
        );
    }

    #[tokio::test]
    async fn speech_recognition_produces_a_transcript() {
        let mut captions = MockCaptionSource::new();
        captions.expect_list_tracks().returning(|_| Ok(Vec::new()));

        let mut audio = MockAudioSource::new();
        audio.expect_probe_duration().returning(|_| Ok(120));
        audio.expect_download_audio().returning(|video_id, dir| {
            std::fs::write(dir.join(format!("{video_id}.wav")), b"riff")?;
            Ok(())
        });

        let mut recognizer = MockSpeechRecognizer::new();
        recognizer.expect_load().times(1).returning(|| Ok(()));
        recognizer
            .expect_transcribe()
            .withf(|_, language| language == "ko")
            .returning(|_, _| Ok("  a recognized transcript with plenty of text  ".to_string()));

        let acquirer = acquirer_with(captions, audio, Some(recognizer), settings());
        let outcome = acquirer.acquire("abc123def45").await;

        let TranscriptOutcome::Transcript(transcript) = outcome else {
            panic!("expected a transcript");
        };
        assert_eq!(transcript.provenance(), "speech recognition, ko");
        assert_eq!(
            transcript.text,
            "a recognized transcript with plenty of text"
        );
    }

    #[tokio::test]
    async fn short_recognition_output_is_rejected() {
        let mut captions = MockCaptionSource::new();
        captions.expect_list_tracks().returning(|_| Ok(Vec::new()));

        let mut audio = MockAudioSource::new();
        audio.expect_probe_duration().returning(|_| Ok(120));
        audio.expect_download_audio().returning(|video_id, dir| {
            std::fs::write(dir.join(format!("{video_id}.wav")), b"riff")?;
            Ok(())
        });

        let mut recognizer = MockSpeechRecognizer::new();
        recognizer.expect_load().returning(|| Ok(()));
        recognizer
            .expect_transcribe()
            .returning(|_, _| Ok(" uh ".to_string()));

        let acquirer = acquirer_with(captions, audio, Some(recognizer), settings());
        let outcome = acquirer.acquire("abc123def45").await;

        assert_eq!(
            outcome,
            TranscriptOutcome::Unavailable {
                reason: TRANSCRIPT_TOO_SHORT.to_string()
            }
        );
    }

    #[tokio::test]
    async fn recognizer_is_loaded_once_across_calls() {
        let mut captions = MockCaptionSource::new();
        captions.expect_list_tracks().returning(|_| Ok(Vec::new()));

        let mut audio = MockAudioSource::new();
        audio.expect_probe_duration().returning(|_| Ok(120));
        audio.expect_download_audio().returning(|video_id, dir| {
            std::fs::write(dir.join(format!("{video_id}.wav")), b"riff")?;
            Ok(())
        });

        let mut recognizer = MockSpeechRecognizer::new();
        recognizer.expect_load().times(1).returning(|| Ok(()));
        recognizer
            .expect_transcribe()
            .times(2)
            .returning(|_, _| Ok("a recognized transcript with plenty of text".to_string()));

        let acquirer = acquirer_with(captions, audio, Some(recognizer), settings());

        assert!(acquirer.acquire("abc123def45").await.is_success());
        assert!(acquirer.acquire("xyz987wvu65").await.is_success());
    }

    #[tokio::test]
    async fn batch_keeps_only_successful_transcripts() {
        let mut captions = MockCaptionSource::new();
        captions.expect_list_tracks().returning(|video_id| {
            if video_id == "aaaaaaaaaa1" {
                Ok(vec![track("ko", false)])
            } else {
                Ok(Vec::new())
            }
        });
        captions
            .expect_fetch_track()
            .returning(|_, _| Ok(long_text()));

        let acquirer = acquirer_with(
            captions,
            MockAudioSource::new(),
            None,
            AcquirerSettings {
                allow_audio_fallback: false,
                ..settings()
            },
        );
        let coordinator = BatchTranscriptCoordinator::new(acquirer);

        let ids = vec![
            "aaaaaaaaaa1".to_string(),
            "aaaaaaaaaa2".to_string(),
            "aaaaaaaaaa3".to_string(),
        ];
        let transcripts = coordinator.acquire_many(&ids, None).await;

        assert_eq!(transcripts.len(), 1);
        assert!(transcripts.contains_key("aaaaaaaaaa1"));
        assert_eq!(
            transcripts["aaaaaaaaaa1"].provenance(),
            "manual caption, ko"
        );
    }

    #[tokio::test]
    async fn batch_reports_progress_per_item() {
        let mut captions = MockCaptionSource::new();
        captions.expect_list_tracks().returning(|_| Ok(Vec::new()));

        let acquirer = acquirer_with(
            captions,
            MockAudioSource::new(),
            None,
            AcquirerSettings {
                allow_audio_fallback: false,
                ..settings()
            },
        );
        let coordinator = BatchTranscriptCoordinator::new(acquirer);

        let messages = std::sync::Mutex::new(Vec::new());
        let callback = |msg: &str| messages.lock().unwrap().push(msg.to_string());

        let ids = vec!["aaaaaaaaaa1".to_string(), "aaaaaaaaaa2".to_string()];
        coordinator.acquire_many(&ids, Some(&callback)).await;

        let messages = messages.into_inner().unwrap();
        assert_eq!(messages.len(), 2);
        assert!(messages[0].contains("1 of 2"));
        assert!(messages[1].contains("2 of 2"));
    }
}
