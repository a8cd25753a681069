use anyhow::Context;
use async_trait::async_trait;
use quick_xml::events::Event;
use quick_xml::Reader;
use regex::Regex;
use std::sync::OnceLock;
use std::time::Duration;

use crate::{DeepSearchError, Result};

const WATCH_URL: &str = "https://www.youtube.com/watch?v=";
const INNERTUBE_PLAYER_URL: &str = "https://www.youtube.com/youtubei/v1/player?key=";

/// Text fragments that mark non-speech audio and carry no transcript value
const NON_SPEECH_MARKERS: &[&str] = &["[Music]", "[Applause]", "[음악]", "[박수]", "[웃음]"];

/// One available caption track for a video
#[derive(Debug, Clone, PartialEq)]
pub struct CaptionTrack {
    pub language_code: String,
    pub language: String,
    pub auto_generated: bool,
    pub base_url: String,
}

/// Source of caption tracks and their text fragments
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CaptionSource: Send + Sync {
    /// List the caption tracks available for a video
    async fn list_tracks(&self, video_id: &str) -> Result<Vec<CaptionTrack>>;

    /// Fetch the text fragments of one track
    async fn fetch_track(&self, video_id: &str, track: &CaptionTrack) -> Result<Vec<String>>;
}

/// Caption client scraping the watch page and the InnerTube player endpoint.
/// Costs no Data API quota.
pub struct InnerTubeCaptions {
    client: reqwest::Client,
    delay: Duration,
}

impl InnerTubeCaptions {
    pub fn new() -> Result<Self> {
        Self::with_delay(Duration::from_millis(500))
    }

    pub fn with_delay(delay: Duration) -> Result<Self> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::ACCEPT_LANGUAGE,
            reqwest::header::HeaderValue::from_static("en-US"),
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self { client, delay })
    }

    // Small pause before each request to stay under the rate limiter.
    async fn pace(&self) {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
    }

    async fn fetch_watch_html(&self, video_id: &str) -> Result<String> {
        self.pace().await;

        let url = format!("{WATCH_URL}{video_id}");
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("failed to fetch the watch page")?;

        if !response.status().is_success() {
            return Err(DeepSearchError::CaptionSource(format!(
                "watch page returned HTTP {}",
                response.status()
            ))
            .into());
        }

        response
            .text()
            .await
            .context("failed to read the watch page")
    }

    fn extract_innertube_api_key(html: &str, video_id: &str) -> Result<String> {
        static RE: OnceLock<Regex> = OnceLock::new();
        let re = RE.get_or_init(|| {
            Regex::new(r#""INNERTUBE_API_KEY":\s*"([a-zA-Z0-9_-]+)""#).expect("valid key pattern")
        });

        re.captures(html)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
            .ok_or_else(|| {
                DeepSearchError::CaptionSource(format!(
                    "no InnerTube API key on the watch page for {video_id}"
                ))
                .into()
            })
    }

    async fn fetch_player_data(&self, video_id: &str, api_key: &str) -> Result<serde_json::Value> {
        self.pace().await;

        let url = format!("{INNERTUBE_PLAYER_URL}{api_key}");
        let context = serde_json::json!({
            "context": {
                "client": {
                    "clientName": "ANDROID",
                    "clientVersion": "20.10.38"
                }
            },
            "videoId": video_id
        });

        let response = self
            .client
            .post(&url)
            .json(&context)
            .send()
            .await
            .context("failed to reach the player endpoint")?;

        if !response.status().is_success() {
            return Err(DeepSearchError::CaptionSource(format!(
                "player endpoint returned HTTP {}",
                response.status()
            ))
            .into());
        }

        response
            .json()
            .await
            .context("failed to parse the player response")
    }

    fn tracks_from_player_data(player_data: &serde_json::Value) -> Vec<CaptionTrack> {
        let Some(caption_tracks) = player_data
            .get("captions")
            .and_then(|c| c.get("playerCaptionsTracklistRenderer"))
            .and_then(|r| r.get("captionTracks"))
            .and_then(|t| t.as_array())
        else {
            return Vec::new();
        };

        caption_tracks
            .iter()
            .filter_map(|track| {
                let language_code = track.get("languageCode")?.as_str()?.to_string();
                let base_url = track.get("baseUrl")?.as_str()?.replace("&fmt=srv3", "");

                let language = track
                    .get("name")
                    .and_then(|n| n.get("runs"))
                    .and_then(|r| r.as_array())
                    .and_then(|arr| arr.first())
                    .and_then(|r| r.get("text"))
                    .and_then(|t| t.as_str())
                    .unwrap_or(&language_code)
                    .to_string();

                let auto_generated = track
                    .get("kind")
                    .and_then(|k| k.as_str())
                    .map(|k| k == "asr")
                    .unwrap_or(false);

                Some(CaptionTrack {
                    language_code,
                    language,
                    auto_generated,
                    base_url,
                })
            })
            .collect()
    }
}

#[async_trait]
impl CaptionSource for InnerTubeCaptions {
    async fn list_tracks(&self, video_id: &str) -> Result<Vec<CaptionTrack>> {
        let html = self.fetch_watch_html(video_id).await?;
        let api_key = Self::extract_innertube_api_key(&html, video_id)?;
        let player_data = self.fetch_player_data(video_id, &api_key).await?;
        Ok(Self::tracks_from_player_data(&player_data))
    }

    async fn fetch_track(&self, _video_id: &str, track: &CaptionTrack) -> Result<Vec<String>> {
        self.pace().await;

        let response = self
            .client
            .get(&track.base_url)
            .send()
            .await
            .context("failed to fetch the caption track")?;

        if !response.status().is_success() {
            return Err(DeepSearchError::CaptionSource(format!(
                "caption track returned HTTP {}",
                response.status()
            ))
            .into());
        }

        let xml = response
            .text()
            .await
            .context("failed to read the caption track")?;

        parse_timedtext(&xml)
    }
}

/// Parse timedtext XML (`<text start=.. dur=..>fragment</text>`) into fragments
fn parse_timedtext(xml: &str) -> Result<Vec<String>> {
    let mut reader = Reader::from_str(xml);
    let mut fragments = Vec::new();
    let mut current = String::new();
    let mut in_text = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if e.name().as_ref() == b"text" => {
                in_text = true;
                current.clear();
            }
            Ok(Event::Text(t)) if in_text => {
                let decoded = t
                    .unescape()
                    .map_err(|e| DeepSearchError::CaptionSource(format!("bad XML escape: {e}")))?;
                current.push_str(&decoded);
            }
            Ok(Event::End(e)) if e.name().as_ref() == b"text" => {
                in_text = false;
                if !current.trim().is_empty() {
                    fragments.push(current.trim().to_string());
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(
                    DeepSearchError::CaptionSource(format!("malformed caption XML: {e}")).into(),
                )
            }
        }
    }

    Ok(fragments)
}

/// Join caption fragments into one cleaned transcript string.
///
/// Drops non-speech markers, collapses whitespace, and returns `None` when
/// nothing meaningful remains.
pub fn clean_caption_fragments(fragments: &[String]) -> Option<String> {
    let parts: Vec<&str> = fragments
        .iter()
        .map(|fragment| fragment.trim())
        .filter(|fragment| !fragment.is_empty() && !NON_SPEECH_MARKERS.contains(fragment))
        .collect();

    if parts.is_empty() {
        return None;
    }

    let joined = parts.join(" ");
    let collapsed = joined.split_whitespace().collect::<Vec<_>>().join(" ");

    if collapsed.is_empty() {
        None
    } else {
        Some(collapsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timedtext_fragments_are_extracted_and_unescaped() {
        let xml = r#"<?xml version="1.0" encoding="utf-8"?>
<transcript>
  <text start="0.0" dur="1.5">hello world</text>
  <text start="1.5" dur="2.0">it&#39;s nice &amp; sunny</text>
  <text start="3.5" dur="1.0">  </text>
</transcript>"#;

        let fragments = parse_timedtext(xml).unwrap();
        assert_eq!(fragments, vec!["hello world", "it's nice & sunny"]);
    }

    #[test]
    fn clean_fragments_drops_non_speech_markers() {
        let fragments = vec![
            "[Music]".to_string(),
            "hello".to_string(),
            "[음악]".to_string(),
            "  world  ".to_string(),
            "".to_string(),
        ];

        assert_eq!(
            clean_caption_fragments(&fragments).as_deref(),
            Some("hello world")
        );
    }

    #[test]
    fn clean_fragments_collapses_internal_whitespace() {
        let fragments = vec!["line one\n line".to_string(), "two\r\nthree".to_string()];

        assert_eq!(
            clean_caption_fragments(&fragments).as_deref(),
            Some("line one line two three")
        );
    }

    #[test]
    fn only_markers_yield_nothing() {
        let fragments = vec!["[Music]".to_string(), "[박수]".to_string()];
        assert_eq!(clean_caption_fragments(&fragments), None);
        assert_eq!(clean_caption_fragments(&[]), None);
    }

    #[test]
    fn innertube_key_is_scraped_from_html() {
        let html = r#"<script>var cfg = {"INNERTUBE_API_KEY": "AIzaSyAbC-123_xyz"};</script>"#;
        let key = InnerTubeCaptions::extract_innertube_api_key(html, "abc").unwrap();
        assert_eq!(key, "AIzaSyAbC-123_xyz");

        assert!(InnerTubeCaptions::extract_innertube_api_key("<html></html>", "abc").is_err());
    }

    #[test]
    fn caption_tracks_split_manual_and_generated() {
        let player_data = serde_json::json!({
            "captions": {
                "playerCaptionsTracklistRenderer": {
                    "captionTracks": [
                        {
                            "languageCode": "ko",
                            "baseUrl": "https://example.com/ko&fmt=srv3",
                            "name": {"runs": [{"text": "Korean"}]}
                        },
                        {
                            "languageCode": "en",
                            "baseUrl": "https://example.com/en",
                            "kind": "asr",
                            "name": {"runs": [{"text": "English (auto-generated)"}]}
                        }
                    ]
                }
            }
        });

        let tracks = InnerTubeCaptions::tracks_from_player_data(&player_data);
        assert_eq!(tracks.len(), 2);

        assert_eq!(tracks[0].language_code, "ko");
        assert!(!tracks[0].auto_generated);
        assert_eq!(tracks[0].base_url, "https://example.com/ko");

        assert_eq!(tracks[1].language_code, "en");
        assert!(tracks[1].auto_generated);
    }

    #[test]
    fn missing_captions_renderer_lists_no_tracks() {
        let player_data = serde_json::json!({"playabilityStatus": {"status": "OK"}});
        assert!(InnerTubeCaptions::tracks_from_player_data(&player_data).is_empty());
    }
}
