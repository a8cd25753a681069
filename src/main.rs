use anyhow::Result;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use yt_deepsearch::cli::{Cli, Commands};
use yt_deepsearch::config::Config;
use yt_deepsearch::output;
use yt_deepsearch::quota::QuotaTracker;
use yt_deepsearch::search::{ChannelVideoLister, SearchFilter, SearchPipeline, YouTubeDataApi};
use yt_deepsearch::transcript::{
    AcquirerSettings, BatchTranscriptCoordinator, InnerTubeCaptions, SpeechRecognizer,
    TranscriptAcquirer, WhisperCliRecognizer, YtDlpAudioSource,
};
use yt_deepsearch::{utils, ProgressFn};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let default_filter = if cli.verbose {
        "yt_deepsearch=debug"
    } else {
        "yt_deepsearch=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Check for external tools (non-fatal; captions work without them)
    let missing_deps = utils::check_dependencies().await;
    if !missing_deps.is_empty() && !cli.quiet {
        eprintln!("⚠️  Dependency check warnings:");
        for dep in missing_deps {
            eprintln!("   • {}", dep);
        }
        eprintln!("   (Continuing anyway - caption extraction does not need them)");
    }

    let config = Config::load().await?;

    match cli.command {
        Commands::Search {
            keyword,
            video_type,
            min_views,
            max_subscribers,
            period,
            max_results,
            output,
            format,
        } => {
            let quota = Arc::new(QuotaTracker::new(
                config.api.quota_limit,
                config.api.quota_warning_threshold,
            ));
            let api = Arc::new(YouTubeDataApi::new(&config.api)?);
            let pipeline = SearchPipeline::new(api, quota.clone());

            let filter = SearchFilter {
                keyword,
                video_type,
                min_views,
                max_subscribers,
                upload_period: period,
                max_results: max_results.unwrap_or(config.app.default_max_results),
            };

            let printer = |message: &str| eprintln!("» {message}");
            let progress: Option<ProgressFn> = if cli.quiet { None } else { Some(&printer) };

            let records = pipeline.search(&filter, progress).await;

            match output {
                Some(path) => {
                    output::save_records(&records, &path, &format).await?;
                    println!("Saved {} results to {}", records.len(), path.display());
                }
                None => output::print_records(&records, &format)?,
            }

            let status = quota.status();
            tracing::info!(
                used = status.used,
                remaining = status.remaining,
                "quota consumed this run"
            );
        }

        Commands::Channel {
            channel_id,
            max_results,
            output,
            format,
        } => {
            let quota = Arc::new(QuotaTracker::new(
                config.api.quota_limit,
                config.api.quota_warning_threshold,
            ));
            let api = Arc::new(YouTubeDataApi::new(&config.api)?);
            let lister = ChannelVideoLister::new(api, quota);

            let printer = |message: &str| eprintln!("» {message}");
            let progress: Option<ProgressFn> = if cli.quiet { None } else { Some(&printer) };

            let records = lister.list(&channel_id, max_results, progress).await;

            match output {
                Some(path) => {
                    output::save_records(&records, &path, &format).await?;
                    println!("Saved {} videos to {}", records.len(), path.display());
                }
                None => output::print_records(&records, &format)?,
            }
        }

        Commands::Transcripts {
            videos,
            captions_only,
            output_dir,
        } => {
            let mut video_ids = Vec::with_capacity(videos.len());
            for input in &videos {
                match utils::extract_video_id(input) {
                    Some(id) => video_ids.push(id),
                    None => anyhow::bail!("not a video id or YouTube URL: {input}"),
                }
            }

            let quota = Arc::new(QuotaTracker::new(
                config.api.quota_limit,
                config.api.quota_warning_threshold,
            ));
            let captions = Arc::new(InnerTubeCaptions::new()?);
            let audio = Arc::new(YtDlpAudioSource::new());

            // Speech recognition capability is detected once, here, and
            // injected; the acquirer never probes the environment itself.
            let whisper_available = utils::check_command_available("whisper").await;
            let recognizer: Option<Arc<dyn SpeechRecognizer>> = if whisper_available {
                Some(Arc::new(WhisperCliRecognizer::new(
                    config.transcript.whisper_model.clone(),
                )))
            } else {
                None
            };

            let settings = AcquirerSettings {
                caption_languages: config.transcript.caption_languages.clone(),
                recognition_language: config.transcript.recognition_language.clone(),
                allow_audio_fallback: config.transcript.allow_audio_fallback && !captions_only,
                pacing: Duration::from_millis(config.app.request_pacing_ms),
            };

            let acquirer = TranscriptAcquirer::new(quota, captions, audio, recognizer, settings);
            let coordinator = BatchTranscriptCoordinator::new(acquirer);

            let bar = if cli.quiet {
                ProgressBar::hidden()
            } else {
                ProgressBar::new(video_ids.len() as u64)
            };
            bar.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                    .unwrap(),
            );
            let callback = |message: &str| {
                bar.set_message(message.to_string());
                bar.inc(1);
            };

            let transcripts = coordinator.acquire_many(&video_ids, Some(&callback)).await;
            bar.finish_and_clear();

            println!(
                "Extracted {}/{} transcripts",
                transcripts.len(),
                video_ids.len()
            );

            match output_dir {
                Some(dir) => {
                    fs_err::create_dir_all(&dir)?;
                    for video_id in &video_ids {
                        if let Some(transcript) = transcripts.get(video_id) {
                            let path =
                                dir.join(format!("{}.txt", utils::sanitize_filename(video_id)));
                            fs_err::write(&path, &transcript.text)?;
                            println!("  {} ({}) -> {}", video_id, transcript.provenance(), path.display());
                        }
                    }
                }
                None => {
                    for video_id in &video_ids {
                        if let Some(transcript) = transcripts.get(video_id) {
                            println!("--- {} ({}) ---", video_id, transcript.provenance());
                            println!("{}\n", transcript.text);
                        }
                    }
                }
            }
        }

        Commands::Config { show } => {
            if show {
                config.display();
            } else {
                config.save().await?;
                println!("Configuration written to: {}", Config::location()?.display());
                println!("Edit the file to set your YouTube Data API key.");
            }
        }
    }

    Ok(())
}
