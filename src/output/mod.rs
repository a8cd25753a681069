use anyhow::Result;
use std::path::Path;

use crate::cli::OutputFormat;
use crate::search::VideoRecord;
use crate::utils::{format_count, format_duration};

/// Save a record list to file in the chosen format
pub async fn save_records(records: &[VideoRecord], path: &Path, format: &OutputFormat) -> Result<()> {
    let content = render_records(records, format)?;
    fs_err::write(path, content)?;
    Ok(())
}

/// Print a record list to the console in the chosen format
pub fn print_records(records: &[VideoRecord], format: &OutputFormat) -> Result<()> {
    let content = render_records(records, format)?;
    println!("{}", content);
    Ok(())
}

fn render_records(records: &[VideoRecord], format: &OutputFormat) -> Result<String> {
    Ok(match format {
        OutputFormat::Text => format_as_text(records),
        OutputFormat::Json => serde_json::to_string_pretty(records)?,
        OutputFormat::Csv => format_as_csv(records),
    })
}

fn format_as_text(records: &[VideoRecord]) -> String {
    if records.is_empty() {
        return "No results".to_string();
    }

    let mut lines = Vec::with_capacity(records.len() + 2);
    lines.push(format!(
        "{:<52} {:>8} {:>8} {:>10} {:>8}  {}",
        "Title", "Views", "Outlier", "Duration", "Subs", "Channel"
    ));
    lines.push("-".repeat(100));

    for record in records {
        lines.push(format!(
            "{:<52} {:>8} {:>8.2} {:>10} {:>8}  {}",
            truncate(&record.title, 50),
            format_count(record.view_count),
            record.outlier_score,
            format_duration(record.duration_seconds),
            format_count(record.subscriber_count),
            record.channel_title,
        ));
    }

    lines.join("\n")
}

fn format_as_csv(records: &[VideoRecord]) -> String {
    let mut lines = Vec::with_capacity(records.len() + 1);
    lines.push(
        "video_id,title,views,outlier_score,duration_seconds,subscribers,channel,published_at,url"
            .to_string(),
    );

    for record in records {
        lines.push(format!(
            "{},{},{},{},{},{},{},{},{}",
            csv_field(&record.video_id),
            csv_field(&record.title),
            record.view_count,
            record.outlier_score,
            record.duration_seconds,
            record.subscriber_count,
            csv_field(&record.channel_title),
            record.published_at.to_rfc3339(),
            csv_field(&record.url),
        ));
    }

    lines.join("\n")
}

fn csv_field(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max_chars.saturating_sub(1)).collect();
        format!("{cut}…")
    }
}
