use super::VideoRecord;

/// Assign an outlier score to every record in the batch.
///
/// The score is the absolute z-score of a video's view-to-subscriber ratio
/// within this batch, rounded to two decimals. Scores are only meaningful
/// relative to the batch they were computed in; recomputing the same video
/// over a different batch yields a different value.
pub fn assign_outlier_scores(records: &mut [VideoRecord]) {
    if records.is_empty() {
        return;
    }

    // Zero subscribers floors the ratio at 0 instead of dividing by zero.
    let ratios: Vec<f64> = records
        .iter()
        .map(|record| {
            if record.subscriber_count > 0 {
                record.view_count as f64 / record.subscriber_count as f64
            } else {
                0.0
            }
        })
        .collect();

    let mean = ratios.iter().sum::<f64>() / ratios.len() as f64;
    let stdev = sample_stdev(&ratios, mean);

    for (record, ratio) in records.iter_mut().zip(&ratios) {
        record.outlier_score = if stdev > 0.0 {
            let z = (ratio - mean) / stdev;
            (z.abs() * 100.0).round() / 100.0
        } else {
            0.0
        };
    }
}

// Sample standard deviation; fewer than two values degenerates to 1.
fn sample_stdev(values: &[f64], mean: f64) -> f64 {
    if values.len() < 2 {
        return 1.0;
    }

    let variance = values
        .iter()
        .map(|v| (v - mean).powi(2))
        .sum::<f64>()
        / (values.len() - 1) as f64;

    variance.sqrt()
}
