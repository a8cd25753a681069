use std::sync::atomic::{AtomicU64, Ordering};

/// Default daily request budget of the YouTube Data API
pub const DAILY_QUOTA_LIMIT: u64 = 10_000;

/// Budget level at which consumption starts emitting warnings
pub const QUOTA_WARNING_THRESHOLD: u64 = 8_000;

/// Unit cost of a search.list page
pub const SEARCH_LIST_COST: u64 = 100;

/// Unit cost of a videos.list batch
pub const VIDEO_LIST_COST: u64 = 1;

/// Unit cost of a channels.list batch
pub const CHANNEL_LIST_COST: u64 = 1;

/// Unit cost of a playlistItems.list page
pub const PLAYLIST_LIST_COST: u64 = 1;

/// Snapshot of current quota consumption
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuotaStatus {
    pub used: u64,
    pub limit: u64,
    pub remaining: u64,
    pub percent_used: f64,
}

/// Tracks consumed vs. allowed remote-API operations for one client session.
///
/// The counter is monotonically increasing and process-scoped; it is never
/// persisted or reset. Callers must check [`available`](Self::available)
/// before spending budget - no operation here ever blocks on exhaustion.
#[derive(Debug)]
pub struct QuotaTracker {
    used: AtomicU64,
    limit: u64,
    warning_threshold: u64,
}

impl QuotaTracker {
    pub fn new(limit: u64, warning_threshold: u64) -> Self {
        Self {
            used: AtomicU64::new(0),
            limit,
            warning_threshold,
        }
    }

    /// Whether `cost` more units fit in the remaining budget
    pub fn available(&self, cost: u64) -> bool {
        self.used.load(Ordering::Relaxed) + cost <= self.limit
    }

    /// Record `amount` spent units, warning once past the threshold
    pub fn consume(&self, amount: u64) {
        let used = self.used.fetch_add(amount, Ordering::Relaxed) + amount;

        if used >= self.warning_threshold {
            let remaining = self.limit.saturating_sub(used);
            tracing::warn!(
                used,
                limit = self.limit,
                remaining,
                "approaching the daily API quota limit"
            );
        }
    }

    pub fn status(&self) -> QuotaStatus {
        let used = self.used.load(Ordering::Relaxed);
        QuotaStatus {
            used,
            limit: self.limit,
            remaining: self.limit.saturating_sub(used),
            percent_used: if self.limit > 0 {
                used as f64 / self.limit as f64 * 100.0
            } else {
                0.0
            },
        }
    }
}

impl Default for QuotaTracker {
    fn default() -> Self {
        Self::new(DAILY_QUOTA_LIMIT, QUOTA_WARNING_THRESHOLD)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_tracker_fits_exactly_the_limit() {
        let quota = QuotaTracker::new(10_000, 8_000);
        assert!(quota.available(10_000));
        assert!(!quota.available(10_001));
    }

    #[test]
    fn exhausted_tracker_rejects_any_cost() {
        let quota = QuotaTracker::new(10_000, 8_000);
        quota.consume(10_000);
        assert!(!quota.available(1));
        assert!(quota.available(0));
    }

    #[test]
    fn consumption_accumulates() {
        let quota = QuotaTracker::new(500, 400);
        quota.consume(100);
        quota.consume(150);
        let status = quota.status();
        assert_eq!(status.used, 250);
        assert_eq!(status.remaining, 250);
        assert_eq!(status.percent_used, 50.0);
    }

    #[test]
    fn status_remaining_never_underflows() {
        let quota = QuotaTracker::new(100, 80);
        quota.consume(150);
        assert_eq!(quota.status().remaining, 0);
    }
}
