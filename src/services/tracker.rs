use crate::error::{ClientError, ClientResult};
use crate::models::{PollOutcome, RelatedFileSet, StoredObject, UploadSession};
use crate::services::correlator;
use crate::services::storage::StorageService;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

#[derive(Debug, Default)]
struct TrackerState {
    session: UploadSession,
    related: RelatedFileSet,
}

/// Owns the active upload session and the last related-file set.
///
/// Listings are correlated against whatever session is current when they
/// complete, so a listing issued before a new upload cannot resurrect the
/// old session's result. The last completed listing wins.
pub struct SessionTracker {
    state: Mutex<TrackerState>,
    default_extension: String,
}

impl SessionTracker {
    pub fn new(default_extension: impl Into<String>) -> Self {
        Self {
            state: Mutex::new(TrackerState::default()),
            default_extension: default_extension.into(),
        }
    }

    /// New upload accepted: replaces any previous session.
    pub async fn start_session(&self, filename: impl Into<String>, at: DateTime<Utc>) {
        let filename = filename.into();
        tracing::info!("Tracking upload {} from {}", filename, at);

        let mut state = self.state.lock().await;
        state.session = UploadSession::started(filename, at);
        state.related = RelatedFileSet::default();
    }

    /// Download finished: forget the session.
    pub async fn clear_session(&self) {
        let mut state = self.state.lock().await;
        state.session = UploadSession::default();
        state.related = RelatedFileSet::default();
        tracing::debug!("Upload session cleared");
    }

    pub async fn session(&self) -> UploadSession {
        self.state.lock().await.session.clone()
    }

    pub async fn related_files(&self) -> RelatedFileSet {
        self.state.lock().await.related.clone()
    }

    pub async fn apply_listing(&self, listing: &[StoredObject]) -> PollOutcome {
        let mut state = self.state.lock().await;

        let current = std::mem::take(&mut state.session);
        let (next, outcome) = correlator::advance(current, listing, &self.default_extension);

        if let Some(inferred) = &outcome.inferred_filename {
            tracing::info!("Recovered upload name {} from existing results", inferred);
        }
        if outcome.processing_complete {
            tracing::info!("✅ Processing complete: {:?}", outcome.latest_result);
        }

        state.session = next;
        state.related = outcome.related.clone();
        outcome
    }

    /// Lists the bucket and applies the listing. A failed listing leaves the
    /// tracked state untouched.
    pub async fn poll(&self, storage: &dyn StorageService) -> ClientResult<PollOutcome> {
        let listing = storage
            .list_objects()
            .await
            .map_err(|e| ClientError::Fetch(e.to_string()))?;

        Ok(self.apply_listing(&listing).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[tokio::test]
    async fn test_listing_applies_to_current_session() {
        let tracker = SessionTracker::new("xlsx");
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap();
        let t1 = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();

        tracker.start_session("report.xlsx", t0).await;
        // A new upload of the same file starts before the old listing lands.
        tracker.start_session("report.xlsx", t1).await;

        let stale_listing = vec![StoredObject::new(
            "Price_report_20240101_110000.csv",
            Utc.with_ymd_and_hms(2024, 1, 1, 11, 0, 0).unwrap(),
        )];
        let outcome = tracker.apply_listing(&stale_listing).await;

        assert!(outcome.latest_result.is_none());
        assert!(!outcome.processing_complete);
        assert!(tracker.related_files().await.is_empty());
    }

    #[tokio::test]
    async fn test_clear_session_resets_state() {
        let tracker = SessionTracker::new("xlsx");
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap();
        tracker.start_session("report.xlsx", t0).await;
        assert!(tracker.session().await.is_active());

        tracker
            .apply_listing(&[
                StoredObject::new("report.xlsx", t0),
                StoredObject::new(
                    "Price_report_20240101_100500.csv",
                    Utc.with_ymd_and_hms(2024, 1, 1, 10, 5, 0).unwrap(),
                ),
            ])
            .await;
        assert_eq!(tracker.related_files().await.len(), 2);

        tracker.clear_session().await;
        assert_eq!(tracker.session().await, UploadSession::default());
        assert!(tracker.related_files().await.is_empty());
    }
}
