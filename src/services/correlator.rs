//! Matches the tracked upload against a bucket listing.
//!
//! Everything here is pure: the session goes in by value and comes back out
//! updated, so callers decide where the state lives.

use crate::models::{
    PollOutcome, ProcessingStatus, RelatedFileSet, StoredObject, UploadSession,
};
use crate::utils::naming::{self, ResultKey};

/// What a listing says about a session, before any state transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Correlation {
    /// Filename used for matching: the session's, or one inferred from a result key
    pub working_filename: Option<String>,
    pub inferred_filename: Option<String>,
    pub original_present: bool,
    pub latest_result: Option<String>,
    pub related: RelatedFileSet,
}

/// Newest object by modification time. Exact ties go to the greatest key so
/// that the same listing always yields the same pick.
fn newest<'a, I>(objects: I) -> Option<&'a StoredObject>
where
    I: IntoIterator<Item = &'a StoredObject>,
{
    objects
        .into_iter()
        .max_by(|a, b| {
            a.last_modified
                .cmp(&b.last_modified)
                .then_with(|| a.key.cmp(&b.key))
        })
}

/// Recovers an upload filename from the newest result key in the listing.
fn infer_filename(listing: &[StoredObject], default_extension: &str) -> Option<String> {
    let latest = newest(listing.iter().filter(|o| naming::is_result_candidate(&o.key)))?;
    ResultKey::parse(&latest.key).map(|parsed| parsed.inferred_upload_name(default_extension))
}

pub fn correlate(
    session: &UploadSession,
    listing: &[StoredObject],
    default_extension: &str,
) -> Correlation {
    let inferred_filename = match session.original_filename {
        Some(_) => None,
        None => infer_filename(listing, default_extension),
    };

    let working_filename = session
        .original_filename
        .clone()
        .or_else(|| inferred_filename.clone());

    let Some(filename) = working_filename.as_deref() else {
        return Correlation {
            working_filename: None,
            inferred_filename: None,
            original_present: false,
            latest_result: None,
            related: RelatedFileSet::default(),
        };
    };

    let basename = naming::basename_of(filename);
    let matching = listing.iter().filter(|o| {
        naming::is_result_for(&o.key, basename)
            && session
                .upload_time
                .is_none_or(|uploaded| o.last_modified >= uploaded)
    });
    let latest_result = newest(matching).map(|o| o.key.clone());

    let original_present = listing.iter().any(|o| o.key == filename);

    let mut related = RelatedFileSet::default();
    if original_present {
        related.push(filename);
    }
    if let Some(result) = &latest_result {
        related.push(result.as_str());
    }

    Correlation {
        working_filename,
        inferred_filename,
        original_present,
        latest_result,
        related,
    }
}

/// Runs one poll cycle against `session` and returns the updated session.
///
/// "Processing complete" is reported once per started session: on the first
/// cycle with a result after a cycle without one. Later cycles never re-arm
/// it; only a new session does.
pub fn advance(
    mut session: UploadSession,
    listing: &[StoredObject],
    default_extension: &str,
) -> (UploadSession, PollOutcome) {
    let correlation = correlate(&session, listing, default_extension);

    if session.original_filename.is_none() {
        session.original_filename = correlation.inferred_filename.clone();
    }

    let appeared = session.last_result.is_none() && correlation.latest_result.is_some();
    let processing_complete =
        session.processing_started && appeared && !session.completion_reported;
    if processing_complete {
        session.completion_reported = true;
    }
    session.last_result = correlation.latest_result.clone();

    let status = match (session.processing_started, &correlation.latest_result) {
        (false, _) => ProcessingStatus::Idle,
        (true, Some(_)) => ProcessingStatus::Complete,
        (true, None) => ProcessingStatus::Processing,
    };

    let outcome = PollOutcome {
        related: correlation.related,
        latest_result: correlation.latest_result,
        original_present: correlation.original_present,
        inferred_filename: correlation.inferred_filename,
        processing_complete,
        status,
    };

    (session, outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, hour, 0, 0).unwrap()
    }

    fn obj(key: &str, modified: DateTime<Utc>) -> StoredObject {
        StoredObject::new(key, modified)
    }

    #[test]
    fn test_no_result_candidates() {
        let listing = vec![obj("report.xlsx", at(10)), obj("other.csv", at(11))];

        let cold = correlate(&UploadSession::default(), &listing, "xlsx");
        assert!(cold.latest_result.is_none());
        assert!(cold.inferred_filename.is_none());
        assert!(cold.related.is_empty());

        let session = UploadSession::started("report.xlsx", at(9));
        let warm = correlate(&session, &listing, "xlsx");
        assert!(warm.latest_result.is_none());
        assert_eq!(warm.related.keys(), ["report.xlsx"]);
    }

    #[test]
    fn test_stale_result_is_excluded() {
        let upload = at(12);
        let session = UploadSession::started("report.xlsx", upload);

        let stale = vec![obj(
            "Price_report_20240101_120000.csv",
            upload - Duration::seconds(1),
        )];
        assert!(correlate(&session, &stale, "xlsx").latest_result.is_none());

        let fresh = vec![obj("Price_report_20240101_120000.csv", upload)];
        assert_eq!(
            correlate(&session, &fresh, "xlsx").latest_result.as_deref(),
            Some("Price_report_20240101_120000.csv")
        );
    }

    #[test]
    fn test_latest_result_wins() {
        let session = UploadSession::started("report.xlsx", at(11));
        let listing = vec![
            obj("Price_report_20240101_130000.csv", at(13)),
            obj("report.xlsx", at(11)),
            obj("Price_report_20240101_120000.csv", at(12)),
        ];

        let correlation = correlate(&session, &listing, "xlsx");
        assert_eq!(
            correlation.latest_result.as_deref(),
            Some("Price_report_20240101_130000.csv")
        );
        assert_eq!(
            correlation.related.keys(),
            ["report.xlsx", "Price_report_20240101_130000.csv"]
        );
    }

    #[test]
    fn test_equal_timestamps_pick_consistently() {
        let session = UploadSession::started("report.xlsx", at(11));
        let a = obj("Price_report_20240101_120000.csv", at(12));
        let b = obj("Price_report_20240101_120001.csv", at(12));

        let forward = correlate(&session, &[a.clone(), b.clone()], "xlsx");
        let reverse = correlate(&session, &[b, a], "xlsx");
        assert_eq!(forward.latest_result, reverse.latest_result);
    }

    #[test]
    fn test_other_uploads_are_ignored() {
        let session = UploadSession::started("report.xlsx", at(11));
        let listing = vec![
            obj("Price_report_final_20240101_130000.csv", at(13)),
            obj("Price_budget_20240101_130000.csv", at(13)),
        ];
        assert!(correlate(&session, &listing, "xlsx").latest_result.is_none());
    }

    #[test]
    fn test_cold_start_inference() {
        let listing = vec![obj("Price_budget_20240505_090000.csv", at(9))];

        let (session, outcome) = advance(UploadSession::default(), &listing, "xlsx");
        assert_eq!(outcome.inferred_filename.as_deref(), Some("budget.xlsx"));
        assert_eq!(session.original_filename.as_deref(), Some("budget.xlsx"));
        assert_eq!(
            outcome.related.keys(),
            ["Price_budget_20240505_090000.csv"]
        );
        assert!(!outcome.processing_complete);
        assert_eq!(outcome.status, ProcessingStatus::Idle);
    }

    #[test]
    fn test_cold_start_uses_newest_result() {
        let listing = vec![
            obj("Price_old_20240101_090000.csv", at(9)),
            obj("Price_new_20240101_100000.csv", at(10)),
        ];
        let correlation = correlate(&UploadSession::default(), &listing, "xlsx");
        assert_eq!(correlation.inferred_filename.as_deref(), Some("new.xlsx"));
        assert_eq!(
            correlation.latest_result.as_deref(),
            Some("Price_new_20240101_100000.csv")
        );
    }

    #[test]
    fn test_completion_fires_exactly_once() {
        let mut session = UploadSession::started("report.xlsx", at(10));
        let empty = vec![obj("report.xlsx", at(10))];
        let ready = vec![
            obj("report.xlsx", at(10)),
            obj("Price_report_20240101_110000.csv", at(11)),
        ];

        let mut fired = Vec::new();
        for listing in [&empty, &empty, &ready, &ready] {
            let (next, outcome) = advance(session, listing, "xlsx");
            fired.push(outcome.processing_complete);
            session = next;
        }
        assert_eq!(fired, [false, false, true, false]);
    }

    #[test]
    fn test_completion_not_rearmed_after_result_disappears() {
        let mut session = UploadSession::started("report.xlsx", at(10));
        let empty: Vec<StoredObject> = Vec::new();
        let ready = vec![obj("Price_report_20240101_110000.csv", at(11))];

        let mut fired = Vec::new();
        for listing in [&ready, &empty, &ready] {
            let (next, outcome) = advance(session, listing, "xlsx");
            fired.push(outcome.processing_complete);
            session = next;
        }
        assert_eq!(fired, [true, false, false]);
        assert!(session.completion_reported);
    }

    #[test]
    fn test_related_set_has_no_duplicates() {
        let session = UploadSession::started("report.xlsx", at(10));
        let listing = vec![
            obj("report.xlsx", at(10)),
            obj("report.xlsx", at(10)),
            obj("Price_report_20240101_110000.csv", at(11)),
        ];

        let correlation = correlate(&session, &listing, "xlsx");
        assert_eq!(
            correlation.related.keys(),
            ["report.xlsx", "Price_report_20240101_110000.csv"]
        );
    }
}
