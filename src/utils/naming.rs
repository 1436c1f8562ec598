//! Naming grammar for result objects written by the pricing job.
//!
//! Result keys look like `Price_<basename>_<YYYYMMDD>_<HHMMSS>.csv`. Both
//! directions of the grammar live here so parsing a result key and building
//! the prefix for a basename can never drift apart.

use regex::Regex;
use std::sync::LazyLock;

pub const RESULT_PREFIX: &str = "Price_";
pub const RESULT_EXTENSION: &str = "csv";

static RESULT_KEY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^Price_(?P<base>.+)_(?P<date>\d{8})_(?P<time>\d{6})\.csv$")
        .expect("result key pattern is valid")
});

/// A result key split into its grammar parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultKey {
    pub basename: String,
    pub date: String,
    pub time: String,
}

impl ResultKey {
    /// Parses a bucket key. Returns `None` for anything that is not a result key.
    pub fn parse(key: &str) -> Option<Self> {
        let caps = RESULT_KEY_RE.captures(key)?;
        Some(Self {
            basename: caps["base"].to_string(),
            date: caps["date"].to_string(),
            time: caps["time"].to_string(),
        })
    }

    /// Formats the key back. The client never produces result keys for the
    /// bucket; this exists for fixtures and for symmetry with `parse`.
    pub fn format(&self) -> String {
        format!(
            "{}{}_{}_{}.{}",
            RESULT_PREFIX, self.basename, self.date, self.time, RESULT_EXTENSION
        )
    }

    /// Upload filename this result was most likely produced from.
    pub fn inferred_upload_name(&self, default_extension: &str) -> String {
        format!("{}.{}", self.basename, default_extension.trim_start_matches('.'))
    }
}

/// True for any key the processing job could have written.
pub fn is_result_candidate(key: &str) -> bool {
    key.starts_with(RESULT_PREFIX)
}

/// `report.xlsx` -> `report`. Only the last extension is stripped.
pub fn basename_of(filename: &str) -> &str {
    match filename.rfind('.') {
        Some(0) | None => filename,
        Some(idx) => &filename[..idx],
    }
}

/// Key prefix shared by every result produced for `basename`.
pub fn result_prefix_for(basename: &str) -> String {
    format!("{}{}_", RESULT_PREFIX, basename)
}

/// Whether `key` is a well-formed result key belonging to `basename`.
pub fn is_result_for(key: &str, basename: &str) -> bool {
    key.starts_with(&result_prefix_for(basename))
        && ResultKey::parse(key).is_some_and(|parsed| parsed.basename == basename)
}
