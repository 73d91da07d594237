//! Core types for catalog-harvest

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::Error;

/// Which catalog a run searches
///
/// Selects the endpoint template, the field mapping used by the normalizer and the
/// column layout of the snapshot file.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum SearchTarget {
    /// Published national standards
    Standards,
    /// Standardization plans (drafting and revision projects)
    Plans,
}

impl SearchTarget {
    /// Lowercase name used in config files, run ids and logs
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchTarget::Standards => "standards",
            SearchTarget::Plans => "plans",
        }
    }

    /// Column headers of the snapshot file, in record field order
    pub fn columns(&self) -> &'static [&'static str] {
        match self {
            SearchTarget::Standards => &[
                "Website ID",
                "Title",
                "ID",
                "Enforcement",
                "Enforce Date",
                "Status",
                "Issue Date",
                "Project ID",
                "URL",
            ],
            SearchTarget::Plans => &[
                "Website ID",
                "Title",
                "ID",
                "Status",
                "Propose Date",
                "New or Update",
                "URL",
            ],
        }
    }
}

impl std::fmt::Display for SearchTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SearchTarget {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "standards" => Ok(SearchTarget::Standards),
            "plans" => Ok(SearchTarget::Plans),
            _ => Err(Error::UnknownRetrievalTarget(s.to_string())),
        }
    }
}

impl TryFrom<String> for SearchTarget {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// One result item exactly as the API reported it
///
/// The shape depends on the target and is not guaranteed to be complete.
pub type RawRow = serde_json::Map<String, serde_json::Value>;

/// A normalized standard record
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StandardRecord {
    /// Identifier assigned by the catalog website
    pub source_id: String,
    /// Cleaned title
    pub title: String,
    /// Standard code, e.g. "GB/T 7714-2015"
    pub code: String,
    /// Mandatory / recommended / guidance
    pub enforcement_kind: String,
    /// Date the standard takes effect
    pub enforce_date: NaiveDate,
    /// Current status (in force, abolished, upcoming)
    pub status: String,
    /// Publication date
    pub issue_date: NaiveDate,
    /// Numeric project identifier, absent when the source omits it
    pub project_id: Option<i64>,
    /// Detail page on the catalog website
    pub detail_url: String,
}

/// A normalized plan record
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlanRecord {
    /// Identifier assigned by the catalog website
    pub source_id: String,
    /// Cleaned title
    pub title: String,
    /// Plan code
    pub code: String,
    /// Current stage of the plan
    pub status: String,
    /// Date the plan was proposed
    pub propose_date: NaiveDate,
    /// New standard or revision of an existing one
    pub revision_kind: String,
    /// Detail page on the catalog website
    pub detail_url: String,
}

/// Normalized output record; the variant always matches the run's [`SearchTarget`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CanonicalRecord {
    /// Record from the standards endpoint
    Standard(StandardRecord),
    /// Record from the plans endpoint
    Plan(PlanRecord),
}

impl CanonicalRecord {
    /// Website identifier of the record
    pub fn source_id(&self) -> &str {
        match self {
            CanonicalRecord::Standard(r) => &r.source_id,
            CanonicalRecord::Plan(r) => &r.source_id,
        }
    }

    /// Cell values in the same order as [`SearchTarget::columns`]
    pub fn cells(&self) -> Vec<String> {
        match self {
            CanonicalRecord::Standard(r) => vec![
                r.source_id.clone(),
                r.title.clone(),
                r.code.clone(),
                r.enforcement_kind.clone(),
                r.enforce_date.to_string(),
                r.status.clone(),
                r.issue_date.to_string(),
                r.project_id.map(|id| id.to_string()).unwrap_or_default(),
                r.detail_url.clone(),
            ],
            CanonicalRecord::Plan(r) => vec![
                r.source_id.clone(),
                r.title.clone(),
                r.code.clone(),
                r.status.clone(),
                r.propose_date.to_string(),
                r.revision_kind.clone(),
                r.detail_url.clone(),
            ],
        }
    }
}

/// Result of one fetch attempt, after classification
///
/// Produced once per attempt and never persisted.
#[derive(Clone, Debug, PartialEq)]
pub enum PageOutcome {
    /// The page carried result rows, in API order
    Rows(Vec<RawRow>),
    /// The page was empty: there is nothing after it
    EndOfStream,
    /// The remote explicitly refused the request
    Blocked {
        /// Code reported by the remote
        code: String,
        /// Message reported by the remote
        message: String,
    },
    /// The request could not be completed at the transport level
    TransientFailure {
        /// Description of the transport failure
        cause: String,
    },
    /// The body did not have any recognizable shape
    MalformedResponse {
        /// The raw body, kept for diagnosis
        body: String,
    },
}

impl PageOutcome {
    /// Short label for logs
    pub fn kind(&self) -> &'static str {
        match self {
            PageOutcome::Rows(_) => "rows",
            PageOutcome::EndOfStream => "end_of_stream",
            PageOutcome::Blocked { .. } => "blocked",
            PageOutcome::TransientFailure { .. } => "transient_failure",
            PageOutcome::MalformedResponse { .. } => "malformed_response",
        }
    }
}

/// Identifier of a run, used as the snapshot directory name
///
/// Derived from the search keywords and the target: spaces become underscores and an
/// empty keyword string becomes `all`, e.g. `food_safety_standards`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RunId(String);

impl RunId {
    /// Build the run id for a keyword/target pair
    pub fn new(keywords: &str, target: SearchTarget) -> Self {
        let keywords = keywords.trim();
        let stem = if keywords.is_empty() {
            "all".to_string()
        } else {
            keywords
                .chars()
                .map(|c| match c {
                    ' ' | '/' | '\\' => '_',
                    other => other,
                })
                .collect()
        };
        Self(format!("{stem}_{target}"))
    }

    /// Borrow the id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// How a run terminated
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunEnd {
    /// The remote returned an empty page
    EndOfStream,
    /// The page-count safety bound was reached without seeing an empty page
    PageLimit,
    /// An interrupt was observed
    Cancelled,
}

/// Summary returned by [`Harvester::run`](crate::harvester::Harvester::run)
#[derive(Clone, Debug)]
pub struct RunReport {
    /// Run identifier
    pub run_id: RunId,
    /// How the loop terminated
    pub end: RunEnd,
    /// Pages whose rows were appended
    pub pages_fetched: u32,
    /// Pages given up on after exhausting the retry budget
    pub abandoned_pages: Vec<u32>,
    /// Records in the final result set
    pub records: usize,
    /// Path of the final snapshot, `None` if the final flush failed
    pub snapshot: Option<PathBuf>,
}
