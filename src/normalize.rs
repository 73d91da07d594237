//! Record normalization
//!
//! Maps a [`RawRow`] onto the canonical schema for the active [`SearchTarget`].
//! Normalization is total: a field missing from the row (or present as JSON `null`,
//! or holding something unparsable) is replaced by its default instead of failing the
//! record, because the upstream schema drifts and one odd row must not cost a page.
//!
//! # Example
//!
//! ```
//! use catalog_harvest::normalize::normalize;
//! use catalog_harvest::types::{CanonicalRecord, SearchTarget};
//!
//! let row = serde_json::json!({
//!     "id": "71F772D8",
//!     "C_C_NAME": "<sacinfo>Information  technology</sacinfo>: Vocabulary",
//!     "C_STD_CODE": "GB/T 5271.1-2000",
//! });
//! let row = row.as_object().cloned().unwrap_or_default();
//!
//! let CanonicalRecord::Standard(record) = normalize(&row, SearchTarget::Standards) else {
//!     unreachable!()
//! };
//! assert_eq!(record.title, "Information technology： Vocabulary");
//! assert_eq!(record.enforce_date.to_string(), "1949-10-01");
//! ```

use chrono::NaiveDate;
use serde_json::Value;

use crate::types::{CanonicalRecord, PlanRecord, RawRow, SearchTarget, StandardRecord};

/// Detail page template; the row identifier is appended
pub const DETAIL_URL_BASE: &str = "https://std.samr.gov.cn/gb/search/gbDetailed?id=";

/// Wrapper markup the catalog embeds around matched title fragments
const TITLE_MARKUP: [&str; 2] = ["<sacinfo>", "</sacinfo>"];

/// Date used when a row carries no usable date
pub fn sentinel_date() -> NaiveDate {
    // 1949-10-01 is a valid calendar date, the fallback is never taken
    NaiveDate::from_ymd_opt(1949, 10, 1).unwrap_or_default()
}

/// Normalize one row for the given target
#[must_use]
pub fn normalize(row: &RawRow, target: SearchTarget) -> CanonicalRecord {
    let source_id = text_field(row, "id");
    let detail_url = if source_id.is_empty() {
        String::new()
    } else {
        format!("{DETAIL_URL_BASE}{source_id}")
    };
    let title = clean_title(&raw_text(row, "C_C_NAME"));

    match target {
        SearchTarget::Standards => CanonicalRecord::Standard(StandardRecord {
            source_id,
            title,
            code: text_field(row, "C_STD_CODE"),
            enforcement_kind: text_field(row, "STD_NATURE"),
            enforce_date: date_field(row, "ACT_DATE"),
            status: text_field(row, "STATE"),
            issue_date: date_field(row, "ISSUE_DATE"),
            project_id: integer_field(row, "PROJECT_ID"),
            detail_url,
        }),
        SearchTarget::Plans => CanonicalRecord::Plan(PlanRecord {
            source_id,
            title,
            code: text_field(row, "C_PLAN_CODE"),
            status: text_field(row, "CURRENT_LINK"),
            propose_date: date_field(row, "SEND_DATE"),
            revision_kind: text_field(row, "STD_FORM"),
            detail_url,
        }),
    }
}

/// Normalize every row of a page, preserving order
pub fn normalize_page(rows: &[RawRow], target: SearchTarget) -> Vec<CanonicalRecord> {
    rows.iter().map(|row| normalize(row, target)).collect()
}

/// Collapse whitespace runs to a single space and trim both ends
pub fn collapse_whitespace(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Clean a title: drop wrapper markup, collapse whitespace, use full-width colons
pub fn clean_title(raw: &str) -> String {
    let stripped = TITLE_MARKUP
        .iter()
        .fold(raw.to_string(), |acc, tag| acc.replace(tag, ""));
    collapse_whitespace(&stripped).replace(':', "：")
}

fn raw_text(row: &RawRow, key: &str) -> String {
    match row.get(key) {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(other) => other.to_string(),
    }
}

fn text_field(row: &RawRow, key: &str) -> String {
    collapse_whitespace(&raw_text(row, key))
}

fn date_field(row: &RawRow, key: &str) -> NaiveDate {
    let raw = raw_text(row, key);
    let raw = raw.trim();
    // Accept "2020-01-01" as well as "2020-01-01 00:00:00" / "2020-01-01T00:00:00"
    raw.get(..10)
        .and_then(|day| NaiveDate::parse_from_str(day, "%Y-%m-%d").ok())
        .unwrap_or_else(sentinel_date)
}

fn integer_field(row: &RawRow, key: &str) -> Option<i64> {
    match row.get(key)? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
