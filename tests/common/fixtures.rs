//! Response bodies and snapshot readers

use serde_json::json;
use std::path::Path;

/// Rows served per full page, matching the fixed page size
pub const FULL_PAGE: usize = 50;

/// A standards page of `count` rows with ids unique across pages
pub fn standards_page(page: u32, count: usize) -> String {
    let rows: Vec<_> = (0..count)
        .map(|i| {
            json!({
                "id": format!("std-{page}-{i}"),
                "C_C_NAME": format!("<sacinfo>Food</sacinfo> safety: part {i}"),
                "C_STD_CODE": format!("GB {page}{i:03}-2020"),
                "STD_NATURE": "mandatory",
                "ACT_DATE": "2021-01-01 00:00:00",
                "STATE": "current",
                "ISSUE_DATE": "2020-06-30",
                "PROJECT_ID": page * 1000 + i as u32,
            })
        })
        .collect();
    json!({ "rows": rows, "total": 100 }).to_string()
}

/// A plans page of `count` rows
pub fn plans_page(page: u32, count: usize) -> String {
    let rows: Vec<_> = (0..count)
        .map(|i| {
            json!({
                "id": format!("plan-{page}-{i}"),
                "C_C_NAME": format!("Plan {page}, item {i}"),
                "C_PLAN_CODE": format!("2021{page:03}{i:03}-T-469"),
                "CURRENT_LINK": "drafting",
                "SEND_DATE": "2021-03-15",
                "STD_FORM": "revision",
            })
        })
        .collect();
    json!({ "rows": rows }).to_string()
}

/// The empty page that ends a search
pub fn empty_page() -> String {
    json!({ "rows": [], "total": 0 }).to_string()
}

/// A throttling refusal
pub fn blocked_body() -> String {
    json!({ "code": 403, "message": "too many requests" }).to_string()
}

/// Read a snapshot and return the first column of every data row
pub fn snapshot_ids(path: &Path) -> Vec<String> {
    let text = std::fs::read_to_string(path).unwrap_or_default();
    text.lines()
        .skip(1)
        .map(|line| line.split(',').next().unwrap_or_default().to_string())
        .collect()
}
