pub mod validation;

use crate::error::RecError;
use csv::StringRecord;
use std::cmp::Ordering;

/// Stable descending sort by `score`, then truncation to `k`.
/// Entries with equal scores keep their input order.
pub fn top_k_by_score<T, F>(mut entries: Vec<T>, k: usize, score: F) -> Vec<T>
where
    F: Fn(&T) -> f32,
{
    entries.sort_by(|a, b| score(b).partial_cmp(&score(a)).unwrap_or(Ordering::Equal));
    entries.truncate(k);
    entries
}

// Header rows are recognised by the caller, so a malformed first record is
// still reported instead of being skipped.
pub fn csv_reader(content: &str) -> csv::Reader<&[u8]> {
    csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes())
}

/// Matches `header` exactly, or its first `min_len` or more columns.
pub fn is_header_row(record: &StringRecord, header: &[&str], min_len: usize) -> bool {
    record.len() >= min_len
        && record.len() <= header.len()
        && record.iter().zip(header).all(|(field, expected)| field == *expected)
}

pub fn record_line(record: &StringRecord) -> usize {
    record.position().map(|p| p.line() as usize).unwrap_or(0)
}

pub fn csv_error(source_name: &str, e: csv::Error) -> RecError {
    let line = e.position().map(|p| p.line() as usize).unwrap_or(0);
    RecError::parse(source_name, line, e.to_string())
}
