//! Human-readable document numbers: `PREFIX-YYYYMMDD-NNNN`.

use chrono::NaiveDate;

/// Format a document number for `date` with a 1-based daily sequence.
pub fn document_number(prefix: &str, date: NaiveDate, seq: u32) -> String {
    format!("{prefix}-{}-{seq:04}", date.format("%Y%m%d"))
}

/// Next daily sequence given the numbers already issued.
///
/// Numbers for other prefixes or other days are ignored, as are malformed ones.
pub fn next_sequence<'a>(
    prefix: &str,
    date: NaiveDate,
    existing: impl IntoIterator<Item = &'a str>,
) -> u32 {
    let day_prefix = format!("{prefix}-{}-", date.format("%Y%m%d"));
    existing
        .into_iter()
        .filter_map(|n| n.strip_prefix(day_prefix.as_str()))
        .filter_map(|seq| seq.parse::<u32>().ok())
        .max()
        .unwrap_or(0)
        .saturating_add(1)
}
