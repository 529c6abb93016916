use chrono::NaiveDate;

pub const ANCHOR_FORMAT: &str = "%Y-%m-%d";

/// Resolves the analysis-date anchor used in the prompt.
///
/// An explicit value is free text and is passed through verbatim; a missing or blank
/// one falls back to `today` formatted as `YYYY-MM-DD`.
pub fn resolve_analysis_anchor(anchor_arg: Option<&str>, today: NaiveDate) -> String {
    match anchor_arg.filter(|s| !s.trim().is_empty()) {
        Some(s) => s.to_string(),
        None => today.format(ANCHOR_FORMAT).to_string(),
    }
}
