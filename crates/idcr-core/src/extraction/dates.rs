//! Date normalization for OCR'd "day month year" text.

use chrono::NaiveDate;
use tracing::debug;

use crate::error::DateError;

use super::fuzzy::extract_one;

/// Month abbreviations in the spelling printed on the source documents.
/// "Mac" is the Malay abbreviation of March.
pub const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mac", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Default minimum score for accepting a month correction.
pub const DEFAULT_MONTH_CUTOFF: u8 = 60;

/// Map a possibly misread month token to its three-letter abbreviation.
///
/// Returns the input unchanged when no month scores at least `cutoff`.
pub fn correct_month(token: &str, cutoff: u8) -> String {
    match extract_one(token, &MONTHS) {
        Some((best, score)) if score >= cutoff => {
            let month = if best == "Mac" { "Mar" } else { best };
            debug!("Month {:?} corrected to {} (score {})", token, month, score);
            month.to_string()
        }
        _ => token.to_string(),
    }
}

/// Turns "14 Mac 1995" style text into "950314".
#[derive(Debug, Clone, Copy)]
pub struct DateNormalizer {
    month_cutoff: u8,
}

impl DateNormalizer {
    pub fn new(month_cutoff: u8) -> Self {
        Self { month_cutoff }
    }

    pub fn normalize(&self, text: &str) -> Result<String, DateError> {
        let tokens: Vec<&str> = text.split_whitespace().collect();
        let [day, month, year] = tokens[..] else {
            return Err(DateError::TokenCount {
                found: tokens.len(),
                text: text.to_string(),
            });
        };

        let corrected = format!("{} {} {}", day, correct_month(month, self.month_cutoff), year);
        // chrono's %Y takes any number of digits; a dropped digit must not parse
        if year.len() != 4 || !year.bytes().all(|b| b.is_ascii_digit()) {
            return Err(DateError::Parse { text: corrected });
        }
        let date = NaiveDate::parse_from_str(&corrected, "%d %b %Y")
            .map_err(|_| DateError::Parse { text: corrected })?;

        Ok(date.format("%y%m%d").to_string())
    }
}

impl Default for DateNormalizer {
    fn default() -> Self {
        Self::new(DEFAULT_MONTH_CUTOFF)
    }
}

/// Normalize with the default month cutoff.
pub fn normalize_date(text: &str) -> Result<String, DateError> {
    DateNormalizer::default().normalize(text)
}
