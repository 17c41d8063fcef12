//! Card field validation
//!
//! Each field validator takes the raw input and returns a human-readable error
//! message, or an empty string when the value is valid. The same rules back
//! the CLI entry form and the server-side checks.
//!
//! Expiry validation depends on the current date. The `*_at` variants take an
//! explicit reference date for deterministic callers.

use std::sync::LazyLock;

use chrono::{Datelike, Local, NaiveDate};
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::result::{Error, Result};

/// Earliest accepted expiry year (two-digit, i.e. 2025)
pub const MIN_EXPIRY_YEAR: u32 = 25;

/// How many years past the current one an expiry may lie
pub const MAX_YEARS_AHEAD: u32 = 5;

/// Maximum length of the card holder name, in characters
pub const MAX_HOLDER_LEN: usize = 20;

const CARD_NUMBER_LEN: usize = 16;

static HOLDER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-ZáéíóúÁÉÍÓÚñÑüÜ\s]+$").expect("holder pattern is valid"));

static EXPIRY_SHAPE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{2}/[0-9]{2}$").expect("expiry pattern is valid"));

static EXPIRY_FORMAT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(0[1-9]|1[0-2])/[0-9]{2}$").expect("expiry format pattern is valid")
});

static CVV_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{3,4}$").expect("cvv pattern is valid"));

pub fn validate_card_number(value: &str) -> String {
    let cleaned: String = value.chars().filter(|c| !c.is_whitespace()).collect();
    if cleaned.is_empty() {
        return "Card number is required".to_string();
    }
    if !cleaned.chars().all(|c| c.is_ascii_digit()) {
        return "Card number can only contain digits".to_string();
    }
    if cleaned.len() != CARD_NUMBER_LEN {
        return format!("Card number must have {CARD_NUMBER_LEN} digits");
    }
    String::new()
}

pub fn validate_card_holder(value: &str) -> String {
    if value.trim().is_empty() {
        return "Card holder name is required".to_string();
    }
    if !HOLDER_RE.is_match(value) {
        return "Name can only contain letters, including accented letters".to_string();
    }
    if value.chars().count() > MAX_HOLDER_LEN {
        return format!("Name cannot exceed {MAX_HOLDER_LEN} characters");
    }
    String::new()
}

/// Validate an expiry date against today's local date
pub fn validate_expiry_date(value: &str) -> String {
    validate_expiry_date_at(value, Local::now().date_naive())
}

/// Validate an expiry date as seen on `today`
pub fn validate_expiry_date_at(value: &str, today: NaiveDate) -> String {
    if value.is_empty() {
        return "Expiry date is required".to_string();
    }
    let Some((month, year)) = split_expiry(value) else {
        return "Expiry date must use the MM/YY format".to_string();
    };

    let current_year = today.year().rem_euclid(100).unsigned_abs();
    let max_year = current_year + MAX_YEARS_AHEAD;

    if !(1..=12).contains(&month) {
        return "Month must be between 01 and 12".to_string();
    }
    if year < MIN_EXPIRY_YEAR {
        return format!("Year cannot be earlier than 20{MIN_EXPIRY_YEAR:02}");
    }
    if year > max_year {
        return format!("Year cannot be later than 20{max_year:02}");
    }
    if year == current_year && month < today.month() {
        return "Card has expired".to_string();
    }
    String::new()
}

pub fn validate_cvv(value: &str) -> String {
    if value.is_empty() {
        return "CVV is required".to_string();
    }
    if !CVV_RE.is_match(value) {
        return "CVV must have 3 or 4 digits".to_string();
    }
    String::new()
}

/// Per-field outcome of validating a whole card form
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub card_number: String,
    pub card_holder: String,
    pub expiry_date: String,
    pub cvv: String,
}

impl ValidationReport {
    pub fn has_errors(&self) -> bool {
        self.errors().next().is_some()
    }

    /// Non-empty messages keyed by wire field name
    pub fn errors(&self) -> impl Iterator<Item = (&'static str, &str)> {
        [
            ("cardNumber", self.card_number.as_str()),
            ("cardHolder", self.card_holder.as_str()),
            ("expiryDate", self.expiry_date.as_str()),
            ("cvv", self.cvv.as_str()),
        ]
        .into_iter()
        .filter(|(_, message)| !message.is_empty())
    }
}

/// Run all four field validators
pub fn validate_all(number: &str, holder: &str, expiry: &str, cvv: &str) -> ValidationReport {
    validate_all_at(number, holder, expiry, cvv, Local::now().date_naive())
}

pub fn validate_all_at(
    number: &str,
    holder: &str,
    expiry: &str,
    cvv: &str,
    today: NaiveDate,
) -> ValidationReport {
    ValidationReport {
        card_number: validate_card_number(number),
        card_holder: validate_card_holder(holder),
        expiry_date: validate_expiry_date_at(expiry, today),
        cvv: validate_cvv(cvv),
    }
}

/// Expiry rules applied by the record store on create and update
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpiryPolicy {
    /// Reject years before `min_year`
    pub enforce_min_year: bool,
    /// Two-digit year
    pub min_year: u32,
}

impl Default for ExpiryPolicy {
    fn default() -> Self {
        Self {
            enforce_min_year: true,
            min_year: MIN_EXPIRY_YEAR,
        }
    }
}

impl ExpiryPolicy {
    /// Only the `MM/YY` shape with a real month
    pub fn format_only() -> Self {
        Self {
            enforce_min_year: false,
            ..Self::default()
        }
    }

    pub fn check(&self, expiry: &str) -> Result<()> {
        if !EXPIRY_FORMAT_RE.is_match(expiry) {
            return Err(Error::validation(
                "Invalid expiry date format. Expected MM/YY",
            ));
        }
        if self.enforce_min_year {
            let year = split_expiry(expiry).map_or(0, |(_, year)| year);
            if year < self.min_year {
                return Err(Error::validation(format!(
                    "Invalid expiry date. Year cannot be earlier than 20{:02}",
                    self.min_year
                )));
            }
        }
        Ok(())
    }
}

fn split_expiry(value: &str) -> Option<(u32, u32)> {
    if !EXPIRY_SHAPE_RE.is_match(value) {
        return None;
    }
    let (month, year) = value.split_once('/')?;
    Some((month.parse().ok()?, year.parse().ok()?))
}

// === Display helpers ===

/// Group digits in blocks of four, e.g. `4111 1111 1111 1111`
pub fn format_card_number(value: &str) -> String {
    let digits: Vec<char> = value.chars().filter(char::is_ascii_digit).collect();
    let grouped = digits
        .chunks(4)
        .map(|chunk| chunk.iter().collect::<String>())
        .collect::<Vec<_>>()
        .join(" ");
    grouped.chars().take(19).collect()
}

/// Normalize free-form expiry input to `MM/YY`
pub fn format_expiry(value: &str) -> String {
    let digits: String = value.chars().filter(char::is_ascii_digit).collect();
    if digits.len() >= 2 {
        let year: String = digits[2..].chars().take(2).collect();
        format!("{}/{}", &digits[..2], year)
    } else {
        digits
    }
}

/// Hide all but the first two and last four digits of a 16-digit number
///
/// Anything that is not a 16-character number is returned unchanged.
pub fn mask_card_number(card_number: &str) -> String {
    let chars: Vec<char> = card_number.chars().filter(|c| !c.is_whitespace()).collect();
    if chars.len() != CARD_NUMBER_LEN {
        return card_number.to_string();
    }
    let head: String = chars[..2].iter().collect();
    let tail: String = chars[12..].iter().collect();
    format!("{head}**********{tail}")
}
