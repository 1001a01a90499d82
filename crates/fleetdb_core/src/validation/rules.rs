//! Individual field rules.

use crate::error::ValidationError;
use crate::password;
use crate::schema::Rule;
use chrono::NaiveDate;
use std::ops::RangeInclusive;

/// Persisted date layout.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Parses a persisted date.
#[must_use]
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, DATE_FORMAT).ok()
}

/// Allowed age range for a position.
///
/// Owners and managers may be 18 to 120, drivers and blue-collar staff 18
/// to 60. Any other position falls back to 1 to 120.
#[must_use]
pub fn age_range(position: &str) -> RangeInclusive<i64> {
    match position {
        "Owner" | "Manager" => 18..=120,
        "Driver" | "Blue-Collar" => 18..=60,
        _ => 1..=120,
    }
}

pub(crate) fn check_rule(
    rule: &Rule,
    field: &str,
    value: &str,
    today: NaiveDate,
) -> Result<(), ValidationError> {
    match rule {
        Rule::Pattern { regex, hint } => {
            if regex.is_match(value) {
                Ok(())
            } else {
                Err(ValidationError::new(
                    field,
                    format!("{value:?} must be {hint}"),
                ))
            }
        }
        Rule::NonEmpty => {
            if value.trim().is_empty() {
                Err(ValidationError::new(field, "must not be empty"))
            } else {
                Ok(())
            }
        }
        Rule::NotFuture => match parse_date(value) {
            Some(date) if date > today => {
                Err(ValidationError::new(field, "must not be in the future"))
            }
            Some(_) => Ok(()),
            None => Err(date_format_error(field)),
        },
        // The store strength-checks caller-supplied secrets before
        // validation, so only stored hashes skip the rule.
        Rule::Password => {
            if password::is_hashed(value) {
                Ok(())
            } else {
                password::check_strength(field, value)
            }
        }
    }
}

pub(crate) fn date_format_error(field: &str) -> ValidationError {
    ValidationError::new(field, "must be a date in YYYY-MM-DD format")
}
