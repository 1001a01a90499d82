//! Validation engine.
//!
//! Pure checks of a candidate field map against its schema and the
//! existing collection. The engine never coerces or retries: canonical case
//! and defaults are the store's job, and the first violated rule is
//! reported.

mod rules;
mod validator;

pub use rules::{age_range, parse_date, DATE_FORMAT};
pub use validator::Validator;
