//! Property-based test generators using proptest.
//!
//! Strategies produce field values that pass validation, so properties
//! can focus on store behavior rather than on input rejection.

use fleetdb_core::{validation::age_range, POSITIONS};
use proptest::prelude::*;

/// Strategy for registration numbers like `MH12AB1234`.
pub fn plate_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[A-Z]{2}[0-9]{2}[A-Z]{2}[0-9]{4}").expect("Invalid regex")
}

/// Strategy for engine numbers like `A123BCDE56789`.
pub fn engine_number_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[A-Z][0-9]{3}[A-Z]{4}[0-9]{5}").expect("Invalid regex")
}

/// Strategy for 17-character VINs (no I, O or Q).
pub fn chassis_number_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[A-HJ-NPR-Z0-9]{17}").expect("Invalid regex")
}

/// Strategy for mobile numbers accepted by every mobile policy.
pub fn mobile_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[6-9][0-9]{9}").expect("Invalid regex")
}

/// Strategy for lowercase e-mail addresses.
pub fn email_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z][a-z0-9._]{0,11}@(example|fleet)\\.com").expect("Invalid regex")
}

/// Strategy for passwords meeting the strength policy.
pub fn strong_password_strategy() -> impl Strategy<Value = String> {
    (
        prop::string::string_regex("[A-Z][a-z]{5,8}").expect("Invalid regex"),
        prop::string::string_regex("[0-9]{1,4}").expect("Invalid regex"),
        prop::sample::select(vec!['@', '#', '!', '$', '%', '&', '*']),
    )
        .prop_map(|(word, digits, mark)| format!("{word}{mark}{digits}"))
}

/// Strategy for passwords missing exactly one requirement.
pub fn weak_password_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        prop::string::string_regex("[A-Z][a-z][0-9]@").expect("Invalid regex"),
        prop::string::string_regex("[a-z]{6}[0-9]{2}@").expect("Invalid regex"),
        prop::string::string_regex("[A-Z]{6}[0-9]{2}@").expect("Invalid regex"),
        prop::string::string_regex("[A-Z][a-z]{6}@").expect("Invalid regex"),
        prop::string::string_regex("[A-Z][a-z]{6}[0-9]").expect("Invalid regex"),
    ]
}

/// Strategy for a position and an age allowed for it.
pub fn position_and_age_strategy() -> impl Strategy<Value = (String, i64)> {
    prop::sample::select(POSITIONS.to_vec()).prop_flat_map(|position| {
        let range = age_range(position);
        (Just(position.to_string()), range)
    })
}

/// Strategy for a position and an age just outside its range.
pub fn position_and_bad_age_strategy() -> impl Strategy<Value = (String, i64)> {
    prop::sample::select(POSITIONS.to_vec()).prop_flat_map(|position| {
        let range = age_range(position);
        let outside = vec![range.start() - 1, range.end() + 1];
        (Just(position.to_string()), prop::sample::select(outside))
    })
}

/// Strategy for display names.
pub fn name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[A-Z][a-z]{2,9} [A-Z][a-z]{2,9}").expect("Invalid regex")
}
