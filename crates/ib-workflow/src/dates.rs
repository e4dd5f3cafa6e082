//! Renewal date arithmetic.

use chrono::NaiveDate;
use ib_portal_types::{add_years_clamped, format_portal_date, parse_portal_date};

/// Advance a textual date by exactly one calendar year. A string that does
/// not parse as a date comes back untouched.
pub fn roll_forward_one_year(value: &str) -> String {
    match parse_portal_date(value) {
        Some(d) => format_portal_date(add_years_clamped(d, 1)),
        None => value.to_string(),
    }
}

/// Same roll-forward on an already-parsed date.
pub fn roll_forward(date: NaiveDate) -> NaiveDate {
    add_years_clamped(date, 1)
}
