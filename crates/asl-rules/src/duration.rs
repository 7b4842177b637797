//! # Licence Duration and Expiry
//!
//! A licence runs for at most five years from its issue date. The requested
//! duration arrives as an untyped `{years, months}` object:
//!
//! - non-integer or negative components count as zero;
//! - `years >= 5`, or both components zero, means exactly five years;
//! - `months > 12` is ignored (zero months).
//!
//! Two expiry variants exist. The standard variant (grant, convert,
//! issue-date change) is `issue + duration`. The legacy stub variant, used
//! when a paper licence is first digitised, is one day earlier and snapped
//! to the end of that day.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use asl_core::temporal::{add_months, end_of_day, sub_days};

/// Longest licence term in years.
pub const MAX_YEARS: u32 = 5;

/// A capped licence duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LicenceDuration {
    /// Whole years, at most [`MAX_YEARS`].
    pub years: u32,
    /// Additional months, at most 12.
    pub months: u32,
}

impl LicenceDuration {
    /// The five-year default.
    pub const MAXIMUM: Self = Self {
        years: MAX_YEARS,
        months: 0,
    };

    /// Apply the capping rules to a raw `duration` value.
    pub fn capped(raw: Option<&Value>) -> Self {
        let years = raw.and_then(|d| d.get("years")).and_then(whole_number);
        let months = raw.and_then(|d| d.get("months")).and_then(whole_number);
        let years = years.unwrap_or(0);
        let months = months.unwrap_or(0);

        if years >= u64::from(MAX_YEARS) || (years == 0 && months == 0) {
            return Self::MAXIMUM;
        }
        let months = if months > 12 { 0 } else { months };
        if years == 0 && months == 0 {
            return Self::MAXIMUM;
        }
        // years < 5 and months <= 12 here, so both fit in u32.
        Self {
            years: years as u32,
            months: months as u32,
        }
    }

    /// Total length in months.
    pub fn total_months(&self) -> u32 {
        self.years * 12 + self.months
    }
}

/// Read a JSON number as a non-negative whole number.
fn whole_number(v: &Value) -> Option<u64> {
    if let Some(n) = v.as_u64() {
        return Some(n);
    }
    match v.as_f64() {
        Some(f) if f >= 0.0 && f.fract() == 0.0 && f <= u32::MAX as f64 => Some(f as u64),
        _ => None,
    }
}

/// Standard expiry: `issue + capped(duration)`.
pub fn expiry_date(issue_date: DateTime<Utc>, duration: Option<&Value>) -> DateTime<Utc> {
    add_months(issue_date, LicenceDuration::capped(duration).total_months())
}

/// Legacy stub expiry: the standard expiry minus one day, at end of day.
pub fn legacy_stub_expiry_date(issue_date: DateTime<Utc>, duration: Option<&Value>) -> DateTime<Utc> {
    end_of_day(sub_days(expiry_date(issue_date, duration), 1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use asl_core::temporal::parse_timestamp;
    use proptest::prelude::*;
    use serde_json::json;

    fn at(s: &str) -> DateTime<Utc> {
        parse_timestamp(s).unwrap()
    }

    #[test]
    fn years_over_five_capped_to_exactly_five() {
        let d = json!({"years": 7, "months": 6});
        assert_eq!(
            expiry_date(at("2020-01-15T09:00:00Z"), Some(&d)),
            at("2025-01-15T09:00:00Z")
        );
    }

    #[test]
    fn months_over_twelve_ignored() {
        let d = json!({"years": 2, "months": 25});
        assert_eq!(
            expiry_date(at("2020-01-15T09:00:00Z"), Some(&d)),
            at("2022-01-15T09:00:00Z")
        );
    }

    #[test]
    fn months_only() {
        let d = json!({"years": 0, "months": 3});
        assert_eq!(
            expiry_date(at("2020-01-15T09:00:00Z"), Some(&d)),
            at("2020-04-15T09:00:00Z")
        );
    }

    #[test]
    fn absent_duration_is_five_years() {
        assert_eq!(LicenceDuration::capped(None), LicenceDuration::MAXIMUM);
        let zeros = json!({"years": 0, "months": 0});
        assert_eq!(LicenceDuration::capped(Some(&zeros)), LicenceDuration::MAXIMUM);
    }

    #[test]
    fn non_integers_coerced_to_zero() {
        let d = json!({"years": "three", "months": 4});
        assert_eq!(
            LicenceDuration::capped(Some(&d)),
            LicenceDuration { years: 0, months: 4 }
        );
        let d = json!({"years": 2.5, "months": 1});
        assert_eq!(
            LicenceDuration::capped(Some(&d)),
            LicenceDuration { years: 0, months: 1 }
        );
        let d = json!({"years": 3.0});
        assert_eq!(
            LicenceDuration::capped(Some(&d)),
            LicenceDuration { years: 3, months: 0 }
        );
    }

    #[test]
    fn negative_counts_as_zero() {
        let d = json!({"years": -1, "months": 6});
        assert_eq!(
            LicenceDuration::capped(Some(&d)),
            LicenceDuration { years: 0, months: 6 }
        );
    }

    #[test]
    fn months_zero_after_ignoring_invalid_is_five_years() {
        let d = json!({"years": 0, "months": 13});
        assert_eq!(LicenceDuration::capped(Some(&d)), LicenceDuration::MAXIMUM);
    }

    #[test]
    fn legacy_variant_is_day_earlier_end_of_day() {
        let d = json!({"years": 3, "months": 0});
        let expiry = legacy_stub_expiry_date(at("2015-06-10T00:00:00Z"), Some(&d));
        assert_eq!(expiry.to_rfc3339(), "2018-06-09T23:59:59.999+00:00");
    }

    #[test]
    fn legacy_and_standard_variants_differ() {
        let issue = at("2015-06-10T12:00:00Z");
        assert_ne!(
            expiry_date(issue, None),
            legacy_stub_expiry_date(issue, None)
        );
    }

    proptest! {
        #[test]
        fn never_exceeds_five_years(years in -3i64..40, months in -3i64..40) {
            let d = json!({"years": years, "months": months});
            let capped = LicenceDuration::capped(Some(&d));
            prop_assert!(capped.total_months() <= 60);
            prop_assert!(capped.total_months() > 0);
            prop_assert!(capped.months <= 12);
        }
    }
}
