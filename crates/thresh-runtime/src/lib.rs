#![forbid(unsafe_code)]

//! Shared runtime pieces for the threshold workspace.
//!
//! ## Module layout
//!
//! | Module   | Contents                                          |
//! |----------|---------------------------------------------------|
//! | `mode`   | [`RuntimeMode`] enum (Strict / Hardened)          |
//! | `ledger` | [`TraceLedger`], bounded FIFO of trace records    |
//!
//! The crate root carries the [`CaseRecord`] evidence line and the float
//! assertion helpers used by every test suite in the workspace.

pub mod ledger;
pub mod mode;

pub use ledger::TraceLedger;
pub use mode::RuntimeMode;

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Milliseconds since the Unix epoch, or 0 if the clock is before it.
#[must_use]
pub fn now_unix_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_millis() as u64)
}

// ═══════════════════════════════════════════════════════════════════
// Test evidence and float assertions
// ═══════════════════════════════════════════════════════════════════

/// Outcome of one logged test case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaseOutcome {
    Pass,
    Fail,
}

impl CaseOutcome {
    #[must_use]
    pub fn from_pass(pass: bool) -> Self {
        if pass { Self::Pass } else { Self::Fail }
    }
}

/// One JSON line of evidence written by the differential and metamorphic
/// suites, so failing runs can be diffed case by case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseRecord {
    pub suite: String,
    pub case_id: String,
    pub detail: String,
    pub outcome: CaseOutcome,
    pub at_ms: u64,
    /// Named input set the case ran over.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fixture: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<RuntimeMode>,
}

impl CaseRecord {
    #[must_use]
    pub fn new(
        suite: impl Into<String>,
        case_id: impl Into<String>,
        detail: impl Into<String>,
        pass: bool,
    ) -> Self {
        Self {
            suite: suite.into(),
            case_id: case_id.into(),
            detail: detail.into(),
            outcome: CaseOutcome::from_pass(pass),
            at_ms: now_unix_ms(),
            fixture: None,
            mode: None,
        }
    }

    #[must_use]
    pub fn with_fixture(mut self, fixture: impl Into<String>) -> Self {
        self.fixture = Some(fixture.into());
        self
    }

    #[must_use]
    pub fn with_mode(mut self, mode: RuntimeMode) -> Self {
        self.mode = Some(mode);
        self
    }

    #[must_use]
    pub fn passed(&self) -> bool {
        self.outcome == CaseOutcome::Pass
    }

    #[must_use]
    pub fn to_json_line(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| String::from("{}"))
    }
}

/// Assert two f64 values are close within combined absolute and relative tolerance.
///
/// Uses the formula: |actual - expected| <= atol + rtol * |expected|.
/// Two NaNs compare equal; a NaN against a number does not.
pub fn assert_close(actual: f64, expected: f64, atol: f64, rtol: f64) {
    assert!(
        within_tolerance(actual, expected, atol, rtol),
        "assert_close failed: actual={actual} expected={expected} diff={} tol={} (atol={atol}, rtol={rtol})",
        (actual - expected).abs(),
        atol + rtol * expected.abs()
    );
}

/// Assert two f64 slices are element-wise close within tolerance.
pub fn assert_close_slice(actual: &[f64], expected: &[f64], atol: f64, rtol: f64) {
    assert_eq!(
        actual.len(),
        expected.len(),
        "assert_close_slice: length mismatch: actual={} expected={}",
        actual.len(),
        expected.len()
    );
    for (idx, (a, e)) in actual.iter().zip(expected.iter()).enumerate() {
        assert!(
            within_tolerance(*a, *e, atol, rtol),
            "assert_close_slice[{idx}]: actual={a} expected={e} diff={} tol={} (atol={atol}, rtol={rtol})",
            (a - e).abs(),
            atol + rtol * e.abs()
        );
    }
}

/// Check if a value is within tolerance of expected.
#[must_use]
pub fn within_tolerance(actual: f64, expected: f64, atol: f64, rtol: f64) -> bool {
    if actual.is_nan() || expected.is_nan() {
        return actual.is_nan() && expected.is_nan();
    }
    if actual == expected {
        return true;
    }
    let tol = atol + rtol * expected.abs();
    (actual - expected).abs() <= tol
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runtime_mode_defaults_to_strict() {
        assert_eq!(RuntimeMode::default(), RuntimeMode::Strict);
        assert!(RuntimeMode::Hardened.is_hardened());
        assert_eq!(RuntimeMode::Strict.label(), "strict");
    }

    #[test]
    fn test_helpers_assert_close_exact() {
        assert_close(1.0, 1.0, 1e-12, 1e-12);
    }

    #[test]
    fn test_helpers_assert_close_within_rtol() {
        assert_close(100.0 + 1e-10, 100.0, 0.0, 1e-11);
    }

    #[test]
    fn test_helpers_infinities_compare_equal() {
        assert_close(f64::INFINITY, f64::INFINITY, 0.0, 0.0);
        assert!(!within_tolerance(f64::INFINITY, f64::NEG_INFINITY, 1.0, 1.0));
    }

    #[test]
    #[should_panic(expected = "assert_close failed")]
    fn test_helpers_assert_close_rejects_far() {
        assert_close(1.0, 2.0, 1e-12, 1e-12);
    }

    #[test]
    fn test_helpers_nan_matches_only_nan() {
        assert!(within_tolerance(f64::NAN, f64::NAN, 0.0, 0.0));
        assert!(!within_tolerance(f64::NAN, 1.0, 1.0, 1.0));
        assert_close_slice(&[f64::NAN, 2.0], &[f64::NAN, 2.0], 0.0, 0.0);
    }

    #[test]
    #[should_panic(expected = "length mismatch")]
    fn test_helpers_assert_close_slice_length_mismatch() {
        assert_close_slice(&[1.0, 2.0], &[1.0], 1e-12, 1e-12);
    }

    #[test]
    fn case_record_serializes_fixture_and_mode() {
        let record = CaseRecord::new("differential", "diff_floor_pos", "[Value(1.5)]", true)
            .with_fixture("quarter_ladder")
            .with_mode(RuntimeMode::Strict);
        let parsed: serde_json::Value =
            serde_json::from_str(&record.to_json_line()).expect("valid JSON");
        assert_eq!(parsed["suite"], "differential");
        assert_eq!(parsed["case_id"], "diff_floor_pos");
        assert_eq!(parsed["outcome"], "pass");
        assert_eq!(parsed["fixture"], "quarter_ladder");
        assert_eq!(parsed["mode"], "Strict");
    }

    #[test]
    fn case_record_failure_is_reported() {
        let record = CaseRecord::new("adversarial", "adv_errors", "msg", false);
        assert_eq!(record.outcome, CaseOutcome::Fail);
        assert!(!record.passed());
    }

    #[test]
    fn case_record_omits_unset_fields() {
        let record = CaseRecord::new("metamorphic", "meta_order", "permutation", true);
        let parsed: serde_json::Value =
            serde_json::from_str(&record.to_json_line()).expect("valid JSON");
        assert!(parsed.get("fixture").is_none());
        assert!(parsed.get("mode").is_none());
        let back: CaseRecord = serde_json::from_str(&record.to_json_line()).expect("parse");
        assert_eq!(back, record);
    }
}
