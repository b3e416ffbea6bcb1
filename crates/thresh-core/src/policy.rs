//! Per-element clipping policies.
//!
//! | thresholds | abs | min  | policy        |
//! |------------|-----|------|---------------|
//! | 2          | no  | –    | [`ClipPolicy::Clamp`]       |
//! | 1          | no  | yes  | [`ClipPolicy::Floor`]       |
//! | 1          | no  | no   | [`ClipPolicy::Ceiling`]     |
//! | 1          | yes | yes  | [`ClipPolicy::AbsDeadband`] |
//! | 1          | yes | no   | [`ClipPolicy::AbsCeiling`]  |
//! | 2          | yes | –    | [`ClipPolicy::AbsBand`]     |
//!
//! Every comparison is written so that NaN never matches, and zero takes the
//! non-negative branch in the sign-aware policies.

use crate::config::{ResolvedConfig, Thresholds};

/// Concrete elementwise rule derived from a [`ResolvedConfig`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClipPolicy {
    /// `x < lo → lo`, `x > hi → hi`.
    Clamp { lo: f64, hi: f64 },
    /// `x < t → t`.
    Floor { t: f64 },
    /// `x > t → t`.
    Ceiling { t: f64 },
    /// Push values inside `[-m, m]` out to the signed boundary.
    AbsDeadband { m: f64 },
    /// Pull values beyond `±m` in to `±m`.
    AbsCeiling { m: f64 },
    /// Keep magnitudes within `[a, b]`, mirrored for negative values.
    AbsBand { a: f64, b: f64 },
}

impl ClipPolicy {
    #[must_use]
    pub fn from_config(config: &ResolvedConfig) -> Self {
        match (config.thresholds(), config.use_absolute()) {
            (Thresholds::Pair { low, high }, false) => Self::Clamp { lo: low, hi: high },
            (Thresholds::Pair { low, high }, true) => {
                let (la, ha) = (low.abs(), high.abs());
                Self::AbsBand {
                    a: la.min(ha),
                    b: la.max(ha),
                }
            }
            (Thresholds::Single(t), false) => {
                if config.treat_as_minimum() {
                    Self::Floor { t }
                } else {
                    Self::Ceiling { t }
                }
            }
            (Thresholds::Single(t), true) => {
                let m = t.abs();
                if config.treat_as_minimum() {
                    Self::AbsDeadband { m }
                } else {
                    Self::AbsCeiling { m }
                }
            }
        }
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Clamp { .. } => "clamp",
            Self::Floor { .. } => "floor",
            Self::Ceiling { .. } => "ceiling",
            Self::AbsDeadband { .. } => "abs_deadband",
            Self::AbsCeiling { .. } => "abs_ceiling",
            Self::AbsBand { .. } => "abs_band",
        }
    }

    /// Apply the rule to one value. NaN is returned unchanged.
    #[must_use]
    #[inline]
    pub fn apply(&self, x: f64) -> f64 {
        match *self {
            Self::Clamp { lo, hi } => {
                if x < lo {
                    lo
                } else if x > hi {
                    hi
                } else {
                    x
                }
            }
            Self::Floor { t } => {
                if x < t {
                    t
                } else {
                    x
                }
            }
            Self::Ceiling { t } => {
                if x > t {
                    t
                } else {
                    x
                }
            }
            Self::AbsDeadband { m } => {
                if x >= 0.0 {
                    if x <= m { m } else { x }
                } else if x < 0.0 {
                    if x >= -m { -m } else { x }
                } else {
                    x
                }
            }
            Self::AbsCeiling { m } => {
                if x >= 0.0 {
                    if x >= m { m } else { x }
                } else if x < 0.0 {
                    if x <= -m { -m } else { x }
                } else {
                    x
                }
            }
            Self::AbsBand { a, b } => {
                if x >= 0.0 {
                    if x < a {
                        a
                    } else if x > b {
                        b
                    } else {
                        x
                    }
                } else if x < 0.0 {
                    if x > -a {
                        -a
                    } else if x < -b {
                        -b
                    } else {
                        x
                    }
                } else {
                    x
                }
            }
        }
    }

    /// Rewrite `values` in place; returns how many elements changed.
    pub fn apply_slice(&self, values: &mut [f64]) -> usize {
        let mut replaced = 0usize;
        for value in values.iter_mut() {
            let clipped = self.apply(*value);
            if clipped.to_bits() != value.to_bits() {
                *value = clipped;
                replaced += 1;
            }
        }
        replaced
    }
}

impl From<&ResolvedConfig> for ClipPolicy {
    fn from(config: &ResolvedConfig) -> Self {
        Self::from_config(config)
    }
}
