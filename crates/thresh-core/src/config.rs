//! Configuration resolution: loosely-typed caller arguments into a strict
//! [`ResolvedConfig`].
//!
//! Callers pass numbers and mode tokens in one list. Numbers become the
//! threshold set (one or two values, sorted); tokens toggle absolute mode and
//! the min/max reading of a single threshold. All validation happens here, so
//! the transform itself never fails.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thresh_runtime::RuntimeMode;

use crate::error::{ThresholdError, ThresholdResult};

/// One caller-supplied argument.
#[derive(Debug, Clone, PartialEq)]
pub enum ThresholdArg {
    Value(f64),
    Token(String),
}

impl From<f64> for ThresholdArg {
    fn from(value: f64) -> Self {
        Self::Value(value)
    }
}

impl From<i32> for ThresholdArg {
    fn from(value: i32) -> Self {
        Self::Value(f64::from(value))
    }
}

impl From<&str> for ThresholdArg {
    fn from(token: &str) -> Self {
        Self::Token(token.to_owned())
    }
}

impl From<String> for ThresholdArg {
    fn from(token: String) -> Self {
        Self::Token(token)
    }
}

/// Recognized mode tokens. Matching is ASCII case-insensitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModeToken {
    /// `abs` / `absolute`
    Absolute,
    /// `max` / `maximum`
    Maximum,
    /// `min` / `minimum`; restates the default.
    Minimum,
}

impl ModeToken {
    #[must_use]
    pub fn parse(token: &str) -> Option<Self> {
        const TABLE: [(&str, ModeToken); 6] = [
            ("abs", ModeToken::Absolute),
            ("absolute", ModeToken::Absolute),
            ("max", ModeToken::Maximum),
            ("maximum", ModeToken::Maximum),
            ("min", ModeToken::Minimum),
            ("minimum", ModeToken::Minimum),
        ];
        let token = token.trim();
        TABLE
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(token))
            .map(|&(_, mode)| mode)
    }
}

impl FromStr for ModeToken {
    type Err = ThresholdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| ThresholdError::UnrecognizedToken {
            token: s.to_owned(),
        })
    }
}

/// One threshold, or a sorted pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Thresholds {
    Single(f64),
    Pair { low: f64, high: f64 },
}

impl Thresholds {
    #[must_use]
    pub const fn count(&self) -> usize {
        match self {
            Self::Single(_) => 1,
            Self::Pair { .. } => 2,
        }
    }

    #[must_use]
    pub fn to_vec(&self) -> Vec<f64> {
        match *self {
            Self::Single(t) => vec![t],
            Self::Pair { low, high } => vec![low, high],
        }
    }
}

/// Non-fatal notes produced while resolving a configuration.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigWarning {
    UnrecognizedToken { token: String },
    CollapsedToMagnitudeCeiling { low: f64, high: f64, magnitude: f64 },
}

/// Validated, normalized configuration consumed by the transform.
///
/// Invariants: no threshold is NaN, and a pair is sorted ascending. A pair
/// with absolute mode never straddles zero; such input collapses to a single
/// magnitude ceiling on construction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ConfigRepr", into = "ConfigRepr")]
pub struct ResolvedConfig {
    thresholds: Thresholds,
    use_absolute: bool,
    treat_as_minimum: bool,
}

impl ResolvedConfig {
    /// Single threshold acting as a floor (`treat_as_minimum`) or ceiling.
    pub fn single(
        threshold: f64,
        use_absolute: bool,
        treat_as_minimum: bool,
    ) -> ThresholdResult<Self> {
        reject_nan(&[threshold])?;
        Ok(Self {
            thresholds: Thresholds::Single(threshold),
            use_absolute,
            treat_as_minimum,
        })
    }

    /// Two thresholds in any order. Opposite-signed pairs in absolute mode
    /// collapse to a single magnitude ceiling.
    pub fn pair(first: f64, second: f64, use_absolute: bool) -> ThresholdResult<Self> {
        Self::pair_with_warning(first, second, use_absolute).map(|(config, _)| config)
    }

    fn pair_with_warning(
        first: f64,
        second: f64,
        use_absolute: bool,
    ) -> ThresholdResult<(Self, Option<ConfigWarning>)> {
        reject_nan(&[first, second])?;
        let (low, high) = if first <= second {
            (first, second)
        } else {
            (second, first)
        };

        let straddles_zero = (first < 0.0) != (second < 0.0);
        if use_absolute && straddles_zero {
            let magnitude = low.abs().max(high.abs());
            let config = Self {
                thresholds: Thresholds::Single(magnitude),
                use_absolute: true,
                treat_as_minimum: false,
            };
            let warning = ConfigWarning::CollapsedToMagnitudeCeiling {
                low,
                high,
                magnitude,
            };
            return Ok((config, Some(warning)));
        }

        let config = Self {
            thresholds: Thresholds::Pair { low, high },
            use_absolute,
            // Only meaningful for a single threshold.
            treat_as_minimum: true,
        };
        Ok((config, None))
    }

    #[must_use]
    pub const fn thresholds(&self) -> Thresholds {
        self.thresholds
    }

    #[must_use]
    pub const fn use_absolute(&self) -> bool {
        self.use_absolute
    }

    #[must_use]
    pub const fn treat_as_minimum(&self) -> bool {
        self.treat_as_minimum
    }
}

impl Display for ResolvedConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.thresholds {
            Thresholds::Single(t) => write!(f, "threshold={t}")?,
            Thresholds::Pair { low, high } => write!(f, "thresholds=[{low}, {high}]")?,
        }
        if self.use_absolute {
            write!(f, " abs")?;
        }
        if matches!(self.thresholds, Thresholds::Single(_)) {
            let side = if self.treat_as_minimum { "min" } else { "max" };
            write!(f, " {side}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ConfigRepr {
    thresholds: Vec<f64>,
    use_absolute: bool,
    #[serde(default = "default_treat_as_minimum")]
    treat_as_minimum: bool,
}

const fn default_treat_as_minimum() -> bool {
    true
}

impl From<ResolvedConfig> for ConfigRepr {
    fn from(config: ResolvedConfig) -> Self {
        Self {
            thresholds: config.thresholds.to_vec(),
            use_absolute: config.use_absolute,
            treat_as_minimum: config.treat_as_minimum,
        }
    }
}

impl TryFrom<ConfigRepr> for ResolvedConfig {
    type Error = ThresholdError;

    fn try_from(repr: ConfigRepr) -> Result<Self, Self::Error> {
        match repr.thresholds.as_slice() {
            [] => Err(ThresholdError::MissingThreshold),
            &[t] => Self::single(t, repr.use_absolute, repr.treat_as_minimum),
            &[a, b] => Self::pair(a, b, repr.use_absolute),
            more => Err(ThresholdError::TooManyThresholds { count: more.len() }),
        }
    }
}

/// Resolved configuration plus the mode and warnings it was produced under.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedConfig {
    pub config: ResolvedConfig,
    pub mode: RuntimeMode,
    pub warnings: Vec<ConfigWarning>,
}

/// Resolve mixed numeric/token arguments into a [`ValidatedConfig`].
///
/// Strict mode ignores unknown tokens (with a warning) and accepts infinite
/// thresholds. Hardened mode rejects both.
pub fn resolve_config(
    args: &[ThresholdArg],
    mode: RuntimeMode,
) -> ThresholdResult<ValidatedConfig> {
    let mut values = Vec::with_capacity(2);
    let mut warnings = Vec::new();
    let mut use_absolute = false;
    let mut treat_as_minimum = true;

    for arg in args {
        match arg {
            ThresholdArg::Value(v) => values.push(*v),
            ThresholdArg::Token(token) => match ModeToken::parse(token) {
                Some(ModeToken::Absolute) => use_absolute = true,
                Some(ModeToken::Maximum) => treat_as_minimum = false,
                Some(ModeToken::Minimum) => {}
                None if mode.is_hardened() => {
                    return Err(ThresholdError::UnrecognizedToken {
                        token: token.clone(),
                    });
                }
                None => warnings.push(ConfigWarning::UnrecognizedToken {
                    token: token.clone(),
                }),
            },
        }
    }

    let config = match values.as_slice() {
        [] => return Err(ThresholdError::MissingThreshold),
        &[t] => {
            check_values(&[t], mode)?;
            ResolvedConfig::single(t, use_absolute, treat_as_minimum)?
        }
        &[a, b] => {
            check_values(&[a, b], mode)?;
            let (config, warning) = ResolvedConfig::pair_with_warning(a, b, use_absolute)?;
            warnings.extend(warning);
            config
        }
        more => {
            return Err(ThresholdError::TooManyThresholds { count: more.len() });
        }
    };

    Ok(ValidatedConfig {
        config,
        mode,
        warnings,
    })
}

fn check_values(values: &[f64], mode: RuntimeMode) -> ThresholdResult<()> {
    reject_nan(values)?;
    if mode.is_hardened()
        && let Some(&value) = values.iter().find(|v| !v.is_finite())
    {
        return Err(ThresholdError::NonFiniteThreshold { value });
    }
    Ok(())
}

fn reject_nan(values: &[f64]) -> ThresholdResult<()> {
    if values.iter().any(|v| v.is_nan()) {
        return Err(ThresholdError::NanThreshold);
    }
    Ok(())
}
