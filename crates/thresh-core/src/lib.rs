#![forbid(unsafe_code)]

//! Elementwise threshold (clipping) engine for N-dimensional real arrays.
//!
//! A call runs in two strict stages: the configuration resolver turns mixed
//! numeric/token arguments into a [`ResolvedConfig`], then the transform
//! rewrites out-of-range elements according to a [`ClipPolicy`]. The first
//! stage is the only one that can fail; the second is pure and total.
//!
//! ```
//! use thresh_core::{InputArray, ThresholdOptions, threshold};
//!
//! let input = InputArray::from_vec(vec![-5.0, -1.0, 0.0, 1.0, 5.0]);
//! let out = threshold(&input, &[1.0.into(), "abs".into()], &ThresholdOptions::default())?;
//! assert_eq!(out.data(), &[-5.0, -1.0, 1.0, 1.0, 5.0]);
//! # Ok::<(), thresh_core::ThresholdError>(())
//! ```

pub mod array;
pub mod bridge;
pub mod config;
pub mod error;
pub mod policy;
pub mod transform;

pub use array::{Complex64, ElementBuffer, InputArray, RealArray};
pub use bridge::{NdarrayBridge, threshold_ndarray};
pub use config::{
    ConfigWarning, ModeToken, ResolvedConfig, ThresholdArg, Thresholds, ValidatedConfig,
    resolve_config,
};
pub use error::{ThresholdError, ThresholdResult};
pub use policy::ClipPolicy;
pub use transform::{
    PARALLEL_MIN_LEN, ThresholdOptions, ThresholdTrace, WorkerPolicy, take_threshold_traces,
    threshold, threshold_in_place, threshold_traced, threshold_with_config,
};
pub use thresh_runtime::RuntimeMode;
