use ndarray::{Array, ArrayBase, ArrayD, Data, Dimension, IxDyn};

use crate::array::RealArray;
use crate::config::ResolvedConfig;
use crate::error::{ThresholdError, ThresholdResult};
use crate::policy::ClipPolicy;

pub trait NdarrayBridge {
    fn to_ndarray(&self) -> ThresholdResult<ArrayD<f64>>;
    fn from_ndarray<S, D>(array: &ArrayBase<S, D>) -> Self
    where
        S: Data<Elem = f64>,
        D: Dimension;
}

impl NdarrayBridge for RealArray {
    fn to_ndarray(&self) -> ThresholdResult<ArrayD<f64>> {
        ArrayD::from_shape_vec(IxDyn(&self.shape), self.data.clone()).map_err(|_| {
            ThresholdError::InvalidShape {
                detail: "shape rejected by ndarray",
            }
        })
    }

    fn from_ndarray<S, D>(array: &ArrayBase<S, D>) -> Self
    where
        S: Data<Elem = f64>,
        D: Dimension,
    {
        // `iter` walks logical row-major order whatever the memory layout.
        Self {
            shape: array.shape().to_vec(),
            data: array.iter().copied().collect(),
        }
    }
}

/// Clip an `ndarray` of any dimensionality, keeping its dimension type.
#[must_use]
pub fn threshold_ndarray<S, D>(array: &ArrayBase<S, D>, config: &ResolvedConfig) -> Array<f64, D>
where
    S: Data<Elem = f64>,
    D: Dimension,
{
    let policy = ClipPolicy::from_config(config);
    array.mapv(|x| policy.apply(x))
}
