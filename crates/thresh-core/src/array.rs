//! Row-major N-dimensional arrays consumed and produced by the engine.

use crate::error::{ThresholdError, ThresholdResult};

/// Complex element as `(re, im)`. Accepted into [`ElementBuffer`] only so
/// that it can be rejected with a typed error.
pub type Complex64 = (f64, f64);

/// Typed element storage for caller-supplied arrays.
#[derive(Debug, Clone, PartialEq)]
pub enum ElementBuffer {
    F64(Vec<f64>),
    F32(Vec<f32>),
    I64(Vec<i64>),
    I32(Vec<i32>),
    U8(Vec<u8>),
    Complex(Vec<Complex64>),
}

impl ElementBuffer {
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::F64(v) => v.len(),
            Self::F32(v) => v.len(),
            Self::I64(v) => v.len(),
            Self::I32(v) => v.len(),
            Self::U8(v) => v.len(),
            Self::Complex(v) => v.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub const fn dtype(&self) -> &'static str {
        match self {
            Self::F64(_) => "f64",
            Self::F32(_) => "f32",
            Self::I64(_) => "i64",
            Self::I32(_) => "i32",
            Self::U8(_) => "u8",
            Self::Complex(_) => "complex128",
        }
    }

    /// Promote real storage to `f64`; complex storage is a type error.
    pub fn to_f64(&self) -> ThresholdResult<Vec<f64>> {
        let promoted = match self {
            Self::F64(v) => v.clone(),
            Self::F32(v) => v.iter().map(|&x| f64::from(x)).collect(),
            Self::I64(v) => v.iter().map(|&x| x as f64).collect(),
            Self::I32(v) => v.iter().map(|&x| f64::from(x)).collect(),
            Self::U8(v) => v.iter().map(|&x| f64::from(x)).collect(),
            Self::Complex(_) => {
                return Err(ThresholdError::NonRealInput {
                    dtype: self.dtype(),
                });
            }
        };
        Ok(promoted)
    }
}

/// Caller-facing array: a shape plus typed element storage.
#[derive(Debug, Clone, PartialEq)]
pub struct InputArray {
    shape: Vec<usize>,
    elements: ElementBuffer,
}

impl InputArray {
    pub fn new(shape: Vec<usize>, elements: ElementBuffer) -> ThresholdResult<Self> {
        ensure_shape_matches(&shape, elements.len())?;
        Ok(Self { shape, elements })
    }

    /// 1-D array over `f64` values.
    #[must_use]
    pub fn from_vec(values: Vec<f64>) -> Self {
        Self {
            shape: vec![values.len()],
            elements: ElementBuffer::F64(values),
        }
    }

    /// 0-D array holding one value.
    #[must_use]
    pub fn scalar(value: f64) -> Self {
        Self {
            shape: Vec::new(),
            elements: ElementBuffer::F64(vec![value]),
        }
    }

    #[must_use]
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    #[must_use]
    pub fn elements(&self) -> &ElementBuffer {
        &self.elements
    }

    /// Check the element type and promote to a [`RealArray`].
    pub fn to_real(&self) -> ThresholdResult<RealArray> {
        let data = self.elements.to_f64()?;
        Ok(RealArray {
            shape: self.shape.clone(),
            data,
        })
    }
}

impl From<RealArray> for InputArray {
    fn from(array: RealArray) -> Self {
        Self {
            shape: array.shape,
            elements: ElementBuffer::F64(array.data),
        }
    }
}

/// Validated real array in row-major order. Output type of every transform.
#[derive(Debug, Clone, PartialEq)]
pub struct RealArray {
    pub(crate) shape: Vec<usize>,
    pub(crate) data: Vec<f64>,
}

impl RealArray {
    pub fn new(shape: Vec<usize>, data: Vec<f64>) -> ThresholdResult<Self> {
        ensure_shape_matches(&shape, data.len())?;
        Ok(Self { shape, data })
    }

    #[must_use]
    pub fn from_vec(data: Vec<f64>) -> Self {
        Self {
            shape: vec![data.len()],
            data,
        }
    }

    #[must_use]
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    #[must_use]
    pub fn data(&self) -> &[f64] {
        &self.data
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[must_use]
    pub fn into_vec(self) -> Vec<f64> {
        self.data
    }
}

pub(crate) fn checked_product(shape: &[usize]) -> Option<usize> {
    shape
        .iter()
        .try_fold(1usize, |acc, &next| acc.checked_mul(next))
}

fn ensure_shape_matches(shape: &[usize], len: usize) -> ThresholdResult<()> {
    let expected = checked_product(shape).ok_or(ThresholdError::InvalidShape {
        detail: "shape product overflow",
    })?;
    if expected != len {
        return Err(ThresholdError::LengthMismatch {
            expected,
            actual: len,
        });
    }
    Ok(())
}
