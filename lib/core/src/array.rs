//! Homogeneous n-dimensional arrays
//!
//! A [`FlatArray`] is a leaf for the search engine: it is never recursed into
//! structurally, only scanned elementwise or addressed by array steps.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::value::Scalar;
use crate::{Error, Result};

/// Element type tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DType {
    Bool,
    Int64,
    Float64,
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DType::Bool => f.write_str("bool"),
            DType::Int64 => f.write_str("int64"),
            DType::Float64 => f.write_str("float64"),
        }
    }
}

/// Typed, row-major element buffer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ArrayData {
    Bool(Vec<bool>),
    Int(Vec<i64>),
    Float(Vec<f64>),
}

impl ArrayData {
    #[inline]
    pub fn len(&self) -> usize {
        match self {
            ArrayData::Bool(v) => v.len(),
            ArrayData::Int(v) => v.len(),
            ArrayData::Float(v) => v.len(),
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn dtype(&self) -> DType {
        match self {
            ArrayData::Bool(_) => DType::Bool,
            ArrayData::Int(_) => DType::Int64,
            ArrayData::Float(_) => DType::Float64,
        }
    }

    #[inline]
    pub fn get(&self, idx: usize) -> Option<Scalar> {
        match self {
            ArrayData::Bool(v) => v.get(idx).map(|b| Scalar::Bool(*b)),
            ArrayData::Int(v) => v.get(idx).map(|i| Scalar::Int(*i)),
            ArrayData::Float(v) => v.get(idx).map(|x| Scalar::Float(*x)),
        }
    }

    fn slice(&self, start: usize, end: usize) -> ArrayData {
        match self {
            ArrayData::Bool(v) => ArrayData::Bool(v[start..end].to_vec()),
            ArrayData::Int(v) => ArrayData::Int(v[start..end].to_vec()),
            ArrayData::Float(v) => ArrayData::Float(v[start..end].to_vec()),
        }
    }
}

/// Result of indexing an array with fewer or exactly `ndim` axes
#[derive(Debug, Clone, PartialEq)]
pub enum ArrayItem {
    Element(Scalar),
    SubArray(FlatArray),
}

/// Why an array index could not be applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexFault {
    /// More axes than the array has
    TooManyAxes,
    /// A coordinate lies outside its axis
    OutOfBounds,
}

/// n-dimensional homogeneous array with a row-major buffer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawArray")]
pub struct FlatArray {
    shape: Vec<usize>,
    data: ArrayData,
}

/// Unchecked wire form of [`FlatArray`]
#[derive(Deserialize)]
struct RawArray {
    shape: Vec<usize>,
    data: ArrayData,
}

impl TryFrom<RawArray> for FlatArray {
    type Error = Error;

    fn try_from(raw: RawArray) -> Result<Self> {
        FlatArray::new(raw.shape, raw.data)
    }
}

impl FlatArray {
    /// Create an array, checking that the shape covers the buffer exactly
    pub fn new(shape: Vec<usize>, data: ArrayData) -> Result<Self> {
        let expected: usize = shape.iter().product();
        if expected != data.len() {
            return Err(Error::ShapeMismatch {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self { shape, data })
    }

    /// One-dimensional array over `data`
    #[must_use]
    pub fn from_data(data: ArrayData) -> Self {
        Self {
            shape: vec![data.len()],
            data,
        }
    }

    #[must_use]
    pub fn from_ints(values: Vec<i64>) -> Self {
        Self::from_data(ArrayData::Int(values))
    }

    #[must_use]
    pub fn from_floats(values: Vec<f64>) -> Self {
        Self::from_data(ArrayData::Float(values))
    }

    #[must_use]
    pub fn from_bools(values: Vec<bool>) -> Self {
        Self::from_data(ArrayData::Bool(values))
    }

    #[inline]
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    #[inline]
    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    /// Total number of elements
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    pub fn dtype(&self) -> DType {
        self.data.dtype()
    }

    #[inline]
    pub fn data(&self) -> &ArrayData {
        &self.data
    }

    /// Element at a flat (row-major) offset
    #[inline]
    pub fn get(&self, flat: usize) -> Option<Scalar> {
        self.data.get(flat)
    }

    /// Same shape and dtype with bit-identical elements, so a NaN equals itself
    pub fn same_bytes(&self, other: &Self) -> bool {
        self.shape == other.shape
            && match (&self.data, &other.data) {
                (ArrayData::Bool(a), ArrayData::Bool(b)) => a == b,
                (ArrayData::Int(a), ArrayData::Int(b)) => a == b,
                (ArrayData::Float(a), ArrayData::Float(b)) => {
                    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.to_bits() == y.to_bits())
                }
                _ => false,
            }
    }

    pub fn iter(&self) -> impl Iterator<Item = Scalar> + '_ {
        (0..self.len()).filter_map(move |i| self.data.get(i))
    }

    /// Number of elements spanned by one step along `axis`
    fn stride(&self, axis: usize) -> usize {
        self.shape[axis + 1..].iter().product()
    }

    /// Convert a flat offset into per-axis coordinates
    pub fn unravel(&self, mut flat: usize) -> Vec<usize> {
        let mut coords = vec![0; self.ndim()];
        for axis in (0..self.ndim()).rev() {
            let dim = self.shape[axis];
            if dim == 0 {
                continue;
            }
            coords[axis] = flat % dim;
            flat /= dim;
        }
        coords
    }

    /// Convert full per-axis coordinates into a flat offset
    pub fn ravel(&self, coords: &[usize]) -> Option<usize> {
        if coords.len() != self.ndim() {
            return None;
        }
        let mut flat = 0;
        for (axis, &c) in coords.iter().enumerate() {
            if c >= self.shape[axis] {
                return None;
            }
            flat += c * self.stride(axis);
        }
        Some(flat)
    }

    /// Index with up to `ndim` coordinates; negative values count from the end.
    ///
    /// A full index yields one element, a partial one the contiguous
    /// sub-array spanned by the remaining axes.
    pub fn index(&self, ix: &[isize]) -> std::result::Result<ArrayItem, IndexFault> {
        if ix.len() > self.ndim() {
            return Err(IndexFault::TooManyAxes);
        }
        let mut offset = 0;
        for (axis, &raw) in ix.iter().enumerate() {
            let dim = self.shape[axis];
            let c = if raw < 0 { dim as isize + raw } else { raw };
            if c < 0 || c as usize >= dim {
                return Err(IndexFault::OutOfBounds);
            }
            offset += c as usize * self.stride(axis);
        }

        if ix.len() == self.ndim() {
            return self
                .data
                .get(offset)
                .map(ArrayItem::Element)
                .ok_or(IndexFault::OutOfBounds);
        }

        let shape = self.shape[ix.len()..].to_vec();
        let span: usize = shape.iter().product();
        Ok(ArrayItem::SubArray(FlatArray {
            shape,
            data: self.data.slice(offset, offset + span),
        }))
    }

    /// Coordinates of every element for which `pred` holds, in row-major order
    pub fn positions<'a, F>(&'a self, mut pred: F) -> impl Iterator<Item = Vec<usize>> + 'a
    where
        F: FnMut(Scalar) -> bool + 'a,
    {
        (0..self.len()).filter_map(move |flat| {
            let item = self.data.get(flat)?;
            if pred(item) {
                Some(self.unravel(flat))
            } else {
                None
            }
        })
    }
}
