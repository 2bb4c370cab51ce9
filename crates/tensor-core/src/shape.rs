// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Tensor shape descriptors and dimension utilities.
//!
//! Canonical CNN ranks follow the `(batch, channels, height, width)`
//! convention: rank 2 is `(batch, features)`, rank 3 is
//! `(batch, channels, width)` and rank 4 is `(batch, channels, height, width)`.

use crate::{Padding, TensorError};
use std::fmt;

/// Largest rank a [`Shape`] may have.
pub const MAX_RANK: usize = 6;

/// Describes the dimensionality of a [`crate::Tensor`].
///
/// Shapes are immutable once created; every extent is at least 1.
/// Growth only happens through derivations such as
/// [`expand_with_padding`](Shape::expand_with_padding), which return a new shape.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(transparent)]
pub struct Shape {
    dims: Vec<usize>,
}

impl Shape {
    /// Creates a new shape from the given dimensions.
    ///
    /// # Panics
    /// Panics if `dims` is empty, longer than [`MAX_RANK`], or contains a
    /// zero extent. Use [`Shape::try_new`] for untrusted input.
    ///
    /// # Examples
    /// ```
    /// use tensor_core::Shape;
    /// let s = Shape::new(vec![1, 3, 4, 4]);
    /// assert_eq!(s.rank(), 4);
    /// assert_eq!(s.num_elements(), 48);
    /// ```
    pub fn new(dims: Vec<usize>) -> Self {
        match Self::try_new(dims) {
            Ok(shape) => shape,
            Err(e) => panic!("{e}"),
        }
    }

    /// Creates a shape, rejecting zero extents and unsupported ranks.
    pub fn try_new(dims: Vec<usize>) -> Result<Self, TensorError> {
        if dims.is_empty() || dims.len() > MAX_RANK {
            return Err(TensorError::InvalidShape {
                detail: format!("rank must be in 1..={MAX_RANK}"),
                dims,
            });
        }
        if dims.iter().any(|&d| d == 0) {
            return Err(TensorError::InvalidShape {
                detail: "every extent must be at least 1".into(),
                dims,
            });
        }
        Ok(Self { dims })
    }

    /// Creates a 1-D shape.
    pub fn vector(len: usize) -> Self {
        Self::new(vec![len])
    }

    /// Creates a 2-D shape (matrix).
    pub fn matrix(rows: usize, cols: usize) -> Self {
        Self::new(vec![rows, cols])
    }

    /// Creates a rank-4 `(batch, channels, height, width)` shape.
    pub fn nchw(batch: usize, channels: usize, height: usize, width: usize) -> Self {
        Self::new(vec![batch, channels, height, width])
    }

    /// Creates a rank-3 `(batch, channels, width)` shape.
    pub fn ncw(batch: usize, channels: usize, width: usize) -> Self {
        Self::new(vec![batch, channels, width])
    }

    /// Returns the number of dimensions (rank).
    pub fn rank(&self) -> usize {
        self.dims.len()
    }

    /// Alias for [`rank`](Shape::rank).
    pub fn num_dimensions(&self) -> usize {
        self.dims.len()
    }

    /// Returns the total number of elements.
    pub fn num_elements(&self) -> usize {
        self.dims.iter().product()
    }

    /// Returns the dimensions as a slice.
    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    /// Returns the size of a specific dimension, or `None` if out of bounds.
    pub fn dim(&self, index: usize) -> Option<usize> {
        self.dims.get(index).copied()
    }

    /// Batch extent (axis 0).
    pub fn batch(&self) -> usize {
        self.dims[0]
    }

    /// Channel extent (axis 1), or 1 for rank-1 shapes.
    ///
    /// For rank-2 shapes this is the feature count.
    pub fn channels(&self) -> usize {
        self.dims.get(1).copied().unwrap_or(1)
    }

    /// Height extent: axis 2 of a rank-4 shape, 1 otherwise.
    pub fn height(&self) -> usize {
        if self.rank() == 4 {
            self.dims[2]
        } else {
            1
        }
    }

    /// Width extent: the last axis of a rank-3 or rank-4 shape, 1 otherwise.
    pub fn width(&self) -> usize {
        if self.rank() >= 3 {
            self.dims[self.rank() - 1]
        } else {
            1
        }
    }

    /// Number of elements in one channel window (product of axes `2..`).
    pub fn spatial_elements(&self) -> usize {
        self.dims.iter().skip(2).product()
    }

    /// Computes row-major (C-order) strides for this shape.
    ///
    /// The stride for dimension `i` is the number of elements to skip
    /// in the flat buffer to advance one step along that dimension.
    pub fn strides(&self) -> Vec<usize> {
        let rank = self.dims.len();
        let mut strides = vec![0usize; rank];
        strides[rank - 1] = 1;
        for i in (0..rank - 1).rev() {
            strides[i] = strides[i + 1] * self.dims[i + 1];
        }
        strides
    }

    /// Returns the shape grown by `padding` on its spatial axes.
    ///
    /// From rank 4 up the last two axes are spatial: the second to last
    /// grows by `top + bottom` and the last by `left + right`. Rank 3 has
    /// only a width axis, so `top` and `bottom` must be zero. Ranks 1 and 2
    /// have no spatial axes and accept only an all-zero padding.
    ///
    /// # Examples
    /// ```
    /// use tensor_core::{Padding, Shape};
    /// let s = Shape::new(vec![1, 2, 3, 4, 5]);
    /// let grown = s.expand_with_padding(&Padding::uniform(1)).unwrap();
    /// assert_eq!(grown.dims(), &[1, 2, 3, 6, 7]);
    /// ```
    pub fn expand_with_padding(&self, padding: &Padding) -> Result<Shape, TensorError> {
        let rank = self.rank();
        let mut dims = self.dims.clone();
        match rank {
            1 | 2 if !padding.is_zero() => {
                return Err(TensorError::UnsupportedRank {
                    op: "pad",
                    expected: "3 or more (padding needs a spatial axis)",
                    actual: rank,
                })
            }
            1 | 2 => {}
            3 if padding.top != 0 || padding.bottom != 0 => {
                return Err(TensorError::InvalidAttribute {
                    op: "pad",
                    detail: format!(
                        "rank-3 input has no height axis for top/bottom padding {}/{}",
                        padding.top, padding.bottom
                    ),
                })
            }
            3 => dims[2] += padding.left + padding.right,
            _ => {
                dims[rank - 2] += padding.top + padding.bottom;
                dims[rank - 1] += padding.left + padding.right;
            }
        }
        Ok(Shape { dims })
    }

    /// Concatenates shapes along `axis`.
    ///
    /// All shapes must share rank and agree on every extent except `axis`;
    /// the result's extent on `axis` is the sum.
    pub fn concatenate(shapes: &[&Shape], axis: usize) -> Result<Shape, TensorError> {
        let first = match shapes.first() {
            Some(s) => *s,
            None => {
                return Err(TensorError::InvalidAttribute {
                    op: "concatenate",
                    detail: "no input shapes".into(),
                })
            }
        };
        if axis >= first.rank() {
            return Err(TensorError::InvalidAttribute {
                op: "concatenate",
                detail: format!("axis {axis} out of range for rank {}", first.rank()),
            });
        }

        let mut dims = first.dims.clone();
        for other in &shapes[1..] {
            let compatible = other.rank() == first.rank()
                && other
                    .dims
                    .iter()
                    .zip(&first.dims)
                    .enumerate()
                    .all(|(i, (a, b))| i == axis || a == b);
            if !compatible {
                return Err(TensorError::ShapeMismatch {
                    op: "concatenate",
                    lhs: first.clone(),
                    rhs: (*other).clone(),
                });
            }
            dims[axis] += other.dims[axis];
        }
        Ok(Shape { dims })
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, d) in self.dims.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{d}")?;
        }
        write!(f, "]")
    }
}

/// Deserializes from a plain extent list, rejecting invalid shapes.
impl<'de> serde::Deserialize<'de> for Shape {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let dims = Vec::<usize>::deserialize(deserializer)?;
        Shape::try_new(dims).map_err(serde::de::Error::custom)
    }
}

/// Convenience: `Shape::from(vec![2, 3])`.
impl From<Vec<usize>> for Shape {
    fn from(dims: Vec<usize>) -> Self {
        Self::new(dims)
    }
}

/// Convenience: `Shape::from(&[2, 3][..])`.
impl From<&[usize]> for Shape {
    fn from(dims: &[usize]) -> Self {
        Self::new(dims.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vector_shape() {
        let s = Shape::vector(5);
        assert_eq!(s.rank(), 1);
        assert_eq!(s.num_elements(), 5);
        assert_eq!(s.strides(), vec![1]);
    }

    #[test]
    fn test_matrix_shape() {
        let s = Shape::matrix(3, 4);
        assert_eq!(s.rank(), 2);
        assert_eq!(s.num_elements(), 12);
        assert_eq!(s.strides(), vec![4, 1]);
        assert_eq!(s.channels(), 4);
        assert_eq!(s.spatial_elements(), 1);
    }

    #[test]
    fn test_canonical_accessors() {
        let s = Shape::nchw(2, 3, 5, 7);
        assert_eq!(s.batch(), 2);
        assert_eq!(s.channels(), 3);
        assert_eq!(s.height(), 5);
        assert_eq!(s.width(), 7);
        assert_eq!(s.spatial_elements(), 35);

        let s1 = Shape::ncw(1, 4, 9);
        assert_eq!(s1.height(), 1);
        assert_eq!(s1.width(), 9);
    }

    #[test]
    fn test_rank6_strides() {
        let s = Shape::new(vec![1, 2, 3, 4, 5, 6]);
        assert_eq!(s.strides(), vec![720, 360, 120, 30, 6, 1]);
        assert_eq!(s.num_elements(), 720);
    }

    #[test]
    fn test_try_new_rejects_zero_extent() {
        assert!(matches!(
            Shape::try_new(vec![1, 0, 3]),
            Err(TensorError::InvalidShape { .. })
        ));
        assert!(Shape::try_new(vec![]).is_err());
        assert!(Shape::try_new(vec![1; 7]).is_err());
    }

    #[test]
    #[should_panic]
    fn test_new_panics_on_zero_extent() {
        let _ = Shape::new(vec![2, 0]);
    }

    #[test]
    fn test_equality() {
        assert_eq!(Shape::new(vec![1, 2, 3]), Shape::new(vec![1, 2, 3]));
        assert_ne!(Shape::new(vec![1, 2, 3]), Shape::new(vec![1, 3, 2]));
        assert_ne!(Shape::new(vec![6]), Shape::new(vec![1, 6]));
    }

    #[test]
    fn test_expand_with_padding() {
        let s = Shape::nchw(1, 2, 4, 3);
        let p = Padding::new(1, 2, 3, 4);
        assert_eq!(s.expand_with_padding(&p).unwrap(), Shape::nchw(1, 2, 8, 9));

        let s1 = Shape::ncw(1, 2, 10);
        assert_eq!(
            s1.expand_with_padding(&Padding::one_d(2, 1)).unwrap(),
            Shape::ncw(1, 2, 13)
        );

        let flat = Shape::matrix(1, 6);
        assert_eq!(flat.expand_with_padding(&Padding::none()).unwrap(), flat);
    }

    #[test]
    fn test_expand_with_padding_high_rank() {
        let s5 = Shape::new(vec![1, 1, 2, 2, 2]);
        assert_eq!(
            s5.expand_with_padding(&Padding::uniform(1)).unwrap(),
            Shape::new(vec![1, 1, 2, 4, 4])
        );

        let s6 = Shape::new(vec![1, 2, 3, 4, 5, 6]);
        assert_eq!(
            s6.expand_with_padding(&Padding::new(1, 2, 3, 4)).unwrap(),
            Shape::new(vec![1, 2, 3, 4, 9, 12])
        );
    }

    #[test]
    fn test_expand_with_padding_rejects_missing_axes() {
        let s1 = Shape::ncw(1, 1, 3);
        assert!(matches!(
            s1.expand_with_padding(&Padding::new(2, 0, 2, 0)),
            Err(TensorError::InvalidAttribute { op: "pad", .. })
        ));

        let flat = Shape::matrix(1, 6);
        assert!(matches!(
            flat.expand_with_padding(&Padding::uniform(1)),
            Err(TensorError::UnsupportedRank { actual: 2, .. })
        ));
        assert!(Shape::vector(4).expand_with_padding(&Padding::one_d(0, 1)).is_err());
    }

    #[test]
    fn test_concatenate() {
        let a = Shape::nchw(1, 2, 4, 4);
        let b = Shape::nchw(1, 3, 4, 4);
        let c = Shape::concatenate(&[&a, &b], 1).unwrap();
        assert_eq!(c, Shape::nchw(1, 5, 4, 4));
    }

    #[test]
    fn test_concatenate_mismatch() {
        let a = Shape::nchw(1, 2, 4, 4);
        let b = Shape::nchw(1, 3, 4, 5);
        assert!(matches!(
            Shape::concatenate(&[&a, &b], 1),
            Err(TensorError::ShapeMismatch { .. })
        ));
        assert!(Shape::concatenate(&[&a], 4).is_err());
        assert!(Shape::concatenate(&[], 0).is_err());
    }

    #[test]
    fn test_display() {
        let s = Shape::new(vec![2, 3, 4]);
        assert_eq!(format!("{s}"), "[2, 3, 4]");
    }

    #[test]
    fn test_from_conversions() {
        let s1: Shape = vec![2, 3].into();
        let s2: Shape = (&[2, 3][..]).into();
        assert_eq!(s1, s2);
    }

    #[test]
    fn test_serde_plain_list() {
        let s = Shape::nchw(1, 3, 5, 5);
        let json = serde_json::to_string(&s).unwrap();
        assert_eq!(json, "[1,3,5,5]");
        let back: Shape = serde_json::from_str(&json).unwrap();
        assert_eq!(back, s);
        assert!(serde_json::from_str::<Shape>("[1,0,5]").is_err());
    }
}
