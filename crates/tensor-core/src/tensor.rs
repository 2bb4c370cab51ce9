// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Core tensor type and view abstractions.

use crate::{Padding, Shape, TensorError};

/// An owned, n-dimensional `f32` tensor stored in contiguous memory.
///
/// `Tensor` is the only data carrier in the inference pipeline. It owns its
/// buffer exclusively and lends read-only [`TensorView`]s and per-channel
/// slices to kernels for the duration of a call.
///
/// # Memory Layout
/// Row-major with the last axis varying fastest: batch slowest, then
/// channel, then row, then column.
///
/// Equality is exact: shapes must match and every element must compare
/// equal as `f32`.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    shape: Shape,
    data: Vec<f32>,
}

impl Tensor {
    /// Creates a new tensor filled with zeros.
    ///
    /// # Examples
    /// ```
    /// use tensor_core::{Tensor, Shape};
    /// let t = Tensor::zeros(Shape::matrix(2, 3));
    /// assert_eq!(t.as_slice(), &[0.0; 6]);
    /// ```
    pub fn zeros(shape: Shape) -> Self {
        Self::full(shape, 0.0)
    }

    /// Creates a tensor with every element set to `value`.
    pub fn full(shape: Shape, value: f32) -> Self {
        let n = shape.num_elements();
        Self {
            shape,
            data: vec![value; n],
        }
    }

    /// Creates a tensor that takes ownership of `data`.
    ///
    /// Returns an error if `data.len()` does not match the shape.
    pub fn from_vec(shape: Shape, data: Vec<f32>) -> Result<Self, TensorError> {
        let expected = shape.num_elements();
        if data.len() != expected {
            return Err(TensorError::BufferSizeMismatch {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self { shape, data })
    }

    /// Creates a tensor by copying a slice of `f32` values.
    ///
    /// # Examples
    /// ```
    /// use tensor_core::{Tensor, Shape};
    /// let t = Tensor::from_f32(Shape::vector(3), &[1.0, 2.0, 3.0]).unwrap();
    /// assert_eq!(t.as_slice(), &[1.0, 2.0, 3.0]);
    /// ```
    pub fn from_f32(shape: Shape, values: &[f32]) -> Result<Self, TensorError> {
        Self::from_vec(shape, values.to_vec())
    }

    /// Returns the tensor's shape.
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// Returns an immutable view over this tensor's data.
    pub fn view(&self) -> TensorView<'_> {
        TensorView {
            shape: &self.shape,
            data: &self.data,
        }
    }

    /// Returns the flat element buffer.
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Returns the flat element buffer mutably.
    pub fn as_slice_mut(&mut self) -> &mut [f32] {
        &mut self.data
    }

    /// Consumes the tensor and returns its buffer.
    pub fn into_vec(self) -> Vec<f32> {
        self.data
    }

    /// Reinterprets the buffer under a new shape with the same element count.
    pub fn reshape(self, shape: Shape) -> Result<Self, TensorError> {
        Self::from_vec(shape, self.data)
    }

    /// Reads the element at flat offset `i`.
    ///
    /// # Panics
    /// Panics if `i` is out of range.
    pub fn blob(&self, i: usize) -> f32 {
        self.data[i]
    }

    /// Mutable access to the element at flat offset `i`.
    ///
    /// # Panics
    /// Panics if `i` is out of range.
    pub fn blob_mut(&mut self, i: usize) -> &mut f32 {
        &mut self.data[i]
    }

    /// Reads the element at a multi-index.
    ///
    /// # Panics
    /// Panics if the index has the wrong rank or any component is out of range.
    pub fn at(&self, index: &[usize]) -> f32 {
        self.data[flat_offset(&self.shape, index)]
    }

    /// Mutable reference to the element at a multi-index.
    ///
    /// # Panics
    /// Panics if the index has the wrong rank or any component is out of range.
    pub fn at_mut(&mut self, index: &[usize]) -> &mut f32 {
        let offset = flat_offset(&self.shape, index);
        &mut self.data[offset]
    }

    /// Borrowed window over one channel of one batch item.
    ///
    /// # Panics
    /// Panics if `batch` or `channel` is out of range.
    pub fn channel(&self, batch: usize, channel: usize) -> &[f32] {
        let range = channel_range(&self.shape, batch, channel);
        &self.data[range]
    }

    /// Mutable window over one channel of one batch item.
    ///
    /// # Panics
    /// Panics if `batch` or `channel` is out of range.
    pub fn channel_mut(&mut self, batch: usize, channel: usize) -> &mut [f32] {
        let range = channel_range(&self.shape, batch, channel);
        &mut self.data[range]
    }

    /// Fills the tensor with a constant value.
    pub fn fill(&mut self, value: f32) {
        self.data.iter_mut().for_each(|x| *x = value);
    }

    /// Copies every element into `dst`, which must have the same shape.
    pub fn copy_data_into(&self, dst: &mut Tensor) -> Result<(), TensorError> {
        if self.shape != dst.shape {
            return Err(TensorError::ShapeMismatch {
                op: "copy_data_into",
                lhs: self.shape.clone(),
                rhs: dst.shape.clone(),
            });
        }
        dst.data.copy_from_slice(&self.data);
        Ok(())
    }

    /// In-place element-wise accumulation: `self[i] += other[i]`.
    pub fn add_tensor(&mut self, other: &TensorView<'_>) -> Result<(), TensorError> {
        if &self.shape != other.shape() {
            return Err(TensorError::ShapeMismatch {
                op: "add_tensor",
                lhs: self.shape.clone(),
                rhs: other.shape().clone(),
            });
        }
        for (d, &s) in self.data.iter_mut().zip(other.as_slice()) {
            *d += s;
        }
        Ok(())
    }

    /// Returns a new tensor grown by `padding` whose padding cells hold `init`.
    ///
    /// Fails when `padding` targets an axis this rank does not have; see
    /// [`Shape::expand_with_padding`].
    pub fn expand_with_padding(&self, padding: &Padding, init: f32) -> Result<Tensor, TensorError> {
        let mut out = Tensor::full(self.shape.expand_with_padding(padding)?, init);
        write_interior(&self.shape, &self.data, padding, &out.shape, &mut out.data);
        Ok(out)
    }

    /// Copies this tensor into the interior of `dst` at the padding offset.
    ///
    /// `dst` must have shape `self.shape().expand_with_padding(padding)`.
    /// Padding cells of `dst` are left untouched.
    pub fn copy_with_padding_into(
        &self,
        dst: &mut Tensor,
        padding: &Padding,
    ) -> Result<(), TensorError> {
        let expected = self.shape.expand_with_padding(padding)?;
        if expected != dst.shape {
            return Err(TensorError::ShapeMismatch {
                op: "copy_with_padding_into",
                lhs: expected,
                rhs: dst.shape.clone(),
            });
        }
        write_interior(&self.shape, &self.data, padding, &dst.shape, &mut dst.data);
        Ok(())
    }

    /// Fills `self` with the concatenation of `inputs` along `axis`.
    ///
    /// Inputs must agree on every extent except `axis`, and `self` must have
    /// the concatenated shape. Blocks are copied in input order.
    pub fn concatenate_from(
        &mut self,
        inputs: &[&TensorView<'_>],
        axis: usize,
    ) -> Result<(), TensorError> {
        let shapes: Vec<&Shape> = inputs.iter().map(|v| v.shape()).collect();
        let expected = Shape::concatenate(&shapes, axis)?;
        if expected != self.shape {
            return Err(TensorError::ShapeMismatch {
                op: "concatenate_from",
                lhs: expected,
                rhs: self.shape.clone(),
            });
        }

        let outer: usize = self.shape.dims()[..axis].iter().product();
        let dst_block: usize = self.shape.dims()[axis..].iter().product();
        for o in 0..outer {
            let mut pos = o * dst_block;
            for input in inputs {
                let block: usize = input.shape().dims()[axis..].iter().product();
                let src = &input.as_slice()[o * block..(o + 1) * block];
                self.data[pos..pos + block].copy_from_slice(src);
                pos += block;
            }
        }
        Ok(())
    }
}

/// A borrowed, read-only view over a [`Tensor`]'s data.
///
/// Views are zero-copy and tied to the lifetime of the source tensor,
/// enforced by the borrow checker.
#[derive(Debug, Clone, Copy)]
pub struct TensorView<'a> {
    shape: &'a Shape,
    data: &'a [f32],
}

impl<'a> TensorView<'a> {
    /// Creates a view from raw parts.
    ///
    /// Returns an error if `data` does not hold exactly `shape.num_elements()` values.
    pub fn from_parts(shape: &'a Shape, data: &'a [f32]) -> Result<Self, TensorError> {
        if data.len() != shape.num_elements() {
            return Err(TensorError::BufferSizeMismatch {
                expected: shape.num_elements(),
                actual: data.len(),
            });
        }
        Ok(Self { shape, data })
    }

    /// Returns the shape of the viewed tensor.
    pub fn shape(&self) -> &'a Shape {
        self.shape
    }

    /// Returns the flat element buffer.
    pub fn as_slice(&self) -> &'a [f32] {
        self.data
    }

    /// Reads the element at a multi-index.
    ///
    /// # Panics
    /// Panics if the index is out of range.
    pub fn at(&self, index: &[usize]) -> f32 {
        self.data[flat_offset(self.shape, index)]
    }

    /// Borrowed window over one channel of one batch item.
    pub fn channel(&self, batch: usize, channel: usize) -> &'a [f32] {
        &self.data[channel_range(self.shape, batch, channel)]
    }

    /// Copies the viewed data into a new owned tensor.
    pub fn to_tensor(&self) -> Tensor {
        Tensor {
            shape: self.shape.clone(),
            data: self.data.to_vec(),
        }
    }
}

// ── Indexing helpers ───────────────────────────────────────────────

fn flat_offset(shape: &Shape, index: &[usize]) -> usize {
    assert_eq!(
        index.len(),
        shape.rank(),
        "index rank {} does not match tensor rank {}",
        index.len(),
        shape.rank()
    );
    let mut offset = 0;
    for (axis, (&i, &d)) in index.iter().zip(shape.dims()).enumerate() {
        assert!(i < d, "index {i} out of range for axis {axis} with extent {d}");
        offset = offset * d + i;
    }
    offset
}

fn channel_range(shape: &Shape, batch: usize, channel: usize) -> std::ops::Range<usize> {
    assert!(batch < shape.batch(), "batch {batch} out of range for {shape}");
    assert!(
        channel < shape.channels(),
        "channel {channel} out of range for {shape}"
    );
    let plane = shape.spatial_elements();
    let start = (batch * shape.channels() + channel) * plane;
    start..start + plane
}

/// Copies `src` into the interior of `dst`.
///
/// `dst_shape` must be `src_shape.expand_with_padding(padding)`. Every
/// leading index combination owns one `h x w` plane taken from the last two
/// axes (one row of `w` for rank 3, the whole buffer below that).
pub(crate) fn write_interior(
    src_shape: &Shape,
    src: &[f32],
    padding: &Padding,
    dst_shape: &Shape,
    dst: &mut [f32],
) {
    let (h, w, top, bottom) = match src_shape.dims() {
        [.., h, w] if src_shape.rank() >= 4 => (*h, *w, padding.top, padding.bottom),
        [_, _, w] => (1, *w, 0, 0),
        _ => {
            dst.copy_from_slice(src);
            return;
        }
    };
    let (dh, dw) = (h + top + bottom, w + padding.left + padding.right);
    debug_assert_eq!(
        dst_shape.num_elements(),
        src_shape.num_elements() / (h * w) * dh * dw
    );
    for (p, plane) in src.chunks_exact(h * w).enumerate() {
        for (r, row) in plane.chunks_exact(w).enumerate() {
            let d = p * dh * dw + (r + top) * dw + padding.left;
            dst[d..d + w].copy_from_slice(row);
        }
    }
}
