//! Buffers passed to compiled stencils.
use std::ops::Index;
use strata_ir::DataType;
use strata_utils::{Error, StrataResult};

/// A dense 3-D buffer including its halo.
///
/// Elements are kept as `f64` and every store is cast to the element type, so
/// an `i32` buffer only ever holds integral values in the `i32` range. The
/// last axis is contiguous. 0-D fields are buffers of shape `[1, 1, 1]`.
#[derive(Clone, Debug, PartialEq)]
pub struct Storage {
    shape: [usize; 3],
    dtype: DataType,
    data: Vec<f64>,
}

impl Storage {
    pub fn zeros(shape: [usize; 3], dtype: DataType) -> Self {
        Self {
            shape,
            dtype,
            data: vec![0.0; shape.iter().product()],
        }
    }

    /// Storage for a 0-D field holding `value`.
    pub fn zero_dim(dtype: DataType, value: f64) -> Self {
        Self {
            shape: [1, 1, 1],
            dtype,
            data: vec![dtype.cast(value)],
        }
    }

    /// A buffer whose element at `[i, j, k]` is `f(i, j, k)`.
    pub fn from_fn<F>(shape: [usize; 3], dtype: DataType, mut f: F) -> Self
    where
        F: FnMut(usize, usize, usize) -> f64,
    {
        let mut data = Vec::with_capacity(shape.iter().product());
        for i in 0..shape[0] {
            for j in 0..shape[1] {
                for k in 0..shape[2] {
                    data.push(dtype.cast(f(i, j, k)));
                }
            }
        }
        Self { shape, dtype, data }
    }

    /// Wrap `data`, laid out with the last axis contiguous.
    pub fn from_vec(
        shape: [usize; 3],
        dtype: DataType,
        data: Vec<f64>,
    ) -> StrataResult<Self> {
        let len: usize = shape.iter().product();
        if data.len() != len {
            return Err(Error::domain_mismatch(format!(
                "a buffer of shape {shape:?} needs {len} elements, got {}",
                data.len()
            )));
        }
        let data = data.into_iter().map(|v| dtype.cast(v)).collect();
        Ok(Self { shape, dtype, data })
    }

    pub fn shape(&self) -> [usize; 3] {
        self.shape
    }

    pub fn dtype(&self) -> DataType {
        self.dtype
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    pub fn get(&self, idx: [usize; 3]) -> Option<f64> {
        self.linear(idx.map(|x| x as i64)).map(|at| self.data[at])
    }

    /// Store `value` cast to the element type.
    ///
    /// # Panics
    /// Panics if `idx` is outside the buffer.
    pub fn set(&mut self, idx: [usize; 3], value: f64) {
        let at = self.linear_unchecked(idx);
        self.data[at] = self.dtype.cast(value);
    }

    pub fn fill(&mut self, value: f64) {
        let value = self.dtype.cast(value);
        self.data.iter_mut().for_each(|v| *v = value);
    }

    /// Position of `idx` in the element vector, if it is inside the buffer.
    pub(crate) fn linear(&self, idx: [i64; 3]) -> Option<usize> {
        let inside = idx
            .iter()
            .zip(self.shape)
            .all(|(&x, n)| x >= 0 && (x as usize) < n);
        inside.then(|| {
            (idx[0] as usize * self.shape[1] + idx[1] as usize) * self.shape[2]
                + idx[2] as usize
        })
    }

    fn linear_unchecked(&self, idx: [usize; 3]) -> usize {
        assert!(
            idx.iter().zip(self.shape).all(|(&x, n)| x < n),
            "index {idx:?} out of bounds for shape {:?}",
            self.shape
        );
        (idx[0] * self.shape[1] + idx[1]) * self.shape[2] + idx[2]
    }

    pub(crate) fn data(&self) -> &[f64] {
        &self.data
    }

    pub(crate) fn data_mut(&mut self) -> &mut [f64] {
        &mut self.data
    }
}

impl Index<[usize; 3]> for Storage {
    type Output = f64;

    fn index(&self, idx: [usize; 3]) -> &f64 {
        &self.data[self.linear_unchecked(idx)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_and_casts() {
        let s = Storage::from_fn([2, 3, 4], DataType::I32, |i, j, k| {
            (100 * i + 10 * j + k) as f64 + 0.75
        });
        assert_eq!(s[[1, 2, 3]], 123.0);
        assert_eq!(s.as_slice()[1], 1.0);
        assert_eq!(s.get([2, 0, 0]), None);
        assert_eq!(s.linear([-1, 0, 0]), None);
        assert_eq!(s.linear([1, 0, 0]), Some(12));
    }

    #[test]
    fn stores_are_cast() {
        let mut s = Storage::zeros([1, 1, 2], DataType::Bool);
        s.set([0, 0, 1], -3.5);
        assert_eq!(s.as_slice(), &[0.0, 1.0]);
        assert!(Storage::from_vec([1, 1, 3], DataType::F64, vec![1.0]).is_err());
    }
}
