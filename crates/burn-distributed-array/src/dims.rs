use core::fmt;
use core::ops::{Deref, DerefMut};

use crate::{Error, Result};

/// Largest number of dimensions a distributed array may have.
pub const MAX_DIM: usize = 4;

/// Per-dimension values of an array with at most [`MAX_DIM`] dimensions.
///
/// The length is checked at construction: empty or over-long inputs are rejected with
/// [`Error::DimensionCount`] instead of being truncated.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Dims<T = usize> {
    values: [T; MAX_DIM],
    len: usize,
}

/// Extents of every dimension of an array.
pub type ArrayShape = Dims<usize>;

/// Block sizes of every dimension; `0` lets the planner decide.
pub type BlockSizes = Dims<usize>;

/// Number of processes along every dimension of the process grid.
pub type ProcessGrid = Dims<usize>;

impl<T: Copy + Default> Dims<T> {
    /// Copies `values`, which must hold between 1 and [`MAX_DIM`] entries.
    pub fn new(values: &[T]) -> Result<Self> {
        if values.is_empty() || values.len() > MAX_DIM {
            return Err(Error::DimensionCount {
                ndim: values.len(),
                max: MAX_DIM,
            });
        }
        let mut dims = Self {
            values: [T::default(); MAX_DIM],
            len: values.len(),
        };
        dims.values[..values.len()].copy_from_slice(values);
        Ok(dims)
    }

    /// `len` copies of `value`.
    pub fn splat(len: usize, value: T) -> Result<Self> {
        if len == 0 || len > MAX_DIM {
            return Err(Error::DimensionCount { ndim: len, max: MAX_DIM });
        }
        Ok(Self::from_fn(len, |_| value))
    }

    /// Internal constructor for lengths derived from an already bounded value.
    pub(crate) fn from_fn(len: usize, mut f: impl FnMut(usize) -> T) -> Self {
        assert!(len <= MAX_DIM, "{len} dimensions exceed the bound {MAX_DIM}");
        let mut values = [T::default(); MAX_DIM];
        for (i, value) in values.iter_mut().enumerate().take(len) {
            *value = f(i);
        }
        Self { values, len }
    }

    /// Applies `f` to every entry.
    pub fn map<U: Copy + Default>(&self, mut f: impl FnMut(T) -> U) -> Dims<U> {
        Dims::from_fn(self.len, |i| f(self.values[i]))
    }

    /// Number of dimensions.
    pub fn ndim(&self) -> usize {
        self.len
    }
}

impl Dims<usize> {
    /// Product of all entries, or `None` when it overflows `usize`.
    pub fn volume(&self) -> Option<usize> {
        self.iter().try_fold(1usize, |volume, &n| volume.checked_mul(n))
    }
}

impl<T> Deref for Dims<T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        &self.values[..self.len]
    }
}

impl<T> DerefMut for Dims<T> {
    fn deref_mut(&mut self) -> &mut [T] {
        &mut self.values[..self.len]
    }
}

impl<T: Copy + Default> TryFrom<&[T]> for Dims<T> {
    type Error = Error;

    fn try_from(values: &[T]) -> Result<Self> {
        Self::new(values)
    }
}

impl<T: Copy + Default, const N: usize> TryFrom<[T; N]> for Dims<T> {
    type Error = Error;

    fn try_from(values: [T; N]) -> Result<Self> {
        Self::new(&values)
    }
}

impl<T: fmt::Debug> fmt::Debug for Dims<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<T: fmt::Display> fmt::Display for Dims<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, value) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{value}")?;
        }
        write!(f, "]")
    }
}
