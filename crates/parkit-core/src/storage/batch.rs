//! Fixed-capacity session recording buffers.

use heapless::Vec;
use thiserror_no_std::Error;

use crate::config::{SCALAR_BATCH_CAPACITY, VECTOR_BATCH_CAPACITY};

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchError {
    #[error("Batch buffer full ({capacity} entries)")]
    Full { capacity: usize },
}

/// Ordered buffer with a single write cursor.
///
/// Appends past capacity are rejected instead of wrapping, so a full buffer
/// never overwrites recorded samples.
#[derive(Debug, Clone)]
pub struct BatchBuffer<T, const N: usize> {
    values: Vec<T, N>,
}

/// One slot per scalar sample
pub type ScalarBatch = BatchBuffer<i32, SCALAR_BATCH_CAPACITY>;

/// Interleaved `[a, b, c]` triples, one per vector sample
pub type VectorBatch = BatchBuffer<f32, VECTOR_BATCH_CAPACITY>;

impl<T: Copy, const N: usize> BatchBuffer<T, N> {
    pub const fn new() -> Self {
        Self { values: Vec::new() }
    }

    pub fn push(&mut self, value: T) -> Result<(), BatchError> {
        self.values
            .push(value)
            .map_err(|_| BatchError::Full { capacity: N })
    }

    /// Append a triple, or nothing at all if it does not fit.
    pub fn push_triple(&mut self, triple: [T; 3]) -> Result<(), BatchError> {
        if self.remaining() < triple.len() {
            return Err(BatchError::Full { capacity: N });
        }
        self.values
            .extend_from_slice(&triple)
            .map_err(|_| BatchError::Full { capacity: N })
    }

    /// The filled part of the buffer, in append order.
    pub fn as_slice(&self) -> &[T] {
        &self.values
    }

    /// Rewind the cursor to zero.
    pub fn clear(&mut self) {
        self.values.clear();
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn remaining(&self) -> usize {
        N - self.values.len()
    }
}

/// Borrowed view of whichever buffer the session filled.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BatchView<'a> {
    Scalars(&'a [i32]),
    /// Interleaved triples
    Vectors(&'a [f32]),
}

impl BatchView<'_> {
    pub fn len(&self) -> usize {
        match self {
            Self::Scalars(values) => values.len(),
            Self::Vectors(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Values in buffer order as integers, floats truncated toward zero.
    pub fn iter_truncated(&self) -> impl Iterator<Item = i32> + '_ {
        let (scalars, vectors): (&[i32], &[f32]) = match *self {
            Self::Scalars(values) => (values, &[]),
            Self::Vectors(values) => (&[], values),
        };
        scalars
            .iter()
            .copied()
            .chain(vectors.iter().map(|v| *v as i32))
    }
}

impl<T: Copy, const N: usize> Default for BatchBuffer<T, N> {
    fn default() -> Self {
        Self::new()
    }
}
