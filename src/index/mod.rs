// Vector index module
// Exact nearest-neighbour search over chunk embeddings, rebuilt per corpus

#[cfg(test)]
mod tests;

use itertools::Itertools;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error, PartialEq)]
pub enum IndexError {
    #[error("Vector dimension mismatch at position {position}: expected {expected}, got {actual}")]
    DimensionMismatch {
        position: usize,
        expected: usize,
        actual: usize,
    },
    #[error("Query dimension mismatch: index holds {expected}-dimensional vectors, got {actual}")]
    QueryDimensionMismatch { expected: usize, actual: usize },
    #[error("Vector at position {0} is empty")]
    EmptyVector(usize),
    #[error("Vector at position {0} contains non-finite values")]
    NonFinite(usize),
    #[error("Index holds {vectors} vectors for {chunks} chunks")]
    Misaligned { chunks: usize, vectors: usize },
}

/// A search hit: the row position of the stored vector and its squared L2 distance
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub position: usize,
    pub distance: f32,
}

/// Immutable flat index with exact squared-L2 search.
///
/// Vectors are stored row-major in one contiguous buffer. Row `i` is the
/// `i`-th vector handed to [`FlatIndex::build`].
#[derive(Debug, Clone, PartialEq)]
pub struct FlatIndex {
    dimension: usize,
    rows: usize,
    data: Vec<f32>,
}

impl FlatIndex {
    /// Build an index from vectors that all share one non-zero dimension
    #[inline]
    pub fn build(vectors: Vec<Vec<f32>>) -> Result<Self, IndexError> {
        let dimension = vectors.first().map_or(0, Vec::len);
        let mut data = Vec::with_capacity(dimension * vectors.len());

        for (position, vector) in vectors.iter().enumerate() {
            if vector.is_empty() {
                return Err(IndexError::EmptyVector(position));
            }
            if vector.len() != dimension {
                return Err(IndexError::DimensionMismatch {
                    position,
                    expected: dimension,
                    actual: vector.len(),
                });
            }
            if !vector.iter().all(|v| v.is_finite()) {
                return Err(IndexError::NonFinite(position));
            }
            data.extend_from_slice(vector);
        }

        debug!(
            "Built flat index with {} vectors of dimension {}",
            vectors.len(),
            dimension
        );

        Ok(Self {
            dimension,
            rows: vectors.len(),
            data,
        })
    }

    /// Return up to `k` nearest rows, ascending by distance.
    ///
    /// `k` saturates at the number of stored vectors. Equal distances are
    /// ordered by position.
    #[inline]
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>, IndexError> {
        if self.is_empty() || k == 0 {
            return Ok(Vec::new());
        }

        if query.len() != self.dimension {
            return Err(IndexError::QueryDimensionMismatch {
                expected: self.dimension,
                actual: query.len(),
            });
        }

        let neighbors = self
            .data
            .chunks_exact(self.dimension)
            .enumerate()
            .map(|(position, row)| Neighbor {
                position,
                distance: squared_l2(row, query),
            })
            .k_smallest_by(k, |a, b| {
                a.distance
                    .total_cmp(&b.distance)
                    .then(a.position.cmp(&b.position))
            })
            .collect::<Vec<_>>();

        debug!(
            "Searched {} vectors, returning {} neighbors",
            self.rows,
            neighbors.len()
        );

        Ok(neighbors)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    #[inline]
    pub fn dimension(&self) -> usize {
        self.dimension
    }
}

/// Squared Euclidean distance between two equal-length vectors
#[inline]
pub fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).fold(0.0, |acc, (x, y)| {
        let diff = x - y;
        diff.mul_add(diff, acc)
    })
}
