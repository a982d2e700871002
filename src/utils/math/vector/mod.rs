use std::cmp::Ordering;

use num::Num;
use serde::{Deserialize, Serialize};

/// SpVec is a sparse vector over vocabulary columns.
/// It keeps `ind` and `val` side by side (SoA layout).
///
/// Indices are strictly ascending and zero values are never stored,
/// so the stored length is the number of distinct tokens the vector touches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpVec<N>
where
    N: Num + Copy,
{
    ind: Vec<usize>,
    val: Vec<N>,
}

impl<N> Default for SpVec<N>
where
    N: Num + Copy,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<N> SpVec<N>
where
    N: Num + Copy,
{
    #[inline]
    pub fn new() -> Self {
        SpVec {
            ind: Vec::new(),
            val: Vec::new(),
        }
    }

    #[inline]
    pub fn with_capacity(cap: usize) -> Self {
        SpVec {
            ind: Vec::with_capacity(cap),
            val: Vec::with_capacity(cap),
        }
    }

    /// Build from `(index, value)` pairs in any order.
    /// Zero values are dropped, duplicated indices are summed.
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (usize, N)>,
    {
        let mut pairs: Vec<(usize, N)> = pairs.into_iter().filter(|(_, v)| !v.is_zero()).collect();
        // stable, so equal indices keep their original order before merging
        pairs.sort_by_key(|(idx, _)| *idx);

        let mut vec = SpVec::with_capacity(pairs.len());
        for (idx, value) in pairs {
            match vec.ind.last() {
                Some(&last) if last == idx => {
                    if let Some(acc) = vec.val.last_mut() {
                        *acc = *acc + value;
                    }
                }
                _ => {
                    vec.ind.push(idx);
                    vec.val.push(value);
                }
            }
        }
        vec
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ind.is_empty()
    }

    /// Iterate `(index, value)` in ascending index order.
    #[inline]
    pub fn raw_iter(&self) -> impl Iterator<Item = (usize, N)> + '_ {
        self.ind.iter().copied().zip(self.val.iter().copied())
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<N> {
        self.ind.binary_search(&index).ok().map(|pos| self.val[pos])
    }

    /// Largest stored index, if any.
    #[inline]
    pub fn max_index(&self) -> Option<usize> {
        self.ind.last().copied()
    }

    /// Check the internal invariants (ascending unique indices, no zeros).
    /// Used after deserialization.
    pub fn is_well_formed(&self) -> bool {
        self.ind.len() == self.val.len()
            && self.ind.windows(2).all(|w| w[0] < w[1])
            && self.val.iter().all(|v| !v.is_zero())
    }
}

impl<N> SpVec<N>
where
    N: Num + Copy + Into<f64>,
{
    /// Dot product by merge-joining both index lists.
    pub fn dot(&self, other: &Self) -> f64 {
        let mut i = 0;
        let mut j = 0;
        let mut sum = 0_f64;
        while i < self.ind.len() && j < other.ind.len() {
            match self.ind[i].cmp(&other.ind[j]) {
                Ordering::Equal => {
                    sum += self.val[i].into() * other.val[j].into();
                    i += 1;
                    j += 1;
                }
                Ordering::Less => i += 1,
                Ordering::Greater => j += 1,
            }
        }
        sum
    }

    /// Euclidean (L2) norm.
    pub fn norm(&self) -> f64 {
        self.val
            .iter()
            .map(|v| {
                let v: f64 = (*v).into();
                v * v
            })
            .sum::<f64>()
            .sqrt()
    }

    /// Cosine similarity, cosθ = A・B / (|A||B|).
    /// Defined as 0.0 when either side is the zero vector.
    pub fn cosine(&self, other: &Self) -> f64 {
        let denom = self.norm() * other.norm();
        if denom == 0.0 {
            return 0.0;
        }
        (self.dot(other) / denom).clamp(0.0, 1.0)
    }

    /// Scale into a unit-length `f64` vector.
    /// The zero vector stays zero.
    pub fn l2_normalized(&self) -> SpVec<f64> {
        let norm = self.norm();
        if norm == 0.0 {
            return SpVec::new();
        }
        SpVec {
            ind: self.ind.clone(),
            val: self.val.iter().map(|v| (*v).into() / norm).collect(),
        }
    }
}
