use std::ops::Index;

use rayon::prelude::*;

#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};

use crate::space::Space;

/// An ordered sequence of centroids.
///
/// The order is part of the value: labels returned by [`Clust::assign`] and
/// [`Clust::map_label`] are indices into this sequence, and ties between
/// equally distant centroids always resolve to the lowest index.
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Clone, Debug, PartialEq)]
pub struct Clust<P>(Vec<P>);

impl<P> Clust<P> {
    pub fn new(centroids: Vec<P>) -> Self {
        Clust(centroids)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, label: usize) -> Option<&P> {
        self.0.get(label)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, P> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[P] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<P> {
        self.0
    }
}

impl<P> From<Vec<P>> for Clust<P> {
    fn from(centroids: Vec<P>) -> Self {
        Clust(centroids)
    }
}

impl<P> Index<usize> for Clust<P> {
    type Output = P;

    fn index(&self, label: usize) -> &P {
        &self.0[label]
    }
}

impl<P> Clust<P> {
    /// Label of the nearest centroid and the distance to it, or `None` when
    /// the sequence is empty. Ties break to the lowest index.
    pub fn assign<S>(&self, point: &S::Point, space: &S) -> Option<(usize, f64)>
    where
        S: Space<Point = P>,
    {
        let mut nearest = None;
        for (label, centroid) in self.0.iter().enumerate() {
            let dist = space.dist(point, centroid);
            match nearest {
                Some((_, best)) if dist >= best => {}
                _ => nearest = Some((label, dist)),
            }
        }
        nearest
    }

    /// The label of the nearest centroid for each element, in input order.
    pub fn map_label<S>(&self, points: &[S::Point], space: &S) -> Vec<usize>
    where
        S: Space<Point = P>,
    {
        assert!(!self.is_empty(), "cannot assign with no centroids");
        points
            .iter()
            .map(|point| self.assign(point, space).map(|(label, _)| label).unwrap_or(0))
            .collect()
    }

    /// Parallel [`Clust::map_label`] over `workers` contiguous chunks of size
    /// ⌈n/workers⌉. Chunking by index range keeps the output identical to the
    /// sequential version regardless of scheduling.
    pub fn par_map_label<S>(&self, points: &[S::Point], space: &S, workers: usize) -> Vec<usize>
    where
        S: Space<Point = P>,
        P: Sync,
    {
        assert!(!self.is_empty(), "cannot assign with no centroids");
        assert!(workers > 0, "at least one worker is required");
        if points.is_empty() {
            return Vec::new();
        }
        let chunk = (points.len() + workers - 1) / workers;
        points
            .par_chunks(chunk)
            .flat_map_iter(|chunk| {
                chunk
                    .iter()
                    .map(|point| self.assign(point, space).map(|(label, _)| label).unwrap_or(0))
            })
            .collect()
    }

    /// Empirical loss `Σ dist(x, assigned(x))^norm` over the sample.
    pub fn loss<S>(&self, points: &[S::Point], space: &S, norm: f64) -> f64
    where
        S: Space<Point = P>,
    {
        points
            .iter()
            .filter_map(|point| self.assign(point, space))
            .map(|(_, dist)| dist.powf(norm))
            .sum()
    }

    /// A copy whose centroids are duplicated through [`Space::copy`], so the
    /// result survives any mutation of the original.
    pub fn deep_copy<S>(&self, space: &S) -> Clust<P>
    where
        S: Space<Point = P>,
    {
        Clust(self.0.iter().map(|centroid| space.copy(centroid)).collect())
    }
}
