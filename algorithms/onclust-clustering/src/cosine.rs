use ndarray::Array1;
use onclust::Space;

use crate::euclid::Euclid;

/// Space comparing vectors by the cosine of their angle.
///
/// The distance is `1 − cos(a, b)`: colinear vectors are at distance zero,
/// orthogonal ones at distance one. Combination and duplication follow the
/// plain vector rules.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Cosine;

impl Space for Cosine {
    type Point = Array1<f64>;

    fn dist(&self, a: &Array1<f64>, b: &Array1<f64>) -> f64 {
        1.0 - cosine(a, b)
    }

    fn combine(&self, a: &Array1<f64>, wa: f64, b: &Array1<f64>, wb: f64) -> Array1<f64> {
        Euclid.combine(a, wa, b, wb)
    }

    fn dim(&self, points: &[Array1<f64>]) -> usize {
        Euclid.dim(points)
    }
}

/// Cosine similarity between two vectors.
pub fn cosine(a: &Array1<f64>, b: &Array1<f64>) -> f64 {
    a.dot(b) / (norm(a) * norm(b))
}

/// Euclidean norm of a vector.
pub fn norm(a: &Array1<f64>) -> f64 {
    a.dot(a).sqrt()
}
