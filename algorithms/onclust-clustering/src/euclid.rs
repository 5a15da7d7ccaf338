use ndarray::Array1;
use onclust::Space;

/// Euclidean (L2) space over dense `f64` vectors.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Euclid;

impl Space for Euclid {
    type Point = Array1<f64>;

    fn dist(&self, a: &Array1<f64>, b: &Array1<f64>) -> f64 {
        let diff = a - b;
        diff.dot(&diff).sqrt()
    }

    fn combine(&self, a: &Array1<f64>, wa: f64, b: &Array1<f64>, wb: f64) -> Array1<f64> {
        assert!(wa + wb > 0.0, "combine requires a positive total weight");
        (a * wa + b * wb) / (wa + wb)
    }

    fn dim(&self, points: &[Array1<f64>]) -> usize {
        points.first().map(|point| point.len()).unwrap_or(0)
    }
}
