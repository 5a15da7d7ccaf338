use ndarray::Array1;
use onclust::Space;

use crate::euclid::Euclid;

/// Dynamic-time-warping space over variable-length series of vectors.
///
/// The distance aligns two series with the classic warping recurrence,
/// constrained to a band of `window` around the diagonal. When the lengths
/// differ by more than the window, the longer series is first resampled by
/// linear interpolation so that a banded alignment exists. Pointwise costs
/// come from the euclidean inner space.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Series {
    window: usize,
    inner: Euclid,
}

impl Series {
    pub fn new(window: usize) -> Self {
        Series {
            window,
            inner: Euclid,
        }
    }
}

impl Space for Series {
    type Point = Vec<Array1<f64>>;

    fn dist(&self, a: &Vec<Array1<f64>>, b: &Vec<Array1<f64>>) -> f64 {
        if a.is_empty() && b.is_empty() {
            return 0.0;
        }
        if a.is_empty() || b.is_empty() {
            return f64::INFINITY;
        }
        let (rows, cols) = if a.len() > b.len() + self.window {
            (resample(a, b.len() + self.window), b.clone())
        } else if b.len() > a.len() + self.window {
            (a.clone(), resample(b, a.len() + self.window))
        } else {
            (a.clone(), b.clone())
        };
        self.warp(&rows, &cols)
    }

    fn combine(
        &self,
        a: &Vec<Array1<f64>>,
        wa: f64,
        b: &Vec<Array1<f64>>,
        wb: f64,
    ) -> Vec<Array1<f64>> {
        assert!(wa + wb > 0.0, "combine requires a positive total weight");
        assert!(
            !a.is_empty() && !b.is_empty(),
            "cannot combine an empty series"
        );
        let resampled = if a.len() == b.len() {
            None
        } else {
            Some(resample(b, a.len()))
        };
        let b = resampled.as_ref().unwrap_or(b);
        a.iter()
            .zip(b.iter())
            .map(|(left, right)| self.inner.combine(left, wa, right, wb))
            .collect()
    }

    fn dim(&self, points: &[Vec<Array1<f64>>]) -> usize {
        points
            .first()
            .and_then(|series| series.first())
            .map(|row| row.len())
            .unwrap_or(0)
    }
}

impl Series {
    fn warp(&self, rows: &[Array1<f64>], cols: &[Array1<f64>]) -> f64 {
        let n = rows.len();
        let m = cols.len();
        let window = self.window.max(n.abs_diff(m));
        let mut matrix = vec![vec![f64::INFINITY; m + 1]; n + 1];
        matrix[0][0] = 0.0;
        for i in 1..=n {
            let lo = i.saturating_sub(window).max(1);
            let hi = (i + window).min(m);
            for j in lo..=hi {
                let cost = self.inner.dist(&rows[i - 1], &cols[j - 1]);
                let best = matrix[i - 1][j]
                    .min(matrix[i][j - 1])
                    .min(matrix[i - 1][j - 1]);
                matrix[i][j] = cost + best;
            }
        }
        matrix[n][m]
    }
}

/// Linear-interpolation resampling of a series to `target` rows.
fn resample(series: &[Array1<f64>], target: usize) -> Vec<Array1<f64>> {
    if series.len() == target {
        return series.to_vec();
    }
    if series.len() == 1 || target == 1 {
        return vec![series[0].clone(); target];
    }
    let step = (series.len() - 1) as f64 / (target - 1) as f64;
    (0..target)
        .map(|index| {
            let position = index as f64 * step;
            let lower = position.floor() as usize;
            let upper = (lower + 1).min(series.len() - 1);
            let fraction = position - lower as f64;
            if fraction == 0.0 {
                series[lower].clone()
            } else {
                &series[lower] * (1.0 - fraction) + &series[upper] * fraction
            }
        })
        .collect()
}
