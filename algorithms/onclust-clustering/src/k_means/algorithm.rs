use parking_lot::Mutex;
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256Plus;

use onclust::{Algorithm, Clust, Iteration, ModelView, Result, Space};

use super::hyperparams::{KMeansParams, KMeansValidParams};

/// Partition-refinement clustering on a fixed number of centroids.
///
/// The strategy buffers every pushed element. Each controller tick performs
/// one refinement pass over the buffer: assign every element to its nearest
/// centroid, then move each centroid to the weighted mean of its cluster,
/// computed through [`Space::combine`]. A cluster that received no element
/// keeps its centroid, so seeds in empty regions survive unchanged.
///
/// Assignment runs sequentially or over contiguous parallel chunks depending
/// on the `parallel` hyperparameter; both produce identical labels.
pub struct KMeans<S: Space, R: Rng = Xoshiro256Plus> {
    params: KMeansValidParams<S, R>,
    data: Mutex<Vec<S::Point>>,
    rng: Mutex<R>,
}

impl<S: Space> KMeans<S, Xoshiro256Plus> {
    /// Configure the strategy with a default, seeded generator.
    pub fn params(k: usize) -> KMeansParams<S, Xoshiro256Plus> {
        KMeansParams::new(k, Xoshiro256Plus::seed_from_u64(42))
    }
}

impl<S: Space, R: Rng> KMeans<S, R> {
    pub fn params_with_rng(k: usize, rng: R) -> KMeansParams<S, R> {
        KMeansParams::new(k, rng)
    }
}

impl<S: Space, R: Rng + Clone> KMeans<S, R> {
    /// Builds the strategy around checked hyperparameters and initial data.
    pub fn new(params: KMeansValidParams<S, R>, data: Vec<S::Point>) -> Self {
        let rng = params.rng().clone();
        KMeans {
            params,
            data: Mutex::new(data),
            rng: Mutex::new(rng),
        }
    }
}

impl<S, R> Algorithm<S> for KMeans<S, R>
where
    S: Space,
    R: Rng + Clone + Send + Sync + 'static,
{
    fn init(&self, view: &ModelView<S>) -> Result<Clust<S::Point>> {
        let data = self.data.lock();
        let mut rng = self.rng.lock();
        self.params
            .init_method()
            .run(&view.space, self.params.k(), &data, &mut *rng)
    }

    fn iterate(&self, view: &ModelView<S>) -> Result<Option<Iteration<S::Point>>> {
        let centroids = match &view.centroids {
            Some(centroids) => centroids,
            None => return Ok(None),
        };
        let data = self.data.lock();
        if data.is_empty() {
            // nothing to refine, republish the current centroids
            return Ok(Some(Iteration::new(centroids.deep_copy(&view.space))));
        }
        let labels = if self.params.parallel() {
            centroids.par_map_label(&data, &view.space, rayon::current_num_threads())
        } else {
            centroids.map_label(&data, &view.space)
        };
        Ok(Some(Iteration::new(compute_centroids(
            centroids,
            &data,
            &labels,
            &view.space,
        ))))
    }

    fn push(&self, point: S::Point, _running: bool) -> Result<()> {
        self.data.lock().push(point);
        Ok(())
    }

    fn copy(&self, _view: &ModelView<S>) -> Result<Self> {
        Ok(KMeans {
            params: self.params.clone(),
            data: Mutex::new(self.data.lock().clone()),
            rng: Mutex::new(self.rng.lock().clone()),
        })
    }
}

/// Moves every centroid to the weighted mean of its cluster.
pub(crate) fn compute_centroids<S: Space>(
    old: &Clust<S::Point>,
    data: &[S::Point],
    labels: &[usize],
    space: &S,
) -> Clust<S::Point> {
    let mut means: Vec<Option<(S::Point, f64)>> = vec![None; old.len()];
    for (point, &label) in data.iter().zip(labels) {
        means[label] = Some(match means[label].take() {
            None => (space.copy(point), 1.0),
            Some((mean, weight)) => (space.combine(&mean, weight, point, 1.0), weight + 1.0),
        });
    }
    Clust::from(
        old.iter()
            .zip(means)
            .map(|(centroid, mean)| match mean {
                Some((mean, _)) => mean,
                None => space.copy(centroid),
            })
            .collect::<Vec<_>>(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::euclid::Euclid;
    use crate::k_means::KMeansInit;
    use approx::assert_abs_diff_eq;
    use ndarray::{array, Array1};
    use onclust::{Controller, CtrlConf, Error, ParamGuard, Status};
    use std::time::Duration;

    fn fixture() -> Vec<Array1<f64>> {
        vec![
            array![7.2, 6.0, 8.0, 11.0, 10.0],
            array![-8.0, -10.5, -7.0, -8.5, -9.0],
            array![42.0, 41.2, 42.0, 40.2, 45.0],
            array![9.0, 8.0, 7.0, 7.5, 10.0],
            array![7.2, 6.0, 8.0, 11.0, 10.0],
            array![-9.0, -10.0, -8.0, -8.0, -7.5],
            array![42.0, 41.2, 42.2, 40.2, 45.0],
            array![50.0, 51.2, 49.0, 40.0, 45.2],
        ]
    }

    fn given_controller(
        k: usize,
        seed: Vec<Array1<f64>>,
        iter: usize,
        parallel: bool,
    ) -> Controller<Euclid, KMeans<Euclid>> {
        let params = KMeans::<Euclid>::params(k)
            .parallel(parallel)
            .init_method(KMeansInit::Given(Clust::from(seed)))
            .check_unwrap();
        let conf = CtrlConf {
            iter,
            ..CtrlConf::default()
        };
        Controller::new(conf, KMeans::new(params, Vec::new()), Euclid).unwrap()
    }

    #[test]
    fn batch_converges_on_the_fixture() {
        let data = fixture();
        let controller = given_controller(3, data[..3].to_vec(), 10, false);
        for point in &data {
            controller.push(point.clone()).unwrap();
        }
        controller.batch(None, Duration::ZERO).unwrap();

        let centroids = controller.centroids().unwrap();
        let labels = centroids.map_label(&data, &Euclid);
        assert_eq!(labels, vec![0, 1, 2, 0, 0, 1, 2, 2]);
    }

    #[test]
    fn parallel_batch_yields_the_same_labels() {
        let data = fixture();
        let controller = given_controller(3, data[..3].to_vec(), 10, true);
        for point in &data {
            controller.push(point.clone()).unwrap();
        }
        controller.batch(None, Duration::ZERO).unwrap();

        let centroids = controller.centroids().unwrap();
        let labels = centroids.map_label(&data, &Euclid);
        assert_eq!(labels, vec![0, 1, 2, 0, 0, 1, 2, 2]);
    }

    #[test]
    fn refinement_reaches_the_cluster_means() {
        let data = fixture();
        let controller = given_controller(3, data[..3].to_vec(), 10, false);
        for point in &data {
            controller.push(point.clone()).unwrap();
        }
        controller.batch(None, Duration::ZERO).unwrap();

        let expected = [
            array![23.4 / 3.0, 20.0 / 3.0, 23.0 / 3.0, 29.5 / 3.0, 30.0 / 3.0],
            array![-17.0 / 2.0, -20.5 / 2.0, -15.0 / 2.0, -16.5 / 2.0, -16.5 / 2.0],
            array![134.0 / 3.0, 133.6 / 3.0, 133.2 / 3.0, 120.4 / 3.0, 135.2 / 3.0],
        ];
        for (probe, want) in data[..3].iter().zip(&expected) {
            let (centroid, _, _) = controller.predict(probe).unwrap();
            for (got, want) in centroid.iter().zip(want.iter()) {
                assert_abs_diff_eq!(*got, *want, epsilon = 1e-6);
            }
        }
    }

    #[test]
    fn empty_cluster_keeps_its_seed() {
        let seed = vec![Array1::zeros(5), Array1::from_elem(5, 1000.0)];
        let controller = given_controller(2, seed, 10, false);
        for point in fixture() {
            controller.push(point).unwrap();
        }
        controller.play(None, Duration::ZERO).unwrap();
        controller.wait(None, Duration::ZERO).unwrap();

        let centroids = controller.centroids().unwrap();
        assert_eq!(centroids[1], Array1::from_elem(5, 1000.0));
        assert_eq!(controller.status(), Status::Finished(None));
    }

    #[test]
    fn chunked_assignment_matches_sequential_on_a_large_sample() {
        let mut data = Vec::new();
        for _ in 0..20 {
            data.extend(fixture());
        }
        let centroids = Clust::from(fixture()[..3].to_vec());
        let sequential = centroids.map_label(&data, &Euclid);
        for workers in [1, 2, 5, rayon::current_num_threads()] {
            assert_eq!(centroids.par_map_label(&data, &Euclid, workers), sequential);
        }
    }

    #[test]
    fn random_init_without_data_fails_then_retries() {
        let params = KMeans::<Euclid>::params(3).check_unwrap();
        let conf = CtrlConf {
            iter: 1,
            ..CtrlConf::default()
        };
        let controller = Controller::new(conf, KMeans::new(params, Vec::new()), Euclid).unwrap();
        assert_eq!(controller.init(), Err(Error::NotEnoughData));
        assert_eq!(
            controller.status(),
            Status::Finished(Some(Error::NotEnoughData))
        );

        // pushing enough data lets a later play retry the init
        for point in fixture() {
            controller.push(point).unwrap();
        }
        controller.batch(None, Duration::ZERO).unwrap();
        assert_eq!(controller.status(), Status::Finished(None));
    }

    #[test]
    fn means_move_and_empty_clusters_stay() {
        let old = Clust::from(vec![array![0.0], array![10.0], array![100.0]]);
        let data = [array![1.0], array![3.0], array![9.0]];
        let labels = [0, 0, 1];
        let next = compute_centroids(&old, &data, &labels, &Euclid);
        assert_abs_diff_eq!(next[0][0], 2.0);
        assert_abs_diff_eq!(next[1][0], 9.0);
        assert_abs_diff_eq!(next[2][0], 100.0);
    }
}
