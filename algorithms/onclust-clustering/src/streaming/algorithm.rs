use crossbeam_channel::{bounded, Receiver, Sender};
use parking_lot::Mutex;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use rand_xoshiro::Xoshiro256Plus;

use onclust::{Algorithm, Clust, Error, Iteration, ModelView, Result, RuntimeFigures, Space};

use super::hyperparams::{StreamingParams, StreamingValidParams};
use super::MAX_DISTANCE;

struct StreamingState<P> {
    clusters: Vec<P>,
    weights: Vec<f64>,
    max_distance: f64,
}

/// Single-pass clustering over a bounded ingest buffer.
///
/// Each element is compared to the nearest cluster by its distance relative
/// to the largest absorption distance seen so far: far beyond `out_ratio` it
/// seeds an outlier cluster (once `out_after` clusters exist), above a
/// `N(mu, sigma)` draw it seeds a regular cluster, otherwise the nearest
/// cluster absorbs it as a weighted mean. The strategy keeps its own model
/// and ignores the centroids published by the controller.
pub struct Streaming<S: Space, R: Rng = Xoshiro256Plus> {
    params: StreamingValidParams<R>,
    buffer_tx: Sender<S::Point>,
    buffer_rx: Receiver<S::Point>,
    state: Mutex<StreamingState<S::Point>>,
    rng: Mutex<R>,
    threshold: Normal<f64>,
}

impl<S: Space> Streaming<S, Xoshiro256Plus> {
    /// Configure the strategy with a default, seeded generator.
    pub fn params() -> StreamingParams<Xoshiro256Plus> {
        StreamingParams::new(Xoshiro256Plus::seed_from_u64(42))
    }
}

impl<S: Space, R: Rng> Streaming<S, R> {
    pub fn params_with_rng(rng: R) -> StreamingParams<R> {
        StreamingParams::new(rng)
    }
}

impl<S: Space, R: Rng + Clone> Streaming<S, R> {
    /// Builds the strategy around checked hyperparameters and initial data.
    /// The initial data must fit the buffer.
    pub fn new(params: StreamingValidParams<R>, data: Vec<S::Point>) -> Result<Self> {
        if data.len() > params.buffer_size() {
            return Err(Error::InvalidConfig(format!(
                "initial data ({}) must fit the buffer ({})",
                data.len(),
                params.buffer_size()
            )));
        }
        let threshold = Normal::new(params.mu(), params.sigma())
            .map_err(|err| Error::InvalidConfig(err.to_string()))?;
        let (buffer_tx, buffer_rx) = bounded(params.buffer_size());
        for point in data {
            let _ = buffer_tx.try_send(point);
        }
        let rng = params.rng().clone();
        Ok(Streaming {
            params,
            buffer_tx,
            buffer_rx,
            state: Mutex::new(StreamingState {
                clusters: Vec::new(),
                weights: Vec::new(),
                max_distance: 0.0,
            }),
            rng: Mutex::new(rng),
            threshold,
        })
    }
}

impl<S: Space, R: Rng> Streaming<S, R> {
    fn nearest(state: &StreamingState<S::Point>, space: &S, point: &S::Point) -> (usize, f64) {
        let mut label = 0;
        let mut best = f64::INFINITY;
        for (index, cluster) in state.clusters.iter().enumerate() {
            let dist = space.dist(point, cluster);
            if dist < best {
                label = index;
                best = dist;
            }
        }
        (label, best)
    }

    fn relative_distance(state: &StreamingState<S::Point>, dist: f64) -> f64 {
        if state.max_distance > 0.0 {
            dist / state.max_distance
        } else {
            1.0
        }
    }

    fn add_center(state: &mut StreamingState<S::Point>, point: S::Point, dist: f64) {
        state.clusters.push(point);
        state.weights.push(1.0);
        state.max_distance = state.max_distance.max(dist);
    }

    /// Outlier clusters do not widen the absorption radius.
    fn add_outlier(state: &mut StreamingState<S::Point>, point: S::Point) {
        state.clusters.push(point);
        state.weights.push(1.0);
    }

    fn update_center(
        state: &mut StreamingState<S::Point>,
        space: &S,
        label: usize,
        point: &S::Point,
        dist: f64,
    ) {
        state.max_distance = state.max_distance.max(dist);
        let weight = state.weights[label];
        state.clusters[label] = space.combine(&state.clusters[label], weight, point, 1.0);
        state.weights[label] = weight + 1.0;
    }

    fn process(
        &self,
        state: &mut StreamingState<S::Point>,
        space: &S,
        rng: &mut R,
        point: S::Point,
    ) {
        if state.clusters.is_empty() {
            Self::add_center(state, point, 0.0);
            return;
        }
        let (label, dist) = Self::nearest(state, space, &point);
        let relative = Self::relative_distance(state, dist);
        if relative > self.params.out_ratio() && state.clusters.len() >= self.params.out_after() {
            Self::add_outlier(state, point);
        } else if relative > self.threshold.sample(rng) {
            Self::add_center(state, point, dist);
        } else {
            Self::update_center(state, space, label, &point, dist);
        }
    }
}

impl<S, R> Algorithm<S> for Streaming<S, R>
where
    S: Space,
    R: Rng + Clone + Send + Sync + 'static,
{
    fn init(&self, view: &ModelView<S>) -> Result<Clust<S::Point>> {
        let mut state = self.state.lock();
        if state.clusters.is_empty() {
            // the first buffered element seeds the model
            match self.buffer_rx.try_recv() {
                Ok(point) => {
                    state.clusters.push(point);
                    state.weights.push(1.0);
                }
                Err(_) => return Err(Error::NotEnoughData),
            }
        }
        Ok(Clust::from(
            state
                .clusters
                .iter()
                .map(|cluster| view.space.copy(cluster))
                .collect::<Vec<_>>(),
        ))
    }

    fn iterate(&self, view: &ModelView<S>) -> Result<Option<Iteration<S::Point>>> {
        let point = match self.buffer_rx.try_recv() {
            Ok(point) => point,
            // waiting on the buffer, nothing was done this tick
            Err(_) => return Ok(None),
        };
        let mut state = self.state.lock();
        let mut rng = self.rng.lock();
        self.process(&mut state, &view.space, &mut rng, point);
        let centroids = Clust::from(
            state
                .clusters
                .iter()
                .map(|cluster| view.space.copy(cluster))
                .collect::<Vec<_>>(),
        );
        let mut figures = RuntimeFigures::new();
        figures.insert(MAX_DISTANCE, state.max_distance);
        Ok(Some(Iteration::with_figures(centroids, figures)))
    }

    fn push(&self, point: S::Point, _running: bool) -> Result<()> {
        self.buffer_tx.try_send(point).map_err(|_| Error::BufferFull)
    }

    fn copy(&self, _view: &ModelView<S>) -> Result<Self> {
        let state = self.state.lock();
        let (buffer_tx, buffer_rx) = bounded(self.params.buffer_size());
        Ok(Streaming {
            params: self.params.clone(),
            buffer_tx,
            buffer_rx,
            state: Mutex::new(StreamingState {
                clusters: state.clusters.clone(),
                weights: state.weights.clone(),
                max_distance: state.max_distance,
            }),
            rng: Mutex::new(self.rng.lock().clone()),
            threshold: self.threshold,
        })
    }
}
