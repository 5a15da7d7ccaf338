use parking_lot::Mutex;
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256Plus;

use onclust::{Algorithm, Clust, Error, Iteration, ModelView, Result, RuntimeFigures, Space};

use super::hyperparams::{McmcParams, McmcValidParams};
use super::{ACCEPTATIONS, LOSS, PROPOSED_K};
use crate::k_means::compute_centroids;

struct McmcState {
    accepted: u64,
    loss: f64,
}

/// Variable-K clustering by Metropolis proposals over the empirical loss.
///
/// A proposal alters the number of centroids by at most one — growing by a
/// random buffered element, shrinking by a random drop — and is polished by
/// `proposal_iter` partition-refinement passes before the acceptance test.
/// Acceptance compares losses under temperature `amp`, with a geometric
/// prior `b` per centroid that keeps the model from growing for free.
pub struct Mcmc<S: Space, R: Rng = Xoshiro256Plus> {
    params: McmcValidParams<R>,
    data: Mutex<Vec<S::Point>>,
    rng: Mutex<R>,
    state: Mutex<McmcState>,
}

impl<S: Space> Mcmc<S, Xoshiro256Plus> {
    /// Configure the strategy with a default, seeded generator.
    pub fn params(init_k: usize, max_k: usize) -> McmcParams<Xoshiro256Plus> {
        McmcParams::new(init_k, max_k, Xoshiro256Plus::seed_from_u64(42))
    }
}

impl<S: Space, R: Rng> Mcmc<S, R> {
    pub fn params_with_rng(init_k: usize, max_k: usize, rng: R) -> McmcParams<R> {
        McmcParams::new(init_k, max_k, rng)
    }
}

impl<S: Space, R: Rng + Clone> Mcmc<S, R> {
    /// Builds the strategy around checked hyperparameters and initial data.
    pub fn new(params: McmcValidParams<R>, data: Vec<S::Point>) -> Self {
        let rng = params.rng().clone();
        Mcmc {
            params,
            data: Mutex::new(data),
            rng: Mutex::new(rng),
            state: Mutex::new(McmcState {
                accepted: 0,
                loss: f64::INFINITY,
            }),
        }
    }
}

impl<S, R> Algorithm<S> for Mcmc<S, R>
where
    S: Space,
    R: Rng + Clone + Send + Sync + 'static,
{
    fn init(&self, view: &ModelView<S>) -> Result<Clust<S::Point>> {
        let data = self.data.lock();
        let init_k = self.params.init_k();
        if data.len() < init_k {
            return Err(Error::NotEnoughData);
        }
        let mut rng = self.rng.lock();
        let indices = rand::seq::index::sample(&mut *rng, data.len(), init_k);
        Ok(Clust::from(
            indices
                .iter()
                .map(|index| view.space.copy(&data[index]))
                .collect::<Vec<_>>(),
        ))
    }

    fn iterate(&self, view: &ModelView<S>) -> Result<Option<Iteration<S::Point>>> {
        let centroids = match &view.centroids {
            Some(centroids) => centroids,
            None => return Ok(None),
        };
        let data = self.data.lock();
        if data.is_empty() {
            return Ok(Some(Iteration::new(centroids.deep_copy(&view.space))));
        }
        let space = &view.space;
        let norm = self.params.norm();
        let mut rng = self.rng.lock();

        let k = centroids.len();
        let k_max = self.params.max_k().min(data.len()).max(1);
        let proposed_k = propose_k(k, k_max, &mut *rng);

        let mut proposal = centroids.deep_copy(space).into_vec();
        if proposed_k > k {
            proposal.push(space.copy(&data[rng.gen_range(0..data.len())]));
        } else if proposed_k < k {
            let dropped = rng.gen_range(0..proposal.len());
            proposal.remove(dropped);
        }
        let mut proposal = Clust::from(proposal);
        for _ in 0..self.params.proposal_iter() {
            let labels = proposal.map_label(&data, space);
            proposal = compute_centroids(&proposal, &data, &labels, space);
        }

        let current_loss = centroids.loss(&data, space, norm);
        let proposal_loss = proposal.loss(&data, space, norm);
        let prior = self.params.b().powi(k as i32 - proposed_k as i32);
        let ratio = prior * ((current_loss - proposal_loss) / self.params.amp()).exp();
        let accept = proposal_loss < current_loss || rng.gen::<f64>() < ratio;

        let mut state = self.state.lock();
        let (next, loss) = if accept {
            state.accepted += 1;
            (proposal, proposal_loss)
        } else {
            (centroids.deep_copy(space), current_loss)
        };
        state.loss = loss;

        let mut figures = RuntimeFigures::new();
        figures.insert(ACCEPTATIONS, state.accepted as f64);
        figures.insert(LOSS, loss);
        figures.insert(PROPOSED_K, proposed_k as f64);
        Ok(Some(Iteration::with_figures(next, figures)))
    }

    fn push(&self, point: S::Point, _running: bool) -> Result<()> {
        self.data.lock().push(point);
        Ok(())
    }

    fn copy(&self, _view: &ModelView<S>) -> Result<Self> {
        // same acquisition order as iterate
        let data = self.data.lock();
        let rng = self.rng.lock();
        let state = self.state.lock();
        Ok(Mcmc {
            params: self.params.clone(),
            data: Mutex::new(data.clone()),
            rng: Mutex::new(rng.clone()),
            state: Mutex::new(McmcState {
                accepted: state.accepted,
                loss: state.loss,
            }),
        })
    }
}

/// Next proposal dimension: one step up, one step down or unchanged, clamped
/// to `[1, k_max]`.
fn propose_k<R: Rng>(k: usize, k_max: usize, rng: &mut R) -> usize {
    let step = rng.gen_range(-1i64..=1);
    let proposed = k as i64 + step;
    proposed.clamp(1, k_max as i64) as usize
}
