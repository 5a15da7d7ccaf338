//! The concurrent state machine driving an [`Algorithm`].
//!
//! A controller owns exactly one worker thread which performs all `iterate`
//! calls sequentially; any number of caller threads may invoke control and
//! read operations in parallel. Two locks split the state: `ctrl` serializes
//! the control path, the `model` reader/writer lock guards centroids,
//! figures, status and counters. Control and worker rendezvous over a pair of
//! zero-capacity channels so that a control call only returns once the worker
//! has observed the requested transition.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use crossbeam_channel::{bounded, select, Receiver, RecvTimeoutError, Sender, TryRecvError};
use parking_lot::{Condvar, Mutex, RwLock};
use tracing::{debug, error, warn};

use crate::algorithm::{Algorithm, Iteration};
use crate::clust::Clust;
use crate::conf::CtrlConf;
use crate::error::{Error, Result};
use crate::figures::{
    RuntimeFigures, DURATION, ITERATIONS, LAST_DATA_TIME, LAST_DURATION, LAST_ITERATIONS,
    PUSHED_DATA,
};
use crate::finishing::{AndFinishing, Finishing, FinishingView};
use crate::model::ModelView;
use crate::space::Space;
use crate::status::Status;

/// Upper bound on how long a waiter sleeps between predicate evaluations.
/// Status changes and iteration commits wake it earlier through the condvar;
/// the slice only bounds staleness for purely time-based predicates.
const WAIT_SLICE: Duration = Duration::from_millis(25);

struct ModelState<S: Space, A> {
    conf: CtrlConf,
    space: S,
    algo: Arc<A>,
    status: Status,
    centroids: Option<Clust<S::Point>>,
    figures: RuntimeFigures,
    new_data: usize,
    pushed_data: usize,
    total_iterations: u64,
    duration: Duration,
    last_data_time: i64,
    succeed_once: bool,
    /// Bumped by `reconfigure`; an iteration started under an older
    /// generation is discarded instead of committed.
    generation: u64,
    run_start: Option<Instant>,
    /// Whether the active run was played with a caller finishing predicate.
    run_finishing: bool,
}

struct Shared<S: Space, A> {
    /// Serializes control operations. Never taken by the worker.
    ctrl: Mutex<()>,
    model: RwLock<ModelState<S, A>>,
    status_tx: Sender<Status>,
    status_rx: Receiver<Status>,
    /// Receiver half of the current run's ack channel; replaced on each
    /// `play` that spawns a worker. Starts disconnected.
    ack_rx: Mutex<Receiver<()>>,
    /// Generation counter + condvar waking `wait` on every status change and
    /// iteration commit.
    wake: Mutex<u64>,
    wake_cv: Condvar,
    timer: Mutex<Option<InterruptTimer>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

/// An online clustering controller.
///
/// `Controller` is a cheap handle over shared state: cloning it yields
/// another handle onto the *same* instance, which is how caller threads and
/// the interruption timer address it. [`Controller::copy`] is the deep copy.
pub struct Controller<S: Space, A: Algorithm<S>> {
    shared: Arc<Shared<S, A>>,
}

impl<S: Space, A: Algorithm<S>> Clone for Controller<S, A> {
    fn clone(&self) -> Self {
        Controller {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<S: Space, A: Algorithm<S>> Controller<S, A> {
    /// Builds a controller in status `Created`. Fails with
    /// [`Error::InvalidConfig`] when the configuration does not verify.
    pub fn new(conf: CtrlConf, algorithm: A, space: S) -> Result<Self> {
        conf.verify()?;
        let (status_tx, status_rx) = bounded(0);
        // the ack channel starts closed: there is no worker yet
        let (closed_tx, closed_rx) = bounded(0);
        drop(closed_tx);
        Ok(Controller {
            shared: Arc::new(Shared {
                ctrl: Mutex::new(()),
                model: RwLock::new(ModelState {
                    conf,
                    space,
                    algo: Arc::new(algorithm),
                    status: Status::Created,
                    centroids: None,
                    figures: RuntimeFigures::new(),
                    new_data: 0,
                    pushed_data: 0,
                    total_iterations: 0,
                    duration: Duration::ZERO,
                    last_data_time: 0,
                    succeed_once: false,
                    generation: 0,
                    run_start: None,
                    run_finishing: false,
                }),
                status_tx,
                status_rx,
                ack_rx: Mutex::new(closed_rx),
                wake: Mutex::new(0),
                wake_cv: Condvar::new(),
                timer: Mutex::new(None),
                worker: Mutex::new(None),
            }),
        })
    }

    /// Current status.
    pub fn status(&self) -> Status {
        self.shared.model.read().status.clone()
    }

    /// True while a worker exists (initializing, running or idle).
    pub fn alive(&self) -> bool {
        self.status().alive()
    }

    /// Current configuration.
    pub fn conf(&self) -> CtrlConf {
        self.shared.model.read().conf.clone()
    }

    /// Current space.
    pub fn space(&self) -> S {
        self.shared.model.read().space.clone()
    }

    /// Value copy of the latest published figures. Empty before the first
    /// successful iteration.
    pub fn runtime_figures(&self) -> RuntimeFigures {
        self.shared.model.read().figures.clone()
    }

    /// Initializes the centroids through the implementation and moves the
    /// controller to `Ready`. Only legal from `Created` or a failed finish;
    /// any other state fails with [`Error::AlreadyCreated`].
    pub fn init(&self) -> Result<()> {
        let _guard = self.shared.ctrl.lock();
        self.init_locked()
    }

    fn init_locked(&self) -> Result<()> {
        {
            let model = self.shared.model.read();
            let retryable =
                matches!(model.status, Status::Created) || model.status.error().is_some();
            if !retryable {
                return Err(Error::AlreadyCreated);
            }
        }
        set_status(&self.shared, Status::Initializing);
        let (view, algo, _, _) = snapshot(&self.shared);
        match algo.init(&view) {
            Ok(centroids) => {
                self.shared.model.write().centroids = Some(centroids);
                set_status(&self.shared, Status::Ready);
                Ok(())
            }
            Err(err) => {
                // a later `play` sees the error and retries the init
                set_status(&self.shared, Status::Finished(Some(err.clone())));
                Err(err)
            }
        }
    }

    /// Starts or resumes the worker.
    ///
    /// `finishing` composes with the configured predicate for this run;
    /// `timeout` overrides the configured wall-clock cap when positive. From
    /// `Idle` the parked worker is resumed, from `Created` the controller is
    /// initialized first, from a failed finish the init is retried.
    pub fn play(&self, finishing: Option<Arc<dyn Finishing>>, timeout: Duration) -> Result<()> {
        let _guard = self.shared.ctrl.lock();
        self.play_locked(finishing, timeout)
    }

    fn play_locked(&self, finishing: Option<Arc<dyn Finishing>>, timeout: Duration) -> Result<()> {
        match self.status() {
            Status::Idle => {
                send_status(&self.shared, Status::Running);
                Ok(())
            }
            Status::Created | Status::Finished(_) => {
                match self.init_locked() {
                    Ok(()) | Err(Error::AlreadyCreated) => {}
                    Err(err) => return Err(err),
                }
                self.spawn_run(finishing, timeout)
            }
            Status::Ready => self.spawn_run(finishing, timeout),
            Status::Running | Status::Initializing => Err(Error::AlreadyRunning),
        }
    }

    fn spawn_run(&self, finishing: Option<Arc<dyn Finishing>>, timeout: Duration) -> Result<()> {
        if let Some(handle) = self.shared.worker.lock().take() {
            let _ = handle.join();
        }
        let (ack_tx, ack_rx) = bounded(0);
        *self.shared.ack_rx.lock() = ack_rx;
        self.shared.model.write().run_finishing = finishing.is_some();

        let shared = Arc::clone(&self.shared);
        let handle = thread::Builder::new()
            .name("onclust-worker".into())
            .spawn(move || run(shared, ack_tx, finishing))
            .map_err(|err| Error::Implementation(err.to_string()))?;
        *self.shared.worker.lock() = Some(handle);
        send_status(&self.shared, Status::Running);

        let mut timer = self.shared.timer.lock();
        if let Some(timer) = timer.take() {
            timer.disable();
        }
        let interruption = if timeout > Duration::ZERO {
            timeout
        } else {
            self.shared.model.read().conf.timeout
        };
        if interruption > Duration::ZERO {
            *timer = Some(InterruptTimer::arm(self.clone(), interruption));
        }
        Ok(())
    }

    /// Parks the worker until the next `play`. Only legal while `Running`.
    pub fn pause(&self) -> Result<()> {
        let _guard = self.shared.ctrl.lock();
        if !matches!(self.status(), Status::Running) {
            return Err(Error::NotRunning);
        }
        if send_status(&self.shared, Status::Idle) {
            Ok(())
        } else {
            Err(Error::NotRunning)
        }
    }

    /// Blocks while the worker is running, until the caller predicate holds,
    /// `timeout` elapses or the run finishes on its own.
    ///
    /// A satisfied predicate or an elapsed timeout releases the waiter
    /// without interrupting the worker; neither counts as a termination
    /// criterion for the run itself. A run that cannot terminate — no
    /// iteration cap, no per-data cap, no auto-play threshold, no wall-clock
    /// cap and no predicate in the configuration or the active `play` — fails
    /// fast with [`Error::NeverConverge`] whatever was passed here.
    pub fn wait(&self, finishing: Option<Arc<dyn Finishing>>, timeout: Duration) -> Result<()> {
        self.wait_inner(finishing, timeout)
    }

    fn wait_inner(&self, finishing: Option<Arc<dyn Finishing>>, timeout: Duration) -> Result<()> {
        match self.status() {
            Status::Idle => return Err(Error::Idle),
            Status::Running => {}
            // a run that already ended reports its outcome
            Status::Finished(Some(err)) => return Err(err),
            Status::Finished(None) => return Ok(()),
            _ => return Err(Error::NotRunning),
        }
        if self.can_never_converge() {
            return Err(Error::NeverConverge);
        }
        let deadline = if timeout > Duration::ZERO {
            Some(Instant::now() + timeout)
        } else {
            None
        };
        loop {
            let observed_wake = *self.shared.wake.lock();
            {
                let model = self.shared.model.read();
                match &model.status {
                    Status::Finished(Some(err)) => return Err(err.clone()),
                    Status::Finished(None) => return Ok(()),
                    _ => {}
                }
                if let Some(finishing) = &finishing {
                    let elapsed = model.run_start.map(|start| start.elapsed()).unwrap_or_default();
                    let view = FinishingView {
                        status: &model.status,
                        figures: &model.figures,
                        elapsed,
                    };
                    if finishing.is_finished(&view) {
                        return Ok(());
                    }
                }
            }
            let slice = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Err(Error::Timeout);
                    }
                    (deadline - now).min(WAIT_SLICE)
                }
                None => WAIT_SLICE,
            };
            let mut wake = self.shared.wake.lock();
            if *wake == observed_wake {
                let _ = self.shared.wake_cv.wait_for(&mut wake, slice);
            }
        }
    }

    /// Purely configuration- and run-driven: the arguments of `wait` are
    /// waiter-release conditions, not termination criteria, so they never
    /// exempt the fast-fail.
    fn can_never_converge(&self) -> bool {
        if self.shared.timer.lock().is_some() {
            return false;
        }
        let model = self.shared.model.read();
        model.conf.iter == 0
            && model.conf.iter_per_data == 0
            && model.conf.data_per_iter == 0
            && model.conf.timeout.is_zero()
            && model.conf.finishing.is_none()
            && !model.run_finishing
    }

    /// Interrupts the worker and waits for it to exit. Legal from any live
    /// state; a terminal controller fails with [`Error::NotAlive`].
    pub fn stop(&self) -> Result<()> {
        let _guard = self.shared.ctrl.lock();
        if let Some(timer) = self.shared.timer.lock().take() {
            timer.disable();
        }
        match self.status() {
            Status::Initializing | Status::Running | Status::Idle => {
                send_status(&self.shared, Status::Finished(None));
                if let Some(handle) = self.shared.worker.lock().take() {
                    let _ = handle.join();
                }
                match self.status().error() {
                    Some(err) => Err(err.clone()),
                    None => Ok(()),
                }
            }
            _ => Err(Error::NotAlive),
        }
    }

    /// Plays then waits, in one exclusive control section.
    ///
    /// Fails fast with [`Error::NeverConverge`] when no iteration cap is
    /// configured and neither the caller nor the configuration supplies a
    /// finishing predicate. On success the worker has exited and any pending
    /// interruption timeout is disabled.
    pub fn batch(&self, finishing: Option<Arc<dyn Finishing>>, timeout: Duration) -> Result<()> {
        let _guard = self.shared.ctrl.lock();
        {
            let model = self.shared.model.read();
            if model.conf.iter == 0 && finishing.is_none() && model.conf.finishing.is_none() {
                return Err(Error::NeverConverge);
            }
        }
        if self.alive() {
            return Err(Error::AlreadyRunning);
        }
        self.shared.model.write().succeed_once = false;
        self.play_locked(finishing.clone(), timeout)?;
        let result = self.wait_inner(finishing, Duration::ZERO);
        if result.is_ok() {
            if let Some(timer) = self.shared.timer.lock().take() {
                timer.disable();
            }
            if let Some(handle) = self.shared.worker.lock().take() {
                let _ = handle.join();
            }
        }
        result
    }

    /// Hands a new observation to the implementation.
    ///
    /// Allowed in every state. When the controller is not alive,
    /// `data_per_iter` is configured and enough new data accumulated, the
    /// controller auto-plays; an auto-play failure is logged, not returned.
    pub fn push(&self, point: S::Point) -> Result<()> {
        let _guard = self.shared.ctrl.lock();
        let (algo, running, data_per_iter) = {
            let model = self.shared.model.read();
            (
                Arc::clone(&model.algo),
                model.status.alive(),
                model.conf.data_per_iter,
            )
        };
        algo.push(point, running)?;
        let new_data = {
            let mut model = self.shared.model.write();
            model.new_data += 1;
            model.pushed_data += 1;
            model.last_data_time = unix_seconds();
            model.new_data
        };
        if !running && data_per_iter > 0 && new_data >= data_per_iter {
            if let Err(err) = self.play_locked(None, Duration::ZERO) {
                warn!(%err, "auto-play after push failed");
            }
        }
        Ok(())
    }

    /// Deep copy of the current centroids, taken under the read lock.
    /// Fails with [`Error::NotStarted`] while no centroids exist.
    pub fn centroids(&self) -> Result<Clust<S::Point>> {
        let model = self.shared.model.read();
        match &model.centroids {
            Some(centroids) => Ok(centroids.deep_copy(&model.space)),
            None => Err(Error::NotStarted),
        }
    }

    /// Nearest centroid for an observation: the centroid value, its label and
    /// the distance to it.
    pub fn predict(&self, point: &S::Point) -> Result<(S::Point, usize, f64)> {
        let (centroids, space) = {
            let model = self.shared.model.read();
            match &model.centroids {
                Some(centroids) => (centroids.deep_copy(&model.space), model.space.clone()),
                None => return Err(Error::NotStarted),
            }
        };
        let (label, dist) = centroids.assign(point, &space).ok_or(Error::NotStarted)?;
        let mut points = centroids.into_vec();
        let centroid = points.swap_remove(label);
        Ok((centroid, label, dist))
    }

    /// Swaps configuration and space, cloning the implementation under the
    /// write lock.
    ///
    /// The status is preserved; an iteration in flight across the swap is
    /// dropped (best effort). A clone failure moves the controller to
    /// `Finished` with the error.
    pub fn reconfigure(&self, conf: CtrlConf, space: S) -> Result<()> {
        conf.verify()?;
        let _guard = self.shared.ctrl.lock();
        let (view, algo, _, _) = snapshot(&self.shared);
        match algo.copy(&view) {
            Ok(clone) => {
                let mut model = self.shared.model.write();
                model.algo = Arc::new(clone);
                model.conf = conf;
                model.space = space;
                model.generation += 1;
                Ok(())
            }
            Err(err) => {
                set_status(&self.shared, Status::Finished(Some(err.clone())));
                Err(err)
            }
        }
    }

    /// An independent controller around a clone of the implementation.
    pub fn copy(&self, conf: CtrlConf, space: S) -> Result<Controller<S, A>> {
        let (view, algo, _, _) = snapshot(&self.shared);
        let clone = algo.copy(&view)?;
        Controller::new(conf, clone, space)
    }
}

/// Commits a status under the write lock, then notifies observers.
fn set_status<S: Space, A: Algorithm<S>>(shared: &Shared<S, A>, status: Status) {
    let notifier = {
        let mut model = shared.model.write();
        model.status = status.clone();
        model.conf.status_notifier.clone()
    };
    debug!(%status, "status transition");
    if let Some(notifier) = notifier {
        notifier(&status);
    }
    wake_bump(shared);
}

fn wake_bump<S: Space, A>(shared: &Shared<S, A>) {
    let mut wake = shared.wake.lock();
    *wake = wake.wrapping_add(1);
    shared.wake_cv.notify_all();
}

/// Requests a status from the worker and blocks until it acknowledges.
///
/// Returns false when the worker exited instead of observing the transition:
/// the select arms against the ack channel, so a send racing a worker exit
/// can never strand the caller.
fn send_status<S: Space, A: Algorithm<S>>(shared: &Shared<S, A>, status: Status) -> bool {
    let ack_rx = shared.ack_rx.lock().clone();
    select! {
        send(shared.status_tx, status) -> sent => {
            sent.is_ok() && ack_rx.recv().is_ok()
        }
        recv(ack_rx) -> _ => false,
    }
}

/// Commits a received status and acknowledges it; an `Idle` transition parks
/// here until the next requested status arrives.
fn observe_status<S: Space, A: Algorithm<S>>(
    shared: &Shared<S, A>,
    ack_tx: &Sender<()>,
    status: Status,
) {
    let mut status = status;
    loop {
        set_status(shared, status.clone());
        let _ = ack_tx.send(());
        if !matches!(status, Status::Idle) {
            return;
        }
        match shared.status_rx.recv() {
            Ok(next) => status = next,
            Err(_) => return,
        }
    }
}

/// Consistent snapshot of the model for one implementation call.
#[allow(clippy::type_complexity)]
fn snapshot<S: Space, A: Algorithm<S>>(
    shared: &Shared<S, A>,
) -> (ModelView<S>, Arc<A>, u64, usize) {
    let model = shared.model.read();
    let view = ModelView::new(
        model.conf.clone(),
        model.space.clone(),
        model.status.clone(),
        model.figures.clone(),
        model
            .centroids
            .as_ref()
            .map(|centroids| centroids.deep_copy(&model.space)),
    );
    (view, Arc::clone(&model.algo), model.generation, model.new_data)
}

/// Body of the worker thread.
fn run<S: Space, A: Algorithm<S>>(
    shared: Arc<Shared<S, A>>,
    ack_tx: Sender<()>,
    finishing: Option<Arc<dyn Finishing>>,
) {
    {
        let mut model = shared.model.write();
        // everything buffered before this run is consumed by it
        model.new_data = 0;
        model.run_start = Some(Instant::now());
    }
    let start = Instant::now();

    // the initial receive observes the `Running` that `play` sent
    match shared.status_rx.recv() {
        Ok(status) => observe_status(&shared, &ack_tx, status),
        Err(_) => return,
    }

    let mut run_iterations: u64 = 0;
    let mut consumed: usize = 0;
    let outcome = catch_unwind(AssertUnwindSafe(|| {
        worker_loop(
            &shared,
            &ack_tx,
            &finishing,
            start,
            &mut run_iterations,
            &mut consumed,
        )
    }));
    if let Err(panic) = outcome {
        let message = panic_message(panic.as_ref());
        error!(%message, "worker panicked");
        set_status(&shared, Status::Finished(Some(Error::Implementation(message))));
    }

    if matches!(shared.model.read().status, Status::Running) {
        set_status(&shared, Status::Finished(None));
    }

    {
        let mut model = shared.model.write();
        model.succeed_once = model.status.error().is_none();
        model.new_data = model.new_data.saturating_sub(consumed);
        model.duration += start.elapsed();
        model.run_start = None;
    }
    wake_bump(&shared);

    // free a control sender parked on the status channel, then close the ack
    // channel so late senders observe the exit instead of deadlocking
    let _ = shared.status_rx.try_recv();
    drop(ack_tx);
}

fn worker_loop<S: Space, A: Algorithm<S>>(
    shared: &Shared<S, A>,
    ack_tx: &Sender<()>,
    finishing: &Option<Arc<dyn Finishing>>,
    start: Instant,
    run_iterations: &mut u64,
    consumed: &mut usize,
) {
    let mut last_tick = Instant::now();
    loop {
        let proceed = {
            let model = shared.model.read();
            let cap = if model.succeed_once {
                model.conf.iter_per_data
            } else {
                model.conf.iter
            };
            let capped = cap > 0 && *run_iterations >= cap as u64;
            let finished = AndFinishing::new(model.conf.finishing.clone(), finishing.clone())
                .is_finished(&FinishingView {
                    status: &model.status,
                    figures: &model.figures,
                    elapsed: start.elapsed(),
                });
            matches!(model.status, Status::Running) && !capped && !finished
        };
        if !proceed {
            return;
        }

        match shared.status_rx.try_recv() {
            Ok(status) => {
                observe_status(shared, ack_tx, status);
                continue;
            }
            Err(TryRecvError::Empty) => {}
            Err(TryRecvError::Disconnected) => return,
        }

        let (view, algo, generation, new_data) = snapshot(shared);
        *consumed = new_data;
        match algo.iterate(&view) {
            Ok(Some(iteration)) => {
                *run_iterations += 1;
                save_iter_context(shared, generation, iteration, *run_iterations, start);
            }
            Ok(None) => thread::yield_now(),
            Err(err) => {
                error!(%err, "iteration failed");
                set_status(shared, Status::Finished(Some(err)));
                return;
            }
        }

        if let Some(period) = view.conf.period() {
            let elapsed = last_tick.elapsed();
            if elapsed < period {
                // throttle, but keep listening for control requests
                match shared.status_rx.recv_timeout(period - elapsed) {
                    Ok(status) => observe_status(shared, ack_tx, status),
                    Err(RecvTimeoutError::Timeout) => {}
                    Err(RecvTimeoutError::Disconnected) => return,
                }
            }
            last_tick = Instant::now();
        }
    }
}

/// Publishes a finished iteration: counters, figures and centroids move
/// together under one write-lock section.
fn save_iter_context<S: Space, A: Algorithm<S>>(
    shared: &Shared<S, A>,
    generation: u64,
    iteration: Iteration<S::Point>,
    run_iterations: u64,
    start: Instant,
) {
    let mut model = shared.model.write();
    if model.generation != generation {
        debug!("iteration crossed a reconfiguration, dropping its result");
        return;
    }
    model.total_iterations += 1;
    let run_elapsed = start.elapsed();
    let mut merged = iteration.figures;
    merged.insert(ITERATIONS, model.total_iterations as f64);
    merged.insert(LAST_ITERATIONS, run_iterations as f64);
    merged.insert(PUSHED_DATA, model.pushed_data as f64);
    merged.insert(LAST_DURATION, run_elapsed.as_nanos() as f64);
    merged.insert(DURATION, (model.duration + run_elapsed).as_nanos() as f64);
    merged.insert(LAST_DATA_TIME, model.last_data_time as f64);
    model.centroids = Some(iteration.centroids);
    model.figures = merged;
    drop(model);
    wake_bump(shared);
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "worker panicked".to_string()
    }
}

fn unix_seconds() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|since| since.as_secs() as i64)
        .unwrap_or(0)
}

/// One-shot timer performing the timeout interrupt on expiry.
///
/// `disable` never blocks: it raises a flag and pokes the timer thread, which
/// re-checks the flag after taking the control lock. Dropping the timer
/// cancels it as well.
struct InterruptTimer {
    cancel_tx: Sender<()>,
    cancelled: Arc<AtomicBool>,
}

impl InterruptTimer {
    fn arm<S: Space, A: Algorithm<S>>(controller: Controller<S, A>, timeout: Duration) -> Self {
        let (cancel_tx, cancel_rx) = bounded::<()>(1);
        let cancelled = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&cancelled);
        let spawned = thread::Builder::new()
            .name("onclust-timeout".into())
            .spawn(move || {
                match cancel_rx.recv_timeout(timeout) {
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => return,
                    Err(RecvTimeoutError::Timeout) => {}
                }
                if flag.load(Ordering::Relaxed) {
                    return;
                }
                let _guard = controller.shared.ctrl.lock();
                if flag.load(Ordering::Relaxed) {
                    return;
                }
                if controller.status().alive() {
                    warn!(?timeout, "run exceeded its wall-clock budget");
                    send_status(&controller.shared, Status::Finished(Some(Error::Timeout)));
                }
            });
        if let Err(err) = spawned {
            error!(%err, "failed to spawn the timeout thread");
        }
        InterruptTimer {
            cancel_tx,
            cancelled,
        }
    }

    fn disable(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
        let _ = self.cancel_tx.try_send(());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::finishing::IterFinishing;
    use std::sync::atomic::AtomicU64;

    #[derive(Clone, Debug)]
    struct Line;

    impl Space for Line {
        type Point = f64;

        fn dist(&self, a: &f64, b: &f64) -> f64 {
            (a - b).abs()
        }

        fn combine(&self, a: &f64, wa: f64, b: &f64, wb: f64) -> f64 {
            assert!(wa + wb > 0.0, "combine requires a positive total weight");
            (a * wa + b * wb) / (wa + wb)
        }

        fn dim(&self, _points: &[f64]) -> usize {
            1
        }
    }

    /// Single-centroid strategy tracking the mean of everything pushed.
    struct Mock {
        data: Mutex<Vec<f64>>,
        ticks: AtomicU64,
        tick_delay: Duration,
        fail_at_tick: Option<u64>,
        bound: Option<usize>,
    }

    impl Mock {
        fn new() -> Self {
            Mock {
                data: Mutex::new(Vec::new()),
                ticks: AtomicU64::new(0),
                tick_delay: Duration::ZERO,
                fail_at_tick: None,
                bound: None,
            }
        }

        fn with_delay(delay: Duration) -> Self {
            Mock {
                tick_delay: delay,
                ..Mock::new()
            }
        }

        fn failing_at(tick: u64) -> Self {
            Mock {
                fail_at_tick: Some(tick),
                ..Mock::new()
            }
        }

        fn bounded(bound: usize) -> Self {
            Mock {
                bound: Some(bound),
                ..Mock::new()
            }
        }
    }

    impl Algorithm<Line> for Mock {
        fn init(&self, _view: &ModelView<Line>) -> Result<Clust<f64>> {
            let data = self.data.lock();
            Ok(Clust::from(vec![data.first().copied().unwrap_or(0.0)]))
        }

        fn iterate(&self, view: &ModelView<Line>) -> Result<Option<Iteration<f64>>> {
            let tick = self.ticks.fetch_add(1, Ordering::SeqCst) + 1;
            if let Some(fail_at) = self.fail_at_tick {
                if tick >= fail_at {
                    return Err(Error::Implementation("tick failure".into()));
                }
            }
            if !self.tick_delay.is_zero() {
                thread::sleep(self.tick_delay);
            }
            let data = self.data.lock();
            let centroid = if data.is_empty() {
                view.centroids
                    .as_ref()
                    .and_then(|clust| clust.get(0))
                    .copied()
                    .unwrap_or(0.0)
            } else {
                data.iter().sum::<f64>() / data.len() as f64
            };
            Ok(Some(Iteration::new(Clust::from(vec![centroid]))))
        }

        fn push(&self, point: f64, _running: bool) -> Result<()> {
            let mut data = self.data.lock();
            if let Some(bound) = self.bound {
                if data.len() >= bound {
                    return Err(Error::BufferFull);
                }
            }
            data.push(point);
            Ok(())
        }

        fn copy(&self, _view: &ModelView<Line>) -> Result<Self> {
            Ok(Mock {
                data: Mutex::new(self.data.lock().clone()),
                ticks: AtomicU64::new(0),
                tick_delay: self.tick_delay,
                fail_at_tick: self.fail_at_tick,
                bound: self.bound,
            })
        }
    }

    fn conf_with_iter(iter: usize) -> CtrlConf {
        CtrlConf {
            iter,
            ..CtrlConf::default()
        }
    }

    fn wait_until_finished<A: Algorithm<Line>>(controller: &Controller<Line, A>) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if matches!(controller.status(), Status::Finished(_)) {
                return;
            }
            thread::sleep(Duration::from_millis(2));
        }
        panic!("controller did not finish in time");
    }

    #[test]
    fn batch_runs_exactly_iter_iterations() {
        let controller = Controller::new(conf_with_iter(10), Mock::new(), Line).unwrap();
        assert_eq!(controller.status(), Status::Created);
        assert_eq!(controller.centroids(), Err(Error::NotStarted));

        controller.push(1.0).unwrap();
        controller.batch(None, Duration::ZERO).unwrap();

        assert_eq!(controller.status(), Status::Finished(None));
        let figures = controller.runtime_figures();
        assert_eq!(figures[ITERATIONS], 10.0);
        assert_eq!(figures[LAST_ITERATIONS], 10.0);
        assert_eq!(figures[PUSHED_DATA], 1.0);
        assert_eq!(controller.stop(), Err(Error::NotAlive));
    }

    #[test]
    fn batch_without_termination_never_converges() {
        let controller = Controller::new(CtrlConf::default(), Mock::new(), Line).unwrap();
        assert_eq!(
            controller.batch(None, Duration::ZERO),
            Err(Error::NeverConverge)
        );
        assert_eq!(controller.status(), Status::Created);
    }

    #[test]
    fn batch_with_caller_finishing_alone_converges() {
        let controller = Controller::new(CtrlConf::default(), Mock::new(), Line).unwrap();
        let finishing: Arc<dyn Finishing> = Arc::new(IterFinishing::new(3));
        controller.batch(Some(finishing), Duration::ZERO).unwrap();
        assert_eq!(controller.status(), Status::Finished(None));
        assert!(controller.runtime_figures()[ITERATIONS] >= 3.0);
    }

    #[test]
    fn wait_detects_never_converge() {
        let controller = Controller::new(CtrlConf::default(), Mock::new(), Line).unwrap();
        controller.play(None, Duration::ZERO).unwrap();
        assert_eq!(
            controller.wait(None, Duration::ZERO),
            Err(Error::NeverConverge)
        );
        controller.stop().unwrap();
    }

    #[test]
    fn play_while_running_is_rejected() {
        let controller = Controller::new(CtrlConf::default(), Mock::new(), Line).unwrap();
        controller.play(None, Duration::ZERO).unwrap();
        assert_eq!(
            controller.play(None, Duration::ZERO),
            Err(Error::AlreadyRunning)
        );
        controller.stop().unwrap();
    }

    #[test]
    fn pause_and_resume() {
        let controller = Controller::new(CtrlConf::default(), Mock::new(), Line).unwrap();
        assert_eq!(controller.pause(), Err(Error::NotRunning));

        controller.play(None, Duration::ZERO).unwrap();
        controller.pause().unwrap();
        assert_eq!(controller.status(), Status::Idle);
        assert_eq!(controller.pause(), Err(Error::NotRunning));
        assert_eq!(controller.wait(None, Duration::ZERO), Err(Error::Idle));

        controller.play(None, Duration::ZERO).unwrap();
        assert_eq!(controller.status(), Status::Running);
        controller.stop().unwrap();
        assert_eq!(controller.status(), Status::Finished(None));
    }

    #[test]
    fn stop_interrupts_a_long_run() {
        let conf = conf_with_iter(1_000_000);
        let controller =
            Controller::new(conf, Mock::with_delay(Duration::from_millis(1)), Line).unwrap();
        controller.play(None, Duration::ZERO).unwrap();
        thread::sleep(Duration::from_millis(20));
        controller.stop().unwrap();

        let figures = controller.runtime_figures();
        assert!(figures[ITERATIONS] < 1_000_000.0);
        assert!(controller.centroids().is_ok());
    }

    #[test]
    fn push_auto_plays_on_data_per_iter() {
        let conf = CtrlConf {
            iter: 1,
            data_per_iter: 3,
            ..CtrlConf::default()
        };
        let controller = Controller::new(conf, Mock::new(), Line).unwrap();

        controller.push(1.0).unwrap();
        assert_eq!(controller.status(), Status::Created);
        controller.push(2.0).unwrap();
        assert_eq!(controller.status(), Status::Created);
        controller.push(3.0).unwrap();
        assert_ne!(controller.status(), Status::Created);

        wait_until_finished(&controller);
        assert!(controller.runtime_figures()[ITERATIONS] >= 1.0);
    }

    #[test]
    fn configured_timeout_finishes_the_run() {
        let conf = CtrlConf {
            timeout: Duration::from_millis(50),
            ..CtrlConf::default()
        };
        let controller =
            Controller::new(conf, Mock::with_delay(Duration::from_millis(1)), Line).unwrap();
        controller.play(None, Duration::ZERO).unwrap();
        assert_eq!(controller.wait(None, Duration::ZERO), Err(Error::Timeout));
        assert_eq!(controller.status(), Status::Finished(Some(Error::Timeout)));
    }

    /// A per-data threshold makes the configuration convergeable without
    /// capping the run, so the worker keeps iterating while waiters release.
    fn endless_but_convergeable() -> CtrlConf {
        CtrlConf {
            data_per_iter: 1,
            ..CtrlConf::default()
        }
    }

    #[test]
    fn wait_timeout_releases_without_interrupting() {
        let controller =
            Controller::new(endless_but_convergeable(), Mock::new(), Line).unwrap();
        controller.play(None, Duration::ZERO).unwrap();
        assert_eq!(
            controller.wait(None, Duration::from_millis(30)),
            Err(Error::Timeout)
        );
        assert_eq!(controller.status(), Status::Running);
        controller.stop().unwrap();
    }

    #[test]
    fn wait_predicate_releases_the_waiter_only() {
        let controller =
            Controller::new(endless_but_convergeable(), Mock::new(), Line).unwrap();
        controller.play(None, Duration::ZERO).unwrap();
        let finishing: Arc<dyn Finishing> = Arc::new(IterFinishing::new(3));
        controller.wait(Some(finishing), Duration::ZERO).unwrap();
        assert_eq!(controller.status(), Status::Running);
        controller.stop().unwrap();
    }

    #[test]
    fn wait_arguments_do_not_mask_never_converge() {
        let controller = Controller::new(CtrlConf::default(), Mock::new(), Line).unwrap();
        controller.play(None, Duration::ZERO).unwrap();
        let finishing: Arc<dyn Finishing> = Arc::new(IterFinishing::new(1));
        assert_eq!(
            controller.wait(Some(finishing), Duration::ZERO),
            Err(Error::NeverConverge)
        );
        assert_eq!(
            controller.wait(None, Duration::from_millis(20)),
            Err(Error::NeverConverge)
        );
        controller.stop().unwrap();
    }

    #[test]
    fn iteration_error_finishes_the_run() {
        let controller =
            Controller::new(endless_but_convergeable(), Mock::failing_at(3), Line).unwrap();
        controller.play(None, Duration::ZERO).unwrap();
        let result = controller.wait(None, Duration::ZERO);
        assert_eq!(result, Err(Error::Implementation("tick failure".into())));
        assert_eq!(
            controller.status(),
            Status::Finished(Some(Error::Implementation("tick failure".into())))
        );
    }

    #[test]
    fn push_error_is_returned_and_status_unchanged() {
        let controller = Controller::new(CtrlConf::default(), Mock::bounded(2), Line).unwrap();
        controller.push(1.0).unwrap();
        controller.push(2.0).unwrap();
        assert_eq!(controller.push(3.0), Err(Error::BufferFull));
        assert_eq!(controller.status(), Status::Created);
    }

    #[test]
    fn replay_uses_iter_per_data_cap() {
        let conf = CtrlConf {
            iter: 5,
            iter_per_data: 3,
            ..CtrlConf::default()
        };
        let controller = Controller::new(conf, Mock::new(), Line).unwrap();
        controller.push(4.0).unwrap();
        controller.batch(None, Duration::ZERO).unwrap();
        assert_eq!(controller.runtime_figures()[ITERATIONS], 5.0);

        controller.play(None, Duration::ZERO).unwrap();
        controller.wait(None, Duration::ZERO).unwrap();
        assert_eq!(controller.runtime_figures()[ITERATIONS], 8.0);
        assert_eq!(controller.runtime_figures()[LAST_ITERATIONS], 3.0);
    }

    #[test]
    fn reconfigure_round_trips_conf_and_space() {
        let controller = Controller::new(conf_with_iter(2), Mock::new(), Line).unwrap();
        controller.batch(None, Duration::ZERO).unwrap();

        let next = conf_with_iter(7);
        controller.reconfigure(next, Line).unwrap();
        assert_eq!(controller.conf().iter, 7);
        assert_eq!(controller.status(), Status::Finished(None));
    }

    #[test]
    fn copy_is_independent() {
        let controller = Controller::new(conf_with_iter(2), Mock::new(), Line).unwrap();
        controller.push(10.0).unwrap();
        let copy = controller.copy(conf_with_iter(2), Line).unwrap();
        assert_eq!(copy.status(), Status::Created);

        copy.push(100.0).unwrap();
        copy.batch(None, Duration::ZERO).unwrap();
        assert_eq!(controller.status(), Status::Created);

        controller.batch(None, Duration::ZERO).unwrap();
        // the copy averaged both points, the original only its own
        let (original, _, _) = controller.predict(&0.0).unwrap();
        let (copied, _, _) = copy.predict(&0.0).unwrap();
        assert_eq!(original, 10.0);
        assert_eq!(copied, 55.0);
    }

    #[test]
    fn no_mutation_after_stop() {
        let controller = Controller::new(CtrlConf::default(), Mock::new(), Line).unwrap();
        controller.play(None, Duration::ZERO).unwrap();
        thread::sleep(Duration::from_millis(10));
        controller.stop().unwrap();

        let before = controller.runtime_figures();
        thread::sleep(Duration::from_millis(30));
        assert_eq!(controller.runtime_figures(), before);
    }

    #[test]
    fn notifier_observes_every_transition() {
        let seen: Arc<Mutex<Vec<Status>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let conf = CtrlConf {
            iter: 2,
            status_notifier: Some(Arc::new(move |status: &Status| {
                sink.lock().push(status.clone());
            })),
            ..CtrlConf::default()
        };
        let controller = Controller::new(conf, Mock::new(), Line).unwrap();
        controller.batch(None, Duration::ZERO).unwrap();

        let seen = seen.lock();
        assert_eq!(
            &seen[..3],
            &[Status::Initializing, Status::Ready, Status::Running]
        );
        assert_eq!(seen.last(), Some(&Status::Finished(None)));
    }

    #[test]
    fn invalid_conf_fails_construction() {
        let conf = CtrlConf {
            iter_freq: -2.0,
            ..CtrlConf::default()
        };
        assert!(matches!(
            Controller::new(conf, Mock::new(), Line),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn init_is_not_repeatable() {
        let controller = Controller::new(conf_with_iter(1), Mock::new(), Line).unwrap();
        controller.init().unwrap();
        assert_eq!(controller.status(), Status::Ready);
        assert_eq!(controller.init(), Err(Error::AlreadyCreated));
        controller.batch(None, Duration::ZERO).unwrap();
    }

    #[test]
    fn frequency_caps_the_iteration_rate() {
        let conf = CtrlConf {
            iter_freq: 20.0,
            ..CtrlConf::default()
        };
        let controller = Controller::new(conf, Mock::new(), Line).unwrap();
        controller.play(None, Duration::ZERO).unwrap();
        thread::sleep(Duration::from_millis(300));
        controller.pause().unwrap();

        // 20 Hz over 300 ms leaves room for about 6 iterations
        let iterations = controller.runtime_figures()[ITERATIONS];
        assert!(iterations >= 1.0, "no iteration in 300ms: {iterations}");
        assert!(iterations <= 12.0, "frequency not enforced: {iterations}");
        controller.stop().unwrap();
    }
}
