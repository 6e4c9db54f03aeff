//! Elastic worker pool over a bounded FIFO task queue.
//!
//! The pool owns the queue and a fleet of `Worker`s. Workers are spun up on
//! demand when outstanding work per active worker exceeds one, shut down
//! after an idle timeout, and can be stopped, drained and resized at runtime.
//! All bookkeeping (`max_workers`, the worker list, the active count and the
//! stopped flag) lives behind one mutex paired with a condition variable that
//! `wait` blocks on.
//!
//! A task's error or panic is counted and logged at the worker boundary and
//! never stops the worker. There is no retry; resubmission is the producer's
//! job.

mod task;
mod worker;

pub use task::{Task, TaskOutcome};
pub use worker::WorkerState;

use crate::trace::{trace_event, trace_warn};
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use worker::Worker;

/// Configuration for a worker pool.
#[derive(Clone, Debug)]
pub struct PoolConfig {
    /// Initial worker ceiling (clamped to at least 1).
    pub max_workers: usize,
    /// Capacity of the bounded task queue (clamped to at least 1).
    pub queue_capacity: usize,
    /// How long an active worker waits on an empty queue before stopping.
    pub idle_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_workers: 1,
            queue_capacity: 3000,
            idle_timeout: Duration::from_millis(20),
        }
    }
}

/// Task counters since the pool was created.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Tasks passed to `submit_task`.
    pub submitted_tasks: u64,
    /// Tasks that returned `Ok`.
    pub completed_tasks: u64,
    /// Tasks that returned an error or panicked.
    pub failed_tasks: u64,
    /// Queued tasks discarded by `clear_task_queue`.
    pub cleared_tasks: u64,
}

struct PoolState {
    max_workers: usize,
    workers: Vec<Arc<Worker>>,
    active: usize,
    stopped: bool,
    next_worker_id: usize,
}

pub(crate) struct Shared {
    state: Mutex<PoolState>,
    drained: Condvar,
    queue_rx: Receiver<Task>,
    idle_timeout: Duration,
    outstanding: AtomicU64,
    submitted: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
    cleared: AtomicU64,
}

impl Shared {
    fn lock_state(&self) -> MutexGuard<'_, PoolState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Starts workers while outstanding work per active worker exceeds one.
    fn scale_up(self: &Arc<Self>, state: &mut PoolState) {
        if state.stopped {
            return;
        }
        state.workers.retain(|w| w.state() != WorkerState::Stopped);

        let outstanding = self.outstanding.load(Ordering::Acquire);
        while state.active < state.max_workers && outstanding > state.active as u64 {
            let idle = state
                .workers
                .iter()
                .find(|w| w.state() == WorkerState::Idle)
                .cloned();
            let worker = match idle {
                Some(worker) => worker,
                None if state.workers.len() < state.max_workers => {
                    let worker = Worker::new(state.next_worker_id);
                    state.next_worker_id += 1;
                    state.workers.push(Arc::clone(&worker));
                    worker
                }
                None => break,
            };
            if !worker.start(self) {
                break;
            }
            state.active += 1;
        }
    }

    /// Called by a worker thread on exit.
    pub(crate) fn retire(self: &Arc<Self>, worker: &Worker) {
        let mut state = self.lock_state();
        if worker.mark_exited() {
            state.active = state.active.saturating_sub(1);
        }
        state.workers.retain(|w| w.state() != WorkerState::Stopped);
        self.scale_up(&mut state);
        self.drained.notify_all();
    }

    pub(crate) fn finish_task(&self, worker_id: usize, task_id: u64, outcome: TaskOutcome) {
        match outcome {
            Ok(()) => {
                self.completed.fetch_add(1, Ordering::AcqRel);
            }
            Err(err) => {
                self.failed.fetch_add(1, Ordering::AcqRel);
                trace_warn!(
                    "task_failed",
                    worker = worker_id,
                    task = task_id,
                    reason = err.to_string().as_str(),
                );
            }
        }
        self.outstanding.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Dynamically sized pool of worker threads.
pub struct WorkerPool {
    shared: Arc<Shared>,
    queue_tx: Sender<Task>,
}

impl WorkerPool {
    /// Creates a pool with `max_workers` idle workers and an empty queue.
    pub fn new(cfg: PoolConfig) -> Self {
        let max_workers = cfg.max_workers.max(1);
        let (queue_tx, queue_rx) = bounded(cfg.queue_capacity.max(1));
        let workers = (0..max_workers).map(Worker::new).collect();
        let shared = Arc::new(Shared {
            state: Mutex::new(PoolState {
                max_workers,
                workers,
                active: 0,
                stopped: false,
                next_worker_id: max_workers,
            }),
            drained: Condvar::new(),
            queue_rx,
            idle_timeout: cfg.idle_timeout,
            outstanding: AtomicU64::new(0),
            submitted: AtomicU64::new(0),
            completed: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            cleared: AtomicU64::new(0),
        });
        Self { shared, queue_tx }
    }

    /// Resumes accepting work if no workers are currently counted active.
    ///
    /// Idempotent. Queued tasks left over from a `stop` are picked up.
    pub fn start(&self) {
        let mut state = self.shared.lock_state();
        if state.active == 0 {
            state.stopped = false;
            self.shared.scale_up(&mut state);
        }
    }

    /// Signals every active worker to halt and marks the pool stopped.
    ///
    /// Does not block and does not drain the queue. Workers finish the loop
    /// iteration they are in before observing the signal.
    pub fn stop(&self) {
        let mut state = self.shared.lock_state();
        for worker in &state.workers {
            if worker.signal_stop() {
                trace_event!("worker_stop_signalled", worker = worker.id());
            }
        }
        state.workers.retain(|w| w.state() != WorkerState::Stopped);
        state.active = 0;
        state.stopped = true;
        self.shared.drained.notify_all();
    }

    /// Enqueues a task, blocking only while the queue is full.
    pub fn submit_task(&self, task: Task) {
        self.shared.submitted.fetch_add(1, Ordering::AcqRel);
        self.shared.outstanding.fetch_add(1, Ordering::AcqRel);
        match self.queue_tx.try_send(task) {
            Ok(()) => {}
            Err(TrySendError::Full(task)) => {
                self.scale_up();
                // The pool holds a receiver, so the queue never disconnects.
                let _ = self.queue_tx.send(task);
            }
            Err(TrySendError::Disconnected(_)) => {}
        }
        self.scale_up();
    }

    /// Raises the worker ceiling by `n`, constructing idle workers.
    pub fn increase_max_workers(&self, n: usize) {
        if n == 0 {
            return;
        }
        let mut state = self.shared.lock_state();
        state.max_workers += n;
        while state.workers.len() < state.max_workers {
            let worker = Worker::new(state.next_worker_id);
            state.next_worker_id += 1;
            state.workers.push(worker);
        }
        trace_event!("pool_resized", max_workers = state.max_workers);
        self.shared.scale_up(&mut state);
    }

    /// Lowers the worker ceiling by `n` (never below 1).
    ///
    /// Surplus workers are removed idle ones first, then active workers
    /// waiting on the queue, then busy workers. A busy worker removed this way
    /// finishes the closure it is running but is no longer counted; its task
    /// is not requeued.
    pub fn decrease_max_workers(&self, n: usize) {
        let mut state = self.shared.lock_state();
        let n = n.min(state.max_workers - 1);
        if n == 0 {
            return;
        }
        state.max_workers -= n;

        let mut excess = state.workers.len().saturating_sub(state.max_workers);
        for worker in &state.workers {
            if excess == 0 {
                break;
            }
            if worker.discard() {
                excess -= 1;
            }
        }
        let mut stopped = 0usize;
        for abandon_busy in [false, true] {
            for worker in &state.workers {
                if excess == 0 {
                    break;
                }
                if worker.is_busy() != abandon_busy {
                    continue;
                }
                if worker.signal_stop() {
                    excess -= 1;
                    stopped += 1;
                    if abandon_busy {
                        trace_warn!("worker_abandoned_task", worker = worker.id());
                    }
                }
            }
        }
        state.active = state.active.saturating_sub(stopped);
        state.workers.retain(|w| w.state() != WorkerState::Stopped);
        trace_event!("pool_resized", max_workers = state.max_workers);
        self.shared.drained.notify_all();
    }

    /// Blocks until the queue is empty and no workers are active.
    pub fn wait(&self) {
        let mut state = self.shared.lock_state();
        while !self.shared.queue_rx.is_empty() || state.active > 0 {
            state = self
                .shared
                .drained
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Discards queued tasks that have not started. Active workers are untouched.
    pub fn clear_task_queue(&self) {
        let mut drained = 0u64;
        while self.shared.queue_rx.try_recv().is_ok() {
            drained += 1;
        }
        if drained > 0 {
            self.shared.outstanding.fetch_sub(drained, Ordering::AcqRel);
            self.shared.cleared.fetch_add(drained, Ordering::AcqRel);
        }
        let _state = self.shared.lock_state();
        self.shared.drained.notify_all();
    }

    /// Returns the current worker ceiling.
    pub fn max_workers(&self) -> usize {
        self.shared.lock_state().max_workers
    }

    /// Returns true while tasks are queued or any worker is active.
    pub fn is_working(&self) -> bool {
        let state = self.shared.lock_state();
        !self.shared.queue_rx.is_empty() || state.active > 0
    }

    /// Returns the number of workers counted active.
    pub fn active_workers(&self) -> usize {
        self.shared.lock_state().active
    }

    /// Returns true after `stop` until the next effective `start`.
    pub fn is_stopped(&self) -> bool {
        self.shared.lock_state().stopped
    }

    /// Returns the number of tasks waiting in the queue.
    pub fn queued_tasks(&self) -> usize {
        self.shared.queue_rx.len()
    }

    /// Returns task counters.
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            submitted_tasks: self.shared.submitted.load(Ordering::Acquire),
            completed_tasks: self.shared.completed.load(Ordering::Acquire),
            failed_tasks: self.shared.failed.load(Ordering::Acquire),
            cleared_tasks: self.shared.cleared.load(Ordering::Acquire),
        }
    }

    fn scale_up(&self) {
        let mut state = self.shared.lock_state();
        self.shared.scale_up(&mut state);
    }
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self::new(PoolConfig::default())
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.clear_task_queue();
        self.stop();
    }
}
