//! A single pool worker and its state machine.
//!
//! `Idle -> Active -> Stopped`. A worker leaves `Active` when it receives its
//! stop signal, when the queue closes, or after sitting idle for the pool's
//! idle timeout. `Stopped` is terminal; the pool constructs a new worker
//! instead of restarting an old one.

use crate::pool::task::Task;
use crate::pool::Shared;
use crate::trace::{trace_event, trace_warn};
use crossbeam_channel::{bounded, select, Receiver, Sender};
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::thread;

const IDLE: u8 = 0;
const ACTIVE: u8 = 1;
const STOPPED: u8 = 2;

/// Lifecycle state of a worker.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WorkerState {
    /// Constructed, no thread yet.
    Idle,
    /// Thread running: executing a task or blocked on the queue.
    Active,
    /// Terminal.
    Stopped,
}

pub(crate) struct Worker {
    id: usize,
    state: AtomicU8,
    busy: AtomicBool,
    stop_tx: Sender<()>,
    stop_rx: Receiver<()>,
}

impl Worker {
    pub(crate) fn new(id: usize) -> Arc<Self> {
        let (stop_tx, stop_rx) = bounded(1);
        Arc::new(Self {
            id,
            state: AtomicU8::new(IDLE),
            busy: AtomicBool::new(false),
            stop_tx,
            stop_rx,
        })
    }

    pub(crate) fn id(&self) -> usize {
        self.id
    }

    pub(crate) fn state(&self) -> WorkerState {
        match self.state.load(Ordering::Acquire) {
            IDLE => WorkerState::Idle,
            ACTIVE => WorkerState::Active,
            _ => WorkerState::Stopped,
        }
    }

    /// True while the worker is executing a task.
    pub(crate) fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Moves `Idle -> Active` and spawns the worker thread.
    ///
    /// Returns false if the worker was not idle or the thread could not be
    /// spawned. Callers hold the pool lock.
    pub(crate) fn start(self: &Arc<Self>, shared: &Arc<Shared>) -> bool {
        if self
            .state
            .compare_exchange(IDLE, ACTIVE, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }

        let worker = Arc::clone(self);
        let shared = Arc::clone(shared);
        let spawned = thread::Builder::new()
            .name(format!("scanmatch-worker-{}", self.id))
            .spawn(move || worker.run(shared));
        match spawned {
            Ok(_) => {
                trace_event!("worker_started", worker = self.id);
                true
            }
            Err(err) => {
                self.state.store(STOPPED, Ordering::Release);
                trace_warn!("worker_spawn_failed", worker = self.id, reason = err.to_string().as_str());
                false
            }
        }
    }

    /// Moves `Active -> Stopped` and signals the thread.
    ///
    /// Non-blocking. Returns true if this call performed the transition.
    pub(crate) fn signal_stop(&self) -> bool {
        if self
            .state
            .compare_exchange(ACTIVE, STOPPED, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }
        let _ = self.stop_tx.try_send(());
        true
    }

    /// Moves `Idle -> Stopped` for a worker that never ran.
    pub(crate) fn discard(&self) -> bool {
        self.state
            .compare_exchange(IDLE, STOPPED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    fn run(self: Arc<Self>, shared: Arc<Shared>) {
        while self.state() == WorkerState::Active {
            select! {
                recv(self.stop_rx) -> _ => break,
                recv(shared.queue_rx) -> msg => match msg {
                    Ok(task) => self.process(task, &shared),
                    Err(_) => break,
                },
                default(shared.idle_timeout) => break,
            }
        }
        trace_event!("worker_stopped", worker = self.id);
        shared.retire(&self);
    }

    fn process(&self, task: Task, shared: &Arc<Shared>) {
        self.busy.store(true, Ordering::Release);
        let task_id = task.id();
        let outcome = task.execute();
        self.busy.store(false, Ordering::Release);
        shared.finish_task(self.id, task_id, outcome);
    }

    /// Marks an exiting thread stopped. Returns true if it was still active.
    pub(crate) fn mark_exited(&self) -> bool {
        self.state
            .compare_exchange(ACTIVE, STOPPED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}
