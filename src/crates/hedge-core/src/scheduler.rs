//! Task queue and worker registry.
//!
//! The scheduler is deliberately naive: a FIFO queue and a set of workers
//! behind one mutex. It never matches tasks to workers — idle workers pull.
//! That keeps the dispatcher trivial and workers symmetric, which is the
//! right trade for workloads where a single operation dwarfs scheduling
//! overhead.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::algebra::Algebra;
use crate::graph::VertexRef;

static NEXT_WORKER_ID: AtomicU64 = AtomicU64::new(0);

/// Process-unique identity of a worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WorkerId(u64);

impl WorkerId {
    pub(crate) fn next() -> Self {
        Self(NEXT_WORKER_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "w{}", self.0)
    }
}

/// How a dispatched task ended, reported back on the task's completion
/// channel.
#[derive(Debug)]
pub enum TaskOutcome<A: Algebra> {
    /// The vertex was resolved (or already was).
    Done(VertexRef<A>),
    /// The worker failed; the vertex is untouched and should be re-emitted.
    Failed(VertexRef<A>),
}

type PreHook = Box<dyn FnOnce() + Send + 'static>;

/// A single-use scheduling record: the vertex to resolve plus the hooks the
/// evaluator listens on.
///
/// The optional `pre` hook runs on the worker just before solving; the
/// evaluator leaves it empty, tests use it to observe dispatch. Success and
/// failure are reported as a [`TaskOutcome`] on the completion channel.
pub struct Task<A: Algebra> {
    vertex: VertexRef<A>,
    pre: Option<PreHook>,
    completion: mpsc::UnboundedSender<TaskOutcome<A>>,
}

impl<A: Algebra> Task<A> {
    /// Builds a task for `vertex` reporting on `completion`.
    pub fn new(vertex: VertexRef<A>, completion: mpsc::UnboundedSender<TaskOutcome<A>>) -> Self {
        Self {
            vertex,
            pre: None,
            completion,
        }
    }

    /// Attaches a hook invoked on the worker before solving.
    pub fn with_pre(mut self, hook: impl FnOnce() + Send + 'static) -> Self {
        self.pre = Some(Box::new(hook));
        self
    }

    /// The vertex this task resolves.
    pub fn vertex(&self) -> &VertexRef<A> {
        &self.vertex
    }

    pub(crate) fn start(&mut self) {
        if let Some(pre) = self.pre.take() {
            pre();
        }
    }

    pub(crate) fn complete(self, outcome: TaskOutcome<A>) {
        // The receiver may be gone when the evaluator was dropped mid-run;
        // the result is already stored in the vertex either way.
        let _ = self.completion.send(outcome);
    }
}

/// Registry entry for a spawned worker: identity, display name and the join
/// handle of its pull loop.
pub struct WorkerHandle {
    id: WorkerId,
    name: String,
    join: JoinHandle<()>,
}

impl WorkerHandle {
    pub(crate) fn new(id: WorkerId, name: String, join: JoinHandle<()>) -> Self {
        Self { id, name, join }
    }

    /// The worker's identity.
    pub fn id(&self) -> WorkerId {
        self.id
    }

    /// The worker's display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Waits for the worker's loop to finish.
    pub async fn join(self) {
        let _ = self.join.await;
    }

    fn abort(&self) {
        self.join.abort();
    }
}

struct SchedState<A: Algebra> {
    queue: VecDeque<Task<A>>,
    workers: HashMap<WorkerId, WorkerHandle>,
    shutdown: bool,
}

/// Multi-producer/multi-consumer task broker owning a dynamic set of
/// workers.
pub struct Scheduler<A: Algebra> {
    state: Mutex<SchedState<A>>,
    work_available: Notify,
}

impl<A: Algebra> Scheduler<A> {
    /// Creates a scheduler with no workers and an empty queue.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(SchedState {
                queue: VecDeque::new(),
                workers: HashMap::new(),
                shutdown: false,
            }),
            work_available: Notify::new(),
        }
    }

    /// Appends a task to the queue (FIFO).
    ///
    /// On the empty-to-non-empty transition every parked worker is woken,
    /// plus one permit for a worker racing between its queue check and its
    /// wait. Waking a single worker would serialize independent tasks behind
    /// it while the rest of the pool sleeps.
    pub fn add_task(&self, task: Task<A>) {
        let was_empty = {
            let mut state = self.state.lock();
            debug!(vertex = %task.vertex(), "task queued");
            let was_empty = state.queue.is_empty();
            state.queue.push_back(task);
            was_empty
        };
        if was_empty {
            self.work_available.notify_waiters();
            self.work_available.notify_one();
        }
    }

    /// Blocks until a task is available or the scheduler shuts down.
    /// `None` tells the calling worker to exit its loop.
    pub(crate) async fn next_task(&self) -> Option<Task<A>> {
        let mut notified = std::pin::pin!(self.work_available.notified());
        loop {
            // Register interest before checking state: a notification issued
            // between the check and the await must not be lost.
            notified.as_mut().enable();
            {
                let mut state = self.state.lock();
                if state.shutdown {
                    return None;
                }
                if let Some(task) = state.queue.pop_front() {
                    return Some(task);
                }
            }
            notified.as_mut().await;
            notified.set(self.work_available.notified());
        }
    }

    /// Adds a worker to the registry. The scheduler owns the worker until it
    /// is unregistered or the scheduler shuts down.
    pub fn register_worker(&self, handle: WorkerHandle) {
        info!(worker = %handle.name(), "worker registered");
        self.state.lock().workers.insert(handle.id(), handle);
    }

    /// Removes a worker from the registry, passing ownership of its handle
    /// back to the caller. In practice the caller is the worker's own
    /// shutdown path.
    pub fn unregister_worker(&self, id: WorkerId) -> Option<WorkerHandle> {
        let handle = self.state.lock().workers.remove(&id);
        if let Some(handle) = &handle {
            info!(worker = %handle.name(), "worker unregistered");
        }
        handle
    }

    /// Number of currently registered workers.
    pub fn worker_count(&self) -> usize {
        self.state.lock().workers.len()
    }

    /// Number of tasks waiting in the queue.
    pub fn queued_tasks(&self) -> usize {
        self.state.lock().queue.len()
    }

    /// Stops every registered worker and waits for their loops to exit.
    /// Queued tasks are dropped.
    pub async fn shutdown(&self) {
        let handles: Vec<WorkerHandle> = {
            let mut state = self.state.lock();
            state.shutdown = true;
            state.workers.drain().map(|(_, handle)| handle).collect()
        };
        self.work_available.notify_waiters();
        info!(workers = handles.len(), "scheduler shutting down");
        for handle in handles {
            handle.join().await;
        }
    }
}

impl<A: Algebra> Default for Scheduler<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: Algebra> Drop for Scheduler<A> {
    fn drop(&mut self) {
        let mut state = self.state.lock();
        state.shutdown = true;
        for (_, handle) in state.workers.drain() {
            handle.abort();
        }
    }
}
