//! Worker runtime: the pull loop and the computation contract.
//!
//! A worker is a spawned task that pulls from its scheduler's queue, performs
//! the vertex's operation through a [`Compute`] implementation and writes the
//! result back. Workers are symmetric; the only thing that varies is where
//! the arithmetic happens — in process ([`LocalCompute`]) or on a peer
//! reached over a stream (the network proxy in `hedge-net`).
//!
//! A worker that hits any failure reports it on the task's completion
//! channel, unregisters itself from the scheduler and ends its own loop.
//! Cooperative self-removal keeps resource reclamation outside the failing
//! path: the handle returned by `unregister_worker` is dropped by the loop
//! itself and the spawned task simply returns.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error, info};

use crate::algebra::Algebra;
use crate::error::Result;
use crate::graph::{OpKind, VertexRef};
use crate::scheduler::{Scheduler, Task, TaskOutcome, WorkerHandle, WorkerId};

/// Where a worker's arithmetic actually runs.
///
/// Implementations receive owned operand values: the engine copies operands
/// out of the graph before dispatch, so a computation never borrows from the
/// arena.
#[async_trait]
pub trait Compute<A: Algebra>: Send + Sync + 'static {
    /// Computes `left + right`.
    async fn sum(&self, left: A::Value, right: A::Value) -> Result<A::Value>;

    /// Computes `left * right`.
    async fn prod(&self, left: A::Value, right: A::Value) -> Result<A::Value>;
}

/// Computes directly on the worker's own task using the algebra instance.
pub struct LocalCompute<A: Algebra> {
    algebra: A,
}

impl<A: Algebra> LocalCompute<A> {
    /// Wraps an algebra instance for in-process computation.
    pub fn new(algebra: A) -> Self {
        Self { algebra }
    }
}

#[async_trait]
impl<A: Algebra> Compute<A> for LocalCompute<A> {
    async fn sum(&self, left: A::Value, right: A::Value) -> Result<A::Value> {
        self.algebra.sum(&left, &right)
    }

    async fn prod(&self, left: A::Value, right: A::Value) -> Result<A::Value> {
        self.algebra.prod(&left, &right)
    }
}

/// Spawning entry points for workers.
pub struct Worker;

impl Worker {
    /// Spawns a worker feeding from `scheduler`'s queue and registers it.
    pub fn spawn<A, C>(scheduler: &Arc<Scheduler<A>>, compute: C, name: impl Into<String>) -> WorkerId
    where
        A: Algebra,
        C: Compute<A>,
    {
        let name = name.into();
        let id = WorkerId::next();
        let join = tokio::spawn(run_loop(Arc::clone(scheduler), compute, id, name.clone()));
        scheduler.register_worker(WorkerHandle::new(id, name, join));
        id
    }

    /// Spawns `count` local workers over clones of `algebra`.
    pub fn spawn_local_pool<A: Algebra>(
        scheduler: &Arc<Scheduler<A>>,
        algebra: A,
        count: usize,
    ) -> Vec<WorkerId> {
        (1..=count)
            .map(|i| {
                Self::spawn(
                    scheduler,
                    LocalCompute::new(algebra.clone()),
                    format!("local-{i}"),
                )
            })
            .collect()
    }
}

async fn run_loop<A, C>(scheduler: Arc<Scheduler<A>>, compute: C, id: WorkerId, name: String)
where
    A: Algebra,
    C: Compute<A>,
{
    while let Some(mut task) = scheduler.next_task().await {
        let vertex = task.vertex().clone();
        debug!(worker = %name, vertex = %vertex, "starting task");
        task.start();
        match solve(&vertex, &compute).await {
            Ok(()) => {
                debug!(worker = %name, vertex = %vertex, "finished task");
                task.complete(TaskOutcome::Done(vertex));
            }
            Err(err) => {
                if err.is_departure() {
                    info!(worker = %name, vertex = %vertex, "peer disconnected, retiring");
                } else {
                    error!(worker = %name, vertex = %vertex, %err, "task failed, retiring");
                }
                task.complete(TaskOutcome::Failed(vertex));
                drop(scheduler.unregister_worker(id));
                break;
            }
        }
    }
    debug!(worker = %name, "worker loop ended");
}

/// Performs the vertex's operation and stores the result.
///
/// Operand reads are deliberately unguarded beyond the arena lock: the
/// evaluator only dispatches a vertex whose operands have already resolved,
/// and resolved value slots are never written again. The arena write lock
/// taken by `resolve` makes the new value and the `Resolved` state visible
/// together.
async fn solve<A, C>(vertex: &VertexRef<A>, compute: &C) -> Result<()>
where
    A: Algebra,
    C: Compute<A>,
{
    let Some((kind, left, right)) = vertex.operation()? else {
        // Leaf or already resolved: nothing to do.
        return Ok(());
    };
    let value = match kind {
        OpKind::Sum => compute.sum(left, right).await?,
        OpKind::Prod => compute.prod(left, right).await?,
    };
    vertex.resolve(value);
    Ok(())
}
