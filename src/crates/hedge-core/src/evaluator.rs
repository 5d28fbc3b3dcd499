//! The readiness-driven evaluation loop.
//!
//! Evaluation runs in two phases. Phase A is a pure topology walk: starting
//! from the requested vertices, every unresolved transitive dependency is
//! collected into the closure. Phase B is the data-driven scheduling loop:
//! every vertex whose operands are resolved is emitted to the scheduler, and
//! each completion wakes the loop to re-scan, because one result may unlock
//! several successors at once.
//!
//! The policy is strictly "emit everything that is ready right now" — no
//! batching, no priorities. For homogeneous workers and operations that are
//! long relative to scheduling overhead (the homomorphic-encryption case)
//! nothing smarter is needed.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::debug;

use crate::algebra::Algebra;
use crate::graph::VertexRef;
use crate::scheduler::{Scheduler, Task, TaskOutcome};

/// Closure-entry lifecycle inside one `exec` run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Progress {
    Pending,
    InProgress,
    Done,
}

/// Drives requested vertices to resolution against one [`Scheduler`].
pub struct Evaluator<A: Algebra> {
    scheduler: Arc<Scheduler<A>>,
    requested: Mutex<HashSet<VertexRef<A>>>,
}

impl<A: Algebra> Evaluator<A> {
    /// Creates an evaluator dispatching onto `scheduler`.
    pub fn new(scheduler: Arc<Scheduler<A>>) -> Self {
        Self {
            scheduler,
            requested: Mutex::new(HashSet::new()),
        }
    }

    /// The scheduler this evaluator dispatches onto.
    pub fn scheduler(&self) -> &Arc<Scheduler<A>> {
        &self.scheduler
    }

    /// Marks a vertex for evaluation. Idempotent; vertices that already hold
    /// a value are ignored.
    pub fn request(&self, vertex: &VertexRef<A>) {
        if vertex.is_resolved() {
            debug!(vertex = %vertex, "request ignored, already resolved");
            return;
        }
        debug!(vertex = %vertex, "vertex requested");
        self.requested.lock().insert(vertex.clone());
    }

    /// Drops the accumulated request set. Must not be called while `exec` is
    /// running.
    pub fn reset(&self) {
        self.requested.lock().clear();
    }

    /// Blocks until every requested vertex is resolved.
    ///
    /// Requests recorded after `exec` starts are picked up by the next call,
    /// not the running one. With an empty request set (or one whose vertices
    /// all hold values already) this returns immediately.
    ///
    /// A failed task reverts to pending and is re-emitted on the next scan,
    /// so evaluation survives individual worker departures. If no worker is
    /// registered at all, this waits until one appears — keeping at least one
    /// worker alive is the caller's contract.
    pub async fn exec(&self) {
        // Phase A: collect the closure of unresolved dependencies. Done
        // without further locking — operand topology is immutable once
        // constructed.
        let requested: Vec<VertexRef<A>> = self.requested.lock().iter().cloned().collect();
        let mut closure: HashMap<VertexRef<A>, Progress> = HashMap::new();
        for root in &requested {
            collect_unresolved(root, &mut closure);
        }
        if closure.is_empty() {
            debug!("nothing to evaluate");
            return;
        }
        debug!(vertices = closure.len(), "dependency closure built");

        // Phase B: dispatch every ready vertex, then wait for completions.
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut remaining = closure.len();
        loop {
            for (vertex, progress) in closure.iter_mut() {
                if *progress == Progress::Pending && vertex.solvable() {
                    *progress = Progress::InProgress;
                    self.scheduler
                        .add_task(Task::new(vertex.clone(), tx.clone()));
                }
            }
            if remaining == 0 {
                break;
            }

            // We hold a sender ourselves, so `recv` cannot observe a closed
            // channel; it parks until a worker reports.
            let Some(outcome) = rx.recv().await else {
                break;
            };
            apply_outcome(&mut closure, &mut remaining, outcome);
            // Drain whatever else arrived before re-scanning; any number of
            // completions may have unlocked successors.
            while let Ok(outcome) = rx.try_recv() {
                apply_outcome(&mut closure, &mut remaining, outcome);
            }
        }
        debug!("all requested vertices resolved");
    }
}

fn apply_outcome<A: Algebra>(
    closure: &mut HashMap<VertexRef<A>, Progress>,
    remaining: &mut usize,
    outcome: TaskOutcome<A>,
) {
    match outcome {
        TaskOutcome::Done(vertex) => {
            if let Some(progress) = closure.get_mut(&vertex) {
                if *progress != Progress::Done {
                    *progress = Progress::Done;
                    *remaining -= 1;
                }
            }
        }
        TaskOutcome::Failed(vertex) => {
            debug!(vertex = %vertex, "task failed, reverting to pending");
            if let Some(progress) = closure.get_mut(&vertex) {
                if *progress == Progress::InProgress {
                    *progress = Progress::Pending;
                }
            }
        }
    }
}

/// Depth-first walk along operand edges, stopping at resolved boundaries.
fn collect_unresolved<A: Algebra>(
    root: &VertexRef<A>,
    closure: &mut HashMap<VertexRef<A>, Progress>,
) {
    let mut stack = vec![root.clone()];
    while let Some(vertex) = stack.pop() {
        if vertex.is_resolved() || closure.contains_key(&vertex) {
            continue;
        }
        if let Some((left, right)) = vertex.operands() {
            stack.push(left);
            stack.push(right);
        }
        closure.insert(vertex, Progress::Pending);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Graph;
    use crate::testing::TestAlgebra;

    fn fixture() -> (Arc<Evaluator<TestAlgebra>>, Graph<TestAlgebra>) {
        let scheduler = Arc::new(Scheduler::new());
        let evaluator = Arc::new(Evaluator::new(scheduler));
        let graph = Graph::new(TestAlgebra, Arc::clone(&evaluator));
        (evaluator, graph)
    }

    #[tokio::test]
    async fn exec_with_no_requests_returns_immediately() {
        let (evaluator, _graph) = fixture();
        evaluator.exec().await;
    }

    #[tokio::test]
    async fn requesting_a_leaf_is_a_no_op() {
        let (evaluator, graph) = fixture();
        let leaf = graph.leaf(4);
        evaluator.request(&leaf);
        // No worker registered; this must still return at once because the
        // closure is empty.
        evaluator.exec().await;
        assert_eq!(leaf.value(), Some(4));
    }

    #[test]
    fn closure_stops_at_resolved_boundaries() {
        let (_evaluator, graph) = fixture();
        let a = graph.leaf(1);
        let b = graph.leaf(2);
        let inner = a.sum(&b).unwrap();
        let outer = inner.sum(&a).unwrap();

        let mut closure = HashMap::new();
        collect_unresolved(&outer, &mut closure);
        assert_eq!(closure.len(), 2);

        inner.resolve(3);
        let mut closure = HashMap::new();
        collect_unresolved(&outer, &mut closure);
        assert_eq!(closure.len(), 1);
        assert!(closure.contains_key(&outer));
    }

    #[test]
    fn request_set_survives_duplicates_and_resets() {
        let (evaluator, graph) = fixture();
        let pending = graph.leaf(1).sum(&graph.leaf(2)).unwrap();
        evaluator.request(&pending);
        evaluator.request(&pending);
        assert_eq!(evaluator.requested.lock().len(), 1);
        evaluator.reset();
        assert!(evaluator.requested.lock().is_empty());
    }
}
