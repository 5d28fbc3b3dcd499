//! Randomized DAGs checked against a sequential reference evaluation.
//!
//! The reference value of every vertex is computed eagerly while the DAG is
//! built; after `exec` the engine must agree on each of them.

use std::sync::Arc;

use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use hedge_algebra::{Gf, GfAlgebra, Int64};
use hedge_core::{Algebra, Evaluator, Graph, Scheduler, VertexRef, Worker};

fn engine<A: Algebra>(algebra: A, workers: usize) -> (Arc<Scheduler<A>>, Arc<Evaluator<A>>, Graph<A>) {
    let scheduler = Arc::new(Scheduler::new());
    let evaluator = Arc::new(Evaluator::new(Arc::clone(&scheduler)));
    let graph = Graph::new(algebra.clone(), Arc::clone(&evaluator));
    Worker::spawn_local_pool(&scheduler, algebra, workers);
    (scheduler, evaluator, graph)
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("tokio runtime")
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn integer_dags_match_the_reference(
        leaves in prop::collection::vec(-50i64..50, 1..6),
        ops in prop::collection::vec((any::<bool>(), any::<u16>(), any::<u16>()), 1..32),
    ) {
        runtime().block_on(async move {
            let (scheduler, evaluator, graph) = engine(Int64, 4);
            let mut nodes: Vec<(VertexRef<Int64>, i64)> =
                leaves.iter().map(|&value| (graph.leaf(value), value)).collect();

            for (is_sum, left, right) in ops {
                let left = left as usize % nodes.len();
                let right = right as usize % nodes.len();
                let (vertex, expected) = if is_sum {
                    (
                        nodes[left].0.sum(&nodes[right].0).unwrap(),
                        nodes[left].1.wrapping_add(nodes[right].1),
                    )
                } else {
                    (
                        nodes[left].0.prod(&nodes[right].0).unwrap(),
                        nodes[left].1.wrapping_mul(nodes[right].1),
                    )
                };
                evaluator.request(&vertex);
                nodes.push((vertex, expected));
            }

            evaluator.exec().await;
            for (vertex, expected) in &nodes {
                assert_eq!(vertex.value(), Some(*expected), "vertex {vertex}");
            }
            scheduler.shutdown().await;
        });
    }

    #[test]
    fn gf2_dags_match_the_reference(
        leaves in prop::collection::vec(0u64..2, 1..6),
        ops in prop::collection::vec((any::<bool>(), any::<u16>(), any::<u16>()), 1..32),
    ) {
        runtime().block_on(async move {
            let (scheduler, evaluator, graph) = engine(GfAlgebra::<2>, 4);
            let mut nodes: Vec<(VertexRef<GfAlgebra<2>>, u64)> = leaves
                .iter()
                .map(|&bit| (graph.leaf(Gf::new(bit)), bit))
                .collect();

            for (is_sum, left, right) in ops {
                let left = left as usize % nodes.len();
                let right = right as usize % nodes.len();
                let (vertex, expected) = if is_sum {
                    (
                        nodes[left].0.sum(&nodes[right].0).unwrap(),
                        nodes[left].1 ^ nodes[right].1,
                    )
                } else {
                    (
                        nodes[left].0.prod(&nodes[right].0).unwrap(),
                        nodes[left].1 & nodes[right].1,
                    )
                };
                evaluator.request(&vertex);
                nodes.push((vertex, expected));
            }

            evaluator.exec().await;
            for (vertex, expected) in &nodes {
                assert_eq!(vertex.value(), Some(Gf::new(*expected)), "vertex {vertex}");
            }
            scheduler.shutdown().await;
        });
    }
}

/// Deeper single-shot fuzz over a seeded generator, additionally checking
/// that every resolved operation equals the operation of its operands.
#[tokio::test]
async fn deep_seeded_dag_is_consistent() {
    let mut rng = StdRng::seed_from_u64(7);
    let (scheduler, evaluator, graph) = engine(Int64, 6);

    let mut nodes: Vec<(VertexRef<Int64>, i64)> = (0..8)
        .map(|_| {
            let value = rng.gen_range(-9i64..10);
            (graph.leaf(value), value)
        })
        .collect();

    for _ in 0..200 {
        let left = rng.gen_range(0..nodes.len());
        let right = rng.gen_range(0..nodes.len());
        let (vertex, expected) = if rng.gen_bool(0.5) {
            (
                nodes[left].0.sum(&nodes[right].0).unwrap(),
                nodes[left].1.wrapping_add(nodes[right].1),
            )
        } else {
            (
                nodes[left].0.prod(&nodes[right].0).unwrap(),
                nodes[left].1.wrapping_mul(nodes[right].1),
            )
        };
        nodes.push((vertex, expected));
    }

    graph.eval_all();
    evaluator.exec().await;

    for (vertex, expected) in &nodes {
        assert_eq!(vertex.value(), Some(*expected), "vertex {vertex}");
        if let Some((left, right)) = vertex.operands() {
            let combined = match vertex.state() {
                hedge_core::VertexState::Resolved => vertex.value().unwrap(),
                other => panic!("unresolved operation vertex in state {other:?}"),
            };
            let left = left.value().unwrap();
            let right = right.value().unwrap();
            assert!(
                combined == left.wrapping_add(right) || combined == left.wrapping_mul(right),
                "vertex {vertex} does not combine its operands"
            );
        }
    }
    scheduler.shutdown().await;
}
