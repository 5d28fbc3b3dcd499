//! Expression graphs: an arena of vertices plus structural interning.
//!
//! A [`Graph`] owns every vertex created through it. Vertices are stored in a
//! growable arena behind a read-write lock and addressed by stable indices;
//! a [`VertexRef`] is a cheap shared handle (arena + index) that keeps the
//! arena alive, so a reference can never outlive the vertices it points at.
//!
//! Operation construction interns structurally: asking for `a + b` twice
//! returns the same vertex, so common subexpressions written out as algebraic
//! identities are evaluated once per run.

use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::algebra::{Algebra, BinaryAlgebra};
use crate::error::{EngineError, Result};
use crate::evaluator::Evaluator;

static NEXT_GRAPH_ID: AtomicU64 = AtomicU64::new(0);

/// The two binary operations a vertex can represent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpKind {
    /// The algebra's `sum`.
    Sum,
    /// The algebra's `prod`.
    Prod,
}

impl OpKind {
    /// Display symbol used when synthesizing labels.
    pub fn symbol(self) -> &'static str {
        match self {
            OpKind::Sum => "+",
            OpKind::Prod => "*",
        }
    }
}

/// Lifecycle state of a vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VertexState {
    /// A constant; its value slot was populated at construction.
    Leaf,
    /// A sum whose value has not been computed yet.
    PendingSum,
    /// A product whose value has not been computed yet.
    PendingProd,
    /// A computed operation; the value slot is populated and never mutated
    /// again.
    Resolved,
}

impl VertexState {
    /// True when the value slot is populated.
    pub fn is_resolved(self) -> bool {
        matches!(self, VertexState::Leaf | VertexState::Resolved)
    }
}

struct Vertex<V> {
    label: String,
    state: VertexState,
    /// Operand indices into the owning arena; present iff the vertex is an
    /// operation. Retained after resolution.
    operands: Option<(u32, u32)>,
    value: Option<V>,
}

struct Arena<V> {
    vertices: Vec<Vertex<V>>,
    /// Structural interning table: `(kind, left, right)` of every operation
    /// vertex created so far. Entries whose vertex has resolved are stale and
    /// replaced on the next hit.
    interned: HashMap<(OpKind, u32, u32), u32>,
    auto_labels: u32,
}

impl<V> Arena<V> {
    fn synthesize_label(&self, kind: OpKind, left: u32, right: u32) -> String {
        let side = |index: u32| {
            let label = &self.vertices[index as usize].label;
            if label.chars().count() <= 1 {
                label.clone()
            } else {
                format!("({label})")
            }
        };
        format!("{} {} {}", side(left), kind.symbol(), side(right))
    }
}

/// Shared vertex storage for one graph. `Graph` and every `VertexRef` hold an
/// `Arc` of this, so the arena lives as long as anything can address it.
pub(crate) struct VertexStore<A: Algebra> {
    graph_id: u64,
    arena: RwLock<Arena<A::Value>>,
}

impl<A: Algebra> VertexStore<A> {
    fn new() -> Self {
        Self {
            graph_id: NEXT_GRAPH_ID.fetch_add(1, Ordering::Relaxed),
            arena: RwLock::new(Arena {
                vertices: Vec::new(),
                interned: HashMap::new(),
                auto_labels: 0,
            }),
        }
    }

    fn leaf(&self, value: A::Value, label: Option<String>) -> u32 {
        let mut arena = self.arena.write();
        let label = label.unwrap_or_else(|| {
            let label = format!("N{}", arena.auto_labels);
            arena.auto_labels += 1;
            label
        });
        let index = arena.vertices.len() as u32;
        arena.vertices.push(Vertex {
            label,
            state: VertexState::Leaf,
            operands: None,
            value: Some(value),
        });
        index
    }

    /// Creates or reuses an operation vertex. An interning hit is returned
    /// only while the existing vertex is still pending: once it has resolved
    /// it no longer matches a fresh pending candidate and a new vertex is
    /// created in its place.
    fn op(&self, kind: OpKind, left: u32, right: u32, label: Option<String>) -> u32 {
        let mut arena = self.arena.write();
        let key = (kind, left, right);
        if let Some(&existing) = arena.interned.get(&key) {
            if !arena.vertices[existing as usize].state.is_resolved() {
                return existing;
            }
        }
        let label = label.unwrap_or_else(|| arena.synthesize_label(kind, left, right));
        let state = match kind {
            OpKind::Sum => VertexState::PendingSum,
            OpKind::Prod => VertexState::PendingProd,
        };
        let index = arena.vertices.len() as u32;
        arena.vertices.push(Vertex {
            label,
            state,
            operands: Some((left, right)),
            value: None,
        });
        arena.interned.insert(key, index);
        index
    }

    fn label(&self, index: u32) -> String {
        self.arena.read().vertices[index as usize].label.clone()
    }

    fn state(&self, index: u32) -> VertexState {
        self.arena.read().vertices[index as usize].state
    }

    fn value(&self, index: u32) -> Option<A::Value> {
        self.arena.read().vertices[index as usize].value.clone()
    }

    fn operands(&self, index: u32) -> Option<(u32, u32)> {
        self.arena.read().vertices[index as usize].operands
    }

    fn len(&self) -> usize {
        self.arena.read().vertices.len()
    }

    /// Readiness predicate: a pending operation whose operands are both
    /// resolved with populated value slots.
    fn solvable(&self, index: u32) -> bool {
        let arena = self.arena.read();
        let vertex = &arena.vertices[index as usize];
        if vertex.state.is_resolved() {
            return false;
        }
        match vertex.operands {
            Some((left, right)) => {
                let left = &arena.vertices[left as usize];
                let right = &arena.vertices[right as usize];
                left.state.is_resolved()
                    && right.state.is_resolved()
                    && left.value.is_some()
                    && right.value.is_some()
            }
            None => false,
        }
    }

    /// The operation a worker must perform to resolve this vertex, with the
    /// operand values copied out. `None` when the vertex is already resolved.
    fn operation(&self, index: u32) -> Result<Option<(OpKind, A::Value, A::Value)>> {
        let arena = self.arena.read();
        let vertex = &arena.vertices[index as usize];
        let kind = match vertex.state {
            VertexState::Leaf | VertexState::Resolved => return Ok(None),
            VertexState::PendingSum => OpKind::Sum,
            VertexState::PendingProd => OpKind::Prod,
        };
        let (left, right) = vertex
            .operands
            .ok_or_else(|| EngineError::MissingOperand(vertex.label.clone()))?;
        let operand = |index: u32| {
            let operand = &arena.vertices[index as usize];
            operand
                .value
                .clone()
                .ok_or_else(|| EngineError::MissingOperand(operand.label.clone()))
        };
        Ok(Some((kind, operand(left)?, operand(right)?)))
    }

    /// Stores a computed value and transitions the vertex to `Resolved`, in
    /// one critical section.
    fn resolve(&self, index: u32, value: A::Value) {
        let mut arena = self.arena.write();
        let vertex = &mut arena.vertices[index as usize];
        vertex.value = Some(value);
        vertex.state = VertexState::Resolved;
    }
}

/// A stable handle to one vertex of one graph.
///
/// Handles are cheap to clone and compare by vertex identity. They keep the
/// owning arena alive, so using a handle after its `Graph` was dropped is
/// safe (the vertices live until the last handle goes away).
pub struct VertexRef<A: Algebra> {
    store: Arc<VertexStore<A>>,
    index: u32,
}

impl<A: Algebra> VertexRef<A> {
    fn new(store: Arc<VertexStore<A>>, index: u32) -> Self {
        Self { store, index }
    }

    /// The vertex's display label.
    pub fn label(&self) -> String {
        self.store.label(self.index)
    }

    /// Current lifecycle state.
    pub fn state(&self) -> VertexState {
        self.store.state(self.index)
    }

    /// The current content of the value slot; `None` until the vertex is a
    /// leaf or has been resolved.
    pub fn value(&self) -> Option<A::Value> {
        self.store.value(self.index)
    }

    /// True when the value slot is populated.
    pub fn is_resolved(&self) -> bool {
        self.state().is_resolved()
    }

    /// Operand handles of an operation vertex, `None` for leaves.
    pub fn operands(&self) -> Option<(VertexRef<A>, VertexRef<A>)> {
        self.store.operands(self.index).map(|(left, right)| {
            (
                VertexRef::new(Arc::clone(&self.store), left),
                VertexRef::new(Arc::clone(&self.store), right),
            )
        })
    }

    /// Builds (or reuses) the operation vertex `self <kind> rhs`.
    pub fn op(&self, kind: OpKind, rhs: &VertexRef<A>) -> Result<VertexRef<A>> {
        if self.store.graph_id != rhs.store.graph_id {
            return Err(EngineError::CrossGraph {
                left: self.label(),
                right: rhs.label(),
            });
        }
        let index = self.store.op(kind, self.index, rhs.index, None);
        Ok(VertexRef::new(Arc::clone(&self.store), index))
    }

    /// `self + rhs`.
    pub fn sum(&self, rhs: &VertexRef<A>) -> Result<VertexRef<A>> {
        self.op(OpKind::Sum, rhs)
    }

    /// `self * rhs`.
    pub fn prod(&self, rhs: &VertexRef<A>) -> Result<VertexRef<A>> {
        self.op(OpKind::Prod, rhs)
    }

    pub(crate) fn solvable(&self) -> bool {
        self.store.solvable(self.index)
    }

    pub(crate) fn operation(&self) -> Result<Option<(OpKind, A::Value, A::Value)>> {
        self.store.operation(self.index)
    }

    pub(crate) fn resolve(&self, value: A::Value) {
        self.store.resolve(self.index, value);
    }
}

impl<A: Algebra> Clone for VertexRef<A> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            index: self.index,
        }
    }
}

impl<A: Algebra> PartialEq for VertexRef<A> {
    fn eq(&self, other: &Self) -> bool {
        self.store.graph_id == other.store.graph_id && self.index == other.index
    }
}

impl<A: Algebra> Eq for VertexRef<A> {}

impl<A: Algebra> Hash for VertexRef<A> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.store.graph_id.hash(state);
        self.index.hash(state);
    }
}

impl<A: Algebra> fmt::Debug for VertexRef<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VertexRef")
            .field("graph", &self.store.graph_id)
            .field("index", &self.index)
            .field("label", &self.label())
            .finish()
    }
}

impl<A: Algebra> fmt::Display for VertexRef<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// A collection owning every vertex it creates, bound to one [`Evaluator`].
pub struct Graph<A: Algebra> {
    algebra: A,
    store: Arc<VertexStore<A>>,
    evaluator: Arc<Evaluator<A>>,
}

impl<A: Algebra> Graph<A> {
    /// Creates an empty graph whose vertices will be evaluated by
    /// `evaluator`.
    pub fn new(algebra: A, evaluator: Arc<Evaluator<A>>) -> Self {
        Self {
            algebra,
            store: Arc::new(VertexStore::new()),
            evaluator,
        }
    }

    /// Creates a constant vertex with an auto-assigned label.
    ///
    /// Leaves are never interned: two leaves with equal values are distinct
    /// vertices.
    pub fn leaf(&self, value: A::Value) -> VertexRef<A> {
        let index = self.store.leaf(value, None);
        VertexRef::new(Arc::clone(&self.store), index)
    }

    /// Creates a constant vertex with an explicit label.
    pub fn leaf_named(&self, value: A::Value, label: impl Into<String>) -> VertexRef<A> {
        let index = self.store.leaf(value, Some(label.into()));
        VertexRef::new(Arc::clone(&self.store), index)
    }

    /// Builds (or reuses) an operation vertex over two vertices of this
    /// graph. Fails with [`EngineError::CrossGraph`] when either operand
    /// belongs to another graph.
    pub fn op(&self, kind: OpKind, left: &VertexRef<A>, right: &VertexRef<A>) -> Result<VertexRef<A>> {
        if left.store.graph_id != self.store.graph_id {
            return Err(EngineError::CrossGraph {
                left: left.label(),
                right: right.label(),
            });
        }
        left.op(kind, right)
    }

    /// Like [`Graph::op`] with an explicit label instead of the synthesized
    /// `"(L) op (R)"` form.
    pub fn op_named(
        &self,
        kind: OpKind,
        left: &VertexRef<A>,
        right: &VertexRef<A>,
        label: impl Into<String>,
    ) -> Result<VertexRef<A>> {
        if left.store.graph_id != self.store.graph_id || right.store.graph_id != self.store.graph_id
        {
            return Err(EngineError::CrossGraph {
                left: left.label(),
                right: right.label(),
            });
        }
        let index = self
            .store
            .op(kind, left.index, right.index, Some(label.into()));
        Ok(VertexRef::new(Arc::clone(&self.store), index))
    }

    /// Compare-and-swap sugar: `condition * on_true + (condition + 1) * on_false`.
    ///
    /// Meaningful for algebras where `+` is XOR and `*` is AND, i.e. GF(2)
    /// and anything embedding it; `condition + 1` is then the logical NOT.
    /// Pure construction over the ordinary operation API, so the shared
    /// subterms are interned like any others.
    pub fn cas(
        &self,
        condition: &VertexRef<A>,
        on_true: &VertexRef<A>,
        on_false: &VertexRef<A>,
    ) -> Result<VertexRef<A>>
    where
        A: BinaryAlgebra,
    {
        let one = self.leaf_named(self.algebra.one(), "1");
        let picked = condition.prod(on_true)?;
        let negated = condition.sum(&one)?;
        let fallback = negated.prod(on_false)?;
        picked.sum(&fallback)
    }

    /// Marks every vertex of the graph as requested on the bound evaluator.
    pub fn eval_all(&self) {
        for index in 0..self.store.len() as u32 {
            self.evaluator
                .request(&VertexRef::new(Arc::clone(&self.store), index));
        }
    }

    /// The evaluator this graph is bound to.
    pub fn evaluator(&self) -> &Arc<Evaluator<A>> {
        &self.evaluator
    }

    /// The algebra instance values of this graph are built from.
    pub fn algebra(&self) -> &A {
        &self.algebra
    }

    /// Number of vertices owned by this graph.
    pub fn len(&self) -> usize {
        self.store.len()
    }

    /// True when the graph owns no vertices.
    pub fn is_empty(&self) -> bool {
        self.store.len() == 0
    }
}
