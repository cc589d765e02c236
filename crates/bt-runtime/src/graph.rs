//! Constraint-based scheduler for the actions under one flow node.
//!
//! Nodes live in an arena; order relations and Allen-relation temporal constraints are
//! index pairs. Every tick, [`ActionGraph::executable_nodes`] advances the graph clock and
//! returns the nodes that may start.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::error::GraphError;
use crate::node::Node;
use crate::status::NodeStatus;

/// Tolerance for matching an end time against a start time under [`AllenRelation::Meets`].
pub const MEETS_EPSILON: f32 = 0.001;

static NEXT_GRAPH_ID: AtomicU32 = AtomicU32::new(1);

/// Handle to a node inside one particular [`ActionGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId {
    graph: u32,
    index: u32,
}

impl NodeId {
    pub fn index(self) -> usize {
        self.index as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.graph, self.index)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum AllenRelation {
    Precedes,
    Meets,
    Overlaps,
    Starts,
    Finishes,
    Contains,
    Equals,
}

/// Per-node scheduling state. Times are graph-clock seconds.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Bookkeeping {
    pub executing: bool,
    pub completed: bool,
    pub start_time: Option<f32>,
    pub end_time: Option<f32>,
}

impl Bookkeeping {
    fn start(&self) -> f32 {
        self.start_time.unwrap_or(0.0)
    }

    fn end(&self) -> f32 {
        self.end_time.unwrap_or(0.0)
    }
}

struct Slot {
    node: Node,
    successors: Vec<usize>,
    predecessors: Vec<usize>,
    book: Bookkeeping,
}

pub struct ActionGraph {
    id: u32,
    slots: Vec<Slot>,
    temporal: BTreeMap<(usize, usize), AllenRelation>,
    elapsed: f32,
}

impl Default for ActionGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ActionGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionGraph")
            .field("id", &self.id)
            .field("nodes", &self.slots.len())
            .field("temporal", &self.temporal)
            .field("elapsed", &self.elapsed)
            .finish()
    }
}

impl ActionGraph {
    pub fn new() -> Self {
        Self {
            id: NEXT_GRAPH_ID.fetch_add(1, Ordering::Relaxed),
            slots: Vec::new(),
            temporal: BTreeMap::new(),
            elapsed: 0.0,
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.slots.len()).map(|i| self.id_at(i))
    }

    fn id_at(&self, index: usize) -> NodeId {
        NodeId {
            graph: self.id,
            index: index as u32,
        }
    }

    fn index_of(&self, id: NodeId) -> Result<usize, GraphError> {
        if id.graph == self.id && id.index() < self.slots.len() {
            Ok(id.index())
        } else {
            Err(GraphError::UnknownNode(id))
        }
    }

    pub fn add_node(&mut self, node: Node) -> Result<NodeId, GraphError> {
        if !node.is_action() {
            tracing::warn!(node = node.name(), "Rejected non-action node in action graph");
            return Err(GraphError::NotAnAction(node.name().to_string()));
        }
        let id = self.id_at(self.slots.len());
        self.slots.push(Slot {
            node,
            successors: Vec::new(),
            predecessors: Vec::new(),
            book: Bookkeeping::default(),
        });
        Ok(id)
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        let index = self.index_of(id).ok()?;
        Some(&self.slots[index].node)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        let index = self.index_of(id).ok()?;
        Some(&mut self.slots[index].node)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.slots.iter().map(|s| &s.node)
    }

    pub(crate) fn nodes_mut(&mut self) -> impl Iterator<Item = &mut Node> {
        self.slots.iter_mut().map(|s| &mut s.node)
    }

    /// Looks a node up by debug name.
    pub fn find(&self, name: &str) -> Option<NodeId> {
        self.slots
            .iter()
            .position(|s| s.node.name() == name)
            .map(|i| self.id_at(i))
    }

    pub fn bookkeeping(&self, id: NodeId) -> Option<Bookkeeping> {
        let index = self.index_of(id).ok()?;
        Some(self.slots[index].book)
    }

    pub fn predecessors(&self, id: NodeId) -> Vec<NodeId> {
        self.index_of(id)
            .map(|i| self.slots[i].predecessors.iter().map(|&p| self.id_at(p)).collect())
            .unwrap_or_default()
    }

    pub fn successors(&self, id: NodeId) -> Vec<NodeId> {
        self.index_of(id)
            .map(|i| self.slots[i].successors.iter().map(|&s| self.id_at(s)).collect())
            .unwrap_or_default()
    }

    pub fn temporal_constraint(&self, from: NodeId, to: NodeId) -> Option<AllenRelation> {
        let from = self.index_of(from).ok()?;
        let to = self.index_of(to).ok()?;
        self.temporal.get(&(from, to)).copied()
    }

    fn edge_endpoints(&self, from: NodeId, to: NodeId) -> Result<(usize, usize), GraphError> {
        let endpoints = self
            .index_of(from)
            .and_then(|f| Ok((f, self.index_of(to)?)))
            .and_then(|(f, t)| {
                if f == t {
                    Err(GraphError::SelfEdge(from))
                } else {
                    Ok((f, t))
                }
            });
        if let Err(err) = &endpoints {
            tracing::warn!(from = %from, to = %to, error = %err, "Ignoring edge");
        }
        endpoints
    }

    /// `to` may not start before `from` has completed. The graph is left untouched on error.
    pub fn add_order_relation(&mut self, from: NodeId, to: NodeId) -> Result<(), GraphError> {
        let (f, t) = self.edge_endpoints(from, to)?;
        if !self.slots[f].successors.contains(&t) {
            self.slots[f].successors.push(t);
            self.slots[t].predecessors.push(f);
        }
        Ok(())
    }

    /// Constrains `to` relative to `from`; a later constraint on the same pair replaces the
    /// earlier one. Only consulted for nodes that also have order predecessors.
    pub fn add_temporal_constraint(
        &mut self,
        from: NodeId,
        to: NodeId,
        relation: AllenRelation,
    ) -> Result<(), GraphError> {
        let (f, t) = self.edge_endpoints(from, to)?;
        self.temporal.insert((f, t), relation);
        Ok(())
    }

    /// Advances the graph clock by `dt` and returns the nodes that may start this tick,
    /// marking each one executing.
    pub fn executable_nodes(&mut self, dt: f32) -> Vec<NodeId> {
        self.elapsed += dt;
        let now = self.elapsed;

        let mut ready = Vec::new();
        for index in 0..self.slots.len() {
            if !self.can_execute(index) {
                continue;
            }
            let book = &mut self.slots[index].book;
            book.executing = true;
            if book.start_time.is_none() {
                book.start_time = Some(now);
            }
            tracing::debug!(node = self.slots[index].node.name(), at = now, "Node executable");
            ready.push(self.id_at(index));
        }
        ready
    }

    /// Nodes started on an earlier tick that have not completed yet.
    pub fn in_flight(&self) -> Vec<NodeId> {
        (0..self.slots.len())
            .filter(|&i| self.slots[i].book.executing && !self.slots[i].book.completed)
            .map(|i| self.id_at(i))
            .collect()
    }

    fn can_execute(&self, index: usize) -> bool {
        let slot = &self.slots[index];
        if slot.book.completed || slot.book.executing {
            return false;
        }
        if slot.predecessors.is_empty() {
            return true;
        }
        if !slot
            .predecessors
            .iter()
            .all(|&p| self.slots[p].book.completed)
        {
            return false;
        }
        self.temporal
            .iter()
            .filter(|((_, to), _)| *to == index)
            .all(|(&(from, to), &relation)| self.temporal_satisfied(from, to, relation))
    }

    fn temporal_satisfied(&self, from: usize, to: usize, relation: AllenRelation) -> bool {
        let source = &self.slots[from].book;
        let target = &self.slots[to].book;
        match relation {
            AllenRelation::Precedes => source.completed && !target.executing,
            AllenRelation::Meets => {
                source.completed
                    && match target.start_time {
                        None => true,
                        Some(start) => (source.end() - start).abs() < MEETS_EPSILON,
                    }
            }
            AllenRelation::Overlaps => {
                // Running nodes have open-ended windows.
                let source_end = source.end_time.unwrap_or(f32::INFINITY);
                let target_end = target.end_time.unwrap_or(f32::INFINITY);
                source.executing
                    && target.executing
                    && source.start() < target_end
                    && target.start() < source_end
            }
            AllenRelation::Starts => source.start_time == target.start_time,
            AllenRelation::Finishes => source.end_time == target.end_time,
            AllenRelation::Contains => {
                source.start() <= target.start() && source.end() >= target.end()
            }
            AllenRelation::Equals => {
                source.start_time == target.start_time && source.end_time == target.end_time
            }
        }
    }

    pub fn mark_completed(&mut self, id: NodeId) -> Result<(), GraphError> {
        let index = self.index_of(id)?;
        let now = self.elapsed;
        let book = &mut self.slots[index].book;
        book.completed = true;
        book.executing = false;
        book.end_time = Some(now);
        Ok(())
    }

    /// Clears all scheduling state and the clock. Nodes and edges are kept.
    pub fn reset(&mut self) {
        self.elapsed = 0.0;
        for slot in self.slots.iter_mut() {
            slot.book = Bookkeeping::default();
        }
    }

    pub fn all_finished(&self) -> bool {
        self.slots.iter().all(|s| s.node.has_finished())
    }

    /// `(succeeded, total)` over the node statuses.
    pub fn outcome(&self) -> (usize, usize) {
        let succeeded = self
            .slots
            .iter()
            .filter(|s| s.node.status() == NodeStatus::Succeeded)
            .count();
        (succeeded, self.slots.len())
    }

    /// Topological order over order relations. Nodes on a cycle are still listed once; use
    /// [`ActionGraph::has_cycle`] to detect that case.
    pub fn execution_order(&self) -> Vec<NodeId> {
        let mut visited = vec![false; self.slots.len()];
        let mut order = Vec::with_capacity(self.slots.len());
        for index in 0..self.slots.len() {
            if !visited[index] {
                self.visit(index, &mut visited, &mut order);
            }
        }
        order.reverse();
        order.into_iter().map(|i| self.id_at(i)).collect()
    }

    fn visit(&self, index: usize, visited: &mut [bool], order: &mut Vec<usize>) {
        visited[index] = true;
        for &next in &self.slots[index].successors {
            if !visited[next] {
                self.visit(next, visited, order);
            }
        }
        order.push(index);
    }

    pub fn has_cycle(&self) -> bool {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            New,
            Active,
            Done,
        }

        fn walk(slots: &[Slot], index: usize, marks: &mut [Mark]) -> bool {
            marks[index] = Mark::Active;
            for &next in &slots[index].successors {
                let mark = marks[next];
                match mark {
                    Mark::Active => return true,
                    Mark::New if walk(slots, next, marks) => return true,
                    _ => {}
                }
            }
            marks[index] = Mark::Done;
            false
        }

        let mut marks = vec![Mark::New; self.slots.len()];
        (0..self.slots.len()).any(|i| marks[i] == Mark::New && walk(&self.slots, i, &mut marks))
    }
}
