//! Topological Scheduler
//!
//! The scheduler determines the order in which nodes should be evaluated.
//! It ensures that dependencies are always evaluated before their dependents,
//! and sets aside every node that cannot be ordered because of a cycle.
//!
//! # Algorithm
//!
//! We use Kahn's algorithm over a private arena:
//!
//! 1. Index every node by ID and copy its dependency count into a working
//!    counter. The nodes themselves are never touched.
//! 2. Build the reverse mapping `dependency -> dependents` once.
//! 3. Seed a FIFO queue with every node that has no dependencies, in input
//!    order.
//! 4. Pop a node, append it to the ordered output, and decrement each of its
//!    dependents; a dependent whose counter reaches zero joins the queue.
//! 5. When the queue is empty, every node with a non-zero counter is residual:
//!    it sits on a cycle or depends, directly or not, on one.
//!
//! Cycles are not errors. They are reported through [`Schedule::residual`] so
//! the driver can iterate them.

use std::collections::{HashMap, VecDeque};

use smallvec::SmallVec;
use tracing::{debug, warn};

use super::node::{DependencyNode, NodeId};

/// The outcome of sorting a node set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schedule {
    /// Nodes in a safe evaluation order.
    ordered: Vec<DependencyNode>,

    /// Nodes that could not be ordered, in their original input order.
    residual: Vec<DependencyNode>,
}

impl Schedule {
    /// Nodes that are safe to evaluate in listed order.
    pub fn ordered(&self) -> &[DependencyNode] {
        &self.ordered
    }

    /// Nodes on, or downstream of, a cycle.
    pub fn residual(&self) -> &[DependencyNode] {
        &self.residual
    }

    /// Check if every node could be ordered.
    pub fn is_acyclic(&self) -> bool {
        self.residual.is_empty()
    }

    /// Total number of scheduled nodes.
    pub fn len(&self) -> usize {
        self.ordered.len() + self.residual.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Perform a topological sort of the given nodes.
///
/// Returns nodes in order such that dependencies come before dependents, plus
/// the residual nodes that no order exists for. A dependency naming a node
/// that is not in `nodes` can never be satisfied, so its dependent ends up
/// residual. Duplicate IDs keep their first occurrence.
pub fn topologically_sort(nodes: Vec<DependencyNode>) -> Schedule {
    let mut index: HashMap<NodeId, usize> = HashMap::with_capacity(nodes.len());
    let mut arena: Vec<Option<DependencyNode>> = Vec::with_capacity(nodes.len());

    for node in nodes {
        if index.contains_key(node.id()) {
            warn!(node = %node.id(), "duplicate node ignored by scheduler");
            continue;
        }
        index.insert(node.id().clone(), arena.len());
        arena.push(Some(node));
    }

    let count = arena.len();
    let mut remaining = Vec::with_capacity(count);
    let mut dependents: Vec<SmallVec<[usize; 4]>> = vec![SmallVec::new(); count];

    for (i, node) in arena.iter().flatten().enumerate() {
        remaining.push(node.dependencies().len());
        for dependency in node.dependencies() {
            if let Some(&d) = index.get(dependency) {
                dependents[d].push(i);
            }
        }
    }

    // Kahn's algorithm
    let mut queue: VecDeque<usize> = (0..count).filter(|&i| remaining[i] == 0).collect();
    let mut order = Vec::with_capacity(count);

    while let Some(i) = queue.pop_front() {
        order.push(i);

        for &dependent in &dependents[i] {
            remaining[dependent] -= 1;
            if remaining[dependent] == 0 {
                queue.push_back(dependent);
            }
        }
    }

    let ordered: Vec<DependencyNode> = order.iter().filter_map(|&i| arena[i].take()).collect();
    let residual: Vec<DependencyNode> = arena.into_iter().flatten().collect();

    if !residual.is_empty() {
        debug!(
            ordered = ordered.len(),
            residual = residual.len(),
            "circular references isolated"
        );
    }

    Schedule { ordered, residual }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell(row: u32) -> NodeId {
        NodeId::cell("S", row, 1)
    }

    fn node(row: u32, deps: &[u32]) -> DependencyNode {
        DependencyNode::with_dependencies(cell(row), deps.iter().map(|&d| cell(d)))
    }

    fn ids(nodes: &[DependencyNode]) -> Vec<NodeId> {
        nodes.iter().map(|n| n.id().clone()).collect()
    }

    fn position(nodes: &[DependencyNode], id: &NodeId) -> usize {
        nodes.iter().position(|n| n.id() == id).unwrap()
    }

    /// Every ordered node comes after each of its ordered dependencies.
    fn assert_respects_dependencies(schedule: &Schedule) {
        let ordered = schedule.ordered();
        for (i, node) in ordered.iter().enumerate() {
            for dep in node.dependencies() {
                if let Some(j) = ordered.iter().position(|n| n.id() == dep) {
                    assert!(j < i, "{} placed before its dependency {}", node.id(), dep);
                }
            }
        }
    }

    #[test]
    fn chain_is_ordered_dependencies_first() {
        // Input order deliberately reversed: 3 -> 2 -> 1.
        let schedule = topologically_sort(vec![node(3, &[2]), node(2, &[1]), node(1, &[])]);
        assert!(schedule.is_acyclic());
        assert_eq!(ids(schedule.ordered()), vec![cell(1), cell(2), cell(3)]);
    }

    #[test]
    fn equally_ready_nodes_keep_input_order() {
        let schedule = topologically_sort(vec![node(5, &[]), node(4, &[5]), node(3, &[]), node(2, &[3])]);
        assert_eq!(ids(schedule.ordered()), vec![cell(5), cell(3), cell(4), cell(2)]);
    }

    #[test]
    fn diamond() {
        let schedule = topologically_sort(vec![
            node(4, &[2, 3]),
            node(2, &[1]),
            node(3, &[1]),
            node(1, &[]),
        ]);
        assert!(schedule.is_acyclic());
        assert_eq!(schedule.len(), 4);
        assert_respects_dependencies(&schedule);
        assert_eq!(schedule.ordered().last().unwrap().id(), &cell(4));
    }

    #[test]
    fn generated_dags_are_fully_ordered() {
        // Deterministic pseudo-random DAGs: node i only reads nodes > i, and
        // the input is shuffled so order has to come from the sort.
        let mut seed: u64 = 0x5eed;
        let mut next = || {
            seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            (seed >> 33) as u32
        };

        for _ in 0..20 {
            let count = 40;
            let mut nodes: Vec<_> = (1..=count)
                .map(|i| {
                    let deps: Vec<u32> = (i + 1..=count).filter(|_| next() % 7 == 0).collect();
                    node(i, &deps)
                })
                .collect();
            for i in (1..nodes.len()).rev() {
                let j = next() as usize % (i + 1);
                nodes.swap(i, j);
            }

            let schedule = topologically_sort(nodes);
            assert!(schedule.is_acyclic());
            assert_eq!(schedule.ordered().len(), count as usize);
            assert_respects_dependencies(&schedule);
        }
    }

    #[test]
    fn cycle_members_and_their_dependents_are_residual() {
        let schedule = topologically_sort(vec![
            node(1, &[]),
            node(2, &[1, 3]), // on the cycle 2 <-> 3
            node(3, &[2]),
            node(4, &[3]), // downstream of the cycle
            node(5, &[1]), // independent
        ]);

        assert!(!schedule.is_acyclic());
        assert_eq!(ids(schedule.ordered()), vec![cell(1), cell(5)]);
        assert_eq!(ids(schedule.residual()), vec![cell(2), cell(3), cell(4)]);
    }

    #[test]
    fn residual_keeps_input_order() {
        let schedule = topologically_sort(vec![node(9, &[8]), node(1, &[]), node(8, &[9])]);
        assert_eq!(ids(schedule.residual()), vec![cell(9), cell(8)]);
    }

    #[test]
    fn self_reference_is_a_one_node_cycle() {
        let schedule = topologically_sort(vec![node(1, &[1]), node(2, &[])]);
        assert_eq!(ids(schedule.ordered()), vec![cell(2)]);
        assert_eq!(ids(schedule.residual()), vec![cell(1)]);
    }

    #[test]
    fn unknown_dependency_is_never_satisfied() {
        let schedule = topologically_sort(vec![node(1, &[99]), node(2, &[])]);
        assert_eq!(ids(schedule.residual()), vec![cell(1)]);
    }

    #[test]
    fn dependency_sets_are_returned_untouched() {
        let input = vec![node(1, &[2]), node(2, &[1]), node(3, &[])];
        let schedule = topologically_sort(input.clone());

        for original in &input {
            let returned = schedule
                .ordered()
                .iter()
                .chain(schedule.residual())
                .find(|n| n.id() == original.id())
                .unwrap();
            assert_eq!(returned, original);
        }
    }

    #[test]
    fn duplicate_ids_keep_first_occurrence() {
        let schedule = topologically_sort(vec![node(1, &[]), node(2, &[1]), node(1, &[2])]);
        assert!(schedule.is_acyclic());
        assert_eq!(schedule.len(), 2);
        assert!(schedule.ordered()[0].is_leaf());
        assert!(position(schedule.ordered(), &cell(1)) < position(schedule.ordered(), &cell(2)));
    }

    #[test]
    fn empty_input() {
        let schedule = topologically_sort(Vec::new());
        assert!(schedule.is_empty());
        assert!(schedule.is_acyclic());
    }
}
