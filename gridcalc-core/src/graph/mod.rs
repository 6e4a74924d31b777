//! Dependency Graph
//!
//! This module builds the dependency graph of a workbook and orders it for
//! evaluation.
//!
//! # Overview
//!
//! The graph is a directed graph where:
//!
//! - Nodes represent cells and workbook variables
//! - Edges represent reads: if A's formula references B, then A depends on B
//!
//! [`GraphBuilder`] turns a snapshot into nodes, using a reference extractor
//! and a [`SparseColumnIndex`] to keep large ranges affordable. The scheduler
//! then splits the nodes into an ordered part and a residual part holding
//! every node on, or downstream of, a cycle.
//!
//! # Design Decisions
//!
//! 1. Node identities are an enum, so cell and variable keys cannot collide.
//!
//! 2. Dependency sets are immutable once built. Sorting works on private
//!    counters.
//!
//! 3. The reverse (dependents) edges only exist inside the scheduler.

mod builder;
mod node;
mod normalize;
mod scheduler;
mod sparse;

pub use builder::{BuildStats, DependencyGraph, GraphBuilder, WorkbookVariables};
pub use node::{DependencyNode, NodeId, NodeKind};
pub use normalize::normalize_references;
pub use scheduler::{topologically_sort, Schedule};
pub use sparse::SparseColumnIndex;
