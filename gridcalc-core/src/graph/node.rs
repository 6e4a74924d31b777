//! Graph Nodes
//!
//! This module defines the node types that live in the dependency graph.
//! A node is either a cell or a workbook variable; its dependency set holds
//! the identities of every other node whose value it reads.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexSet;

/// Unique identifier for a node in the dependency graph.
///
/// Cells and variables live in separate variants, so a variable can never be
/// mistaken for a cell whatever its name looks like.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeId {
    /// A cell, identified by sheet and 1-based coordinates.
    Cell { sheet: Arc<str>, row: u32, col: u32 },

    /// A workbook variable, identified by its (workbook-unique) name.
    Variable(Arc<str>),
}

impl NodeId {
    /// Identity of the cell at `(sheet, row, col)`.
    pub fn cell(sheet: impl Into<Arc<str>>, row: u32, col: u32) -> Self {
        Self::Cell {
            sheet: sheet.into(),
            row,
            col,
        }
    }

    /// Identity of the variable called `name`.
    pub fn variable(name: impl Into<Arc<str>>) -> Self {
        Self::Variable(name.into())
    }

    /// What kind of unit this node schedules.
    pub fn kind(&self) -> NodeKind {
        match self {
            Self::Cell { .. } => NodeKind::Cell,
            Self::Variable(_) => NodeKind::Variable,
        }
    }

    pub fn is_cell(&self) -> bool {
        self.kind() == NodeKind::Cell
    }

    pub fn is_variable(&self) -> bool {
        self.kind() == NodeKind::Variable
    }
}

/// Canonical string form: `sheet:row:col` for cells, the bare name for
/// variables. `:` cannot appear in a sheet name.
impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cell { sheet, row, col } => write!(f, "{sheet}:{row}:{col}"),
            Self::Variable(name) => f.write_str(name),
        }
    }
}

/// The kind of node in the dependency graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// A cell holding a constant or a formula.
    Cell,

    /// A named variable, optionally defined by a formula.
    Variable,
}

/// A node in the dependency graph.
///
/// The dependency set is a snapshot taken when the graph is built. Nothing
/// downstream mutates it; the scheduler works on its own copy of the counts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyNode {
    /// Unique identifier for this node.
    id: NodeId,

    /// Nodes that this node reads from, in the order they were first seen.
    dependencies: IndexSet<NodeId>,
}

impl DependencyNode {
    /// Create a node with no dependencies.
    pub fn new(id: NodeId) -> Self {
        Self {
            id,
            dependencies: IndexSet::new(),
        }
    }

    /// Create a node reading from `dependencies`. Duplicates collapse.
    pub fn with_dependencies(id: NodeId, dependencies: impl IntoIterator<Item = NodeId>) -> Self {
        Self {
            id,
            dependencies: dependencies.into_iter().collect(),
        }
    }

    /// Get the node's ID.
    pub fn id(&self) -> &NodeId {
        &self.id
    }

    /// Get all dependencies.
    pub fn dependencies(&self) -> &IndexSet<NodeId> {
        &self.dependencies
    }

    /// Check if the node reads from nothing.
    pub fn is_leaf(&self) -> bool {
        self.dependencies.is_empty()
    }

    /// Check if the node reads from `id`.
    pub fn depends_on(&self, id: &NodeId) -> bool {
        self.dependencies.contains(id)
    }
}
