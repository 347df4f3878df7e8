//! The program dependency graph: the unit of protocol selection.
//!
//! Every storage location, computation, and conditional in the source
//! program becomes a node. Edges record data dependencies (reads and
//! writes), control dependencies, and the implicit channel from a
//! conditional to the storage it may write.

pub mod builder;
pub mod dataflow;

use crate::language::{DowngradeKind, Expression};
use petgraph::graph::{EdgeIndex, Graph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use std::collections::BTreeSet;
use std::fmt;
use weir_types::{Label, Location, Variable};

pub use builder::PdgBuilder;
pub use dataflow::{solve_labels, LabelSolution};

/// Which way execution leaves a node along a control edge.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BranchPath {
    /// Fall-through to the next statement.
    Seq,
    Then,
    Else,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PdgNodeKind {
    /// A declared variable: a location a protocol must host.
    Storage { var: Variable, label: Label },
    /// A computation producing a value. A computation whose expression is
    /// a top-level downgrade relabels its result; assertions produce no
    /// value.
    Compute {
        expr: Expression,
        target: Option<Variable>,
        assertion: bool,
    },
    /// A conditional; its guard is a separate compute node read through
    /// the node's single read edge.
    Control,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PdgNode {
    pub kind: PdgNodeKind,
    pub location: Location,
}

impl PdgNode {
    pub fn is_storage(&self) -> bool {
        matches!(self.kind, PdgNodeKind::Storage { .. })
    }

    pub fn is_control(&self) -> bool {
        matches!(self.kind, PdgNodeKind::Control)
    }

    pub fn is_downgrade(&self) -> bool {
        self.downgrade().is_some()
    }

    /// For downgrade computations, the direction and the label the result
    /// is relabeled to.
    pub fn downgrade(&self) -> Option<(DowngradeKind, &Label)> {
        match &self.kind {
            PdgNodeKind::Compute {
                expr: Expression::Downgrade { kind, to, .. },
                ..
            } => Some((*kind, to)),
            _ => None,
        }
    }

    /// The name instantiation derives fresh result variables from.
    pub fn result_base(&self) -> &str {
        match &self.kind {
            PdgNodeKind::Storage { var, .. } => var.as_str(),
            PdgNodeKind::Compute {
                target: Some(var), ..
            } => var.as_str(),
            PdgNodeKind::Compute { .. } => "tmp",
            PdgNodeKind::Control => "guard",
        }
    }
}

impl fmt::Display for PdgNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            PdgNodeKind::Storage { var, label } => write!(f, "storage {var} @ {label}"),
            PdgNodeKind::Compute {
                expr,
                assertion: true,
                ..
            } => write!(f, "assert {expr}"),
            PdgNodeKind::Compute { expr, .. } => write!(f, "compute {expr}"),
            PdgNodeKind::Control => f.write_str("control"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PdgEdge {
    /// A data dependency; `binding` is the variable the consumer's
    /// expression reads the produced value through.
    Read { binding: Variable },
    /// A computed value stored into a storage node.
    Write,
    /// Execution order and branch structure.
    Control(BranchPath),
    /// The implicit flow from a conditional into storage written under
    /// it or transitively read by its branches.
    ReadChannel,
}

impl PdgEdge {
    pub fn is_information(&self) -> bool {
        !matches!(self, PdgEdge::Control(_))
    }
}

/// The dependency graph of a whole program.
#[derive(Clone, Debug, Default)]
pub struct Pdg {
    pub(crate) graph: Graph<PdgNode, PdgEdge>,
    pub(crate) entry: Option<NodeIndex>,
}

impl Pdg {
    pub fn node(&self, index: NodeIndex) -> &PdgNode {
        &self.graph[index]
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn node_indices(&self) -> impl Iterator<Item = NodeIndex> + '_ {
        self.graph.node_indices()
    }

    pub fn entry(&self) -> Option<NodeIndex> {
        self.entry
    }

    /// The storage node declaring `var`, if any. With shadowing the first
    /// declaration in program order wins.
    pub fn storage_for(&self, var: &Variable) -> Option<NodeIndex> {
        self.ordered_nodes().into_iter().find(|&n| {
            matches!(&self.graph[n].kind, PdgNodeKind::Storage { var: v, .. } if v == var)
        })
    }

    /// Incoming read dependencies in the order the builder created them.
    pub fn read_sources(&self, node: NodeIndex) -> Vec<(NodeIndex, &Variable)> {
        let mut edges: Vec<(EdgeIndex, NodeIndex, &Variable)> = self
            .graph
            .edges_directed(node, Direction::Incoming)
            .filter_map(|edge| match edge.weight() {
                PdgEdge::Read { binding } => {
                    Some((edge.id(), edge.source(), binding))
                }
                _ => None,
            })
            .collect();
        edges.sort_by_key(|(id, _, _)| *id);
        edges.into_iter().map(|(_, src, binding)| (src, binding)).collect()
    }

    /// Storage nodes this node writes to.
    pub fn write_targets(&self, node: NodeIndex) -> Vec<NodeIndex> {
        let mut edges: Vec<(EdgeIndex, NodeIndex)> = self
            .graph
            .edges_directed(node, Direction::Outgoing)
            .filter_map(|edge| match edge.weight() {
                PdgEdge::Write => Some((edge.id(), edge.target())),
                _ => None,
            })
            .collect();
        edges.sort_by_key(|(id, _)| *id);
        edges.into_iter().map(|(_, target)| target).collect()
    }

    /// Storage nodes a conditional touches under either branch, by
    /// writing them or by reading them into branch computations.
    pub fn channel_targets(&self, node: NodeIndex) -> Vec<NodeIndex> {
        let mut edges: Vec<(EdgeIndex, NodeIndex)> = self
            .graph
            .edges_directed(node, Direction::Outgoing)
            .filter_map(|edge| match edge.weight() {
                PdgEdge::ReadChannel => Some((edge.id(), edge.target())),
                _ => None,
            })
            .collect();
        edges.sort_by_key(|(id, _)| *id);
        edges.into_iter().map(|(_, target)| target).collect()
    }

    /// Sources of incoming information edges (everything but control).
    pub fn information_sources(&self, node: NodeIndex) -> Vec<NodeIndex> {
        let mut edges: Vec<(EdgeIndex, NodeIndex)> = self
            .graph
            .edges_directed(node, Direction::Incoming)
            .filter(|edge| edge.weight().is_information())
            .map(|edge| (edge.id(), edge.source()))
            .collect();
        edges.sort_by_key(|(id, _)| *id);
        edges.into_iter().map(|(_, source)| source).collect()
    }

    /// Targets of outgoing information edges.
    pub fn information_targets(&self, node: NodeIndex) -> Vec<NodeIndex> {
        let mut edges: Vec<(EdgeIndex, NodeIndex)> = self
            .graph
            .edges_directed(node, Direction::Outgoing)
            .filter(|edge| edge.weight().is_information())
            .map(|edge| (edge.id(), edge.target()))
            .collect();
        edges.sort_by_key(|(id, _)| *id);
        edges.into_iter().map(|(_, target)| target).collect()
    }

    /// The storage nodes a node's value transitively derives from,
    /// following information edges backward through intermediate
    /// computations and stopping at storage.
    pub fn storage_inputs(&self, node: NodeIndex) -> BTreeSet<NodeIndex> {
        let mut inputs = BTreeSet::new();
        let mut stack = self.information_sources(node);
        let mut seen: BTreeSet<NodeIndex> = stack.iter().copied().collect();
        while let Some(source) = stack.pop() {
            if self.graph[source].is_storage() {
                inputs.insert(source);
                continue;
            }
            for upstream in self.information_sources(source) {
                if seen.insert(upstream) {
                    stack.push(upstream);
                }
            }
        }
        inputs
    }

    fn control_successor(&self, node: NodeIndex, path: BranchPath) -> Option<NodeIndex> {
        self.graph
            .edges_directed(node, Direction::Outgoing)
            .find_map(|edge| match edge.weight() {
                PdgEdge::Control(p) if *p == path => Some(edge.target()),
                _ => None,
            })
    }

    pub fn seq_successor(&self, node: NodeIndex) -> Option<NodeIndex> {
        self.control_successor(node, BranchPath::Seq)
    }

    pub fn branch_entry(&self, node: NodeIndex, path: BranchPath) -> Option<NodeIndex> {
        debug_assert!(path != BranchPath::Seq);
        self.control_successor(node, path)
    }

    /// Every node within a branch of a conditional, in execution order,
    /// including the nodes of nested conditionals.
    pub fn branch_nodes(&self, node: NodeIndex, path: BranchPath) -> Vec<NodeIndex> {
        let mut nodes = Vec::new();
        if let Some(entry) = self.branch_entry(node, path) {
            self.walk(entry, &mut nodes);
        }
        nodes
    }

    /// All nodes in execution order: a conditional is followed by its
    /// then-branch, its else-branch, and then its continuation. Protocol
    /// selection visits nodes in this order, which guarantees that a
    /// node's dependencies are assigned before the node itself.
    pub fn ordered_nodes(&self) -> Vec<NodeIndex> {
        let mut nodes = Vec::new();
        if let Some(entry) = self.entry {
            self.walk(entry, &mut nodes);
        }
        nodes
    }

    fn walk(&self, entry: NodeIndex, out: &mut Vec<NodeIndex>) {
        let mut current = Some(entry);
        while let Some(node) = current {
            out.push(node);
            if self.graph[node].is_control() {
                if let Some(then_entry) = self.branch_entry(node, BranchPath::Then) {
                    self.walk(then_entry, out);
                }
                if let Some(else_entry) = self.branch_entry(node, BranchPath::Else) {
                    self.walk(else_entry, out);
                }
            }
            current = self.seq_successor(node);
        }
    }
}
