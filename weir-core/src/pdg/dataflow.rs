//! Forward label inference over the dependency graph.
//!
//! Labels propagate along information edges only; control edges order
//! execution but carry no data. Implicit flows are still accounted for:
//! the channel edge from a conditional to the storage its branches write
//! or read joins the guard's label into that storage. The transfer
//! function is monotone
//! and the label lattice generated by the declared principals is finite,
//! so the worklist terminates at the least fixpoint.

use crate::language::DowngradeKind;
use crate::pdg::{Pdg, PdgNodeKind};
use petgraph::graph::NodeIndex;
use rustc_hash::FxHashSet;
use std::collections::VecDeque;
use tracing::debug;
use weir_error::{CompileError, CompileResult};
use weir_types::{Label, Lattice};

/// The inferred label of every node, indexed by graph position.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LabelSolution {
    labels: Vec<Label>,
}

impl LabelSolution {
    pub fn label(&self, node: NodeIndex) -> &Label {
        &self.labels[node.index()]
    }
}

fn initial_label(pdg: &Pdg, node: NodeIndex) -> Label {
    let node = pdg.node(node);
    if let Some((_, to)) = node.downgrade() {
        return to.clone();
    }
    match &node.kind {
        PdgNodeKind::Storage { label, .. } => label.clone(),
        _ => Label::bottom(),
    }
}

fn input_label(pdg: &Pdg, labels: &[Label], node: NodeIndex) -> Label {
    pdg.information_sources(node)
        .into_iter()
        .fold(Label::bottom(), |acc, source| {
            acc.join(&labels[source.index()])
        })
}

fn transfer(pdg: &Pdg, node: NodeIndex, input: Label) -> Label {
    let weight = pdg.node(node);
    // Downgrades pin their output to the declared target label.
    if let Some((_, to)) = weight.downgrade() {
        return to.clone();
    }
    match &weight.kind {
        PdgNodeKind::Storage { label, .. } => label.join(&input),
        PdgNodeKind::Compute { .. } | PdgNodeKind::Control => input,
    }
}

/// Runs label inference to fixpoint and validates every downgrade
/// against its inferred input.
pub fn solve_labels(pdg: &Pdg) -> CompileResult<LabelSolution> {
    let mut labels: Vec<Label> = pdg
        .node_indices()
        .map(|node| initial_label(pdg, node))
        .collect();

    let mut worklist: VecDeque<NodeIndex> = pdg.ordered_nodes().into();
    let mut queued: FxHashSet<NodeIndex> = worklist.iter().copied().collect();
    let mut steps = 0u64;
    while let Some(node) = worklist.pop_front() {
        queued.remove(&node);
        steps += 1;
        let output = transfer(pdg, node, input_label(pdg, &labels, node));
        if output != labels[node.index()] {
            labels[node.index()] = output;
            for successor in pdg.information_targets(node) {
                if queued.insert(successor) {
                    worklist.push_back(successor);
                }
            }
        }
    }
    debug!(steps, "label inference reached fixpoint");

    for node in pdg.node_indices() {
        let weight = pdg.node(node);
        let Some((kind, to)) = weight.downgrade() else {
            continue;
        };
        let input = input_label(pdg, &labels, node);
        let legal = match kind {
            DowngradeKind::Declassify => {
                input.integrity_component() == to.integrity_component()
            }
            DowngradeKind::Endorse => {
                input.confidentiality_component() == to.confidentiality_component()
            }
        };
        if !legal {
            return Err(CompileError::LabelViolation {
                location: weight.location,
                from: input,
                to: to.clone(),
            });
        }
    }

    Ok(LabelSolution { labels })
}
