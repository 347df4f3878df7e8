//! Best-first search over protocol assignments.
//!
//! States are partial assignments covering a prefix of the nodes in
//! execution order; expanding a state assigns the next node each of its
//! candidate protocols. The frontier is ordered by estimated cost, so
//! the first complete assignment popped is a cheapest one. Ties break
//! deterministically through the ordering on assignments themselves.

use crate::host::HostTrustConfiguration;
use crate::pdg::{LabelSolution, Pdg};
use crate::protocol::factory::{self, SearchConfiguration};
use crate::protocol::{cost, Protocol};
use im::OrdMap;
use petgraph::graph::NodeIndex;
use rustc_hash::FxHashSet;
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use tracing::debug;
use weir_error::{CompileError, CompileResult};

/// A (possibly partial) mapping from nodes to protocols. Persistent, so
/// search states share structure.
pub type ProtocolAssignment = OrdMap<NodeIndex, Protocol>;

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
struct SearchState {
    cost: u64,
    assignment: ProtocolAssignment,
}

/// Finds a cheapest protocol assignment covering every node.
pub fn select_protocols(
    pdg: &Pdg,
    config: &HostTrustConfiguration,
    solution: &LabelSolution,
    search: &SearchConfiguration,
) -> CompileResult<ProtocolAssignment> {
    let order = pdg.ordered_nodes();
    let mut frontier = BinaryHeap::new();
    let mut closed: FxHashSet<ProtocolAssignment> = FxHashSet::default();
    frontier.push(Reverse(SearchState {
        cost: 0,
        assignment: ProtocolAssignment::default(),
    }));
    closed.insert(ProtocolAssignment::default());

    // The deepest node the search failed to find any candidate for, kept
    // for error reporting.
    let mut dead_end: Option<(usize, NodeIndex)> = None;
    let mut expanded = 0u64;

    while let Some(Reverse(state)) = frontier.pop() {
        let depth = state.assignment.len();
        if depth == order.len() {
            debug!(expanded, cost = state.cost, "selected protocols");
            return Ok(state.assignment);
        }
        expanded += 1;
        let node = order[depth];
        let options = factory::candidates(pdg, node, config, search, solution, &state.assignment)?;
        if options.is_empty() {
            if dead_end.map_or(true, |(deepest, _)| depth >= deepest) {
                dead_end = Some((depth, node));
            }
            continue;
        }
        for protocol in options {
            let assignment = state.assignment.update(node, protocol);
            if closed.insert(assignment.clone()) {
                let cost = cost::assignment_cost(pdg, config, solution, &assignment)?;
                frontier.push(Reverse(SearchState { cost, assignment }));
            }
        }
    }

    match dead_end {
        Some((_, node)) => Err(CompileError::NoProtocolCandidates {
            location: pdg.node(node).location,
            label: solution.label(node).clone(),
        }),
        None => Err(CompileError::Internal(
            "protocol search exhausted its frontier".into(),
        )),
    }
}
