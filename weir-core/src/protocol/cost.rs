//! Estimates the communication a partial protocol assignment commits
//! the deployment to. Storage is free; every value that crosses between
//! two processes costs one unit; multiplications under MPC cost the
//! square of the party count. Nodes whose dependencies are not yet
//! assigned contribute nothing until they are.

use crate::host::HostTrustConfiguration;
use crate::pdg::{LabelSolution, Pdg, PdgNodeKind};
use crate::protocol::search::ProtocolAssignment;
use crate::protocol::{communication, Protocol};
use petgraph::graph::NodeIndex;
use weir_error::CompileResult;
use weir_types::HostName;

/// Flat setup overhead of a commitment or zero-knowledge session.
const CRYPTO_SESSION_COST: u64 = 2;

/// The processes a protocol runs its computations in: a real host per
/// replica, or a single synthesized process.
fn runners(protocol: &Protocol) -> Vec<Option<HostName>> {
    if protocol.is_synthesized() {
        vec![None]
    } else {
        protocol.hosts().into_iter().map(Some).collect()
    }
}

pub fn assignment_cost(
    pdg: &Pdg,
    config: &HostTrustConfiguration,
    solution: &LabelSolution,
    assignment: &ProtocolAssignment,
) -> CompileResult<u64> {
    let mut total = 0u64;
    for (node, protocol) in assignment {
        total += node_cost(pdg, config, solution, assignment, *node, protocol)?;
    }
    Ok(total)
}

pub fn node_cost(
    pdg: &Pdg,
    config: &HostTrustConfiguration,
    solution: &LabelSolution,
    assignment: &ProtocolAssignment,
    node: NodeIndex,
    protocol: &Protocol,
) -> CompileResult<u64> {
    let weight = pdg.node(node);
    let PdgNodeKind::Compute { expr, .. } = &weight.kind else {
        return Ok(0);
    };

    let readers = runners(protocol);
    let mut cost = 0u64;

    for (source, _) in pdg.read_sources(node) {
        let Some(source_protocol) = assignment.get(&source) else {
            return Ok(0);
        };
        if source_protocol == protocol {
            continue;
        }
        if source_protocol.is_synthesized() {
            cost += readers.len() as u64;
            continue;
        }
        let senders =
            communication::read_set(config, source_protocol, solution.label(source), "cost")?;
        for reader in &readers {
            for sender in &senders {
                if reader.as_ref() != Some(sender) {
                    cost += 1;
                }
            }
        }
    }

    for target in pdg.write_targets(node) {
        let Some(target_protocol) = assignment.get(&target) else {
            return Ok(0);
        };
        if target_protocol == protocol {
            continue;
        }
        if target_protocol.is_synthesized() {
            cost += readers.len() as u64;
            continue;
        }
        for writer in &readers {
            for host in target_protocol.hosts() {
                if writer.as_ref() != Some(&host) {
                    cost += 1;
                }
            }
        }
    }

    match protocol {
        Protocol::Mpc { parties } => {
            let parties = parties.len() as u64;
            cost += expr.multiplications() * parties * parties;
        }
        Protocol::ZeroKnowledge { .. } | Protocol::Commitment { .. } => {
            cost += CRYPTO_SESSION_COST;
        }
        _ => {}
    }

    Ok(cost)
}
