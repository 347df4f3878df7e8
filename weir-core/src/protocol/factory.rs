//! Candidate protocols for a node.
//!
//! Candidates are generated in tiers of increasing cost and machinery:
//! a single trusted host beats replication, which beats cryptography.
//! Later tiers are only consulted when every earlier tier comes up
//! empty, so the search never weighs an MPC against a local assignment
//! that would already be sound.

use crate::host::HostTrustConfiguration;
use crate::pdg::{LabelSolution, Pdg, PdgNodeKind};
use crate::protocol::search::ProtocolAssignment;
use crate::protocol::Protocol;
use itertools::Itertools;
use petgraph::graph::NodeIndex;
use weir_error::CompileResult;
use weir_types::HostName;

/// Which protocol families selection may draw from. Used to model
/// deployments where a backend is unavailable.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SearchConfiguration {
    pub replication: bool,
    pub mpc: bool,
    pub zero_knowledge: bool,
    pub commitment: bool,
}

impl Default for SearchConfiguration {
    fn default() -> Self {
        SearchConfiguration {
            replication: true,
            mpc: true,
            zero_knowledge: true,
            commitment: true,
        }
    }
}

/// Protocols that could soundly host `node`, given the assignments made
/// so far. May be empty when no declared host combination is trusted
/// enough.
pub fn candidates(
    pdg: &Pdg,
    node: NodeIndex,
    config: &HostTrustConfiguration,
    search: &SearchConfiguration,
    solution: &LabelSolution,
    assignment: &ProtocolAssignment,
) -> CompileResult<Vec<Protocol>> {
    let weight = pdg.node(node);
    if weight.is_control() {
        return Ok(vec![Protocol::Control]);
    }

    let label = solution.label(node);
    let hosts: Vec<HostName> = config.hosts().cloned().collect();

    // A downgrade stays wherever its input lives, provided that place
    // can vouch for the downgraded label; zero-knowledge pairs may
    // additionally vouch for it.
    if weight.is_downgrade() {
        let mut tier = Vec::new();
        if let Some(&(source, _)) = pdg.read_sources(node).first() {
            if let Some(protocol) = assignment.get(&source) {
                if protocol.trust(config)?.dominates(label) {
                    tier.push(protocol.clone());
                }
            }
        }
        if search.zero_knowledge {
            for (prover, verifier) in host_pairs(&hosts) {
                let protocol = Protocol::ZeroKnowledge { prover, verifier };
                if protocol.trust(config)?.dominates(label) && !tier.contains(&protocol) {
                    tier.push(protocol);
                }
            }
        }
        return Ok(tier);
    }

    // A computation feeding exactly one storage location is colocated
    // with it, as long as the storage's protocol can also vouch for the
    // computed value's own label; a storage label weakened by joins can
    // admit hosts its inputs' integrity rules out.
    if matches!(weight.kind, PdgNodeKind::Compute { .. }) {
        let targets = pdg.write_targets(node);
        if let [target] = targets[..] {
            if let Some(protocol) = assignment.get(&target) {
                if protocol.trust(config)?.dominates(label) {
                    return Ok(vec![protocol.clone()]);
                }
            }
        }
    }

    // Tier 1: a lone trusted host.
    let tier: Vec<Protocol> = hosts
        .iter()
        .map(|host| Protocol::Single { host: host.clone() })
        .filter_map(|protocol| match protocol.trust(config) {
            Ok(trust) if trust.dominates(label) => Some(Ok(protocol)),
            Ok(_) => None,
            Err(error) => Some(Err(error)),
        })
        .collect::<CompileResult<_>>()?;
    if !tier.is_empty() {
        return Ok(tier);
    }

    // Tier 2: replication.
    if search.replication {
        let mut tier = Vec::new();
        for subset in hosts.iter().powerset().filter(|subset| subset.len() >= 2) {
            let protocol = Protocol::Replication {
                replicas: subset.into_iter().cloned().collect(),
            };
            if protocol.trust(config)?.dominates(label) {
                tier.push(protocol);
            }
        }
        if !tier.is_empty() {
            return Ok(tier);
        }
    }

    // Tier 3: cryptography.
    let mut tier = Vec::new();
    if search.mpc {
        for subset in hosts.iter().powerset().filter(|subset| subset.len() >= 2) {
            let protocol = Protocol::Mpc {
                parties: subset.into_iter().cloned().collect(),
            };
            if protocol.trust(config)?.dominates(label) {
                tier.push(protocol);
            }
        }
    }
    if search.commitment && weight.is_storage() {
        for (sender, receiver) in host_pairs(&hosts) {
            let protocol = Protocol::Commitment {
                sender,
                receivers: [receiver].into_iter().collect(),
            };
            if protocol.trust(config)?.dominates(label) {
                tier.push(protocol);
            }
        }
    }
    Ok(tier)
}

fn host_pairs(hosts: &[HostName]) -> impl Iterator<Item = (HostName, HostName)> + '_ {
    hosts.iter().flat_map(move |left| {
        hosts
            .iter()
            .filter(move |right| *right != left)
            .map(move |right| (left.clone(), right.clone()))
    })
}
