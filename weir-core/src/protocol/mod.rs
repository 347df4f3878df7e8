//! Cryptographic protocols a node can be assigned to, and the passes
//! that pick one per node: candidate generation, cost estimation,
//! best-first search, and instantiation into per-process code.

pub mod communication;
pub mod cost;
pub mod factory;
pub mod instantiate;
pub mod search;

use crate::host::HostTrustConfiguration;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;
use weir_error::{CompileError, CompileResult};
use weir_types::{HostName, Label, Lattice};

pub use factory::SearchConfiguration;
pub use instantiate::instantiate;
pub use search::{select_protocols, ProtocolAssignment};

/// A way of hosting a storage location or running a computation across
/// the declared hosts.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Protocol {
    /// Plain local execution on one host.
    Single { host: HostName },
    /// Every replica holds a copy and recomputes independently.
    Replication { replicas: BTreeSet<HostName> },
    /// Secure multiparty computation among the parties.
    Mpc { parties: BTreeSet<HostName> },
    /// The prover convinces the verifier without revealing its witness.
    ZeroKnowledge { prover: HostName, verifier: HostName },
    /// The sender commits to a value the receivers can hold it to.
    Commitment {
        sender: HostName,
        receivers: BTreeSet<HostName>,
    },
    /// The bookkeeping protocol assigned to control nodes.
    Control,
}

impl Protocol {
    /// The real hosts participating in the protocol.
    pub fn hosts(&self) -> BTreeSet<HostName> {
        match self {
            Protocol::Single { host } => [host.clone()].into_iter().collect(),
            Protocol::Replication { replicas } => replicas.clone(),
            Protocol::Mpc { parties } => parties.clone(),
            Protocol::ZeroKnowledge { prover, verifier } => {
                [prover.clone(), verifier.clone()].into_iter().collect()
            }
            Protocol::Commitment { sender, receivers } => {
                let mut hosts = receivers.clone();
                hosts.insert(sender.clone());
                hosts
            }
            Protocol::Control => BTreeSet::new(),
        }
    }

    /// Whether the protocol runs in a process of its own rather than
    /// directly on its hosts.
    pub fn is_synthesized(&self) -> bool {
        matches!(
            self,
            Protocol::Mpc { .. } | Protocol::ZeroKnowledge { .. } | Protocol::Commitment { .. }
        )
    }

    /// The combined authority the protocol wields, derived from the
    /// trust placed in its hosts.
    pub fn trust(&self, config: &HostTrustConfiguration) -> CompileResult<Label> {
        match self {
            Protocol::Single { host } => Ok(config.trust(host)?.clone()),
            // Any replica can deviate on its own, so the replicas'
            // secrets pool disjunctively while their integrity pools
            // conjunctively.
            Protocol::Replication { replicas } => {
                fold_trust(config, replicas.iter(), |acc, trust| acc.meet(trust))
            }
            Protocol::Mpc { parties } => {
                fold_trust(config, parties.iter(), |acc, trust| acc.and(trust))
            }
            Protocol::ZeroKnowledge { prover, verifier } => {
                let prover_trust = config.trust(prover)?;
                let verifier_trust = config.trust(verifier)?;
                Ok(prover_trust.and(&verifier_trust.integrity()))
            }
            Protocol::Commitment { sender, receivers } => {
                let mut trust = config.trust(sender)?.clone();
                for receiver in receivers {
                    trust = trust.and(&config.trust(receiver)?.integrity());
                }
                Ok(trust)
            }
            Protocol::Control => Ok(Label::bottom()),
        }
    }
}

fn fold_trust<'a>(
    config: &HostTrustConfiguration,
    mut hosts: impl Iterator<Item = &'a HostName>,
    combine: impl Fn(Label, &Label) -> Label,
) -> CompileResult<Label> {
    let first = hosts
        .next()
        .ok_or_else(|| CompileError::Internal("protocol with no hosts".into()))?;
    let mut acc = config.trust(first)?.clone();
    for host in hosts {
        acc = combine(acc, config.trust(host)?);
    }
    Ok(acc)
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn hosts(f: &mut fmt::Formatter<'_>, hosts: &BTreeSet<HostName>) -> fmt::Result {
            let mut first = true;
            for host in hosts {
                if !first {
                    f.write_str(", ")?;
                }
                first = false;
                write!(f, "{host}")?;
            }
            Ok(())
        }

        match self {
            Protocol::Single { host } => write!(f, "Single({host})"),
            Protocol::Replication { replicas } => {
                f.write_str("Replication(")?;
                hosts(f, replicas)?;
                f.write_str(")")
            }
            Protocol::Mpc { parties } => {
                f.write_str("MPC(")?;
                hosts(f, parties)?;
                f.write_str(")")
            }
            Protocol::ZeroKnowledge { prover, verifier } => {
                write!(f, "ZeroKnowledge({prover} -> {verifier})")
            }
            Protocol::Commitment { sender, receivers } => {
                write!(f, "Commitment({sender} -> ")?;
                hosts(f, receivers)?;
                f.write_str(")")
            }
            Protocol::Control => f.write_str("Control"),
        }
    }
}
