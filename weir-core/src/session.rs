//! Mutable state threaded through instantiation: fresh-name generation
//! and the registry of synthesized processes.

use crate::process::ProcessName;
use crate::protocol::Protocol;
use itertools::Itertools;
use rustc_hash::FxHashMap;
use std::collections::BTreeSet;
use weir_types::{HostName, Variable};

#[derive(Debug, Default)]
pub struct CompilationSession {
    counters: FxHashMap<String, u64>,
    synthesized: FxHashMap<(&'static str, BTreeSet<HostName>), ProcessName>,
}

impl CompilationSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// A variable name not handed out before, derived from `base`.
    pub fn fresh_variable(&mut self, base: &str) -> Variable {
        let counter = self.counters.entry(base.to_string()).or_insert(0);
        let variable = Variable::new(format!("{base}_{counter}"));
        *counter += 1;
        variable
    }

    /// The process a synthesized protocol runs in. The same participant
    /// set always maps to the same process, so two MPC nodes among the
    /// same parties share one circuit evaluator.
    pub fn synthesized_process(&mut self, protocol: &Protocol) -> ProcessName {
        let tag = match protocol {
            Protocol::Mpc { .. } => "mpc",
            Protocol::ZeroKnowledge { .. } => "zk",
            Protocol::Commitment { .. } => "commit",
            _ => "process",
        };
        let hosts = protocol.hosts();
        self.synthesized
            .entry((tag, hosts.clone()))
            .or_insert_with(|| {
                let joined = hosts.iter().map(HostName::as_str).join("_");
                ProcessName::Synthesized(format!("{tag}_{joined}"))
            })
            .clone()
    }
}
