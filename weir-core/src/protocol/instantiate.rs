//! Turns a protocol assignment into per-process code.
//!
//! The walk follows the control structure of the dependency graph. Each
//! storage node becomes a declaration on every process hosting it; each
//! compute node becomes an assignment on every process running it, with
//! sends and receives materialized wherever a read or write crosses
//! protocols. A value fetched from more than one sender is cross-checked
//! with an equality assertion before use. Conditionals are replayed on
//! every process that holds, feeds, or receives data under them, each of
//! which first obtains the guard.

use crate::host::HostTrustConfiguration;
use crate::language::Expression;
use crate::pdg::{BranchPath, LabelSolution, Pdg, PdgNodeKind};
use crate::process::{ProcessConfiguration, ProcessConfigurationBuilder, ProcessName};
use crate::protocol::search::ProtocolAssignment;
use crate::protocol::{communication, Protocol};
use crate::session::CompilationSession;
use petgraph::graph::NodeIndex;
use rustc_hash::FxHashMap;
use std::collections::BTreeSet;
use tracing::debug;
use weir_error::{CompileError, CompileResult};
use weir_types::Variable;

pub fn instantiate(
    pdg: &Pdg,
    config: &HostTrustConfiguration,
    solution: &LabelSolution,
    assignment: &ProtocolAssignment,
    session: &mut CompilationSession,
) -> CompileResult<ProcessConfiguration> {
    let mut instantiator = Instantiator {
        pdg,
        config,
        solution,
        assignment,
        session,
        builder: ProcessConfigurationBuilder::default(),
        results: FxHashMap::default(),
    };
    // Every declared host gets a process, populated or not.
    for host in config.hosts() {
        instantiator.builder.process(ProcessName::Host(host.clone()));
    }
    instantiator.chain(pdg.entry())?;
    let configuration = instantiator.builder.finish()?;
    debug!(processes = configuration.len(), "instantiated protocols");
    Ok(configuration)
}

struct Instantiator<'a> {
    pdg: &'a Pdg,
    config: &'a HostTrustConfiguration,
    solution: &'a LabelSolution,
    assignment: &'a ProtocolAssignment,
    session: &'a mut CompilationSession,
    builder: ProcessConfigurationBuilder,
    /// Where each node's value lives: one variable per hosting process.
    results: FxHashMap<NodeIndex, FxHashMap<ProcessName, Variable>>,
}

impl<'a> Instantiator<'a> {
    fn protocol(&self, node: NodeIndex) -> CompileResult<&Protocol> {
        self.assignment.get(&node).ok_or_else(|| {
            CompileError::Internal(format!(
                "no protocol assigned to {}",
                self.pdg.node(node)
            ))
        })
    }

    fn processes(&mut self, protocol: &Protocol) -> Vec<ProcessName> {
        if protocol.is_synthesized() {
            vec![self.session.synthesized_process(protocol)]
        } else {
            protocol
                .hosts()
                .into_iter()
                .map(ProcessName::Host)
                .collect()
        }
    }

    fn record(&mut self, node: NodeIndex, process: ProcessName, var: Variable) {
        self.results.entry(node).or_default().insert(process, var);
    }

    fn result(&self, node: NodeIndex, process: &ProcessName) -> CompileResult<Variable> {
        self.results
            .get(&node)
            .and_then(|vars| vars.get(process))
            .cloned()
            .ok_or_else(|| {
                CompileError::Internal(format!(
                    "value of {} is not materialized on {process}",
                    self.pdg.node(node)
                ))
            })
    }

    fn chain(&mut self, start: Option<NodeIndex>) -> CompileResult<()> {
        let mut current = start;
        while let Some(node) = current {
            self.node(node)?;
            current = self.pdg.seq_successor(node);
        }
        Ok(())
    }

    fn node(&mut self, node: NodeIndex) -> CompileResult<()> {
        match &self.pdg.node(node).kind {
            PdgNodeKind::Storage { var, label } => {
                let protocol = self.protocol(node)?.clone();
                let var = var.clone();
                let label = label.clone();
                for process in self.processes(&protocol) {
                    self.builder
                        .process(process.clone())
                        .declare(var.clone(), label.clone());
                    self.record(node, process, var.clone());
                }
                Ok(())
            }
            PdgNodeKind::Compute {
                expr, assertion, ..
            } => {
                let expr = expr.clone();
                let assertion = *assertion;
                self.compute(node, &expr, assertion)
            }
            PdgNodeKind::Control => self.conditional(node),
        }
    }

    fn compute(
        &mut self,
        node: NodeIndex,
        expr: &Expression,
        assertion: bool,
    ) -> CompileResult<()> {
        let pdg = self.pdg;
        let protocol = self.protocol(node)?.clone();
        for process in self.processes(&protocol) {
            let mut renaming = FxHashMap::default();
            for (source, binding) in pdg.read_sources(node) {
                let value = self.read_value(source, &process)?;
                renaming.insert(binding.clone(), value);
            }
            let expr = expr.rename(&renaming);
            if assertion {
                self.builder.process(process.clone()).assert(expr);
                continue;
            }
            let out = self
                .session
                .fresh_variable(pdg.node(node).result_base());
            self.builder
                .process(process.clone())
                .assign(out.clone(), expr);
            self.record(node, process.clone(), out.clone());
            for target in pdg.write_targets(node) {
                self.write_value(&protocol, &process, &out, target)?;
            }
        }
        Ok(())
    }

    /// Fetches the value of `source` onto `reader`, inserting the sends
    /// and receives this takes and cross-checking multiple copies.
    fn read_value(
        &mut self,
        source: NodeIndex,
        reader: &ProcessName,
    ) -> CompileResult<Variable> {
        let source_protocol = self.protocol(source)?.clone();
        if source_protocol.is_synthesized() {
            let sender = self.session.synthesized_process(&source_protocol);
            let value = self.result(source, &sender)?;
            if sender == *reader {
                return Ok(value);
            }
            self.builder
                .process(sender.clone())
                .send(reader.clone(), Expression::Read(value));
            let received = self
                .session
                .fresh_variable(self.pdg.node(source).result_base());
            self.builder
                .process(reader.clone())
                .receive(sender, received.clone());
            return Ok(received);
        }

        let senders = communication::read_set(
            self.config,
            &source_protocol,
            self.solution.label(source),
            &reader.to_string(),
        )?;
        let mut received = Vec::new();
        for sender_host in senders {
            let sender = ProcessName::Host(sender_host);
            let value = self.result(source, &sender)?;
            if sender == *reader {
                received.push(value);
                continue;
            }
            self.builder
                .process(sender.clone())
                .send(reader.clone(), Expression::Read(value));
            let fresh = self
                .session
                .fresh_variable(self.pdg.node(source).result_base());
            self.builder
                .process(reader.clone())
                .receive(sender, fresh.clone());
            received.push(fresh);
        }
        if received.len() > 1 {
            self.builder
                .process(reader.clone())
                .assert_equal(received.clone());
        }
        received
            .into_iter()
            .next()
            .ok_or_else(|| CompileError::Internal("empty read set".into()))
    }

    /// Stores a computed value into a storage node's hosts. When writer
    /// and storage share a protocol every process already holds its own
    /// copy and stores it locally.
    fn write_value(
        &mut self,
        writer_protocol: &Protocol,
        writer: &ProcessName,
        value: &Variable,
        target: NodeIndex,
    ) -> CompileResult<()> {
        let target_protocol = self.protocol(target)?.clone();
        if target_protocol == *writer_protocol {
            let storage = self.result(target, writer)?;
            self.builder
                .process(writer.clone())
                .assign(storage, Expression::Read(value.clone()));
            return Ok(());
        }
        for process in self.processes(&target_protocol) {
            let storage = self.result(target, &process)?;
            if process == *writer {
                self.builder
                    .process(process)
                    .assign(storage, Expression::Read(value.clone()));
            } else {
                self.builder
                    .process(writer.clone())
                    .send(process.clone(), Expression::Read(value.clone()));
                self.builder.process(process).receive(writer.clone(), storage);
            }
        }
        Ok(())
    }

    /// Replays a conditional on every process involved in its branches.
    fn conditional(&mut self, node: NodeIndex) -> CompileResult<()> {
        let pdg = self.pdg;
        let guard = pdg
            .read_sources(node)
            .first()
            .map(|&(source, _)| source)
            .ok_or_else(|| CompileError::Internal("conditional without a guard".into()))?;

        let mut branch_nodes = pdg.branch_nodes(node, BranchPath::Then);
        branch_nodes.extend(pdg.branch_nodes(node, BranchPath::Else));

        let mut participants: BTreeSet<ProcessName> = BTreeSet::new();
        for &branch_node in &branch_nodes {
            let protocol = self.protocol(branch_node)?.clone();
            participants.extend(self.processes(&protocol));
            for (source, _) in pdg.read_sources(branch_node) {
                let source_protocol = self.protocol(source)?.clone();
                participants.extend(self.processes(&source_protocol));
            }
        }
        for target in pdg.channel_targets(node) {
            let target_protocol = self.protocol(target)?.clone();
            participants.extend(self.processes(&target_protocol));
        }

        for process in &participants {
            let value = self.read_value(guard, process)?;
            self.builder
                .process(process.clone())
                .push_if(Expression::Read(value));
        }
        self.chain(pdg.branch_entry(node, BranchPath::Then))?;
        for process in &participants {
            self.builder.process(process.clone()).enter_else_branch()?;
        }
        self.chain(pdg.branch_entry(node, BranchPath::Else))?;
        for process in &participants {
            self.builder.process(process.clone()).pop_if()?;
        }
        Ok(())
    }
}
