//! Compiles a security-labeled source program into a distributed
//! deployment: every variable and computation is placed on a protocol
//! (local execution, replication, MPC, zero-knowledge, commitment)
//! that its information-flow label permits, minimizing communication
//! and cryptography cost, and the result is lowered to one imperative
//! program per process with explicit message passing.

pub mod host;
pub mod language;
pub mod pdg;
pub mod process;
pub mod protocol;
pub mod session;

pub use host::HostTrustConfiguration;
pub use pdg::{solve_labels, LabelSolution, Pdg, PdgBuilder};
pub use process::{ProcessConfiguration, ProcessName, ProcessStatement};
pub use protocol::{
    instantiate, select_protocols, Protocol, ProtocolAssignment, SearchConfiguration,
};
pub use session::CompilationSession;

use language::Statement;
use tracing::{debug, info_span};
use weir_error::CompileResult;
use weir_types::Variable;

/// Everything the pipeline produces, kept together so callers can
/// inspect intermediate results alongside the final processes.
#[derive(Debug)]
pub struct CompilationOutput {
    pub pdg: Pdg,
    pub labels: LabelSolution,
    pub assignment: ProtocolAssignment,
    pub processes: ProcessConfiguration,
}

impl CompilationOutput {
    /// The protocol a source variable's storage was placed on.
    pub fn protocol_for(&self, var: &Variable) -> Option<&Protocol> {
        let node = self.pdg.storage_for(var)?;
        self.assignment.get(&node)
    }
}

/// Runs the full pipeline with the default search configuration.
pub fn compile(
    config: &HostTrustConfiguration,
    program: &[Statement],
) -> CompileResult<CompilationOutput> {
    compile_with(config, program, &SearchConfiguration::default())
}

/// Runs the full pipeline: graph construction, label dataflow,
/// protocol search, and instantiation.
pub fn compile_with(
    config: &HostTrustConfiguration,
    program: &[Statement],
    search: &SearchConfiguration,
) -> CompileResult<CompilationOutput> {
    let span = info_span!("compile", hosts = config.len());
    let _enter = span.enter();

    let pdg = PdgBuilder::build(program)?;
    debug!(nodes = pdg.node_count(), "built dependency graph");

    let labels = solve_labels(&pdg)?;
    debug!("solved information-flow labels");

    let assignment = select_protocols(&pdg, config, &labels, search)?;
    debug!(assigned = assignment.len(), "selected protocols");

    let mut session = CompilationSession::default();
    let processes = instantiate(&pdg, config, &labels, &assignment, &mut session)?;

    Ok(CompilationOutput {
        pdg,
        labels,
        assignment,
        processes,
    })
}
