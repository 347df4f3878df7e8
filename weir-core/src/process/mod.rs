//! The output of instantiation: one imperative program per process,
//! with explicit sends and receives where values cross processes.

use crate::language::Expression;
use indexmap::IndexMap;
use serde::Serialize;
use std::fmt;
use weir_error::{CompileError, CompileResult};
use weir_types::{HostName, Label, Variable};

/// A participant in the compiled deployment: a declared host, or a
/// process synthesized for a cryptographic protocol.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum ProcessName {
    Host(HostName),
    Synthesized(String),
}

impl fmt::Display for ProcessName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessName::Host(host) => write!(f, "{host}"),
            ProcessName::Synthesized(name) => write!(f, "{name}"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum ProcessStatement {
    Declare {
        var: Variable,
        label: Label,
    },
    Assign {
        var: Variable,
        expr: Expression,
    },
    Send {
        to: ProcessName,
        expr: Expression,
    },
    Receive {
        from: ProcessName,
        var: Variable,
    },
    /// Cross-checks independently obtained copies of a replicated value.
    AssertEqual {
        vars: Vec<Variable>,
    },
    Assert {
        expr: Expression,
    },
    If {
        guard: Expression,
        then_branch: Vec<ProcessStatement>,
        else_branch: Vec<ProcessStatement>,
    },
}

/// Accumulates one process's statements, tracking the conditional the
/// process is currently inside of.
#[derive(Debug, Default)]
pub struct StatementBuilder {
    statements: Vec<ProcessStatement>,
    frames: Vec<Frame>,
}

#[derive(Debug)]
struct Frame {
    guard: Expression,
    then_branch: Vec<ProcessStatement>,
    else_branch: Vec<ProcessStatement>,
    in_else: bool,
}

impl StatementBuilder {
    fn append(&mut self, statement: ProcessStatement) {
        match self.frames.last_mut() {
            Some(frame) if frame.in_else => frame.else_branch.push(statement),
            Some(frame) => frame.then_branch.push(statement),
            None => self.statements.push(statement),
        }
    }

    pub fn declare(&mut self, var: Variable, label: Label) {
        self.append(ProcessStatement::Declare { var, label });
    }

    pub fn assign(&mut self, var: Variable, expr: Expression) {
        self.append(ProcessStatement::Assign { var, expr });
    }

    pub fn send(&mut self, to: ProcessName, expr: Expression) {
        self.append(ProcessStatement::Send { to, expr });
    }

    pub fn receive(&mut self, from: ProcessName, var: Variable) {
        self.append(ProcessStatement::Receive { from, var });
    }

    pub fn assert_equal(&mut self, vars: Vec<Variable>) {
        self.append(ProcessStatement::AssertEqual { vars });
    }

    pub fn assert(&mut self, expr: Expression) {
        self.append(ProcessStatement::Assert { expr });
    }

    pub fn push_if(&mut self, guard: Expression) {
        self.frames.push(Frame {
            guard,
            then_branch: Vec::new(),
            else_branch: Vec::new(),
            in_else: false,
        });
    }

    pub fn enter_else_branch(&mut self) -> CompileResult<()> {
        let frame = self
            .frames
            .last_mut()
            .ok_or_else(|| CompileError::Internal("no open conditional".into()))?;
        frame.in_else = true;
        Ok(())
    }

    pub fn pop_if(&mut self) -> CompileResult<()> {
        let frame = self
            .frames
            .pop()
            .ok_or_else(|| CompileError::Internal("no open conditional".into()))?;
        self.append(ProcessStatement::If {
            guard: frame.guard,
            then_branch: frame.then_branch,
            else_branch: frame.else_branch,
        });
        Ok(())
    }

    fn finish(self) -> CompileResult<Vec<ProcessStatement>> {
        if !self.frames.is_empty() {
            return Err(CompileError::Internal(
                "process left a conditional open".into(),
            ));
        }
        Ok(self.statements)
    }
}

/// Builds the full configuration, creating processes on first use.
#[derive(Debug, Default)]
pub struct ProcessConfigurationBuilder {
    processes: IndexMap<ProcessName, StatementBuilder>,
}

impl ProcessConfigurationBuilder {
    pub fn process(&mut self, name: ProcessName) -> &mut StatementBuilder {
        self.processes.entry(name).or_default()
    }

    pub fn finish(self) -> CompileResult<ProcessConfiguration> {
        let mut processes = IndexMap::new();
        for (name, builder) in self.processes {
            processes.insert(name, builder.finish()?);
        }
        Ok(ProcessConfiguration { processes })
    }
}

/// The compiled program: a statement list per process.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ProcessConfiguration {
    processes: IndexMap<ProcessName, Vec<ProcessStatement>>,
}

impl ProcessConfiguration {
    pub fn processes(&self) -> impl Iterator<Item = (&ProcessName, &[ProcessStatement])> {
        self.processes
            .iter()
            .map(|(name, statements)| (name, statements.as_slice()))
    }

    pub fn statements(&self, name: &ProcessName) -> Option<&[ProcessStatement]> {
        self.processes.get(name).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.processes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processes.is_empty()
    }
}

fn write_statement(
    f: &mut fmt::Formatter<'_>,
    statement: &ProcessStatement,
    indent: usize,
) -> fmt::Result {
    let pad = "  ".repeat(indent);
    match statement {
        ProcessStatement::Declare { var, label } => writeln!(f, "{pad}var {var} @ {label};"),
        ProcessStatement::Assign { var, expr } => writeln!(f, "{pad}{var} := {expr};"),
        ProcessStatement::Send { to, expr } => writeln!(f, "{pad}send {expr} to {to};"),
        ProcessStatement::Receive { from, var } => {
            writeln!(f, "{pad}{var} := receive from {from};")
        }
        ProcessStatement::AssertEqual { vars } => {
            write!(f, "{pad}assert_equal(")?;
            for (index, var) in vars.iter().enumerate() {
                if index > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{var}")?;
            }
            writeln!(f, ");")
        }
        ProcessStatement::Assert { expr } => writeln!(f, "{pad}assert {expr};"),
        ProcessStatement::If {
            guard,
            then_branch,
            else_branch,
        } => {
            writeln!(f, "{pad}if {guard} {{")?;
            for statement in then_branch {
                write_statement(f, statement, indent + 1)?;
            }
            if !else_branch.is_empty() {
                writeln!(f, "{pad}}} else {{")?;
                for statement in else_branch {
                    write_statement(f, statement, indent + 1)?;
                }
            }
            writeln!(f, "{pad}}}")
        }
    }
}

impl fmt::Display for ProcessConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, statements) in &self.processes {
            writeln!(f, "process {name} {{")?;
            for statement in statements {
                write_statement(f, statement, 1)?;
            }
            writeln!(f, "}}")?;
        }
        Ok(())
    }
}
