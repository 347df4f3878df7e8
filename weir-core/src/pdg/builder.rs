//! Translates a program into its dependency graph.
//!
//! Downgrade subexpressions are pulled out into their own compute nodes
//! so that each downgrade can be validated and placed independently; the
//! surrounding expression reads the extracted node through a generated
//! binding. Guards of conditionals likewise get a dedicated compute node,
//! so a control node always has exactly one read dependency.

use crate::language::{Expression, Statement, StatementKind};
use crate::pdg::{BranchPath, Pdg, PdgEdge, PdgNode, PdgNodeKind};
use indexmap::IndexMap;
use petgraph::graph::NodeIndex;
use rustc_hash::FxHashMap;
use std::collections::BTreeSet;
use tracing::debug;
use weir_error::{CompileError, CompileResult};
use weir_types::{Location, Variable};

pub struct PdgBuilder {
    pdg: Pdg,
    scopes: Vec<FxHashMap<Variable, NodeIndex>>,
    bindings: u64,
}

/// The dependency-relevant reads of an expression: producing node and
/// the binding the rewritten expression reads it through.
type Reads = IndexMap<NodeIndex, Variable>;

/// The chain of nodes a statement (or block) contributes, in execution
/// order. `nodes` also lists nodes created inside nested branches.
#[derive(Default)]
struct Segment {
    first: Option<NodeIndex>,
    last: Option<NodeIndex>,
    nodes: Vec<NodeIndex>,
}

impl PdgBuilder {
    pub fn build(program: &[Statement]) -> CompileResult<Pdg> {
        let mut builder = PdgBuilder {
            pdg: Pdg::default(),
            scopes: vec![FxHashMap::default()],
            bindings: 0,
        };
        let segment = builder.process_block(program)?;
        builder.pdg.entry = segment.first;
        debug!(nodes = builder.pdg.node_count(), "built dependency graph");
        Ok(builder.pdg)
    }

    fn fresh_binding(&mut self) -> Variable {
        let binding = Variable::new(format!("$t{}", self.bindings));
        self.bindings += 1;
        binding
    }

    fn lookup(&self, var: &Variable, location: Location) -> CompileResult<NodeIndex> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(var))
            .copied()
            .ok_or_else(|| CompileError::UndeclaredVariable {
                var: var.clone(),
                location,
            })
    }

    fn declare(
        &mut self,
        var: Variable,
        node: NodeIndex,
        location: Location,
    ) -> CompileResult<()> {
        let scope = self
            .scopes
            .last_mut()
            .ok_or_else(|| CompileError::Internal("scope stack is empty".into()))?;
        if let Some(&prior) = scope.get(&var) {
            return Err(CompileError::RedeclaredVariable {
                var,
                location,
                previous: self.pdg.graph[prior].location,
            });
        }
        scope.insert(var, node);
        Ok(())
    }

    fn add_node(&mut self, kind: PdgNodeKind, location: Location) -> NodeIndex {
        self.pdg.graph.add_node(PdgNode { kind, location })
    }

    fn link(&mut self, from: NodeIndex, to: NodeIndex, path: BranchPath) {
        self.pdg.graph.add_edge(from, to, PdgEdge::Control(path));
    }

    fn add_reads(&mut self, reads: &Reads, consumer: NodeIndex) {
        for (source, binding) in reads {
            self.pdg.graph.add_edge(
                *source,
                consumer,
                PdgEdge::Read {
                    binding: binding.clone(),
                },
            );
        }
    }

    fn process_block(&mut self, statements: &[Statement]) -> CompileResult<Segment> {
        let mut block = Segment::default();
        for statement in statements {
            let segment = self.process_statement(statement)?;
            if let Some(first) = segment.first {
                if let Some(last) = block.last {
                    self.link(last, first, BranchPath::Seq);
                }
                block.first = block.first.or(Some(first));
                block.last = segment.last;
            }
            block.nodes.extend(segment.nodes);
        }
        Ok(block)
    }

    fn process_statement(&mut self, statement: &Statement) -> CompileResult<Segment> {
        let location = statement.location;
        match &statement.kind {
            StatementKind::VariableDeclaration { var, label } => {
                let node = self.add_node(
                    PdgNodeKind::Storage {
                        var: var.clone(),
                        label: label.clone(),
                    },
                    location,
                );
                self.declare(var.clone(), node, location)?;
                Ok(Segment::single(node))
            }
            StatementKind::Assign { var, expr } => {
                let storage = self.lookup(var, location)?;
                let mut reads = Reads::default();
                let mut segment = Segment::default();
                let rewritten =
                    self.process_expression(expr, location, &mut reads, &mut segment)?;
                let node = self.add_node(
                    PdgNodeKind::Compute {
                        expr: rewritten,
                        target: Some(var.clone()),
                        assertion: false,
                    },
                    location,
                );
                self.add_reads(&reads, node);
                self.pdg.graph.add_edge(node, storage, PdgEdge::Write);
                segment.push(self, node);
                Ok(segment)
            }
            StatementKind::Assert { expr } => {
                let mut reads = Reads::default();
                let mut segment = Segment::default();
                let rewritten =
                    self.process_expression(expr, location, &mut reads, &mut segment)?;
                let node = self.add_node(
                    PdgNodeKind::Compute {
                        expr: rewritten,
                        target: None,
                        assertion: true,
                    },
                    location,
                );
                self.add_reads(&reads, node);
                segment.push(self, node);
                Ok(segment)
            }
            StatementKind::If {
                guard,
                then_branch,
                else_branch,
            } => self.process_conditional(guard, then_branch, else_branch, location),
            StatementKind::Block(statements) => {
                self.scopes.push(FxHashMap::default());
                let segment = self.process_block(statements);
                self.scopes.pop();
                segment
            }
            StatementKind::Skip => Ok(Segment::default()),
        }
    }

    fn process_conditional(
        &mut self,
        guard: &Expression,
        then_branch: &[Statement],
        else_branch: &[Statement],
        location: Location,
    ) -> CompileResult<Segment> {
        let mut segment = Segment::default();
        let guard_node = self.process_guard(guard, location, &mut segment)?;
        let control = self.add_node(PdgNodeKind::Control, location);
        let binding = self.fresh_binding();
        self.pdg
            .graph
            .add_edge(guard_node, control, PdgEdge::Read { binding });
        segment.push(self, control);

        let mut branch_nodes = Vec::new();
        for (path, branch) in [
            (BranchPath::Then, then_branch),
            (BranchPath::Else, else_branch),
        ] {
            self.scopes.push(FxHashMap::default());
            let branch_segment = self.process_block(branch);
            self.scopes.pop();
            let branch_segment = branch_segment?;
            if let Some(first) = branch_segment.first {
                self.link(control, first, path);
            }
            branch_nodes.extend(branch_segment.nodes);
        }

        // Storage written or read under either branch receives the
        // guard's label through the channel edge: every host involved in
        // replaying the branch learns the guard's value, so storage it
        // reads from is tainted just like storage it writes.
        let mut tainted: BTreeSet<NodeIndex> = branch_nodes
            .iter()
            .flat_map(|&node| self.pdg.write_targets(node))
            .collect();
        for &node in &branch_nodes {
            tainted.extend(self.pdg.storage_inputs(node));
        }
        for target in tainted {
            self.pdg
                .graph
                .add_edge(control, target, PdgEdge::ReadChannel);
        }

        segment.nodes.extend(branch_nodes);
        Ok(segment)
    }

    /// Builds the compute node a control node reads its guard from. A
    /// guard that is a top-level downgrade becomes the downgrade node
    /// itself rather than a wrapper computation.
    fn process_guard(
        &mut self,
        guard: &Expression,
        location: Location,
        segment: &mut Segment,
    ) -> CompileResult<NodeIndex> {
        if matches!(guard, Expression::Downgrade { .. }) {
            let mut reads = Reads::default();
            self.process_expression(guard, location, &mut reads, segment)?;
            // The downgrade node is the last one extracted.
            return segment.last.ok_or_else(|| {
                CompileError::Internal("downgrade extraction produced no node".into())
            });
        }
        let mut reads = Reads::default();
        let rewritten = self.process_expression(guard, location, &mut reads, segment)?;
        let node = self.add_node(
            PdgNodeKind::Compute {
                expr: rewritten,
                target: None,
                assertion: false,
            },
            location,
        );
        self.add_reads(&reads, node);
        segment.push(self, node);
        Ok(node)
    }

    /// Rewrites an expression for storage in a compute node: variable
    /// reads are resolved and recorded in `reads`, and downgrade
    /// subexpressions are extracted into their own nodes, chained into
    /// `segment` ahead of the consumer.
    fn process_expression(
        &mut self,
        expr: &Expression,
        location: Location,
        reads: &mut Reads,
        segment: &mut Segment,
    ) -> CompileResult<Expression> {
        match expr {
            Expression::Literal(value) => Ok(Expression::Literal(*value)),
            Expression::Read(var) => {
                let source = self.lookup(var, location)?;
                reads.entry(source).or_insert_with(|| var.clone());
                Ok(Expression::Read(var.clone()))
            }
            Expression::Not(inner) => Ok(Expression::Not(Box::new(
                self.process_expression(inner, location, reads, segment)?,
            ))),
            Expression::BinaryOp { op, lhs, rhs } => Ok(Expression::BinaryOp {
                op: *op,
                lhs: Box::new(self.process_expression(lhs, location, reads, segment)?),
                rhs: Box::new(self.process_expression(rhs, location, reads, segment)?),
            }),
            Expression::Downgrade { kind, to, expr } => {
                let mut inner_reads = Reads::default();
                let inner =
                    self.process_expression(expr, location, &mut inner_reads, segment)?;
                let node = self.add_node(
                    PdgNodeKind::Compute {
                        expr: Expression::Downgrade {
                            kind: *kind,
                            to: to.clone(),
                            expr: Box::new(inner),
                        },
                        target: None,
                        assertion: false,
                    },
                    location,
                );
                self.add_reads(&inner_reads, node);
                segment.push(self, node);
                let binding = self.fresh_binding();
                reads.insert(node, binding.clone());
                Ok(Expression::Read(binding))
            }
        }
    }
}

impl Segment {
    fn single(node: NodeIndex) -> Segment {
        Segment {
            first: Some(node),
            last: Some(node),
            nodes: vec![node],
        }
    }

    /// Appends a node to the chain, linking it after the current last.
    fn push(&mut self, builder: &mut PdgBuilder, node: NodeIndex) {
        if let Some(last) = self.last {
            builder.link(last, node, BranchPath::Seq);
        }
        self.first = self.first.or(Some(node));
        self.last = Some(node);
        self.nodes.push(node);
    }
}
