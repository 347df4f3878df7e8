use crate::language::Expression;
use serde::{Deserialize, Serialize};
use weir_types::{Label, Location, Variable};

/// A statement together with its source position.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statement {
    pub kind: StatementKind,
    pub location: Location,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatementKind {
    /// Declares a storage location with an explicit security label.
    VariableDeclaration { var: Variable, label: Label },
    /// Stores the value of an expression into a declared variable.
    Assign { var: Variable, expr: Expression },
    If {
        guard: Expression,
        then_branch: Vec<Statement>,
        else_branch: Vec<Statement>,
    },
    /// A nested scope.
    Block(Vec<Statement>),
    Skip,
    Assert { expr: Expression },
}

impl Statement {
    pub fn declare(var: impl Into<Variable>, label: Label, location: Location) -> Self {
        Statement {
            kind: StatementKind::VariableDeclaration {
                var: var.into(),
                label,
            },
            location,
        }
    }

    pub fn assign(var: impl Into<Variable>, expr: Expression, location: Location) -> Self {
        Statement {
            kind: StatementKind::Assign {
                var: var.into(),
                expr,
            },
            location,
        }
    }

    pub fn if_else(
        guard: Expression,
        then_branch: Vec<Statement>,
        else_branch: Vec<Statement>,
        location: Location,
    ) -> Self {
        Statement {
            kind: StatementKind::If {
                guard,
                then_branch,
                else_branch,
            },
            location,
        }
    }

    pub fn block(statements: Vec<Statement>, location: Location) -> Self {
        Statement {
            kind: StatementKind::Block(statements),
            location,
        }
    }

    pub fn skip(location: Location) -> Self {
        Statement {
            kind: StatementKind::Skip,
            location,
        }
    }

    pub fn assert(expr: Expression, location: Location) -> Self {
        Statement {
            kind: StatementKind::Assert { expr },
            location,
        }
    }
}
