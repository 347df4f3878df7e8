use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use weir_types::{Label, Variable};

/// A literal value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Value {
    Int(i64),
    Bool(bool),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(n) => write!(f, "{n}"),
            Value::Bool(b) => write!(f, "{b}"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum BinaryOperator {
    Add,
    Sub,
    Mul,
    And,
    Or,
    EqualTo,
    LessThan,
    LessThanOrEqualTo,
}

impl BinaryOperator {
    fn symbol(&self) -> &'static str {
        match self {
            BinaryOperator::Add => "+",
            BinaryOperator::Sub => "-",
            BinaryOperator::Mul => "*",
            BinaryOperator::And => "&&",
            BinaryOperator::Or => "||",
            BinaryOperator::EqualTo => "==",
            BinaryOperator::LessThan => "<",
            BinaryOperator::LessThanOrEqualTo => "<=",
        }
    }
}

/// The direction of an explicit downgrade.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DowngradeKind {
    /// Weakens confidentiality; must preserve integrity.
    Declassify,
    /// Weakens the integrity requirement; must preserve confidentiality.
    Endorse,
}

/// A pure expression over declared variables.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Expression {
    Literal(Value),
    Read(Variable),
    Not(Box<Expression>),
    BinaryOp {
        op: BinaryOperator,
        lhs: Box<Expression>,
        rhs: Box<Expression>,
    },
    Downgrade {
        kind: DowngradeKind,
        to: Label,
        expr: Box<Expression>,
    },
}

impl Expression {
    pub fn int(value: i64) -> Self {
        Expression::Literal(Value::Int(value))
    }

    pub fn bool(value: bool) -> Self {
        Expression::Literal(Value::Bool(value))
    }

    pub fn read(var: impl Into<Variable>) -> Self {
        Expression::Read(var.into())
    }

    pub fn not(expr: Expression) -> Self {
        Expression::Not(Box::new(expr))
    }

    pub fn binary(op: BinaryOperator, lhs: Expression, rhs: Expression) -> Self {
        Expression::BinaryOp {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    pub fn declassify(to: Label, expr: Expression) -> Self {
        Expression::Downgrade {
            kind: DowngradeKind::Declassify,
            to,
            expr: Box::new(expr),
        }
    }

    pub fn endorse(to: Label, expr: Expression) -> Self {
        Expression::Downgrade {
            kind: DowngradeKind::Endorse,
            to,
            expr: Box::new(expr),
        }
    }

    /// Rewrites every variable read through `renaming`; reads of variables
    /// absent from the map are left alone.
    pub fn rename(&self, renaming: &FxHashMap<Variable, Variable>) -> Expression {
        match self {
            Expression::Literal(value) => Expression::Literal(*value),
            Expression::Read(var) => match renaming.get(var) {
                Some(renamed) => Expression::Read(renamed.clone()),
                None => Expression::Read(var.clone()),
            },
            Expression::Not(expr) => Expression::Not(Box::new(expr.rename(renaming))),
            Expression::BinaryOp { op, lhs, rhs } => Expression::BinaryOp {
                op: *op,
                lhs: Box::new(lhs.rename(renaming)),
                rhs: Box::new(rhs.rename(renaming)),
            },
            Expression::Downgrade { kind, to, expr } => Expression::Downgrade {
                kind: *kind,
                to: to.clone(),
                expr: Box::new(expr.rename(renaming)),
            },
        }
    }

    /// Counts multiplications, which carry a surcharge under
    /// circuit-based protocols.
    pub fn multiplications(&self) -> u64 {
        match self {
            Expression::Literal(_) | Expression::Read(_) => 0,
            Expression::Not(expr) => expr.multiplications(),
            Expression::BinaryOp { op, lhs, rhs } => {
                let own = u64::from(*op == BinaryOperator::Mul);
                own + lhs.multiplications() + rhs.multiplications()
            }
            Expression::Downgrade { expr, .. } => expr.multiplications(),
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Literal(value) => write!(f, "{value}"),
            Expression::Read(var) => write!(f, "{var}"),
            Expression::Not(expr) => write!(f, "!{expr}"),
            Expression::BinaryOp { op, lhs, rhs } => {
                write!(f, "({lhs} {} {rhs})", op.symbol())
            }
            Expression::Downgrade { kind, to, expr } => {
                let keyword = match kind {
                    DowngradeKind::Declassify => "declassify",
                    DowngradeKind::Endorse => "endorse",
                };
                write!(f, "{keyword}({expr}, {to})")
            }
        }
    }
}
