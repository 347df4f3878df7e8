//! The surface language accepted by the middle end: a small imperative
//! language of labeled variable declarations, assignments, conditionals,
//! and assertions, with explicit downgrade expressions.

pub mod expression;
pub mod statement;

pub use expression::{BinaryOperator, DowngradeKind, Expression, Value};
pub use statement::{Statement, StatementKind};
