//! Errors reported by the Weir compiler. Every fallible pass returns
//! [`CompileError`]; the variants carry enough context to point the user
//! at the offending declaration or flow.

use thiserror::Error;
use weir_types::{HostName, Label, Location, Variable};

pub type CompileResult<T> = Result<T, CompileError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    #[error("Variable \"{var}\" is read before being declared at {location}.")]
    UndeclaredVariable { var: Variable, location: Location },

    #[error(
        "Variable \"{var}\" is declared twice: at {location}, and previously at {previous}."
    )]
    RedeclaredVariable {
        var: Variable,
        location: Location,
        previous: Location,
    },

    #[error("Host \"{host}\" is declared more than once in the trust configuration.")]
    RedeclaredHost { host: HostName },

    #[error(
        "Illegal downgrade at {location}: data labeled {from} cannot be downgraded to {to}."
    )]
    LabelViolation {
        location: Location,
        from: Label,
        to: Label,
    },

    #[error(
        "No protocol among the declared hosts is trusted enough to run \
         the computation at {location}, which requires {label}."
    )]
    NoProtocolCandidates { location: Location, label: Label },

    #[error(
        "No subset of the hosts running {from_protocol} has enough integrity \
         to send its value to {to}."
    )]
    CommunicationUnsatisfiable { from_protocol: String, to: String },

    #[error("Internal compiler error: {0}")]
    Internal(String),
}
