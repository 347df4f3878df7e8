use serde::{Deserialize, Serialize};
use std::fmt;

/// A line/column position in the source program. Compiler-generated
/// constructs carry the zero location.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Location {
    pub line: u32,
    pub column: u32,
}

impl Location {
    pub fn new(line: u32, column: u32) -> Self {
        Location { line, column }
    }

    /// The location attached to constructs that have no source position.
    pub fn generated() -> Self {
        Location { line: 0, column: 0 }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Location::generated() {
            f.write_str("<generated>")
        } else {
            write!(f, "{}:{}", self.line, self.column)
        }
    }
}
