//! Core types shared across the Weir compiler: security principals, the
//! free-distributive-lattice label algebra, source locations, and the
//! interned names used by the surface language.

pub mod label;
pub mod lattice;
pub mod location;
pub mod names;

pub use label::{Jom, Label, Principal};
pub use lattice::Lattice;
pub use location::Location;
pub use names::{HostName, Variable};
