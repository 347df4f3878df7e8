/// A bounded lattice. Implementors supply the bounds and the binary
/// operators; the ordering is derived from `join`.
pub trait Lattice: Clone + Eq {
    /// The least element.
    fn bottom() -> Self;

    /// The greatest element.
    fn top() -> Self;

    /// Least upper bound.
    fn join(&self, other: &Self) -> Self;

    /// Greatest lower bound.
    fn meet(&self, other: &Self) -> Self;
}
