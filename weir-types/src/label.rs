//! Security labels over the free distributive lattice of principals.
//!
//! A [`Jom`] ("join of meets") is a disjunction of conjunctions of
//! principals, kept in normal form as an antichain of clauses. A [`Label`]
//! pairs two such formulas, one tracking confidentiality and one tracking
//! integrity. The two components move in opposite directions under
//! information flow, which is what makes [`Label::join`] take the *meet*
//! of the confidentiality components.

use crate::lattice::Lattice;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// An atomic principal. In Weir programs every host doubles as a
/// principal, but the algebra does not care where principals come from.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Principal(String);

impl Principal {
    pub fn new(name: impl Into<String>) -> Self {
        Principal(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Principal {
    fn from(name: &str) -> Self {
        Principal::new(name)
    }
}

/// An element of the free distributive lattice over [`Principal`]s,
/// represented as a join of meets: a set of clauses, each clause a set of
/// principals read as their conjunction.
///
/// The representation is kept normalized: no clause is a superset of
/// another. Under this invariant structural equality coincides with
/// lattice equality.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Jom {
    clauses: BTreeSet<BTreeSet<Principal>>,
}

impl Jom {
    /// The least element: the empty join. No principal, however trusted,
    /// acts for anything above it.
    pub fn zero() -> Self {
        Jom {
            clauses: BTreeSet::new(),
        }
    }

    /// The greatest element: the empty meet, for which every principal
    /// acts.
    pub fn one() -> Self {
        let mut clauses = BTreeSet::new();
        clauses.insert(BTreeSet::new());
        Jom { clauses }
    }

    /// The formula consisting of a single principal.
    pub fn atom(principal: Principal) -> Self {
        let mut clause = BTreeSet::new();
        clause.insert(principal);
        let mut clauses = BTreeSet::new();
        clauses.insert(clause);
        Jom { clauses }
    }

    /// Builds a formula from raw clauses, normalizing away subsumed ones.
    pub fn from_clauses<I>(clauses: I) -> Self
    where
        I: IntoIterator<Item = BTreeSet<Principal>>,
    {
        let clauses: BTreeSet<BTreeSet<Principal>> = clauses.into_iter().collect();
        Jom { clauses }.normalized()
    }

    fn normalized(self) -> Self {
        let clauses: BTreeSet<BTreeSet<Principal>> = self
            .clauses
            .iter()
            .filter(|clause| {
                !self
                    .clauses
                    .iter()
                    .any(|other| other != *clause && other.is_subset(clause))
            })
            .cloned()
            .collect();
        Jom { clauses }
    }

    pub fn is_zero(&self) -> bool {
        self.clauses.is_empty()
    }

    pub fn is_one(&self) -> bool {
        self.clauses.len() == 1 && self.clauses.iter().all(BTreeSet::is_empty)
    }

    pub fn clauses(&self) -> impl Iterator<Item = &BTreeSet<Principal>> {
        self.clauses.iter()
    }

    /// All principals mentioned anywhere in the formula.
    pub fn principals(&self) -> impl Iterator<Item = &Principal> {
        self.clauses.iter().flatten()
    }

    /// Least upper bound: the union of the two clause sets.
    pub fn join(&self, other: &Jom) -> Jom {
        Jom {
            clauses: self.clauses.union(&other.clauses).cloned().collect(),
        }
        .normalized()
    }

    /// Greatest lower bound: the pairwise union of clauses, distributing
    /// each conjunction over the other side's disjunction.
    pub fn meet(&self, other: &Jom) -> Jom {
        let mut clauses = BTreeSet::new();
        for left in &self.clauses {
            for right in &other.clauses {
                clauses.insert(left.union(right).cloned().collect());
            }
        }
        Jom { clauses }.normalized()
    }

    /// Whether this formula carries at least as much authority as
    /// `other`: every clause here is a superset of some clause of
    /// `other`. For normalized formulas this is exactly the lattice
    /// ordering `self <= other`.
    pub fn acts_for(&self, other: &Jom) -> bool {
        self.clauses
            .iter()
            .all(|mine| other.clauses.iter().any(|theirs| mine.is_superset(theirs)))
    }
}

impl fmt::Display for Jom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_zero() {
            return f.write_str("0");
        }
        if self.is_one() {
            return f.write_str("1");
        }
        let mut first_clause = true;
        for clause in &self.clauses {
            if !first_clause {
                f.write_str(" | ")?;
            }
            first_clause = false;
            let mut first = true;
            for principal in clause {
                if !first {
                    f.write_str(" & ")?;
                }
                first = false;
                write!(f, "{principal}")?;
            }
        }
        Ok(())
    }
}

/// A security label: a confidentiality formula paired with an integrity
/// formula.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Label {
    confidentiality: Jom,
    integrity: Jom,
}

impl Label {
    pub fn new(confidentiality: Jom, integrity: Jom) -> Self {
        Label {
            confidentiality,
            integrity,
        }
    }

    /// The label of a single principal trusted with both secrecy and
    /// integrity, as used for host trust declarations.
    pub fn principal(principal: Principal) -> Self {
        Label {
            confidentiality: Jom::atom(principal.clone()),
            integrity: Jom::atom(principal),
        }
    }

    pub fn confidentiality_component(&self) -> &Jom {
        &self.confidentiality
    }

    pub fn integrity_component(&self) -> &Jom {
        &self.integrity
    }

    /// Projects out the confidentiality component, paired with bottom's
    /// integrity.
    pub fn confidentiality(&self) -> Label {
        Label {
            confidentiality: self.confidentiality.clone(),
            integrity: Jom::zero(),
        }
    }

    /// Projects out the integrity component, paired with bottom's
    /// confidentiality.
    pub fn integrity(&self) -> Label {
        Label {
            confidentiality: Jom::one(),
            integrity: self.integrity.clone(),
        }
    }

    /// Conjunction of authority: the combined label speaks for both
    /// operands. Pools trust, strengthening both components.
    pub fn and(&self, other: &Label) -> Label {
        Label {
            confidentiality: self.confidentiality.meet(&other.confidentiality),
            integrity: self.integrity.meet(&other.integrity),
        }
    }

    /// Disjunction of authority: the combined label speaks only for what
    /// both operands individually speak for.
    pub fn or(&self, other: &Label) -> Label {
        Label {
            confidentiality: self.confidentiality.join(&other.confidentiality),
            integrity: self.integrity.join(&other.integrity),
        }
    }

    /// Whether this label's authority subsumes `other`'s, component-wise.
    pub fn acts_for(&self, other: &Label) -> bool {
        self.confidentiality.acts_for(&other.confidentiality)
            && self.integrity.acts_for(&other.integrity)
    }

    /// Whether authority at this label can host data carrying `label`:
    /// the data's confidentiality clauses must all be covered, and any
    /// integrity basis the data claims must be implied by ours. Data
    /// claiming no integrity basis can be hosted by anyone.
    pub fn dominates(&self, label: &Label) -> bool {
        self.confidentiality.acts_for(&label.confidentiality)
            && (label.integrity.is_zero() || self.integrity.acts_for(&label.integrity))
    }

    /// The information-flow ordering: data at `self` may be relabeled to
    /// `other` without a downgrade. Confidentiality may only grow
    /// stronger along a flow while integrity may only grow weaker.
    pub fn flows_to(&self, other: &Label) -> bool {
        other.confidentiality.acts_for(&self.confidentiality)
            && self.integrity.acts_for(&other.integrity)
    }
}

impl Lattice for Label {
    /// Public and fully trusted.
    fn bottom() -> Self {
        Label {
            confidentiality: Jom::one(),
            integrity: Jom::zero(),
        }
    }

    /// Secret and fully untrusted.
    fn top() -> Self {
        Label {
            confidentiality: Jom::zero(),
            integrity: Jom::one(),
        }
    }

    fn join(&self, other: &Self) -> Self {
        Label {
            confidentiality: self.confidentiality.meet(&other.confidentiality),
            integrity: self.integrity.join(&other.integrity),
        }
    }

    fn meet(&self, other: &Self) -> Self {
        Label {
            confidentiality: self.confidentiality.join(&other.confidentiality),
            integrity: self.integrity.meet(&other.integrity),
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}; {}}}", self.confidentiality, self.integrity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn p(name: &str) -> Principal {
        Principal::new(name)
    }

    fn atom(name: &str) -> Jom {
        Jom::atom(p(name))
    }

    fn sample_joms() -> Vec<Jom> {
        let a = atom("a");
        let b = atom("b");
        let c = atom("c");
        vec![
            Jom::zero(),
            Jom::one(),
            a.clone(),
            b.clone(),
            a.meet(&b),
            a.join(&b),
            a.meet(&b).join(&c),
            a.join(&b).meet(&c),
        ]
    }

    fn sample_labels() -> Vec<Label> {
        let alice = Label::principal(p("alice"));
        let bob = Label::principal(p("bob"));
        vec![
            Label::bottom(),
            Label::top(),
            alice.clone(),
            bob.clone(),
            alice.and(&bob),
            alice.or(&bob),
            alice.confidentiality(),
            alice.integrity(),
            Lattice::join(&alice, &bob),
            Lattice::meet(&alice, &bob),
        ]
    }

    #[test]
    fn normalization_removes_subsumed_clauses() {
        let a: BTreeSet<Principal> = [p("a")].into_iter().collect();
        let ab: BTreeSet<Principal> = [p("a"), p("b")].into_iter().collect();
        assert_eq!(Jom::from_clauses([a.clone(), ab]), Jom::from_clauses([a]));
    }

    #[test]
    fn zero_and_one_are_units() {
        for x in sample_joms() {
            assert_eq!(Jom::zero().join(&x), x);
            assert_eq!(Jom::one().meet(&x), x);
            assert_eq!(Jom::one().join(&x), Jom::one());
            assert_eq!(Jom::zero().meet(&x), Jom::zero());
        }
    }

    #[test]
    fn lattice_laws() {
        for x in sample_joms() {
            assert_eq!(x.join(&x), x);
            assert_eq!(x.meet(&x), x);
            for y in sample_joms() {
                assert_eq!(x.join(&y), y.join(&x));
                assert_eq!(x.meet(&y), y.meet(&x));
                assert_eq!(x.join(&x.meet(&y)), x);
                assert_eq!(x.meet(&x.join(&y)), x);
                for z in sample_joms() {
                    assert_eq!(x.join(&y).join(&z), x.join(&y.join(&z)));
                    assert_eq!(x.meet(&y).meet(&z), x.meet(&y.meet(&z)));
                }
            }
        }
    }

    #[test]
    fn acts_for_is_the_lattice_ordering() {
        for x in sample_joms() {
            for y in sample_joms() {
                assert_eq!(x.acts_for(&y), x.join(&y) == y, "{x} acts for {y}");
            }
        }
    }

    #[test]
    fn conjunction_outranks_its_conjuncts() {
        let a = atom("a");
        let b = atom("b");
        let both = a.meet(&b);
        let either = a.join(&b);
        assert!(both.acts_for(&a));
        assert!(both.acts_for(&b));
        assert!(!a.acts_for(&both));
        assert!(a.acts_for(&either));
        assert!(!either.acts_for(&a));
        assert!(Jom::zero().acts_for(&both));
        assert!(either.acts_for(&Jom::one()));
    }

    #[test]
    fn flows_to_matches_join_absorption() {
        for x in sample_labels() {
            for y in sample_labels() {
                assert_eq!(
                    x.flows_to(&y),
                    Lattice::join(&x, &y) == y,
                    "{x} flows to {y}"
                );
            }
        }
    }

    #[test]
    fn bottom_flows_everywhere_and_top_nowhere() {
        for x in sample_labels() {
            assert!(Label::bottom().flows_to(&x));
            assert!(x.flows_to(&Label::top()));
            if x != Label::top() {
                assert!(!Label::top().flows_to(&x));
            }
        }
    }

    #[test]
    fn secrets_do_not_flow_to_public_sinks() {
        let alice_secret = Label::principal(p("alice")).confidentiality();
        assert!(!alice_secret.flows_to(&Label::bottom()));
        assert!(Label::bottom().flows_to(&alice_secret));
    }

    #[test]
    fn integrity_only_weakens_along_flows() {
        let alice_integrity = Label::principal(p("alice")).integrity();
        assert!(!alice_integrity.flows_to(&Label::bottom()));
        assert!(Label::bottom().flows_to(&alice_integrity));
    }

    #[test]
    fn pooled_trust_covers_joint_authority() {
        let alice = Label::principal(p("alice"));
        let bob = Label::principal(p("bob"));
        let joint = alice.and(&bob);
        assert!(joint.acts_for(&alice));
        assert!(joint.acts_for(&bob));
        assert!(!alice.acts_for(&joint));

        // Replicating across both hosts strengthens integrity but weakens
        // confidentiality, so it falls short of joint authority.
        let replicated = Lattice::meet(&alice, &bob);
        assert!(!replicated.acts_for(&joint));
        assert!(replicated.integrity().acts_for(&joint.integrity()));
        assert!(!replicated.confidentiality().acts_for(&joint.confidentiality()));
    }

    #[test]
    fn either_principal_satisfies_a_disjunction() {
        let alice = Label::principal(p("alice"));
        let bob = Label::principal(p("bob"));
        let either = alice.or(&bob);
        assert!(alice.acts_for(&either));
        assert!(bob.acts_for(&either));
        assert!(!either.acts_for(&alice));
    }

    #[test]
    fn domination_checks_both_components() {
        let alice = Label::principal(p("alice"));
        let bob = Label::principal(p("bob"));
        let joint = alice.and(&bob);

        // Anyone can host public data with no integrity claim.
        assert!(alice.dominates(&Label::bottom()));
        assert!(bob.dominates(&Label::bottom()));

        // A host dominates its own label but not a stranger's.
        assert!(alice.dominates(&alice));
        assert!(!bob.dominates(&alice));

        // Joint requirements need pooled authority.
        assert!(!alice.dominates(&joint));
        assert!(joint.dominates(&joint));

        // Replication gains joint integrity but not joint secrecy.
        let replicated = Lattice::meet(&alice, &bob);
        assert!(replicated.dominates(&joint.integrity()));
        assert!(!replicated.dominates(&joint));

        // Either-of requirements are met by each principal alone.
        let either = alice.or(&bob);
        assert!(alice.dominates(&either));
        assert!(bob.dominates(&either));
    }

    #[test]
    fn projections_recombine_under_join() {
        for x in sample_labels() {
            assert_eq!(Lattice::join(&x.confidentiality(), &x.integrity()), x);
        }
    }
}
