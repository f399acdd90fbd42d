use super::atom::AtomState;
use super::bonded::{BondedRecord, TermKind};
use super::topology::{AtomTypeEntry, MoleculeType};
use std::fmt;

/// One of the two alchemical end-states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    A,
    B,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::A => f.write_str("A"),
            Side::B => f.write_str("B"),
        }
    }
}

/// Where a hybrid atom comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provenance {
    /// Exists only in ligand A (source index in A). Dummy in state B.
    FromA(usize),
    /// Exists only in ligand B (source index in B). Dummy in state A.
    FromB(usize),
    /// The same physical atom in both ligands (source indices in A and B).
    Fused(usize, usize),
}

impl Provenance {
    pub fn a_index(self) -> Option<usize> {
        match self {
            Provenance::FromA(i) | Provenance::Fused(i, _) => Some(i),
            Provenance::FromB(_) => None,
        }
    }

    pub fn b_index(self) -> Option<usize> {
        match self {
            Provenance::FromB(j) | Provenance::Fused(_, j) => Some(j),
            Provenance::FromA(_) => None,
        }
    }

    pub fn is_fused(self) -> bool {
        matches!(self, Provenance::Fused(..))
    }

    /// Whether the atom is a dummy in one of the two end-states.
    pub fn has_dummy_state(self) -> bool {
        !self.is_fused()
    }
}

/// The canonical index space of a hybrid ligand.
///
/// Hybrid indices `1..=a_count` are exactly ligand A's source indices (each either `FromA`
/// or `Fused`), so A's bonded records address the hybrid space without translation. Atoms
/// that only exist in B follow as `FromB`, in ascending B source order.
///
/// Instances are only built by [`crate::engine::mapping::AtomIndexMapper`], which verifies
/// the bijection before handing one out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HybridAtomOrder {
    slots: Vec<Provenance>,
    b_to_hybrid: Vec<usize>,
    a_count: usize,
}

impl HybridAtomOrder {
    pub(crate) fn from_parts(slots: Vec<Provenance>, b_to_hybrid: Vec<usize>, a_count: usize) -> Self {
        Self {
            slots,
            b_to_hybrid,
            a_count,
        }
    }

    /// Total number of hybrid atoms, `|A| + |B-only|`.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn a_count(&self) -> usize {
        self.a_count
    }

    pub fn b_count(&self) -> usize {
        self.b_to_hybrid.len()
    }

    pub fn fused_count(&self) -> usize {
        self.slots.iter().filter(|p| p.is_fused()).count()
    }

    pub fn a_only_count(&self) -> usize {
        self.a_count - self.fused_count()
    }

    pub fn b_only_count(&self) -> usize {
        self.slots.len() - self.a_count
    }

    /// The provenance of a 1-based hybrid index.
    pub fn provenance(&self, hybrid: usize) -> Option<Provenance> {
        hybrid.checked_sub(1).and_then(|k| self.slots.get(k)).copied()
    }

    /// The hybrid index of an A source index (the identity on `1..=a_count`).
    pub fn hybrid_of_a(&self, a: usize) -> Option<usize> {
        (1..=self.a_count).contains(&a).then_some(a)
    }

    /// The hybrid index of a B source index.
    pub fn hybrid_of_b(&self, b: usize) -> Option<usize> {
        b.checked_sub(1).and_then(|k| self.b_to_hybrid.get(k)).copied()
    }

    /// Iterates `(hybrid_index, provenance)` in hybrid order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, Provenance)> + '_ {
        self.slots.iter().enumerate().map(|(k, p)| (k + 1, *p))
    }

    /// Iterates `(hybrid_index, b_source_index)` over the trailing B-only atoms.
    pub fn b_only(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.iter().filter_map(|(h, p)| match p {
            Provenance::FromB(j) => Some((h, j)),
            _ => None,
        })
    }

    /// Whether the atom at a hybrid index is a dummy in either end-state.
    pub fn is_dummy_in_either(&self, hybrid: usize) -> bool {
        self.provenance(hybrid).is_some_and(Provenance::has_dummy_state)
    }
}

/// A synthetic atom type standing for "this atom does not exist" on one side.
///
/// Named `<prefix><original-type>`; it has zero charge and keeps the mass of the real atom.
/// A companion `[ atomtypes ]` entry with zeroed Lennard-Jones parameters is emitted for each
/// distinct dummy type used.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DummyIdentity {
    pub type_name: String,
    pub original_type: String,
}

impl DummyIdentity {
    pub fn new(prefix: &str, original_type: &str) -> Self {
        Self {
            type_name: format!("{prefix}{original_type}"),
            original_type: original_type.to_string(),
        }
    }
}

/// One row of the hybrid `[ atoms ]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct HybridAtom {
    pub index: usize,
    pub provenance: Provenance,
    pub residue_number: i32,
    pub residue_name: String,
    pub name: String,
    pub charge_group: usize,
    pub state_a: AtomState,
    pub state_b: AtomState,
    /// Whether the B columns are written. Always true for one-sided atoms; for fused atoms only
    /// when B differs from A.
    pub writes_state_b: bool,
}

/// Where a merged bonded row came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TermOrigin {
    /// Only in A; the B columns model the term being absent.
    StateA,
    /// Only in B; the A columns model the term being absent.
    StateB,
    /// Present in both; A's row with B's parameters attached.
    Fused,
    /// A derived row emitted after a one-sided dihedral that touches a dummy atom.
    Companion,
}

/// A dual-state row of a merged bonded section.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedTerm {
    pub record: BondedRecord,
    pub origin: TermOrigin,
}

/// What was done to a dihedral companion row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReviewAction {
    /// Force constants of the two states were swapped.
    Swapped,
    /// The nonzero force constant was pinned to zero, leaving the term off in both states.
    Pinned,
}

/// A dihedral companion row recorded for domain-expert review.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DihedralReview {
    pub atoms: Vec<usize>,
    pub function: u32,
    pub source: Side,
    pub action: ReviewAction,
}

impl DihedralReview {
    /// Pinned companions silence the term in both states, unlike the swap applied elsewhere.
    pub fn is_divergent(&self) -> bool {
        self.action == ReviewAction::Pinned
    }
}

/// The complete merged topology of one edge, ready for serialization.
#[derive(Debug, Clone, PartialEq)]
pub struct HybridTopology {
    pub molecule: MoleculeType,
    /// A's atom types followed by B's types whose names are absent from A.
    pub atom_types: Vec<AtomTypeEntry>,
    /// Distinct dummy types introduced, in order of first use.
    pub dummy_types: Vec<DummyIdentity>,
    pub atoms: Vec<HybridAtom>,
    pub bonds: Vec<MergedTerm>,
    pub pairs: Vec<MergedTerm>,
    pub angles: Vec<MergedTerm>,
    pub dihedrals: Vec<MergedTerm>,
    pub reviews: Vec<DihedralReview>,
}

impl HybridTopology {
    pub fn atom_count(&self) -> usize {
        self.atoms.len()
    }

    pub fn terms(&self, kind: TermKind) -> &[MergedTerm] {
        match kind {
            TermKind::Bond => &self.bonds,
            TermKind::Pair => &self.pairs,
            TermKind::Angle => &self.angles,
            TermKind::Dihedral => &self.dihedrals,
        }
    }

    pub fn dummy_atom_count(&self) -> usize {
        self.atoms
            .iter()
            .filter(|a| a.provenance.has_dummy_state())
            .count()
    }
}
