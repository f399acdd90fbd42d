use super::number::Number;
use std::fmt;

/// The interaction categories carried by a ligand topology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TermKind {
    Bond,
    Pair,
    Angle,
    Dihedral,
}

impl TermKind {
    /// All categories, in the order their sections are written.
    pub const ALL: [TermKind; 4] = [
        TermKind::Bond,
        TermKind::Pair,
        TermKind::Angle,
        TermKind::Dihedral,
    ];

    /// Number of atom indices that identify a term of this category.
    pub fn arity(self) -> usize {
        match self {
            TermKind::Bond | TermKind::Pair => 2,
            TermKind::Angle => 3,
            TermKind::Dihedral => 4,
        }
    }

    /// The section header this category is read from and written to.
    pub fn section_name(self) -> &'static str {
        match self {
            TermKind::Bond => "bonds",
            TermKind::Pair => "pairs",
            TermKind::Angle => "angles",
            TermKind::Dihedral => "dihedrals",
        }
    }
}

impl fmt::Display for TermKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.section_name())
    }
}

/// One row of a bonded section: the participating atoms, the function type and the
/// parameters of each state.
///
/// Atom indices are 1-based. In a single-ligand topology they address that ligand's atoms and
/// `params_b` is only present when the source file already carried B columns; in a hybrid
/// topology they address the hybrid index space and `params_b` is always set.
#[derive(Debug, Clone, PartialEq)]
pub struct BondedRecord {
    pub atoms: Vec<usize>,
    pub function: u32,
    pub params_a: Vec<Number>,
    pub params_b: Option<Vec<Number>>,
}

impl BondedRecord {
    pub fn new(atoms: Vec<usize>, function: u32, params_a: Vec<Number>) -> Self {
        Self {
            atoms,
            function,
            params_a,
            params_b: None,
        }
    }

    pub fn with_params_b(mut self, params_b: Vec<Number>) -> Self {
        self.params_b = Some(params_b);
        self
    }

    pub fn first_atom(&self) -> Option<usize> {
        self.atoms.first().copied()
    }

    pub fn last_atom(&self) -> Option<usize> {
        self.atoms.last().copied()
    }
}
