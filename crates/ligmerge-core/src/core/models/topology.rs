use super::atom::AtomRecord;
use super::bonded::{BondedRecord, TermKind};

/// The sections of a ligand topology file that the merge pipeline understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SectionKind {
    AtomTypes,
    MoleculeType,
    Atoms,
    Bonds,
    Pairs,
    Angles,
    Dihedrals,
}

impl SectionKind {
    /// Resolves a section header (the text between `[` and `]`), case-insensitively.
    pub fn from_header(header: &str) -> Option<Self> {
        match header.trim().to_ascii_lowercase().as_str() {
            "atomtypes" => Some(Self::AtomTypes),
            "moleculetype" => Some(Self::MoleculeType),
            "atoms" => Some(Self::Atoms),
            "bonds" => Some(Self::Bonds),
            "pairs" => Some(Self::Pairs),
            "angles" => Some(Self::Angles),
            "dihedrals" => Some(Self::Dihedrals),
            _ => None,
        }
    }

    pub fn header(self) -> &'static str {
        match self {
            Self::AtomTypes => "atomtypes",
            Self::MoleculeType => "moleculetype",
            Self::Atoms => "atoms",
            Self::Bonds => "bonds",
            Self::Pairs => "pairs",
            Self::Angles => "angles",
            Self::Dihedrals => "dihedrals",
        }
    }

    pub fn term_kind(self) -> Option<TermKind> {
        match self {
            Self::Bonds => Some(TermKind::Bond),
            Self::Pairs => Some(TermKind::Pair),
            Self::Angles => Some(TermKind::Angle),
            Self::Dihedrals => Some(TermKind::Dihedral),
            _ => None,
        }
    }
}

/// A data line of a topology section, with its trailing comment removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    /// The 1-based line number in the source file.
    pub line: usize,
    /// The record text without any `;` comment, trimmed.
    pub content: String,
}

impl RawRecord {
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.content.split_whitespace()
    }
}

/// One section of a topology file as it was read, before typed interpretation.
///
/// Sections that appear several times (acpype writes propers and impropers as two
/// `[ dihedrals ]` blocks) are concatenated into a single instance in file order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopologySection {
    /// The header text as written in the file (e.g., "atoms").
    pub header: String,
    pub records: Vec<RawRecord>,
}

/// A force-field atom type definition from `[ atomtypes ]`.
///
/// The definition line is carried verbatim; only the name is interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtomTypeEntry {
    pub name: String,
    pub line: String,
}

/// The `[ moleculetype ]` header of a topology.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoleculeType {
    pub name: String,
    /// Number of bonds across which non-bonded interactions are excluded.
    pub exclusions: u32,
}

/// Atom and bond counts declared by a companion structure file for a topology.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeclaredCounts {
    pub atoms: usize,
    pub bonds: usize,
}

/// The typed contents of a single-ligand topology.
///
/// Invariant: `atoms[k].index == k + 1` for every `k`, and every index referenced by a
/// bonded record lies in `1..=atoms.len()`. The parser enforces both.
#[derive(Debug, Clone, PartialEq)]
pub struct LigandTopology {
    pub atom_types: Vec<AtomTypeEntry>,
    pub molecule: MoleculeType,
    pub atoms: Vec<AtomRecord>,
    pub bonds: Vec<BondedRecord>,
    pub pairs: Vec<BondedRecord>,
    pub angles: Vec<BondedRecord>,
    pub dihedrals: Vec<BondedRecord>,
}

impl LigandTopology {
    pub fn atom_count(&self) -> usize {
        self.atoms.len()
    }

    /// Looks up an atom by its 1-based source index.
    pub fn atom(&self, index: usize) -> Option<&AtomRecord> {
        index.checked_sub(1).and_then(|k| self.atoms.get(k))
    }

    pub fn terms(&self, kind: TermKind) -> &[BondedRecord] {
        match kind {
            TermKind::Bond => &self.bonds,
            TermKind::Pair => &self.pairs,
            TermKind::Angle => &self.angles,
            TermKind::Dihedral => &self.dihedrals,
        }
    }

    /// For every atom, the hydrogens bonded to it, sorted by source index.
    ///
    /// The returned vector is indexed by source index; slot 0 is unused and empty.
    pub fn bonded_hydrogens(&self) -> Vec<Vec<usize>> {
        let mut neighbours = vec![Vec::new(); self.atoms.len() + 1];
        for bond in &self.bonds {
            if let [i, j] = bond.atoms[..] {
                if self.atom(j).is_some_and(AtomRecord::is_hydrogen) {
                    if let Some(group) = neighbours.get_mut(i) {
                        group.push(j);
                    }
                }
                if self.atom(i).is_some_and(AtomRecord::is_hydrogen) {
                    if let Some(group) = neighbours.get_mut(j) {
                        group.push(i);
                    }
                }
            }
        }
        for group in &mut neighbours {
            group.sort_unstable();
            group.dedup();
        }
        neighbours
    }
}
