use super::number::Number;

/// The force-field identity of an atom in one alchemical end-state.
///
/// An atom of a single-ligand topology has exactly one state. Rows of the hybrid topology
/// carry two: the state in A and the state in B, one of which may be a dummy.
#[derive(Debug, Clone, PartialEq)]
pub struct AtomState {
    /// The force-field atom type (e.g., "c3", "hc").
    pub type_name: String,
    /// The partial charge in elementary charge units.
    pub charge: Number,
    /// The atomic mass in atomic mass units.
    pub mass: Number,
}

impl AtomState {
    pub fn new(type_name: impl Into<String>, charge: Number, mass: Number) -> Self {
        Self {
            type_name: type_name.into(),
            charge,
            mass,
        }
    }

    /// The dummy counterpart of this state: prefixed type, zero charge, same mass.
    ///
    /// Keeping the mass makes the dummy follow the real atom dynamically while it carries no
    /// electrostatics and only the Lennard-Jones parameters of the (zeroed) dummy type.
    pub fn to_dummy(&self, prefix: &str) -> Self {
        Self {
            type_name: format!("{prefix}{}", self.type_name),
            charge: Number::zero_charge(),
            mass: self.mass.clone(),
        }
    }

    /// Whether the atom type denotes a hydrogen.
    ///
    /// GAFF-family types name hydrogens with a leading `h` (`hc`, `ha`, `ho`, `hn`, ...).
    /// Dummy prefixes are not stripped here; callers that need the rule on dummy types use
    /// [`is_hydrogen_type`] on the unprefixed name.
    pub fn is_hydrogen(&self) -> bool {
        is_hydrogen_type(&self.type_name)
    }
}

/// Whether a force-field atom type names a hydrogen (leading `h` or `H`).
pub fn is_hydrogen_type(type_name: &str) -> bool {
    type_name.starts_with(['h', 'H'])
}

/// One row of the `[ atoms ]` section of a single-ligand topology.
#[derive(Debug, Clone, PartialEq)]
pub struct AtomRecord {
    /// The 1-based index of the atom; dense and sequential within its topology.
    pub index: usize,
    /// The residue number the atom belongs to.
    pub residue_number: i32,
    /// The residue name (e.g., "MOL").
    pub residue_name: String,
    /// The atom name (e.g., "C1", "H12").
    pub name: String,
    /// The charge-group number.
    pub charge_group: usize,
    /// The primary (state A) parameters of the atom.
    pub state: AtomState,
    /// Explicit state B columns, if the source topology already carried them.
    pub state_b: Option<AtomState>,
}

impl AtomRecord {
    pub fn type_name(&self) -> &str {
        &self.state.type_name
    }

    pub fn is_hydrogen(&self) -> bool {
        self.state.is_hydrogen()
    }
}
