use super::traits::WriteText;
use crate::core::models::atom::is_hydrogen_type;
use crate::core::models::hybrid::HybridTopology;
use crate::core::models::topology::LigandTopology;
use std::io::{self, Write};

/// Force constant (kJ mol⁻¹ nm⁻²) holding real atoms in place while dummies relax.
pub const RELAXATION_FORCE: u32 = 100_000;
/// Force constant (kJ mol⁻¹ nm⁻²) for heavy-atom restraints during equilibration.
pub const HEAVY_ATOM_FORCE: u32 = 1_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Layout {
    Wide,
    Narrow,
}

/// A `[ position_restraints ]` block with one isotropic restraint per listed atom.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionRestraints {
    atoms: Vec<usize>,
    force: u32,
    layout: Layout,
}

impl PositionRestraints {
    /// Restrains every hybrid atom that is real in state A.
    ///
    /// Only the B-only dummies are left free, so a short minimization settles them against
    /// the fixed A scaffold.
    pub fn for_relaxation(topology: &HybridTopology) -> Self {
        let atoms = topology
            .atoms
            .iter()
            .filter(|a| a.provenance.a_index().is_some())
            .map(|a| a.index)
            .collect();
        Self {
            atoms,
            force: RELAXATION_FORCE,
            layout: Layout::Wide,
        }
    }

    /// Restrains the heavy atoms of a (merged) topology.
    ///
    /// The A-state type decides; a dummy prefix is stripped before the hydrogen test so that
    /// dummy hydrogens stay unrestrained as well.
    pub fn for_heavy_atoms(topology: &LigandTopology, dummy_prefix: &str) -> Self {
        let atoms = topology
            .atoms
            .iter()
            .filter(|a| {
                let type_name = a.type_name();
                let base = type_name.strip_prefix(dummy_prefix).unwrap_or(type_name);
                !is_hydrogen_type(base)
            })
            .map(|a| a.index)
            .collect();
        Self {
            atoms,
            force: HEAVY_ATOM_FORCE,
            layout: Layout::Narrow,
        }
    }

    pub fn atoms(&self) -> &[usize] {
        &self.atoms
    }

    pub fn force(&self) -> u32 {
        self.force
    }
}

impl WriteText for PositionRestraints {
    fn write_to(&self, w: &mut impl Write) -> io::Result<()> {
        writeln!(w, "[ position_restraints ]")?;
        writeln!(w, "; atom  type      fx      fy      fz")?;
        let k = self.force;
        for atom in &self.atoms {
            match self.layout {
                Layout::Wide => writeln!(w, "{atom:>6}{:>6}{k:>8}{k:>8}{k:>8}", 1)?,
                Layout::Narrow => writeln!(w, "{atom:>6}{:>6}{k:>6}{k:>6}{k:>6}", 1)?,
            }
        }
        Ok(())
    }
}
