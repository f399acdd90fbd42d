use super::traits::WriteText;
use crate::core::models::bonded::TermKind;
use crate::core::models::hybrid::{HybridAtom, HybridTopology, MergedTerm};
use crate::core::models::number::Number;
use std::io::{self, Write};
use tracing::warn;

const ATOM_WIDTHS: [usize; 11] = [6, 12, 7, 7, 7, 7, 11, 11, 12, 11, 11];
const INDEX_WIDTHS: [usize; 4] = [6, 7, 7, 7];
const PARAM_WIDTH: usize = 15;
const DIHEDRAL_FUNCTION_WIDTH: usize = 5;

/// Default name of the position-restraint file included at the end of the topology.
pub const DEFAULT_RESTRAINT_INCLUDE: &str = "posre_Ligand.itp";

/// Serializes a [`HybridTopology`] in the column layout of GROMACS `.itp` files.
///
/// Sections are written in a fixed order (molecule header, atoms, bonds, pairs, angles,
/// dihedrals) separated by blank lines, followed by a conditional include of the restraint
/// file. Atom types go to a separate companion file by default (see
/// [`HybridTopologyWriter::write_atom_types`]); with `inline_atom_types` they are written at
/// the top of the topology instead.
#[derive(Debug, Clone)]
pub struct HybridTopologyWriter<'a> {
    topology: &'a HybridTopology,
    molecule_name: String,
    inline_atom_types: bool,
    restraint_include: String,
}

impl<'a> HybridTopologyWriter<'a> {
    pub fn new(topology: &'a HybridTopology) -> Self {
        Self {
            topology,
            molecule_name: topology.molecule.name.clone(),
            inline_atom_types: false,
            restraint_include: DEFAULT_RESTRAINT_INCLUDE.to_string(),
        }
    }

    pub fn molecule_name(mut self, name: impl Into<String>) -> Self {
        self.molecule_name = name.into();
        self
    }

    pub fn inline_atom_types(mut self, inline: bool) -> Self {
        self.inline_atom_types = inline;
        self
    }

    pub fn restraint_include(mut self, file_name: impl Into<String>) -> Self {
        self.restraint_include = file_name.into();
        self
    }

    /// Writes the merged topology.
    pub fn write_topology(&self, w: &mut impl Write) -> io::Result<()> {
        if self.inline_atom_types {
            self.write_atom_types(w)?;
            writeln!(w)?;
        }
        self.write_header(w)?;
        writeln!(w)?;
        self.write_atoms(w)?;
        for kind in TermKind::ALL {
            writeln!(w)?;
            self.write_terms(w, kind)?;
        }
        writeln!(w)?;
        writeln!(w, "; Include Position restraint file")?;
        writeln!(w, "#ifdef POSRES")?;
        writeln!(w, "#include \"{}\"", self.restraint_include)?;
        writeln!(w, "#endif")
    }

    /// Writes the `[ atomtypes ]` block: A's types, B's additional types and one zeroed entry
    /// per dummy type.
    pub fn write_atom_types(&self, w: &mut impl Write) -> io::Result<()> {
        writeln!(w, "[ atomtypes ]")?;
        writeln!(
            w,
            ";name   bond_type     mass     charge   ptype   sigma         epsilon"
        )?;
        for entry in &self.topology.atom_types {
            writeln!(w, " {}", entry.line)?;
        }
        for dummy in &self.topology.dummy_types {
            let name = &dummy.type_name;
            writeln!(
                w,
                " {name:<9}{name:<9} {:>9}{:>9}{:>4}  {:>14}{:>14}",
                "0.00000", "0.00000", "A", "0.00000e+00", "0.00000e+00"
            )?;
        }
        Ok(())
    }

    fn write_header(&self, w: &mut impl Write) -> io::Result<()> {
        writeln!(w, "[ moleculetype ]")?;
        writeln!(w, ";name            nrexcl")?;
        writeln!(w, "{}  {}", self.molecule_name, self.topology.molecule.exclusions)
    }

    fn write_atoms(&self, w: &mut impl Write) -> io::Result<()> {
        writeln!(w, " [ atoms ]")?;
        writeln!(
            w,
            ";   nr       type  resnr residue  atom   cgnr     charge       mass  typeB    chargeB      massB"
        )?;
        for atom in &self.topology.atoms {
            writeln!(w, "{}", format_atom(atom))?;
        }
        Ok(())
    }

    fn write_terms(&self, w: &mut impl Write, kind: TermKind) -> io::Result<()> {
        writeln!(w, " [ {} ]", kind.section_name())?;
        let columns = match kind {
            TermKind::Bond | TermKind::Pair => ";  ai    aj funct",
            TermKind::Angle => ";  ai    aj    ak funct",
            TermKind::Dihedral => ";  ai    aj    ak    al funct",
        };
        let params = match kind {
            TermKind::Dihedral => "            c0            c1            c2            c3            c4            c5",
            _ => "            c0            c1            c2            c3",
        };
        writeln!(w, "{columns}{params}")?;
        if kind == TermKind::Pair {
            let discarded = pairs_with_parameters(self.topology);
            if discarded > 0 {
                warn!(
                    pairs = discarded,
                    "Explicit [ pairs ] parameters are not written; pair interactions fall back to the force-field defaults."
                );
            }
        }
        for term in self.topology.terms(kind) {
            writeln!(w, "{}", format_term(kind, term))?;
        }
        Ok(())
    }
}

impl WriteText for HybridTopologyWriter<'_> {
    fn write_to(&self, writer: &mut impl Write) -> io::Result<()> {
        self.write_topology(writer)
    }
}

fn format_atom(atom: &HybridAtom) -> String {
    let w = &ATOM_WIDTHS;
    let mut line = format!(
        "{:>w0$}{:>w1$}{:>w2$}{:>w3$}{:>w4$}{:>w5$}{:>w6$}{:>w7$}",
        atom.index,
        atom.state_a.type_name,
        atom.residue_number,
        atom.residue_name,
        atom.name,
        atom.charge_group,
        atom.state_a.charge,
        atom.state_a.mass,
        w0 = w[0],
        w1 = w[1],
        w2 = w[2],
        w3 = w[3],
        w4 = w[4],
        w5 = w[5],
        w6 = w[6],
        w7 = w[7],
    );
    if atom.writes_state_b {
        line.push_str(&format!(
            "{:>w8$}{:>w9$}{:>w10$}",
            atom.state_b.type_name,
            atom.state_b.charge,
            atom.state_b.mass,
            w8 = w[8],
            w9 = w[9],
            w10 = w[10],
        ));
    }
    line
}

fn format_term(kind: TermKind, term: &MergedTerm) -> String {
    let record = &term.record;
    let mut line: String = record
        .atoms
        .iter()
        .zip(INDEX_WIDTHS)
        .map(|(index, width)| format!("{index:>width$}"))
        .collect();
    let states = record
        .params_a
        .iter()
        .chain(record.params_b.iter().flatten());

    match kind {
        TermKind::Dihedral => {
            line.push_str(&format!(
                "{:>width$}",
                record.function,
                width = DIHEDRAL_FUNCTION_WIDTH
            ));
            for param in states {
                line.push(' ');
                line.push_str(&param.compact());
            }
        }
        TermKind::Bond | TermKind::Pair | TermKind::Angle => {
            line.push_str(&format!("{:>7}", record.function));
            if kind != TermKind::Pair {
                for param in states {
                    line.push_str(&format!("{:>PARAM_WIDTH$}", fixed(param)));
                }
            }
        }
    }
    line
}

/// Number of pair rows carrying explicit parameters, which pair rows never write.
fn pairs_with_parameters(topology: &HybridTopology) -> usize {
    topology
        .pairs
        .iter()
        .filter(|term| {
            !term.record.params_a.is_empty()
                || term.record.params_b.as_ref().is_some_and(|p| !p.is_empty())
        })
        .count()
}

fn fixed(param: &Number) -> String {
    param.fixed(6)
}
