//! System-level topologies that pull a merged ligand into simulation setups.

use super::error::{FormatError, FormatErrorKind};
use std::fmt::Write as _;

const FORCEFIELD_MARKER: &str = "; Include forcefield parameters";
const WATER_MARKER: &str = "; Include water topology";

/// File names a system topology uses to reference the merged ligand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemIncludes {
    /// Directory of the force field (e.g., `amber99sb-ildn.ff`).
    pub forcefield_dir: String,
    /// Companion atom-types file; `None` when the types are inlined in the ligand topology.
    pub atom_types_file: Option<String>,
    pub ligand_topology_file: String,
    pub molecule_name: String,
}

impl SystemIncludes {
    pub fn new(forcefield_dir: impl Into<String>) -> Self {
        Self {
            forcefield_dir: forcefield_dir.into(),
            atom_types_file: Some("ffMOL.itp".to_string()),
            ligand_topology_file: "merged.itp".to_string(),
            molecule_name: "MOL".to_string(),
        }
    }
}

/// Renders the topology of the merged ligand alone in a water box.
pub fn ligand_in_water_topology(includes: &SystemIncludes) -> String {
    let ff = &includes.forcefield_dir;
    let types = includes
        .atom_types_file
        .as_ref()
        .map(|file| format!("#include \"{file}\"\n"))
        .unwrap_or_default();
    format!(
        "; Include forcefield parameters
#include \"{ff}/forcefield.itp\"
{types}
; Include ligand topology
#include \"{ligand}\"

; Include water topology
#include \"{ff}/tip3p.itp\"

; Include topology for ions
#include \"{ff}/ions.itp\"

[ system ]
; Name
ligand in water

[ molecules ]
; Compound        #mols
{mol} 1
",
        ligand = includes.ligand_topology_file,
        mol = includes.molecule_name,
    )
}

/// Rewrites a protein system topology into a protein-ligand complex topology.
///
/// Everything before the force-field include comment is dropped. The atom-types include goes
/// right after the force-field include, the ligand topology include right before the water
/// include, the `Protein` system title is renamed and one ligand molecule is appended to
/// `[ molecules ]`.
///
/// # Errors
///
/// Returns [`FormatErrorKind::MissingSection`] if the force-field include comment is absent.
pub fn complex_topology(protein_topology: &str, includes: &SystemIncludes) -> Result<String, FormatError> {
    let mut out = String::with_capacity(protein_topology.len() + 256);
    let mut copying = false;
    let mut copied = 0usize;

    for line in protein_topology.lines() {
        if line == FORCEFIELD_MARKER {
            copying = true;
            copied = 0;
        }
        if line == WATER_MARKER {
            let _ = write!(
                out,
                "; Include ligand topology\n#include \"{}\"\n\n",
                includes.ligand_topology_file
            );
        }
        if !copying {
            continue;
        }
        if line == "Protein" {
            out.push_str("Protein-ligand complex in water\n");
            continue;
        }
        out.push_str(line);
        out.push('\n');
        copied += 1;
        if copied == 2 {
            if let Some(types) = &includes.atom_types_file {
                let _ = writeln!(out, "#include \"{types}\"");
            }
        }
    }

    if !copying {
        return Err(FormatErrorKind::MissingSection("forcefield include").into());
    }
    let _ = writeln!(out, "{:<20}1", includes.molecule_name);
    Ok(out)
}
