use super::merge::{system_includes, write_all};
use crate::core::io::check_extension;
use crate::core::io::gro::GroFile;
use crate::core::io::posres::PositionRestraints;
use crate::core::io::summary::complex_topology;
use crate::core::io::traits::{TextFile, WriteText};
use crate::core::models::topology::LigandTopology;
use crate::engine::assembly::{ComplexStructureAssembler, RelaxationInputs};
use crate::engine::config::{ConfigError, MergeConfig, RelaxationConfig};
use crate::engine::error::MergeError;
use crate::engine::md::MdEngine;
use crate::engine::progress::{Progress, ProgressReporter};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, instrument};

/// Files the structure fix reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FixInputs {
    /// Merged hybrid ligand coordinates (`.gro`).
    pub hybrid_coordinates: PathBuf,
    /// System topology (`.top`) that includes the hybrid ligand, used for the relaxation.
    pub hybrid_topology: PathBuf,
    /// Receptor coordinates (`.gro`), already placed in the simulation box.
    pub receptor_coordinates: PathBuf,
    /// Control parameters (`.mdp`) of the short relaxation.
    pub control: PathBuf,
    /// Merged ligand topology (`.itp`); required by the heavy-atom restraints and the complex
    /// topology outputs.
    #[serde(default)]
    pub ligand_topology: Option<PathBuf>,
}

/// Where the structure fix writes its results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FixOutputs {
    pub complex_coordinates: PathBuf,
    #[serde(default)]
    pub heavy_atom_restraints: Option<PathBuf>,
    #[serde(default)]
    pub complex_topology: Option<ComplexTopologyTarget>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct ComplexTopologyTarget {
    /// Protein system topology to rewrite.
    pub protein_topology: PathBuf,
    pub output: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixReport {
    pub ligand_atoms: usize,
    pub complex_atoms: usize,
    pub written: Vec<PathBuf>,
}

/// Relaxes a merged hybrid ligand and assembles it with its receptor.
///
/// The engine runs in the directory of the hybrid coordinates. Nothing is written unless the
/// relaxation succeeds, so an engine failure leaves no complex coordinate file behind.
///
/// # Errors
///
/// Returns [`MergeError::ExternalEngine`] when either engine phase fails or times out, or when
/// its coordinate artifact is missing; other variants for unreadable or malformed inputs.
#[instrument(skip_all, name = "fix_workflow")]
pub fn fix_structure(
    inputs: &FixInputs,
    outputs: &FixOutputs,
    engine: &dyn MdEngine,
    merge_config: &MergeConfig,
    relaxation: &RelaxationConfig,
    reporter: &ProgressReporter,
) -> Result<FixReport, MergeError> {
    // === Phase 1: Load inputs ===
    let loaded = reporter.phase("Loading inputs", || load_inputs(inputs, outputs, merge_config))?;

    // === Phase 2: Shift, relax and unshift ===
    let work_dir = match inputs.hybrid_coordinates.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let mut assembler = ComplexStructureAssembler::new(engine, relaxation);
    let mut relaxed = reporter.phase("Relaxation", || {
        assembler.relax(
            &loaded.hybrid,
            &RelaxationInputs {
                topology: &inputs.hybrid_topology,
                control: &inputs.control,
                work_dir: &work_dir,
            },
        )
    })?;
    relaxed.title = loaded.hybrid.title.clone();

    // === Phase 3: Assemble and write ===
    let complex = assembler.assemble(&loaded.receptor, &relaxed);
    info!(
        receptor_atoms = loaded.receptor.atom_count(),
        ligand_atoms = relaxed.atom_count(),
        "Assembled complex structure."
    );

    let mut files = vec![(outputs.complex_coordinates.clone(), complex.render())];
    if relaxation.update_hybrid_coordinates {
        files.push((inputs.hybrid_coordinates.clone(), relaxed.render()));
    }
    if let (Some(path), Some(topology)) = (&outputs.heavy_atom_restraints, &loaded.ligand_topology) {
        let restraints =
            PositionRestraints::for_heavy_atoms(topology, &merge_config.dummy_type_prefix);
        files.push((path.clone(), restraints.render()));
    }
    if let (Some(target), Some(text)) = (&outputs.complex_topology, loaded.complex_topology) {
        files.push((target.output.clone(), text));
    }

    let written = reporter.phase("Writing outputs", || write_all(&files))?;
    reporter.report(Progress::Message(format!(
        "Complex has {} atoms",
        complex.atom_count()
    )));

    Ok(FixReport {
        ligand_atoms: relaxed.atom_count(),
        complex_atoms: complex.atom_count(),
        written,
    })
}

struct LoadedInputs {
    hybrid: GroFile,
    receptor: GroFile,
    ligand_topology: Option<LigandTopology>,
    complex_topology: Option<String>,
}

fn read_gro(path: &Path) -> Result<GroFile, MergeError> {
    check_extension(path, "gro").map_err(|e| MergeError::format(path, e))?;
    GroFile::read_from_path(path).map_err(|e| MergeError::read(path, e))
}

fn load_inputs(
    inputs: &FixInputs,
    outputs: &FixOutputs,
    config: &MergeConfig,
) -> Result<LoadedInputs, MergeError> {
    let hybrid = read_gro(&inputs.hybrid_coordinates)?;
    let receptor = read_gro(&inputs.receptor_coordinates)?;
    check_extension(&inputs.hybrid_topology, "top")
        .map_err(|e| MergeError::format(&inputs.hybrid_topology, e))?;
    check_extension(&inputs.control, "mdp").map_err(|e| MergeError::format(&inputs.control, e))?;
    for path in [&inputs.hybrid_topology, &inputs.control] {
        if !path.is_file() {
            return Err(MergeError::io(
                path,
                std::io::Error::new(std::io::ErrorKind::NotFound, "file not found"),
            ));
        }
    }

    let needs_ligand = outputs.heavy_atom_restraints.is_some() || outputs.complex_topology.is_some();
    let ligand_topology = match (&inputs.ligand_topology, needs_ligand) {
        (Some(path), true) => Some(
            LigandTopology::read_from_path(path).map_err(|e| MergeError::read(path, e))?,
        ),
        (None, true) => return Err(ConfigError::MissingParameter("ligand-topology").into()),
        (_, false) => None,
    };

    let complex_topology = match (&outputs.complex_topology, &inputs.ligand_topology) {
        (Some(target), Some(ligand)) => {
            let protein = fs::read_to_string(&target.protein_topology)
                .map_err(|e| MergeError::io(&target.protein_topology, e))?;
            let forcefield_dir = forcefield_dir_of(&protein).unwrap_or_default();
            let includes = system_includes(&forcefield_dir, ligand, config);
            Some(
                complex_topology(&protein, &includes)
                    .map_err(|e| MergeError::format(&target.protein_topology, e))?,
            )
        }
        _ => None,
    };

    Ok(LoadedInputs {
        hybrid,
        receptor,
        ligand_topology,
        complex_topology,
    })
}

/// The force-field directory named by the first `#include "<dir>/forcefield.itp"` line.
fn forcefield_dir_of(topology: &str) -> Option<String> {
    topology.lines().find_map(|line| {
        let quoted = line.trim().strip_prefix("#include")?.trim().trim_matches('"');
        quoted
            .strip_suffix("/forcefield.itp")
            .map(|dir| dir.to_string())
    })
}
