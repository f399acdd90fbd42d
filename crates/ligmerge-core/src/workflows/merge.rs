use super::poses::{PoseSource, SelectedPose, extract_pose};
use crate::core::io::error::FormatErrorKind;
use crate::core::io::gro::GroFile;
use crate::core::io::itp::HybridTopologyWriter;
use crate::core::io::mol2::Mol2Structure;
use crate::core::io::posres::PositionRestraints;
use crate::core::io::summary::{SystemIncludes, ligand_in_water_topology};
use crate::core::io::traits::{TextFile, WriteText};
use crate::core::io::{check_extension, write_all_atomically};
use crate::core::models::hybrid::{DihedralReview, HybridTopology, Side};
use crate::core::models::topology::LigandTopology;
use crate::engine::config::{AtomTypesPlacement, MergeConfig};
use crate::engine::error::MergeError;
use crate::engine::mapping::AtomIndexMapper;
use crate::engine::merge::{TopologyMerger, check_headers, check_single_state};
use crate::engine::oracle::AtomCorrespondenceOracle;
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::structure::{StructureMerger, StructureMismatch};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, instrument};

/// The three files describing one end-state ligand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct LigandFiles {
    /// Topology (`.itp`).
    pub topology: PathBuf,
    /// 3D structure (`.mol2`) handed to the correspondence oracle.
    pub structure: PathBuf,
    /// Coordinates (`.gro`) in topology atom order.
    pub coordinates: PathBuf,
    /// Docking output to take the ligand pose from. The selected pose is written to
    /// `structure` and `coordinates` before they are read.
    #[serde(default)]
    pub pose: Option<PoseSource>,
}

/// Where a merge writes its results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct MergeOutputs {
    pub topology: PathBuf,
    pub coordinates: PathBuf,
    /// Optional restraint file holding every real A atom during the relaxation.
    #[serde(default)]
    pub relaxation_restraints: Option<PathBuf>,
    /// Optional ligand-in-water system topology referencing the merged topology.
    #[serde(default)]
    pub water_topology: Option<WaterTopology>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct WaterTopology {
    pub path: PathBuf,
    /// Force-field directory as it appears in `#include` lines (e.g., `amber99sb-ildn.ff`).
    pub forcefield_dir: String,
}

/// The include names a system topology needs to pull in a merged ligand.
pub fn system_includes(
    forcefield_dir: &str,
    ligand_topology: &Path,
    config: &MergeConfig,
) -> SystemIncludes {
    SystemIncludes {
        forcefield_dir: forcefield_dir.to_string(),
        atom_types_file: match &config.atom_types {
            AtomTypesPlacement::Companion(file_name) => Some(file_name.clone()),
            AtomTypesPlacement::Inline => None,
        },
        ligand_topology_file: ligand_topology
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
        molecule_name: config.molecule_name.clone(),
    }
}

/// Summary of a completed merge.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeReport {
    pub atom_count: usize,
    pub fused_atoms: usize,
    pub a_only_atoms: usize,
    pub b_only_atoms: usize,
    pub dummy_types: usize,
    /// Poses extracted for A and B, when they were drawn from docking output.
    pub pose_a: Option<SelectedPose>,
    pub pose_b: Option<SelectedPose>,
    /// Dihedral companion rows, divergent ones included, for expert review.
    pub reviews: Vec<DihedralReview>,
    /// Files written, in write order.
    pub written: Vec<PathBuf>,
}

impl MergeReport {
    pub fn divergent_reviews(&self) -> impl Iterator<Item = &DihedralReview> {
        self.reviews.iter().filter(|r| r.is_divergent())
    }
}

/// Builds the hybrid topology and coordinates of ligands A and B.
///
/// All outputs are rendered in memory first and only then written, each through a temporary
/// sibling file, so a failure at any stage before writing leaves the output paths untouched.
///
/// # Errors
///
/// Returns [`MergeError`] naming the offending file for malformed inputs, count mismatches
/// between a topology and its structure or coordinates, an inconsistent correspondence, or
/// an oracle failure.
#[instrument(skip_all, name = "merge_workflow")]
pub fn merge_topologies(
    a: &LigandFiles,
    b: &LigandFiles,
    outputs: &MergeOutputs,
    oracle: &dyn AtomCorrespondenceOracle,
    config: &MergeConfig,
    reporter: &ProgressReporter,
) -> Result<MergeReport, MergeError> {
    // === Phase 0: Pose extraction ===
    let (pose_a, pose_b) = if a.pose.is_some() || b.pose.is_some() {
        reporter.phase("Extracting poses", || -> Result<_, MergeError> {
            Ok((prepare_pose(a)?, prepare_pose(b)?))
        })?
    } else {
        (None, None)
    };

    // === Phase 1: Load and cross-check inputs ===
    let (topology_a, coordinates_a, topology_b, coordinates_b) =
        reporter.phase("Loading inputs", || -> Result<_, MergeError> {
            let (ta, ca) = load_ligand(a)?;
            let (tb, cb) = load_ligand(b)?;
            check_headers(&ta.molecule, &tb.molecule)
                .map_err(|kind| MergeError::format(&b.topology, kind))?;
            Ok((ta, ca, tb, cb))
        })?;
    info!(
        a_atoms = topology_a.atom_count(),
        b_atoms = topology_b.atom_count(),
        "Loaded end-state ligands."
    );

    // === Phase 2: Correspondence and hybrid atom order ===
    let order = reporter.phase("Atom correspondence", || -> Result<_, MergeError> {
        let heavy_pairs = oracle.correspond(&a.structure, &b.structure)?;
        Ok(AtomIndexMapper::new(&topology_a, &topology_b).map(&heavy_pairs)?)
    })?;
    info!(
        fused = order.fused_count(),
        a_only = order.a_only_count(),
        b_only = order.b_only_count(),
        "Hybrid atom order established."
    );

    // === Phase 3: Topology and structure merge ===
    let (hybrid, coordinates) = reporter.phase("Merging", || -> Result<_, MergeError> {
        let hybrid = TopologyMerger::new(&topology_a, &topology_b, &order, config).merge()?;
        let coordinates = StructureMerger::new(&order, &config.dummy_name_marker)
            .merge(&coordinates_a, &coordinates_b)
            .map_err(|e| structure_error(e, a, b, outputs))?;
        Ok((hybrid, coordinates))
    })?;
    if !hybrid.reviews.is_empty() {
        info!(
            companions = hybrid.reviews.len(),
            divergent = hybrid.reviews.iter().filter(|r| r.is_divergent()).count(),
            "Dihedral companion rows emitted for review."
        );
    }

    // === Phase 4: Render and write ===
    let files = render_outputs(&hybrid, &coordinates, outputs, config)?;
    let written = reporter.phase("Writing outputs", || write_all(&files))?;
    reporter.report(Progress::Message(format!(
        "Merged {} atoms ({} dummies)",
        hybrid.atom_count(),
        hybrid.dummy_atom_count()
    )));

    Ok(MergeReport {
        atom_count: hybrid.atom_count(),
        fused_atoms: order.fused_count(),
        a_only_atoms: order.a_only_count(),
        b_only_atoms: order.b_only_count(),
        dummy_types: hybrid.dummy_types.len(),
        pose_a,
        pose_b,
        reviews: hybrid.reviews,
        written,
    })
}

fn prepare_pose(files: &LigandFiles) -> Result<Option<SelectedPose>, MergeError> {
    files
        .pose
        .as_ref()
        .map(|source| extract_pose(source, &files.structure, &files.coordinates))
        .transpose()
}

fn load_ligand(files: &LigandFiles) -> Result<(LigandTopology, GroFile), MergeError> {
    check_extension(&files.topology, "itp").map_err(|e| MergeError::format(&files.topology, e))?;
    check_extension(&files.structure, "mol2")
        .map_err(|e| MergeError::format(&files.structure, e))?;
    check_extension(&files.coordinates, "gro")
        .map_err(|e| MergeError::format(&files.coordinates, e))?;

    let topology = LigandTopology::read_from_path(&files.topology)
        .map_err(|e| MergeError::read(&files.topology, e))?;
    check_single_state(&topology).map_err(|kind| MergeError::format(&files.topology, kind))?;
    let structure = Mol2Structure::read_from_path(&files.structure)
        .map_err(|e| MergeError::read(&files.structure, e))?;
    check_declared_counts(&topology, &structure, &files.topology)?;
    let coordinates = GroFile::read_from_path(&files.coordinates)
        .map_err(|e| MergeError::read(&files.coordinates, e))?;
    Ok((topology, coordinates))
}

/// The structure's molecule header declares how many atoms and bonds the topology must have.
fn check_declared_counts(
    topology: &LigandTopology,
    structure: &Mol2Structure,
    path: &Path,
) -> Result<(), MergeError> {
    let declared = structure.declared;
    if declared.atoms != topology.atom_count() {
        return Err(MergeError::format(
            path,
            FormatErrorKind::CountMismatch {
                what: "atom",
                declared: declared.atoms,
                parsed: topology.atom_count(),
            },
        ));
    }
    if declared.bonds != topology.bonds.len() {
        return Err(MergeError::format(
            path,
            FormatErrorKind::CountMismatch {
                what: "bond",
                declared: declared.bonds,
                parsed: topology.bonds.len(),
            },
        ));
    }
    Ok(())
}

fn structure_error(
    error: StructureMismatch,
    a: &LigandFiles,
    b: &LigandFiles,
    outputs: &MergeOutputs,
) -> MergeError {
    let (path, declared, parsed) = match error {
        StructureMismatch::Input {
            side: Side::A,
            expected,
            found,
        } => (&a.coordinates, expected, found),
        StructureMismatch::Input {
            side: Side::B,
            expected,
            found,
        } => (&b.coordinates, expected, found),
        StructureMismatch::Output { expected, found } => (&outputs.coordinates, expected, found),
    };
    MergeError::format(
        path,
        FormatErrorKind::CountMismatch {
            what: "coordinate atom",
            declared,
            parsed,
        },
    )
}

fn render_outputs(
    hybrid: &HybridTopology,
    coordinates: &GroFile,
    outputs: &MergeOutputs,
    config: &MergeConfig,
) -> Result<Vec<(PathBuf, String)>, MergeError> {
    let writer = HybridTopologyWriter::new(hybrid)
        .molecule_name(&config.molecule_name)
        .restraint_include(&config.restraint_include)
        .inline_atom_types(config.atom_types == AtomTypesPlacement::Inline);

    let mut files = vec![(outputs.topology.clone(), writer.render())];
    if let AtomTypesPlacement::Companion(file_name) = &config.atom_types {
        let path = outputs.topology.with_file_name(file_name);
        let mut buffer = Vec::new();
        writer
            .write_atom_types(&mut buffer)
            .map_err(|e| MergeError::io(&path, e))?;
        files.push((path, String::from_utf8_lossy(&buffer).into_owned()));
    }
    files.push((outputs.coordinates.clone(), coordinates.render()));
    if let Some(path) = &outputs.relaxation_restraints {
        files.push((path.clone(), PositionRestraints::for_relaxation(hybrid).render()));
    }
    if let Some(water) = &outputs.water_topology {
        let includes = system_includes(&water.forcefield_dir, &outputs.topology, config);
        files.push((water.path.clone(), ligand_in_water_topology(&includes)));
    }
    Ok(files)
}

/// Writes the outputs as one set: a failure on any of them leaves none behind.
pub(crate) fn write_all(files: &[(PathBuf, String)]) -> Result<Vec<PathBuf>, MergeError> {
    write_all_atomically(files).map_err(|(path, e)| MergeError::io(&path, e))?;
    Ok(files.iter().map(|(path, _)| path.clone()).collect())
}
