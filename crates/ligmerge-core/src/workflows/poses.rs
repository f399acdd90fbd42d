use crate::core::io::error::FormatErrorKind;
use crate::core::io::gro::GroFile;
use crate::core::io::mol2::{Pose, PoseChoice, PoseFile};
use crate::core::io::traits::{TextFile, WriteText};
use crate::core::io::{check_extension, write_all_atomically};
use crate::engine::error::MergeError;
use nalgebra::Point3;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, instrument, warn};

const ANGSTROM_PER_NM: f64 = 10.0;

/// A docking output to take one ligand pose from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct PoseSource {
    /// Multi-pose `.mol2` file.
    pub file: PathBuf,
    /// Coordinates (`.gro`) of the ligand in topology atom order. Residues, atom names and the
    /// box are taken from it; positions come from the pose.
    pub template: PathBuf,
    /// 1-based pose number. The best-scoring pose is used when absent.
    #[serde(default)]
    pub pose: Option<usize>,
}

impl PoseSource {
    pub fn choice(&self) -> PoseChoice {
        self.pose.map_or(PoseChoice::BestScore, PoseChoice::Number)
    }
}

/// The pose an extraction used.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectedPose {
    pub id: usize,
    pub score: Option<f64>,
    pub dummies_removed: usize,
    /// Files written: the pose structure, then its coordinates.
    pub written: Vec<PathBuf>,
}

/// Writes one pose of a docking output as a ligand structure (`.mol2`, dummy atoms removed)
/// and coordinates (`.gro`, converted to nm, titled with the pose number).
///
/// Both files are written together or not at all.
///
/// # Errors
///
/// Returns [`MergeError::Pose`] when no pose matches the choice, [`MergeError::Format`] when a
/// pose and the template disagree on the atom count, and other variants for unreadable inputs.
#[instrument(skip_all, name = "pose_extraction", fields(file = %source.file.display()))]
pub fn extract_pose(
    source: &PoseSource,
    structure: &Path,
    coordinates: &Path,
) -> Result<SelectedPose, MergeError> {
    check_extension(&source.file, "mol2").map_err(|e| MergeError::format(&source.file, e))?;
    check_extension(&source.template, "gro")
        .map_err(|e| MergeError::format(&source.template, e))?;
    check_extension(structure, "mol2").map_err(|e| MergeError::format(structure, e))?;
    check_extension(coordinates, "gro").map_err(|e| MergeError::format(coordinates, e))?;

    let poses =
        PoseFile::read_from_path(&source.file).map_err(|e| MergeError::read(&source.file, e))?;
    let pose = poses
        .select(source.choice())
        .map_err(|e| MergeError::Pose {
            path: source.file.clone(),
            source: e,
        })?;
    let template = GroFile::read_from_path(&source.template)
        .map_err(|e| MergeError::read(&source.template, e))?;

    let placed =
        place_pose(pose, &template).map_err(|kind| MergeError::format(&source.file, kind))?;
    let files = vec![
        (structure.to_path_buf(), pose.structure.render()),
        (coordinates.to_path_buf(), placed.render()),
    ];
    write_all_atomically(&files).map_err(|(path, e)| MergeError::io(&path, e))?;

    info!(
        pose = pose.id,
        score = pose.score,
        dummies_removed = pose.dummies_removed,
        "Extracted ligand pose."
    );
    Ok(SelectedPose {
        id: pose.id,
        score: pose.score,
        dummies_removed: pose.dummies_removed,
        written: files.into_iter().map(|(path, _)| path).collect(),
    })
}

/// The template coordinates moved onto the pose, atom by atom.
fn place_pose(pose: &Pose, template: &GroFile) -> Result<GroFile, FormatErrorKind> {
    let renamed = pose
        .structure
        .atoms
        .iter()
        .zip(&template.atoms)
        .filter(|(placed, reference)| !placed.name.eq_ignore_ascii_case(reference.name()))
        .count();
    if renamed > 0 {
        warn!(
            pose = pose.id,
            atoms = renamed,
            "Pose atom names differ from the template; atoms are matched by position in the file."
        );
    }
    let positions: Vec<Point3<f64>> = pose
        .structure
        .atoms
        .iter()
        .map(|atom| atom.position / ANGSTROM_PER_NM)
        .collect();
    template.with_positions(format!("Ligand pose {:5}", pose.id), &positions)
}
