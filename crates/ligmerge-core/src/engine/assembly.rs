//! Reassembly of a relaxed hybrid ligand with its receptor.
//!
//! The assembler walks one edge's hybrid structure through
//! `Merged -> Shifted -> Relaxed -> Unshifted -> Assembled`. The relaxation is delegated to an
//! [`MdEngine`]; every other stage is a pure transformation of [`GroFile`]s.

use super::config::{RelaxationConfig, ShiftTarget};
use super::error::MergeError;
use super::md::{MdEngine, RunRequest, require_artifact};
use crate::core::io::error::FormatErrorKind;
use crate::core::io::gro::GroFile;
use crate::core::io::traits::{TextFile, WriteText};
use crate::core::io::write_atomically;
use nalgebra::Vector3;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum AssemblyStage {
    Merged,
    Shifted,
    Relaxed,
    Unshifted,
    Assembled,
}

impl fmt::Display for AssemblyStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AssemblyStage::Merged => "merged",
            AssemblyStage::Shifted => "shifted",
            AssemblyStage::Relaxed => "relaxed",
            AssemblyStage::Unshifted => "unshifted",
            AssemblyStage::Assembled => "assembled",
        };
        f.write_str(name)
    }
}

/// Translates a structure by `offset` nm along every axis, or shifts its box diagonal.
pub fn apply_shift(structure: &mut GroFile, target: ShiftTarget, offset: f64) {
    match target {
        ShiftTarget::Coordinates => structure.translate(&Vector3::repeat(offset)),
        ShiftTarget::BoxVectors => structure.box_vectors.shift(offset),
    }
}

/// Appends `ligand` after `receptor`, renumbering ligand serials to follow the receptor's.
///
/// The title and box of the result are the receptor's; the declared count becomes
/// `receptor + ligand`.
pub fn assemble_complex(receptor: &GroFile, ligand: &GroFile) -> GroFile {
    let mut atoms = Vec::with_capacity(receptor.atom_count() + ligand.atom_count());
    atoms.extend(receptor.atoms.iter().cloned());
    let offset = receptor.atom_count();
    atoms.extend(ligand.atoms.iter().enumerate().map(|(k, atom)| {
        let mut atom = atom.clone();
        atom.set_serial(offset + k + 1);
        atom
    }));
    GroFile {
        title: receptor.title.clone(),
        atoms,
        box_vectors: receptor.box_vectors.clone(),
        precision: receptor.precision,
    }
}

/// Files the relaxation reads, all owned by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelaxationInputs<'a> {
    /// System topology that includes the hybrid ligand topology.
    pub topology: &'a Path,
    /// Short-run control parameters.
    pub control: &'a Path,
    /// Directory the engine runs in; intermediates are created here.
    pub work_dir: &'a Path,
}

/// Drives the shift, relax, unshift and assemble stages for one edge.
pub struct ComplexStructureAssembler<'a> {
    engine: &'a dyn MdEngine,
    config: &'a RelaxationConfig,
    stage: AssemblyStage,
}

impl<'a> ComplexStructureAssembler<'a> {
    pub fn new(engine: &'a dyn MdEngine, config: &'a RelaxationConfig) -> Self {
        Self {
            engine,
            config,
            stage: AssemblyStage::Merged,
        }
    }

    /// The last stage reached.
    pub fn stage(&self) -> AssemblyStage {
        self.stage
    }

    fn advance(&mut self, stage: AssemblyStage) {
        debug!(from = %self.stage, to = %stage, "Assembly stage transition");
        self.stage = stage;
    }

    /// Path of the shifted copy handed to the engine.
    pub fn shifted_input(&self, work_dir: &Path) -> PathBuf {
        work_dir.join(format!("{}_shifted.gro", self.config.run_stem))
    }

    /// Relaxes the hybrid ligand and returns it in its original frame.
    ///
    /// The engine's artifacts are removed afterwards when the configuration asks for it, on
    /// success and on failure alike.
    pub fn relax(
        &mut self,
        ligand: &GroFile,
        inputs: &RelaxationInputs<'_>,
    ) -> Result<GroFile, MergeError> {
        let request = RunRequest {
            work_dir: inputs.work_dir.to_path_buf(),
            control: inputs.control.to_path_buf(),
            coordinates: self.shifted_input(inputs.work_dir),
            topology: inputs.topology.to_path_buf(),
            stem: self.config.run_stem.clone(),
            max_warnings: self.config.max_warnings,
        };

        let result = self.relax_with(ligand, &request);
        if self.config.clean_intermediates {
            clean_intermediates(&request);
        }
        result
    }

    fn relax_with(&mut self, ligand: &GroFile, request: &RunRequest) -> Result<GroFile, MergeError> {
        let offset = self.config.shift_nm;
        let target = self.config.shift_target;

        let mut shifted = ligand.clone();
        apply_shift(&mut shifted, target, offset);
        write_atomically(&request.coordinates, &shifted.render())
            .map_err(|e| MergeError::io(&request.coordinates, e))?;
        self.advance(AssemblyStage::Shifted);

        info!(stem = %request.stem, "Relaxing hybrid ligand");
        self.engine.prepare(request)?;
        self.engine.execute(request)?;
        let relaxed_path = request.final_coordinates();
        require_artifact(&relaxed_path)?;
        let mut relaxed =
            GroFile::read_from_path(&relaxed_path).map_err(|e| MergeError::read(&relaxed_path, e))?;
        if relaxed.atom_count() != ligand.atom_count() {
            return Err(MergeError::format(
                &relaxed_path,
                FormatErrorKind::CountMismatch {
                    what: "relaxed ligand atom",
                    declared: ligand.atom_count(),
                    parsed: relaxed.atom_count(),
                },
            ));
        }
        self.advance(AssemblyStage::Relaxed);

        apply_shift(&mut relaxed, target, -offset);
        self.advance(AssemblyStage::Unshifted);
        Ok(relaxed)
    }

    /// Concatenates the receptor and the relaxed ligand.
    pub fn assemble(&mut self, receptor: &GroFile, ligand: &GroFile) -> GroFile {
        let complex = assemble_complex(receptor, ligand);
        self.advance(AssemblyStage::Assembled);
        complex
    }
}

fn clean_intermediates(request: &RunRequest) {
    let mut paths = request.intermediates();
    paths.push(request.final_coordinates());
    paths.push(request.coordinates.clone());
    for path in paths {
        match fs::remove_file(&path) {
            Ok(()) => debug!(path = %path.display(), "Removed intermediate"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %path.display(), error = %e, "Could not remove intermediate"),
        }
    }
}
