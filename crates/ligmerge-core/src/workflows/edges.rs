use super::fix::{ComplexTopologyTarget, FixInputs, FixOutputs, FixReport, fix_structure};
use super::merge::{LigandFiles, MergeOutputs, MergeReport, merge_topologies};
use crate::engine::config::{MergeConfig, RelaxationConfig};
use crate::engine::error::MergeError;
use crate::engine::md::MdEngine;
use crate::engine::oracle::{AtomCorrespondenceOracle, MappingFileCorrespondence};
use crate::engine::progress::{Progress, ProgressReporter};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{error, info, instrument};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("TOML parsing error for '{path}': {source}")]
    Toml {
        path: String,
        source: toml::de::Error,
    },
}

/// A batch of independent edges, read from TOML:
///
/// ```toml
/// [[edge]]
/// name = "lig1-lig2"
/// mapping = "lig1-lig2.csv"
/// a = { topology = "lig1.itp", structure = "lig1.mol2", coordinates = "lig1.gro" }
/// b = { topology = "lig2.itp", structure = "lig2.mol2", coordinates = "lig2.gro" }
/// output = { topology = "lig1-lig2/merged.itp", coordinates = "lig1-lig2/merged.gro" }
/// ```
///
/// A ligand may add `pose = { file = "docking.mol2", template = "lig1.gro" }` to have its
/// structure and coordinates written from the best-scoring docking pose first.
///
/// Relative paths are resolved against the manifest's directory.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct EdgeManifest {
    #[serde(rename = "edge", default)]
    pub edges: Vec<EdgeSpec>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct EdgeSpec {
    pub name: String,
    /// Correspondence file for this edge; edges without one use the batch's default oracle.
    #[serde(default)]
    pub mapping: Option<PathBuf>,
    pub a: LigandFiles,
    pub b: LigandFiles,
    pub output: MergeOutputs,
    #[serde(default)]
    pub fix: Option<FixSpec>,
}

/// Structure fix settings of an edge. The hybrid coordinates and ligand topology are the
/// edge's merge outputs.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FixSpec {
    pub system_topology: PathBuf,
    pub receptor_coordinates: PathBuf,
    pub control: PathBuf,
    pub complex_coordinates: PathBuf,
    #[serde(default)]
    pub heavy_atom_restraints: Option<PathBuf>,
    #[serde(default)]
    pub complex_topology: Option<ComplexTopologyTarget>,
}

impl EdgeManifest {
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let content = std::fs::read_to_string(path).map_err(|e| ManifestError::Io {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        let mut manifest: Self = toml::from_str(&content).map_err(|e| ManifestError::Toml {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        if let Some(base) = path.parent() {
            manifest.resolve(base);
        }
        Ok(manifest)
    }

    /// Makes every relative path absolute with respect to `base`.
    pub fn resolve(&mut self, base: &Path) {
        let join = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        for edge in &mut self.edges {
            if let Some(mapping) = &mut edge.mapping {
                join(mapping);
            }
            for files in [&mut edge.a, &mut edge.b] {
                join(&mut files.topology);
                join(&mut files.structure);
                join(&mut files.coordinates);
                if let Some(pose) = &mut files.pose {
                    join(&mut pose.file);
                    join(&mut pose.template);
                }
            }
            join(&mut edge.output.topology);
            join(&mut edge.output.coordinates);
            if let Some(p) = &mut edge.output.relaxation_restraints {
                join(p);
            }
            if let Some(water) = &mut edge.output.water_topology {
                join(&mut water.path);
            }
            if let Some(fix) = &mut edge.fix {
                join(&mut fix.system_topology);
                join(&mut fix.receptor_coordinates);
                join(&mut fix.control);
                join(&mut fix.complex_coordinates);
                if let Some(p) = &mut fix.heavy_atom_restraints {
                    join(p);
                }
                if let Some(target) = &mut fix.complex_topology {
                    join(&mut target.protein_topology);
                    join(&mut target.output);
                }
            }
        }
    }
}

/// Shared collaborators and settings of a batch run.
pub struct BatchContext<'a> {
    pub merge: &'a MergeConfig,
    pub relaxation: &'a RelaxationConfig,
    /// Oracle for edges that name no mapping file.
    pub default_oracle: &'a dyn AtomCorrespondenceOracle,
    pub engine: &'a dyn MdEngine,
}

#[derive(Debug)]
pub struct EdgeReport {
    pub merge: MergeReport,
    pub fix: Option<FixReport>,
}

#[derive(Debug)]
pub struct EdgeOutcome {
    pub name: String,
    pub result: Result<EdgeReport, MergeError>,
}

impl EdgeOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Runs every edge of the manifest and returns one outcome per edge, in manifest order.
///
/// Edges share nothing mutable and run in parallel with the `parallel` feature. A failing edge
/// is logged and reported; it never stops the others.
#[instrument(skip_all, name = "batch_workflow")]
pub fn run_edges(
    manifest: &EdgeManifest,
    context: &BatchContext,
    reporter: &ProgressReporter,
) -> Vec<EdgeOutcome> {
    info!(edges = manifest.edges.len(), "Starting edge batch.");
    reporter.report(Progress::BatchStart {
        total_edges: manifest.edges.len() as u64,
    });

    #[cfg(not(feature = "parallel"))]
    let iterator = manifest.edges.iter();

    #[cfg(feature = "parallel")]
    let iterator = manifest.edges.par_iter();

    let outcomes: Vec<EdgeOutcome> = iterator
        .map(|edge| {
            let result = run_edge(edge, context);
            if let Err(e) = &result {
                error!(edge = %edge.name, error = %e, "Edge failed");
            }
            reporter.report(Progress::EdgeFinished {
                name: edge.name.clone(),
                success: result.is_ok(),
            });
            EdgeOutcome {
                name: edge.name.clone(),
                result,
            }
        })
        .collect();

    reporter.report(Progress::BatchFinish);
    let failed = outcomes.iter().filter(|o| !o.is_success()).count();
    info!(
        succeeded = outcomes.len() - failed,
        failed, "Edge batch finished."
    );
    outcomes
}

fn run_edge(edge: &EdgeSpec, context: &BatchContext) -> Result<EdgeReport, MergeError> {
    let quiet = ProgressReporter::new();
    let mapping = edge.mapping.clone().map(MappingFileCorrespondence::new);
    let oracle: &dyn AtomCorrespondenceOracle = match &mapping {
        Some(m) => m,
        None => context.default_oracle,
    };

    let merge = merge_topologies(&edge.a, &edge.b, &edge.output, oracle, context.merge, &quiet)?;

    let fix = match &edge.fix {
        Some(spec) => {
            let inputs = FixInputs {
                hybrid_coordinates: edge.output.coordinates.clone(),
                hybrid_topology: spec.system_topology.clone(),
                receptor_coordinates: spec.receptor_coordinates.clone(),
                control: spec.control.clone(),
                ligand_topology: Some(edge.output.topology.clone()),
            };
            let outputs = FixOutputs {
                complex_coordinates: spec.complex_coordinates.clone(),
                heavy_atom_restraints: spec.heavy_atom_restraints.clone(),
                complex_topology: spec.complex_topology.clone(),
            };
            Some(fix_structure(
                &inputs,
                &outputs,
                context.engine,
                context.merge,
                context.relaxation,
                &quiet,
            )?)
        }
        None => None,
    };

    Ok(EdgeReport { merge, fix })
}
