mod common;

use common::*;
use ligmerge::core::io::gro::GroFile;
use ligmerge::core::io::traits::TextFile;
use ligmerge::engine::config::{ConfigError, MergeConfig, RelaxationConfig, RelaxationConfigBuilder};
use ligmerge::engine::error::MergeError;
use ligmerge::engine::md::{EnginePhase, ExternalEngineError};
use ligmerge::engine::oracle::{AtomPair, ExplicitCorrespondence};
use ligmerge::engine::progress::ProgressReporter;
use ligmerge::workflows::fix::{ComplexTopologyTarget, FixInputs, FixOutputs, fix_structure};
use ligmerge::workflows::merge::merge_topologies;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

struct Edge {
    inputs: FixInputs,
    outputs: FixOutputs,
    edge_dir: PathBuf,
}

fn merged_edge(root: &Path) -> Edge {
    let a = ligand_a(root);
    let b = ligand_b(root);
    let edge_dir = root.join("edge");
    let merged = merge_outputs(&edge_dir);
    merge_topologies(
        &a,
        &b,
        &merged,
        &ExplicitCorrespondence::new(vec![
            AtomPair::new(1, 1),
            AtomPair::new(2, 2),
            AtomPair::new(3, 3),
        ]),
        &MergeConfig::default(),
        &ProgressReporter::new(),
    )
    .unwrap();
    fs::remove_file(merged.relaxation_restraints.as_ref().unwrap()).unwrap();

    let receptor = root.join("protein.gro");
    fs::write(&receptor, RECEPTOR).unwrap();
    let control = root.join("relax.mdp");
    fs::write(&control, "integrator = steep\nnsteps = 500\n").unwrap();
    let system = edge_dir.join("topol.top");
    fs::write(&system, "; ligand in water\n").unwrap();

    Edge {
        inputs: FixInputs {
            hybrid_coordinates: merged.coordinates.clone(),
            hybrid_topology: system,
            receptor_coordinates: receptor,
            control,
            ligand_topology: Some(merged.topology.clone()),
        },
        outputs: FixOutputs {
            complex_coordinates: edge_dir.join("conf.gro"),
            heavy_atom_restraints: None,
            complex_topology: None,
        },
        edge_dir,
    }
}

fn listing(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[test]
fn fix_assembles_receptor_and_relaxed_ligand() {
    let dir = tempdir().unwrap();
    let edge = merged_edge(dir.path());
    let engine = FakeEngine::new();
    let original = GroFile::read_from_path(&edge.inputs.hybrid_coordinates).unwrap();

    let report = fix_structure(
        &edge.inputs,
        &edge.outputs,
        &engine,
        &MergeConfig::default(),
        &RelaxationConfig::default(),
        &ProgressReporter::new(),
    )
    .unwrap();

    assert_eq!(engine.phases(), [EnginePhase::Prepare, EnginePhase::Execute]);
    assert_eq!(report.ligand_atoms, 7);
    assert_eq!(report.complex_atoms, 10);

    let complex = GroFile::read_from_path(&edge.outputs.complex_coordinates).unwrap();
    assert_eq!(complex.title, "Protein in water");
    assert_eq!(complex.atom_count(), 10);
    assert_eq!(complex.box_vectors.vectors(), &[6.0, 6.0, 6.0]);
    assert_eq!(complex.atoms[0].name(), "N");
    assert_eq!(complex.atoms[3].name(), "C1");
    assert_eq!(complex.atoms[3].serial(), 4);
    assert_eq!(complex.atoms[9].name(), "DH2");
    assert_eq!(complex.atoms[9].serial(), 10);
    for (placed, source) in complex.atoms[3..].iter().zip(&original.atoms) {
        assert!((placed.position() - source.position()).norm() < 1e-5);
    }

    assert_eq!(
        listing(&edge.edge_dir),
        ["conf.gro", "ffMOL.itp", "merged.gro", "merged.itp", "topol.top"]
    );
}

#[test]
fn relaxed_positions_replace_the_hybrid_coordinates() {
    let dir = tempdir().unwrap();
    let edge = merged_edge(dir.path());
    let engine = FakeEngine {
        nudge_nm: 0.01,
        ..FakeEngine::new()
    };
    let before = GroFile::read_from_path(&edge.inputs.hybrid_coordinates).unwrap();

    fix_structure(
        &edge.inputs,
        &edge.outputs,
        &engine,
        &MergeConfig::default(),
        &RelaxationConfig::default(),
        &ProgressReporter::new(),
    )
    .unwrap();

    let after = GroFile::read_from_path(&edge.inputs.hybrid_coordinates).unwrap();
    assert_eq!(after.title, before.title);
    assert_eq!(after.atom_count(), before.atom_count());
    let moved = after.atoms[0].position() - before.atoms[0].position();
    assert!((moved.x - 0.01).abs() < 1e-5);
}

#[test]
fn hybrid_coordinates_are_kept_when_update_is_disabled() {
    let dir = tempdir().unwrap();
    let edge = merged_edge(dir.path());
    let engine = FakeEngine {
        nudge_nm: 0.01,
        ..FakeEngine::new()
    };
    let before = fs::read_to_string(&edge.inputs.hybrid_coordinates).unwrap();
    let relaxation = RelaxationConfigBuilder::new()
        .update_hybrid_coordinates(false)
        .build()
        .unwrap();

    fix_structure(
        &edge.inputs,
        &edge.outputs,
        &engine,
        &MergeConfig::default(),
        &relaxation,
        &ProgressReporter::new(),
    )
    .unwrap();

    assert_eq!(fs::read_to_string(&edge.inputs.hybrid_coordinates).unwrap(), before);
}

#[test]
fn engine_failure_writes_no_complex_file() {
    let dir = tempdir().unwrap();
    let edge = merged_edge(dir.path());
    let engine = FakeEngine::failing();
    let before = fs::read_to_string(&edge.inputs.hybrid_coordinates).unwrap();

    let err = fix_structure(
        &edge.inputs,
        &edge.outputs,
        &engine,
        &MergeConfig::default(),
        &RelaxationConfig::default(),
        &ProgressReporter::new(),
    )
    .unwrap_err();

    match &err {
        MergeError::ExternalEngine(ExternalEngineError::NonZeroExit { phase, output, .. }) => {
            assert_eq!(*phase, EnginePhase::Execute);
            assert!(output.stderr.contains("segmentation fault"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(err.to_string().contains("segmentation fault"));
    assert!(!edge.outputs.complex_coordinates.exists());
    assert_eq!(fs::read_to_string(&edge.inputs.hybrid_coordinates).unwrap(), before);
    assert_eq!(
        listing(&edge.edge_dir),
        ["ffMOL.itp", "merged.gro", "merged.itp", "topol.top"]
    );
}

#[test]
fn optional_outputs_are_written_after_relaxation() {
    let dir = tempdir().unwrap();
    let mut edge = merged_edge(dir.path());
    let protein_top = dir.path().join("protein.top");
    fs::write(&protein_top, PROTEIN_TOPOLOGY).unwrap();
    edge.outputs.heavy_atom_restraints = Some(edge.edge_dir.join("posre_Ligand.itp"));
    edge.outputs.complex_topology = Some(ComplexTopologyTarget {
        protein_topology: protein_top,
        output: edge.edge_dir.join("complex.top"),
    });

    let report = fix_structure(
        &edge.inputs,
        &edge.outputs,
        &FakeEngine::new(),
        &MergeConfig::default(),
        &RelaxationConfig::default(),
        &ProgressReporter::new(),
    )
    .unwrap();

    assert_eq!(report.written.len(), 4);
    let restraints = fs::read_to_string(edge.edge_dir.join("posre_Ligand.itp")).unwrap();
    assert!(restraints.contains("     5     1  1000  1000  1000"));
    assert!(!restraints.contains("     4     1  1000"));
    let complex = fs::read_to_string(edge.edge_dir.join("complex.top")).unwrap();
    assert!(complex.contains("#include \"amber99sb-ildn.ff/forcefield.itp\"\n#include \"ffMOL.itp\"\n"));
    assert!(complex.contains("#include \"merged.itp\""));
    assert!(complex.ends_with("MOL                 1\n"));
}

#[test]
fn restraint_output_without_ligand_topology_is_a_config_error() {
    let dir = tempdir().unwrap();
    let mut edge = merged_edge(dir.path());
    edge.inputs.ligand_topology = None;
    edge.outputs.heavy_atom_restraints = Some(edge.edge_dir.join("posre_Ligand.itp"));
    let engine = FakeEngine::new();

    let err = fix_structure(
        &edge.inputs,
        &edge.outputs,
        &engine,
        &MergeConfig::default(),
        &RelaxationConfig::default(),
        &ProgressReporter::new(),
    )
    .unwrap_err();

    assert!(matches!(
        err,
        MergeError::Config(ConfigError::MissingParameter("ligand-topology"))
    ));
    assert!(engine.phases().is_empty());
}

#[test]
fn unwritable_restraints_leave_complex_and_hybrid_untouched() {
    let dir = tempdir().unwrap();
    let mut edge = merged_edge(dir.path());
    edge.outputs.heavy_atom_restraints = Some(dir.path().join("missing").join("posre_Ligand.itp"));
    let engine = FakeEngine {
        nudge_nm: 0.01,
        ..FakeEngine::new()
    };
    let before = fs::read_to_string(&edge.inputs.hybrid_coordinates).unwrap();

    let err = fix_structure(
        &edge.inputs,
        &edge.outputs,
        &engine,
        &MergeConfig::default(),
        &RelaxationConfig::default(),
        &ProgressReporter::new(),
    )
    .unwrap_err();

    assert!(matches!(err, MergeError::Io { .. }));
    assert!(!edge.outputs.complex_coordinates.exists());
    assert_eq!(fs::read_to_string(&edge.inputs.hybrid_coordinates).unwrap(), before);
    assert_eq!(
        listing(&edge.edge_dir),
        ["ffMOL.itp", "merged.gro", "merged.itp", "topol.top"]
    );
}
