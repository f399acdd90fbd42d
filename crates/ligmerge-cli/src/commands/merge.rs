use crate::cli::{MergeArgs, PoseOverrides};
use crate::config::PartialConfig;
use crate::error::Result;
use crate::utils::progress::CliProgressHandler;
use ligmerge::engine::progress::ProgressReporter;
use ligmerge::workflows::merge::{LigandFiles, MergeOutputs, WaterTopology, merge_topologies};
use ligmerge::workflows::poses::{PoseSource, SelectedPose};
use std::path::PathBuf;
use tracing::{info, warn};

pub fn run(args: MergeArgs) -> Result<()> {
    let partial_config = PartialConfig::load(args.config.config.as_deref(), &args.config.set_values)?;
    info!("Merging configuration from file and CLI arguments...");
    let merge_config = partial_config.merge_config(&args.overrides)?;
    let oracle_choice = partial_config.oracle_choice(&args.correspondence)?;
    info!("Atom correspondence from {}", oracle_choice);
    let oracle = oracle_choice.build();

    let (a_pose, b_pose) = pose_sources(args.poses);
    let a = LigandFiles {
        topology: args.a_topology,
        structure: args.a_structure,
        coordinates: args.a_coordinates,
        pose: a_pose,
    };
    let b = LigandFiles {
        topology: args.b_topology,
        structure: args.b_structure,
        coordinates: args.b_coordinates,
        pose: b_pose,
    };
    let water_topology = match (args.water_topology, args.forcefield_dir) {
        (Some(path), Some(forcefield_dir)) => Some(WaterTopology {
            path,
            forcefield_dir,
        }),
        _ => None,
    };
    let outputs = MergeOutputs {
        topology: args.output_topology,
        coordinates: args.output_coordinates,
        relaxation_restraints: args.relaxation_restraints,
        water_topology,
    };

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    println!("Merging ligands...");
    info!("Invoking the core merge workflow...");
    let report = merge_topologies(&a, &b, &outputs, oracle.as_ref(), &merge_config, &reporter)?;

    for (label, selected) in [("Ligand A", &report.pose_a), ("Ligand B", &report.pose_b)] {
        if let Some(selected) = selected {
            println!("{}", describe_pose(label, selected));
        }
    }
    println!(
        "✓ Hybrid ligand with {} atoms ({} fused, {} A-only, {} B-only, {} dummy type(s))",
        report.atom_count,
        report.fused_atoms,
        report.a_only_atoms,
        report.b_only_atoms,
        report.dummy_types
    );
    let divergent = report.divergent_reviews().count();
    if divergent > 0 {
        warn!("{} dihedral companion row(s) need review.", divergent);
        println!(
            "Warning: {} dihedral companion row(s) were pinned to zero in both states; review them before production runs.",
            divergent
        );
    }
    for path in &report.written {
        println!("  Written: {}", path.display());
    }

    Ok(())
}

fn pose_sources(poses: PoseOverrides) -> (Option<PoseSource>, Option<PoseSource>) {
    let source = |file: Option<PathBuf>, template: Option<PathBuf>, pose: Option<usize>| {
        Some(PoseSource {
            file: file?,
            template: template?,
            pose,
        })
    };
    (
        source(poses.a_poses, poses.a_pose_template, poses.a_pose),
        source(poses.b_poses, poses.b_pose_template, poses.b_pose),
    )
}

pub fn describe_pose(label: &str, selected: &SelectedPose) -> String {
    let score = selected
        .score
        .map_or_else(|| "unscored".to_string(), |s| format!("score {:.3}", s));
    format!(
        "✓ {} taken from pose {} ({}, {} dummy atom(s) removed)",
        label, selected.id, score, selected.dummies_removed
    )
}
