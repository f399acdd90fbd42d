use crate::cli::FixArgs;
use crate::config::PartialConfig;
use crate::error::Result;
use crate::utils::progress::CliProgressHandler;
use ligmerge::engine::md::GromacsEngine;
use ligmerge::engine::progress::ProgressReporter;
use ligmerge::workflows::fix::{ComplexTopologyTarget, FixInputs, FixOutputs, fix_structure};
use tracing::info;

pub fn run(args: FixArgs) -> Result<()> {
    let partial_config = PartialConfig::load(args.config.config.as_deref(), &args.config.set_values)?;
    info!("Merging configuration from file and CLI arguments...");
    let merge_config = partial_config.merge_config(&args.overrides)?;
    let relaxation = partial_config.relaxation_config(&args.relaxation)?;
    let engine_settings = partial_config.engine_settings(&args.engine)?;
    info!(
        "Using GROMACS binary {:?} (timeout: {:?})",
        engine_settings.binary, engine_settings.timeout
    );
    let engine = GromacsEngine::new(engine_settings);

    let inputs = FixInputs {
        hybrid_coordinates: args.hybrid_coordinates,
        hybrid_topology: args.system_topology,
        receptor_coordinates: args.receptor,
        control: args.control,
        ligand_topology: args.ligand_topology,
    };
    let complex_topology = match (args.protein_topology, args.complex_topology) {
        (Some(protein_topology), Some(output)) => Some(ComplexTopologyTarget {
            protein_topology,
            output,
        }),
        _ => None,
    };
    let outputs = FixOutputs {
        complex_coordinates: args.output,
        heavy_atom_restraints: args.heavy_atom_restraints,
        complex_topology,
    };

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    println!("Relaxing the hybrid ligand and assembling the complex...");
    info!("Invoking the core fix workflow...");
    let report = fix_structure(
        &inputs,
        &outputs,
        &engine,
        &merge_config,
        &relaxation,
        &reporter,
    )?;

    println!(
        "✓ Complex with {} atoms ({} ligand atoms) written to: {}",
        report.complex_atoms,
        report.ligand_atoms,
        outputs.complex_coordinates.display()
    );
    for path in report.written.iter().skip(1) {
        println!("  Written: {}", path.display());
    }

    Ok(())
}
