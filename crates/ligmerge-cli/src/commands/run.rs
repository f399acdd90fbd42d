use crate::cli::RunArgs;
use crate::config::PartialConfig;
use crate::error::{CliError, Result};
use crate::utils::progress::CliProgressHandler;
use ligmerge::engine::md::GromacsEngine;
use ligmerge::engine::progress::ProgressReporter;
use ligmerge::workflows::edges::{BatchContext, EdgeManifest, run_edges};
use tracing::{info, warn};

pub fn run(args: RunArgs) -> Result<()> {
    info!("Loading edge manifest from {:?}", &args.manifest);
    let manifest = EdgeManifest::load(&args.manifest)?;
    if manifest.edges.is_empty() {
        warn!("Manifest {:?} lists no edges.", &args.manifest);
        println!("Warning: the manifest lists no edges.");
        return Ok(());
    }

    let partial_config = PartialConfig::load(args.config.config.as_deref(), &args.config.set_values)?;
    info!("Merging configuration from file and CLI arguments...");
    let merge_config = partial_config.merge_config(&args.overrides)?;
    let relaxation = partial_config.relaxation_config(&args.relaxation)?;
    let engine_settings = partial_config.engine_settings(&args.engine)?;
    let oracle_choice = partial_config.oracle_choice(&args.correspondence)?;

    if args.dry_run {
        println!("{} edge(s) in {}:", manifest.edges.len(), args.manifest.display());
        for edge in &manifest.edges {
            let source = match &edge.mapping {
                Some(path) => format!("mapping file {}", path.display()),
                None => oracle_choice.to_string(),
            };
            let stages = if edge.fix.is_some() { "merge + fix" } else { "merge" };
            println!("  {:<24} {:<12} correspondence: {}", edge.name, stages, source);
        }
        return Ok(());
    }

    let default_oracle = oracle_choice.build();
    let engine = GromacsEngine::new(engine_settings);
    let context = BatchContext {
        merge: &merge_config,
        relaxation: &relaxation,
        default_oracle: default_oracle.as_ref(),
        engine: &engine,
    };

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    println!("Running {} edge(s)...", manifest.edges.len());
    let outcomes = run_edges(&manifest, &context, &reporter);

    let total = outcomes.len();
    let mut failed = 0;
    for outcome in &outcomes {
        match &outcome.result {
            Ok(report) => {
                let fixed = match &report.fix {
                    Some(fix) => format!(", complex of {} atoms", fix.complex_atoms),
                    None => String::new(),
                };
                println!(
                    "  ✓ {}: {} hybrid atoms{}",
                    outcome.name, report.merge.atom_count, fixed
                );
                for (label, selected) in [
                    ("ligand A", &report.merge.pose_a),
                    ("ligand B", &report.merge.pose_b),
                ] {
                    if let Some(selected) = selected {
                        println!("      {} from pose {}", label, selected.id);
                    }
                }
            }
            Err(e) => {
                failed += 1;
                println!("  ✗ {}: {}", outcome.name, e);
            }
        }
    }

    if failed > 0 {
        return Err(CliError::EdgesFailed { failed, total });
    }
    Ok(())
}
