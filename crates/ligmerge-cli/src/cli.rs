use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    author = "Tony Kan, Ted Yu, William A. Goddard III, Victor Wai Tak Kam",
    version,
    about = "ligmerge CLI - Builds dual-topology hybrid ligands for relative binding free-energy calculations with GROMACS.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Set the number of threads used by the `run` batch.
    /// Defaults to the number of available logical cores.
    #[arg(short = 'j', long, global = true, value_name = "NUM")]
    pub threads: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Merge the topologies and coordinates of two ligands into one hybrid ligand.
    Merge(MergeArgs),
    /// Relax a merged hybrid ligand with GROMACS and assemble it with its receptor.
    Fix(FixArgs),
    /// Run every edge of a TOML edge manifest, in parallel.
    Run(RunArgs),
    /// Extract one pose of a multi-pose docking output as ligand structure and coordinates.
    Pose(PoseArgs),
}

/// Configuration file and `--set` overrides shared by every subcommand.
#[derive(Args, Debug, Clone, Default)]
pub struct ConfigArgs {
    /// Path to a configuration file in TOML format.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Set a specific configuration value, overriding the config file.
    /// Can be used multiple times. Example: -S relaxation.shift-nm=12.5
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct MergeOverrides {
    /// Override the molecule name of the merged topology.
    #[arg(long, value_name = "NAME")]
    pub molecule_name: Option<String>,

    /// Write the `[ atomtypes ]` block into the merged topology instead of a companion file.
    #[arg(long)]
    pub inline_atom_types: bool,
}

/// Where the atom correspondence comes from. At most one may be given.
#[derive(Args, Debug, Clone, Default)]
#[group(required = false, multiple = false)]
pub struct CorrespondenceOverrides {
    /// CSV file of matched atoms with an `a,b` header (1-based indices).
    #[arg(short, long, value_name = "PATH")]
    pub mapping: Option<PathBuf>,

    /// Pair heavy atoms of pre-aligned poses closer than this cutoff (Angstroms).
    #[arg(long, value_name = "FLOAT")]
    pub proximity_cutoff: Option<f64>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct EngineOverrides {
    /// Path to the GROMACS binary.
    #[arg(long, value_name = "PATH")]
    pub gmx: Option<PathBuf>,

    /// Wall-clock limit in seconds for each GROMACS call; 0 waits indefinitely.
    #[arg(long, value_name = "SECONDS")]
    pub timeout: Option<u64>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct RelaxationOverrides {
    /// Offset in nm applied to the ligand during the relaxation.
    #[arg(long, value_name = "FLOAT")]
    pub shift: Option<f64>,

    /// Keep the GROMACS run artifacts after the relaxation.
    #[arg(long)]
    pub keep_intermediates: bool,

    /// Leave the hybrid coordinate file untouched.
    #[arg(long)]
    pub no_update_hybrid: bool,
}

/// Takes ligand A or B from a docking output; its structure and coordinates paths then
/// receive the extracted pose.
#[derive(Args, Debug, Clone, Default)]
pub struct PoseOverrides {
    /// Multi-pose docking output (.mol2) for ligand A.
    #[arg(long, value_name = "PATH", requires = "a_pose_template")]
    pub a_poses: Option<PathBuf>,

    /// Coordinates (.gro) giving the atom names and box of ligand A's poses.
    #[arg(long, value_name = "PATH", requires = "a_poses")]
    pub a_pose_template: Option<PathBuf>,

    /// Pose number (1-based) for ligand A instead of the best-scoring one.
    #[arg(long, value_name = "NUM", requires = "a_poses")]
    pub a_pose: Option<usize>,

    /// Multi-pose docking output (.mol2) for ligand B.
    #[arg(long, value_name = "PATH", requires = "b_pose_template")]
    pub b_poses: Option<PathBuf>,

    /// Coordinates (.gro) giving the atom names and box of ligand B's poses.
    #[arg(long, value_name = "PATH", requires = "b_poses")]
    pub b_pose_template: Option<PathBuf>,

    /// Pose number (1-based) for ligand B instead of the best-scoring one.
    #[arg(long, value_name = "NUM", requires = "b_poses")]
    pub b_pose: Option<usize>,
}

/// Arguments for the `merge` subcommand.
#[derive(Args, Debug)]
pub struct MergeArgs {
    // --- Ligand A ---
    /// Topology (.itp) of ligand A.
    #[arg(long, required = true, value_name = "PATH")]
    pub a_topology: PathBuf,

    /// 3D structure (.mol2) of ligand A.
    #[arg(long, required = true, value_name = "PATH")]
    pub a_structure: PathBuf,

    /// Coordinates (.gro) of ligand A.
    #[arg(long, required = true, value_name = "PATH")]
    pub a_coordinates: PathBuf,

    // --- Ligand B ---
    /// Topology (.itp) of ligand B.
    #[arg(long, required = true, value_name = "PATH")]
    pub b_topology: PathBuf,

    /// 3D structure (.mol2) of ligand B.
    #[arg(long, required = true, value_name = "PATH")]
    pub b_structure: PathBuf,

    /// Coordinates (.gro) of ligand B.
    #[arg(long, required = true, value_name = "PATH")]
    pub b_coordinates: PathBuf,

    // --- Outputs ---
    /// Path for the merged hybrid topology (.itp).
    #[arg(short = 't', long, required = true, value_name = "PATH")]
    pub output_topology: PathBuf,

    /// Path for the merged hybrid coordinates (.gro).
    #[arg(short = 'o', long, required = true, value_name = "PATH")]
    pub output_coordinates: PathBuf,

    /// Also write position restraints that hold every real A atom during the relaxation.
    #[arg(long, value_name = "PATH")]
    pub relaxation_restraints: Option<PathBuf>,

    /// Also write a ligand-in-water system topology.
    #[arg(long, value_name = "PATH", requires = "forcefield_dir")]
    pub water_topology: Option<PathBuf>,

    /// Force-field directory used in the includes of the water topology (e.g., amber99sb-ildn.ff).
    #[arg(long, value_name = "DIR", requires = "water_topology")]
    pub forcefield_dir: Option<String>,

    #[command(flatten)]
    pub poses: PoseOverrides,

    #[command(flatten)]
    pub correspondence: CorrespondenceOverrides,

    #[command(flatten)]
    pub overrides: MergeOverrides,

    #[command(flatten)]
    pub config: ConfigArgs,
}

/// Arguments for the `pose` subcommand.
#[derive(Args, Debug)]
pub struct PoseArgs {
    /// Multi-pose docking output (.mol2).
    #[arg(required = true, value_name = "POSES")]
    pub poses: PathBuf,

    /// Coordinates (.gro) of the ligand in topology atom order.
    #[arg(long, required = true, value_name = "PATH")]
    pub template: PathBuf,

    /// Pose number (1-based). The best-scoring pose is used when absent.
    #[arg(long, value_name = "NUM")]
    pub pose: Option<usize>,

    /// Path for the extracted structure (.mol2).
    #[arg(long, required = true, value_name = "PATH")]
    pub structure: PathBuf,

    /// Path for the extracted coordinates (.gro).
    #[arg(short = 'o', long, required = true, value_name = "PATH")]
    pub coordinates: PathBuf,
}

/// Arguments for the `fix` subcommand.
#[derive(Args, Debug)]
pub struct FixArgs {
    /// Merged hybrid ligand coordinates (.gro).
    #[arg(long, required = true, value_name = "PATH")]
    pub hybrid_coordinates: PathBuf,

    /// Ligand-in-water system topology (.top) used for the relaxation.
    #[arg(long, required = true, value_name = "PATH")]
    pub system_topology: PathBuf,

    /// Receptor coordinates (.gro).
    #[arg(short, long, required = true, value_name = "PATH")]
    pub receptor: PathBuf,

    /// Control parameters (.mdp) of the relaxation.
    #[arg(long, required = true, value_name = "PATH")]
    pub control: PathBuf,

    /// Path for the protein-ligand complex coordinates (.gro).
    #[arg(short, long, required = true, value_name = "PATH")]
    pub output: PathBuf,

    /// Merged ligand topology (.itp); needed by the two outputs below.
    #[arg(long, value_name = "PATH")]
    pub ligand_topology: Option<PathBuf>,

    /// Also write heavy-atom position restraints for production runs.
    #[arg(long, value_name = "PATH")]
    pub heavy_atom_restraints: Option<PathBuf>,

    /// Protein system topology (.top) to rewrite into a complex topology.
    #[arg(long, value_name = "PATH", requires = "complex_topology")]
    pub protein_topology: Option<PathBuf>,

    /// Path for the rewritten complex topology.
    #[arg(long, value_name = "PATH", requires = "protein_topology")]
    pub complex_topology: Option<PathBuf>,

    #[command(flatten)]
    pub engine: EngineOverrides,

    #[command(flatten)]
    pub relaxation: RelaxationOverrides,

    #[command(flatten)]
    pub overrides: MergeOverrides,

    #[command(flatten)]
    pub config: ConfigArgs,
}

/// Arguments for the `run` subcommand.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Edge manifest in TOML format.
    #[arg(required = true, value_name = "MANIFEST")]
    pub manifest: PathBuf,

    /// Validate the manifest and print its edges without running them.
    #[arg(long)]
    pub dry_run: bool,

    #[command(flatten)]
    pub correspondence: CorrespondenceOverrides,

    #[command(flatten)]
    pub engine: EngineOverrides,

    #[command(flatten)]
    pub relaxation: RelaxationOverrides,

    #[command(flatten)]
    pub overrides: MergeOverrides,

    #[command(flatten)]
    pub config: ConfigArgs,
}
