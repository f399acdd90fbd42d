use super::merge::describe_pose;
use crate::cli::PoseArgs;
use crate::error::Result;
use ligmerge::workflows::poses::{PoseSource, extract_pose};
use tracing::info;

pub fn run(args: PoseArgs) -> Result<()> {
    let source = PoseSource {
        file: args.poses,
        template: args.template,
        pose: args.pose,
    };
    info!("Extracting a pose from '{}'...", source.file.display());
    let selected = extract_pose(&source, &args.structure, &args.coordinates)?;

    println!("{}", describe_pose("Ligand", &selected));
    for path in &selected.written {
        println!("  Written: {}", path.display());
    }
    Ok(())
}
