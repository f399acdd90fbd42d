//! # Workflows Module
//!
//! File-to-file entry points of the hybrid-ligand builder.
//!
//! - **Merge** ([`merge`]) - [`merge::merge_topologies`] reads two end-state ligands, asks the
//!   correspondence oracle for matched atoms and writes the hybrid topology, coordinates and
//!   optional restraint and system files.
//! - **Poses** ([`poses`]) - [`poses::extract_pose`] takes one pose of a docking output,
//!   the best-scoring one by default, as a ligand structure and coordinate file.
//! - **Structure fix** ([`fix`]) - [`fix::fix_structure`] relaxes the hybrid ligand with the
//!   external MD engine and assembles it with the receptor.
//! - **Batch** ([`edges`]) - [`edges::run_edges`] runs a manifest of independent edges, in
//!   parallel when the `parallel` feature is enabled.
//!
//! Each workflow computes its outputs completely before writing any of them.

pub mod edges;
pub mod fix;
pub mod merge;
pub mod poses;
