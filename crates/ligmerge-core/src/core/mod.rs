//! # Core Module
//!
//! Stateless building blocks of the hybrid-ligand pipeline.
//!
//! - **Data Models** ([`models`]) - Atom and bonded-term records of a single ligand topology,
//!   and the hybrid index space and merged topology built from two of them.
//! - **File I/O** ([`io`]) - Section-based topology parsing and column-exact writing,
//!   coordinate (`.gro`) and 3D structure (`.mol2`) files, position restraints and
//!   system-topology summaries.
//!
//! Nothing in this module holds state across merges; every value is created fresh from the
//! input files of one edge and dropped once the outputs are written.

pub mod io;
pub mod models;
