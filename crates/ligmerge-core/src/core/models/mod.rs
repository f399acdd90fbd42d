//! Typed records for ligand topologies and the hybrid topology built from two of them.
//!
//! A single-ligand topology ([`topology::LigandTopology`]) is a list of [`atom::AtomRecord`]s
//! addressed by their dense 1-based source index, plus one list of [`bonded::BondedRecord`]s
//! per interaction category. The hybrid side ([`hybrid`]) describes how the two index spaces
//! are fused into one and carries the merged, dual-state rows ready for serialization.

pub mod atom;
pub mod bonded;
pub mod hybrid;
pub mod number;
pub mod topology;
