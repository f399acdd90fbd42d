//! # ligmerge Core Library
//!
//! Builds dual-topology hybrid ligands for alchemical free-energy simulations: given the
//! topologies and coordinates of two related ligands (end-states A and B), it produces a single
//! topology and coordinate set that a molecular-dynamics engine can simulate while
//! interconverting A into B.
//!
//! ## Architectural Philosophy
//!
//! The library follows a strict three-layer architecture:
//!
//! - **[`core`]: The Foundation.** Immutable data models (`LigandTopology`, `HybridTopology`,
//!   `GroFile`) and the text formats they are read from and written to.
//!
//! - **[`engine`]: The Logic Core.** The merge pipeline itself: the atom correspondence
//!   oracle seam, the `AtomIndexMapper` that builds the hybrid index space, the bonded-term
//!   merger, the structure merger and the complex assembler that delegates relaxation to an
//!   external MD engine.
//!
//! - **[`workflows`]: The Public API.** File-to-file entry points (`merge_topologies`,
//!   `fix_structure`) and a batch runner that processes independent edges in parallel.

pub mod core;
pub mod engine;
pub mod workflows;
