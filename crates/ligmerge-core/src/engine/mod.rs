//! # Engine Module
//!
//! The merge pipeline of the hybrid-ligand builder and the collaborators it calls out to.
//!
//! ## Architecture
//!
//! - **Configuration** ([`config`]) - Merge, relaxation and MD-engine settings with validating
//!   builders
//! - **Correspondence** ([`oracle`], [`mapping`]) - The injected heavy-atom matcher and the
//!   [`mapping::AtomIndexMapper`] that turns its output into a hybrid atom order
//! - **Topology merge** ([`merge`]) - Atom rows, dummy identities and dual-state bonded terms
//! - **Structure merge** ([`structure`]) - The hybrid coordinate file
//! - **Relaxation** ([`md`], [`assembly`]) - The external MD engine contract and the
//!   shift/relax/unshift/assemble state machine
//! - **Progress Monitoring** ([`progress`]) and **Error Handling** ([`error`])
//!
//! Every stage is a function of its inputs. Nothing here keeps state between merges, so
//! independent edges can run on separate threads without coordination.

pub mod assembly;
pub mod config;
pub mod error;
pub mod mapping;
pub mod md;
pub mod merge;
pub mod oracle;
pub mod progress;
pub mod structure;
