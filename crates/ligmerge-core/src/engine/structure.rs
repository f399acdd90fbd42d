use crate::core::io::gro::{GroAtom, GroFile};
use crate::core::models::hybrid::{HybridAtomOrder, Side};
use thiserror::Error;
use tracing::warn;

const GRO_NAME_WIDTH: usize = 5;

/// Title line of merged ligand coordinate files.
pub const MERGED_TITLE: &str = "Merged ligand";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StructureMismatch {
    #[error("Coordinate file of ligand {side} has {found} atoms but its topology has {expected}")]
    Input {
        side: Side,
        expected: usize,
        found: usize,
    },
    #[error("Merged coordinate file has {found} atoms, expected {expected}")]
    Output { expected: usize, found: usize },
}

/// Merges the coordinate files of A and B along a hybrid atom order.
///
/// Rows `1..=|A|` are A's rows, untouched, so they are written back byte for byte. Each B-only
/// atom follows with its name prefixed by the dummy marker and its serial set to its hybrid
/// index. The box line is A's.
pub struct StructureMerger<'a> {
    order: &'a HybridAtomOrder,
    dummy_marker: &'a str,
}

impl<'a> StructureMerger<'a> {
    pub fn new(order: &'a HybridAtomOrder, dummy_marker: &'a str) -> Self {
        Self {
            order,
            dummy_marker,
        }
    }

    pub fn merge(&self, a: &GroFile, b: &GroFile) -> Result<GroFile, StructureMismatch> {
        check_input(Side::A, self.order.a_count(), a)?;
        check_input(Side::B, self.order.b_count(), b)?;

        let mut atoms: Vec<GroAtom> = Vec::with_capacity(self.order.len());
        atoms.extend(a.atoms.iter().cloned());
        for (hybrid, j) in self.order.b_only() {
            let Some(source) = b.atoms.get(j - 1) else {
                return Err(StructureMismatch::Input {
                    side: Side::B,
                    expected: self.order.b_count(),
                    found: b.atom_count(),
                });
            };
            let mut atom = source.clone();
            let name = format!("{}{}", self.dummy_marker, source.name());
            if name.chars().count() > GRO_NAME_WIDTH {
                warn!(
                    atom = %name,
                    hybrid_index = hybrid,
                    "Dummy atom name exceeds the coordinate name field and will be truncated"
                );
            }
            atom.set_name(name);
            atom.set_serial(hybrid);
            atoms.push(atom);
        }

        if atoms.len() != self.order.len() {
            return Err(StructureMismatch::Output {
                expected: self.order.len(),
                found: atoms.len(),
            });
        }

        Ok(GroFile {
            title: MERGED_TITLE.to_string(),
            atoms,
            box_vectors: a.box_vectors.clone(),
            precision: a.precision,
        })
    }
}

fn check_input(side: Side, expected: usize, file: &GroFile) -> Result<(), StructureMismatch> {
    if file.atom_count() == expected {
        Ok(())
    } else {
        Err(StructureMismatch::Input {
            side,
            expected,
            found: file.atom_count(),
        })
    }
}
