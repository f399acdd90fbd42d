//! The injected seam that decides which atoms of A and B are the same physical atom.
//!
//! [`AtomCorrespondenceOracle`] is narrow: two structure files in, a list of
//! heavy-atom index pairs out. Everything downstream of it is exercised in tests with
//! [`ExplicitCorrespondence`]; production runs plug in a mapping file produced by an external
//! alignment tool or, for poses that already share a frame, [`ProximityCorrespondence`].

use crate::core::io::error::{FormatError, ReadError};
use crate::core::io::mol2::{Mol2Atom, Mol2Structure};
use crate::core::io::traits::TextFile;
use kiddo::{KdTree, SquaredEuclidean};
use serde::Deserialize;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// A claim that atom `a` of ligand A and atom `b` of ligand B are the same physical atom.
///
/// Both indices are 1-based and follow the atom order of the respective topology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
pub struct AtomPair {
    pub a: usize,
    pub b: usize,
}

impl AtomPair {
    pub fn new(a: usize, b: usize) -> Self {
        Self { a, b }
    }
}

#[derive(Debug, Error)]
pub enum OracleError {
    #[error("Failed to read '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Malformed structure '{}': {source}", .path.display())]
    Structure {
        path: PathBuf,
        #[source]
        source: FormatError,
    },
    #[error("Malformed mapping file '{}': {source}", .path.display())]
    Mapping {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

impl OracleError {
    fn from_read(path: &Path, error: ReadError) -> Self {
        match error {
            ReadError::Io(source) => OracleError::Io {
                path: path.to_path_buf(),
                source,
            },
            ReadError::Format(source) => OracleError::Structure {
                path: path.to_path_buf(),
                source,
            },
        }
    }
}

/// Matches heavy atoms between two 3D ligand structures.
///
/// Implementations return a partial mapping: atoms without a counterpart are simply absent.
/// The result is validated downstream, so an oracle that reports an atom twice is caught there
/// rather than silently accepted.
pub trait AtomCorrespondenceOracle: Send + Sync {
    fn correspond(&self, structure_a: &Path, structure_b: &Path) -> Result<Vec<AtomPair>, OracleError>;
}

/// A fixed list of pairs, independent of the structures.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExplicitCorrespondence {
    pairs: Vec<AtomPair>,
}

impl ExplicitCorrespondence {
    pub fn new(pairs: Vec<AtomPair>) -> Self {
        Self { pairs }
    }

    /// Maps atoms `1..=n` of A onto atoms `1..=n` of B.
    pub fn identity(n: usize) -> Self {
        Self::new((1..=n).map(|i| AtomPair::new(i, i)).collect())
    }
}

impl AtomCorrespondenceOracle for ExplicitCorrespondence {
    fn correspond(&self, _: &Path, _: &Path) -> Result<Vec<AtomPair>, OracleError> {
        Ok(self.pairs.clone())
    }
}

/// Pairs read from a CSV file with an `a,b` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingFileCorrespondence {
    path: PathBuf,
}

impl MappingFileCorrespondence {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AtomCorrespondenceOracle for MappingFileCorrespondence {
    fn correspond(&self, _: &Path, _: &Path) -> Result<Vec<AtomPair>, OracleError> {
        let mapping_error = |source| OracleError::Mapping {
            path: self.path.clone(),
            source,
        };
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .comment(Some(b'#'))
            .from_path(&self.path)
            .map_err(mapping_error)?;
        let pairs = reader
            .deserialize::<AtomPair>()
            .collect::<Result<Vec<_>, _>>()
            .map_err(mapping_error)?;
        debug!(path = %self.path.display(), pairs = pairs.len(), "Read correspondence mapping");
        Ok(pairs)
    }
}

/// Default distance below which two heavy atoms of pre-aligned poses are considered the same.
pub const DEFAULT_PROXIMITY_CUTOFF: f64 = 0.5;

/// Matches heavy atoms of two poses that already share a coordinate frame.
///
/// Two atoms are paired when they have the same element and each is the other's nearest heavy
/// atom within the cutoff (in Angstroms). Mutual nearest neighbours are one-to-one by
/// construction. This does not align anything; poses from different frames will simply not
/// match.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProximityCorrespondence {
    cutoff: f64,
}

impl Default for ProximityCorrespondence {
    fn default() -> Self {
        Self::new(DEFAULT_PROXIMITY_CUTOFF)
    }
}

impl ProximityCorrespondence {
    pub fn new(cutoff: f64) -> Self {
        Self { cutoff }
    }

    pub fn cutoff(&self) -> f64 {
        self.cutoff
    }

    /// Pairs heavy atoms of two parsed structures.
    pub fn match_structures(&self, a: &Mol2Structure, b: &Mol2Structure) -> Vec<AtomPair> {
        let heavy_a: Vec<&Mol2Atom> = a.atoms.iter().filter(|x| !x.is_hydrogen()).collect();
        let heavy_b: Vec<&Mol2Atom> = b.atoms.iter().filter(|x| !x.is_hydrogen()).collect();
        if heavy_a.is_empty() || heavy_b.is_empty() {
            return Vec::new();
        }

        let tree_a = build_tree(&heavy_a);
        let tree_b = build_tree(&heavy_b);
        let cutoff_sq = self.cutoff * self.cutoff;

        let mut pairs = Vec::new();
        for (ia, atom_a) in heavy_a.iter().enumerate() {
            let forward = tree_b.nearest_one::<SquaredEuclidean>(&coords(atom_a));
            if forward.distance > cutoff_sq {
                continue;
            }
            let atom_b = heavy_b[forward.item as usize];
            if atom_b.element() != atom_a.element() {
                continue;
            }
            let backward = tree_a.nearest_one::<SquaredEuclidean>(&coords(atom_b));
            if backward.item as usize == ia {
                pairs.push(AtomPair::new(atom_a.id, atom_b.id));
            }
        }
        pairs
    }
}

fn coords(atom: &Mol2Atom) -> [f64; 3] {
    [atom.position.x, atom.position.y, atom.position.z]
}

fn build_tree(atoms: &[&Mol2Atom]) -> KdTree<f64, 3> {
    let mut tree: KdTree<f64, 3> = KdTree::with_capacity(atoms.len());
    for (idx, atom) in atoms.iter().enumerate() {
        tree.add(&coords(atom), idx as u64);
    }
    tree
}

impl AtomCorrespondenceOracle for ProximityCorrespondence {
    fn correspond(&self, structure_a: &Path, structure_b: &Path) -> Result<Vec<AtomPair>, OracleError> {
        let a = Mol2Structure::read_from_path(structure_a)
            .map_err(|e| OracleError::from_read(structure_a, e))?;
        let b = Mol2Structure::read_from_path(structure_b)
            .map_err(|e| OracleError::from_read(structure_b, e))?;
        let pairs = self.match_structures(&a, &b);
        debug!(
            matched = pairs.len(),
            atoms_a = a.atoms.len(),
            atoms_b = b.atoms.len(),
            "Matched heavy atoms by proximity"
        );
        Ok(pairs)
    }
}
