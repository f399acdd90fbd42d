//! Fusion of two single-ligand topologies into one dual-state hybrid topology.
//!
//! The pipeline is a chain of pure functions over immutable inputs:
//! atom rows and dummy identities ([`atoms`]), then one [`bonded::BondedTermMerger`] pass per
//! interaction category, then the dihedral companion rows ([`dihedrals`]).

mod atoms;
mod bonded;
mod dihedrals;

use crate::core::io::error::FormatErrorKind;
use crate::core::models::bonded::TermKind;
use crate::core::models::hybrid::{HybridAtomOrder, HybridTopology};
use crate::core::models::topology::{LigandTopology, MoleculeType};
use crate::engine::config::MergeConfig;
use crate::engine::mapping::CorrespondenceError;
use bonded::BondedTermMerger;
use tracing::debug;

/// Checks that two ligand headers can share one hybrid molecule header.
///
/// Molecule names may differ (the hybrid is renamed anyway) but the exclusion count applies
/// to the whole hybrid molecule and must agree.
pub fn check_headers(a: &MoleculeType, b: &MoleculeType) -> Result<(), FormatErrorKind> {
    if a.exclusions == b.exclusions {
        Ok(())
    } else {
        Err(FormatErrorKind::HeaderMismatch {
            expected: format!("nrexcl {}", a.exclusions),
            found: format!("nrexcl {}", b.exclusions),
        })
    }
}

/// Checks that a ligand has no explicit state B columns.
///
/// A hybrid derives every B state from the B ligand, so an input that is itself dual-state
/// would have its B columns silently replaced.
pub fn check_single_state(topology: &LigandTopology) -> Result<(), FormatErrorKind> {
    match topology.atoms.iter().find(|atom| atom.state_b.is_some()) {
        Some(atom) => Err(FormatErrorKind::AlreadyDualState { index: atom.index }),
        None => Ok(()),
    }
}

/// Merges ligands A and B over a verified hybrid atom order.
pub struct TopologyMerger<'a> {
    a: &'a LigandTopology,
    b: &'a LigandTopology,
    order: &'a HybridAtomOrder,
    config: &'a MergeConfig,
}

impl<'a> TopologyMerger<'a> {
    pub fn new(
        a: &'a LigandTopology,
        b: &'a LigandTopology,
        order: &'a HybridAtomOrder,
        config: &'a MergeConfig,
    ) -> Self {
        Self {
            a,
            b,
            order,
            config,
        }
    }

    /// Builds the hybrid topology.
    ///
    /// # Errors
    ///
    /// Returns [`CorrespondenceError::OutOfRange`] if the order references an atom the
    /// topologies do not have, which means it was built for different inputs.
    pub fn merge(&self) -> Result<HybridTopology, CorrespondenceError> {
        let (atoms, dummy_types) = atoms::merge_atoms(self.a, self.b, self.order, self.config)?;
        let atom_types = atoms::merge_atom_types(&self.a.atom_types, &self.b.atom_types);

        let merger = BondedTermMerger::new(self.order);
        let terms = |kind| merger.merge(kind, self.a.terms(kind), self.b.terms(kind));
        let bonds = terms(TermKind::Bond)?;
        let pairs = terms(TermKind::Pair)?;
        let angles = terms(TermKind::Angle)?;
        let (dihedrals, reviews) =
            dihedrals::append_dummy_companions(terms(TermKind::Dihedral)?, self.order);

        debug!(
            atoms = atoms.len(),
            dummy_types = dummy_types.len(),
            bonds = bonds.len(),
            pairs = pairs.len(),
            angles = angles.len(),
            dihedrals = dihedrals.len(),
            companions = reviews.len(),
            "Merged topology sections"
        );

        Ok(HybridTopology {
            molecule: MoleculeType {
                name: self.config.molecule_name.clone(),
                exclusions: self.a.molecule.exclusions,
            },
            atom_types,
            dummy_types,
            atoms,
            bonds,
            pairs,
            angles,
            dihedrals,
            reviews,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::io::traits::TextFile;
    use crate::core::models::hybrid::TermOrigin;
    use crate::engine::mapping::AtomIndexMapper;
    use crate::engine::oracle::AtomPair;

    const ETHANOL: &str = "\
[ moleculetype ]
LIG 3
[ atoms ]
1 c3 1 LIG C1 1 -0.1 12.01
2 c3 1 LIG C2 2 0.1 12.01
3 oh 1 LIG O1 3 -0.6 16.00
4 ho 1 LIG H1 4 0.4 1.008
5 hc 1 LIG H2 5 0.1 1.008
[ bonds ]
1 2 1 0.15 2.5e5
2 3 1 0.14 2.6e5
3 4 1 0.10 3.1e5
1 5 1 0.11 2.8e5
[ pairs ]
1 4 1
[ angles ]
1 2 3 1 109.5 400
2 3 4 1 108.0 390
[ dihedrals ]
1 2 3 4 9 0.0 0.65 3
5 1 2 3 9 0.0 0.65 3
";

    fn ethanol() -> LigandTopology {
        LigandTopology::parse(ETHANOL).unwrap()
    }

    #[test]
    fn self_merge_reproduces_the_ligand() {
        let a = ethanol();
        let b = ethanol();
        let pairs: Vec<AtomPair> = [1, 2, 3].iter().map(|&i| AtomPair::new(i, i)).collect();
        let order = AtomIndexMapper::new(&a, &b).map(&pairs).unwrap();
        let config = MergeConfig::default();

        let hybrid = TopologyMerger::new(&a, &b, &order, &config).merge().unwrap();

        assert_eq!(hybrid.atom_count(), 5);
        assert_eq!(hybrid.dummy_atom_count(), 0);
        assert!(hybrid.dummy_types.is_empty());
        assert!(hybrid.reviews.is_empty());
        for kind in TermKind::ALL {
            let merged = hybrid.terms(kind);
            assert_eq!(merged.len(), a.terms(kind).len(), "{kind}");
            for (row, source) in merged.iter().zip(a.terms(kind)) {
                assert_eq!(row.origin, TermOrigin::Fused);
                assert_eq!(row.record.atoms, source.atoms);
                assert_eq!(row.record.params_a, source.params_a);
                assert_eq!(row.record.params_b.as_ref(), Some(&source.params_a));
            }
        }
        assert!(hybrid.atoms.iter().all(|atom| !atom.writes_state_b));
    }

    #[test]
    fn disjoint_merge_conserves_every_term() {
        let a = ethanol();
        let b = ethanol();
        let order = AtomIndexMapper::new(&a, &b).map(&[]).unwrap();
        let config = MergeConfig::default();

        let hybrid = TopologyMerger::new(&a, &b, &order, &config).merge().unwrap();

        assert_eq!(hybrid.atom_count(), 10);
        for kind in [TermKind::Bond, TermKind::Pair, TermKind::Angle] {
            assert_eq!(hybrid.terms(kind).len(), 2 * a.terms(kind).len());
        }
        let dihedral_rows = hybrid
            .dihedrals
            .iter()
            .filter(|t| t.origin != TermOrigin::Companion)
            .count();
        assert_eq!(dihedral_rows, 4);
        assert_eq!(hybrid.reviews.len(), 4);
        assert_eq!(hybrid.dihedrals.len(), 8);
        assert_eq!(hybrid.bonds[4].record.atoms, vec![6, 7]);
    }

    #[test]
    fn dual_state_input_is_rejected() {
        assert!(check_single_state(&ethanol()).is_ok());
        let dual = ETHANOL.replace(
            "3 oh 1 LIG O1 3 -0.6 16.00",
            "3 oh 1 LIG O1 3 -0.6 16.00 DUM_oh 0.0 16.00",
        );
        let topology = LigandTopology::parse(&dual).unwrap();
        assert_eq!(
            check_single_state(&topology),
            Err(FormatErrorKind::AlreadyDualState { index: 3 })
        );
    }

    #[test]
    fn header_exclusions_must_agree() {
        let a = MoleculeType {
            name: "A".to_string(),
            exclusions: 3,
        };
        let b = MoleculeType {
            name: "B".to_string(),
            exclusions: 2,
        };
        assert!(check_headers(&a, &a).is_ok());
        assert!(matches!(
            check_headers(&a, &b),
            Err(FormatErrorKind::HeaderMismatch { .. })
        ));
    }
}
