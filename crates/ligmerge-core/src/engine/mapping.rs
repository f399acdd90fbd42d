use super::oracle::AtomPair;
use crate::core::models::hybrid::{HybridAtomOrder, Provenance, Side};
use crate::core::models::topology::LigandTopology;
use std::collections::HashSet;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CorrespondenceError {
    #[error("Atom {a} of ligand A is matched to both atom {first} and atom {second} of ligand B")]
    ConflictingA { a: usize, first: usize, second: usize },
    #[error("Atom {b} of ligand B is matched to both atom {first} and atom {second} of ligand A")]
    ConflictingB { b: usize, first: usize, second: usize },
    #[error("Correspondence references atom {index} of ligand {side}, which has {count} atoms")]
    OutOfRange { side: Side, index: usize, count: usize },
    #[error("Hybrid index space is not a bijection: {0}")]
    NotBijective(String),
}

/// Builds the hybrid index space of two ligands from a heavy-atom correspondence.
///
/// The mapper extends the oracle's heavy-atom pairs with hydrogens (for each matched heavy
/// pair, the bonded hydrogens of both sides are sorted by index and paired positionally up to
/// the smaller count), then lays out the hybrid order: A's atoms keep their indices and every
/// unmatched B atom is appended in ascending B order.
pub struct AtomIndexMapper<'a> {
    a: &'a LigandTopology,
    b: &'a LigandTopology,
}

impl<'a> AtomIndexMapper<'a> {
    pub fn new(a: &'a LigandTopology, b: &'a LigandTopology) -> Self {
        Self { a, b }
    }

    /// Maps the two ligands into one hybrid index space.
    ///
    /// An empty correspondence is valid and yields the concatenation of A and B.
    ///
    /// # Errors
    ///
    /// Returns [`CorrespondenceError`] if a pair references a nonexistent atom or an atom is
    /// matched to two different partners. Exact duplicate pairs are accepted once.
    pub fn map(&self, heavy_pairs: &[AtomPair]) -> Result<HybridAtomOrder, CorrespondenceError> {
        let heavy = self.validate(heavy_pairs)?;
        let matched = self.expand_hydrogens(&heavy);
        debug!(
            heavy = heavy.len(),
            hydrogens = matched.len() - heavy.len(),
            "Expanded correspondence with bonded hydrogens"
        );
        let order = self.build_order(&matched)?;
        verify_bijection(&order)?;
        Ok(order)
    }

    fn validate(&self, pairs: &[AtomPair]) -> Result<Vec<AtomPair>, CorrespondenceError> {
        let a_count = self.a.atom_count();
        let b_count = self.b.atom_count();
        let mut a_to_b = vec![None; a_count + 1];
        let mut b_to_a = vec![None; b_count + 1];
        let mut unique = Vec::with_capacity(pairs.len());

        for &pair in pairs {
            check_range(Side::A, pair.a, a_count)?;
            check_range(Side::B, pair.b, b_count)?;
            match (a_to_b[pair.a], b_to_a[pair.b]) {
                (Some(b), _) if b == pair.b => continue,
                (Some(first), _) => {
                    return Err(CorrespondenceError::ConflictingA {
                        a: pair.a,
                        first,
                        second: pair.b,
                    });
                }
                (None, Some(first)) => {
                    return Err(CorrespondenceError::ConflictingB {
                        b: pair.b,
                        first,
                        second: pair.a,
                    });
                }
                (None, None) => {
                    a_to_b[pair.a] = Some(pair.b);
                    b_to_a[pair.b] = Some(pair.a);
                    unique.push(pair);
                }
            }
        }
        Ok(unique)
    }

    fn expand_hydrogens(&self, heavy: &[AtomPair]) -> Vec<AtomPair> {
        let hydrogens_a = self.a.bonded_hydrogens();
        let hydrogens_b = self.b.bonded_hydrogens();
        let mut used_a: HashSet<usize> = heavy.iter().map(|p| p.a).collect();
        let mut used_b: HashSet<usize> = heavy.iter().map(|p| p.b).collect();

        let mut matched = heavy.to_vec();
        for pair in heavy {
            let free_a = hydrogens_a[pair.a].iter().filter(|h| !used_a.contains(*h));
            let free_b = hydrogens_b[pair.b].iter().filter(|h| !used_b.contains(*h));
            let new_pairs: Vec<AtomPair> = free_a
                .zip(free_b)
                .map(|(&ha, &hb)| AtomPair::new(ha, hb))
                .collect();
            for p in new_pairs {
                used_a.insert(p.a);
                used_b.insert(p.b);
                matched.push(p);
            }
        }
        matched
    }

    fn build_order(&self, matched: &[AtomPair]) -> Result<HybridAtomOrder, CorrespondenceError> {
        let a_count = self.a.atom_count();
        let b_count = self.b.atom_count();
        let mut a_to_b = vec![None; a_count + 1];
        let mut b_to_a = vec![None; b_count + 1];
        for pair in matched {
            a_to_b[pair.a] = Some(pair.b);
            b_to_a[pair.b] = Some(pair.a);
        }

        let mut slots: Vec<Provenance> = (1..=a_count)
            .map(|i| match a_to_b[i] {
                Some(j) => Provenance::Fused(i, j),
                None => Provenance::FromA(i),
            })
            .collect();
        let mut b_to_hybrid = Vec::with_capacity(b_count);
        for j in 1..=b_count {
            match b_to_a[j] {
                Some(i) => b_to_hybrid.push(i),
                None => {
                    slots.push(Provenance::FromB(j));
                    b_to_hybrid.push(slots.len());
                }
            }
        }
        Ok(HybridAtomOrder::from_parts(slots, b_to_hybrid, a_count))
    }
}

fn check_range(side: Side, index: usize, count: usize) -> Result<(), CorrespondenceError> {
    if (1..=count).contains(&index) {
        Ok(())
    } else {
        Err(CorrespondenceError::OutOfRange { side, index, count })
    }
}

/// Checks the invariants of a hybrid order: identity prefix over A, trailing B-only atoms,
/// and every B atom mapped to exactly one hybrid slot that points back at it.
pub(crate) fn verify_bijection(order: &HybridAtomOrder) -> Result<(), CorrespondenceError> {
    let fail = |msg: String| Err(CorrespondenceError::NotBijective(msg));

    for (h, provenance) in order.iter() {
        let ok = if h <= order.a_count() {
            provenance.a_index() == Some(h)
        } else {
            matches!(provenance, Provenance::FromB(_))
        };
        if !ok {
            return fail(format!("hybrid atom {h} has provenance {provenance:?}"));
        }
    }

    let mut seen = vec![false; order.len() + 1];
    for j in 1..=order.b_count() {
        let Some(h) = order.hybrid_of_b(j) else {
            return fail(format!("atom {j} of ligand B has no hybrid index"));
        };
        if order.provenance(h).and_then(Provenance::b_index) != Some(j) {
            return fail(format!("atom {j} of ligand B maps to hybrid atom {h}, which is not it"));
        }
        if std::mem::replace(&mut seen[h], true) {
            return fail(format!("hybrid atom {h} is claimed by two atoms of ligand B"));
        }
    }

    let expected = order.a_count() + order.b_only_count();
    if order.len() != expected {
        return fail(format!("{} hybrid atoms, expected {expected}", order.len()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::atom::{AtomRecord, AtomState};
    use crate::core::models::bonded::BondedRecord;
    use crate::core::models::topology::MoleculeType;

    fn ligand(types: &[&str], bonds: &[(usize, usize)]) -> LigandTopology {
        LigandTopology {
            atom_types: Vec::new(),
            molecule: MoleculeType {
                name: "MOL".to_string(),
                exclusions: 3,
            },
            atoms: types
                .iter()
                .enumerate()
                .map(|(k, t)| AtomRecord {
                    index: k + 1,
                    residue_number: 1,
                    residue_name: "MOL".to_string(),
                    name: format!("X{}", k + 1),
                    charge_group: k + 1,
                    state: AtomState::new(*t, "0.0".parse().unwrap(), "1.0".parse().unwrap()),
                    state_b: None,
                })
                .collect(),
            bonds: bonds
                .iter()
                .map(|&(i, j)| BondedRecord::new(vec![i, j], 1, Vec::new()))
                .collect(),
            pairs: Vec::new(),
            angles: Vec::new(),
            dihedrals: Vec::new(),
        }
    }

    fn pairs(list: &[(usize, usize)]) -> Vec<AtomPair> {
        list.iter().map(|&(a, b)| AtomPair::new(a, b)).collect()
    }

    #[test]
    fn five_and_six_atom_ligands_share_four_atoms() {
        let a = ligand(&["c3", "c3", "c3", "c3", "oh"], &[(1, 2), (2, 3), (3, 4), (4, 5)]);
        let b = ligand(
            &["c3", "c3", "c3", "c3", "n3", "n3"],
            &[(1, 2), (2, 3), (3, 4), (4, 5), (4, 6)],
        );

        let order = AtomIndexMapper::new(&a, &b)
            .map(&pairs(&[(1, 1), (2, 2), (3, 3), (4, 4)]))
            .unwrap();

        assert_eq!(order.len(), 7);
        assert_eq!(order.provenance(1), Some(Provenance::Fused(1, 1)));
        assert_eq!(order.provenance(5), Some(Provenance::FromA(5)));
        assert_eq!(order.provenance(6), Some(Provenance::FromB(5)));
        assert_eq!(order.provenance(7), Some(Provenance::FromB(6)));
        assert_eq!(order.hybrid_of_b(6), Some(7));
    }

    #[test]
    fn hydrogens_are_paired_positionally_up_to_smaller_count() {
        // A: C1 with H2, H3, H4. B: C1 with H3, H2 (bond order scrambled), plus O4.
        let a = ligand(&["c3", "hc", "hc", "hc"], &[(1, 4), (1, 2), (1, 3)]);
        let b = ligand(&["c3", "hc", "hc", "oh"], &[(1, 3), (1, 2), (1, 4)]);

        let order = AtomIndexMapper::new(&a, &b).map(&pairs(&[(1, 1)])).unwrap();

        assert_eq!(order.provenance(2), Some(Provenance::Fused(2, 2)));
        assert_eq!(order.provenance(3), Some(Provenance::Fused(3, 3)));
        assert_eq!(order.provenance(4), Some(Provenance::FromA(4)));
        assert_eq!(order.provenance(5), Some(Provenance::FromB(4)));
        assert_eq!(order.len(), 5);
    }

    #[test]
    fn empty_correspondence_concatenates_the_ligands() {
        let a = ligand(&["c3", "hc"], &[(1, 2)]);
        let b = ligand(&["n3", "hn", "hn"], &[(1, 2), (1, 3)]);

        let order = AtomIndexMapper::new(&a, &b).map(&[]).unwrap();

        assert_eq!(order.len(), 5);
        assert_eq!(order.fused_count(), 0);
        assert_eq!(order.b_only().collect::<Vec<_>>(), vec![(3, 1), (4, 2), (5, 3)]);
    }

    #[test]
    fn conflicting_pairs_are_rejected() {
        let a = ligand(&["c3", "c3"], &[(1, 2)]);
        let b = ligand(&["c3", "c3"], &[(1, 2)]);
        let mapper = AtomIndexMapper::new(&a, &b);

        assert_eq!(
            mapper.map(&pairs(&[(1, 1), (1, 2)])).unwrap_err(),
            CorrespondenceError::ConflictingA { a: 1, first: 1, second: 2 }
        );
        assert_eq!(
            mapper.map(&pairs(&[(1, 1), (2, 1)])).unwrap_err(),
            CorrespondenceError::ConflictingB { b: 1, first: 1, second: 2 }
        );
    }

    #[test]
    fn duplicate_identical_pairs_are_accepted_once() {
        let a = ligand(&["c3", "c3"], &[(1, 2)]);
        let b = ligand(&["c3", "c3"], &[(1, 2)]);
        let order = AtomIndexMapper::new(&a, &b)
            .map(&pairs(&[(1, 1), (1, 1), (2, 2)]))
            .unwrap();
        assert_eq!(order.len(), 2);
    }

    #[test]
    fn out_of_range_indices_are_rejected() {
        let a = ligand(&["c3"], &[]);
        let b = ligand(&["c3"], &[]);
        let err = AtomIndexMapper::new(&a, &b)
            .map(&pairs(&[(1, 2)]))
            .unwrap_err();
        assert_eq!(
            err,
            CorrespondenceError::OutOfRange { side: Side::B, index: 2, count: 1 }
        );
    }

    #[test]
    fn hydrogens_matched_by_the_oracle_are_not_paired_again() {
        let a = ligand(&["c3", "hc", "hc"], &[(1, 2), (1, 3)]);
        let b = ligand(&["c3", "hc", "hc"], &[(1, 2), (1, 3)]);
        let order = AtomIndexMapper::new(&a, &b)
            .map(&pairs(&[(1, 1), (2, 3)]))
            .unwrap();
        assert_eq!(order.provenance(2), Some(Provenance::Fused(2, 3)));
        assert_eq!(order.provenance(3), Some(Provenance::Fused(3, 2)));
        assert_eq!(order.len(), 3);
    }

    #[test]
    fn verification_rejects_a_broken_prefix() {
        let broken = HybridAtomOrder::from_parts(
            vec![Provenance::FromB(1), Provenance::FromA(2)],
            vec![1],
            2,
        );
        assert!(matches!(
            verify_bijection(&broken),
            Err(CorrespondenceError::NotBijective(_))
        ));
    }
}
