use super::dihedrals::{multiplicity, zero_force_constants};
use crate::core::models::bonded::{BondedRecord, TermKind};
use crate::core::models::hybrid::{HybridAtomOrder, MergedTerm, Side, TermOrigin};
use crate::core::models::number::Number;
use crate::engine::mapping::CorrespondenceError;
use std::collections::{HashMap, VecDeque};

/// Identity of a bonded term for fusion across the two end-states.
///
/// Participants are compared up to reversal (`i-j-k` equals `k-j-i`), the function type must
/// match and periodic dihedrals additionally match on multiplicity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct TermKey {
    atoms: Vec<usize>,
    function: u32,
    multiplicity: Option<i64>,
}

impl TermKey {
    fn of(kind: TermKind, atoms: &[usize], function: u32, params: &[Number]) -> Self {
        let reversed: Vec<usize> = atoms.iter().rev().copied().collect();
        let atoms = if reversed.as_slice() < atoms {
            reversed
        } else {
            atoms.to_vec()
        };
        let multiplicity = match kind {
            TermKind::Dihedral => multiplicity(function, params),
            _ => None,
        };
        Self {
            atoms,
            function,
            multiplicity,
        }
    }
}

/// The parameters of the state in which a term does not exist.
///
/// Bonds and angles keep their geometry (the present state's parameters are mirrored), pairs
/// carry no parameters at all and dihedrals are switched off by zeroing their force constants.
fn absent_state(kind: TermKind, function: u32, present: &[Number]) -> Vec<Number> {
    match kind {
        TermKind::Bond | TermKind::Angle | TermKind::Pair => present.to_vec(),
        TermKind::Dihedral => zero_force_constants(function, present),
    }
}

/// Merges the records of one interaction category from both end-states into dual-state rows
/// in hybrid index space.
///
/// A's records come first, in their original order, each paired with the absent state in B.
/// Each B record is translated into hybrid indices and fused into the first unclaimed A row
/// with the same [`TermKey`]; a B record with no such row is appended, paired with the absent
/// state in A. Every input record therefore ends up in exactly one output row. Lookups go
/// through a hash map of per-key queues, so the merge is linear in the number of records.
pub(crate) struct BondedTermMerger<'a> {
    order: &'a HybridAtomOrder,
}

impl<'a> BondedTermMerger<'a> {
    pub(crate) fn new(order: &'a HybridAtomOrder) -> Self {
        Self { order }
    }

    pub(crate) fn merge(
        &self,
        kind: TermKind,
        a_terms: &[BondedRecord],
        b_terms: &[BondedRecord],
    ) -> Result<Vec<MergedTerm>, CorrespondenceError> {
        let mut rows: Vec<MergedTerm> = Vec::with_capacity(a_terms.len() + b_terms.len());
        let mut unclaimed: HashMap<TermKey, VecDeque<usize>> = HashMap::new();

        for record in a_terms {
            let key = TermKey::of(kind, &record.atoms, record.function, &record.params_a);
            unclaimed.entry(key).or_default().push_back(rows.len());
            rows.push(MergedTerm {
                record: BondedRecord {
                    atoms: record.atoms.clone(),
                    function: record.function,
                    params_a: record.params_a.clone(),
                    params_b: Some(absent_state(kind, record.function, &record.params_a)),
                },
                origin: TermOrigin::StateA,
            });
        }

        for record in b_terms {
            let atoms = self.translate(&record.atoms)?;
            let key = TermKey::of(kind, &atoms, record.function, &record.params_a);
            match unclaimed.get_mut(&key).and_then(VecDeque::pop_front) {
                Some(slot) => {
                    let row = &mut rows[slot];
                    row.record.params_b = Some(record.params_a.clone());
                    row.origin = TermOrigin::Fused;
                }
                None => rows.push(MergedTerm {
                    record: BondedRecord {
                        atoms,
                        function: record.function,
                        params_a: absent_state(kind, record.function, &record.params_a),
                        params_b: Some(record.params_a.clone()),
                    },
                    origin: TermOrigin::StateB,
                }),
            }
        }

        Ok(rows)
    }

    fn translate(&self, atoms: &[usize]) -> Result<Vec<usize>, CorrespondenceError> {
        atoms
            .iter()
            .map(|&j| {
                self.order
                    .hybrid_of_b(j)
                    .ok_or(CorrespondenceError::OutOfRange {
                        side: Side::B,
                        index: j,
                        count: self.order.b_count(),
                    })
            })
            .collect()
    }
}
