use crate::core::models::hybrid::{
    DihedralReview, HybridAtomOrder, MergedTerm, ReviewAction, Side, TermOrigin,
};
use crate::core::models::number::Number;
use phf::{Map, phf_map};
use std::ops::Range;
use tracing::warn;

/// Parameter positions holding force constants, per dihedral function type, as half-open
/// ranges. Proper (1, 9) and periodic improper (4) dihedrals are `phi k mult`, harmonic
/// impropers (2) are `xi k`, Ryckaert-Bellemans (3) are `C0..C5` and Fourier (5) `F1..F4`.
static FORCE_CONSTANT_SLOTS: Map<u32, (usize, usize)> = phf_map! {
    1u32 => (1, 2),
    2u32 => (1, 2),
    4u32 => (1, 2),
    9u32 => (1, 2),
    3u32 => (0, 6),
    5u32 => (0, 4),
};

/// The force-constant positions of a parameter list of length `len`.
///
/// Unknown function types treat every parameter as a force constant.
pub(crate) fn force_constant_slots(function: u32, len: usize) -> Range<usize> {
    match FORCE_CONSTANT_SLOTS.get(&function) {
        Some(&(start, end)) => start.min(len)..end.min(len),
        None => 0..len,
    }
}

/// A copy of `params` with every force constant set to zero: the term switched off.
pub(crate) fn zero_force_constants(function: u32, params: &[Number]) -> Vec<Number> {
    let mut off = params.to_vec();
    for slot in force_constant_slots(function, off.len()) {
        off[slot] = Number::zero();
    }
    off
}

/// The multiplicity of a periodic dihedral, which distinguishes the terms of a multi-term
/// proper dihedral sharing the same four atoms.
pub(crate) fn multiplicity(function: u32, params: &[Number]) -> Option<i64> {
    match function {
        1 | 4 | 9 => params.get(2).map(|n| n.value().round() as i64),
        _ => None,
    }
}

fn primary_force_constant(function: u32, params: &[Number]) -> f64 {
    let slots = force_constant_slots(function, params.len());
    params.get(slots.start).map_or(0.0, Number::value)
}

/// Follows every one-sided dihedral whose first or last atom is a dummy in either state with
/// a companion row.
///
/// The companion of a function-4 row that is on only in its own state is pinned: its nonzero
/// force constant is zeroed, so the term is off in both states. Every other companion swaps
/// the force constants of the two states. Companions are recorded for review; pinned ones are
/// the divergent cases and are logged at warning level.
pub(crate) fn append_dummy_companions(
    rows: Vec<MergedTerm>,
    order: &HybridAtomOrder,
) -> (Vec<MergedTerm>, Vec<DihedralReview>) {
    let mut out = Vec::with_capacity(rows.len());
    let mut reviews = Vec::new();

    for row in rows {
        let side = match row.origin {
            TermOrigin::StateA => Side::A,
            TermOrigin::StateB => Side::B,
            TermOrigin::Fused | TermOrigin::Companion => {
                out.push(row);
                continue;
            }
        };
        let touches_dummy = [row.record.first_atom(), row.record.last_atom()]
            .into_iter()
            .flatten()
            .any(|h| order.is_dummy_in_either(h));
        if !touches_dummy {
            out.push(row);
            continue;
        }

        let (companion, action) = companion_of(&row, side);
        let review = DihedralReview {
            atoms: row.record.atoms.clone(),
            function: row.record.function,
            source: side,
            action,
        };
        if review.is_divergent() {
            warn!(
                atoms = ?review.atoms,
                function = review.function,
                state = %side,
                "Dihedral companion pinned to zero in both states; flagged for review"
            );
        }
        reviews.push(review);
        out.push(row);
        out.push(companion);
    }

    (out, reviews)
}

fn companion_of(row: &MergedTerm, side: Side) -> (MergedTerm, ReviewAction) {
    let mut record = row.record.clone();
    let function = record.function;
    let params_b = record.params_b.get_or_insert_with(Vec::new);
    let k_a = primary_force_constant(function, &record.params_a);
    let k_b = primary_force_constant(function, params_b);

    let action = match side {
        Side::A if function == 4 && k_a > 0.0 && k_b == 0.0 => {
            record.params_a = zero_force_constants(function, &record.params_a);
            ReviewAction::Pinned
        }
        Side::B if function == 4 && k_a == 0.0 && k_b > 0.0 => {
            *params_b = zero_force_constants(function, params_b);
            ReviewAction::Pinned
        }
        _ => {
            let slots = force_constant_slots(function, record.params_a.len().min(params_b.len()));
            for slot in slots {
                std::mem::swap(&mut record.params_a[slot], &mut params_b[slot]);
            }
            ReviewAction::Swapped
        }
    };

    (
        MergedTerm {
            record,
            origin: TermOrigin::Companion,
        },
        action,
    )
}
