use crate::core::models::atom::AtomRecord;
use crate::core::models::hybrid::{DummyIdentity, HybridAtom, HybridAtomOrder, Provenance, Side};
use crate::core::models::topology::{AtomTypeEntry, LigandTopology};
use crate::engine::config::MergeConfig;
use crate::engine::mapping::CorrespondenceError;
use std::collections::HashMap;
use tracing::warn;

fn atom_of(topology: &LigandTopology, side: Side, index: usize) -> Result<&AtomRecord, CorrespondenceError> {
    topology
        .atom(index)
        .ok_or(CorrespondenceError::OutOfRange {
            side,
            index,
            count: topology.atom_count(),
        })
}

/// Builds the hybrid `[ atoms ]` rows and collects the dummy types they use.
///
/// Fused atoms keep A's identity and state, with B's state attached. A-only atoms become
/// dummies in B. B-only atoms take their hybrid index, B's residue fields and the dummy name
/// marker, and are dummies in A.
pub(crate) fn merge_atoms(
    a: &LigandTopology,
    b: &LigandTopology,
    order: &HybridAtomOrder,
    config: &MergeConfig,
) -> Result<(Vec<HybridAtom>, Vec<DummyIdentity>), CorrespondenceError> {
    let prefix = config.dummy_type_prefix.as_str();
    let mut atoms = Vec::with_capacity(order.len());
    let mut dummies: Vec<DummyIdentity> = Vec::new();
    let mut note_dummy = |original_type: &str| {
        let identity = DummyIdentity::new(prefix, original_type);
        if !dummies.contains(&identity) {
            dummies.push(identity);
        }
    };

    for (index, provenance) in order.iter() {
        let atom = match provenance {
            Provenance::Fused(i, j) => {
                let ra = atom_of(a, Side::A, i)?;
                let rb = atom_of(b, Side::B, j)?;
                HybridAtom {
                    index,
                    provenance,
                    residue_number: ra.residue_number,
                    residue_name: ra.residue_name.clone(),
                    name: ra.name.clone(),
                    charge_group: ra.charge_group,
                    state_a: ra.state.clone(),
                    state_b: rb.state.clone(),
                    writes_state_b: ra.state != rb.state,
                }
            }
            Provenance::FromA(i) => {
                let ra = atom_of(a, Side::A, i)?;
                note_dummy(ra.type_name());
                HybridAtom {
                    index,
                    provenance,
                    residue_number: ra.residue_number,
                    residue_name: ra.residue_name.clone(),
                    name: ra.name.clone(),
                    charge_group: ra.charge_group,
                    state_a: ra.state.clone(),
                    state_b: ra.state.to_dummy(prefix),
                    writes_state_b: true,
                }
            }
            Provenance::FromB(j) => {
                let rb = atom_of(b, Side::B, j)?;
                note_dummy(rb.type_name());
                HybridAtom {
                    index,
                    provenance,
                    residue_number: rb.residue_number,
                    residue_name: rb.residue_name.clone(),
                    name: format!("{}{}", config.dummy_name_marker, rb.name),
                    charge_group: index,
                    state_a: rb.state.to_dummy(prefix),
                    state_b: rb.state.clone(),
                    writes_state_b: true,
                }
            }
        };
        atoms.push(atom);
    }

    Ok((atoms, dummies))
}

/// A's atom types followed by B's types whose names A does not define.
///
/// A type defined by both ligands with different parameters keeps A's definition.
pub(crate) fn merge_atom_types(a: &[AtomTypeEntry], b: &[AtomTypeEntry]) -> Vec<AtomTypeEntry> {
    let known: HashMap<&str, &AtomTypeEntry> = a.iter().map(|t| (t.name.as_str(), t)).collect();
    let mut merged = a.to_vec();
    for entry in b {
        match known.get(entry.name.as_str()) {
            None if !merged.iter().any(|t| t.name == entry.name) => merged.push(entry.clone()),
            None => {}
            Some(existing) => {
                if !same_definition(&existing.line, &entry.line) {
                    warn!(
                        atom_type = %entry.name,
                        kept = %existing.line,
                        dropped = %entry.line,
                        "Atom type defined differently by the two ligands; keeping ligand A's definition"
                    );
                }
            }
        }
    }
    merged
}

fn same_definition(x: &str, y: &str) -> bool {
    x.split_whitespace().eq(y.split_whitespace())
}
