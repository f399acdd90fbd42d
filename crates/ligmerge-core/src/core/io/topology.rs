use super::error::{FormatError, FormatErrorKind};
use super::traits::TextFile;
use crate::core::models::atom::{AtomRecord, AtomState};
use crate::core::models::bonded::{BondedRecord, TermKind};
use crate::core::models::number::Number;
use crate::core::models::topology::{
    AtomTypeEntry, LigandTopology, MoleculeType, RawRecord, SectionKind, TopologySection,
};
use std::collections::BTreeMap;
use tracing::trace;

/// Parsed sections of a topology file, keyed by kind.
pub type SectionMap = BTreeMap<SectionKind, TopologySection>;

enum ScanState {
    BeforeFirstSection,
    In(SectionKind),
    Skipping,
}

/// Splits topology text into raw sections.
///
/// Comment lines (`;`) and blank lines are skipped and trailing comments stripped. A
/// preprocessor line (`#ifdef`, `#include`, ...) ends the current section: everything up to
/// the next header is ignored, which drops conditional blocks such as the position-restraint
/// include at the end of acpype topologies. Unknown sections are skipped.
///
/// # Errors
///
/// Returns [`FormatErrorKind::RecordOutsideSection`] for a data line before the first header.
pub fn parse_sections(text: &str) -> Result<SectionMap, FormatError> {
    let mut sections = SectionMap::new();
    let mut state = ScanState::BeforeFirstSection;

    for (line_idx, line) in text.lines().enumerate() {
        let line_num = line_idx + 1;
        let content = strip_comment(line).trim();
        if content.is_empty() {
            continue;
        }
        if content.starts_with('#') {
            state = ScanState::Skipping;
            continue;
        }
        if let Some(header) = section_header(content) {
            state = match SectionKind::from_header(header) {
                Some(kind) => {
                    sections.entry(kind).or_insert_with(|| TopologySection {
                        header: header.to_string(),
                        records: Vec::new(),
                    });
                    ScanState::In(kind)
                }
                None => {
                    trace!(line = line_num, header, "Skipping unsupported section");
                    ScanState::Skipping
                }
            };
            continue;
        }
        match state {
            ScanState::BeforeFirstSection => {
                return Err(FormatError::at(line_num, FormatErrorKind::RecordOutsideSection));
            }
            ScanState::Skipping => {}
            ScanState::In(kind) => {
                if let Some(section) = sections.get_mut(&kind) {
                    section.records.push(RawRecord {
                        line: line_num,
                        content: content.to_string(),
                    });
                }
            }
        }
    }

    Ok(sections)
}

fn strip_comment(line: &str) -> &str {
    line.split(';').next().unwrap_or("")
}

fn section_header(content: &str) -> Option<&str> {
    content
        .strip_prefix('[')
        .and_then(|rest| rest.split(']').next())
        .map(str::trim)
}

impl TextFile for LigandTopology {
    /// Parses a ligand topology into typed records.
    ///
    /// Requires `[ moleculetype ]` and `[ atoms ]`. Atom rows carry 8 columns, or 11 when
    /// explicit B-state columns are present; indices must run `1..=N` in order. Bonded rows
    /// need their atom indices and a function type, followed by any number of parameters, and
    /// may only reference atoms declared in `[ atoms ]`.
    fn parse(text: &str) -> Result<Self, FormatError> {
        let mut sections = parse_sections(text)?;

        let atom_types = sections
            .remove(&SectionKind::AtomTypes)
            .map(|s| s.records.iter().filter_map(parse_atom_type).collect())
            .unwrap_or_default();

        let molecule = sections
            .remove(&SectionKind::MoleculeType)
            .and_then(|s| s.records.into_iter().next())
            .ok_or(FormatErrorKind::MissingSection("moleculetype"))
            .map_err(FormatError::from)
            .and_then(|record| parse_molecule_type(&record))?;

        let atom_section = sections
            .remove(&SectionKind::Atoms)
            .ok_or(FormatErrorKind::MissingSection("atoms"))?;
        let atoms = atom_section
            .records
            .iter()
            .enumerate()
            .map(|(k, record)| parse_atom(record, k + 1))
            .collect::<Result<Vec<_>, _>>()?;

        let mut terms = |kind: TermKind| -> Result<Vec<BondedRecord>, FormatError> {
            let section_kind = match kind {
                TermKind::Bond => SectionKind::Bonds,
                TermKind::Pair => SectionKind::Pairs,
                TermKind::Angle => SectionKind::Angles,
                TermKind::Dihedral => SectionKind::Dihedrals,
            };
            sections
                .remove(&section_kind)
                .map(|s| {
                    s.records
                        .iter()
                        .map(|r| parse_bonded(r, kind, atoms.len()))
                        .collect()
                })
                .unwrap_or_else(|| Ok(Vec::new()))
        };
        let bonds = terms(TermKind::Bond)?;
        let pairs = terms(TermKind::Pair)?;
        let angles = terms(TermKind::Angle)?;
        let dihedrals = terms(TermKind::Dihedral)?;

        Ok(LigandTopology {
            atom_types,
            molecule,
            atoms,
            bonds,
            pairs,
            angles,
            dihedrals,
        })
    }
}

fn parse_atom_type(record: &RawRecord) -> Option<AtomTypeEntry> {
    record.fields().next().map(|name| AtomTypeEntry {
        name: name.to_string(),
        line: record.content.clone(),
    })
}

fn parse_molecule_type(record: &RawRecord) -> Result<MoleculeType, FormatError> {
    let fields: Vec<&str> = record.fields().collect();
    let [name, exclusions, ..] = fields[..] else {
        return Err(FormatError::at(
            record.line,
            FormatErrorKind::FieldCount {
                section: "moleculetype",
                expected: "2",
                found: fields.len(),
            },
        ));
    };
    Ok(MoleculeType {
        name: name.to_string(),
        exclusions: parse_int(exclusions, "nrexcl", record.line)?,
    })
}

fn parse_atom(record: &RawRecord, expected_index: usize) -> Result<AtomRecord, FormatError> {
    let fields: Vec<&str> = record.fields().collect();
    if fields.len() != 8 && fields.len() != 11 {
        return Err(FormatError::at(
            record.line,
            FormatErrorKind::FieldCount {
                section: "atoms",
                expected: "8 or 11",
                found: fields.len(),
            },
        ));
    }
    let line = record.line;

    let index: usize = parse_int(fields[0], "atom index", line)?;
    if index != expected_index {
        return Err(FormatError::at(
            line,
            FormatErrorKind::NonSequentialIndex {
                expected: expected_index,
                found: index,
            },
        ));
    }

    let state = AtomState::new(
        fields[1],
        parse_number(fields[6], "charge", line)?,
        parse_number(fields[7], "mass", line)?,
    );
    let state_b = if fields.len() == 11 {
        Some(AtomState::new(
            fields[8],
            parse_number(fields[9], "chargeB", line)?,
            parse_number(fields[10], "massB", line)?,
        ))
    } else {
        None
    };

    Ok(AtomRecord {
        index,
        residue_number: parse_int(fields[2], "residue number", line)?,
        residue_name: fields[3].to_string(),
        name: fields[4].to_string(),
        charge_group: parse_int(fields[5], "charge group", line)?,
        state,
        state_b,
    })
}

fn parse_bonded(
    record: &RawRecord,
    kind: TermKind,
    atom_count: usize,
) -> Result<BondedRecord, FormatError> {
    let fields: Vec<&str> = record.fields().collect();
    let arity = kind.arity();
    let line = record.line;
    if fields.len() < arity + 1 {
        return Err(FormatError::at(
            line,
            FormatErrorKind::FieldCount {
                section: kind.section_name(),
                expected: match kind {
                    TermKind::Bond | TermKind::Pair => "at least 3",
                    TermKind::Angle => "at least 4",
                    TermKind::Dihedral => "at least 5",
                },
                found: fields.len(),
            },
        ));
    }

    let mut atoms = Vec::with_capacity(arity);
    for token in &fields[..arity] {
        let index: usize = parse_int(token, "atom index", line)?;
        if index == 0 || index > atom_count {
            return Err(FormatError::at(
                line,
                FormatErrorKind::UnknownAtom {
                    section: kind.section_name(),
                    index,
                },
            ));
        }
        atoms.push(index);
    }
    let function = parse_int(fields[arity], "function type", line)?;
    let params_a = fields[arity + 1..]
        .iter()
        .map(|token| parse_number(token, "parameter", line))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(BondedRecord::new(atoms, function, params_a))
}

fn parse_int<T: std::str::FromStr>(
    token: &str,
    field: &'static str,
    line: usize,
) -> Result<T, FormatError> {
    token.parse().map_err(|_| {
        FormatError::at(
            line,
            FormatErrorKind::InvalidInt {
                field,
                value: token.to_string(),
            },
        )
    })
}

fn parse_number(token: &str, field: &'static str, line: usize) -> Result<Number, FormatError> {
    token.parse().map_err(|_| {
        FormatError::at(
            line,
            FormatErrorKind::InvalidFloat {
                field,
                value: token.to_string(),
            },
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const ETHANE_LIKE: &str = "\
; generated by a topology builder
[ atomtypes ]
;name   bond_type     mass     charge   ptype   sigma         epsilon       Amb
 c3       c3          0.00000  0.00000   A     3.39967e-01   4.57730e-01 ; 1.91  0.1094
 hc       hc          0.00000  0.00000   A     2.64953e-01   6.56888e-02 ; 1.49  0.0157

[ moleculetype ]
;name            nrexcl
 LIG              3

[ atoms ]
;   nr  type  resi  res  atom  cgnr     charge      mass
     1   c3     1   LIG    C1    1    -0.094100     12.01000 ; qtot -0.094
     2   c3     1   LIG    C2    2    -0.094100     12.01000
     3   hc     1   LIG    H1    3     0.094100      1.00800

[ bonds ]
;   ai     aj funct   r             k
     1      2   1    1.5375e-01    2.5179e+05
     1      3   1    1.0969e-01    2.7665e+05

[ pairs ]
     3      2      1

[ angles ]
     2      1      3      1    1.1005e+02    3.8802e+02

[ dihedrals ] ; propers
     3      1      2      2      9     0.00   0.62760   3

#ifdef POSRES
#include \"posre_LIG.itp\"
#endif
";

    #[test]
    fn parses_every_supported_section() {
        let top = LigandTopology::parse(ETHANE_LIKE).unwrap();

        assert_eq!(top.atom_types.len(), 2);
        assert_eq!(top.atom_types[1].name, "hc");
        assert_eq!(top.molecule.name, "LIG");
        assert_eq!(top.molecule.exclusions, 3);
        assert_eq!(top.atoms.len(), 3);
        assert_eq!(top.atoms[2].name, "H1");
        assert_eq!(top.atoms[2].state.charge.text(), "0.094100");
        assert!(top.atoms[0].state_b.is_none());
        assert_eq!(top.bonds.len(), 2);
        assert_eq!(top.bonds[0].params_a[1].text(), "2.5179e+05");
        assert_eq!(top.pairs[0].atoms, vec![3, 2]);
        assert!(top.pairs[0].params_a.is_empty());
        assert_eq!(top.angles[0].atoms, vec![2, 1, 3]);
        assert_eq!(top.dihedrals[0].function, 9);
        assert_eq!(top.dihedrals[0].params_a.len(), 3);
    }

    #[test]
    fn repeated_sections_are_concatenated() {
        let text = "[ moleculetype ]\nX 3\n[ atoms ]\n1 c3 1 X C1 1 0.0 12.0\n2 c3 1 X C2 2 0.0 12.0\n\
                    3 c3 1 X C3 3 0.0 12.0\n4 c3 1 X C4 4 0.0 12.0\n\
                    [ dihedrals ]\n1 2 3 4 9 0.0 1.0 3\n[ dihedrals ]\n1 2 3 4 4 180.0 4.6 2\n";
        let top = LigandTopology::parse(text).unwrap();
        assert_eq!(top.dihedrals.len(), 2);
        assert_eq!(top.dihedrals[1].function, 4);
    }

    #[test]
    fn preprocessor_line_ends_the_current_section() {
        let sections = parse_sections(ETHANE_LIKE).unwrap();
        let dihedrals = &sections[&SectionKind::Dihedrals];
        assert_eq!(dihedrals.records.len(), 1);
    }

    #[test]
    fn eleven_column_atoms_carry_state_b() {
        let text = "[ moleculetype ]\nX 3\n[ atoms ]\n1 c3 1 X C1 1 0.1 12.0 DUM_c3 0.0 12.0\n";
        let top = LigandTopology::parse(text).unwrap();
        let b = top.atoms[0].state_b.as_ref().unwrap();
        assert_eq!(b.type_name, "DUM_c3");
        assert!(b.charge.is_zero());
    }

    #[test]
    fn non_numeric_charge_is_rejected_with_line_number() {
        let text = "[ moleculetype ]\nX 3\n[ atoms ]\n1 c3 1 X C1 1 abc 12.0\n";
        let err = LigandTopology::parse(text).unwrap_err();
        assert_eq!(err.line, Some(4));
        assert!(matches!(
            err.kind,
            FormatErrorKind::InvalidFloat { field: "charge", .. }
        ));
    }

    #[test]
    fn out_of_sequence_atom_index_is_rejected() {
        let text = "[ moleculetype ]\nX 3\n[ atoms ]\n1 c3 1 X C1 1 0.0 12.0\n3 c3 1 X C2 2 0.0 12.0\n";
        let err = LigandTopology::parse(text).unwrap_err();
        assert!(matches!(
            err.kind,
            FormatErrorKind::NonSequentialIndex { expected: 2, found: 3 }
        ));
    }

    #[test]
    fn bonded_record_referencing_missing_atom_is_rejected() {
        let text = "[ moleculetype ]\nX 3\n[ atoms ]\n1 c3 1 X C1 1 0.0 12.0\n[ bonds ]\n1 2 1 0.15 1000\n";
        let err = LigandTopology::parse(text).unwrap_err();
        assert!(matches!(
            err.kind,
            FormatErrorKind::UnknownAtom { section: "bonds", index: 2 }
        ));
    }

    #[test]
    fn data_before_any_header_is_rejected() {
        let err = LigandTopology::parse("1 2 3\n[ atoms ]\n").unwrap_err();
        assert_eq!(err.kind, FormatErrorKind::RecordOutsideSection);
    }

    #[test]
    fn missing_atoms_section_is_reported() {
        let err = LigandTopology::parse("[ moleculetype ]\nX 3\n").unwrap_err();
        assert_eq!(err.kind, FormatErrorKind::MissingSection("atoms"));
    }
}
