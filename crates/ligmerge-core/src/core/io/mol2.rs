use super::error::{FormatError, FormatErrorKind};
use super::traits::{TextFile, WriteText};
use crate::core::models::topology::DeclaredCounts;
use nalgebra::Point3;
use std::collections::HashMap;
use std::io::{self, Write};
use thiserror::Error;

/// Metadata key under which docking output stores the score of a pose.
pub const POSE_SCORE_KEY: &str = "Ligen score";

/// An atom record from `@<TRIPOS>ATOM`.
#[derive(Debug, Clone, PartialEq)]
pub struct Mol2Atom {
    pub id: usize,
    pub name: String,
    /// Position in Angstroms.
    pub position: Point3<f64>,
    /// The atom type column: SYBYL (`C.ar`, `N.am`) or GAFF (`ca`, `hc`) depending on the
    /// program that wrote the file.
    pub atom_type: String,
    /// Columns after the atom type (substructure id and name, charge), kept verbatim.
    pub trailing: Vec<String>,
}

impl Mol2Atom {
    /// The chemical element implied by the atom type.
    ///
    /// SYBYL types carry the element before the dot with its usual capitalization. GAFF types
    /// are lowercase; their element is the first letter except for the two-letter halogens.
    pub fn element(&self) -> String {
        let base = self.atom_type.split('.').next().unwrap_or("");
        let mut chars = base.chars();
        let Some(first) = chars.next() else {
            return String::new();
        };
        if first.is_ascii_uppercase() {
            return base.chars().take_while(|c| c.is_ascii_alphabetic()).collect();
        }
        let lower = base.to_ascii_lowercase();
        if lower.starts_with("cl") {
            "Cl".to_string()
        } else if lower.starts_with("br") {
            "Br".to_string()
        } else {
            first.to_ascii_uppercase().to_string()
        }
    }

    pub fn is_hydrogen(&self) -> bool {
        self.element() == "H"
    }

    /// Docking placeholders (`Du`) that have no counterpart in the ligand topology.
    pub fn is_dummy(&self) -> bool {
        self.element() == "Du"
    }
}

/// A record from `@<TRIPOS>BOND`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mol2Bond {
    pub origin: usize,
    pub target: usize,
    /// SYBYL bond type (`1`, `2`, `ar`, `am`, ...).
    pub bond_type: String,
}

/// A single-molecule Tripos `.mol2` structure.
#[derive(Debug, Clone, PartialEq)]
pub struct Mol2Structure {
    pub name: String,
    /// Atom and bond counts declared on the second line of `@<TRIPOS>MOLECULE`.
    pub declared: DeclaredCounts,
    /// Count fields after the atom and bond counts (substructures, features, sets).
    pub counts_tail: Vec<String>,
    /// Molecule record lines after the counts (molecule type, charge type, ...).
    pub molecule_info: Vec<String>,
    pub atoms: Vec<Mol2Atom>,
    pub bonds: Vec<Mol2Bond>,
    /// Raw `@<TRIPOS>SUBSTRUCTURE` lines.
    pub substructure: Vec<String>,
}

impl Mol2Structure {
    /// The structure without dummy atoms and the bonds that touch them, atoms renumbered
    /// from 1 in their original order. Also returns how many atoms were removed.
    pub fn without_dummies(&self) -> (Self, usize) {
        let mut renumbered: HashMap<usize, usize> = HashMap::new();
        let atoms: Vec<Mol2Atom> = self
            .atoms
            .iter()
            .filter(|atom| !atom.is_dummy())
            .enumerate()
            .map(|(k, atom)| {
                renumbered.insert(atom.id, k + 1);
                Mol2Atom {
                    id: k + 1,
                    ..atom.clone()
                }
            })
            .collect();
        let bonds: Vec<Mol2Bond> = self
            .bonds
            .iter()
            .filter_map(|bond| {
                Some(Mol2Bond {
                    origin: *renumbered.get(&bond.origin)?,
                    target: *renumbered.get(&bond.target)?,
                    bond_type: bond.bond_type.clone(),
                })
            })
            .collect();
        let removed = self.atoms.len() - atoms.len();
        let structure = Self {
            name: self.name.clone(),
            declared: DeclaredCounts {
                atoms: atoms.len(),
                bonds: bonds.len(),
            },
            counts_tail: self.counts_tail.clone(),
            molecule_info: self.molecule_info.clone(),
            atoms,
            bonds,
            substructure: self.substructure.clone(),
        };
        (structure, removed)
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Record {
    Molecule,
    Atom,
    Bond,
    Substructure,
    Other,
}

impl TextFile for Mol2Structure {
    /// Parses the first molecule of a `.mol2` file and checks that the declared atom and bond
    /// counts match the records found.
    fn parse(text: &str) -> Result<Self, FormatError> {
        let mut record = Record::Other;
        let mut molecule_lines: Vec<(usize, &str)> = Vec::new();
        let mut atoms = Vec::new();
        let mut bonds = Vec::new();
        let mut substructure = Vec::new();
        let mut molecules_seen = 0;

        for (line_idx, line) in text.lines().enumerate() {
            let line_num = line_idx + 1;
            let trimmed = line.trim();
            if let Some(tag) = trimmed.strip_prefix("@<TRIPOS>") {
                record = match tag.trim() {
                    "MOLECULE" => {
                        molecules_seen += 1;
                        if molecules_seen > 1 {
                            break;
                        }
                        Record::Molecule
                    }
                    "ATOM" => Record::Atom,
                    "BOND" => Record::Bond,
                    "SUBSTRUCTURE" => Record::Substructure,
                    _ => Record::Other,
                };
                continue;
            }
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            match record {
                Record::Molecule => molecule_lines.push((line_num, trimmed)),
                Record::Atom => atoms.push(parse_atom(trimmed, line_num)?),
                Record::Bond => bonds.push(parse_bond(trimmed, line_num)?),
                Record::Substructure => substructure.push(trimmed.to_string()),
                Record::Other => {}
            }
        }

        let Some(&(_, name)) = molecule_lines.first() else {
            return Err(FormatErrorKind::MissingSection("@<TRIPOS>MOLECULE").into());
        };
        let Some(&(counts_line, counts)) = molecule_lines.get(1) else {
            return Err(FormatErrorKind::MissingSection("@<TRIPOS>MOLECULE counts").into());
        };
        let mut counts = counts.split_whitespace();
        let declared_atoms = parse_usize(counts.next().unwrap_or(""), "declared atom count", counts_line)?;
        let declared_bonds = match counts.next() {
            Some(token) => parse_usize(token, "declared bond count", counts_line)?,
            None => 0,
        };
        let counts_tail = counts.map(str::to_string).collect();

        check_count("structure atom", declared_atoms, atoms.len())?;
        check_count("structure bond", declared_bonds, bonds.len())?;

        Ok(Self {
            name: name.to_string(),
            declared: DeclaredCounts {
                atoms: declared_atoms,
                bonds: declared_bonds,
            },
            counts_tail,
            molecule_info: molecule_lines
                .iter()
                .skip(2)
                .map(|(_, line)| line.to_string())
                .collect(),
            atoms,
            bonds,
            substructure,
        })
    }
}

impl WriteText for Mol2Structure {
    fn write_to(&self, w: &mut impl Write) -> io::Result<()> {
        writeln!(w, "@<TRIPOS>MOLECULE")?;
        writeln!(w, "{}", self.name)?;
        let mut counts = format!("{:>5} {:>5}", self.atoms.len(), self.bonds.len());
        for field in &self.counts_tail {
            counts.push_str(&format!(" {field:>5}"));
        }
        writeln!(w, "{counts}")?;
        for line in &self.molecule_info {
            writeln!(w, "{line}")?;
        }
        writeln!(w)?;
        writeln!(w, "@<TRIPOS>ATOM")?;
        for atom in &self.atoms {
            let p = &atom.position;
            write!(
                w,
                "{:>7} {:<8}{:>10.4}{:>10.4}{:>10.4} {:<8}",
                atom.id, atom.name, p.x, p.y, p.z, atom.atom_type
            )?;
            for field in &atom.trailing {
                write!(w, " {field}")?;
            }
            writeln!(w)?;
        }
        writeln!(w, "@<TRIPOS>BOND")?;
        for (k, bond) in self.bonds.iter().enumerate() {
            writeln!(
                w,
                "{:>6}{:>6}{:>6} {}",
                k + 1,
                bond.origin,
                bond.target,
                bond.bond_type
            )?;
        }
        if !self.substructure.is_empty() {
            writeln!(w, "@<TRIPOS>SUBSTRUCTURE")?;
            for line in &self.substructure {
                writeln!(w, "{line}")?;
            }
        }
        Ok(())
    }
}

/// One pose of a multi-pose docking output.
#[derive(Debug, Clone, PartialEq)]
pub struct Pose {
    /// 1-based position of the pose in its file.
    pub id: usize,
    /// The docking score, higher is better.
    pub score: Option<f64>,
    /// The pose with dummy atoms removed.
    pub structure: Mol2Structure,
    pub dummies_removed: usize,
}

/// A multi-pose `.mol2` file as written by docking programs.
///
/// Each pose is an ordinary molecule, optionally preceded by `# key: value` metadata lines and
/// terminated by `#ENDOFMOLECULE`. Files without terminators are split at each
/// `@<TRIPOS>MOLECULE` record, so a plain multi-molecule file reads as one pose per molecule.
#[derive(Debug, Clone, PartialEq)]
pub struct PoseFile {
    pub poses: Vec<Pose>,
}

impl PoseFile {
    /// The pose with the highest score; the earliest one wins a tie. Unscored poses are never
    /// chosen.
    pub fn best_by_score(&self) -> Option<&Pose> {
        self.poses
            .iter()
            .filter_map(|pose| pose.score.map(|score| (score, pose)))
            .max_by(|(sa, a), (sb, b)| sa.total_cmp(sb).then(b.id.cmp(&a.id)))
            .map(|(_, pose)| pose)
    }

    /// The pose with the given 1-based number.
    pub fn pose(&self, id: usize) -> Option<&Pose> {
        id.checked_sub(1).and_then(|k| self.poses.get(k))
    }

    pub fn select(&self, choice: PoseChoice) -> Result<&Pose, PoseSelectionError> {
        match choice {
            PoseChoice::BestScore => self
                .best_by_score()
                .ok_or(PoseSelectionError::NoScoredPose(self.poses.len())),
            PoseChoice::Number(id) => self.pose(id).ok_or(PoseSelectionError::UnknownPose {
                requested: id,
                available: self.poses.len(),
            }),
        }
    }
}

/// Which pose of a multi-pose file to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PoseChoice {
    #[default]
    BestScore,
    /// 1-based pose number.
    Number(usize),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PoseSelectionError {
    #[error("None of the {0} pose(s) carries a 'Ligen score'")]
    NoScoredPose(usize),
    #[error("Pose {requested} was requested but the file holds {available} pose(s)")]
    UnknownPose { requested: usize, available: usize },
}

struct MetadataLine {
    line: usize,
    key: String,
    value: String,
}

#[derive(Default)]
struct PoseBlock<'t> {
    metadata: Vec<MetadataLine>,
    lines: Vec<(usize, &'t str)>,
    has_molecule: bool,
}

impl PoseBlock<'_> {
    /// Closes this block into `poses` and starts the next one with the pending metadata.
    fn finish(
        &mut self,
        pending: &mut Vec<MetadataLine>,
        poses: &mut Vec<Pose>,
    ) -> Result<(), FormatError> {
        let next = PoseBlock {
            metadata: std::mem::take(pending),
            ..PoseBlock::default()
        };
        let finished = std::mem::replace(self, next);
        poses.extend(finished.into_pose(poses.len() + 1)?);
        Ok(())
    }

    fn into_pose(self, id: usize) -> Result<Option<Pose>, FormatError> {
        if !self.has_molecule && self.lines.iter().all(|(_, line)| line.trim().is_empty()) {
            return Ok(None);
        }
        let first_line = self.lines.first().map_or(1, |&(n, _)| n);
        let text = self
            .lines
            .iter()
            .map(|&(_, line)| line)
            .collect::<Vec<_>>()
            .join("\n");
        let structure = Mol2Structure::parse(&text).map_err(|e| {
            let line = e
                .line
                .and_then(|k| k.checked_sub(1))
                .and_then(|k| self.lines.get(k).map(|&(n, _)| n))
                .unwrap_or(first_line);
            FormatError::at(line, e.kind)
        })?;

        let score = self
            .metadata
            .iter()
            .find(|m| m.key.eq_ignore_ascii_case(POSE_SCORE_KEY))
            .map(|m| {
                m.value.parse::<f64>().map_err(|_| {
                    FormatError::at(
                        m.line,
                        FormatErrorKind::InvalidFloat {
                            field: "pose score",
                            value: m.value.clone(),
                        },
                    )
                })
            })
            .transpose()?;

        let (structure, dummies_removed) = structure.without_dummies();
        Ok(Some(Pose {
            id,
            score,
            structure,
            dummies_removed,
        }))
    }
}

impl TextFile for PoseFile {
    fn parse(text: &str) -> Result<Self, FormatError> {
        let mut poses: Vec<Pose> = Vec::new();
        let mut block = PoseBlock::default();
        let mut pending: Vec<MetadataLine> = Vec::new();

        for (line_idx, line) in text.lines().enumerate() {
            let line_num = line_idx + 1;
            let trimmed = line.trim();
            if trimmed.starts_with("#ENDOFMOLECULE") {
                block.finish(&mut pending, &mut poses)?;
                continue;
            }
            if let Some(comment) = trimmed.strip_prefix('#') {
                if let Some((key, value)) = comment.split_once(':') {
                    let entry = MetadataLine {
                        line: line_num,
                        key: key.trim().to_string(),
                        value: value.trim().to_string(),
                    };
                    if block.has_molecule {
                        pending.push(entry);
                    } else {
                        block.metadata.push(entry);
                    }
                }
                continue;
            }
            let opens_molecule = trimmed
                .strip_prefix("@<TRIPOS>")
                .is_some_and(|tag| tag.trim() == "MOLECULE");
            if opens_molecule {
                if block.has_molecule {
                    block.finish(&mut pending, &mut poses)?;
                }
                block.has_molecule = true;
            }
            block.lines.push((line_num, line));
        }
        poses.extend(block.into_pose(poses.len() + 1)?);

        if poses.is_empty() {
            return Err(FormatErrorKind::MissingSection("@<TRIPOS>MOLECULE").into());
        }
        Ok(Self { poses })
    }
}

fn check_count(what: &'static str, declared: usize, parsed: usize) -> Result<(), FormatError> {
    if declared == parsed {
        Ok(())
    } else {
        Err(FormatErrorKind::CountMismatch {
            what,
            declared,
            parsed,
        }
        .into())
    }
}

fn parse_usize(token: &str, field: &'static str, line: usize) -> Result<usize, FormatError> {
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

fn parse_coordinate(token: &str, field: &'static str, line: usize) -> Result<f64, FormatError> {
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

fn parse_atom(line: &str, line_num: usize) -> Result<Mol2Atom, FormatError> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    let [id, name, x, y, z, atom_type, ..] = fields[..] else {
        return Err(FormatError::at(
            line_num,
            FormatErrorKind::FieldCount {
                section: "@<TRIPOS>ATOM",
                expected: "at least 6",
                found: fields.len(),
            },
        ));
    };
    Ok(Mol2Atom {
        id: parse_usize(id, "atom id", line_num)?,
        name: name.to_string(),
        position: Point3::new(
            parse_coordinate(x, "x", line_num)?,
            parse_coordinate(y, "y", line_num)?,
            parse_coordinate(z, "z", line_num)?,
        ),
        atom_type: atom_type.to_string(),
        trailing: fields[6..].iter().map(|f| f.to_string()).collect(),
    })
}

fn parse_bond(line: &str, line_num: usize) -> Result<Mol2Bond, FormatError> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    let [_, origin, target, ..] = fields[..] else {
        return Err(FormatError::at(
            line_num,
            FormatErrorKind::FieldCount {
                section: "@<TRIPOS>BOND",
                expected: "at least 3",
                found: fields.len(),
            },
        ));
    };
    Ok(Mol2Bond {
        origin: parse_usize(origin, "bond origin", line_num)?,
        target: parse_usize(target, "bond target", line_num)?,
        bond_type: fields.get(3).map_or("1", |t| *t).to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const METHANOL: &str = "\
@<TRIPOS>MOLECULE
LIG
    3     2     1     0     0
SMALL
bcc


@<TRIPOS>ATOM
      1 C1          -0.3680    0.0000    0.0000 c3         1 LIG      0.116700
      2 O1           1.0470    0.0000    0.0000 oh         1 LIG     -0.598800
      3 H1          -0.7270    1.0270    0.0000 hc         1 LIG      0.028700
@<TRIPOS>BOND
     1     1     2 1
     2     1     3 1
@<TRIPOS>SUBSTRUCTURE
     1 LIG         1 TEMP              0 ****  ****    0 ROOT
";

    #[test]
    fn parses_molecule_atoms_and_bonds() {
        let mol = Mol2Structure::parse(METHANOL).unwrap();
        assert_eq!(mol.name, "LIG");
        assert_eq!(mol.declared, DeclaredCounts { atoms: 3, bonds: 2 });
        assert_eq!(mol.atoms[1].name, "O1");
        assert!((mol.atoms[2].position.y - 1.027).abs() < 1e-9);
        let ends: Vec<(usize, usize)> = mol.bonds.iter().map(|b| (b.origin, b.target)).collect();
        assert_eq!(ends, vec![(1, 2), (1, 3)]);
        assert_eq!(mol.atoms[0].trailing, ["1", "LIG", "0.116700"]);
        assert_eq!(mol.molecule_info, ["SMALL", "bcc"]);
        assert_eq!(mol.substructure.len(), 1);
    }

    #[test]
    fn declared_counts_must_match_records() {
        let text = METHANOL.replacen("    3     2", "    4     2", 1);
        let err = Mol2Structure::parse(&text).unwrap_err();
        assert_eq!(
            err.kind,
            FormatErrorKind::CountMismatch {
                what: "structure atom",
                declared: 4,
                parsed: 3
            }
        );
    }

    #[test]
    fn elements_follow_sybyl_and_gaff_conventions() {
        let atom = |t: &str| Mol2Atom {
            id: 1,
            name: "X".to_string(),
            position: Point3::origin(),
            atom_type: t.to_string(),
            trailing: Vec::new(),
        };
        assert_eq!(atom("C.ar").element(), "C");
        assert_eq!(atom("Cl").element(), "Cl");
        assert_eq!(atom("ca").element(), "C");
        assert_eq!(atom("cl").element(), "Cl");
        assert_eq!(atom("hc").element(), "H");
        assert!(atom("H").is_hydrogen());
        assert!(!atom("oh").is_hydrogen());
        assert!(atom("Du").is_dummy());
        assert!(atom("Du.C").is_dummy());
        assert!(!atom("c3").is_dummy());
    }

    #[test]
    fn missing_molecule_record_is_reported() {
        let err = Mol2Structure::parse("@<TRIPOS>ATOM\n").unwrap_err();
        assert_eq!(
            err.kind,
            FormatErrorKind::MissingSection("@<TRIPOS>MOLECULE")
        );
    }

    const POSES: &str = "\
# Ligen score: -3.25
# Ligen pose: 1
@<TRIPOS>MOLECULE
LIG
    3     2     1     0     0
SMALL
USER_CHARGES
@<TRIPOS>ATOM
      1 C1          0.0000    0.0000    0.0000 c3         1 LIG      0.116700
      2 O1          1.4000    0.0000    0.0000 oh         1 LIG     -0.598800
      3 H1          1.8000    0.9000    0.0000 ho         1 LIG      0.028700
@<TRIPOS>BOND
     1     1     2 1
     2     2     3 1
#ENDOFMOLECULE
# Ligen score: 7.5
@<TRIPOS>MOLECULE
LIG
    4     3     1     0     0
SMALL
USER_CHARGES
@<TRIPOS>ATOM
      1 C1         10.0000   20.0000   30.0000 c3         1 LIG      0.116700
      2 DU1        11.0000   20.0000   30.0000 Du         1 LIG      0.000000
      3 O1         11.4000   20.0000   30.0000 oh         1 LIG     -0.598800
      4 H1         11.8000   20.9000   30.0000 ho         1 LIG      0.028700
@<TRIPOS>BOND
     1     1     3 1
     2     1     2 1
     3     3     4 1
#ENDOFMOLECULE
";

    #[test]
    fn poses_carry_scores_and_lose_dummy_atoms() {
        let file = PoseFile::parse(POSES).unwrap();
        assert_eq!(file.poses.len(), 2);

        let first = &file.poses[0];
        assert_eq!(first.id, 1);
        assert_eq!(first.score, Some(-3.25));
        assert_eq!(first.dummies_removed, 0);

        let second = &file.poses[1];
        assert_eq!(second.score, Some(7.5));
        assert_eq!(second.dummies_removed, 1);
        assert_eq!(second.structure.declared, DeclaredCounts { atoms: 3, bonds: 2 });
        let names: Vec<&str> = second.structure.atoms.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, ["C1", "O1", "H1"]);
        assert_eq!(second.structure.atoms[2].id, 3);
        let ends: Vec<(usize, usize)> = second
            .structure
            .bonds
            .iter()
            .map(|b| (b.origin, b.target))
            .collect();
        assert_eq!(ends, vec![(1, 2), (2, 3)]);
    }

    #[test]
    fn best_pose_has_the_highest_score() {
        let file = PoseFile::parse(POSES).unwrap();
        assert_eq!(file.best_by_score().map(|p| p.id), Some(2));
        assert_eq!(file.pose(1).map(|p| p.id), Some(1));
        assert!(file.pose(0).is_none());
        assert!(file.pose(3).is_none());
    }

    #[test]
    fn selection_reports_missing_poses() {
        let file = PoseFile::parse(POSES).unwrap();
        assert_eq!(file.select(PoseChoice::BestScore).map(|p| p.id), Ok(2));
        assert_eq!(file.select(PoseChoice::Number(1)).map(|p| p.id), Ok(1));
        assert_eq!(
            file.select(PoseChoice::Number(5)).unwrap_err(),
            PoseSelectionError::UnknownPose {
                requested: 5,
                available: 2
            }
        );

        let unscored = PoseFile::parse(METHANOL).unwrap();
        assert_eq!(
            unscored.select(PoseChoice::BestScore).unwrap_err(),
            PoseSelectionError::NoScoredPose(1)
        );
    }

    #[test]
    fn tied_scores_pick_the_earliest_pose() {
        let text = POSES.replace("# Ligen score: 7.5", "# Ligen score: -3.25");
        let file = PoseFile::parse(&text).unwrap();
        assert_eq!(file.best_by_score().map(|p| p.id), Some(1));
    }

    #[test]
    fn unterminated_molecules_split_into_poses() {
        let plain = METHANOL.to_string() + METHANOL;
        let file = PoseFile::parse(&plain).unwrap();
        assert_eq!(file.poses.len(), 2);
        assert!(file.poses.iter().all(|p| p.score.is_none()));
        assert!(file.best_by_score().is_none());
    }

    #[test]
    fn pose_errors_report_the_file_line() {
        let text = POSES.replace("11.4000   20.0000", "11.4000   twenty ");
        let err = PoseFile::parse(&text).unwrap_err();
        assert_eq!(err.line, Some(25));
        assert!(matches!(err.kind, FormatErrorKind::InvalidFloat { field: "y", .. }));

        let text = POSES.replace("# Ligen score: 7.5", "# Ligen score: high");
        let err = PoseFile::parse(&text).unwrap_err();
        assert_eq!(err.line, Some(16));
    }

    #[test]
    fn written_structure_reads_back() {
        let file = PoseFile::parse(POSES).unwrap();
        let structure = &file.poses[1].structure;
        let text = structure.render();
        assert!(text.contains("\n    3     2     1     0     0\n"));
        assert!(text.contains("      3 H1         11.8000   20.9000   30.0000 ho       1 LIG 0.028700\n"));
        let reread = Mol2Structure::parse(&text).unwrap();
        assert_eq!(&reread, structure);
    }
}
