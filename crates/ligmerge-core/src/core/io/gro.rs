use super::error::{FormatError, FormatErrorKind};
use super::traits::{TextFile, WriteText};
use nalgebra::{Point3, Vector3};
use std::fmt::Write as _;
use std::io::{self, Write};

const DEFAULT_WIDTH: usize = 8;
const DEFAULT_PRECISION: usize = 3;
const COORDINATE_COLUMN: usize = 20;

fn slice_and_trim(line: &str, start: usize, end: usize) -> &str {
    line.get(start..end).unwrap_or("").trim()
}

/// Column layout of the coordinate fields of a `.gro` file.
///
/// GROMACS writes positions as `%8.3f` by default, but the field width is implied by the
/// distance between decimal points and may be larger for higher-precision files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroPrecision {
    pub width: usize,
    pub decimals: usize,
}

impl Default for GroPrecision {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            decimals: DEFAULT_PRECISION,
        }
    }
}

impl GroPrecision {
    /// Infers the layout from the first atom line.
    fn infer(line: &str) -> Self {
        let Some(tail) = line.get(COORDINATE_COLUMN..) else {
            return Self::default();
        };
        let mut dots = tail.match_indices('.').map(|(i, _)| i);
        match (dots.next(), dots.next()) {
            (Some(first), Some(second)) if second - first > 5 => {
                let width = second - first;
                Self {
                    width,
                    decimals: width - 5,
                }
            }
            _ => Self::default(),
        }
    }
}

/// One atom line of a `.gro` file.
///
/// The line it was parsed from is kept and written back unchanged unless a field is modified
/// through one of the setters, so untouched rows survive a read/write cycle byte for byte.
#[derive(Debug, Clone, PartialEq)]
pub struct GroAtom {
    residue_number: i32,
    residue_name: String,
    name: String,
    serial: usize,
    position: Point3<f64>,
    velocity: Option<Vector3<f64>>,
    raw: Option<String>,
}

impl GroAtom {
    pub fn new(
        residue_number: i32,
        residue_name: impl Into<String>,
        name: impl Into<String>,
        serial: usize,
        position: Point3<f64>,
    ) -> Self {
        Self {
            residue_number,
            residue_name: residue_name.into(),
            name: name.into(),
            serial,
            position,
            velocity: None,
            raw: None,
        }
    }

    pub fn residue_number(&self) -> i32 {
        self.residue_number
    }

    pub fn residue_name(&self) -> &str {
        &self.residue_name
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn serial(&self) -> usize {
        self.serial
    }

    pub fn position(&self) -> &Point3<f64> {
        &self.position
    }

    pub fn velocity(&self) -> Option<&Vector3<f64>> {
        self.velocity.as_ref()
    }

    /// The source line, if the atom has not been modified since it was read.
    pub fn raw_line(&self) -> Option<&str> {
        self.raw.as_deref()
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
        self.raw = None;
    }

    pub fn set_serial(&mut self, serial: usize) {
        self.serial = serial;
        self.raw = None;
    }

    pub fn translate(&mut self, offset: &Vector3<f64>) {
        self.position += offset;
        self.raw = None;
    }

    /// Moves the atom to `position`. Velocities no longer apply and are dropped.
    pub fn set_position(&mut self, position: Point3<f64>) {
        self.position = position;
        self.velocity = None;
        self.raw = None;
    }

    fn parse(line: &str, line_num: usize) -> Result<(Self, GroPrecision), FormatError> {
        let precision = GroPrecision::infer(line);
        let w = precision.width;
        if line.len() < COORDINATE_COLUMN + 3 * w {
            return Err(FormatError::at(line_num, FormatErrorKind::LineTooShort));
        }

        let int_field = |start: usize, end: usize, field: &'static str| {
            let value = slice_and_trim(line, start, end);
            value.parse::<i64>().map_err(|_| {
                FormatError::at(
                    line_num,
                    FormatErrorKind::InvalidInt {
                        field,
                        value: value.to_string(),
                    },
                )
            })
        };
        let float_field = |start: usize, field: &'static str| {
            let value = slice_and_trim(line, start, start + w);
            value.parse::<f64>().map_err(|_| {
                FormatError::at(
                    line_num,
                    FormatErrorKind::InvalidFloat {
                        field,
                        value: value.to_string(),
                    },
                )
            })
        };

        let residue_number = int_field(0, 5, "residue number")? as i32;
        let serial = int_field(15, 20, "atom serial")?.max(0) as usize;
        let c = COORDINATE_COLUMN;
        let position = Point3::new(
            float_field(c, "x")?,
            float_field(c + w, "y")?,
            float_field(c + 2 * w, "z")?,
        );
        let velocity = if line.trim_end().len() >= c + 6 * w {
            Some(Vector3::new(
                float_field(c + 3 * w, "vx")?,
                float_field(c + 4 * w, "vy")?,
                float_field(c + 5 * w, "vz")?,
            ))
        } else {
            None
        };

        let atom = Self {
            residue_number,
            residue_name: slice_and_trim(line, 5, 10).to_string(),
            name: slice_and_trim(line, 10, 15).to_string(),
            serial,
            position,
            velocity,
            raw: Some(line.to_string()),
        };
        Ok((atom, precision))
    }

    fn format(&self, precision: GroPrecision) -> String {
        let GroPrecision { width, decimals } = precision;
        let mut line = format!(
            "{:>5}{:<5}{:>5}{:>5}",
            self.residue_number % 100_000,
            truncate(&self.residue_name, 5),
            truncate(&self.name, 5),
            self.serial % 100_000
        );
        for v in self.position.iter() {
            let _ = write!(line, "{v:>width$.decimals$}");
        }
        if let Some(velocity) = &self.velocity {
            let vdec = decimals + 1;
            for v in velocity.iter() {
                let _ = write!(line, "{v:>width$.vdec$}");
            }
        }
        line
    }

    /// The line as it would be written: the source line if untouched, else a fresh rendering.
    pub fn to_line(&self, precision: GroPrecision) -> String {
        match &self.raw {
            Some(raw) => raw.clone(),
            None => self.format(precision),
        }
    }
}

fn truncate(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}

/// The trailing box-vector line of a `.gro` file (3 or 9 components, in nm).
#[derive(Debug, Clone, PartialEq)]
pub struct GroBox {
    vectors: Vec<f64>,
    raw: Option<String>,
}

impl GroBox {
    pub fn new(vectors: Vec<f64>) -> Self {
        Self { vectors, raw: None }
    }

    fn parse(line: &str, line_num: usize) -> Result<Self, FormatError> {
        let vectors = line
            .split_whitespace()
            .map(|token| {
                token.parse::<f64>().map_err(|_| {
                    FormatError::at(
                        line_num,
                        FormatErrorKind::InvalidFloat {
                            field: "box vector",
                            value: token.to_string(),
                        },
                    )
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        if vectors.len() != 3 && vectors.len() != 9 {
            return Err(FormatError::at(
                line_num,
                FormatErrorKind::FieldCount {
                    section: "box",
                    expected: "3 or 9",
                    found: vectors.len(),
                },
            ));
        }
        Ok(Self {
            vectors,
            raw: Some(line.to_string()),
        })
    }

    pub fn vectors(&self) -> &[f64] {
        &self.vectors
    }

    /// Adds `offset` to the three diagonal components.
    pub fn shift(&mut self, offset: f64) {
        for v in self.vectors.iter_mut().take(3) {
            *v += offset;
        }
        self.raw = None;
    }

    pub fn to_line(&self) -> String {
        match &self.raw {
            Some(raw) => raw.clone(),
            None => self.vectors.iter().map(|v| format!("{v:>10.5}")).collect(),
        }
    }
}

/// A GROMACS `.gro` coordinate file.
#[derive(Debug, Clone, PartialEq)]
pub struct GroFile {
    pub title: String,
    pub atoms: Vec<GroAtom>,
    pub box_vectors: GroBox,
    pub precision: GroPrecision,
}

impl GroFile {
    pub fn atom_count(&self) -> usize {
        self.atoms.len()
    }

    /// Translates every atom position by `offset`.
    pub fn translate(&mut self, offset: &Vector3<f64>) {
        for atom in &mut self.atoms {
            atom.translate(offset);
        }
    }

    /// A copy with the given title and one new position (nm) per atom, in atom order.
    ///
    /// Residues, names, serials and the box are kept from `self`.
    pub fn with_positions(
        &self,
        title: impl Into<String>,
        positions: &[Point3<f64>],
    ) -> Result<Self, FormatErrorKind> {
        if positions.len() != self.atoms.len() {
            return Err(FormatErrorKind::CountMismatch {
                what: "coordinate atom",
                declared: self.atoms.len(),
                parsed: positions.len(),
            });
        }
        let mut placed = self.clone();
        placed.title = title.into();
        for (atom, position) in placed.atoms.iter_mut().zip(positions) {
            atom.set_position(*position);
        }
        Ok(placed)
    }
}

impl TextFile for GroFile {
    /// Parses a `.gro` file, checking the declared atom count on line 2 against the number of
    /// atom lines found before the box line.
    fn parse(text: &str) -> Result<Self, FormatError> {
        let lines: Vec<&str> = text.lines().collect();
        let Some(count_line) = lines.get(1) else {
            return Err(FormatErrorKind::MissingSection("atom count").into());
        };
        let declared: usize = count_line.trim().parse().map_err(|_| {
            FormatError::at(
                2,
                FormatErrorKind::InvalidInt {
                    field: "atom count",
                    value: count_line.trim().to_string(),
                },
            )
        })?;

        let body: Vec<&str> = {
            let mut end = lines.len();
            while end > 2 && lines[end - 1].trim().is_empty() {
                end -= 1;
            }
            lines[2..end].to_vec()
        };
        let Some((box_line, atom_lines)) = body.split_last() else {
            return Err(FormatErrorKind::MissingSection("box vectors").into());
        };
        if atom_lines.len() != declared {
            return Err(FormatErrorKind::CountMismatch {
                what: "coordinate atom",
                declared,
                parsed: atom_lines.len(),
            }
            .into());
        }

        let mut precision = None;
        let mut atoms = Vec::with_capacity(declared);
        for (k, line) in atom_lines.iter().enumerate() {
            let (atom, p) = GroAtom::parse(line, k + 3)?;
            precision.get_or_insert(p);
            atoms.push(atom);
        }
        let box_vectors = GroBox::parse(box_line, declared + 3)?;

        Ok(Self {
            title: lines[0].to_string(),
            atoms,
            box_vectors,
            precision: precision.unwrap_or_default(),
        })
    }
}

impl WriteText for GroFile {
    fn write_to(&self, w: &mut impl Write) -> io::Result<()> {
        writeln!(w, "{}", self.title)?;
        writeln!(w, "{:>5}", self.atoms.len())?;
        for atom in &self.atoms {
            writeln!(w, "{}", atom.to_line(self.precision))?;
        }
        writeln!(w, "{}", self.box_vectors.to_line())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIGAND: &str = "\
Ligand A
    3
    1MOL     C1    1   1.000   2.000   3.000
    1MOL     O1    2   1.120   2.050   3.010
    1MOL     H1    3   0.950   1.900   3.050
   3.00000   3.00000   3.00000
";

    #[test]
    fn parses_fixed_columns() {
        let gro = GroFile::parse(LIGAND).unwrap();
        assert_eq!(gro.title, "Ligand A");
        assert_eq!(gro.atom_count(), 3);
        let o = &gro.atoms[1];
        assert_eq!(o.residue_number(), 1);
        assert_eq!(o.residue_name(), "MOL");
        assert_eq!(o.name(), "O1");
        assert_eq!(o.serial(), 2);
        assert!((o.position().x - 1.12).abs() < 1e-9);
        assert_eq!(gro.precision, GroPrecision::default());
        assert_eq!(gro.box_vectors.vectors(), &[3.0, 3.0, 3.0]);
    }

    #[test]
    fn untouched_file_round_trips_byte_for_byte() {
        let gro = GroFile::parse(LIGAND).unwrap();
        assert_eq!(gro.render(), LIGAND);
    }

    #[test]
    fn modified_rows_are_reformatted() {
        let mut gro = GroFile::parse(LIGAND).unwrap();
        gro.atoms[2].set_name("DH1");
        gro.atoms[2].set_serial(7);
        let text = gro.render();
        assert!(text.contains("    1MOL    DH1    7   0.950   1.900   3.050\n"));
        assert!(text.contains("    1MOL     C1    1   1.000   2.000   3.000\n"));
    }

    #[test]
    fn declared_count_must_match_atom_lines() {
        let text = LIGAND.replacen("    3\n", "    4\n", 1);
        let err = GroFile::parse(&text).unwrap_err();
        assert_eq!(
            err.kind,
            FormatErrorKind::CountMismatch {
                what: "coordinate atom",
                declared: 4,
                parsed: 3
            }
        );
    }

    #[test]
    fn non_numeric_coordinate_is_rejected() {
        let text = LIGAND.replacen("1.120", "1.1x0", 1);
        let err = GroFile::parse(&text).unwrap_err();
        assert_eq!(err.line, Some(4));
        assert!(matches!(err.kind, FormatErrorKind::InvalidFloat { field: "x", .. }));
    }

    #[test]
    fn precision_is_inferred_from_decimal_spacing() {
        let text = "\
hi-res
    1
    1MOL     C1    1   1.00000   2.00000   3.00000
   3.00000   3.00000   3.00000
";
        let gro = GroFile::parse(text).unwrap();
        assert_eq!(
            gro.precision,
            GroPrecision {
                width: 10,
                decimals: 5
            }
        );
        assert!((gro.atoms[0].position().z - 3.0).abs() < 1e-9);
    }

    #[test]
    fn velocities_are_read_when_present() {
        let text = "\
v
    1
    1SOL     OW    1   0.126   1.624   1.679  0.1227 -0.0580  0.0434
   1.86206   1.86206   1.86206
";
        let gro = GroFile::parse(text).unwrap();
        let v = gro.atoms[0].velocity().unwrap();
        assert!((v.y + 0.058).abs() < 1e-9);
    }

    #[test]
    fn new_positions_keep_names_and_box() {
        let gro = GroFile::parse(LIGAND).unwrap();
        let positions = [
            Point3::new(0.1, 0.2, 0.3),
            Point3::new(0.4, 0.5, 0.6),
            Point3::new(0.7, 0.8, 0.9),
        ];
        let placed = gro.with_positions("Ligand pose     2", &positions).unwrap();
        let text = placed.render();
        assert!(text.starts_with("Ligand pose     2\n    3\n"));
        assert!(text.contains("    1MOL     O1    2   0.400   0.500   0.600\n"));
        assert!(text.ends_with("   3.00000   3.00000   3.00000\n"));

        let err = gro.with_positions("short", &positions[..2]).unwrap_err();
        assert!(matches!(err, FormatErrorKind::CountMismatch { declared: 3, parsed: 2, .. }));
    }

    #[test]
    fn shifting_the_box_touches_diagonal_only() {
        let mut b = GroBox::new(vec![1.0, 2.0, 3.0, 0.0, 0.0, 0.5, 0.0, 0.0, 0.0]);
        b.shift(10.0);
        assert_eq!(&b.vectors()[..3], &[11.0, 12.0, 13.0]);
        assert_eq!(b.vectors()[5], 0.5);
    }
}
