use super::error::{FormatError, ReadError};
use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::Path;

/// A text file format that can be parsed into a typed value.
///
/// Implementors only provide [`TextFile::parse`]; reading from readers and paths is derived.
pub trait TextFile: Sized {
    /// Parses the complete contents of a file.
    ///
    /// # Errors
    ///
    /// Returns a [`FormatError`] carrying the offending line number where one applies.
    fn parse(text: &str) -> Result<Self, FormatError>;

    fn read_from(reader: &mut impl Read) -> Result<Self, ReadError> {
        let mut text = String::new();
        reader.read_to_string(&mut text)?;
        Ok(Self::parse(&text)?)
    }

    fn read_from_path<P: AsRef<Path>>(path: P) -> Result<Self, ReadError> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        Self::read_from(&mut reader)
    }
}

/// A typed value that serializes to a text file format.
pub trait WriteText {
    fn write_to(&self, writer: &mut impl Write) -> std::io::Result<()>;

    /// Renders the value into an in-memory string.
    fn render(&self) -> String {
        let mut buffer = Vec::new();
        // Writing into a Vec<u8> cannot fail.
        let _ = self.write_to(&mut buffer);
        String::from_utf8_lossy(&buffer).into_owned()
    }
}
