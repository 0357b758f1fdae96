//! File format detection from file name extensions.

use std::path::Path;

/// The supported on-disk formats.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FileFormat {
    /// Legacy text schematic (`.sch`).
    Sch,
    /// Legacy text symbol (`.sym`).
    Sym,
    /// XML schematic (`.sch.xml`).
    SchXml,
    /// XML symbol (`.sym.xml`).
    SymXml,
}

impl FileFormat {
    /// Whether this is a symbol format (as opposed to a schematic).
    #[inline]
    pub fn is_symbol(self) -> bool {
        matches!(self, FileFormat::Sym | FileFormat::SymXml)
    }
}

/// Raised when a file name extension is not recognized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownFormatError(pub String);

impl std::fmt::Display for UnknownFormatError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}: unrecognized file name extension", self.0)
    }
}

/// Guess the file format from the file name.
pub fn guess_format(path: &Path) -> Result<FileFormat, UnknownFormatError> {
    let name = path.file_name()
        .map(|n| n.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    if name.ends_with(".sch.xml") {
        Ok(FileFormat::SchXml)
    } else if name.ends_with(".sym.xml") {
        Ok(FileFormat::SymXml)
    } else if name.ends_with(".sch") {
        Ok(FileFormat::Sch)
    } else if name.ends_with(".sym") {
        Ok(FileFormat::Sym)
    } else {
        Err(UnknownFormatError(path.display().to_string()))
    }
}

#[test]
fn test_guess_format() {
    use FileFormat::*;
    assert_eq!(guess_format(Path::new("a/top.sch")), Ok(Sch));
    assert_eq!(guess_format(Path::new("res-1.SYM")), Ok(Sym));
    assert_eq!(guess_format(Path::new("top.sch.xml")), Ok(SchXml));
    assert_eq!(guess_format(Path::new("res-1.sym.xml")), Ok(SymXml));
    assert!(guess_format(Path::new("top.v")).is_err());
}
