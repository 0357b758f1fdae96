//! A parser for legacy schematic and symbol files.
//!
//! # Usage
//!
//! Pass a `&str` or a path to one of the parse entry points.  Example:
//! ```
//! use schparse::Revision;
//!
//! let _parsed = Revision::parse_str(r#"v 20201216 2
//! N 100 100 500 100 4
//! {
//! T 200 150 5 10 1 1 0 0 1
//! netname=VCC
//! }
//! "#).expect("parse error");
//! ```
//!
//! The parsed [Revision] keeps every numeric field of every record so
//! that a file can be written back in canonical form (see the
//! [std::fmt::Display] impl and [write_xml]).

use compact_str::CompactString;

mod format;
pub use format::{FileFormat, UnknownFormatError, guess_format};

/// All content of one schematic or symbol file, in file order.
#[derive(Debug, Clone)]
pub struct Revision {
    /// Release version from the `v` record.
    pub version: i32,
    /// File format version from the `v` record.
    pub fileformat: i32,
    /// Top-level objects in file order.
    pub objects: Vec<Object>,
}

/// A primitive object together with its attached attribute texts.
#[derive(Debug, Clone)]
pub struct Object {
    pub data: ObData,
    /// Attached children (text objects enclosed in `{` ... `}`).
    pub attached: Vec<Object>,
}

/// The per-kind payload of an [Object].
///
/// Field order follows the order of the fields in the legacy text
/// records, so the writers can emit them positionally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObData {
    Line(LineData),
    Box_(BoxData),
    Circle(CircleData),
    Arc(ArcData),
    Text(TextData),
    Net(NetData),
    Bus(BusData),
    Pin(PinData),
    Component(ComponentData),
    Path(PathData),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineData {
    pub x1: i32, pub y1: i32, pub x2: i32, pub y2: i32,
    pub color: i32,
    pub width: i32, pub capstyle: i32,
    pub dashstyle: i32, pub dashlength: i32, pub dashspace: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoxData {
    pub x: i32, pub y: i32, pub width: i32, pub height: i32,
    pub color: i32,
    pub linewidth: i32, pub capstyle: i32,
    pub dashstyle: i32, pub dashlength: i32, pub dashspace: i32,
    pub filltype: i32, pub fillwidth: i32,
    pub angle1: i32, pub pitch1: i32, pub angle2: i32, pub pitch2: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CircleData {
    pub x: i32, pub y: i32, pub radius: i32,
    pub color: i32,
    pub linewidth: i32, pub capstyle: i32,
    pub dashstyle: i32, pub dashlength: i32, pub dashspace: i32,
    pub filltype: i32, pub fillwidth: i32,
    pub angle1: i32, pub pitch1: i32, pub angle2: i32, pub pitch2: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArcData {
    pub x: i32, pub y: i32, pub radius: i32,
    pub startangle: i32, pub sweepangle: i32,
    pub color: i32,
    pub linewidth: i32, pub capstyle: i32,
    pub dashstyle: i32, pub dashlength: i32, pub dashspace: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextData {
    pub x: i32, pub y: i32,
    pub color: i32, pub size: i32,
    pub visibility: i32, pub show_name_value: i32,
    pub angle: i32, pub alignment: i32,
    /// The text lines (the record's `num_lines` is derived from this).
    pub content: Vec<CompactString>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetData {
    pub x1: i32, pub y1: i32, pub x2: i32, pub y2: i32,
    pub color: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusData {
    pub x1: i32, pub y1: i32, pub x2: i32, pub y2: i32,
    pub color: i32,
    pub ripperdir: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PinData {
    pub x1: i32, pub y1: i32, pub x2: i32, pub y2: i32,
    pub color: i32,
    /// 0 = normal pin, 1 = bus pin.
    pub pintype: i32,
    /// Which endpoint is the active connection point: 0 = first, 1 = second.
    pub whichend: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentData {
    pub x: i32, pub y: i32,
    pub selectable: i32,
    pub angle: i32, pub mirror: i32,
    /// Symbol basename, e.g. `resistor-1.sym`.
    pub basename: CompactString,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathData {
    pub color: i32,
    pub linewidth: i32, pub capstyle: i32,
    pub dashstyle: i32, pub dashlength: i32, pub dashspace: i32,
    pub filltype: i32, pub fillwidth: i32,
    pub angle1: i32, pub pitch1: i32, pub angle2: i32, pub pitch2: i32,
    /// Raw path description lines.
    pub path: Vec<CompactString>,
}

/// Raised by [parse_attribute] for text that is not `name=value`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedAttribute(pub CompactString);

impl std::fmt::Display for MalformedAttribute {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "malformed attribute `{}'", self.0)
    }
}

/// Split an attribute string of the form `name=value`.
///
/// The name must be non-empty and must not contain whitespace or `=`.
/// The value may be empty.
pub fn parse_attribute(s: &str) -> Result<(&str, &str), MalformedAttribute> {
    let eq = match s.find('=') {
        Some(i) if i > 0 => i,
        _ => return Err(MalformedAttribute(s.into()))
    };
    let (name, value) = (&s[..eq], &s[eq + 1..]);
    if name.chars().any(|c| c.is_whitespace()) {
        return Err(MalformedAttribute(s.into()))
    }
    Ok((name, value))
}

impl Object {
    /// If this object is a text object whose content parses as
    /// `name=value`, return the pair.  Multi-line values are joined
    /// with newlines.
    pub fn attribute(&self) -> Option<(CompactString, CompactString)> {
        let text = match &self.data {
            ObData::Text(t) => t,
            _ => return None
        };
        let joined = itertools::Itertools::join(
            &mut text.content.iter(), "\n");
        match parse_attribute(&joined) {
            Ok((name, value)) => Some((name.into(), value.into())),
            Err(_) => None
        }
    }

    /// Values of all attached attributes named `name`, in file order.
    pub fn attached_values<'i>(&'i self, name: &'i str)
                               -> impl Iterator<Item = CompactString> + 'i
    {
        self.attached.iter()
            .filter_map(move |ob| match ob.attribute() {
                Some((n, v)) if n == name => Some(v),
                _ => None
            })
    }
}

impl Revision {
    /// Values of all floating attributes named `name`: text objects
    /// not attached to any other object.
    pub fn floating_values<'i>(&'i self, name: &'i str)
                               -> impl Iterator<Item = CompactString> + 'i
    {
        self.objects.iter()
            .filter_map(move |ob| match ob.attribute() {
                Some((n, v)) if n == name => Some(v),
                _ => None
            })
    }
}

mod plainnom;

/// A read failure: I/O, format detection, or parse level.
#[derive(Debug)]
pub enum ReadError {
    Io(std::io::Error),
    UnknownFormat(UnknownFormatError),
    /// Parse-level malformation; the string carries position context.
    Parse(String),
}

impl std::fmt::Display for ReadError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            ReadError::Io(e) => write!(f, "{}", e),
            ReadError::UnknownFormat(e) => write!(f, "{}", e),
            ReadError::Parse(e) => write!(f, "{}", e),
        }
    }
}

impl From<std::io::Error> for ReadError {
    fn from(e: std::io::Error) -> ReadError { ReadError::Io(e) }
}

impl From<UnknownFormatError> for ReadError {
    fn from(e: UnknownFormatError) -> ReadError { ReadError::UnknownFormat(e) }
}

impl Revision {
    /// Parses a string in the legacy text format.
    #[inline]
    pub fn parse_str(s: &str) -> Result<Revision, String> {
        Ok(plainnom::parse_revision(s.as_bytes())?)
    }

    /// Parses a u8 slice in the legacy text format.
    #[inline]
    pub fn parse_u8slice(s: &[u8]) -> Result<Revision, String> {
        Ok(plainnom::parse_revision(s)?)
    }

    /// Reads a schematic or symbol file, guessing the format from the
    /// file name extension.
    pub fn read(path: impl AsRef<std::path::Path>) -> Result<Revision, ReadError> {
        let format = guess_format(path.as_ref())?;
        Revision::read_format(path, format)
    }

    /// Reads a schematic or symbol file in an explicitly given format.
    pub fn read_format(
        path: impl AsRef<std::path::Path>, format: FileFormat
    ) -> Result<Revision, ReadError> {
        let bytes = std::fs::read(&path)?;
        match format {
            FileFormat::Sch | FileFormat::Sym =>
                Revision::parse_u8slice(&bytes).map_err(ReadError::Parse),
            FileFormat::SchXml | FileFormat::SymXml =>
                xml::parse_xml(&bytes).map_err(ReadError::Parse),
        }
    }
}

mod fmt;

pub mod xml;
pub use xml::write_xml;

#[test]
fn test_parse_attribute() {
    assert_eq!(parse_attribute("refdes=R1"), Ok(("refdes", "R1")));
    assert_eq!(parse_attribute("net=GND:7"), Ok(("net", "GND:7")));
    assert_eq!(parse_attribute("value="), Ok(("value", "")));
    assert!(parse_attribute("plain text").is_err());
    assert!(parse_attribute("=value").is_err());
    assert!(parse_attribute("bad name=value").is_err());
}
