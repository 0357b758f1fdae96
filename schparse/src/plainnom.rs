use super::*;
use std::str::FromStr;
use std::fmt;
use nom::{
    IResult,
    combinator::{ value, map, recognize, opt, cut, eof },
    branch::alt,
    multi::{ many0, many0_count, count },
    sequence::{ delimited, preceded, terminated },
    // the input is always a complete file. no streaming.
    character::complete::{ char, digit1, space1, line_ending,
                           not_line_ending },
    bytes::complete::take_till1,
};

fn u82str_unsafe(i: &[u8]) -> &str {
    unsafe { std::str::from_utf8_unchecked(i) }
}

fn int(input: &[u8]) -> IResult<&[u8], i32> {
    map(recognize(
        preceded(
            opt(char('-')),
            digit1
        )
    ), |i| i32::from_str(u82str_unsafe(i)).unwrap())(input)
}

/// end of record: a line break, or the end of the file for the
/// last record.
fn eol(i: &[u8]) -> IResult<&[u8], ()> {
    alt((value((), line_ending), value((), eof)))(i)
}

/// a fixed number of space-separated integer fields.
fn fields<'a>(n: usize) ->
impl FnMut(&'a [u8]) -> IResult<&'a [u8], Vec<i32>> {
    count(preceded(space1, int), n)
}

/// one line of free text (may be empty).
fn text_line(i: &[u8]) -> IResult<&[u8], CompactString> {
    map(terminated(not_line_ending, eol),
        |s| CompactString::from(u82str_unsafe(s)))(i)
}

fn line_ob(i: &[u8]) -> IResult<&[u8], ObData> {
    map(preceded(char('L'), cut(terminated(fields(10), eol))),
        |f| ObData::Line(LineData {
            x1: f[0], y1: f[1], x2: f[2], y2: f[3], color: f[4],
            width: f[5], capstyle: f[6],
            dashstyle: f[7], dashlength: f[8], dashspace: f[9],
        }))(i)
}

fn box_ob(i: &[u8]) -> IResult<&[u8], ObData> {
    map(preceded(char('B'), cut(terminated(fields(16), eol))),
        |f| ObData::Box_(BoxData {
            x: f[0], y: f[1], width: f[2], height: f[3], color: f[4],
            linewidth: f[5], capstyle: f[6],
            dashstyle: f[7], dashlength: f[8], dashspace: f[9],
            filltype: f[10], fillwidth: f[11],
            angle1: f[12], pitch1: f[13], angle2: f[14], pitch2: f[15],
        }))(i)
}

fn circle_ob(i: &[u8]) -> IResult<&[u8], ObData> {
    map(preceded(char('V'), cut(terminated(fields(15), eol))),
        |f| ObData::Circle(CircleData {
            x: f[0], y: f[1], radius: f[2], color: f[3],
            linewidth: f[4], capstyle: f[5],
            dashstyle: f[6], dashlength: f[7], dashspace: f[8],
            filltype: f[9], fillwidth: f[10],
            angle1: f[11], pitch1: f[12], angle2: f[13], pitch2: f[14],
        }))(i)
}

fn arc_ob(i: &[u8]) -> IResult<&[u8], ObData> {
    map(preceded(char('A'), cut(terminated(fields(11), eol))),
        |f| ObData::Arc(ArcData {
            x: f[0], y: f[1], radius: f[2],
            startangle: f[3], sweepangle: f[4], color: f[5],
            linewidth: f[6], capstyle: f[7],
            dashstyle: f[8], dashlength: f[9], dashspace: f[10],
        }))(i)
}

fn text_ob(i: &[u8]) -> IResult<&[u8], ObData> {
    let (i, f) = preceded(char('T'), cut(terminated(fields(9), eol)))(i)?;
    let (i, content) = cut(count(text_line, f[8].max(0) as usize))(i)?;
    Ok((i, ObData::Text(TextData {
        x: f[0], y: f[1], color: f[2], size: f[3],
        visibility: f[4], show_name_value: f[5],
        angle: f[6], alignment: f[7],
        content,
    })))
}

fn net_ob(i: &[u8]) -> IResult<&[u8], ObData> {
    map(preceded(char('N'), cut(terminated(fields(5), eol))),
        |f| ObData::Net(NetData {
            x1: f[0], y1: f[1], x2: f[2], y2: f[3], color: f[4],
        }))(i)
}

fn bus_ob(i: &[u8]) -> IResult<&[u8], ObData> {
    map(preceded(char('U'), cut(terminated(fields(6), eol))),
        |f| ObData::Bus(BusData {
            x1: f[0], y1: f[1], x2: f[2], y2: f[3], color: f[4],
            ripperdir: f[5],
        }))(i)
}

fn pin_ob(i: &[u8]) -> IResult<&[u8], ObData> {
    map(preceded(char('P'), cut(terminated(fields(7), eol))),
        |f| ObData::Pin(PinData {
            x1: f[0], y1: f[1], x2: f[2], y2: f[3], color: f[4],
            pintype: f[5], whichend: f[6],
        }))(i)
}

fn component_ob(i: &[u8]) -> IResult<&[u8], ObData> {
    let (i, f) = preceded(char('C'), cut(fields(5)))(i)?;
    let (i, basename) = cut(terminated(
        preceded(space1, take_till1(|c| c == b'\r' || c == b'\n')),
        eol))(i)?;
    Ok((i, ObData::Component(ComponentData {
        x: f[0], y: f[1], selectable: f[2], angle: f[3], mirror: f[4],
        basename: CompactString::from(u82str_unsafe(basename)),
    })))
}

fn path_ob(i: &[u8]) -> IResult<&[u8], ObData> {
    let (i, f) = preceded(char('H'), cut(terminated(fields(13), eol)))(i)?;
    let (i, path) = cut(count(text_line, f[12].max(0) as usize))(i)?;
    Ok((i, ObData::Path(PathData {
        color: f[0],
        linewidth: f[1], capstyle: f[2],
        dashstyle: f[3], dashlength: f[4], dashspace: f[5],
        filltype: f[6], fillwidth: f[7],
        angle1: f[8], pitch1: f[9], angle2: f[10], pitch2: f[11],
        path,
    })))
}

fn ob_data(i: &[u8]) -> IResult<&[u8], ObData> {
    alt((
        line_ob, box_ob, circle_ob, arc_ob, text_ob,
        net_ob, bus_ob, pin_ob, component_ob, path_ob
    ))(i)
}

/// an object optionally followed by its `{` ... `}` attribute block.
/// only text objects are allowed inside the block.
fn object(i: &[u8]) -> IResult<&[u8], Object> {
    let (i, data) = ob_data(i)?;
    let (i, attached) = opt(delimited(
        terminated(char('{'), eol),
        many0(map(text_ob, |data| Object { data, attached: Vec::new() })),
        cut(terminated(char('}'), eol))
    ))(i)?;
    let attached = attached.unwrap_or_default();
    for ob in &attached {
        if ob.attribute().is_none() {
            clilog::warn!(SCHP_BAD_ATTRIB,
                          "attached text is not a name=value attribute \
                           and will be ignored");
        }
    }
    Ok((i, Object { data, attached }))
}

fn revision(i: &[u8]) -> IResult<&[u8], Revision> {
    let (i, f) = preceded(char('v'), cut(terminated(fields(2), eol)))(i)?;
    let (i, objects) = many0(object)(i)?;
    let (i, _) = many0_count(line_ending)(i)?;
    Ok((i, Revision {
        version: f[0],
        fileformat: f[1],
        objects,
    }))
}

/// a `Display`able parsing error type, which prints at most
/// 50 characters after the error position.
pub(crate) struct ParseError {
    code: nom::error::ErrorKind,
    partial_input: String
}

impl From<nom::Err<nom::error::Error<&[u8]>>> for ParseError {
    fn from(e: nom::Err<nom::error::Error<&[u8]>>) -> Self {
        match e {
            nom::Err::Incomplete(_) => ParseError {
                code: nom::error::ErrorKind::Fail,
                partial_input: "<incomplete>".into()
            },
            nom::Err::Error(e) | nom::Err::Failure(e) => ParseError {
                code: e.code,
                partial_input: String::from_utf8_lossy(
                    &e.input[..e.input.len().min(50)]).to_string()
            }
        }
    }
}

impl From<ParseError> for String {
    fn from(e: ParseError) -> String {
        format!("{}", e)
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "error {:?} at: {}",
               self.code,
               self.partial_input)
    }
}

pub(crate) fn parse_revision(i: &[u8]) -> Result<Revision, ParseError> {
    let (rem, rev) = revision(i)?;
    if rem.len() > 0 {
        return Err(nom::Err::Error(nom::error::Error {
            input: rem,
            code: nom::error::ErrorKind::Complete
        }).into())
    }
    Ok(rev)
}

#[test]
fn test_parse_flat_page() {
    let rev = Revision::parse_str("\
v 20201216 2
C 300 500 1 0 0 resistor-1.sym
{
T 350 800 5 10 1 1 0 0 1
refdes=R1
}
N 300 500 900 500 4
{
T 500 550 5 10 1 1 0 0 1
netname=VCC
}
T 100 100 9 10 1 0 0 0 2
two lines of
plain text
").unwrap();
    assert_eq!(rev.version, 20201216);
    assert_eq!(rev.objects.len(), 3);
    assert_eq!(rev.objects[0].attached.len(), 1);
    assert_eq!(rev.objects[0].attribute(), None);
    assert_eq!(rev.objects[0].attached[0].attribute(),
               Some(("refdes".into(), "R1".into())));
    assert_eq!(rev.objects[1].attached_values("netname").collect::<Vec<_>>(),
               vec!["VCC"]);
    // plain multi-line text is not an attribute
    assert_eq!(rev.objects[2].attribute(), None);
}

#[test]
fn test_parse_rejects_garbage() {
    assert!(Revision::parse_str("v 20201216 2\nX 1 2 3\n").is_err());
    assert!(Revision::parse_str("N 1 2 3 4 4\n").is_err());
    // unterminated attribute block
    assert!(Revision::parse_str(
        "v 20201216 2\nN 1 2 3 4 4\n{\n").is_err());
}
