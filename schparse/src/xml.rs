//! XML variant of the schematic/symbol file format.
//!
//! The XML schema mirrors the legacy text records one to one: one
//! element per object, the record fields as element attributes, and
//! the content of text and path objects as element text.  Attached
//! attribute objects are child elements.  Reading an XML file and
//! printing the resulting [Revision] therefore yields the canonical
//! text form.

use compact_str::CompactString;
use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::events::{ BytesDecl, BytesEnd, BytesStart, BytesText, Event };
use super::*;

fn attr_map(e: &BytesStart) -> Result<Vec<(String, String)>, String> {
    let mut ret = Vec::new();
    for attr in e.attributes() {
        let attr = attr.map_err(|e| format!("bad xml attribute: {}", e))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).to_string();
        let value = attr.unescape_value()
            .map_err(|e| format!("bad xml attribute value: {}", e))?
            .to_string();
        ret.push((key, value));
    }
    Ok(ret)
}

fn get_i32(attrs: &[(String, String)], name: &str) -> Result<i32, String> {
    let v = attrs.iter()
        .find(|(k, _)| k == name)
        .ok_or_else(|| format!("missing attribute `{}'", name))?;
    v.1.parse().map_err(|_| format!("attribute `{}' is not a number", name))
}

fn get_str(attrs: &[(String, String)], name: &str) -> Result<CompactString, String> {
    attrs.iter()
        .find(|(k, _)| k == name)
        .map(|(_, v)| CompactString::from(v.as_str()))
        .ok_or_else(|| format!("missing attribute `{}'", name))
}

/// start an object from an element name and its attributes.
/// text and path content is filled in later from the element text.
fn start_ob(name: &[u8], a: &[(String, String)]) -> Result<ObData, String> {
    let g = |n| get_i32(a, n);
    Ok(match name {
        b"line" => ObData::Line(LineData {
            x1: g("x1")?, y1: g("y1")?, x2: g("x2")?, y2: g("y2")?,
            color: g("color")?,
            width: g("width")?, capstyle: g("capstyle")?,
            dashstyle: g("dashstyle")?, dashlength: g("dashlength")?,
            dashspace: g("dashspace")?,
        }),
        b"box" => ObData::Box_(BoxData {
            x: g("x")?, y: g("y")?,
            width: g("width")?, height: g("height")?,
            color: g("color")?,
            linewidth: g("linewidth")?, capstyle: g("capstyle")?,
            dashstyle: g("dashstyle")?, dashlength: g("dashlength")?,
            dashspace: g("dashspace")?,
            filltype: g("filltype")?, fillwidth: g("fillwidth")?,
            angle1: g("angle1")?, pitch1: g("pitch1")?,
            angle2: g("angle2")?, pitch2: g("pitch2")?,
        }),
        b"circle" => ObData::Circle(CircleData {
            x: g("x")?, y: g("y")?, radius: g("radius")?,
            color: g("color")?,
            linewidth: g("linewidth")?, capstyle: g("capstyle")?,
            dashstyle: g("dashstyle")?, dashlength: g("dashlength")?,
            dashspace: g("dashspace")?,
            filltype: g("filltype")?, fillwidth: g("fillwidth")?,
            angle1: g("angle1")?, pitch1: g("pitch1")?,
            angle2: g("angle2")?, pitch2: g("pitch2")?,
        }),
        b"arc" => ObData::Arc(ArcData {
            x: g("x")?, y: g("y")?, radius: g("radius")?,
            startangle: g("startangle")?, sweepangle: g("sweepangle")?,
            color: g("color")?,
            linewidth: g("linewidth")?, capstyle: g("capstyle")?,
            dashstyle: g("dashstyle")?, dashlength: g("dashlength")?,
            dashspace: g("dashspace")?,
        }),
        b"text" => ObData::Text(TextData {
            x: g("x")?, y: g("y")?,
            color: g("color")?, size: g("size")?,
            visibility: g("visibility")?,
            show_name_value: g("show")?,
            angle: g("angle")?, alignment: g("alignment")?,
            content: Vec::new(),
        }),
        b"net" => ObData::Net(NetData {
            x1: g("x1")?, y1: g("y1")?, x2: g("x2")?, y2: g("y2")?,
            color: g("color")?,
        }),
        b"bus" => ObData::Bus(BusData {
            x1: g("x1")?, y1: g("y1")?, x2: g("x2")?, y2: g("y2")?,
            color: g("color")?,
            ripperdir: g("ripperdir")?,
        }),
        b"pin" => ObData::Pin(PinData {
            x1: g("x1")?, y1: g("y1")?, x2: g("x2")?, y2: g("y2")?,
            color: g("color")?,
            pintype: g("pintype")?, whichend: g("whichend")?,
        }),
        b"component" => ObData::Component(ComponentData {
            x: g("x")?, y: g("y")?,
            selectable: g("selectable")?,
            angle: g("angle")?, mirror: g("mirror")?,
            basename: get_str(a, "basename")?,
        }),
        b"path" => ObData::Path(PathData {
            color: g("color")?,
            linewidth: g("linewidth")?, capstyle: g("capstyle")?,
            dashstyle: g("dashstyle")?, dashlength: g("dashlength")?,
            dashspace: g("dashspace")?,
            filltype: g("filltype")?, fillwidth: g("fillwidth")?,
            angle1: g("angle1")?, pitch1: g("pitch1")?,
            angle2: g("angle2")?, pitch2: g("pitch2")?,
            path: Vec::new(),
        }),
        other => return Err(format!(
            "unknown element `{}'", String::from_utf8_lossy(other))),
    })
}

fn split_content(buf: &str) -> Vec<CompactString> {
    if buf.is_empty() {
        Vec::new()
    } else {
        buf.split('\n').map(CompactString::from).collect()
    }
}

/// finish an object: move the accumulated element text into the
/// content field of text and path objects.
fn finish_ob(mut data: ObData, text: String, attached: Vec<Object>) -> Object {
    match &mut data {
        ObData::Text(t) => t.content = split_content(&text),
        ObData::Path(p) => p.path = split_content(&text),
        _ => {}
    }
    Object { data, attached }
}

pub(crate) fn parse_xml(bytes: &[u8]) -> Result<Revision, String> {
    let src = std::str::from_utf8(bytes)
        .map_err(|e| format!("not valid utf-8: {}", e))?;
    let mut reader = Reader::from_str(src);

    let mut rev: Option<Revision> = None;
    // stack of objects under construction: (data, text buffer, attached)
    let mut stack: Vec<(ObData, String, Vec<Object>)> = Vec::new();

    loop {
        let ev = reader.read_event()
            .map_err(|e| format!("xml parse error: {}", e))?;
        match ev {
            Event::Start(e) | Event::Empty(e)
                if rev.is_none() =>
            {
                match e.name().as_ref() {
                    b"revision" | b"schematic" | b"symbol" => {
                        let a = attr_map(&e)?;
                        rev = Some(Revision {
                            version: get_i32(&a, "version")?,
                            fileformat: get_i32(&a, "fileformat")?,
                            objects: Vec::new(),
                        });
                    }
                    other => return Err(format!(
                        "unexpected root element `{}'",
                        String::from_utf8_lossy(other))),
                }
            }
            Event::Start(e) => {
                let a = attr_map(&e)?;
                let data = start_ob(e.name().as_ref(), &a)?;
                stack.push((data, String::new(), Vec::new()));
            }
            Event::Empty(e) => {
                let a = attr_map(&e)?;
                let data = start_ob(e.name().as_ref(), &a)?;
                let ob = finish_ob(data, String::new(), Vec::new());
                match stack.last_mut() {
                    Some((_, _, attached)) => attached.push(ob),
                    None => rev.as_mut().unwrap().objects.push(ob),
                }
            }
            Event::Text(t) => {
                if let Some((data, buf, _)) = stack.last_mut() {
                    // only text/path content is significant; the rest
                    // is indentation between child elements.
                    if matches!(data, ObData::Text(_) | ObData::Path(_)) {
                        let decoded = t.decode().map_err(
                            |e| format!("bad xml text: {}", e))?;
                        buf.push_str(&quick_xml::escape::unescape(&decoded).map_err(
                            |e| format!("bad xml text: {}", e))?);
                    }
                }
            }
            Event::CData(t) => {
                if let Some((_, buf, _)) = stack.last_mut() {
                    buf.push_str(&String::from_utf8_lossy(&t));
                }
            }
            Event::End(_) => {
                match stack.pop() {
                    Some((data, text, attached)) => {
                        let ob = finish_ob(data, text, attached);
                        match stack.last_mut() {
                            Some((_, _, att)) => att.push(ob),
                            None => rev.as_mut().unwrap().objects.push(ob),
                        }
                    }
                    // end of the root element
                    None => {}
                }
            }
            Event::Eof => break,
            // declarations, comments, processing instructions
            _ => {}
        }
    }

    rev.ok_or_else(|| "missing root element".to_string())
}

fn ob_element(ob: &Object) -> (&'static str, Vec<(&'static str, String)>,
                               Option<String>) {
    use ObData::*;
    macro_rules! a {
        ($d:ident: $($n:ident),+ $(,)?) => {
            vec![$((stringify!($n), $d.$n.to_string())),+]
        }
    }
    match &ob.data {
        Line(d) => ("line", a!(d: x1, y1, x2, y2, color, width, capstyle,
                               dashstyle, dashlength, dashspace), None),
        Box_(d) => ("box", a!(d: x, y, width, height, color, linewidth,
                              capstyle, dashstyle, dashlength, dashspace,
                              filltype, fillwidth,
                              angle1, pitch1, angle2, pitch2), None),
        Circle(d) => ("circle", a!(d: x, y, radius, color, linewidth,
                                   capstyle, dashstyle, dashlength,
                                   dashspace, filltype, fillwidth,
                                   angle1, pitch1, angle2, pitch2), None),
        Arc(d) => ("arc", a!(d: x, y, radius, startangle, sweepangle, color,
                             linewidth, capstyle, dashstyle, dashlength,
                             dashspace), None),
        Text(d) => {
            let mut attrs = a!(d: x, y, color, size, visibility);
            attrs.push(("show", d.show_name_value.to_string()));
            attrs.push(("angle", d.angle.to_string()));
            attrs.push(("alignment", d.alignment.to_string()));
            ("text", attrs,
             Some(itertools::Itertools::join(&mut d.content.iter(), "\n")))
        }
        Net(d) => ("net", a!(d: x1, y1, x2, y2, color), None),
        Bus(d) => ("bus", a!(d: x1, y1, x2, y2, color, ripperdir), None),
        Pin(d) => ("pin", a!(d: x1, y1, x2, y2, color, pintype, whichend),
                   None),
        Component(d) => {
            let mut attrs = a!(d: x, y, selectable, angle, mirror);
            attrs.push(("basename", d.basename.to_string()));
            ("component", attrs, None)
        }
        Path(d) => ("path", a!(d: color, linewidth, capstyle, dashstyle,
                               dashlength, dashspace, filltype, fillwidth,
                               angle1, pitch1, angle2, pitch2),
                    Some(itertools::Itertools::join(&mut d.path.iter(), "\n"))),
    }
}

fn write_ob<W: std::io::Write>(
    w: &mut Writer<W>, ob: &Object
) -> Result<(), quick_xml::Error> {
    let (name, attrs, content) = ob_element(ob);
    let mut elem = BytesStart::new(name);
    for (k, v) in &attrs {
        elem.push_attribute((*k, v.as_str()));
    }
    if content.is_none() && ob.attached.is_empty() {
        w.write_event(Event::Empty(elem))?;
        return Ok(())
    }
    w.write_event(Event::Start(elem))?;
    if let Some(content) = &content {
        w.write_event(Event::Text(BytesText::new(content)))?;
    }
    for att in &ob.attached {
        write_ob(w, att)?;
    }
    w.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

/// Write a revision in the XML variant of the file format.
pub fn write_xml<W: std::io::Write>(
    rev: &Revision, out: &mut W
) -> Result<(), quick_xml::Error> {
    let mut w = Writer::new(out);
    w.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    let mut root = BytesStart::new("revision");
    root.push_attribute(("version", rev.version.to_string().as_str()));
    root.push_attribute(("fileformat", rev.fileformat.to_string().as_str()));
    w.write_event(Event::Start(root))?;
    for ob in &rev.objects {
        write_ob(&mut w, ob)?;
    }
    w.write_event(Event::End(BytesEnd::new("revision")))?;
    Ok(())
}

#[test]
fn test_xml_roundtrip() {
    let src = "\
v 20201216 2
C 300 500 1 0 0 resistor-1.sym
{
T 350 800 5 10 1 1 0 0 1
refdes=R1
}
N 300 500 900 500 4
";
    let rev = Revision::parse_str(src).unwrap();
    let mut xml = Vec::new();
    write_xml(&rev, &mut xml).unwrap();
    let rev2 = parse_xml(&xml).unwrap();
    assert_eq!(format!("{}", rev2), src);
}
