use std::fs;
use schparse::{FileFormat, Revision, write_xml};

#[test]
fn xmlread_roundtrips_to_canonical_text() {
    let rev = Revision::read_format(
        concat!(env!("CARGO_MANIFEST_DIR"),
                "/tests/files/xmlread.sch.xml"),
        FileFormat::SchXml
    ).expect("unable to read xmlread.sch.xml");

    let expected = fs::read_to_string(
        concat!(env!("CARGO_MANIFEST_DIR"), "/tests/files/xmlread.sch")
    ).expect("unable to read xmlread.sch");

    assert_eq!(format!("{}", rev), expected);
}

#[test]
fn text_to_xml_and_back() {
    let src = fs::read_to_string(
        concat!(env!("CARGO_MANIFEST_DIR"), "/tests/files/xmlread.sch")
    ).unwrap();
    let rev = Revision::parse_str(&src).unwrap();

    let mut xml = Vec::new();
    write_xml(&rev, &mut xml).unwrap();

    let tmp = std::env::temp_dir().join("schparse-roundtrip.sch.xml");
    fs::write(&tmp, &xml).unwrap();
    let rev2 = Revision::read(&tmp).unwrap();
    assert_eq!(format!("{}", rev2), src);
}

#[test]
fn unknown_extension_is_an_error() {
    let err = Revision::read(
        concat!(env!("CARGO_MANIFEST_DIR"), "/tests/roundtrip.rs")
    ).unwrap_err();
    assert!(matches!(err, schparse::ReadError::UnknownFormat(_)));
}
