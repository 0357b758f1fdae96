//! tEDAx netlist backend.
//!
//! Since the tEDAx format creates entities implicitly when they are
//! referenced, packages without a footprint, a value, and connections
//! as well as nets without connections are dropped from the output.
//!
//! tEDAx nomenclature: our net is a tEDAx "network", our package is a
//! tEDAx "component", our pin is a tEDAx "pin".

use std::io::Write;
use super::*;

#[derive(Debug)]
pub enum BackendError {
    Io(std::io::Error),
    /// The format limits lines to 511 characters.
    LineTooLong(usize),
}

impl std::fmt::Display for BackendError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            BackendError::Io(e) => write!(f, "{}", e),
            BackendError::LineTooLong(len) => write!(
                f, "output format limits lines to 511 characters \
                    ({} needed)", len),
        }
    }
}

impl From<std::io::Error> for BackendError {
    fn from(e: std::io::Error) -> BackendError {
        BackendError::Io(e)
    }
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            ' ' => out.push_str("\\ "),
            other => out.push(other),
        }
    }
    out
}

fn wline(f: &mut impl Write, fields: &[&str]) -> Result<(), BackendError> {
    let line = fields.iter()
        .map(|field| escape(field))
        .collect::<Vec<_>>()
        .join(" ");
    if line.len() >= 512 {
        return Err(BackendError::LineTooLong(line.len()))
    }
    writeln!(f, "{}", line)?;
    Ok(())
}

/// Write the netlist in tEDAx netlist block format.
pub fn run(f: &mut impl Write, netlist: &Netlist)
           -> Result<(), BackendError> {
    wline(f, &["tEDAx", "v1"])?;

    // the 4th field is the netlist name; there is no concept of this
    // in the schematic model, so just use 'netlist' here
    wline(f, &["begin", "netlist", "v1", "netlist"])?;

    for &pkg in &netlist.packages {
        let package = &netlist[pkg];

        if let Some(footprint) =
            netlist.package_attribute(pkg, "footprint")
        {
            wline(f, &["footprint", package.refdes.as_str(),
                       footprint.as_str()])?;
        }
        if let Some(value) = netlist.package_attribute(pkg, "value") {
            wline(f, &["value", package.refdes.as_str(),
                       value.as_str()])?;
        }
        if let Some(device) = netlist.package_attribute(pkg, "device") {
            wline(f, &["device", package.refdes.as_str(),
                       device.as_str()])?;
        }

        // attributes preserved as component tags
        for attr_name in ["footprints"] {
            if let Some(attr_value) =
                netlist.package_attribute(pkg, attr_name)
            {
                wline(f, &["comptag", package.refdes.as_str(),
                           attr_name, attr_value.as_str()])?;
            }
        }

        for &ppin in &package.pins {
            let pin = &netlist[ppin];
            if let Some(pinlabel) =
                netlist.package_pin_attribute(ppin, "pinlabel")
            {
                wline(f, &["pinname", package.refdes.as_str(),
                           pin.number.as_str(), pinlabel.as_str()])?;
            }

            // the pinseq= attribute gives the SPICE pin index; a
            // package maps one-to-one to a SPICE device
            if let Some(pinseq) =
                netlist.package_pin_attribute(ppin, "pinseq")
            {
                wline(f, &["pinidx", package.refdes.as_str(),
                           pin.number.as_str(), pinseq.as_str()])?;
            }
        }
    }

    for &net in &netlist.nets {
        let n = &netlist[net];
        for &ppin in &n.connections {
            wline(f, &["conn", n.name.as_str(),
                       netlist[netlist[ppin].package].refdes.as_str(),
                       netlist[ppin].number.as_str()])?;
        }
    }

    wline(f, &["end", "netlist"])?;
    Ok(())
}

#[test]
fn test_escape() {
    assert_eq!(escape("plain"), "plain");
    assert_eq!(escape("a b"), "a\\ b");
    assert_eq!(escape("a\\b"), "a\\\\b");
    assert_eq!(escape("a\tb\nc"), "a\\tb\\nc");
}
