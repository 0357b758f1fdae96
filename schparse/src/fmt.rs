//! Canonical text output for parsed revisions.

use std::fmt;
use super::*;

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "v {} {}", self.version, self.fileformat)?;
        for ob in &self.objects {
            write!(f, "{}", ob)?;
        }
        Ok(())
    }
}

impl fmt::Display for Object {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.data)?;
        if !self.attached.is_empty() {
            writeln!(f, "{{")?;
            for ob in &self.attached {
                write!(f, "{}", ob.data)?;
            }
            writeln!(f, "}}")?;
        }
        Ok(())
    }
}

impl fmt::Display for ObData {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use ObData::*;
        match self {
            Line(d) => writeln!(
                f, "L {} {} {} {} {} {} {} {} {} {}",
                d.x1, d.y1, d.x2, d.y2, d.color,
                d.width, d.capstyle,
                d.dashstyle, d.dashlength, d.dashspace),
            Box_(d) => writeln!(
                f, "B {} {} {} {} {} {} {} {} {} {} {} {} {} {} {} {}",
                d.x, d.y, d.width, d.height, d.color,
                d.linewidth, d.capstyle,
                d.dashstyle, d.dashlength, d.dashspace,
                d.filltype, d.fillwidth,
                d.angle1, d.pitch1, d.angle2, d.pitch2),
            Circle(d) => writeln!(
                f, "V {} {} {} {} {} {} {} {} {} {} {} {} {} {} {}",
                d.x, d.y, d.radius, d.color,
                d.linewidth, d.capstyle,
                d.dashstyle, d.dashlength, d.dashspace,
                d.filltype, d.fillwidth,
                d.angle1, d.pitch1, d.angle2, d.pitch2),
            Arc(d) => writeln!(
                f, "A {} {} {} {} {} {} {} {} {} {} {}",
                d.x, d.y, d.radius,
                d.startangle, d.sweepangle, d.color,
                d.linewidth, d.capstyle,
                d.dashstyle, d.dashlength, d.dashspace),
            Text(d) => {
                writeln!(f, "T {} {} {} {} {} {} {} {} {}",
                         d.x, d.y, d.color, d.size,
                         d.visibility, d.show_name_value,
                         d.angle, d.alignment, d.content.len())?;
                for line in &d.content {
                    writeln!(f, "{}", line)?;
                }
                Ok(())
            }
            Net(d) => writeln!(
                f, "N {} {} {} {} {}",
                d.x1, d.y1, d.x2, d.y2, d.color),
            Bus(d) => writeln!(
                f, "U {} {} {} {} {} {}",
                d.x1, d.y1, d.x2, d.y2, d.color, d.ripperdir),
            Pin(d) => writeln!(
                f, "P {} {} {} {} {} {} {}",
                d.x1, d.y1, d.x2, d.y2, d.color,
                d.pintype, d.whichend),
            Component(d) => writeln!(
                f, "C {} {} {} {} {} {}",
                d.x, d.y, d.selectable, d.angle, d.mirror, d.basename),
            Path(d) => {
                writeln!(f, "H {} {} {} {} {} {} {} {} {} {} {} {} {}",
                         d.color,
                         d.linewidth, d.capstyle,
                         d.dashstyle, d.dashlength, d.dashspace,
                         d.filltype, d.fillwidth,
                         d.angle1, d.pitch1, d.angle2, d.pitch2,
                         d.path.len())?;
                for line in &d.path {
                    writeln!(f, "{}", line)?;
                }
                Ok(())
            }
        }
    }
}

#[test]
fn test_text_roundtrip() {
    let src = "\
v 20201216 2
C 300 500 1 90 0 resistor-1.sym
{
T 350 800 5 10 1 1 0 0 1
refdes=R1
}
N 300 500 900 500 4
U 300 900 900 900 10 0
P 100 0 300 0 1 0 1
L 0 0 100 100 3 10 0 0 -1 -1
H 3 10 0 0 -1 -1 0 -1 -1 -1 -1 -1 2
M 100 100
z
";
    let rev = Revision::parse_str(src).unwrap();
    assert_eq!(format!("{}", rev), src);
}
