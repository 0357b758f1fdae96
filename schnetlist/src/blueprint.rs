//! Blueprint construction: from a parsed file to the per-page model.
//!
//! Net segments touching each other are unioned into blueprint nets;
//! component pins are instantiated from the symbol and connect
//! through their active end.  Connectivity is resolved here once per
//! file, independent of how many times the page is instantiated.

use schparse::{ObData, ComponentData};
use crate::attrib::Attributes;
use crate::disjoint_set::DisjointSet;
use super::*;

/// Map a symbol-space point to sheet space: mirror about the y axis,
/// rotate counterclockwise, translate to the insertion point.
fn transform_point(x: i32, y: i32, c: &ComponentData) -> (i32, i32) {
    let (mut px, py) = (x, y);
    if c.mirror != 0 {
        px = -px;
    }
    let (px, py) = match c.angle.rem_euclid(360) {
        90 => (-py, px),
        180 => (-px, -py),
        270 => (py, -px),
        _ => (px, py),
    };
    (px + c.x, py + c.y)
}

/// Whether point `p` lies on the segment `a`-`b` (endpoints included).
fn on_segment(p: (i32, i32), a: (i32, i32), b: (i32, i32)) -> bool {
    let cross = (b.0 - a.0) as i64 * (p.1 - a.1) as i64
        - (b.1 - a.1) as i64 * (p.0 - a.0) as i64;
    cross == 0
        && p.0 >= a.0.min(b.0) && p.0 <= a.0.max(b.0)
        && p.1 >= a.1.min(b.1) && p.1 <= a.1.max(b.1)
}

struct SegNode {
    p1: (i32, i32),
    p2: (i32, i32),
    is_bus: bool,
    names: Vec<CompactString>,
}

struct PinNode {
    bpin: BPinId,
    is_bus: bool,
    point: (i32, i32),
}

impl Netlist {
    /// Build the blueprint for one loaded file.  Connectivity is
    /// resolved and every pin ends up on exactly one blueprint net.
    pub(crate) fn build_schematic(
        &mut self, filename: CompactString, rev: Revision,
        symbols: &SymbolLibrary
    ) -> SchematicId {
        let sid = SchematicId(self.schematics.len());
        self.schematics.push(Schematic {
            filename,
            rev: Revision {
                version: rev.version,
                fileformat: rev.fileformat,
                objects: Vec::new(),
            },
            components: Vec::new(),
            nets: Vec::new(),
            ports: HashMap::new(),
        });

        let mut segs: Vec<SegNode> = Vec::new();
        let mut pin_nodes: Vec<PinNode> = Vec::new();

        for ob in &rev.objects {
            match &ob.data {
                ObData::Net(d) => {
                    segs.push(SegNode {
                        p1: (d.x1, d.y1), p2: (d.x2, d.y2),
                        is_bus: false,
                        names: ob.attached_values("netname").collect(),
                    });
                }
                ObData::Bus(d) => {
                    segs.push(SegNode {
                        p1: (d.x1, d.y1), p2: (d.x2, d.y2),
                        is_bus: true,
                        names: ob.attached_values("netname").collect(),
                    });
                }
                ObData::Component(d) => {
                    let cid = self.build_component(
                        sid, d, ob, symbols, &mut pin_nodes);
                    self.schematics[sid.0].components.push(cid);
                }
                ObData::Pin(_) => {
                    self.warn_at(Subject::Schematic(sid),
                                 "pin object outside of a symbol \
                                  is ignored");
                }
                // graphical and floating text objects carry no
                // connectivity
                _ => {}
            }
        }

        // union touching segments and pin ends into blueprint nets
        let num_nodes = segs.len() + pin_nodes.len();
        let mut conn = DisjointSet::with_capacity(num_nodes);
        for i in 0..segs.len() {
            for j in i + 1..segs.len() {
                let (a, b) = (&segs[i], &segs[j]);
                if a.is_bus != b.is_bus {
                    continue
                }
                if on_segment(a.p1, b.p1, b.p2)
                    || on_segment(a.p2, b.p1, b.p2)
                    || on_segment(b.p1, a.p1, a.p2)
                    || on_segment(b.p2, a.p1, a.p2)
                {
                    conn.merge(i, j);
                }
            }
        }
        for (pi, pin) in pin_nodes.iter().enumerate() {
            for (si, seg) in segs.iter().enumerate() {
                if pin.is_bus == seg.is_bus
                    && on_segment(pin.point, seg.p1, seg.p2)
                {
                    conn.merge(segs.len() + pi, si);
                }
            }
            for (pj, other) in pin_nodes.iter().enumerate().skip(pi + 1) {
                if pin.is_bus == other.is_bus && pin.point == other.point {
                    conn.merge(segs.len() + pi, segs.len() + pj);
                }
            }
        }

        let (num_sets, set_indices) = conn.finalize(num_nodes);
        let mut set2bnet: Vec<Option<BNetId>> = vec![None; num_sets];
        for node in 0..num_nodes {
            let set = set_indices[node];
            let bnet = *set2bnet[set].get_or_insert_with(|| {
                let id = BNetId(self.bnet_arena.len());
                self.bnet_arena.push(BNet {
                    schematic: sid,
                    pins: Vec::new(),
                    names_from_netname: Vec::new(),
                    names_from_net_attribute: Vec::new(),
                    is_bus: false,
                });
                self.schematics[sid.0].nets.push(id);
                id
            });
            if node < segs.len() {
                let seg = &mut segs[node];
                self.bnet_arena[bnet.0].names_from_netname
                    .append(&mut seg.names);
                self.bnet_arena[bnet.0].is_bus |= seg.is_bus;
            } else {
                let pin = &pin_nodes[node - segs.len()];
                self.bnet_arena[bnet.0].pins.push(pin.bpin);
                self.bnet_arena[bnet.0].is_bus |= pin.is_bus;
                self.bpin_arena[pin.bpin.0].bnet = bnet;
            }
        }

        // keep the parsed contents for floating attribute lookup
        self.schematics[sid.0].rev = rev;
        sid
    }

    fn build_component(
        &mut self, sid: SchematicId, data: &ComponentData,
        ob: &schparse::Object, symbols: &SymbolLibrary,
        pin_nodes: &mut Vec<PinNode>
    ) -> BCompId {
        let cid = BCompId(self.bcomp_arena.len());

        let (symbol, lookup_error) = match symbols.lookup(&data.basename) {
            Ok(symbol) => (Some(symbol), None),
            Err(e) => (None, Some(e.to_string())),
        };

        let attached = Attributes::from_attached(ob);
        let inherited = symbol.as_ref()
            .map(|s| s.floating.clone())
            .unwrap_or_default();
        let refdes = attached.get_first("refdes")
            .or_else(|| inherited.get_first("refdes"))
            .cloned();

        self.bcomp_arena.push(BComponent {
            schematic: sid,
            basename: data.basename.clone(),
            symbol: symbol.clone(),
            refdes,
            attached,
            inherited,
            pins: Vec::new(),
            pins_by_number: HashMap::new(),
            composite_sources: Vec::new(),
            is_graphical: false,
            has_netname_attrib: false,
            has_portname_attrib: false,
            parameters: HashMap::new(),
        });

        if let Some(msg) = lookup_error {
            self.error_at(Subject::BComp(cid), msg);
        }
        if data.angle.rem_euclid(90) != 0 {
            self.warn_at(Subject::BComp(cid), format!(
                "invalid rotation angle {}, treating as 0", data.angle));
        }

        let symbol = match symbol {
            Some(s) => s,
            None => return cid
        };
        for pin_ob in &symbol.rev.objects {
            let pin_data = match &pin_ob.data {
                ObData::Pin(d) => d,
                _ => continue
            };
            let attribs = Attributes::from_attached(pin_ob);
            let number = attribs.get_first("pinnumber").cloned();
            let (px, py) = match pin_data.whichend {
                0 => (pin_data.x1, pin_data.y1),
                _ => (pin_data.x2, pin_data.y2),
            };

            let pid = BPinId(self.bpin_arena.len());
            self.bpin_arena.push(BPin {
                component: cid,
                number: number.clone(),
                attribs,
                // reassigned when connectivity is resolved
                bnet: BNetId(usize::MAX),
                is_virtual: false,
                has_netattrib: false,
            });
            self.bcomp_arena[cid.0].pins.push(pid);
            if let Some(number) = number {
                self.bcomp_arena[cid.0].pins_by_number
                    .entry(number).or_insert(pid);
            }
            pin_nodes.push(PinNode {
                bpin: pid,
                is_bus: pin_data.pintype != 0,
                point: transform_point(px, py, data),
            });
        }
        cid
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_on_segment() {
        assert!(on_segment((100, 100), (100, 100), (500, 100)));
        assert!(on_segment((300, 100), (100, 100), (500, 100)));
        assert!(on_segment((500, 100), (100, 100), (500, 100)));
        assert!(!on_segment((300, 101), (100, 100), (500, 100)));
        assert!(!on_segment((600, 100), (100, 100), (500, 100)));
        // diagonal
        assert!(on_segment((200, 200), (100, 100), (300, 300)));
        assert!(!on_segment((200, 201), (100, 100), (300, 300)));
    }

    #[test]
    fn test_transform_point() {
        let place = |x, y, angle, mirror| ComponentData {
            x, y, selectable: 1, angle, mirror,
            basename: "x.sym".into()
        };
        assert_eq!(transform_point(100, 0, &place(1000, 500, 0, 0)),
                   (1100, 500));
        assert_eq!(transform_point(100, 0, &place(1000, 500, 90, 0)),
                   (1000, 600));
        assert_eq!(transform_point(100, 0, &place(1000, 500, 180, 0)),
                   (900, 500));
        assert_eq!(transform_point(100, 0, &place(1000, 500, 270, 0)),
                   (1000, 400));
        assert_eq!(transform_point(100, 0, &place(1000, 500, 0, 1)),
                   (900, 500));
    }
}
