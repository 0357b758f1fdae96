//! Hierarchical name construction.
//!
//! A name is scoped by the chain of instantiating-component refdes
//! values leading to its sheet.  Mangling joins that chain with a
//! configurable separator and attaches it before or after the base
//! name.  The same function serves refdes and net names; only the
//! separators differ.

use itertools::Itertools;
use super::*;

/// Whether the hierarchy tag goes after or before the base name (and,
/// for the chain itself, whether it is joined top-down or bottom-up).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum MangleOrder {
    Append,
    Prepend,
}

impl std::str::FromStr for MangleOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<MangleOrder, String> {
        match s {
            "append" => Ok(MangleOrder::Append),
            "prepend" => Ok(MangleOrder::Prepend),
            other => Err(format!(
                "`{}' is not a valid mangling order \
                 (allowed values: append prepend)", other)),
        }
    }
}

/// Construct a hierarchical name.
///
/// With `namespace = None` the output is `basename`.  Otherwise the
/// chain of instantiating-component refdes values is joined with
/// `chain_separator` (top-down, or bottom-up if `chain_order` is
/// prepend) and attached to `basename` with `attach_separator`,
/// after or before it per `attach_order`.
pub fn mangle(
    netlist: &Netlist, basename: &str, namespace: Namespace,
    chain_separator: &str, chain_order: MangleOrder,
    attach_separator: &str, attach_order: MangleOrder,
) -> CompactString {
    let mut tag: Vec<&str> = Vec::new();
    let mut cur = namespace;
    while let Some(comp) = cur {
        let blueprint = &netlist[netlist[comp].blueprint];
        tag.insert(0, blueprint.refdes.as_deref().unwrap_or("?"));
        cur = netlist[netlist[comp].sheet].instantiating_component;
    }
    if tag.is_empty() {
        return basename.into()
    }

    if chain_order == MangleOrder::Prepend {
        tag.reverse();
    }
    let tag = format!("{}", tag.iter().format(chain_separator));

    match attach_order {
        MangleOrder::Append =>
            format!("{}{}{}", tag, attach_separator, basename).into(),
        MangleOrder::Prepend =>
            format!("{}{}{}", basename, attach_separator, tag).into(),
    }
}

impl Netlist {
    /// Mangle a refdes with the configured refdes separator/order.
    pub fn mangle_refdes(&self, basename: &str, namespace: Namespace)
                         -> CompactString {
        mangle(self, basename, namespace,
               &self.config.refdes_separator, self.config.refdes_order,
               &self.config.refdes_separator, self.config.refdes_order)
    }

    /// Mangle a net name: the chain uses the refdes separator, the
    /// attachment uses the netname separator.
    pub fn mangle_netname(&self, basename: &str, namespace: Namespace)
                          -> CompactString {
        mangle(self, basename, namespace,
               &self.config.refdes_separator, self.config.refdes_order,
               &self.config.netname_separator, self.config.netname_order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attrib::Attributes;

    /// a minimal netlist with a two-deep instantiation chain:
    /// U1 on the top sheet instantiates a sheet holding U2, which
    /// instantiates the innermost sheet.
    fn chain_fixture() -> (Netlist, Namespace) {
        let mut nl = Netlist::default();
        for (i, refdes) in ["U1", "U2"].iter().enumerate() {
            nl.schematics.push(Schematic {
                filename: format!("sheet{}.sch", i).into(),
                rev: Revision {
                    version: 0, fileformat: 2, objects: Vec::new()
                },
                components: vec![BCompId(i)],
                nets: Vec::new(),
                ports: HashMap::new(),
            });
            nl.bcomp_arena.push(BComponent {
                schematic: SchematicId(i),
                basename: "block.sym".into(),
                symbol: None,
                refdes: Some((*refdes).into()),
                attached: Attributes::new(),
                inherited: Attributes::new(),
                pins: Vec::new(),
                pins_by_number: HashMap::new(),
                composite_sources: Vec::new(),
                is_graphical: false,
                has_netname_attrib: false,
                has_portname_attrib: false,
                parameters: HashMap::new(),
            });
            nl.sheets.push(Sheet {
                blueprint: SchematicId(i),
                instantiating_component:
                    if i == 0 { None } else { Some(CompId(i - 1)) },
                components: vec![CompId(i)],
                components_by_blueprint: HashMap::new(),
                local_nets: Vec::new(),
            });
            nl.comp_arena.push(Component {
                sheet: SheetId(i),
                blueprint: BCompId(i),
                cpins: Vec::new(),
                cpins_by_number: HashMap::new(),
                cpins_by_blueprint: HashMap::new(),
                subsheets: Vec::new(),
                refdes: None,
            });
        }
        (nl, Some(CompId(1)))
    }

    #[test]
    fn test_mangle_orders() {
        use MangleOrder::*;
        let (nl, ns) = chain_fixture();
        assert_eq!(mangle(&nl, "R1", ns, "/", Append, "/", Append),
                   "U1/U2/R1");
        assert_eq!(mangle(&nl, "R1", ns, "/", Prepend, "/", Append),
                   "U2/U1/R1");
        assert_eq!(mangle(&nl, "R1", ns, ".", Append, ":", Prepend),
                   "R1:U1.U2");
        assert_eq!(mangle(&nl, "R1", None, "/", Append, "/", Append),
                   "R1");
    }

    #[test]
    fn test_mangle_is_pure() {
        use MangleOrder::*;
        let (nl, ns) = chain_fixture();
        let a = mangle(&nl, "VCC", ns, "/", Append, "/", Append);
        let b = mangle(&nl, "VCC", ns, "/", Append, "/", Append);
        assert_eq!(a, b);
    }
}
