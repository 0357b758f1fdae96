//! A hierarchical schematic netlist extractor.
//!
//! The extractor loads one or more schematic pages, descends into the
//! sub-schematics referenced by `source=` attributes, resolves every
//! electrical connection across the hierarchy, groups per-sheet
//! component instances into physical packages, and produces a flat,
//! named net/package graph for output backends.
//!
//! The model has three levels:
//! 1. *blueprints* -- the per-file schematic contents, shared between
//!    all instantiations of a page ([Schematic], [BComponent], [BPin],
//!    [BNet]);
//! 2. *instances* -- one [Sheet] per call site of a page, with
//!    [Component] and [CPin] copies of the blueprint objects and
//!    per-sheet [LocalNet] equivalence classes;
//! 3. the flat result -- global [Net]s and [Package]s.
//!
//! All entities live in vectors owned by the [Netlist]; every
//! cross-reference is a typed index.  The public members are all
//! READ-ONLY outside this crate; downstream backends consume the
//! finished netlist through them.

use std::collections::HashMap;
use std::sync::Arc;
use compact_str::CompactString;

pub use schparse::Revision;

mod attrib;
pub use attrib::Attributes;

mod symbols;
pub use symbols::{Symbol, SymbolLibrary, SymbolLookupError};

mod slib;
pub use slib::SourceLibrary;

mod mangle;
pub use mangle::{MangleOrder, mangle};

mod disjoint_set;

mod blueprint;
mod fixups;
mod instance;
mod net;
mod hierarchy;

mod package;
pub use package::{RepackagedPackage, RepackagedPin, repackage};

mod sab;
pub use sab::{SabRegistry, process_sab};

pub mod tedax;

mod builder;
pub use builder::LoadError;

macro_rules! define_ids {
    ($($(#[$doc:meta])* $name:ident),+ $(,)?) => {$(
        $(#[$doc])*
        #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub usize);
    )+}
}

define_ids! {
    /// Index of a [Schematic] blueprint.
    SchematicId,
    /// Index of a blueprint component.
    BCompId,
    /// Index of a blueprint pin.
    BPinId,
    /// Index of a blueprint net (connected segment group).
    BNetId,
    /// Index of a [Sheet] instance.
    SheetId,
    /// Index of a [Component] instance.
    CompId,
    /// Index of a component instance pin.
    CPinId,
    /// Index of a per-sheet local net.
    LocalNetId,
    /// Index of a global net.
    NetId,
    /// Index of a package.
    PackageId,
    /// Index of a package pin.
    PPinId,
}

/// The instantiating-component chain a name is scoped by.
///
/// `None` for top-level sheets and for flattened namespaces; otherwise
/// the component whose `source=` attribute created the sheet.  The
/// full refdes chain is recovered by walking
/// `instantiating_component` links (see [mangle]).
pub type Namespace = Option<CompId>;

/// Options governing extraction, one value per driver-level flag.
#[derive(Debug, Clone)]
pub struct Config {
    /// Whether to descend into sub-schematics.
    pub traverse_hierarchy: bool,
    /// Whether a net segment's `netname=` beats a pin's `net=` when a
    /// net ends up with both.
    pub prefer_netname_attribute: bool,
    /// Use a common package namespace for all subsheets
    /// (refdes mangling disabled).
    pub flat_package_namespace: bool,
    /// Use a common `netname=` namespace for all subsheets.
    pub flat_netname_namespace: bool,
    /// Use a common `net=` namespace for all subsheets.
    pub flat_netattrib_namespace: bool,
    pub refdes_separator: CompactString,
    pub refdes_order: MangleOrder,
    pub netname_separator: CompactString,
    pub netname_order: MangleOrder,
    /// Naming template for unnamed nets.
    pub default_net_name: CompactString,
    /// Naming template for unnamed buses.
    pub default_bus_name: CompactString,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            traverse_hierarchy: true,
            prefer_netname_attribute: false,
            flat_package_namespace: false,
            flat_netname_namespace: false,
            flat_netattrib_namespace: false,
            refdes_separator: "/".into(),
            refdes_order: MangleOrder::Append,
            netname_separator: "/".into(),
            netname_order: MangleOrder::Append,
            default_net_name: "unnamed_net".into(),
            default_bus_name: "unnamed_bus".into(),
        }
    }
}

/// One schematic page blueprint, shared by all its instantiations.
#[derive(Debug, Clone)]
pub struct Schematic {
    /// Canonical file name this page was loaded from.
    pub filename: CompactString,
    /// The parsed file contents (kept for floating attribute lookup).
    pub rev: Revision,
    /// Blueprint components in file order.  SAB `discard` removes
    /// entries.
    pub components: Vec<BCompId>,
    /// Blueprint nets in segment order.  SAB `discard` removes
    /// emptied entries.
    pub nets: Vec<BNetId>,
    /// `portname` -> I/O port components, filled by the hierarchy
    /// blueprint pass.
    pub ports: HashMap<CompactString, Vec<BCompId>>,
}

/// A component on a schematic page.
#[derive(Debug, Clone)]
pub struct BComponent {
    pub schematic: SchematicId,
    /// Symbol basename, e.g. `resistor-1.sym`.
    pub basename: CompactString,
    /// The resolved symbol, if the library lookup succeeded.
    pub symbol: Option<Arc<Symbol>>,
    /// `refdes=` attribute value, if any.
    pub refdes: Option<CompactString>,
    /// Attributes attached to the component instance.
    pub attached: Attributes,
    /// Floating attributes of the symbol (the inherited scope).
    pub inherited: Attributes,
    pub pins: Vec<BPinId>,
    pub pins_by_number: HashMap<CompactString, BPinId>,
    /// Sub-schematics referenced by `source=`, in attribute order.
    pub composite_sources: Vec<SchematicId>,
    pub is_graphical: bool,
    pub has_netname_attrib: bool,
    pub has_portname_attrib: bool,
    /// `param=name=value` attributes, attached overriding inherited.
    pub parameters: HashMap<CompactString, CompactString>,
}

impl BComponent {
    /// First attached value of the attribute, falling back to the
    /// first inherited one.
    pub fn get_attribute(&self, name: &str) -> Option<&CompactString> {
        self.attached.get_first(name)
            .or_else(|| self.inherited.get_first(name))
    }

    /// All attached values followed by all inherited values.
    pub fn get_attributes<'i>(&'i self, name: &'i str)
                              -> impl Iterator<Item = &'i CompactString> + 'i
    {
        self.attached.get_all(name).chain(self.inherited.get_all(name))
    }
}

/// A pin of a blueprint component.
#[derive(Debug, Clone)]
pub struct BPin {
    pub component: BCompId,
    /// `pinnumber=`, possibly renumbered by the slotting pass.
    pub number: Option<CompactString>,
    /// Attributes attached to the pin in the symbol.
    pub attribs: Attributes,
    /// The blueprint net the pin connects to.  Every pin has one,
    /// even if it is alone on it.
    pub bnet: BNetId,
    /// Created by the `net=` pass rather than by a pin object.
    pub is_virtual: bool,
    /// Named through a `net=` attribute.
    pub has_netattrib: bool,
}

impl BPin {
    #[inline]
    pub fn get_attribute(&self, name: &str) -> Option<&CompactString> {
        self.attribs.get_first(name)
    }
}

/// A blueprint net: the pins connected by one group of touching net
/// segments on a page, plus its candidate names.
#[derive(Debug, Clone)]
pub struct BNet {
    pub schematic: SchematicId,
    pub pins: Vec<BPinId>,
    /// Names from `netname=` attributes attached to member segments,
    /// in file order.
    pub names_from_netname: Vec<CompactString>,
    /// Names from `net=` attributes and new-style power symbols.
    pub names_from_net_attribute: Vec<CompactString>,
    pub is_bus: bool,
}

/// One instantiation of a schematic page.
#[derive(Debug, Clone)]
pub struct Sheet {
    pub blueprint: SchematicId,
    /// The composite component this sheet expands, `None` for
    /// top-level sheets.  This doubles as the sheet's namespace token.
    pub instantiating_component: Option<CompId>,
    /// Live component instances.  Hierarchy splicing and SAB
    /// `discard` remove entries.
    pub components: Vec<CompId>,
    pub components_by_blueprint: HashMap<BCompId, CompId>,
    pub local_nets: Vec<LocalNetId>,
}

/// A component instance on a sheet.
#[derive(Debug, Clone)]
pub struct Component {
    pub sheet: SheetId,
    pub blueprint: BCompId,
    pub cpins: Vec<CPinId>,
    pub cpins_by_number: HashMap<CompactString, CPinId>,
    pub cpins_by_blueprint: HashMap<BPinId, CPinId>,
    /// Child sheets if the blueprint is composite.
    pub subsheets: Vec<SheetId>,
    /// Final mangled refdes; `None` until assignment, or for
    /// components without a `refdes=`.
    pub refdes: Option<CompactString>,
}

/// A pin of a component instance.
#[derive(Debug, Clone)]
pub struct CPin {
    pub component: CompId,
    pub blueprint: BPinId,
    pub local_net: LocalNetId,
}

/// Per-sheet equivalence class of pins.
#[derive(Debug, Clone)]
pub struct LocalNet {
    pub sheet: SheetId,
    pub blueprint: BNetId,
    pub cpins: Vec<CPinId>,
    /// The global net, assigned during net construction.
    pub net: Option<NetId>,
}

/// A global equivalence class of pins across the whole design.
#[derive(Debug, Clone)]
pub struct Net {
    pub local_nets: Vec<LocalNetId>,
    /// Connected instance pins, in blueprint file order.
    pub component_pins: Vec<CPinId>,
    /// All `netname=` candidates with their namespaces, encounter
    /// order, duplicates allowed.
    pub names_from_netname: Vec<(Namespace, CompactString)>,
    /// All `net=` candidates likewise.
    pub names_from_net_attribute: Vec<(Namespace, CompactString)>,
    /// Namespace the final name is scoped by.
    pub namespace: Namespace,
    /// Canonical name before mangling.
    pub unmangled_name: CompactString,
    /// Final mangled name.
    pub name: CompactString,
    /// Which unnamed-net counter produced the name, if any.
    pub unnamed_counter: Option<u32>,
    pub is_bus: bool,
    /// Exactly one pin and no name; pruned unless it straddles
    /// multiple subsheet I/O boundaries.
    pub is_unconnected_pin: bool,
    /// Package pins connected to this net, filled by packaging.
    pub connections: Vec<PPinId>,
    /// (sheet, blueprint net) pairs this net covers, used to order
    /// `component_pins` deterministically.
    pub sheets_and_bnets: Vec<(SheetId, BNetId)>,
}

/// All component instances sharing a refdes within a namespace.
#[derive(Debug, Clone)]
pub struct Package {
    pub namespace: Namespace,
    pub unmangled_refdes: CompactString,
    /// Final mangled refdes.
    pub refdes: CompactString,
    pub components: Vec<CompId>,
    pub pins: Vec<PPinId>,
    pub pins_by_number: HashMap<CompactString, PPinId>,
}

/// One pin number of a package, aggregating the instance pins of all
/// slots sharing that number.
#[derive(Debug, Clone)]
pub struct PackagePin {
    pub package: PackageId,
    pub number: CompactString,
    pub cpins: Vec<CPinId>,
    /// The single net all aggregated pins resolve to.
    pub net: Option<NetId>,
}

/// The netlist storage.
///
/// The public members are all READ-ONLY outside.  The `*_arena`
/// vectors hold every entity ever created (spliced and discarded ones
/// included); the id lists (`components`, `nets`, `packages`, ...)
/// define live membership and order.
#[readonly::make]
#[derive(Debug, Clone, Default)]
pub struct Netlist {
    /// Schematic blueprints in load order.
    pub schematics: Vec<Schematic>,
    /// File name to schematic index.  An entry with value `None` is
    /// the sentinel for a load in progress (cycle detection).
    pub schematics_by_filename: HashMap<CompactString, Option<SchematicId>>,

    pub bcomp_arena: Vec<BComponent>,
    pub bpin_arena: Vec<BPin>,
    pub bnet_arena: Vec<BNet>,

    /// Sheet instances; index 0.. in creation (traversal) order.
    pub sheets: Vec<Sheet>,
    /// Sheets for the schematics named on the command line.
    pub toplevel_sheets: Vec<SheetId>,

    pub comp_arena: Vec<Component>,
    pub cpin_arena: Vec<CPin>,
    pub localnet_arena: Vec<LocalNet>,
    pub net_arena: Vec<Net>,
    pub package_arena: Vec<Package>,
    pub ppin_arena: Vec<PackagePin>,

    /// Live component instances, hierarchy order.
    pub components: Vec<CompId>,
    /// Live nets (unconnected-pin nets pruned).
    pub nets: Vec<NetId>,
    /// Live packages, deduplicated by refdes.
    pub packages: Vec<PackageId>,

    pub packages_by_refdes: HashMap<CompactString, PackageId>,
    pub nets_by_name: HashMap<CompactString, NetId>,

    /// Whether an error has occurred.
    pub failed: bool,

    pub(crate) config: Config,
}

macro_rules! impl_index {
    ($($id:ty => $arena:ident : $entity:ty),+ $(,)?) => {$(
        impl std::ops::Index<$id> for Netlist {
            type Output = $entity;
            #[inline]
            fn index(&self, id: $id) -> &$entity { &self.$arena[id.0] }
        }
    )+}
}

impl_index! {
    SchematicId => schematics: Schematic,
    BCompId => bcomp_arena: BComponent,
    BPinId => bpin_arena: BPin,
    BNetId => bnet_arena: BNet,
    SheetId => sheets: Sheet,
    CompId => comp_arena: Component,
    CPinId => cpin_arena: CPin,
    LocalNetId => localnet_arena: LocalNet,
    NetId => net_arena: Net,
    PackageId => package_arena: Package,
    PPinId => ppin_arena: PackagePin,
}

/// What a diagnostic is about.  Used to prefix messages with the
/// offending entity.
#[derive(Debug, Copy, Clone)]
pub(crate) enum Subject {
    Netlist,
    Schematic(SchematicId),
    BComp(BCompId),
    BPin(BPinId),
    Comp(CompId),
    CPin(CPinId),
    PPin(PPinId),
}

impl Netlist {
    pub(crate) fn subject_string(&self, subject: Subject) -> String {
        match subject {
            Subject::Netlist => String::new(),
            Subject::Schematic(id) =>
                format!("page `{}'", self[id].filename),
            Subject::BComp(id) => {
                let c = &self[id];
                format!("component `{}' on page `{}'",
                        c.refdes.as_deref().unwrap_or(&c.basename),
                        self[c.schematic].filename)
            }
            Subject::BPin(id) => {
                let p = &self[id];
                format!("pin `{}' of {}",
                        p.number.as_deref().unwrap_or("?"),
                        self.subject_string(Subject::BComp(p.component)))
            }
            Subject::Comp(id) => {
                let c = &self[id];
                match &c.refdes {
                    Some(refdes) => format!("component `{}'", refdes),
                    None => self.subject_string(Subject::BComp(c.blueprint)),
                }
            }
            Subject::CPin(id) => {
                let p = &self[id];
                format!("pin `{}' of {}",
                        self[p.blueprint].number.as_deref().unwrap_or("?"),
                        self.subject_string(Subject::Comp(p.component)))
            }
            Subject::PPin(id) => {
                let p = &self[id];
                format!("package `{}', pin `{}'",
                        self[p.package].refdes, p.number)
            }
        }
    }

    /// Print an error message for an entity and mark the netlist as
    /// failed.  Extraction continues; the driver checks `failed` at
    /// phase boundaries.
    pub(crate) fn error_at(&mut self, subject: Subject, msg: impl AsRef<str>) {
        let prefix = self.subject_string(subject);
        if prefix.is_empty() {
            clilog::error!("{}", msg.as_ref());
        } else {
            clilog::error!("{}: {}", prefix, msg.as_ref());
        }
        self.failed = true;
    }

    /// Print a warning message for an entity.
    pub(crate) fn warn_at(&self, subject: Subject, msg: impl AsRef<str>) {
        let prefix = self.subject_string(subject);
        if prefix.is_empty() {
            clilog::warn!("{}", msg.as_ref());
        } else {
            clilog::warn!("{}: {}", prefix, msg.as_ref());
        }
    }

    /// Return the value of a toplevel attribute.
    ///
    /// Searches the floating attributes with the name `name` in the
    /// schematic files of the top-level sheets.  Reports an error (and
    /// returns the first value) if multiple attributes with different
    /// values are found.
    pub fn get_toplevel_attribute(&mut self, name: &str)
                                  -> Option<CompactString> {
        use itertools::Itertools;
        let mut values: Vec<CompactString> = Vec::new();
        for &sheet in &self.toplevel_sheets {
            let schematic = &self[self[sheet].blueprint];
            values.extend(schematic.rev.floating_values(name));
        }
        if values.is_empty() {
            return None
        }
        if values[1..].iter().any(|v| *v != values[0]) {
            self.error_at(Subject::Netlist, format!(
                "inconsistent values for toplevel attribute \"{}\": {}",
                name,
                values.iter().map(|v| format!("\"{}\"", v))
                    .format(" vs. ")));
        }
        Some(values.swap_remove(0))
    }
}
