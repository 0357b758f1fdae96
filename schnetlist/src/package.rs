//! Package grouping: component instances sharing a refdes within a
//! namespace become one physical package with a merged pin table.

use itertools::Itertools;
use super::*;

impl Netlist {
    /// Group the surviving component instances into packages and
    /// resolve every package pin to its single net.
    pub(crate) fn postproc_package_instances(&mut self) {
        let flat = self.config.flat_package_namespace;
        let mut pkg_by_key: HashMap<(Namespace, CompactString), PackageId> =
            HashMap::new();

        for comp in self.components.clone() {
            let refdes = match self[self[comp].blueprint].refdes.clone() {
                Some(refdes) => refdes,
                // power symbols and the like have no refdes and are
                // not packaged
                None => continue
            };
            let namespace = if flat {
                None
            } else {
                self[self[comp].sheet].instantiating_component
            };

            let pkg = *pkg_by_key.entry((namespace, refdes.clone()))
                .or_insert_with(|| {
                    let id = PackageId(self.package_arena.len());
                    self.package_arena.push(Package {
                        namespace,
                        unmangled_refdes: refdes.clone(),
                        refdes: CompactString::default(),
                        components: Vec::new(),
                        pins: Vec::new(),
                        pins_by_number: HashMap::new(),
                    });
                    self.packages.push(id);
                    id
                });
            self.package_arena[pkg.0].components.push(comp);

            for cpin in self[comp].cpins.clone() {
                let number = match self[self[cpin].blueprint]
                    .number.clone()
                {
                    Some(number) => number,
                    None => continue
                };
                let ppin = match self.package_arena[pkg.0]
                    .pins_by_number.get(&number).copied()
                {
                    Some(ppin) => ppin,
                    None => {
                        let id = PPinId(self.ppin_arena.len());
                        self.ppin_arena.push(PackagePin {
                            package: pkg,
                            number: number.clone(),
                            cpins: Vec::new(),
                            net: None,
                        });
                        self.package_arena[pkg.0].pins.push(id);
                        self.package_arena[pkg.0].pins_by_number
                            .insert(number, id);
                        id
                    }
                };
                self.ppin_arena[ppin.0].cpins.push(cpin);
            }
        }

        // each package pin must resolve to exactly one net across all
        // slots
        for pkg in self.packages.clone() {
            for ppin in self.package_arena[pkg.0].pins.clone() {
                let mut nets: Vec<NetId> = Vec::new();
                for cpin in self.ppin_arena[ppin.0].cpins.clone() {
                    let net = self.localnet_arena
                        [self[cpin].local_net.0].net
                        .expect("packaged pin without a net");
                    if !nets.contains(&net) {
                        nets.push(net);
                    }
                }
                debug_assert!(!nets.is_empty());
                if nets.len() > 1 {
                    let msg = format!(
                        "multiple nets connected to pin: {}",
                        nets.iter()
                            .map(|&n| format!("\"{}\"", self[n].name))
                            .format(" vs. "));
                    self.error_at(Subject::PPin(ppin), msg);
                }
                let net = nets[0];
                self.ppin_arena[ppin.0].net = Some(net);
                self.net_arena[net.0].connections.push(ppin);
            }
        }
    }

    /// Mangle component and package refdes values.
    pub(crate) fn assign_refdes(&mut self) {
        let flat = self.config.flat_package_namespace;
        for comp in self.components.clone() {
            let refdes = match self[self[comp].blueprint].refdes.clone() {
                Some(refdes) => refdes,
                None => continue
            };
            let namespace = if flat {
                None
            } else {
                self[self[comp].sheet].instantiating_component
            };
            let mangled = self.mangle_refdes(&refdes, namespace);
            self.comp_arena[comp.0].refdes = Some(mangled);
        }
        for pkg in self.packages.clone() {
            let namespace = self[pkg].namespace;
            let unmangled = self[pkg].unmangled_refdes.clone();
            self.package_arena[pkg.0].refdes = match namespace {
                Some(_) => self.mangle_refdes(&unmangled, namespace),
                // with a flat namespace the unmangled refdes is final
                None => unmangled,
            };
        }
    }

    /// Compile the refdes and net name indexes, reporting cross-page
    /// name clashes.
    pub(crate) fn compile_indexes(&mut self) {
        self.packages_by_refdes = HashMap::new();
        for pkg in self.packages.clone() {
            let refdes = self[pkg].refdes.clone();
            if let Some(&other) = self.packages_by_refdes.get(&refdes) {
                let msg = format!(
                    "refdes conflict across hierarchy: refdes `{}' is \
                     used by package `{}' on page `{}' and by package \
                     `{}' on page `{}'",
                    refdes,
                    self[other].unmangled_refdes,
                    self.mangle_refdes("", self[other].namespace),
                    self[pkg].unmangled_refdes,
                    self.mangle_refdes("", self[pkg].namespace));
                self.error_at(Subject::Netlist, msg);
            }
            self.packages_by_refdes.insert(refdes, pkg);
        }

        self.nets_by_name = HashMap::new();
        for net in self.nets.clone() {
            let name = self[net].name.clone();
            if let Some(&other) = self.nets_by_name.get(&name) {
                let msg = format!(
                    "net name conflict across hierarchy: net name `{}' \
                     is used by net `{}' on page `{}' and by net `{}' \
                     on page `{}'",
                    name,
                    self[other].unmangled_name,
                    self.mangle_netname("", self[other].namespace),
                    self[net].unmangled_name,
                    self.mangle_netname("", self[net].namespace));
                self.error_at(Subject::Netlist, msg);
            }
            self.nets_by_name.insert(name, net);
        }
    }

    /// First consistent value of an attribute across the package's
    /// component instances.
    pub fn package_attribute(&self, pkg: PackageId, name: &str)
                             -> Option<&CompactString> {
        let values: Vec<&CompactString> = self[pkg].components.iter()
            .filter_map(|&comp| {
                self[self[comp].blueprint].get_attribute(name)
            })
            .collect();
        if values.iter().any(|v| **v != *values[0]) {
            clilog::warn!(
                "package `{}': inconsistent values for attribute \
                 \"{}\": {}",
                self[pkg].refdes, name,
                values.iter().map(|v| format!("\"{}\"", v))
                    .unique().format(" vs. "));
        }
        values.first().copied()
    }

    /// First value of a pin attribute across the aggregated instance
    /// pins.
    pub fn package_pin_attribute(&self, ppin: PPinId, name: &str)
                                 -> Option<&CompactString> {
        self[ppin].cpins.iter()
            .filter_map(|&cpin| {
                self[self[cpin].blueprint].get_attribute(name)
            })
            .next()
    }
}

/// A pin of a re-packaged package, owned by the caller.
#[derive(Debug, Clone)]
pub struct RepackagedPin {
    pub number: CompactString,
    pub cpins: Vec<CPinId>,
    pub net: Option<NetId>,
}

/// A package produced by [repackage]; aliases the netlist's component
/// instances but owns its pin table.
#[derive(Debug, Clone)]
pub struct RepackagedPackage {
    pub namespace: Namespace,
    pub unmangled_refdes: CompactString,
    pub refdes: CompactString,
    pub components: Vec<CompId>,
    pub pins: Vec<RepackagedPin>,
}

/// Re-group components into packages using a custom refdes function.
///
/// This allows a backend to repeat the grouping stage with its own
/// notion of a refdes.  It does not change the netlist but returns a
/// list of alternative package objects which can be used instead of
/// `netlist.packages`.  A `None` from `refdes_func` drops the
/// component from packaging.
pub fn repackage(
    netlist: &Netlist,
    refdes_func: impl Fn(&Netlist, CompId) -> Option<CompactString>,
) -> Vec<RepackagedPackage> {
    let mut new_packages: Vec<RepackagedPackage> = Vec::new();
    let mut pkg_dict: HashMap<(Namespace, CompactString), usize> =
        HashMap::new();
    let mut pin_dict: HashMap<(usize, CompactString), usize> =
        HashMap::new();

    for &comp in &netlist.components {
        let new_refdes = match refdes_func(netlist, comp) {
            Some(refdes) => refdes,
            None => {
                let blueprint = netlist[comp].blueprint;
                if netlist.blueprint_requires_refdes(blueprint) {
                    clilog::warn!(
                        "(re-packaged) {}: component dropped during \
                         re-packaging",
                        netlist.subject_string(Subject::Comp(comp)));
                }
                continue
            }
        };

        let namespace = if netlist.config.flat_package_namespace {
            None
        } else {
            netlist[netlist[comp].sheet].instantiating_component
        };

        let idx = *pkg_dict.entry((namespace, new_refdes.clone()))
            .or_insert_with(|| {
                new_packages.push(RepackagedPackage {
                    namespace,
                    unmangled_refdes: new_refdes.clone(),
                    refdes: CompactString::default(),
                    components: Vec::new(),
                    pins: Vec::new(),
                });
                new_packages.len() - 1
            });
        new_packages[idx].components.push(comp);

        for &cpin in &netlist[comp].cpins {
            let number = match &netlist[netlist[cpin].blueprint].number {
                Some(number) => number.clone(),
                None => continue
            };
            let pin_idx = *pin_dict.entry((idx, number.clone()))
                .or_insert_with(|| {
                    new_packages[idx].pins.push(RepackagedPin {
                        number,
                        cpins: Vec::new(),
                        net: None,
                    });
                    new_packages[idx].pins.len() - 1
                });
            new_packages[idx].pins[pin_idx].cpins.push(cpin);
        }
    }

    for package in &mut new_packages {
        for pin in &mut package.pins {
            let mut nets: Vec<NetId> = Vec::new();
            for &cpin in &pin.cpins {
                let net = netlist.localnet_arena
                    [netlist[cpin].local_net.0].net
                    .expect("packaged pin without a net");
                if !nets.contains(&net) {
                    nets.push(net);
                }
            }
            if nets.len() > 1 {
                clilog::error!(
                    "(re-packaged) package `{}', pin `{}': multiple \
                     nets connected to pin after re-packaging: {}",
                    package.unmangled_refdes, pin.number,
                    nets.iter()
                        .map(|&n| format!("\"{}\"", netlist[n].name))
                        .format(" vs. "));
            }
            pin.net = nets.first().copied();
        }
    }

    for package in &mut new_packages {
        package.refdes = match package.namespace {
            Some(_) => netlist.mangle_refdes(
                &package.unmangled_refdes, package.namespace),
            None => package.unmangled_refdes.clone(),
        };
    }

    // check for cross-page name clashes without building an index
    let mut seen: HashMap<CompactString, usize> = HashMap::new();
    for (i, package) in new_packages.iter().enumerate() {
        if let Some(&other) = seen.get(&package.refdes) {
            clilog::error!(
                "(re-packaged) refdes conflict across hierarchy after \
                 re-packaging: refdes `{}' is used by package `{}' on \
                 page `{}' and by package `{}' on page `{}'",
                package.refdes,
                new_packages[other].unmangled_refdes,
                netlist.mangle_refdes("", new_packages[other].namespace),
                package.unmangled_refdes,
                netlist.mangle_refdes("", package.namespace));
        } else {
            seen.insert(package.refdes.clone(), i);
        }
    }

    new_packages
}
