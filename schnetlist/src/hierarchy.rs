//! Hierarchy splicing: connect subsheet I/O ports to the
//! instantiating component's pins, then remove both the composite
//! components and the matched port components.

use std::collections::HashSet;
use super::*;

impl Netlist {
    pub(crate) fn postproc_hierarchy_instances(&mut self) {
        let mut removed: HashSet<CompId> = HashSet::new();

        for comp in self.components.clone() {
            if self[self[comp].blueprint].composite_sources.is_empty() {
                continue
            }

            // collect potential old-style ports, keyed by refdes
            let mut refdes_dict: HashMap<CompactString, Vec<CompId>> =
                HashMap::new();
            for subsheet in self[comp].subsheets.clone() {
                for pc in self[subsheet].components.clone() {
                    if let Some(refdes) =
                        self[self[pc].blueprint].refdes.clone()
                    {
                        refdes_dict.entry(refdes).or_default().push(pc);
                    }
                }
            }

            let mut processed_labels: HashSet<CompactString> =
                HashSet::new();
            for cpin in self[comp].cpins.clone() {
                let ln = self[cpin].local_net;
                let dest_net = self.localnet_arena[ln.0].net
                    .expect("composite pin without a net");
                self.localnet_arena[ln.0].cpins
                    .retain(|&c| c != cpin);
                self.net_arena[dest_net.0].component_pins
                    .retain(|&c| c != cpin);

                let label = match self[self[cpin].blueprint]
                    .get_attribute("pinlabel").cloned()
                {
                    Some(label) => label,
                    None => {
                        self.error_at(Subject::CPin(cpin),
                                      "pin on composite component is \
                                       missing a label");
                        continue
                    }
                };
                if !processed_labels.insert(label.clone()) {
                    self.error_at(Subject::CPin(cpin), format!(
                        "duplicate pin for port `{}' on composite \
                         component", label));
                    continue
                }

                // search for the matching ports
                let mut ports: Vec<CompId> = Vec::new();
                for subsheet in self[comp].subsheets.clone() {
                    let blueprint = self[subsheet].blueprint;
                    let port_bcomps = self[blueprint].ports
                        .get(&label).cloned().unwrap_or_default();
                    for bcid in port_bcomps {
                        if let Some(&port) = self[subsheet]
                            .components_by_blueprint.get(&bcid)
                        {
                            ports.push(port);
                        }
                    }
                }

                for port in refdes_dict.get(&label)
                    .cloned().unwrap_or_default()
                {
                    // found an old-style port
                    let bp = self[port].blueprint;
                    if self[bp].has_netname_attrib {
                        self.error_at(Subject::Comp(port),
                                      "netname= attribute can't be \
                                       used on an I/O symbol");
                    }
                    if self[bp].get_attributes("net").next().is_some() {
                        self.error_at(Subject::Comp(port),
                                      "net= attribute can't be used \
                                       on an I/O symbol");
                    }
                    if !self[bp].composite_sources.is_empty() {
                        self.error_at(Subject::Comp(port),
                                      "I/O symbol can't be a \
                                       subschematic");
                    }
                    if self[bp].is_graphical {
                        self.error_at(Subject::Comp(port),
                                      "I/O symbol can't be graphical");
                    }

                    if self[port].cpins.is_empty() {
                        self.error_at(Subject::Comp(port),
                                      "I/O symbol doesn't have pins");
                        continue
                    }
                    if self[port].cpins.len() > 1 {
                        self.error_at(Subject::Comp(port),
                                      "multiple pins on I/O symbol");
                        continue
                    }
                    ports.push(port);
                }

                if ports.is_empty() {
                    self.warn_at(Subject::CPin(cpin), format!(
                        "missing I/O symbol for port `{}' inside \
                         schematic", label));
                } else if ports.len() > 1 {
                    self.warn_at(Subject::CPin(cpin), format!(
                        "multiple I/O symbols for port `{}' inside \
                         schematic", label));
                }

                for port in ports {
                    let port_cpin = self[port].cpins[0];
                    let src_net = self.localnet_arena
                        [self[port_cpin].local_net.0].net
                        .expect("port pin without a net");

                    if src_net != dest_net {
                        self.merge_net_into(src_net, dest_net);
                    }

                    // remove the port component
                    removed.insert(port);
                    let sheet = self[port].sheet;
                    self.sheets[sheet.0].components
                        .retain(|&c| c != port);
                    let bp = self[port].blueprint;
                    self.sheets[sheet.0].components_by_blueprint
                        .remove(&bp);

                    let port_ln = self[port_cpin].local_net;
                    self.localnet_arena[port_ln.0].cpins
                        .retain(|&c| c != port_cpin);
                    self.net_arena[dest_net.0].component_pins
                        .retain(|&c| c != port_cpin);
                }
            }

            // after all pins have been connected, remove the
            // composite component itself
            removed.insert(comp);
            let sheet = self[comp].sheet;
            self.sheets[sheet.0].components.retain(|&c| c != comp);
            let bp = self[comp].blueprint;
            self.sheets[sheet.0].components_by_blueprint.remove(&bp);
        }

        self.components.retain(|c| !removed.contains(c));

        for comp in self.components.clone() {
            if self[self[comp].blueprint].has_portname_attrib {
                self.error_at(Subject::Comp(comp),
                              "unmatched I/O symbol");
            }
        }
    }

    /// Strip graphical components from electrical consideration: their
    /// pins leave the local nets and the global nets, and the
    /// components leave the flat component list.  They stay on their
    /// sheets for reporting.
    pub(crate) fn postproc_graphical_instances(&mut self) {
        let mut removed: HashSet<CompId> = HashSet::new();
        for comp in self.components.clone() {
            if !self[self[comp].blueprint].is_graphical {
                continue
            }
            for cpin in self[comp].cpins.clone() {
                let ln = self[cpin].local_net;
                self.localnet_arena[ln.0].cpins.retain(|&c| c != cpin);
                if let Some(net) = self.localnet_arena[ln.0].net {
                    self.net_arena[net.0].component_pins
                        .retain(|&c| c != cpin);
                }
            }
            removed.insert(comp);
        }
        self.components.retain(|c| !removed.contains(c));
    }
}
