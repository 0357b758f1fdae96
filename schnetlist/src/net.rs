//! Global net construction.
//!
//! Local nets are unioned across sheets when they share a candidate
//! name; the namespace policy decides whether a name reaches across
//! sheet boundaries.  Names from `netname=` attributes and names from
//! `net=` attributes live in separate name spaces with separate
//! flattening flags.

use itertools::Itertools;
use crate::disjoint_set::DisjointSet;
use super::*;

impl Netlist {
    /// Union local nets into global nets, select canonical unmangled
    /// names, fabricate names for unnamed nets, and flag single-pin
    /// nets.
    pub(crate) fn postproc_net_instances(&mut self) {
        let num_ln = self.localnet_arena.len();
        let flat_netname = self.config.flat_netname_namespace;
        let flat_netattrib = self.config.flat_netattrib_namespace;

        // merge local nets sharing a candidate name (scoped by
        // namespace unless flattened).  the bool in the key
        // distinguishes netname= names from net= names.
        let mut sets = DisjointSet::with_capacity(num_ln);
        let mut first_seen: HashMap<
            (bool, Namespace, CompactString), usize> = HashMap::new();
        for ln in 0..num_ln {
            let sheet = self.localnet_arena[ln].sheet;
            let sheet_ns = self[sheet].instantiating_component;
            let bnet = self.localnet_arena[ln].blueprint;
            let keys = self[bnet].names_from_netname.iter()
                .map(|n| (false,
                          if flat_netname { None } else { sheet_ns },
                          n.clone()))
                .chain(self[bnet].names_from_net_attribute.iter()
                       .map(|n| (true,
                                 if flat_netattrib { None } else { sheet_ns },
                                 n.clone())))
                .collect::<Vec<_>>();
            for key in keys {
                match first_seen.get(&key) {
                    Some(&other) => sets.merge(ln, other),
                    None => { first_seen.insert(key, ln); }
                }
            }
        }

        let (num_sets, set_indices) = sets.finalize(num_ln);

        // create one net per set, in order of first encounter
        let mut set2net: Vec<Option<NetId>> = vec![None; num_sets];
        for ln in 0..num_ln {
            let net = *set2net[set_indices[ln]].get_or_insert_with(|| {
                let id = NetId(self.net_arena.len());
                self.net_arena.push(Net {
                    local_nets: Vec::new(),
                    component_pins: Vec::new(),
                    names_from_netname: Vec::new(),
                    names_from_net_attribute: Vec::new(),
                    namespace: None,
                    unmangled_name: CompactString::default(),
                    name: CompactString::default(),
                    unnamed_counter: None,
                    is_bus: false,
                    is_unconnected_pin: false,
                    connections: Vec::new(),
                    sheets_and_bnets: Vec::new(),
                });
                self.nets.push(id);
                id
            });
            let sheet = self.localnet_arena[ln].sheet;
            let sheet_ns = self[sheet].instantiating_component;
            let bnet = self.localnet_arena[ln].blueprint;
            let netname_names: Vec<_> = self[bnet].names_from_netname
                .iter().cloned().collect();
            let netattrib_names: Vec<_> = self[bnet]
                .names_from_net_attribute.iter().cloned().collect();
            let is_bus = self[bnet].is_bus;

            let net_mut = &mut self.net_arena[net.0];
            if net_mut.local_nets.is_empty() {
                // the first local net decides the default namespace
                net_mut.namespace =
                    if flat_netname { None } else { sheet_ns };
            }
            net_mut.local_nets.push(LocalNetId(ln));
            net_mut.is_bus |= is_bus;
            let ns = if flat_netname { None } else { sheet_ns };
            net_mut.names_from_netname.extend(
                netname_names.into_iter().map(|n| (ns, n)));
            let ns = if flat_netattrib { None } else { sheet_ns };
            net_mut.names_from_net_attribute.extend(
                netattrib_names.into_iter().map(|n| (ns, n)));
            self.localnet_arena[ln].net = Some(net);
        }

        // canonical name selection
        let mut unnamed_counters: HashMap<(Namespace, bool), u32> =
            HashMap::new();
        for net in self.nets.clone() {
            self.select_net_name(net, &mut unnamed_counters);
        }
    }

    fn select_net_name(
        &mut self, net: NetId,
        unnamed_counters: &mut HashMap<(Namespace, bool), u32>
    ) {
        let n = &self[net];
        let primary;
        let secondary;
        if self.config.prefer_netname_attribute {
            primary = &n.names_from_netname;
            secondary = &n.names_from_net_attribute;
        } else {
            primary = &n.names_from_net_attribute;
            secondary = &n.names_from_netname;
        }
        let chosen = primary.first().or_else(|| secondary.first());

        match chosen {
            Some((ns, name)) => {
                let (ns, name) = (*ns, name.clone());
                let others: Vec<CompactString> = n.names_from_netname
                    .iter()
                    .chain(n.names_from_net_attribute.iter())
                    .map(|(_, other)| other)
                    .filter(|other| **other != name)
                    .unique()
                    .cloned()
                    .collect();
                self.net_arena[net.0].unmangled_name = name.clone();
                self.net_arena[net.0].namespace = ns;
                if !others.is_empty() {
                    self.warn_at(Subject::Netlist, format!(
                        "net `{}' has more than one name: {}",
                        name,
                        others.iter().map(|o| format!("`{}'", o))
                            .format(" vs. ")));
                }
            }
            None => {
                let ns = n.namespace;
                let is_bus = n.is_bus;
                let counter = unnamed_counters.entry((ns, is_bus))
                    .or_insert(0);
                *counter += 1;
                let counter = *counter;
                let template = match is_bus {
                    false => self.config.default_net_name.clone(),
                    true => self.config.default_bus_name.clone(),
                };
                self.net_arena[net.0].unmangled_name =
                    format!("{}_{}", template, counter).into();
                self.net_arena[net.0].unnamed_counter = Some(counter);

                // a lone pin without a name is not a real net unless
                // hierarchy splicing later proves otherwise
                let num_pins: usize = self[net].local_nets.iter()
                    .map(|&ln| self[ln].cpins.len())
                    .sum();
                if num_pins == 1 {
                    self.net_arena[net.0].is_unconnected_pin = true;
                }
            }
        }
    }

    /// Mangle the final net names.
    pub(crate) fn assign_net_names(&mut self) {
        for net in self.nets.clone() {
            let unmangled = self[net].unmangled_name.clone();
            let namespace = self[net].namespace;
            let name = self.mangle_netname(&unmangled, namespace);
            self.net_arena[net.0].name = name;
        }
    }

    /// Populate `component_pins`, ordered by (sheet, blueprint net)
    /// first encounter and blueprint pin order within each.
    pub(crate) fn assign_component_pins(&mut self) {
        for comp in self.components.clone() {
            let sheet = self[comp].sheet;
            for cpin in self[comp].cpins.clone() {
                let bnet = self[self[cpin].blueprint].bnet;
                let net = self.localnet_arena[self[cpin].local_net.0]
                    .net.expect("local net without a global net");
                if !self[net].sheets_and_bnets.contains(&(sheet, bnet)) {
                    self.net_arena[net.0].sheets_and_bnets
                        .push((sheet, bnet));
                }
            }
        }
        for net in self.nets.clone() {
            for (sheet, bnet) in self[net].sheets_and_bnets.clone() {
                for bpid in self[bnet].pins.clone() {
                    let comp = self[sheet]
                        .components_by_blueprint[&self[bpid].component];
                    let cpin = self[comp].cpins_by_blueprint[&bpid];
                    debug_assert!(
                        !self[net].component_pins.contains(&cpin));
                    self.net_arena[net.0].component_pins.push(cpin);
                }
            }
        }
    }

    /// Merge one global net into another, moving its local nets,
    /// pins, and candidate names.  The source net is removed from the
    /// live net list and from the name index.
    pub(crate) fn merge_net_into(&mut self, src: NetId, dest: NetId) {
        if src == dest {
            return
        }
        let src_lns = std::mem::take(&mut self.net_arena[src.0].local_nets);
        for &ln in &src_lns {
            self.localnet_arena[ln.0].net = Some(dest);
        }
        self.net_arena[dest.0].local_nets.extend(src_lns);

        let pins = std::mem::take(
            &mut self.net_arena[src.0].component_pins);
        self.net_arena[dest.0].component_pins.extend(pins);

        let names = std::mem::take(
            &mut self.net_arena[src.0].names_from_netname);
        self.net_arena[dest.0].names_from_netname.extend(names);
        let names = std::mem::take(
            &mut self.net_arena[src.0].names_from_net_attribute);
        self.net_arena[dest.0].names_from_net_attribute.extend(names);

        let pairs = std::mem::take(
            &mut self.net_arena[src.0].sheets_and_bnets);
        for pair in pairs {
            if !self[dest].sheets_and_bnets.contains(&pair) {
                self.net_arena[dest.0].sheets_and_bnets.push(pair);
            }
        }

        // package pins follow their cpins to the surviving net
        let conns = std::mem::take(&mut self.net_arena[src.0].connections);
        for &ppin in &conns {
            self.ppin_arena[ppin.0].net = Some(dest);
        }
        self.net_arena[dest.0].connections.extend(conns);

        if self[dest].component_pins.len() > 1 {
            self.net_arena[dest.0].is_unconnected_pin = false;
        }

        if let Some(pos) = self.nets.iter().position(|&n| n == src) {
            self.nets.remove(pos);
        }
        let src_name = self.net_arena[src.0].name.clone();
        if self.nets_by_name.get(&src_name) == Some(&src) {
            self.nets_by_name.remove(&src_name);
        }
    }

    /// Unconnected single-pin nets are preserved only when they
    /// straddle more than one subsheet I/O boundary; the rest are
    /// pruned from the live list.
    pub(crate) fn prune_unconnected_pins(&mut self) {
        for net in self.nets.clone() {
            if self[net].is_unconnected_pin
                && self[net].connections.len() > 1
            {
                self.net_arena[net.0].is_unconnected_pin = false;
            }
        }
        let arena = &self.net_arena;
        self.nets.retain(|&n| !arena[n.0].is_unconnected_pin);
    }
}
