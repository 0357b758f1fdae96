//! Schematic assembly block (SAB) processing.
//!
//! An optional end-of-pipeline rewriter keyed on per-component
//! `sab-param` attributes of the form `context[:#order][:action][:params]`.
//! The caller chooses which contexts apply and in which order; within
//! one context, components run by ascending order number, unordered
//! entries last.
//!
//! Actions: `discard` unlinks the component everywhere; `bypass`
//! shorts groups of its pins together (optionally renaming the merged
//! net) and then discards it; `exec` hands the component to a handler
//! registered by the driver at startup.

use super::*;

/// A registered `exec` handler: `(netlist, context, component, params)`.
pub type SabHandler = Box<dyn Fn(&mut Netlist, &str, CompId, &str)>;

/// The extension registry resolving `exec` script names to handlers.
#[derive(Default)]
pub struct SabRegistry {
    handlers: HashMap<CompactString, SabHandler>,
}

impl SabRegistry {
    pub fn new() -> SabRegistry {
        SabRegistry::default()
    }

    pub fn register(
        &mut self, name: impl Into<CompactString>,
        handler: impl Fn(&mut Netlist, &str, CompId, &str) + 'static,
    ) {
        self.handlers.insert(name.into(), Box::new(handler));
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum SabActionKind {
    Discard,
    Bypass,
    Exec,
}

struct SabEntry {
    refdes: CompactString,
    order: Option<u32>,
    action: SabActionKind,
    params: Option<CompactString>,
    comp: CompId,
}

/// Break up a sab-param into context, optional order number, action,
/// and action parameters.
fn parse_param(param: &str, refdes: &str)
               -> Option<(String, Option<u32>, SabActionKind,
                          Option<CompactString>)> {
    let parts: Vec<&str> = param.split(':').collect();
    if parts.len() < 2 {
        clilog::warn!(
            "Malformed sab-param for component {}: {}\n\
             Did you forget the action?", refdes, param);
        return None
    }
    let context = parts[0].to_lowercase();

    let (order, action_idx) = match parts[1].strip_prefix('#') {
        Some(digits) => match digits.parse::<u32>() {
            Ok(order) => (Some(order), 2),
            Err(_) => {
                clilog::warn!(
                    "Malformed sab-param order for component {}: {}",
                    refdes, param);
                return None
            }
        },
        None => (None, 1),
    };

    let action = match parts.get(action_idx)
        .map(|a| a.to_lowercase())
    {
        Some(a) if a == "discard" => SabActionKind::Discard,
        Some(a) if a == "bypass" => SabActionKind::Bypass,
        Some(a) if a == "exec" => SabActionKind::Exec,
        Some(a) => {
            clilog::warn!(
                "The {} action is not valid in sab-param for \
                 component {} in context {}", a, refdes, context);
            return None
        }
        None => {
            clilog::warn!(
                "Malformed sab-param for component {}: {}\n\
                 Did you forget the action?", refdes, param);
            return None
        }
    };

    let params = if parts.len() > action_idx + 1 {
        Some(CompactString::from(parts[action_idx + 1..].join(":")))
    } else {
        None
    };
    Some((context, order, action, params))
}

/// Insert an entry keeping the list ordered by ascending order
/// number; unordered entries stay last in insertion order.
fn add_entry(list: &mut Vec<SabEntry>, entry: SabEntry) {
    if entry.order.is_none() {
        list.push(entry);
        return
    }
    for i in 0..list.len() {
        if list[i].order.is_some() && list[i].order == entry.order {
            clilog::warn!(
                "Both {} and {} specify the same order for the same \
                 context.", list[i].refdes, entry.refdes);
            continue
        }
        if list[i].order.is_none() || list[i].order > entry.order {
            list.insert(i, entry);
            return
        }
    }
    list.push(entry);
}

/// Run SAB processing over a completed netlist for the given context
/// list.  With an empty context list this is a no-op.
pub fn process_sab(
    netlist: &mut Netlist, contexts: &[&str], registry: &SabRegistry
) {
    let mut ctx_list: Vec<(String, Vec<SabEntry>)> = Vec::new();
    for c in contexts {
        let c = c.to_lowercase();
        if !c.is_empty() && !ctx_list.iter().any(|(n, _)| *n == c) {
            ctx_list.push((c, Vec::new()));
        }
    }
    if ctx_list.is_empty() {
        return
    }

    clilog::info!(SAB_START, "Starting SAB processing");

    for comp in netlist.components.clone() {
        let attrs: Vec<CompactString> = netlist[netlist[comp].blueprint]
            .get_attributes("sab-param").cloned().collect();
        for attr in attrs {
            let mut refdes = netlist[comp].refdes.clone()
                .unwrap_or_else(|| "?".into());
            let parsed = match parse_param(&attr, &refdes) {
                Some(p) => p,
                None => continue
            };
            let (context, order, action, params) = parsed;
            let entries = match ctx_list.iter_mut()
                .find(|(n, _)| *n == context)
            {
                Some((_, entries)) => entries,
                // components with an unknown context are ignored
                None => continue
            };

            if let Some(slot) = netlist[netlist[comp].blueprint]
                .get_attribute("slot")
            {
                refdes = format!("{}:{}", refdes, slot).into();
            }
            if entries.iter().any(|e| e.refdes == refdes) {
                clilog::warn!(
                    "Component {} defines multiple sab-param for the \
                     {} context.\nThe extras will be ignored.",
                    refdes, context);
                continue
            }
            add_entry(entries, SabEntry {
                refdes, order, action, params, comp
            });
        }
    }

    for (context, entries) in ctx_list {
        clilog::info!(SAB_CTX, "Processing {} context...", context);
        if entries.is_empty() {
            clilog::info!(SAB_CTX, "Nothing to be done for context {}",
                          context);
            continue
        }

        for entry in entries {
            clilog::info!(SAB_COMP, "Processing component {}...",
                          entry.refdes);
            match entry.action {
                SabActionKind::Exec => {
                    // the handler is responsible for the whole shebang
                    let params = entry.params.unwrap_or_default();
                    let (script, rest) = match params.split_once(':') {
                        Some((script, rest)) => (script, rest),
                        None => (params.as_str(), ""),
                    };
                    match registry.handlers.get(script) {
                        Some(handler) =>
                            handler(netlist, &context, entry.comp, rest),
                        None => clilog::warn!(
                            "Unable to load script {}", script),
                    }
                }
                SabActionKind::Bypass => {
                    match &entry.params {
                        Some(shorts) =>
                            bypass(netlist, entry.comp, shorts),
                        None => clilog::warn!(
                            "Missing shorting list in sab-param for \
                             component {}", entry.refdes),
                    }
                    // first bypass, then discard whatever is left
                    discard(netlist, entry.comp);
                }
                SabActionKind::Discard => {
                    discard(netlist, entry.comp);
                }
            }
        }
    }

    clilog::info!(SAB_START, "SAB processing complete");
}

impl Netlist {
    /// Convenience method form of [process_sab].
    pub fn process_sab(&mut self, contexts: &[&str],
                       registry: &SabRegistry) {
        process_sab(self, contexts, registry)
    }

    /// Give a net a caller-chosen name, keeping the name index
    /// consistent.
    pub(crate) fn rename_net(&mut self, net: NetId, name: &str) {
        let old = self.net_arena[net.0].name.clone();
        if self.nets_by_name.get(&old) == Some(&net) {
            self.nets_by_name.remove(&old);
        }
        self.net_arena[net.0].name = name.into();
        self.net_arena[net.0].unnamed_counter = None;
        self.nets_by_name.insert(name.into(), net);
    }
}

/// Cross-connect the nets connected to the pins in each group of the
/// shorting list.  The merged net keeps the identity of the first pin
/// listed in each group, unless an `as` clause renames it.
fn bypass(netlist: &mut Netlist, comp: CompId, shorts: &str) {
    // the component may already be gone if another context was here
    if !netlist.components.contains(&comp) {
        clilog::info!(SAB_BYPASS,
                      "Component has already been discarded. \
                       Aborting bypass.");
        return
    }
    let blueprint_refdes = netlist[netlist[comp].blueprint]
        .refdes.clone().unwrap_or_else(|| "?".into());

    for short in shorts.split(';') {
        let (pins_part, rename) = match short.split_once("as") {
            Some((pins, name)) => (pins, Some(name.trim())),
            None => (short, None),
        };
        let pins_part = pins_part.trim();
        if pins_part.is_empty()
            || !pins_part.chars()
                .all(|c| c.is_ascii_digit() || c == ',')
        {
            clilog::warn!(
                "Only digits and commas allowed in shorting list. \
                 Ignoring.\n{}: {}", blueprint_refdes, pins_part);
            continue
        }
        let pins: Vec<&str> = pins_part.split(',').collect();
        if pins.len() < 2 {
            clilog::warn!(
                "Two or more pins needed in shorting list for \
                 component {} (current list: {})",
                blueprint_refdes, pins_part);
            continue
        }

        let dest_cpin = match netlist[comp].cpins_by_number
            .get(pins[0]).copied()
        {
            Some(cpin) => cpin,
            None => {
                clilog::warn!(
                    "Component {} does not have a pin {}. Ignoring.",
                    blueprint_refdes, pins[0]);
                continue
            }
        };
        let dest_net = netlist.localnet_arena
            [netlist[dest_cpin].local_net.0].net
            .expect("bypassed pin without a net");

        if let Some(name) = rename {
            if !name.is_empty() {
                netlist.rename_net(dest_net, name);
            }
        }

        let mut src_nets: Vec<NetId> = Vec::new();
        for pin in &pins[1..] {
            let cpin = match netlist[comp].cpins_by_number
                .get(*pin).copied()
            {
                Some(cpin) => cpin,
                None => {
                    clilog::warn!(
                        "Component {} does not have a pin {}. \
                         Ignoring.", blueprint_refdes, pin);
                    continue
                }
            };
            let net = netlist.localnet_arena
                [netlist[cpin].local_net.0].net
                .expect("bypassed pin without a net");
            if net != dest_net
                && !src_nets.contains(&net)
                && !netlist[net].is_unconnected_pin
            {
                src_nets.push(net);
            }
        }
        for net in src_nets {
            netlist.merge_net_into(net, dest_net);
        }
    }
}

/// Unlink a component from the netlist: its pins leave the blueprint
/// nets, the local nets, and the global nets; the component leaves
/// its page, its sheet, its package (removing the package if it
/// empties), and the flat component list.
fn discard(netlist: &mut Netlist, comp: CompId) {
    for cpin in netlist[comp].cpins.clone() {
        let ln = netlist[cpin].local_net;
        let net = match netlist.localnet_arena[ln.0].net {
            Some(net) => net,
            None => continue
        };
        if netlist[net].is_unconnected_pin {
            continue
        }

        let bpin = netlist[cpin].blueprint;
        if !netlist[bpin].is_virtual {
            let bnet = netlist[bpin].bnet;
            netlist.bnet_arena[bnet.0].pins.retain(|&p| p != bpin);
            if netlist[bnet].pins.is_empty() {
                let sid = netlist[bnet].schematic;
                netlist.schematics[sid.0].nets.retain(|&n| n != bnet);
            }
        }

        netlist.localnet_arena[ln.0].cpins.retain(|&c| c != cpin);
        if netlist[ln].cpins.is_empty() {
            netlist.net_arena[net.0].local_nets.retain(|&l| l != ln);
        }

        netlist.net_arena[net.0].component_pins.retain(|&c| c != cpin);
        if netlist[net].local_nets.is_empty()
            && netlist[net].component_pins.is_empty()
        {
            netlist.nets.retain(|&n| n != net);
            let name = netlist[net].name.clone();
            if netlist.nets_by_name.get(&name) == Some(&net) {
                netlist.nets_by_name.remove(&name);
            }
        }
        if netlist[net].component_pins.len() == 1 {
            netlist.net_arena[net.0].is_unconnected_pin = true;
        }
    }

    // it is possible that some other context has already been here

    // remove it from the blueprint level first
    let bcomp = netlist[comp].blueprint;
    let sid = netlist[bcomp].schematic;
    netlist.schematics[sid.0].components.retain(|&c| c != bcomp);

    // now from the derived level sheet
    let sheet = netlist[comp].sheet;
    netlist.sheets[sheet.0].components.retain(|&c| c != comp);
    netlist.sheets[sheet.0].components_by_blueprint.remove(&bcomp);

    // and from the package
    if let Some(refdes) = netlist[comp].refdes.clone() {
        if let Some(&pkg) = netlist.packages_by_refdes.get(&refdes) {
            netlist.package_arena[pkg.0].components
                .retain(|&c| c != comp);

            // drop the component's pins from the package pin table
            // and the nets' connection lists
            for ppin in netlist[pkg].pins.clone() {
                netlist.ppin_arena[ppin.0].cpins
                    .retain(|&c| netlist.cpin_arena[c.0].component != comp);
                if netlist[ppin].cpins.is_empty() {
                    if let Some(net) = netlist[ppin].net {
                        netlist.net_arena[net.0].connections
                            .retain(|&p| p != ppin);
                    }
                    let number = netlist[ppin].number.clone();
                    netlist.package_arena[pkg.0].pins
                        .retain(|&p| p != ppin);
                    netlist.package_arena[pkg.0].pins_by_number
                        .remove(&number);
                }
            }

            if netlist[pkg].components.is_empty() {
                clilog::info!(SAB_DISCARD,
                              "Package for {} is now empty, removing",
                              refdes);
                netlist.packages.retain(|&p| p != pkg);
                netlist.packages_by_refdes.remove(&refdes);
            }
        }
    }

    // and finally from the component list itself
    netlist.components.retain(|&c| c != comp);
}
