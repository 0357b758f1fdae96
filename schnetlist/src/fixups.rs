//! Blueprint post-processing passes.
//!
//! All passes run over the flat set of loaded schematics in a fixed
//! order: power symbols, I/O ports, slotting, `net=` attributes,
//! graphical components, package-level validation.  Each pass is
//! idempotent on already-processed input.

use std::collections::HashSet;
use crate::attrib::{parse_net_value, parse_slotdef};
use super::*;

impl Netlist {
    pub(crate) fn postproc_blueprints(&mut self) {
        self.fixup_power();
        self.fixup_ports();
        self.fixup_slotting();
        self.fixup_netattrib();
        self.fixup_graphical();
        self.fixup_packages();
        self.fixup_conflicts();
        self.collect_parameters();
    }

    fn all_bcomps(&self) -> Vec<BCompId> {
        self.schematics.iter()
            .flat_map(|s| s.components.iter().copied())
            .collect()
    }

    /// New-style power symbols: a `netname=` attribute turns the
    /// component into an implicit label for the net its single pin
    /// connects to.
    fn fixup_power(&mut self) {
        for cid in self.all_bcomps() {
            if self[cid].has_netname_attrib {
                // already processed
                continue
            }
            let netname = match self[cid].get_attribute("netname") {
                Some(n) => n.clone(),
                None => continue
            };

            if self[cid].refdes.is_some() {
                self.error_at(Subject::BComp(cid),
                              "refdes= and netname= attributes \
                               are mutually exclusive");
            }
            if self[cid].get_attributes("net").next().is_some() {
                self.error_at(Subject::BComp(cid),
                              "netname= and net= attributes \
                               are mutually exclusive");
            }

            let pins = self[cid].pins.clone();
            if pins.is_empty() {
                self.error_at(Subject::BComp(cid),
                              "power symbol doesn't have pins");
            }
            if pins.len() > 1 {
                self.error_at(Subject::BComp(cid),
                              "multiple pins on power symbol");
            }
            for &pid in &pins {
                if self[pid].number.is_some()
                    || !self[pid].attribs.is_empty()
                {
                    self.warn_at(Subject::BPin(pid),
                                 "pin attributes on power symbol \
                                  are ignored");
                }
                let bnet = self[pid].bnet;
                self.bnet_arena[bnet.0].names_from_net_attribute
                    .push(netname.clone());
            }

            self.bcomp_arena[cid.0].has_netname_attrib = true;
        }
    }

    /// I/O port symbols: a `portname=` attribute marks one external
    /// connection point of the containing schematic.
    fn fixup_ports(&mut self) {
        for cid in self.all_bcomps() {
            if self[cid].has_portname_attrib {
                // already processed
                continue
            }
            let portname = match self[cid].get_attribute("portname") {
                Some(n) => n.clone(),
                None => continue
            };

            if self[cid].refdes.is_some() {
                self.error_at(Subject::BComp(cid),
                              "refdes= and portname= attributes \
                               are mutually exclusive");
            }
            if self[cid].get_attributes("net").next().is_some() {
                self.error_at(Subject::BComp(cid),
                              "portname= and net= attributes \
                               are mutually exclusive");
            }

            let pins = self[cid].pins.clone();
            if pins.is_empty() {
                self.error_at(Subject::BComp(cid),
                              "I/O symbol doesn't have pins");
            }
            if pins.len() > 1 {
                self.error_at(Subject::BComp(cid),
                              "multiple pins on I/O symbol");
            }
            for &pid in &pins {
                if self[pid].number.is_some()
                    || !self[pid].attribs.is_empty()
                {
                    self.warn_at(Subject::BPin(pid),
                                 "pin attributes on I/O symbol \
                                  are ignored");
                }
            }

            let sid = self[cid].schematic;
            self.schematics[sid.0].ports
                .entry(portname).or_default().push(cid);
            self.bcomp_arena[cid.0].has_portname_attrib = true;
        }
    }

    /// Resolve `slot=` / `slotdef=` into per-instance pin numbers.
    fn fixup_slotting(&mut self) {
        for cid in self.all_bcomps() {
            let slot_value = match self[cid].get_attribute("slot") {
                Some(v) => v.clone(),
                None => continue
            };
            let slot: u32 = match slot_value.parse() {
                Ok(v) if v >= 1 => v,
                _ => {
                    self.error_at(Subject::BComp(cid), format!(
                        "`{}' is not a valid slot number", slot_value));
                    continue
                }
            };

            let slotdefs: Vec<CompactString> =
                self[cid].get_attributes("slotdef").cloned().collect();
            if slotdefs.is_empty() {
                self.error_at(Subject::BComp(cid),
                              "slot= is set but the symbol has no \
                               slotdef= attribute");
                continue
            }

            if let Some(numslots) = self[cid].get_attribute("numslots")
                .and_then(|v| v.parse::<u32>().ok())
            {
                if slot > numslots {
                    self.error_at(Subject::BComp(cid), format!(
                        "slot {} is out of range (numslots={})",
                        slot, numslots));
                    continue
                }
            }

            let mut chosen: Option<Vec<CompactString>> = None;
            for def in &slotdefs {
                match parse_slotdef(def) {
                    None => {
                        self.error_at(Subject::BComp(cid), format!(
                            "malformed slotdef= attribute: {}", def));
                    }
                    Some((n, pins)) => {
                        if n == slot && chosen.is_none() {
                            chosen = Some(pins);
                        }
                    }
                }
            }
            let new_numbers = match chosen {
                Some(pins) => pins,
                None => {
                    self.error_at(Subject::BComp(cid), format!(
                        "symbol has no slotdef= for slot {}", slot));
                    continue
                }
            };

            // renumber the pins in pinseq order
            let mut seq_pins: Vec<(u32, BPinId)> = self[cid].pins.iter()
                .filter_map(|&pid| {
                    let seq: u32 = self[pid].get_attribute("pinseq")?
                        .parse().ok()?;
                    Some((seq, pid))
                })
                .collect();
            seq_pins.sort_by_key(|(seq, _)| *seq);

            if seq_pins.len() != new_numbers.len() {
                self.error_at(Subject::BComp(cid), format!(
                    "slotdef= lists {} pins but the symbol has {} \
                     pins with pinseq=",
                    new_numbers.len(), seq_pins.len()));
                continue
            }
            for ((_, pid), number) in seq_pins.iter().zip(&new_numbers) {
                self.bpin_arena[pid.0].number = Some(number.clone());
            }

            let comp = &self[cid];
            let rebuilt: HashMap<CompactString, BPinId> = comp.pins.iter()
                .filter_map(|&pid| {
                    Some((self[pid].number.clone()?, pid))
                })
                .collect();
            self.bcomp_arena[cid.0].pins_by_number = rebuilt;
        }
    }

    /// `net=Name:pinlist` attributes connect listed pins to a named
    /// net, fabricating virtual pins for numbers the symbol does not
    /// have.
    fn fixup_netattrib(&mut self) {
        for cid in self.all_bcomps() {
            let values: Vec<CompactString> =
                self[cid].get_attributes("net").cloned().collect();
            for value in values {
                let (name, pin_numbers) = match parse_net_value(&value) {
                    Some(x) => x,
                    None => {
                        self.error_at(Subject::BComp(cid), format!(
                            "malformed net= attribute: {}", value));
                        continue
                    }
                };
                for pin_number in pin_numbers {
                    match self[cid].pins_by_number.get(&pin_number)
                        .copied()
                    {
                        Some(pid) => {
                            self.bpin_arena[pid.0].has_netattrib = true;
                            let bnet = self[pid].bnet;
                            self.bnet_arena[bnet.0]
                                .names_from_net_attribute
                                .push(name.clone());
                        }
                        None => {
                            let sid = self[cid].schematic;
                            let bnet = BNetId(self.bnet_arena.len());
                            let pid = BPinId(self.bpin_arena.len());
                            self.bnet_arena.push(BNet {
                                schematic: sid,
                                pins: vec![pid],
                                names_from_netname: Vec::new(),
                                names_from_net_attribute:
                                    vec![name.clone()],
                                is_bus: false,
                            });
                            self.schematics[sid.0].nets.push(bnet);
                            self.bpin_arena.push(BPin {
                                component: cid,
                                number: Some(pin_number.clone()),
                                attribs: Attributes::new(),
                                bnet,
                                is_virtual: true,
                                has_netattrib: true,
                            });
                            self.bcomp_arena[cid.0].pins.push(pid);
                            self.bcomp_arena[cid.0].pins_by_number
                                .insert(pin_number, pid);
                        }
                    }
                }
            }
        }
    }

    /// `graphical=1` strips a component from electrical
    /// consideration; it stays in the model for reporting.
    fn fixup_graphical(&mut self) {
        for cid in self.all_bcomps() {
            match self[cid].get_attribute("graphical")
                .map(|v| v.as_str())
            {
                None => {}
                Some("1") => {
                    self.bcomp_arena[cid.0].is_graphical = true;
                }
                Some(other) => {
                    let other = other.to_string();
                    self.warn_at(Subject::BComp(cid), format!(
                        "unexpected graphical= value `{}', component \
                         not treated as graphical", other));
                }
            }
        }
    }

    pub(crate) fn blueprint_requires_refdes(&self, cid: BCompId) -> bool {
        let c = &self[cid];
        if c.pins.is_empty() || c.is_graphical
            || c.has_netname_attrib || c.has_portname_attrib
        {
            return false
        }
        !c.pins.iter().any(|&pid| self[pid].has_netattrib)
    }

    /// Blueprint-stage package validation: refdes presence, pin
    /// numbers, and duplicate slot usage within one package.
    fn fixup_packages(&mut self) {
        for sid in 0..self.schematics.len() {
            let comps = self.schematics[sid].components.clone();
            let mut by_refdes: HashMap<CompactString, Vec<BCompId>> =
                HashMap::new();
            for &cid in &comps {
                if self.blueprint_requires_refdes(cid) {
                    match &self[cid].refdes {
                        Some(refdes) => by_refdes.entry(refdes.clone())
                            .or_default().push(cid),
                        None => self.error_at(Subject::BComp(cid),
                                              "component has pins but \
                                               no refdes= attribute"),
                    }
                    for pid in self[cid].pins.clone() {
                        if self[pid].number.is_none() {
                            self.error_at(Subject::BPin(pid),
                                          "pin lacks a pinnumber= \
                                           attribute");
                        }
                    }
                }
            }

            for (refdes, group) in by_refdes {
                let mut slots_seen: HashSet<CompactString> = HashSet::new();
                for cid in group {
                    let slot = match self[cid].get_attribute("slot") {
                        Some(s) => s.clone(),
                        None => continue
                    };
                    if !slots_seen.insert(slot.clone()) {
                        self.error_at(Subject::BComp(cid), format!(
                            "duplicate usage of slot {} in package \
                             `{}'", slot, refdes));
                    }
                }
            }
        }
    }

    /// Cross-cutting attribute conflicts, checked once all flags are
    /// in place.
    fn fixup_conflicts(&mut self) {
        for cid in self.all_bcomps() {
            if !self[cid].composite_sources.is_empty()
                && self[cid].is_graphical
            {
                // do not bother traversing the hierarchy if the
                // component is graphical anyway
                self.warn_at(Subject::BComp(cid),
                             "source= is set for graphical component");
                self.bcomp_arena[cid.0].composite_sources.clear();
            }

            if self[cid].has_netname_attrib
                && self[cid].has_portname_attrib
            {
                self.error_at(Subject::BComp(cid),
                              "netname= and portname= attributes are \
                               mutually exclusive");
            }

            if self[cid].has_netname_attrib
                && !self[cid].composite_sources.is_empty()
            {
                self.error_at(Subject::BComp(cid),
                              "power symbol can't be a subschematic");
                self.bcomp_arena[cid.0].composite_sources.clear();
            }
            if self[cid].has_portname_attrib
                && !self[cid].composite_sources.is_empty()
            {
                self.error_at(Subject::BComp(cid),
                              "I/O symbol can't be a subschematic");
                self.bcomp_arena[cid.0].composite_sources.clear();
            }

            if self[cid].has_netname_attrib && self[cid].is_graphical {
                self.error_at(Subject::BComp(cid),
                              "power symbol can't be graphical");
            }
            if self[cid].has_portname_attrib && self[cid].is_graphical {
                self.error_at(Subject::BComp(cid),
                              "I/O symbol can't be graphical");
            }
        }
    }

    /// Collect `param=name=value` attributes, attached values
    /// overriding inherited ones.
    fn collect_parameters(&mut self) {
        for cid in self.all_bcomps() {
            let mut parameters = HashMap::new();
            let scopes = [
                self[cid].inherited.get_all("param")
                    .cloned().collect::<Vec<_>>(),
                self[cid].attached.get_all("param")
                    .cloned().collect::<Vec<_>>(),
            ];
            for scope in scopes {
                let mut names: HashSet<CompactString> = HashSet::new();
                for val in scope {
                    let (name, value) =
                        match schparse::parse_attribute(&val)
                    {
                        Ok((n, v)) => (CompactString::from(n),
                                       CompactString::from(v)),
                        Err(_) => {
                            self.error_at(Subject::BComp(cid), format!(
                                "malformed param= attribute: {}", val));
                            continue
                        }
                    };
                    if !names.insert(name.clone()) {
                        self.error_at(Subject::BComp(cid), format!(
                            "duplicate param= attribute: {}", name));
                        continue
                    }
                    parameters.insert(name, value);
                }
            }
            self.bcomp_arena[cid.0].parameters = parameters;
        }
    }
}
