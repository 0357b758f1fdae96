//! Instance construction: one sheet per call site of a schematic.
//!
//! Components and pins are copied 1:1 from the blueprint; the
//! per-sheet local nets are assembled directly from the blueprint
//! nets, so connectivity never has to be recomputed per instance.

use super::*;

impl Netlist {
    /// Create a sheet instance of a schematic.  `instantiating` is
    /// the composite component being expanded, `None` for top-level
    /// sheets.
    pub(crate) fn instantiate_sheet(
        &mut self, schematic: SchematicId, instantiating: Option<CompId>
    ) -> SheetId {
        let sheet_id = SheetId(self.sheets.len());
        self.sheets.push(Sheet {
            blueprint: schematic,
            instantiating_component: instantiating,
            components: Vec::new(),
            components_by_blueprint: HashMap::new(),
            local_nets: Vec::new(),
        });
        if let Some(comp) = instantiating {
            self.comp_arena[comp.0].subsheets.push(sheet_id);
        }

        for bcid in self.schematics[schematic.0].components.clone() {
            let comp_id = CompId(self.comp_arena.len());
            let mut cpins = Vec::new();
            let mut cpins_by_number = HashMap::new();
            let mut cpins_by_blueprint = HashMap::new();
            for bpid in self[bcid].pins.clone() {
                let cpin_id = CPinId(self.cpin_arena.len());
                self.cpin_arena.push(CPin {
                    component: comp_id,
                    blueprint: bpid,
                    // reassigned when the local nets are built below
                    local_net: LocalNetId(usize::MAX),
                });
                cpins.push(cpin_id);
                cpins_by_blueprint.insert(bpid, cpin_id);
                if let Some(number) = self[bpid].number.clone() {
                    cpins_by_number.entry(number).or_insert(cpin_id);
                }
            }
            self.comp_arena.push(Component {
                sheet: sheet_id,
                blueprint: bcid,
                cpins,
                cpins_by_number,
                cpins_by_blueprint,
                subsheets: Vec::new(),
                refdes: None,
            });
            self.sheets[sheet_id.0].components.push(comp_id);
            self.sheets[sheet_id.0].components_by_blueprint
                .insert(bcid, comp_id);
        }

        // one local net per blueprint net
        for bnid in self.schematics[schematic.0].nets.clone() {
            let ln_id = LocalNetId(self.localnet_arena.len());
            let mut cpins = Vec::new();
            for bpid in self[bnid].pins.clone() {
                let comp = self.sheets[sheet_id.0]
                    .components_by_blueprint[&self[bpid].component];
                let cpin = self[comp].cpins_by_blueprint[&bpid];
                self.cpin_arena[cpin.0].local_net = ln_id;
                cpins.push(cpin);
            }
            self.localnet_arena.push(LocalNet {
                sheet: sheet_id,
                blueprint: bnid,
                cpins,
                net: None,
            });
            self.sheets[sheet_id.0].local_nets.push(ln_id);
        }

        sheet_id
    }

    /// Depth-first expansion of composite components into subsheets.
    pub(crate) fn traverse_sheet(&mut self, sheet: SheetId) {
        for comp in self.sheets[sheet.0].components.clone() {
            for sub in self[self[comp].blueprint]
                .composite_sources.clone()
            {
                let subsheet = self.instantiate_sheet(sub, Some(comp));
                self.traverse_sheet(subsheet);
            }
        }
    }

    /// List the components in hierarchy order: a sheet's components,
    /// each immediately followed by its subsheets' components.
    pub(crate) fn collect_components(&mut self, sheet: SheetId) {
        for comp in self.sheets[sheet.0].components.clone() {
            self.components.push(comp);
            for sub in self[comp].subsheets.clone() {
                self.collect_components(sub);
            }
        }
    }
}
