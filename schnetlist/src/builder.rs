//! The pipeline driver: loading, pass sequencing, and assembly.

use std::path::Path;
use super::*;

/// A fatal load failure.  Unlike the accumulated netlist errors,
/// these abort extraction before post-processing runs.
#[derive(Debug)]
pub enum LoadError {
    /// File missing, unreadable, unrecognized format, or parse-level
    /// malformation.
    Read {
        filename: String,
        error: schparse::ReadError,
    },
    /// A schematic (indirectly) sources itself.
    Cycle {
        filename: String,
    },
}

impl std::fmt::Display for LoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            LoadError::Read { filename, error } =>
                write!(f, "failed to load '{}': {}", filename, error),
            LoadError::Cycle { filename } =>
                write!(f, "hierarchy loop: '{}' is a subschematic of \
                           itself", filename),
        }
    }
}

impl Netlist {
    /// Extract a netlist from one or more top-level schematic files.
    ///
    /// This is the main entry point.  Schematic pages referenced via
    /// `source=` attributes are loaded as necessary when
    /// `config.traverse_hierarchy` is set.  Entity-level problems
    /// accumulate in `failed`; only load failures abort.
    pub fn extract(
        toplevel_filenames: &[impl AsRef<Path>],
        config: Config,
        symbols: &SymbolLibrary,
        sources: &SourceLibrary,
    ) -> Result<Netlist, LoadError> {
        let mut netlist = Netlist {
            config,
            ..Netlist::default()
        };

        let mut toplevel_schematics = Vec::new();
        for filename in toplevel_filenames {
            let filename = CompactString::from(
                filename.as_ref().to_string_lossy());
            let sid = netlist.load_schematic(&filename, symbols, sources)?;
            toplevel_schematics.push(sid);
        }

        netlist.postproc_blueprints();

        // traverse the schematics and create the instance tree
        for &sid in &toplevel_schematics {
            let sheet = netlist.instantiate_sheet(sid, None);
            netlist.toplevel_sheets.push(sheet);
            if netlist.config.traverse_hierarchy {
                netlist.traverse_sheet(sheet);
            }
        }
        for sheet in netlist.toplevel_sheets.clone() {
            netlist.collect_components(sheet);
        }

        // create net objects and assign names
        netlist.postproc_net_instances();
        netlist.assign_net_names();
        netlist.assign_component_pins();

        // resolve hierarchy
        netlist.postproc_hierarchy_instances();
        netlist.postproc_graphical_instances();

        // group components into packages
        netlist.postproc_package_instances();

        // unconnected subsheet pins connected to multiple I/O ports
        // carry internal subsheet connections and must be preserved
        netlist.prune_unconnected_pins();

        netlist.assign_refdes();
        netlist.compile_indexes();

        Ok(netlist)
    }

    /// Load one schematic file, recursing into its `source=`
    /// references.  Repeated loads return the memoized blueprint; a
    /// load hitting its own sentinel entry is a hierarchy cycle.
    fn load_schematic(
        &mut self, filename: &CompactString,
        symbols: &SymbolLibrary, sources: &SourceLibrary,
    ) -> Result<SchematicId, LoadError> {
        match self.schematics_by_filename.get(filename) {
            Some(Some(sid)) => return Ok(*sid),
            Some(None) => return Err(LoadError::Cycle {
                filename: filename.to_string()
            }),
            None => {}
        }
        self.schematics_by_filename.insert(filename.clone(), None);

        clilog::info!(SCHN_LOAD, "Loading schematic [{}]", filename);
        let rev = Revision::read(filename.as_str())
            .map_err(|error| LoadError::Read {
                filename: filename.to_string(),
                error,
            })?;
        let sid = self.build_schematic(filename.clone(), rev, symbols);
        self.schematics_by_filename.insert(filename.clone(), Some(sid));

        // resolve subsheet references
        for cid in self.schematics[sid.0].components.clone() {
            let values: Vec<CompactString> =
                self[cid].get_attributes("source").cloned().collect();
            for value in values {
                for name in value.split(',') {
                    let name = if name.starts_with(' ') {
                        self.warn_at(Subject::BComp(cid),
                                     "leading spaces in source names \
                                      are deprecated");
                        name.trim_start_matches(' ')
                    } else {
                        name
                    };

                    let full = match sources.search_single(name) {
                        Some(path) => CompactString::from(
                            path.to_string_lossy()),
                        None => {
                            self.error_at(Subject::BComp(cid), format!(
                                "failed to load subcircuit '{}': \
                                 schematic not found in source library",
                                name));
                            continue
                        }
                    };
                    let sub = self.load_schematic(
                        &full, symbols, sources)?;
                    self.bcomp_arena[cid.0].composite_sources.push(sub);
                }
            }
        }

        Ok(sid)
    }
}
