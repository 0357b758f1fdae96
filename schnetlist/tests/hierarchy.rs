use schnetlist::*;

fn files_dir() -> &'static str {
    concat!(env!("CARGO_MANIFEST_DIR"), "/tests/files")
}

fn extract(filename: &str, config: Config) -> Netlist {
    static INIT_LOG: std::sync::Once = std::sync::Once::new();
    INIT_LOG.call_once(clilog::init_stderr_color_debug);
    let mut symbols = SymbolLibrary::new();
    symbols.add_directory(files_dir(), false);
    let mut sources = SourceLibrary::new();
    sources.add_directory(files_dir());
    Netlist::extract(
        &[format!("{}/{}", files_dir(), filename)],
        config, &symbols, &sources
    ).expect("extraction failed to load")
}

#[test]
fn hierarchy_with_mangling() {
    let netlist = extract("top.sch", Config::default());
    assert!(!netlist.failed);

    // the composite and its port symbol are spliced out; only the
    // subsheet resistor survives, with a mangled refdes
    assert_eq!(netlist.packages.len(), 1);
    let &pkg = netlist.packages_by_refdes.get("U1/R1")
        .expect("no U1/R1 package");
    assert_eq!(netlist[pkg].unmangled_refdes, "R1");

    // the net straddling U1's port appears once, named after the
    // parent wire
    assert_eq!(netlist.nets.len(), 1);
    let &net = netlist.nets_by_name.get("TOPIN").expect("no TOPIN net");
    let conns: Vec<_> = netlist[net].connections.iter()
        .map(|&ppin| (
            netlist[netlist[ppin].package].refdes.to_string(),
            netlist[ppin].number.to_string(),
        ))
        .collect();
    assert_eq!(conns, vec![("U1/R1".to_string(), "1".to_string())]);

    // neither the composite nor the port is left in the flat list
    assert_eq!(netlist.components.len(), 1);
}

#[test]
fn hierarchy_prepend_orders() {
    let config = Config {
        refdes_separator: ".".into(),
        netname_order: MangleOrder::Prepend,
        ..Config::default()
    };
    let netlist = extract("top.sch", config);
    assert!(netlist.packages_by_refdes.contains_key("U1.R1"));
    // net names attach the tag after the basename with prepend order
    assert!(netlist.nets_by_name.contains_key("TOPIN"));
}

#[test]
fn hierarchy_without_mangling() {
    // a flat package namespace folds both subsheet resistors into one
    // package, whose pins then see two different nets
    let config = Config {
        flat_package_namespace: true,
        ..Config::default()
    };
    let netlist = extract("top2.sch", config);
    assert!(netlist.failed);
    assert_eq!(netlist.packages.len(), 1);
    let &pkg = netlist.packages_by_refdes.get("R1").unwrap();
    assert_eq!(netlist[pkg].components.len(), 2);
}

#[test]
fn refdes_conflict_across_sheets() {
    // two composites with the same refdes: the subsheet resistors
    // mangle to the same name, which is a name clash, not an abort
    let netlist = extract("topdup.sch", Config::default());
    assert!(netlist.failed);
    assert_eq!(netlist.packages.len(), 2);
    assert_eq!(netlist.packages_by_refdes.len(), 1);
    assert!(netlist.packages_by_refdes.contains_key("U1/R1"));
}

#[test]
fn unresolved_source() {
    let netlist = extract("badsource.sch", Config::default());
    assert!(netlist.failed);
    let top = netlist.toplevel_sheets[0];
    let sheet = &netlist[top];
    let &comp = sheet.components.first().unwrap();
    assert!(netlist[netlist[comp].blueprint]
            .composite_sources.is_empty());
    // the component is not spliced and packages normally
    assert!(netlist.packages_by_refdes.contains_key("U1"));
}

#[test]
fn dont_traverse_hierarchy() {
    let config = Config {
        traverse_hierarchy: false,
        ..Config::default()
    };
    let netlist = extract("top.sch", config);
    // no subsheets are instantiated; the composite is still spliced
    // away and its port connection dangles with a warning
    assert_eq!(netlist.sheets.len(), 1);
    assert!(netlist.packages.is_empty());
    let &net = netlist.nets_by_name.get("TOPIN").unwrap();
    assert!(netlist[net].connections.is_empty());
}
