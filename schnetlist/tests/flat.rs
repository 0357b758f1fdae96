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

fn connections(netlist: &Netlist, net: NetId) -> Vec<(String, String)> {
    netlist[net].connections.iter()
        .map(|&ppin| (
            netlist[netlist[ppin].package].refdes.to_string(),
            netlist[ppin].number.to_string(),
        ))
        .collect()
}

#[test]
fn flat_single_sheet() {
    let netlist = extract("flat.sch", Config::default());
    assert!(!netlist.failed);

    // two packages; the graphical logo is not packaged
    assert_eq!(netlist.packages.len(), 2);
    assert!(netlist.packages_by_refdes.contains_key("R1"));
    assert!(netlist.packages_by_refdes.contains_key("R2"));

    // one net named VCC; the unconnected pins 2 are pruned
    assert_eq!(netlist.nets.len(), 1);
    let &net = netlist.nets_by_name.get("VCC").expect("no VCC net");
    assert_eq!(netlist[net].name, "VCC");
    assert_eq!(connections(&netlist, net), vec![
        ("R1".to_string(), "1".to_string()),
        ("R2".to_string(), "1".to_string()),
    ]);

    // the graphical component is gone from the flat component list
    // but still present on its sheet
    assert_eq!(netlist.components.len(), 2);
    let top = netlist.toplevel_sheets[0];
    assert_eq!(netlist[top].components.len(), 3);

    // param= attributes are collected per component
    let &pkg = netlist.packages_by_refdes.get("R1").unwrap();
    let &comp = netlist[pkg].components.first().unwrap();
    let blueprint = &netlist[netlist[comp].blueprint];
    assert_eq!(blueprint.parameters.get("tolerance")
               .map(|v| v.as_str()), Some("5%"));
}

#[test]
fn flat_invariants() {
    let netlist = extract("flat.sch", Config::default());

    // every surviving pin resolves through exactly one local net to
    // exactly one live net
    for &comp in &netlist.components {
        for &cpin in &netlist[comp].cpins {
            let ln = netlist[cpin].local_net;
            assert!(netlist[ln].cpins.contains(&cpin));
            let net = netlist[ln].net.expect("local net without net");
            assert!(netlist[net].local_nets.contains(&ln));
        }
    }
    for &net in &netlist.nets {
        assert!(!netlist[net].is_unconnected_pin);
        assert_eq!(netlist.nets_by_name[&netlist[net].name], net);
    }
    for (refdes, &pkg) in &netlist.packages_by_refdes {
        assert_eq!(netlist[pkg].refdes, *refdes);
        for &ppin in &netlist[pkg].pins {
            assert!(netlist[ppin].net.is_some());
        }
    }
}

#[test]
fn toplevel_attribute() {
    let mut netlist = extract("flat.sch", Config::default());
    assert_eq!(netlist.get_toplevel_attribute("title").as_deref(),
               Some("Flat test page"));
    assert_eq!(netlist.get_toplevel_attribute("nonexistent"), None);
    assert!(!netlist.failed);
}

#[test]
fn net_naming_priority() {
    // netname= still wins for nets that only have a netname
    let config = Config {
        prefer_netname_attribute: true,
        ..Config::default()
    };
    let netlist = extract("flat.sch", config);
    assert!(netlist.nets_by_name.contains_key("VCC"));
}

#[test]
fn repackage_identity_matches_packages() {
    let netlist = extract("slotted.sch", Config::default());
    let packages = repackage(&netlist, |nl: &Netlist, comp: CompId| {
        nl[nl[comp].blueprint].refdes.clone()
    });
    assert_eq!(packages.len(), netlist.packages.len());
    for package in &packages {
        let &orig = netlist.packages_by_refdes
            .get(&package.refdes).expect("refdes disappeared");
        let mut a = package.components.clone();
        let mut b = netlist[orig].components.clone();
        a.sort();
        b.sort();
        assert_eq!(a, b);
        assert_eq!(package.pins.len(), netlist[orig].pins.len());
    }
}

#[test]
fn repackage_leaves_netlist_alone() {
    let netlist = extract("flat.sch", Config::default());
    let num_packages = netlist.packages.len();
    let num_nets = netlist.nets.len();
    let _ = repackage(&netlist, |_: &Netlist, _: CompId| Some("X1".into()));
    assert_eq!(netlist.packages.len(), num_packages);
    assert_eq!(netlist.nets.len(), num_nets);
}
