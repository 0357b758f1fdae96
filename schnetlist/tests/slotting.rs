use schnetlist::*;

fn files_dir() -> &'static str {
    concat!(env!("CARGO_MANIFEST_DIR"), "/tests/files")
}

fn extract(filename: &str) -> Netlist {
    static INIT_LOG: std::sync::Once = std::sync::Once::new();
    INIT_LOG.call_once(clilog::init_stderr_color_debug);
    let mut symbols = SymbolLibrary::new();
    symbols.add_directory(files_dir(), false);
    let sources = SourceLibrary::new();
    Netlist::extract(
        &[format!("{}/{}", files_dir(), filename)],
        Config::default(), &symbols, &sources
    ).expect("extraction failed to load")
}

#[test]
fn slotted_package() {
    let netlist = extract("slotted.sch");
    assert!(!netlist.failed);

    // both slots group into one package whose pin numbers are the
    // union of the two slot remappings
    assert_eq!(netlist.packages.len(), 1);
    let &pkg = netlist.packages_by_refdes.get("U1").unwrap();
    assert_eq!(netlist[pkg].components.len(), 2);

    let mut numbers: Vec<String> = netlist[pkg].pins.iter()
        .map(|&ppin| netlist[ppin].number.to_string())
        .collect();
    numbers.sort();
    assert_eq!(numbers, vec!["1", "2", "3", "5", "6", "7"]);
    // no duplicate package pin
    assert_eq!(netlist[pkg].pins.len(),
               netlist[pkg].pins_by_number.len());

    // the wire connects slot 1 pin 1 with slot 2 pin 5
    let &net = netlist.nets_by_name.get("SIG").unwrap();
    let mut conns: Vec<(String, String)> = netlist[net].connections
        .iter()
        .map(|&ppin| (
            netlist[netlist[ppin].package].refdes.to_string(),
            netlist[ppin].number.to_string(),
        ))
        .collect();
    conns.sort();
    assert_eq!(conns, vec![
        ("U1".to_string(), "1".to_string()),
        ("U1".to_string(), "5".to_string()),
    ]);

    // every package pin resolved to exactly one net
    for &ppin in &netlist[pkg].pins {
        assert!(netlist[ppin].net.is_some());
    }
}
