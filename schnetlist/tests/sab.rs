use std::cell::RefCell;
use std::rc::Rc;
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
fn sab_bypass_and_discard() {
    let mut netlist = extract("sab.sch");
    assert!(!netlist.failed);
    assert!(netlist.packages_by_refdes.contains_key("J1"));
    assert_eq!(netlist.nets.len(), 3);

    netlist.process_sab(&["pcb"], &SabRegistry::new());

    // the three nets on pins 1, 2, 3 merged into one, renamed SIG
    assert_eq!(netlist.nets.len(), 1);
    let &net = netlist.nets_by_name.get("SIG").expect("no SIG net");
    assert_eq!(netlist[net].name, "SIG");

    // the jumper is gone everywhere
    assert!(!netlist.packages_by_refdes.contains_key("J1"));
    assert_eq!(netlist.packages.len(), 3);

    let mut conns: Vec<(String, String)> = netlist[net].connections
        .iter()
        .map(|&ppin| (
            netlist[netlist[ppin].package].refdes.to_string(),
            netlist[ppin].number.to_string(),
        ))
        .collect();
    conns.sort();
    assert_eq!(conns, vec![
        ("R1".to_string(), "1".to_string()),
        ("R2".to_string(), "1".to_string()),
        ("R3".to_string(), "1".to_string()),
    ]);
}

#[test]
fn sab_empty_context_is_noop() {
    let mut netlist = extract("sab.sch");
    let packages = netlist.packages.clone();
    let nets = netlist.nets.clone();
    let components = netlist.components.clone();

    netlist.process_sab(&[], &SabRegistry::new());

    assert_eq!(netlist.packages, packages);
    assert_eq!(netlist.nets, nets);
    assert_eq!(netlist.components, components);
    assert!(netlist.packages_by_refdes.contains_key("J1"));
}

#[test]
fn sab_unknown_context_is_ignored() {
    let mut netlist = extract("sab.sch");
    netlist.process_sab(&["assembly"], &SabRegistry::new());
    // neither the pcb nor the bom sab-param applies
    assert!(netlist.packages_by_refdes.contains_key("J1"));
    assert_eq!(netlist.nets.len(), 3);
}

#[test]
fn sab_exec_registry() {
    let mut netlist = extract("sab.sch");
    let calls: Rc<RefCell<Vec<(String, String, String)>>> =
        Rc::new(RefCell::new(Vec::new()));

    let mut registry = SabRegistry::new();
    let log = calls.clone();
    registry.register("myscript",
                      move |nl: &mut Netlist, context: &str,
                            comp: CompId, params: &str| {
        log.borrow_mut().push((
            context.to_string(),
            nl[comp].refdes.clone().unwrap().to_string(),
            params.to_string(),
        ));
    });
    netlist.process_sab(&["bom"], &registry);

    assert_eq!(&*calls.borrow(), &[(
        "bom".to_string(),
        "R1".to_string(),
        "extra".to_string(),
    )]);
    // exec leaves the component alone unless the handler acts
    assert!(netlist.packages_by_refdes.contains_key("R1"));
}

#[test]
fn sab_exec_unknown_script_warns_and_skips() {
    let mut netlist = extract("sab.sch");
    // no handler registered: a warning, nothing else
    netlist.process_sab(&["bom"], &SabRegistry::new());
    assert!(netlist.packages_by_refdes.contains_key("R1"));
}

#[test]
fn sab_order_numbers() {
    let mut netlist = extract("saborder.sch");
    let calls: Rc<RefCell<Vec<String>>> = Rc::new(RefCell::new(Vec::new()));

    let mut registry = SabRegistry::new();
    let log = calls.clone();
    registry.register("log", move |nl: &mut Netlist, _: &str,
                             comp: CompId, _: &str| {
        log.borrow_mut().push(
            nl[comp].refdes.clone().unwrap().to_string());
    });
    netlist.process_sab(&["seq"], &registry);

    // ascending order numbers first, unordered entries last
    assert_eq!(&*calls.borrow(),
               &["R2".to_string(), "R1".to_string(), "R3".to_string()]);
}
