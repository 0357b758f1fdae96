use schnetlist::*;

fn files_dir() -> &'static str {
    concat!(env!("CARGO_MANIFEST_DIR"), "/tests/files")
}

static INIT_LOG: std::sync::Once = std::sync::Once::new();

#[test]
fn tedax_output() {
    INIT_LOG.call_once(clilog::init_stderr_color_debug);
    let mut symbols = SymbolLibrary::new();
    symbols.add_directory(files_dir(), false);
    let sources = SourceLibrary::new();
    let netlist = Netlist::extract(
        &[format!("{}/flat.sch", files_dir())],
        Config::default(), &symbols, &sources
    ).unwrap();
    assert!(!netlist.failed);

    let mut out = Vec::new();
    tedax::run(&mut out, &netlist).unwrap();
    assert_eq!(String::from_utf8(out).unwrap(), "\
tEDAx v1
begin netlist v1 netlist
footprint R1 R0805
value R1 10k
pinidx R1 1 1
pinidx R1 2 2
pinidx R2 1 1
pinidx R2 2 2
conn VCC R1 1
conn VCC R2 1
end netlist
");
}

#[test]
fn tedax_after_sab() {
    INIT_LOG.call_once(clilog::init_stderr_color_debug);
    let mut symbols = SymbolLibrary::new();
    symbols.add_directory(files_dir(), false);
    let sources = SourceLibrary::new();
    let mut netlist = Netlist::extract(
        &[format!("{}/sab.sch", files_dir())],
        Config::default(), &symbols, &sources
    ).unwrap();
    netlist.process_sab(&["pcb"], &SabRegistry::new());

    let mut out = Vec::new();
    tedax::run(&mut out, &netlist).unwrap();
    let text = String::from_utf8(out).unwrap();
    // the discarded jumper must not leave stale connection lines
    assert!(!text.contains("J1"));
    assert!(text.contains("conn SIG R1 1\n"));
    assert!(text.contains("conn SIG R2 1\n"));
    assert!(text.contains("conn SIG R3 1\n"));
}
