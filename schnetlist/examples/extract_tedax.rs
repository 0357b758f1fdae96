use std::env;
use schnetlist::{Config, Netlist, SabRegistry, SourceLibrary,
                 SymbolLibrary, tedax};

// exit codes: 0 ok; 1 load failure; 2 netlist errors; 3 backend failure
fn main() {
    clilog::init_stderr_color_debug();
    let args: Vec<String> = env::args().collect();
    assert!(args.len() >= 3,
            "Usage: {} <symbol_dir> <schematic_path>... \
             [--sab-context=c1,c2]", args[0]);

    let mut symbols = SymbolLibrary::new();
    symbols.add_directory(args[1].as_str(), true);
    let mut sources = SourceLibrary::new();
    sources.add_directory(args[1].as_str());

    let mut sab_contexts: Vec<String> = Vec::new();
    let mut filenames: Vec<&String> = Vec::new();
    for arg in &args[2..] {
        match arg.strip_prefix("--sab-context=") {
            Some("none") => sab_contexts.clear(),
            Some(list) => sab_contexts.extend(
                list.split(',').map(|c| c.to_string())),
            None => filenames.push(arg),
        }
    }

    let mut netlist = match Netlist::extract(
        &filenames, Config::default(), &symbols, &sources)
    {
        Ok(netlist) => netlist,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };
    if netlist.failed {
        std::process::exit(2);
    }

    if !sab_contexts.is_empty() {
        let contexts: Vec<&str> =
            sab_contexts.iter().map(|c| c.as_str()).collect();
        netlist.process_sab(&contexts, &SabRegistry::new());
    }

    let mut stdout = std::io::stdout();
    if let Err(e) = tedax::run(&mut stdout, &netlist) {
        eprintln!("{}", e);
        std::process::exit(3);
    }
}
