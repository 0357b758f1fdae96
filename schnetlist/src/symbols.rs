//! The component (symbol) library.
//!
//! Symbols are looked up by basename in an ordered list of directory
//! sources and cached for the lifetime of the library.  The library
//! is initialized before loading starts and is read-only during
//! extraction (the cache is interior).

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use compact_str::CompactString;
use schparse::Revision;
use crate::attrib::Attributes;

/// A parsed symbol file.
#[derive(Debug)]
pub struct Symbol {
    pub basename: CompactString,
    pub rev: Revision,
    /// Floating attributes of the symbol file; this is the inherited
    /// attribute scope of every component instantiating the symbol.
    pub floating: Attributes,
}

#[derive(Debug, Clone)]
pub enum SymbolLookupError {
    /// No source directory contains the symbol.
    NotFound(CompactString),
    /// More than one source directory contains the symbol.
    Duplicate(CompactString),
    /// The symbol file exists but could not be read or parsed.
    Read(CompactString, String),
}

impl std::fmt::Display for SymbolLookupError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        use SymbolLookupError::*;
        match self {
            NotFound(b) =>
                write!(f, "symbol \"{}\" not found in library", b),
            Duplicate(b) =>
                write!(f, "multiple symbols \"{}\" found in library", b),
            Read(b, e) =>
                write!(f, "error while loading symbol \"{}\": {}", b, e),
        }
    }
}

/// The symbol lookup service.
#[derive(Debug, Default)]
pub struct SymbolLibrary {
    sources: Vec<(PathBuf, bool)>,
    cache: RefCell<HashMap<CompactString, Arc<Symbol>>>,
}

impl SymbolLibrary {
    pub fn new() -> SymbolLibrary {
        SymbolLibrary::default()
    }

    /// Add a directory source.  With `recursive`, subdirectories are
    /// searched as well.
    pub fn add_directory(&mut self, path: impl Into<PathBuf>,
                         recursive: bool) {
        self.sources.push((path.into(), recursive));
    }

    /// Look up a symbol by basename, loading and caching it on first
    /// use.
    pub fn lookup(&self, basename: &str)
                  -> Result<Arc<Symbol>, SymbolLookupError> {
        if let Some(symbol) = self.cache.borrow().get(basename) {
            return Ok(symbol.clone())
        }

        let mut matches = Vec::new();
        for (dir, recursive) in &self.sources {
            find_symbol_file(dir, *recursive, basename, &mut matches);
        }
        if matches.len() > 1 {
            return Err(SymbolLookupError::Duplicate(basename.into()))
        }
        let path = match matches.pop() {
            Some(p) => p,
            None => return Err(
                SymbolLookupError::NotFound(basename.into())),
        };

        let rev = Revision::read(&path).map_err(
            |e| SymbolLookupError::Read(basename.into(), e.to_string()))?;
        let symbol = Arc::new(Symbol {
            basename: basename.into(),
            floating: Attributes::from_floating(&rev),
            rev,
        });
        self.cache.borrow_mut()
            .insert(basename.into(), symbol.clone());
        Ok(symbol)
    }
}

fn find_symbol_file(dir: &Path, recursive: bool, basename: &str,
                    matches: &mut Vec<PathBuf>) {
    let entries = match std::fs::read_dir(dir) {
        Ok(e) => e,
        Err(_) => return
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            if recursive {
                find_symbol_file(&path, true, basename, matches);
            }
        } else if path.file_name()
            .map(|n| n == basename)
            .unwrap_or(false)
        {
            matches.push(path);
        }
    }
}
