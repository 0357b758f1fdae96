//! The source (sub-schematic) library: maps a file name mentioned in
//! a `source=` attribute to a full path.

use std::path::{Path, PathBuf};

/// An ordered list of directories searched for sub-schematics.
#[derive(Debug, Clone, Default)]
pub struct SourceLibrary {
    dirs: Vec<PathBuf>,
}

impl SourceLibrary {
    pub fn new() -> SourceLibrary {
        SourceLibrary::default()
    }

    pub fn add_directory(&mut self, path: impl Into<PathBuf>) {
        let path = path.into();
        if !self.dirs.contains(&path) {
            self.dirs.push(path);
        }
    }

    /// Find the first directory containing `basename` and return the
    /// full path.
    pub fn search_single(&self, basename: impl AsRef<Path>)
                         -> Option<PathBuf> {
        self.dirs.iter()
            .map(|dir| dir.join(basename.as_ref()))
            .find(|path| path.is_file())
    }
}
