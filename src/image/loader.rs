//==================================================
// File: image/loader.rs
//==================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Locate and read program image files
// Objective: Resolve routine names and include paths against the search
//            roots with caching, and read/write JSON or bincode images
//==================================================

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::ProgramImage;
use crate::interpreter::errors::{EngineError, EngineResult};

/// Extensions tried, in order, when locating a routine by name.
const IMAGE_EXTENSIONS: [&str; 2] = ["evb", "json"];

#[derive(Debug, Clone, Default)]
pub struct ImageLoader {
    roots: Vec<PathBuf>,
    cache: HashMap<String, PathBuf>,
    included: HashSet<PathBuf>,
}

impl ImageLoader {
    pub fn new(roots: Vec<PathBuf>) -> Self {
        Self {
            roots,
            cache: HashMap::new(),
            included: HashSet::new(),
        }
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    pub fn add_root(&mut self, root: impl Into<PathBuf>) {
        let root = root.into();
        if !self.roots.contains(&root) {
            self.roots.push(root);
            self.cache.clear();
        }
    }

    /// Find `<name>.evb` or `<name>.json` (lower-cased name) on the roots.
    pub fn locate_routine(&mut self, name: &str) -> Option<PathBuf> {
        let key = name.to_ascii_lowercase();
        if let Some(path) = self.cache.get(&key) {
            return Some(path.clone());
        }
        let found = self.roots.iter().find_map(|root| {
            IMAGE_EXTENSIONS
                .iter()
                .map(|ext| root.join(format!("{key}.{ext}")))
                .find(|candidate| candidate.is_file())
        })?;
        debug!(routine = %key, path = %found.display(), "located deferred routine");
        self.cache.insert(key, found.clone());
        Some(found)
    }

    /// Resolve an include path: absolute paths as given, relative ones
    /// against each root in turn.
    pub fn locate_file(&self, path: &str) -> Option<PathBuf> {
        let candidate = Path::new(path);
        if candidate.is_absolute() {
            return candidate.is_file().then(|| candidate.to_path_buf());
        }
        self.roots
            .iter()
            .map(|root| root.join(candidate))
            .find(|joined| joined.is_file())
    }

    /// Record an include; returns `false` if the file was included before.
    pub fn mark_included(&mut self, path: &Path) -> bool {
        let canonical = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        self.included.insert(canonical)
    }
}

//==================================================
// Section 2.0 - Reading & Writing
//==================================================

fn is_compiled(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("evb"))
}

/// Read a `.evb` (bincode) or any other (JSON) image file.
pub fn read_image(path: &Path) -> EngineResult<ProgramImage> {
    let bytes = fs::read(path).map_err(|error| EngineError::io(path.display(), error))?;
    if is_compiled(path) {
        bincode::deserialize(&bytes)
            .map_err(|error| EngineError::Image(format!("{}: {error}", path.display())))
    } else {
        serde_json::from_slice(&bytes)
            .map_err(|error| EngineError::Image(format!("{}: {error}", path.display())))
    }
}

pub fn write_image(path: &Path, image: &ProgramImage) -> EngineResult<()> {
    let bytes = if is_compiled(path) {
        bincode::serialize(image).map_err(|error| EngineError::Image(error.to_string()))?
    } else {
        serde_json::to_vec_pretty(image).map_err(|error| EngineError::Image(error.to_string()))?
    };
    fs::write(path, bytes).map_err(|error| EngineError::io(path.display(), error))
}


//==================================================
// End of file
//==================================================
