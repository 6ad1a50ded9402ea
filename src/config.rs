//==================================================
// File: config.rs
//==================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Engine configuration with TOML loading and defaults
// Objective: Hold the knobs of the execution engine and resolve them from
//            an explicit file, the user config directory or defaults
//==================================================

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::symbol::Combine;

/// File name looked up under `<config dir>/orrery/`.
const CONFIG_FILE: &str = "config.toml";

pub const DEFAULT_MAX_DEPTH: usize = 256;
pub const DEFAULT_STACK_BYTES: usize = 16 * 1024 * 1024;
pub const MIN_STACK_BYTES: usize = 256 * 1024;

//==================================================
// Section 1.0 - Config Model
//==================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Maximum statement nesting before execution fails.
    pub max_depth: usize,
    /// Echo every executed statement at `info` level.
    pub trace: bool,
    /// Allow the contiguous bulk-copy path for subscripted assignment.
    pub fast_insert: bool,
    /// Search roots for included files and deferred routines.
    pub include_paths: Vec<PathBuf>,
    /// Stack size of the interpreter thread spawned by the CLI.
    pub stack_bytes: usize,
    /// Combination policy for assignments that do not name one.
    pub combine: Combine,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            trace: false,
            fast_insert: true,
            include_paths: vec![PathBuf::from(".")],
            stack_bytes: DEFAULT_STACK_BYTES,
            combine: Combine::Outer,
        }
    }
}

impl EngineConfig {
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth.max(1);
        self
    }

    pub fn with_trace(mut self, trace: bool) -> Self {
        self.trace = trace;
        self
    }

    pub fn with_fast_insert(mut self, enabled: bool) -> Self {
        self.fast_insert = enabled;
        self
    }

    pub fn with_include_path(mut self, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        if !self.include_paths.contains(&path) {
            self.include_paths.push(path);
        }
        self
    }

    pub fn with_stack_bytes(mut self, bytes: usize) -> Self {
        self.stack_bytes = bytes.max(MIN_STACK_BYTES);
        self
    }

    pub fn with_combine(mut self, combine: Combine) -> Self {
        self.combine = combine;
        self
    }

    //==================================================
    // Section 2.0 - Loading
    //==================================================

    pub fn from_toml_str(text: &str) -> anyhow::Result<Self> {
        let config: Self = toml::from_str(text).context("parsing engine configuration")?;
        Ok(config.normalized())
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading configuration from {}", path.display()))?;
        Self::from_toml_str(&text)
            .with_context(|| format!("parsing configuration {}", path.display()))
    }

    /// Explicit path if given, else the user config file when it exists,
    /// else defaults.
    pub fn load(explicit: Option<&Path>) -> anyhow::Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        match Self::default_path() {
            Some(path) if path.exists() => Self::from_file(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("orrery").join(CONFIG_FILE))
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    fn normalized(mut self) -> Self {
        self.max_depth = self.max_depth.max(1);
        self.stack_bytes = self.stack_bytes.max(MIN_STACK_BYTES);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_toml_keeps_defaults_for_missing_keys() {
        let config = EngineConfig::from_toml_str("max_depth = 32\ncombine = \"inner\"\n")
            .expect("parse config");
        assert_eq!(config.max_depth, 32);
        assert_eq!(config.combine, Combine::Inner);
        assert!(config.fast_insert);
        assert_eq!(config.stack_bytes, DEFAULT_STACK_BYTES);
    }

    #[test]
    fn stack_size_is_clamped_to_the_minimum() {
        let config = EngineConfig::default().with_stack_bytes(1024);
        assert_eq!(config.stack_bytes, MIN_STACK_BYTES);
        let parsed = EngineConfig::from_toml_str("stack_bytes = 10").expect("parse");
        assert_eq!(parsed.stack_bytes, MIN_STACK_BYTES);
    }

    #[test]
    fn rejects_malformed_toml() {
        assert!(EngineConfig::from_toml_str("max_depth = [").is_err());
    }
}

//==================================================
// End of file
//==================================================
