//==================================================
// File: native/mod.rs
//==================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Process-wide registry of native (built-in) routines
// Objective: Pair every entry point with its keyword descriptor, arity and
//            binding flags, constructed once and read-only afterwards
//==================================================

pub mod kernels;
pub mod library;

use std::collections::HashMap;
use std::fmt;

use once_cell::sync::Lazy;

use crate::binder::keywords::KeywordTable;
use crate::interpreter::errors::{ArityProblem, EngineError, EngineResult};
use crate::interpreter::Interpreter;
use crate::symbol::SymbolIndex;

//==================================================
// Section 1.0 - Routine Records
//==================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NativeId(u16);

impl NativeId {
    pub fn raw(self) -> u16 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NativeKind {
    Subroutine,
    Function,
}

/// Call modifier bits for one native call. Built fresh by the binder from
/// the routine's defaults and the call's mode keywords, then handed to the
/// entry point by value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CallModes(u32);

impl CallModes {
    pub fn new(bits: u32) -> Self {
        Self(bits)
    }

    pub fn bits(self) -> u32 {
        self.0
    }

    pub fn contains(self, mask: u32) -> bool {
        self.0 & mask == mask
    }

    pub fn set(&mut self, mask: u32) {
        self.0 |= mask;
    }

    pub fn clear(&mut self, mask: u32) {
        self.0 &= !mask;
    }
}

/// Dense, positional arguments of one native call.
#[derive(Debug, Clone, PartialEq)]
pub struct NativeArgs {
    pub slots: Vec<Option<SymbolIndex>>,
    pub modes: CallModes,
}

impl NativeArgs {
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn get(&self, slot: usize) -> Option<SymbolIndex> {
        self.slots.get(slot).copied().flatten()
    }

    pub fn require(&self, slot: usize, routine: &str) -> EngineResult<SymbolIndex> {
        self.get(slot).ok_or_else(|| {
            EngineError::arity(
                routine,
                ArityProblem::TooFew {
                    min: slot + 1,
                    given: self.slots.iter().filter(|s| s.is_some()).count(),
                },
            )
        })
    }
}

/// Entry point: returns the result symbol for functions, `None` for
/// subroutines.
pub type NativeFn = fn(&mut Interpreter, &NativeArgs) -> EngineResult<Option<SymbolIndex>>;

pub struct NativeRoutine {
    pub name: &'static str,
    pub kind: NativeKind,
    pub min_args: usize,
    pub max_args: usize,
    pub keywords: KeywordTable,
    pub default_modes: u32,
    /// Plain arguments start filling at this slot.
    pub positional_offset: usize,
    /// Pack plain arguments beyond the last slot into a list in that slot.
    pub variadic: bool,
    /// When false every argument is passed unevaluated.
    pub evaluate_args: bool,
    /// Drop unbound trailing slots before the call.
    pub trim_trailing: bool,
    pub entry: NativeFn,
}

impl NativeRoutine {
    /// `descriptor` uses the keyword-table syntax; the maximum defaults to
    /// the number of named slots.
    pub fn function(name: &'static str, min_args: usize, descriptor: &str, entry: NativeFn) -> Self {
        Self::build(name, NativeKind::Function, min_args, descriptor, entry)
    }

    pub fn subroutine(name: &'static str, min_args: usize, descriptor: &str, entry: NativeFn) -> Self {
        Self::build(name, NativeKind::Subroutine, min_args, descriptor, entry)
    }

    fn build(
        name: &'static str,
        kind: NativeKind,
        min_args: usize,
        descriptor: &str,
        entry: NativeFn,
    ) -> Self {
        let keywords = KeywordTable::parse(descriptor);
        Self {
            name,
            kind,
            min_args,
            max_args: keywords.slot_count(),
            keywords,
            default_modes: 0,
            positional_offset: 0,
            variadic: false,
            evaluate_args: true,
            trim_trailing: false,
            entry,
        }
    }

    pub fn with_max_args(mut self, max_args: usize) -> Self {
        self.max_args = max_args.max(self.keywords.slot_count());
        self
    }

    pub fn with_default_modes(mut self, modes: u32) -> Self {
        self.default_modes = modes;
        self
    }

    pub fn with_offset(mut self, offset: usize) -> Self {
        self.positional_offset = offset;
        self
    }

    pub fn variadic(mut self) -> Self {
        self.variadic = true;
        self
    }

    pub fn unevaluated(mut self) -> Self {
        self.evaluate_args = false;
        self
    }

    pub fn trimmed(mut self) -> Self {
        self.trim_trailing = true;
        self
    }

    pub fn slot_name(&self, slot: usize) -> String {
        self.keywords
            .slot_name(slot)
            .map(str::to_string)
            .unwrap_or_else(|| format!("#{}", slot + 1))
    }
}

impl fmt::Debug for NativeRoutine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeRoutine")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("min_args", &self.min_args)
            .field("max_args", &self.max_args)
            .field("keywords", &self.keywords)
            .finish_non_exhaustive()
    }
}

//==================================================
// Section 2.0 - Registry
//==================================================

#[derive(Debug, Default)]
pub struct NativeRegistry {
    routines: Vec<NativeRoutine>,
    by_name: HashMap<(NativeKind, String), NativeId>,
}

static NATIVES: Lazy<NativeRegistry> = Lazy::new(|| {
    let mut registry = NativeRegistry::default();
    library::register_all(&mut registry);
    registry
});

impl NativeRegistry {
    pub fn global() -> &'static NativeRegistry {
        &NATIVES
    }

    pub fn register(&mut self, routine: NativeRoutine) -> NativeId {
        let key = (routine.kind, routine.name.to_ascii_uppercase());
        if let Some(existing) = self.by_name.get(&key) {
            self.routines[existing.0 as usize] = routine;
            return *existing;
        }
        let id = NativeId(self.routines.len() as u16);
        self.routines.push(routine);
        self.by_name.insert(key, id);
        id
    }

    pub fn get(&self, id: NativeId) -> Option<&NativeRoutine> {
        self.routines.get(id.0 as usize)
    }

    pub fn routine(&self, id: NativeId) -> EngineResult<&NativeRoutine> {
        self.get(id)
            .ok_or_else(|| EngineError::UnknownRoutine(format!("native #{}", id.0)))
    }

    /// Name for diagnostics; unknown ids read as `?`.
    pub fn name_of(&self, id: NativeId) -> &'static str {
        self.get(id).map(|routine| routine.name).unwrap_or("?")
    }

    pub fn lookup(&self, kind: NativeKind, name: &str) -> Option<NativeId> {
        self.by_name
            .get(&(kind, name.to_ascii_uppercase()))
            .copied()
    }

    pub fn names(&self, kind: NativeKind) -> Vec<&'static str> {
        let mut names: Vec<_> = self
            .routines
            .iter()
            .filter(|routine| routine.kind == kind)
            .map(|routine| routine.name)
            .collect();
        names.sort_unstable();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_registry_resolves_functions_and_subroutines_separately() {
        let registry = NativeRegistry::global();
        let total = registry
            .lookup(NativeKind::Function, "total")
            .expect("TOTAL registered");
        assert_eq!(registry.routine(total).expect("routine").name, "TOTAL");
        assert!(registry.lookup(NativeKind::Subroutine, "TOTAL").is_none());
        assert!(registry.lookup(NativeKind::Subroutine, "print").is_some());
    }

    #[test]
    fn call_modes_set_and_clear_bits() {
        let mut modes = CallModes::new(1);
        modes.set(4);
        assert!(modes.contains(5));
        modes.clear(1);
        assert_eq!(modes.bits(), 4);
    }
}

//==================================================
// End of file
//==================================================
