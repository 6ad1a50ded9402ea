//==================================================
// File: interpreter/scope.rs
//==================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Scope guard for temporary symbols
// Objective: Record the temp high-water mark on entry and reclaim every
//            unkept temp above it when the guard drops, on every path
//==================================================

use std::ops::{Deref, DerefMut};

use crate::interpreter::Interpreter;
use crate::symbol::{SymbolIndex, TempMark};

/// Borrowing guard over the interpreter. Everything allocated in the temp
/// region while the guard lives is swept when it drops, except symbols
/// handed to [`TempScope::keep`], pinned symbols, and whatever those reach.
pub struct TempScope<'a> {
    interp: &'a mut Interpreter,
    mark: TempMark,
    kept: Vec<SymbolIndex>,
}

impl<'a> TempScope<'a> {
    pub fn new(interp: &'a mut Interpreter) -> Self {
        let mark = interp.store.temp_mark();
        Self {
            interp,
            mark,
            kept: Vec::new(),
        }
    }

    pub fn mark(&self) -> TempMark {
        self.mark
    }

    /// Exempt `index` from this scope's sweep; it now belongs to the
    /// enclosing scope.
    pub fn keep(&mut self, index: SymbolIndex) {
        self.kept.push(index);
    }

    /// Keep `index` and hand it back, for `scope.finish(result)` tails.
    pub fn finish(mut self, index: SymbolIndex) -> SymbolIndex {
        self.keep(index);
        index
    }
}

impl Deref for TempScope<'_> {
    type Target = Interpreter;

    fn deref(&self) -> &Interpreter {
        self.interp
    }
}

impl DerefMut for TempScope<'_> {
    fn deref_mut(&mut self) -> &mut Interpreter {
        self.interp
    }
}

impl Drop for TempScope<'_> {
    fn drop(&mut self) {
        self.interp.store.sweep_since(self.mark, &self.kept);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbol::{Scalar, SymbolValue};

    #[test]
    fn dropping_a_scope_returns_to_its_mark() {
        let mut interp = Interpreter::default();
        let before = interp.store.temp_top();
        {
            let mut scope = TempScope::new(&mut interp);
            for value in 0..4 {
                scope
                    .store
                    .allocate_temp(SymbolValue::Scalar(Scalar::Long(value)))
                    .expect("temp");
            }
        }
        assert_eq!(interp.store.temp_top(), before);
    }

    #[test]
    fn kept_symbols_survive_into_the_outer_scope() {
        let mut interp = Interpreter::default();
        let outer = interp.store.temp_mark();
        let kept = {
            let mut scope = TempScope::new(&mut interp);
            let scratch = scope
                .store
                .allocate_temp(SymbolValue::Scalar(Scalar::Long(1)))
                .expect("scratch");
            let result = scope
                .store
                .allocate_temp(SymbolValue::Scalar(Scalar::Long(2)))
                .expect("result");
            assert!(scope.store.contains(scratch));
            scope.finish(result)
        };
        assert!(interp.store.contains(kept));
        assert_eq!(interp.store.live_temps(), 1);
        interp.store.sweep_since(outer, &[]);
        assert!(!interp.store.contains(kept));
    }
}

//==================================================
// End of file
//==================================================
