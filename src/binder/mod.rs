//==================================================
// File: binder/mod.rs
//==================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Argument binding for native and user routine calls
// Objective: Resolve positional and keyword arguments, detect conflicts and
//            pack variadic tails before any routine body runs
//==================================================

pub mod keywords;
pub mod native;
pub mod user;

use crate::interpreter::errors::EngineResult;
use crate::interpreter::Interpreter;
use crate::symbol::{Scalar, SymbolIndex, SymbolValue};

impl Interpreter {
    /// Evaluate an argument for binding. Anonymous constants are copied so
    /// a callee writing through its argument never alters the program text.
    pub(crate) fn bind_value(&mut self, argument: SymbolIndex) -> EngineResult<SymbolIndex> {
        let value = self.evaluate_argument(argument)?;
        if !value.is_temp() && !self.store.get(value)?.is_named() {
            return self.store.duplicate_to_temp(value);
        }
        Ok(value)
    }

    /// Fresh temp holding a `LONG` flag, used for `/KEY` and `/NOKEY`.
    pub(crate) fn flag_value(&mut self, set: bool) -> EngineResult<SymbolIndex> {
        self.store
            .allocate_temp(SymbolValue::Scalar(Scalar::Long(set as i32)))
    }

    /// Truth of an evaluated keyword value.
    pub(crate) fn keyword_truth(&mut self, value: Option<SymbolIndex>) -> EngineResult<bool> {
        match value {
            None => Ok(true),
            Some(value) => self.condition(value),
        }
    }
}

//==================================================
// End of file
//==================================================
