//==================================================
// File: lib.rs
//==================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Orrery library root
// Objective: Expose the execution engine of the array language: symbol
//            store, binder, dispatcher, subscript engine, native library and
//            program images
//==================================================

pub mod binder;
pub mod config;
pub mod exec;
pub mod image;
pub mod interpreter;
pub mod logging;
pub mod native;
pub mod subscript;
pub mod symbol;

pub use config::EngineConfig;
pub use exec::debug::{DebugCommand, DebugHook, PauseInfo, ScriptedDebugger, StdinDebugger};
pub use image::{Arg, Expr, ProgramImage, RoutineImage, Stmt};
pub use interpreter::errors::{EngineError, EngineResult, ErrorCode, ScriptError};
pub use interpreter::{Interpreter, RunReport, TempScope};
pub use symbol::{
    ArrayData, ArrayValue, NumericType, Scalar, SymbolClass, SymbolIndex, SymbolValue,
};

//==================================================
// End of file
//==================================================
