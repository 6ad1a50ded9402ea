//==================================================
// File: interpreter/mod.rs
//==================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: The interpreter value that owns every piece of engine state
// Objective: Tie the symbol store, native registry, configuration, debug
//            state and output sink together behind a small public API
//==================================================

pub mod errors;
pub mod scope;

use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::config::EngineConfig;
use crate::exec::debug::{DebugHook, DebugState, StepMode};
use crate::image::loader::{read_image, ImageLoader};
use crate::image::{Expr, ProgramImage, Stmt};
use crate::native::NativeRegistry;
use crate::symbol::{
    ArrayValue, Context, Namespace, Scalar, SymbolIndex, SymbolStore, SymbolValue,
};

use errors::{EngineError, EngineResult, ScriptError};
pub use scope::TempScope;

//==================================================
// Section 1.0 - State
//==================================================

/// Per-call state saved and restored around every nested call so a callee
/// cannot leak it into its caller's continuation.
#[derive(Debug, Clone, Default)]
pub(crate) struct ExecState {
    pub nesting: usize,
    pub line: u32,
    pub pending_return: Option<SymbolIndex>,
    pub return_all: bool,
    pub trace: bool,
}

/// Where `PRINT` output goes.
#[derive(Debug, Clone, Default)]
pub enum Output {
    #[default]
    Stdout,
    Capture(Arc<Mutex<String>>),
}

/// Outcome of running a program image.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunReport {
    pub statements: usize,
    pub errors: Vec<ScriptError>,
    pub returned_all: bool,
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }
}

pub struct Interpreter {
    pub(crate) store: SymbolStore,
    pub(crate) natives: &'static NativeRegistry,
    pub(crate) config: EngineConfig,
    pub(crate) state: ExecState,
    pub(crate) debug: DebugState,
    pub(crate) hook: Option<Box<dyn DebugHook>>,
    pub(crate) output: Output,
    pub(crate) loader: ImageLoader,
    /// Line of the innermost statement that raised the current error.
    pub(crate) fault_line: Option<u32>,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl Interpreter {
    pub fn new(config: EngineConfig) -> Self {
        let loader = ImageLoader::new(config.include_paths.clone());
        let state = ExecState {
            trace: config.trace,
            ..ExecState::default()
        };
        Self {
            store: SymbolStore::new(),
            natives: NativeRegistry::global(),
            config,
            state,
            debug: DebugState::default(),
            hook: None,
            output: Output::Stdout,
            loader,
            fault_line: None,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &SymbolStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut SymbolStore {
        &mut self.store
    }

    //==================================================
    // Section 2.0 - Debugging & Output
    //==================================================

    pub fn set_debug_hook(&mut self, hook: Box<dyn DebugHook>) {
        self.hook = Some(hook);
    }

    pub fn add_breakpoint(&mut self, line: u32) {
        self.debug.breakpoints.insert(line);
    }

    /// Pause before the first statement.
    pub fn start_stepping(&mut self) {
        self.debug.mode = StepMode::Step;
    }

    /// Redirect `PRINT` into a shared buffer and return it.
    pub fn capture_output(&mut self) -> Arc<Mutex<String>> {
        let buffer = Arc::new(Mutex::new(String::new()));
        self.output = Output::Capture(buffer.clone());
        buffer
    }

    pub(crate) fn write_output(&mut self, text: &str) {
        match &self.output {
            Output::Stdout => println!("{text}"),
            Output::Capture(buffer) => {
                let mut buffer = buffer.lock();
                buffer.push_str(text);
                buffer.push('\n');
            }
        }
    }

    //==================================================
    // Section 3.0 - Variables
    //==================================================

    /// Context a variable name lives in when referenced from `scope`.
    pub(crate) fn variable_context(name: &str, scope: Context) -> Context {
        if name.starts_with('$') {
            Context::Global
        } else {
            scope
        }
    }

    pub fn variable(&self, name: &str) -> Option<SymbolIndex> {
        self.store
            .lookup(Namespace::Variable, Context::Global, name)
    }

    /// Value of a global variable, following transfers.
    pub fn value(&self, name: &str) -> Option<&SymbolValue> {
        let index = self.variable(name)?;
        let resolved = self.store.resolve(index).ok()?;
        self.store.value(resolved).ok()
    }

    pub fn scalar(&self, name: &str) -> Option<Scalar> {
        match self.value(name)? {
            SymbolValue::Scalar(scalar) => Some(*scalar),
            _ => None,
        }
    }

    pub fn array(&self, name: &str) -> Option<&ArrayValue> {
        match self.value(name)? {
            SymbolValue::Array(array) => Some(array),
            _ => None,
        }
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        match self.value(name)? {
            SymbolValue::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn set_variable(&mut self, name: &str, value: SymbolValue) -> EngineResult<SymbolIndex> {
        self.store
            .define(Namespace::Variable, Context::Global, name, value)
    }

    //==================================================
    // Section 4.0 - Running Programs
    //==================================================

    /// Compile and run an image. Routine definitions are kept; the main
    /// statements are freed afterwards. A failing statement is recorded and
    /// execution continues with the next one.
    pub fn run_image(&mut self, image: &ProgramImage) -> EngineResult<RunReport> {
        let owner = self.store.allocate(Context::Global, SymbolValue::Undefined)?;
        let result = self.run_owned(image, owner);
        self.release_owner(owner);
        result
    }

    fn run_owned(&mut self, image: &ProgramImage, owner: SymbolIndex) -> EngineResult<RunReport> {
        self.compile_routines(&image.routines)?;
        let statements = self.compile_statements(&image.main, Context::Routine(owner), Context::Global)?;
        let mut report = RunReport::default();
        for statement in statements {
            report.statements += 1;
            self.fault_line = None;
            let outcome = self.execute(statement);
            self.state.return_all = false;
            self.clear_pending_return();
            match outcome {
                Ok(flow) => {
                    if flow == errors::Flow::ReturnAll {
                        report.returned_all = true;
                    }
                }
                Err(EngineError::Aborted) => {
                    report.errors.push(ScriptError::new(&EngineError::Aborted, self.fault_line));
                    break;
                }
                Err(error) => {
                    warn!(line = self.fault_line, %error, "statement failed");
                    report.errors.push(ScriptError::new(&error, self.fault_line));
                }
            }
        }
        Ok(report)
    }

    pub fn run_file(&mut self, path: &Path) -> EngineResult<RunReport> {
        let image = read_image(path)?;
        self.run_image(&image)
    }

    /// Define the image's routines without running anything.
    pub fn load_image(&mut self, image: &ProgramImage) -> EngineResult<()> {
        self.compile_routines(&image.routines)
    }

    /// Evaluate an expression image at main level and return a copy of its
    /// value. Every temporary is reclaimed before returning.
    pub fn eval(&mut self, expr: &Expr) -> EngineResult<SymbolValue> {
        let owner = self.store.allocate(Context::Global, SymbolValue::Undefined)?;
        let result = self.eval_owned(expr, owner);
        self.release_owner(owner);
        result
    }

    fn eval_owned(&mut self, expr: &Expr, owner: SymbolIndex) -> EngineResult<SymbolValue> {
        let compiled = self.compile_expr(expr, Context::Routine(owner), Context::Global)?;
        let mut scope = TempScope::new(self);
        let index = scope.evaluate(compiled)?;
        let resolved = scope.store.resolve(index)?;
        Ok(scope.store.value(resolved)?.clone())
    }

    /// Compile one statement under a scratch owner and execute it.
    pub fn execute_inserted(&mut self, statement: &Stmt) -> EngineResult<errors::Flow> {
        let owner = self.store.allocate(Context::Global, SymbolValue::Undefined)?;
        let result = self
            .compile_statement(statement, Context::Routine(owner), Context::Global)
            .and_then(|compiled| self.execute(compiled));
        self.release_owner(owner);
        result
    }

    pub(crate) fn release_owner(&mut self, owner: SymbolIndex) {
        let freed = self.store.free_context(Context::Routine(owner));
        let _ = self.store.free(owner);
        debug!(freed, "released compiled statements");
    }

    //==================================================
    // Section 5.0 - Call Frames
    //==================================================

    /// Run `body` one nesting level deeper, failing past `max_depth`.
    pub(crate) fn nested<T>(
        &mut self,
        body: impl FnOnce(&mut Self) -> EngineResult<T>,
    ) -> EngineResult<T> {
        if self.state.nesting >= self.config.max_depth {
            return Err(EngineError::RecursionLimit(self.config.max_depth));
        }
        self.state.nesting += 1;
        let result = body(self);
        self.state.nesting -= 1;
        result
    }

    /// Save the per-call state, run `body`, and restore it. `return_all`
    /// survives so it keeps unwinding.
    pub(crate) fn with_call_frame<T>(
        &mut self,
        body: impl FnOnce(&mut Self) -> EngineResult<T>,
    ) -> EngineResult<T> {
        let saved = self.state.clone();
        let result = body(self);
        let return_all = self.state.return_all;
        self.state = ExecState {
            return_all,
            ..saved
        };
        result
    }
}

//==================================================
// End of file
//==================================================
