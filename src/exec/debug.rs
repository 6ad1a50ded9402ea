//==================================================
// File: exec/debug.rs
//==================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Interactive pause points for the statement dispatcher
// Objective: Decide when to pause, hand control to a DebugHook and apply
//            the single-character command it answers with
//==================================================

use std::collections::{BTreeSet, VecDeque};
use std::io::{self, BufRead, Write};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::image::Stmt;
use crate::interpreter::errors::{EngineError, EngineResult};
use crate::interpreter::Interpreter;

//==================================================
// Section 1.0 - Commands & Hooks
//==================================================

#[derive(Debug, Clone, PartialEq)]
pub enum DebugCommand {
    /// Pause again at the next statement, at any depth.
    Step,
    /// Pause at the next statement at this depth or shallower.
    Next,
    /// Run until the line (or the next breakpoint when `None`).
    ContinueTo(Option<u32>),
    ToggleStatus,
    ShowLocation,
    /// Compile and run one statement, then pause again.
    Execute(Box<Stmt>),
    Abort,
}

impl DebugCommand {
    /// Parse a command character with its optional argument: `c 12` runs to
    /// line 12, `x {json}` executes a statement image.
    pub fn from_char(command: char, argument: Option<&str>) -> Option<Self> {
        let argument = argument.map(str::trim).filter(|arg| !arg.is_empty());
        match command.to_ascii_lowercase() {
            's' => Some(DebugCommand::Step),
            'n' => Some(DebugCommand::Next),
            'c' => Some(DebugCommand::ContinueTo(
                argument.and_then(|arg| arg.parse().ok()),
            )),
            't' => Some(DebugCommand::ToggleStatus),
            'w' => Some(DebugCommand::ShowLocation),
            'x' => {
                let statement: Stmt = serde_json::from_str(argument?).ok()?;
                Some(DebugCommand::Execute(Box::new(statement)))
            }
            'q' => Some(DebugCommand::Abort),
            _ => None,
        }
    }

    pub fn parse_line(line: &str) -> Option<Self> {
        let line = line.trim();
        let mut chars = line.chars();
        let command = chars.next()?;
        DebugCommand::from_char(command, Some(chars.as_str()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PauseInfo {
    pub line: u32,
    pub nesting: usize,
    pub node: &'static str,
    pub status: Option<String>,
}

pub trait DebugHook: Send {
    fn pause(&mut self, info: &PauseInfo) -> DebugCommand;

    fn report(&mut self, message: &str) {
        let _ = message;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StepMode {
    #[default]
    Run,
    Step,
    Next {
        depth: usize,
    },
    RunTo(u32),
}

#[derive(Debug, Clone, Default)]
pub struct DebugState {
    pub mode: StepMode,
    pub breakpoints: BTreeSet<u32>,
    pub show_status: bool,
}

impl DebugState {
    fn should_pause(&self, line: u32, nesting: usize) -> bool {
        match self.mode {
            StepMode::Run => self.breakpoints.contains(&line),
            StepMode::Step => true,
            StepMode::Next { depth } => nesting <= depth || self.breakpoints.contains(&line),
            StepMode::RunTo(target) => line == target || self.breakpoints.contains(&line),
        }
    }
}

//==================================================
// Section 2.0 - Hook Implementations
//==================================================

/// Replays a shared queue of commands; continues freely once it runs dry.
/// Everything reported and every pause is appended to `log`.
#[derive(Debug, Clone, Default)]
pub struct ScriptedDebugger {
    pub commands: Arc<Mutex<VecDeque<DebugCommand>>>,
    pub log: Arc<Mutex<Vec<String>>>,
}

impl ScriptedDebugger {
    pub fn new(commands: impl IntoIterator<Item = DebugCommand>) -> Self {
        Self {
            commands: Arc::new(Mutex::new(commands.into_iter().collect())),
            log: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl DebugHook for ScriptedDebugger {
    fn pause(&mut self, info: &PauseInfo) -> DebugCommand {
        self.log
            .lock()
            .push(format!("pause {} line {} depth {}", info.node, info.line, info.nesting));
        self.commands
            .lock()
            .pop_front()
            .unwrap_or(DebugCommand::ContinueTo(None))
    }

    fn report(&mut self, message: &str) {
        self.log.lock().push(message.to_string());
    }
}

/// Reads one command per line from standard input.
#[derive(Debug, Default)]
pub struct StdinDebugger;

impl DebugHook for StdinDebugger {
    fn pause(&mut self, info: &PauseInfo) -> DebugCommand {
        let stdin = io::stdin();
        loop {
            let mut stderr = io::stderr();
            let _ = write!(stderr, "[line {} {}] dbg> ", info.line, info.node);
            if let Some(status) = &info.status {
                let _ = write!(stderr, "({status}) ");
            }
            let _ = stderr.flush();
            let mut line = String::new();
            match stdin.lock().read_line(&mut line) {
                Ok(0) | Err(_) => return DebugCommand::ContinueTo(None),
                Ok(_) => {}
            }
            match DebugCommand::parse_line(&line) {
                Some(command) => return command,
                None => eprintln!("commands: s n c[line] t w x<json> q"),
            }
        }
    }

    fn report(&mut self, message: &str) {
        eprintln!("{message}");
    }
}

//==================================================
// Section 3.0 - Dispatcher Checkpoint
//==================================================

impl Interpreter {
    /// Pause point consulted before every statement. Inserted statements
    /// run with the hook detached so they never pause themselves.
    pub(crate) fn debug_checkpoint(&mut self, line: u32, node: &'static str) -> EngineResult<()> {
        if self.hook.is_none() || !self.debug.should_pause(line, self.state.nesting) {
            return Ok(());
        }
        let Some(mut hook) = self.hook.take() else {
            return Ok(());
        };
        let result = self.debug_session(hook.as_mut(), line, node);
        self.hook = Some(hook);
        result
    }

    fn debug_session(
        &mut self,
        hook: &mut dyn DebugHook,
        line: u32,
        node: &'static str,
    ) -> EngineResult<()> {
        loop {
            let info = PauseInfo {
                line,
                nesting: self.state.nesting,
                node,
                status: self.debug.show_status.then(|| self.status_line()),
            };
            let command = hook.pause(&info);
            debug!(?command, line, "debugger command");
            match command {
                DebugCommand::Step => {
                    self.debug.mode = StepMode::Step;
                    return Ok(());
                }
                DebugCommand::Next => {
                    self.debug.mode = StepMode::Next {
                        depth: self.state.nesting,
                    };
                    return Ok(());
                }
                DebugCommand::ContinueTo(target) => {
                    self.debug.mode = target.map_or(StepMode::Run, StepMode::RunTo);
                    return Ok(());
                }
                DebugCommand::ToggleStatus => {
                    self.debug.show_status = !self.debug.show_status;
                }
                DebugCommand::ShowLocation => {
                    hook.report(&format!(
                        "line {line} in {node}, nesting {}",
                        self.state.nesting
                    ));
                }
                DebugCommand::Execute(statement) => {
                    if let Err(error) = self.execute_inserted(&statement) {
                        hook.report(&format!("inserted statement failed: {error}"));
                    }
                }
                DebugCommand::Abort => return Err(EngineError::Aborted),
            }
        }
    }

    fn status_line(&self) -> String {
        format!(
            "temps {} / top {}, symbols {}",
            self.store.live_temps(),
            self.store.temp_top(),
            self.store.permanent_count()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_characters_parse_with_arguments() {
        assert_eq!(DebugCommand::from_char('s', None), Some(DebugCommand::Step));
        assert_eq!(
            DebugCommand::parse_line("c 42"),
            Some(DebugCommand::ContinueTo(Some(42)))
        );
        assert_eq!(DebugCommand::parse_line("c"), Some(DebugCommand::ContinueTo(None)));
        assert_eq!(DebugCommand::parse_line("Q"), Some(DebugCommand::Abort));
        assert!(DebugCommand::parse_line("z").is_none());
        assert!(DebugCommand::parse_line("x not-json").is_none());
        assert!(matches!(
            DebugCommand::parse_line(r#"x {"line": 1, "kind": "break"}"#),
            Some(DebugCommand::Execute(_))
        ));
    }

    #[test]
    fn next_mode_pauses_only_at_or_above_its_depth() {
        let state = DebugState {
            mode: StepMode::Next { depth: 2 },
            ..DebugState::default()
        };
        assert!(state.should_pause(10, 2));
        assert!(state.should_pause(10, 1));
        assert!(!state.should_pause(10, 3));
    }
}

//==================================================
// End of file
//==================================================
