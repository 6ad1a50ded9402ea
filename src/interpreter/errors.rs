//==================================================
// File: interpreter/errors.rs
//==================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Error taxonomy and control signals of the execution engine
// Objective: Give every failure a kind, a stable code and a user-facing record
//==================================================

use thiserror::Error;

use crate::symbol::{SymbolClass, SymbolIndex};

pub type EngineResult<T> = Result<T, EngineError>;

//==================================================
// Section 1.0 - Control Signals
//==================================================

/// Completion of a statement. Control signals travel back up through every
/// enclosing construct as ordinary values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Normal,
    Break,
    Continue,
    Return,
    ReturnAll,
}

impl Flow {
    pub fn is_normal(self) -> bool {
        self == Flow::Normal
    }
}

//==================================================
// Section 2.0 - Engine Errors
//==================================================

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArityProblem {
    #[error("expected at least {min} arguments, got {given}")]
    TooFew { min: usize, given: usize },
    #[error("accepts at most {max} arguments, got {given}")]
    TooMany { max: usize, given: usize },
    #[error("argument '{slot}' bound more than once")]
    Duplicate { slot: String },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("{what} is a {class}, expected {expected}")]
    IllegalClass {
        what: String,
        class: SymbolClass,
        expected: &'static str,
    },
    #[error("illegal subscript: {0}")]
    IllegalSubscript(String),
    #[error("{routine}: {problem}")]
    Arity {
        routine: String,
        problem: ArityProblem,
    },
    #[error("allocation failed: {0}")]
    Allocation(String),
    #[error("i/o error on {path}: {message}")]
    Io { path: String, message: String },
    #[error("{routine} does not accept keyword '{keyword}'")]
    UnknownKeyword { routine: String, keyword: String },
    #[error("{operation} is not defined for type {ty}")]
    TypeUnsupported { operation: String, ty: String },
    #[error("arithmetic error: {0}")]
    Arithmetic(String),
    #[error("stale symbol handle {0}")]
    StaleSymbol(SymbolIndex),
    #[error("routine '{0}' could not be located")]
    UnknownRoutine(String),
    #[error("execution nesting exceeded {0} levels")]
    RecursionLimit(usize),
    #[error("program image: {0}")]
    Image(String),
    #[error("execution aborted")]
    Aborted,
}

impl EngineError {
    pub fn io(path: impl std::fmt::Display, error: impl std::fmt::Display) -> Self {
        EngineError::Io {
            path: path.to_string(),
            message: error.to_string(),
        }
    }

    pub fn unsupported(operation: impl Into<String>, ty: impl std::fmt::Display) -> Self {
        EngineError::TypeUnsupported {
            operation: operation.into(),
            ty: ty.to_string(),
        }
    }

    pub fn arity(routine: impl Into<String>, problem: ArityProblem) -> Self {
        EngineError::Arity {
            routine: routine.into(),
            problem,
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            EngineError::IllegalClass { .. } | EngineError::StaleSymbol(_) => {
                ErrorCode::IllegalClass
            }
            EngineError::IllegalSubscript(_) => ErrorCode::IllegalSubscript,
            EngineError::Arity { .. } => ErrorCode::Arity,
            EngineError::Allocation(_) | EngineError::RecursionLimit(_) => ErrorCode::Allocation,
            EngineError::Io { .. } | EngineError::Image(_) => ErrorCode::Io,
            EngineError::UnknownKeyword { .. } | EngineError::UnknownRoutine(_) => {
                ErrorCode::UnknownName
            }
            EngineError::TypeUnsupported { .. } | EngineError::Arithmetic(_) => {
                ErrorCode::TypeUnsupported
            }
            EngineError::Aborted => ErrorCode::Aborted,
        }
    }
}

//==================================================
// Section 3.0 - User-Facing Records
//==================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    IllegalClass,
    IllegalSubscript,
    Arity,
    Allocation,
    Io,
    UnknownName,
    TypeUnsupported,
    Aborted,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::IllegalClass => "E101",
            ErrorCode::IllegalSubscript => "E102",
            ErrorCode::Arity => "E103",
            ErrorCode::Allocation => "E104",
            ErrorCode::Io => "E105",
            ErrorCode::UnknownName => "E106",
            ErrorCode::TypeUnsupported => "E107",
            ErrorCode::Aborted => "E108",
        }
    }
}

/// A failed top-level statement, tagged with the line of the innermost
/// statement that was executing when the error was raised.
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptError {
    pub code: ErrorCode,
    pub message: String,
    pub line: Option<u32>,
}

impl ScriptError {
    pub fn new(error: &EngineError, line: Option<u32>) -> Self {
        Self {
            code: error.code(),
            message: error.to_string(),
            line,
        }
    }

    pub fn code_str(&self) -> &'static str {
        self.code.as_str()
    }
}

impl std::fmt::Display for ScriptError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.line {
            Some(line) => write!(f, "[{}] line {}: {}", self.code_str(), line, self.message),
            None => write!(f, "[{}] {}", self.code_str(), self.message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn taxonomy_maps_to_stable_codes() {
        let err = EngineError::arity(
            "TOTAL",
            ArityProblem::Duplicate {
                slot: "X".into(),
            },
        );
        assert_eq!(err.code().as_str(), "E103");
        assert_eq!(err.to_string(), "TOTAL: argument 'X' bound more than once");

        let record = ScriptError::new(&EngineError::IllegalSubscript("x".into()), Some(4));
        assert_eq!(record.to_string(), "[E102] line 4: illegal subscript: x");
    }
}

//==================================================
// End of file
//==================================================
