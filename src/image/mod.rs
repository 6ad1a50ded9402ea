//==================================================
// File: image/mod.rs
//==================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Serializable program images
// Objective: Describe routines, statements and expressions as plain serde
//            data, stored as JSON for editing and bincode for loading
//==================================================

pub mod compile;
pub mod loader;

use serde::{Deserialize, Serialize};

use crate::symbol::{BinaryOp, Combine, IncludeMode, RoutineKind, UnaryOp};

//==================================================
// Section 1.0 - Program & Routines
//==================================================

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProgramImage {
    #[serde(default)]
    pub routines: Vec<RoutineImage>,
    #[serde(default)]
    pub main: Vec<Stmt>,
}

impl ProgramImage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn routine(mut self, routine: RoutineImage) -> Self {
        self.routines.push(routine);
        self
    }

    pub fn statement(mut self, statement: Stmt) -> Self {
        self.main.push(statement);
        self
    }

    /// Number statements without a line in order of appearance.
    pub fn numbered(mut self) -> Self {
        let mut next = 1;
        for routine in &mut self.routines {
            number_all(&mut routine.body, &mut next);
        }
        number_all(&mut self.main, &mut next);
        self
    }
}

fn number_all(statements: &mut [Stmt], next: &mut u32) {
    for statement in statements {
        if statement.line == 0 {
            statement.line = *next;
        }
        *next = (*next).max(statement.line) + 1;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutineImage {
    pub name: String,
    pub kind: RoutineKind,
    #[serde(default)]
    pub params: Vec<String>,
    /// The last parameter collects surplus positional arguments.
    #[serde(default)]
    pub variadic: bool,
    #[serde(default)]
    pub body: Vec<Stmt>,
}

impl RoutineImage {
    pub fn new(kind: RoutineKind, name: &str, params: &[&str], body: Vec<Stmt>) -> Self {
        Self {
            name: name.to_string(),
            kind,
            params: params.iter().map(|param| param.to_string()).collect(),
            variadic: false,
            body,
        }
    }

    pub fn function(name: &str, params: &[&str], body: Vec<Stmt>) -> Self {
        Self::new(RoutineKind::Function, name, params, body)
    }

    pub fn subroutine(name: &str, params: &[&str], body: Vec<Stmt>) -> Self {
        Self::new(RoutineKind::Subroutine, name, params, body)
    }

    pub fn block(name: &str, body: Vec<Stmt>) -> Self {
        Self::new(RoutineKind::Block, name, &[], body)
    }

    pub fn variadic(mut self) -> Self {
        self.variadic = true;
        self
    }
}

//==================================================
// Section 2.0 - Statements
//==================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stmt {
    #[serde(default)]
    pub line: u32,
    pub kind: StmtKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseArm {
    pub condition: Expr,
    pub body: Stmt,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StmtKind {
    Assign {
        target: String,
        #[serde(default)]
        subscripts: Vec<Expr>,
        value: Expr,
        #[serde(default)]
        combine: Option<Combine>,
    },
    Call {
        name: String,
        #[serde(default)]
        args: Vec<Arg>,
    },
    Run {
        name: String,
    },
    Case {
        arms: Vec<CaseArm>,
        #[serde(default)]
        otherwise: Option<Box<Stmt>>,
    },
    Ncase {
        selector: Expr,
        arms: Vec<Stmt>,
        #[serde(default)]
        otherwise: Option<Box<Stmt>>,
    },
    Include {
        path: String,
        #[serde(default)]
        mode: IncludeMode,
    },
    Block {
        statements: Vec<Stmt>,
    },
    For {
        counter: String,
        start: Expr,
        end: Expr,
        #[serde(default)]
        step: Option<Expr>,
        body: Box<Stmt>,
    },
    If {
        condition: Expr,
        then: Box<Stmt>,
        #[serde(default)]
        otherwise: Option<Box<Stmt>>,
    },
    Repeat {
        body: Box<Stmt>,
        until: Expr,
    },
    DoWhile {
        body: Box<Stmt>,
        condition: Expr,
    },
    While {
        condition: Expr,
        body: Box<Stmt>,
    },
    Return {
        #[serde(default)]
        value: Option<Expr>,
    },
    Break,
    Continue,
    ReturnAll,
}

impl Stmt {
    pub fn new(kind: StmtKind) -> Self {
        Self { line: 0, kind }
    }

    pub fn at(mut self, line: u32) -> Self {
        self.line = line;
        self
    }

    pub fn assign(target: &str, value: Expr) -> Self {
        Self::new(StmtKind::Assign {
            target: target.to_string(),
            subscripts: Vec::new(),
            value,
            combine: None,
        })
    }

    pub fn insert(target: &str, subscripts: Vec<Expr>, value: Expr) -> Self {
        Self::new(StmtKind::Assign {
            target: target.to_string(),
            subscripts,
            value,
            combine: None,
        })
    }

    pub fn insert_with(target: &str, subscripts: Vec<Expr>, value: Expr, combine: Combine) -> Self {
        Self::new(StmtKind::Assign {
            target: target.to_string(),
            subscripts,
            value,
            combine: Some(combine),
        })
    }

    pub fn call(name: &str, args: Vec<Arg>) -> Self {
        Self::new(StmtKind::Call {
            name: name.to_string(),
            args,
        })
    }

    pub fn run(name: &str) -> Self {
        Self::new(StmtKind::Run {
            name: name.to_string(),
        })
    }

    pub fn block(statements: Vec<Stmt>) -> Self {
        Self::new(StmtKind::Block { statements })
    }

    pub fn for_loop(counter: &str, start: Expr, end: Expr, step: Option<Expr>, body: Stmt) -> Self {
        Self::new(StmtKind::For {
            counter: counter.to_string(),
            start,
            end,
            step,
            body: Box::new(body),
        })
    }

    pub fn if_then(condition: Expr, then: Stmt, otherwise: Option<Stmt>) -> Self {
        Self::new(StmtKind::If {
            condition,
            then: Box::new(then),
            otherwise: otherwise.map(Box::new),
        })
    }

    pub fn repeat_until(body: Stmt, until: Expr) -> Self {
        Self::new(StmtKind::Repeat {
            body: Box::new(body),
            until,
        })
    }

    pub fn do_while(body: Stmt, condition: Expr) -> Self {
        Self::new(StmtKind::DoWhile {
            body: Box::new(body),
            condition,
        })
    }

    pub fn while_do(condition: Expr, body: Stmt) -> Self {
        Self::new(StmtKind::While {
            condition,
            body: Box::new(body),
        })
    }

    pub fn ret(value: Option<Expr>) -> Self {
        Self::new(StmtKind::Return { value })
    }

    pub fn include(path: &str, mode: IncludeMode) -> Self {
        Self::new(StmtKind::Include {
            path: path.to_string(),
            mode,
        })
    }
}

//==================================================
// Section 3.0 - Expressions & Arguments
//==================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expr {
    Byte(u8),
    Word(i16),
    Long(i32),
    Int64(i64),
    Float(f32),
    Double(f64),
    Complex {
        re: f64,
        im: f64,
    },
    Str(String),
    Var(String),
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Call {
        name: String,
        #[serde(default)]
        args: Vec<Arg>,
    },
    CallPointer {
        pointer: Box<Expr>,
        #[serde(default)]
        args: Vec<Arg>,
    },
    /// A function pointer to the named routine.
    RoutineRef {
        name: String,
        kind: RoutineKind,
    },
    /// Alias to one element of a named array.
    ElementRef {
        target: String,
        element: usize,
    },
    Extract {
        source: Box<Expr>,
        subscripts: Vec<Expr>,
    },
    Member {
        source: Box<Expr>,
        tag: String,
    },
    /// `start:end`; a missing start is 0, a missing end is `*`.
    Range {
        #[serde(default)]
        start: Option<Box<Expr>>,
        #[serde(default)]
        end: Option<Box<Expr>>,
        #[serde(default)]
        reversed: bool,
        #[serde(default)]
        summation: bool,
        #[serde(default)]
        redirect: Option<u8>,
    },
    /// `[a, b, ...]` concatenation.
    Array(Vec<Expr>),
    /// `{a, tag: b, ...}` list construction.
    List(Vec<Arg>),
}

impl Expr {
    pub fn var(name: &str) -> Self {
        Expr::Var(name.to_string())
    }

    pub fn str(text: &str) -> Self {
        Expr::Str(text.to_string())
    }

    pub fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Self {
        Expr::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    pub fn unary(op: UnaryOp, operand: Expr) -> Self {
        Expr::Unary {
            op,
            operand: Box::new(operand),
        }
    }

    pub fn call(name: &str, args: Vec<Arg>) -> Self {
        Expr::Call {
            name: name.to_string(),
            args,
        }
    }

    pub fn extract(source: Expr, subscripts: Vec<Expr>) -> Self {
        Expr::Extract {
            source: Box::new(source),
            subscripts,
        }
    }

    pub fn member(source: Expr, tag: &str) -> Self {
        Expr::Member {
            source: Box::new(source),
            tag: tag.to_string(),
        }
    }

    pub fn range(start: Expr, end: Expr) -> Self {
        Expr::Range {
            start: Some(Box::new(start)),
            end: Some(Box::new(end)),
            reversed: false,
            summation: false,
            redirect: None,
        }
    }

    /// `start:*`
    pub fn range_to_end(start: Expr) -> Self {
        Expr::Range {
            start: Some(Box::new(start)),
            end: None,
            reversed: false,
            summation: false,
            redirect: None,
        }
    }

    pub fn longs(values: &[i32]) -> Self {
        Expr::Array(values.iter().map(|v| Expr::Long(*v)).collect())
    }

    pub fn doubles(values: &[f64]) -> Self {
        Expr::Array(values.iter().map(|v| Expr::Double(*v)).collect())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Arg {
    Positional(Expr),
    /// `name=value`, or `/name` when `value` is absent.
    Keyword {
        name: String,
        #[serde(default)]
        value: Option<Expr>,
    },
}

impl Arg {
    pub fn pos(expr: Expr) -> Self {
        Arg::Positional(expr)
    }

    pub fn key(name: &str, value: Expr) -> Self {
        Arg::Keyword {
            name: name.to_string(),
            value: Some(value),
        }
    }

    pub fn flag(name: &str) -> Self {
        Arg::Keyword {
            name: name.to_string(),
            value: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_images_use_snake_case_tags() {
        let text = r#"{
            "main": [
                {"line": 3, "kind": {"assign": {"target": "x", "value": {"long": 4}}}},
                {"kind": {"call": {"name": "print", "args": [{"positional": {"var": "x"}}]}}},
                {"kind": "break"}
            ]
        }"#;
        let image: ProgramImage = serde_json::from_str(text).expect("parse image");
        assert_eq!(image.main.len(), 3);
        assert_eq!(image.main[0], Stmt::assign("x", Expr::Long(4)).at(3));
        assert_eq!(image.main[2].kind, StmtKind::Break);
    }

    #[test]
    fn numbering_fills_only_missing_lines() {
        let image = ProgramImage::new()
            .statement(Stmt::assign("a", Expr::Long(1)))
            .statement(Stmt::assign("b", Expr::Long(2)).at(10))
            .statement(Stmt::assign("c", Expr::Long(3)))
            .numbered();
        let lines: Vec<u32> = image.main.iter().map(|s| s.line).collect();
        assert_eq!(lines, vec![1, 10, 11]);
    }
}

//==================================================
// End of file
//==================================================
