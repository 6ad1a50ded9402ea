//==================================================
// File: image/compile.rs
//==================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Lower program images into executable symbols
// Objective: Turn routines, statements and expressions into node trees in
//            the symbol store, resolving names and deferred routines
//==================================================

use std::collections::HashSet;

use tracing::debug;

use super::loader::read_image;
use super::{Arg, Expr, RoutineImage, Stmt, StmtKind};
use crate::interpreter::errors::{EngineError, EngineResult};
use crate::interpreter::Interpreter;
use crate::native::NativeKind;
use crate::symbol::{
    Callee, Context, ElementRef, Expression, KeywordArg, Namespace, Node, NodeKind, RangeEnd,
    RangeValue, Routine, RoutineKind, Scalar, SymbolIndex, SymbolValue,
};
use num_complex::Complex64;

/// Where lowered symbols go: `owner` owns the nodes and constants, `vars`
/// is the context plain variable names resolve in.
#[derive(Debug, Clone)]
pub(crate) struct Lowering {
    owner: Context,
    vars: Context,
    declared: HashSet<(RoutineKind, String)>,
}

impl Lowering {
    pub(crate) fn new(owner: Context, vars: Context) -> Self {
        Self {
            owner,
            vars,
            declared: HashSet::new(),
        }
    }
}

impl Interpreter {
    //==================================================
    // Section 1.0 - Routines
    //==================================================

    /// Declare every routine first so they can call each other, then lower
    /// their bodies. Redefinition frees the old tree.
    pub(crate) fn compile_routines(&mut self, routines: &[RoutineImage]) -> EngineResult<()> {
        let mut declared = HashSet::new();
        let mut indices = Vec::with_capacity(routines.len());
        for image in routines {
            indices.push(self.declare_routine(image)?);
            declared.insert((image.kind, image.name.to_ascii_uppercase()));
        }
        for (image, index) in routines.iter().zip(indices) {
            self.compile_routine_body(image, index, &declared)?;
        }
        Ok(())
    }

    fn declare_routine(&mut self, image: &RoutineImage) -> EngineResult<SymbolIndex> {
        if image.name.is_empty() || image.name.starts_with('$') {
            return Err(EngineError::Image(format!(
                "invalid routine name '{}'",
                image.name
            )));
        }
        let namespace = image.kind.namespace();
        if let Some(existing) = self.store.lookup(namespace, Context::Global, &image.name) {
            let freed = self.store.free_context(Context::Routine(existing));
            debug!(routine = %image.name, freed, "redefining routine");
        }
        self.store.define(
            namespace,
            Context::Global,
            &image.name,
            SymbolValue::DeferredRoutine(image.kind),
        )
    }

    fn compile_routine_body(
        &mut self,
        image: &RoutineImage,
        index: SymbolIndex,
        declared: &HashSet<(RoutineKind, String)>,
    ) -> EngineResult<()> {
        let context = Context::Routine(index);
        let vars = match image.kind {
            RoutineKind::Block => Context::Global,
            _ => context,
        };
        let lowering = Lowering {
            owner: context,
            vars,
            declared: declared.clone(),
        };
        let mut params = Vec::with_capacity(image.params.len());
        let mut seen = HashSet::new();
        for name in &image.params {
            if name.starts_with('$') || !seen.insert(name.to_ascii_uppercase()) {
                return Err(EngineError::Image(format!(
                    "{}: invalid or repeated parameter '{name}'",
                    image.name
                )));
            }
            params.push(self.store.define(
                Namespace::Variable,
                context,
                name,
                SymbolValue::Transfer(None),
            )?);
        }
        let body = self.lower_statements(&image.body, &lowering)?;
        let variadic = image.variadic && !params.is_empty();
        self.store.set_value(
            index,
            SymbolValue::Routine(Routine {
                kind: image.kind,
                params,
                variadic,
                body,
            }),
        )?;
        debug!(routine = %image.name, kind = ?image.kind, "compiled routine");
        Ok(())
    }

    /// The compiled form of a routine, compiling a deferred one from its
    /// image file on first use.
    pub(crate) fn ensure_routine(&mut self, index: SymbolIndex) -> EngineResult<Routine> {
        match self.store.value(index)? {
            SymbolValue::Routine(routine) => return Ok(routine.clone()),
            SymbolValue::DeferredRoutine(_) => {}
            other => {
                return Err(EngineError::IllegalClass {
                    what: self.store.describe(index),
                    class: other.class(),
                    expected: "a routine",
                });
            }
        }
        let name = self.store.describe(index);
        let path = self
            .loader
            .locate_routine(&name)
            .ok_or_else(|| EngineError::UnknownRoutine(name.clone()))?;
        debug!(routine = %name, path = %path.display(), "compiling deferred routine");
        let image = read_image(&path)?;
        self.compile_routines(&image.routines)?;
        match self.store.value(index)? {
            SymbolValue::Routine(routine) => Ok(routine.clone()),
            _ => Err(EngineError::UnknownRoutine(format!(
                "{name} (not defined by {})",
                path.display()
            ))),
        }
    }

    //==================================================
    // Section 2.0 - Statements
    //==================================================

    pub(crate) fn compile_statements(
        &mut self,
        statements: &[Stmt],
        owner: Context,
        vars: Context,
    ) -> EngineResult<Vec<SymbolIndex>> {
        self.lower_statements(statements, &Lowering::new(owner, vars))
    }

    pub(crate) fn compile_statement(
        &mut self,
        statement: &Stmt,
        owner: Context,
        vars: Context,
    ) -> EngineResult<SymbolIndex> {
        self.lower_statement(statement, &Lowering::new(owner, vars))
    }

    fn lower_statements(
        &mut self,
        statements: &[Stmt],
        lowering: &Lowering,
    ) -> EngineResult<Vec<SymbolIndex>> {
        statements
            .iter()
            .map(|statement| self.lower_statement(statement, lowering))
            .collect()
    }

    fn lower_optional(
        &mut self,
        statement: &Option<Box<Stmt>>,
        lowering: &Lowering,
    ) -> EngineResult<Option<SymbolIndex>> {
        statement
            .as_deref()
            .map(|statement| self.lower_statement(statement, lowering))
            .transpose()
    }

    fn lower_statement(&mut self, statement: &Stmt, lowering: &Lowering) -> EngineResult<SymbolIndex> {
        let kind = match &statement.kind {
            StmtKind::Assign {
                target,
                subscripts,
                value,
                combine,
            } => NodeKind::Assignment {
                target: self.lower_variable(target, lowering)?,
                subscripts: self.lower_exprs(subscripts, lowering)?,
                source: self.lower_expr(value, lowering)?,
                combine: combine.unwrap_or(self.config.combine),
            },
            StmtKind::Call { name, args } => {
                let callee = self.resolve_callee(name, RoutineKind::Subroutine, lowering)?;
                let args = self.lower_args(args, lowering)?;
                match callee {
                    Callee::Native(routine) => NodeKind::NativeCall { routine, args },
                    Callee::User(routine) => NodeKind::UserCall { routine, args },
                }
            }
            StmtKind::Run { name } => match self.resolve_callee(name, RoutineKind::Block, lowering)? {
                Callee::User(block) => NodeKind::RunBlock { block },
                Callee::Native(_) => {
                    return Err(EngineError::Image(format!("'{name}' is not a block routine")));
                }
            },
            StmtKind::Case { arms, otherwise } => {
                let mut lowered = Vec::with_capacity(arms.len());
                for arm in arms {
                    let condition = self.lower_expr(&arm.condition, lowering)?;
                    let body = self.lower_statement(&arm.body, lowering)?;
                    lowered.push((condition, body));
                }
                NodeKind::CaseSwitch {
                    arms: lowered,
                    otherwise: self.lower_optional(otherwise, lowering)?,
                }
            }
            StmtKind::Ncase {
                selector,
                arms,
                otherwise,
            } => NodeKind::NumericCaseSwitch {
                selector: self.lower_expr(selector, lowering)?,
                arms: self.lower_statements(arms, lowering)?,
                otherwise: self.lower_optional(otherwise, lowering)?,
            },
            StmtKind::Include { path, mode } => NodeKind::FileInclude {
                path: path.clone(),
                mode: *mode,
            },
            StmtKind::Block { statements } => NodeKind::StatementBlock {
                statements: self.lower_statements(statements, lowering)?,
            },
            StmtKind::For {
                counter,
                start,
                end,
                step,
                body,
            } => NodeKind::ForLoop {
                counter: self.lower_variable(counter, lowering)?,
                start: self.lower_expr(start, lowering)?,
                end: self.lower_expr(end, lowering)?,
                step: step
                    .as_ref()
                    .map(|step| self.lower_expr(step, lowering))
                    .transpose()?,
                body: self.lower_statement(body, lowering)?,
            },
            StmtKind::If {
                condition,
                then,
                otherwise,
            } => NodeKind::IfThenElse {
                condition: self.lower_expr(condition, lowering)?,
                then_branch: self.lower_statement(then, lowering)?,
                else_branch: self.lower_optional(otherwise, lowering)?,
            },
            StmtKind::Repeat { body, until } => NodeKind::RepeatUntil {
                body: self.lower_statement(body, lowering)?,
                condition: self.lower_expr(until, lowering)?,
            },
            StmtKind::DoWhile { body, condition } => NodeKind::DoWhile {
                body: self.lower_statement(body, lowering)?,
                condition: self.lower_expr(condition, lowering)?,
            },
            StmtKind::While { condition, body } => NodeKind::WhileDo {
                condition: self.lower_expr(condition, lowering)?,
                body: self.lower_statement(body, lowering)?,
            },
            StmtKind::Return { value } => NodeKind::Return {
                value: value
                    .as_ref()
                    .map(|value| self.lower_expr(value, lowering))
                    .transpose()?,
            },
            StmtKind::Break => NodeKind::Break,
            StmtKind::Continue => NodeKind::Continue,
            StmtKind::ReturnAll => NodeKind::ReturnAll,
        };
        self.store.allocate(
            lowering.owner,
            SymbolValue::Node(Node {
                line: statement.line,
                kind,
            }),
        )
    }

    //==================================================
    // Section 3.0 - Names
    //==================================================

    fn lower_variable(&mut self, name: &str, lowering: &Lowering) -> EngineResult<SymbolIndex> {
        if name.is_empty() {
            return Err(EngineError::Image("empty variable name".into()));
        }
        let context = Interpreter::variable_context(name, lowering.vars);
        match self.store.lookup(Namespace::Variable, context, name) {
            Some(index) => Ok(index),
            None => self
                .store
                .define(Namespace::Variable, context, name, SymbolValue::Undefined),
        }
    }

    /// Defined user routine first, then a native routine, then a deferred
    /// marker located on first call.
    fn resolve_callee(
        &mut self,
        name: &str,
        kind: RoutineKind,
        lowering: &Lowering,
    ) -> EngineResult<Callee> {
        let namespace = kind.namespace();
        let existing = self.store.lookup(namespace, Context::Global, name);
        if let Some(index) = existing {
            let compiled = matches!(self.store.value(index)?, SymbolValue::Routine(_));
            if compiled || lowering.declared.contains(&(kind, name.to_ascii_uppercase())) {
                return Ok(Callee::User(index));
            }
        }
        let native_kind = match kind {
            RoutineKind::Subroutine => Some(NativeKind::Subroutine),
            RoutineKind::Function => Some(NativeKind::Function),
            RoutineKind::Block => None,
        };
        if let Some(id) = native_kind.and_then(|native| self.natives.lookup(native, name)) {
            return Ok(Callee::Native(id));
        }
        match existing {
            Some(index) => Ok(Callee::User(index)),
            None => {
                let index = self.store.define(
                    namespace,
                    Context::Global,
                    name,
                    SymbolValue::DeferredRoutine(kind),
                )?;
                debug!(routine = %name, ?kind, "deferred routine reference");
                Ok(Callee::User(index))
            }
        }
    }

    //==================================================
    // Section 4.0 - Expressions & Arguments
    //==================================================

    pub(crate) fn compile_expr(
        &mut self,
        expr: &Expr,
        owner: Context,
        vars: Context,
    ) -> EngineResult<SymbolIndex> {
        self.lower_expr(expr, &Lowering::new(owner, vars))
    }

    /// Lower call arguments at main level. The symbols are owned by the
    /// global context and live until freed explicitly.
    pub fn compile_args(&mut self, args: &[Arg]) -> EngineResult<Vec<SymbolIndex>> {
        self.lower_args(args, &Lowering::new(Context::Global, Context::Global))
    }

    fn lower_exprs(&mut self, exprs: &[Expr], lowering: &Lowering) -> EngineResult<Vec<SymbolIndex>> {
        exprs
            .iter()
            .map(|expr| self.lower_expr(expr, lowering))
            .collect()
    }

    fn lower_args(&mut self, args: &[Arg], lowering: &Lowering) -> EngineResult<Vec<SymbolIndex>> {
        let mut lowered = Vec::with_capacity(args.len());
        for arg in args {
            let index = match arg {
                Arg::Positional(expr) => self.lower_expr(expr, lowering)?,
                Arg::Keyword { name, value } => {
                    let value = value
                        .as_ref()
                        .map(|value| self.lower_expr(value, lowering))
                        .transpose()?;
                    self.store.allocate(
                        lowering.owner,
                        SymbolValue::Keyword(KeywordArg {
                            name: name.to_ascii_uppercase(),
                            value,
                        }),
                    )?
                }
            };
            lowered.push(index);
        }
        Ok(lowered)
    }

    fn constant(&mut self, value: SymbolValue, lowering: &Lowering) -> EngineResult<SymbolIndex> {
        self.store.allocate(lowering.owner, value)
    }

    fn lower_expr(&mut self, expr: &Expr, lowering: &Lowering) -> EngineResult<SymbolIndex> {
        let scalar = |scalar: Scalar| SymbolValue::Scalar(scalar);
        let expression = match expr {
            Expr::Byte(v) => return self.constant(scalar(Scalar::Byte(*v)), lowering),
            Expr::Word(v) => return self.constant(scalar(Scalar::Word(*v)), lowering),
            Expr::Long(v) => return self.constant(scalar(Scalar::Long(*v)), lowering),
            Expr::Int64(v) => return self.constant(scalar(Scalar::Int64(*v)), lowering),
            Expr::Float(v) => return self.constant(scalar(Scalar::Float(*v)), lowering),
            Expr::Double(v) => return self.constant(scalar(Scalar::Double(*v)), lowering),
            Expr::Complex { re, im } => {
                return self.constant(scalar(Scalar::CDouble(Complex64::new(*re, *im))), lowering);
            }
            Expr::Str(text) => return self.constant(SymbolValue::Text(text.clone()), lowering),
            Expr::Var(name) => return self.lower_variable(name, lowering),
            Expr::RoutineRef { name, kind } => {
                let callee = self.resolve_callee(name, *kind, lowering)?;
                return self.constant(SymbolValue::FunctionPointer(callee), lowering);
            }
            Expr::ElementRef { target, element } => {
                let target = self.lower_variable(target, lowering)?;
                return self.constant(
                    SymbolValue::ScalarPointer(ElementRef {
                        target,
                        element: *element,
                    }),
                    lowering,
                );
            }
            Expr::Range {
                start,
                end,
                reversed,
                summation,
                redirect,
            } => {
                let start = match start {
                    Some(start) => self.lower_expr(start, lowering)?,
                    None => self.constant(scalar(Scalar::Long(0)), lowering)?,
                };
                let end = match end {
                    Some(end) => RangeEnd::Index(self.lower_expr(end, lowering)?),
                    None => RangeEnd::ToEnd,
                };
                return self.constant(
                    SymbolValue::Range(RangeValue {
                        start,
                        end,
                        reversed: *reversed,
                        summation: *summation,
                        redirect: *redirect,
                    }),
                    lowering,
                );
            }
            Expr::Binary { op, lhs, rhs } => Expression::Binary {
                op: *op,
                lhs: self.lower_expr(lhs, lowering)?,
                rhs: self.lower_expr(rhs, lowering)?,
            },
            Expr::Unary { op, operand } => Expression::Unary {
                op: *op,
                operand: self.lower_expr(operand, lowering)?,
            },
            Expr::Call { name, args } => {
                let callee = self.resolve_callee(name, RoutineKind::Function, lowering)?;
                let args = self.lower_args(args, lowering)?;
                match callee {
                    Callee::Native(routine) => Expression::NativeCall { routine, args },
                    Callee::User(routine) => Expression::UserCall { routine, args },
                }
            }
            Expr::CallPointer { pointer, args } => Expression::IndirectCall {
                pointer: self.lower_expr(pointer, lowering)?,
                args: self.lower_args(args, lowering)?,
            },
            Expr::Extract { source, subscripts } => Expression::Extract {
                source: self.lower_expr(source, lowering)?,
                subscripts: self.lower_exprs(subscripts, lowering)?,
            },
            Expr::Member { source, tag } => Expression::Member {
                source: self.lower_expr(source, lowering)?,
                tag: tag.to_ascii_uppercase(),
            },
            Expr::Array(items) => Expression::Concat {
                items: self.lower_exprs(items, lowering)?,
            },
            Expr::List(items) => Expression::ListBuild {
                items: self.lower_args(items, lowering)?,
            },
        };
        self.constant(SymbolValue::Expression(expression), lowering)
    }
}


//==================================================
// End of file
//==================================================
