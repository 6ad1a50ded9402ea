//==================================================
// File: exec/mod.rs
//==================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Recursive dispatcher over executable nodes
// Objective: Execute every statement kind inside its own temp scope,
//            thread control signals upward and bound nesting depth
//==================================================

pub mod debug;
pub mod eval;
pub mod ops;

use tracing::{debug, info, trace};

use crate::image::loader::read_image;
use crate::image::ProgramImage;
use crate::interpreter::errors::{EngineError, EngineResult, Flow};
use crate::interpreter::{Interpreter, TempScope};
use crate::symbol::{
    Combine, Context, ElementRef, IncludeMode, Node, NodeKind, NumericType, RoutineKind, Scalar,
    SymbolIndex, SymbolValue, Wide,
};

impl Interpreter {
    //==================================================
    // Section 1.0 - Entry Point
    //==================================================

    /// Execute one statement node and report how it completed.
    pub fn execute(&mut self, statement: SymbolIndex) -> EngineResult<Flow> {
        let node = match self.store.value(statement)? {
            SymbolValue::Node(node) => node.clone(),
            other => {
                return Err(EngineError::IllegalClass {
                    what: self.store.describe(statement),
                    class: other.class(),
                    expected: "an executable node",
                });
            }
        };
        self.nested(|this| this.execute_node(&node))
    }

    fn execute_node(&mut self, node: &Node) -> EngineResult<Flow> {
        self.state.line = node.line;
        self.debug_checkpoint(node.line, node.kind.name())?;
        if self.state.trace {
            info!(line = node.line, depth = self.state.nesting, "{}", node.kind.name());
        } else {
            trace!(line = node.line, depth = self.state.nesting, node = node.kind.name(), "dispatch");
        }
        let result = {
            let mut scope = TempScope::new(self);
            scope.dispatch(&node.kind)
        };
        if self.state.return_all {
            return Ok(Flow::ReturnAll);
        }
        if result.is_err() && self.fault_line.is_none() {
            self.fault_line = Some(node.line);
        }
        result
    }

    fn dispatch(&mut self, kind: &NodeKind) -> EngineResult<Flow> {
        match kind {
            NodeKind::Assignment {
                target,
                subscripts,
                source,
                combine,
            } => {
                self.assign(*target, subscripts, *source, *combine)?;
                Ok(Flow::Normal)
            }
            NodeKind::NativeCall { routine, args } => {
                self.call_native(*routine, args)?;
                Ok(Flow::Normal)
            }
            NodeKind::UserCall { routine, args } => {
                self.call_user(*routine, args, RoutineKind::Subroutine)?;
                Ok(Flow::Normal)
            }
            NodeKind::RunBlock { block } => {
                self.call_user(*block, &[], RoutineKind::Block)?;
                Ok(Flow::Normal)
            }
            NodeKind::CaseSwitch { arms, otherwise } => {
                for (condition, statement) in arms {
                    if self.condition(*condition)? {
                        return self.execute(*statement);
                    }
                }
                match otherwise {
                    Some(statement) => self.execute(*statement),
                    None => Ok(Flow::Normal),
                }
            }
            NodeKind::NumericCaseSwitch {
                selector,
                arms,
                otherwise,
            } => {
                let selected = self.integer_value(*selector)?;
                let arm = usize::try_from(selected).ok().and_then(|i| arms.get(i));
                match arm.or(otherwise.as_ref()) {
                    Some(statement) => self.execute(*statement),
                    None => Ok(Flow::Normal),
                }
            }
            NodeKind::FileInclude { path, mode } => self.include_file(path, *mode),
            NodeKind::StatementBlock { statements } => {
                for statement in statements {
                    let flow = self.execute(*statement)?;
                    if !flow.is_normal() {
                        return Ok(flow);
                    }
                }
                Ok(Flow::Normal)
            }
            NodeKind::ForLoop {
                counter,
                start,
                end,
                step,
                body,
            } => self.run_for(*counter, *start, *end, *step, *body),
            NodeKind::IfThenElse {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.condition(*condition)? {
                    self.execute(*then_branch)
                } else if let Some(branch) = else_branch {
                    self.execute(*branch)
                } else {
                    Ok(Flow::Normal)
                }
            }
            NodeKind::RepeatUntil { body, condition } => loop {
                match self.execute(*body)? {
                    Flow::Break => return Ok(Flow::Normal),
                    Flow::Continue => continue,
                    flow @ (Flow::Return | Flow::ReturnAll) => return Ok(flow),
                    Flow::Normal => {}
                }
                if self.condition(*condition)? {
                    return Ok(Flow::Normal);
                }
            },
            NodeKind::DoWhile { body, condition } => loop {
                match self.execute(*body)? {
                    Flow::Break => return Ok(Flow::Normal),
                    Flow::Continue => continue,
                    flow @ (Flow::Return | Flow::ReturnAll) => return Ok(flow),
                    Flow::Normal => {}
                }
                if !self.condition(*condition)? {
                    return Ok(Flow::Normal);
                }
            },
            NodeKind::WhileDo { condition, body } => {
                while self.condition(*condition)? {
                    match self.execute(*body)? {
                        Flow::Break => break,
                        flow @ (Flow::Return | Flow::ReturnAll) => return Ok(flow),
                        Flow::Continue | Flow::Normal => {}
                    }
                }
                Ok(Flow::Normal)
            }
            NodeKind::Return { value } => {
                if let Some(value) = value {
                    let result = self.evaluate(*value)?;
                    self.set_pending_return(result)?;
                }
                Ok(Flow::Return)
            }
            NodeKind::Break => Ok(Flow::Break),
            NodeKind::Continue => Ok(Flow::Continue),
            NodeKind::ReturnAll => {
                self.state.return_all = true;
                Ok(Flow::ReturnAll)
            }
        }
    }

    //==================================================
    // Section 2.0 - Assignment
    //==================================================

    pub(crate) fn assign(
        &mut self,
        target: SymbolIndex,
        subscripts: &[SymbolIndex],
        source: SymbolIndex,
        combine: Combine,
    ) -> EngineResult<()> {
        if !subscripts.is_empty() {
            return self.insert(target, subscripts, source, combine);
        }
        let value = self.evaluate(source)?;
        let target = self.store.resolve(target)?;
        if let SymbolValue::ScalarPointer(pointer) = self.store.value(target)? {
            let pointer = pointer.clone();
            return self.write_element(&pointer, value);
        }
        self.store.assign_from(target, value)
    }

    fn write_element(&mut self, pointer: &ElementRef, value: SymbolIndex) -> EngineResult<()> {
        let wide = match self.store.value(value)? {
            SymbolValue::Scalar(scalar) => scalar.to_wide(),
            SymbolValue::Array(array) if array.element_count() == 1 => array.data.wide_at(0),
            other => {
                return Err(EngineError::IllegalClass {
                    what: "pointer assignment source".into(),
                    class: other.class(),
                    expected: "a scalar",
                });
            }
        };
        let target = self.store.resolve(pointer.target)?;
        match self.store.value_mut(target)? {
            SymbolValue::Array(array) if pointer.element < array.element_count() => {
                array.data.store_wide(pointer.element, wide);
                Ok(())
            }
            SymbolValue::Scalar(scalar) if pointer.element == 0 => {
                *scalar = Scalar::from_wide(scalar.numeric_type(), wide);
                Ok(())
            }
            SymbolValue::Array(_) | SymbolValue::Scalar(_) => Err(EngineError::IllegalSubscript(
                format!("pointer element {} out of range", pointer.element),
            )),
            other => Err(EngineError::IllegalClass {
                what: "pointer target".into(),
                class: other.class(),
                expected: "an array",
            }),
        }
    }

    /// Pin a return value until the caller collects it. Named, constant or
    /// list-member values are copied first so the caller owns what it
    /// receives.
    pub(crate) fn set_pending_return(&mut self, value: SymbolIndex) -> EngineResult<()> {
        let owned = if value.is_temp()
            && !self.store.get(value)?.is_named()
            && !self.store.owned_by_temp(value)
        {
            value
        } else {
            self.store.duplicate_to_temp(value)?
        };
        self.clear_pending_return();
        self.store.protect(owned)?;
        self.state.pending_return = Some(owned);
        Ok(())
    }

    pub(crate) fn take_pending_return(&mut self) -> Option<SymbolIndex> {
        let value = self.state.pending_return.take()?;
        let _ = self.store.unprotect(value);
        Some(value)
    }

    pub(crate) fn clear_pending_return(&mut self) {
        if let Some(value) = self.take_pending_return() {
            let _ = self.store.release_if_free_temp(value);
        }
    }

    //==================================================
    // Section 3.0 - Conditions & Loops
    //==================================================

    /// Truth value of a scalar or string condition, evaluated in its own
    /// scope so loop tests never accumulate temps.
    pub(crate) fn condition(&mut self, expr: SymbolIndex) -> EngineResult<bool> {
        let mut scope = TempScope::new(self);
        let index = scope.evaluate(expr)?;
        let value = scope.store.value(index)?;
        match value {
            SymbolValue::Scalar(scalar) => Ok(scalar.is_truthy()),
            SymbolValue::Text(text) => Ok(!text.is_empty()),
            SymbolValue::Array(array) if array.element_count() == 1 => {
                Ok(array.data.wide_at(0).is_truthy())
            }
            other => Err(EngineError::IllegalClass {
                what: "condition".into(),
                class: other.class(),
                expected: "a scalar or string",
            }),
        }
    }

    pub(crate) fn scalar_value(&mut self, expr: SymbolIndex) -> EngineResult<Scalar> {
        let mut scope = TempScope::new(self);
        let index = scope.evaluate(expr)?;
        let value = scope.store.value(index)?;
        match value {
            SymbolValue::Scalar(scalar) => Ok(*scalar),
            SymbolValue::Array(array) if array.element_count() == 1 => Ok(array.data.scalar_at(0)),
            SymbolValue::Text(text) => Ok(match Wide::parse(text) {
                Wide::Int(v) => Scalar::Int64(v),
                other => Scalar::Double(other.as_f64()),
            }),
            other => Err(EngineError::IllegalClass {
                what: scope.store.describe(index),
                class: other.class(),
                expected: "a scalar",
            }),
        }
    }

    pub(crate) fn integer_value(&mut self, expr: SymbolIndex) -> EngineResult<i64> {
        Ok(self.scalar_value(expr)?.as_i64())
    }

    /// The counter takes the widest type of start, end and step; the
    /// direction is fixed by the sign of the step before the first pass.
    fn run_for(
        &mut self,
        counter: SymbolIndex,
        start: SymbolIndex,
        end: SymbolIndex,
        step: Option<SymbolIndex>,
        body: SymbolIndex,
    ) -> EngineResult<Flow> {
        let start = self.scalar_value(start)?;
        let end = self.scalar_value(end)?;
        let step = match step {
            Some(step) => self.scalar_value(step)?,
            None => Scalar::Long(1),
        };
        let ty = start
            .numeric_type()
            .promote(end.numeric_type())
            .promote(step.numeric_type());
        if ty.is_complex() {
            return Err(EngineError::unsupported("for loop counter", ty));
        }
        let ascending = step.as_f64() > 0.0;
        if step.as_f64() == 0.0 {
            return Err(EngineError::Arithmetic("for loop step is zero".into()));
        }
        let end = end.convert(ty);
        let step = step.convert(ty);
        let counter = self.store.resolve(counter)?;
        self.store
            .set_value(counter, SymbolValue::Scalar(start.convert(ty)))?;

        loop {
            let current = match self.store.value(counter)? {
                SymbolValue::Scalar(scalar) => scalar.convert(ty),
                other => {
                    return Err(EngineError::IllegalClass {
                        what: self.store.describe(counter),
                        class: other.class(),
                        expected: "a scalar loop counter",
                    });
                }
            };
            if past_end(&current, &end, ascending, ty) {
                break;
            }
            match self.execute(body)? {
                Flow::Break => break,
                flow @ (Flow::Return | Flow::ReturnAll) => return Ok(flow),
                Flow::Continue | Flow::Normal => {}
            }
            let Some(next) = advance(&current, &step, ty) else {
                break;
            };
            self.store.set_value(counter, SymbolValue::Scalar(next))?;
        }
        Ok(Flow::Normal)
    }

    //==================================================
    // Section 4.0 - File Include
    //==================================================

    fn include_file(&mut self, path: &str, mode: IncludeMode) -> EngineResult<Flow> {
        let resolved = self
            .loader
            .locate_file(path)
            .ok_or_else(|| EngineError::io(path, "not found on the include path"))?;
        let first_time = self.loader.mark_included(&resolved);
        if mode == IncludeMode::Once && !first_time {
            debug!(path = %resolved.display(), "include skipped, already loaded");
            return Ok(Flow::Normal);
        }
        let image = read_image(&resolved)?;
        let owner = self.store.allocate(Context::Global, SymbolValue::Undefined)?;
        let result = self.run_included(&image, owner);
        self.release_owner(owner);
        result
    }

    fn run_included(&mut self, image: &ProgramImage, owner: SymbolIndex) -> EngineResult<Flow> {
        self.compile_routines(&image.routines)?;
        let statements =
            self.compile_statements(&image.main, Context::Routine(owner), Context::Global)?;
        for statement in statements {
            let flow = self.execute(statement)?;
            if !flow.is_normal() {
                return Ok(flow);
            }
        }
        Ok(Flow::Normal)
    }
}

fn past_end(current: &Scalar, end: &Scalar, ascending: bool, ty: NumericType) -> bool {
    if ty.is_integer() {
        let (current, end) = (current.as_i64(), end.as_i64());
        if ascending { current > end } else { current < end }
    } else {
        let (current, end) = (current.as_f64(), end.as_f64());
        if ascending { current > end } else { current < end }
    }
}

/// Next counter value, or `None` once the counter cannot move further in
/// its type.
fn advance(current: &Scalar, step: &Scalar, ty: NumericType) -> Option<Scalar> {
    if ty.is_integer() {
        let raw = current.as_i64().checked_add(step.as_i64())?;
        let next = Scalar::from_wide(ty, Wide::Int(raw));
        (next.as_i64() == raw).then_some(next)
    } else {
        Some(Scalar::from_wide(ty, Wide::Real(current.as_f64() + step.as_f64())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::{Expr, Stmt, StmtKind};
    use crate::symbol::BinaryOp;

    #[test]
    fn byte_counters_stop_at_the_top_of_their_range() {
        let current = Scalar::Byte(255);
        assert!(advance(&current, &Scalar::Byte(1), NumericType::Byte).is_none());
        assert_eq!(
            advance(&Scalar::Byte(3), &Scalar::Byte(2), NumericType::Byte),
            Some(Scalar::Byte(5))
        );
    }

    #[test]
    fn descending_loops_end_below_the_bound() {
        assert!(!past_end(&Scalar::Long(1), &Scalar::Long(1), false, NumericType::Long));
        assert!(past_end(&Scalar::Long(0), &Scalar::Long(1), false, NumericType::Long));
        assert!(past_end(&Scalar::Double(1.5), &Scalar::Double(1.0), true, NumericType::Double));
    }

    fn add(name: &str, amount: Expr) -> Stmt {
        Stmt::assign(name, Expr::binary(BinaryOp::Add, Expr::var(name), amount))
    }

    #[test]
    fn descending_loops_visit_each_counter_value_once() {
        let mut interp = Interpreter::default();
        interp.execute_inserted(&Stmt::assign("sum", Expr::Long(0))).expect("init");
        let flow = interp
            .execute_inserted(&Stmt::for_loop(
                "i",
                Expr::Long(5),
                Expr::Long(1),
                Some(Expr::Long(-2)),
                add("sum", Expr::var("i")),
            ))
            .expect("loop");
        assert_eq!(flow, Flow::Normal);
        assert_eq!(interp.scalar("sum"), Some(Scalar::Long(9)));
        assert_eq!(interp.scalar("i"), Some(Scalar::Long(-1)));
        let err = interp
            .execute_inserted(&Stmt::for_loop(
                "i",
                Expr::Long(0),
                Expr::Long(3),
                Some(Expr::Long(0)),
                add("sum", Expr::Long(1)),
            ))
            .expect_err("zero step");
        assert!(matches!(err, EngineError::Arithmetic(_)));
    }

    #[test]
    fn loop_signals_stop_at_the_nearest_loop() {
        let mut interp = Interpreter::default();
        assert_eq!(
            interp.execute_inserted(&Stmt::new(StmtKind::Break)).expect("bare"),
            Flow::Break
        );
        interp.execute_inserted(&Stmt::assign("k", Expr::Long(0))).expect("init");
        let body = Stmt::block(vec![
            add("k", Expr::Long(1)),
            Stmt::if_then(
                Expr::binary(BinaryOp::Ge, Expr::var("k"), Expr::Long(4)),
                Stmt::new(StmtKind::Break),
                None,
            ),
        ]);
        let flow = interp
            .execute_inserted(&Stmt::while_do(Expr::Long(1), body))
            .expect("loop");
        assert_eq!(flow, Flow::Normal);
        assert_eq!(interp.scalar("k"), Some(Scalar::Long(4)));
    }
}

//==================================================
// End of file
//==================================================
