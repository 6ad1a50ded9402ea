//==================================================
// File: exec/eval.rs
//==================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Expression evaluation over the symbol store
// Objective: Reduce any expression symbol to a value symbol, allocating
//            results as temps so the enclosing scope can reclaim them
//==================================================

use tracing::trace;

use super::ops::{self, Operand};
use crate::interpreter::errors::{EngineError, EngineResult};
use crate::interpreter::Interpreter;
use crate::native::NativeKind;
use crate::subscript::file::read_elements;
use crate::symbol::{
    ArrayData, ArrayValue, Callee, ElementRef, Expression, ListMember, NumericType, RoutineKind,
    Scalar, SymbolClass, SymbolIndex, SymbolValue,
};

impl Interpreter {
    //==================================================
    // Section 1.0 - Entry Points
    //==================================================

    /// Evaluate `index` to a value symbol. Plain values evaluate to
    /// themselves (after following transfers); expressions produce temps.
    pub fn evaluate(&mut self, index: SymbolIndex) -> EngineResult<SymbolIndex> {
        if self.state.return_all {
            return Err(EngineError::Aborted);
        }
        let resolved = self.store.resolve(index)?;
        match self.store.value(resolved)? {
            SymbolValue::Expression(expression) => {
                let expression = expression.clone();
                self.evaluate_expression(&expression)
            }
            SymbolValue::ScalarPointer(pointer) => {
                let pointer = pointer.clone();
                let scalar = self.read_element(&pointer)?;
                self.store.allocate_temp(SymbolValue::Scalar(scalar))
            }
            SymbolValue::Undefined | SymbolValue::Transfer(None) => Err(EngineError::IllegalClass {
                what: self.store.describe(index),
                class: SymbolClass::Undefined,
                expected: "a defined value",
            }),
            value @ (SymbolValue::Keyword(_)
            | SymbolValue::Node(_)
            | SymbolValue::Routine(_)
            | SymbolValue::DeferredRoutine(_)
            | SymbolValue::Unused) => Err(EngineError::IllegalClass {
                what: self.store.describe(index),
                class: value.class(),
                expected: "an expression or value",
            }),
            _ => Ok(resolved),
        }
    }

    /// Like [`Interpreter::evaluate`], but an undefined variable is passed
    /// through untouched so a routine can use it as an output argument.
    pub(crate) fn evaluate_argument(&mut self, index: SymbolIndex) -> EngineResult<SymbolIndex> {
        let resolved = self.store.resolve(index)?;
        let symbol = self.store.get(resolved)?;
        if symbol.is_named()
            && matches!(symbol.value, SymbolValue::Undefined | SymbolValue::Transfer(None))
        {
            return Ok(resolved);
        }
        self.evaluate(index)
    }

    /// Detached copy of a value symbol's data for the operators.
    pub(crate) fn operand(&self, index: SymbolIndex) -> EngineResult<Operand> {
        match self.store.value(index)? {
            SymbolValue::Scalar(scalar) => Ok(Operand::Scalar(*scalar)),
            SymbolValue::Array(array) => Ok(Operand::Array(array.clone())),
            SymbolValue::Text(text) => Ok(Operand::Text(text.clone())),
            SymbolValue::FileMap(spec) => {
                let data = read_elements(&spec.path, spec.offset, spec.ty, spec.element_count())?;
                Ok(Operand::Array(ArrayValue::new(spec.dims.clone(), data)))
            }
            other => Err(EngineError::IllegalClass {
                what: self.store.describe(index),
                class: other.class(),
                expected: "a scalar, array or string operand",
            }),
        }
    }

    //==================================================
    // Section 2.0 - Expressions
    //==================================================

    fn evaluate_expression(&mut self, expression: &Expression) -> EngineResult<SymbolIndex> {
        match expression {
            Expression::Binary { op, lhs, rhs } => {
                let left = self.evaluate(*lhs)?;
                let left = self.operand(left)?;
                let right = self.evaluate(*rhs)?;
                let right = self.operand(right)?;
                let value = ops::binary(*op, left, right)?;
                self.store.allocate_temp(value)
            }
            Expression::Unary { op, operand } => {
                let value = self.evaluate(*operand)?;
                let value = ops::unary(*op, self.operand(value)?)?;
                self.store.allocate_temp(value)
            }
            Expression::NativeCall { routine, args } => {
                let result = self.call_native(*routine, args)?;
                result.ok_or_else(|| self.missing_result(self.natives.name_of(*routine)))
            }
            Expression::UserCall { routine, args } => {
                let result = self.call_user(*routine, args, RoutineKind::Function)?;
                result.ok_or_else(|| self.missing_result(&self.store.describe(*routine)))
            }
            Expression::IndirectCall { pointer, args } => self.call_indirect(*pointer, args),
            Expression::Extract { source, subscripts } => self.extract(*source, subscripts),
            Expression::Member { source, tag } => self.member(*source, tag),
            Expression::Concat { items } => self.concat(items),
            Expression::ListBuild { items } => self.build_list(items),
        }
    }

    fn missing_result(&self, routine: &str) -> EngineError {
        EngineError::IllegalClass {
            what: format!("result of {routine}"),
            class: SymbolClass::Undefined,
            expected: "a returned value",
        }
    }

    fn call_indirect(&mut self, pointer: SymbolIndex, args: &[SymbolIndex]) -> EngineResult<SymbolIndex> {
        let target = self.evaluate(pointer)?;
        let callee = match self.store.value(target)? {
            SymbolValue::FunctionPointer(callee) => *callee,
            other => {
                return Err(EngineError::IllegalClass {
                    what: self.store.describe(pointer),
                    class: other.class(),
                    expected: "a function pointer",
                });
            }
        };
        trace!(?callee, "indirect call");
        let result = match callee {
            Callee::Native(id) => {
                let kind = self.natives.routine(id)?.kind;
                if kind != NativeKind::Function {
                    return Err(EngineError::IllegalClass {
                        what: self.natives.name_of(id).to_string(),
                        class: SymbolClass::FunctionPointer,
                        expected: "a pointer to a function",
                    });
                }
                self.call_native(id, args)?
            }
            Callee::User(routine) => self.call_user(routine, args, RoutineKind::Function)?,
        };
        result.ok_or_else(|| self.missing_result(&self.store.describe(pointer)))
    }

    fn read_element(&self, pointer: &ElementRef) -> EngineResult<Scalar> {
        let target = self.store.resolve(pointer.target)?;
        match self.store.value(target)? {
            SymbolValue::Array(array) if pointer.element < array.element_count() => {
                Ok(array.data.scalar_at(pointer.element))
            }
            SymbolValue::Scalar(scalar) if pointer.element == 0 => Ok(*scalar),
            SymbolValue::Array(_) | SymbolValue::Scalar(_) => Err(EngineError::IllegalSubscript(
                format!("pointer element {} out of range", pointer.element),
            )),
            other => Err(EngineError::IllegalClass {
                what: self.store.describe(target),
                class: other.class(),
                expected: "an array",
            }),
        }
    }

    /// `source.TAG` on a list or struct yields the member's own symbol.
    fn member(&mut self, source: SymbolIndex, tag: &str) -> EngineResult<SymbolIndex> {
        let container = self.evaluate(source)?;
        match self.store.value(container)? {
            SymbolValue::List(members) | SymbolValue::Struct(members) => members
                .iter()
                .find(|member| member.tag.as_deref() == Some(tag))
                .map(|member| member.value)
                .ok_or_else(|| {
                    EngineError::IllegalSubscript(format!(
                        "{} has no member {tag}",
                        self.store.describe(source)
                    ))
                }),
            other => Err(EngineError::IllegalClass {
                what: self.store.describe(source),
                class: other.class(),
                expected: "a list or struct",
            }),
        }
    }

    //==================================================
    // Section 3.0 - Constructors
    //==================================================

    /// `[a, b, ...]`: scalars and arrays flatten into one vector of the
    /// widest element type; strings build a string array.
    fn concat(&mut self, items: &[SymbolIndex]) -> EngineResult<SymbolIndex> {
        let mut parts = Vec::with_capacity(items.len());
        for item in items {
            let value = self.evaluate(*item)?;
            parts.push(self.operand(value)?);
        }
        let text = parts.iter().filter(|part| is_text(part)).count();
        if parts.is_empty() || (text > 0 && text < parts.len()) {
            return Err(EngineError::unsupported(
                "array concatenation",
                if parts.is_empty() { "empty list" } else { "mixed strings and numbers" },
            ));
        }
        let data = if text > 0 {
            let mut strings = Vec::new();
            for part in parts {
                match part {
                    Operand::Text(text) => strings.push(text),
                    Operand::Array(array) => {
                        strings.extend((0..array.data.len()).map(|i| array.data.text_at(i)))
                    }
                    Operand::Scalar(scalar) => strings.push(scalar.to_string()),
                }
            }
            ArrayData::Text(strings)
        } else {
            let mut pieces = Vec::with_capacity(parts.len());
            let mut ty = NumericType::Byte;
            for part in parts {
                let piece = match part {
                    Operand::Scalar(scalar) => scalar.into_array(),
                    Operand::Array(array) => array.data,
                    Operand::Text(_) => continue,
                };
                ty = ty.promote(piece.numeric_type());
                pieces.push(piece);
            }
            let total = pieces.iter().map(ArrayData::len).sum();
            let mut data = ArrayData::zeros(ty, total);
            let mut at = 0;
            for piece in &pieces {
                for from in 0..piece.len() {
                    data.copy_element(at, piece, from);
                    at += 1;
                }
            }
            data
        };
        self.store.allocate_temp(SymbolValue::Array(ArrayValue::vector(data)))
    }

    /// `{a, TAG=b, /FLAG}`: every item is copied into a fresh temp owned by
    /// the new list. Tagged items make a `List`; untagged ones a
    /// `CompactList`.
    fn build_list(&mut self, items: &[SymbolIndex]) -> EngineResult<SymbolIndex> {
        let mut members = Vec::with_capacity(items.len());
        for item in items {
            let (tag, value) = match self.store.value(*item)? {
                SymbolValue::Keyword(keyword) => (Some(keyword.name.clone()), keyword.value),
                _ => (None, Some(*item)),
            };
            let element = match value {
                Some(value) => {
                    let evaluated = self.evaluate(value)?;
                    self.store.duplicate_to_temp(evaluated)?
                }
                None => self.store.allocate_temp(SymbolValue::Scalar(Scalar::Long(1)))?,
            };
            members.push(ListMember {
                tag,
                value: element,
            });
        }
        let value = if members.iter().all(|member| member.tag.is_none()) {
            SymbolValue::CompactList(members.into_iter().map(|member| member.value).collect())
        } else {
            SymbolValue::List(members)
        };
        self.store.allocate_temp(value)
    }
}

fn is_text(operand: &Operand) -> bool {
    match operand {
        Operand::Text(_) => true,
        Operand::Array(array) => array.data.numeric_type() == NumericType::Text,
        Operand::Scalar(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use crate::image::{Arg, Expr};
    use crate::interpreter::Interpreter;
    use crate::symbol::{ArrayData, ArrayValue, BinaryOp, Scalar, SymbolValue};

    #[test]
    fn closed_expressions_leave_no_temps_behind() {
        let mut interp = Interpreter::default();
        let before = interp.store.temp_top();
        let value = interp
            .eval(&Expr::binary(
                BinaryOp::Add,
                Expr::longs(&[1, 2, 3]),
                Expr::binary(BinaryOp::Mul, Expr::Long(2), Expr::Long(5)),
            ))
            .expect("eval");
        assert_eq!(
            value,
            SymbolValue::Array(ArrayValue::vector(ArrayData::Long(vec![11, 12, 13])))
        );
        assert_eq!(interp.store.temp_top(), before);
    }

    #[test]
    fn concatenation_promotes_to_the_widest_type() {
        let mut interp = Interpreter::default();
        let value = interp
            .eval(&Expr::Array(vec![Expr::Byte(1), Expr::doubles(&[2.5, 3.5])]))
            .expect("eval");
        assert_eq!(
            value,
            SymbolValue::Array(ArrayValue::vector(ArrayData::Double(vec![1.0, 2.5, 3.5])))
        );
        assert!(interp
            .eval(&Expr::Array(vec![Expr::Long(1), Expr::str("a")]))
            .is_err());
    }

    #[test]
    fn list_members_are_reachable_by_tag() {
        let mut interp = Interpreter::default();
        let list = Expr::List(vec![
            Arg::pos(Expr::Long(7)),
            Arg::key("name", Expr::str("orbit")),
            Arg::flag("fast"),
        ]);
        let name = interp
            .eval(&Expr::member(list.clone(), "name"))
            .expect("member");
        assert_eq!(name, SymbolValue::Text("orbit".into()));
        let fast = interp.eval(&Expr::member(list, "FAST")).expect("flag");
        assert_eq!(fast, SymbolValue::Scalar(Scalar::Long(1)));
    }

    #[test]
    fn undefined_variables_cannot_be_read() {
        let mut interp = Interpreter::default();
        assert!(interp.eval(&Expr::var("nothing_here")).is_err());
    }
}

//==================================================
// End of file
//==================================================
