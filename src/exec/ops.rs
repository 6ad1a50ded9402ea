//==================================================
// File: exec/ops.rs
//==================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Arithmetic, comparison and logical operators on values
// Objective: Promote operand types, broadcast scalars over arrays and
//            apply each operator in the integer, real or complex domain
//==================================================

use std::cmp::Ordering;

use num_complex::Complex64;

use crate::interpreter::errors::{EngineError, EngineResult};
use crate::symbol::{ArrayData, ArrayValue, BinaryOp, NumericType, Scalar, SymbolValue, UnaryOp, Wide};

/// An evaluated operand, detached from the store.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Scalar(Scalar),
    Array(ArrayValue),
    Text(String),
}

impl Operand {
    fn numeric(self) -> Option<(Option<Vec<usize>>, ArrayData)> {
        match self {
            Operand::Scalar(scalar) => Some((None, scalar.into_array())),
            Operand::Array(array) if array.data.numeric_type() != NumericType::Text => {
                Some((Some(array.dims), array.data))
            }
            _ => None,
        }
    }

    fn type_name(&self) -> String {
        match self {
            Operand::Scalar(scalar) => scalar.numeric_type().to_string(),
            Operand::Array(array) => array.data.numeric_type().to_string(),
            Operand::Text(_) => NumericType::Text.to_string(),
        }
    }
}

fn op_name(op: BinaryOp) -> &'static str {
    match op {
        BinaryOp::Add => "+",
        BinaryOp::Sub => "-",
        BinaryOp::Mul => "*",
        BinaryOp::Div => "/",
        BinaryOp::Mod => "mod",
        BinaryOp::Pow => "^",
        BinaryOp::Eq => "eq",
        BinaryOp::Ne => "ne",
        BinaryOp::Lt => "lt",
        BinaryOp::Le => "le",
        BinaryOp::Gt => "gt",
        BinaryOp::Ge => "ge",
        BinaryOp::And => "and",
        BinaryOp::Or => "or",
    }
}

fn truth(value: bool) -> Wide {
    Wide::Int(value as i64)
}

//==================================================
// Section 1.0 - Binary Operators
//==================================================

pub fn binary(op: BinaryOp, lhs: Operand, rhs: Operand) -> EngineResult<SymbolValue> {
    if let (Operand::Text(a), Operand::Text(b)) = (&lhs, &rhs) {
        return text_binary(op, a, b);
    }
    let (lhs_name, rhs_name) = (lhs.type_name(), rhs.type_name());
    let (Some((lhs_dims, lhs_data)), Some((rhs_dims, rhs_data))) = (lhs.numeric(), rhs.numeric())
    else {
        return Err(EngineError::unsupported(
            format!("operator {}", op_name(op)),
            format!("{lhs_name} with {rhs_name}"),
        ));
    };

    let count = match (&lhs_dims, &rhs_dims) {
        (Some(_), Some(_)) if lhs_data.len() != rhs_data.len() => {
            return Err(EngineError::Arithmetic(format!(
                "operand sizes differ ({} vs {})",
                lhs_data.len(),
                rhs_data.len()
            )));
        }
        (Some(_), _) => lhs_data.len(),
        (None, Some(_)) => rhs_data.len(),
        (None, None) => 1,
    };
    let lhs_scalar = lhs_dims.is_none();
    let rhs_scalar = rhs_dims.is_none();
    let dims = lhs_dims.or(rhs_dims);

    let ty = lhs_data.numeric_type().promote(rhs_data.numeric_type());
    let result_ty = if op.is_comparison() || matches!(op, BinaryOp::And | BinaryOp::Or) {
        NumericType::Long
    } else {
        ty
    };
    let mut out = ArrayData::zeros(result_ty, count);
    for index in 0..count {
        let a = lhs_data.wide_at(if lhs_scalar { 0 } else { index });
        let b = rhs_data.wide_at(if rhs_scalar { 0 } else { index });
        out.store_wide(index, apply(op, ty, a, b)?);
    }
    Ok(match dims {
        None => SymbolValue::Scalar(out.scalar_at(0)),
        Some(dims) => SymbolValue::Array(ArrayValue::new(dims, out)),
    })
}

fn apply(op: BinaryOp, ty: NumericType, a: Wide, b: Wide) -> EngineResult<Wide> {
    match op {
        BinaryOp::And => return Ok(truth(a.is_truthy() && b.is_truthy())),
        BinaryOp::Or => return Ok(truth(a.is_truthy() || b.is_truthy())),
        _ => {}
    }
    if ty.is_integer() {
        integer_op(op, a.as_i64(), b.as_i64())
    } else if ty.is_complex() {
        complex_op(op, ty, a.as_complex(), b.as_complex())
    } else {
        Ok(real_op(op, a.as_f64(), b.as_f64()))
    }
}

fn integer_op(op: BinaryOp, x: i64, y: i64) -> EngineResult<Wide> {
    Ok(match op {
        BinaryOp::Add => Wide::Int(x.wrapping_add(y)),
        BinaryOp::Sub => Wide::Int(x.wrapping_sub(y)),
        BinaryOp::Mul => Wide::Int(x.wrapping_mul(y)),
        BinaryOp::Div if y == 0 => {
            return Err(EngineError::Arithmetic("integer division by zero".into()));
        }
        BinaryOp::Div => Wide::Int(x.wrapping_div(y)),
        BinaryOp::Mod if y == 0 => {
            return Err(EngineError::Arithmetic("integer modulo by zero".into()));
        }
        BinaryOp::Mod => Wide::Int(x.wrapping_rem(y)),
        BinaryOp::Pow if y >= 0 => Wide::Int(x.wrapping_pow(u32::try_from(y).unwrap_or(u32::MAX))),
        BinaryOp::Pow => Wide::Real((x as f64).powf(y as f64)),
        BinaryOp::Eq => truth(x == y),
        BinaryOp::Ne => truth(x != y),
        BinaryOp::Lt => truth(x < y),
        BinaryOp::Le => truth(x <= y),
        BinaryOp::Gt => truth(x > y),
        BinaryOp::Ge => truth(x >= y),
        BinaryOp::And | BinaryOp::Or => truth(false),
    })
}

fn real_op(op: BinaryOp, x: f64, y: f64) -> Wide {
    match op {
        BinaryOp::Add => Wide::Real(x + y),
        BinaryOp::Sub => Wide::Real(x - y),
        BinaryOp::Mul => Wide::Real(x * y),
        BinaryOp::Div => Wide::Real(x / y),
        BinaryOp::Mod => Wide::Real(x % y),
        BinaryOp::Pow => Wide::Real(x.powf(y)),
        BinaryOp::Eq => truth(x == y),
        BinaryOp::Ne => truth(x != y),
        BinaryOp::Lt => truth(x < y),
        BinaryOp::Le => truth(x <= y),
        BinaryOp::Gt => truth(x > y),
        BinaryOp::Ge => truth(x >= y),
        BinaryOp::And | BinaryOp::Or => truth(false),
    }
}

fn complex_op(op: BinaryOp, ty: NumericType, x: Complex64, y: Complex64) -> EngineResult<Wide> {
    Ok(match op {
        BinaryOp::Add => Wide::Complex(x + y),
        BinaryOp::Sub => Wide::Complex(x - y),
        BinaryOp::Mul => Wide::Complex(x * y),
        BinaryOp::Div => Wide::Complex(x / y),
        BinaryOp::Pow => Wide::Complex(x.powc(y)),
        BinaryOp::Eq => truth(x == y),
        BinaryOp::Ne => truth(x != y),
        _ => return Err(EngineError::unsupported(format!("operator {}", op_name(op)), ty)),
    })
}

fn text_binary(op: BinaryOp, a: &str, b: &str) -> EngineResult<SymbolValue> {
    let ordering = a.cmp(b);
    let flag = |value: bool| Ok(SymbolValue::Scalar(Scalar::Long(value as i32)));
    match op {
        BinaryOp::Add => Ok(SymbolValue::Text(format!("{a}{b}"))),
        BinaryOp::Eq => flag(ordering == Ordering::Equal),
        BinaryOp::Ne => flag(ordering != Ordering::Equal),
        BinaryOp::Lt => flag(ordering == Ordering::Less),
        BinaryOp::Le => flag(ordering != Ordering::Greater),
        BinaryOp::Gt => flag(ordering == Ordering::Greater),
        BinaryOp::Ge => flag(ordering != Ordering::Less),
        _ => Err(EngineError::unsupported(
            format!("operator {}", op_name(op)),
            NumericType::Text,
        )),
    }
}

//==================================================
// Section 2.0 - Unary Operators
//==================================================

pub fn unary(op: UnaryOp, operand: Operand) -> EngineResult<SymbolValue> {
    let name = operand.type_name();
    let Some((dims, data)) = operand.numeric() else {
        let operation = match op {
            UnaryOp::Neg => "negation",
            UnaryOp::Not => "logical not",
        };
        return Err(EngineError::unsupported(operation, name));
    };
    let ty = data.numeric_type();
    let result_ty = match op {
        UnaryOp::Neg => ty,
        UnaryOp::Not => NumericType::Long,
    };
    let mut out = ArrayData::zeros(result_ty, data.len());
    for index in 0..data.len() {
        let value = data.wide_at(index);
        let result = match (op, value) {
            (UnaryOp::Not, value) => truth(!value.is_truthy()),
            (UnaryOp::Neg, Wide::Int(v)) => Wide::Int(v.wrapping_neg()),
            (UnaryOp::Neg, Wide::Real(v)) => Wide::Real(-v),
            (UnaryOp::Neg, Wide::Complex(c)) => Wide::Complex(-c),
        };
        out.store_wide(index, result);
    }
    Ok(match dims {
        None => SymbolValue::Scalar(out.scalar_at(0)),
        Some(dims) => SymbolValue::Array(ArrayValue::new(dims, out)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn longs(values: &[i32]) -> Operand {
        Operand::Array(ArrayValue::vector(ArrayData::Long(values.to_vec())))
    }

    #[test]
    fn scalars_broadcast_and_types_promote() {
        let result = binary(BinaryOp::Mul, longs(&[1, 2, 3]), Operand::Scalar(Scalar::Double(0.5)))
            .expect("multiply");
        assert_eq!(
            result,
            SymbolValue::Array(ArrayValue::vector(ArrayData::Double(vec![0.5, 1.0, 1.5])))
        );
    }

    #[test]
    fn comparisons_yield_long_flags() {
        let result = binary(BinaryOp::Gt, longs(&[1, 5]), Operand::Scalar(Scalar::Float(2.0)))
            .expect("compare");
        assert_eq!(
            result,
            SymbolValue::Array(ArrayValue::vector(ArrayData::Long(vec![0, 1])))
        );
    }

    #[test]
    fn integer_division_by_zero_is_an_error() {
        let err = binary(
            BinaryOp::Div,
            Operand::Scalar(Scalar::Long(1)),
            Operand::Scalar(Scalar::Long(0)),
        )
        .expect_err("division by zero");
        assert!(matches!(err, EngineError::Arithmetic(_)));
    }

    #[test]
    fn mismatched_array_sizes_are_rejected() {
        assert!(binary(BinaryOp::Add, longs(&[1, 2]), longs(&[1, 2, 3])).is_err());
    }

    #[test]
    fn strings_concatenate_and_compare() {
        let joined = binary(
            BinaryOp::Add,
            Operand::Text("ab".into()),
            Operand::Text("cd".into()),
        )
        .expect("concat");
        assert_eq!(joined, SymbolValue::Text("abcd".into()));
        let less = binary(
            BinaryOp::Lt,
            Operand::Text("a".into()),
            Operand::Text("b".into()),
        )
        .expect("compare");
        assert_eq!(less, SymbolValue::Scalar(Scalar::Long(1)));
        assert!(binary(BinaryOp::Mul, Operand::Text("a".into()), Operand::Scalar(Scalar::Long(2))).is_err());
    }

    #[test]
    fn complex_ordering_is_unsupported() {
        let z = Operand::Scalar(Scalar::CDouble(Complex64::new(1.0, 1.0)));
        assert!(matches!(
            binary(BinaryOp::Lt, z.clone(), z),
            Err(EngineError::TypeUnsupported { .. })
        ));
    }

    #[test]
    fn byte_negation_saturates_at_zero() {
        let result = unary(UnaryOp::Neg, Operand::Scalar(Scalar::Byte(5))).expect("negate");
        assert_eq!(result, SymbolValue::Scalar(Scalar::Byte(0)));
    }
}

//==================================================
// End of file
//==================================================
