//==================================================
// File: native/library.rs
//==================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Built-in routine set
// Objective: Array constructors, conversions, introspection, reductions,
//            elementwise math, calendar, file-backed variables and output,
//            each registered with its keyword descriptor
//==================================================

use std::path::PathBuf;

use num_complex::Complex64;

use super::{kernels, NativeArgs, NativeRegistry, NativeRoutine};
use crate::exec::ops::Operand;
use crate::interpreter::errors::{ArityProblem, EngineError, EngineResult};
use crate::interpreter::Interpreter;
use crate::symbol::{
    ArrayData, ArrayValue, AssocSpec, FileMapSpec, NumericType, Scalar, SymbolIndex, SymbolValue, Wide,
};

type NativeResult = EngineResult<Option<SymbolIndex>>;

const DIMS: &str = "d1 d2 d3 d4 d5 d6 d7 d8";

//==================================================
// Section 1.0 - Registration
//==================================================

pub fn register_all(registry: &mut NativeRegistry) {
    for (name, entry) in [
        ("BYTARR", bytarr as super::NativeFn),
        ("INTARR", intarr),
        ("LONARR", lonarr),
        ("INT64ARR", int64arr),
        ("FLTARR", fltarr),
        ("DBLARR", dblarr),
        ("CFLTARR", cfltarr),
        ("CDBLARR", cdblarr),
        ("STRARR", strarr),
        ("INDGEN", indgen),
    ] {
        registry.register(NativeRoutine::function(name, 1, DIMS, entry).trimmed());
    }
    for (name, entry) in [
        ("BYTE", to_byte as super::NativeFn),
        ("WORD", to_word),
        ("LONG", to_long),
        ("INT64", to_int64),
        ("FLOAT", to_float),
        ("DOUBLE", to_double),
        ("CFLOAT", to_cfloat),
        ("CDOUBLE", to_cdouble),
        ("STRING", to_string),
        ("NUM_ELEM", num_elem),
        ("DIMEN", dimen),
        ("TYPE", type_code),
        ("SQRT", sqrt),
        ("SIN", sin),
        ("COS", cos),
        ("ABS", abs),
    ] {
        registry.register(NativeRoutine::function(name, 1, "x", entry));
    }
    registry.register(NativeRoutine::function("SYMCLASS", 1, "x*", symclass));
    registry.register(NativeRoutine::function("DEFINED", 1, "x*", defined));
    registry.register(NativeRoutine::function("TOTAL", 1, "x 2double 1mean", total));
    registry.register(NativeRoutine::function("CAL_JD", 3, "year month day", cal_jd));
    registry.register(NativeRoutine::function(
        "FILEMAP",
        3,
        "file type dims offset readonly",
        filemap,
    ));
    registry.register(NativeRoutine::function(
        "ASSOC",
        3,
        "file type record offset readonly",
        assoc,
    ));
    registry.register(NativeRoutine::subroutine("ZERO", 1, "vars", zero).variadic());
    registry.register(NativeRoutine::subroutine("PRINT", 0, "items 1join", print).variadic());
}

//==================================================
// Section 2.0 - Argument Helpers
//==================================================

fn give(interp: &mut Interpreter, value: SymbolValue) -> NativeResult {
    interp.store.allocate_temp(value).map(Some)
}

fn operand_at(interp: &Interpreter, args: &NativeArgs, slot: usize, routine: &str) -> EngineResult<Operand> {
    interp.operand(args.require(slot, routine)?)
}

/// Element data of a numeric operand, with its dimensions (`None` for a
/// scalar).
fn numeric(operand: Operand, routine: &str) -> EngineResult<(Option<Vec<usize>>, ArrayData)> {
    match operand {
        Operand::Scalar(scalar) => Ok((None, scalar.into_array())),
        Operand::Array(array) if array.data.numeric_type() != NumericType::Text => {
            Ok((Some(array.dims), array.data))
        }
        Operand::Array(_) | Operand::Text(_) => Err(EngineError::unsupported(routine, NumericType::Text)),
    }
}

fn shaped(dims: Option<Vec<usize>>, data: ArrayData) -> SymbolValue {
    match dims {
        Some(dims) => SymbolValue::Array(ArrayValue::new(dims, data)),
        None => SymbolValue::Scalar(data.scalar_at(0)),
    }
}

fn dims_of(interp: &Interpreter, index: SymbolIndex, routine: &str, dims: &mut Vec<usize>) -> EngineResult<()> {
    let values: Vec<i64> = match interp.operand(index)? {
        Operand::Scalar(scalar) => vec![scalar.as_i64()],
        Operand::Array(array) => (0..array.element_count()).map(|k| array.data.wide_at(k).as_i64()).collect(),
        Operand::Text(_) => return Err(EngineError::unsupported(routine, NumericType::Text)),
    };
    for value in values {
        let dim = usize::try_from(value)
            .ok()
            .filter(|dim| *dim > 0)
            .ok_or_else(|| EngineError::IllegalSubscript(format!("{routine}: dimension {value} must be positive")))?;
        dims.push(dim);
    }
    Ok(())
}

/// Dimensions spread over every bound slot from `first` on; each slot holds
/// a size or an array of sizes.
fn dims_from(interp: &Interpreter, args: &NativeArgs, first: usize, routine: &str) -> EngineResult<Vec<usize>> {
    let mut dims = Vec::new();
    for slot in first..args.len() {
        if let Some(index) = args.get(slot) {
            dims_of(interp, index, routine, &mut dims)?;
        }
    }
    if dims.is_empty() {
        return Err(EngineError::arity(routine, ArityProblem::TooFew { min: 1, given: 0 }));
    }
    Ok(dims)
}

fn text_at(interp: &Interpreter, args: &NativeArgs, slot: usize, routine: &str) -> EngineResult<String> {
    let index = args.require(slot, routine)?;
    match interp.store.value(index)? {
        SymbolValue::Text(text) => Ok(text.clone()),
        other => Err(EngineError::IllegalClass {
            what: format!("{routine} argument {}", slot + 1),
            class: other.class(),
            expected: "a string",
        }),
    }
}

pub fn type_from_code(code: i64) -> Option<NumericType> {
    Some(match code {
        1 => NumericType::Byte,
        2 => NumericType::Word,
        3 => NumericType::Long,
        4 => NumericType::Float,
        5 => NumericType::Double,
        6 => NumericType::CFloat,
        7 => NumericType::Text,
        9 => NumericType::CDouble,
        14 => NumericType::Int64,
        _ => return None,
    })
}

pub fn code_of(ty: NumericType) -> i32 {
    match ty {
        NumericType::Byte => 1,
        NumericType::Word => 2,
        NumericType::Long => 3,
        NumericType::Float => 4,
        NumericType::Double => 5,
        NumericType::CFloat => 6,
        NumericType::Text => 7,
        NumericType::CDouble => 9,
        NumericType::Int64 => 14,
    }
}

/// Path, element type, shape, byte offset and read-only flag shared by
/// `FILEMAP` and `ASSOC`.
fn file_layout(
    interp: &mut Interpreter,
    args: &NativeArgs,
    routine: &str,
) -> EngineResult<(PathBuf, NumericType, Vec<usize>, u64, bool)> {
    let path = PathBuf::from(text_at(interp, args, 0, routine)?);
    let code = interp.integer_value(args.require(1, routine)?)?;
    let ty = type_from_code(code)
        .filter(|ty| ty.byte_size().is_some())
        .ok_or_else(|| EngineError::unsupported(routine, format!("type code {code}")))?;
    let mut dims = Vec::new();
    dims_of(interp, args.require(2, routine)?, routine, &mut dims)?;
    let offset = match args.get(3) {
        Some(index) => {
            let offset = interp.integer_value(index)?;
            u64::try_from(offset)
                .map_err(|_| EngineError::IllegalSubscript(format!("{routine}: negative offset {offset}")))?
        }
        None => 0,
    };
    let readonly = match args.get(4) {
        Some(index) => interp.condition(index)?,
        None => false,
    };
    Ok((path, ty, dims, offset, readonly))
}

//==================================================
// Section 3.0 - Constructors & Conversions
//==================================================

fn make_array(interp: &mut Interpreter, args: &NativeArgs, ty: NumericType, routine: &str) -> NativeResult {
    let dims = dims_from(interp, args, 0, routine)?;
    give(interp, SymbolValue::Array(ArrayValue::zeros(ty, dims)))
}

macro_rules! array_constructor {
    ($name:ident, $ty:ident, $label:literal) => {
        fn $name(interp: &mut Interpreter, args: &NativeArgs) -> NativeResult {
            make_array(interp, args, NumericType::$ty, $label)
        }
    };
}

array_constructor!(bytarr, Byte, "BYTARR");
array_constructor!(intarr, Word, "INTARR");
array_constructor!(lonarr, Long, "LONARR");
array_constructor!(int64arr, Int64, "INT64ARR");
array_constructor!(fltarr, Float, "FLTARR");
array_constructor!(dblarr, Double, "DBLARR");
array_constructor!(cfltarr, CFloat, "CFLTARR");
array_constructor!(cdblarr, CDouble, "CDBLARR");
array_constructor!(strarr, Text, "STRARR");

fn indgen(interp: &mut Interpreter, args: &NativeArgs) -> NativeResult {
    let dims = dims_from(interp, args, 0, "INDGEN")?;
    let count: usize = dims.iter().product();
    let mut data = ArrayData::zeros(NumericType::Long, count);
    for k in 0..count {
        data.store_wide(k, Wide::Int(k as i64));
    }
    give(interp, SymbolValue::Array(ArrayValue::new(dims, data)))
}

fn convert(interp: &mut Interpreter, args: &NativeArgs, ty: NumericType, routine: &str) -> NativeResult {
    let value = match operand_at(interp, args, 0, routine)? {
        Operand::Scalar(scalar) if ty == NumericType::Text => SymbolValue::Text(scalar.into_array().text_at(0)),
        Operand::Scalar(scalar) => SymbolValue::Scalar(scalar.convert(ty)),
        Operand::Array(array) => SymbolValue::Array(ArrayValue::new(array.dims, array.data.convert(ty))),
        Operand::Text(text) if ty == NumericType::Text => SymbolValue::Text(text),
        Operand::Text(text) => SymbolValue::Scalar(Scalar::from_wide(ty, Wide::parse(&text))),
    };
    give(interp, value)
}

macro_rules! conversion {
    ($name:ident, $ty:ident, $label:literal) => {
        fn $name(interp: &mut Interpreter, args: &NativeArgs) -> NativeResult {
            convert(interp, args, NumericType::$ty, $label)
        }
    };
}

conversion!(to_byte, Byte, "BYTE");
conversion!(to_word, Word, "WORD");
conversion!(to_long, Long, "LONG");
conversion!(to_int64, Int64, "INT64");
conversion!(to_float, Float, "FLOAT");
conversion!(to_double, Double, "DOUBLE");
conversion!(to_cfloat, CFloat, "CFLOAT");
conversion!(to_cdouble, CDouble, "CDOUBLE");
conversion!(to_string, Text, "STRING");

//==================================================
// Section 4.0 - Introspection
//==================================================

fn long(value: usize) -> SymbolValue {
    SymbolValue::Scalar(Scalar::Long(i32::try_from(value).unwrap_or(i32::MAX)))
}

fn num_elem(interp: &mut Interpreter, args: &NativeArgs) -> NativeResult {
    let index = interp.store.resolve(args.require(0, "NUM_ELEM")?)?;
    let count = match interp.store.value(index)? {
        SymbolValue::Scalar(_) | SymbolValue::Text(_) => 1,
        SymbolValue::Array(array) => array.element_count(),
        SymbolValue::List(members) | SymbolValue::Struct(members) => members.len(),
        SymbolValue::CompactList(items) => items.len(),
        SymbolValue::FileMap(spec) => spec.element_count(),
        SymbolValue::Assoc(spec) => {
            let record_bytes = spec.ty.byte_size().unwrap_or(1) * spec.record_len();
            crate::subscript::file::stored_elements(&spec.path, spec.offset, record_bytes)?
        }
        _ => 0,
    };
    give(interp, long(count))
}

fn dimen(interp: &mut Interpreter, args: &NativeArgs) -> NativeResult {
    let index = interp.store.resolve(args.require(0, "DIMEN")?)?;
    let dims = match interp.store.value(index)? {
        SymbolValue::Array(array) => array.dims.clone(),
        SymbolValue::FileMap(spec) => spec.dims.clone(),
        SymbolValue::Assoc(spec) => spec.record_dims.clone(),
        SymbolValue::List(members) | SymbolValue::Struct(members) => vec![members.len()],
        SymbolValue::CompactList(items) => vec![items.len()],
        SymbolValue::Scalar(_) | SymbolValue::Text(_) => vec![1],
        _ => vec![0],
    };
    let data = ArrayData::from_vec(dims.iter().map(|dim| i32::try_from(*dim).unwrap_or(i32::MAX)).collect());
    give(interp, SymbolValue::Array(ArrayValue::vector(data)))
}

fn type_code(interp: &mut Interpreter, args: &NativeArgs) -> NativeResult {
    let index = interp.store.resolve(args.require(0, "TYPE")?)?;
    let value = interp.store.value(index)?;
    let code = match value {
        SymbolValue::Text(_) => code_of(NumericType::Text),
        SymbolValue::List(_) | SymbolValue::CompactList(_) | SymbolValue::Struct(_) => 8,
        other => other.numeric_type().map(code_of).unwrap_or(0),
    };
    give(interp, SymbolValue::Scalar(Scalar::Long(code)))
}

fn symclass(interp: &mut Interpreter, args: &NativeArgs) -> NativeResult {
    let index = interp.store.resolve(args.require(0, "SYMCLASS")?)?;
    let class = interp.store.class(index)?;
    give(interp, SymbolValue::Text(class.name().to_ascii_uppercase()))
}

fn defined(interp: &mut Interpreter, args: &NativeArgs) -> NativeResult {
    let index = interp.store.resolve(args.require(0, "DEFINED")?)?;
    let undefined = matches!(
        interp.store.value(index)?,
        SymbolValue::Undefined | SymbolValue::Unused | SymbolValue::Transfer(None)
    );
    give(interp, SymbolValue::Scalar(Scalar::Long(i32::from(!undefined))))
}

//==================================================
// Section 5.0 - Math
//==================================================

const TOTAL_MEAN: u32 = 1;
const TOTAL_DOUBLE: u32 = 2;

fn total(interp: &mut Interpreter, args: &NativeArgs) -> NativeResult {
    let (_, data) = numeric(operand_at(interp, args, 0, "TOTAL")?, "TOTAL")?;
    let ty = data.numeric_type();
    let double = args.modes.contains(TOTAL_DOUBLE) || matches!(ty, NumericType::Double | NumericType::CDouble);
    let mean = args.modes.contains(TOTAL_MEAN);
    let empty = || EngineError::Arithmetic("TOTAL: mean of no elements".into());

    let result = if ty.is_complex() {
        let parts: Vec<Complex64> = (0..data.len()).map(|k| data.wide_at(k).as_complex()).collect();
        let re: Vec<f64> = parts.iter().map(|c| c.re).collect();
        let im: Vec<f64> = parts.iter().map(|c| c.im).collect();
        let sum = if mean {
            Complex64::new(kernels::mean(&re).ok_or_else(empty)?, kernels::mean(&im).ok_or_else(empty)?)
        } else {
            Complex64::new(kernels::total(&re), kernels::total(&im))
        };
        let ty = if double { NumericType::CDouble } else { NumericType::CFloat };
        Scalar::from_wide(ty, Wide::Complex(sum))
    } else {
        let values = data.to_f64_vec();
        let sum = if mean {
            kernels::mean(&values).ok_or_else(empty)?
        } else {
            kernels::total(&values)
        };
        let ty = if double { NumericType::Double } else { NumericType::Float };
        Scalar::from_wide(ty, Wide::Real(sum))
    };
    give(interp, SymbolValue::Scalar(result))
}

fn elementwise(interp: &mut Interpreter, args: &NativeArgs, routine: &str, f: fn(f64) -> f64) -> NativeResult {
    let (dims, data) = numeric(operand_at(interp, args, 0, routine)?, routine)?;
    let ty = data.numeric_type();
    if ty.is_complex() {
        return Err(EngineError::unsupported(routine, ty));
    }
    let out_ty = if ty == NumericType::Double { NumericType::Double } else { NumericType::Float };
    let values = kernels::map(&data.to_f64_vec(), f);
    let mut out = ArrayData::zeros(out_ty, values.len());
    for (k, value) in values.into_iter().enumerate() {
        out.store_wide(k, Wide::Real(value));
    }
    give(interp, shaped(dims, out))
}

fn sqrt(interp: &mut Interpreter, args: &NativeArgs) -> NativeResult {
    elementwise(interp, args, "SQRT", f64::sqrt)
}

fn sin(interp: &mut Interpreter, args: &NativeArgs) -> NativeResult {
    elementwise(interp, args, "SIN", f64::sin)
}

fn cos(interp: &mut Interpreter, args: &NativeArgs) -> NativeResult {
    elementwise(interp, args, "COS", f64::cos)
}

/// Integers and reals keep their type; complex values become their
/// magnitude in the matching real precision.
fn abs(interp: &mut Interpreter, args: &NativeArgs) -> NativeResult {
    let (dims, data) = numeric(operand_at(interp, args, 0, "ABS")?, "ABS")?;
    let out_ty = match data.numeric_type() {
        NumericType::CFloat => NumericType::Float,
        NumericType::CDouble => NumericType::Double,
        other => other,
    };
    let mut out = ArrayData::zeros(out_ty, data.len());
    for k in 0..data.len() {
        let magnitude = match data.wide_at(k) {
            Wide::Int(v) => Wide::Int(v.saturating_abs()),
            Wide::Real(v) => Wide::Real(v.abs()),
            Wide::Complex(c) => Wide::Real(c.norm()),
        };
        out.store_wide(k, magnitude);
    }
    give(interp, shaped(dims, out))
}

fn cal_jd(interp: &mut Interpreter, args: &NativeArgs) -> NativeResult {
    let year = interp.integer_value(args.require(0, "CAL_JD")?)?;
    let month = interp.integer_value(args.require(1, "CAL_JD")?)?;
    let day = interp.scalar_value(args.require(2, "CAL_JD")?)?.as_f64();
    if !(1..=12).contains(&month) {
        return Err(EngineError::Arithmetic(format!("CAL_JD: month {month} out of range")));
    }
    give(interp, SymbolValue::Scalar(Scalar::Double(kernels::julian_day(year, month, day))))
}

//==================================================
// Section 6.0 - File Variables
//==================================================

fn filemap(interp: &mut Interpreter, args: &NativeArgs) -> NativeResult {
    let (path, ty, dims, offset, readonly) = file_layout(interp, args, "FILEMAP")?;
    give(
        interp,
        SymbolValue::FileMap(FileMapSpec {
            path,
            ty,
            dims,
            offset,
            readonly,
        }),
    )
}

fn assoc(interp: &mut Interpreter, args: &NativeArgs) -> NativeResult {
    let (path, ty, record_dims, offset, readonly) = file_layout(interp, args, "ASSOC")?;
    give(
        interp,
        SymbolValue::Assoc(AssocSpec {
            path,
            ty,
            record_dims,
            offset,
            readonly,
        }),
    )
}

//==================================================
// Section 7.0 - Subroutines
//==================================================

fn list_items(interp: &Interpreter, args: &NativeArgs) -> EngineResult<Vec<SymbolIndex>> {
    match args.get(0) {
        None => Ok(Vec::new()),
        Some(index) => match interp.store.value(index)? {
            SymbolValue::CompactList(items) => Ok(items.clone()),
            _ => Ok(vec![index]),
        },
    }
}

/// Reset each named variable to zero of its own type and shape.
fn zero(interp: &mut Interpreter, args: &NativeArgs) -> NativeResult {
    for item in list_items(interp, args)? {
        let target = interp.store.resolve(item)?;
        let what = interp.store.describe(target);
        match interp.store.value_mut(target)? {
            SymbolValue::Scalar(scalar) => *scalar = Scalar::from_wide(scalar.numeric_type(), Wide::Int(0)),
            SymbolValue::Array(array) => array.data = ArrayData::zeros(array.data.numeric_type(), array.data.len()),
            SymbolValue::Text(text) => text.clear(),
            other => {
                return Err(EngineError::IllegalClass {
                    what,
                    class: other.class(),
                    expected: "a scalar, array or string",
                });
            }
        }
    }
    Ok(None)
}

const PRINT_JOIN: u32 = 1;

fn print(interp: &mut Interpreter, args: &NativeArgs) -> NativeResult {
    let mut pieces = Vec::new();
    for item in list_items(interp, args)? {
        let item = interp.store.resolve(item)?;
        pieces.push(match interp.store.value(item)? {
            SymbolValue::Scalar(scalar) => scalar.to_string(),
            SymbolValue::Text(text) => text.clone(),
            SymbolValue::Array(array) => (0..array.element_count())
                .map(|k| array.data.text_at(k))
                .collect::<Vec<_>>()
                .join(" "),
            other => {
                return Err(EngineError::IllegalClass {
                    what: interp.store.describe(item),
                    class: other.class(),
                    expected: "a printable value",
                });
            }
        });
    }
    let separator = if args.modes.contains(PRINT_JOIN) { "" } else { " " };
    let line = pieces.join(separator);
    interp.write_output(&line);
    Ok(None)
}

#[cfg(test)]
mod tests {
    use crate::image::{Arg, Expr, ProgramImage, Stmt};
    use crate::interpreter::errors::EngineError;
    use crate::interpreter::Interpreter;
    use crate::symbol::{ArrayData, Scalar, SymbolValue};

    fn call(name: &str, args: Vec<Arg>) -> Expr {
        Expr::call(name, args)
    }

    #[test]
    fn constructors_build_zeroed_arrays_of_the_requested_shape() {
        let mut interp = Interpreter::default();
        let value = interp
            .eval(&call("lonarr", vec![Arg::pos(Expr::Long(3)), Arg::pos(Expr::Long(2))]))
            .expect("lonarr");
        match value {
            SymbolValue::Array(array) => {
                assert_eq!(array.dims, vec![3, 2]);
                assert_eq!(array.data, ArrayData::Long(vec![0; 6]));
            }
            other => panic!("expected an array, got {other:?}"),
        }
        assert!(matches!(
            interp.eval(&call("bytarr", vec![Arg::pos(Expr::Long(0))])),
            Err(EngineError::IllegalSubscript(_))
        ));
    }

    #[test]
    fn total_honours_mean_and_double_modes() {
        let mut interp = Interpreter::default();
        let data = Expr::doubles(&[1.0, 2.0, 6.0]);
        assert_eq!(
            interp.eval(&call("total", vec![Arg::pos(data.clone())])).expect("sum"),
            SymbolValue::Scalar(Scalar::Double(9.0))
        );
        assert_eq!(
            interp
                .eval(&call("total", vec![Arg::pos(data), Arg::flag("mean")]))
                .expect("mean"),
            SymbolValue::Scalar(Scalar::Double(3.0))
        );
        assert_eq!(
            interp
                .eval(&call("total", vec![Arg::pos(Expr::longs(&[1, 2])), Arg::flag("nodouble")]))
                .expect("float"),
            SymbolValue::Scalar(Scalar::Float(3.0))
        );
    }

    #[test]
    fn conversions_saturate_and_format() {
        let mut interp = Interpreter::default();
        assert_eq!(
            interp.eval(&call("byte", vec![Arg::pos(Expr::Long(300))])).expect("byte"),
            SymbolValue::Scalar(Scalar::Byte(255))
        );
        assert_eq!(
            interp.eval(&call("string", vec![Arg::pos(Expr::Long(42))])).expect("string"),
            SymbolValue::Text("42".into())
        );
        assert_eq!(
            interp.eval(&call("long", vec![Arg::pos(Expr::str(" 17 "))])).expect("parse"),
            SymbolValue::Scalar(Scalar::Long(17))
        );
    }

    #[test]
    fn defined_and_symclass_see_the_raw_argument() {
        let mut interp = Interpreter::default();
        assert_eq!(
            interp.eval(&call("defined", vec![Arg::pos(Expr::var("nothing"))])).expect("defined"),
            SymbolValue::Scalar(Scalar::Long(0))
        );
        interp
            .set_variable("a", SymbolValue::Scalar(Scalar::Long(1)))
            .expect("a");
        assert_eq!(
            interp.eval(&call("symclass", vec![Arg::pos(Expr::var("a"))])).expect("class"),
            SymbolValue::Text("SCALAR".into())
        );
    }

    #[test]
    fn zero_and_print_work_through_variadic_lists() {
        let mut interp = Interpreter::default();
        let output = interp.capture_output();
        let report = interp
            .run_image(
                &ProgramImage::new()
                    .statement(Stmt::assign("a", Expr::Long(5)))
                    .statement(Stmt::assign("b", Expr::doubles(&[1.5, 2.5])))
                    .statement(Stmt::call("zero", vec![Arg::pos(Expr::var("a")), Arg::pos(Expr::var("b"))]))
                    .statement(Stmt::call(
                        "print",
                        vec![Arg::pos(Expr::str("a=")), Arg::pos(Expr::var("a")), Arg::flag("join")],
                    ))
                    .statement(Stmt::call("print", vec![Arg::pos(Expr::var("b"))])),
            )
            .expect("run");
        assert!(report.is_success(), "{:?}", report.errors);
        assert_eq!(interp.scalar("a"), Some(Scalar::Long(0)));
        assert_eq!(output.lock().as_str(), "a=0\n0 0\n");
    }

    #[test]
    fn cal_jd_returns_the_julian_day() {
        let mut interp = Interpreter::default();
        assert_eq!(
            interp
                .eval(&call(
                    "cal_jd",
                    vec![Arg::pos(Expr::Long(2000)), Arg::pos(Expr::Long(1)), Arg::pos(Expr::Long(1))],
                ))
                .expect("jd"),
            SymbolValue::Scalar(Scalar::Double(2_451_545.0))
        );
    }
}

//==================================================
// End of file
//==================================================
