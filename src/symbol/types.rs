//==================================================
// File: symbol/types.rs
//==================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Numeric type lattice and typed element storage
// Objective: Provide NumericType, Scalar, ArrayData and the single
//            element-conversion matrix shared by every engine component
//==================================================

use std::fmt;

use num_complex::{Complex32, Complex64};
use num_traits::{Bounded, NumCast};
use serde::{Deserialize, Serialize};

//==================================================
// Section 1.0 - Numeric Type Lattice
//==================================================

/// Element type of a scalar or array. Ordered from narrowest to widest so
/// promotion is mostly `max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NumericType {
    Byte,
    Word,
    Long,
    Int64,
    Float,
    Double,
    CFloat,
    CDouble,
    Text,
}

impl NumericType {
    pub const NUMERIC: [NumericType; 8] = [
        NumericType::Byte,
        NumericType::Word,
        NumericType::Long,
        NumericType::Int64,
        NumericType::Float,
        NumericType::Double,
        NumericType::CFloat,
        NumericType::CDouble,
    ];

    pub fn name(self) -> &'static str {
        match self {
            NumericType::Byte => "BYTE",
            NumericType::Word => "WORD",
            NumericType::Long => "LONG",
            NumericType::Int64 => "INT64",
            NumericType::Float => "FLOAT",
            NumericType::Double => "DOUBLE",
            NumericType::CFloat => "CFLOAT",
            NumericType::CDouble => "CDOUBLE",
            NumericType::Text => "STRING",
        }
    }

    pub fn is_integer(self) -> bool {
        self <= NumericType::Int64
    }

    pub fn is_real(self) -> bool {
        matches!(self, NumericType::Float | NumericType::Double)
    }

    pub fn is_complex(self) -> bool {
        matches!(self, NumericType::CFloat | NumericType::CDouble)
    }

    /// Size in bytes of one element as stored in a file. `None` for text.
    pub fn byte_size(self) -> Option<usize> {
        match self {
            NumericType::Byte => Some(1),
            NumericType::Word => Some(2),
            NumericType::Long | NumericType::Float => Some(4),
            NumericType::Int64 | NumericType::Double | NumericType::CFloat => Some(8),
            NumericType::CDouble => Some(16),
            NumericType::Text => None,
        }
    }

    /// Result type of a binary operation between the two types.
    pub fn promote(self, other: NumericType) -> NumericType {
        let widest = self.max(other);
        // single-precision complex cannot hold a double real part
        if widest == NumericType::CFloat
            && (self == NumericType::Double || other == NumericType::Double)
        {
            return NumericType::CDouble;
        }
        widest
    }
}

impl fmt::Display for NumericType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

//==================================================
// Section 2.0 - Wide Intermediate & Element Trait
//==================================================

/// Lossless-enough intermediate every element converts through.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Wide {
    Int(i64),
    Real(f64),
    Complex(Complex64),
}

impl Wide {
    pub fn as_f64(self) -> f64 {
        match self {
            Wide::Int(v) => v as f64,
            Wide::Real(v) => v,
            Wide::Complex(c) => c.norm(),
        }
    }

    pub fn as_i64(self) -> i64 {
        match self {
            Wide::Int(v) => v,
            Wide::Real(v) => v as i64,
            Wide::Complex(c) => c.norm() as i64,
        }
    }

    pub fn as_complex(self) -> Complex64 {
        match self {
            Wide::Int(v) => Complex64::new(v as f64, 0.0),
            Wide::Real(v) => Complex64::new(v, 0.0),
            Wide::Complex(c) => c,
        }
    }

    pub fn is_truthy(self) -> bool {
        match self {
            Wide::Int(v) => v != 0,
            Wide::Real(v) => v != 0.0,
            Wide::Complex(c) => c.re != 0.0 || c.im != 0.0,
        }
    }

    pub fn parse(text: &str) -> Wide {
        let trimmed = text.trim();
        if let Ok(value) = trimmed.parse::<i64>() {
            Wide::Int(value)
        } else if let Ok(value) = trimmed.parse::<f64>() {
            Wide::Real(value)
        } else {
            Wide::Int(0)
        }
    }
}

impl fmt::Display for Wide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Wide::Int(v) => write!(f, "{v}"),
            Wide::Real(v) => write!(f, "{v}"),
            Wide::Complex(c) => write!(f, "({}, {})", c.re, c.im),
        }
    }
}

/// A storable element type. Conversion from any other element goes through
/// [`Wide`]: integers saturate, floats truncate toward zero when narrowed to
/// integers, complex values narrow to real through their magnitude.
pub trait Element: Copy + Default + 'static {
    const TYPE: NumericType;
    fn to_wide(self) -> Wide;
    fn from_wide(wide: Wide) -> Self;
}

macro_rules! integer_element {
    ($ty:ty, $tag:ident) => {
        impl Element for $ty {
            const TYPE: NumericType = NumericType::$tag;

            fn to_wide(self) -> Wide {
                Wide::Int(self as i64)
            }

            fn from_wide(wide: Wide) -> Self {
                match wide {
                    Wide::Int(v) => <$ty as NumCast>::from(v).unwrap_or(if v < 0 {
                        <$ty as Bounded>::min_value()
                    } else {
                        <$ty as Bounded>::max_value()
                    }),
                    Wide::Real(v) => v as $ty,
                    Wide::Complex(c) => c.norm() as $ty,
                }
            }
        }
    };
}

integer_element!(u8, Byte);
integer_element!(i16, Word);
integer_element!(i32, Long);
integer_element!(i64, Int64);

macro_rules! real_element {
    ($ty:ty, $tag:ident) => {
        impl Element for $ty {
            const TYPE: NumericType = NumericType::$tag;

            fn to_wide(self) -> Wide {
                Wide::Real(self as f64)
            }

            fn from_wide(wide: Wide) -> Self {
                match wide {
                    Wide::Int(v) => v as $ty,
                    Wide::Real(v) => v as $ty,
                    Wide::Complex(c) => c.norm() as $ty,
                }
            }
        }
    };
}

real_element!(f32, Float);
real_element!(f64, Double);

impl Element for Complex32 {
    const TYPE: NumericType = NumericType::CFloat;

    fn to_wide(self) -> Wide {
        Wide::Complex(Complex64::new(self.re as f64, self.im as f64))
    }

    fn from_wide(wide: Wide) -> Self {
        let c = wide.as_complex();
        Complex32::new(c.re as f32, c.im as f32)
    }
}

impl Element for Complex64 {
    const TYPE: NumericType = NumericType::CDouble;

    fn to_wide(self) -> Wide {
        Wide::Complex(self)
    }

    fn from_wide(wide: Wide) -> Self {
        wide.as_complex()
    }
}

//==================================================
// Section 3.0 - Scalars
//==================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Scalar {
    Byte(u8),
    Word(i16),
    Long(i32),
    Int64(i64),
    Float(f32),
    Double(f64),
    CFloat(Complex32),
    CDouble(Complex64),
}

impl Scalar {
    pub fn numeric_type(&self) -> NumericType {
        match self {
            Scalar::Byte(_) => NumericType::Byte,
            Scalar::Word(_) => NumericType::Word,
            Scalar::Long(_) => NumericType::Long,
            Scalar::Int64(_) => NumericType::Int64,
            Scalar::Float(_) => NumericType::Float,
            Scalar::Double(_) => NumericType::Double,
            Scalar::CFloat(_) => NumericType::CFloat,
            Scalar::CDouble(_) => NumericType::CDouble,
        }
    }

    pub fn to_wide(&self) -> Wide {
        match *self {
            Scalar::Byte(v) => v.to_wide(),
            Scalar::Word(v) => v.to_wide(),
            Scalar::Long(v) => v.to_wide(),
            Scalar::Int64(v) => v.to_wide(),
            Scalar::Float(v) => v.to_wide(),
            Scalar::Double(v) => v.to_wide(),
            Scalar::CFloat(v) => v.to_wide(),
            Scalar::CDouble(v) => v.to_wide(),
        }
    }

    /// Build a scalar of `ty` from a wide value. `Text` has no scalar form
    /// and falls back to `Double`.
    pub fn from_wide(ty: NumericType, wide: Wide) -> Scalar {
        match ty {
            NumericType::Byte => Scalar::Byte(u8::from_wide(wide)),
            NumericType::Word => Scalar::Word(i16::from_wide(wide)),
            NumericType::Long => Scalar::Long(i32::from_wide(wide)),
            NumericType::Int64 => Scalar::Int64(i64::from_wide(wide)),
            NumericType::Float => Scalar::Float(f32::from_wide(wide)),
            NumericType::Double | NumericType::Text => Scalar::Double(f64::from_wide(wide)),
            NumericType::CFloat => Scalar::CFloat(Complex32::from_wide(wide)),
            NumericType::CDouble => Scalar::CDouble(Complex64::from_wide(wide)),
        }
    }

    pub fn convert(&self, ty: NumericType) -> Scalar {
        Scalar::from_wide(ty, self.to_wide())
    }

    pub fn as_f64(&self) -> f64 {
        self.to_wide().as_f64()
    }

    pub fn as_i64(&self) -> i64 {
        self.to_wide().as_i64()
    }

    pub fn is_truthy(&self) -> bool {
        self.to_wide().is_truthy()
    }

    pub fn into_array(self) -> ArrayData {
        let mut data = ArrayData::zeros(self.numeric_type(), 1);
        data.store_wide(0, self.to_wide());
        data
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_wide())
    }
}

//==================================================
// Section 4.0 - Typed Array Storage
//==================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ArrayData {
    Byte(Vec<u8>),
    Word(Vec<i16>),
    Long(Vec<i32>),
    Int64(Vec<i64>),
    Float(Vec<f32>),
    Double(Vec<f64>),
    CFloat(Vec<Complex32>),
    CDouble(Vec<Complex64>),
    Text(Vec<String>),
}

/// Run `$num` with `$v` bound to the numeric vector, or `$text` for strings.
macro_rules! each_array {
    ($data:expr, $v:ident => $num:expr, $t:ident => $text:expr) => {
        match $data {
            ArrayData::Byte($v) => $num,
            ArrayData::Word($v) => $num,
            ArrayData::Long($v) => $num,
            ArrayData::Int64($v) => $num,
            ArrayData::Float($v) => $num,
            ArrayData::Double($v) => $num,
            ArrayData::CFloat($v) => $num,
            ArrayData::CDouble($v) => $num,
            ArrayData::Text($t) => $text,
        }
    };
}

impl ArrayData {
    pub fn zeros(ty: NumericType, len: usize) -> ArrayData {
        match ty {
            NumericType::Byte => ArrayData::Byte(vec![0; len]),
            NumericType::Word => ArrayData::Word(vec![0; len]),
            NumericType::Long => ArrayData::Long(vec![0; len]),
            NumericType::Int64 => ArrayData::Int64(vec![0; len]),
            NumericType::Float => ArrayData::Float(vec![0.0; len]),
            NumericType::Double => ArrayData::Double(vec![0.0; len]),
            NumericType::CFloat => ArrayData::CFloat(vec![Complex32::default(); len]),
            NumericType::CDouble => ArrayData::CDouble(vec![Complex64::default(); len]),
            NumericType::Text => ArrayData::Text(vec![String::new(); len]),
        }
    }

    pub fn numeric_type(&self) -> NumericType {
        match self {
            ArrayData::Byte(_) => NumericType::Byte,
            ArrayData::Word(_) => NumericType::Word,
            ArrayData::Long(_) => NumericType::Long,
            ArrayData::Int64(_) => NumericType::Int64,
            ArrayData::Float(_) => NumericType::Float,
            ArrayData::Double(_) => NumericType::Double,
            ArrayData::CFloat(_) => NumericType::CFloat,
            ArrayData::CDouble(_) => NumericType::CDouble,
            ArrayData::Text(_) => NumericType::Text,
        }
    }

    pub fn len(&self) -> usize {
        each_array!(self, v => v.len(), t => t.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Element `index` in wide form; text elements are parsed.
    pub fn wide_at(&self, index: usize) -> Wide {
        each_array!(self, v => v[index].to_wide(), t => Wide::parse(&t[index]))
    }

    pub fn text_at(&self, index: usize) -> String {
        each_array!(self, v => v[index].to_wide().to_string(), t => t[index].clone())
    }

    pub fn scalar_at(&self, index: usize) -> Scalar {
        let ty = match self.numeric_type() {
            NumericType::Text => NumericType::Double,
            other => other,
        };
        Scalar::from_wide(ty, self.wide_at(index))
    }

    pub fn store_wide(&mut self, index: usize, wide: Wide) {
        match self {
            ArrayData::Byte(v) => v[index] = u8::from_wide(wide),
            ArrayData::Word(v) => v[index] = i16::from_wide(wide),
            ArrayData::Long(v) => v[index] = i32::from_wide(wide),
            ArrayData::Int64(v) => v[index] = i64::from_wide(wide),
            ArrayData::Float(v) => v[index] = f32::from_wide(wide),
            ArrayData::Double(v) => v[index] = f64::from_wide(wide),
            ArrayData::CFloat(v) => v[index] = Complex32::from_wide(wide),
            ArrayData::CDouble(v) => v[index] = Complex64::from_wide(wide),
            ArrayData::Text(t) => t[index] = wide.to_string(),
        }
    }

    /// The general conversion matrix: copy element `from` of `source` into
    /// element `index` of `self`, converting between any pair of types.
    pub fn copy_element(&mut self, index: usize, source: &ArrayData, from: usize) {
        match (&mut *self, source) {
            (ArrayData::Text(dest), ArrayData::Text(src)) => dest[index] = src[from].clone(),
            (ArrayData::Text(dest), _) => dest[index] = source.text_at(from),
            _ => self.store_wide(index, source.wide_at(from)),
        }
    }

    /// Bulk copy without conversion. Returns `false` when the element types
    /// differ, leaving `self` untouched.
    pub fn copy_block(&mut self, start: usize, source: &ArrayData, from: usize, len: usize) -> bool {
        match (self, source) {
            (ArrayData::Byte(d), ArrayData::Byte(s)) => d[start..start + len].copy_from_slice(&s[from..from + len]),
            (ArrayData::Word(d), ArrayData::Word(s)) => d[start..start + len].copy_from_slice(&s[from..from + len]),
            (ArrayData::Long(d), ArrayData::Long(s)) => d[start..start + len].copy_from_slice(&s[from..from + len]),
            (ArrayData::Int64(d), ArrayData::Int64(s)) => d[start..start + len].copy_from_slice(&s[from..from + len]),
            (ArrayData::Float(d), ArrayData::Float(s)) => d[start..start + len].copy_from_slice(&s[from..from + len]),
            (ArrayData::Double(d), ArrayData::Double(s)) => d[start..start + len].copy_from_slice(&s[from..from + len]),
            (ArrayData::CFloat(d), ArrayData::CFloat(s)) => d[start..start + len].copy_from_slice(&s[from..from + len]),
            (ArrayData::CDouble(d), ArrayData::CDouble(s)) => d[start..start + len].copy_from_slice(&s[from..from + len]),
            (ArrayData::Text(d), ArrayData::Text(s)) => d[start..start + len].clone_from_slice(&s[from..from + len]),
            _ => return false,
        }
        true
    }

    pub fn convert(&self, ty: NumericType) -> ArrayData {
        if self.numeric_type() == ty {
            return self.clone();
        }
        let mut out = ArrayData::zeros(ty, self.len());
        for index in 0..self.len() {
            out.copy_element(index, self, index);
        }
        out
    }

    /// Gather the listed elements into a new array of the same type.
    pub fn gather(&self, indices: &[usize]) -> ArrayData {
        each_array!(self,
            v => ArrayData::from_vec(indices.iter().map(|&i| v[i]).collect()),
            t => ArrayData::Text(indices.iter().map(|&i| t[i].clone()).collect()))
    }

    pub fn from_vec<T: Element>(values: Vec<T>) -> ArrayData {
        let mut out = ArrayData::zeros(T::TYPE, values.len());
        for (index, value) in values.into_iter().enumerate() {
            out.store_wide(index, value.to_wide());
        }
        out
    }

    pub fn to_f64_vec(&self) -> Vec<f64> {
        (0..self.len()).map(|i| self.wide_at(i).as_f64()).collect()
    }
}

//==================================================
// Section 5.0 - Tests
//==================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn promotion_widens_and_handles_cfloat_double() {
        assert_eq!(NumericType::Byte.promote(NumericType::Long), NumericType::Long);
        assert_eq!(NumericType::Float.promote(NumericType::Int64), NumericType::Float);
        assert_eq!(NumericType::CFloat.promote(NumericType::Double), NumericType::CDouble);
        assert_eq!(NumericType::CFloat.promote(NumericType::Float), NumericType::CFloat);
    }

    #[test]
    fn integer_narrowing_saturates() {
        assert_eq!(u8::from_wide(Wide::Int(300)), 255);
        assert_eq!(u8::from_wide(Wide::Int(-4)), 0);
        assert_eq!(i16::from_wide(Wide::Int(40_000)), i16::MAX);
    }

    #[test]
    fn float_to_integer_truncates_toward_zero() {
        assert_eq!(i32::from_wide(Wide::Real(2.9)), 2);
        assert_eq!(i32::from_wide(Wide::Real(-2.9)), -2);
        assert_eq!(u8::from_wide(Wide::Real(1e9)), 255);
    }

    #[test]
    fn complex_narrows_through_magnitude() {
        let wide = Complex64::new(3.0, 4.0).to_wide();
        assert_eq!(f64::from_wide(wide), 5.0);
        assert_eq!(i32::from_wide(wide), 5);
    }

    #[test]
    fn copy_element_crosses_text_boundary() {
        let mut text = ArrayData::zeros(NumericType::Text, 1);
        text.copy_element(0, &ArrayData::Long(vec![42]), 0);
        assert_eq!(text, ArrayData::Text(vec!["42".into()]));

        let mut long = ArrayData::zeros(NumericType::Long, 1);
        long.copy_element(0, &ArrayData::Text(vec![" 17 ".into()]), 0);
        assert_eq!(long, ArrayData::Long(vec![17]));
    }

    #[test]
    fn copy_block_refuses_mixed_types() {
        let mut dest = ArrayData::zeros(NumericType::Long, 4);
        assert!(!dest.copy_block(0, &ArrayData::Float(vec![1.0]), 0, 1));
        assert!(dest.copy_block(1, &ArrayData::Long(vec![7, 8]), 0, 2));
        assert_eq!(dest, ArrayData::Long(vec![0, 7, 8, 0]));
    }
}

//==================================================
// End of file
//==================================================
