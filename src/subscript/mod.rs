//==================================================
// File: subscript/mod.rs
//==================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Subscript classification shared by reads and writes
// Objective: Turn subscript expressions into validated scalar, index-vector
//            or range selections against a target's dimensions
//==================================================

pub mod extract;
pub mod file;
pub mod insert;

use crate::interpreter::errors::{EngineError, EngineResult};
use crate::interpreter::Interpreter;
use crate::symbol::{RangeEnd, RangeValue, SymbolIndex, SymbolValue};

/// A validated selection along one dimension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Subscript {
    Scalar(usize),
    IndexVector(Vec<usize>),
    /// `len` indices from `start` upward, walked downward when `reversed`.
    Range {
        start: usize,
        len: usize,
        reversed: bool,
        summation: bool,
    },
}

impl Subscript {
    pub fn len(&self) -> usize {
        match self {
            Subscript::Scalar(_) => 1,
            Subscript::IndexVector(indices) => indices.len(),
            Subscript::Range { len, .. } => *len,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The `k`-th selected index.
    pub fn index(&self, k: usize) -> usize {
        match self {
            Subscript::Scalar(index) => *index,
            Subscript::IndexVector(indices) => indices[k],
            Subscript::Range {
                start,
                len,
                reversed,
                ..
            } => {
                if *reversed {
                    start + (len - 1 - k)
                } else {
                    start + k
                }
            }
        }
    }

    pub fn is_scalar(&self) -> bool {
        matches!(self, Subscript::Scalar(_))
    }

    pub fn sums(&self) -> bool {
        matches!(self, Subscript::Range { summation: true, .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read,
    Write,
}

/// Element strides with the first index varying fastest.
pub fn strides(dims: &[usize]) -> Vec<usize> {
    let mut out = Vec::with_capacity(dims.len());
    let mut stride = 1;
    for dim in dims {
        out.push(stride);
        stride *= dim;
    }
    out
}

/// Flat offsets of every element selected by `subscripts`, first
/// subscript fastest.
pub fn walk(subscripts: &[Subscript], strides: &[usize]) -> Vec<usize> {
    let total: usize = subscripts.iter().map(Subscript::len).product();
    let mut offsets = Vec::with_capacity(total);
    if total == 0 {
        return offsets;
    }
    let mut counters = vec![0usize; subscripts.len()];
    loop {
        offsets.push(
            subscripts
                .iter()
                .zip(strides)
                .zip(&counters)
                .map(|((subscript, stride), k)| subscript.index(*k) * stride)
                .sum(),
        );
        let mut axis = 0;
        loop {
            if axis == subscripts.len() {
                return offsets;
            }
            counters[axis] += 1;
            if counters[axis] < subscripts[axis].len() {
                break;
            }
            counters[axis] = 0;
            axis += 1;
        }
    }
}

/// Extents subscripts are checked against: each dimension, or the flat
/// element count when a single subscript addresses a multi-dimensional
/// target.
pub fn extents(dims: &[usize], count: usize) -> EngineResult<Vec<usize>> {
    if count == 1 {
        return Ok(vec![dims.iter().product()]);
    }
    if count != dims.len() {
        return Err(EngineError::IllegalSubscript(format!(
            "{count} subscripts for a {}-dimensional target",
            dims.len()
        )));
    }
    Ok(dims.to_vec())
}

fn from_end(value: i64, extent: usize) -> i64 {
    if value < 0 { value + extent as i64 } else { value }
}

fn checked(value: i64, extent: usize) -> EngineResult<usize> {
    usize::try_from(value)
        .ok()
        .filter(|index| *index < extent)
        .ok_or_else(|| {
            EngineError::IllegalSubscript(format!("index {value} out of range 0..{extent}"))
        })
}

impl Interpreter {
    /// Evaluate and validate subscripts against `dims`.
    pub(crate) fn classify_subscripts(
        &mut self,
        subscripts: &[SymbolIndex],
        dims: &[usize],
        access: Access,
    ) -> EngineResult<Vec<Subscript>> {
        let extents = extents(dims, subscripts.len())?;
        let mut out = Vec::with_capacity(subscripts.len());
        for (subscript, extent) in subscripts.iter().zip(extents) {
            out.push(self.classify_one(*subscript, extent, access)?);
        }
        Ok(out)
    }

    pub(crate) fn classify_one(
        &mut self,
        subscript: SymbolIndex,
        extent: usize,
        access: Access,
    ) -> EngineResult<Subscript> {
        let index = self.evaluate(subscript)?;
        match self.store.value(index)? {
            SymbolValue::Range(range) => {
                let range = range.clone();
                self.classify_range(&range, extent, access)
            }
            SymbolValue::Scalar(scalar) => Ok(Subscript::Scalar(checked(scalar.as_i64(), extent)?)),
            SymbolValue::Array(array) if array.data.numeric_type().is_complex() => Err(
                EngineError::IllegalSubscript("complex values cannot index".into()),
            ),
            SymbolValue::Array(array) => {
                let indices = (0..array.element_count())
                    .map(|k| checked(array.data.wide_at(k).as_i64(), extent))
                    .collect::<EngineResult<Vec<_>>>()?;
                Ok(Subscript::IndexVector(indices))
            }
            other => Err(EngineError::IllegalClass {
                what: self.store.describe(subscript),
                class: other.class(),
                expected: "a scalar, index array or range subscript",
            }),
        }
    }

    fn classify_range(
        &mut self,
        range: &RangeValue,
        extent: usize,
        access: Access,
    ) -> EngineResult<Subscript> {
        if range.redirect.is_some() {
            return Err(EngineError::IllegalSubscript(
                "redirected ranges are not supported".into(),
            ));
        }
        if range.summation && access == Access::Write {
            return Err(EngineError::IllegalSubscript(
                "summation ranges cannot be assigned to".into(),
            ));
        }
        let start = from_end(self.integer_value(range.start)?, extent);
        let end = match range.end {
            RangeEnd::ToEnd => extent as i64 - 1,
            RangeEnd::Index(end) => from_end(self.integer_value(end)?, extent),
        };
        let (lo, hi) = (checked(start.min(end), extent)?, checked(start.max(end), extent)?);
        Ok(Subscript::Range {
            start: lo,
            len: hi - lo + 1,
            reversed: range.reversed ^ (start > end),
            summation: range.summation,
        })
    }
}


//==================================================
// End of file
//==================================================
