//==================================================
// File: subscript/extract.rs
//==================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Subscripted reads
// Objective: Gather the elements a subscript list selects from arrays,
//            strings, file storage and lists into a fresh temporary
//==================================================

use tracing::trace;

use super::file::{element_size, read_elements, stored_elements};
use super::{extents, strides, walk, Access, Subscript};
use crate::interpreter::errors::{EngineError, EngineResult};
use crate::interpreter::Interpreter;
use crate::symbol::{ArrayData, ArrayValue, NumericType, SymbolIndex, SymbolValue, Wide};

enum Source {
    Memory { dims: Vec<usize> },
    Text(Vec<u8>),
    FileMap { dims: Vec<usize> },
    Assoc,
    Members(usize),
}

fn accumulate(total: Wide, value: Wide) -> Wide {
    match (total, value) {
        (Wide::Int(a), Wide::Int(b)) => Wide::Int(a.saturating_add(b)),
        (Wide::Complex(_), _) | (_, Wide::Complex(_)) => Wide::Complex(total.as_complex() + value.as_complex()),
        _ => Wide::Real(total.as_f64() + value.as_f64()),
    }
}

/// Select `subscripts` out of `data` laid out with `dims`. Scalar subscripts
/// drop their dimension and summation ranges fold theirs into a sum that
/// keeps the element type.
pub fn select(data: &ArrayData, dims: &[usize], subscripts: &[Subscript]) -> EngineResult<(Vec<usize>, ArrayData)> {
    let extents = extents(dims, subscripts.len())?;
    let offsets = walk(subscripts, &strides(&extents));
    let kept: Vec<usize> = (0..subscripts.len())
        .filter(|axis| !subscripts[*axis].is_scalar() && !subscripts[*axis].sums())
        .collect();
    let out_dims: Vec<usize> = kept.iter().map(|axis| subscripts[*axis].len()).collect();
    if !subscripts.iter().any(Subscript::sums) {
        return Ok((out_dims, data.gather(&offsets)));
    }
    if data.numeric_type() == NumericType::Text {
        return Err(EngineError::unsupported("summation", NumericType::Text));
    }

    let out_strides = strides(&out_dims);
    let mut sums = vec![Wide::Int(0); out_dims.iter().product()];
    for (k, offset) in offsets.into_iter().enumerate() {
        let mut rest = k;
        let mut out = 0;
        for (axis, subscript) in subscripts.iter().enumerate() {
            let counter = rest % subscript.len();
            rest /= subscript.len();
            if let Some(position) = kept.iter().position(|kept| *kept == axis) {
                out += counter * out_strides[position];
            }
        }
        sums[out] = accumulate(sums[out], data.wide_at(offset));
    }
    let mut result = ArrayData::zeros(data.numeric_type(), sums.len());
    for (index, sum) in sums.into_iter().enumerate() {
        result.store_wide(index, sum);
    }
    Ok((out_dims, result))
}

fn into_value(dims: Vec<usize>, data: ArrayData) -> SymbolValue {
    if !dims.is_empty() {
        return SymbolValue::Array(ArrayValue::new(dims, data));
    }
    match data {
        ArrayData::Text(mut items) if !items.is_empty() => SymbolValue::Text(items.swap_remove(0)),
        data => SymbolValue::Scalar(data.scalar_at(0)),
    }
}

impl Interpreter {
    /// `source(subscripts)` as a new temporary, or the member symbol itself
    /// when indexing into a list.
    pub(crate) fn extract(&mut self, source: SymbolIndex, subscripts: &[SymbolIndex]) -> EngineResult<SymbolIndex> {
        let base = self.evaluate(source)?;
        let shape = match self.store.value(base)? {
            SymbolValue::Array(array) => Source::Memory {
                dims: array.dims.clone(),
            },
            SymbolValue::Scalar(_) => Source::Memory { dims: vec![1] },
            SymbolValue::Text(text) => Source::Text(text.as_bytes().to_vec()),
            SymbolValue::FileMap(spec) => Source::FileMap {
                dims: spec.dims.clone(),
            },
            SymbolValue::Assoc(_) => Source::Assoc,
            SymbolValue::List(members) | SymbolValue::Struct(members) => Source::Members(members.len()),
            SymbolValue::CompactList(items) => Source::Members(items.len()),
            other => {
                return Err(EngineError::IllegalClass {
                    what: self.store.describe(base),
                    class: other.class(),
                    expected: "a subscriptable value",
                });
            }
        };

        let value = match shape {
            Source::Memory { dims } => {
                let subs = self.classify_subscripts(subscripts, &dims, Access::Read)?;
                let (out_dims, data) = match self.store.value(base)? {
                    SymbolValue::Array(array) if array.dims == dims => select(&array.data, &dims, &subs)?,
                    SymbolValue::Scalar(scalar) => select(&scalar.into_array(), &dims, &subs)?,
                    _ => {
                        return Err(EngineError::IllegalSubscript(
                            "source changed while its subscripts were evaluated".into(),
                        ));
                    }
                };
                into_value(out_dims, data)
            }
            Source::Text(bytes) => {
                if subscripts.len() != 1 {
                    return Err(EngineError::IllegalSubscript("a string takes one subscript".into()));
                }
                let subs = self.classify_subscripts(subscripts, &[bytes.len()], Access::Read)?;
                let picked: Vec<u8> = (0..subs[0].len()).map(|k| bytes[subs[0].index(k)]).collect();
                let text = String::from_utf8(picked).map_err(|_| {
                    EngineError::IllegalSubscript(
                        "string subscript splits a multi-byte character".into(),
                    )
                })?;
                SymbolValue::Text(text)
            }
            Source::FileMap { dims } => {
                let subs = self.classify_subscripts(subscripts, &dims, Access::Read)?;
                let SymbolValue::FileMap(spec) = self.store.value(base)? else {
                    return Err(EngineError::IllegalSubscript(
                        "source changed while its subscripts were evaluated".into(),
                    ));
                };
                let data = read_elements(&spec.path, spec.offset, spec.ty, spec.element_count())?;
                trace!(path = %spec.path.display(), elements = data.len(), "read mapped region");
                let (out_dims, data) = select(&data, &dims, &subs)?;
                into_value(out_dims, data)
            }
            Source::Assoc => self.extract_records(base, subscripts)?,
            Source::Members(count) => {
                if subscripts.len() != 1 {
                    return Err(EngineError::IllegalSubscript("a list takes one subscript".into()));
                }
                let Subscript::Scalar(position) = self.classify_one(subscripts[0], count, Access::Read)? else {
                    return Err(EngineError::IllegalSubscript("lists are indexed by a single position".into()));
                };
                return match self.store.value(base)? {
                    SymbolValue::List(members) | SymbolValue::Struct(members) => members
                        .get(position)
                        .map(|member| member.value)
                        .ok_or_else(|| EngineError::IllegalSubscript(format!("no member {position}"))),
                    SymbolValue::CompactList(items) => items
                        .get(position)
                        .copied()
                        .ok_or_else(|| EngineError::IllegalSubscript(format!("no member {position}"))),
                    _ => Err(EngineError::IllegalSubscript(
                        "source changed while its subscripts were evaluated".into(),
                    )),
                };
            }
        };
        self.store.allocate_temp(value)
    }

    /// Records of an associated variable. One record keeps the record shape;
    /// several gain a trailing record dimension.
    fn extract_records(&mut self, base: SymbolIndex, subscripts: &[SymbolIndex]) -> EngineResult<SymbolValue> {
        let SymbolValue::Assoc(spec) = self.store.value(base)?.clone() else {
            return Err(EngineError::IllegalSubscript("not an associated variable".into()));
        };
        if subscripts.len() != 1 {
            return Err(EngineError::IllegalSubscript(
                "an associated variable takes one record subscript".into(),
            ));
        }
        let record_len = spec.record_len();
        let record_bytes = element_size(spec.ty)? * record_len;
        let records = stored_elements(&spec.path, spec.offset, record_bytes)?;
        let selection = self.classify_one(subscripts[0], records, Access::Read)?;
        let mut data = ArrayData::zeros(spec.ty, selection.len() * record_len);
        for k in 0..selection.len() {
            let offset = spec.offset + (selection.index(k) * record_bytes) as u64;
            let record = read_elements(&spec.path, offset, spec.ty, record_len)?;
            data.copy_block(k * record_len, &record, 0, record_len);
        }
        let mut dims = spec.record_dims.clone();
        if selection.len() > 1 {
            dims.push(selection.len());
        }
        Ok(SymbolValue::Array(ArrayValue::new(dims, data)))
    }
}


//==================================================
// End of file
//==================================================
