//==================================================
// File: subscript/insert.rs
//==================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Subscripted assignment into arrays, strings and file storage
// Objective: Plan which target element receives which source element under
//            the OUTER or INNER policy, then write the plan through an
//            in-memory or file-backed sink
//==================================================

use tracing::trace;

use super::file::{element_size, stored_elements, FileSink};
use super::{extents, strides, walk, Access, Subscript};
use crate::exec::ops::Operand;
use crate::interpreter::errors::{EngineError, EngineResult};
use crate::interpreter::Interpreter;
use crate::symbol::{
    ArrayData, AssocSpec, Combine, FileMapSpec, NumericType, SymbolIndex, SymbolValue,
};

//==================================================
// Section 1.0 - Plans & Sinks
//==================================================

/// Which source element lands on which target element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertPlan {
    /// `len` source elements copied in one piece to a contiguous run.
    Block { start: usize, len: usize },
    /// `(target element, source element)` pairs.
    Elements(Vec<(usize, usize)>),
}

impl InsertPlan {
    fn highest_target(&self) -> Option<usize> {
        match self {
            InsertPlan::Block { start, len } => (start + len).checked_sub(1),
            InsertPlan::Elements(pairs) => pairs.iter().map(|(at, _)| *at).max(),
        }
    }
}

/// Storage a plan is written into.
pub trait InsertSink {
    fn put(&mut self, at: usize, source: &ArrayData, from: usize) -> EngineResult<()>;
    fn put_block(&mut self, at: usize, source: &ArrayData, from: usize, len: usize) -> EngineResult<()>;
}

impl InsertSink for ArrayData {
    fn put(&mut self, at: usize, source: &ArrayData, from: usize) -> EngineResult<()> {
        self.copy_element(at, source, from);
        Ok(())
    }

    fn put_block(&mut self, at: usize, source: &ArrayData, from: usize, len: usize) -> EngineResult<()> {
        if !self.copy_block(at, source, from, len) {
            for k in 0..len {
                self.copy_element(at + k, source, from + k);
            }
        }
        Ok(())
    }
}

impl InsertSink for FileSink {
    fn put(&mut self, at: usize, source: &ArrayData, from: usize) -> EngineResult<()> {
        self.write(at, source, from, 1)
    }

    fn put_block(&mut self, at: usize, source: &ArrayData, from: usize, len: usize) -> EngineResult<()> {
        self.write(at, source, from, len)
    }
}

pub fn apply_plan(plan: &InsertPlan, sink: &mut impl InsertSink, source: &ArrayData) -> EngineResult<()> {
    match plan {
        InsertPlan::Block { start, len } => sink.put_block(*start, source, 0, *len),
        InsertPlan::Elements(pairs) => {
            for &(at, from) in pairs {
                sink.put(at, source, from)?;
            }
            Ok(())
        }
    }
}

/// Build the plan for writing `source_len` elements shaped `source_dims`
/// through `subscripts`, each checked against the matching entry of
/// `extents`. `fast` allows the single bulk copy when the layout permits.
pub fn plan_insert(
    extents: &[usize],
    subscripts: &[Subscript],
    source_dims: &[usize],
    source_len: usize,
    combine: Combine,
    fast: bool,
) -> EngineResult<InsertPlan> {
    if source_len == 0 {
        return Err(EngineError::IllegalSubscript("empty source".into()));
    }
    let strides = strides(extents);
    if subscripts.iter().all(Subscript::is_scalar) && source_len > 1 {
        return plan_corner(extents, &strides, subscripts, source_dims, source_len, fast);
    }
    let lens: Vec<usize> = subscripts.iter().map(Subscript::len).collect();
    match combine {
        Combine::Inner => {
            let mut common = None;
            for len in lens.iter().copied().filter(|len| *len > 1) {
                match common {
                    Some(existing) if existing != len => {
                        return Err(EngineError::IllegalSubscript(format!(
                            "zipped subscripts select {existing} and {len} elements"
                        )));
                    }
                    _ => common = Some(len),
                }
            }
            let count = common.unwrap_or(1);
            if source_len != count && source_len != 1 {
                return Err(EngineError::IllegalSubscript(format!(
                    "source has {source_len} elements, subscripts select {count}"
                )));
            }
            let pairs = (0..count)
                .map(|k| {
                    let at = subscripts
                        .iter()
                        .zip(&strides)
                        .map(|(subscript, stride)| {
                            let pick = if subscript.len() > 1 { k } else { 0 };
                            subscript.index(pick) * stride
                        })
                        .sum();
                    (at, if source_len == 1 { 0 } else { k })
                })
                .collect();
            Ok(InsertPlan::Elements(pairs))
        }
        Combine::Outer => {
            let sizes: Vec<usize> = lens.iter().copied().filter(|len| *len > 1).collect();
            let squeezed: Vec<usize> = source_dims.iter().copied().filter(|dim| *dim != 1).collect();
            if source_len != 1 && sizes != squeezed {
                return Err(EngineError::IllegalSubscript(format!(
                    "subscript sizes {sizes:?} do not match source dimensions {squeezed:?}"
                )));
            }
            let contiguous = matches!(subscripts.first(), Some(Subscript::Range { reversed: false, .. }))
                && subscripts[1..].iter().all(Subscript::is_scalar);
            if fast && contiguous && source_len == lens[0] {
                let start = subscripts
                    .iter()
                    .zip(&strides)
                    .map(|(subscript, stride)| subscript.index(0) * stride)
                    .sum();
                return Ok(InsertPlan::Block {
                    start,
                    len: source_len,
                });
            }
            let pairs = walk(subscripts, &strides)
                .into_iter()
                .enumerate()
                .map(|(k, at)| (at, if source_len == 1 { 0 } else { k }))
                .collect();
            Ok(InsertPlan::Elements(pairs))
        }
    }
}

/// All-scalar subscripts with a multi-element source: the source block is
/// placed with its first element at the addressed corner.
fn plan_corner(
    extents: &[usize],
    strides: &[usize],
    subscripts: &[Subscript],
    source_dims: &[usize],
    source_len: usize,
    fast: bool,
) -> EngineResult<InsertPlan> {
    let overflow = || EngineError::IllegalSubscript("source block does not fit at that position".into());
    if subscripts.len() == 1 {
        let start = subscripts[0].index(0);
        if start + source_len > extents[0] {
            return Err(overflow());
        }
        return Ok(if fast {
            InsertPlan::Block {
                start,
                len: source_len,
            }
        } else {
            InsertPlan::Elements((0..source_len).map(|k| (start + k, k)).collect())
        });
    }
    if source_dims.len() > extents.len() {
        return Err(overflow());
    }
    let mut block = Vec::with_capacity(extents.len());
    for (axis, extent) in extents.iter().enumerate() {
        let start = subscripts[axis].index(0);
        let len = source_dims.get(axis).copied().unwrap_or(1);
        if start + len > *extent {
            return Err(overflow());
        }
        block.push(Subscript::Range {
            start,
            len,
            reversed: false,
            summation: false,
        });
    }
    Ok(InsertPlan::Elements(
        walk(&block, strides).into_iter().enumerate().map(|(k, at)| (at, k)).collect(),
    ))
}

//==================================================
// Section 2.0 - Targets
//==================================================

enum Target {
    Memory { dims: Vec<usize>, ty: NumericType },
    Text(String),
    FileMap(FileMapSpec),
    Assoc(AssocSpec),
}

fn read_only(path: &std::path::Path) -> EngineError {
    EngineError::io(path.display(), "variable is read-only")
}

impl Interpreter {
    /// `target(subscripts) = source`. Subscripts are evaluated before the
    /// source, left to right.
    pub(crate) fn insert(
        &mut self,
        target: SymbolIndex,
        subscripts: &[SymbolIndex],
        source: SymbolIndex,
        combine: Combine,
    ) -> EngineResult<()> {
        let target = self.store.resolve(target)?;
        let shape = match self.store.value(target)? {
            SymbolValue::Array(array) => Target::Memory {
                dims: array.dims.clone(),
                ty: array.data.numeric_type(),
            },
            SymbolValue::Scalar(scalar) => Target::Memory {
                dims: vec![1],
                ty: scalar.numeric_type(),
            },
            SymbolValue::Text(text) => Target::Text(text.clone()),
            SymbolValue::FileMap(spec) => Target::FileMap(spec.clone()),
            SymbolValue::Assoc(spec) => Target::Assoc(spec.clone()),
            other => {
                return Err(EngineError::IllegalClass {
                    what: self.store.describe(target),
                    class: other.class(),
                    expected: "an array, string or file variable",
                });
            }
        };
        match shape {
            Target::Memory { dims, ty } => self.insert_memory(target, subscripts, source, combine, dims, ty),
            Target::Text(text) => self.insert_text(target, subscripts, source, combine, text),
            Target::FileMap(spec) => self.insert_filemap(subscripts, source, combine, &spec),
            Target::Assoc(spec) => self.insert_assoc(subscripts, source, &spec),
        }
    }

    /// Shape and data of an assignment source.
    pub(crate) fn source_array(&self, value: SymbolIndex) -> EngineResult<(Vec<usize>, ArrayData)> {
        match self.store.value(value)? {
            SymbolValue::Scalar(scalar) => Ok((Vec::new(), scalar.into_array())),
            SymbolValue::Array(array) => Ok((array.dims.clone(), array.data.clone())),
            SymbolValue::Text(text) => Ok((Vec::new(), ArrayData::Text(vec![text.clone()]))),
            SymbolValue::FileMap(_) => match self.operand(value)? {
                Operand::Array(array) => Ok((array.dims, array.data)),
                _ => Ok((Vec::new(), ArrayData::Byte(Vec::new()))),
            },
            other => Err(EngineError::IllegalClass {
                what: self.store.describe(value),
                class: other.class(),
                expected: "a scalar, array or string source",
            }),
        }
    }

    fn insert_memory(
        &mut self,
        target: SymbolIndex,
        subscripts: &[SymbolIndex],
        source: SymbolIndex,
        combine: Combine,
        dims: Vec<usize>,
        ty: NumericType,
    ) -> EngineResult<()> {
        let subs = self.classify_subscripts(subscripts, &dims, Access::Write)?;
        let value = self.evaluate(source)?;
        let (source_dims, data) = self.source_array(value)?;
        let extents = extents(&dims, subs.len())?;
        let fast = self.config.fast_insert && data.numeric_type() == ty;
        let plan = plan_insert(&extents, &subs, &source_dims, data.len(), combine, fast)?;
        trace!(block = matches!(plan, InsertPlan::Block { .. }), "memory insert");

        let changed = || EngineError::IllegalSubscript("target changed while the source was evaluated".into());
        match self.store.value_mut(target)? {
            SymbolValue::Array(array) if array.dims == dims && array.data.numeric_type() == ty => {
                apply_plan(&plan, &mut array.data, &data)
            }
            SymbolValue::Scalar(scalar) if dims == [1] && scalar.numeric_type() == ty => {
                let mut cell = (*scalar).into_array();
                apply_plan(&plan, &mut cell, &data)?;
                *scalar = cell.scalar_at(0);
                Ok(())
            }
            _ => Err(changed()),
        }
    }

    fn insert_text(
        &mut self,
        target: SymbolIndex,
        subscripts: &[SymbolIndex],
        source: SymbolIndex,
        combine: Combine,
        text: String,
    ) -> EngineResult<()> {
        if subscripts.len() != 1 {
            return Err(EngineError::IllegalSubscript("a string takes one subscript".into()));
        }
        let mut bytes = ArrayData::Byte(text.into_bytes());
        let subs = self.classify_subscripts(subscripts, &[bytes.len()], Access::Write)?;
        let value = self.evaluate(source)?;
        let (source_dims, data) = match self.store.value(value)? {
            SymbolValue::Text(source) => {
                let raw = source.as_bytes().to_vec();
                let dims = if raw.len() == 1 { Vec::new() } else { vec![raw.len()] };
                (dims, ArrayData::Byte(raw))
            }
            _ => self.source_array(value)?,
        };
        let fast = self.config.fast_insert && data.numeric_type() == NumericType::Byte;
        let plan = plan_insert(&[bytes.len()], &subs, &source_dims, data.len(), combine, fast)?;
        apply_plan(&plan, &mut bytes, &data)?;
        let ArrayData::Byte(raw) = bytes else {
            return Err(EngineError::unsupported("string insert", NumericType::Text));
        };
        let text = String::from_utf8(raw).map_err(|_| {
            EngineError::IllegalSubscript("string subscript splits a multi-byte character".into())
        })?;
        self.store.set_value(target, SymbolValue::Text(text))
    }

    /// Writes go straight to the file; a failure part way leaves the
    /// elements already written in place.
    fn insert_filemap(
        &mut self,
        subscripts: &[SymbolIndex],
        source: SymbolIndex,
        combine: Combine,
        spec: &FileMapSpec,
    ) -> EngineResult<()> {
        if spec.readonly {
            return Err(read_only(&spec.path));
        }
        let subs = self.classify_subscripts(subscripts, &spec.dims, Access::Write)?;
        let value = self.evaluate(source)?;
        let (source_dims, data) = self.source_array(value)?;
        let extents = extents(&spec.dims, subs.len())?;
        let plan = plan_insert(&extents, &subs, &source_dims, data.len(), combine, self.config.fast_insert)?;
        if plan.highest_target().is_some_and(|top| top >= spec.element_count()) {
            return Err(EngineError::IllegalSubscript("write past the mapped region".into()));
        }
        let mut sink = FileSink::open(&spec.path, spec.offset, spec.ty)?;
        apply_plan(&plan, &mut sink, &data)
    }

    /// One subscript selects records; the source supplies every selected
    /// record, one record replayed for each, or a single element.
    fn insert_assoc(
        &mut self,
        subscripts: &[SymbolIndex],
        source: SymbolIndex,
        spec: &AssocSpec,
    ) -> EngineResult<()> {
        if spec.readonly {
            return Err(read_only(&spec.path));
        }
        if subscripts.len() != 1 {
            return Err(EngineError::IllegalSubscript(
                "an associated variable takes one record subscript".into(),
            ));
        }
        let record_len = spec.record_len();
        let records = stored_elements(&spec.path, spec.offset, element_size(spec.ty)? * record_len)?;
        let selection = self.classify_one(subscripts[0], records + 1, Access::Write)?;
        let value = self.evaluate(source)?;
        let (_, data) = self.source_array(value)?;
        let selected = selection.len();
        let source_at: Box<dyn Fn(usize, usize) -> usize> = if data.len() == record_len * selected {
            Box::new(move |r, e| r * record_len + e)
        } else if data.len() == record_len {
            Box::new(|_, e| e)
        } else if data.len() == 1 {
            Box::new(|_, _| 0)
        } else {
            return Err(EngineError::IllegalSubscript(format!(
                "source has {} elements, records hold {record_len}",
                data.len()
            )));
        };
        let mut pairs = Vec::with_capacity(selected * record_len);
        for r in 0..selected {
            let record = selection.index(r);
            for e in 0..record_len {
                pairs.push((record * record_len + e, source_at(r, e)));
            }
        }
        let mut sink = FileSink::open(&spec.path, spec.offset, spec.ty)?;
        apply_plan(&InsertPlan::Elements(pairs), &mut sink, &data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(start: usize, len: usize) -> Subscript {
        Subscript::Range {
            start,
            len,
            reversed: false,
            summation: false,
        }
    }

    /// Passes writes through to a file until its budget runs out.
    struct FailingSink {
        inner: FileSink,
        budget: usize,
    }

    impl InsertSink for FailingSink {
        fn put(&mut self, at: usize, source: &ArrayData, from: usize) -> EngineResult<()> {
            if self.budget == 0 {
                return Err(EngineError::io("map.bin", "no space left on device"));
            }
            self.budget -= 1;
            self.inner.put(at, source, from)
        }

        fn put_block(&mut self, at: usize, source: &ArrayData, from: usize, len: usize) -> EngineResult<()> {
            for k in 0..len {
                self.put(at + k, source, from + k)?;
            }
            Ok(())
        }
    }

    #[test]
    fn a_failed_file_write_keeps_the_elements_already_written() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("map.bin");
        std::fs::write(&path, [0u8; 8]).expect("seed");
        let inner = FileSink::open(&path, 0, NumericType::Word).expect("open");
        let mut sink = FailingSink { inner, budget: 2 };

        let plan = plan_insert(&[4], &[range(0, 4)], &[4], 4, Combine::Outer, false).expect("plan");
        let source = ArrayData::Word(vec![1, 2, 3, 4]);
        let err = apply_plan(&plan, &mut sink, &source).expect_err("third write fails");
        assert!(matches!(err, EngineError::Io { .. }));
        assert_eq!(std::fs::read(&path).expect("read"), vec![1, 0, 2, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn fast_and_general_paths_write_the_same_elements() {
        let extents = [4, 3];
        let subs = [range(1, 3), Subscript::Scalar(2)];
        let source = ArrayData::Long(vec![7, 8, 9]);
        let fast = plan_insert(&extents, &subs, &[3], 3, Combine::Outer, true).expect("fast");
        let slow = plan_insert(&extents, &subs, &[3], 3, Combine::Outer, false).expect("slow");
        assert_eq!(fast, InsertPlan::Block { start: 9, len: 3 });
        assert!(matches!(slow, InsertPlan::Elements(_)));

        let mut a = ArrayData::zeros(NumericType::Long, 12);
        let mut b = ArrayData::zeros(NumericType::Long, 12);
        apply_plan(&fast, &mut a, &source).expect("apply fast");
        apply_plan(&slow, &mut b, &source).expect("apply slow");
        assert_eq!(a, b);
    }

    #[test]
    fn outer_requires_matching_sizes_unless_broadcasting() {
        let subs = [range(0, 2), range(0, 2)];
        assert!(plan_insert(&[4, 3], &subs, &[4], 4, Combine::Outer, false).is_err());
        assert!(plan_insert(&[4, 3], &subs, &[2, 2], 4, Combine::Outer, false).is_ok());
        let broadcast = plan_insert(&[4, 3], &subs, &[], 1, Combine::Outer, false).expect("scalar");
        assert_eq!(
            broadcast,
            InsertPlan::Elements(vec![(0, 0), (1, 0), (4, 0), (5, 0)])
        );
    }

    #[test]
    fn inner_zips_equal_length_subscripts() {
        let subs = [
            Subscript::IndexVector(vec![0, 1, 2]),
            Subscript::IndexVector(vec![0, 1, 2]),
        ];
        let plan = plan_insert(&[3, 3], &subs, &[3], 3, Combine::Inner, false).expect("zip");
        assert_eq!(plan, InsertPlan::Elements(vec![(0, 0), (4, 1), (8, 2)]));
        let uneven = [Subscript::IndexVector(vec![0, 1]), Subscript::IndexVector(vec![0, 1, 2])];
        assert!(plan_insert(&[3, 3], &uneven, &[3], 3, Combine::Inner, false).is_err());
    }

    #[test]
    fn scalar_corner_places_the_whole_block() {
        let subs = [Subscript::Scalar(1), Subscript::Scalar(1)];
        let plan = plan_insert(&[4, 4], &subs, &[2, 2], 4, Combine::Outer, false).expect("corner");
        assert_eq!(
            plan,
            InsertPlan::Elements(vec![(5, 0), (6, 1), (9, 2), (10, 3)])
        );
        let edge = [Subscript::Scalar(3), Subscript::Scalar(3)];
        assert!(plan_insert(&[4, 4], &edge, &[2, 2], 4, Combine::Outer, false).is_err());
    }
}

//==================================================
// End of file
//==================================================
