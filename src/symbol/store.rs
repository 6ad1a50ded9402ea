//==================================================
// File: symbol/store.rs
//==================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Global symbol table for the execution engine
// Objective: Own every symbol in a generation-checked arena with a
//            permanent region and a compact, mark/sweep-managed temp region
//==================================================

use std::collections::{HashMap, HashSet};
use std::mem;

use tracing::trace;

use super::{Context, Namespace, Symbol, SymbolClass, SymbolIndex, SymbolValue};
use crate::interpreter::errors::{EngineError, EngineResult};

/// First slot number of the temp region.
pub const TEMP_BASE: u32 = 1 << 30;

const MAX_TRANSFER_HOPS: usize = 64;

/// Temp high-water mark recorded before evaluating a sub-expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct TempMark(usize);

impl TempMark {
    pub fn position(&self) -> usize {
        self.0
    }
}

#[derive(Debug)]
struct Slot {
    generation: u32,
    namespace: Namespace,
    symbol: Symbol,
}

impl Slot {
    fn fresh() -> Self {
        Self {
            generation: 0,
            namespace: Namespace::Variable,
            symbol: Symbol::unused(),
        }
    }

    fn is_unused(&self) -> bool {
        matches!(self.symbol.value, SymbolValue::Unused)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct NameKey {
    namespace: Namespace,
    context: Context,
    name: String,
}

//==================================================
// Section 1.0 - Store
//==================================================

#[derive(Debug, Default)]
pub struct SymbolStore {
    permanent: Vec<Slot>,
    free_slots: Vec<u32>,
    temps: Vec<Slot>,
    temp_top: usize,
    names: HashMap<NameKey, SymbolIndex>,
}

impl SymbolStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, index: SymbolIndex) -> EngineResult<&Slot> {
        let slot = if index.is_temp() {
            self.temps.get((index.slot() - TEMP_BASE) as usize)
        } else {
            self.permanent.get(index.slot() as usize)
        };
        match slot {
            Some(slot) if slot.generation == index.generation() && !slot.is_unused() => Ok(slot),
            _ => Err(EngineError::StaleSymbol(index)),
        }
    }

    fn slot_mut(&mut self, index: SymbolIndex) -> EngineResult<&mut Slot> {
        let slot = if index.is_temp() {
            self.temps.get_mut((index.slot() - TEMP_BASE) as usize)
        } else {
            self.permanent.get_mut(index.slot() as usize)
        };
        match slot {
            Some(slot) if slot.generation == index.generation() && !slot.is_unused() => Ok(slot),
            _ => Err(EngineError::StaleSymbol(index)),
        }
    }

    pub fn contains(&self, index: SymbolIndex) -> bool {
        self.slot(index).is_ok()
    }

    pub fn get(&self, index: SymbolIndex) -> EngineResult<&Symbol> {
        self.slot(index).map(|slot| &slot.symbol)
    }

    pub fn get_mut(&mut self, index: SymbolIndex) -> EngineResult<&mut Symbol> {
        self.slot_mut(index).map(|slot| &mut slot.symbol)
    }

    pub fn value(&self, index: SymbolIndex) -> EngineResult<&SymbolValue> {
        self.get(index).map(|symbol| &symbol.value)
    }

    pub fn value_mut(&mut self, index: SymbolIndex) -> EngineResult<&mut SymbolValue> {
        self.get_mut(index).map(|symbol| &mut symbol.value)
    }

    pub fn class(&self, index: SymbolIndex) -> EngineResult<SymbolClass> {
        self.value(index).map(SymbolValue::class)
    }

    /// Name of the symbol for diagnostics, `<anonymous>` when it has none.
    pub fn describe(&self, index: SymbolIndex) -> String {
        self.get(index)
            .map(Symbol::display_name)
            .unwrap_or_else(|_| index.to_string())
    }

    //==================================================
    // Section 1.1 - Permanent Allocation & Names
    //==================================================

    /// Allocate an anonymous permanent symbol owned by `context`.
    pub fn allocate(&mut self, context: Context, value: SymbolValue) -> EngineResult<SymbolIndex> {
        self.allocate_permanent(Namespace::Variable, Symbol::new(None, context, value))
    }

    fn allocate_permanent(
        &mut self,
        namespace: Namespace,
        symbol: Symbol,
    ) -> EngineResult<SymbolIndex> {
        if let Some(position) = self.free_slots.pop() {
            let slot = &mut self.permanent[position as usize];
            slot.namespace = namespace;
            slot.symbol = symbol;
            return Ok(SymbolIndex::new(position, slot.generation));
        }
        let position = u32::try_from(self.permanent.len())
            .ok()
            .filter(|position| *position < TEMP_BASE)
            .ok_or_else(|| EngineError::Allocation("permanent symbol region exhausted".into()))?;
        self.permanent.push(Slot {
            generation: 0,
            namespace,
            symbol,
        });
        Ok(SymbolIndex::new(position, 0))
    }

    /// Find or create the named symbol. An existing symbol keeps its index
    /// and has its value replaced.
    pub fn define(
        &mut self,
        namespace: Namespace,
        context: Context,
        name: &str,
        value: SymbolValue,
    ) -> EngineResult<SymbolIndex> {
        let key = NameKey {
            namespace,
            context,
            name: name.to_ascii_uppercase(),
        };
        if let Some(existing) = self.names.get(&key).copied() {
            if self.contains(existing) {
                self.set_value(existing, value)?;
                return Ok(existing);
            }
        }
        let symbol = Symbol::new(Some(key.name.clone()), context, value);
        let index = self.allocate_permanent(namespace, symbol)?;
        self.names.insert(key, index);
        Ok(index)
    }

    pub fn lookup(&self, namespace: Namespace, context: Context, name: &str) -> Option<SymbolIndex> {
        let key = NameKey {
            namespace,
            context,
            name: name.to_ascii_uppercase(),
        };
        self.names
            .get(&key)
            .copied()
            .filter(|index| self.contains(*index))
    }

    pub fn named_symbols(&self) -> impl Iterator<Item = (SymbolIndex, &Symbol)> {
        self.permanent
            .iter()
            .enumerate()
            .filter(|(_, slot)| !slot.is_unused() && slot.symbol.is_named())
            .map(|(position, slot)| (SymbolIndex::new(position as u32, slot.generation), &slot.symbol))
    }

    pub fn permanent_count(&self) -> usize {
        self.permanent.iter().filter(|slot| !slot.is_unused()).count()
    }

    //==================================================
    // Section 1.2 - Temp Region
    //==================================================

    pub fn allocate_temp(&mut self, value: SymbolValue) -> EngineResult<SymbolIndex> {
        let position = self.temp_top;
        if position as u64 + TEMP_BASE as u64 >= u32::MAX as u64 {
            return Err(EngineError::Allocation("temp symbol region exhausted".into()));
        }
        if position == self.temps.len() {
            self.temps.push(Slot::fresh());
        }
        let slot = &mut self.temps[position];
        slot.namespace = Namespace::Variable;
        slot.symbol = Symbol::new(None, Context::Global, value);
        self.temp_top += 1;
        Ok(SymbolIndex::new(TEMP_BASE + position as u32, slot.generation))
    }

    pub fn temp_mark(&self) -> TempMark {
        TempMark(self.temp_top)
    }

    /// Current high-water mark of the temp region.
    pub fn temp_top(&self) -> usize {
        self.temp_top
    }

    pub fn live_temps(&self) -> usize {
        self.temps[..self.temp_top]
            .iter()
            .filter(|slot| !slot.is_unused())
            .count()
    }

    pub fn protect(&mut self, index: SymbolIndex) -> EngineResult<()> {
        self.get_mut(index)?.pins += 1;
        Ok(())
    }

    pub fn unprotect(&mut self, index: SymbolIndex) -> EngineResult<()> {
        let symbol = self.get_mut(index)?;
        symbol.pins = symbol.pins.saturating_sub(1);
        Ok(())
    }

    /// Whether some live temp holds `index` as an owned member.
    pub fn owned_by_temp(&self, index: SymbolIndex) -> bool {
        index.is_temp()
            && self.temps[..self.temp_top].iter().any(|slot| {
                !slot.is_unused() && slot.symbol.value.owned_children().contains(&index)
            })
    }

    /// Free `index` if it is an unpinned temp. Returns whether it was freed.
    pub fn release_if_free_temp(&mut self, index: SymbolIndex) -> EngineResult<bool> {
        if !index.is_temp() || !self.contains(index) || self.get(index)?.is_pinned() {
            return Ok(false);
        }
        self.free(index)?;
        Ok(true)
    }

    /// Free every temp allocated at or above `mark` that is neither pinned,
    /// listed in `keep`, nor reachable from one of those. Children owned by
    /// an older temp (a value moved into it since the mark) also survive.
    pub fn sweep_since(&mut self, mark: TempMark, keep: &[SymbolIndex]) -> usize {
        let start = mark.0.min(self.temp_top);
        let end = self.temp_top;
        let mut live: HashSet<SymbolIndex> = HashSet::new();
        let mut pending: Vec<SymbolIndex> = keep.to_vec();
        for slot in &self.temps[..start] {
            if slot.is_unused() {
                continue;
            }
            pending.extend(
                slot.symbol
                    .value
                    .owned_children()
                    .into_iter()
                    .filter(|child| child.is_temp() && (child.slot() - TEMP_BASE) as usize >= start),
            );
        }
        for position in start..end {
            let slot = &self.temps[position];
            if !slot.is_unused() && slot.symbol.is_pinned() {
                pending.push(SymbolIndex::new(TEMP_BASE + position as u32, slot.generation));
            }
        }
        while let Some(index) = pending.pop() {
            let Ok(symbol) = self.get(index) else {
                continue;
            };
            if live.insert(index) {
                pending.extend(symbol.value.references());
            }
        }

        let mut freed = 0;
        for position in (start..end).rev() {
            let slot = &self.temps[position];
            if slot.is_unused() {
                continue;
            }
            let index = SymbolIndex::new(TEMP_BASE + position as u32, slot.generation);
            if live.contains(&index) {
                continue;
            }
            if self.free_guarded(index, &live).is_ok() {
                freed += 1;
            }
        }
        if freed > 0 {
            trace!(freed, top = self.temp_top, "temp sweep");
        }
        freed
    }

    /// Sweep the whole temp region.
    pub fn sweep_unprotected(&mut self) -> usize {
        self.sweep_since(TempMark(0), &[])
    }

    //==================================================
    // Section 1.3 - Freeing
    //==================================================

    /// Reset the symbol to `Unused` and release its owned payload. Freeing an
    /// unused or stale handle is a no-op.
    pub fn free(&mut self, index: SymbolIndex) -> EngineResult<()> {
        self.free_guarded(index, &HashSet::new())
    }

    fn free_guarded(&mut self, index: SymbolIndex, live: &HashSet<SymbolIndex>) -> EngineResult<()> {
        let Ok(slot) = self.slot_mut(index) else {
            return Ok(());
        };
        let namespace = slot.namespace;
        let symbol = mem::replace(&mut slot.symbol, Symbol::unused());
        slot.generation = slot.generation.wrapping_add(1);

        if let Some(name) = &symbol.name {
            let key = NameKey {
                namespace,
                context: symbol.context,
                name: name.clone(),
            };
            if self.names.get(&key) == Some(&index) {
                self.names.remove(&key);
            }
        }
        if index.is_temp() {
            while self.temp_top > 0 && self.temps[self.temp_top - 1].is_unused() {
                self.temp_top -= 1;
            }
        } else {
            self.free_slots.push(index.slot());
        }
        if matches!(symbol.value, SymbolValue::Routine(_)) {
            self.free_context(Context::Routine(index));
        }
        self.release_children(index.is_temp(), symbol.value, live);
        Ok(())
    }

    /// Free the owned children of a value that is being discarded. Named
    /// children, children from the other region and pinned or live children
    /// are left alone.
    fn release_children(&mut self, parent_temp: bool, value: SymbolValue, live: &HashSet<SymbolIndex>) {
        for child in value.owned_children() {
            if child.is_temp() != parent_temp || live.contains(&child) {
                continue;
            }
            let releasable = self
                .get(child)
                .map(|symbol| !symbol.is_named() && !symbol.is_pinned())
                .unwrap_or(false);
            if releasable {
                let _ = self.free_guarded(child, live);
            }
        }
    }

    /// Free every symbol owned by `context`: a routine's node tree, its
    /// constants, locals and parameters.
    pub fn free_context(&mut self, context: Context) -> usize {
        let owned: Vec<SymbolIndex> = self
            .permanent
            .iter()
            .enumerate()
            .filter(|(_, slot)| !slot.is_unused() && slot.symbol.context == context)
            .map(|(position, slot)| SymbolIndex::new(position as u32, slot.generation))
            .collect();
        let mut freed = 0;
        for index in owned {
            if self.contains(index) && self.free(index).is_ok() {
                freed += 1;
            }
        }
        freed
    }

    //==================================================
    // Section 1.4 - Value Replacement & Copies
    //==================================================

    /// Replace the value, releasing whatever the old value owned.
    pub fn set_value(&mut self, index: SymbolIndex, value: SymbolValue) -> EngineResult<()> {
        let slot = self.slot_mut(index)?;
        let old = mem::replace(&mut slot.symbol.value, value);
        self.release_children(index.is_temp(), old, &HashSet::new());
        Ok(())
    }

    /// Move the value out, leaving `Undefined` behind. Ownership of any
    /// children moves with the value.
    pub fn take_value(&mut self, index: SymbolIndex) -> EngineResult<SymbolValue> {
        let slot = self.slot_mut(index)?;
        Ok(mem::replace(&mut slot.symbol.value, SymbolValue::Undefined))
    }

    /// Follow `Transfer` links to the symbol that actually holds a value.
    pub fn resolve(&self, index: SymbolIndex) -> EngineResult<SymbolIndex> {
        let mut current = index;
        for _ in 0..MAX_TRANSFER_HOPS {
            match self.value(current)? {
                SymbolValue::Transfer(Some(target)) => current = *target,
                _ => return Ok(current),
            }
        }
        Err(EngineError::IllegalClass {
            what: self.describe(index),
            class: SymbolClass::Transfer,
            expected: "a transfer chain that ends in a value",
        })
    }

    /// Deep copy `value`, giving every owned child a fresh symbol in the
    /// requested region.
    pub fn duplicate_value(
        &mut self,
        value: &SymbolValue,
        temp: bool,
        context: Context,
    ) -> EngineResult<SymbolValue> {
        let copy = match value {
            SymbolValue::List(members) | SymbolValue::Struct(members) => {
                let mut copied = Vec::with_capacity(members.len());
                for member in members {
                    let mut member = member.clone();
                    member.value = self.duplicate_child(member.value, temp, context)?;
                    copied.push(member);
                }
                if matches!(value, SymbolValue::List(_)) {
                    SymbolValue::List(copied)
                } else {
                    SymbolValue::Struct(copied)
                }
            }
            SymbolValue::CompactList(items) => {
                let mut copied = Vec::with_capacity(items.len());
                for item in items {
                    copied.push(self.duplicate_child(*item, temp, context)?);
                }
                SymbolValue::CompactList(copied)
            }
            SymbolValue::Keyword(keyword) => {
                let mut keyword = keyword.clone();
                if let Some(inner) = keyword.value {
                    keyword.value = Some(self.duplicate_child(inner, temp, context)?);
                }
                SymbolValue::Keyword(keyword)
            }
            SymbolValue::Range(range) => {
                let mut range = range.clone();
                range.start = self.duplicate_child(range.start, temp, context)?;
                if let super::RangeEnd::Index(end) = range.end {
                    range.end = super::RangeEnd::Index(self.duplicate_child(end, temp, context)?);
                }
                SymbolValue::Range(range)
            }
            SymbolValue::Node(_)
            | SymbolValue::Expression(_)
            | SymbolValue::Routine(_)
            | SymbolValue::Unused => {
                return Err(EngineError::IllegalClass {
                    what: "copy source".into(),
                    class: value.class(),
                    expected: "a data value",
                });
            }
            other => other.clone(),
        };
        Ok(copy)
    }

    fn duplicate_child(
        &mut self,
        child: SymbolIndex,
        temp: bool,
        context: Context,
    ) -> EngineResult<SymbolIndex> {
        let value = self.value(child)?.clone();
        let copy = self.duplicate_value(&value, temp, context)?;
        if temp {
            self.allocate_temp(copy)
        } else {
            self.allocate(context, copy)
        }
    }

    /// Copy `index` into a new temp.
    pub fn duplicate_to_temp(&mut self, index: SymbolIndex) -> EngineResult<SymbolIndex> {
        self.duplicate_child(index, true, Context::Global)
    }

    /// Give `target` the value of `source`. A childless temp source is moved
    /// and freed; anything else is deep-copied into the target's region.
    pub fn assign_from(&mut self, target: SymbolIndex, source: SymbolIndex) -> EngineResult<()> {
        if target == source {
            return Ok(());
        }
        let source_symbol = self.get(source)?;
        let movable = source.is_temp()
            && !source_symbol.is_pinned()
            && (target.is_temp() || source_symbol.value.owned_children().is_empty());
        if movable {
            let value = self.take_value(source)?;
            self.set_value(target, value)?;
            self.release_if_free_temp(source)?;
            return Ok(());
        }
        let context = self.get(target)?.context;
        let value = self.value(source)?.clone();
        let copy = self.duplicate_value(&value, target.is_temp(), context)?;
        self.set_value(target, copy)
    }
}

//==================================================
// Section 2.0 - Tests
//==================================================


//==================================================
// End of file
//==================================================
