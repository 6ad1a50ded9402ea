//==================================================
// File: symbol/mod.rs
//==================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Symbol value model for the execution engine
// Objective: Define SymbolIndex, symbol classes and every payload shape
//            the store, binder, dispatcher and insert engine operate on
//==================================================

pub mod store;
pub mod types;

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::native::NativeId;

pub use store::{SymbolStore, TempMark, TEMP_BASE};
pub use types::{ArrayData, Element, NumericType, Scalar, Wide};

//==================================================
// Section 1.0 - Identity
//==================================================

/// Generation-checked handle to a symbol slot. A handle whose generation no
/// longer matches its slot is stale and every lookup through it fails.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct SymbolIndex {
    slot: u32,
    generation: u32,
}

impl SymbolIndex {
    pub(crate) fn new(slot: u32, generation: u32) -> Self {
        Self { slot, generation }
    }

    pub fn slot(&self) -> u32 {
        self.slot
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }

    pub fn is_temp(&self) -> bool {
        self.slot >= TEMP_BASE
    }
}

impl fmt::Debug for SymbolIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_temp() {
            write!(f, "#t{}.{}", self.slot - TEMP_BASE, self.generation)
        } else {
            write!(f, "#{}.{}", self.slot, self.generation)
        }
    }
}

impl fmt::Display for SymbolIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Owning routine of a symbol, or the global (main level) context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Context {
    Global,
    Routine(SymbolIndex),
}

/// Separate name spaces so a variable and a routine may share a name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    Variable,
    Subroutine,
    Function,
    Block,
}

//==================================================
// Section 2.0 - Classes
//==================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolClass {
    Scalar,
    Array,
    StringValue,
    Range,
    List,
    CompactList,
    Struct,
    ScalarPointer,
    Keyword,
    Transfer,
    FunctionPointer,
    UserSubroutine,
    UserFunction,
    BlockRoutine,
    DeferredSubroutine,
    DeferredFunction,
    DeferredBlock,
    FileMappedArray,
    AssociatedFileVariable,
    ComplexScalar,
    ComplexArray,
    ExecutableNode,
    Expression,
    Undefined,
    Unused,
}

impl SymbolClass {
    pub fn name(self) -> &'static str {
        match self {
            SymbolClass::Scalar => "scalar",
            SymbolClass::Array => "array",
            SymbolClass::StringValue => "string",
            SymbolClass::Range => "range",
            SymbolClass::List => "list",
            SymbolClass::CompactList => "compact list",
            SymbolClass::Struct => "struct",
            SymbolClass::ScalarPointer => "scalar pointer",
            SymbolClass::Keyword => "keyword",
            SymbolClass::Transfer => "transfer",
            SymbolClass::FunctionPointer => "function pointer",
            SymbolClass::UserSubroutine => "subroutine",
            SymbolClass::UserFunction => "function",
            SymbolClass::BlockRoutine => "block routine",
            SymbolClass::DeferredSubroutine => "deferred subroutine",
            SymbolClass::DeferredFunction => "deferred function",
            SymbolClass::DeferredBlock => "deferred block routine",
            SymbolClass::FileMappedArray => "file-mapped array",
            SymbolClass::AssociatedFileVariable => "associated variable",
            SymbolClass::ComplexScalar => "complex scalar",
            SymbolClass::ComplexArray => "complex array",
            SymbolClass::ExecutableNode => "executable node",
            SymbolClass::Expression => "expression",
            SymbolClass::Undefined => "undefined",
            SymbolClass::Unused => "unused",
        }
    }
}

impl fmt::Display for SymbolClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

//==================================================
// Section 3.0 - Payload Shapes
//==================================================

#[derive(Debug, Clone, PartialEq)]
pub struct ArrayValue {
    pub dims: Vec<usize>,
    pub data: ArrayData,
}

impl ArrayValue {
    pub fn new(dims: Vec<usize>, data: ArrayData) -> Self {
        Self { dims, data }
    }

    pub fn zeros(ty: NumericType, dims: Vec<usize>) -> Self {
        let count = dims.iter().product();
        Self {
            dims,
            data: ArrayData::zeros(ty, count),
        }
    }

    pub fn vector(data: ArrayData) -> Self {
        Self {
            dims: vec![data.len()],
            data,
        }
    }

    pub fn element_count(&self) -> usize {
        self.data.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeEnd {
    Index(SymbolIndex),
    ToEnd,
}

/// Unevaluated `start:end` subscript. Bounds are expression symbols.
#[derive(Debug, Clone, PartialEq)]
pub struct RangeValue {
    pub start: SymbolIndex,
    pub end: RangeEnd,
    pub reversed: bool,
    pub summation: bool,
    pub redirect: Option<u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ListMember {
    pub tag: Option<String>,
    pub value: SymbolIndex,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ElementRef {
    pub target: SymbolIndex,
    pub element: usize,
}

/// A `name=value` (or bare `/name`) entry in a call argument list.
#[derive(Debug, Clone, PartialEq)]
pub struct KeywordArg {
    pub name: String,
    pub value: Option<SymbolIndex>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Callee {
    Native(NativeId),
    User(SymbolIndex),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoutineKind {
    Subroutine,
    Function,
    Block,
}

impl RoutineKind {
    pub fn namespace(self) -> Namespace {
        match self {
            RoutineKind::Subroutine => Namespace::Subroutine,
            RoutineKind::Function => Namespace::Function,
            RoutineKind::Block => Namespace::Block,
        }
    }
}

/// A compiled user routine. Parameters are named `Transfer` symbols owned by
/// the routine; they are rebound on each call.
#[derive(Debug, Clone, PartialEq)]
pub struct Routine {
    pub kind: RoutineKind,
    pub params: Vec<SymbolIndex>,
    pub variadic: bool,
    pub body: Vec<SymbolIndex>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FileMapSpec {
    pub path: PathBuf,
    pub ty: NumericType,
    pub dims: Vec<usize>,
    pub offset: u64,
    pub readonly: bool,
}

impl FileMapSpec {
    pub fn element_count(&self) -> usize {
        self.dims.iter().product()
    }
}

/// Records of `record_dims` elements laid end to end in a file.
#[derive(Debug, Clone, PartialEq)]
pub struct AssocSpec {
    pub path: PathBuf,
    pub ty: NumericType,
    pub record_dims: Vec<usize>,
    pub offset: u64,
    pub readonly: bool,
}

impl AssocSpec {
    pub fn record_len(&self) -> usize {
        self.record_dims.iter().product()
    }
}

//==================================================
// Section 4.0 - Executable Nodes & Expressions
//==================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Combine {
    Inner,
    #[default]
    Outer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum IncludeMode {
    #[default]
    Always,
    Once,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub line: u32,
    pub kind: NodeKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Assignment {
        target: SymbolIndex,
        subscripts: Vec<SymbolIndex>,
        source: SymbolIndex,
        combine: Combine,
    },
    NativeCall {
        routine: NativeId,
        args: Vec<SymbolIndex>,
    },
    UserCall {
        routine: SymbolIndex,
        args: Vec<SymbolIndex>,
    },
    RunBlock {
        block: SymbolIndex,
    },
    CaseSwitch {
        arms: Vec<(SymbolIndex, SymbolIndex)>,
        otherwise: Option<SymbolIndex>,
    },
    NumericCaseSwitch {
        selector: SymbolIndex,
        arms: Vec<SymbolIndex>,
        otherwise: Option<SymbolIndex>,
    },
    FileInclude {
        path: String,
        mode: IncludeMode,
    },
    StatementBlock {
        statements: Vec<SymbolIndex>,
    },
    ForLoop {
        counter: SymbolIndex,
        start: SymbolIndex,
        end: SymbolIndex,
        step: Option<SymbolIndex>,
        body: SymbolIndex,
    },
    IfThenElse {
        condition: SymbolIndex,
        then_branch: SymbolIndex,
        else_branch: Option<SymbolIndex>,
    },
    RepeatUntil {
        body: SymbolIndex,
        condition: SymbolIndex,
    },
    DoWhile {
        body: SymbolIndex,
        condition: SymbolIndex,
    },
    WhileDo {
        condition: SymbolIndex,
        body: SymbolIndex,
    },
    Return {
        value: Option<SymbolIndex>,
    },
    Break,
    Continue,
    ReturnAll,
}

impl NodeKind {
    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::Assignment { .. } => "assignment",
            NodeKind::NativeCall { .. } => "native call",
            NodeKind::UserCall { .. } => "user call",
            NodeKind::RunBlock { .. } => "run block",
            NodeKind::CaseSwitch { .. } => "case",
            NodeKind::NumericCaseSwitch { .. } => "ncase",
            NodeKind::FileInclude { .. } => "include",
            NodeKind::StatementBlock { .. } => "block",
            NodeKind::ForLoop { .. } => "for",
            NodeKind::IfThenElse { .. } => "if",
            NodeKind::RepeatUntil { .. } => "repeat",
            NodeKind::DoWhile { .. } => "do-while",
            NodeKind::WhileDo { .. } => "while",
            NodeKind::Return { .. } => "return",
            NodeKind::Break => "break",
            NodeKind::Continue => "continue",
            NodeKind::ReturnAll => "retall",
        }
    }

    pub fn children(&self) -> Vec<SymbolIndex> {
        let mut out = Vec::new();
        match self {
            NodeKind::Assignment {
                target,
                subscripts,
                source,
                ..
            } => {
                out.push(*target);
                out.extend(subscripts);
                out.push(*source);
            }
            NodeKind::NativeCall { args, .. } => out.extend(args),
            NodeKind::UserCall { routine, args } => {
                out.push(*routine);
                out.extend(args);
            }
            NodeKind::RunBlock { block } => out.push(*block),
            NodeKind::CaseSwitch { arms, otherwise } => {
                for (condition, statement) in arms {
                    out.push(*condition);
                    out.push(*statement);
                }
                out.extend(otherwise);
            }
            NodeKind::NumericCaseSwitch {
                selector,
                arms,
                otherwise,
            } => {
                out.push(*selector);
                out.extend(arms);
                out.extend(otherwise);
            }
            NodeKind::StatementBlock { statements } => out.extend(statements),
            NodeKind::ForLoop {
                counter,
                start,
                end,
                step,
                body,
            } => {
                out.extend([*counter, *start, *end]);
                out.extend(step);
                out.push(*body);
            }
            NodeKind::IfThenElse {
                condition,
                then_branch,
                else_branch,
            } => {
                out.extend([*condition, *then_branch]);
                out.extend(else_branch);
            }
            NodeKind::RepeatUntil { body, condition }
            | NodeKind::DoWhile { body, condition }
            | NodeKind::WhileDo { condition, body } => out.extend([*body, *condition]),
            NodeKind::Return { value } => out.extend(value),
            NodeKind::FileInclude { .. }
            | NodeKind::Break
            | NodeKind::Continue
            | NodeKind::ReturnAll => {}
        }
        out
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

impl BinaryOp {
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnaryOp {
    Neg,
    Not,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Binary {
        op: BinaryOp,
        lhs: SymbolIndex,
        rhs: SymbolIndex,
    },
    Unary {
        op: UnaryOp,
        operand: SymbolIndex,
    },
    NativeCall {
        routine: NativeId,
        args: Vec<SymbolIndex>,
    },
    UserCall {
        routine: SymbolIndex,
        args: Vec<SymbolIndex>,
    },
    IndirectCall {
        pointer: SymbolIndex,
        args: Vec<SymbolIndex>,
    },
    Extract {
        source: SymbolIndex,
        subscripts: Vec<SymbolIndex>,
    },
    Member {
        source: SymbolIndex,
        tag: String,
    },
    Concat {
        items: Vec<SymbolIndex>,
    },
    ListBuild {
        items: Vec<SymbolIndex>,
    },
}

impl Expression {
    pub fn children(&self) -> Vec<SymbolIndex> {
        match self {
            Expression::Binary { lhs, rhs, .. } => vec![*lhs, *rhs],
            Expression::Unary { operand, .. } => vec![*operand],
            Expression::NativeCall { args, .. } => args.clone(),
            Expression::UserCall { routine, args } => {
                let mut out = vec![*routine];
                out.extend(args);
                out
            }
            Expression::IndirectCall { pointer, args } => {
                let mut out = vec![*pointer];
                out.extend(args);
                out
            }
            Expression::Extract { source, subscripts } => {
                let mut out = vec![*source];
                out.extend(subscripts);
                out
            }
            Expression::Member { source, .. } => vec![*source],
            Expression::Concat { items } | Expression::ListBuild { items } => items.clone(),
        }
    }
}

//==================================================
// Section 5.0 - Symbol Records
//==================================================

/// Every shape a symbol can hold. The class and numeric type of a symbol are
/// derived from this, so the two can never disagree.
#[derive(Debug, Clone, PartialEq)]
pub enum SymbolValue {
    Unused,
    Undefined,
    Scalar(Scalar),
    Array(ArrayValue),
    Text(String),
    Range(RangeValue),
    List(Vec<ListMember>),
    CompactList(Vec<SymbolIndex>),
    Struct(Vec<ListMember>),
    ScalarPointer(ElementRef),
    Keyword(KeywordArg),
    Transfer(Option<SymbolIndex>),
    FunctionPointer(Callee),
    Routine(Routine),
    DeferredRoutine(RoutineKind),
    FileMap(FileMapSpec),
    Assoc(AssocSpec),
    Node(Node),
    Expression(Expression),
}

impl SymbolValue {
    pub fn class(&self) -> SymbolClass {
        match self {
            SymbolValue::Unused => SymbolClass::Unused,
            SymbolValue::Undefined => SymbolClass::Undefined,
            SymbolValue::Scalar(scalar) if scalar.numeric_type().is_complex() => {
                SymbolClass::ComplexScalar
            }
            SymbolValue::Scalar(_) => SymbolClass::Scalar,
            SymbolValue::Array(array) if array.data.numeric_type().is_complex() => {
                SymbolClass::ComplexArray
            }
            SymbolValue::Array(_) => SymbolClass::Array,
            SymbolValue::Text(_) => SymbolClass::StringValue,
            SymbolValue::Range(_) => SymbolClass::Range,
            SymbolValue::List(_) => SymbolClass::List,
            SymbolValue::CompactList(_) => SymbolClass::CompactList,
            SymbolValue::Struct(_) => SymbolClass::Struct,
            SymbolValue::ScalarPointer(_) => SymbolClass::ScalarPointer,
            SymbolValue::Keyword(_) => SymbolClass::Keyword,
            SymbolValue::Transfer(_) => SymbolClass::Transfer,
            SymbolValue::FunctionPointer(_) => SymbolClass::FunctionPointer,
            SymbolValue::Routine(routine) => match routine.kind {
                RoutineKind::Subroutine => SymbolClass::UserSubroutine,
                RoutineKind::Function => SymbolClass::UserFunction,
                RoutineKind::Block => SymbolClass::BlockRoutine,
            },
            SymbolValue::DeferredRoutine(kind) => match kind {
                RoutineKind::Subroutine => SymbolClass::DeferredSubroutine,
                RoutineKind::Function => SymbolClass::DeferredFunction,
                RoutineKind::Block => SymbolClass::DeferredBlock,
            },
            SymbolValue::FileMap(_) => SymbolClass::FileMappedArray,
            SymbolValue::Assoc(_) => SymbolClass::AssociatedFileVariable,
            SymbolValue::Node(_) => SymbolClass::ExecutableNode,
            SymbolValue::Expression(_) => SymbolClass::Expression,
        }
    }

    /// Element type, if the class carries one. Plain strings do not.
    pub fn numeric_type(&self) -> Option<NumericType> {
        match self {
            SymbolValue::Scalar(scalar) => Some(scalar.numeric_type()),
            SymbolValue::Array(array) => Some(array.data.numeric_type()),
            SymbolValue::FileMap(spec) => Some(spec.ty),
            SymbolValue::Assoc(spec) => Some(spec.ty),
            _ => None,
        }
    }

    /// Children freed together with this symbol (when anonymous).
    pub fn owned_children(&self) -> Vec<SymbolIndex> {
        match self {
            SymbolValue::Range(range) => {
                let mut out = vec![range.start];
                if let RangeEnd::Index(end) = range.end {
                    out.push(end);
                }
                out
            }
            SymbolValue::List(members) | SymbolValue::Struct(members) => {
                members.iter().map(|member| member.value).collect()
            }
            SymbolValue::CompactList(items) => items.clone(),
            SymbolValue::Keyword(keyword) => keyword.value.into_iter().collect(),
            SymbolValue::Node(node) => node.kind.children(),
            SymbolValue::Expression(expression) => expression.children(),
            _ => Vec::new(),
        }
    }

    /// Everything this symbol keeps alive: owned children plus alias targets.
    pub fn references(&self) -> Vec<SymbolIndex> {
        let mut out = self.owned_children();
        match self {
            SymbolValue::Transfer(Some(target)) => out.push(*target),
            SymbolValue::ScalarPointer(pointer) => out.push(pointer.target),
            SymbolValue::FunctionPointer(Callee::User(routine)) => out.push(*routine),
            _ => {}
        }
        out
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, SymbolValue::Scalar(_) | SymbolValue::Array(_))
    }
}

#[derive(Debug, Clone)]
pub struct Symbol {
    pub name: Option<String>,
    pub context: Context,
    pub value: SymbolValue,
    pub(crate) pins: u32,
}

impl Symbol {
    pub fn new(name: Option<String>, context: Context, value: SymbolValue) -> Self {
        Self {
            name,
            context,
            value,
            pins: 0,
        }
    }

    pub fn unused() -> Self {
        Self::new(None, Context::Global, SymbolValue::Unused)
    }

    pub fn class(&self) -> SymbolClass {
        self.value.class()
    }

    pub fn is_named(&self) -> bool {
        self.name.is_some()
    }

    pub fn is_pinned(&self) -> bool {
        self.pins > 0
    }

    pub fn display_name(&self) -> String {
        self.name.clone().unwrap_or_else(|| "<anonymous>".to_string())
    }
}

//==================================================
// End of file
//==================================================
