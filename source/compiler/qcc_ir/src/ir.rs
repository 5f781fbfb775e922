// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The statement-level program model consumed by the analyses: packages of callables whose bodies
//! are regions of basic blocks. Structured control flow (`IfElse`, `For`) nests regions inside an
//! operation instead of lowering them to branches.

use std::{
    fmt::{self, Display, Formatter, Write},
    rc::Rc,
};

use indenter::{Indented, indented};
use qcc_data_structures::{
    display::{Bracketed, set_indentation, write_list},
    index_map::IndexMap,
};

use crate::ty::Ty;

macro_rules! id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(pub u32);

        impl $name {
            #[must_use]
            pub fn successor(self) -> Self {
                Self(self.0 + 1)
            }
        }

        impl From<usize> for $name {
            fn from(value: usize) -> Self {
                Self(u32::try_from(value).expect("id should fit in u32"))
            }
        }

        impl From<$name> for usize {
            fn from(value: $name) -> Self {
                value.0 as usize
            }
        }
    };
}

id! {
    /// Identifies a callable within a package.
    CallableId
}

id! {
    /// Identifies a block within its region. The entry block of every region is `BlockId(0)`.
    BlockId
}

id! {
    /// Identifies an SSA value. Unique across the whole package.
    ValueId
}

id! {
    /// Identifies an operation. Unique across the whole package.
    OpId
}

impl Display for CallableId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.0)
    }
}

impl Display for BlockId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "^{}", self.0)
    }
}

impl Display for ValueId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "%{}", self.0)
    }
}

impl Display for OpId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "op{}", self.0)
    }
}

#[derive(Clone, Debug, Default)]
pub struct Package {
    pub callables: IndexMap<CallableId, Callable>,
    /// The type of every value defined anywhere in the package.
    pub tys: IndexMap<ValueId, Ty>,
}

impl Package {
    #[must_use]
    pub fn get_callable(&self, id: CallableId) -> &Callable {
        self.callables.get(id).expect("callable should be present")
    }

    #[must_use]
    pub fn find_callable(&self, name: &str) -> Option<CallableId> {
        self.callables
            .iter()
            .find_map(|(id, callable)| (&*callable.name == name).then_some(id))
    }

    #[must_use]
    pub fn ty(&self, value: ValueId) -> &Ty {
        self.tys.get(value).unwrap_or(&Ty::Unknown)
    }
}

#[derive(Clone, Debug)]
pub struct Callable {
    pub name: Rc<str>,
    pub params: Vec<ValueId>,
    pub output: Ty,
    pub body: Region,
}

/// An ordered collection of blocks. Control enters at `BlockId(0)`.
#[derive(Clone, Debug, Default)]
pub struct Region {
    pub blocks: IndexMap<BlockId, Block>,
}

impl Region {
    pub const ENTRY: BlockId = BlockId(0);

    #[must_use]
    pub fn get_block(&self, id: BlockId) -> &Block {
        self.blocks.get(id).expect("block should be present")
    }

    #[must_use]
    pub fn entry(&self) -> &Block {
        self.get_block(Self::ENTRY)
    }
}

#[derive(Clone, Debug)]
pub struct Block {
    pub params: Vec<ValueId>,
    pub ops: Vec<Operation>,
    pub terminator: Terminator,
}

#[derive(Clone, Debug)]
pub struct Operation {
    pub id: OpId,
    pub kind: OpKind,
    pub results: Vec<ValueId>,
}

/// The closed set of operation kinds.
#[derive(Clone, Debug)]
pub enum OpKind {
    Literal(Literal),
    /// A heterogeneous tuple.
    NewTuple(Vec<ValueId>),
    /// A homogeneous list.
    NewList(Vec<ValueId>),
    Range {
        start: ValueId,
        stop: ValueId,
        step: ValueId,
    },
    Slice {
        start: Option<ValueId>,
        stop: Option<ValueId>,
        step: Option<ValueId>,
    },
    Binary(BinOp, ValueId, ValueId),
    Not(ValueId),
    GetItem {
        obj: ValueId,
        index: ValueId,
    },
    Concat(ValueId, ValueId),
    Alias(ValueId),
    /// Allocates as many fresh qubits as the count operand says.
    NewQubits(ValueId),
    /// Applies a named gate. Gates on wires produce the output wires as results, gates on qubits
    /// produce nothing.
    Gate {
        name: Rc<str>,
        targets: Vec<ValueId>,
        params: Vec<ValueId>,
    },
    Measure(ValueId),
    Predicate(Predicate, ValueId),
    Unwrap(ValueId),
    Wrap(ValueId),
    Detector(ValueId),
    Observable(ValueId),
    FunctionRef(CallableId),
    Call {
        callee: CallableId,
        args: Vec<ValueId>,
    },
    Invoke {
        callee: ValueId,
        args: Vec<ValueId>,
    },
    IfElse {
        cond: ValueId,
        then_region: Region,
        else_region: Region,
    },
    /// Iterates `body` over `iterable`. The body's entry block receives the item followed by the
    /// loop-carried values and yields the next loop-carried values.
    For {
        iterable: ValueId,
        inits: Vec<ValueId>,
        body: Region,
    },
    /// An instruction outside the catalogue known to the analyses.
    Opaque {
        name: Rc<str>,
        args: Vec<ValueId>,
    },
}

impl OpKind {
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            OpKind::Literal(_) => "literal",
            OpKind::NewTuple(_) => "tuple",
            OpKind::NewList(_) => "list",
            OpKind::Range { .. } => "range",
            OpKind::Slice { .. } => "slice",
            OpKind::Binary(op, ..) => op.name(),
            OpKind::Not(_) => "not",
            OpKind::GetItem { .. } => "getitem",
            OpKind::Concat(..) => "concat",
            OpKind::Alias(_) => "alias",
            OpKind::NewQubits(_) => "new_qubits",
            OpKind::Gate { name, .. } | OpKind::Opaque { name, .. } => name,
            OpKind::Measure(_) => "measure",
            OpKind::Predicate(predicate, _) => predicate.name(),
            OpKind::Unwrap(_) => "unwrap",
            OpKind::Wrap(_) => "wrap",
            OpKind::Detector(_) => "detector",
            OpKind::Observable(_) => "observable",
            OpKind::FunctionRef(_) => "function",
            OpKind::Call { .. } => "call",
            OpKind::Invoke { .. } => "invoke",
            OpKind::IfElse { .. } => "if",
            OpKind::For { .. } => "for",
        }
    }

    /// The regions nested inside this operation.
    #[must_use]
    pub fn regions(&self) -> Vec<&Region> {
        match self {
            OpKind::IfElse {
                then_region,
                else_region,
                ..
            } => vec![then_region, else_region],
            OpKind::For { body, .. } => vec![body],
            _ => Vec::new(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Literal {
    Int(i64),
    Bool(bool),
    Float(f64),
    None,
}

impl Display for Literal {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Int(value) => write!(f, "Int({value})"),
            Literal::Bool(value) => write!(f, "Bool({value})"),
            Literal::Float(value) => write!(f, "Float({value})"),
            Literal::None => write!(f, "None"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Eq,
    Ne,
    Lt,
    Le,
    And,
    Or,
    Xor,
}

impl BinOp {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            BinOp::Add => "add",
            BinOp::Sub => "sub",
            BinOp::Mul => "mul",
            BinOp::Eq => "eq",
            BinOp::Ne => "ne",
            BinOp::Lt => "lt",
            BinOp::Le => "le",
            BinOp::And => "and",
            BinOp::Or => "or",
            BinOp::Xor => "xor",
        }
    }
}

/// A boolean view of a measurement outcome.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Predicate {
    IsZero,
    IsOne,
    IsLost,
}

impl Predicate {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Predicate::IsZero => "is_zero",
            Predicate::IsOne => "is_one",
            Predicate::IsLost => "is_lost",
        }
    }
}

impl Display for Predicate {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[derive(Clone, Debug)]
pub enum Terminator {
    Jump(BlockId, Vec<ValueId>),
    Branch {
        cond: ValueId,
        then_block: BlockId,
        then_args: Vec<ValueId>,
        else_block: BlockId,
        else_args: Vec<ValueId>,
    },
    Return(ValueId),
    /// Leaves the enclosing structured region with the given values.
    Yield(Vec<ValueId>),
}

impl Display for Package {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let mut indent = set_indentation(indented(f), 0);
        write!(indent, "Package:")?;
        indent = set_indentation(indent, 1);
        for (id, callable) in self.callables.iter() {
            write!(indent, "\nCallable {id}: {callable}")?;
        }
        Ok(())
    }
}

impl Display for Callable {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let mut indent = set_indentation(indented(f), 0);
        write!(indent, "{}(", self.name)?;
        write_list(&mut indent, &self.params)?;
        write!(indent, ") -> {}", self.output)?;
        indent = set_indentation(indent, 1);
        write!(indent, "\n{}", self.body)?;
        Ok(())
    }
}

impl Display for Region {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let mut indent = set_indentation(indented(f), 0);
        for (index, (id, block)) in self.blocks.iter().enumerate() {
            if index > 0 {
                writeln!(indent)?;
            }
            write!(indent, "Block {id}")?;
            if !block.params.is_empty() {
                write!(indent, "(")?;
                write_list(&mut indent, &block.params)?;
                write!(indent, ")")?;
            }
            write!(indent, ":")?;
            indent = set_indentation(indent, 1);
            for op in &block.ops {
                write!(indent, "\n{op}")?;
            }
            write!(indent, "\n{}", block.terminator)?;
            indent = set_indentation(indent, 0);
        }
        Ok(())
    }
}

impl Display for Operation {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let mut indent = set_indentation(indented(f), 0);
        if !self.results.is_empty() {
            write_list(&mut indent, &self.results)?;
            write!(indent, " = ")?;
        }
        write_op_kind(&mut indent, &self.kind)
    }
}

fn write_op_kind(f: &mut Indented<'_, Formatter<'_>>, kind: &OpKind) -> fmt::Result {
    match kind {
        OpKind::Literal(literal) => write!(f, "Literal {literal}"),
        OpKind::NewTuple(elems) => write!(f, "Tuple {}", Bracketed(elems)),
        OpKind::NewList(elems) => write!(f, "List {}", Bracketed(elems)),
        OpKind::Range { start, stop, step } => write!(f, "Range {start}, {stop}, {step}"),
        OpKind::Slice { start, stop, step } => {
            let show = |value: &Option<ValueId>| value.map_or("_".to_string(), |v| v.to_string());
            write!(f, "Slice {}, {}, {}", show(start), show(stop), show(step))
        }
        OpKind::Binary(op, lhs, rhs) => write!(f, "{} {lhs}, {rhs}", op.name()),
        OpKind::Not(value) => write!(f, "Not {value}"),
        OpKind::GetItem { obj, index } => write!(f, "GetItem {obj}[{index}]"),
        OpKind::Concat(lhs, rhs) => write!(f, "Concat {lhs}, {rhs}"),
        OpKind::Alias(value) => write!(f, "Alias {value}"),
        OpKind::NewQubits(count) => write!(f, "NewQubits {count}"),
        OpKind::Gate {
            name,
            targets,
            params,
        } => {
            write!(f, "Gate {name} {}", Bracketed(targets))?;
            if !params.is_empty() {
                write!(f, " params {}", Bracketed(params))?;
            }
            Ok(())
        }
        OpKind::Measure(value) => write!(f, "Measure {value}"),
        OpKind::Predicate(predicate, value) => write!(f, "Predicate {predicate} {value}"),
        OpKind::Unwrap(value) => write!(f, "Unwrap {value}"),
        OpKind::Wrap(value) => write!(f, "Wrap {value}"),
        OpKind::Detector(value) => write!(f, "Detector {value}"),
        OpKind::Observable(value) => write!(f, "Observable {value}"),
        OpKind::FunctionRef(callee) => write!(f, "FunctionRef {callee}"),
        OpKind::Call { callee, args } => write!(f, "Call {callee}{}", Parenthesized(args)),
        OpKind::Invoke { callee, args } => write!(f, "Invoke {callee}{}", Parenthesized(args)),
        OpKind::Opaque { name, args } => write!(f, "Opaque {name}{}", Parenthesized(args)),
        OpKind::IfElse {
            cond,
            then_region,
            else_region,
        } => {
            write!(f, "If {cond}:")?;
            write_nested_region(f, then_region)?;
            write!(f, "\nElse:")?;
            write_nested_region(f, else_region)
        }
        OpKind::For {
            iterable,
            inits,
            body,
        } => {
            write!(f, "For {iterable} inits {}:", Bracketed(inits))?;
            write_nested_region(f, body)
        }
    }
}

fn write_nested_region(f: &mut Indented<'_, Formatter<'_>>, region: &Region) -> fmt::Result {
    write!(indented(f).with_str("    "), "\n{region}")
}

struct Parenthesized<'a>(&'a [ValueId]);

impl Display for Parenthesized<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        write_list(f, self.0)?;
        write!(f, ")")
    }
}

impl Display for Terminator {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Terminator::Jump(target, args) => write!(f, "Jump {target}{}", Parenthesized(args)),
            Terminator::Branch {
                cond,
                then_block,
                then_args,
                else_block,
                else_args,
            } => write!(
                f,
                "Branch {cond}, {then_block}{}, {else_block}{}",
                Parenthesized(then_args),
                Parenthesized(else_args)
            ),
            Terminator::Return(value) => write!(f, "Return {value}"),
            Terminator::Yield(values) => write!(f, "Yield {}", Bracketed(values)),
        }
    }
}
