// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Programmatic construction of packages. Ids are allocated package-wide and the type of every
//! value is inferred as it is built, with list lengths taken from integer literals.


use std::rc::Rc;

use qcc_data_structures::index_map::IndexMap;
use rustc_hash::FxHashMap;

use crate::{
    ir::{
        BinOp, Block, BlockId, Callable, CallableId, Literal, OpId, OpKind, Operation, Package,
        Predicate, Region, Terminator, ValueId,
    },
    ty::Ty,
};

#[derive(Default)]
struct ValueTable {
    next_value: ValueId,
    next_op: OpId,
    tys: IndexMap<ValueId, Ty>,
    ints: FxHashMap<ValueId, i64>,
    outputs: IndexMap<CallableId, Ty>,
}

impl ValueTable {
    fn fresh(&mut self, ty: Ty) -> ValueId {
        let id = self.next_value;
        self.next_value = id.successor();
        self.tys.insert(id, ty);
        id
    }

    fn fresh_op(&mut self) -> OpId {
        let id = self.next_op;
        self.next_op = id.successor();
        id
    }

    fn ty(&self, value: ValueId) -> Ty {
        self.tys.get(value).cloned().unwrap_or(Ty::Unknown)
    }
}

#[derive(Default)]
pub struct PackageBuilder {
    values: ValueTable,
    names: IndexMap<CallableId, Rc<str>>,
    callables: IndexMap<CallableId, Callable>,
    next_callable: CallableId,
}

impl PackageBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserves an id for a callable so that it can be referenced before its body is defined.
    pub fn declare(&mut self, name: &str, output: Ty) -> CallableId {
        let id = self.next_callable;
        self.next_callable = id.successor();
        self.names.insert(id, name.into());
        self.values.outputs.insert(id, output);
        id
    }

    /// Defines the body of a declared callable. The closure receives the parameter values.
    pub fn define(
        &mut self,
        id: CallableId,
        param_tys: &[Ty],
        body: impl FnOnce(&mut Builder<'_>, &[ValueId]),
    ) {
        let name = self
            .names
            .get(id)
            .cloned()
            .expect("callable should be declared before it is defined");
        let output = self.values.outputs.get(id).cloned().unwrap_or(Ty::Unknown);
        let mut builder = Builder::new(&mut self.values);
        let params = builder.add_params(Region::ENTRY, param_tys);
        body(&mut builder, &params);
        let body = builder.finish();
        self.callables.insert(
            id,
            Callable {
                name,
                params,
                output,
                body,
            },
        );
    }

    pub fn callable(
        &mut self,
        name: &str,
        param_tys: &[Ty],
        output: Ty,
        body: impl FnOnce(&mut Builder<'_>, &[ValueId]),
    ) -> CallableId {
        let id = self.declare(name, output);
        self.define(id, param_tys, body);
        id
    }

    #[must_use]
    pub fn finish(self) -> Package {
        Package {
            callables: self.callables,
            tys: self.values.tys,
        }
    }
}

struct PendingBlock {
    params: Vec<ValueId>,
    ops: Vec<Operation>,
    terminator: Option<Terminator>,
}

/// Builds one region. Operations are appended to the current block.
pub struct Builder<'a> {
    values: &'a mut ValueTable,
    blocks: IndexMap<BlockId, PendingBlock>,
    next_block: BlockId,
    current: BlockId,
    yielded: Option<Vec<ValueId>>,
}

impl<'a> Builder<'a> {
    fn new(values: &'a mut ValueTable) -> Self {
        let mut builder = Self {
            values,
            blocks: IndexMap::new(),
            next_block: Region::ENTRY,
            current: Region::ENTRY,
            yielded: None,
        };
        builder.new_block(&[]);
        builder
    }

    fn finish(self) -> Region {
        let blocks = self
            .blocks
            .into_iter()
            .map(|(id, pending)| {
                let terminator = pending
                    .terminator
                    .unwrap_or_else(|| panic!("block {id} should have a terminator"));
                (
                    id,
                    Block {
                        params: pending.params,
                        ops: pending.ops,
                        terminator,
                    },
                )
            })
            .collect();
        Region { blocks }
    }

    fn nested(&mut self) -> Builder<'_> {
        Builder::new(self.values)
    }

    fn add_params(&mut self, block: BlockId, tys: &[Ty]) -> Vec<ValueId> {
        let params = tys
            .iter()
            .map(|ty| self.values.fresh(ty.clone()))
            .collect::<Vec<_>>();
        self.blocks
            .get_mut(block)
            .expect("block should be present")
            .params
            .extend(&params);
        params
    }

    /// The type inferred for a value built so far.
    #[must_use]
    pub fn ty(&self, value: ValueId) -> Ty {
        self.values.ty(value)
    }

    /// Creates a new block with parameters of the given types. The current block is unchanged.
    pub fn new_block(&mut self, param_tys: &[Ty]) -> (BlockId, Vec<ValueId>) {
        let id = self.next_block;
        self.next_block = id.successor();
        self.blocks.insert(
            id,
            PendingBlock {
                params: Vec::new(),
                ops: Vec::new(),
                terminator: None,
            },
        );
        let params = self.add_params(id, param_tys);
        (id, params)
    }

    pub fn switch_to(&mut self, block: BlockId) {
        assert!(self.blocks.contains_key(block), "block should be present");
        self.current = block;
    }

    fn current_block(&mut self) -> &mut PendingBlock {
        self.blocks
            .get_mut(self.current)
            .expect("current block should be present")
    }

    fn push(&mut self, kind: OpKind, result_tys: Vec<Ty>) -> Vec<ValueId> {
        let id = self.values.fresh_op();
        let results = result_tys
            .into_iter()
            .map(|ty| self.values.fresh(ty))
            .collect::<Vec<_>>();
        let block = self.current_block();
        assert!(
            block.terminator.is_none(),
            "operations should not follow a terminator"
        );
        block.ops.push(Operation {
            id,
            kind,
            results: results.clone(),
        });
        results
    }

    fn push_one(&mut self, kind: OpKind, ty: Ty) -> ValueId {
        self.push(kind, vec![ty])[0]
    }

    fn terminate(&mut self, terminator: Terminator) {
        let block = self.current_block();
        assert!(
            block.terminator.is_none(),
            "block should only be terminated once"
        );
        block.terminator = Some(terminator);
    }

    pub fn int(&mut self, value: i64) -> ValueId {
        let id = self.push_one(OpKind::Literal(Literal::Int(value)), Ty::Int);
        self.values.ints.insert(id, value);
        id
    }

    pub fn bool(&mut self, value: bool) -> ValueId {
        self.push_one(OpKind::Literal(Literal::Bool(value)), Ty::Bool)
    }

    pub fn float(&mut self, value: f64) -> ValueId {
        self.push_one(OpKind::Literal(Literal::Float(value)), Ty::Float)
    }

    pub fn none(&mut self) -> ValueId {
        self.push_one(OpKind::Literal(Literal::None), Ty::Unknown)
    }

    pub fn tuple(&mut self, elems: &[ValueId]) -> ValueId {
        let ty = Ty::Tuple(elems.iter().map(|elem| self.ty(*elem)).collect());
        self.push_one(OpKind::NewTuple(elems.to_vec()), ty)
    }

    pub fn list(&mut self, elems: &[ValueId]) -> ValueId {
        let elem = elems
            .iter()
            .fold(Ty::Unknown, |acc, elem| acc.unify(&self.ty(*elem)));
        let ty = Ty::array(elem, Some(elems.len()));
        self.push_one(OpKind::NewList(elems.to_vec()), ty)
    }

    pub fn range(&mut self, start: ValueId, stop: ValueId, step: ValueId) -> ValueId {
        self.push_one(OpKind::Range { start, stop, step }, Ty::Range)
    }

    pub fn slice(
        &mut self,
        start: Option<ValueId>,
        stop: Option<ValueId>,
        step: Option<ValueId>,
    ) -> ValueId {
        self.push_one(OpKind::Slice { start, stop, step }, Ty::Slice)
    }

    pub fn binary(&mut self, op: BinOp, lhs: ValueId, rhs: ValueId) -> ValueId {
        let ty = match op {
            BinOp::Add | BinOp::Sub | BinOp::Mul => Ty::Int,
            BinOp::Eq | BinOp::Ne | BinOp::Lt | BinOp::Le | BinOp::And | BinOp::Or | BinOp::Xor => {
                Ty::Bool
            }
        };
        self.push_one(OpKind::Binary(op, lhs, rhs), ty)
    }

    pub fn not(&mut self, value: ValueId) -> ValueId {
        self.push_one(OpKind::Not(value), Ty::Bool)
    }

    pub fn get_item(&mut self, obj: ValueId, index: ValueId) -> ValueId {
        let obj_ty = self.ty(obj);
        let ty = match (&obj_ty, self.ty(index)) {
            (_, Ty::Slice) => obj_ty.erase_len(),
            (Ty::Tuple(elems), _) => self
                .values
                .ints
                .get(&index)
                .and_then(|i| crate::const_fold::normalize_index(*i, elems.len()))
                .map_or_else(|| obj_ty.item(), |i| elems[i].clone()),
            _ => obj_ty.item(),
        };
        self.push_one(OpKind::GetItem { obj, index }, ty)
    }

    pub fn concat(&mut self, lhs: ValueId, rhs: ValueId) -> ValueId {
        let ty = self.ty(lhs).concat(&self.ty(rhs));
        self.push_one(OpKind::Concat(lhs, rhs), ty)
    }

    pub fn alias(&mut self, value: ValueId) -> ValueId {
        let ty = self.ty(value);
        self.push_one(OpKind::Alias(value), ty)
    }

    pub fn new_qubits(&mut self, count: ValueId) -> ValueId {
        let len = self
            .values
            .ints
            .get(&count)
            .and_then(|count| usize::try_from(*count).ok());
        self.push_one(OpKind::NewQubits(count), Ty::array(Ty::Qubit, len))
    }

    /// Applies a gate. Every target carrying wires produces an output of the same type.
    pub fn gate(&mut self, name: &str, targets: &[ValueId], params: &[ValueId]) -> Vec<ValueId> {
        let result_tys = targets
            .iter()
            .map(|target| self.ty(*target))
            .filter(Ty::contains_wire)
            .collect();
        self.push(
            OpKind::Gate {
                name: name.into(),
                targets: targets.to_vec(),
                params: params.to_vec(),
            },
            result_tys,
        )
    }

    pub fn measure(&mut self, value: ValueId) -> ValueId {
        let ty = self.ty(value).measured();
        self.push_one(OpKind::Measure(value), ty)
    }

    pub fn predicate(&mut self, predicate: Predicate, value: ValueId) -> ValueId {
        let ty = self.ty(value).with_bits_as_bools();
        self.push_one(OpKind::Predicate(predicate, value), ty)
    }

    pub fn unwrap(&mut self, qubit: ValueId) -> ValueId {
        self.push_one(OpKind::Unwrap(qubit), Ty::Wire)
    }

    pub fn wrap(&mut self, wire: ValueId) -> ValueId {
        self.push_one(OpKind::Wrap(wire), Ty::Qubit)
    }

    pub fn detector(&mut self, bits: ValueId) -> ValueId {
        self.push_one(OpKind::Detector(bits), Ty::Detector)
    }

    pub fn observable(&mut self, bits: ValueId) -> ValueId {
        self.push_one(OpKind::Observable(bits), Ty::Observable)
    }

    pub fn function_ref(&mut self, callee: CallableId) -> ValueId {
        self.push_one(OpKind::FunctionRef(callee), Ty::Function)
    }

    pub fn call(&mut self, callee: CallableId, args: &[ValueId]) -> ValueId {
        let ty = self
            .values
            .outputs
            .get(callee)
            .cloned()
            .unwrap_or(Ty::Unknown);
        self.push_one(
            OpKind::Call {
                callee,
                args: args.to_vec(),
            },
            ty,
        )
    }

    pub fn invoke(&mut self, callee: ValueId, args: &[ValueId], output: Ty) -> ValueId {
        self.push_one(
            OpKind::Invoke {
                callee,
                args: args.to_vec(),
            },
            output,
        )
    }

    pub fn opaque(&mut self, name: &str, args: &[ValueId], result_tys: &[Ty]) -> Vec<ValueId> {
        self.push(
            OpKind::Opaque {
                name: name.into(),
                args: args.to_vec(),
            },
            result_tys.to_vec(),
        )
    }

    /// Builds a structured if/else. Its results are the values yielded by the regions.
    pub fn if_else(
        &mut self,
        cond: ValueId,
        then_body: impl FnOnce(&mut Builder<'_>),
        else_body: impl FnOnce(&mut Builder<'_>),
    ) -> Vec<ValueId> {
        let (then_region, then_tys) = self.build_region(then_body);
        let (else_region, else_tys) = self.build_region(else_body);
        let result_tys = match (then_tys, else_tys) {
            (Some(then_tys), Some(else_tys)) => then_tys
                .iter()
                .zip(&else_tys)
                .map(|(then_ty, else_ty)| then_ty.unify(else_ty))
                .collect(),
            (Some(tys), None) | (None, Some(tys)) => tys,
            (None, None) => Vec::new(),
        };
        self.push(
            OpKind::IfElse {
                cond,
                then_region,
                else_region,
            },
            result_tys,
        )
    }

    /// Builds a structured loop. The closure receives the item and the loop-carried values and
    /// must yield the next loop-carried values. The loop's results are the final carried values.
    pub fn for_loop(
        &mut self,
        iterable: ValueId,
        inits: &[ValueId],
        body: impl FnOnce(&mut Builder<'_>, ValueId, &[ValueId]),
    ) -> Vec<ValueId> {
        let item_ty = self.ty(iterable).item();
        let carried_tys = inits
            .iter()
            .map(|init| self.ty(*init).erase_len())
            .collect::<Vec<_>>();
        let mut entry_tys = vec![item_ty];
        entry_tys.extend(carried_tys.iter().cloned());

        let mut nested = self.nested();
        let params = nested.add_params(Region::ENTRY, &entry_tys);
        body(&mut nested, params[0], &params[1..]);
        let yielded_tys = nested
            .yielded
            .as_ref()
            .map(|values| values.iter().map(|v| nested.ty(*v)).collect::<Vec<_>>());
        let body = nested.finish();

        let result_tys = match yielded_tys {
            Some(yielded_tys) => carried_tys
                .iter()
                .zip(&yielded_tys)
                .map(|(carried, yielded)| carried.unify(&yielded.erase_len()))
                .collect(),
            None => carried_tys,
        };
        self.push(
            OpKind::For {
                iterable,
                inits: inits.to_vec(),
                body,
            },
            result_tys,
        )
    }

    fn build_region(&mut self, body: impl FnOnce(&mut Builder<'_>)) -> (Region, Option<Vec<Ty>>) {
        let mut nested = self.nested();
        body(&mut nested);
        let tys = nested
            .yielded
            .as_ref()
            .map(|values| values.iter().map(|v| nested.ty(*v)).collect());
        (nested.finish(), tys)
    }

    pub fn jump(&mut self, target: BlockId, args: &[ValueId]) {
        self.terminate(Terminator::Jump(target, args.to_vec()));
    }

    pub fn branch(
        &mut self,
        cond: ValueId,
        then_block: BlockId,
        then_args: &[ValueId],
        else_block: BlockId,
        else_args: &[ValueId],
    ) {
        self.terminate(Terminator::Branch {
            cond,
            then_block,
            then_args: then_args.to_vec(),
            else_block,
            else_args: else_args.to_vec(),
        });
    }

    pub fn ret(&mut self, value: ValueId) {
        self.terminate(Terminator::Return(value));
    }

    /// Leaves the structured region being built with the given values.
    pub fn yield_values(&mut self, values: &[ValueId]) {
        if self.yielded.is_none() {
            self.yielded = Some(values.to_vec());
        }
        self.terminate(Terminator::Yield(values.to_vec()));
    }
}
