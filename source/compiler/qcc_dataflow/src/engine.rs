// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The forward dataflow engine. The engine walks structured regions with a worklist, interprets
//! control flow (`Alias`, calls, `IfElse`, `For`) itself and hands every other operation to a
//! [`Transfer`] implementation that owns the abstract domain.


use std::collections::VecDeque;

use log::{debug, trace, warn};
use qcc_ir::{
    const_fold::{Const, ConstLookup},
    ir::{BlockId, CallableId, OpId, OpKind, Operation, Package, Region, Terminator, ValueId},
    ty::Ty,
};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::{
    AnalysisResult,
    config::AnalysisConfig,
    error::{Error, Warning},
    frame::{Assumption, Fact, Frame},
    lattice::{Lattice, join_all},
};

/// The abstract semantics of a client analysis.
pub trait Transfer {
    type Value: Lattice;

    /// Evaluates an operation that is not control flow, producing one value per result. Returns
    /// `None` if the operation is not recognized, in which case [`Transfer::fallback`] is used.
    fn eval(
        &mut self,
        ctx: &EvalContext<'_, Self::Value>,
        op: &Operation,
    ) -> Option<Vec<Self::Value>>;

    /// The value of a result the analysis knows nothing about.
    fn fallback(&self, ty: &Ty) -> Self::Value {
        if ty.contains_qubit() {
            Self::Value::top()
        } else {
            Self::Value::bottom()
        }
    }

    /// The value of a statically known item produced by iterating over a constant.
    fn from_constant(&self, _constant: &Const, ty: &Ty) -> Self::Value {
        self.fallback(ty)
    }

    /// The value bound to a parameter of the analyzed entry callable when none is supplied.
    fn entry_value(&self, ty: &Ty) -> Self::Value {
        self.fallback(ty)
    }

    /// Decides a branch condition from its lattice value alone.
    fn known_condition(&self, _value: &Self::Value) -> Option<bool> {
        None
    }

    /// The value of a condition along the path where it is assumed to be `assumed`.
    fn refine_condition(&self, value: &Self::Value, _assumed: bool) -> Self::Value {
        value.clone()
    }

    /// The items produced by iterating over a value, when they are known from the lattice.
    fn iteration_items(
        &self,
        _ctx: &EvalContext<'_, Self::Value>,
        _iterable: ValueId,
    ) -> Option<Vec<Self::Value>> {
        None
    }

    /// The callable a function value refers to.
    fn resolve_callee(&self, _callee: &Self::Value) -> Option<CallableId> {
        None
    }

    /// The result of a call through a function value that could not be resolved.
    fn eval_dynamic_call(
        &mut self,
        _ctx: &EvalContext<'_, Self::Value>,
        _op: &Operation,
    ) -> Self::Value {
        Self::Value::top()
    }

    /// Computes the final loop-carried values of a loop that could not be unrolled. Returns
    /// `None` if the loop never completes normally.
    fn unresolved_loop(
        &mut self,
        runner: &mut LoopRunner<'_, '_, '_, Self::Value>,
    ) -> Result<Option<Vec<Self::Value>>, Error>
    where
        Self: Sized,
    {
        runner.approximate(self)
    }
}

/// Read access to the analysis state while an operation is evaluated.
pub struct EvalContext<'c, L> {
    package: &'c Package,
    frame: &'c Frame<'c, L>,
    constants: &'c dyn ConstLookup,
}

impl<'c, L: Lattice> EvalContext<'c, L> {
    #[must_use]
    pub fn new(
        package: &'c Package,
        frame: &'c Frame<'c, L>,
        constants: &'c dyn ConstLookup,
    ) -> Self {
        Self {
            package,
            frame,
            constants,
        }
    }

    #[must_use]
    pub fn package(&self) -> &'c Package {
        self.package
    }

    #[must_use]
    pub fn ty(&self, value: ValueId) -> &'c Ty {
        self.package.ty(value)
    }

    /// The lattice value of a program value. Values that were never reached are bottom.
    #[must_use]
    pub fn value(&self, value: ValueId) -> L {
        self.frame.value(value).cloned().unwrap_or_else(L::bottom)
    }

    #[must_use]
    pub fn constant(&self, value: ValueId) -> Option<&Const> {
        self.frame
            .constant(value)
            .or_else(|| self.constants.constant(value))
    }

    #[must_use]
    pub fn int(&self, value: ValueId) -> Option<i64> {
        self.constant(value).and_then(Const::as_int)
    }

    fn fact(&self, value: ValueId) -> Fact<L> {
        Fact::with_constant(self.value(value), self.constant(value).cloned())
    }
}

/// Drives a client analysis over a package.
pub struct Engine<'a> {
    package: &'a Package,
    constants: &'a dyn ConstLookup,
    config: AnalysisConfig,
    depth: usize,
    warnings: Vec<Warning>,
    warned: FxHashSet<OpId>,
}

impl<'a> Engine<'a> {
    #[must_use]
    pub fn new(
        package: &'a Package,
        constants: &'a dyn ConstLookup,
        config: AnalysisConfig,
    ) -> Self {
        Self {
            package,
            constants,
            config,
            depth: 0,
            warnings: Vec::new(),
            warned: FxHashSet::default(),
        }
    }

    /// Analyzes a callable with the given argument values. Parameters without an argument are
    /// bound to [`Transfer::entry_value`].
    pub fn analyze<T: Transfer>(
        mut self,
        transfer: &mut T,
        callable: CallableId,
        args: &[T::Value],
    ) -> Result<AnalysisResult<T::Value>, Error> {
        let package = self.package;
        let callable = package
            .callables
            .get(callable)
            .ok_or(Error::MissingCallable(callable))?;
        debug!("analyzing `{}`", callable.name);
        let args = callable
            .params
            .iter()
            .enumerate()
            .map(|(index, param)| {
                args.get(index).cloned().map_or_else(
                    || Fact::new(transfer.entry_value(package.ty(*param))),
                    Fact::new,
                )
            })
            .collect();

        let mut frame = Frame::root();
        let exit =
            self.run_region(transfer, &mut frame, &callable.body, BlockEntry::new(args))?;
        Ok(AnalysisResult {
            values: frame.into_values().into_iter().collect(),
            ret: exit.returned.unwrap_or_else(T::Value::bottom),
            warnings: self.warnings,
        })
    }

    fn run_region<T: Transfer>(
        &mut self,
        transfer: &mut T,
        frame: &mut Frame<'_, T::Value>,
        region: &Region,
        entry: BlockEntry<T::Value>,
    ) -> Result<RegionExit<T::Value>, Error> {
        let mut entries = FxHashMap::default();
        let mut visits = FxHashMap::<BlockId, usize>::default();
        let mut worklist = VecDeque::new();
        let mut queued = FxHashSet::default();
        entries.insert(Region::ENTRY, entry);
        worklist.push_back(Region::ENTRY);
        queued.insert(Region::ENTRY);

        let mut exit = RegionExit::default();
        while let Some(block_id) = worklist.pop_front() {
            queued.remove(&block_id);
            *visits.entry(block_id).or_default() += 1;
            let block = region.get_block(block_id);
            let BlockEntry {
                args,
                env,
                assumption,
            } = entries
                .get(&block_id)
                .cloned()
                .expect("queued block should have an entry");
            trace!("running block {block_id}");

            // Values of earlier blocks are restored to what they were along the incoming paths.
            let mut env_out = env.clone();
            for (id, fact) in env {
                frame.write(id, fact);
            }
            for (param, fact) in block.params.iter().zip(args) {
                env_out.insert(*param, fact.clone());
                frame.write(*param, fact);
            }
            frame.assume(assumption);

            let reach = self.run_ops(transfer, frame, &block.ops, &mut exit)?;
            let mut successors = Vec::new();
            if reach == Reach::Continue {
                let ctx = EvalContext::new(self.package, frame, self.constants);
                for result in block.ops.iter().flat_map(|op| &op.results) {
                    env_out.insert(*result, ctx.fact(*result));
                }
                let edge = |args: &[ValueId], assumption| BlockEntry {
                    args: args_of(&ctx, args),
                    env: env_out.clone(),
                    assumption,
                };
                match &block.terminator {
                    Terminator::Jump(target, args) => {
                        successors.push((*target, edge(args.as_slice(), None)));
                    }
                    Terminator::Branch {
                        cond,
                        then_block,
                        then_args,
                        else_block,
                        else_args,
                    } => {
                        let cond_fact = ctx.fact(*cond);
                        match self.known_condition(transfer, &cond_fact) {
                            Some(true) => {
                                successors.push((*then_block, edge(then_args.as_slice(), None)));
                            }
                            Some(false) => {
                                successors.push((*else_block, edge(else_args.as_slice(), None)));
                            }
                            None => {
                                for (target, args, assumed) in
                                    [(then_block, then_args, true), (else_block, else_args, false)]
                                {
                                    let assumption =
                                        assume(transfer, *cond, &cond_fact.value, assumed);
                                    successors
                                        .push((*target, edge(args.as_slice(), Some(assumption))));
                                }
                            }
                        }
                    }
                    Terminator::Return(value) => exit.add_return(&ctx.value(*value)),
                    Terminator::Yield(values) => exit.add_yield(args_of(&ctx, values)),
                }
            }
            frame.assume(None);

            for (target, entry) in successors {
                let changed = match entries.get_mut(&target) {
                    None => {
                        entries.insert(target, entry);
                        true
                    }
                    Some(existing) => {
                        let mut joined = existing.join(&entry);
                        if visits.get(&target).copied().unwrap_or_default()
                            >= self.config.widening_delay
                        {
                            trace!("widening entry of block {target}");
                            joined = existing.widen(&joined);
                        }
                        let changed = joined != *existing;
                        *existing = joined;
                        changed
                    }
                };
                if changed && queued.insert(target) {
                    worklist.push_back(target);
                }
            }
        }
        Ok(exit)
    }

    fn run_ops<T: Transfer>(
        &mut self,
        transfer: &mut T,
        frame: &mut Frame<'_, T::Value>,
        ops: &[Operation],
        exit: &mut RegionExit<T::Value>,
    ) -> Result<Reach, Error> {
        for op in ops {
            let reach = match &op.kind {
                OpKind::Alias(source) => {
                    let fact = EvalContext::new(self.package, frame, self.constants).fact(*source);
                    if let Some(result) = op.results.first() {
                        frame.write(*result, fact);
                    }
                    Reach::Continue
                }
                OpKind::Call { callee, args } => {
                    let ctx = EvalContext::new(self.package, frame, self.constants);
                    let args = args_of(&ctx, args);
                    let value = self.call(transfer, *callee, args)?;
                    write_results(frame, op, value);
                    Reach::Continue
                }
                OpKind::Invoke { callee, args } => {
                    let ctx = EvalContext::new(self.package, frame, self.constants);
                    let value = match transfer.resolve_callee(&ctx.value(*callee)) {
                        Some(target) => {
                            let args = args_of(&ctx, args);
                            self.call(transfer, target, args)?
                        }
                        None => transfer.eval_dynamic_call(&ctx, op),
                    };
                    write_results(frame, op, value);
                    Reach::Continue
                }
                OpKind::IfElse {
                    cond,
                    then_region,
                    else_region,
                } => self.if_else(transfer, frame, op, *cond, [then_region, else_region], exit)?,
                OpKind::For {
                    iterable,
                    inits,
                    body,
                } => self.for_loop(transfer, frame, op, *iterable, inits, body, exit)?,
                _ => {
                    self.eval(transfer, frame, op);
                    Reach::Continue
                }
            };
            if reach == Reach::Exited {
                return Ok(Reach::Exited);
            }
        }
        Ok(Reach::Continue)
    }

    fn eval<T: Transfer>(
        &mut self,
        transfer: &mut T,
        frame: &mut Frame<'_, T::Value>,
        op: &Operation,
    ) {
        let ctx = EvalContext::new(self.package, frame, self.constants);
        let values = transfer.eval(&ctx, op);
        let values = match values {
            Some(values) => values,
            None => {
                if self.warned.insert(op.id) {
                    warn!("operation `{}` ({}) is not recognized", op.kind.name(), op.id);
                    self.warnings.push(Warning::UnknownOperation(
                        op.id,
                        op.kind.name().to_string(),
                    ));
                }
                Vec::new()
            }
        };
        let mut values = values.into_iter();
        for result in &op.results {
            let value = values
                .next()
                .unwrap_or_else(|| transfer.fallback(self.package.ty(*result)));
            frame.write_value(*result, value);
        }
    }

    fn known_condition<T: Transfer>(&self, transfer: &T, cond: &Fact<T::Value>) -> Option<bool> {
        cond.constant
            .as_ref()
            .and_then(Const::as_bool)
            .or_else(|| transfer.known_condition(&cond.value))
    }

    fn call<T: Transfer>(
        &mut self,
        transfer: &mut T,
        callee: CallableId,
        args: Vec<Fact<T::Value>>,
    ) -> Result<T::Value, Error> {
        let package = self.package;
        let callable = package
            .callables
            .get(callee)
            .ok_or(Error::MissingCallable(callee))?;
        if self.depth >= self.config.max_depth {
            return Err(Error::RecursionLimit(
                callable.name.to_string(),
                self.config.max_depth,
            ));
        }
        debug!("inlining call to `{}` at depth {}", callable.name, self.depth + 1);
        self.depth += 1;
        let mut frame = Frame::root();
        let exit = self.run_region(transfer, &mut frame, &callable.body, BlockEntry::new(args));
        self.depth -= 1;
        Ok(exit?.returned.unwrap_or_else(T::Value::bottom))
    }

    fn if_else<T: Transfer>(
        &mut self,
        transfer: &mut T,
        frame: &mut Frame<'_, T::Value>,
        op: &Operation,
        cond: ValueId,
        [then_region, else_region]: [&Region; 2],
        exit: &mut RegionExit<T::Value>,
    ) -> Result<Reach, Error> {
        let cond_fact = EvalContext::new(self.package, frame, self.constants).fact(cond);
        let yielded = match self.known_condition(transfer, &cond_fact) {
            Some(known) => {
                trace!("condition of {} is known to be {known}", op.id);
                let region = if known { then_region } else { else_region };
                let branch = self.run_child(transfer, frame, region, BlockEntry::new(Vec::new()))?;
                exit.add_returned(branch.returned);
                branch.yielded
            }
            None => {
                let mut branches = Vec::new();
                for (region, assumed) in [(then_region, true), (else_region, false)] {
                    let mut entry = BlockEntry::new(Vec::new());
                    entry.assumption = Some(assume(transfer, cond, &cond_fact.value, assumed));
                    let branch = self.run_child(transfer, frame, region, entry)?;
                    exit.add_returned(branch.returned);
                    branches.push(branch.yielded);
                }
                let mut branches = branches.into_iter().flatten();
                branches.next().map(|first| match branches.next() {
                    Some(second) => join_facts(&first, &second),
                    None => first,
                })
            }
        };

        match yielded {
            Some(facts) => {
                write_facts(frame, &op.results, facts);
                Ok(Reach::Continue)
            }
            None => Ok(Reach::Exited),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn for_loop<T: Transfer>(
        &mut self,
        transfer: &mut T,
        frame: &mut Frame<'_, T::Value>,
        op: &Operation,
        iterable: ValueId,
        inits: &[ValueId],
        body: &Region,
        exit: &mut RegionExit<T::Value>,
    ) -> Result<Reach, Error> {
        let ctx = EvalContext::new(self.package, frame, self.constants);
        let item_ty = self.package.ty(iterable).item();
        let init_facts = args_of(&ctx, inits);
        let constant = ctx
            .constant(iterable)
            .and_then(|constant| Some((constant, constant.iteration_count()?)));
        let items = match constant {
            Some((constant, count)) if count <= self.config.max_unroll => {
                constant.items().map(|items| {
                    items
                        .into_iter()
                        .map(|item| {
                            let value = transfer.from_constant(&item, &item_ty);
                            Fact::with_constant(value, Some(item))
                        })
                        .collect::<Vec<_>>()
                })
            }
            // Items of a loop too long to unroll are never built.
            Some(_) => None,
            None => transfer
                .iteration_items(&ctx, iterable)
                .map(|items| items.into_iter().map(Fact::new).collect()),
        };
        let item = Fact::new(T::Value::top());

        let carried = match items {
            Some(items) if items.len() <= self.config.max_unroll => {
                debug!("unrolling loop {} over {} items", op.id, items.len());
                let mut carried = Some(init_facts);
                for item in items {
                    let Some(current) = carried.take() else {
                        break;
                    };
                    let mut args = vec![item];
                    args.extend(current);
                    let iteration = self.run_child(transfer, frame, body, BlockEntry::new(args))?;
                    exit.add_returned(iteration.returned);
                    carried = iteration.yielded;
                }
                carried
            }
            _ => {
                debug!("approximating loop {}", op.id);
                let mut runner = LoopRunner {
                    engine: &mut *self,
                    frame: &mut *frame,
                    op,
                    body,
                    iterable,
                    item,
                    inits: init_facts.into_iter().map(|fact| fact.value).collect(),
                    returned: None,
                };
                let carried = transfer.unresolved_loop(&mut runner)?;
                exit.add_returned(runner.returned);
                carried.map(|values| values.into_iter().map(Fact::new).collect())
            }
        };

        match carried {
            Some(facts) => {
                write_facts(frame, &op.results, facts);
                Ok(Reach::Continue)
            }
            None => Ok(Reach::Exited),
        }
    }

    /// Runs a nested region in a child frame and joins the values it computed into `frame`.
    fn run_child<T: Transfer>(
        &mut self,
        transfer: &mut T,
        frame: &mut Frame<'_, T::Value>,
        region: &Region,
        entry: BlockEntry<T::Value>,
    ) -> Result<RegionExit<T::Value>, Error> {
        let (exit, values) = self.speculate(transfer, frame, region, entry)?;
        frame.merge(values);
        Ok(exit)
    }

    /// Runs a nested region in a child frame without keeping the values it computed.
    fn speculate<T: Transfer>(
        &mut self,
        transfer: &mut T,
        frame: &Frame<'_, T::Value>,
        region: &Region,
        entry: BlockEntry<T::Value>,
    ) -> Result<(RegionExit<T::Value>, FxHashMap<ValueId, T::Value>), Error> {
        let mut child = frame.child();
        let exit = self.run_region(transfer, &mut child, region, entry)?;
        Ok((exit, child.into_values()))
    }
}

/// The outcome of running a loop body once.
#[derive(Clone, Debug, PartialEq)]
pub struct IterationExit<L> {
    /// The next loop-carried values, or `None` if the body never reached its `Yield`.
    pub yielded: Option<Vec<L>>,
    /// The join of every value returned from within the body.
    pub returned: Option<L>,
}

/// Gives a client control over a loop the engine could not unroll.
pub struct LoopRunner<'r, 'a, 'p, L> {
    engine: &'r mut Engine<'a>,
    frame: &'r mut Frame<'p, L>,
    op: &'r Operation,
    body: &'r Region,
    iterable: ValueId,
    item: Fact<L>,
    inits: Vec<L>,
    returned: Option<L>,
}

impl<'a, L: Lattice> LoopRunner<'_, 'a, '_, L> {
    #[must_use]
    pub fn op(&self) -> &Operation {
        self.op
    }

    #[must_use]
    pub fn body(&self) -> &Region {
        self.body
    }

    #[must_use]
    pub fn package(&self) -> &'a Package {
        self.engine.package
    }

    /// The initial loop-carried values.
    #[must_use]
    pub fn inits(&self) -> &[L] {
        &self.inits
    }

    #[must_use]
    pub fn config(&self) -> AnalysisConfig {
        self.engine.config
    }

    /// The number of iterations, when it is statically known.
    #[must_use]
    pub fn trip_count(&self) -> Option<usize> {
        let ctx = EvalContext::new(self.engine.package, &*self.frame, self.engine.constants);
        ctx.constant(self.iterable)
            .and_then(Const::iteration_count)
            .or_else(|| self.engine.package.ty(self.iterable).len())
    }

    /// Runs the body once with the given loop-carried values. The values computed inside the
    /// body are joined into the enclosing frame.
    pub fn iterate<T: Transfer<Value = L>>(
        &mut self,
        transfer: &mut T,
        carried: &[L],
    ) -> Result<IterationExit<L>, Error> {
        let entry = self.entry(carried);
        let exit = self.engine.run_child(transfer, self.frame, self.body, entry)?;
        self.returned = join_optional(self.returned.take(), exit.returned.clone());
        Ok(exit.into_iteration())
    }

    /// Runs the body once with the given loop-carried values and forgets everything it computed.
    pub fn speculate<T: Transfer<Value = L>>(
        &mut self,
        transfer: &mut T,
        carried: &[L],
    ) -> Result<IterationExit<L>, Error> {
        let entry = self.entry(carried);
        let (exit, _) = self.engine.speculate(transfer, self.frame, self.body, entry)?;
        Ok(exit.into_iteration())
    }

    /// Binds every value defined in the body that has not been reached to top.
    pub fn cover_body(&mut self) {
        let mut defined = Vec::new();
        collect_defined(self.body, &mut defined);
        for value in defined {
            if !self.frame.contains(value) {
                self.frame.write_value(value, L::top());
            }
        }
    }

    /// Approximates the loop by running the body twice, the second time with the join of the
    /// initial and first-iteration carried values. The result also covers the loop running zero
    /// times. This is not a fixpoint in general.
    pub fn approximate<T: Transfer<Value = L>>(
        &mut self,
        transfer: &mut T,
    ) -> Result<Option<Vec<L>>, Error> {
        let inits = self.inits.clone();
        let Some(first) = self.iterate(transfer, &inits)?.yielded else {
            return Ok(Some(inits));
        };
        let joined = join_all(&inits, &first);
        let Some(second) = self.iterate(transfer, &joined)?.yielded else {
            return Ok(Some(joined));
        };
        Ok(Some(join_all(&joined, &second)))
    }

    fn entry(&self, carried: &[L]) -> BlockEntry<L> {
        let mut args = vec![self.item.clone()];
        args.extend(carried.iter().cloned().map(Fact::new));
        BlockEntry::new(args)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Reach {
    Continue,
    /// Control left the enclosing callable through a return.
    Exited,
}

/// The state flowing into a block: its arguments and the values of the blocks before it.
#[derive(Clone, Debug, PartialEq)]
struct BlockEntry<L> {
    args: Vec<Fact<L>>,
    env: FxHashMap<ValueId, Fact<L>>,
    assumption: Option<Assumption<L>>,
}

impl<L: Lattice> BlockEntry<L> {
    fn new(args: Vec<Fact<L>>) -> Self {
        Self {
            args,
            env: FxHashMap::default(),
            assumption: None,
        }
    }

    fn join(&self, other: &Self) -> Self {
        let mut env = self.env.clone();
        for (id, fact) in &other.env {
            let joined = match env.get(id) {
                Some(existing) => existing.join(fact),
                None => fact.clone(),
            };
            env.insert(*id, joined);
        }
        Self {
            args: join_facts(&self.args, &other.args),
            env,
            assumption: if self.assumption == other.assumption {
                self.assumption.clone()
            } else {
                None
            },
        }
    }

    /// Sends every component that is still changing to top.
    fn widen(&self, next: &Self) -> Self {
        let widen = |previous: Option<&Fact<L>>, next: &Fact<L>| {
            if previous == Some(next) {
                next.clone()
            } else {
                next.widen()
            }
        };
        Self {
            args: next
                .args
                .iter()
                .enumerate()
                .map(|(index, fact)| widen(self.args.get(index), fact))
                .collect(),
            env: next
                .env
                .iter()
                .map(|(id, fact)| (*id, widen(self.env.get(id), fact)))
                .collect(),
            assumption: next.assumption.clone(),
        }
    }
}

struct RegionExit<L> {
    yielded: Option<Vec<Fact<L>>>,
    returned: Option<L>,
}

impl<L> Default for RegionExit<L> {
    fn default() -> Self {
        Self {
            yielded: None,
            returned: None,
        }
    }
}

impl<L: Lattice> RegionExit<L> {
    fn add_return(&mut self, value: &L) {
        self.returned = Some(match &self.returned {
            Some(returned) => returned.join(value),
            None => value.clone(),
        });
    }

    fn add_returned(&mut self, value: Option<L>) {
        if let Some(value) = value {
            self.add_return(&value);
        }
    }

    fn add_yield(&mut self, facts: Vec<Fact<L>>) {
        self.yielded = Some(match &self.yielded {
            Some(yielded) => join_facts(yielded, &facts),
            None => facts,
        });
    }

    fn into_iteration(self) -> IterationExit<L> {
        IterationExit {
            yielded: self
                .yielded
                .map(|facts| facts.into_iter().map(|fact| fact.value).collect()),
            returned: self.returned,
        }
    }
}

fn args_of<L: Lattice>(ctx: &EvalContext<'_, L>, args: &[ValueId]) -> Vec<Fact<L>> {
    args.iter().map(|arg| ctx.fact(*arg)).collect()
}

fn assume<T: Transfer>(
    transfer: &T,
    cond: ValueId,
    value: &T::Value,
    assumed: bool,
) -> Assumption<T::Value> {
    Assumption {
        value: cond,
        fact: Fact::with_constant(
            transfer.refine_condition(value, assumed),
            Some(Const::Bool(assumed)),
        ),
    }
}

fn join_facts<L: Lattice>(lhs: &[Fact<L>], rhs: &[Fact<L>]) -> Vec<Fact<L>> {
    debug_assert_eq!(lhs.len(), rhs.len(), "joined facts should have equal length");
    lhs.iter().zip(rhs).map(|(l, r)| l.join(r)).collect()
}

fn join_optional<L: Lattice>(lhs: Option<L>, rhs: Option<L>) -> Option<L> {
    match (lhs, rhs) {
        (Some(lhs), Some(rhs)) => Some(lhs.join(&rhs)),
        (lhs, rhs) => lhs.or(rhs),
    }
}

fn write_results<L: Lattice>(frame: &mut Frame<'_, L>, op: &Operation, value: L) {
    if let Some(result) = op.results.first() {
        frame.write_value(*result, value);
    }
}

fn write_facts<L: Lattice>(frame: &mut Frame<'_, L>, results: &[ValueId], facts: Vec<Fact<L>>) {
    for (result, fact) in results.iter().zip(facts) {
        frame.write(*result, fact);
    }
}

fn collect_defined(region: &Region, defined: &mut Vec<ValueId>) {
    for block in region.blocks.values() {
        defined.extend(&block.params);
        for op in &block.ops {
            defined.extend(&op.results);
            for nested in op.kind.regions() {
                collect_defined(nested, defined);
            }
        }
    }
}
