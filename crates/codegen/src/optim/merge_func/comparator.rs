//! Function equivalence under the pointer-type relaxation.
//!
//! Two functions are considered equivalent when they will lower to the same
//! machine code, treating pointer types in the same address space as
//! interchangeable. The comparison is conservative: any uncertainty is
//! reported as "not equivalent".

use std::cmp::Ordering;
use std::mem;

use rustc_hash::{FxHashMap, FxHashSet};
use tessera_ir::{
    dfg::BlockId,
    inst::{InstData, InstId},
    isa::DataLayout,
    module::{FuncRef, ModuleCtx, SymbolRef},
    types::{CompoundType, TypeStore},
    Function, Module, Type, Value, ValueId,
};

/// Compares two module functions for behavioral equivalence.
pub fn compare_funcs(module: &Module, lhs: FuncRef, rhs: FuncRef) -> bool {
    if lhs == rhs {
        return module.func_store.view(lhs, |func| {
            FunctionComparator::new(&module.ctx, (lhs, func), (rhs, func)).compare()
        });
    }

    module.func_store.view(lhs, |lf| {
        module.func_store.view(rhs, |rf| {
            FunctionComparator::new(&module.ctx, (lhs, lf), (rhs, rf)).compare()
        })
    })
}

/// Pairwise function comparison state. The value enumeration is built online:
/// the first sighting of a left/right value pair installs a mapping, and
/// every later sighting must agree with it.
pub struct FunctionComparator<'a> {
    ctx: &'a ModuleCtx,

    l_ref: FuncRef,
    lf: &'a Function,
    r_ref: FuncRef,
    rf: &'a Function,

    id_map: FxHashMap<ValueId, ValueId>,
    seen_rhs: FxHashSet<ValueId>,
    block_map: FxHashMap<BlockId, BlockId>,
    seen_rhs_blocks: FxHashSet<BlockId>,
}

impl<'a> FunctionComparator<'a> {
    pub fn new(
        ctx: &'a ModuleCtx,
        (l_ref, lf): (FuncRef, &'a Function),
        (r_ref, rf): (FuncRef, &'a Function),
    ) -> Self {
        Self {
            ctx,
            l_ref,
            lf,
            r_ref,
            rf,
            id_map: FxHashMap::default(),
            seen_rhs: FxHashSet::default(),
            block_map: FxHashMap::default(),
            seen_rhs_blocks: FxHashSet::default(),
        }
    }

    /// Test whether the two functions have equivalent behavior.
    pub fn compare(&mut self) -> bool {
        let (lf, rf) = (self.lf, self.rf);
        let (l_sig, r_sig) = (&lf.sig, &rf.sig);

        // Everything the fingerprint does not cover is rechecked here.
        if lf.attrs != rf.attrs {
            return false;
        }
        if lf.gc != rf.gc {
            return false;
        }
        if lf.section != rf.section {
            return false;
        }
        if l_sig.variadic() != r_sig.variadic() {
            return false;
        }
        if l_sig.cc() != r_sig.cc() {
            return false;
        }

        if l_sig.args().len() != r_sig.args().len() {
            return false;
        }
        if !self.is_equivalent_type(l_sig.ret_ty(), r_sig.ret_ty()) {
            return false;
        }
        for (&l, &r) in l_sig.args().iter().zip(r_sig.args().iter()) {
            if !self.is_equivalent_type(l, r) {
                return false;
            }
        }

        debug_assert_eq!(lf.arg_values.len(), rf.arg_values.len());

        // Visit the arguments so they are enumerated in positional order.
        // Argument pairing can never collide with an existing enumeration.
        for (&l, &r) in lf.arg_values.iter().zip(rf.arg_values.iter()) {
            assert!(self.enumerate(l, r), "argument enumeration repeats");
        }

        let Some(l_entry) = lf.layout.entry_block() else {
            return rf.layout.entry_block().is_none();
        };
        let Some(r_entry) = rf.layout.entry_block() else {
            return false;
        };

        // CFG-ordered lockstep walk from the two entry blocks. The right walk
        // is driven entirely by the left walk's successor ordering, and only
        // reachable blocks are ever visited.
        let mut l_stack = vec![l_entry];
        let mut r_stack = vec![r_entry];
        let mut visited: FxHashSet<BlockId> = FxHashSet::default();
        visited.insert(l_entry);

        while let Some(l_block) = l_stack.pop() {
            let r_block = r_stack.pop().expect("stacks advance in lockstep");

            if !self.enumerate_blocks(l_block, r_block) {
                return false;
            }
            if !self.compare_blocks(l_block, r_block) {
                return false;
            }

            let l_term = lf.layout.last_inst_of(l_block).expect("block is terminated");
            let r_term = rf.layout.last_inst_of(r_block).expect("block is terminated");
            let l_succs = lf.dfg.inst(l_term).successors();
            let r_succs = rf.dfg.inst(r_term).successors();

            // A terminator pair that passed the instruction comparison should
            // agree on successor counts, but a disagreement is still just a
            // negative answer.
            if l_succs.len() != r_succs.len() {
                return false;
            }

            for (&l_succ, &r_succ) in l_succs.iter().zip(r_succs.iter()) {
                if visited.insert(l_succ) {
                    l_stack.push(l_succ);
                    r_stack.push(r_succ);
                }
            }
        }

        true
    }

    /// Test whether two blocks perform the same operations over enumerated
    /// values. Both instruction sequences must end together.
    fn compare_blocks(&mut self, l_block: BlockId, r_block: BlockId) -> bool {
        let (lf, rf) = (self.lf, self.rf);
        let mut l_insts = lf.layout.iter_inst(l_block);
        let mut r_insts = rf.layout.iter_inst(r_block);

        loop {
            match (l_insts.next(), r_insts.next()) {
                (Some(l), Some(r)) => {
                    if !self.compare_insts(l, r) {
                        return false;
                    }
                }
                (None, None) => return true,
                _ => return false,
            }
        }
    }

    fn compare_insts(&mut self, l_inst: InstId, r_inst: InstId) -> bool {
        let (lf, rf) = (self.lf, self.rf);

        match (lf.dfg.inst_result(l_inst), rf.dfg.inst_result(r_inst)) {
            (Some(l), Some(r)) => {
                if !self.enumerate(l, r) {
                    return false;
                }
            }
            (None, None) => {}
            _ => return false,
        }

        let l_data = lf.dfg.inst(l_inst);
        let r_data = rf.dfg.inst(r_inst);

        if let InstData::Gep { args: l_args, .. } = l_data {
            let InstData::Gep { args: r_args, .. } = r_data else {
                return false;
            };
            if !self.enumerate(l_args[0], r_args[0]) {
                return false;
            }
            return self.compare_geps(l_data, r_data);
        }

        if !self.equivalent_operation(l_inst, r_inst) {
            return false;
        }

        let (l_args, r_args) = (l_data.args(), r_data.args());
        debug_assert_eq!(l_args.len(), r_args.len());
        for (&l, &r) in l_args.iter().zip(r_args.iter()) {
            if !self.enumerate(l, r) {
                return false;
            }

            let lv = lf.dfg.value(l);
            let rv = rf.dfg.value(r);
            if mem::discriminant(lv) != mem::discriminant(rv) {
                return false;
            }
            if !self.is_equivalent_type(lv.ty(), rv.ty()) {
                return false;
            }
        }

        true
    }

    /// Per-opcode structural agreement, including the sub-class data that the
    /// operand walk cannot see.
    fn equivalent_operation(&mut self, l_inst: InstId, r_inst: InstId) -> bool {
        use InstData::*;

        let (lf, rf) = (self.lf, self.rf);
        let l_data = lf.dfg.inst(l_inst);
        let r_data = rf.dfg.inst(r_inst);

        if l_data.args().len() != r_data.args().len() {
            return false;
        }
        match (lf.dfg.inst_result_ty(l_inst), rf.dfg.inst_result_ty(r_inst)) {
            (Some(l), Some(r)) => {
                if !self.is_equivalent_type(l, r) {
                    return false;
                }
            }
            (None, None) => {}
            _ => return false,
        }

        match (l_data, r_data) {
            (Unary { code: l, .. }, Unary { code: r, .. }) => l == r,

            (
                Binary {
                    code: l,
                    flags: l_flags,
                    ..
                },
                Binary {
                    code: r,
                    flags: r_flags,
                    ..
                },
            ) => l == r && l_flags == r_flags,

            (Cmp { code: l, .. }, Cmp { code: r, .. }) => l == r,

            (Cast { code: l, .. }, Cast { code: r, .. }) => l == r,

            (Load { flags: l, .. }, Load { flags: r, .. }) => l == r,

            (Store { flags: l, .. }, Store { flags: r, .. }) => l == r,

            (Alloca { ty: l }, Alloca { ty: r }) => self.is_equivalent_type(*l, *r),

            (ExtractValue { indices: l, .. }, ExtractValue { indices: r, .. }) => l == r,

            (InsertValue { indices: l, .. }, InsertValue { indices: r, .. }) => l == r,

            (
                Call {
                    callee: l_callee,
                    cc: l_cc,
                    attrs: l_attrs,
                    tail: l_tail,
                    ..
                },
                Call {
                    callee: r_callee,
                    cc: r_cc,
                    attrs: r_attrs,
                    tail: r_tail,
                    ..
                },
            ) => {
                l_cc == r_cc
                    && l_attrs == r_attrs
                    && l_tail == r_tail
                    && self.equivalent_callees(*l_callee, *r_callee)
            }

            (
                Fence {
                    ordering: l_ord,
                    scope: l_scope,
                },
                Fence {
                    ordering: r_ord,
                    scope: r_scope,
                },
            ) => l_ord == r_ord && l_scope == r_scope,

            (
                CmpXchg {
                    volatile: l_vol,
                    success: l_succ,
                    failure: l_fail,
                    scope: l_scope,
                    ..
                },
                CmpXchg {
                    volatile: r_vol,
                    success: r_succ,
                    failure: r_fail,
                    scope: r_scope,
                    ..
                },
            ) => l_vol == r_vol && l_succ == r_succ && l_fail == r_fail && l_scope == r_scope,

            (
                AtomicRmw {
                    code: l,
                    volatile: l_vol,
                    ordering: l_ord,
                    scope: l_scope,
                    ..
                },
                AtomicRmw {
                    code: r,
                    volatile: r_vol,
                    ordering: r_ord,
                    scope: r_scope,
                    ..
                },
            ) => l == r && l_vol == r_vol && l_ord == r_ord && l_scope == r_scope,

            // Successor blocks are not operands, so the terminator arms must
            // feed them through the block correspondence themselves. The CFG
            // walk only pairs blocks on first visit; an edge into an
            // already-visited block is checked here and nowhere else.
            (Jump { dests: l_dests }, Jump { dests: r_dests }) => {
                self.enumerate_blocks(l_dests[0], r_dests[0])
            }

            (Br { dests: l_dests, .. }, Br { dests: r_dests, .. }) => {
                self.enumerate_blocks(l_dests[0], r_dests[0])
                    && self.enumerate_blocks(l_dests[1], r_dests[1])
            }

            (
                BrTable {
                    default: l_default,
                    table: l_table,
                    ..
                },
                BrTable {
                    default: r_default,
                    table: r_table,
                    ..
                },
            ) => {
                if l_table.len() != r_table.len() {
                    return false;
                }
                match (l_default, r_default) {
                    (Some(l), Some(r)) => {
                        if !self.enumerate_blocks(*l, *r) {
                            return false;
                        }
                    }
                    (None, None) => {}
                    _ => return false,
                }
                for (&l, &r) in l_table.iter().zip(r_table.iter()) {
                    if !self.enumerate_blocks(l, r) {
                        return false;
                    }
                }
                true
            }

            (Return { .. }, Return { .. }) => true,

            (
                Phi {
                    values: l_values,
                    blocks: l_blocks,
                    ty: l_ty,
                },
                Phi {
                    values: r_values,
                    blocks: r_blocks,
                    ty: r_ty,
                },
            ) => {
                if l_values.len() != r_values.len() || l_blocks.len() != r_blocks.len() {
                    return false;
                }
                if !self.is_equivalent_type(*l_ty, *r_ty) {
                    return false;
                }
                for (&l, &r) in l_blocks.iter().zip(r_blocks.iter()) {
                    if !self.enumerate_blocks(l, r) {
                        return false;
                    }
                }
                true
            }

            _ => false,
        }
    }

    /// Two GEPs compute the same byte offset from enumerated base values.
    fn compare_geps(&mut self, l_data: &InstData, r_data: &InstData) -> bool {
        let (InstData::Gep { args: l_args, .. }, InstData::Gep { args: r_args, .. }) =
            (l_data, r_data)
        else {
            unreachable!("compare_geps dispatched on non-GEPs");
        };

        let (lf, rf) = (self.lf, self.rf);
        let l_ptr_ty = lf.dfg.value_ty(l_args[0]);
        let r_ptr_ty = rf.dfg.value_ty(r_args[0]);

        let same_space = self.ctx.with_ty_store(|store| {
            let l_space = store.ptr_addr_space(l_ptr_ty);
            l_space.is_some() && l_space == store.ptr_addr_space(r_ptr_ty)
        });
        if !same_space {
            return false;
        }

        // With a data layout, compile-time constant GEPs reduce to plain byte
        // offsets; equal offsets are equivalent regardless of index shape.
        if let Some(dl) = self.ctx.isa.data_layout() {
            let offsets = self.ctx.with_ty_store(|store| {
                (
                    gep_const_offset(store, dl, lf, l_args),
                    gep_const_offset(store, dl, rf, r_args),
                )
            });
            if let (Some(l), Some(r)) = offsets {
                return l == r;
            }
        }

        if l_ptr_ty != r_ptr_ty {
            return false;
        }
        if l_args.len() != r_args.len() {
            return false;
        }
        for (&l, &r) in l_args.iter().zip(r_args.iter()) {
            if !self.enumerate(l, r) {
                return false;
            }
        }

        true
    }

    /// Decide whether the given value pair is a consistent correspondence,
    /// installing a new pairing on first sight.
    fn enumerate(&mut self, l: ValueId, r: ValueId) -> bool {
        let (lf, rf) = (self.lf, self.rf);
        let lv = lf.dfg.value(l);
        let rv = rf.dfg.value(r);

        // The two functions may refer to themselves or to each other
        // interchangeably.
        if let (
            Value::Sym {
                sym: SymbolRef::Func(l_sym),
                ..
            },
            Value::Sym {
                sym: SymbolRef::Func(r_sym),
                ..
            },
        ) = (lv, rv)
        {
            if (*l_sym == self.l_ref && *r_sym == self.r_ref)
                || (*l_sym == self.r_ref && *r_sym == self.l_ref)
            {
                return true;
            }
        }

        if lv.is_const() || rv.is_const() {
            return self.enumerate_consts(lv, rv);
        }

        if let Value::Asm { asm: l_asm, .. } = lv {
            // Interned blobs, so identity comparison is exact.
            return matches!(rv, Value::Asm { asm: r_asm, .. } if r_asm == l_asm);
        }
        if matches!(rv, Value::Asm { .. }) {
            return false;
        }

        match self.id_map.entry(l) {
            std::collections::hash_map::Entry::Occupied(entry) => *entry.get() == r,
            std::collections::hash_map::Entry::Vacant(entry) => {
                if !self.seen_rhs.insert(r) {
                    return false;
                }
                entry.insert(r);
                true
            }
        }
    }

    /// Constants are never enumerated; they either match outright or the
    /// comparison fails.
    fn enumerate_consts(&self, lv: &Value, rv: &Value) -> bool {
        match (lv, rv) {
            // Accept when the right bit pattern reinterpreted at the left's
            // type is exactly the left constant; identical immediates are a
            // special case of this.
            (Value::Immediate { imm: l, .. }, Value::Immediate { imm: r, .. }) => {
                r.bitcast_to(l.ty()) == Some(*l)
            }

            (Value::Null { ty: l }, Value::Null { ty: r }) => self.is_equivalent_type(*l, *r),

            (Value::Undef { ty: l }, Value::Undef { ty: r }) => self.is_equivalent_type(*l, *r),

            // Symbol addresses match only by identity; anything cleverer
            // (expressions over the functions under comparison in particular)
            // is conservatively rejected.
            (
                Value::Sym {
                    sym: l_sym, ty: l_ty, ..
                },
                Value::Sym {
                    sym: r_sym, ty: r_ty, ..
                },
            ) => l_sym == r_sym && self.is_equivalent_type(*l_ty, *r_ty),

            _ => false,
        }
    }

    /// Online correspondence between the blocks of the two functions, shared
    /// by the CFG walk and phi operands.
    fn enumerate_blocks(&mut self, l: BlockId, r: BlockId) -> bool {
        match self.block_map.entry(l) {
            std::collections::hash_map::Entry::Occupied(entry) => *entry.get() == r,
            std::collections::hash_map::Entry::Vacant(entry) => {
                if !self.seen_rhs_blocks.insert(r) {
                    return false;
                }
                entry.insert(r);
                true
            }
        }
    }

    fn equivalent_callees(&self, l: SymbolRef, r: SymbolRef) -> bool {
        match (l, r) {
            (SymbolRef::Func(l), SymbolRef::Func(r)) => {
                l == r
                    || (l == self.l_ref && r == self.r_ref)
                    || (l == self.r_ref && r == self.l_ref)
            }
            (SymbolRef::Gv(l), SymbolRef::Gv(r)) => l == r,
            (SymbolRef::Alias(l), SymbolRef::Alias(r)) => l == r,
            _ => false,
        }
    }

    fn is_equivalent_type(&self, l: Type, r: Type) -> bool {
        let dl = self.ctx.isa.data_layout();
        self.ctx
            .with_ty_store(|store| cmp_types(store, dl, l, r) == Ordering::Equal)
    }
}

/// Total order over types under the pointer-equivalence relaxation. Stable
/// within one pass invocation; compound refs serve as the identity
/// tiebreaker.
pub(crate) fn cmp_types(
    store: &TypeStore,
    dl: Option<&DataLayout>,
    lhs: Type,
    rhs: Type,
) -> Ordering {
    let lhs = coerce_ptr(store, dl, lhs);
    let rhs = coerce_ptr(store, dl, rhs);

    if lhs == rhs {
        return Ordering::Equal;
    }

    let l_kind = store.kind(lhs);
    let r_kind = store.kind(rhs);
    if l_kind != r_kind {
        return (l_kind as u8).cmp(&(r_kind as u8));
    }

    match (lhs, rhs) {
        (Type::Compound(l), Type::Compound(r)) => {
            match (store.resolve_compound(l), store.resolve_compound(r)) {
                (
                    CompoundType::Ptr {
                        addr_space: l_space, ..
                    },
                    CompoundType::Ptr {
                        addr_space: r_space, ..
                    },
                ) => l_space.cmp(r_space),

                // Interning makes distinct vector refs genuinely different
                // element/lane combinations.
                (CompoundType::Vector { .. }, CompoundType::Vector { .. }) => l.cmp(&r),

                (CompoundType::Struct(l_def), CompoundType::Struct(r_def)) => {
                    let res = l_def
                        .fields
                        .len()
                        .cmp(&r_def.fields.len())
                        .then(l_def.packed.cmp(&r_def.packed));
                    if res != Ordering::Equal {
                        return res;
                    }
                    for (&l_field, &r_field) in l_def.fields.iter().zip(r_def.fields.iter()) {
                        let res = cmp_types(store, dl, l_field, r_field);
                        if res != Ordering::Equal {
                            return res;
                        }
                    }
                    Ordering::Equal
                }

                (
                    CompoundType::Func {
                        args: l_args,
                        ret_ty: l_ret,
                        variadic: l_variadic,
                    },
                    CompoundType::Func {
                        args: r_args,
                        ret_ty: r_ret,
                        variadic: r_variadic,
                    },
                ) => {
                    let res = l_args
                        .len()
                        .cmp(&r_args.len())
                        .then(l_variadic.cmp(r_variadic));
                    if res != Ordering::Equal {
                        return res;
                    }
                    let res = cmp_types(store, dl, *l_ret, *r_ret);
                    if res != Ordering::Equal {
                        return res;
                    }
                    for (&l_arg, &r_arg) in l_args.iter().zip(r_args.iter()) {
                        let res = cmp_types(store, dl, l_arg, r_arg);
                        if res != Ordering::Equal {
                            return res;
                        }
                    }
                    Ordering::Equal
                }

                (
                    CompoundType::Array {
                        elem: l_elem,
                        len: l_len,
                    },
                    CompoundType::Array {
                        elem: r_elem,
                        len: r_len,
                    },
                ) => l_len
                    .cmp(r_len)
                    .then_with(|| cmp_types(store, dl, *l_elem, *r_elem)),

                _ => unreachable!("kind tags already agreed"),
            }
        }

        // Same kind but not identical: two integer types of distinct widths.
        (lhs, rhs) => {
            debug_assert!(lhs.is_integral() && rhs.is_integral());
            lhs.bit_width().cmp(&rhs.bit_width())
        }
    }
}

/// Address-space-0 pointers are indistinguishable from pointer-width
/// integers, when a layout is available to say what that width is.
fn coerce_ptr(store: &TypeStore, dl: Option<&DataLayout>, ty: Type) -> Type {
    let Some(dl) = dl else {
        return ty;
    };
    match store.ptr_addr_space(ty) {
        Some(0) => dl.int_ptr_ty(),
        _ => ty,
    }
}

/// Accumulated byte offset of a GEP whose indices are all compile-time
/// constants; `None` when any index is dynamic or a size is unknown.
fn gep_const_offset(
    store: &TypeStore,
    dl: &DataLayout,
    func: &Function,
    args: &[ValueId],
) -> Option<i128> {
    let base_ty = func.dfg.value_ty(args[0]);
    let mut cur_ty = store.deref(base_ty)?;
    let mut indices = args[1..].iter();

    let Some(&first) = indices.next() else {
        return Some(0);
    };
    let mut offset = const_int(func, first)? * dl.size_of(cur_ty, store)? as i128;

    for &arg in indices {
        let idx = const_int(func, arg)?;
        let cmpd = match cur_ty {
            Type::Compound(cmpd) => cmpd,
            _ => return None,
        };
        match store.resolve_compound(cmpd) {
            CompoundType::Struct(def) => {
                let field = usize::try_from(idx).ok()?;
                offset += dl.struct_field_offset(def, field, store)? as i128;
                cur_ty = *def.fields.get(field)?;
            }
            CompoundType::Array { elem, .. } | CompoundType::Vector { elem, .. } => {
                offset += idx * dl.size_of(*elem, store)? as i128;
                cur_ty = *elem;
            }
            CompoundType::Ptr { .. } | CompoundType::Func { .. } => return None,
        }
    }

    Some(offset)
}

fn const_int(func: &Function, value: ValueId) -> Option<i128> {
    match func.dfg.value(value) {
        Value::Immediate { imm, .. } => imm.as_int(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_ir::builder::test_util::*;
    use tessera_ir::inst::{ArithFlags, BinaryOp, CastOp};
    use tessera_ir::{Linkage, Signature};

    fn two_ptr_takers(same_pointee: bool) -> (Module, FuncRef, FuncRef) {
        // fn(p) { v = ptrtoint p; w = add v v; return w }
        let mb = test_module_builder();
        let mut refs = Vec::new();

        for (name, pointee) in [("f", Type::I8), ("g", if same_pointee { Type::I8 } else { Type::I32 })]
        {
            let ptr_ty = mb.ptr_type(pointee);
            let sig = Signature::new(name, Linkage::Internal, &[ptr_ty], Type::I64);
            let func_ref = mb.declare_function(sig);
            refs.push(func_ref);

            let mut builder = mb.func_builder(func_ref);
            let entry = builder.append_block();
            builder.switch_to_block(entry);
            let arg = builder.args()[0];
            let v = builder.insert_inst(
                tessera_ir::InstData::cast(CastOp::PtrToInt, arg, Type::I64),
                Type::I64,
            );
            let w = builder.insert_inst(
                tessera_ir::InstData::binary(BinaryOp::Add, v, v),
                Type::I64,
            );
            builder.insert_inst_no_result(tessera_ir::InstData::ret(Some(w)));
            builder.finish();
        }

        let module = mb.build();
        (module, refs[0], refs[1])
    }

    #[test]
    fn reflexive_and_symmetric() {
        let (module, f, g) = two_ptr_takers(true);
        assert!(compare_funcs(&module, f, f));
        assert!(compare_funcs(&module, f, g));
        assert!(compare_funcs(&module, g, f));
    }

    #[test]
    fn pointer_params_of_distinct_pointees_are_equivalent() {
        let (module, f, g) = two_ptr_takers(false);
        assert!(compare_funcs(&module, f, g));
    }

    #[test]
    fn arith_flag_mismatch_is_not_equivalent() {
        let mb = test_module_builder();
        let mut refs = Vec::new();

        for (name, nsw) in [("f", true), ("g", false)] {
            let sig = Signature::new(name, Linkage::Internal, &[Type::I32], Type::I32);
            let func_ref = mb.declare_function(sig);
            refs.push(func_ref);

            let mut builder = mb.func_builder(func_ref);
            let entry = builder.append_block();
            builder.switch_to_block(entry);
            let arg = builder.args()[0];
            let one = builder.make_imm_value(1i32);
            let flags = if nsw {
                ArithFlags::NSW
            } else {
                ArithFlags::default()
            };
            let sum = builder.insert_inst(
                tessera_ir::InstData::binary_with_flags(BinaryOp::Add, arg, one, flags),
                Type::I32,
            );
            builder.insert_inst_no_result(tessera_ir::InstData::ret(Some(sum)));
            builder.finish();
        }

        let module = mb.build();
        assert!(!compare_funcs(&module, refs[0], refs[1]));
    }

    #[test]
    fn type_order_is_total_over_scalars() {
        let module = test_module_builder().build();
        let dl = module.ctx.isa.data_layout().cloned();
        module.ctx.with_ty_store(|store| {
            assert_eq!(
                cmp_types(store, dl.as_ref(), Type::I32, Type::I32),
                Ordering::Equal
            );
            assert_eq!(
                cmp_types(store, dl.as_ref(), Type::I32, Type::I64),
                Ordering::Less
            );
            assert_eq!(
                cmp_types(store, dl.as_ref(), Type::I64, Type::I32),
                Ordering::Greater
            );
        });
    }

    #[test]
    fn as0_pointer_coerces_to_pointer_width_integer() {
        let mb = test_module_builder();
        let ptr = mb.ptr_type(Type::I8);
        let module = mb.build();
        let dl = module.ctx.isa.data_layout().cloned();

        module.ctx.with_ty_store(|store| {
            assert_eq!(
                cmp_types(store, dl.as_ref(), ptr, Type::I64),
                Ordering::Equal
            );
            // Without a layout there is nothing to coerce to.
            assert_ne!(cmp_types(store, None, ptr, Type::I64), Ordering::Equal);
        });
    }
}
