//! The merge rewrite strategies: call-site redirection, forwarding thunks,
//! and symbol aliases, plus the use-graph bookkeeping they require.

use log::debug;
use smallvec::SmallVec;
use tessera_ir::{
    inst::{CastOp, InstData},
    module::{AliasData, AliasRef, FuncRef, SymbolRef},
    AttrSet, Function, Linkage, Module, Type, Value, ValueId, Visibility,
};

use super::MergeFunc;

impl MergeFunc {
    /// Merge two equivalent functions. `kept` survives as the definition;
    /// `merged` is consumed and must never be examined again.
    pub(super) fn merge_two_functions(
        &mut self,
        module: &mut Module,
        kept: FuncRef,
        merged: FuncRef,
    ) {
        let kept_overridable = module
            .func_store
            .view(kept, |func| func.sig.linkage().is_overridable());

        if kept_overridable {
            let merged_overridable = module
                .func_store
                .view(merged, |func| func.sig.linkage().is_overridable());
            assert!(
                merged_overridable,
                "a non-overridable candidate must never fold into an overridable body"
            );

            if module.ctx.isa.supports_aliases() {
                self.fold_double_overridable(module, kept, merged);
            } else {
                // No aliases on this target, so neither symbol can be
                // dropped. Steer direct calls at one body and keep both
                // definitions.
                self.replace_direct_callers(module, merged, kept);
            }
            self.stats.functions_created += 1;
        } else {
            self.write_thunk_or_alias(module, kept, merged);
        }

        self.stats.functions_merged += 1;
    }

    /// Replace `merged` with an alias to `kept` if the platform and linkage
    /// allow it, else with a forwarding thunk.
    fn write_thunk_or_alias(&mut self, module: &mut Module, kept: FuncRef, merged: FuncRef) {
        let (unnamed_addr, linkage) = module
            .func_store
            .view(merged, |func| (func.unnamed_addr, func.sig.linkage()));

        let alias_ok = module.ctx.isa.supports_aliases()
            && unnamed_addr
            && (linkage == Linkage::External || linkage.is_local() || linkage == Linkage::Weak);

        if alias_ok {
            self.write_alias(module, kept, merged);
        } else {
            self.write_thunk(module, kept, merged);
        }
    }

    /// Replace `merged` with a tail-calling thunk to `kept`. When call-site
    /// redirection leaves a local function without uses, it is erased
    /// outright and no thunk is written.
    fn write_thunk(&mut self, module: &mut Module, kept: FuncRef, merged: FuncRef) {
        let merged_linkage = module.func_store.view(merged, |func| func.sig.linkage());
        if !merged_linkage.is_overridable() {
            self.replace_direct_callers(module, merged, kept);
        }

        if merged_linkage.is_local() && !has_uses(module, merged) {
            let name = module
                .func_store
                .view(merged, |func| func.sig.name().to_string());
            module.func_store.remove(merged);
            debug!("erased %{name}: local and unused after call redirection");
            return;
        }

        let thunk = build_thunk(module, kept, merged);
        let name = thunk.sig.name().to_string();
        let thunk_ref = module.func_store.insert(thunk);

        self.remove_users(module, merged);
        replace_all_uses(module, merged, SymbolRef::Func(thunk_ref));
        module.func_store.remove(merged);

        debug!("wrote thunk %{name}");
        self.stats.thunks_created += 1;
    }

    /// Replace `merged` with a global alias of `kept` and erase it.
    fn write_alias(&mut self, module: &mut Module, kept: FuncRef, merged: FuncRef) {
        let (name, linkage, visibility, alignment, sig) = module.func_store.view(merged, |func| {
            (
                func.sig.name().to_string(),
                func.sig.linkage(),
                func.visibility,
                func.alignment,
                func.sig.clone(),
            )
        });

        let ty = module.ctx.with_ty_store_mut(|store| {
            let func_ty = sig.func_ty(store);
            store.make_ptr(func_ty)
        });

        let alias = self.emit_alias(
            module,
            AliasData {
                name: name.as_str().into(),
                linkage,
                visibility,
                ty,
                aliasee: kept,
            },
        );

        module
            .func_store
            .modify(kept, |func| func.alignment = func.alignment.max(alignment));

        self.remove_users(module, merged);
        replace_all_uses(module, merged, SymbolRef::Alias(alias));
        module.func_store.remove(merged);

        debug!("wrote alias %{name}");
    }

    /// Both functions are overridable and the platform has aliases: demote
    /// the kept body to a fresh private holder and point both original
    /// symbols at it.
    fn fold_double_overridable(&mut self, module: &mut Module, kept: FuncRef, merged: FuncRef) {
        let (f_name, f_linkage, f_visibility, f_sig) = module.func_store.view(kept, |func| {
            (
                func.sig.name().to_string(),
                func.sig.linkage(),
                func.visibility,
                func.sig.clone(),
            )
        });
        let (g_name, g_linkage, g_visibility, g_alignment) =
            module.func_store.view(merged, |func| {
                (
                    func.sig.name().to_string(),
                    func.sig.linkage(),
                    func.visibility,
                    func.alignment,
                )
            });

        // The shared body stays under the kept ref, renamed and privatized;
        // the original symbols survive only as aliases.
        self.remove_users(module, kept);

        let holder_name = format!("{f_name}.merged");
        module.func_store.modify(kept, |func| {
            func.sig.set_name(&holder_name);
            func.sig.set_linkage(Linkage::Private);
            func.visibility = Visibility::Default;
            func.unnamed_addr = true;
            func.alignment = func.alignment.max(g_alignment);
        });

        let ty = module.ctx.with_ty_store_mut(|store| {
            let func_ty = f_sig.func_ty(store);
            store.make_ptr(func_ty)
        });

        let f_alias = self.emit_alias(
            module,
            AliasData {
                name: f_name.as_str().into(),
                linkage: f_linkage,
                visibility: f_visibility,
                ty,
                aliasee: kept,
            },
        );
        replace_all_uses(module, kept, SymbolRef::Alias(f_alias));

        self.remove_users(module, merged);
        let g_alias = self.emit_alias(
            module,
            AliasData {
                name: g_name.as_str().into(),
                linkage: g_linkage,
                visibility: g_visibility,
                ty,
                aliasee: kept,
            },
        );
        replace_all_uses(module, merged, SymbolRef::Alias(g_alias));
        module.func_store.remove(merged);

        debug!("folded %{f_name} and %{g_name} into %{holder_name}");
    }

    /// Rewrite every direct call of `old` into a direct call of `new`. Each
    /// disturbed caller leaves the candidate set and queues up for another
    /// look.
    pub(super) fn replace_direct_callers(
        &mut self,
        module: &mut Module,
        old: FuncRef,
        new: FuncRef,
    ) {
        let old_sym = SymbolRef::Func(old);
        let new_sym = SymbolRef::Func(new);

        for caller in module.funcs() {
            let changed = module.func_store.modify(caller, |func| {
                let layout = &func.layout;
                let dfg = &mut func.dfg;
                let mut changed = false;

                for block in layout.iter_block() {
                    for inst in layout.iter_inst(block) {
                        if let InstData::Call { callee, .. } = dfg.inst_mut(inst) {
                            if *callee == old_sym {
                                *callee = new_sym;
                                changed = true;
                            }
                        }
                    }
                }
                changed
            });

            if changed {
                self.remove(caller);
            }
        }
    }

    /// Mark every function whose body refers to `target` for re-examination.
    /// Runs right before the references themselves are rewritten.
    pub(super) fn remove_users(&mut self, module: &Module, target: FuncRef) {
        for caller in module.funcs() {
            let references = module
                .func_store
                .view(caller, |func| func_references(func, target));
            if references {
                self.remove(caller);
            }
        }
    }

    fn emit_alias(&mut self, module: &mut Module, data: AliasData) -> AliasRef {
        let alias = module.aliases.make_alias(data);
        self.stats.aliases_created += 1;
        alias
    }
}

/// `true` when any instruction or constant in `func` mentions `target`.
fn func_references(func: &Function, target: FuncRef) -> bool {
    let sym = SymbolRef::Func(target);

    for block in func.layout.iter_block() {
        for inst in func.layout.iter_inst(block) {
            if let InstData::Call { callee, .. } = func.dfg.inst(inst) {
                if *callee == sym {
                    return true;
                }
            }
        }
    }

    func.dfg
        .values()
        .any(|(_, value)| matches!(value, Value::Sym { sym: s, .. } if *s == sym))
}

/// `true` when any live function or alias still refers to `target`.
fn has_uses(module: &Module, target: FuncRef) -> bool {
    module
        .funcs()
        .iter()
        .any(|&func_ref| {
            module
                .func_store
                .view(func_ref, |func| func_references(func, target))
        })
        || module.aliases.iter().any(|(_, data)| data.aliasee == target)
}

/// Point every remaining use of `old` (call sites, address-of constants, and
/// alias targets) at `with`.
fn replace_all_uses(module: &mut Module, old: FuncRef, with: SymbolRef) {
    let old_sym = SymbolRef::Func(old);

    for func_ref in module.funcs() {
        module.func_store.modify(func_ref, |func| {
            let layout = &func.layout;
            let dfg = &mut func.dfg;

            for block in layout.iter_block() {
                for inst in layout.iter_inst(block) {
                    if let InstData::Call { callee, .. } = dfg.inst_mut(inst) {
                        if *callee == old_sym {
                            *callee = with;
                        }
                    }
                }
            }

            for value in dfg.values.values_mut() {
                if let Value::Sym { sym, .. } = value {
                    if *sym == old_sym {
                        *sym = with;
                    }
                }
            }
        });
    }

    // An alias that named the old function now names its replacement's
    // underlying definition.
    let (resolved, skip) = match with {
        SymbolRef::Func(func_ref) => (Some(func_ref), None),
        SymbolRef::Alias(alias) => (Some(module.aliases.alias_data(alias).aliasee), Some(alias)),
        SymbolRef::Gv(_) => (None, None),
    };
    if let Some(resolved) = resolved {
        let alias_refs: Vec<AliasRef> = module.aliases.iter().map(|(alias, _)| alias).collect();
        for alias in alias_refs {
            if Some(alias) == skip {
                continue;
            }
            let data = module.aliases.alias_data_mut(alias);
            if data.aliasee == old {
                data.aliasee = resolved;
            }
        }
    }
}

/// A thunk with `merged`'s symbol-level identity whose body is a single tail
/// call to `kept`, casting arguments and the return value as needed.
fn build_thunk(module: &Module, kept: FuncRef, merged: FuncRef) -> Function {
    let kept_sig = module.func_store.view(kept, |func| func.sig.clone());
    let (merged_sig, attrs, section, gc, visibility, unnamed_addr, alignment) =
        module.func_store.view(merged, |func| {
            (
                func.sig.clone(),
                func.attrs.clone(),
                func.section.clone(),
                func.gc.clone(),
                func.visibility,
                func.unnamed_addr,
                func.alignment,
            )
        });

    let mut thunk = Function::new(merged_sig);
    thunk.attrs = attrs;
    thunk.section = section;
    thunk.gc = gc;
    thunk.visibility = visibility;
    thunk.unnamed_addr = unnamed_addr;
    thunk.alignment = alignment;

    let entry = thunk.dfg.make_block();
    thunk.layout.append_block(entry);

    let params: Vec<ValueId> = thunk.arg_values.iter().copied().collect();
    let mut call_args: SmallVec<[ValueId; 8]> = SmallVec::new();
    for (idx, param) in params.into_iter().enumerate() {
        let target_ty = kept_sig.args()[idx];
        call_args.push(cast_value(&mut thunk, entry, module, param, target_ty));
    }

    let ret_ty = kept_sig.ret_ty();
    let thunk_ret_ty = thunk.sig.ret_ty();
    let call = InstData::Call {
        callee: SymbolRef::Func(kept),
        args: call_args,
        ret_ty,
        cc: kept_sig.cc(),
        attrs: AttrSet::default(),
        tail: true,
    };

    if ret_ty.is_unit() {
        append_inst(&mut thunk, entry, call, None);
        append_inst(&mut thunk, entry, InstData::ret(None), None);
    } else {
        let result = append_inst(&mut thunk, entry, call, Some(ret_ty)).unwrap();
        let ret_value = cast_value(&mut thunk, entry, module, result, thunk_ret_ty);
        append_inst(&mut thunk, entry, InstData::ret(Some(ret_value)), None);
    }

    thunk
}

/// Cast `value` to `to`, using integer/pointer conversions when exactly one
/// side is a pointer and a plain bitcast otherwise.
fn cast_value(
    func: &mut Function,
    block: tessera_ir::BlockId,
    module: &Module,
    value: ValueId,
    to: Type,
) -> ValueId {
    let from = func.dfg.value_ty(value);
    if from == to {
        return value;
    }

    let code = module.ctx.with_ty_store(|store| {
        if from.is_integral() && store.is_ptr(to) {
            CastOp::IntToPtr
        } else if store.is_ptr(from) && to.is_integral() {
            CastOp::PtrToInt
        } else {
            CastOp::Bitcast
        }
    });

    append_inst(func, block, InstData::cast(code, value, to), Some(to)).unwrap()
}

fn append_inst(
    func: &mut Function,
    block: tessera_ir::BlockId,
    data: InstData,
    result_ty: Option<Type>,
) -> Option<ValueId> {
    let inst = func.dfg.make_inst(data);
    func.layout.append_inst(inst, block);
    result_ty.map(|ty| {
        let value = func.dfg.make_value(Value::Inst { inst, ty });
        func.dfg.attach_result(inst, value);
        value
    })
}
