//! End-to-end tests for the function-merging pass: merge decisions, rewrite
//! strategies, counters, and the stability properties of the pass.

use smallvec::smallvec;
use tessera_ir::builder::test_util::{test_isa, test_isa_no_aliases};
use tessera_ir::inst::{BinaryOp, CastOp, CmpCond, InstData};
use tessera_ir::ir_writer::ModuleWriter;
use tessera_ir::isa::TargetIsa;
use tessera_ir::module::{FuncRef, ModuleCtx, SymbolRef};
use tessera_ir::{Linkage, Module, ModuleBuilder, Signature, Type};

use tessera_codegen::optim::merge_func::MergeFunc;

fn builder_for(isa: TargetIsa) -> ModuleBuilder {
    ModuleBuilder::new(ModuleCtx::new(isa))
}

fn func_names(module: &Module) -> Vec<String> {
    let mut names: Vec<String> = module
        .funcs()
        .into_iter()
        .map(|func_ref| {
            module
                .func_store
                .view(func_ref, |func| func.sig.name().to_string())
        })
        .collect();
    names.sort();
    names
}

fn find_func(module: &Module, name: &str) -> Option<FuncRef> {
    module.funcs().into_iter().find(|&func_ref| {
        module
            .func_store
            .view(func_ref, |func| func.sig.name() == name)
    })
}

/// A byte-counting loop over a nul-terminated sequence. Large enough to be
/// worth merging and exercises phis, geps, loads, and compares.
fn build_strlen(mb: &ModuleBuilder, name: &str, linkage: Linkage, unnamed_addr: bool) -> FuncRef {
    let ptr_i8 = mb.ptr_type(Type::I8);
    let sig = Signature::new(name, linkage, &[ptr_i8], Type::I64);
    let func_ref = mb.declare_function(sig);

    let mut b = mb.func_builder(func_ref);
    b.func.unnamed_addr = unnamed_addr;

    let entry = b.append_block();
    let loop_bb = b.append_block();
    let exit = b.append_block();

    b.switch_to_block(entry);
    b.insert_inst_no_result(InstData::jump(loop_bb));

    b.switch_to_block(loop_bb);
    let len = b.insert_inst(InstData::phi(Type::I64), Type::I64);
    let zero = b.make_imm_value(0i64);
    b.append_phi_arg(len, zero, entry);

    let arg = b.args()[0];
    let ptr = b.insert_inst(
        InstData::Gep {
            args: smallvec![arg, len],
            inbounds: true,
        },
        ptr_i8,
    );
    let ch = b.insert_inst(InstData::load(ptr, Type::I8), Type::I8);
    let nul = b.make_imm_value(0i8);
    let is_end = b.insert_inst(InstData::cmp(CmpCond::Eq, ch, nul), Type::I1);
    let one = b.make_imm_value(1i64);
    let next = b.insert_inst(InstData::binary(BinaryOp::Add, len, one), Type::I64);
    b.append_phi_arg(len, next, loop_bb);
    b.insert_inst_no_result(InstData::br(is_end, exit, loop_bb));

    b.switch_to_block(exit);
    b.insert_inst_no_result(InstData::ret(Some(len)));
    b.finish();

    func_ref
}

/// `fn(p) -> i64 { v = ptrtoint p; w = add v v; return w }`, parameterized
/// over the pointee type so pointer-equivalence kicks in.
fn build_ptr_taker(mb: &ModuleBuilder, name: &str, linkage: Linkage, pointee: Type) -> FuncRef {
    let ptr_ty = mb.ptr_type(pointee);
    let sig = Signature::new(name, linkage, &[ptr_ty], Type::I64);
    let func_ref = mb.declare_function(sig);

    let mut b = mb.func_builder(func_ref);
    let entry = b.append_block();
    b.switch_to_block(entry);
    let arg = b.args()[0];
    let v = b.insert_inst(InstData::cast(CastOp::PtrToInt, arg, Type::I64), Type::I64);
    let w = b.insert_inst(InstData::binary(BinaryOp::Add, v, v), Type::I64);
    b.insert_inst_no_result(InstData::ret(Some(w)));
    b.finish();

    func_ref
}

/// `fn(p: *i8) -> i64 { v = call %callee p; w = add v 1; return w }`
fn build_caller(mb: &ModuleBuilder, name: &str, callee: FuncRef) -> FuncRef {
    let ptr_i8 = mb.ptr_type(Type::I8);
    let sig = Signature::new(name, Linkage::Internal, &[ptr_i8], Type::I64);
    let func_ref = mb.declare_function(sig);

    let mut b = mb.func_builder(func_ref);
    let entry = b.append_block();
    b.switch_to_block(entry);
    let arg = b.args()[0];
    let v = b.insert_inst(
        InstData::call(SymbolRef::Func(callee), &[arg], Type::I64),
        Type::I64,
    );
    let one = b.make_imm_value(1i64);
    let w = b.insert_inst(InstData::binary(BinaryOp::Add, v, one), Type::I64);
    b.insert_inst_no_result(InstData::ret(Some(w)));
    b.finish();

    func_ref
}

/// `b0: jump header; header: br c body exit; body: jump <header|exit>;
/// exit: return 0`. The two variants differ only in where the body block
/// jumps — an edge whose target the CFG walk has already visited.
fn build_loop_shape(mb: &ModuleBuilder, name: &str, loops_back: bool) -> FuncRef {
    let sig = Signature::new(name, Linkage::Internal, &[Type::I1], Type::I64);
    let func_ref = mb.declare_function(sig);

    let mut b = mb.func_builder(func_ref);
    let entry = b.append_block();
    let header = b.append_block();
    let body = b.append_block();
    let exit = b.append_block();

    b.switch_to_block(entry);
    b.insert_inst_no_result(InstData::jump(header));

    b.switch_to_block(header);
    let cond = b.args()[0];
    b.insert_inst_no_result(InstData::br(cond, body, exit));

    b.switch_to_block(body);
    let target = if loops_back { header } else { exit };
    b.insert_inst_no_result(InstData::jump(target));

    b.switch_to_block(exit);
    let zero = b.make_imm_value(0i64);
    b.insert_inst_no_result(InstData::ret(Some(zero)));
    b.finish();

    func_ref
}

fn build_self_recursive(mb: &ModuleBuilder, name: &str) -> FuncRef {
    let sig = Signature::new(name, Linkage::Internal, &[Type::I64], Type::I64);
    let func_ref = mb.declare_function(sig);

    let mut b = mb.func_builder(func_ref);
    let entry = b.append_block();
    b.switch_to_block(entry);
    let arg = b.args()[0];
    let r = b.insert_inst(
        InstData::call(SymbolRef::Func(func_ref), &[arg], Type::I64),
        Type::I64,
    );
    let one = b.make_imm_value(1i64);
    let s = b.insert_inst(InstData::binary(BinaryOp::Add, r, one), Type::I64);
    b.insert_inst_no_result(InstData::ret(Some(s)));
    b.finish();

    func_ref
}

/// Thunks are single-block bodies that end in `tail call; return`. Used to
/// check the linkage discipline property after a run.
fn assert_linkage_discipline(module: &Module) {
    for func_ref in module.funcs() {
        module.func_store.view(func_ref, |func| {
            if func.layout.block_count() != 1 {
                return;
            }
            let entry = func.layout.entry_block().unwrap();
            let Some(first) = func.layout.first_inst_of(entry) else {
                return;
            };
            let InstData::Call {
                callee: SymbolRef::Func(target),
                tail: true,
                ..
            } = func.dfg.inst(first)
            else {
                return;
            };

            if !module.func_store.is_alive(*target) {
                return;
            }
            let target_overridable = module
                .func_store
                .view(*target, |t| t.sig.linkage().is_overridable());
            assert!(
                !target_overridable || func.sig.linkage().is_overridable(),
                "non-overridable thunk %{} forwards to an overridable target",
                func.sig.name()
            );
        });
    }
}

#[test]
fn external_twins_merge_into_a_thunk() {
    let mb = builder_for(test_isa_no_aliases());
    let f = build_strlen(&mb, "f", Linkage::External, false);
    let g = build_strlen(&mb, "g", Linkage::External, false);
    let mut module = mb.build();

    let stats = MergeFunc::new().run(&mut module);
    assert_eq!(stats.functions_merged, 1);
    assert_eq!(stats.thunks_created, 1);
    assert_eq!(stats.aliases_created, 0);

    // The original g body is gone; a fresh thunk took over its name.
    assert!(module.func_store.is_alive(f));
    assert!(!module.func_store.is_alive(g));

    let thunk = find_func(&module, "g").expect("thunk carries g's name");
    module.func_store.view(thunk, |func| {
        assert_eq!(func.sig.linkage(), Linkage::External);
        assert_eq!(func.layout.block_count(), 1);
        let entry = func.layout.entry_block().unwrap();
        assert_eq!(func.layout.inst_count_of(entry), 2);

        let call = func.layout.first_inst_of(entry).unwrap();
        let InstData::Call { callee, tail, .. } = func.dfg.inst(call) else {
            panic!("thunk must start with a call");
        };
        assert_eq!(*callee, SymbolRef::Func(f));
        assert!(*tail);
    });

    assert_linkage_discipline(&module);
}

#[test]
fn unnamed_addr_twins_merge_into_an_alias() {
    let mb = builder_for(test_isa());
    let f = build_strlen(&mb, "f", Linkage::Internal, true);
    let g = build_strlen(&mb, "g", Linkage::Internal, true);
    let mut module = mb.build();

    let stats = MergeFunc::new().run(&mut module);
    assert_eq!(stats.functions_merged, 1);
    assert_eq!(stats.aliases_created, 1);
    assert_eq!(stats.thunks_created, 0);

    assert!(module.func_store.is_alive(f));
    assert!(!module.func_store.is_alive(g));

    assert_eq!(module.aliases.len(), 1);
    let (_, alias) = module.aliases.iter().next().unwrap();
    assert_eq!(alias.name, "g");
    assert_eq!(alias.linkage, Linkage::Internal);
    assert_eq!(alias.aliasee, f);
}

#[test]
fn unused_local_twin_is_erased_without_a_thunk() {
    let mb = builder_for(test_isa());
    build_strlen(&mb, "f", Linkage::Internal, false);
    let g = build_strlen(&mb, "g", Linkage::Internal, false);
    let mut module = mb.build();

    let stats = MergeFunc::new().run(&mut module);
    assert_eq!(stats.functions_merged, 1);
    assert_eq!(stats.thunks_created, 0);
    assert_eq!(stats.aliases_created, 0);
    assert!(!module.func_store.is_alive(g));
    assert_eq!(func_names(&module), vec!["f".to_string()]);
}

#[test]
fn same_address_space_pointers_merge_without_a_data_layout() {
    // Pointee types never matter for same-address-space pointers, layout or
    // not.
    let isa = TargetIsa::without_data_layout("x86_64-linux".parse().unwrap());
    let mb = builder_for(isa);
    build_ptr_taker(&mb, "f", Linkage::Internal, Type::I8);
    build_ptr_taker(&mb, "g", Linkage::Internal, Type::I32);
    let mut module = mb.build();
    let stats = MergeFunc::new().run(&mut module);
    assert_eq!(stats.functions_merged, 1);
}

/// `fn(x) { slot = alloca ty(x); store x slot; return }` — merges with a
/// pointer-typed twin only when a data layout coerces the pointer parameter
/// to an integer.
fn build_spiller(mb: &ModuleBuilder, name: &str, param: Type) -> FuncRef {
    let sig = Signature::new(name, Linkage::Internal, &[param], Type::Unit);
    let func_ref = mb.declare_function(sig);

    let mut b = mb.func_builder(func_ref);
    let entry = b.append_block();
    b.switch_to_block(entry);
    let arg = b.args()[0];
    let slot_ty = b.ptr_type(param);
    let slot = b.insert_inst(InstData::Alloca { ty: param }, slot_ty);
    b.insert_inst_no_result(InstData::store(arg, slot));
    b.insert_inst_no_result(InstData::ret(None));
    b.finish();

    func_ref
}

#[test]
fn pointer_and_integer_params_merge_only_with_a_data_layout() {
    // With a layout, an address-space-0 pointer parameter is a
    // pointer-width integer to the comparator.
    let mb = builder_for(test_isa());
    let ptr_i8 = mb.ptr_type(Type::I8);
    build_spiller(&mb, "f", ptr_i8);
    build_spiller(&mb, "g", Type::I64);
    let mut module = mb.build();
    let stats = MergeFunc::new().run(&mut module);
    assert_eq!(stats.functions_merged, 1);

    // Without one, the pointer and integer kinds stay distinct.
    let isa = TargetIsa::without_data_layout("x86_64-linux".parse().unwrap());
    let mb = builder_for(isa);
    let ptr_i8 = mb.ptr_type(Type::I8);
    build_spiller(&mb, "f", ptr_i8);
    build_spiller(&mb, "g", Type::I64);
    let mut module = mb.build();
    let stats = MergeFunc::new().run(&mut module);
    assert_eq!(stats.functions_merged, 0);
}

#[test]
fn thunk_casts_arguments_to_the_kept_signature() {
    let mb = builder_for(test_isa_no_aliases());
    let f = build_ptr_taker(&mb, "f", Linkage::External, Type::I8);
    build_ptr_taker(&mb, "g", Linkage::External, Type::I32);
    let mut module = mb.build();

    let stats = MergeFunc::new().run(&mut module);
    assert_eq!(stats.functions_merged, 1);
    assert_eq!(stats.thunks_created, 1);

    let thunk = find_func(&module, "g").expect("thunk carries g's name");
    module.func_store.view(thunk, |func| {
        let entry = func.layout.entry_block().unwrap();
        let mut insts = func.layout.iter_inst(entry);

        let cast = insts.next().unwrap();
        let InstData::Cast {
            code: CastOp::Bitcast,
            ..
        } = func.dfg.inst(cast)
        else {
            panic!("pointer argument should bitcast to the kept parameter type");
        };

        let call = insts.next().unwrap();
        let InstData::Call { callee, .. } = func.dfg.inst(call) else {
            panic!("cast feeds the forwarding call");
        };
        assert_eq!(*callee, SymbolRef::Func(f));
    });
}

#[test]
fn double_overridable_fold_creates_a_private_holder() {
    let mb = builder_for(test_isa());
    let f = build_strlen(&mb, "f", Linkage::Weak, false);
    let g = build_strlen(&mb, "g", Linkage::Weak, false);
    let mut module = mb.build();

    let stats = MergeFunc::new().run(&mut module);
    assert_eq!(stats.functions_merged, 1);
    assert_eq!(stats.functions_created, 1);
    assert_eq!(stats.aliases_created, 2);
    assert_eq!(stats.thunks_created, 0);

    assert!(!module.func_store.is_alive(g));
    module.func_store.view(f, |func| {
        assert_eq!(func.sig.name(), "f.merged");
        assert_eq!(func.sig.linkage(), Linkage::Private);
        assert!(func.unnamed_addr);
    });

    let mut aliases: Vec<(String, Linkage, FuncRef)> = module
        .aliases
        .iter()
        .map(|(_, data)| (data.name.to_string(), data.linkage, data.aliasee))
        .collect();
    aliases.sort();
    assert_eq!(
        aliases,
        vec![
            ("f".to_string(), Linkage::Weak, f),
            ("g".to_string(), Linkage::Weak, f),
        ]
    );
}

#[test]
fn double_overridable_without_aliases_redirects_calls_only() {
    let mb = builder_for(test_isa_no_aliases());
    let f = build_strlen(&mb, "f", Linkage::Weak, false);
    let g = build_strlen(&mb, "g", Linkage::Weak, false);
    let caller = build_caller(&mb, "caller", g);
    let mut module = mb.build();

    let stats = MergeFunc::new().run(&mut module);
    assert_eq!(stats.functions_merged, 1);
    assert_eq!(stats.functions_created, 1);
    assert_eq!(stats.aliases_created, 0);
    assert_eq!(stats.thunks_created, 0);

    // Both overridable definitions must survive; only direct calls moved.
    assert!(module.func_store.is_alive(f));
    assert!(module.func_store.is_alive(g));
    module.func_store.view(caller, |func| {
        let entry = func.layout.entry_block().unwrap();
        let call = func.layout.first_inst_of(entry).unwrap();
        let InstData::Call { callee, .. } = func.dfg.inst(call) else {
            panic!("caller body starts with its call");
        };
        assert_eq!(*callee, SymbolRef::Func(f));
    });
}

#[test]
fn strong_body_wins_over_overridable_candidates() {
    let mb = builder_for(test_isa());
    // Declaration order puts the weak functions first; the sub-pass split
    // must still keep the internal body as the merge target.
    let b = build_strlen(&mb, "b", Linkage::Weak, true);
    let c = build_strlen(&mb, "c", Linkage::Weak, true);
    let a = build_strlen(&mb, "a", Linkage::Internal, false);
    let mut module = mb.build();

    let stats = MergeFunc::new().run(&mut module);
    assert_eq!(stats.functions_merged, 2);
    assert_eq!(stats.aliases_created, 2);
    assert_eq!(stats.functions_created, 0);

    assert!(module.func_store.is_alive(a));
    assert!(!module.func_store.is_alive(b));
    assert!(!module.func_store.is_alive(c));

    for (_, alias) in module.aliases.iter() {
        assert_eq!(alias.aliasee, a);
        assert_eq!(alias.linkage, Linkage::Weak);
    }

    assert_linkage_discipline(&module);
}

#[test]
fn trivial_functions_are_not_merged() {
    let mb = builder_for(test_isa());
    for name in ["f", "g"] {
        let sig = Signature::new(name, Linkage::Internal, &[Type::I32], Type::I32);
        let func_ref = mb.declare_function(sig);
        let mut b = mb.func_builder(func_ref);
        let entry = b.append_block();
        b.switch_to_block(entry);
        let arg = b.args()[0];
        let one = b.make_imm_value(1i32);
        let sum = b.insert_inst(InstData::binary(BinaryOp::Add, arg, one), Type::I32);
        b.insert_inst_no_result(InstData::ret(Some(sum)));
        b.finish();
    }
    let mut module = mb.build();

    let stats = MergeFunc::new().run(&mut module);
    assert_eq!(stats.functions_merged, 0);
    assert_eq!(func_names(&module), vec!["f".to_string(), "g".to_string()]);
}

#[test]
fn back_edge_and_forward_edge_twins_do_not_merge() {
    // Block counts and per-block instructions agree pairwise; only the body
    // block's jump target differs, and that edge lands on a block the walk
    // has already paired. The loop must not fold into the straight-line
    // twin.
    let mb = builder_for(test_isa());
    build_loop_shape(&mb, "f", true);
    build_loop_shape(&mb, "g", false);
    let mut module = mb.build();

    let stats = MergeFunc::new().run(&mut module);
    assert_eq!(stats.functions_merged, 0);
    assert_eq!(func_names(&module), vec!["f".to_string(), "g".to_string()]);

    // Identical loop shapes still merge, so the rejection above is the
    // back-edge mismatch and nothing else.
    let mb = builder_for(test_isa());
    build_loop_shape(&mb, "f", true);
    build_loop_shape(&mb, "g", true);
    let mut module = mb.build();

    let stats = MergeFunc::new().run(&mut module);
    assert_eq!(stats.functions_merged, 1);
}

#[test]
fn mutually_recursive_twins_merge() {
    let mb = builder_for(test_isa());
    let f = build_self_recursive(&mb, "f");
    let g = build_self_recursive(&mb, "g");
    let mut module = mb.build();

    let stats = MergeFunc::new().run(&mut module);
    assert_eq!(stats.functions_merged, 1);
    assert!(module.func_store.is_alive(f));
    assert!(!module.func_store.is_alive(g));

    // The kept function still calls itself, not the erased twin.
    module.func_store.view(f, |func| {
        let entry = func.layout.entry_block().unwrap();
        let call = func.layout.first_inst_of(entry).unwrap();
        let InstData::Call { callee, .. } = func.dfg.inst(call) else {
            panic!("body starts with the recursive call");
        };
        assert_eq!(*callee, SymbolRef::Func(f));
    });
}

#[test]
fn disturbed_callers_are_requeued_and_merged() {
    let mb = builder_for(test_isa());
    // The callers are declared (and therefore probed) before their callees,
    // so the caller pair only becomes equivalent after the callee merge
    // rewrites a call site. The second caller must come back through the
    // deferred queue.
    let ptr_i8 = mb.ptr_type(Type::I8);
    let caller1 = mb.declare_function(Signature::new(
        "caller1",
        Linkage::Internal,
        &[ptr_i8],
        Type::I64,
    ));
    let caller2 = mb.declare_function(Signature::new(
        "caller2",
        Linkage::Internal,
        &[ptr_i8],
        Type::I64,
    ));
    let strlen1 = build_strlen(&mb, "strlen1", Linkage::Internal, false);
    let strlen2 = build_strlen(&mb, "strlen2", Linkage::Internal, false);

    for (caller, callee) in [(caller1, strlen1), (caller2, strlen2)] {
        let mut b = mb.func_builder(caller);
        let entry = b.append_block();
        b.switch_to_block(entry);
        let arg = b.args()[0];
        let v = b.insert_inst(
            InstData::call(SymbolRef::Func(callee), &[arg], Type::I64),
            Type::I64,
        );
        let one = b.make_imm_value(1i64);
        let w = b.insert_inst(InstData::binary(BinaryOp::Add, v, one), Type::I64);
        b.insert_inst_no_result(InstData::ret(Some(w)));
        b.finish();
    }

    let mut module = mb.build();
    let stats = MergeFunc::new().run(&mut module);

    // Both the callee pair and, transitively, the caller pair fold.
    assert_eq!(stats.functions_merged, 2);
    assert!(module.func_store.is_alive(caller1));
    assert!(!module.func_store.is_alive(caller2));
    assert!(!module.func_store.is_alive(strlen2));
}

#[test]
fn pass_is_deterministic_and_idempotent() {
    let build = || {
        let mb = builder_for(test_isa());
        build_strlen(&mb, "f", Linkage::External, false);
        build_strlen(&mb, "g", Linkage::External, false);
        build_ptr_taker(&mb, "p", Linkage::Internal, Type::I8);
        build_ptr_taker(&mb, "q", Linkage::Internal, Type::I32);
        build_self_recursive(&mb, "r");
        mb.build()
    };

    let mut first = build();
    let first_stats = MergeFunc::new().run(&mut first);
    let first_dump = ModuleWriter::new(&first).dump_string();

    let mut second = build();
    let second_stats = MergeFunc::new().run(&mut second);
    let second_dump = ModuleWriter::new(&second).dump_string();

    assert_eq!(first_stats, second_stats);
    assert_eq!(first_dump, second_dump);

    // A second run over already-merged output is a no-op.
    let rerun_stats = MergeFunc::new().run(&mut first);
    assert_eq!(rerun_stats, Default::default());
    assert_eq!(ModuleWriter::new(&first).dump_string(), first_dump);
}
