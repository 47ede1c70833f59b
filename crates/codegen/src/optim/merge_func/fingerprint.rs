//! Coarse signature-level hash used to bucket merge candidates.

use std::hash::{Hash, Hasher};

use rustc_hash::FxHasher;
use tessera_ir::{module::ModuleCtx, types::TypeKind, Function};

/// A hash that is equal for any two functions the full comparator could deem
/// equivalent: block count, calling convention, GC presence, variadic flag,
/// and the kind of the return and parameter types. Pointer kinds hash as the
/// integer kind, matching the comparator's pointer relaxation. The hash need
/// not distinguish non-equivalent functions.
pub fn fingerprint(ctx: &ModuleCtx, func: &Function) -> u64 {
    let mut state = FxHasher::default();

    func.layout.block_count().hash(&mut state);
    func.sig.cc().hash(&mut state);
    func.gc.is_some().hash(&mut state);
    func.sig.variadic().hash(&mut state);

    ctx.with_ty_store(|store| {
        kind_for_hash(store.kind(func.sig.ret_ty())).hash(&mut state);
        for &arg in func.sig.args() {
            kind_for_hash(store.kind(arg)).hash(&mut state);
        }
    });

    state.finish()
}

fn kind_for_hash(kind: TypeKind) -> TypeKind {
    if kind == TypeKind::Ptr {
        TypeKind::Int
    } else {
        kind
    }
}
