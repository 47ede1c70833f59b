//! Folds functions that would compile to identical machine code.
//!
//! A coarse fingerprint buckets candidates; bucket collisions run the full
//! function comparator, and confirmed pairs are merged by redirecting call
//! sites, installing a forwarding thunk, or emitting a symbol alias,
//! depending on linkage and on whether the target object format has aliases.
//! Merging disturbs the functions that referred to the replaced symbol, so
//! those are queued up and examined again until nothing changes.

mod comparator;
mod fingerprint;
mod fn_set;
mod rewriter;

pub use comparator::{compare_funcs, FunctionComparator};
pub use fingerprint::fingerprint;
pub use fn_set::FnSet;

use log::{debug, trace};
use tessera_ir::{module::FuncRef, Linkage, Module};

/// Counters reported by a [`MergeFunc`] run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    /// Number of functions merged.
    pub functions_merged: usize,
    /// Number of thunks generated.
    pub thunks_created: usize,
    /// Number of aliases generated.
    pub aliases_created: usize,
    /// Number of new functions created.
    pub functions_created: usize,
}

/// The function-merging pass.
#[derive(Debug, Default)]
pub struct MergeFunc {
    /// Functions that may have been disturbed by a merge and must be
    /// examined again. Entries may be dead by the time they are popped;
    /// dead refs are skipped, never followed.
    deferred: Vec<FuncRef>,

    /// The set of distinct function bodies seen so far.
    fn_set: FnSet,

    stats: MergeStats,
}

impl MergeFunc {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run the pass over `module` until no merge opportunity remains.
    pub fn run(&mut self, module: &mut Module) -> MergeStats {
        self.stats = MergeStats::default();

        for func_ref in module.funcs() {
            if is_candidate(module, func_ref) {
                self.deferred.push(func_ref);
            }
        }

        while !self.deferred.is_empty() {
            let worklist = std::mem::take(&mut self.deferred);
            debug!("merge round over {} candidates", worklist.len());

            // Non-overridable candidates go first so that strong bodies win
            // as merge targets; overridable candidates then thunk or alias
            // to them.
            for overridable in [false, true] {
                for &func_ref in &worklist {
                    if !module.func_store.is_alive(func_ref) {
                        continue;
                    }
                    if !is_candidate(module, func_ref) {
                        continue;
                    }
                    let linkage = module
                        .func_store
                        .view(func_ref, |func| func.sig.linkage());
                    if linkage.is_overridable() != overridable {
                        continue;
                    }

                    self.probe(module, func_ref);
                }
            }
        }

        self.fn_set.clear();
        self.stats
    }

    /// Insert `func_ref` into the candidate set, or merge it away when an
    /// equivalent body is already present. Returns whether a merge happened.
    fn probe(&mut self, module: &mut Module, func_ref: FuncRef) -> bool {
        let hash = module
            .func_store
            .view(func_ref, |func| fingerprint(&module.ctx, func));

        let Some(kept) = self.fn_set.insert_or_find(module, func_ref, hash) else {
            trace!("inserted as unique: {func_ref:?}");
            return false;
        };

        // The rewrite overhead outweighs the savings on tiny bodies.
        let tiny = module.func_store.view(func_ref, |func| {
            func.layout.block_count() == 1
                && func
                    .layout
                    .inst_count_of(func.layout.entry_block().unwrap())
                    <= 2
        });
        if tiny {
            debug!("{func_ref:?} is too small to bother merging");
            return false;
        }

        let kept_overridable = module
            .func_store
            .view(kept, |func| func.sig.linkage().is_overridable());
        let new_overridable = module
            .func_store
            .view(func_ref, |func| func.sig.linkage().is_overridable());
        assert!(
            !kept_overridable || new_overridable,
            "an overridable body must never be kept for a non-overridable candidate"
        );

        let (kept_name, merged_name) = (
            module.func_store.view(kept, |f| f.sig.name().to_string()),
            module
                .func_store
                .view(func_ref, |f| f.sig.name().to_string()),
        );
        debug!("merging %{merged_name} into %{kept_name}");

        self.merge_two_functions(module, kept, func_ref);
        true
    }

    /// Drop `func_ref` from the candidate set, queueing it for another sweep
    /// of analysis. Called when a function's body is about to change.
    fn remove(&mut self, func_ref: FuncRef) {
        if self.fn_set.remove(func_ref) {
            trace!("removed {func_ref:?} from the set and deferred it");
            self.deferred.push(func_ref);
        }
    }
}

fn is_candidate(module: &Module, func_ref: FuncRef) -> bool {
    module.func_store.view(func_ref, |func| {
        !func.is_declaration() && func.sig.linkage() != Linkage::AvailableExternally
    })
}
