//! Module-level optimization passes.

pub mod merge_func;

pub use merge_func::{MergeFunc, MergeStats};

use tessera_ir::Module;

/// How a registered pass runs.
pub enum PassRunner {
    /// A transformation over the whole module. Returns whether the module
    /// changed.
    ModuleTransform(fn(&mut Module) -> bool),
}

/// A registered pass: identifier, human label, and the behavior flags
/// consumed by the hosting pass manager.
pub struct Pass {
    pub name: &'static str,
    pub descr: &'static str,
    /// Whether running the pass can change any function's control flow
    /// graph.
    pub modifies_cfg: bool,
    /// Whether analyses computed before the pass remain valid afterwards.
    pub preserves_analyses: bool,
    pub runner: PassRunner,
}

/// The function-merging pass.
pub fn create_merge_func_pass() -> Pass {
    Pass {
        name: "mergefunc",
        descr: "Merge Functions",
        modifies_cfg: false,
        preserves_analyses: false,
        runner: PassRunner::ModuleTransform(run_merge_func),
    }
}

fn run_merge_func(module: &mut Module) -> bool {
    MergeFunc::new().run(module).functions_merged > 0
}
