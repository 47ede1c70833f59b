mod func_builder;
mod module_builder;

pub use func_builder::FunctionBuilder;
pub use module_builder::ModuleBuilder;

pub mod test_util {
    use super::*;

    use crate::{
        isa::{TargetIsa, TargetTriple},
        module::{FuncRef, ModuleCtx},
        ir_writer::FuncWriter,
        Linkage, Module, Signature, Type,
    };

    /// An alias-capable 64-bit target.
    pub fn test_isa() -> TargetIsa {
        TargetIsa::new("x86_64-linux".parse::<TargetTriple>().unwrap())
    }

    /// A target whose object format has no symbol aliases.
    pub fn test_isa_no_aliases() -> TargetIsa {
        TargetIsa::new("aarch64-darwin".parse::<TargetTriple>().unwrap())
    }

    pub fn test_module_builder() -> ModuleBuilder {
        ModuleBuilder::new(ModuleCtx::new(test_isa()))
    }

    pub fn test_func_builder(
        mb: &ModuleBuilder,
        args: &[Type],
        ret_ty: Type,
    ) -> FunctionBuilder {
        let sig = Signature::new("test_func", Linkage::Private, args, ret_ty);
        let func_ref = mb.declare_function(sig);
        mb.func_builder(func_ref)
    }

    pub fn dump_func(module: &Module, func_ref: FuncRef) -> String {
        module.func_store.view(func_ref, |func| {
            FuncWriter::new(func, module).dump_string()
        })
    }
}
