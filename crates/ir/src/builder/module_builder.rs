use std::sync::Arc;

use dashmap::DashMap;
use smol_str::SmolStr;

use super::FunctionBuilder;
use crate::{
    global_variable::{GlobalVariableData, GlobalVariableRef},
    module::{AliasStore, FuncRef, FuncStore, ModuleCtx},
    Function, Module, Signature, Type,
};

#[derive(Clone)]
pub struct ModuleBuilder {
    pub func_store: Arc<FuncStore>,

    pub ctx: ModuleCtx,

    name: SmolStr,

    /// Map function name -> FuncRef to avoid duplicated declaration.
    declared_funcs: Arc<DashMap<SmolStr, FuncRef>>,
}

impl ModuleBuilder {
    pub fn new(ctx: ModuleCtx) -> Self {
        Self::with_name("module", ctx)
    }

    pub fn with_name(name: &str, ctx: ModuleCtx) -> Self {
        Self {
            func_store: Arc::new(FuncStore::new()),
            ctx,
            name: name.into(),
            declared_funcs: Arc::new(DashMap::default()),
        }
    }

    pub fn declare_function(&self, sig: Signature) -> FuncRef {
        if let Some(func_ref) = self.declared_funcs.get(sig.name()) {
            *func_ref
        } else {
            let name: SmolStr = sig.name().into();
            let func = Function::new(sig);
            let func_ref = self.func_store.insert(func);
            self.declared_funcs.insert(name, func_ref);
            func_ref
        }
    }

    pub fn lookup_func(&self, name: &str) -> Option<FuncRef> {
        self.declared_funcs.get(name).map(|func_ref| *func_ref)
    }

    pub fn sig<F, R>(&self, func_ref: FuncRef, f: F) -> R
    where
        F: FnOnce(&Signature) -> R,
    {
        self.func_store.view(func_ref, |func| f(&func.sig))
    }

    pub fn make_global(&self, global: GlobalVariableData) -> GlobalVariableRef {
        self.ctx.with_gv_store_mut(|s| s.make_gv(global))
    }

    pub fn lookup_global(&self, name: &str) -> Option<GlobalVariableRef> {
        self.ctx.with_gv_store(|s| s.gv_by_symbol(name))
    }

    pub fn declare_struct_type(&self, name: &str, fields: &[Type], packed: bool) -> Type {
        self.ctx
            .with_ty_store_mut(|s| s.make_struct(name, fields, packed))
    }

    pub fn declare_array_type(&self, elem: Type, len: usize) -> Type {
        self.ctx.with_ty_store_mut(|s| s.make_array(elem, len))
    }

    pub fn ptr_type(&self, ty: Type) -> Type {
        self.ctx.with_ty_store_mut(|s| s.make_ptr(ty))
    }

    pub fn func_builder(&self, func_ref: FuncRef) -> FunctionBuilder {
        FunctionBuilder::new(self.clone(), func_ref)
    }

    pub fn build(self) -> Module {
        Module {
            name: self.name,
            ctx: self.ctx,
            func_store: Arc::into_inner(self.func_store).unwrap(),
            aliases: AliasStore::default(),
        }
    }
}
