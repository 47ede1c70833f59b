use super::ModuleBuilder;
use crate::{
    inst::{InstData, InstId},
    module::{FuncRef, SymbolRef},
    value::Immediate,
    BlockId, Function, Type, Value, ValueId,
};

/// Builds one function body by appending blocks and instructions. Call
/// [`FunctionBuilder::finish`] to write the body back to the module.
pub struct FunctionBuilder {
    pub module_builder: ModuleBuilder,
    pub func: Function,
    func_ref: FuncRef,
    current: Option<BlockId>,
}

impl FunctionBuilder {
    pub fn new(module_builder: ModuleBuilder, func_ref: FuncRef) -> Self {
        let func = module_builder
            .func_store
            .view(func_ref, |func| Function::new(func.sig.clone()));

        Self {
            module_builder,
            func,
            func_ref,
            current: None,
        }
    }

    pub fn finish(self) {
        if cfg!(debug_assertions) {
            for block in self.func.layout.iter_block() {
                let last = self.func.layout.last_inst_of(block);
                debug_assert!(
                    last.is_some_and(|inst| self.func.dfg.is_terminator(inst)),
                    "`{block}` is not terminated"
                );
            }
        }

        let Self {
            module_builder,
            func,
            func_ref,
            ..
        } = self;

        module_builder.func_store.update(func_ref, func);
    }

    pub fn func_ref(&self) -> FuncRef {
        self.func_ref
    }

    pub fn append_block(&mut self) -> BlockId {
        let block = self.func.dfg.make_block();
        self.func.layout.append_block(block);
        block
    }

    pub fn switch_to_block(&mut self, block: BlockId) {
        self.current = Some(block);
    }

    pub fn current_block(&self) -> Option<BlockId> {
        self.current
    }

    pub fn make_imm_value<Imm>(&mut self, imm: Imm) -> ValueId
    where
        Imm: Into<Immediate>,
    {
        self.func.dfg.make_imm_value(imm)
    }

    pub fn make_null_value(&mut self, ty: Type) -> ValueId {
        self.func.dfg.make_null_value(ty)
    }

    pub fn make_undef_value(&mut self, ty: Type) -> ValueId {
        self.func.dfg.make_undef_value(ty)
    }

    /// The address of a module symbol, typed as a pointer to `ty`.
    pub fn make_sym_value(&mut self, sym: SymbolRef, ty: Type) -> ValueId {
        let ptr_ty = self.ptr_type(ty);
        self.func.dfg.make_sym_value(sym, ptr_ty)
    }

    /// Inserts an instruction at the current position and creates a result
    /// value of type `ret_ty` for it.
    pub fn insert_inst(&mut self, data: InstData, ret_ty: Type) -> ValueId {
        let inst = self.append_inst(data);

        let result = self.func.dfg.make_value(Value::Inst { inst, ty: ret_ty });
        self.func.dfg.attach_result(inst, result);
        result
    }

    /// Inserts an instruction that has no result value.
    pub fn insert_inst_no_result(&mut self, data: InstData) {
        self.append_inst(data);
    }

    pub fn append_phi_arg(&mut self, phi_result: ValueId, value: ValueId, block: BlockId) {
        let Value::Inst { inst, .. } = *self.func.dfg.value(phi_result) else {
            panic!("`phi_result` is not an instruction result");
        };
        self.func.dfg.inst_mut(inst).append_phi_arg(value, block);
    }

    pub fn ptr_type(&mut self, ty: Type) -> Type {
        self.module_builder.ptr_type(ty)
    }

    pub fn args(&self) -> &[ValueId] {
        &self.func.arg_values
    }

    pub fn type_of(&self, value: ValueId) -> Type {
        self.func.dfg.value_ty(value)
    }

    fn append_inst(&mut self, data: InstData) -> InstId {
        let block = self
            .current
            .expect("no block is selected; call `switch_to_block`");
        let inst = self.func.dfg.make_inst(data);
        self.func.layout.append_inst(inst, block);
        inst
    }
}
