//! This module contains the Tessera IR data flow graph.

use cranelift_entity::{entity_impl, packed_option::PackedOption, PrimaryMap, SecondaryMap};
use rustc_hash::FxHashMap;

use crate::{
    inst::{InstData, InstId},
    module::SymbolRef,
    value::{AsmRef, Immediate, Value, ValueId},
    Type,
};

/// Holds the values and instructions of a single function.
#[derive(Debug, Clone, Default)]
pub struct DataFlowGraph {
    #[doc(hidden)]
    pub blocks: PrimaryMap<BlockId, Block>,
    #[doc(hidden)]
    pub values: PrimaryMap<ValueId, Value>,
    insts: PrimaryMap<InstId, InstData>,
    inst_results: SecondaryMap<InstId, PackedOption<ValueId>>,
    immediates: FxHashMap<Immediate, ValueId>,
}

impl DataFlowGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn make_block(&mut self) -> BlockId {
        self.blocks.push(Block::new())
    }

    pub fn make_value(&mut self, value: Value) -> ValueId {
        self.values.push(value)
    }

    pub fn make_inst(&mut self, data: InstData) -> InstId {
        self.insts.push(data)
    }

    pub fn make_imm_value<Imm>(&mut self, imm: Imm) -> ValueId
    where
        Imm: Into<Immediate>,
    {
        let imm: Immediate = imm.into();
        if let Some(&value) = self.immediates.get(&imm) {
            return value;
        }

        let ty = imm.ty();
        let value = self.make_value(Value::Immediate { imm, ty });
        self.immediates.insert(imm, value);
        value
    }

    pub fn make_null_value(&mut self, ty: Type) -> ValueId {
        self.make_value(Value::Null { ty })
    }

    pub fn make_undef_value(&mut self, ty: Type) -> ValueId {
        self.make_value(Value::Undef { ty })
    }

    /// A value holding the address of a module-level symbol.
    pub fn make_sym_value(&mut self, sym: SymbolRef, ty: Type) -> ValueId {
        self.make_value(Value::Sym { sym, ty })
    }

    pub fn make_asm_value(&mut self, asm: AsmRef, ty: Type) -> ValueId {
        self.make_value(Value::Asm { asm, ty })
    }

    pub fn make_arg_value(&mut self, ty: Type, idx: usize) -> ValueId {
        self.make_value(Value::Arg { ty, idx })
    }

    pub fn attach_result(&mut self, inst: InstId, value: ValueId) {
        debug_assert!(self.inst_results[inst].is_none());
        self.inst_results[inst] = value.into();
    }

    pub fn inst(&self, inst: InstId) -> &InstData {
        &self.insts[inst]
    }

    pub fn inst_mut(&mut self, inst: InstId) -> &mut InstData {
        &mut self.insts[inst]
    }

    pub fn value(&self, value: ValueId) -> &Value {
        &self.values[value]
    }

    pub fn value_ty(&self, value: ValueId) -> Type {
        self.values[value].ty()
    }

    pub fn inst_result(&self, inst: InstId) -> Option<ValueId> {
        self.inst_results[inst].expand()
    }

    pub fn inst_result_ty(&self, inst: InstId) -> Option<Type> {
        self.inst_result(inst).map(|value| self.value_ty(value))
    }

    pub fn is_terminator(&self, inst: InstId) -> bool {
        self.insts[inst].is_terminator()
    }

    pub fn values(&self) -> impl Iterator<Item = (ValueId, &Value)> {
        self.values.iter()
    }
}

/// An opaque reference to [`Block`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(pub u32);
entity_impl!(BlockId, "block");

/// A block data definition. Block contents and ordering are managed by
/// [`crate::Layout`].
#[derive(Debug, Clone, Default)]
pub struct Block {}

impl Block {
    pub fn new() -> Self {
        Self::default()
    }
}
