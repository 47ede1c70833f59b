use smallvec::SmallVec;
use smol_str::SmolStr;

use crate::{
    attributes::{AttrSet, CallConv},
    linkage::Visibility,
    types::TypeStore,
    DataFlowGraph, Layout, Linkage, Type, ValueId,
};

/// A function definition or declaration. A function without layout blocks is
/// a declaration.
#[derive(Debug, Clone)]
pub struct Function {
    /// Signature of the function.
    pub sig: Signature,
    pub arg_values: SmallVec<[ValueId; 8]>,

    pub dfg: DataFlowGraph,
    pub layout: Layout,

    pub attrs: AttrSet,
    /// Object section the definition is placed in, if pinned.
    pub section: Option<SmolStr>,
    /// Garbage-collection strategy, if the function uses one.
    pub gc: Option<SmolStr>,
    pub visibility: Visibility,
    /// The symbol's address is not observable; the definition may be freely
    /// replaced by an equal one.
    pub unnamed_addr: bool,
    pub alignment: u32,
}

impl Function {
    pub fn new(sig: Signature) -> Self {
        let mut dfg = DataFlowGraph::new();
        let arg_values = sig
            .args()
            .iter()
            .enumerate()
            .map(|(idx, arg_ty)| dfg.make_arg_value(*arg_ty, idx))
            .collect();

        Self {
            sig,
            arg_values,
            dfg,
            layout: Layout::default(),
            attrs: AttrSet::default(),
            section: None,
            gc: None,
            visibility: Visibility::default(),
            unnamed_addr: false,
            alignment: 0,
        }
    }

    pub fn is_declaration(&self) -> bool {
        self.layout.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    /// Name of the function.
    name: SmolStr,

    /// Linkage of the function.
    linkage: Linkage,

    cc: CallConv,
    args: SmallVec<[Type; 8]>,
    ret_ty: Type,
    variadic: bool,
}

impl Signature {
    pub fn new(name: &str, linkage: Linkage, args: &[Type], ret_ty: Type) -> Self {
        Self {
            name: name.into(),
            linkage,
            cc: CallConv::default(),
            args: args.into(),
            ret_ty,
            variadic: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: &str) {
        self.name = name.into();
    }

    pub fn linkage(&self) -> Linkage {
        self.linkage
    }

    pub fn set_linkage(&mut self, linkage: Linkage) {
        self.linkage = linkage;
    }

    pub fn cc(&self) -> CallConv {
        self.cc
    }

    pub fn set_cc(&mut self, cc: CallConv) {
        self.cc = cc;
    }

    pub fn args(&self) -> &[Type] {
        &self.args
    }

    pub fn ret_ty(&self) -> Type {
        self.ret_ty
    }

    pub fn variadic(&self) -> bool {
        self.variadic
    }

    pub fn set_variadic(&mut self, variadic: bool) {
        self.variadic = variadic;
    }

    /// The function's type as a module type; a pointer to this type is the
    /// type of the function's address.
    pub fn func_ty(&self, store: &mut TypeStore) -> Type {
        store.make_func(&self.args, self.ret_ty, self.variadic)
    }
}
