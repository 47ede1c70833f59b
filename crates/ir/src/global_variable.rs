//! Module-level global variables.

use cranelift_entity::PrimaryMap;
use rustc_hash::FxHashMap;
use smol_str::SmolStr;

use crate::{value::Immediate, Linkage, Type};

/// An opaque reference to [`GlobalVariableData`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GlobalVariableRef(u32);
cranelift_entity::entity_impl!(GlobalVariableRef);

#[derive(Debug, Clone)]
pub struct GlobalVariableData {
    pub symbol: SmolStr,
    pub ty: Type,
    pub linkage: Linkage,
    pub is_const: bool,
    pub init: Option<GvInitializer>,
}

#[derive(Debug, Clone)]
pub enum GvInitializer {
    Immediate(Immediate),
    Zeroed,
    Array(Vec<GvInitializer>),
}

#[derive(Debug, Default)]
pub struct GvStore {
    gvs: PrimaryMap<GlobalVariableRef, GlobalVariableData>,
    symbols: FxHashMap<SmolStr, GlobalVariableRef>,
}

impl GvStore {
    pub fn make_gv(&mut self, gv: GlobalVariableData) -> GlobalVariableRef {
        assert!(
            !self.symbols.contains_key(&gv.symbol),
            "global {} is already defined",
            gv.symbol
        );

        let symbol = gv.symbol.clone();
        let gv_ref = self.gvs.push(gv);
        self.symbols.insert(symbol, gv_ref);
        gv_ref
    }

    pub fn gv_data(&self, gv: GlobalVariableRef) -> &GlobalVariableData {
        &self.gvs[gv]
    }

    pub fn ty(&self, gv: GlobalVariableRef) -> Type {
        self.gvs[gv].ty
    }

    pub fn gv_by_symbol(&self, symbol: &str) -> Option<GlobalVariableRef> {
        self.symbols.get(symbol).copied()
    }

    pub fn all_gv_data(&self) -> impl Iterator<Item = &GlobalVariableData> {
        self.gvs.values()
    }
}
