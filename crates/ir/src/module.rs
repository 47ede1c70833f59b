//! The Tessera IR module: a named collection of functions, global variables,
//! and symbol aliases, plus the shared module context.

use std::sync::{
    atomic::{AtomicU32, Ordering},
    Arc, RwLock,
};

use cranelift_entity::{entity_impl, PrimaryMap};
use dashmap::DashMap;
use smol_str::SmolStr;

use crate::{
    global_variable::GvStore,
    isa::TargetIsa,
    linkage::Visibility,
    types::TypeStore,
    value::AsmStore,
    Function, GlobalVariableRef, Linkage, Type,
};

#[derive(Debug)]
pub struct Module {
    /// Name of the translation unit.
    pub name: SmolStr,

    pub ctx: ModuleCtx,

    /// Holds all functions declared in the module.
    pub func_store: FuncStore,

    /// Symbol aliases created by transformations.
    pub aliases: AliasStore,
}

impl Module {
    pub fn new(name: &str, ctx: ModuleCtx) -> Self {
        Self {
            name: name.into(),
            ctx,
            func_store: FuncStore::new(),
            aliases: AliasStore::default(),
        }
    }

    /// All function refs in declaration order.
    pub fn funcs(&self) -> Vec<FuncRef> {
        self.func_store.funcs()
    }
}

/// Context shared across the functions of a module: target description and
/// the interned type, global-variable, and inline-asm stores.
#[derive(Debug, Clone)]
pub struct ModuleCtx {
    pub isa: TargetIsa,
    ty_store: Arc<RwLock<TypeStore>>,
    gv_store: Arc<RwLock<GvStore>>,
    asm_store: Arc<RwLock<AsmStore>>,
}

impl ModuleCtx {
    pub fn new(isa: TargetIsa) -> Self {
        Self {
            isa,
            ty_store: Arc::new(RwLock::new(TypeStore::default())),
            gv_store: Arc::new(RwLock::new(GvStore::default())),
            asm_store: Arc::new(RwLock::new(AsmStore::default())),
        }
    }

    pub fn with_ty_store<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&TypeStore) -> R,
    {
        f(&self.ty_store.read().unwrap())
    }

    pub fn with_ty_store_mut<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut TypeStore) -> R,
    {
        f(&mut self.ty_store.write().unwrap())
    }

    pub fn with_gv_store<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&GvStore) -> R,
    {
        f(&self.gv_store.read().unwrap())
    }

    pub fn with_gv_store_mut<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut GvStore) -> R,
    {
        f(&mut self.gv_store.write().unwrap())
    }

    pub fn with_asm_store<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&AsmStore) -> R,
    {
        f(&self.asm_store.read().unwrap())
    }

    pub fn with_asm_store_mut<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut AsmStore) -> R,
    {
        f(&mut self.asm_store.write().unwrap())
    }
}

/// An opaque reference to a module function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FuncRef(u32);
entity_impl!(FuncRef);

/// Function storage with stable refs. Removal leaves a tombstone, so a stale
/// [`FuncRef`] held by a worklist is detectably dead rather than dangling.
#[derive(Debug, Default)]
pub struct FuncStore {
    funcs: DashMap<FuncRef, Function>,
    next: AtomicU32,
}

impl FuncStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, func: Function) -> FuncRef {
        let func_ref = FuncRef::from_u32(self.next.fetch_add(1, Ordering::Relaxed));
        self.funcs.insert(func_ref, func);
        func_ref
    }

    /// `true` while the function has not been removed.
    pub fn is_alive(&self, func_ref: FuncRef) -> bool {
        self.funcs.contains_key(&func_ref)
    }

    pub fn view<F, R>(&self, func_ref: FuncRef, f: F) -> R
    where
        F: FnOnce(&Function) -> R,
    {
        let func = self
            .funcs
            .get(&func_ref)
            .unwrap_or_else(|| panic!("{func_ref:?} is dead"));
        f(&func)
    }

    pub fn try_view<F, R>(&self, func_ref: FuncRef, f: F) -> Option<R>
    where
        F: FnOnce(&Function) -> R,
    {
        let func = self.funcs.get(&func_ref)?;
        Some(f(&func))
    }

    pub fn modify<F, R>(&self, func_ref: FuncRef, f: F) -> R
    where
        F: FnOnce(&mut Function) -> R,
    {
        let mut func = self
            .funcs
            .get_mut(&func_ref)
            .unwrap_or_else(|| panic!("{func_ref:?} is dead"));
        f(&mut func)
    }

    pub fn update(&self, func_ref: FuncRef, func: Function) {
        self.funcs.insert(func_ref, func);
    }

    pub fn remove(&self, func_ref: FuncRef) -> Option<Function> {
        self.funcs.remove(&func_ref).map(|(_, func)| func)
    }

    /// All live function refs, sorted in declaration order.
    pub fn funcs(&self) -> Vec<FuncRef> {
        let mut refs: Vec<_> = self.funcs.iter().map(|entry| *entry.key()).collect();
        refs.sort_unstable();
        refs
    }

    pub fn len(&self) -> usize {
        self.funcs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.funcs.is_empty()
    }
}

/// A reference to any module-level symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolRef {
    Func(FuncRef),
    Gv(GlobalVariableRef),
    Alias(AliasRef),
}

/// An opaque reference to [`AliasData`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AliasRef(u32);
entity_impl!(AliasRef);

/// A symbol alias: another name for the storage of `aliasee`.
#[derive(Debug, Clone)]
pub struct AliasData {
    pub name: SmolStr,
    pub linkage: Linkage,
    pub visibility: Visibility,
    /// The type of the alias symbol itself (a function pointer type for
    /// function aliases).
    pub ty: Type,
    pub aliasee: FuncRef,
}

#[derive(Debug, Default)]
pub struct AliasStore {
    aliases: PrimaryMap<AliasRef, AliasData>,
}

impl AliasStore {
    pub fn make_alias(&mut self, data: AliasData) -> AliasRef {
        self.aliases.push(data)
    }

    pub fn alias_data(&self, alias: AliasRef) -> &AliasData {
        &self.aliases[alias]
    }

    pub fn alias_data_mut(&mut self, alias: AliasRef) -> &mut AliasData {
        &mut self.aliases[alias]
    }

    pub fn iter(&self) -> impl Iterator<Item = (AliasRef, &AliasData)> {
        self.aliases.iter()
    }

    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }
}
