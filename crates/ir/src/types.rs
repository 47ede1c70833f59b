//! This module contains Tessera IR types definitions.

use cranelift_entity::PrimaryMap;
use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use smol_str::SmolStr;

/// Interns compound types so that structurally equal compounds share a
/// [`CompoundTypeRef`]. Refs are stable for the lifetime of the store, which
/// makes them usable as an ordering tiebreaker.
#[derive(Debug, Default)]
pub struct TypeStore {
    compounds: PrimaryMap<CompoundTypeRef, CompoundType>,
    rev_types: FxHashMap<CompoundType, CompoundTypeRef>,
    struct_types: IndexMap<SmolStr, CompoundTypeRef>,
}

impl TypeStore {
    /// Returns a pointer type in the default address space.
    pub fn make_ptr(&mut self, base: Type) -> Type {
        self.make_ptr_in(base, 0)
    }

    pub fn make_ptr_in(&mut self, base: Type, addr_space: u32) -> Type {
        let cmpd = self.make_compound(CompoundType::Ptr { base, addr_space });
        Type::Compound(cmpd)
    }

    pub fn make_array(&mut self, elem: Type, len: usize) -> Type {
        let cmpd = self.make_compound(CompoundType::Array { elem, len });
        Type::Compound(cmpd)
    }

    pub fn make_vector(&mut self, elem: Type, len: usize) -> Type {
        let cmpd = self.make_compound(CompoundType::Vector { elem, len });
        Type::Compound(cmpd)
    }

    pub fn make_struct(&mut self, name: &str, fields: &[Type], packed: bool) -> Type {
        let cmpd = self.make_compound(CompoundType::Struct(StructData {
            name: name.into(),
            fields: fields.to_vec(),
            packed,
        }));
        Type::Compound(cmpd)
    }

    pub fn make_func(&mut self, args: &[Type], ret_ty: Type, variadic: bool) -> Type {
        let cmpd = self.make_compound(CompoundType::Func {
            args: args.into(),
            ret_ty,
            variadic,
        });
        Type::Compound(cmpd)
    }

    pub fn make_compound(&mut self, data: CompoundType) -> CompoundTypeRef {
        if let Some(&cmpd) = self.rev_types.get(&data) {
            return cmpd;
        }

        let cmpd = self.compounds.push(data.clone());
        if let CompoundType::Struct(s) = &data {
            let name = &s.name;
            assert!(
                !self.struct_types.contains_key(name),
                "struct {name} is already defined"
            );
            self.struct_types.insert(name.clone(), cmpd);
        }
        self.rev_types.insert(data, cmpd);
        cmpd
    }

    pub fn resolve_compound(&self, cmpd: CompoundTypeRef) -> &CompoundType {
        &self.compounds[cmpd]
    }

    /// Returns the pointee type if `ptr` is a pointer type.
    pub fn deref(&self, ptr: Type) -> Option<Type> {
        match ptr {
            Type::Compound(cmpd) => match self.compounds[cmpd] {
                CompoundType::Ptr { base, .. } => Some(base),
                _ => None,
            },
            _ => None,
        }
    }

    pub fn ptr_addr_space(&self, ty: Type) -> Option<u32> {
        match ty {
            Type::Compound(cmpd) => match self.compounds[cmpd] {
                CompoundType::Ptr { addr_space, .. } => Some(addr_space),
                _ => None,
            },
            _ => None,
        }
    }

    pub fn is_ptr(&self, ty: Type) -> bool {
        self.ptr_addr_space(ty).is_some()
    }

    pub fn struct_def(&self, ty: Type) -> Option<&StructData> {
        match ty {
            Type::Compound(cmpd) => match &self.compounds[cmpd] {
                CompoundType::Struct(def) => Some(def),
                _ => None,
            },
            _ => None,
        }
    }

    pub fn lookup_struct(&self, name: &str) -> Option<CompoundTypeRef> {
        self.struct_types.get(name).copied()
    }

    pub fn all_struct_data(&self) -> impl Iterator<Item = &StructData> {
        self.struct_types
            .values()
            .map(|cmpd| match &self.compounds[*cmpd] {
                CompoundType::Struct(def) => def,
                _ => unreachable!(),
            })
    }

    /// The kind tag of `ty`, used for kind-ordered comparisons.
    pub fn kind(&self, ty: Type) -> TypeKind {
        match ty {
            Type::Unit => TypeKind::Unit,
            Type::F32 => TypeKind::F32,
            Type::F64 => TypeKind::F64,
            Type::I1 | Type::I8 | Type::I16 | Type::I32 | Type::I64 | Type::I128 => TypeKind::Int,
            Type::Compound(cmpd) => match self.compounds[cmpd] {
                CompoundType::Ptr { .. } => TypeKind::Ptr,
                CompoundType::Vector { .. } => TypeKind::Vector,
                CompoundType::Struct(_) => TypeKind::Struct,
                CompoundType::Array { .. } => TypeKind::Array,
                CompoundType::Func { .. } => TypeKind::Func,
            },
        }
    }
}

/// Tessera IR types definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Type {
    I1,
    I8,
    I16,
    I32,
    I64,
    I128,
    F32,
    F64,
    Compound(CompoundTypeRef),
    #[default]
    Unit,
}

impl Type {
    pub fn is_integral(self) -> bool {
        matches!(
            self,
            Self::I1 | Self::I8 | Self::I16 | Self::I32 | Self::I64 | Self::I128
        )
    }

    pub fn is_float(self) -> bool {
        matches!(self, Self::F32 | Self::F64)
    }

    pub fn is_unit(self) -> bool {
        matches!(self, Self::Unit)
    }

    /// Bit width of an integral or floating-point type.
    pub fn bit_width(self) -> Option<u32> {
        match self {
            Self::I1 => Some(1),
            Self::I8 => Some(8),
            Self::I16 => Some(16),
            Self::I32 => Some(32),
            Self::F32 => Some(32),
            Self::I64 => Some(64),
            Self::F64 => Some(64),
            Self::I128 => Some(128),
            Self::Compound(_) | Self::Unit => None,
        }
    }
}

/// An opaque reference to [`CompoundType`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CompoundTypeRef(u32);
cranelift_entity::entity_impl!(CompoundTypeRef);

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CompoundType {
    Ptr {
        base: Type,
        addr_space: u32,
    },
    Array {
        elem: Type,
        len: usize,
    },
    Vector {
        elem: Type,
        len: usize,
    },
    Struct(StructData),
    Func {
        args: SmallVec<[Type; 8]>,
        ret_ty: Type,
        variadic: bool,
    },
}

impl CompoundType {
    pub fn is_ptr(&self) -> bool {
        matches!(self, Self::Ptr { .. })
    }

    pub fn is_struct(&self) -> bool {
        matches!(self, Self::Struct(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StructData {
    pub name: SmolStr,
    pub fields: Vec<Type>,
    pub packed: bool,
}

/// Type kind tags. The numeric order of the tags defines the first stage of
/// the total order over types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum TypeKind {
    Unit,
    F32,
    F64,
    Int,
    Ptr,
    Vector,
    Struct,
    Array,
    Func,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compound_interning() {
        let mut store = TypeStore::default();
        let p1 = store.make_ptr(Type::I8);
        let p2 = store.make_ptr(Type::I8);
        assert_eq!(p1, p2);

        let p3 = store.make_ptr(Type::I32);
        assert_ne!(p1, p3);

        assert_eq!(store.deref(p3), Some(Type::I32));
        assert_eq!(store.ptr_addr_space(p1), Some(0));
    }

    #[test]
    fn addr_space_distinguishes_pointers() {
        let mut store = TypeStore::default();
        let p0 = store.make_ptr_in(Type::I8, 0);
        let p1 = store.make_ptr_in(Type::I8, 1);
        assert_ne!(p0, p1);
        assert_eq!(store.ptr_addr_space(p1), Some(1));
    }

    #[test]
    fn kind_tags() {
        let mut store = TypeStore::default();
        let ptr = store.make_ptr(Type::I8);
        let arr = store.make_array(Type::I32, 4);
        assert_eq!(store.kind(Type::I64), TypeKind::Int);
        assert_eq!(store.kind(ptr), TypeKind::Ptr);
        assert_eq!(store.kind(arr), TypeKind::Array);
        assert!(TypeKind::Int < TypeKind::Ptr);
    }
}
