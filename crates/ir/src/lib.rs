pub mod attributes;
pub mod builder;
pub mod dfg;
pub mod function;
pub mod global_variable;
pub mod inst;
pub mod ir_writer;
pub mod isa;
pub mod layout;
pub mod linkage;
pub mod module;
pub mod types;
pub mod value;

pub use attributes::{Attr, AttrSet, CallConv};
pub use builder::{FunctionBuilder, ModuleBuilder};
pub use dfg::{Block, BlockId, DataFlowGraph};
pub use function::{Function, Signature};
pub use global_variable::{GlobalVariableData, GlobalVariableRef, GvInitializer};
pub use inst::{InstData, InstId};
pub use layout::Layout;
pub use linkage::{Linkage, Visibility};
pub use module::{AliasData, AliasRef, FuncRef, Module, SymbolRef};
pub use types::{Type, TypeKind};
pub use value::{Immediate, Value, ValueId};
