//! Text form rendering for modules and functions. The output is stable for a
//! given module, so dumps are usable for golden and idempotence tests.

use std::fmt::Write;

use crate::{
    inst::{ArithFlags, InstData, InstId, MemOrdering, SyncScope},
    module::{ModuleCtx, SymbolRef},
    types::CompoundType,
    value::Value,
    CallConv, Function, Module, Type, ValueId,
};

pub struct ModuleWriter<'a> {
    module: &'a Module,
}

impl<'a> ModuleWriter<'a> {
    pub fn new(module: &'a Module) -> Self {
        Self { module }
    }

    pub fn dump_string(&self) -> String {
        let mut w = String::new();
        writeln!(w, "module @{}", self.module.name).unwrap();
        writeln!(w, "target = \"{}\"", self.module.ctx.isa.triple()).unwrap();

        self.module.ctx.with_ty_store(|s| {
            for def in s.all_struct_data() {
                let mut fields = String::new();
                for (i, field) in def.fields.iter().enumerate() {
                    if i != 0 {
                        fields.push_str(", ");
                    }
                    fields.push_str(&display_type_with(*field, s));
                }
                if def.packed {
                    writeln!(w, "type @{} = <{{{fields}}}>;", def.name).unwrap();
                } else {
                    writeln!(w, "type @{} = {{{fields}}};", def.name).unwrap();
                }
            }
        });

        self.module.ctx.with_gv_store(|s| {
            for gv in s.all_gv_data() {
                writeln!(
                    w,
                    "gv {} %{}: {};",
                    gv.linkage,
                    gv.symbol,
                    display_type(gv.ty, &self.module.ctx)
                )
                .unwrap();
            }
        });

        for func_ref in self.module.funcs() {
            w.push('\n');
            self.module.func_store.view(func_ref, |func| {
                w.push_str(&FuncWriter::new(func, self.module).dump_string());
            });
        }

        for (_, alias) in self.module.aliases.iter() {
            let target = self
                .module
                .func_store
                .view(alias.aliasee, |func| func.sig.name().to_string());
            writeln!(w, "\nalias {} %{} = %{};", alias.linkage, alias.name, target).unwrap();
        }

        w
    }
}

pub struct FuncWriter<'a> {
    func: &'a Function,
    module: &'a Module,
}

impl<'a> FuncWriter<'a> {
    pub fn new(func: &'a Function, module: &'a Module) -> Self {
        Self { func, module }
    }

    pub fn dump_string(&self) -> String {
        let mut w = String::new();
        let sig = &self.func.sig;
        let ctx = &self.module.ctx;

        if self.func.is_declaration() {
            let mut params = String::new();
            for (i, ty) in sig.args().iter().enumerate() {
                if i != 0 {
                    params.push_str(", ");
                }
                params.push_str(&display_type(*ty, ctx));
            }
            writeln!(
                w,
                "func {} %{}({params}) -> {};",
                sig.linkage(),
                sig.name(),
                display_type(sig.ret_ty(), ctx)
            )
            .unwrap();
            return w;
        }

        let mut params = String::new();
        for (i, value) in self.func.arg_values.iter().enumerate() {
            if i != 0 {
                params.push_str(", ");
            }
            let ty = self.func.dfg.value_ty(*value);
            write!(params, "v{}.{}", value.0, display_type(ty, ctx)).unwrap();
        }

        writeln!(
            w,
            "func {} %{}({params}) -> {} {{",
            sig.linkage(),
            sig.name(),
            display_type(sig.ret_ty(), ctx)
        )
        .unwrap();

        let mut first = true;
        for block in self.func.layout.iter_block() {
            if !first {
                w.push('\n');
            }
            first = false;

            writeln!(w, "    {block}:").unwrap();
            for inst in self.func.layout.iter_inst(block) {
                writeln!(w, "        {}", self.render_inst(inst)).unwrap();
            }
        }

        w.push_str("}\n");
        w
    }

    fn render_inst(&self, inst: InstId) -> String {
        let mut line = String::new();
        if let Some(result) = self.func.dfg.inst_result(inst) {
            let ty = self.func.dfg.value_ty(result);
            write!(
                line,
                "v{}.{} = ",
                result.0,
                display_type(ty, &self.module.ctx)
            )
            .unwrap();
        }
        line.push_str(&self.render_inst_data(self.func.dfg.inst(inst)));
        line.push(';');
        line
    }

    fn render_inst_data(&self, data: &InstData) -> String {
        use InstData::*;

        match data {
            Unary { code, args } => format!("{code} {}", self.value(args[0])),
            Binary { code, args, flags } => format!(
                "{code}{} {} {}",
                render_flags(*flags),
                self.value(args[0]),
                self.value(args[1])
            ),
            Cmp { code, args } => {
                format!("cmp {code} {} {}", self.value(args[0]), self.value(args[1]))
            }
            Cast { code, args, ty } => format!(
                "{code} {} {}",
                self.value(args[0]),
                display_type(*ty, &self.module.ctx)
            ),
            Load { args, ty, flags } => format!(
                "load{}{} {} {}",
                render_volatile(flags.volatile),
                render_ordering(flags.ordering, flags.scope),
                self.value(args[0]),
                display_type(*ty, &self.module.ctx)
            ),
            Store { args, flags } => format!(
                "store{}{} {} {}",
                render_volatile(flags.volatile),
                render_ordering(flags.ordering, flags.scope),
                self.value(args[0]),
                self.value(args[1])
            ),
            Alloca { ty } => format!("alloca {}", display_type(*ty, &self.module.ctx)),
            Gep { args, inbounds } => {
                let mut s = String::from("gep");
                if *inbounds {
                    s.push_str(" inbounds");
                }
                for arg in args {
                    write!(s, " {}", self.value(*arg)).unwrap();
                }
                s
            }
            ExtractValue { args, indices } => {
                let mut s = format!("extractvalue {}", self.value(args[0]));
                for idx in indices {
                    write!(s, " {idx}").unwrap();
                }
                s
            }
            InsertValue { args, indices } => {
                let mut s = format!(
                    "insertvalue {} {}",
                    self.value(args[0]),
                    self.value(args[1])
                );
                for idx in indices {
                    write!(s, " {idx}").unwrap();
                }
                s
            }
            Call {
                callee,
                args,
                cc,
                tail,
                ..
            } => {
                let mut s = String::new();
                if *tail {
                    s.push_str("tail ");
                }
                s.push_str("call ");
                if *cc != CallConv::C {
                    write!(s, "{cc} ").unwrap();
                }
                write!(s, "%{}", self.symbol_name(*callee)).unwrap();
                for arg in args {
                    write!(s, " {}", self.value(*arg)).unwrap();
                }
                s
            }
            Fence { ordering, scope } => {
                format!("fence{}", render_ordering(*ordering, *scope))
            }
            CmpXchg {
                args,
                volatile,
                success,
                failure,
                scope,
            } => format!(
                "cmpxchg{} {} {} {}{}{}",
                render_volatile(*volatile),
                self.value(args[0]),
                self.value(args[1]),
                self.value(args[2]),
                render_ordering(*success, *scope),
                render_ordering(*failure, SyncScope::System)
            ),
            AtomicRmw {
                code,
                args,
                volatile,
                ordering,
                scope,
            } => format!(
                "atomicrmw{} {code} {} {}{}",
                render_volatile(*volatile),
                self.value(args[0]),
                self.value(args[1]),
                render_ordering(*ordering, *scope)
            ),
            Jump { dests } => format!("jump {}", dests[0]),
            Br { args, dests } => {
                format!("br {} {} {}", self.value(args[0]), dests[0], dests[1])
            }
            BrTable {
                args,
                default,
                table,
            } => {
                let mut s = format!("br_table {}", self.value(args[0]));
                if let Some(block) = default {
                    write!(s, " {block}").unwrap();
                }
                for block in table {
                    write!(s, " {block}").unwrap();
                }
                s
            }
            Return { args } => match args {
                Some(value) => format!("return {}", self.value(*value)),
                None => "return".to_string(),
            },
            Phi { values, blocks, .. } => {
                let mut s = String::from("phi");
                for (value, block) in values.iter().zip(blocks.iter()) {
                    write!(s, " ({} {block})", self.value(*value)).unwrap();
                }
                s
            }
        }
    }

    fn value(&self, value: ValueId) -> String {
        match self.func.dfg.value(value) {
            Value::Immediate { imm, ty } => {
                format!("{imm}.{}", display_type(*ty, &self.module.ctx))
            }
            Value::Null { ty } => format!("null.{}", display_type(*ty, &self.module.ctx)),
            Value::Undef { ty } => format!("undef.{}", display_type(*ty, &self.module.ctx)),
            Value::Sym { sym, .. } => format!("%{}", self.symbol_name(*sym)),
            Value::Asm { .. } => "asm".to_string(),
            Value::Inst { .. } | Value::Arg { .. } => format!("v{}", value.0),
        }
    }

    fn symbol_name(&self, sym: SymbolRef) -> String {
        match sym {
            SymbolRef::Func(func_ref) => {
                if self.module.func_store.is_alive(func_ref) {
                    self.module
                        .func_store
                        .view(func_ref, |func| func.sig.name().to_string())
                } else {
                    "<dead>".to_string()
                }
            }
            SymbolRef::Gv(gv) => self
                .module
                .ctx
                .with_gv_store(|s| s.gv_data(gv).symbol.to_string()),
            SymbolRef::Alias(alias) => self.module.aliases.alias_data(alias).name.to_string(),
        }
    }
}

pub fn display_type(ty: Type, ctx: &ModuleCtx) -> String {
    ctx.with_ty_store(|s| display_type_with(ty, s))
}

fn display_type_with(ty: Type, store: &crate::types::TypeStore) -> String {
    match ty {
        Type::I1 => "i1".to_string(),
        Type::I8 => "i8".to_string(),
        Type::I16 => "i16".to_string(),
        Type::I32 => "i32".to_string(),
        Type::I64 => "i64".to_string(),
        Type::I128 => "i128".to_string(),
        Type::F32 => "f32".to_string(),
        Type::F64 => "f64".to_string(),
        Type::Unit => "unit".to_string(),
        Type::Compound(cmpd) => match store.resolve_compound(cmpd) {
            CompoundType::Ptr { base, addr_space } => {
                let base = display_type_with(*base, store);
                if *addr_space == 0 {
                    format!("*{base}")
                } else {
                    format!("*as{addr_space} {base}")
                }
            }
            CompoundType::Array { elem, len } => {
                format!("[{}; {len}]", display_type_with(*elem, store))
            }
            CompoundType::Vector { elem, len } => {
                format!("<{}; {len}>", display_type_with(*elem, store))
            }
            CompoundType::Struct(def) => {
                if def.packed {
                    format!("@<{}>", def.name)
                } else {
                    format!("@{}", def.name)
                }
            }
            CompoundType::Func {
                args,
                ret_ty,
                variadic,
            } => {
                let mut s = String::from("(");
                for (i, arg) in args.iter().enumerate() {
                    if i != 0 {
                        s.push_str(", ");
                    }
                    s.push_str(&display_type_with(*arg, store));
                }
                if *variadic {
                    if !args.is_empty() {
                        s.push_str(", ");
                    }
                    s.push_str("...");
                }
                write!(s, ") -> {}", display_type_with(*ret_ty, store)).unwrap();
                s
            }
        },
    }
}

fn render_flags(flags: ArithFlags) -> String {
    let mut s = String::new();
    if flags.nsw {
        s.push_str(" nsw");
    }
    if flags.nuw {
        s.push_str(" nuw");
    }
    if flags.exact {
        s.push_str(" exact");
    }
    if flags.fast {
        s.push_str(" fast");
    }
    s
}

fn render_volatile(volatile: bool) -> &'static str {
    if volatile {
        " volatile"
    } else {
        ""
    }
}

fn render_ordering(ordering: MemOrdering, scope: SyncScope) -> String {
    let name = match ordering {
        MemOrdering::NotAtomic => return String::new(),
        MemOrdering::Unordered => "unordered",
        MemOrdering::Monotonic => "monotonic",
        MemOrdering::Acquire => "acquire",
        MemOrdering::Release => "release",
        MemOrdering::AcqRel => "acq_rel",
        MemOrdering::SeqCst => "seq_cst",
    };
    match scope {
        SyncScope::System => format!(" {name}"),
        SyncScope::SingleThread => format!(" singlethread {name}"),
    }
}
