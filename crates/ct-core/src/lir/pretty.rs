use std::fmt::{self, Formatter};

use itertools::Itertools;

use crate::pretty::{escape_bytes, PrettyCtx, PrettyPrintable};

use super::{
    CallingConvention, FunctionAttribute, LirBasicBlock, LirConstant, LirFunction, LirGlobal,
    LirInstruction, LirInstructionKind, LirModule, LirTerminator, LirValue, Linkage,
    UnnamedAddr, Visibility,
};

impl PrettyPrintable for LirModule {
    fn fmt_pretty(&self, f: &mut Formatter<'_>, ctx: &mut PrettyCtx<'_>) -> fmt::Result {
        ctx.writeln(f, format!("; module {}", self.name))?;

        for typedef in &self.type_definitions {
            ctx.writeln(f, format!("%{} = type {}", typedef.name, typedef.ty.definition_body()))?;
        }
        if !self.type_definitions.is_empty() {
            writeln!(f)?;
        }

        for global in &self.globals {
            write_global(global, f, ctx)?;
        }
        if !self.globals.is_empty() {
            writeln!(f)?;
        }

        for (idx, func) in self.functions.iter().enumerate() {
            write_function(func, Some(self), f, ctx)?;
            if idx + 1 < self.functions.len() {
                writeln!(f)?;
            }
        }
        Ok(())
    }
}

impl PrettyPrintable for LirFunction {
    fn fmt_pretty(&self, f: &mut Formatter<'_>, ctx: &mut PrettyCtx<'_>) -> fmt::Result {
        write_function(self, None, f, ctx)
    }
}

fn write_global(global: &LirGlobal, f: &mut Formatter<'_>, ctx: &mut PrettyCtx<'_>) -> fmt::Result {
    let mut parts = vec![format!("@{} =", global.name)];
    if let Some(linkage) = format_linkage(&global.linkage) {
        parts.push(linkage.to_string());
    }
    if let Some(visibility) = format_visibility(&global.visibility) {
        parts.push(visibility.to_string());
    }
    match global.unnamed_addr {
        UnnamedAddr::None => {}
        UnnamedAddr::Local => parts.push("local_unnamed_addr".into()),
        UnnamedAddr::Global => parts.push("unnamed_addr".into()),
    }
    parts.push(if global.is_constant { "constant" } else { "global" }.into());
    match &global.initializer {
        Some(initializer) => parts.push(format_constant(initializer)),
        None => parts.push(global.ty.to_string()),
    }

    let mut line = parts.join(" ");
    if let Some(section) = &global.section {
        line.push_str(&format!(", section \"{}\"", section));
    }
    if let Some(align) = global.alignment {
        line.push_str(&format!(", align {}", align));
    }
    ctx.writeln(f, line)
}

fn write_function(
    func: &LirFunction,
    module: Option<&LirModule>,
    f: &mut Formatter<'_>,
    ctx: &mut PrettyCtx<'_>,
) -> fmt::Result {
    let mut params = func
        .signature
        .params
        .iter()
        .enumerate()
        .map(|(idx, ty)| format!("{} %arg{}", ty, idx))
        .collect_vec();
    if func.signature.is_variadic {
        params.push("...".into());
    }

    let keyword = if func.is_declaration() { "declare" } else { "define" };
    let mut header = String::from(keyword);
    if let Some(linkage) = format_linkage(&func.linkage) {
        header.push(' ');
        header.push_str(linkage);
    }
    if let Some(cc) = format_calling_convention(&func.calling_convention) {
        header.push(' ');
        header.push_str(cc);
    }
    header.push_str(&format!(
        " {} @{}({})",
        func.signature.return_type,
        func.name,
        params.join(", ")
    ));
    if !func.attributes.is_empty() {
        let attrs = func.attributes.iter().map(format_attribute).join(" ");
        header.push_str(&format!(" {}", attrs));
    }

    if func.is_declaration() {
        return ctx.writeln(f, header);
    }

    ctx.writeln(f, header + " {")?;
    if !func.locals.is_empty() {
        ctx.nested(|ctx| {
            for local in &func.locals {
                let mut line = format!("; %local{}: {}", local.id, local.ty);
                if let Some(name) = &local.name {
                    line.push_str(&format!(" ({})", name));
                }
                if local.is_argument {
                    line.push_str(" arg");
                }
                ctx.writeln(f, line)?;
            }
            Ok(())
        })?;
    }
    for block in &func.basic_blocks {
        write_block(func, module, block, f, ctx)?;
    }
    ctx.writeln(f, "}")
}

fn write_block(
    func: &LirFunction,
    module: Option<&LirModule>,
    block: &LirBasicBlock,
    f: &mut Formatter<'_>,
    ctx: &mut PrettyCtx<'_>,
) -> fmt::Result {
    let mut header = format!("bb{}:", block.id);
    if let Some(label) = &block.label {
        header.push_str(&format!(" ; {}", label));
    }
    if !block.predecessors.is_empty() {
        let preds = block.predecessors.iter().map(|id| format!("bb{}", id)).join(", ");
        header.push_str(&format!(" ; preds = {}", preds));
    }
    ctx.writeln(f, header)?;
    ctx.nested(|ctx| {
        for inst in &block.instructions {
            // Untyped calls take their result type from the callee.
            let typed;
            let inst = match module {
                Some(module)
                    if inst.type_hint.is_none()
                        && matches!(inst.kind, LirInstructionKind::Call { .. }) =>
                {
                    typed = match func.value_type(module, &LirValue::Register(inst.id)) {
                        Some(ty) => inst.clone().with_type(ty),
                        None => inst.clone(),
                    };
                    &typed
                }
                _ => inst,
            };
            let mut line = summarize_instruction(inst);
            if ctx.options.show_types {
                if let Some(ty) = inst.result_type().filter(|ty| !ty.is_void()) {
                    line.push_str(&format!(" ; {}", ty));
                }
            }
            if ctx.options.show_debug_info {
                if let Some(debug) = &inst.debug_info {
                    line.push_str(&format!(
                        " !dbg {}:{}:{}",
                        debug.file, debug.line, debug.column
                    ));
                }
            }
            ctx.writeln(f, line)?;
        }
        ctx.writeln(f, summarize_terminator(&block.terminator))
    })
}

/// One-line textual form of an instruction.
pub fn summarize_instruction(inst: &LirInstruction) -> String {
    use LirInstructionKind::*;

    let binary = |op: &str, lhs: &LirValue, rhs: &LirValue| {
        format!(
            "%r{} = {} {}, {}",
            inst.id,
            op,
            format_value(lhs),
            format_value(rhs)
        )
    };
    let conversion = |op: &str, value: &LirValue, ty: &super::LirType| {
        format!("%r{} = {} {} to {}", inst.id, op, format_value(value), ty)
    };

    match &inst.kind {
        Add(lhs, rhs) => binary("add", lhs, rhs),
        Sub(lhs, rhs) => binary("sub", lhs, rhs),
        Mul(lhs, rhs) => binary("mul", lhs, rhs),
        Div(lhs, rhs) => binary("div", lhs, rhs),
        Rem(lhs, rhs) => binary("rem", lhs, rhs),
        And(lhs, rhs) => binary("and", lhs, rhs),
        Or(lhs, rhs) => binary("or", lhs, rhs),
        Xor(lhs, rhs) => binary("xor", lhs, rhs),
        Shl(lhs, rhs) => binary("shl", lhs, rhs),
        Shr(lhs, rhs) => binary("shr", lhs, rhs),
        Not(value) => format!("%r{} = not {}", inst.id, format_value(value)),
        Eq(lhs, rhs) => binary("icmp eq", lhs, rhs),
        Ne(lhs, rhs) => binary("icmp ne", lhs, rhs),
        Lt(lhs, rhs) => binary("icmp lt", lhs, rhs),
        Le(lhs, rhs) => binary("icmp le", lhs, rhs),
        Gt(lhs, rhs) => binary("icmp gt", lhs, rhs),
        Ge(lhs, rhs) => binary("icmp ge", lhs, rhs),
        Load {
            address,
            alignment,
            volatile,
        } => {
            let prefix = if *volatile { "load volatile" } else { "load" };
            let mut text = format!("%r{} = {} {}", inst.id, prefix, format_value(address));
            if let Some(align) = alignment {
                text.push_str(&format!(", align {}", align));
            }
            text
        }
        Store {
            value,
            address,
            alignment,
            volatile,
        } => {
            let prefix = if *volatile { "store volatile" } else { "store" };
            let mut text = format!(
                "{} {}, {}",
                prefix,
                format_value(value),
                format_value(address)
            );
            if let Some(align) = alignment {
                text.push_str(&format!(", align {}", align));
            }
            text
        }
        Alloca {
            ty,
            count,
            alignment,
        } => {
            let mut text = format!("%r{} = alloca {}", inst.id, ty);
            if let Some(count) = count {
                text.push_str(&format!(", {}", format_value(count)));
            }
            text.push_str(&format!(", align {}", alignment));
            text
        }
        GetElementPtr {
            ptr,
            indices,
            inbounds,
        } => {
            let prefix = if *inbounds {
                "getelementptr inbounds"
            } else {
                "getelementptr"
            };
            let mut text = format!("%r{} = {} {}", inst.id, prefix, format_value(ptr));
            for index in indices {
                text.push_str(&format!(", {}", format_value(index)));
            }
            text
        }
        PtrToInt(value, ty) => conversion("ptrtoint", value, ty),
        IntToPtr(value, ty) => conversion("inttoptr", value, ty),
        Trunc(value, ty) => conversion("trunc", value, ty),
        ZExt(value, ty) => conversion("zext", value, ty),
        SExt(value, ty) => conversion("sext", value, ty),
        Bitcast(value, ty) => conversion("bitcast", value, ty),
        Call {
            function,
            args,
            calling_convention,
            tail_call,
        } => {
            let mut text = String::new();
            let result_ty = inst.type_hint.clone().unwrap_or(super::Ty::Void);
            if !result_ty.is_void() {
                text.push_str(&format!("%r{} = ", inst.id));
            }
            if *tail_call {
                text.push_str("tail ");
            }
            text.push_str("call ");
            if let Some(cc) = format_calling_convention(calling_convention) {
                text.push_str(cc);
                text.push(' ');
            }
            let args = args.iter().map(format_value).join(", ");
            text.push_str(&format!("{} {}({})", result_ty, format_value(function), args));
            text
        }
        Phi { incoming } => {
            let arms = incoming
                .iter()
                .map(|(val, bb)| format!("[ {}, bb{} ]", format_value(val), bb))
                .join(", ");
            format!("%r{} = phi {}", inst.id, arms)
        }
        Select {
            condition,
            if_true,
            if_false,
        } => format!(
            "%r{} = select {}, {}, {}",
            inst.id,
            format_value(condition),
            format_value(if_true),
            format_value(if_false)
        ),
        Unreachable => "unreachable".to_string(),
        Freeze(value) => format!("%r{} = freeze {}", inst.id, format_value(value)),
    }
}

fn summarize_terminator(term: &LirTerminator) -> String {
    use LirTerminator::*;

    match term {
        Return(None) => "ret void".to_string(),
        Return(Some(value)) => format!("ret {}", format_value(value)),
        Br(target) => format!("br label bb{}", target),
        CondBr {
            condition,
            if_true,
            if_false,
        } => format!(
            "br {}, label bb{}, label bb{}",
            format_value(condition),
            if_true,
            if_false
        ),
        Switch {
            value,
            default,
            cases,
        } => {
            let list = cases
                .iter()
                .map(|(val, bb)| format!("{}, label bb{}", val, bb))
                .join(" ");
            format!(
                "switch {}, label bb{} [ {} ]",
                format_value(value),
                default,
                list
            )
        }
        Unreachable => "unreachable".to_string(),
    }
}

pub fn format_value(value: &LirValue) -> String {
    use LirValue::*;

    match value {
        Register(id) => format!("%r{}", id),
        Constant(constant) => format_constant(constant),
        Global(name, _) => format!("@{}", name),
        Function(name) => format!("@{}", name),
        Local(id) => format!("%local{}", id),
        StackSlot(id) => format!("%stack{}", id),
        Undef(ty) => format!("{} undef", ty),
        Null(ty) => format!("{} null", ty),
    }
}

pub fn format_constant(constant: &LirConstant) -> String {
    use LirConstant::*;

    match constant {
        Int(value, ty) => format!("{} {}", ty, value),
        UInt(value, ty) => format!("{} {}", ty, value),
        Float(value, ty) => format!("{} {}", ty, value),
        Bool(value) => format!("i1 {}", value),
        Bytes(bytes) => format!(
            "[{} x i8] c\"{}\"",
            bytes.len(),
            escape_bytes(bytes)
        ),
        Array(elements, ty) => {
            let elems = elements.iter().map(format_constant).join(", ");
            format!("[{} x {}] [{}]", elements.len(), ty, elems)
        }
        Struct(fields, ty) => {
            let elems = fields.iter().map(format_constant).join(", ");
            format!("{} {{ {} }}", ty, elems)
        }
        GlobalRef(name, ty, indices) => {
            let idx = indices.iter().map(|i| format!(", i64 {}", i)).join("");
            format!(
                "{} getelementptr inbounds ({}, {}* @{}{})",
                constant.ty(),
                ty,
                ty,
                name,
                idx
            )
        }
        Null(ty) => format!("{} null", ty),
        Undef(ty) => format!("{} undef", ty),
    }
}

fn format_calling_convention(cc: &CallingConvention) -> Option<&'static str> {
    use CallingConvention::*;

    match cc {
        C => None,
        Fast => Some("fastcc"),
        Cold => Some("coldcc"),
        PreserveMost => Some("preserve_mostcc"),
        PreserveAll => Some("preserve_allcc"),
    }
}

fn format_linkage(linkage: &Linkage) -> Option<&'static str> {
    use Linkage::*;

    match linkage {
        External => None,
        AvailableExternally => Some("available_externally"),
        LinkOnceAny => Some("linkonce"),
        LinkOnceOdr => Some("linkonce_odr"),
        WeakAny => Some("weak"),
        WeakOdr => Some("weak_odr"),
        Appending => Some("appending"),
        Internal => Some("internal"),
        Private => Some("private"),
        ExternalWeak => Some("extern_weak"),
        Common => Some("common"),
    }
}

fn format_visibility(visibility: &Visibility) -> Option<&'static str> {
    match visibility {
        Visibility::Default => None,
        Visibility::Hidden => Some("hidden"),
        Visibility::Protected => Some("protected"),
    }
}

fn format_attribute(attribute: &FunctionAttribute) -> &'static str {
    match attribute {
        FunctionAttribute::NoInline => "noinline",
        FunctionAttribute::AlwaysInline => "alwaysinline",
        FunctionAttribute::OptimizeNone => "optnone",
        FunctionAttribute::NoUnwind => "nounwind",
        FunctionAttribute::Cold => "cold",
    }
}
