//! Deduplicated global constants holding rendered pointee types.

use std::collections::HashMap;

use ct_core::lir::{
    LirConstant, LirGlobal, LirModule, LirValue, Linkage, Name, Ty, UnnamedAddr, Visibility,
};
use tracing::trace;

const STRING_GLOBAL_BASE: &str = ".str";

/// A `[N x i8]` constant created for one rendered type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobalStringHandle {
    pub name: Name,
    pub array_ty: Ty,
}

impl GlobalStringHandle {
    /// Constant `i8*` to the first byte of the string.
    pub fn first_byte(&self) -> LirValue {
        LirValue::Constant(LirConstant::first_byte_of(
            self.name.clone(),
            self.array_ty.clone(),
        ))
    }
}

/// Maps rendered type text to the global already emitted for it.
///
/// Keys are the rendered text rather than the type value, so two differently
/// built types that print the same share one global. A `Ty::Named` reference
/// and the struct it names both render as the definition. A table belongs to
/// a single module.
#[derive(Debug, Default)]
pub struct TypeStringTable {
    entries: HashMap<String, GlobalStringHandle>,
}

impl TypeStringTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_create(&mut self, ty: &Ty, module: &mut LirModule) -> GlobalStringHandle {
        let text = module.type_string(ty);
        if let Some(handle) = self.entries.get(&text) {
            return handle.clone();
        }

        let mut bytes = text.clone().into_bytes();
        bytes.push(0);
        let array_ty = Ty::array(Ty::I8, bytes.len() as u64);
        let name = module.unique_global_name(STRING_GLOBAL_BASE);

        module.add_global(LirGlobal {
            name: name.clone(),
            ty: array_ty.clone(),
            initializer: Some(LirConstant::Bytes(bytes)),
            linkage: Linkage::Private,
            visibility: Visibility::Default,
            is_constant: true,
            alignment: Some(1),
            section: None,
            unnamed_addr: UnnamedAddr::Global,
        });
        trace!("@{} = \"{}\"", name, text);

        let handle = GlobalStringHandle { name, array_ty };
        self.entries.insert(text, handle.clone());
        handle
    }

    pub fn get(&self, text: &str) -> Option<&GlobalStringHandle> {
        self.entries.get(text)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn reset(&mut self) {
        self.entries.clear();
    }
}

/// Reads a NUL-terminated string back out of a byte-array global.
pub fn read_type_string(module: &LirModule, global: &str) -> Option<String> {
    match module.get_global(global)?.initializer.as_ref()? {
        LirConstant::Bytes(bytes) => {
            let end = bytes.iter().position(|&byte| byte == 0)?;
            String::from_utf8(bytes[..end].to_vec()).ok()
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn same_text_yields_same_global() {
        let mut module = LirModule::new("m");
        let mut table = TypeStringTable::new();

        let first = table.get_or_create(&Ty::named_struct("A", vec![Ty::I32]), &mut module);
        let second = table.get_or_create(&Ty::named_struct("A", vec![Ty::I32]), &mut module);
        let other = table.get_or_create(&Ty::I64, &mut module);

        assert_eq!(first, second);
        assert_ne!(first.name, other.name);
        assert_eq!(module.globals.len(), 2);
        assert_eq!(table.len(), 2);
        assert_eq!(first.name, ".str");
        assert_eq!(other.name, ".str.1");
    }

    #[test]
    fn global_holds_nul_terminated_rendering() {
        let mut module = LirModule::new("m");
        let mut table = TypeStringTable::new();
        let ty = Ty::anonymous_struct(vec![Ty::I8, Ty::i8_ptr()]);

        let handle = table.get_or_create(&ty, &mut module);
        let global = module.get_global(&handle.name).unwrap();

        assert_eq!(global.ty, Ty::array(Ty::I8, "{ i8, i8* }".len() as u64 + 1));
        assert_eq!(global.linkage, Linkage::Private);
        assert_eq!(global.unnamed_addr, UnnamedAddr::Global);
        assert_eq!(global.alignment, Some(1));
        assert!(global.is_constant);
        assert_eq!(
            read_type_string(&module, &handle.name).as_deref(),
            Some("{ i8, i8* }")
        );
    }

    #[test]
    fn reset_forgets_previous_entries() {
        let mut module = LirModule::new("m");
        let mut table = TypeStringTable::new();
        table.get_or_create(&Ty::I32, &mut module);
        table.reset();
        assert!(table.is_empty());
        assert!(table.get("i32").is_none());
    }

    #[test]
    fn skips_names_taken_by_existing_symbols() {
        let mut module = LirModule::new("m");
        module.add_global(LirGlobal {
            name: ".str".into(),
            ty: Ty::array(Ty::I8, 3),
            initializer: Some(LirConstant::Bytes(b"hi\0".to_vec())),
            linkage: Linkage::Private,
            visibility: Visibility::Default,
            is_constant: true,
            alignment: Some(1),
            section: None,
            unnamed_addr: UnnamedAddr::Global,
        });

        let handle = TypeStringTable::new().get_or_create(&Ty::I16, &mut module);
        assert_eq!(handle.name, ".str.1");
        assert_eq!(read_type_string(&module, ".str").as_deref(), Some("hi"));
    }
}
