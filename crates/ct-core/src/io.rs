//! JSON interchange for modules.

use std::path::Path;

use eyre::WrapErr;
use tracing::debug;

use crate::error::Result;
use crate::lir::LirModule;

pub fn module_from_json(text: &str) -> Result<LirModule> {
    Ok(serde_json::from_str(text)?)
}

pub fn module_to_json(module: &LirModule) -> Result<String> {
    Ok(serde_json::to_string_pretty(module)?)
}

pub fn read_module(path: &Path) -> Result<LirModule> {
    let text = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("failed to read module {}", path.display()))?;
    let module = serde_json::from_str::<LirModule>(&text)
        .wrap_err_with(|| format!("failed to parse module {}", path.display()))?;
    debug!(
        "loaded module '{}' ({} functions, {} globals) from {}",
        module.name,
        module.functions.len(),
        module.globals.len(),
        path.display()
    );
    Ok(module)
}

pub fn write_module(module: &LirModule, path: &Path) -> Result<()> {
    let text = module_to_json(module)?;
    std::fs::write(path, text)
        .wrap_err_with(|| format!("failed to write module {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lir::Ty;

    #[test]
    fn parses_minimal_module_with_defaults() {
        let module = module_from_json(
            r#"{
                "name": "m",
                "functions": [{
                    "name": "main",
                    "signature": { "params": [], "return_type": "I32" },
                    "basic_blocks": [{
                        "id": 0,
                        "terminator": { "Return": { "Constant": { "Int": [0, "I32"] } } }
                    }]
                }]
            }"#,
        )
        .unwrap();

        assert_eq!(module.name, "m");
        assert!(module.globals.is_empty());
        let main = module.get_function("main").unwrap();
        assert_eq!(main.signature.return_type, Ty::I32);
        assert!(main.attributes.is_empty());
        assert!(!main.is_declaration());
    }
}
