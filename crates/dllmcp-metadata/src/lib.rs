//! dllmcp-metadata: reads the ECMA-335 metadata of a .NET module.
//!
//! Parsing is done by `dotscope`; this crate only maps its type registry
//! into an immutable [`ModuleModel`] describing every type definition and
//! its declared members. Nothing is executed, and references to types in
//! other assemblies stay as names.

mod loader;
pub mod model;

pub use model::{
    EventDefinition, FieldDefinition, MemberAccess, MethodDefinition, ModuleModel, Parameter,
    PropertyDefinition, TypeDefinition, TypeName, TypeSig, TypeVisibility,
};

use dllmcp_core::DllMcpError;
use dotscope::CilObject;
use std::path::Path;
use tracing::debug;

impl ModuleModel {
    /// Parse a module image held in memory.
    pub fn from_bytes(data: &[u8]) -> Result<Self, DllMcpError> {
        let assembly = CilObject::from_mem(data.to_vec())
            .map_err(|e| DllMcpError::ModuleLoad(e.to_string()))?;
        Self::from_assembly(&assembly)
    }

    /// Map an assembly that `dotscope` has already loaded.
    pub fn from_assembly(assembly: &CilObject) -> Result<Self, DllMcpError> {
        let registry = assembly.types();
        loader::ModelBuilder::new(assembly, &registry).build()
    }
}

/// Load and parse the module at `path`.
///
/// Every failure (missing file, not a PE image, no CLI header, corrupt
/// tables or signatures) is reported as [`DllMcpError::ModuleLoad`].
pub fn load_module(path: &Path) -> Result<ModuleModel, DllMcpError> {
    let assembly = CilObject::from_path(path)
        .map_err(|e| DllMcpError::ModuleLoad(format!("{}: {e}", path.display())))?;
    let model = ModuleModel::from_assembly(&assembly).map_err(|e| match e {
        DllMcpError::ModuleLoad(msg) => {
            DllMcpError::ModuleLoad(format!("{}: {msg}", path.display()))
        }
        other => other,
    })?;
    debug!(
        "loaded module {} ({} types) from {}",
        model.name,
        model.types.len(),
        path.display()
    );
    Ok(model)
}
