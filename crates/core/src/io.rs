//! Loading and persisting modules.

use crate::module::Module;
use crate::result::{Error, Result};
use std::fs;
use std::path::Path;

/// Reads a module from a JSON file.
pub fn load_module(path: &Path) -> Result<Module> {
    let raw = fs::read_to_string(path).map_err(|source| Error::FileRead {
        path: path.display().to_string(),
        source,
    })?;
    let module = serde_json::from_str(&raw)?;
    tracing::debug!("Loaded module from {}", path.display());
    Ok(module)
}

/// Writes a module as pretty JSON. The file is replaced through a sibling temporary so
/// a failed write never leaves a truncated module behind.
pub fn save_module(path: &Path, module: &Module) -> Result<()> {
    let json = serde_json::to_string_pretty(module)?;
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = Path::new(&tmp);

    let write_err = |source| Error::FileWrite {
        path: path.display().to_string(),
        source,
    };
    fs::write(tmp, json).map_err(write_err)?;
    fs::rename(tmp, path).map_err(write_err)?;
    tracing::debug!("Saved module {} to {}", module.name, path.display());
    Ok(())
}
