use std::path::Path;

use anyhow::{Context, Result};

/// Default database location, `$HOME/.notebox/notebox.db`.
pub fn default_db_path() -> Result<String> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    Ok(format!("{home}/.notebox/notebox.db"))
}

/// Use the explicit path if given (flag or `NOTEBOX_DB`), else the default.
pub fn resolve_db_path(cli_db: Option<String>) -> Result<String> {
    match cli_db {
        Some(p) => Ok(p),
        None => default_db_path(),
    }
}

pub fn ensure_db_dir(db_path: &str) -> Result<()> {
    if let Some(parent) = Path::new(db_path).parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory {}", parent.display()))?;
        }
    }
    Ok(())
}
