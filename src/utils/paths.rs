use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

const APP_NAME: &str = "pedaldex";

/// Get the application data directory holding indexes and metadata stores
pub fn app_data_dir() -> Result<PathBuf> {
    let base = if cfg!(target_os = "macos") {
        dirs::home_dir().map(|h| h.join("Library").join("Application Support"))
    } else if cfg!(target_os = "windows") {
        dirs::data_local_dir()
    } else {
        // Linux/Unix: use XDG_DATA_HOME or ~/.local/share
        dirs::data_dir()
    };

    let base = base.context("Could not determine app data directory")?;
    let app_dir = base.join(APP_NAME);

    fs::create_dir_all(&app_dir)?;
    Ok(app_dir)
}

/// Resolved locations for one index kind
#[derive(Debug, Clone)]
pub struct IndexLocation {
    /// Directory of source JSON documents (one object per file)
    pub data_source: PathBuf,
    /// Directory holding the persisted index
    pub storage: PathBuf,
}

impl IndexLocation {
    /// Default layout under the app data dir: `<kind>/` for documents,
    /// `<kind>.index/` for the persisted index.
    pub fn for_kind(kind: &str) -> Result<Self> {
        let base = app_data_dir()?;
        Ok(Self {
            data_source: base.join(kind),
            storage: base.join(format!("{kind}.index")),
        })
    }
}
