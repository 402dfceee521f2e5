//! Cache file persistence. Writes only happen on an explicit `save`.

use std::fs;
use std::path::Path;

use log::info;

use super::cache::MappingCache;
use super::model::MappingSnapshot;
use crate::errors::{Error, Result};

/// Read and decode a snapshot file.
pub fn read_snapshot(path: &Path) -> Result<MappingSnapshot> {
    let text = fs::read_to_string(path)?;
    if text.trim().is_empty() {
        return Err(Error::Snapshot(format!("{} is empty", path.display())));
    }
    let snapshot: MappingSnapshot = serde_json::from_str(&text)?;
    Ok(snapshot)
}

/// Encode a snapshot as pretty JSON, creating parent directories.
pub fn write_snapshot(path: &Path, snapshot: &MappingSnapshot) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(snapshot)?;
    fs::write(path, json)?;
    Ok(())
}

impl MappingCache {
    /// Export the cache to `path`. Returns the number of protocols written.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<usize> {
        let path = path.as_ref();
        let snapshot = self.export_snapshot();
        write_snapshot(path, &snapshot)?;
        info!(
            "Saved {} protocol mappings to {}",
            snapshot.total_protocols,
            path.display()
        );
        Ok(snapshot.total_protocols)
    }

    /// Seed the cache from a file written by [`save`](Self::save).
    pub fn load(&self, path: impl AsRef<Path>) -> Result<usize> {
        let snapshot = read_snapshot(path.as_ref())?;
        Ok(self.load_snapshot(snapshot))
    }
}
