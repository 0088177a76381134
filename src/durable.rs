//! Whole-file atomic replacement
//!
//! Documents and schemas are always rewritten in full. The new content goes
//! to `<file>.tmp` first and is renamed over the target, so a crash leaves
//! either the old file or the new one, never a torn mix.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::config::SyncStrategy;
use crate::error::{Result, StoreError};

/// Temporary sibling used while replacing `path`
pub fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Replace the contents of `path` with `content`
pub fn write_atomic(path: &Path, content: &[u8], sync_strategy: SyncStrategy) -> Result<()> {
    let tmp = temp_path(path);

    let file = File::create(&tmp)?;
    let mut writer = BufWriter::new(file);
    writer.write_all(content)?;
    writer.flush()?;

    let file = writer
        .into_inner()
        .map_err(|e| StoreError::Io(e.into_error()))?;
    if sync_strategy == SyncStrategy::EveryWrite {
        file.sync_all()?;
    }
    drop(file);

    fs::rename(&tmp, path)?;
    Ok(())
}
