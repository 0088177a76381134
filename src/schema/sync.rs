//! Schema Synchronizer
//!
//! Keeps the schema file of an entity in step with the entity definition.
//!
//! ## Staleness
//! Every generated schema ends with a trailer comment carrying the
//! fingerprint of the definition it was generated from:
//!
//! ```text
//! <!-- Entity fingerprint: 1c291ca3 -->
//! ```
//!
//! A schema is stale when the file is missing, or its last non-blank line
//! differs from the trailer of the current definition. A stale file is fully
//! overwritten; a current one is never touched.

use std::fs;
use std::path::Path;

use tracing::{debug, info};

use crate::config::{Config, SyncStrategy};
use crate::durable;
use crate::error::Result;
use crate::metadata::EntityShape;

use super::Schema;

/// Trailer comment for a fingerprint
pub fn fingerprint_trailer(fingerprint: &str) -> String {
    format!("<!-- Entity fingerprint: {} -->", fingerprint)
}

/// Generates schema files and regenerates them when stale
#[derive(Debug, Clone, Copy)]
pub struct SchemaSynchronizer {
    sync_strategy: SyncStrategy,
}

impl SchemaSynchronizer {
    pub fn new(config: &Config) -> Self {
        Self {
            sync_strategy: config.sync_strategy,
        }
    }

    /// Full schema text for a shape, fingerprint trailer included
    pub fn generate(shape: &EntityShape) -> String {
        let mut text = Schema::for_shape(shape).render();
        text.push_str(&fingerprint_trailer(&shape.fingerprint));
        text.push('\n');
        text
    }

    /// Whether `existing` schema text (None: no file) is out of date for `shape`
    pub fn is_stale(shape: &EntityShape, existing: Option<&str>) -> bool {
        let Some(existing) = existing else {
            return true;
        };
        let last_line = existing
            .lines()
            .rev()
            .map(str::trim)
            .find(|line| !line.is_empty());
        last_line != Some(fingerprint_trailer(&shape.fingerprint).as_str())
    }

    /// Regenerate the schema at `path` if stale. Returns whether it was written.
    pub fn sync(&self, shape: &EntityShape, path: &Path) -> Result<bool> {
        let existing = match fs::read_to_string(path) {
            Ok(text) => Some(text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => return Err(e.into()),
        };

        if !Self::is_stale(shape, existing.as_deref()) {
            debug!(entity = %shape.name, path = %path.display(), "Schema is up to date");
            return Ok(false);
        }

        let text = Self::generate(shape);
        durable::write_atomic(path, text.as_bytes(), self.sync_strategy)?;

        info!(
            entity = %shape.name,
            path = %path.display(),
            fingerprint = %shape.fingerprint,
            "Regenerated stale schema"
        );
        Ok(true)
    }
}
