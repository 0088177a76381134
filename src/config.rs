//! Configuration for xmlstore
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;

use crate::error::{Result, StoreError};

/// Largest accepted indentation for serialized documents
const MAX_INDENT_WIDTH: usize = 16;

/// Main configuration for a store
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Directory holding one document/schema pair per entity type.
    /// Must already exist; it is never created implicitly.
    /// Internal structure:
    ///   {data_dir}/
    ///     ├── user.xml     (rows)
    ///     └── user.xsd     (schema + fingerprint trailer)
    pub data_dir: PathBuf,

    /// Initialise a missing or empty document with an empty root element
    /// instead of failing with `DocumentNotFound`
    pub create_missing_documents: bool,

    // -------------------------------------------------------------------------
    // Write Configuration
    // -------------------------------------------------------------------------
    /// Sync strategy: whether written documents are fsynced
    pub sync_strategy: SyncStrategy,

    /// Spaces per nesting level in serialized documents
    pub indent_width: usize,
}

/// Document sync strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStrategy {
    /// fsync every written document before it replaces the old one (safest)
    EveryWrite,

    /// Leave flushing to the OS (fast, for tests and throwaway data)
    OsManaged,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./xmlstore_data"),
            create_missing_documents: false,
            sync_strategy: SyncStrategy::EveryWrite,
            indent_width: 2,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Check values that cannot be expressed by the types alone
    pub fn validate(&self) -> Result<()> {
        if self.indent_width > MAX_INDENT_WIDTH {
            return Err(StoreError::Config(format!(
                "indent_width {} exceeds maximum of {}",
                self.indent_width, MAX_INDENT_WIDTH
            )));
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the data directory
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    /// Create missing documents on open
    pub fn create_missing_documents(mut self, create: bool) -> Self {
        self.config.create_missing_documents = create;
        self
    }

    /// Set the sync strategy
    pub fn sync_strategy(mut self, strategy: SyncStrategy) -> Self {
        self.config.sync_strategy = strategy;
        self
    }

    /// Set the indentation width of serialized documents
    pub fn indent_width(mut self, width: usize) -> Self {
        self.config.indent_width = width;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
