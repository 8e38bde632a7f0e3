//! Operation type definition records
//!
//! Only `name` and `category` are read from a `definition.json`; every other
//! field in the document is ignored.

use serde::Deserialize;
use std::path::Path;

use crate::common::{Error, Result};

/// A definition record loaded from a JSON file
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct DefinitionRecord {
    /// Operation type name, e.g. "TestMicrotiterPlate"
    pub name: String,
    /// Category the operation type belongs to
    pub category: String,
}

impl DefinitionRecord {
    /// Read and parse a definition file
    ///
    /// Unreadable files, invalid JSON and missing fields are all parse errors.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::parse(path, e))?;
        Self::from_json(&content).map_err(|e| Error::parse(path, e))
    }

    /// Parse a definition from JSON text
    pub fn from_json(content: &str) -> serde_json::Result<Self> {
        serde_json::from_str(content)
    }

    /// Whether this record names an automated test
    pub fn is_test(&self, prefix: &str) -> bool {
        self.name.starts_with(prefix)
    }
}
