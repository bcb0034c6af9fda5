//! Serde model of the host source-map document.
//!
//! The codec reads and writes only the fields it owns (`names`, `scopes`)
//! plus the shape checks it needs (`sources` length, `sections`); every
//! other v3 field is carried through untouched.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::Position;

/// A JSON source map. Covers both plain v3 maps and index maps: a plain
/// map fills `sources`/`mappings`, an index map fills `sections` instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceMapJson {
    /// The version field, fixed at 3.
    pub version: u32,
    /// Optional name of the generated file this map describes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    /// Optional prefix prepended to every source path.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_root: Option<String>,
    /// Source paths; entries may be null.
    #[serde(default)]
    pub sources: Vec<Option<String>>,
    /// Optional inline source contents, aligned with `sources`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sources_content: Option<Vec<Option<String>>>,
    /// The string table shared by `mappings` and `scopes`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub names: Option<Vec<String>>,
    /// The standard VLQ mappings stream; not interpreted by this crate.
    #[serde(default)]
    pub mappings: String,
    /// The encoded scopes stream.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scopes: Option<String>,
    /// Sections of an index map; mutually exclusive with `sources` and
    /// `mappings` in well-formed documents.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sections: Option<Vec<IndexSection>>,
    /// Fields this crate does not interpret, carried through untouched.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// One section of an index source map: a nested map placed at an offset
/// in the generated file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexSection {
    /// Where the section's generated code begins.
    pub offset: Position,
    /// The section's own source map.
    pub map: SourceMapJson,
}

impl SourceMapJson {
    /// Creates a minimal v3 map with `count` null sources and an empty
    /// mappings stream, ready to receive an encoded scopes field.
    pub(crate) fn with_source_count(count: usize) -> Self {
        Self {
            version: 3,
            file: None,
            source_root: None,
            sources: vec![None; count],
            sources_content: None,
            names: Some(Vec::new()),
            mappings: String::new(),
            scopes: None,
            sections: None,
            extra: serde_json::Map::new(),
        }
    }

    /// Parses a source map from its JSON text.
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Serializes the map back to JSON text.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}
