//! OpenAPI document model and parser.
//!
//! Documents are accepted as JSON or YAML. YAML is converted to a JSON value
//! first (numeric status-code keys become strings) so both formats share one
//! serde model.

mod document;
pub mod raw;
mod schema_node;

use std::fs;
use std::path::Path;

use tracing::debug;

pub use document::{
    Components, Document, Example, Header, HttpMethod, Info, Link, MediaType, Operation,
    ParamLocation, Parameter, PathItem, RefOr, RequestBody, Response,
};
pub use schema_node::{
    AdditionalProperties, ArraySchema, Composition, CompositionKind, Discriminator,
    NumberSchema, ObjectSchema, Property, SchemaNode, StringSchema, canonical_schema_ref,
    unescape_pointer_token,
};

use crate::error::{Error, Result};
use raw::RawDocument;

/// Serialization format of an input document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Json,
    Yaml,
}

impl Format {
    /// Format implied by a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Some(Self::Json),
            Some("yaml" | "yml") => Some(Self::Yaml),
            _ => None,
        }
    }

    /// Guess the format from the first non-whitespace character.
    pub fn sniff(contents: &str) -> Self {
        if contents.trim_start().starts_with('{') {
            Self::Json
        } else {
            Self::Yaml
        }
    }
}

/// Read and parse a document from disk.
pub fn load_document(path: &Path) -> Result<Document> {
    let contents = fs::read_to_string(path).map_err(|source| Error::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let document = parse_document(&contents, Format::from_path(path))?;
    debug!(
        path = %path.display(),
        paths = document.paths.len(),
        schemas = document.components.schemas.len(),
        "Parsed API document."
    );
    Ok(document)
}

/// Parse a document from text. Without an explicit format the content is sniffed.
pub fn parse_document(contents: &str, format: Option<Format>) -> Result<Document> {
    let mut value = match format.unwrap_or_else(|| Format::sniff(contents)) {
        Format::Json => serde_json::from_str::<serde_json::Value>(contents)
            .map_err(|e| Error::Parse(format!("invalid JSON: {e}")))?,
        Format::Yaml => {
            let yaml: serde_yaml::Value = serde_yaml::from_str(contents)
                .map_err(|e| Error::Parse(format!("invalid YAML: {e}")))?;
            yaml_to_json(yaml)?
        }
    };

    if !value.is_object() {
        return Err(Error::Parse("document root must be an object".to_string()));
    }
    // Unquoted YAML versions (`openapi: 3.1`) arrive as numbers.
    for pointer in ["/openapi", "/info/version"] {
        if let Some(scalar @ serde_json::Value::Number(_)) = value.pointer_mut(pointer) {
            *scalar = serde_json::Value::String(scalar.to_string());
        }
    }

    let raw: RawDocument = serde_json::from_value(value)
        .map_err(|e| Error::Parse(format!("not an OpenAPI document: {e}")))?;
    Document::from_raw(raw)
}

fn yaml_to_json(value: serde_yaml::Value) -> Result<serde_json::Value> {
    use serde_json::Value as Json;
    use serde_yaml::Value as Yaml;

    Ok(match value {
        Yaml::Null => Json::Null,
        Yaml::Bool(b) => Json::Bool(b),
        Yaml::Number(n) => {
            if let Some(i) = n.as_i64() {
                Json::from(i)
            } else if let Some(u) = n.as_u64() {
                Json::from(u)
            } else {
                n.as_f64()
                    .and_then(serde_json::Number::from_f64)
                    .map_or(Json::Null, Json::Number)
            }
        }
        Yaml::String(s) => Json::String(s),
        Yaml::Sequence(items) => Json::Array(
            items
                .into_iter()
                .map(yaml_to_json)
                .collect::<Result<Vec<_>>>()?,
        ),
        Yaml::Mapping(mapping) => {
            let mut object = serde_json::Map::with_capacity(mapping.len());
            for (key, value) in mapping {
                object.insert(yaml_key(key)?, yaml_to_json(value)?);
            }
            Json::Object(object)
        }
        Yaml::Tagged(tagged) => yaml_to_json(tagged.value)?,
    })
}

fn yaml_key(key: serde_yaml::Value) -> Result<String> {
    use serde_yaml::Value as Yaml;

    match key {
        Yaml::String(s) => Ok(s),
        Yaml::Number(n) => Ok(n.to_string()),
        Yaml::Bool(b) => Ok(b.to_string()),
        Yaml::Null => Ok("null".to_string()),
        other => Err(Error::Parse(format!("unsupported YAML mapping key: {other:?}"))),
    }
}
