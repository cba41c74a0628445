//! Serde model of an OpenAPI 3.x document as written on disk.
//!
//! This layer mirrors the document shape one-to-one, with every optional
//! keyword an `Option`. It is converted into the tagged IR in
//! [`super::document`] right after parsing.

// Field names follow the OpenAPI keywords they mirror.
#![allow(missing_docs)]

use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;

/// Root OpenAPI document.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawDocument {
    pub openapi: Option<String>,
    #[serde(default)]
    pub info: RawInfo,
    #[serde(default)]
    pub paths: IndexMap<String, RawPathItem>,
    #[serde(default)]
    pub components: RawComponents,
}

/// Document metadata.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawInfo {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub version: String,
    pub description: Option<String>,
}

/// Reusable components.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawComponents {
    #[serde(default)]
    pub schemas: IndexMap<String, RawSchema>,
    #[serde(default)]
    pub parameters: IndexMap<String, RawParameter>,
    #[serde(default)]
    pub request_bodies: IndexMap<String, RawRequestBody>,
    #[serde(default)]
    pub responses: IndexMap<String, RawResponse>,
    #[serde(default)]
    pub headers: IndexMap<String, RawHeader>,
    #[serde(default)]
    pub examples: IndexMap<String, RawExample>,
    #[serde(default)]
    pub links: IndexMap<String, RawLink>,
}

/// Operations for a single URL template.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawPathItem {
    pub summary: Option<String>,
    pub description: Option<String>,
    pub get: Option<RawOperation>,
    pub put: Option<RawOperation>,
    pub post: Option<RawOperation>,
    pub delete: Option<RawOperation>,
    pub options: Option<RawOperation>,
    pub head: Option<RawOperation>,
    pub patch: Option<RawOperation>,
    pub trace: Option<RawOperation>,
    /// Parameters shared by every operation under this path.
    #[serde(default)]
    pub parameters: Vec<RawParameter>,
}

/// A single API operation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawOperation {
    pub operation_id: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub deprecated: bool,
    #[serde(default)]
    pub parameters: Vec<RawParameter>,
    pub request_body: Option<RawRequestBody>,
    #[serde(default)]
    pub responses: IndexMap<String, RawResponse>,
}

/// Parameter object, or a `$ref` to one.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawParameter {
    #[serde(rename = "$ref")]
    pub ref_path: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "in", default)]
    pub location: String,
    pub description: Option<String>,
    #[serde(default)]
    pub required: bool,
    pub schema: Option<RawSchema>,
}

/// Request body object, or a `$ref` to one.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawRequestBody {
    #[serde(rename = "$ref")]
    pub ref_path: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub content: IndexMap<String, RawMediaType>,
}

/// Response object, or a `$ref` to one.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawResponse {
    #[serde(rename = "$ref")]
    pub ref_path: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub content: IndexMap<String, RawMediaType>,
    #[serde(default)]
    pub headers: IndexMap<String, RawHeader>,
    #[serde(default)]
    pub links: IndexMap<String, RawLink>,
}

/// Media type entry (`application/json: {...}`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawMediaType {
    pub schema: Option<RawSchema>,
    pub example: Option<Value>,
    #[serde(default)]
    pub examples: IndexMap<String, RawExample>,
}

/// Header object, or a `$ref` to one.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawHeader {
    #[serde(rename = "$ref")]
    pub ref_path: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub required: bool,
    pub schema: Option<RawSchema>,
}

/// Example object, or a `$ref` to one.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawExample {
    #[serde(rename = "$ref")]
    pub ref_path: Option<String>,
    pub summary: Option<String>,
    pub value: Option<Value>,
    pub external_value: Option<String>,
}

/// Link object, or a `$ref` to one.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawLink {
    #[serde(rename = "$ref")]
    pub ref_path: Option<String>,
    pub operation_id: Option<String>,
    pub operation_ref: Option<String>,
    #[serde(default)]
    pub parameters: IndexMap<String, Value>,
    pub description: Option<String>,
}

/// JSON Schema as used by OpenAPI 3.0 and 3.1.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSchema {
    #[serde(rename = "$ref")]
    pub ref_path: Option<String>,

    /// A single type name, or a list of them in 3.1.
    #[serde(rename = "type")]
    pub schema_type: Option<RawSchemaType>,

    pub format: Option<String>,
    pub description: Option<String>,

    #[serde(default)]
    pub properties: IndexMap<String, RawSchema>,
    #[serde(default)]
    pub required: Vec<String>,
    pub additional_properties: Option<RawAdditionalProperties>,

    pub items: Option<Box<RawSchema>>,
    pub min_items: Option<u64>,
    pub max_items: Option<u64>,
    #[serde(default)]
    pub unique_items: bool,

    #[serde(rename = "enum")]
    pub enum_values: Option<Vec<Value>>,
    #[serde(rename = "const")]
    pub const_value: Option<Value>,

    pub all_of: Option<Vec<RawSchema>>,
    pub one_of: Option<Vec<RawSchema>>,
    pub any_of: Option<Vec<RawSchema>>,
    pub not: Option<Box<RawSchema>>,
    pub discriminator: Option<RawDiscriminator>,

    /// OpenAPI 3.0 nullable flag.
    pub nullable: Option<bool>,

    pub pattern: Option<String>,
    pub min_length: Option<u64>,
    pub max_length: Option<u64>,

    pub minimum: Option<f64>,
    pub maximum: Option<f64>,
    /// A boolean modifier in 3.0, a number in 3.1.
    pub exclusive_minimum: Option<Value>,
    /// A boolean modifier in 3.0, a number in 3.1.
    pub exclusive_maximum: Option<Value>,
    pub multiple_of: Option<f64>,
}

/// `type` keyword: one name or a list.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawSchemaType {
    Single(String),
    Multiple(Vec<String>),
}

impl RawSchemaType {
    /// Type names, in declaration order.
    pub fn names(&self) -> Vec<&str> {
        match self {
            Self::Single(name) => vec![name.as_str()],
            Self::Multiple(names) => names.iter().map(String::as_str).collect(),
        }
    }
}

/// `additionalProperties`: a boolean or a schema.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawAdditionalProperties {
    Bool(bool),
    Schema(Box<RawSchema>),
}

/// Discriminator for polymorphic compositions.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawDiscriminator {
    pub property_name: String,
    #[serde(default)]
    pub mapping: IndexMap<String, String>,
}

impl RawSchema {
    /// Whether this schema is exactly `{ "type": "null" }`.
    pub fn is_null_type(&self) -> bool {
        self.ref_path.is_none()
            && self
                .schema_type
                .as_ref()
                .is_some_and(|t| t.names() == ["null"])
    }
}
