//! Document IR consumed by every pipeline stage.

use std::collections::BTreeMap;
use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::raw::{
    RawComponents, RawDocument, RawExample, RawHeader, RawLink, RawMediaType, RawOperation,
    RawParameter, RawPathItem, RawRequestBody, RawResponse,
};
use super::schema_node::SchemaNode;
use crate::error::{Error, Result};

/// HTTP method. The ordering is the declaration order of a path item.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Put,
    Post,
    Delete,
    Options,
    Head,
    Patch,
    Trace,
}

impl HttpMethod {
    /// All methods in path-item order.
    pub const ALL: [Self; 8] = [
        Self::Get,
        Self::Put,
        Self::Post,
        Self::Delete,
        Self::Options,
        Self::Head,
        Self::Patch,
        Self::Trace,
    ];

    /// Lowercase spelling, as used for path item keys.
    pub fn as_lower(self) -> &'static str {
        match self {
            Self::Get => "get",
            Self::Put => "put",
            Self::Post => "post",
            Self::Delete => "delete",
            Self::Options => "options",
            Self::Head => "head",
            Self::Patch => "patch",
            Self::Trace => "trace",
        }
    }

    /// Uppercase spelling, as sent on the wire.
    pub fn as_upper(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Put => "PUT",
            Self::Post => "POST",
            Self::Delete => "DELETE",
            Self::Options => "OPTIONS",
            Self::Head => "HEAD",
            Self::Patch => "PATCH",
            Self::Trace => "TRACE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_upper())
    }
}

/// Either an unresolved pointer or an inline value.
#[derive(Debug, Clone, PartialEq)]
pub enum RefOr<T> {
    Ref(String),
    Item(T),
}

impl<T> RefOr<T> {
    /// The inline value, if resolved.
    pub fn as_item(&self) -> Option<&T> {
        match self {
            Self::Item(item) => Some(item),
            Self::Ref(_) => None,
        }
    }

    fn from_pointer_or(pointer: Option<String>, item: impl FnOnce() -> Result<T>) -> Result<Self> {
        match pointer {
            Some(pointer) => Ok(Self::Ref(pointer)),
            None => item().map(Self::Item),
        }
    }
}

/// Parsed and (after normalization) canonical API description.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// `openapi` version string.
    pub openapi: String,
    pub info: Info,
    /// URL templates in declaration order.
    pub paths: IndexMap<String, PathItem>,
    pub components: Components,
    /// Distinct first tags in order of first appearance. Filled by the normalizer.
    pub controllers: Vec<String>,
}

/// Document metadata.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Info {
    pub title: String,
    pub version: String,
    pub description: Option<String>,
}

/// Registries of named, reusable objects.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Components {
    /// Schema registry keyed by canonical name.
    pub schemas: IndexMap<String, SchemaNode>,
    pub parameters: IndexMap<String, RefOr<Parameter>>,
    pub request_bodies: IndexMap<String, RefOr<RequestBody>>,
    pub responses: IndexMap<String, RefOr<Response>>,
    pub headers: IndexMap<String, RefOr<Header>>,
    pub examples: IndexMap<String, RefOr<Example>>,
    pub links: IndexMap<String, RefOr<Link>>,
}

/// Operations sharing a URL template.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PathItem {
    pub summary: Option<String>,
    pub description: Option<String>,
    /// Shared parameters; operation-level parameters override them.
    pub parameters: Vec<RefOr<Parameter>>,
    pub operations: BTreeMap<HttpMethod, Operation>,
}

/// One method on one URL template.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Operation {
    /// Always `Some` after normalization.
    pub operation_id: Option<String>,
    pub tags: Vec<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub deprecated: bool,
    pub parameters: Vec<RefOr<Parameter>>,
    pub request_body: Option<RefOr<RequestBody>>,
    /// Status code (or `default`, `2XX`) to response.
    pub responses: IndexMap<String, RefOr<Response>>,
}

impl Operation {
    /// The status whose body is the operation's result.
    ///
    /// This is the lowest explicit 2xx code, then a `2XX` range, then `default`.
    pub fn primary_success_status(&self) -> Option<&str> {
        let lowest = self
            .responses
            .keys()
            .filter_map(|status| status.parse::<u16>().ok().map(|code| (code, status)))
            .filter(|(code, _)| (200..300).contains(code))
            .min_by_key(|(code, _)| *code)
            .map(|(_, status)| status.as_str());

        lowest
            .or_else(|| {
                self.responses
                    .keys()
                    .find(|s| s.eq_ignore_ascii_case("2XX"))
                    .map(String::as_str)
            })
            .or_else(|| {
                self.responses
                    .keys()
                    .find(|s| *s == "default")
                    .map(String::as_str)
            })
    }

    /// The first tag, which names the operation's controller.
    pub fn primary_tag(&self) -> Option<&str> {
        self.tags.first().map(String::as_str)
    }
}

/// Where a parameter is carried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamLocation {
    Path,
    Query,
    Header,
    Cookie,
}

impl ParamLocation {
    fn parse(location: &str) -> Option<Self> {
        match location {
            "path" => Some(Self::Path),
            "query" => Some(Self::Query),
            "header" => Some(Self::Header),
            "cookie" => Some(Self::Cookie),
            _ => None,
        }
    }
}

/// Operation parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub location: ParamLocation,
    pub description: Option<String>,
    /// Path parameters are always required.
    pub required: bool,
    /// Defaults to an unconstrained string when the document omits it.
    pub schema: SchemaNode,
}

/// Request body.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestBody {
    pub description: Option<String>,
    pub required: bool,
    /// Content type to media entry, in declaration order.
    pub content: IndexMap<String, MediaType>,
}

/// Response for one status.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Response {
    pub description: Option<String>,
    pub content: IndexMap<String, MediaType>,
    pub headers: IndexMap<String, RefOr<Header>>,
    pub links: IndexMap<String, RefOr<Link>>,
}

/// Media type entry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MediaType {
    pub schema: Option<SchemaNode>,
    pub example: Option<Value>,
    pub examples: IndexMap<String, RefOr<Example>>,
}

/// Response header.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Header {
    pub description: Option<String>,
    pub required: bool,
    pub schema: Option<SchemaNode>,
}

/// Named example.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Example {
    pub summary: Option<String>,
    pub value: Option<Value>,
    pub external_value: Option<String>,
}

/// Link to another operation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Link {
    pub operation_id: Option<String>,
    pub operation_ref: Option<String>,
    pub parameters: IndexMap<String, Value>,
    pub description: Option<String>,
}

impl Document {
    /// Convert the raw serde model into the IR.
    ///
    /// Fails on documents that are not OpenAPI 3.x or carry unknown parameter locations.
    pub fn from_raw(raw: RawDocument) -> Result<Self> {
        let openapi = raw
            .openapi
            .ok_or_else(|| Error::Parse("missing 'openapi' version field".to_string()))?;
        if !openapi.starts_with("3.") {
            return Err(Error::Parse(format!(
                "unsupported OpenAPI version '{openapi}', expected 3.x"
            )));
        }

        let paths = raw
            .paths
            .into_iter()
            .map(|(path, item)| Ok((path.clone(), convert_path_item(&path, item)?)))
            .collect::<Result<IndexMap<_, _>>>()?;

        Ok(Self {
            openapi,
            info: Info {
                title: raw.info.title,
                version: raw.info.version,
                description: raw.info.description,
            },
            paths,
            components: convert_components(raw.components)?,
            controllers: Vec::new(),
        })
    }

    /// Iterate `(path, method, operation)` in declaration order.
    pub fn operations(&self) -> impl Iterator<Item = (&str, HttpMethod, &Operation)> {
        self.paths.iter().flat_map(|(path, item)| {
            item.operations
                .iter()
                .map(move |(method, op)| (path.as_str(), *method, op))
        })
    }
}

fn convert_components(raw: RawComponents) -> Result<Components> {
    Ok(Components {
        schemas: raw
            .schemas
            .iter()
            .map(|(name, schema)| (name.clone(), SchemaNode::from_raw(schema)))
            .collect(),
        parameters: raw
            .parameters
            .into_iter()
            .map(|(name, p)| Ok((name.clone(), convert_parameter(p, &name)?)))
            .collect::<Result<_>>()?,
        request_bodies: raw
            .request_bodies
            .into_iter()
            .map(|(name, b)| (name, convert_request_body(b)))
            .collect(),
        responses: raw
            .responses
            .into_iter()
            .map(|(name, r)| (name, convert_response(r)))
            .collect(),
        headers: raw
            .headers
            .into_iter()
            .map(|(name, h)| (name, convert_header(h)))
            .collect(),
        examples: raw
            .examples
            .into_iter()
            .map(|(name, e)| (name, convert_example(e)))
            .collect(),
        links: raw
            .links
            .into_iter()
            .map(|(name, l)| (name, convert_link(l)))
            .collect(),
    })
}

fn convert_path_item(path: &str, raw: RawPathItem) -> Result<PathItem> {
    let parameters = raw
        .parameters
        .into_iter()
        .map(|p| convert_parameter(p, path))
        .collect::<Result<Vec<_>>>()?;

    let mut operations = BTreeMap::new();
    let slots = [
        (HttpMethod::Get, raw.get),
        (HttpMethod::Put, raw.put),
        (HttpMethod::Post, raw.post),
        (HttpMethod::Delete, raw.delete),
        (HttpMethod::Options, raw.options),
        (HttpMethod::Head, raw.head),
        (HttpMethod::Patch, raw.patch),
        (HttpMethod::Trace, raw.trace),
    ];
    for (method, op) in slots {
        if let Some(op) = op {
            let location = format!("{method} {path}");
            operations.insert(method, convert_operation(op, &location)?);
        }
    }

    Ok(PathItem {
        summary: raw.summary,
        description: raw.description,
        parameters,
        operations,
    })
}

fn convert_operation(raw: RawOperation, location: &str) -> Result<Operation> {
    Ok(Operation {
        operation_id: raw.operation_id,
        tags: raw.tags,
        summary: raw.summary,
        description: raw.description,
        deprecated: raw.deprecated,
        parameters: raw
            .parameters
            .into_iter()
            .map(|p| convert_parameter(p, location))
            .collect::<Result<_>>()?,
        request_body: raw.request_body.map(convert_request_body),
        responses: raw
            .responses
            .into_iter()
            .map(|(status, r)| (status, convert_response(r)))
            .collect(),
    })
}

fn convert_parameter(raw: RawParameter, location: &str) -> Result<RefOr<Parameter>> {
    RefOr::from_pointer_or(raw.ref_path, || {
        let param_location = ParamLocation::parse(&raw.location).ok_or_else(|| {
            Error::Parse(format!(
                "parameter '{}' at {location} has unknown location '{}'",
                raw.name, raw.location
            ))
        })?;
        Ok(Parameter {
            required: raw.required || param_location == ParamLocation::Path,
            schema: raw.schema.as_ref().map_or_else(
                || SchemaNode::String(Default::default()),
                SchemaNode::from_raw,
            ),
            name: raw.name,
            location: param_location,
            description: raw.description,
        })
    })
}

fn infallible<T>(pointer: Option<String>, item: impl FnOnce() -> T) -> RefOr<T> {
    match pointer {
        Some(pointer) => RefOr::Ref(pointer),
        None => RefOr::Item(item()),
    }
}

fn convert_request_body(raw: RawRequestBody) -> RefOr<RequestBody> {
    infallible(raw.ref_path, || RequestBody {
        description: raw.description,
        required: raw.required,
        content: convert_content(raw.content),
    })
}

fn convert_response(raw: RawResponse) -> RefOr<Response> {
    infallible(raw.ref_path, || Response {
        description: raw.description,
        content: convert_content(raw.content),
        headers: raw
            .headers
            .into_iter()
            .map(|(name, h)| (name, convert_header(h)))
            .collect(),
        links: raw
            .links
            .into_iter()
            .map(|(name, l)| (name, convert_link(l)))
            .collect(),
    })
}

fn convert_content(raw: IndexMap<String, RawMediaType>) -> IndexMap<String, MediaType> {
    raw.into_iter()
        .map(|(content_type, media)| {
            (
                content_type,
                MediaType {
                    schema: media.schema.as_ref().map(SchemaNode::from_raw),
                    example: media.example,
                    examples: media
                        .examples
                        .into_iter()
                        .map(|(name, e)| (name, convert_example(e)))
                        .collect(),
                },
            )
        })
        .collect()
}

fn convert_header(raw: RawHeader) -> RefOr<Header> {
    infallible(raw.ref_path, || Header {
        description: raw.description,
        required: raw.required,
        schema: raw.schema.as_ref().map(SchemaNode::from_raw),
    })
}

fn convert_example(raw: RawExample) -> RefOr<Example> {
    infallible(raw.ref_path, || Example {
        summary: raw.summary,
        value: raw.value,
        external_value: raw.external_value,
    })
}

fn convert_link(raw: RawLink) -> RefOr<Link> {
    infallible(raw.ref_path, || Link {
        operation_id: raw.operation_id,
        operation_ref: raw.operation_ref,
        parameters: raw.parameters,
        description: raw.description,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn operation_with_statuses(statuses: &[&str]) -> Operation {
        Operation {
            responses: statuses
                .iter()
                .map(|s| (s.to_string(), RefOr::Item(Response::default())))
                .collect(),
            ..Operation::default()
        }
    }

    #[test]
    fn test_primary_success_status() {
        assert_eq!(
            operation_with_statuses(&["404", "201", "200"]).primary_success_status(),
            Some("200")
        );
        assert_eq!(
            operation_with_statuses(&["default", "2XX"]).primary_success_status(),
            Some("2XX")
        );
        assert_eq!(
            operation_with_statuses(&["400", "default"]).primary_success_status(),
            Some("default")
        );
        assert_eq!(operation_with_statuses(&["500"]).primary_success_status(), None);
    }

    #[test]
    fn test_method_order() {
        let mut methods = vec![HttpMethod::Delete, HttpMethod::Get, HttpMethod::Post];
        methods.sort();
        assert_eq!(methods, [HttpMethod::Get, HttpMethod::Post, HttpMethod::Delete]);
        assert_eq!(HttpMethod::Patch.to_string(), "PATCH");
    }

    #[test]
    fn test_rejects_swagger_2() {
        let raw = RawDocument {
            openapi: Some("2.0".into()),
            ..RawDocument::default()
        };
        assert!(matches!(Document::from_raw(raw), Err(Error::Parse(_))));
    }
}
