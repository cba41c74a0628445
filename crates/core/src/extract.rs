//! Request descriptor extraction.
//!
//! Flattens each `path × method × request content type × response content
//! type` combination of a normalized document into a [`RequestDescriptor`].

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::diagnostic::{Diagnostic, DiagnosticKind};
use crate::openapi::{
    Document, HttpMethod, MediaType, Operation, ParamLocation, Parameter, PathItem, RefOr,
    Response,
};

/// Parameter carried by a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Variable {
    pub name: String,
    pub location: ParamLocation,
    pub required: bool,
    /// Registry name of the parameter schema.
    pub type_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A body of one content type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payload {
    /// Registry name, or `None` when the media entry has no schema.
    pub type_name: Option<String>,
    pub content_type: String,
}

/// What a successful call yields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ResponseShape {
    /// A body of one content type.
    Body(Payload),
    /// Success without content.
    Empty,
    /// The response is not inspected (DELETE).
    Untracked,
}

/// One concrete request variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestDescriptor {
    pub source: String,
    /// First tag split on `/`; empty for untagged operations.
    pub controller: Vec<String>,
    pub operation_id: String,
    pub method: HttpMethod,
    /// URL template with `{param}` placeholders.
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub deprecated: bool,
    pub variables: Vec<Variable>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_body: Option<Payload>,
    #[serde(default)]
    pub body_required: bool,
    pub response: ResponseShape,
    /// Status to error body type, for non-2xx statuses with a body.
    #[serde(default)]
    pub errors: BTreeMap<String, String>,
}

/// Identity of a descriptor: `(url, method, request ct, response ct)`.
pub type DescriptorKey = (String, HttpMethod, Option<String>, Option<String>);

impl RequestDescriptor {
    /// Identity tuple.
    pub fn key(&self) -> DescriptorKey {
        (
            self.url.clone(),
            self.method,
            self.request_content_type().map(str::to_string),
            self.response_content_type().map(str::to_string),
        )
    }

    /// Content type of the request body, if any.
    pub fn request_content_type(&self) -> Option<&str> {
        self.request_body.as_ref().map(|p| p.content_type.as_str())
    }

    /// Content type of the success body, if any.
    pub fn response_content_type(&self) -> Option<&str> {
        match &self.response {
            ResponseShape::Body(payload) => Some(&payload.content_type),
            ResponseShape::Empty | ResponseShape::Untracked => None,
        }
    }

    /// Registry name of the success body type, if any.
    pub fn response_type(&self) -> Option<&str> {
        match &self.response {
            ResponseShape::Body(payload) => payload.type_name.as_deref(),
            ResponseShape::Empty | ResponseShape::Untracked => None,
        }
    }

    /// Distinct error body types.
    pub fn error_types(&self) -> BTreeSet<&str> {
        self.errors.values().map(String::as_str).collect()
    }

    /// Variables carried in `location`.
    pub fn variables_in(&self, location: ParamLocation) -> impl Iterator<Item = &Variable> {
        self.variables.iter().filter(move |v| v.location == location)
    }

    /// Every registry name this request refers to.
    pub fn referenced_types(&self) -> BTreeSet<&str> {
        let mut types: BTreeSet<&str> = self.variables.iter().map(|v| v.type_name.as_str()).collect();
        types.extend(self.request_body.as_ref().and_then(|p| p.type_name.as_deref()));
        types.extend(self.response_type());
        types.extend(self.error_types());
        types
    }
}

/// Descriptors plus the operations that were skipped.
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    pub descriptors: Vec<RequestDescriptor>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Placeholders of a URL template, in order (`/a/{x}/b/{y}` → `[x, y]`).
pub fn path_placeholders(url: &str) -> Vec<&str> {
    let mut placeholders = Vec::new();
    let mut rest = url;
    while let Some(start) = rest.find('{') {
        let after = &rest[start + 1..];
        let Some(end) = after.find('}') else {
            break;
        };
        placeholders.push(&after[..end]);
        rest = &after[end + 1..];
    }
    placeholders
}

fn is_success_status(status: &str) -> bool {
    status.eq_ignore_ascii_case("2XX")
        || status
            .parse::<u16>()
            .is_ok_and(|code| (200..300).contains(&code))
}

/// Extract descriptors from a normalized document.
pub fn extract(source: &str, document: &Document) -> Extraction {
    let mut extraction = Extraction::default();

    for (url, item) in &document.paths {
        for (method, op) in &item.operations {
            match extract_operation(source, url, *method, item, op) {
                Ok(descriptors) => extraction.descriptors.extend(descriptors),
                Err(message) => {
                    let subject = op
                        .operation_id
                        .clone()
                        .unwrap_or_else(|| format!("{method} {url}"));
                    extraction.diagnostics.push(Diagnostic::error(
                        DiagnosticKind::MalformedOperation,
                        subject,
                        message,
                    ));
                }
            }
        }
    }

    debug!(
        source = %source,
        descriptors = extraction.descriptors.len(),
        skipped = extraction.diagnostics.len(),
        "Extracted request descriptors."
    );
    extraction
}

fn extract_operation(
    source: &str,
    url: &str,
    method: HttpMethod,
    item: &PathItem,
    op: &Operation,
) -> Result<Vec<RequestDescriptor>, String> {
    let operation_id = op
        .operation_id
        .clone()
        .ok_or_else(|| format!("{method} {url} has no operationId"))?;

    let variables = merge_variables(&item.parameters, &op.parameters)?;
    for placeholder in path_placeholders(url) {
        let declared = variables
            .iter()
            .any(|v| v.location == ParamLocation::Path && v.name == placeholder);
        if !declared {
            return Err(format!(
                "path placeholder '{{{placeholder}}}' in {url} has no matching path parameter"
            ));
        }
    }

    let body = match &op.request_body {
        None => None,
        Some(RefOr::Item(body)) => Some(body),
        Some(RefOr::Ref(pointer)) => return Err(format!("unresolved request body '{pointer}'")),
    };
    let request_payloads = match body {
        Some(body) => payloads(&body.content)?,
        None => Vec::new(),
    };
    let body_required = body.is_some_and(|b| b.required);

    let primary = op.primary_success_status();
    let mut errors = BTreeMap::new();
    let mut success_payloads = Vec::new();
    for (status, response) in &op.responses {
        let response = resolved(response)?;
        if Some(status.as_str()) == primary {
            success_payloads = payloads(&response.content)?;
        } else if !is_success_status(status) {
            let first_type = payloads(&response.content)?
                .into_iter()
                .find_map(|p| p.type_name);
            if let Some(type_name) = first_type {
                errors.insert(status.clone(), type_name);
            }
        }
    }

    let template = RequestDescriptor {
        source: source.to_string(),
        controller: op
            .primary_tag()
            .map(|tag| {
                tag.split('/')
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default(),
        operation_id,
        method,
        url: url.to_string(),
        summary: op.summary.clone(),
        description: op.description.clone(),
        tags: op.tags.clone(),
        deprecated: op.deprecated,
        variables,
        request_body: None,
        body_required,
        response: ResponseShape::Empty,
        errors,
    };

    if method == HttpMethod::Delete {
        return Ok(vec![RequestDescriptor {
            request_body: request_payloads.into_iter().next(),
            response: ResponseShape::Untracked,
            ..template
        }]);
    }

    let requests: Vec<Option<Payload>> = if request_payloads.is_empty() {
        vec![None]
    } else {
        request_payloads.into_iter().map(Some).collect()
    };
    let responses: Vec<ResponseShape> = if success_payloads.is_empty() {
        vec![ResponseShape::Empty]
    } else {
        success_payloads.into_iter().map(ResponseShape::Body).collect()
    };

    let mut descriptors = Vec::with_capacity(requests.len() * responses.len());
    for request in &requests {
        for response in &responses {
            descriptors.push(RequestDescriptor {
                request_body: request.clone(),
                response: response.clone(),
                ..template.clone()
            });
        }
    }
    Ok(descriptors)
}

fn resolved(response: &RefOr<Response>) -> Result<&Response, String> {
    match response {
        RefOr::Item(response) => Ok(response),
        RefOr::Ref(pointer) => Err(format!("unresolved response '{pointer}'")),
    }
}

fn payloads(content: &indexmap::IndexMap<String, MediaType>) -> Result<Vec<Payload>, String> {
    content
        .iter()
        .map(|(content_type, media)| {
            let type_name = match &media.schema {
                None => None,
                Some(schema) => Some(
                    schema
                        .as_ref_name()
                        .ok_or_else(|| format!("inline schema for '{content_type}' was not hoisted"))?
                        .to_string(),
                ),
            };
            Ok(Payload {
                type_name,
                content_type: content_type.clone(),
            })
        })
        .collect()
}

fn variable(param: &RefOr<Parameter>) -> Result<Option<Variable>, String> {
    let param = match param {
        RefOr::Item(param) => param,
        RefOr::Ref(pointer) => return Err(format!("unresolved parameter '{pointer}'")),
    };
    if param.location == ParamLocation::Cookie {
        return Ok(None);
    }
    let type_name = param
        .schema
        .as_ref_name()
        .ok_or_else(|| format!("inline schema for parameter '{}' was not hoisted", param.name))?;
    Ok(Some(Variable {
        name: param.name.clone(),
        location: param.location,
        required: param.required,
        type_name: type_name.to_string(),
        description: param.description.clone(),
    }))
}

/// Path-level parameters overridden by operation-level ones on `(name, location)`.
fn merge_variables(
    shared: &[RefOr<Parameter>],
    own: &[RefOr<Parameter>],
) -> Result<Vec<Variable>, String> {
    let mut merged: Vec<Variable> = Vec::new();
    for param in shared.iter().chain(own) {
        let Some(var) = variable(param)? else {
            continue;
        };
        match merged
            .iter_mut()
            .find(|v| v.name == var.name && v.location == var.location)
        {
            Some(existing) => *existing = var,
            None => merged.push(var),
        }
    }
    Ok(merged)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::normalize::normalize;
    use crate::openapi::parse_document;
    use pretty_assertions::assert_eq;

    fn extract_json(json: &str) -> Extraction {
        let doc = normalize(parse_document(json, None).unwrap()).unwrap();
        extract("pets", &doc)
    }

    #[test]
    fn test_path_placeholders() {
        assert_eq!(path_placeholders("/a/{x}/b/{y}"), ["x", "y"]);
        assert_eq!(path_placeholders("/files/{name}.json"), ["name"]);
        assert!(path_placeholders("/plain").is_empty());
    }

    #[test]
    fn test_two_by_two_fan_out() {
        let extraction = extract_json(
            r#"{"openapi": "3.0.0", "paths": {"/convert": {"post": {
                "operationId": "convert",
                "requestBody": {"content": {
                    "application/json": {"schema": {"type": "object"}},
                    "application/xml": {"schema": {"type": "string"}}
                }},
                "responses": {"200": {"description": "ok", "content": {
                    "application/json": {"schema": {"type": "object"}},
                    "text/plain": {"schema": {"type": "string"}}
                }}}
            }}}}"#,
        );
        let keys: Vec<_> = extraction
            .descriptors
            .iter()
            .map(|d| (d.request_content_type().unwrap(), d.response_content_type().unwrap()))
            .collect();
        assert_eq!(
            keys,
            [
                ("application/json", "application/json"),
                ("application/json", "text/plain"),
                ("application/xml", "application/json"),
                ("application/xml", "text/plain"),
            ]
        );
    }

    #[test]
    fn test_delete_is_single_and_untracked() {
        let extraction = extract_json(
            r#"{"openapi": "3.0.0", "paths": {"/pets/{id}": {"delete": {
                "parameters": [{"name": "id", "in": "path", "schema": {"type": "string"}}],
                "requestBody": {"content": {
                    "application/json": {"schema": {"type": "object"}},
                    "application/xml": {"schema": {"type": "object"}}
                }},
                "responses": {"200": {"description": "ok", "content": {
                    "application/json": {"schema": {"type": "object"}}
                }}}
            }}}}"#,
        );
        assert_eq!(extraction.descriptors.len(), 1);
        let d = &extraction.descriptors[0];
        assert_eq!(d.response, ResponseShape::Untracked);
        assert_eq!(d.request_content_type(), Some("application/json"));
    }

    #[test]
    fn test_variables_merge_and_skip_cookies() {
        let extraction = extract_json(
            r#"{"openapi": "3.0.0", "paths": {"/pets/{id}": {
                "parameters": [
                    {"name": "id", "in": "path", "schema": {"type": "string"}},
                    {"name": "verbose", "in": "query", "schema": {"type": "boolean"}}
                ],
                "get": {
                    "operationId": "getPet",
                    "parameters": [
                        {"name": "verbose", "in": "query", "required": true, "schema": {"type": "boolean"}},
                        {"name": "session", "in": "cookie", "schema": {"type": "string"}},
                        {"name": "X-Trace", "in": "header", "schema": {"type": "string"}}
                    ],
                    "responses": {"204": {"description": "no content"}}
                }
            }}}"#,
        );
        let d = &extraction.descriptors[0];
        let vars: Vec<_> = d
            .variables
            .iter()
            .map(|v| (v.name.as_str(), v.location, v.required))
            .collect();
        assert_eq!(
            vars,
            [
                ("id", ParamLocation::Path, true),
                ("verbose", ParamLocation::Query, true),
                ("X-Trace", ParamLocation::Header, false),
            ]
        );
        assert_eq!(d.response, ResponseShape::Empty);
    }

    #[test]
    fn test_error_map() {
        let extraction = extract_json(
            r##"{"openapi": "3.0.0", "paths": {"/pets": {"get": {
                "operationId": "listPets",
                "responses": {
                    "200": {"description": "ok", "content": {"application/json": {"schema": {"type": "array", "items": {}}}}},
                    "404": {"description": "missing", "content": {
                        "application/json": {"schema": {"$ref": "#/components/schemas/Problem"}},
                        "application/problem+json": {"schema": {"$ref": "#/components/schemas/Problem"}}
                    }},
                    "default": {"description": "error", "content": {"application/json": {"schema": {"$ref": "#/components/schemas/Error"}}}}
                }
            }}},
            "components": {"schemas": {"Problem": {"type": "object"}, "Error": {"type": "object"}}}}"##,
        );
        let d = &extraction.descriptors[0];
        assert_eq!(d.errors.len(), 2);
        assert_eq!(d.errors["404"], "Problem");
        assert_eq!(d.errors["default"], "Error");
        assert_eq!(d.error_types().into_iter().collect::<Vec<_>>(), ["Error", "Problem"]);
        assert_eq!(d.response_type(), Some("ListPets$ResponseBody"));
    }

    #[test]
    fn test_default_only_is_success() {
        let extraction = extract_json(
            r#"{"openapi": "3.0.0", "paths": {"/ping": {"get": {
                "operationId": "ping",
                "responses": {"default": {"description": "ok", "content": {"text/plain": {"schema": {"type": "string"}}}}}
            }}}}"#,
        );
        let d = &extraction.descriptors[0];
        assert_eq!(d.response_content_type(), Some("text/plain"));
        assert!(d.errors.is_empty());
    }

    #[test]
    fn test_missing_path_parameter_is_reported() {
        let extraction = extract_json(
            r#"{"openapi": "3.0.0", "paths": {
                "/pets/{id}": {"get": {"operationId": "getPet", "responses": {}}},
                "/pets": {"get": {"operationId": "listPets", "responses": {}}}
            }}"#,
        );
        assert_eq!(extraction.descriptors.len(), 1);
        assert_eq!(extraction.diagnostics.len(), 1);
        let diagnostic = &extraction.diagnostics[0];
        assert_eq!(diagnostic.kind, DiagnosticKind::MalformedOperation);
        assert_eq!(diagnostic.subject.as_deref(), Some("getPet"));
        assert!(diagnostic.is_error());
    }

    #[test]
    fn test_controller_segments() {
        let extraction = extract_json(
            r#"{"openapi": "3.0.0", "paths": {"/users": {"get": {
                "operationId": "listUsers", "tags": ["admin/users", "other"], "responses": {}
            }}}}"#,
        );
        assert_eq!(extraction.descriptors[0].controller, ["admin", "users"]);
    }

    #[test]
    fn test_descriptor_serializes_response_kind() {
        let extraction = extract_json(
            r#"{"openapi": "3.0.0", "paths": {"/a": {"get": {"operationId": "a", "responses": {}}}}}"#,
        );
        let value = serde_json::to_value(&extraction.descriptors[0]).unwrap();
        assert_eq!(value["response"], serde_json::json!({"kind": "empty"}));
        assert_eq!(value["method"], "GET");
    }
}
