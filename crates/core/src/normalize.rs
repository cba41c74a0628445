//! Canonicalization of a parsed document.
//!
//! Normalization takes the document by value and returns the canonical form:
//!
//! - every component reference is replaced by a copy of its target
//! - every operation has a unique `operation_id`
//! - every parameter, request-body and response-body schema is a named
//!   registry reference
//! - every structured property schema (object with properties, or a
//!   composition) is a registry reference named `<Parent>$<Property>`
//! - `controllers` lists the distinct first tags
//!
//! Running it again on its own output changes nothing.

use std::collections::HashSet;

use indexmap::IndexMap;
use tracing::{debug, warn};

use crate::diagnostic::{Diagnostic, DiagnosticKind};
use crate::error::{Error, Result};
use crate::naming::{content_type_short_name, hoisted_schema_name, pascal_case, synthesize_operation_id};
use crate::openapi::{
    Components, Document, Example, Header, Link, MediaType, Operation, Parameter, PathItem,
    RefOr, RequestBody, Response, SchemaNode, unescape_pointer_token,
};

/// Normalize a document, discarding diagnostics.
pub fn normalize(document: Document) -> Result<Document> {
    normalize_with_diagnostics(document).map(|(document, _)| document)
}

/// Normalize a document and report renamed duplicate operation ids.
pub fn normalize_with_diagnostics(mut document: Document) -> Result<(Document, Vec<Diagnostic>)> {
    dereference(&mut document)?;
    let diagnostics = assign_operation_ids(&mut document.paths);
    let hoisted = hoist_inline_schemas(&mut document);
    document.controllers = collect_controllers(&document);
    verify_schema_refs(&document)?;

    debug!(
        hoisted,
        schemas = document.components.schemas.len(),
        controllers = document.controllers.len(),
        "Normalized document."
    );
    Ok((document, diagnostics))
}

// ---------------------------------------------------------------------------
// Step 1: dereference components
// ---------------------------------------------------------------------------

trait Component: Clone {
    const SECTION: &'static str;
    fn table(components: &Components) -> &IndexMap<String, RefOr<Self>>;
}

macro_rules! component {
    ($ty:ty, $section:literal, $field:ident) => {
        impl Component for $ty {
            const SECTION: &'static str = $section;
            fn table(components: &Components) -> &IndexMap<String, RefOr<Self>> {
                &components.$field
            }
        }
    };
}

component!(Parameter, "parameters", parameters);
component!(RequestBody, "requestBodies", request_bodies);
component!(Response, "responses", responses);
component!(Header, "headers", headers);
component!(Example, "examples", examples);
component!(Link, "links", links);

/// Follow a reference chain to its target.
fn resolve<T: Component>(components: &Components, value: &RefOr<T>, location: &str) -> Result<T> {
    let prefix = format!("#/components/{}/", T::SECTION);
    let mut seen: Vec<&str> = Vec::new();
    let mut current = value;

    loop {
        let pointer = match current {
            RefOr::Item(item) => return Ok(item.clone()),
            RefOr::Ref(pointer) => pointer.as_str(),
        };
        if seen.contains(&pointer) {
            return Err(Error::RefCycle {
                reference: pointer.to_string(),
                location: location.to_string(),
            });
        }
        seen.push(pointer);

        let dangling = || Error::DanglingRef {
            reference: pointer.to_string(),
            location: location.to_string(),
        };
        let name = pointer
            .strip_prefix(&prefix)
            .map(unescape_pointer_token)
            .ok_or_else(dangling)?;
        current = T::table(components).get(&name).ok_or_else(dangling)?;
    }
}

fn resolve_in_place<T: Component>(
    components: &Components,
    slot: &mut RefOr<T>,
    location: &str,
) -> Result<()> {
    if matches!(slot, RefOr::Ref(_)) {
        *slot = RefOr::Item(resolve(components, slot, location)?);
    }
    Ok(())
}

fn resolve_content(
    components: &Components,
    content: &mut IndexMap<String, MediaType>,
    location: &str,
) -> Result<()> {
    for media in content.values_mut() {
        for example in media.examples.values_mut() {
            resolve_in_place(components, example, location)?;
        }
    }
    Ok(())
}

fn resolve_request_body(
    components: &Components,
    slot: &mut RefOr<RequestBody>,
    location: &str,
) -> Result<()> {
    resolve_in_place(components, slot, location)?;
    if let RefOr::Item(body) = slot {
        resolve_content(components, &mut body.content, location)?;
    }
    Ok(())
}

fn resolve_response(
    components: &Components,
    slot: &mut RefOr<Response>,
    location: &str,
) -> Result<()> {
    resolve_in_place(components, slot, location)?;
    if let RefOr::Item(response) = slot {
        resolve_content(components, &mut response.content, location)?;
        for header in response.headers.values_mut() {
            resolve_in_place(components, header, location)?;
        }
        for link in response.links.values_mut() {
            resolve_in_place(components, link, location)?;
        }
    }
    Ok(())
}

fn dereference(document: &mut Document) -> Result<()> {
    let snapshot = document.components.clone();
    let components = &mut document.components;

    for (name, slot) in components.parameters.iter_mut() {
        resolve_in_place(&snapshot, slot, &format!("#/components/parameters/{name}"))?;
    }
    for (name, slot) in components.request_bodies.iter_mut() {
        resolve_request_body(&snapshot, slot, &format!("#/components/requestBodies/{name}"))?;
    }
    for (name, slot) in components.responses.iter_mut() {
        resolve_response(&snapshot, slot, &format!("#/components/responses/{name}"))?;
    }
    for (name, slot) in components.headers.iter_mut() {
        resolve_in_place(&snapshot, slot, &format!("#/components/headers/{name}"))?;
    }
    for (name, slot) in components.examples.iter_mut() {
        resolve_in_place(&snapshot, slot, &format!("#/components/examples/{name}"))?;
    }
    for (name, slot) in components.links.iter_mut() {
        resolve_in_place(&snapshot, slot, &format!("#/components/links/{name}"))?;
    }

    for (path, item) in document.paths.iter_mut() {
        for param in &mut item.parameters {
            resolve_in_place(&snapshot, param, path)?;
        }
        for (method, op) in item.operations.iter_mut() {
            let location = format!("{method} {path}");
            for param in &mut op.parameters {
                resolve_in_place(&snapshot, param, &location)?;
            }
            if let Some(body) = &mut op.request_body {
                resolve_request_body(&snapshot, body, &location)?;
            }
            for response in op.responses.values_mut() {
                resolve_response(&snapshot, response, &location)?;
            }
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Step 2: operation ids
// ---------------------------------------------------------------------------

fn first_free(base: &str, taken: &HashSet<String>) -> String {
    if !taken.contains(base) {
        return base.to_string();
    }
    let mut n = 2usize;
    loop {
        let candidate = format!("{base}{n}");
        if !taken.contains(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

fn assign_operation_ids(paths: &mut IndexMap<String, PathItem>) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();

    // Blank ids count as missing
    for item in paths.values_mut() {
        for op in item.operations.values_mut() {
            if op.operation_id.as_deref().is_some_and(|id| id.trim().is_empty()) {
                op.operation_id = None;
            }
        }
    }

    let mut taken: HashSet<String> = paths
        .values()
        .flat_map(|item| item.operations.values())
        .filter_map(|op| op.operation_id.clone())
        .collect();

    // Explicit ids first, so a synthesized id never steals a declared one
    let mut seen = HashSet::new();
    for (path, item) in paths.iter_mut() {
        for (method, op) in item.operations.iter_mut() {
            let Some(id) = op.operation_id.clone() else {
                continue;
            };
            if seen.insert(id.clone()) {
                continue;
            }
            let renamed = first_free(&id, &taken);
            warn!(
                operation_id = %id,
                renamed = %renamed,
                method = %method,
                path = %path,
                "Duplicate operationId, renaming."
            );
            diagnostics.push(Diagnostic::warning(
                DiagnosticKind::DuplicateOperationId,
                renamed.clone(),
                format!("operationId '{id}' at {method} {path} is already used; renamed to '{renamed}'"),
            ));
            taken.insert(renamed.clone());
            seen.insert(renamed.clone());
            op.operation_id = Some(renamed);
        }
    }

    for (path, item) in paths.iter_mut() {
        for (method, op) in item.operations.iter_mut() {
            if op.operation_id.is_none() {
                let id = first_free(&synthesize_operation_id(*method, path), &taken);
                debug!(operation_id = %id, method = %method, path = %path, "Synthesized operationId.");
                taken.insert(id.clone());
                op.operation_id = Some(id);
            }
        }
    }

    diagnostics
}

// ---------------------------------------------------------------------------
// Step 3: hoist inline schemas
// ---------------------------------------------------------------------------

struct Hoister<'a> {
    schemas: &'a mut IndexMap<String, SchemaNode>,
    hoisted: usize,
}

impl Hoister<'_> {
    /// Move an inline schema into the registry and leave a reference behind.
    fn hoist(&mut self, slot: &mut SchemaNode, base: &str, content_type: Option<&str>) {
        if matches!(slot, SchemaNode::Ref(_)) {
            return;
        }
        let name = self.claim(base, content_type, slot);
        let node = std::mem::replace(slot, SchemaNode::Ref(name.clone()));
        if !self.schemas.contains_key(&name) {
            self.hoisted += 1;
            self.schemas.insert(name, node);
        }
    }

    /// Pick a registry name: reuse a structurally equal entry, else disambiguate.
    fn claim(&self, base: &str, content_type: Option<&str>, node: &SchemaNode) -> String {
        let fits = |name: &str| self.schemas.get(name).is_none_or(|existing| existing == node);
        if fits(base) {
            return base.to_string();
        }

        let base = match content_type {
            Some(ct) => {
                let with_ct = format!("{base}{}", content_type_short_name(ct));
                if fits(&with_ct) {
                    return with_ct;
                }
                with_ct
            }
            None => base.to_string(),
        };

        let mut n = 2usize;
        loop {
            let candidate = format!("{base}{n}");
            if fits(&candidate) {
                return candidate;
            }
            n += 1;
        }
    }

    fn hoist_parameter(&mut self, slot: &mut RefOr<Parameter>, tag: Option<&str>, op_id: &str) {
        if let RefOr::Item(param) = slot {
            let name = hoisted_schema_name(tag, op_id, &pascal_case(&param.name));
            self.hoist(&mut param.schema, &name, None);
        }
    }

    fn hoist_operation(&mut self, op: &mut Operation) {
        let Some(op_id) = op.operation_id.clone() else {
            return;
        };
        let tag = op.primary_tag().map(str::to_string);
        let tag = tag.as_deref();

        for param in &mut op.parameters {
            self.hoist_parameter(param, tag, &op_id);
        }

        if let Some(RefOr::Item(body)) = &mut op.request_body {
            let name = hoisted_schema_name(tag, &op_id, "RequestBody");
            for (content_type, media) in body.content.iter_mut() {
                if let Some(schema) = &mut media.schema {
                    self.hoist(schema, &name, Some(content_type));
                }
            }
        }

        let primary = op.primary_success_status().map(str::to_string);
        for (status, response) in op.responses.iter_mut() {
            let RefOr::Item(response) = response else {
                continue;
            };
            let role = if primary.as_deref() == Some(status.as_str()) {
                "ResponseBody".to_string()
            } else {
                format!("ResponseBody{}", pascal_case(status))
            };
            let name = hoisted_schema_name(tag, &op_id, &role);
            for (content_type, media) in response.content.iter_mut() {
                if let Some(schema) = &mut media.schema {
                    self.hoist(schema, &name, Some(content_type));
                }
            }
        }
    }

    /// Hoist structured property schemas of `node` under `<parent>$<Prop>`.
    fn hoist_properties(&mut self, node: &mut SchemaNode, parent: &str) {
        match node {
            SchemaNode::Object(object) => {
                for property in &mut object.properties {
                    let base = format!("{parent}${}", pascal_case(&property.name));
                    self.hoist_property(&mut property.schema, &base);
                }
            }
            SchemaNode::Composition(composition) => {
                for member in &mut composition.members {
                    self.hoist_properties(member, parent);
                }
            }
            SchemaNode::Nullable(inner) => self.hoist_properties(inner, parent),
            _ => {}
        }
    }

    fn hoist_property(&mut self, slot: &mut SchemaNode, base: &str) {
        let structured = match slot {
            SchemaNode::Object(object) => !object.properties.is_empty(),
            SchemaNode::Composition(_) => true,
            SchemaNode::Nullable(inner) => return self.hoist_property(inner, base),
            SchemaNode::Array(array) => return self.hoist_property(&mut array.items, &format!("{base}Item")),
            _ => false,
        };
        if structured {
            self.hoist(slot, base, None);
        }
    }

    /// Walk every registry entry, including the ones hoisted along the way.
    fn hoist_registry_properties(&mut self) {
        let mut index = 0;
        while let Some((parent, node)) = self.schemas.get_index(index) {
            let parent = parent.clone();
            let mut node = node.clone();
            self.hoist_properties(&mut node, &parent);
            if let Some(entry) = self.schemas.get_mut(&parent) {
                *entry = node;
            }
            index += 1;
        }
    }
}

fn hoist_inline_schemas(document: &mut Document) -> usize {
    let mut hoister = Hoister {
        schemas: &mut document.components.schemas,
        hoisted: 0,
    };

    for item in document.paths.values_mut() {
        // Shared parameters are named after the first operation on the path
        let owner = item.operations.values().next().and_then(|op| {
            op.operation_id
                .clone()
                .map(|id| (op.primary_tag().map(str::to_string), id))
        });
        if let Some((tag, op_id)) = owner {
            for param in &mut item.parameters {
                hoister.hoist_parameter(param, tag.as_deref(), &op_id);
            }
        }

        for op in item.operations.values_mut() {
            hoister.hoist_operation(op);
        }
    }
    hoister.hoist_registry_properties();

    hoister.hoisted
}

// ---------------------------------------------------------------------------
// Step 4: controllers and reference check
// ---------------------------------------------------------------------------

fn collect_controllers(document: &Document) -> Vec<String> {
    let mut controllers: Vec<String> = Vec::new();
    for (_, _, op) in document.operations() {
        if let Some(tag) = op.primary_tag()
            && !controllers.iter().any(|c| c == tag)
        {
            controllers.push(tag.to_string());
        }
    }
    controllers
}

fn check_node(schemas: &IndexMap<String, SchemaNode>, node: &SchemaNode, location: &str) -> Result<()> {
    let mut missing = None;
    node.visit_refs(&mut |name| {
        if missing.is_none() && !schemas.contains_key(name) {
            missing = Some(name.to_string());
        }
    });
    match missing {
        Some(reference) => Err(Error::DanglingRef {
            reference,
            location: location.to_string(),
        }),
        None => Ok(()),
    }
}

fn verify_schema_refs(document: &Document) -> Result<()> {
    let schemas = &document.components.schemas;

    for (name, node) in schemas {
        check_node(schemas, node, &format!("#/components/schemas/{name}"))?;
        if let SchemaNode::Composition(composition) = node
            && let Some(discriminator) = &composition.discriminator
        {
            for target in discriminator.mapping.values() {
                if !schemas.contains_key(target) {
                    return Err(Error::DanglingRef {
                        reference: target.clone(),
                        location: format!("#/components/schemas/{name}/discriminator"),
                    });
                }
            }
        }
    }

    for (path, item) in &document.paths {
        for param in item.parameters.iter().filter_map(RefOr::as_item) {
            check_node(schemas, &param.schema, path)?;
        }
        for (method, op) in &item.operations {
            let location = format!("{method} {path}");
            for param in op.parameters.iter().filter_map(RefOr::as_item) {
                check_node(schemas, &param.schema, &location)?;
            }
            let bodies = op
                .request_body
                .iter()
                .filter_map(RefOr::as_item)
                .flat_map(|b| b.content.values());
            let responses = op
                .responses
                .values()
                .filter_map(RefOr::as_item)
                .flat_map(|r| r.content.values());
            for media in bodies.chain(responses) {
                if let Some(schema) = &media.schema {
                    check_node(schemas, schema, &location)?;
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::openapi::{HttpMethod, parse_document};
    use pretty_assertions::assert_eq;

    fn doc(json: &str) -> Document {
        parse_document(json, None).unwrap()
    }

    fn op<'a>(document: &'a Document, path: &str, method: HttpMethod) -> &'a Operation {
        &document.paths[path].operations[&method]
    }

    const PETSTORE: &str = r##"{
      "openapi": "3.0.3",
      "info": {"title": "Pets", "version": "1"},
      "paths": {
        "/pets": {
          "get": {
            "tags": ["pet"],
            "parameters": [{"$ref": "#/components/parameters/Limit"}],
            "responses": {"200": {"$ref": "#/components/responses/PetList"}}
          },
          "post": {
            "operationId": "createPet",
            "tags": ["pet"],
            "requestBody": {
              "content": {"application/json": {"schema": {
                "type": "object", "properties": {"name": {"type": "string"}}
              }}}
            },
            "responses": {
              "201": {"description": "created"},
              "400": {"description": "bad", "content": {"application/json": {
                "schema": {"type": "object", "properties": {"message": {"type": "string"}}}
              }}}
            }
          }
        },
        "/pets/{id}": {
          "parameters": [{"name": "id", "in": "path", "schema": {"type": "integer"}}],
          "get": {
            "tags": ["pet"],
            "responses": {"200": {"description": "ok", "content": {"application/json": {
              "schema": {"$ref": "#/components/schemas/Pet"}
            }}}}
          },
          "delete": {"tags": ["admin"], "responses": {"204": {"description": "gone"}}}
        },
        "/health": {"get": {"responses": {"200": {"description": "ok"}}}}
      },
      "components": {
        "schemas": {"Pet": {"type": "object", "properties": {"name": {"type": "string"}}}},
        "parameters": {"Limit": {"$ref": "#/components/parameters/RealLimit"},
                       "RealLimit": {"name": "limit", "in": "query", "schema": {"type": "integer"}}},
        "responses": {"PetList": {"description": "ok", "content": {"application/json": {
          "schema": {"type": "array", "items": {"$ref": "#/components/schemas/Pet"}}
        }}}}
      }
    }"##;

    #[test]
    fn test_dereferences_chains() {
        let normalized = normalize(doc(PETSTORE)).unwrap();
        let list = op(&normalized, "/pets", HttpMethod::Get);
        let RefOr::Item(param) = &list.parameters[0] else {
            panic!("parameter not dereferenced");
        };
        assert_eq!(param.name, "limit");
        assert!(list.responses["200"].as_item().is_some());
    }

    #[test]
    fn test_synthesizes_operation_ids() {
        let normalized = normalize(doc(PETSTORE)).unwrap();
        let ids: Vec<_> = normalized
            .operations()
            .map(|(_, _, op)| op.operation_id.clone().unwrap())
            .collect();
        assert_eq!(
            ids,
            ["getPets", "createPet", "getPetsById", "deletePetsById", "getHealth"]
        );
    }

    #[test]
    fn test_hoists_with_tag_prefixed_names() {
        let normalized = normalize(doc(PETSTORE)).unwrap();
        let names: Vec<_> = normalized.components.schemas.keys().cloned().collect();
        assert_eq!(
            names,
            [
                "Pet",
                "Pet$GetPets$Limit",
                "Pet$GetPets$ResponseBody",
                "Pet$CreatePet$RequestBody",
                "Pet$CreatePet$ResponseBody400",
                "Pet$GetPetsById$Id",
            ]
        );

        let create = op(&normalized, "/pets", HttpMethod::Post);
        let body = create.request_body.as_ref().unwrap().as_item().unwrap();
        assert_eq!(
            body.content["application/json"].schema,
            Some(SchemaNode::Ref("Pet$CreatePet$RequestBody".into()))
        );
    }

    #[test]
    fn test_controllers_in_first_appearance_order() {
        let normalized = normalize(doc(PETSTORE)).unwrap();
        assert_eq!(normalized.controllers, ["pet", "admin"]);
    }

    #[test]
    fn test_idempotent() {
        let once = normalize(doc(PETSTORE)).unwrap();
        let twice = normalize(once.clone()).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_duplicate_operation_ids_are_renamed() {
        let json = r#"{"openapi": "3.0.0", "paths": {
            "/a": {"get": {"operationId": "fetch", "responses": {}}},
            "/b": {"get": {"operationId": "fetch", "responses": {}}},
            "/c": {"get": {"operationId": "fetch2", "responses": {}}}
        }}"#;
        let (normalized, diagnostics) = normalize_with_diagnostics(doc(json)).unwrap();
        let ids: Vec<_> = normalized
            .operations()
            .map(|(_, _, op)| op.operation_id.clone().unwrap())
            .collect();
        assert_eq!(ids, ["fetch", "fetch3", "fetch2"]);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].kind, DiagnosticKind::DuplicateOperationId);
    }

    #[test]
    fn test_synthesized_ids_avoid_declared_ones() {
        let json = r#"{"openapi": "3.0.0", "paths": {
            "/pets": {"get": {"responses": {}}},
            "/other": {"get": {"operationId": "getPets", "responses": {}}}
        }}"#;
        let normalized = normalize(doc(json)).unwrap();
        assert_eq!(
            op(&normalized, "/pets", HttpMethod::Get).operation_id.as_deref(),
            Some("getPets2")
        );
    }

    #[test]
    fn test_name_clash_appends_content_type() {
        let json = r#"{"openapi": "3.0.0", "paths": {"/upload": {"post": {
            "operationId": "upload",
            "requestBody": {"content": {
                "application/json": {"schema": {"type": "object"}},
                "application/xml": {"schema": {"type": "string"}}
            }},
            "responses": {}
        }}}}"#;
        let normalized = normalize(doc(json)).unwrap();
        let names: Vec<_> = normalized.components.schemas.keys().cloned().collect();
        assert_eq!(names, ["Upload$RequestBody", "Upload$RequestBodyXml"]);
    }

    #[test]
    fn test_identical_inline_schemas_share_a_name() {
        let json = r#"{"openapi": "3.0.0", "paths": {"/upload": {"post": {
            "operationId": "upload",
            "requestBody": {"content": {
                "application/json": {"schema": {"type": "string"}},
                "text/plain": {"schema": {"type": "string"}}
            }},
            "responses": {}
        }}}}"#;
        let normalized = normalize(doc(json)).unwrap();
        assert_eq!(normalized.components.schemas.len(), 1);
    }

    const NESTED: &str = r##"{"openapi": "3.0.0", "paths": {"/pets": {"post": {
        "operationId": "createPet",
        "tags": ["pet"],
        "requestBody": {"content": {"application/json": {"schema": {
            "type": "object", "properties": {
                "owner": {"type": "object", "properties": {
                    "address": {"type": "object", "properties": {"city": {"type": "string"}}}
                }},
                "tags": {"type": "array", "items": {"type": "object", "properties": {"label": {"type": "string"}}}},
                "labels": {"type": "object", "additionalProperties": {"type": "string"}}
            }
        }}}},
        "responses": {}
      }}},
      "components": {"schemas": {
        "Pet": {"type": "object", "properties": {
            "owner": {"type": "object", "properties": {
                "address": {"type": "object", "properties": {"city": {"type": "string"}}}
            }},
            "kind": {"oneOf": [{"type": "string"}, {"type": "integer"}]}
        }}
      }}
    }"##;

    fn inline_property(node: &SchemaNode) -> bool {
        let structured = |slot: &SchemaNode| match slot {
            SchemaNode::Object(object) => !object.properties.is_empty(),
            SchemaNode::Composition(_) => true,
            _ => false,
        };
        match node {
            SchemaNode::Object(object) => object.properties.iter().any(|property| {
                let mut slot = &property.schema;
                loop {
                    match slot {
                        SchemaNode::Nullable(inner) => slot = inner,
                        SchemaNode::Array(array) => slot = &array.items,
                        other => return structured(other),
                    }
                }
            }),
            SchemaNode::Composition(composition) => composition.members.iter().any(inline_property),
            SchemaNode::Nullable(inner) => inline_property(inner),
            _ => false,
        }
    }

    #[test]
    fn test_hoists_structured_properties() {
        let normalized = normalize(doc(NESTED)).unwrap();
        let schemas = &normalized.components.schemas;
        let names: Vec<_> = schemas.keys().cloned().collect();
        assert_eq!(
            names,
            [
                "Pet",
                "Pet$CreatePet$RequestBody",
                "Pet$Owner",
                "Pet$Kind",
                "Pet$CreatePet$RequestBody$Owner",
                "Pet$CreatePet$RequestBody$TagsItem",
                "Pet$Owner$Address",
                "Pet$CreatePet$RequestBody$Owner$Address",
            ]
        );
        assert!(schemas.values().all(|node| !inline_property(node)));

        let SchemaNode::Object(pet) = &schemas["Pet"] else {
            panic!("Pet is not an object");
        };
        assert_eq!(pet.properties[0].schema, SchemaNode::Ref("Pet$Owner".into()));
    }

    #[test]
    fn test_hoisting_properties_is_idempotent() {
        let once = normalize(doc(NESTED)).unwrap();
        let twice = normalize(once.clone()).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_maps_stay_inline() {
        let normalized = normalize(doc(NESTED)).unwrap();
        let SchemaNode::Object(body) = &normalized.components.schemas["Pet$CreatePet$RequestBody"] else {
            panic!("request body is not an object");
        };
        assert!(matches!(&body.properties[2].schema, SchemaNode::Object(map) if map.properties.is_empty()));
    }

    #[test]
    fn test_dangling_schema_ref_is_fatal() {
        let json = r##"{"openapi": "3.0.0", "paths": {"/a": {"get": {
            "responses": {"200": {"description": "ok", "content": {"application/json": {
                "schema": {"$ref": "#/components/schemas/Missing"}
            }}}}
        }}}}"##;
        let err = normalize(doc(json)).unwrap_err();
        assert!(matches!(err, Error::DanglingRef { ref reference, .. } if reference == "Missing"));
    }

    #[test]
    fn test_dangling_component_ref_is_fatal() {
        let json = r##"{"openapi": "3.0.0", "paths": {"/a": {"get": {
            "parameters": [{"$ref": "#/components/parameters/Nope"}],
            "responses": {}
        }}}}"##;
        assert!(matches!(normalize(doc(json)), Err(Error::DanglingRef { .. })));
    }

    #[test]
    fn test_reference_cycle_is_fatal() {
        let json = r##"{"openapi": "3.0.0", "paths": {},
          "components": {"parameters": {
            "A": {"$ref": "#/components/parameters/B"},
            "B": {"$ref": "#/components/parameters/A"}
          }}}"##;
        assert!(matches!(normalize(doc(json)), Err(Error::RefCycle { .. })));
    }

    #[test]
    fn test_recursive_schemas_are_not_cycles() {
        let json = r##"{"openapi": "3.0.0", "paths": {}, "components": {"schemas": {
            "Node": {"type": "object", "properties": {
                "children": {"type": "array", "items": {"$ref": "#/components/schemas/Node"}}
            }}
        }}}"##;
        assert!(normalize(doc(json)).is_ok());
    }
}
