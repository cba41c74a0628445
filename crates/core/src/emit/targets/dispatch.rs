//! Route handlers: one `route.ts` per URL template, one handler per method.

use std::collections::BTreeMap;

use tracing::warn;

use super::{operation_doc, request_body_type, response_type, schema_validator};
use crate::diagnostic::{Diagnostic, DiagnosticKind};
use crate::emit::artifact::{ArtifactBuilder, EmitOutput};
use crate::emit::layout::{RUNTIME_FILE, route_file};
use crate::emit::names::{OperationPlan, SourcePlan};
use crate::emit::transform::Transform;
use crate::extract::ResponseShape;
use crate::openapi::ParamLocation;
use crate::ts::{
    ObjectEntry, TsExpr, TsFunction, TsItem, TsLiteral, TsParam, TsPrimitive, TsProp, TsStmt,
    TsType, TsTypeDef, TypeDefKind,
};

fn names(operation: &OperationPlan<'_>, location: ParamLocation) -> TsExpr {
    TsExpr::Array(
        operation
            .first()
            .variables_in(location)
            .map(|v| TsExpr::string(v.name.clone()))
            .collect(),
    )
}

/// Distinct members, in first-seen order.
fn union_of(types: Vec<TsType>, empty: TsPrimitive) -> TsType {
    let mut members: Vec<TsType> = Vec::new();
    for ty in types {
        if !members.contains(&ty) {
            members.push(ty);
        }
    }
    if members.is_empty() {
        TsType::primitive(empty)
    } else {
        TsType::union(members)
    }
}

/// The handler's interface member and its `dispatch(...)` spec.
fn method_entry(builder: &mut ArtifactBuilder, operation: &OperationPlan<'_>) -> (TsProp, TsExpr) {
    let descriptor = operation.first();
    let source = &descriptor.source;

    let mut body_types = Vec::new();
    let mut result_types = Vec::new();
    let mut requests: Vec<ObjectEntry> = Vec::new();
    let mut responses: Vec<ObjectEntry> = Vec::new();

    for variant in &operation.variants {
        if let Some(ty) = request_body_type(builder, variant) {
            body_types.push(ty);
        }
        result_types.push(response_type(builder, variant));

        if let (Some(payload), Some(transform)) = (&variant.descriptor.request_body, variant.request) {
            let key = payload.content_type.clone();
            if !requests.iter().any(|e| matches!(e, ObjectEntry::Prop(k, _) if *k == key)) {
                let mut codec = vec![ObjectEntry::Prop(
                    "kind".into(),
                    TsExpr::string(transform.as_str()),
                )];
                if let (Some(name), Transform::Json) = (&payload.type_name, transform) {
                    codec.push(ObjectEntry::Prop(
                        "schema".into(),
                        schema_validator(builder, source, name),
                    ));
                }
                requests.push(ObjectEntry::Prop(key, TsExpr::Object(codec)));
            }
        }
        if let (ResponseShape::Body(payload), Some(transform)) = (&variant.descriptor.response, variant.response) {
            let key = payload.content_type.clone();
            if !responses.iter().any(|e| matches!(e, ObjectEntry::Prop(k, _) if *k == key)) {
                responses.push(ObjectEntry::Prop(key, TsExpr::string(transform.as_str())));
            }
        }
    }

    let params = if descriptor.variables.is_empty() {
        TsType::primitive(TsPrimitive::Undefined)
    } else {
        builder.import_type(&operation.params_file(), &operation.params_type);
        TsType::named(operation.params_type.clone())
    };
    let handler_type = TsType::generic(
        "Handler",
        vec![
            params,
            union_of(body_types, TsPrimitive::Undefined),
            union_of(result_types, TsPrimitive::Void),
        ],
    );

    let status = match &descriptor.response {
        ResponseShape::Body(_) => 200.0,
        ResponseShape::Empty | ResponseShape::Untracked => 204.0,
    };
    let mut spec = vec![
        ObjectEntry::Prop("operation".into(), TsExpr::string(operation.operation_id.clone())),
        ObjectEntry::Prop("path".into(), names(operation, ParamLocation::Path)),
        ObjectEntry::Prop("query".into(), names(operation, ParamLocation::Query)),
        ObjectEntry::Prop("headers".into(), names(operation, ParamLocation::Header)),
    ];
    if !requests.is_empty() {
        spec.push(ObjectEntry::Prop("requests".into(), TsExpr::Object(requests)));
        spec.push(ObjectEntry::Prop(
            "bodyRequired".into(),
            TsExpr::Literal(TsLiteral::Bool(descriptor.body_required)),
        ));
    }
    if !responses.is_empty() {
        spec.push(ObjectEntry::Prop("responses".into(), TsExpr::Object(responses)));
    }
    spec.push(ObjectEntry::Prop("status".into(), TsExpr::number(status)));

    let prop = TsProp {
        name: operation.handler.clone(),
        ty: handler_type,
        optional: true,
        doc: operation_doc(descriptor, None),
    };
    let dispatch = TsExpr::ident("dispatch").call(vec![
        TsExpr::Object(spec),
        TsExpr::ident("handlers").member(operation.handler.clone()),
    ]);
    (prop, dispatch)
}

fn route_module(path: String, url: &str, operations: &[&OperationPlan<'_>]) -> ArtifactBuilder {
    let mut builder = ArtifactBuilder::new(path);
    builder.import_value(RUNTIME_FILE, "dispatch");
    builder.import_type(RUNTIME_FILE, "Handler");
    builder.import_type(RUNTIME_FILE, "RouteHandlers");

    let mut props = Vec::new();
    let mut methods = Vec::new();
    for operation in operations {
        let (prop, dispatch) = method_entry(&mut builder, operation);
        props.push(prop);
        methods.push(ObjectEntry::Prop(
            operation.first().method.as_upper().to_string(),
            dispatch,
        ));
    }

    builder.add_type(TsTypeDef {
        name: "Handlers".into(),
        doc: Some(format!("Handlers for `{url}`.")),
        kind: TypeDefKind::Interface(props),
    });
    builder.add_item(TsItem::Function(TsFunction {
        name: "createRoute".into(),
        doc: None,
        params: vec![TsParam::typed("handlers", TsType::named("Handlers"))],
        return_type: Some(TsType::named("RouteHandlers")),
        body: vec![TsStmt::Return(Some(TsExpr::Object(methods)))],
        is_async: false,
        is_export: true,
    }));
    builder
}

pub(in crate::emit) fn emit(plan: &SourcePlan<'_>, out: &mut EmitOutput) {
    let mut routes: Vec<(&str, Vec<&OperationPlan<'_>>)> = Vec::new();
    for operation in &plan.operations {
        let url = operation.first().url.as_str();
        match routes.iter_mut().find(|(u, _)| *u == url) {
            Some((_, group)) => group.push(operation),
            None => routes.push((url, vec![operation])),
        }
    }

    let mut owners: BTreeMap<String, &str> = BTreeMap::new();
    for (url, operations) in routes {
        let source = &operations[0].first().source;
        let path = route_file(source, url);
        if let Some(owner) = owners.get(&path) {
            warn!(url = %url, "Route file {path} is already used by {owner}.");
            for operation in &operations {
                out.diagnostics.push(Diagnostic::error(
                    DiagnosticKind::IdentifierCollision,
                    operation.operation_id.clone(),
                    format!("route file '{path}' is already used by '{owner}'"),
                ));
            }
            continue;
        }
        owners.insert(path.clone(), url);

        let built = route_module(path, url, &operations).build();
        out.push_built(url, built);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::emit::names::plan;
    use crate::extract::extract;
    use crate::normalize::normalize;
    use crate::openapi::parse_document;
    use pretty_assertions::assert_eq;

    fn emit_routes(json: &str) -> EmitOutput {
        let doc = normalize(parse_document(json, None).unwrap()).unwrap();
        let extraction = extract("pets", &doc);
        let plan = plan(&extraction.descriptors);
        let mut out = EmitOutput::default();
        emit(&plan, &mut out);
        out
    }

    #[test]
    fn test_route_groups_methods() {
        let out = emit_routes(
            r##"{"openapi": "3.0.0", "paths": {"/pets/{id}": {
                "parameters": [{"name": "id", "in": "path", "schema": {"type": "string"}}],
                "get": {
                    "operationId": "getPet",
                    "tags": ["pet"],
                    "responses": {"200": {"description": "ok", "content": {"application/json": {"schema": {"$ref": "#/components/schemas/Pet"}}}}}
                },
                "delete": {"operationId": "deletePet", "tags": ["pet"], "responses": {"204": {"description": "gone"}}}
            }},
            "components": {"schemas": {"Pet": {"type": "object"}}}}"##,
        );
        assert_eq!(out.artifacts.len(), 1);
        let route = &out.artifacts[0];
        assert_eq!(route.path(), "pets/routes/pets/[id]/route.ts");
        assert_eq!(
            route.content(),
            r#"// Generated by apigen. Do not edit.

import { dispatch } from "../../../../runtime";
import type { Handler, RouteHandlers } from "../../../../runtime";
import type { DeletePetParams } from "../../../pet/deletePet/params";
import type { GetPetParams } from "../../../pet/getPet/params";
import type { Pet } from "../../../schemas/Pet";

/** Handlers for `/pets/{id}`. */
export interface Handlers {
  getPet?: Handler<GetPetParams, undefined, Pet>;
  deletePet?: Handler<DeletePetParams, undefined, void>;
}

export function createRoute(handlers: Handlers): RouteHandlers {
  return {
    GET: dispatch({
      operation: "getPet",
      path: ["id"],
      query: [],
      headers: [],
      responses: { "application/json": "json" },
      status: 200,
    }, handlers.getPet),
    DELETE: dispatch({
      operation: "deletePet",
      path: ["id"],
      query: [],
      headers: [],
      status: 204,
    }, handlers.deletePet),
  };
}
"#
        );
    }

    #[test]
    fn test_json_request_bodies_are_validated() {
        let out = emit_routes(
            r##"{"openapi": "3.0.0", "paths": {"/pets": {"post": {
                "operationId": "createPet",
                "requestBody": {"required": true, "content": {
                    "application/json": {"schema": {"$ref": "#/components/schemas/Pet"}},
                    "multipart/form-data": {"schema": {"$ref": "#/components/schemas/Pet"}}
                }},
                "responses": {"201": {"description": "created"}}
            }}},
            "components": {"schemas": {"Pet": {"type": "object"}}}}"##,
        );
        let content = out.artifacts[0].content();
        assert!(content.contains("import { PetSchema } from \"../../schemas/Pet\";"));
        assert!(content.contains("createPet?: Handler<undefined, Pet, void>;"));
        assert!(content.contains("\"application/json\": { kind: \"json\", schema: PetSchema },"));
        assert!(content.contains("\"multipart/form-data\": { kind: \"multipart\" } },"));
        assert!(content.contains("bodyRequired: true,"));
    }
}
