//! Server-side callables: one async function per request variant.
//!
//! Each callable builds a request spec for the shared runtime's `request`
//! function, which performs the call, decodes the body and validates it.
//! The result is a tagged `Result` value; failures never throw.

use super::{call_params, error_type, operation_doc, param_access, response_type, schema_validator};
use crate::emit::artifact::{ArtifactBuilder, EmitOutput};
use crate::emit::layout::RUNTIME_FILE;
use crate::emit::names::{OperationPlan, VariantPlan};
use crate::extract::ResponseShape;
use crate::openapi::ParamLocation;
use crate::ts::{
    Emit, ObjectEntry, TemplatePart, TsExpr, TsFunction, TsItem, TsParam, TsStmt, TsType,
};

fn url_expr(url: &str, params_optional: bool) -> TsExpr {
    let mut parts = Vec::new();
    let mut rest = url;
    while let Some(start) = rest.find('{') {
        let Some(len) = rest[start..].find('}') else {
            break;
        };
        if start > 0 {
            parts.push(TemplatePart::Static(rest[..start].to_string()));
        }
        let name = &rest[start + 1..start + len];
        let value = TsExpr::ident("String").call(vec![param_access(params_optional, name)]);
        parts.push(TemplatePart::Dynamic(
            TsExpr::ident("encodeURIComponent").call(vec![value]),
        ));
        rest = &rest[start + len + 1..];
    }

    if parts.is_empty() {
        return TsExpr::string(url);
    }
    if !rest.is_empty() {
        parts.push(TemplatePart::Static(rest.to_string()));
    }
    TsExpr::Template(parts)
}

fn variables_object(
    variant: &VariantPlan<'_>,
    location: ParamLocation,
    params_optional: bool,
) -> Option<TsExpr> {
    let entries: Vec<ObjectEntry> = variant
        .descriptor
        .variables_in(location)
        .map(|v| ObjectEntry::Prop(v.name.clone(), param_access(params_optional, &v.name)))
        .collect();
    (!entries.is_empty()).then_some(TsExpr::Object(entries))
}

/// Object literal passed to the runtime's `request`.
fn request_spec(
    builder: &mut ArtifactBuilder,
    variant: &VariantPlan<'_>,
    params_optional: bool,
) -> TsExpr {
    let descriptor = variant.descriptor;
    let mut entries = vec![
        ObjectEntry::Prop("method".into(), TsExpr::string(descriptor.method.as_upper())),
        ObjectEntry::Prop("url".into(), url_expr(&descriptor.url, params_optional)),
    ];

    if let Some(query) = variables_object(variant, ParamLocation::Query, params_optional) {
        entries.push(ObjectEntry::Prop("query".into(), query));
    }
    if let Some(headers) = variables_object(variant, ParamLocation::Header, params_optional) {
        entries.push(ObjectEntry::Prop("headers".into(), headers));
    }

    if let (Some(payload), Some(transform)) = (&descriptor.request_body, variant.request) {
        entries.push(ObjectEntry::Shorthand("body".into()));
        entries.push(ObjectEntry::Prop(
            "requestKind".into(),
            TsExpr::string(transform.as_str()),
        ));
        entries.push(ObjectEntry::Prop(
            "contentType".into(),
            TsExpr::string(payload.content_type.clone()),
        ));
    }

    if let (ResponseShape::Body(payload), Some(transform)) = (&descriptor.response, variant.response) {
        entries.push(ObjectEntry::Prop(
            "responseKind".into(),
            TsExpr::string(transform.as_str()),
        ));
        entries.push(ObjectEntry::Prop(
            "accept".into(),
            TsExpr::string(payload.content_type.clone()),
        ));
        if let Some(name) = payload.type_name.as_deref().filter(|_| transform.validates_response()) {
            let validator = schema_validator(builder, &descriptor.source, name);
            entries.push(ObjectEntry::Prop("schema".into(), validator));
        }
    }

    if !descriptor.errors.is_empty() {
        let errors = descriptor
            .errors
            .iter()
            .map(|(status, name)| {
                ObjectEntry::Prop(
                    status.clone(),
                    schema_validator(builder, &descriptor.source, name),
                )
            })
            .collect();
        entries.push(ObjectEntry::Prop("errors".into(), TsExpr::Object(errors)));
    }

    TsExpr::Object(entries)
}

/// Doc line describing which variant of a multi-variant operation this is.
fn variant_note(operation: &OperationPlan<'_>, variant: &VariantPlan<'_>) -> Option<String> {
    if operation.variants.len() < 2 {
        return None;
    }
    let descriptor = variant.descriptor;
    match (descriptor.request_content_type(), descriptor.response_content_type()) {
        (Some(sends), Some(accepts)) => Some(format!("Sends `{sends}`, accepts `{accepts}`.")),
        (Some(sends), None) => Some(format!("Sends `{sends}`.")),
        (None, Some(accepts)) => Some(format!("Accepts `{accepts}`.")),
        (None, None) => None,
    }
}

pub(in crate::emit) fn emit_variant(
    operation: &OperationPlan<'_>,
    variant: &VariantPlan<'_>,
    out: &mut EmitOutput,
) -> bool {
    let descriptor = variant.descriptor;
    let mut builder = ArtifactBuilder::new(operation.callable_file(variant));
    builder.import_value(RUNTIME_FILE, "request");
    builder.import_type(RUNTIME_FILE, "CallOptions");
    builder.import_type(RUNTIME_FILE, "Result");

    let mut params = call_params(&mut builder, operation, variant);
    let params_optional = params
        .iter()
        .any(|p| p.name == "params" && p.optional);
    let ok = response_type(&mut builder, variant);
    let err = error_type(&mut builder, descriptor);
    let spec = request_spec(&mut builder, variant, params_optional);

    let call = TsExpr::ident(format!("request<{}, {}>", ok.emit(), err.emit()))
        .call(vec![spec, TsExpr::ident("init")]);
    params.push(TsParam {
        name: "init".into(),
        ty: Some(TsType::named("CallOptions")),
        optional: true,
    });

    builder.add_item(TsItem::Function(TsFunction {
        name: variant.callable.clone(),
        doc: operation_doc(descriptor, variant_note(operation, variant)),
        params,
        return_type: Some(TsType::generic(
            "Promise",
            vec![TsType::generic("Result", vec![ok, err])],
        )),
        body: vec![TsStmt::Return(Some(call))],
        is_async: true,
        is_export: true,
    }));

    out.push_built(&operation.operation_id, builder.build())
}
