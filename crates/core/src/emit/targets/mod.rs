//! Per-target artifact emitters.

pub(super) mod accessor;
pub(super) mod callable;
pub(super) mod dispatch;
pub(super) mod docs;
pub(super) mod params;
pub(super) mod schemas;

use super::artifact::ArtifactBuilder;
use super::layout::schema_file;
use super::names::{OperationPlan, VariantPlan};
use crate::extract::{RequestDescriptor, ResponseShape};
use crate::ts::utils::{escape_js_string, needs_bracket_notation, schema_ident, type_ident};
use crate::ts::{TsExpr, TsParam, TsPrimitive, TsType};

/// Reference a registry type, importing it into `builder`.
pub(super) fn schema_type(builder: &mut ArtifactBuilder, source: &str, name: &str) -> TsType {
    let ident = type_ident(name);
    builder.import_type(&schema_file(source, name), &ident);
    TsType::named(ident)
}

/// Reference a registry validator, importing it into `builder`.
pub(super) fn schema_validator(builder: &mut ArtifactBuilder, source: &str, name: &str) -> TsExpr {
    let ident = schema_ident(name);
    builder.import_value(&schema_file(source, name), &ident);
    TsExpr::ident(ident)
}

/// Static type of the request body, if the variant sends one.
pub(super) fn request_body_type(
    builder: &mut ArtifactBuilder,
    variant: &VariantPlan<'_>,
) -> Option<TsType> {
    let payload = variant.descriptor.request_body.as_ref()?;
    let transform = variant.request?;
    Some(match &payload.type_name {
        Some(name) => schema_type(builder, &variant.descriptor.source, name),
        None => transform.untyped_body(),
    })
}

/// Static type of a successful result.
pub(super) fn response_type(builder: &mut ArtifactBuilder, variant: &VariantPlan<'_>) -> TsType {
    match (&variant.descriptor.response, variant.response) {
        (ResponseShape::Body(payload), Some(transform)) => match &payload.type_name {
            Some(name) => schema_type(builder, &variant.descriptor.source, name),
            None => transform.untyped_body(),
        },
        _ => TsType::primitive(TsPrimitive::Void),
    }
}

/// Union of the error body types, `unknown` when none are declared.
pub(super) fn error_type(builder: &mut ArtifactBuilder, descriptor: &RequestDescriptor) -> TsType {
    let members: Vec<TsType> = descriptor
        .error_types()
        .into_iter()
        .map(|name| schema_type(builder, &descriptor.source, name))
        .collect();
    if members.is_empty() {
        TsType::primitive(TsPrimitive::Unknown)
    } else {
        TsType::union(members)
    }
}

/// Doc comment for an operation: summary, description and deprecation.
pub(super) fn operation_doc(descriptor: &RequestDescriptor, extra: Option<String>) -> Option<String> {
    let mut parts: Vec<String> = Vec::new();
    parts.extend(descriptor.summary.iter().map(|s| s.trim().to_string()));
    parts.extend(descriptor.description.iter().map(|s| s.trim().to_string()));
    parts.extend(extra);
    parts.retain(|p| !p.is_empty());
    parts.dedup();
    if descriptor.deprecated {
        parts.push("@deprecated".to_string());
    }
    (!parts.is_empty()).then(|| parts.join("\n\n"))
}

/// Leading parameters of a callable: `params` when the operation has
/// variables, then `body` when the variant sends one.
///
/// `params` is optional only when no variable is required and nothing
/// required follows it.
pub(super) fn call_params(
    builder: &mut ArtifactBuilder,
    operation: &OperationPlan<'_>,
    variant: &VariantPlan<'_>,
) -> Vec<TsParam> {
    let descriptor = variant.descriptor;
    let body = request_body_type(builder, variant);
    let body_optional = !descriptor.body_required;

    let mut params = Vec::new();
    if !descriptor.variables.is_empty() {
        builder.import_type(&operation.params_file(), &operation.params_type);
        let any_required = descriptor.variables.iter().any(|v| v.required);
        params.push(TsParam {
            name: "params".to_string(),
            ty: Some(TsType::named(operation.params_type.clone())),
            optional: !any_required && (body.is_none() || body_optional),
        });
    }
    if let Some(ty) = body {
        params.push(TsParam {
            name: "body".to_string(),
            ty: Some(ty),
            optional: body_optional,
        });
    }
    params
}

/// `params.name`, `params?.name` or the bracketed form for non-identifiers.
pub(super) fn param_access(optional: bool, name: &str) -> TsExpr {
    let chain = if optional { "?." } else { "" };
    if needs_bracket_notation(name) {
        TsExpr::Raw(format!("params{chain}[\"{}\"]", escape_js_string(name)))
    } else if optional {
        TsExpr::Raw(format!("params?.{name}"))
    } else {
        TsExpr::Raw(format!("params.{name}"))
    }
}
