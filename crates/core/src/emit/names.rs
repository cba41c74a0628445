//! Identifier planning shared by every target.
//!
//! Descriptors are grouped by operation and each variant gets its callable
//! and accessor identifiers here, once, so that every artifact referring to
//! another one agrees on the name and the path.

use std::collections::{BTreeMap, BTreeSet};

use tracing::warn;

use super::layout::{callable_file, operation_dir, params_file};
use super::transform::Transform;
use crate::diagnostic::{Diagnostic, DiagnosticKind};
use crate::extract::RequestDescriptor;
use crate::naming::{content_type_long_name, content_type_short_name, essence, pascal_case};
use crate::ts::utils::value_ident;

/// One descriptor with its agreed identifiers.
#[derive(Debug, Clone)]
pub struct VariantPlan<'d> {
    pub descriptor: &'d RequestDescriptor,
    /// Callable function name (`getPet`, `convertWithJsonAsText`).
    pub callable: String,
    /// Accessor hook name (`useGetPet`).
    pub hook: String,
    pub request: Option<Transform>,
    pub response: Option<Transform>,
}

/// All variants of one operation.
#[derive(Debug, Clone)]
pub struct OperationPlan<'d> {
    pub operation_id: String,
    /// camelCase operation identifier, the handler key in route modules.
    pub handler: String,
    /// Directory holding the operation's artifacts.
    pub dir: String,
    /// Name of the parameters type in `params.ts`.
    pub params_type: String,
    pub variants: Vec<VariantPlan<'d>>,
}

impl OperationPlan<'_> {
    /// Descriptor fields shared by every variant.
    pub fn first(&self) -> &RequestDescriptor {
        self.variants[0].descriptor
    }

    /// `<dir>/params.ts`
    pub fn params_file(&self) -> String {
        params_file(&self.dir)
    }

    /// `<dir>/<callable>.ts`
    pub fn callable_file(&self, variant: &VariantPlan<'_>) -> String {
        callable_file(&self.dir, &variant.callable)
    }

    /// `<dir>/use<Callable>.ts`
    pub fn accessor_file(&self, variant: &VariantPlan<'_>) -> String {
        callable_file(&self.dir, &variant.hook)
    }
}

/// Every emittable operation of a source, in declaration order.
#[derive(Debug, Clone, Default)]
pub struct SourcePlan<'d> {
    pub operations: Vec<OperationPlan<'d>>,
    /// Operations that were skipped, with the reason.
    pub diagnostics: Vec<Diagnostic>,
}

impl<'d> SourcePlan<'d> {
    /// Every planned variant.
    pub fn variants(&self) -> impl Iterator<Item = (&OperationPlan<'d>, &VariantPlan<'d>)> {
        self.operations
            .iter()
            .flat_map(|op| op.variants.iter().map(move |v| (op, v)))
    }
}

/// Suffix name per content type, falling back to type-qualified names when
/// two distinct content types share a short name.
fn suffix_names<'a>(content_types: &BTreeSet<&'a str>) -> BTreeMap<&'a str, String> {
    let short: Vec<String> = content_types
        .iter()
        .map(|ct| content_type_short_name(ct))
        .collect();
    let distinct: BTreeSet<&String> = short.iter().collect();
    let essences: BTreeSet<String> = content_types.iter().map(|ct| essence(ct)).collect();
    let ambiguous = distinct.len() < essences.len();

    content_types
        .iter()
        .zip(short)
        .map(|(ct, short)| {
            let name = if ambiguous {
                content_type_long_name(ct)
            } else {
                short
            };
            (*ct, name)
        })
        .collect()
}

fn plan_operation<'d>(
    operation_id: &str,
    descriptors: &[&'d RequestDescriptor],
) -> Result<OperationPlan<'d>, (DiagnosticKind, String)> {
    let mut request_cts = BTreeSet::new();
    let mut response_cts = BTreeSet::new();
    for descriptor in descriptors {
        request_cts.extend(descriptor.request_content_type());
        response_cts.extend(descriptor.response_content_type());
    }

    for ct in request_cts.iter().chain(&response_cts) {
        if Transform::for_content_type(ct).is_none() {
            return Err((
                DiagnosticKind::UnsupportedContentType,
                format!("no transform for content type '{ct}'"),
            ));
        }
    }

    let request_suffix = (request_cts.len() > 1).then(|| suffix_names(&request_cts));
    let response_suffix = (response_cts.len() > 1).then(|| suffix_names(&response_cts));

    let base_value = value_ident(operation_id);
    let base_type = pascal_case(operation_id);
    let first = descriptors[0];

    let variants: Vec<VariantPlan<'d>> = descriptors
        .iter()
        .map(|&descriptor| {
            let mut suffix = String::new();
            if let (Some(names), Some(ct)) = (&request_suffix, descriptor.request_content_type()) {
                suffix.push_str("With");
                suffix.push_str(&names[ct]);
            }
            if let (Some(names), Some(ct)) = (&response_suffix, descriptor.response_content_type()) {
                suffix.push_str("As");
                suffix.push_str(&names[ct]);
            }
            VariantPlan {
                descriptor,
                callable: format!("{base_value}{suffix}"),
                hook: format!("use{base_type}{suffix}"),
                request: descriptor.request_content_type().and_then(Transform::for_content_type),
                response: descriptor.response_content_type().and_then(Transform::for_content_type),
            }
        })
        .collect();

    let distinct: BTreeSet<&str> = variants.iter().map(|v| v.callable.as_str()).collect();
    if distinct.len() < variants.len() {
        return Err((
            DiagnosticKind::IdentifierCollision,
            "content type variants map to the same identifier".to_string(),
        ));
    }

    Ok(OperationPlan {
        operation_id: operation_id.to_string(),
        handler: base_value,
        dir: operation_dir(&first.source, &first.controller, operation_id),
        params_type: format!("{base_type}Params"),
        variants,
    })
}

/// Plan identifiers for a source's descriptors.
///
/// Operations with an unknown content type, or whose identifiers or
/// directory collide with an earlier operation, are reported and skipped.
pub fn plan(descriptors: &[RequestDescriptor]) -> SourcePlan<'_> {
    let mut grouped: Vec<(&str, Vec<&RequestDescriptor>)> = Vec::new();
    for descriptor in descriptors {
        match grouped
            .iter_mut()
            .find(|(id, _)| *id == descriptor.operation_id)
        {
            Some((_, group)) => group.push(descriptor),
            None => grouped.push((&descriptor.operation_id, vec![descriptor])),
        }
    }

    let mut source_plan = SourcePlan::default();
    let mut claimed: BTreeMap<String, String> = BTreeMap::new();

    for (operation_id, group) in grouped {
        let operation = match plan_operation(operation_id, &group) {
            Ok(operation) => operation,
            Err((kind, message)) => {
                warn!(operation = %operation_id, "{message}; skipping operation.");
                source_plan
                    .diagnostics
                    .push(Diagnostic::error(kind, operation_id, message));
                continue;
            }
        };

        let mut names: Vec<String> = vec![
            format!("dir:{}", operation.dir),
            format!("type:{}", operation.params_type),
            format!("handler:{}", operation.handler),
        ];
        for variant in &operation.variants {
            names.push(format!("value:{}", variant.callable));
            names.push(format!("value:{}", variant.hook));
        }

        let clash = names.iter().find_map(|name| {
            claimed
                .get(name)
                .filter(|owner| owner.as_str() != operation_id)
                .map(|owner| (name.clone(), owner.clone()))
        });
        if let Some((name, owner)) = clash {
            let (_, identifier) = name.split_once(':').unwrap_or(("", &name));
            let message = format!("'{identifier}' is already used by operation '{owner}'");
            warn!(operation = %operation_id, "{message}; skipping operation.");
            source_plan.diagnostics.push(Diagnostic::error(
                DiagnosticKind::IdentifierCollision,
                operation_id,
                message,
            ));
            continue;
        }

        for name in names {
            claimed.insert(name, operation_id.to_string());
        }
        source_plan.operations.push(operation);
    }

    source_plan
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::extract::{Payload, ResponseShape};
    use crate::openapi::HttpMethod;
    use pretty_assertions::assert_eq;

    fn descriptor(op: &str, req: Option<&str>, resp: Option<&str>) -> RequestDescriptor {
        RequestDescriptor {
            source: "pets".into(),
            controller: vec!["pet".into()],
            operation_id: op.into(),
            method: HttpMethod::Post,
            url: format!("/{op}"),
            summary: None,
            description: None,
            tags: vec!["pet".into()],
            deprecated: false,
            variables: vec![],
            request_body: req.map(|ct| Payload {
                type_name: Some("Body".into()),
                content_type: ct.into(),
            }),
            body_required: true,
            response: resp.map_or(ResponseShape::Empty, |ct| {
                ResponseShape::Body(Payload {
                    type_name: None,
                    content_type: ct.into(),
                })
            }),
            errors: BTreeMap::new(),
        }
    }

    fn callables(plan: &SourcePlan<'_>) -> Vec<String> {
        plan.variants().map(|(_, v)| v.callable.clone()).collect()
    }

    #[test]
    fn test_single_variant_has_no_suffix() {
        let descriptors = [descriptor("create-pet", Some("application/json"), Some("application/json"))];
        let plan = plan(&descriptors);
        let (op, variant) = plan.variants().next().unwrap();
        assert_eq!(variant.callable, "createPet");
        assert_eq!(variant.hook, "useCreatePet");
        assert_eq!(op.params_type, "CreatePetParams");
        assert_eq!(op.dir, "pets/pet/create-pet");
        assert_eq!(op.accessor_file(variant), "pets/pet/create-pet/useCreatePet.ts");
    }

    #[test]
    fn test_fan_out_suffixes() {
        let descriptors = [
            descriptor("convert", Some("application/json"), Some("application/json")),
            descriptor("convert", Some("application/json"), Some("text/plain")),
            descriptor("convert", Some("application/xml"), Some("application/json")),
            descriptor("convert", Some("application/xml"), Some("text/plain")),
        ];
        let plan = plan(&descriptors);
        assert_eq!(
            callables(&plan),
            [
                "convertWithJsonAsJson",
                "convertWithJsonAsText",
                "convertWithXmlAsJson",
                "convertWithXmlAsText",
            ]
        );
        assert_eq!(plan.operations.len(), 1);
    }

    #[test]
    fn test_ambiguous_short_names_use_long_names() {
        let descriptors = [
            descriptor("upload", Some("application/xml"), None),
            descriptor("upload", Some("text/xml"), None),
        ];
        let plan = plan(&descriptors);
        assert_eq!(
            callables(&plan),
            ["uploadWithApplicationXml", "uploadWithTextXml"]
        );
    }

    #[test]
    fn test_unknown_content_type_skips_operation() {
        let descriptors = [
            descriptor("a", Some("application/vnd.custom"), None),
            descriptor("b", None, Some("application/json")),
        ];
        let plan = plan(&descriptors);
        assert_eq!(callables(&plan), ["b"]);
        assert_eq!(plan.diagnostics.len(), 1);
        assert_eq!(plan.diagnostics[0].kind, DiagnosticKind::UnsupportedContentType);
        assert_eq!(plan.diagnostics[0].subject.as_deref(), Some("a"));
    }

    #[test]
    fn test_identifier_collision_skips_later_operation() {
        let descriptors = [
            descriptor("get-pet", None, None),
            descriptor("getPet", None, None),
        ];
        let plan = plan(&descriptors);
        assert_eq!(callables(&plan), ["getPet"]);
        assert_eq!(plan.diagnostics[0].kind, DiagnosticKind::IdentifierCollision);
        assert_eq!(plan.diagnostics[0].subject.as_deref(), Some("getPet"));
    }

    #[test]
    fn test_parameterized_duplicates_collide() {
        let descriptors = [
            descriptor("send", Some("application/json"), None),
            descriptor("send", Some("application/json; charset=utf-8"), None),
        ];
        let plan = plan(&descriptors);
        assert!(plan.operations.is_empty());
        assert_eq!(plan.diagnostics[0].kind, DiagnosticKind::IdentifierCollision);
    }
}
