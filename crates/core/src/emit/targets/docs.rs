//! Documentation fragments: `meta.json` per operation.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::emit::artifact::{Artifact, EmitOutput};
use crate::emit::layout::meta_file;
use crate::emit::names::OperationPlan;
use crate::error::{Error, Result};
use crate::extract::{Payload, ResponseShape, Variable};
use crate::openapi::HttpMethod;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VariantMeta<'a> {
    callable: &'a str,
    hook: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    request_body: Option<&'a Payload>,
    response: &'a ResponseShape,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct OperationMeta<'a> {
    source: &'a str,
    operation_id: &'a str,
    method: HttpMethod,
    url: &'a str,
    controller: &'a [String],
    tags: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
    deprecated: bool,
    parameters: &'a [Variable],
    variants: Vec<VariantMeta<'a>>,
    errors: &'a BTreeMap<String, String>,
}

pub(in crate::emit) fn emit_operation(operation: &OperationPlan<'_>, out: &mut EmitOutput) -> Result<()> {
    let descriptor = operation.first();
    let meta = OperationMeta {
        source: &descriptor.source,
        operation_id: &operation.operation_id,
        method: descriptor.method,
        url: &descriptor.url,
        controller: &descriptor.controller,
        tags: &descriptor.tags,
        summary: descriptor.summary.as_deref(),
        description: descriptor.description.as_deref(),
        deprecated: descriptor.deprecated,
        parameters: &descriptor.variables,
        variants: operation
            .variants
            .iter()
            .map(|v| VariantMeta {
                callable: &v.callable,
                hook: &v.hook,
                request_body: v.descriptor.request_body.as_ref(),
                response: &v.descriptor.response,
            })
            .collect(),
        errors: &descriptor.errors,
    };

    let mut content = serde_json::to_string_pretty(&meta).map_err(|err| Error::Serialize {
        what: meta_file(&operation.dir),
        message: err.to_string(),
    })?;
    content.push('\n');
    out.push(Artifact::new(meta_file(&operation.dir), content));
    Ok(())
}
