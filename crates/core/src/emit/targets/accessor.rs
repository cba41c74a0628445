//! Browser-side accessors: one React hook per request variant, built on the
//! callable and the runtime's request state machine.

use super::{call_params, error_type, operation_doc, response_type};
use crate::emit::artifact::{ArtifactBuilder, EmitOutput};
use crate::emit::layout::RUNTIME_FILE;
use crate::emit::names::{OperationPlan, VariantPlan};
use crate::ts::{
    ArrowBody, ObjectEntry, TsExpr, TsFunction, TsItem, TsParam, TsPrimitive, TsStmt, TsType,
};

pub(in crate::emit) fn emit_variant(
    operation: &OperationPlan<'_>,
    variant: &VariantPlan<'_>,
    out: &mut EmitOutput,
) -> bool {
    let descriptor = variant.descriptor;
    let mut builder = ArtifactBuilder::new(operation.accessor_file(variant));
    builder.import_value(RUNTIME_FILE, "useRequest");
    builder.import_type(RUNTIME_FILE, "AccessorOptions");
    builder.import_type(RUNTIME_FILE, "Progress");
    builder.import_type(RUNTIME_FILE, "RequestHandle");
    builder.import_value(&operation.callable_file(variant), &variant.callable);

    let args = call_params(&mut builder, operation, variant);
    let ok = response_type(&mut builder, variant);
    let err = error_type(&mut builder, descriptor);

    let on_progress = TsType::Function {
        params: vec![TsParam::typed("progress", TsType::named("Progress"))],
        ret: Box::new(TsType::Primitive(TsPrimitive::Void)),
    };
    let mut run_params = vec![
        TsParam::typed("signal", TsType::named("AbortSignal")),
        TsParam::typed("onProgress", on_progress),
    ];
    run_params.extend(args.iter().cloned());
    let mut forwarded: Vec<TsExpr> = args.iter().map(|p| TsExpr::ident(p.name.clone())).collect();
    forwarded.push(TsExpr::Object(vec![
        ObjectEntry::Shorthand("signal".into()),
        ObjectEntry::Shorthand("onProgress".into()),
    ]));
    let run = TsExpr::Arrow {
        params: run_params,
        is_async: false,
        body: ArrowBody::Expr(Box::new(
            TsExpr::ident(variant.callable.clone()).call(forwarded),
        )),
    };

    let key = TsExpr::Object(vec![
        ObjectEntry::Prop("source".into(), TsExpr::string(descriptor.source.clone())),
        ObjectEntry::Prop("operation".into(), TsExpr::string(variant.callable.clone())),
    ]);
    let call = TsExpr::ident("useRequest").call(vec![key, run, TsExpr::ident("options")]);

    builder.add_item(TsItem::Function(TsFunction {
        name: variant.hook.clone(),
        doc: operation_doc(descriptor, None),
        params: vec![TsParam {
            name: "options".into(),
            ty: Some(TsType::named("AccessorOptions")),
            optional: true,
        }],
        return_type: Some(TsType::generic(
            "RequestHandle",
            vec![TsType::Tuple(args), ok, err],
        )),
        body: vec![TsStmt::Return(Some(call))],
        is_async: false,
        is_export: true,
    }));

    out.push_built(&operation.operation_id, builder.build())
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

    #[test]
    fn test_hook_wraps_callable() {
        let doc = normalize(
            parse_document(
                r##"{"openapi": "3.0.0", "paths": {"/pets": {"get": {
                    "operationId": "listPets",
                    "parameters": [{"name": "limit", "in": "query", "schema": {"type": "integer"}}],
                    "responses": {"200": {"description": "ok", "content": {"application/json": {"schema": {"$ref": "#/components/schemas/Pets"}}}}}
                }}},
                "components": {"schemas": {"Pets": {"type": "array", "items": {"type": "string"}}}}}"##,
                None,
            )
            .unwrap(),
        )
        .unwrap();
        let extraction = extract("pets", &doc);
        let plan = plan(&extraction.descriptors);
        let (operation, variant) = plan.variants().next().unwrap();
        let mut out = EmitOutput::default();
        assert!(emit_variant(operation, variant, &mut out));

        let artifact = &out.artifacts[0];
        assert_eq!(artifact.path(), "pets/listPets/useListPets.ts");
        assert_eq!(
            artifact.content(),
            r#"// Generated by apigen. Do not edit.

import { useRequest } from "../../runtime";
import type { AccessorOptions, Progress, RequestHandle } from "../../runtime";
import type { Pets } from "../schemas/Pets";
import { listPets } from "./listPets";
import type { ListPetsParams } from "./params";

export function useListPets(options?: AccessorOptions): RequestHandle<[params?: ListPetsParams], Pets, unknown> {
  return useRequest({ source: "pets", operation: "listPets" }, (signal: AbortSignal, onProgress: (progress: Progress) => void, params?: ListPetsParams) => listPets(params, { signal, onProgress }), options);
}
"#
        );
    }
}
