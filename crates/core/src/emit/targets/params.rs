//! `params.ts`: the parameters type shared by all variants of an operation.

use super::schema_type;
use crate::emit::artifact::{ArtifactBuilder, EmitOutput};
use crate::emit::names::OperationPlan;
use crate::ts::{TsPrimitive, TsProp, TsType, TsTypeDef, TypeDefKind};

pub(in crate::emit) fn emit_operation(operation: &OperationPlan<'_>, out: &mut EmitOutput) -> bool {
    let descriptor = operation.first();
    let mut builder = ArtifactBuilder::new(operation.params_file());

    let props: Vec<TsProp> = descriptor
        .variables
        .iter()
        .map(|variable| TsProp {
            name: variable.name.clone(),
            ty: schema_type(&mut builder, &descriptor.source, &variable.type_name),
            optional: !variable.required,
            doc: variable.description.clone(),
        })
        .collect();

    let kind = if props.is_empty() {
        TypeDefKind::Alias(TsType::string_record(TsType::primitive(TsPrimitive::Never)))
    } else {
        TypeDefKind::Interface(props)
    };
    builder.add_type(TsTypeDef {
        name: operation.params_type.clone(),
        doc: Some(format!("Parameters of `{}`.", operation.operation_id)),
        kind,
    });

    out.push_built(&operation.operation_id, builder.build())
}
