//! One module per registry schema: the static type and its zod validator.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, warn};

use crate::diagnostic::{Diagnostic, DiagnosticKind};
use crate::emit::artifact::{ArtifactBuilder, EmitOutput};
use crate::emit::layout::schema_file;
use crate::schema::{CompiledTypes, TypeDescriptor};
use crate::ts::utils::{schema_ident, type_ident};
use crate::ts::{TsConst, TsItem, TsType, TsTypeDef, TypeDefKind};

fn schema_module(source: &str, descriptor: &TypeDescriptor) -> ArtifactBuilder {
    let mut builder = ArtifactBuilder::new(schema_file(source, &descriptor.name));
    builder.import_package("zod", "z", false);

    for dependency in &descriptor.imports {
        let target = schema_file(source, dependency);
        builder.import_type(&target, &type_ident(dependency));
        builder.import_value(&target, &schema_ident(dependency));
    }

    let name = descriptor.type_ident();
    builder.add_type(TsTypeDef {
        name: name.clone(),
        doc: None,
        kind: TypeDefKind::Alias(descriptor.static_type.clone()),
    });
    builder.add_item(TsItem::Const(TsConst {
        name: descriptor.schema_ident(),
        doc: None,
        ty: Some(TsType::generic("z.ZodType", vec![TsType::named(name)])),
        init: descriptor.validator.to_expr(),
        is_export: true,
    }));
    builder
}

/// Emit every schema module and return the names left out.
///
/// A schema is left out when its identifier is already taken, or when it
/// imports a schema that was left out.
pub(in crate::emit) fn emit(source: &str, types: &CompiledTypes, out: &mut EmitOutput) -> BTreeSet<String> {
    let mut owners: BTreeMap<String, &str> = BTreeMap::new();
    let mut skipped: BTreeSet<String> = BTreeSet::new();

    for (name, descriptor) in &types.descriptors {
        let ident = descriptor.type_ident();
        if let Some(owner) = owners.get(&ident) {
            warn!(schema = %name, "Schema identifier '{ident}' is already used by '{owner}'.");
            out.diagnostics.push(Diagnostic::error(
                DiagnosticKind::IdentifierCollision,
                name.clone(),
                format!("type identifier '{ident}' is already used by schema '{owner}'"),
            ));
            skipped.insert(name.clone());
            continue;
        }
        owners.insert(ident, name);
    }

    loop {
        let dependents: Vec<(String, String)> = types
            .descriptors
            .iter()
            .filter(|(name, _)| !skipped.contains(*name))
            .filter_map(|(name, descriptor)| {
                descriptor
                    .imports
                    .iter()
                    .find(|dependency| skipped.contains(*dependency))
                    .map(|dependency| (name.clone(), dependency.clone()))
            })
            .collect();
        if dependents.is_empty() {
            break;
        }
        for (name, dependency) in dependents {
            warn!(schema = %name, "Schema imports '{dependency}', which was not emitted.");
            out.diagnostics.push(Diagnostic::error(
                DiagnosticKind::IdentifierCollision,
                name.clone(),
                format!("imports schema '{dependency}', which was not emitted"),
            ));
            skipped.insert(name);
        }
    }

    for (name, descriptor) in &types.descriptors {
        if skipped.contains(name) {
            continue;
        }
        let built = schema_module(source, descriptor).build();
        out.push_built(name, built);
    }

    debug!(source = %source, schemas = owners.len(), skipped = skipped.len(), "Emitted schema modules.");
    skipped
}
