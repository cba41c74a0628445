//! Emission layer: request and type descriptors to artifacts, per target.
//!
//! Identifiers and paths are planned once per source ([`plan`]) and every
//! target reads them from the plan, so an artifact importing another one
//! always agrees on its name and location.

pub mod artifact;
mod global;
pub mod layout;
pub mod names;
mod targets;
pub mod transform;

use std::collections::BTreeSet;

use apigen_common::TargetKind;
use tracing::{debug, warn};

pub use artifact::{Artifact, ArtifactBuilder, EmitOutput, GENERATED_HEADER};
pub use global::{RUNTIME_TEMPLATE, SourcesIndex, emit_global};
pub use layout::{REGISTRY_FILE, RUNTIME_FILE, SOURCES_FILE, import_specifier, registry_file};
pub use names::{OperationPlan, SourcePlan, VariantPlan, plan};
pub use transform::Transform;

use crate::diagnostic::{Diagnostic, DiagnosticKind};
use crate::error::Result;
use crate::extract::RequestDescriptor;
use crate::openapi::Document;
use crate::registry::RegistrySummary;
use crate::schema::CompiledTypes;

/// What a source's emission reads besides the descriptors.
#[derive(Debug, Clone, Copy)]
pub struct EmitContext<'a> {
    /// Source id; the first segment of every artifact path.
    pub source: &'a str,
    /// Normalized document, for the registry summary.
    pub document: &'a Document,
}

/// Targets whose artifacts import schema and params modules.
fn needs_shared_modules(target: TargetKind) -> bool {
    matches!(
        target,
        TargetKind::Callable | TargetKind::Accessor | TargetKind::Dispatch
    )
}

/// Whether every schema the operation names has a module to import.
fn schemas_emitted(operation: &OperationPlan<'_>, skipped: &BTreeSet<String>, out: &mut EmitOutput) -> bool {
    let missing = operation
        .variants
        .iter()
        .flat_map(|variant| variant.descriptor.referenced_types())
        .find(|name| skipped.contains(*name));
    let Some(name) = missing else {
        return true;
    };
    warn!(operation = %operation.operation_id, "Operation uses schema '{name}', which was not emitted.");
    out.diagnostics.push(Diagnostic::error(
        DiagnosticKind::IdentifierCollision,
        operation.operation_id.clone(),
        format!("uses schema '{name}', which was not emitted"),
    ));
    false
}

/// Emit one target for a source, plus its registry summary.
pub fn emit(
    target: TargetKind,
    descriptors: &[RequestDescriptor],
    types: &CompiledTypes,
    ctx: &EmitContext<'_>,
) -> Result<EmitOutput> {
    emit_source(&BTreeSet::from([target]), descriptors, types, ctx)
}

/// Emit several targets for a source from a single naming plan.
///
/// Shared modules (schemas, `params.ts`) are emitted once. An operation whose
/// `params.ts` can't be built, or that uses a schema left out of the
/// schema modules, is dropped from every target.
pub fn emit_source(
    targets: &BTreeSet<TargetKind>,
    descriptors: &[RequestDescriptor],
    types: &CompiledTypes,
    ctx: &EmitContext<'_>,
) -> Result<EmitOutput> {
    let mut plan = plan(descriptors);
    let mut out = EmitOutput {
        artifacts: Vec::new(),
        diagnostics: std::mem::take(&mut plan.diagnostics),
    };

    if targets.iter().any(|t| needs_shared_modules(*t)) {
        let skipped = targets::schemas::emit(ctx.source, types, &mut out);
        plan.operations.retain(|operation| {
            schemas_emitted(operation, &skipped, &mut out)
                && targets::params::emit_operation(operation, &mut out)
        });
    }

    for target in targets {
        match target {
            TargetKind::Callable => {
                for (operation, variant) in plan.variants() {
                    targets::callable::emit_variant(operation, variant, &mut out);
                }
            }
            TargetKind::Accessor => {
                for (operation, variant) in plan.variants() {
                    targets::accessor::emit_variant(operation, variant, &mut out);
                }
            }
            TargetKind::Dispatch => targets::dispatch::emit(&plan, &mut out),
            TargetKind::Docs => {
                for operation in &plan.operations {
                    targets::docs::emit_operation(operation, &mut out)?;
                }
            }
        }
    }

    out.sort();
    let summary = RegistrySummary::build(ctx.source, ctx.document, &plan, types, &out.artifacts);
    out.push(summary.to_artifact()?);
    out.sort();

    debug!(
        source = %ctx.source,
        artifacts = out.artifacts.len(),
        diagnostics = out.diagnostics.len(),
        "Emitted source."
    );
    Ok(out)
}
