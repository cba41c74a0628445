//! apigen compiler core.
//!
//! Turns a bundled OpenAPI 3.x document into TypeScript artifacts for several
//! targets (server callables, React accessors, route handlers and
//! documentation metadata) that import each other by agreed names and paths.
//!
//! The stages of a run, per source:
//!
//! 1. [`openapi::load_document`] parses JSON or YAML into the tagged IR.
//! 2. [`normalize`] resolves component references, names every operation and
//!    hoists inline schemas into the registry.
//! 3. [`schema::SchemaCompiler`] compiles each registry schema into a static
//!    type plus a zod validator; [`extract`] flattens operations into
//!    [`RequestDescriptor`]s.
//! 4. [`emit`] plans identifiers once and renders each target.
//! 5. [`dump`] writes the artifacts.
//!
//! [`Pipeline`] drives these stages through a [`Driver`] for every configured
//! source.

pub mod check;
pub mod diagnostic;
pub mod driver;
pub mod dump;
pub mod emit;
pub mod error;
pub mod extract;
pub mod naming;
pub mod normalize;
pub mod openapi;
pub mod pipeline;
pub mod registry;
pub mod schema;
pub mod search;
pub mod ts;
pub mod watch;

pub use check::{Drift, check_project};
pub use diagnostic::{Diagnostic, DiagnosticKind, Severity};
pub use driver::{Driver, TypeScriptDriver};
pub use dump::{DumpReport, dump};
pub use emit::{Artifact, EmitContext, EmitOutput, emit, emit_global, emit_source};
pub use error::{Error, Result};
pub use extract::{Extraction, RequestDescriptor, extract};
pub use normalize::{normalize, normalize_with_diagnostics};
pub use openapi::{Document, load_document, parse_document};
pub use pipeline::{Pipeline, RunReport, SourceReport};
pub use registry::RegistrySummary;
pub use schema::{CompiledTypes, SchemaCompiler, TypeDescriptor};
pub use search::{SearchHit, SearchIndex};
pub use watch::watch;
