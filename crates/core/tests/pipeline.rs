#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::collections::BTreeSet;
use std::fs;

use apigen_common::{ProjectConfig, SourceConfig, TargetKind};
use apigen_core::openapi::{Format, ParamLocation};
use apigen_core::{
    Document, EmitContext, Error, Pipeline, SchemaCompiler, TypeScriptDriver, check_project,
    emit_source, extract, normalize, parse_document,
};
use pretty_assertions::assert_eq;

const PETSTORE: &str = r##"
openapi: 3.0.3
info:
  title: Petstore
  version: 1.0.0
paths:
  /pets/{id}:
    get:
      operationId: getPet
      tags: [pet]
      parameters:
        - name: id
          in: path
          required: true
          schema:
            type: string
      responses:
        "200":
          description: ok
          content:
            application/json:
              schema:
                $ref: "#/components/schemas/Pet"
        "404":
          description: missing
          content:
            application/json:
              schema:
                $ref: "#/components/schemas/Error"
  /pets:
    post:
      operationId: createPet
      tags: [pet]
      requestBody:
        required: true
        content:
          application/json:
            schema:
              type: object
              required: [name]
              properties:
                name:
                  type: string
      responses:
        "201":
          description: created
          content:
            application/json:
              schema:
                $ref: "#/components/schemas/Pet"
  /convert:
    post:
      operationId: convert
      tags: [tools]
      requestBody:
        content:
          application/json:
            schema:
              $ref: "#/components/schemas/Pet"
          application/xml:
            schema:
              $ref: "#/components/schemas/Pet"
      responses:
        "200":
          description: converted
          content:
            application/json:
              schema:
                $ref: "#/components/schemas/Pet"
            text/plain:
              schema:
                type: string
components:
  schemas:
    Pet:
      type: object
      required: [id, name]
      properties:
        id:
          type: string
        name:
          type: string
        parent:
          $ref: "#/components/schemas/Pet"
    Error:
      type: object
      properties:
        message:
          type: string
"##;

fn petstore() -> Document {
    normalize(parse_document(PETSTORE, Some(Format::Yaml)).unwrap()).unwrap()
}

#[test]
fn test_scenario_a_single_get() {
    let doc = petstore();
    let extraction = extract("pets", &doc);
    let get: Vec<_> = extraction
        .descriptors
        .iter()
        .filter(|d| d.operation_id == "getPet")
        .collect();

    assert_eq!(get.len(), 1);
    assert_eq!(get[0].url, "/pets/{id}");
    assert_eq!(get[0].variables.len(), 1);
    assert_eq!(get[0].variables[0].name, "id");
    assert_eq!(get[0].variables[0].location, ParamLocation::Path);
    assert_eq!(get[0].response_type(), Some("Pet"));
}

#[test]
fn test_scenario_b_error_map() {
    let doc = petstore();
    let extraction = extract("pets", &doc);
    let get = extraction
        .descriptors
        .iter()
        .find(|d| d.operation_id == "getPet")
        .unwrap();

    assert_eq!(get.errors.len(), 1);
    assert_eq!(get.errors["404"], "Error");
}

#[test]
fn test_scenario_c_inline_body_is_hoisted() {
    let doc = petstore();
    assert!(doc.components.schemas.contains_key("Pet$CreatePet$RequestBody"));

    let extraction = extract("pets", &doc);
    let create = extraction
        .descriptors
        .iter()
        .find(|d| d.operation_id == "createPet")
        .unwrap();
    assert_eq!(
        create.request_body.as_ref().unwrap().type_name.as_deref(),
        Some("Pet$CreatePet$RequestBody")
    );
}

#[test]
fn test_normalize_is_idempotent() {
    let once = petstore();
    let twice = normalize(once.clone()).unwrap();
    assert_eq!(once, twice);
}

#[test]
fn test_every_reference_resolves_after_normalization() {
    let doc = petstore();
    let registry = &doc.components.schemas;

    for node in registry.values() {
        node.visit_refs(&mut |name| {
            assert!(registry.contains_key(name), "dangling schema ref {name}");
        });
    }
    for descriptor in extract("pets", &doc).descriptors {
        for name in descriptor.referenced_types() {
            assert!(registry.contains_key(name), "dangling descriptor type {name}");
        }
    }
}

#[test]
fn test_dangling_reference_is_fatal() {
    let raw = parse_document(
        r##"{"openapi": "3.0.0", "paths": {}, "components": {"schemas": {
            "Pet": {"type": "object", "properties": {"owner": {"$ref": "#/components/schemas/Owner"}}}
        }}}"##,
        None,
    )
    .unwrap();
    assert!(matches!(normalize(raw), Err(Error::DanglingRef { .. })));
}

#[test]
fn test_two_by_two_fan_out() {
    let doc = petstore();
    let extraction = extract("pets", &doc);
    let convert: Vec<_> = extraction
        .descriptors
        .iter()
        .filter(|d| d.operation_id == "convert")
        .collect();

    assert_eq!(convert.len(), 4);
    let keys: BTreeSet<_> = convert.iter().map(|d| d.key()).collect();
    assert_eq!(keys.len(), 4);
}

fn emit_all(doc: &Document) -> apigen_core::EmitOutput {
    let extraction = extract("pets", doc);
    let types = SchemaCompiler::new(&doc.components.schemas).compile_all();
    let ctx = EmitContext {
        source: "pets",
        document: doc,
    };
    emit_source(
        &TargetKind::ALL.into_iter().collect(),
        &extraction.descriptors,
        &types,
        &ctx,
    )
    .unwrap()
}

#[test]
fn test_generated_identifiers_are_unique() {
    let doc = petstore();
    let out = emit_all(&doc);
    let registry = out
        .artifacts
        .iter()
        .find(|a| a.path() == "pets/registry.json")
        .unwrap();
    let summary = apigen_core::RegistrySummary::from_json(registry.content()).unwrap();

    let callables: BTreeSet<_> = summary.requests.iter().map(|r| r.callable.as_str()).collect();
    let hooks: BTreeSet<_> = summary.requests.iter().map(|r| r.hook.as_str()).collect();
    assert_eq!(callables.len(), summary.requests.len());
    assert_eq!(hooks.len(), summary.requests.len());
    assert!(callables.contains("convertWithJsonAsJson"));
    assert!(callables.contains("convertWithXmlAsText"));
    assert!(out.diagnostics.iter().all(|d| !d.is_error()));
}

#[test]
fn test_emission_is_deterministic() {
    let first = emit_all(&petstore());
    let second = emit_all(&petstore());
    assert_eq!(first.artifacts, second.artifacts);
}

fn project(dir: &std::path::Path) -> ProjectConfig {
    fs::write(dir.join("petstore.yaml"), PETSTORE).unwrap();
    ProjectConfig {
        output: dir.join("generated"),
        sources: vec![SourceConfig::new("pets", dir.join("petstore.yaml"))],
        ..ProjectConfig::default()
    }
}

#[test]
fn test_generate_then_check_is_clean() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = Pipeline::new(project(dir.path()), TypeScriptDriver::default());

    let run = pipeline.generate(&[]).unwrap();
    assert!(run.is_ok());
    let out = dir.path().join("generated");
    for path in [
        "runtime.ts",
        "sources.json",
        "pets/registry.json",
        "pets/schemas/Pet.ts",
        "pets/pet/getPet/getPet.ts",
        "pets/pet/getPet/useGetPet.ts",
        "pets/pet/getPet/params.ts",
        "pets/pet/getPet/meta.json",
        "pets/routes/pets/[id]/route.ts",
        "pets/tools/convert/convertWithXmlAsJson.ts",
    ] {
        assert!(out.join(path).is_file(), "missing {path}");
    }

    let drift = check_project(&pipeline, &[]).unwrap();
    assert!(drift.iter().all(|(_, drifts)| drifts.is_empty()), "{drift:?}");

    // A second run rewrites nothing
    let again = pipeline.generate(&[]).unwrap();
    assert!(again.sources[0].dump.written.is_empty());
    assert!(again.global.written.is_empty());
}

#[test]
fn test_check_reports_hand_edits() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = Pipeline::new(project(dir.path()), TypeScriptDriver::default());
    pipeline.generate(&[]).unwrap();

    let edited = dir.path().join("generated/pets/schemas/Pet.ts");
    fs::write(&edited, "// Generated by apigen. Do not edit.\nexport {};\n").unwrap();

    let drift = check_project(&pipeline, &[]).unwrap();
    let pets = &drift.iter().find(|(name, _)| name == "pets").unwrap().1;
    assert_eq!(pets.len(), 1);
    assert_eq!(pets[0].path(), edited);
}
