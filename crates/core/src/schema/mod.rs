//! Schema compiler: a static type plus a runtime validator per registry schema.
//!
//! Compilation of a node is pure. References compile to named types and lazy
//! validators, so recursive schemas terminate without looking at their
//! targets. The [`SchemaCompiler`] memoizes descriptors by canonical name.

mod validator;

use std::collections::{BTreeMap, BTreeSet};

use indexmap::IndexMap;
use serde_json::Value;
use tracing::debug;

pub use validator::{NumberCheck, ObjectMode, PropertyValidator, StringCheck, Validator};

use crate::diagnostic::{Diagnostic, DiagnosticKind};
use crate::openapi::{
    AdditionalProperties, ArraySchema, Composition, CompositionKind, NumberSchema, ObjectSchema,
    SchemaNode, StringSchema,
};
use crate::ts::utils::{schema_ident, type_ident};
use crate::ts::{TsLiteral, TsPrimitive, TsProp, TsType};

/// Compiled form of one named schema.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeDescriptor {
    /// Canonical registry name.
    pub name: String,
    pub static_type: TsType,
    pub validator: Validator,
    /// Registry names this schema refers to, self included when recursive.
    pub imports: BTreeSet<String>,
    /// Constructs that were compiled to an unconstrained type.
    pub degraded: Vec<String>,
}

impl TypeDescriptor {
    /// TypeScript type identifier.
    pub fn type_ident(&self) -> String {
        type_ident(&self.name)
    }

    /// Identifier of the zod validator constant.
    pub fn schema_ident(&self) -> String {
        schema_ident(&self.name)
    }

    /// Whether the static type is `Blob` (binary payload).
    pub fn is_binary(&self) -> bool {
        self.validator == Validator::Blob
    }
}

/// Compile a single schema node.
pub fn compile(name: &str, node: &SchemaNode) -> TypeDescriptor {
    let mut lowering = Lowering::default();
    let (static_type, validator) = lowering.lower(node);
    TypeDescriptor {
        name: name.to_string(),
        static_type,
        validator,
        imports: lowering.imports,
        degraded: lowering.degraded,
    }
}

/// Every registry schema, compiled, in registry order.
#[derive(Debug, Clone, Default)]
pub struct CompiledTypes {
    pub descriptors: IndexMap<String, TypeDescriptor>,
    pub diagnostics: Vec<Diagnostic>,
}

impl CompiledTypes {
    /// Look up a descriptor by canonical name.
    pub fn get(&self, name: &str) -> Option<&TypeDescriptor> {
        self.descriptors.get(name)
    }
}

/// Memoizing compiler over a schema registry.
#[derive(Debug)]
pub struct SchemaCompiler<'a> {
    registry: &'a IndexMap<String, SchemaNode>,
    memo: BTreeMap<String, TypeDescriptor>,
}

impl<'a> SchemaCompiler<'a> {
    /// Create a compiler over `registry`.
    pub fn new(registry: &'a IndexMap<String, SchemaNode>) -> Self {
        Self {
            registry,
            memo: BTreeMap::new(),
        }
    }

    /// Compile (or fetch from the memo) the schema registered as `name`.
    pub fn compile_named(&mut self, name: &str) -> Option<&TypeDescriptor> {
        if !self.memo.contains_key(name) {
            let node = self.registry.get(name)?;
            self.memo.insert(name.to_string(), compile(name, node));
        }
        self.memo.get(name)
    }

    /// Number of memoized descriptors.
    pub fn memoized(&self) -> usize {
        self.memo.len()
    }

    /// Compile every registry entry.
    pub fn compile_all(mut self) -> CompiledTypes {
        let registry = self.registry;
        let mut compiled = CompiledTypes::default();

        for name in registry.keys() {
            let Some(descriptor) = self.compile_named(name).cloned() else {
                continue;
            };
            for construct in &descriptor.degraded {
                compiled.diagnostics.push(Diagnostic::warning(
                    DiagnosticKind::DegradedSchema,
                    name.clone(),
                    format!("unsupported construct {construct} compiled to any"),
                ));
            }
            compiled.descriptors.insert(name.clone(), descriptor);
        }

        debug!(
            schemas = compiled.descriptors.len(),
            degraded = compiled.diagnostics.len(),
            "Compiled schemas."
        );
        compiled
    }
}

#[derive(Default)]
struct Lowering {
    imports: BTreeSet<String>,
    degraded: Vec<String>,
}

impl Lowering {
    fn lower(&mut self, node: &SchemaNode) -> (TsType, Validator) {
        match node {
            SchemaNode::String(s) => lower_string(s),
            SchemaNode::Number(n) => (
                TsType::Primitive(TsPrimitive::Number),
                lower_number(n),
            ),
            SchemaNode::Boolean => (TsType::Primitive(TsPrimitive::Boolean), Validator::Boolean),
            SchemaNode::Null => (TsType::Primitive(TsPrimitive::Null), Validator::Null),
            SchemaNode::Enum(values) => self.lower_enum(values),
            SchemaNode::Const(value) => match TsLiteral::from_json(value) {
                Some(lit) => (TsType::Literal(lit.clone()), Validator::Literal(lit)),
                None => self.degrade("non-scalar const"),
            },
            SchemaNode::Array(array) => self.lower_array(array),
            SchemaNode::Object(object) => self.lower_object(object),
            SchemaNode::Composition(composition) => self.lower_composition(composition),
            SchemaNode::Ref(name) => {
                self.imports.insert(name.clone());
                (TsType::Ref(type_ident(name)), Validator::Lazy(name.clone()))
            }
            SchemaNode::Nullable(inner) => {
                let (ty, validator) = self.lower(inner);
                (
                    TsType::Union(vec![ty, TsType::Primitive(TsPrimitive::Null)]),
                    Validator::Nullable(Box::new(validator)),
                )
            }
            SchemaNode::Unsupported(construct) => self.degrade(construct),
            SchemaNode::Any => (TsType::Primitive(TsPrimitive::Unknown), Validator::Unknown),
        }
    }

    fn degrade(&mut self, construct: &str) -> (TsType, Validator) {
        self.degraded.push(construct.to_string());
        (TsType::Primitive(TsPrimitive::Unknown), Validator::Any)
    }

    fn lower_enum(&mut self, values: &[Value]) -> (TsType, Validator) {
        let Some(literals) = values
            .iter()
            .map(TsLiteral::from_json)
            .collect::<Option<Vec<_>>>()
        else {
            return self.degrade("non-scalar enum");
        };

        let ty = TsType::union(literals.iter().cloned().map(TsType::Literal).collect());
        let strings: Option<Vec<String>> = literals
            .iter()
            .map(|lit| match lit {
                TsLiteral::String(s) => Some(s.clone()),
                _ => None,
            })
            .collect();

        let validator = match strings {
            Some(strings) => Validator::Enum(strings),
            None => Validator::Union(literals.into_iter().map(Validator::Literal).collect()),
        };
        (ty, validator)
    }

    fn lower_array(&mut self, array: &ArraySchema) -> (TsType, Validator) {
        let (element_ty, element) = self.lower(&array.items);
        (
            TsType::Array(Box::new(element_ty)),
            Validator::Array {
                element: Box::new(element),
                min_items: array.min_items,
                max_items: array.max_items,
            },
        )
    }

    fn lower_object(&mut self, object: &ObjectSchema) -> (TsType, Validator) {
        let mut props = Vec::with_capacity(object.properties.len());
        let mut validators = Vec::with_capacity(object.properties.len());
        for property in &object.properties {
            let (ty, validator) = self.lower(&property.schema);
            let required = object.is_required(&property.name);
            props.push(TsProp {
                doc: property.description.clone(),
                ..TsProp::new(property.name.clone(), ty, !required)
            });
            validators.push(PropertyValidator {
                name: property.name.clone(),
                validator,
                required,
            });
        }

        let extra = match &object.additional {
            AdditionalProperties::Schema(schema) => Some(self.lower(schema)),
            _ => None,
        };

        if props.is_empty() {
            return match (&object.additional, extra) {
                (_, Some((ty, validator))) => {
                    (TsType::string_record(ty), Validator::Record(Box::new(validator)))
                }
                (AdditionalProperties::Forbidden, None) => (
                    TsType::Record {
                        key: Box::new(TsType::Primitive(TsPrimitive::String)),
                        value: Box::new(TsType::Primitive(TsPrimitive::Never)),
                    },
                    Validator::Object {
                        properties: Vec::new(),
                        mode: ObjectMode::Strict,
                    },
                ),
                _ => (
                    TsType::string_record(TsType::Primitive(TsPrimitive::Unknown)),
                    Validator::Record(Box::new(Validator::Unknown)),
                ),
            };
        }

        let shape = TsType::Object(props);
        match (&object.additional, extra) {
            (_, Some((ty, validator))) => (
                TsType::Intersection(vec![shape, TsType::string_record(ty)]),
                Validator::Object {
                    properties: validators,
                    mode: ObjectMode::Catchall(Box::new(validator)),
                },
            ),
            (AdditionalProperties::Allowed, None) => (
                TsType::Intersection(vec![
                    shape,
                    TsType::string_record(TsType::Primitive(TsPrimitive::Unknown)),
                ]),
                Validator::Object {
                    properties: validators,
                    mode: ObjectMode::Passthrough,
                },
            ),
            (AdditionalProperties::Forbidden, None) => (
                shape,
                Validator::Object {
                    properties: validators,
                    mode: ObjectMode::Strict,
                },
            ),
            _ => (
                shape,
                Validator::Object {
                    properties: validators,
                    mode: ObjectMode::Strip,
                },
            ),
        }
    }

    fn lower_composition(&mut self, composition: &Composition) -> (TsType, Validator) {
        let mut types = Vec::with_capacity(composition.members.len());
        let mut validators = Vec::with_capacity(composition.members.len());

        for member in &composition.members {
            let (ty, validator) = self.lower(member);
            match discriminator_tag(composition, member) {
                Some((property, value)) => {
                    let tag = TsType::Object(vec![TsProp::new(
                        property.clone(),
                        TsType::Literal(TsLiteral::String(value.clone())),
                        false,
                    )]);
                    types.push(TsType::Intersection(vec![tag, ty]));
                    validators.push(Validator::Intersection(vec![
                        validator,
                        Validator::Object {
                            properties: vec![PropertyValidator {
                                name: property,
                                validator: Validator::Literal(TsLiteral::String(value)),
                                required: true,
                            }],
                            mode: ObjectMode::Passthrough,
                        },
                    ]));
                }
                None => {
                    types.push(ty);
                    validators.push(validator);
                }
            }
        }

        match composition.kind {
            CompositionKind::AllOf => (
                TsType::Intersection(types),
                Validator::Intersection(validators),
            ),
            CompositionKind::OneOf | CompositionKind::AnyOf => {
                (TsType::union(types), Validator::Union(validators))
            }
        }
    }
}

/// Discriminator property and value for a union member, when it has one.
///
/// Mapped values win; unmapped referenced members use their schema name.
fn discriminator_tag(composition: &Composition, member: &SchemaNode) -> Option<(String, String)> {
    let discriminator = composition.discriminator.as_ref()?;
    if composition.kind == CompositionKind::AllOf {
        return None;
    }
    let target = member.as_ref_name()?;
    let value = discriminator
        .mapping
        .iter()
        .find(|(_, mapped)| mapped.as_str() == target)
        .map_or_else(|| target.to_string(), |(value, _)| value.clone());
    Some((discriminator.property_name.clone(), value))
}

fn lower_string(schema: &StringSchema) -> (TsType, Validator) {
    if schema.format.as_deref() == Some("binary") {
        return (TsType::named("Blob"), Validator::Blob);
    }

    let mut checks = Vec::new();
    if let Some(min) = schema.min_length {
        checks.push(StringCheck::Min(min));
    }
    if let Some(max) = schema.max_length {
        checks.push(StringCheck::Max(max));
    }
    match &schema.pattern {
        // An explicit pattern replaces any format check
        Some(pattern) => checks.push(StringCheck::Regex(pattern.clone())),
        None => match schema.format.as_deref() {
            Some("date") => checks.push(StringCheck::Date),
            Some("time") => checks.push(StringCheck::Time),
            Some("date-time") => checks.push(StringCheck::DateTime),
            Some("uuid") => checks.push(StringCheck::Uuid),
            Some("email") => checks.push(StringCheck::Email),
            Some("uri" | "url") => checks.push(StringCheck::Url),
            _ => {}
        },
    }
    (TsType::Primitive(TsPrimitive::String), Validator::String(checks))
}

fn lower_number(schema: &NumberSchema) -> Validator {
    let bounds: [(Option<f64>, fn(f64) -> NumberCheck); 5] = [
        (schema.minimum, NumberCheck::Gte),
        (schema.maximum, NumberCheck::Lte),
        (schema.exclusive_minimum, NumberCheck::Gt),
        (schema.exclusive_maximum, NumberCheck::Lt),
        (schema.multiple_of, NumberCheck::MultipleOf),
    ];
    Validator::Number {
        integer: schema.integer,
        checks: bounds
            .into_iter()
            .filter_map(|(value, check)| value.map(check))
            .collect(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::openapi::{parse_document, Discriminator, Property};
    use crate::ts::Emit;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn string_node(format: Option<&str>, pattern: Option<&str>) -> SchemaNode {
        SchemaNode::String(StringSchema {
            format: format.map(str::to_string),
            pattern: pattern.map(str::to_string),
            ..StringSchema::default()
        })
    }

    #[test]
    fn test_pattern_wins_over_format() {
        let d = compile("Day", &string_node(Some("date"), Some("^\\d{4}$")));
        assert_eq!(d.validator.to_expr().emit(), "z.string().regex(new RegExp(\"^\\\\d{4}$\"))");

        let d = compile("Day", &string_node(Some("date"), None));
        assert_eq!(d.validator.to_expr().emit(), "z.string().date()");
        assert_eq!(d.static_type.emit(), "string");
    }

    #[test]
    fn test_object_with_optional_props() {
        let node = SchemaNode::Object(ObjectSchema {
            properties: vec![
                Property {
                    name: "id".into(),
                    schema: SchemaNode::Number(NumberSchema {
                        integer: true,
                        ..NumberSchema::default()
                    }),
                    description: None,
                },
                Property {
                    name: "owner".into(),
                    schema: SchemaNode::Ref("User".into()),
                    description: None,
                },
            ],
            required: vec!["id".into()],
            additional: AdditionalProperties::Default,
        });
        let d = compile("Pet", &node);
        assert_eq!(d.static_type.emit(), "{ id: number; owner?: User }");
        assert_eq!(
            d.validator.to_expr().emit(),
            "z.object({ id: z.number().int(), owner: z.lazy(() => UserSchema).optional() })"
        );
        assert_eq!(d.imports.iter().collect::<Vec<_>>(), ["User"]);
    }

    #[test]
    fn test_additional_properties_record() {
        let node = SchemaNode::Object(ObjectSchema {
            additional: AdditionalProperties::Schema(Box::new(SchemaNode::Number(
                NumberSchema::default(),
            ))),
            ..ObjectSchema::default()
        });
        let d = compile("Scores", &node);
        assert_eq!(d.static_type.emit(), "Record<string, number>");
        assert_eq!(d.validator.to_expr().emit(), "z.record(z.string(), z.number())");
    }

    #[test]
    fn test_all_of_and_one_of() {
        let all = SchemaNode::Composition(Composition {
            kind: CompositionKind::AllOf,
            members: vec![SchemaNode::Ref("A".into()), SchemaNode::Ref("B".into())],
            discriminator: None,
        });
        let d = compile("AB", &all);
        assert_eq!(d.static_type.emit(), "A & B");
        assert_eq!(
            d.validator.to_expr().emit(),
            "z.lazy(() => ASchema).and(z.lazy(() => BSchema))"
        );

        let one = SchemaNode::Composition(Composition {
            kind: CompositionKind::OneOf,
            members: vec![SchemaNode::Ref("A".into()), SchemaNode::Boolean],
            discriminator: None,
        });
        let d = compile("AOrBool", &one);
        assert_eq!(d.static_type.emit(), "A | boolean");
        assert_eq!(
            d.validator.to_expr().emit(),
            "z.union([z.lazy(() => ASchema), z.boolean()])"
        );
    }

    #[test]
    fn test_discriminator_tags_members() {
        let node = SchemaNode::Composition(Composition {
            kind: CompositionKind::OneOf,
            members: vec![SchemaNode::Ref("Cat".into()), SchemaNode::Ref("Dog".into())],
            discriminator: Some(Discriminator {
                property_name: "kind".into(),
                mapping: [("cat".to_string(), "Cat".to_string())].into_iter().collect(),
            }),
        });
        let d = compile("Animal", &node);
        assert_eq!(
            d.static_type.emit(),
            "{ kind: \"cat\" } & Cat | { kind: \"Dog\" } & Dog"
        );
    }

    #[test]
    fn test_enums_and_const() {
        let d = compile("Status", &SchemaNode::Enum(vec![json!("on"), json!("off")]));
        assert_eq!(d.static_type.emit(), "\"on\" | \"off\"");
        assert_eq!(d.validator.to_expr().emit(), "z.enum([\"on\", \"off\"])");

        let d = compile("Level", &SchemaNode::Enum(vec![json!(1), json!("x")]));
        assert_eq!(d.static_type.emit(), "1 | \"x\"");
        assert_eq!(
            d.validator.to_expr().emit(),
            "z.union([z.literal(1), z.literal(\"x\")])"
        );

        let d = compile("Version", &SchemaNode::Const(json!(2)));
        assert_eq!(d.validator.to_expr().emit(), "z.literal(2)");
    }

    #[test]
    fn test_unsupported_degrades() {
        let d = compile("Weird", &SchemaNode::Unsupported("not".into()));
        assert_eq!(d.static_type.emit(), "unknown");
        assert_eq!(d.validator.to_expr().emit(), "z.any()");
        assert_eq!(d.degraded, ["not"]);
    }

    #[test]
    fn test_binary_is_blob() {
        let d = compile("File", &string_node(Some("binary"), None));
        assert_eq!(d.static_type.emit(), "Blob");
        assert!(d.is_binary());
    }

    #[test]
    fn test_recursive_schema_uses_lazy() {
        let doc = parse_document(
            r##"{"openapi": "3.0.0", "paths": {}, "components": {"schemas": {
                "Node": {"type": "object", "properties": {
                    "next": {"$ref": "#/components/schemas/Node", "nullable": true}
                }}
            }}}"##,
            None,
        )
        .unwrap();
        let compiled = SchemaCompiler::new(&doc.components.schemas).compile_all();
        let node = compiled.get("Node").unwrap();
        assert_eq!(node.static_type.emit(), "{ next?: Node | null }");
        assert_eq!(
            node.validator.to_expr().emit(),
            "z.object({ next: z.lazy(() => NodeSchema).nullable().optional() })"
        );
        assert!(node.imports.contains("Node"));
    }

    #[test]
    fn test_memoization() {
        let mut registry = IndexMap::new();
        registry.insert("A".to_string(), SchemaNode::Boolean);
        let mut compiler = SchemaCompiler::new(&registry);
        assert!(compiler.compile_named("A").is_some());
        assert!(compiler.compile_named("A").is_some());
        assert!(compiler.compile_named("Missing").is_none());
        assert_eq!(compiler.memoized(), 1);
    }

    #[test]
    fn test_degraded_diagnostics() {
        let mut registry = IndexMap::new();
        registry.insert("X".to_string(), SchemaNode::Unsupported("not".into()));
        let compiled = SchemaCompiler::new(&registry).compile_all();
        assert_eq!(compiled.diagnostics.len(), 1);
        assert_eq!(compiled.diagnostics[0].kind, DiagnosticKind::DegradedSchema);
        assert!(!compiled.diagnostics[0].is_error());
    }
}
