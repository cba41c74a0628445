//! Tagged schema IR.
//!
//! The variant of every schema is decided once, when the raw document is
//! converted. Later stages match on [`SchemaNode`] instead of re-inspecting
//! optional keywords.

use indexmap::IndexMap;
use serde_json::Value;

use super::raw::{RawAdditionalProperties, RawSchema, RawSchemaType};

const SCHEMA_POINTER_PREFIX: &str = "#/components/schemas/";

/// A schema, classified.
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaNode {
    /// `type: string`.
    String(StringSchema),
    /// `type: number` or `type: integer`.
    Number(NumberSchema),
    /// `type: boolean`.
    Boolean,
    /// `type: null`.
    Null,
    /// `enum` with literal values (null excluded; it becomes [`SchemaNode::Nullable`]).
    Enum(Vec<Value>),
    /// `type: array`.
    Array(ArraySchema),
    /// `type: object`.
    Object(ObjectSchema),
    /// `allOf` / `oneOf` / `anyOf`.
    Composition(Composition),
    /// Reference to a registry entry by canonical name.
    ///
    /// Pointers outside `#/components/schemas/` are kept verbatim and never resolve.
    Ref(String),
    /// `const`.
    Const(Value),
    /// The inner schema, or `null`.
    Nullable(Box<SchemaNode>),
    /// A construct with no static equivalent; compiles to `any`.
    Unsupported(String),
    /// No constraints.
    Any,
}

/// String constraints.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StringSchema {
    pub format: Option<String>,
    pub pattern: Option<String>,
    pub min_length: Option<u64>,
    pub max_length: Option<u64>,
}

/// Numeric constraints. Exclusive bounds are normalized to 3.1 numeric form.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NumberSchema {
    pub integer: bool,
    pub minimum: Option<f64>,
    pub maximum: Option<f64>,
    pub exclusive_minimum: Option<f64>,
    pub exclusive_maximum: Option<f64>,
    pub multiple_of: Option<f64>,
}

/// Array constraints.
#[derive(Debug, Clone, PartialEq)]
pub struct ArraySchema {
    pub items: Box<SchemaNode>,
    pub min_items: Option<u64>,
    pub max_items: Option<u64>,
    pub unique_items: bool,
}

/// Object shape with ordered properties.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectSchema {
    pub properties: Vec<Property>,
    pub required: Vec<String>,
    pub additional: AdditionalProperties,
}

impl ObjectSchema {
    /// Whether `name` is listed in `required`.
    pub fn is_required(&self, name: &str) -> bool {
        self.required.iter().any(|r| r == name)
    }
}

/// A named object property.
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub name: String,
    pub schema: SchemaNode,
    pub description: Option<String>,
}

/// `additionalProperties` policy.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum AdditionalProperties {
    /// Keyword absent: extra keys pass through unvalidated.
    #[default]
    Default,
    /// `false`.
    Forbidden,
    /// `true` or `{}`.
    Allowed,
    /// Extra values must match this schema.
    Schema(Box<SchemaNode>),
}

/// Composition keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompositionKind {
    AllOf,
    OneOf,
    AnyOf,
}

/// `allOf` / `oneOf` / `anyOf` with its members.
#[derive(Debug, Clone, PartialEq)]
pub struct Composition {
    pub kind: CompositionKind,
    pub members: Vec<SchemaNode>,
    pub discriminator: Option<Discriminator>,
}

/// Discriminator with mapping targets as canonical schema names.
#[derive(Debug, Clone, PartialEq)]
pub struct Discriminator {
    pub property_name: String,
    pub mapping: IndexMap<String, String>,
}

/// Convert a `$ref` pointer into a registry name.
///
/// `#/components/schemas/Pet` becomes `Pet`. Anything else is returned as-is.
pub fn canonical_schema_ref(pointer: &str) -> String {
    match pointer.strip_prefix(SCHEMA_POINTER_PREFIX) {
        Some(name) if !name.contains('/') => unescape_pointer_token(name),
        _ => pointer.to_string(),
    }
}

/// Undo JSON pointer escaping (`~1` → `/`, `~0` → `~`).
pub fn unescape_pointer_token(token: &str) -> String {
    token.replace("~1", "/").replace("~0", "~")
}

impl SchemaNode {
    /// Classify a raw schema.
    pub fn from_raw(raw: &RawSchema) -> Self {
        if let Some(pointer) = &raw.ref_path {
            let node = Self::Ref(canonical_schema_ref(pointer));
            return if raw.nullable == Some(true) {
                Self::Nullable(Box::new(node))
            } else {
                node
            };
        }

        let mut nullable = raw.nullable == Some(true)
            || raw
                .schema_type
                .as_ref()
                .is_some_and(|t| t.names().len() > 1 && t.names().contains(&"null"));

        let base = classify(raw, &mut nullable);
        base.into_nullable_if(nullable)
    }

    fn into_nullable_if(self, nullable: bool) -> Self {
        match self {
            node @ (Self::Null | Self::Nullable(_) | Self::Any) => node,
            node if nullable => Self::Nullable(Box::new(node)),
            node => node,
        }
    }

    /// Visit every schema reference reachable without crossing into the registry.
    pub fn visit_refs<'a>(&'a self, f: &mut impl FnMut(&'a str)) {
        match self {
            Self::Ref(name) => f(name),
            Self::Array(array) => array.items.visit_refs(f),
            Self::Object(object) => {
                for property in &object.properties {
                    property.schema.visit_refs(f);
                }
                if let AdditionalProperties::Schema(schema) = &object.additional {
                    schema.visit_refs(f);
                }
            }
            Self::Composition(composition) => {
                for member in &composition.members {
                    member.visit_refs(f);
                }
            }
            Self::Nullable(inner) => inner.visit_refs(f),
            Self::String(_)
            | Self::Number(_)
            | Self::Boolean
            | Self::Null
            | Self::Enum(_)
            | Self::Const(_)
            | Self::Unsupported(_)
            | Self::Any => {}
        }
    }

    /// Whether this node is a plain reference.
    pub fn as_ref_name(&self) -> Option<&str> {
        match self {
            Self::Ref(name) => Some(name),
            _ => None,
        }
    }
}

fn classify(raw: &RawSchema, nullable: &mut bool) -> SchemaNode {
    if let Some(value) = &raw.const_value {
        return SchemaNode::Const(value.clone());
    }

    if let Some(values) = &raw.enum_values {
        let literals: Vec<Value> = values.iter().filter(|v| !v.is_null()).cloned().collect();
        if literals.len() != values.len() {
            *nullable = true;
        }
        return if literals.is_empty() {
            SchemaNode::Null
        } else {
            SchemaNode::Enum(literals)
        };
    }

    if let Some(members) = &raw.all_of {
        let mut nodes: Vec<SchemaNode> = members.iter().map(SchemaNode::from_raw).collect();
        if !raw.properties.is_empty() {
            nodes.push(object_node(raw));
        }
        return composition(CompositionKind::AllOf, nodes, raw);
    }

    for (kind, members) in [
        (CompositionKind::OneOf, &raw.one_of),
        (CompositionKind::AnyOf, &raw.any_of),
    ] {
        if let Some(members) = members {
            let non_null: Vec<SchemaNode> = members
                .iter()
                .filter(|m| !m.is_null_type())
                .map(SchemaNode::from_raw)
                .collect();
            if non_null.len() != members.len() {
                *nullable = true;
            }
            return composition(kind, non_null, raw);
        }
    }

    if raw.not.is_some() {
        return SchemaNode::Unsupported("not".to_string());
    }

    let type_names: Vec<&str> = raw
        .schema_type
        .as_ref()
        .map(RawSchemaType::names)
        .unwrap_or_default()
        .into_iter()
        .filter(|t| *t != "null")
        .collect();

    let only_null = raw
        .schema_type
        .as_ref()
        .is_some_and(|t| !t.names().is_empty() && t.names().iter().all(|n| *n == "null"));
    if only_null {
        return SchemaNode::Null;
    }

    match type_names.as_slice() {
        [] => {
            if !raw.properties.is_empty() || raw.additional_properties.is_some() {
                object_node(raw)
            } else if raw.items.is_some() {
                array_node(raw)
            } else {
                SchemaNode::Any
            }
        }
        [single] => typed_node(single, raw),
        several => SchemaNode::Composition(Composition {
            kind: CompositionKind::AnyOf,
            members: several.iter().map(|t| typed_node(t, raw)).collect(),
            discriminator: None,
        }),
    }
}

fn typed_node(type_name: &str, raw: &RawSchema) -> SchemaNode {
    match type_name {
        "string" => SchemaNode::String(StringSchema {
            format: raw.format.clone(),
            pattern: raw.pattern.clone(),
            min_length: raw.min_length,
            max_length: raw.max_length,
        }),
        "number" | "integer" => SchemaNode::Number(number_schema(type_name == "integer", raw)),
        "boolean" => SchemaNode::Boolean,
        "array" => array_node(raw),
        "object" => object_node(raw),
        other => SchemaNode::Unsupported(format!("type '{other}'")),
    }
}

fn number_schema(integer: bool, raw: &RawSchema) -> NumberSchema {
    let mut schema = NumberSchema {
        integer,
        minimum: raw.minimum,
        maximum: raw.maximum,
        multiple_of: raw.multiple_of,
        ..NumberSchema::default()
    };

    match &raw.exclusive_minimum {
        Some(Value::Bool(true)) => schema.exclusive_minimum = schema.minimum.take(),
        Some(Value::Number(n)) => schema.exclusive_minimum = n.as_f64(),
        _ => {}
    }
    match &raw.exclusive_maximum {
        Some(Value::Bool(true)) => schema.exclusive_maximum = schema.maximum.take(),
        Some(Value::Number(n)) => schema.exclusive_maximum = n.as_f64(),
        _ => {}
    }
    schema
}

fn array_node(raw: &RawSchema) -> SchemaNode {
    SchemaNode::Array(ArraySchema {
        items: Box::new(raw.items.as_deref().map_or(SchemaNode::Any, SchemaNode::from_raw)),
        min_items: raw.min_items,
        max_items: raw.max_items,
        unique_items: raw.unique_items,
    })
}

fn object_node(raw: &RawSchema) -> SchemaNode {
    let properties = raw
        .properties
        .iter()
        .map(|(name, schema)| Property {
            name: name.clone(),
            schema: SchemaNode::from_raw(schema),
            description: schema.description.clone(),
        })
        .collect();

    let additional = match &raw.additional_properties {
        None => AdditionalProperties::Default,
        Some(RawAdditionalProperties::Bool(false)) => AdditionalProperties::Forbidden,
        Some(RawAdditionalProperties::Bool(true)) => AdditionalProperties::Allowed,
        Some(RawAdditionalProperties::Schema(schema)) => match SchemaNode::from_raw(schema) {
            SchemaNode::Any => AdditionalProperties::Allowed,
            node => AdditionalProperties::Schema(Box::new(node)),
        },
    };

    SchemaNode::Object(ObjectSchema {
        properties,
        required: raw.required.clone(),
        additional,
    })
}

fn composition(kind: CompositionKind, mut members: Vec<SchemaNode>, raw: &RawSchema) -> SchemaNode {
    let discriminator = raw.discriminator.as_ref().map(|d| Discriminator {
        property_name: d.property_name.clone(),
        mapping: d
            .mapping
            .iter()
            .map(|(value, target)| (value.clone(), canonical_schema_ref(target)))
            .collect(),
    });

    match members.len() {
        0 => SchemaNode::Any,
        1 if discriminator.is_none() => members.remove(0),
        _ => SchemaNode::Composition(Composition {
            kind,
            members,
            discriminator,
        }),
    }
}
