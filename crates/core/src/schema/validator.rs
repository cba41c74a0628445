//! Runtime validator tree and its zod rendering.

use crate::ts::{ObjectEntry, TsExpr, TsLiteral, utils::schema_ident};

/// Check applied to a string validator.
#[derive(Debug, Clone, PartialEq)]
pub enum StringCheck {
    Min(u64),
    Max(u64),
    Regex(String),
    Date,
    Time,
    DateTime,
    Uuid,
    Email,
    Url,
}

/// Check applied to a number validator.
#[derive(Debug, Clone, PartialEq)]
pub enum NumberCheck {
    Gte(f64),
    Lte(f64),
    Gt(f64),
    Lt(f64),
    MultipleOf(f64),
}

/// Treatment of keys not listed in an object's properties.
#[derive(Debug, Clone, PartialEq)]
pub enum ObjectMode {
    /// Unknown keys are dropped.
    Strip,
    /// Unknown keys are rejected.
    Strict,
    /// Unknown keys are kept unvalidated.
    Passthrough,
    /// Unknown keys must match the validator.
    Catchall(Box<Validator>),
}

/// Object property validator.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyValidator {
    pub name: String,
    pub validator: Validator,
    pub required: bool,
}

/// Validator tree, one node per zod combinator.
#[derive(Debug, Clone, PartialEq)]
pub enum Validator {
    String(Vec<StringCheck>),
    Number { integer: bool, checks: Vec<NumberCheck> },
    Boolean,
    Null,
    /// Binary payloads (`format: binary`).
    Blob,
    Literal(TsLiteral),
    /// All-string enumeration.
    Enum(Vec<String>),
    Array {
        element: Box<Validator>,
        min_items: Option<u64>,
        max_items: Option<u64>,
    },
    Object {
        properties: Vec<PropertyValidator>,
        mode: ObjectMode,
    },
    /// String-keyed map.
    Record(Box<Validator>),
    Union(Vec<Validator>),
    Intersection(Vec<Validator>),
    /// Deferred reference to a named schema's validator.
    Lazy(String),
    Nullable(Box<Validator>),
    /// Accepts anything.
    Any,
    /// Accepts anything, typed as unknown.
    Unknown,
}

fn z(factory: &str, args: Vec<TsExpr>) -> TsExpr {
    TsExpr::ident("z").method(factory, args)
}

fn literal(lit: &TsLiteral) -> TsExpr {
    TsExpr::Literal(lit.clone())
}

impl Validator {
    /// Render as a zod expression.
    pub fn to_expr(&self) -> TsExpr {
        match self {
            Self::String(checks) => checks.iter().fold(z("string", vec![]), |expr, check| match check {
                StringCheck::Min(n) => expr.method("min", vec![TsExpr::number(*n as f64)]),
                StringCheck::Max(n) => expr.method("max", vec![TsExpr::number(*n as f64)]),
                StringCheck::Regex(pattern) => expr.method(
                    "regex",
                    vec![TsExpr::New {
                        callee: Box::new(TsExpr::ident("RegExp")),
                        args: vec![TsExpr::string(pattern.clone())],
                    }],
                ),
                StringCheck::Date => expr.method("date", vec![]),
                StringCheck::Time => expr.method("time", vec![]),
                StringCheck::DateTime => expr.method("datetime", vec![]),
                StringCheck::Uuid => expr.method("uuid", vec![]),
                StringCheck::Email => expr.method("email", vec![]),
                StringCheck::Url => expr.method("url", vec![]),
            }),
            Self::Number { integer, checks } => {
                let base = if *integer {
                    z("number", vec![]).method("int", vec![])
                } else {
                    z("number", vec![])
                };
                checks.iter().fold(base, |expr, check| {
                    let (method, value) = match check {
                        NumberCheck::Gte(v) => ("gte", v),
                        NumberCheck::Lte(v) => ("lte", v),
                        NumberCheck::Gt(v) => ("gt", v),
                        NumberCheck::Lt(v) => ("lt", v),
                        NumberCheck::MultipleOf(v) => ("multipleOf", v),
                    };
                    expr.method(method, vec![TsExpr::number(*value)])
                })
            }
            Self::Boolean => z("boolean", vec![]),
            Self::Null => z("null", vec![]),
            Self::Blob => z("instanceof", vec![TsExpr::ident("Blob")]),
            Self::Literal(lit) => z("literal", vec![literal(lit)]),
            Self::Enum(values) => z(
                "enum",
                vec![TsExpr::Array(values.iter().map(|v| TsExpr::string(v.clone())).collect())],
            ),
            Self::Array {
                element,
                min_items,
                max_items,
            } => {
                let mut expr = z("array", vec![element.to_expr()]);
                if let Some(min) = min_items {
                    expr = expr.method("min", vec![TsExpr::number(*min as f64)]);
                }
                if let Some(max) = max_items {
                    expr = expr.method("max", vec![TsExpr::number(*max as f64)]);
                }
                expr
            }
            Self::Object { properties, mode } => {
                let entries = properties
                    .iter()
                    .map(|p| {
                        let value = p.validator.to_expr();
                        let value = if p.required {
                            value
                        } else {
                            value.method("optional", vec![])
                        };
                        ObjectEntry::Prop(p.name.clone(), value)
                    })
                    .collect();
                let object = z("object", vec![TsExpr::Object(entries)]);
                match mode {
                    ObjectMode::Strip => object,
                    ObjectMode::Strict => object.method("strict", vec![]),
                    ObjectMode::Passthrough => object.method("passthrough", vec![]),
                    ObjectMode::Catchall(rest) => object.method("catchall", vec![rest.to_expr()]),
                }
            }
            Self::Record(value) => z("record", vec![z("string", vec![]), value.to_expr()]),
            Self::Union(members) => match members.as_slice() {
                [] => z("never", vec![]),
                [single] => single.to_expr(),
                _ => z(
                    "union",
                    vec![TsExpr::Array(members.iter().map(Self::to_expr).collect())],
                ),
            },
            Self::Intersection(members) => {
                let mut iter = members.iter();
                match iter.next() {
                    None => z("unknown", vec![]),
                    Some(first) => iter.fold(first.to_expr(), |expr, member| {
                        expr.method("and", vec![member.to_expr()])
                    }),
                }
            }
            Self::Lazy(name) => z("lazy", vec![TsExpr::ident(schema_ident(name)).thunk()]),
            Self::Nullable(inner) => inner.to_expr().method("nullable", vec![]),
            Self::Any => z("any", vec![]),
            Self::Unknown => z("unknown", vec![]),
        }
    }
}
