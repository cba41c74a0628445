//! TypeScript syntax tree used by every emission target.
//!
//! Types, expressions and statements are plain data. Rendering lives in
//! [`super::render`] behind the [`super::Emit`] trait.

use serde_json::Value;

/// A type expression.
#[derive(Debug, Clone, PartialEq)]
pub enum TsType {
    /// `string`, `number`, ...
    Primitive(TsPrimitive),
    /// `T[]`
    Array(Box<TsType>),
    /// `A | B`
    Union(Vec<TsType>),
    /// `A & B`
    Intersection(Vec<TsType>),
    /// `{ a: T; b?: U }`
    Object(Vec<TsProp>),
    /// `Record<K, V>`
    Record { key: Box<TsType>, value: Box<TsType> },
    /// `"a"`, `1`, `true`
    Literal(TsLiteral),
    /// A named type.
    Ref(String),
    /// `Name<A, B>`
    Generic { name: String, args: Vec<TsType> },
    /// `[a: A, b?: B]`
    Tuple(Vec<TsParam>),
    /// `(a: A) => R`
    Function { params: Vec<TsParam>, ret: Box<TsType> },
}

impl TsType {
    /// Shorthand for a primitive.
    pub fn primitive(primitive: TsPrimitive) -> Self {
        Self::Primitive(primitive)
    }

    /// Shorthand for a named reference.
    pub fn named(name: impl Into<String>) -> Self {
        Self::Ref(name.into())
    }

    /// Shorthand for `Name<args>`.
    pub fn generic(name: impl Into<String>, args: Vec<TsType>) -> Self {
        Self::Generic {
            name: name.into(),
            args,
        }
    }

    /// `Record<string, value>`.
    pub fn string_record(value: TsType) -> Self {
        Self::Record {
            key: Box::new(Self::Primitive(TsPrimitive::String)),
            value: Box::new(value),
        }
    }

    /// Build a union, collapsing the single-member case.
    pub fn union(mut members: Vec<TsType>) -> Self {
        if members.len() == 1 {
            members.remove(0)
        } else {
            Self::Union(members)
        }
    }
}

/// Primitive type keywords.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TsPrimitive {
    String,
    Number,
    Boolean,
    Null,
    Undefined,
    Void,
    Unknown,
    Any,
    Never,
}

/// Object type member.
#[derive(Debug, Clone, PartialEq)]
pub struct TsProp {
    pub name: String,
    pub ty: TsType,
    pub optional: bool,
    pub doc: Option<String>,
}

impl TsProp {
    /// A property without documentation.
    pub fn new(name: impl Into<String>, ty: TsType, optional: bool) -> Self {
        Self {
            name: name.into(),
            ty,
            optional,
            doc: None,
        }
    }
}

/// Literal values, usable in both type and value position.
#[derive(Debug, Clone, PartialEq)]
pub enum TsLiteral {
    String(String),
    Number(f64),
    Int(i64),
    Bool(bool),
    Null,
}

impl TsLiteral {
    /// Convert a JSON scalar. Arrays and objects have no literal form.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(Self::String(s.clone())),
            Value::Bool(b) => Some(Self::Bool(*b)),
            Value::Null => Some(Self::Null),
            Value::Number(n) => n
                .as_i64()
                .map(Self::Int)
                .or_else(|| n.as_f64().map(Self::Number)),
            Value::Array(_) | Value::Object(_) => None,
        }
    }
}

/// A value expression.
#[derive(Debug, Clone, PartialEq)]
pub enum TsExpr {
    Ident(String),
    Literal(TsLiteral),
    Call { callee: Box<TsExpr>, args: Vec<TsExpr> },
    New { callee: Box<TsExpr>, args: Vec<TsExpr> },
    Member { object: Box<TsExpr>, prop: String },
    Arrow {
        params: Vec<TsParam>,
        is_async: bool,
        body: ArrowBody,
    },
    Object(Vec<ObjectEntry>),
    Array(Vec<TsExpr>),
    Template(Vec<TemplatePart>),
    Await(Box<TsExpr>),
    /// `expr as Type`
    Cast { expr: Box<TsExpr>, ty: TsType },
    /// Escape hatch for snippets that don't fit the tree.
    Raw(String),
}

impl TsExpr {
    /// An identifier.
    pub fn ident(name: impl Into<String>) -> Self {
        Self::Ident(name.into())
    }

    /// A string literal.
    pub fn string(value: impl Into<String>) -> Self {
        Self::Literal(TsLiteral::String(value.into()))
    }

    /// A numeric literal, as an integer when it has no fractional part.
    pub fn number(value: f64) -> Self {
        if value.fract() == 0.0 && value.abs() < 9.0e15 {
            Self::Literal(TsLiteral::Int(value as i64))
        } else {
            Self::Literal(TsLiteral::Number(value))
        }
    }

    /// `self(args)`
    #[must_use]
    pub fn call(self, args: Vec<TsExpr>) -> Self {
        Self::Call {
            callee: Box::new(self),
            args,
        }
    }

    /// `self.prop`
    #[must_use]
    pub fn member(self, prop: impl Into<String>) -> Self {
        Self::Member {
            object: Box::new(self),
            prop: prop.into(),
        }
    }

    /// `self.name(args)`
    #[must_use]
    pub fn method(self, name: impl Into<String>, args: Vec<TsExpr>) -> Self {
        self.member(name).call(args)
    }

    /// `() => self`
    #[must_use]
    pub fn thunk(self) -> Self {
        Self::Arrow {
            params: Vec::new(),
            is_async: false,
            body: ArrowBody::Expr(Box::new(self)),
        }
    }
}

/// Body of an arrow function.
#[derive(Debug, Clone, PartialEq)]
pub enum ArrowBody {
    Expr(Box<TsExpr>),
    Block(Vec<TsStmt>),
}

/// Object literal entry.
#[derive(Debug, Clone, PartialEq)]
pub enum ObjectEntry {
    /// `key: value`
    Prop(String, TsExpr),
    /// `key`
    Shorthand(String),
    /// `...expr`
    Spread(TsExpr),
}

/// Function or arrow parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct TsParam {
    pub name: String,
    pub ty: Option<TsType>,
    pub optional: bool,
}

impl TsParam {
    /// A required typed parameter.
    pub fn typed(name: impl Into<String>, ty: TsType) -> Self {
        Self {
            name: name.into(),
            ty: Some(ty),
            optional: false,
        }
    }
}

/// Template literal segment.
#[derive(Debug, Clone, PartialEq)]
pub enum TemplatePart {
    Static(String),
    Dynamic(TsExpr),
}

/// Statement inside a function body.
#[derive(Debug, Clone, PartialEq)]
pub enum TsStmt {
    VarDecl {
        kind: VarKind,
        name: String,
        ty: Option<TsType>,
        init: TsExpr,
    },
    Expr(TsExpr),
    Return(Option<TsExpr>),
    If {
        cond: TsExpr,
        then_body: Vec<TsStmt>,
        else_body: Option<Vec<TsStmt>>,
    },
    Raw(String),
}

impl TsStmt {
    /// `const name = init;`
    pub fn constant(name: impl Into<String>, init: TsExpr) -> Self {
        Self::VarDecl {
            kind: VarKind::Const,
            name: name.into(),
            ty: None,
            init,
        }
    }
}

/// `const` or `let`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarKind {
    Const,
    Let,
}

/// Named type declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct TsTypeDef {
    pub name: String,
    pub doc: Option<String>,
    pub kind: TypeDefKind,
}

/// Declaration form.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeDefKind {
    /// `export type Name = ...;`
    Alias(TsType),
    /// `export interface Name { ... }`
    Interface(Vec<TsProp>),
}

/// Top-level `const` declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct TsConst {
    pub name: String,
    pub doc: Option<String>,
    pub ty: Option<TsType>,
    pub init: TsExpr,
    pub is_export: bool,
}

/// Top-level function declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct TsFunction {
    pub name: String,
    pub doc: Option<String>,
    pub params: Vec<TsParam>,
    pub return_type: Option<TsType>,
    pub body: Vec<TsStmt>,
    pub is_async: bool,
    pub is_export: bool,
}

/// `import { a, b as c } from "module";`
#[derive(Debug, Clone, PartialEq)]
pub struct TsImport {
    pub items: Vec<ImportItem>,
    pub from: String,
    pub type_only: bool,
}

/// One imported binding.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ImportItem {
    pub name: String,
    pub alias: Option<String>,
}

impl ImportItem {
    /// The name bound in the importing module.
    pub fn local_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }
}

/// Body-section item.
#[derive(Debug, Clone, PartialEq)]
pub enum TsItem {
    Const(TsConst),
    Function(TsFunction),
    Raw(String),
}

/// A complete module, rendered as header, imports, types then body.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TsModule {
    pub header: Option<String>,
    pub imports: Vec<TsImport>,
    pub types: Vec<TsTypeDef>,
    pub body: Vec<TsItem>,
}
