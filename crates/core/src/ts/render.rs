//! Rendering of the TypeScript tree via the [`Emit`] trait.

use super::ast::{
    ArrowBody, ImportItem, ObjectEntry, TemplatePart, TsConst, TsExpr, TsFunction, TsImport,
    TsItem, TsLiteral, TsModule, TsParam, TsPrimitive, TsProp, TsStmt, TsType, TsTypeDef,
    TypeDefKind, VarKind,
};
use super::utils::{escape_js_string, quote_if_needed};

const INDENT: &str = "  ";

/// Objects with more entries than this render one entry per line.
const INLINE_OBJECT_LIMIT: usize = 2;

/// Convert a syntax node into TypeScript source.
pub trait Emit {
    /// Render the node.
    fn emit(&self) -> String;
}

fn join<T: Emit>(items: &[T], separator: &str) -> String {
    items.iter().map(Emit::emit).collect::<Vec<_>>().join(separator)
}

fn doc_comment(doc: Option<&str>, indent: usize) -> String {
    let Some(doc) = doc.map(str::trim).filter(|d| !d.is_empty()) else {
        return String::new();
    };
    let prefix = INDENT.repeat(indent);
    let doc = doc.replace("*/", "*\\/");
    let lines: Vec<&str> = doc.lines().collect();
    if lines.len() == 1 {
        return format!("{prefix}/** {} */\n", lines[0]);
    }
    let mut out = format!("{prefix}/**\n");
    for line in lines {
        if line.trim().is_empty() {
            out.push_str(&format!("{prefix} *\n"));
        } else {
            out.push_str(&format!("{prefix} * {}\n", line.trim_end()));
        }
    }
    out.push_str(&format!("{prefix} */\n"));
    out
}

impl Emit for TsPrimitive {
    fn emit(&self) -> String {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Null => "null",
            Self::Undefined => "undefined",
            Self::Void => "void",
            Self::Unknown => "unknown",
            Self::Any => "any",
            Self::Never => "never",
        }
        .to_string()
    }
}

impl Emit for TsLiteral {
    fn emit(&self) -> String {
        match self {
            Self::String(s) => format!("\"{}\"", escape_js_string(s)),
            Self::Number(n) => n.to_string(),
            Self::Int(i) => i.to_string(),
            Self::Bool(b) => b.to_string(),
            Self::Null => "null".to_string(),
        }
    }
}

impl Emit for TsType {
    fn emit(&self) -> String {
        match self {
            Self::Primitive(p) => p.emit(),
            Self::Array(inner) => match **inner {
                Self::Union(_) | Self::Intersection(_) | Self::Function { .. } => {
                    format!("({})[]", inner.emit())
                }
                _ => format!("{}[]", inner.emit()),
            },
            Self::Union(members) => members
                .iter()
                .map(|m| match m {
                    Self::Function { .. } => format!("({})", m.emit()),
                    _ => m.emit(),
                })
                .collect::<Vec<_>>()
                .join(" | "),
            Self::Intersection(members) => members
                .iter()
                .map(|m| match m {
                    Self::Union(_) | Self::Function { .. } => format!("({})", m.emit()),
                    _ => m.emit(),
                })
                .collect::<Vec<_>>()
                .join(" & "),
            Self::Object(props) if props.is_empty() => "{}".to_string(),
            Self::Object(props) => format!("{{ {} }}", join(props, "; ")),
            Self::Record { key, value } => format!("Record<{}, {}>", key.emit(), value.emit()),
            Self::Literal(lit) => lit.emit(),
            Self::Ref(name) => name.clone(),
            Self::Generic { name, args } => format!("{name}<{}>", join(args, ", ")),
            Self::Tuple(elements) => format!("[{}]", join(elements, ", ")),
            Self::Function { params, ret } => format!("({}) => {}", join(params, ", "), ret.emit()),
        }
    }
}

impl Emit for TsProp {
    fn emit(&self) -> String {
        let optional = if self.optional { "?" } else { "" };
        format!("{}{optional}: {}", quote_if_needed(&self.name), self.ty.emit())
    }
}

fn emit_props_block(props: &[TsProp], indent: usize) -> String {
    let prefix = INDENT.repeat(indent + 1);
    let mut out = String::from("{\n");
    for prop in props {
        out.push_str(&doc_comment(prop.doc.as_deref(), indent + 1));
        out.push_str(&format!("{prefix}{};\n", prop.emit()));
    }
    out.push_str(&INDENT.repeat(indent));
    out.push('}');
    out
}

impl Emit for TsTypeDef {
    fn emit(&self) -> String {
        let mut out = doc_comment(self.doc.as_deref(), 0);
        match &self.kind {
            TypeDefKind::Interface(props) => {
                out.push_str(&format!(
                    "export interface {} {}\n",
                    self.name,
                    emit_props_block(props, 0)
                ));
            }
            TypeDefKind::Alias(TsType::Object(props)) if !props.is_empty() => {
                out.push_str(&format!(
                    "export type {} = {};\n",
                    self.name,
                    emit_props_block(props, 0)
                ));
            }
            TypeDefKind::Alias(ty) => {
                out.push_str(&format!("export type {} = {};\n", self.name, ty.emit()));
            }
        }
        out
    }
}

impl TsExpr {
    /// Render at an indentation depth; multi-line objects and blocks indent from here.
    pub fn emit_at(&self, indent: usize) -> String {
        match self {
            Self::Ident(name) => name.clone(),
            Self::Literal(lit) => lit.emit(),
            Self::Call { callee, args } => {
                format!("{}({})", callee_at(callee, indent), args_at(args, indent))
            }
            Self::New { callee, args } => {
                format!("new {}({})", callee_at(callee, indent), args_at(args, indent))
            }
            Self::Member { object, prop } => format!("{}.{prop}", callee_at(object, indent)),
            Self::Arrow {
                params,
                is_async,
                body,
            } => {
                let asyncness = if *is_async { "async " } else { "" };
                let params = join(params, ", ");
                match body {
                    ArrowBody::Expr(expr) => {
                        let rendered = expr.emit_at(indent);
                        // An object literal body must be parenthesized
                        if matches!(**expr, Self::Object(_)) {
                            format!("{asyncness}({params}) => ({rendered})")
                        } else {
                            format!("{asyncness}({params}) => {rendered}")
                        }
                    }
                    ArrowBody::Block(stmts) => {
                        let mut out = format!("{asyncness}({params}) => {{\n");
                        for stmt in stmts {
                            out.push_str(&stmt.emit_indented(indent + 1));
                        }
                        out.push_str(&INDENT.repeat(indent));
                        out.push('}');
                        out
                    }
                }
            }
            Self::Object(entries) if entries.is_empty() => "{}".to_string(),
            Self::Object(entries) if entries.len() <= INLINE_OBJECT_LIMIT => {
                let parts: Vec<_> = entries.iter().map(|e| entry_at(e, indent)).collect();
                format!("{{ {} }}", parts.join(", "))
            }
            Self::Object(entries) => {
                let prefix = INDENT.repeat(indent + 1);
                let mut out = String::from("{\n");
                for entry in entries {
                    out.push_str(&format!("{prefix}{},\n", entry_at(entry, indent + 1)));
                }
                out.push_str(&INDENT.repeat(indent));
                out.push('}');
                out
            }
            Self::Array(items) => format!("[{}]", args_at(items, indent)),
            Self::Template(parts) => {
                let content: String = parts
                    .iter()
                    .map(|part| match part {
                        TemplatePart::Static(s) => s.replace('`', "\\`").replace("${", "\\${"),
                        TemplatePart::Dynamic(expr) => format!("${{{}}}", expr.emit_at(indent)),
                    })
                    .collect();
                format!("`{content}`")
            }
            Self::Await(expr) => format!("await {}", expr.emit_at(indent)),
            Self::Cast { expr, ty } => format!("{} as {}", expr.emit_at(indent), ty.emit()),
            Self::Raw(code) => code.clone(),
        }
    }
}

fn callee_at(expr: &TsExpr, indent: usize) -> String {
    match expr {
        TsExpr::Arrow { .. } | TsExpr::Await(_) | TsExpr::Cast { .. } => {
            format!("({})", expr.emit_at(indent))
        }
        _ => expr.emit_at(indent),
    }
}

fn args_at(args: &[TsExpr], indent: usize) -> String {
    args.iter()
        .map(|a| a.emit_at(indent))
        .collect::<Vec<_>>()
        .join(", ")
}

fn entry_at(entry: &ObjectEntry, indent: usize) -> String {
    match entry {
        ObjectEntry::Prop(key, value) => format!("{}: {}", quote_if_needed(key), value.emit_at(indent)),
        ObjectEntry::Shorthand(key) => key.clone(),
        ObjectEntry::Spread(expr) => format!("...{}", expr.emit_at(indent)),
    }
}

impl Emit for TsExpr {
    fn emit(&self) -> String {
        self.emit_at(0)
    }
}

impl Emit for TsParam {
    fn emit(&self) -> String {
        let optional = if self.optional { "?" } else { "" };
        match &self.ty {
            Some(ty) => format!("{}{optional}: {}", self.name, ty.emit()),
            None => format!("{}{optional}", self.name),
        }
    }
}

impl TsStmt {
    /// Render with the given indentation depth (two spaces per level).
    pub fn emit_indented(&self, indent: usize) -> String {
        let prefix = INDENT.repeat(indent);
        match self {
            Self::VarDecl {
                kind,
                name,
                ty,
                init,
            } => {
                let keyword = match kind {
                    VarKind::Const => "const",
                    VarKind::Let => "let",
                };
                let ty = ty.as_ref().map(|t| format!(": {}", t.emit())).unwrap_or_default();
                format!("{prefix}{keyword} {name}{ty} = {};\n", init.emit_at(indent))
            }
            Self::Expr(expr) => format!("{prefix}{};\n", expr.emit_at(indent)),
            Self::Return(None) => format!("{prefix}return;\n"),
            Self::Return(Some(expr)) => format!("{prefix}return {};\n", expr.emit_at(indent)),
            Self::If {
                cond,
                then_body,
                else_body,
            } => {
                let mut out = format!("{prefix}if ({}) {{\n", cond.emit_at(indent));
                for stmt in then_body {
                    out.push_str(&stmt.emit_indented(indent + 1));
                }
                if let Some(else_body) = else_body {
                    out.push_str(&format!("{prefix}}} else {{\n"));
                    for stmt in else_body {
                        out.push_str(&stmt.emit_indented(indent + 1));
                    }
                }
                out.push_str(&format!("{prefix}}}\n"));
                out
            }
            Self::Raw(code) => code
                .lines()
                .map(|line| {
                    if line.is_empty() {
                        "\n".to_string()
                    } else {
                        format!("{prefix}{line}\n")
                    }
                })
                .collect(),
        }
    }
}

impl Emit for TsStmt {
    fn emit(&self) -> String {
        self.emit_indented(0)
    }
}

impl Emit for TsConst {
    fn emit(&self) -> String {
        let export = if self.is_export { "export " } else { "" };
        let ty = self.ty.as_ref().map(|t| format!(": {}", t.emit())).unwrap_or_default();
        format!(
            "{}{export}const {}{ty} = {};\n",
            doc_comment(self.doc.as_deref(), 0),
            self.name,
            self.init.emit_at(0)
        )
    }
}

impl Emit for TsFunction {
    fn emit(&self) -> String {
        let mut out = doc_comment(self.doc.as_deref(), 0);
        if self.is_export {
            out.push_str("export ");
        }
        if self.is_async {
            out.push_str("async ");
        }
        let return_type = self
            .return_type
            .as_ref()
            .map(|t| format!(": {}", t.emit()))
            .unwrap_or_default();
        out.push_str(&format!(
            "function {}({}){return_type} {{\n",
            self.name,
            join(&self.params, ", ")
        ));
        for stmt in &self.body {
            out.push_str(&stmt.emit_indented(1));
        }
        out.push_str("}\n");
        out
    }
}

impl Emit for ImportItem {
    fn emit(&self) -> String {
        match &self.alias {
            Some(alias) => format!("{} as {alias}", self.name),
            None => self.name.clone(),
        }
    }
}

impl Emit for TsImport {
    fn emit(&self) -> String {
        let keyword = if self.type_only { "type " } else { "" };
        format!(
            "import {keyword}{{ {} }} from \"{}\";\n",
            join(&self.items, ", "),
            self.from
        )
    }
}

impl Emit for TsItem {
    fn emit(&self) -> String {
        match self {
            Self::Const(c) => c.emit(),
            Self::Function(f) => f.emit(),
            Self::Raw(code) => {
                let mut out = code.trim_end().to_string();
                out.push('\n');
                out
            }
        }
    }
}

impl Emit for TsModule {
    fn emit(&self) -> String {
        let mut sections: Vec<String> = Vec::new();

        if let Some(header) = &self.header {
            sections.push(
                header
                    .lines()
                    .map(|line| format!("// {line}\n").replace("// \n", "//\n"))
                    .collect(),
            );
        }
        if !self.imports.is_empty() {
            sections.push(self.imports.iter().map(Emit::emit).collect());
        }
        sections.extend(self.types.iter().map(Emit::emit));
        sections.extend(self.body.iter().map(Emit::emit));

        sections.join("\n")
    }
}
