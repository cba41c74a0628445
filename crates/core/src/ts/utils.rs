//! Identifier and string helpers for emitted TypeScript.

use std::collections::HashSet;
use std::sync::LazyLock;

use crate::naming::camel_case;

/// Words that can't be used as TypeScript identifiers.
pub static TS_RESERVED_WORDS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        "abstract", "any", "as", "async", "await", "boolean", "break", "case", "catch", "class",
        "const", "continue", "debugger", "declare", "default", "delete", "do", "else", "enum",
        "export", "extends", "false", "finally", "for", "from", "function", "if", "implements",
        "import", "in", "instanceof", "interface", "let", "never", "new", "null", "number",
        "object", "package", "private", "protected", "public", "return", "static", "string",
        "super", "switch", "symbol", "this", "throw", "true", "try", "type", "typeof",
        "undefined", "unknown", "var", "void", "while", "with", "yield",
    ]
    .into_iter()
    .collect()
});

/// Whether `name` must be quoted as an object key (or accessed with brackets).
pub fn needs_bracket_notation(name: &str) -> bool {
    let mut chars = name.chars();
    let valid_start = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_' || c == '$');
    !valid_start || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

/// Escape text for a double-quoted string literal.
pub fn escape_js_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{2028}' => out.push_str("\\u2028"),
            '\u{2029}' => out.push_str("\\u2029"),
            c => out.push(c),
        }
    }
    out
}

/// Quote a property key unless it is a plain identifier.
pub fn quote_if_needed(name: &str) -> String {
    if needs_bracket_notation(name) {
        format!("\"{}\"", escape_js_string(name))
    } else {
        name.to_string()
    }
}

/// Render `obj.prop`, or `obj["prop"]` when the name isn't an identifier.
pub fn property_access(obj: &str, prop: &str) -> String {
    if needs_bracket_notation(prop) {
        format!("{obj}[\"{}\"]", escape_js_string(prop))
    } else {
        format!("{obj}.{prop}")
    }
}

fn escape_leading_and_reserved(mut ident: String) -> String {
    if ident.is_empty() {
        return "_empty".to_string();
    }
    if ident.starts_with(|c: char| c.is_ascii_digit()) {
        ident.insert(0, '_');
    }
    if TS_RESERVED_WORDS.contains(ident.as_str()) {
        ident.insert(0, '_');
    }
    ident
}

/// camelCase value identifier (`create-pet` → `createPet`, `delete` → `_delete`).
pub fn value_ident(name: &str) -> String {
    escape_leading_and_reserved(camel_case(name))
}

/// Type identifier for a registry name.
///
/// Casing and `$` separators are kept so hoisted names stay recognizable;
/// other invalid characters become `_`.
pub fn type_ident(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '$' {
                c
            } else {
                '_'
            }
        })
        .collect();
    escape_leading_and_reserved(cleaned)
}

/// Identifier of the runtime validator for a registry name.
pub fn schema_ident(name: &str) -> String {
    format!("{}Schema", type_ident(name))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_needs_bracket_notation() {
        assert!(!needs_bracket_notation("foo"));
        assert!(!needs_bracket_notation("_foo"));
        assert!(!needs_bracket_notation("$foo1"));
        assert!(needs_bracket_notation(""));
        assert!(needs_bracket_notation("1foo"));
        assert!(needs_bracket_notation("foo-bar"));
        assert!(needs_bracket_notation("foo.bar"));
    }

    #[test]
    fn test_escape_js_string() {
        assert_eq!(escape_js_string("a\"b"), "a\\\"b");
        assert_eq!(escape_js_string("a\\b"), "a\\\\b");
        assert_eq!(escape_js_string("line\nbreak"), "line\\nbreak");
    }

    #[test]
    fn test_property_access() {
        assert_eq!(property_access("params", "id"), "params.id");
        assert_eq!(property_access("params", "X-Trace"), "params[\"X-Trace\"]");
    }

    #[test]
    fn test_value_ident() {
        assert_eq!(value_ident("createPet"), "createPet");
        assert_eq!(value_ident("create-pet"), "createPet");
        assert_eq!(value_ident("delete"), "_delete");
        assert_eq!(value_ident("3dModels"), "_3dModels");
        assert_eq!(value_ident("--"), "_empty");
    }

    #[test]
    fn test_type_ident() {
        assert_eq!(type_ident("Pet"), "Pet");
        assert_eq!(type_ident("Pet$CreatePet$RequestBody"), "Pet$CreatePet$RequestBody");
        assert_eq!(type_ident("pet.v2"), "pet_v2");
        assert_eq!(type_ident("string"), "_string");
        assert_eq!(schema_ident("Pet"), "PetSchema");
    }
}
