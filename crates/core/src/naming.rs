//! Deterministic name derivation shared by normalization and emission.
//!
//! Every generated name is a pure function of its inputs so that two runs
//! over the same document produce identical identifiers.

use crate::openapi::HttpMethod;

/// Convert to PascalCase, treating any non-alphanumeric character as a word break.
///
/// Inner casing of each word is kept (`createPet` → `CreatePet`).
pub fn pascal_case(s: &str) -> String {
    s.split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(capitalize_first)
        .collect()
}

/// Convert to camelCase (`create_pet` → `createPet`).
pub fn camel_case(s: &str) -> String {
    let pascal = pascal_case(s);
    let mut chars = pascal.chars();
    match chars.next() {
        None => String::new(),
        Some(first) => first.to_lowercase().chain(chars).collect(),
    }
}

/// Capitalize the first letter of a string.
pub fn capitalize_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        None => String::new(),
        Some(first) => first.to_uppercase().chain(chars).collect(),
    }
}

/// Synthesize an operation id from method and path.
///
/// Path parameters render as `By<Param>` so `/pets` and `/pets/{id}` stay distinct.
pub fn synthesize_operation_id(method: HttpMethod, path: &str) -> String {
    let mut id = method.as_lower().to_string();
    let mut has_segments = false;

    for segment in path.split('/').filter(|s| !s.is_empty()) {
        has_segments = true;
        let whole_param = segment
            .strip_prefix('{')
            .and_then(|s| s.strip_suffix('}'))
            .filter(|inner| !inner.contains(['{', '}']));
        match whole_param {
            Some(param) => {
                id.push_str("By");
                id.push_str(&pascal_case(param));
            }
            None => id.push_str(&pascal_case(segment)),
        }
    }

    if !has_segments {
        id.push_str("Root");
    }
    id
}

/// Registry name for a schema hoisted out of an operation: `Tag$OperationId$Role`.
///
/// Untagged operations drop the tag segment.
pub fn hoisted_schema_name(tag: Option<&str>, operation_id: &str, role: &str) -> String {
    match tag.map(pascal_case).filter(|t| !t.is_empty()) {
        Some(tag) => format!("{tag}${}${role}", pascal_case(operation_id)),
        None => format!("{}${role}", pascal_case(operation_id)),
    }
}

/// Strip parameters and normalize case: `Application/JSON; charset=utf-8` → `application/json`.
pub fn essence(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Short PascalCase name for a content type, used in identifier suffixes.
pub fn content_type_short_name(content_type: &str) -> String {
    let essence = essence(content_type);
    let subtype = essence.split_once('/').map_or(essence.as_str(), |(_, sub)| sub);
    match subtype {
        "json" => "Json".to_string(),
        "xml" => "Xml".to_string(),
        "form-data" => "FormData".to_string(),
        "x-www-form-urlencoded" => "UrlEncoded".to_string(),
        "octet-stream" => "OctetStream".to_string(),
        "plain" => "Text".to_string(),
        other => pascal_case(other),
    }
}

/// Type-qualified name for a content type (`text/xml` → `TextXml`), used when
/// short names clash within one operation.
pub fn content_type_long_name(content_type: &str) -> String {
    let essence = essence(content_type);
    let kind = essence.split_once('/').map_or("", |(kind, _)| kind);
    format!("{}{}", pascal_case(kind), content_type_short_name(content_type))
}

/// Make a string usable as a single directory name.
pub fn path_segment(s: &str) -> String {
    let cleaned: String = s
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.' || c == '$' {
                c
            } else {
                '-'
            }
        })
        .collect();
    let trimmed = cleaned.trim_matches('.');
    if trimmed.is_empty() {
        "_".to_string()
    } else {
        trimmed.to_string()
    }
}
