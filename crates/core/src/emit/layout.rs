//! Artifact paths and the import specifiers between them.
//!
//! Every path is relative to the output root and uses `/` separators, so
//! the same input yields the same path set on every platform.

use crate::extract::path_placeholders;
use crate::naming::path_segment;

/// Shared runtime module, one per output root.
pub const RUNTIME_FILE: &str = "runtime.ts";

/// Index of generated sources, one per output root.
pub const SOURCES_FILE: &str = "sources.json";

/// Registry summary file name inside a source directory.
pub const REGISTRY_FILE: &str = "registry.json";

/// `<source>/schemas/<Name>.ts`
pub fn schema_file(source: &str, name: &str) -> String {
    format!("{}/schemas/{}.ts", path_segment(source), path_segment(name))
}

/// `<source>/<controller...>/<operationId>`
pub fn operation_dir(source: &str, controller: &[String], operation_id: &str) -> String {
    let mut parts = vec![path_segment(source)];
    parts.extend(controller.iter().map(|segment| path_segment(segment)));
    parts.push(path_segment(operation_id));
    parts.join("/")
}

/// `<dir>/params.ts`
pub fn params_file(dir: &str) -> String {
    format!("{dir}/params.ts")
}

/// `<dir>/<callable>.ts`
pub fn callable_file(dir: &str, callable: &str) -> String {
    format!("{dir}/{callable}.ts")
}

/// `<dir>/meta.json`
pub fn meta_file(dir: &str) -> String {
    format!("{dir}/meta.json")
}

/// `<source>/registry.json`
pub fn registry_file(source: &str) -> String {
    format!("{}/{REGISTRY_FILE}", path_segment(source))
}

fn route_segment(segment: &str) -> String {
    match path_placeholders(segment).as_slice() {
        [name] if segment.len() == name.len() + 2 => format!("[{}]", path_segment(name)),
        _ => path_segment(segment),
    }
}

/// `<source>/routes/<segments>/route.ts`, with `{param}` segments as `[param]`.
pub fn route_file(source: &str, url: &str) -> String {
    let mut parts = vec![path_segment(source), "routes".to_string()];
    parts.extend(
        url.split('/')
            .filter(|segment| !segment.is_empty())
            .map(route_segment),
    );
    parts.push("route.ts".to_string());
    parts.join("/")
}

/// Module specifier that `from` uses to import `to`, without the `.ts` suffix.
pub fn import_specifier(from: &str, to: &str) -> String {
    let from_dirs: Vec<&str> = from.split('/').collect();
    let from_dirs = &from_dirs[..from_dirs.len().saturating_sub(1)];
    let to_parts: Vec<&str> = to.split('/').collect();

    let common = from_dirs
        .iter()
        .zip(&to_parts)
        .take_while(|(a, b)| a == b)
        .count()
        .min(to_parts.len().saturating_sub(1));

    let rest = to_parts[common..].join("/");
    let rest = rest.strip_suffix(".ts").unwrap_or(&rest);
    let ups = from_dirs.len() - common;
    if ups == 0 {
        format!("./{rest}")
    } else {
        format!("{}{rest}", "../".repeat(ups))
    }
}
