//! Component Mapper (spec §4.8): architectural roll-up by path heuristics.

use std::collections::HashMap;

use crate::model::{Component, ComponentType, Layer, ParseResult};

/// Fold per-file results into architectural components, one per unique
/// first path segment (or `root` for top-level files).
pub fn build_components(results: &HashMap<String, ParseResult>) -> Vec<Component> {
    let mut by_id: HashMap<String, Vec<&ParseResult>> = HashMap::new();

    let mut paths: Vec<&String> = results.keys().collect();
    paths.sort();
    for path in paths {
        let result = &results[path];
        let id = component_id(path);
        by_id.entry(id).or_default().push(result);
    }

    let mut ids: Vec<&String> = by_id.keys().collect();
    ids.sort();

    ids.into_iter()
        .map(|id| {
            let members = &by_id[id];
            let files: Vec<String> = members.iter().map(|r| r.path.clone()).collect();
            let complexity: u64 = members
                .iter()
                .map(|r| (r.functions.len() + r.classes.len()) as u64)
                .sum();
            let exports = aggregate_exports(members);
            let component_type = classify_type(&files);
            let layer = classify_layer(&files);

            Component {
                id: id.clone(),
                display_name: id.clone(),
                component_type,
                layer,
                files,
                exports,
                complexity,
            }
        })
        .collect()
}

fn component_id(path: &str) -> String {
    match path.split('/').next() {
        Some(first) if !first.is_empty() && first != path => first.to_string(),
        _ => "root".to_string(),
    }
}

fn aggregate_exports(members: &[&ParseResult]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for result in members {
        for export in &result.exports {
            let formatted = match export.export_kind {
                crate::model::ExportKind::Default => {
                    format!("default:{}", export.name.clone().unwrap_or_default())
                }
                _ => export
                    .name
                    .clone()
                    .unwrap_or_else(|| export.specifiers.join(",")),
            };
            if seen.insert(formatted.clone()) {
                out.push(formatted);
            }
        }
    }
    out
}

fn classify_type(files: &[String]) -> ComponentType {
    let joined = files.join("/").to_lowercase();
    if joined.contains("service") || joined.contains("api") {
        ComponentType::Service
    } else if joined.contains("component") || joined.contains("ui") {
        ComponentType::Component
    } else if joined.contains("util") || joined.contains("helper") {
        ComponentType::Utility
    } else if joined.contains("model") || joined.contains("entity") {
        ComponentType::Model
    } else {
        ComponentType::Module
    }
}

fn classify_layer(files: &[String]) -> Layer {
    let joined = files.join("/").to_lowercase();
    if joined.contains("ui") || joined.contains("component") || joined.contains("view") {
        Layer::Presentation
    } else if joined.contains("service") || joined.contains("business") || joined.contains("logic") {
        Layer::Business
    } else if joined.contains("data") || joined.contains("repository") || joined.contains("model") {
        Layer::Data
    } else {
        Layer::Core
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ExportKind, ExportStmt, FunctionDecl, Language};

    fn result(path: &str) -> ParseResult {
        let mut r = ParseResult::new(path.to_string(), Language::Javascript);
        r.functions.push(FunctionDecl::new("f", 1, 2));
        r.exports.push(ExportStmt {
            export_kind: ExportKind::Default,
            name: Some("f".to_string()),
            specifiers: Vec::new(),
            reexport_source: None,
            start_line: 1,
        });
        r
    }

    #[test]
    fn top_level_files_roll_up_to_root() {
        let mut results = HashMap::new();
        results.insert("index.js".to_string(), result("index.js"));
        let components = build_components(&results);
        assert_eq!(components.len(), 1);
        assert_eq!(components[0].id, "root");
    }

    #[test]
    fn complexity_sums_functions_and_classes_only() {
        let mut results = HashMap::new();
        results.insert("src/services/a.js".to_string(), result("src/services/a.js"));
        let components = build_components(&results);
        let svc = components.iter().find(|c| c.id == "src").unwrap();
        assert_eq!(svc.complexity, 1);
        assert_eq!(svc.component_type, ComponentType::Service);
    }
}
