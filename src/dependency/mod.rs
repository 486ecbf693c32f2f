//! Dependency Tracker (spec §4.7): ingests per-file results, classifies and
//! resolves import specifiers, and builds the module graph.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use crate::model::{
    Dependency, Edge, EdgeRelationship, ExternalPackage, GraphStats, ImportKind, ModuleGraph,
    Node, NodeKind, PackageType, ParseResult,
};

const BUILT_INS: &[&str] = &[
    "fs", "path", "http", "https", "util", "events", "stream", "crypto",
];
const RESOLUTION_EXTENSIONS: &[&str] = &["js", "ts", "jsx", "tsx"];

/// `true` iff `spec` starts with `.` or `/` (spec §4.7 External vs internal).
pub fn is_internal(spec: &str) -> bool {
    spec.starts_with('.') || spec.starts_with('/')
}

/// Canonical package name + type for an external specifier (spec §4.7).
/// Idempotent: `canonical_package_name(canonical_package_name(s).0) == ...`.
pub fn canonical_package_name(spec: &str) -> (String, PackageType) {
    let segments: Vec<&str> = spec.split('/').collect();
    let name = if spec.starts_with('@') {
        segments.iter().take(2).cloned().collect::<Vec<_>>().join("/")
    } else {
        segments.first().copied().unwrap_or(spec).to_string()
    };

    let package_type = if spec.starts_with('@') {
        PackageType::Scoped
    } else if BUILT_INS.contains(&name.as_str()) {
        PackageType::BuiltIn
    } else {
        PackageType::Npm
    };

    (name, package_type)
}

/// Edge weight: base 1, plus default +1, namespace +2, named +len(names),
/// side-effect +0 (spec §4.7 Graph construction).
pub fn edge_weight(kind: ImportKind, imported_names: &[String]) -> u32 {
    let base = 1;
    let bonus = match kind {
        ImportKind::Default => 1,
        ImportKind::Namespace => 2,
        ImportKind::Named => imported_names.len() as u32,
        ImportKind::SideEffect => 0,
    };
    base + bonus
}

pub struct DependencyTracker {
    dependencies: Vec<Dependency>,
    reverse_index: HashMap<String, Vec<usize>>,
    pub external_packages: HashMap<String, ExternalPackage>,
}

impl Default for DependencyTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl DependencyTracker {
    pub fn new() -> Self {
        Self {
            dependencies: Vec::new(),
            reverse_index: HashMap::new(),
            external_packages: HashMap::new(),
        }
    }

    /// Ingest one file's imports as Dependency entries, aggregating external
    /// packages as it goes (spec §4.7 Ingestion).
    pub fn ingest(&mut self, result: &ParseResult) {
        let source_file = clean_path(&result.path);

        for import in &result.imports {
            let target = import.source.clone();
            let internal = is_internal(&target);

            let dependency = Dependency {
                source_file: source_file.clone(),
                target: target.clone(),
                import_kind: import.import_kind,
                imported_names: import.specifiers.clone(),
                local_name: import.local_name.clone(),
                is_external: !internal,
                is_resolved: false,
                resolved_path: None,
                source_line: import.start_line,
            };

            let index = self.dependencies.len();
            let key = if internal {
                target.clone()
            } else {
                let (canon, package_type) = canonical_package_name(&target);
                let entry = self
                    .external_packages
                    .entry(canon.clone())
                    .or_insert_with(|| ExternalPackage::new(canon.clone(), package_type));
                entry.used_by.insert(source_file.clone());
                entry.imported_features.extend(import.specifiers.iter().cloned());
                canon
            };

            self.reverse_index.entry(key).or_default().push(index);
            self.dependencies.push(dependency);
        }
    }

    /// Resolve every unresolved internal dependency against `result_keys`
    /// (spec §4.7 Resolution): try the bare target, each extension, then
    /// `<target>/index.js` and `<target>/index.ts`.
    pub fn resolve(&mut self, result_keys: &HashSet<String>) {
        for dep in &mut self.dependencies {
            if dep.is_external || dep.is_resolved {
                continue;
            }
            let importer_dir = Path::new(&dep.source_file)
                .parent()
                .unwrap_or_else(|| Path::new(""));

            if let Some(resolved) = resolve_candidates(importer_dir, &dep.target, result_keys) {
                dep.is_resolved = true;
                dep.resolved_path = Some(resolved);
            }
        }
    }

    /// All dependencies declared by `path` (spec §4.7 Queries).
    pub fn dependencies_of(&self, path: &str) -> Vec<&Dependency> {
        let cleaned = clean_path(path);
        self.dependencies
            .iter()
            .filter(|d| d.source_file == cleaned)
            .collect()
    }

    /// Files that depend on `target` (spec §4.7 Queries). When `external` is
    /// true, `target` is canonicalized before the reverse-index lookup, since
    /// external packages are indexed by canonical name rather than the raw
    /// specifier as written at each call site.
    pub fn dependents_of(&self, target: &str, external: bool) -> Vec<&str> {
        let key = if external {
            canonical_package_name(target).0
        } else {
            target.to_string()
        };
        self.reverse_index
            .get(&key)
            .into_iter()
            .flatten()
            .map(|&idx| self.dependencies[idx].source_file.as_str())
            .collect()
    }

    pub fn dependencies(&self) -> &[Dependency] {
        &self.dependencies
    }

    /// Build the ModuleGraph: one node per ParseResult plus one per external
    /// package, one edge per Dependency (spec §4.7 Graph construction, not
    /// deduplicated — see DESIGN.md Open Question resolutions).
    pub fn build_graph(&self, results: &HashMap<String, ParseResult>) -> ModuleGraph {
        let mut nodes = Vec::new();
        let mut node_ids: HashMap<String, usize> = HashMap::new();

        let mut sorted_paths: Vec<&String> = results.keys().collect();
        sorted_paths.sort();
        for path in sorted_paths {
            let result = &results[path];
            let id = nodes.len();
            node_ids.insert(path.clone(), id);
            let import_count = result.imports.len() as u32;
            let export_count = result.exports.len() as u32;
            nodes.push(Node {
                id,
                path: path.clone(),
                display_name: display_name(path),
                kind: NodeKind::Internal,
                exports: format_exports(result),
                import_count,
                export_count,
                metadata: HashMap::new(),
            });
        }

        let mut package_names: Vec<&String> = self.external_packages.keys().collect();
        package_names.sort();
        for name in package_names {
            let pkg = &self.external_packages[name];
            let id = nodes.len();
            node_ids.insert(name.clone(), id);
            nodes.push(Node {
                id,
                path: String::new(),
                display_name: name.clone(),
                kind: NodeKind::External,
                exports: Vec::new(),
                import_count: 0,
                export_count: pkg.used_by.len() as u32,
                metadata: HashMap::new(),
            });
        }

        let mut edges = Vec::new();
        for dep in &self.dependencies {
            let Some(&from) = node_ids.get(&dep.source_file) else {
                continue;
            };
            let to_key = if dep.is_external {
                canonical_package_name(&dep.target).0
            } else if let Some(resolved) = &dep.resolved_path {
                resolved.clone()
            } else {
                dep.target.clone()
            };
            let Some(&to) = node_ids.get(&to_key) else {
                continue;
            };
            edges.push(Edge {
                from,
                to,
                relationship: EdgeRelationship::Import,
                import_kind: dep.import_kind,
                imported_names: dep.imported_names.clone(),
                weight: edge_weight(dep.import_kind, &dep.imported_names),
            });
        }

        let internal_count = nodes.iter().filter(|n| n.kind == NodeKind::Internal).count();
        let external_count = nodes.len() - internal_count;
        let mean_fan_out = if nodes.is_empty() {
            0.0
        } else {
            edges.len() as f64 / nodes.len() as f64
        };

        let mut import_totals: HashMap<usize, u32> = HashMap::new();
        for edge in &edges {
            *import_totals.entry(edge.to).or_insert(0) += 1;
        }
        let mut top_imported: Vec<(usize, u32)> = import_totals.into_iter().collect();
        top_imported.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        let top_imported: Vec<usize> = top_imported.into_iter().take(10).map(|(id, _)| id).collect();

        ModuleGraph {
            nodes,
            edges,
            stats: GraphStats {
                total_nodes: node_ids.len(),
                total_edges: edges.len(),
                internal_count,
                external_count,
                mean_fan_out,
                top_imported,
            },
        }
    }
}

fn resolve_candidates(
    importer_dir: &Path,
    target: &str,
    result_keys: &HashSet<String>,
) -> Option<String> {
    let base = importer_dir.join(target);

    let bare = clean_path_buf(&base);
    if result_keys.contains(&bare) {
        return Some(bare);
    }

    for ext in RESOLUTION_EXTENSIONS {
        let candidate = clean_path_buf(&base.with_extension(ext));
        if result_keys.contains(&candidate) {
            return Some(candidate);
        }
    }

    for index_name in ["index.js", "index.ts"] {
        let candidate = clean_path_buf(&base.join(index_name));
        if result_keys.contains(&candidate) {
            return Some(candidate);
        }
    }

    None
}

fn display_name(path: &str) -> String {
    Path::new(path)
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string())
}

fn format_exports(result: &ParseResult) -> Vec<String> {
    result
        .exports
        .iter()
        .map(|e| match e.export_kind {
            crate::model::ExportKind::Default => {
                format!("default:{}", e.name.clone().unwrap_or_default())
            }
            _ => e.name.clone().unwrap_or_else(|| e.specifiers.join(",")),
        })
        .collect()
}

/// Normalize `.`/`..` path segments without touching the filesystem, so
/// resolution can be checked purely against the in-memory results-map keys.
fn clean_path(path: &str) -> String {
    clean_path_buf(Path::new(path))
}

fn clean_path_buf(path: &Path) -> String {
    let mut out: Vec<std::ffi::OsString> = Vec::new();
    for component in path.components() {
        use std::path::Component;
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            Component::Normal(s) => out.push(s.to_os_string()),
            Component::RootDir | Component::Prefix(_) => out.push(component.as_os_str().to_os_string()),
        }
    }
    let mut result = PathBuf::new();
    for part in out {
        result.push(part);
    }
    result.to_string_lossy().replace('\\', "/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ImportStmt, Language};

    fn result_with_import(path: &str, source: &str, kind: ImportKind) -> ParseResult {
        let mut r = ParseResult::new(path.to_string(), Language::Javascript);
        r.imports.push(ImportStmt {
            source: source.to_string(),
            import_kind: kind,
            specifiers: vec!["useState".to_string(), "useEffect".to_string()],
            local_name: None,
            is_external: false,
            start_line: 1,
        });
        r
    }

    #[test]
    fn canonical_package_name_is_idempotent() {
        for spec in ["react", "@types/node", "lodash/map", "@babel/core", "fs"] {
            let (canon, _) = canonical_package_name(spec);
            let (canon2, _) = canonical_package_name(&canon);
            assert_eq!(canon, canon2);
        }
    }

    #[test]
    fn external_package_classification_table() {
        assert_eq!(canonical_package_name("react"), ("react".into(), PackageType::Npm));
        assert_eq!(
            canonical_package_name("@types/node"),
            ("@types/node".into(), PackageType::Scoped)
        );
        assert_eq!(
            canonical_package_name("@babel/core"),
            ("@babel/core".into(), PackageType::Scoped)
        );
        assert_eq!(canonical_package_name("lodash/map"), ("lodash".into(), PackageType::Npm));
        assert_eq!(canonical_package_name("fs"), ("fs".into(), PackageType::BuiltIn));
    }

    #[test]
    fn edge_weight_table() {
        assert_eq!(edge_weight(ImportKind::Default, &[]), 2);
        assert_eq!(edge_weight(ImportKind::Namespace, &[]), 3);
        assert_eq!(edge_weight(ImportKind::Named, &["a".into(), "b".into()]), 3);
        assert_eq!(edge_weight(ImportKind::SideEffect, &[]), 1);
    }

    #[test]
    fn named_import_aggregates_external_package() {
        let mut tracker = DependencyTracker::new();
        tracker.ingest(&result_with_import("src/app.js", "react", ImportKind::Named));
        let pkg = tracker.external_packages.get("react").unwrap();
        assert!(pkg.used_by.contains("src/app.js"));
        assert!(pkg.imported_features.contains("useState"));
        assert!(pkg.imported_features.contains("useEffect"));
    }

    #[test]
    fn relative_import_resolves_against_results_map() {
        let mut tracker = DependencyTracker::new();
        tracker.ingest(&result_with_import(
            "src/main.js",
            "./utils/helper",
            ImportKind::Named,
        ));
        let mut keys = HashSet::new();
        keys.insert("src/utils/helper.ts".to_string());
        tracker.resolve(&keys);

        let deps = tracker.dependencies_of("src/main.js");
        assert_eq!(deps.len(), 1);
        assert!(deps[0].is_resolved);
        assert_eq!(deps[0].resolved_path.as_deref(), Some("src/utils/helper.ts"));

        assert_eq!(tracker.dependents_of("./utils/helper", false), vec!["src/main.js"]);
    }

    #[test]
    fn is_internal_matches_dot_and_slash_prefixes() {
        assert!(is_internal("./a"));
        assert!(is_internal("/abs"));
        assert!(!is_internal("react"));
        assert!(!is_internal("@scope/pkg"));
    }
}
