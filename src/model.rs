//! Data model (spec §3): the shapes every subsystem produces and consumes.
//!
//! Every entity here is created once during an analysis run and never
//! outlives it; see spec §3 "Lifecycles" for the exact mutation discipline
//! each type follows.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

/// `javascript` | `typescript` | `tsx`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Javascript,
    Typescript,
    Tsx,
}

impl Language {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "js" | "jsx" | "mjs" | "cjs" => Some(Language::Javascript),
            "ts" | "mts" | "cts" => Some(Language::Typescript),
            "tsx" => Some(Language::Tsx),
            _ => None,
        }
    }
}

/// Per-file output of a single parse (spec §3 ParseResult).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParseResult {
    pub path: String,
    pub language: Language,
    pub functions: Vec<FunctionDecl>,
    pub classes: Vec<ClassDecl>,
    pub interfaces: Vec<InterfaceDecl>,
    pub variables: Vec<VariableDecl>,
    pub imports: Vec<ImportStmt>,
    pub exports: Vec<ExportStmt>,
    pub errors: Vec<ParseError>,
    pub metadata: ParseMetadata,
}

impl ParseResult {
    pub fn new(path: String, language: Language) -> Self {
        Self {
            path,
            language,
            functions: Vec::new(),
            classes: Vec::new(),
            interfaces: Vec::new(),
            variables: Vec::new(),
            imports: Vec::new(),
            exports: Vec::new(),
            errors: Vec::new(),
            metadata: ParseMetadata::default(),
        }
    }

    pub fn function_count(&self) -> usize {
        self.functions.len()
    }

    pub fn class_count(&self) -> usize {
        self.classes.len()
    }
}

/// `success` | `partial` | `partial_with_errors` | `failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseStatus {
    Success,
    Partial,
    PartialWithErrors,
    Failed,
}

impl Default for ParseStatus {
    fn default() -> Self {
        ParseStatus::Success
    }
}

/// Free-form bookkeeping the Declaration Extractor writes back (spec §4.2
/// "Metadata") plus the extraction-method tag the Partial Extractor sets
/// (spec §4.3).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParseMetadata {
    pub parse_status: ParseStatus,
    pub node_count: u64,
    pub max_depth: u32,
    pub extraction_method: String,
}

/// Spec §3 FunctionDecl.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionDecl {
    pub name: String,
    pub params: Vec<ParameterDecl>,
    pub return_type: String,
    pub is_async: bool,
    pub is_exported: bool,
    pub start_line: u32,
    pub end_line: u32,
    pub metadata: HashMap<String, String>,
}

impl FunctionDecl {
    pub fn new(name: impl Into<String>, start_line: u32, end_line: u32) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
            return_type: String::new(),
            is_async: false,
            is_exported: false,
            start_line,
            end_line,
            metadata: HashMap::new(),
        }
    }
}

/// Spec §3 ParameterDecl.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParameterDecl {
    pub name: String,
    pub param_type: Option<String>,
    pub default_value: Option<String>,
    pub optional: bool,
}

impl ParameterDecl {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            param_type: None,
            default_value: None,
            optional: false,
        }
    }
}

/// Spec §3 ClassDecl. Properties are `PropertyDecl` (named in SPEC_FULL §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassDecl {
    pub name: String,
    pub superclass: Option<String>,
    pub implements: Vec<String>,
    pub methods: Vec<FunctionDecl>,
    pub properties: Vec<PropertyDecl>,
    pub is_exported: bool,
    pub start_line: u32,
    pub end_line: u32,
}

impl ClassDecl {
    pub fn new(name: impl Into<String>, start_line: u32, end_line: u32) -> Self {
        Self {
            name: name.into(),
            superclass: None,
            implements: Vec::new(),
            methods: Vec::new(),
            properties: Vec::new(),
            is_exported: false,
            start_line,
            end_line,
        }
    }
}

/// Class/interface property (spec §3 names its fields under ClassDecl without
/// naming the type; SPEC_FULL §3 calls it `PropertyDecl`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertyDecl {
    pub name: String,
    pub property_type: Option<String>,
    pub is_static: bool,
    pub is_private: bool,
    pub is_readonly: bool,
    pub default_value: Option<String>,
    pub start_line: u32,
}

impl PropertyDecl {
    pub fn new(name: impl Into<String>, start_line: u32) -> Self {
        Self {
            name: name.into(),
            property_type: None,
            is_static: false,
            is_private: false,
            is_readonly: false,
            default_value: None,
            start_line,
        }
    }
}

/// Spec §3 InterfaceDecl (TS only).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterfaceDecl {
    pub name: String,
    pub extends: Vec<String>,
    pub properties: Vec<PropertyDecl>,
    pub methods: Vec<MethodSignature>,
    pub is_exported: bool,
    pub start_line: u32,
    pub end_line: u32,
}

impl InterfaceDecl {
    pub fn new(name: impl Into<String>, start_line: u32, end_line: u32) -> Self {
        Self {
            name: name.into(),
            extends: Vec::new(),
            properties: Vec::new(),
            methods: Vec::new(),
            is_exported: false,
            start_line,
            end_line,
        }
    }
}

/// Interface method signature (no body) — SPEC_FULL §3 `MethodSignature`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MethodSignature {
    pub name: String,
    pub params: Vec<ParameterDecl>,
    pub return_type: String,
    pub start_line: u32,
}

/// `var` | `let` | `const`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VariableKind {
    Var,
    Let,
    Const,
}

/// Spec §3 VariableDecl.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariableDecl {
    pub name: String,
    pub var_type: Option<String>,
    pub kind: VariableKind,
    pub is_exported: bool,
    pub start_line: u32,
}

/// `default` | `named` | `namespace` | `side-effect`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ImportKind {
    Default,
    Named,
    Namespace,
    SideEffect,
}

/// Spec §3 ImportStmt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportStmt {
    pub source: String,
    pub import_kind: ImportKind,
    pub specifiers: Vec<String>,
    pub local_name: Option<String>,
    pub is_external: bool,
    pub start_line: u32,
}

/// `default` | `named` | `all`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportKind {
    Default,
    Named,
    All,
}

/// Spec §3 ExportStmt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportStmt {
    pub export_kind: ExportKind,
    pub name: Option<String>,
    pub specifiers: Vec<String>,
    pub reexport_source: Option<String>,
    pub start_line: u32,
}

/// `syntax` | `timeout` | `memory` | `io` | `encoding` | `unknown` (spec §4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParseErrorKind {
    Syntax,
    Timeout,
    Memory,
    Io,
    Encoding,
    Unknown,
}

/// `error` | `warning` | `info`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

/// Spec §3 ParseError.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub severity: Severity,
    pub message: String,
    pub file_path: Option<String>,
    pub line: Option<u32>,
    pub column: Option<u32>,
    pub snippet: Option<String>,
    pub recoverable: bool,
    pub suggestions: Vec<String>,
    pub metadata: HashMap<String, String>,
}

impl ParseError {
    pub fn new(kind: ParseErrorKind, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity,
            message: message.into(),
            file_path: None,
            line: None,
            column: None,
            snippet: None,
            recoverable: false,
            suggestions: Vec::new(),
            metadata: HashMap::new(),
        }
    }
}

/// Spec §3 Dependency, derived from an ImportStmt at ingest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dependency {
    pub source_file: String,
    pub target: String,
    pub import_kind: ImportKind,
    pub imported_names: Vec<String>,
    pub local_name: Option<String>,
    pub is_external: bool,
    pub is_resolved: bool,
    pub resolved_path: Option<String>,
    pub source_line: u32,
}

/// `scoped` | `built-in` | `npm`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PackageType {
    Scoped,
    BuiltIn,
    Npm,
}

/// Spec §3 ExternalPackage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExternalPackage {
    pub name: String,
    pub used_by: HashSet<String>,
    pub imported_features: HashSet<String>,
    pub package_type: PackageType,
    pub metadata: HashMap<String, String>,
}

impl ExternalPackage {
    pub fn new(name: impl Into<String>, package_type: PackageType) -> Self {
        Self {
            name: name.into(),
            used_by: HashSet::new(),
            imported_features: HashSet::new(),
            package_type,
            metadata: HashMap::new(),
        }
    }
}

/// `internal` | `external`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Internal,
    External,
}

/// ModuleGraph node (spec §3). Arena-addressed by `usize` index, never by
/// pointer (spec §9 design note).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub id: usize,
    pub path: String,
    pub display_name: String,
    pub kind: NodeKind,
    pub exports: Vec<String>,
    pub import_count: u32,
    pub export_count: u32,
    pub metadata: HashMap<String, String>,
}

/// `import` | `export` | `re-export`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EdgeRelationship {
    Import,
    Export,
    ReExport,
}

/// ModuleGraph edge (spec §3). Not deduplicated (spec §9 Open Question).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    pub from: usize,
    pub to: usize,
    pub relationship: EdgeRelationship,
    pub import_kind: ImportKind,
    pub imported_names: Vec<String>,
    pub weight: u32,
}

/// Aggregate statistics over a ModuleGraph.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphStats {
    pub total_nodes: usize,
    pub total_edges: usize,
    pub internal_count: usize,
    pub external_count: usize,
    pub mean_fan_out: f64,
    pub top_imported: Vec<usize>,
}

/// Directed multigraph over modules (spec §3 ModuleGraph).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModuleGraph {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    pub stats: GraphStats,
}

/// `service` | `component` | `utility` | `model` | `module`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentType {
    Service,
    Component,
    Utility,
    Model,
    Module,
}

/// `presentation` | `business` | `data` | `core`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layer {
    Presentation,
    Business,
    Data,
    Core,
}

/// Architectural roll-up (spec §3 Component / §4.8 Component Mapper).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Component {
    pub id: String,
    pub display_name: String,
    pub component_type: ComponentType,
    pub layer: Layer,
    pub files: Vec<String>,
    pub exports: Vec<String>,
    pub complexity: u64,
}

/// Per-run totals surfaced in the final report (spec §4.6 Aggregation).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Summary {
    pub file_count: usize,
    pub total_functions: usize,
    pub total_classes: usize,
    pub total_interfaces: usize,
    pub total_variables: usize,
    pub language_histogram: HashMap<String, usize>,
}

/// `success | warning | error | critical`, derived from the failed/total
/// ratio over a run (spec §4.1 "A derived OverallStatus label").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverallStatus {
    Success,
    Warning,
    Error,
    Critical,
}

/// Run-wide error accounting surfaced in the final report (spec §7): per-kind
/// counts, the Error Classifier's recovery rate, the derived status label,
/// and a short list of human-readable recommendations built from both.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorSummary {
    pub kind_counts: HashMap<ParseErrorKind, u64>,
    pub recovery_rate: f64,
    pub overall_status: OverallStatus,
    pub recommendations: Vec<String>,
}

impl Default for OverallStatus {
    fn default() -> Self {
        OverallStatus::Success
    }
}

/// Non-blocking progress sample (spec §4.6 Progress).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressUpdate {
    pub processed: usize,
    pub failed: usize,
    pub total: usize,
    pub current_batch: Option<usize>,
    pub memory_bytes: u64,
    pub throughput_files_per_sec: f64,
    pub estimated_remaining_secs: f64,
}

/// The full output record handed to the out-of-scope serializer collaborator
/// (spec §6 Outputs).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub project_path: String,
    pub results: HashMap<String, ParseResult>,
    pub graph: Option<ModuleGraph>,
    pub components: Option<Vec<Component>>,
    pub external_packages: HashMap<String, ExternalPackage>,
    pub summary: Summary,
    pub error_summary: ErrorSummary,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn language_from_extension_covers_known_extensions() {
        assert_eq!(Language::from_extension("ts"), Some(Language::Typescript));
        assert_eq!(Language::from_extension("tsx"), Some(Language::Tsx));
        assert_eq!(Language::from_extension("jsx"), Some(Language::Javascript));
        assert_eq!(Language::from_extension("rs"), None);
    }

    #[test]
    fn parse_result_new_starts_empty() {
        let r = ParseResult::new("src/a.ts".into(), Language::Typescript);
        assert_eq!(r.function_count(), 0);
        assert_eq!(r.class_count(), 0);
        assert!(matches!(r.metadata.parse_status, ParseStatus::Success));
    }
}
