//! Partial Extractor (spec §4.3): line-based regex fallback engaged when the
//! grammar fails outright or returns a tree whose root bears the "has error"
//! flag. Deliberately lossy: each line matches at most one pattern.

use regex::Regex;
use std::sync::OnceLock;

use crate::model::{
    ClassDecl, ExportKind, ExportStmt, FunctionDecl, ImportKind, ImportStmt, ParseResult,
    ParseStatus, VariableDecl, VariableKind,
};

struct Patterns {
    import_named: Regex,
    import_default: Regex,
    import_namespace: Regex,
    import_side_effect: Regex,
    export_named: Regex,
    export_default: Regex,
    export_function: Regex,
    export_class: Regex,
    export_const_let_var: Regex,
    function_decl: Regex,
    arrow_const: Regex,
    arrow_let: Regex,
    class_decl: Regex,
    class_decl_extends: Regex,
    variable_decl: Regex,
    variable_decl_typed: Regex,
}

fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();
    PATTERNS.get_or_init(|| Patterns {
        import_named: Regex::new(r#"^\s*import\s*\{\s*([^}]+)\s*\}\s*from\s*['"]([^'"]+)['"]"#).unwrap(),
        import_default: Regex::new(r#"^\s*import\s+(\w+)\s+from\s*['"]([^'"]+)['"]"#).unwrap(),
        import_namespace: Regex::new(r#"^\s*import\s*\*\s*as\s+(\w+)\s+from\s*['"]([^'"]+)['"]"#).unwrap(),
        import_side_effect: Regex::new(r#"^\s*import\s*['"]([^'"]+)['"]"#).unwrap(),
        export_named: Regex::new(r#"^\s*export\s*\{\s*([^}]+)\s*\}"#).unwrap(),
        export_default: Regex::new(r#"^\s*export\s+default\s+(\w+)?"#).unwrap(),
        export_function: Regex::new(r#"^\s*export\s+(?:async\s+)?function\s+(\w+)"#).unwrap(),
        export_class: Regex::new(r#"^\s*export\s+class\s+(\w+)"#).unwrap(),
        export_const_let_var: Regex::new(r#"^\s*export\s+(const|let|var)\s+(\w+)"#).unwrap(),
        function_decl: Regex::new(r#"^\s*(?:async\s+)?function\s+(\w+)\s*\(([^)]*)\)"#).unwrap(),
        arrow_const: Regex::new(r#"^\s*const\s+(\w+)\s*=\s*(?:async\s*)?\(([^)]*)\)\s*=>"#).unwrap(),
        arrow_let: Regex::new(r#"^\s*let\s+(\w+)\s*=\s*(?:async\s*)?\(([^)]*)\)\s*=>"#).unwrap(),
        class_decl_extends: Regex::new(r#"^\s*class\s+(\w+)\s+extends\s+([\w.]+)"#).unwrap(),
        class_decl: Regex::new(r#"^\s*class\s+(\w+)"#).unwrap(),
        variable_decl_typed: Regex::new(r#"^\s*(const|let|var)\s+(\w+)\s*:\s*([\w<>\[\]., ]+?)\s*="#).unwrap(),
        variable_decl: Regex::new(r#"^\s*(const|let|var)\s+(\w+)\s*="#).unwrap(),
    })
}

/// Regex-based best-effort skeleton extraction. Marks `result.metadata` per
/// spec §4.3: `extraction_method=regex_patterns`, `parse_status=partial`.
pub fn extract(contents: &[u8], result: &mut ParseResult) {
    let p = patterns();
    let text = String::from_utf8_lossy(contents);

    for (idx, line) in text.lines().enumerate() {
        let line_no = idx as u32 + 1;
        if try_import(p, line, result) {
            continue;
        }
        if try_export(p, line, line_no, result) {
            continue;
        }
        if try_function(p, line, line_no, result) {
            continue;
        }
        if try_class(p, line, line_no, result) {
            continue;
        }
        try_variable(p, line, line_no, result);
    }

    result.metadata.extraction_method = "regex_patterns".to_string();
    if result.metadata.parse_status == ParseStatus::Success {
        result.metadata.parse_status = ParseStatus::Partial;
    }
}

fn try_import(p: &Patterns, line: &str, result: &mut ParseResult) -> bool {
    if let Some(caps) = p.import_named.captures(line) {
        let specifiers = caps[1]
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        result.imports.push(ImportStmt {
            source: caps[2].to_string(),
            import_kind: ImportKind::Named,
            specifiers,
            local_name: None,
            is_external: false,
            start_line: 0,
        });
        return true;
    }
    if let Some(caps) = p.import_namespace.captures(line) {
        result.imports.push(ImportStmt {
            source: caps[2].to_string(),
            import_kind: ImportKind::Namespace,
            specifiers: Vec::new(),
            local_name: Some(caps[1].to_string()),
            is_external: false,
            start_line: 0,
        });
        return true;
    }
    if let Some(caps) = p.import_default.captures(line) {
        result.imports.push(ImportStmt {
            source: caps[2].to_string(),
            import_kind: ImportKind::Default,
            specifiers: Vec::new(),
            local_name: Some(caps[1].to_string()),
            is_external: false,
            start_line: 0,
        });
        return true;
    }
    if let Some(caps) = p.import_side_effect.captures(line) {
        result.imports.push(ImportStmt {
            source: caps[1].to_string(),
            import_kind: ImportKind::SideEffect,
            specifiers: Vec::new(),
            local_name: None,
            is_external: false,
            start_line: 0,
        });
        return true;
    }
    false
}

fn try_export(p: &Patterns, line: &str, line_no: u32, result: &mut ParseResult) -> bool {
    if let Some(caps) = p.export_named.captures(line) {
        let specifiers = caps[1]
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        result.exports.push(ExportStmt {
            export_kind: ExportKind::Named,
            name: None,
            specifiers,
            reexport_source: None,
            start_line: line_no,
        });
        return true;
    }
    if let Some(caps) = p.export_function.captures(line) {
        result.functions.push(
            FunctionDecl::new(caps[1].to_string(), line_no, line_no).tap_exported(),
        );
        result.exports.push(ExportStmt {
            export_kind: ExportKind::Named,
            name: Some(caps[1].to_string()),
            specifiers: Vec::new(),
            reexport_source: None,
            start_line: line_no,
        });
        return true;
    }
    if let Some(caps) = p.export_class.captures(line) {
        let mut class = ClassDecl::new(caps[1].to_string(), line_no, line_no);
        class.is_exported = true;
        result.classes.push(class);
        result.exports.push(ExportStmt {
            export_kind: ExportKind::Named,
            name: Some(caps[1].to_string()),
            specifiers: Vec::new(),
            reexport_source: None,
            start_line: line_no,
        });
        return true;
    }
    if let Some(caps) = p.export_const_let_var.captures(line) {
        let kind = parse_kind(&caps[1]);
        result.variables.push(VariableDecl {
            name: caps[2].to_string(),
            var_type: None,
            kind,
            is_exported: true,
            start_line: line_no,
        });
        result.exports.push(ExportStmt {
            export_kind: ExportKind::Named,
            name: Some(caps[2].to_string()),
            specifiers: Vec::new(),
            reexport_source: None,
            start_line: line_no,
        });
        return true;
    }
    if let Some(caps) = p.export_default.captures(line) {
        result.exports.push(ExportStmt {
            export_kind: ExportKind::Default,
            name: caps.get(1).map(|m| m.as_str().to_string()),
            specifiers: Vec::new(),
            reexport_source: None,
            start_line: line_no,
        });
        return true;
    }
    false
}

fn try_function(p: &Patterns, line: &str, line_no: u32, result: &mut ParseResult) -> bool {
    if let Some(caps) = p.function_decl.captures(line) {
        result
            .functions
            .push(function_with_params(&caps[1], &caps[2], line_no));
        return true;
    }
    if let Some(caps) = p.arrow_const.captures(line) {
        result
            .functions
            .push(function_with_params(&caps[1], &caps[2], line_no));
        return true;
    }
    if let Some(caps) = p.arrow_let.captures(line) {
        result
            .functions
            .push(function_with_params(&caps[1], &caps[2], line_no));
        return true;
    }
    false
}

fn function_with_params(name: &str, params: &str, line_no: u32) -> FunctionDecl {
    let mut decl = FunctionDecl::new(name.to_string(), line_no, line_no);
    decl.params = params
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| crate::model::ParameterDecl::new(s.to_string()))
        .collect();
    decl
}

fn try_class(p: &Patterns, line: &str, line_no: u32, result: &mut ParseResult) -> bool {
    if let Some(caps) = p.class_decl_extends.captures(line) {
        let mut class = ClassDecl::new(caps[1].to_string(), line_no, line_no);
        class.superclass = Some(caps[2].to_string());
        result.classes.push(class);
        return true;
    }
    if let Some(caps) = p.class_decl.captures(line) {
        result.classes.push(ClassDecl::new(caps[1].to_string(), line_no, line_no));
        return true;
    }
    false
}

fn try_variable(p: &Patterns, line: &str, line_no: u32, result: &mut ParseResult) -> bool {
    if let Some(caps) = p.variable_decl_typed.captures(line) {
        result.variables.push(VariableDecl {
            name: caps[2].to_string(),
            var_type: Some(caps[3].trim().to_string()),
            kind: parse_kind(&caps[1]),
            is_exported: false,
            start_line: line_no,
        });
        return true;
    }
    if let Some(caps) = p.variable_decl.captures(line) {
        result.variables.push(VariableDecl {
            name: caps[2].to_string(),
            var_type: None,
            kind: parse_kind(&caps[1]),
            is_exported: false,
            start_line: line_no,
        });
        return true;
    }
    false
}

fn parse_kind(s: &str) -> VariableKind {
    match s {
        "const" => VariableKind::Const,
        "let" => VariableKind::Let,
        _ => VariableKind::Var,
    }
}

trait TapExported {
    fn tap_exported(self) -> Self;
}

impl TapExported for FunctionDecl {
    fn tap_exported(mut self) -> Self {
        self.is_exported = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Language, ParseResult};

    #[test]
    fn malformed_js_recovers_function_name() {
        let source = b"function test() {\n  console.log(\"oops\"\n";
        let mut result = ParseResult::new("a.js".into(), Language::Javascript);
        extract(source, &mut result);
        assert!(result.functions.iter().any(|f| f.name == "test"));
        assert_eq!(result.metadata.extraction_method, "regex_patterns");
        assert_eq!(result.metadata.parse_status, ParseStatus::Partial);
    }

    #[test]
    fn extracts_named_import_line() {
        let source = b"import { useState, useEffect } from 'react';\n";
        let mut result = ParseResult::new("a.js".into(), Language::Javascript);
        extract(source, &mut result);
        assert_eq!(result.imports.len(), 1);
        assert_eq!(result.imports[0].specifiers, vec!["useState", "useEffect"]);
    }

    #[test]
    fn extracts_class_with_extends() {
        let source = b"class Button extends React.Component {\n";
        let mut result = ParseResult::new("a.js".into(), Language::Javascript);
        extract(source, &mut result);
        assert_eq!(result.classes.len(), 1);
        assert_eq!(result.classes[0].superclass.as_deref(), Some("React.Component"));
    }
}
