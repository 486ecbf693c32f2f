//! Declaration Extractor (spec §4.2): depth-first walk over the concrete
//! syntax tree, dispatching on node-kind string, emitting typed declarations.
//! Extractors are idempotent and never mutate the tree.

use tree_sitter::{Node, Tree};

use crate::model::{
    ClassDecl, ExportKind, ExportStmt, FunctionDecl, ImportKind, ImportStmt, InterfaceDecl,
    MethodSignature, ParameterDecl, ParseError, ParseErrorKind, ParseMetadata, ParseResult,
    ParseStatus, PropertyDecl, Severity, VariableDecl, VariableKind,
};

/// Walk `tree` and populate `result`'s declaration vectors in place.
pub fn extract(tree: &Tree, source: &[u8], result: &mut ParseResult) {
    let mut walker = Walker {
        source,
        node_count: 0,
        max_depth: 0,
    };
    walker.walk_node(tree.root_node(), 0, result);
    result.metadata.node_count = walker.node_count;
    result.metadata.max_depth = walker.max_depth;
    if tree.root_node().has_error() {
        result.metadata.parse_status = ParseStatus::PartialWithErrors;
    }
}

struct Walker<'a> {
    source: &'a [u8],
    node_count: u64,
    max_depth: u32,
}

impl<'a> Walker<'a> {
    fn walk_node(&mut self, node: Node<'a>, depth: u32, result: &mut ParseResult) {
        self.node_count += 1;
        self.max_depth = self.max_depth.max(depth);

        match node.kind() {
            "function_declaration" | "function_expression" | "arrow_function"
            | "method_definition" => {
                if let Some(decl) = self.extract_function(node) {
                    result.functions.push(decl);
                }
            }
            "class_declaration" => {
                if let Some(decl) = self.extract_class(node) {
                    result.classes.push(decl);
                }
            }
            "interface_declaration" => {
                if let Some(decl) = self.extract_interface(node) {
                    result.interfaces.push(decl);
                }
            }
            "variable_declaration" | "lexical_declaration" => {
                self.extract_variables(node, result);
            }
            "import_statement" => {
                if let Some(stmt) = self.extract_import(node) {
                    result.imports.push(stmt);
                }
            }
            "export_statement" => {
                if let Some(stmt) = self.extract_export(node) {
                    result.exports.push(stmt);
                }
            }
            _ => {}
        }

        for i in 0..node.child_count() {
            if let Some(child) = node.child(i) {
                self.walk_node(child, depth + 1, result);
            }
        }
    }

    fn text(&self, node: Node<'a>) -> String {
        node.utf8_text(self.source).unwrap_or("").to_string()
    }

    fn line_of(&self, node: Node<'a>) -> u32 {
        node.start_position().row as u32 + 1
    }

    fn end_line_of(&self, node: Node<'a>) -> u32 {
        node.end_position().row as u32 + 1
    }

    fn is_exported(&self, node: Node<'a>) -> bool {
        node.parent()
            .map(|p| p.kind() == "export_statement" || p.kind() == "export_declaration")
            .unwrap_or(false)
    }

    fn record_error(&self, result: &mut ParseResult, node: Node<'a>, context: &str) {
        let mut err = ParseError::new(
            ParseErrorKind::Syntax,
            Severity::Warning,
            format!("unexpected shape while extracting {context}"),
        );
        err.line = Some(self.line_of(node));
        err.metadata.insert("node_kind".to_string(), node.kind().to_string());
        result.errors.push(err);
    }

    // ---- functions ----

    fn extract_function(&mut self, node: Node<'a>) -> Option<FunctionDecl> {
        let name = node
            .child_by_field_name("name")
            .map(|n| self.text(n))
            .or_else(|| find_child_by_kinds(node, &["identifier", "property_identifier"]).map(|n| self.text(n)))
            .unwrap_or_default();

        let mut decl = FunctionDecl::new(name, self.line_of(node), self.end_line_of(node));
        decl.is_exported = self.is_exported(node);
        decl.is_async = find_child_by_kinds(node, &["async"]).is_some()
            || self.text(node).trim_start().starts_with("async");

        if let Some(params_node) = node
            .child_by_field_name("parameters")
            .or_else(|| find_child_by_kinds(node, &["formal_parameters"]))
        {
            decl.params = self.extract_params(params_node);
        }

        if let Some(ret_node) = find_sibling_after(node, "type_annotation") {
            decl.return_type = self.text(ret_node);
        }

        Some(decl)
    }

    fn extract_params(&mut self, params_node: Node<'a>) -> Vec<ParameterDecl> {
        let mut out = Vec::new();
        for i in 0..params_node.child_count() {
            let Some(child) = params_node.child(i) else {
                continue;
            };
            match child.kind() {
                "identifier" => out.push(ParameterDecl::new(self.text(child))),
                "required_parameter" | "optional_parameter" => {
                    if let Some(param) = self.extract_parameter(child) {
                        out.push(param);
                    }
                }
                "assignment_pattern" => {
                    if let Some(param) = self.extract_default_param(child) {
                        out.push(param);
                    }
                }
                _ => {}
            }
        }
        out
    }

    fn extract_parameter(&mut self, node: Node<'a>) -> Option<ParameterDecl> {
        let ident = find_child_by_kinds(node, &["identifier"])?;
        let mut param = ParameterDecl::new(self.text(ident));
        param.optional = node.kind() == "optional_parameter";
        if let Some(ty) = find_child_by_kinds(node, &["type_annotation"]) {
            param.param_type = Some(self.text(ty));
        }
        Some(param)
    }

    fn extract_default_param(&mut self, node: Node<'a>) -> Option<ParameterDecl> {
        let ident = find_child_by_kinds(node, &["identifier"])?;
        let mut param = ParameterDecl::new(self.text(ident));
        if node.child_count() >= 2 {
            if let Some(value) = node.child(node.child_count() - 1) {
                param.default_value = Some(self.text(value));
            }
        }
        Some(param)
    }

    // ---- classes ----

    fn extract_class(&mut self, node: Node<'a>) -> Option<ClassDecl> {
        let name = find_child_by_kinds(node, &["identifier", "type_identifier"])
            .map(|n| self.text(n))
            .unwrap_or_default();
        let mut decl = ClassDecl::new(name, self.line_of(node), self.end_line_of(node));
        decl.is_exported = self.is_exported(node);

        if let Some(heritage) = find_child_by_kinds(node, &["class_heritage"]) {
            decl.superclass = find_child_by_kinds(heritage, &["identifier", "member_expression"])
                .map(|n| self.text(n));
            if let Some(implements) = find_child_by_kinds(heritage, &["implements_clause"]) {
                decl.implements = collect_children_by_kinds(implements, &["type_identifier", "identifier"])
                    .into_iter()
                    .map(|n| self.text(n))
                    .collect();
            }
        }

        if let Some(body) = find_child_by_kinds(node, &["class_body"]) {
            for i in 0..body.child_count() {
                let Some(member) = body.child(i) else { continue };
                match member.kind() {
                    "method_definition" => {
                        if let Some(mut method) = self.extract_function(member) {
                            apply_modifiers(&self.text(member), &mut method.metadata);
                            decl.methods.push(method);
                        }
                    }
                    "field_definition" | "public_field_definition" | "property_signature" => {
                        decl.properties.push(self.extract_property(member));
                    }
                    _ => {}
                }
            }
        }

        Some(decl)
    }

    fn extract_property(&mut self, node: Node<'a>) -> PropertyDecl {
        let name = find_child_by_kinds(node, &["property_identifier", "identifier"])
            .map(|n| self.text(n))
            .unwrap_or_default();
        let mut prop = PropertyDecl::new(name, self.line_of(node));
        if let Some(ty) = find_child_by_kinds(node, &["type_annotation"]) {
            prop.property_type = Some(self.text(ty));
        }
        let raw = self.text(node);
        prop.is_static = raw.contains("static");
        prop.is_private = raw.contains("private") || raw.trim_start().starts_with('#');
        prop.is_readonly = raw.contains("readonly");
        prop
    }

    // ---- interfaces ----

    fn extract_interface(&mut self, node: Node<'a>) -> Option<InterfaceDecl> {
        let name = find_child_by_kinds(node, &["type_identifier"])
            .map(|n| self.text(n))
            .unwrap_or_default();
        let mut decl = InterfaceDecl::new(name, self.line_of(node), self.end_line_of(node));
        decl.is_exported = self.is_exported(node);

        if let Some(extends) = find_child_by_kinds(node, &["extends_type_clause"]) {
            decl.extends = collect_children_by_kinds(extends, &["type_identifier"])
                .into_iter()
                .map(|n| self.text(n))
                .collect();
        }

        if let Some(body) = find_child_by_kinds(node, &["interface_body", "object_type"]) {
            for i in 0..body.child_count() {
                let Some(member) = body.child(i) else { continue };
                match member.kind() {
                    "property_signature" => decl.properties.push(self.extract_property(member)),
                    "method_signature" => {
                        let name = find_child_by_kinds(member, &["property_identifier"])
                            .map(|n| self.text(n))
                            .unwrap_or_default();
                        let params = find_child_by_kinds(member, &["formal_parameters"])
                            .map(|p| self.extract_params(p))
                            .unwrap_or_default();
                        let return_type = find_sibling_after(member, "type_annotation")
                            .map(|n| self.text(n))
                            .unwrap_or_default();
                        decl.methods.push(MethodSignature {
                            name,
                            params,
                            return_type,
                            start_line: self.line_of(member),
                        });
                    }
                    _ => {}
                }
            }
        }

        Some(decl)
    }

    // ---- variables ----

    fn extract_variables(&mut self, node: Node<'a>, result: &mut ParseResult) {
        let kind = if self.text(node).trim_start().starts_with("const") {
            VariableKind::Const
        } else if self.text(node).trim_start().starts_with("let") {
            VariableKind::Let
        } else {
            VariableKind::Var
        };
        let exported = self.is_exported(node);

        for i in 0..node.child_count() {
            let Some(child) = node.child(i) else { continue };
            if child.kind() != "variable_declarator" {
                continue;
            }
            let Some(name_node) = find_child_by_kinds(child, &["identifier"]) else {
                self.record_error(result, child, "variable_declarator");
                continue;
            };
            let var_type = find_child_by_kinds(child, &["type_annotation"]).map(|n| self.text(n));
            result.variables.push(VariableDecl {
                name: self.text(name_node),
                var_type,
                kind,
                is_exported: exported,
                start_line: self.line_of(child),
            });
        }
    }

    // ---- imports ----

    fn extract_import(&mut self, node: Node<'a>) -> Option<ImportStmt> {
        let source_node = find_child_by_kinds(node, &["string"])?;
        let source = unquote(&self.text(source_node));
        let start_line = self.line_of(node);

        let clause = find_child_by_kinds(node, &["import_clause"]);
        let (kind, specifiers, local_name) = match clause {
            Some(clause) => {
                if let Some(ns) = find_child_by_kinds(clause, &["namespace_import"]) {
                    let local = find_child_by_kinds(ns, &["identifier"]).map(|n| self.text(n));
                    (ImportKind::Namespace, Vec::new(), local)
                } else if let Some(named) = find_child_by_kinds(clause, &["named_imports"]) {
                    let specs = collect_children_by_kinds(named, &["import_specifier"])
                        .into_iter()
                        .filter_map(|n| find_child_by_kinds(n, &["identifier"]))
                        .map(|n| self.text(n))
                        .collect();
                    (ImportKind::Named, specs, None)
                } else if let Some(ident) = find_child_by_kinds(clause, &["identifier"]) {
                    (ImportKind::Default, Vec::new(), Some(self.text(ident)))
                } else {
                    (ImportKind::SideEffect, Vec::new(), None)
                }
            }
            None => (ImportKind::SideEffect, Vec::new(), None),
        };

        Some(ImportStmt {
            source,
            import_kind: kind,
            specifiers,
            local_name,
            is_external: false, // classified downstream by the Dependency Tracker (spec §4.7)
            start_line,
        })
    }

    // ---- exports ----

    fn extract_export(&mut self, node: Node<'a>) -> Option<ExportStmt> {
        let start_line = self.line_of(node);
        let source = find_child_by_kinds(node, &["string"]).map(|n| unquote(&self.text(n)));

        if find_child_by_kinds(node, &["default"]).is_some() {
            let name = find_child_by_kinds(node, &["identifier"]).map(|n| self.text(n));
            return Some(ExportStmt {
                export_kind: ExportKind::Default,
                name,
                specifiers: Vec::new(),
                reexport_source: source,
                start_line,
            });
        }

        if let Some(clause) = find_child_by_kinds(node, &["export_clause"]) {
            let specifiers = collect_children_by_kinds(clause, &["export_specifier"])
                .into_iter()
                .filter_map(|n| find_child_by_kinds(n, &["identifier"]))
                .map(|n| self.text(n))
                .collect();
            return Some(ExportStmt {
                export_kind: ExportKind::Named,
                name: None,
                specifiers,
                reexport_source: source,
                start_line,
            });
        }

        if self.text(node).contains('*') {
            return Some(ExportStmt {
                export_kind: ExportKind::All,
                name: None,
                specifiers: Vec::new(),
                reexport_source: source,
                start_line,
            });
        }

        None
    }
}

fn unquote(s: &str) -> String {
    s.trim_matches(|c| c == '"' || c == '\'' || c == '`').to_string()
}

fn find_child_by_kinds<'a>(node: Node<'a>, kinds: &[&str]) -> Option<Node<'a>> {
    for i in 0..node.child_count() {
        if let Some(child) = node.child(i) {
            if kinds.contains(&child.kind()) {
                return Some(child);
            }
        }
    }
    None
}

fn collect_children_by_kinds<'a>(node: Node<'a>, kinds: &[&str]) -> Vec<Node<'a>> {
    let mut out = Vec::new();
    for i in 0..node.child_count() {
        if let Some(child) = node.child(i) {
            if kinds.contains(&child.kind()) {
                out.push(child);
            }
        }
    }
    out
}

/// A `type_annotation` that appears as a sibling immediately after `node`
/// (used for return types, which attach to the declaration node rather than
/// the parameter list in tree-sitter's TypeScript grammar).
fn find_sibling_after<'a>(node: Node<'a>, kind: &str) -> Option<Node<'a>> {
    let mut sibling = node.next_sibling();
    while let Some(s) = sibling {
        if s.kind() == kind {
            return Some(s);
        }
        sibling = s.next_sibling();
    }
    None
}

fn apply_modifiers(raw_text: &str, metadata: &mut std::collections::HashMap<String, String>) {
    for modifier in ["static", "private", "protected", "readonly"] {
        if raw_text.trim_start().starts_with(modifier)
            || raw_text.contains(&format!(" {modifier} "))
        {
            metadata.insert(modifier.to_string(), "true".to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::for_language;
    use crate::model::{Language, ParseResult};
    use std::time::{Duration, Instant};

    fn parse(source: &str, lang: Language) -> (Tree, Vec<u8>) {
        let mut grammar = for_language(lang).unwrap();
        let bytes = source.as_bytes().to_vec();
        let tree = grammar
            .parse(&bytes, Instant::now() + Duration::from_secs(5))
            .unwrap()
            .expect("tree");
        (tree, bytes)
    }

    #[test]
    fn extracts_named_import() {
        let (tree, src) = parse("import { useState, useEffect } from 'react';", Language::Javascript);
        let mut result = ParseResult::new("a.js".into(), Language::Javascript);
        extract(&tree, &src, &mut result);
        assert_eq!(result.imports.len(), 1);
        let imp = &result.imports[0];
        assert_eq!(imp.source, "react");
        assert_eq!(imp.import_kind, ImportKind::Named);
        assert_eq!(imp.specifiers, vec!["useState", "useEffect"]);
    }

    #[test]
    fn extracts_namespace_import() {
        let (tree, src) = parse("import * as fs from 'fs';", Language::Javascript);
        let mut result = ParseResult::new("a.js".into(), Language::Javascript);
        extract(&tree, &src, &mut result);
        assert_eq!(result.imports.len(), 1);
        assert_eq!(result.imports[0].import_kind, ImportKind::Namespace);
        assert_eq!(result.imports[0].local_name.as_deref(), Some("fs"));
    }

    #[test]
    fn extracts_class_with_dotted_superclass() {
        let (tree, src) = parse(
            "class Button extends React.Component { render() {} }",
            Language::Javascript,
        );
        let mut result = ParseResult::new("a.js".into(), Language::Javascript);
        extract(&tree, &src, &mut result);
        assert_eq!(result.classes.len(), 1);
        let class = &result.classes[0];
        assert_eq!(class.name, "Button");
        assert_eq!(class.superclass.as_deref(), Some("React.Component"));
        assert_eq!(class.methods.len(), 1);
        assert_eq!(class.methods[0].name, "render");
    }

    #[test]
    fn extracts_function_declaration() {
        let (tree, src) = parse("function add(a, b) { return a + b; }", Language::Javascript);
        let mut result = ParseResult::new("a.js".into(), Language::Javascript);
        extract(&tree, &src, &mut result);
        assert_eq!(result.functions.len(), 1);
        assert_eq!(result.functions[0].name, "add");
        assert_eq!(result.functions[0].params.len(), 2);
    }
}
