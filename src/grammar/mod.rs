//! Grammar bindings: the external collaborator named in spec §6/§9 — "three
//! grammars share a common parse-bytes-into-a-walkable-tree capability,
//! modeled as a small trait/variant picked per file extension."
//!
//! Backed by `tree-sitter` directly; the `Grammar` trait is the seam the rest
//! of the crate (Declaration Extractor, worker pool) programs against so a
//! fourth language only needs a new impl here.

use std::time::Instant;

use tree_sitter::{Parser, Tree};

use crate::model::Language;

/// A language binding capable of producing a concrete syntax tree under a
/// cancellation deadline. Grammar objects are thread-affine (spec §5): each
/// worker constructs and owns its own, never shared across threads.
pub trait Grammar: Send {
    fn language_tag(&self) -> Language;

    /// Parse `bytes`, aborting if `deadline` is reached. `Ok(None)` means the
    /// grammar gave up without error context (e.g. ran out of time);
    /// `Err` covers hard grammar-construction failures.
    fn parse(&mut self, bytes: &[u8], deadline: Instant) -> Result<Option<Tree>, GrammarError>;
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("grammar error: {0}")]
pub struct GrammarError(pub String);

struct TreeSitterGrammar {
    tag: Language,
    parser: Parser,
}

impl TreeSitterGrammar {
    fn new(tag: Language, language: tree_sitter::Language) -> Result<Self, GrammarError> {
        let mut parser = Parser::new();
        parser
            .set_language(&language)
            .map_err(|e| GrammarError(e.to_string()))?;
        Ok(Self { tag, parser })
    }
}

impl Grammar for TreeSitterGrammar {
    fn language_tag(&self) -> Language {
        self.tag
    }

    fn parse(&mut self, bytes: &[u8], deadline: Instant) -> Result<Option<Tree>, GrammarError> {
        let remaining = deadline.saturating_duration_since(Instant::now());
        self.parser.set_timeout_micros(remaining.as_micros() as u64);
        Ok(self.parser.parse(bytes, None))
    }
}

/// Construct a grammar for the given language tag.
pub fn for_language(tag: Language) -> Result<Box<dyn Grammar>, GrammarError> {
    let language = match tag {
        Language::Javascript => tree_sitter_javascript::LANGUAGE.into(),
        Language::Typescript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
        Language::Tsx => tree_sitter_typescript::LANGUAGE_TSX.into(),
    };
    Ok(Box::new(TreeSitterGrammar::new(tag, language)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn constructs_a_grammar_per_language() {
        for tag in [Language::Javascript, Language::Typescript, Language::Tsx] {
            let grammar = for_language(tag);
            assert!(grammar.is_ok(), "grammar should construct for {tag:?}");
        }
    }

    #[test]
    fn parses_simple_source() {
        let mut grammar = for_language(Language::Javascript).unwrap();
        let deadline = Instant::now() + Duration::from_secs(5);
        let tree = grammar
            .parse(b"function foo() {}", deadline)
            .unwrap()
            .expect("tree");
        assert_eq!(tree.root_node().kind(), "program");
    }
}
