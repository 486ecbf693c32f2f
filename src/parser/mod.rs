//! Resilient incremental parser (spec §1 subsystem 1): drives a grammar,
//! walks the tree to extract declarations, and degrades to regex-based
//! partial extraction on failure or budget overrun.

pub mod errors;
pub mod extractor;
pub mod partial;

use std::path::Path;
use std::time::Instant;

use crate::grammar::Grammar;
use crate::model::{Language, ParseResult, ParseStatus};
use errors::ErrorClassifier;

/// Parse a single file's bytes, falling back to the regex extractor when the
/// grammar fails outright or returns an errored tree (spec §4.3, §7).
pub fn parse_file(
    grammar: &mut dyn Grammar,
    classifier: &ErrorClassifier,
    path: &Path,
    contents: &[u8],
    language: Language,
    deadline: Instant,
    enable_partial_parse: bool,
) -> ParseResult {
    let mut result = ParseResult::new(path.display().to_string(), language);

    match grammar.parse(contents, deadline) {
        Ok(Some(tree)) => {
            extractor::extract(&tree, contents, &mut result);
            if tree.root_node().has_error() {
                if enable_partial_parse {
                    result.metadata.parse_status = ParseStatus::PartialWithErrors;
                    let err = classifier.classify("syntax error in parsed tree", path, contents);
                    result.errors.push(err);
                    classifier.observe_partial();
                } else {
                    classifier.observe_success();
                }
            } else {
                classifier.observe_success();
            }
        }
        Ok(None) => {
            let err = classifier.classify("timeout exceeded during parse", path, contents);
            result.errors.push(err);
            if enable_partial_parse {
                partial::extract(contents, &mut result);
                classifier.observe_partial();
            } else {
                result.metadata.parse_status = ParseStatus::Failed;
                classifier.observe_failure();
            }
        }
        Err(grammar_err) => {
            let err = classifier.classify(&grammar_err.0, path, contents);
            result.errors.push(err);
            if enable_partial_parse {
                partial::extract(contents, &mut result);
                classifier.observe_partial();
            } else {
                result.metadata.parse_status = ParseStatus::Failed;
                classifier.observe_failure();
            }
        }
    }

    result
}
