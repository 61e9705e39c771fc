//! Ruby syntax trees for the analyzer.
//!
//! Wraps the tree-sitter Ruby grammar and converts its concrete syntax tree
//! into owned [`SyntaxNode`]s: grammar kinds are normalized to [`NodeKind`],
//! field labels to [`Field`], body wrappers are flattened and documentation
//! comments are attached to the statement that follows them.

pub mod node;
pub mod parser;

pub use node::{Field, NodeKind, Position, Range, SyntaxNode};
pub use parser::{ParsedTree, RubyParser, parse};

#[derive(Debug, thiserror::Error)]
pub enum SyntaxError {
    #[error("failed to load the Ruby grammar: {0}")]
    Language(String),
    #[error("parser produced no tree")]
    NoTree,
}

pub type Result<T> = std::result::Result<T, SyntaxError>;
