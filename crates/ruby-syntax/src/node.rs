use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Zero-based line and column (in bytes) inside a source file.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub const fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line + 1, self.column + 1)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

impl Range {
    pub const fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    pub fn from_lines(start_line: usize, end_line: usize) -> Self {
        Self::new(Position::new(start_line, 0), Position::new(end_line, 0))
    }

    /// Inclusive on both ends.
    pub fn contains(&self, position: Position) -> bool {
        self.start <= position && position <= self.end
    }

    pub fn encloses(&self, other: &Range) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}

/// Node kinds the analyzer distinguishes. Everything else collapses into
/// [`NodeKind::Other`] and is only walked for its children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Program,
    Class,
    Module,
    SingletonClass,
    Superclass,
    Method,
    SingletonMethod,
    Parameters,
    RequiredParameter,
    OptionalParameter,
    SplatParameter,
    HashSplatParameter,
    BlockParameter,
    KeywordParameter,
    Assignment,
    OperatorAssignment,
    LeftAssignmentList,
    Call,
    ArgumentList,
    Pair,
    SplatArgument,
    HashSplatArgument,
    BlockArgument,
    Block,
    Lambda,
    ElementReference,
    Identifier,
    Constant,
    ScopeResolution,
    InstanceVariable,
    ClassVariable,
    GlobalVariable,
    SelfRef,
    Nil,
    True,
    False,
    Integer,
    Float,
    String,
    Symbol,
    Regex,
    Array,
    Hash,
    Range,
    Return,
    If,
    Unless,
    Conditional,
    Case,
    When,
    Then,
    Else,
    Elsif,
    Begin,
    Parenthesized,
    Setter,
    Operator,
    Comment,
    Error,
    Other(&'static str),
}

impl NodeKind {
    pub fn from_grammar(kind: &'static str) -> Self {
        match kind {
            "program" => Self::Program,
            "class" => Self::Class,
            "module" => Self::Module,
            "singleton_class" => Self::SingletonClass,
            "superclass" => Self::Superclass,
            "method" => Self::Method,
            "singleton_method" => Self::SingletonMethod,
            "method_parameters" | "bare_parameters" | "block_parameters"
            | "lambda_parameters" => Self::Parameters,
            "optional_parameter" => Self::OptionalParameter,
            "splat_parameter" => Self::SplatParameter,
            "hash_splat_parameter" => Self::HashSplatParameter,
            "block_parameter" => Self::BlockParameter,
            "keyword_parameter" => Self::KeywordParameter,
            "assignment" => Self::Assignment,
            "operator_assignment" => Self::OperatorAssignment,
            "left_assignment_list" => Self::LeftAssignmentList,
            "call" => Self::Call,
            "argument_list" => Self::ArgumentList,
            "pair" => Self::Pair,
            "splat_argument" => Self::SplatArgument,
            "hash_splat_argument" => Self::HashSplatArgument,
            "block_argument" => Self::BlockArgument,
            "block" | "do_block" => Self::Block,
            "lambda" => Self::Lambda,
            "element_reference" => Self::ElementReference,
            "identifier" => Self::Identifier,
            "constant" => Self::Constant,
            "scope_resolution" => Self::ScopeResolution,
            "instance_variable" => Self::InstanceVariable,
            "class_variable" => Self::ClassVariable,
            "global_variable" => Self::GlobalVariable,
            "self" => Self::SelfRef,
            "nil" => Self::Nil,
            "true" => Self::True,
            "false" => Self::False,
            "integer" => Self::Integer,
            "float" => Self::Float,
            "string" | "chained_string" | "heredoc_beginning" | "subshell" | "character" => {
                Self::String
            }
            "simple_symbol" | "delimited_symbol" | "hash_key_symbol" => Self::Symbol,
            "regex" => Self::Regex,
            "array" | "string_array" | "symbol_array" => Self::Array,
            "hash" => Self::Hash,
            "range" => Self::Range,
            "return" => Self::Return,
            "if" | "if_modifier" => Self::If,
            "unless" | "unless_modifier" => Self::Unless,
            "conditional" => Self::Conditional,
            "case" => Self::Case,
            "when" => Self::When,
            "then" => Self::Then,
            "else" => Self::Else,
            "elsif" => Self::Elsif,
            "begin" => Self::Begin,
            "parenthesized_statements" => Self::Parenthesized,
            "setter" => Self::Setter,
            "operator" => Self::Operator,
            "comment" => Self::Comment,
            "ERROR" => Self::Error,
            other => Self::Other(other),
        }
    }

    /// Kinds whose source text is kept on the node.
    pub fn keeps_text(self) -> bool {
        matches!(
            self,
            Self::Identifier
                | Self::Constant
                | Self::ScopeResolution
                | Self::InstanceVariable
                | Self::ClassVariable
                | Self::GlobalVariable
                | Self::SelfRef
                | Self::Integer
                | Self::Float
                | Self::String
                | Self::Symbol
                | Self::Regex
                | Self::Setter
                | Self::Operator
                | Self::Comment
        )
    }

    pub fn is_literal(self) -> bool {
        matches!(
            self,
            Self::Nil
                | Self::True
                | Self::False
                | Self::Integer
                | Self::Float
                | Self::String
                | Self::Symbol
                | Self::Regex
                | Self::Array
                | Self::Hash
                | Self::Range
                | Self::Lambda
        )
    }

    /// Nodes that open a new hard scope for local variables.
    pub fn is_scope_gate(self) -> bool {
        matches!(
            self,
            Self::Program | Self::Class | Self::Module | Self::SingletonClass | Self::Method
                | Self::SingletonMethod
        )
    }
}

/// Grammar field labels the analyzer reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Name,
    Superclass,
    Body,
    Parameters,
    Receiver,
    Method,
    Arguments,
    Block,
    Left,
    Right,
    Value,
    Key,
    Object,
    Scope,
    Condition,
    Consequence,
    Alternative,
    Pattern,
    Operator,
}

impl Field {
    pub fn from_grammar(name: &str) -> Option<Self> {
        Some(match name {
            "name" => Self::Name,
            "superclass" => Self::Superclass,
            "body" => Self::Body,
            "parameters" => Self::Parameters,
            "receiver" => Self::Receiver,
            "method" => Self::Method,
            "arguments" => Self::Arguments,
            "block" => Self::Block,
            "left" => Self::Left,
            "right" => Self::Right,
            "value" => Self::Value,
            "key" => Self::Key,
            "object" => Self::Object,
            "scope" => Self::Scope,
            "condition" => Self::Condition,
            "consequence" => Self::Consequence,
            "alternative" => Self::Alternative,
            "pattern" => Self::Pattern,
            "operator" => Self::Operator,
            _ => return None,
        })
    }
}

/// A normalized, owned syntax node.
///
/// `body_statement` and `block_body` wrappers are flattened into their
/// parents, so the statements of a class, method or block are the unlabeled
/// children of that node. Comments are never children: a run of `#` lines
/// directly above a statement is attached to it as `comments`.
#[derive(Debug, Clone, PartialEq)]
pub struct SyntaxNode {
    pub kind: NodeKind,
    pub field: Option<Field>,
    pub text: Option<String>,
    pub children: Vec<Arc<SyntaxNode>>,
    pub comments: Option<String>,
    pub range: Range,
}

impl SyntaxNode {
    pub fn new(kind: NodeKind, range: Range) -> Self {
        Self {
            kind,
            field: None,
            text: None,
            children: Vec::new(),
            comments: None,
            range,
        }
    }

    pub fn text(&self) -> &str {
        self.text.as_deref().unwrap_or_default()
    }

    pub fn child(&self, field: Field) -> Option<&Arc<SyntaxNode>> {
        self.children.iter().find(|c| c.field == Some(field))
    }

    /// Children without a field label, i.e. statements of a body or the
    /// positional parts of a list.
    pub fn statements(&self) -> impl Iterator<Item = &Arc<SyntaxNode>> {
        self.children
            .iter()
            .filter(|c| c.field.is_none() || c.field == Some(Field::Body))
    }

    pub fn last_statement(&self) -> Option<&Arc<SyntaxNode>> {
        self.statements().last()
    }

    /// Name of a definition or call: the text of the `name` (or `method`)
    /// field, with a leading `::` removed.
    pub fn name(&self) -> Option<&str> {
        self.child(Field::Name)
            .or_else(|| self.child(Field::Method))
            .map(|n| n.text().trim_start_matches("::"))
    }

    /// Depth-first pre-order walk.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a SyntaxNode)) {
        visit(self);
        for child in &self.children {
            child.walk(visit);
        }
    }

    pub fn contains_error(&self) -> bool {
        self.kind == NodeKind::Error || self.children.iter().any(|c| c.contains_error())
    }
}
