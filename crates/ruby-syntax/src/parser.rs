use std::sync::Arc;

use log::debug;
use tree_sitter::{Node, Parser};

use crate::node::{Field, NodeKind, Position, Range, SyntaxNode};
use crate::{Result, SyntaxError};

/// Deepest nesting that is converted. Deeper subtrees are dropped and the
/// tree is reported as erroneous.
const MAX_DEPTH: usize = 256;

/// Result of parsing one file.
#[derive(Debug, Clone)]
pub struct ParsedTree {
    pub root: Arc<SyntaxNode>,
    pub has_errors: bool,
}

pub struct RubyParser {
    parser: Parser,
}

impl RubyParser {
    pub fn new() -> Result<Self> {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_ruby::LANGUAGE.into())
            .map_err(|e| SyntaxError::Language(e.to_string()))?;
        Ok(Self { parser })
    }

    pub fn parse(&mut self, code: &str) -> Result<ParsedTree> {
        let tree = self.parser.parse(code, None).ok_or(SyntaxError::NoTree)?;
        let root = tree.root_node();
        let mut converter = Converter {
            source: code.as_bytes(),
            truncated: false,
        };
        let converted = converter.convert(root, None, false, 0);
        if converter.truncated {
            debug!("source nests deeper than {MAX_DEPTH} levels");
        }
        let has_errors = root.has_error() || converter.truncated;
        if has_errors {
            debug!("parse errors in {} byte source", code.len());
        }
        Ok(ParsedTree {
            root: Arc::new(converted),
            has_errors,
        })
    }
}

/// Parses `code` with a throwaway parser.
pub fn parse(code: &str) -> Result<ParsedTree> {
    RubyParser::new()?.parse(code)
}

fn range_of(node: Node<'_>) -> Range {
    let start = node.start_position();
    let end = node.end_position();
    Range::new(
        Position::new(start.row, start.column),
        Position::new(end.row, end.column),
    )
}

struct Converter<'s> {
    source: &'s [u8],
    /// Set once a subtree was dropped for nesting past [`MAX_DEPTH`].
    truncated: bool,
}

impl Converter<'_> {
    fn convert(
        &mut self,
        node: Node<'_>,
        field: Option<Field>,
        in_params: bool,
        depth: usize,
    ) -> SyntaxNode {
        let kind = match node.kind() {
            "identifier" if in_params => NodeKind::RequiredParameter,
            other => NodeKind::from_grammar(other),
        };
        let mut out = SyntaxNode::new(kind, range_of(node));
        out.field = field;
        if kind.keeps_text() || kind == NodeKind::RequiredParameter {
            out.text = node.utf8_text(self.source).ok().map(str::to_string);
        }
        if depth >= MAX_DEPTH {
            self.truncated = true;
            return out;
        }

        let params = kind == NodeKind::Parameters;
        let mut raw = Vec::new();
        let mut cursor = node.walk();
        if cursor.goto_first_child() {
            loop {
                let child = cursor.node();
                if child.is_named() {
                    let child_field = cursor.field_name().and_then(Field::from_grammar);
                    match child.kind() {
                        "body_statement" | "block_body" => {
                            let body = self.convert(child, None, false, depth + 1);
                            raw.extend(body.children.into_iter().map(Arc::unwrap_or_clone));
                        }
                        _ => raw.push(self.convert(child, child_field, params, depth + 1)),
                    }
                } else if cursor.field_name() == Some("operator") {
                    let mut operator = SyntaxNode::new(NodeKind::Operator, range_of(child));
                    operator.field = Some(Field::Operator);
                    operator.text = child.utf8_text(self.source).ok().map(str::to_string);
                    raw.push(operator);
                }
                if !cursor.goto_next_sibling() {
                    break;
                }
            }
        }
        out.children = attach_comments(raw);
        out
    }
}

/// Removes comment nodes, attaching each contiguous run of own-line comments
/// to the node on the line right below it.
fn attach_comments(raw: Vec<SyntaxNode>) -> Vec<Arc<SyntaxNode>> {
    let mut out = Vec::with_capacity(raw.len());
    let mut pending: Vec<SyntaxNode> = Vec::new();
    let mut last_end_line: Option<usize> = None;

    for mut node in raw {
        if node.kind == NodeKind::Comment {
            let trailing = last_end_line == Some(node.range.start.line);
            let detached = pending
                .last()
                .is_some_and(|c| c.range.end.line + 1 != node.range.start.line);
            if detached {
                pending.clear();
            }
            if !trailing && !node.text().starts_with("=begin") {
                pending.push(node);
            }
            continue;
        }
        if let Some(last) = pending.last()
            && last.range.end.line + 1 == node.range.start.line
        {
            node.comments = Some(comment_text(&pending));
        }
        pending.clear();
        last_end_line = Some(node.range.end.line);
        out.push(Arc::new(node));
    }
    out
}

fn comment_text(comments: &[SyntaxNode]) -> String {
    comments
        .iter()
        .map(|c| {
            let line = c.text().trim_start_matches('#');
            line.strip_prefix(' ').unwrap_or(line)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn first(node: &SyntaxNode) -> Arc<SyntaxNode> {
        node.statements().next().cloned().unwrap()
    }

    #[test]
    fn attaches_doc_comments_to_methods() {
        let tree = parse(
            "class Foo < Bar\n  # Greets.\n  # @return [String]\n  def baz\n    'hi'\n  end\nend\n",
        )
        .unwrap();
        assert!(!tree.has_errors);
        let class = first(&tree.root);
        assert_eq!(class.kind, NodeKind::Class);
        assert_eq!(class.name(), Some("Foo"));
        assert!(class.child(Field::Superclass).is_some());

        let method = first(&class);
        assert_eq!(method.kind, NodeKind::Method);
        assert_eq!(method.name(), Some("baz"));
        assert_eq!(method.comments.as_deref(), Some("Greets.\n@return [String]"));
        assert_eq!(method.last_statement().unwrap().kind, NodeKind::String);
    }

    #[test]
    fn detached_comments_are_not_attached() {
        let tree = parse("# unrelated\n\nfoo = 1\n").unwrap();
        assert!(first(&tree.root).comments.is_none());
    }

    #[test]
    fn classifies_parameter_kinds() {
        let tree = parse("def baz(a, b = 1, *c, d:, e: 2, **f, &g)\nend\n").unwrap();
        let method = first(&tree.root);
        let params = method.child(Field::Parameters).unwrap();
        let kinds: Vec<NodeKind> = params.children.iter().map(|p| p.kind).collect();
        assert_eq!(
            kinds,
            vec![
                NodeKind::RequiredParameter,
                NodeKind::OptionalParameter,
                NodeKind::SplatParameter,
                NodeKind::KeywordParameter,
                NodeKind::KeywordParameter,
                NodeKind::HashSplatParameter,
                NodeKind::BlockParameter,
            ]
        );
        assert_eq!(params.children[0].text(), "a");
        assert_eq!(params.children[1].name(), Some("b"));
    }

    #[test]
    fn calls_keep_receiver_and_method_fields() {
        let tree = parse("Foo::Bar.new.baz(1)\n").unwrap();
        let call = first(&tree.root);
        assert_eq!(call.kind, NodeKind::Call);
        assert_eq!(call.name(), Some("baz"));
        let receiver = call.child(Field::Receiver).unwrap();
        assert_eq!(receiver.kind, NodeKind::Call);
        assert_eq!(
            receiver.child(Field::Receiver).unwrap().kind,
            NodeKind::ScopeResolution
        );
        assert_eq!(call.child(Field::Arguments).unwrap().children.len(), 1);
    }

    #[test]
    fn reports_parse_errors() {
        let tree = parse("foo{\n").unwrap();
        assert!(tree.has_errors);
    }

    #[test]
    fn cuts_off_deep_nesting() {
        let code = format!("x = {}{}\n", "[".repeat(2000), "]".repeat(2000));
        let tree = parse(&code).unwrap();
        assert!(tree.has_errors);

        let shallow = format!("x = {}{}\n", "[".repeat(20), "]".repeat(20));
        assert!(!parse(&shallow).unwrap().has_errors);
    }

    #[test]
    fn keeps_binary_operators() {
        let tree = parse("a + 1\n").unwrap();
        let binary = first(&tree.root);
        assert_eq!(binary.kind, NodeKind::Other("binary"));
        let operator = binary.child(Field::Operator).unwrap();
        assert_eq!(operator.kind, NodeKind::Operator);
        assert_eq!(operator.text(), "+");
        assert_eq!(binary.child(Field::Left).unwrap().text(), "a");
    }
}
