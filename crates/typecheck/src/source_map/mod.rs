//! Per-file view of declarations and local variables.

mod mapper;

use std::sync::Arc;

use ruby_syntax::{Position, Range, SyntaxNode};

use crate::pin::{Pin, PinKind};
use crate::source::Source;

pub(crate) use mapper::literal_type;

/// Pins and locals mapped from one [`Source`].
///
/// Maps are rebuilt for every snapshot so each snapshot owns fresh pins with
/// empty inference memos.
#[derive(Debug, Clone)]
pub struct SourceMap {
    source: Arc<Source>,
    pins: Vec<Arc<Pin>>,
    locals: Vec<Arc<Pin>>,
    /// Ranges of the program, classes, modules and methods.
    hard_scopes: Vec<Range>,
}

impl SourceMap {
    pub fn map(source: Arc<Source>) -> Self {
        let mapped = mapper::Mapper::new(source.filename()).map(source.tree());
        Self {
            source,
            pins: mapped.pins,
            locals: mapped.locals,
            hard_scopes: mapped.hard_scopes,
        }
    }

    pub fn filename(&self) -> &str {
        self.source.filename()
    }

    pub fn source(&self) -> &Arc<Source> {
        &self.source
    }

    pub fn tree(&self) -> Option<&Arc<SyntaxNode>> {
        self.source.tree()
    }

    pub fn pins(&self) -> &[Arc<Pin>] {
        &self.pins
    }

    pub fn locals(&self) -> &[Arc<Pin>] {
        &self.locals
    }

    /// The file's top-level namespace pin.
    pub fn root_pin(&self) -> &Arc<Pin> {
        &self.pins[0]
    }

    pub fn first_pin(&self, path: &str) -> Option<&Arc<Pin>> {
        self.pins.iter().find(|p| p.path == path)
    }

    pub fn method_pins(&self) -> impl Iterator<Item = &Arc<Pin>> {
        self.pins.iter().filter(|p| p.is_method())
    }

    /// Locals visible at `position`, in source order.
    pub fn locals_at(&self, position: Position) -> Vec<Arc<Pin>> {
        let hard_scope = self.innermost_hard_scope(position);
        self.locals
            .iter()
            .filter(|local| {
                local
                    .local_scope()
                    .is_some_and(|scope| scope.is_visible(position, hard_scope))
            })
            .cloned()
            .collect()
    }

    pub fn innermost_hard_scope(&self, position: Position) -> Range {
        self.hard_scopes
            .iter()
            .filter(|r| r.contains(position))
            .min_by(|a, b| {
                b.start
                    .cmp(&a.start)
                    .then_with(|| a.end.cmp(&b.end))
            })
            .copied()
            .unwrap_or_default()
    }

    /// Innermost namespace or method pin enclosing `position`.
    pub fn closure_at(&self, position: Position) -> &Arc<Pin> {
        self.pins
            .iter()
            .filter(|p| match &p.kind {
                PinKind::Namespace { .. } => true,
                PinKind::Method(m) => m.node.is_some(),
                _ => false,
            })
            .filter(|p| p.location.range.contains(position))
            .min_by(|a, b| {
                b.location
                    .range
                    .start
                    .cmp(&a.location.range.start)
                    .then_with(|| a.location.range.end.cmp(&b.location.range.end))
            })
            .unwrap_or_else(|| self.root_pin())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pin::{ParameterKind, Scope, Visibility};

    fn map(code: &str) -> SourceMap {
        SourceMap::map(Arc::new(Source::load_string(code, "test.rb")))
    }

    #[test]
    fn maps_namespaces_and_methods() {
        let map = map(
            "module Foo\n  class Bar < Baz\n    # @return [String]\n    def qux(a, *b, c: 1, **d, &e); end\n    def self.make; end\n  end\nend\n",
        );
        let bar = map.first_pin("Foo::Bar").unwrap();
        assert_eq!(bar.name, "Bar");
        assert_eq!(bar.closure.namespace, "Foo");
        assert_eq!(bar.gates(), ["Foo::Bar", "Foo", ""]);

        let qux = map.first_pin("Foo::Bar#qux").unwrap();
        assert_eq!(qux.declared_type.tag(), "String");
        let kinds: Vec<_> = qux.parameters().iter().filter_map(|p| p.parameter_kind()).collect();
        assert_eq!(
            kinds,
            vec![
                ParameterKind::Required,
                ParameterKind::Splat,
                ParameterKind::OptionalKeyword,
                ParameterKind::DoubleSplat,
                ParameterKind::Block,
            ]
        );

        let make = map.first_pin("Foo::Bar.make").unwrap();
        assert_eq!(make.scope(), Scope::Class);
    }

    #[test]
    fn maps_attributes_with_writer_parameters() {
        let map = map("class Foo\n  # @return [String]\n  attr_accessor :bar\nend\n");
        let reader = map.first_pin("Foo#bar").unwrap();
        assert!(reader.is_attribute());
        let writer = map.first_pin("Foo#bar=").unwrap();
        assert_eq!(writer.parameters()[0].declared_type.tag(), "String");
    }

    #[test]
    fn tracks_visibility() {
        let map = map(
            "class Foo\n  def a; end\n  private\n  def b; end\n  public\n  def c; end\n  def d; end\n  private :d\nend\n",
        );
        assert_eq!(map.first_pin("Foo#a").unwrap().visibility(), Visibility::Public);
        assert_eq!(map.first_pin("Foo#b").unwrap().visibility(), Visibility::Private);
        assert_eq!(map.first_pin("Foo#c").unwrap().visibility(), Visibility::Public);
        assert_eq!(map.first_pin("Foo#d").unwrap().visibility(), Visibility::Private);
    }

    #[test]
    fn locals_respect_position_and_hard_scopes() {
        let map = map("x = 1\ndef foo\n  y = 2\n  y\nend\nx\n");
        let names = |p: Position| -> Vec<String> {
            map.locals_at(p).iter().map(|l| l.name.clone()).collect()
        };
        assert!(names(Position::new(0, 0)).is_empty());
        assert_eq!(names(Position::new(3, 2)), vec!["y"]);
        assert_eq!(names(Position::new(5, 0)), vec!["x"]);
    }

    #[test]
    fn block_locals_stay_in_their_block() {
        let map = map("[1].each do |item|\n  z = item\nend\nz\n");
        let inside: Vec<_> = map
            .locals_at(Position::new(1, 4))
            .iter()
            .map(|l| l.name.clone())
            .collect();
        assert_eq!(inside, vec!["item"]);
        assert!(map.locals_at(Position::new(3, 0)).is_empty());
    }

    #[test]
    fn instance_variables_record_their_self_scope() {
        let map = map("module M\n  @foo = 'a'\n  def bar\n    @foo = []\n  end\nend\n");
        let scopes: Vec<_> = map
            .pins()
            .iter()
            .filter(|p| p.name == "@foo")
            .map(|p| p.closure.scope)
            .collect();
        assert_eq!(scopes, vec![Scope::Class, Scope::Instance]);
    }

    #[test]
    fn closure_at_finds_innermost_definition() {
        let map = map("class Foo\n  def bar\n    1\n  end\nend\n");
        assert_eq!(map.closure_at(Position::new(2, 4)).path, "Foo#bar");
        assert_eq!(map.closure_at(Position::new(0, 2)).path, "Foo");
        assert_eq!(map.closure_at(Position::new(9, 0)).path, "");
    }
}
