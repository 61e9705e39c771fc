use std::sync::Arc;

use super::Probe;
use crate::api_map::ApiMap;
use crate::source::Source;
use crate::source_map::SourceMap;

fn load(code: &str) -> (ApiMap, Arc<SourceMap>) {
    let api_map = ApiMap::from_sources(vec![Arc::new(Source::load_string(code, "test.rb"))]);
    let map = api_map.source_map("test.rb").cloned().unwrap();
    (api_map, map)
}

#[test]
fn infers_types_from_new_methods() {
    let (api_map, map) = load("class Foo\nend\nfoo = Foo.new\n");
    let ty = Probe::new(&api_map).infer_signature_type("foo", map.root_pin(), map.locals());
    assert_eq!(ty.tag(), "Foo");
}

#[test]
fn infers_nested_namespace_types_from_new_methods() {
    let (api_map, map) = load("class Foo\n  class Bar\n  end\nend\nbar = Foo::Bar.new\n");
    let ty = Probe::new(&api_map).infer_signature_type("bar", map.root_pin(), map.locals());
    assert_eq!(ty.tag(), "Foo::Bar");
}

#[test]
fn returns_no_pins_for_unrecognized_signatures() {
    let (api_map, map) = load("foobarbaz\n");
    let pins = Probe::new(&api_map).infer_signature_pins("foobarbaz", map.root_pin(), map.locals());
    assert!(pins.is_empty());
}

#[test]
fn infers_namespaces_from_reopened_modules() {
    let (api_map, map) = load("module Foo\n  class Bar\n  end\nend\n\nmodule Foo\nend\n");
    let reopened = map.pins().iter().filter(|p| p.name == "Foo").last().unwrap();
    let ty = Probe::new(&api_map).infer_signature_type("Bar", reopened, &[]);
    assert_eq!(ty.tag(), "Class<Foo::Bar>");
}

#[test]
fn separates_instance_variables_by_scope() {
    let (api_map, map) = load(
        "module MyModule\n  @foo = 'foo'\n  def foo\n    @foo = []\n  end\nend\n",
    );
    let probe = Probe::new(&api_map);

    let module = map.first_pin("MyModule").unwrap();
    let pins = probe.infer_signature_pins("@foo", module, &[]);
    assert_eq!(pins.len(), 1);
    assert_eq!(pins[0].declared_type.tag(), "String");

    let method = map.first_pin("MyModule#foo").unwrap();
    let pins = probe.infer_signature_pins("@foo", method, &[]);
    assert_eq!(pins.len(), 1);
    assert_eq!(pins[0].declared_type.tag(), "Array");
}

#[test]
fn infers_return_types_along_a_chain() {
    let (api_map, map) = load("str = String.new.upcase\n");
    let pins = Probe::new(&api_map).infer_signature_pins("str", map.root_pin(), map.locals());
    assert_eq!(pins.len(), 1);
    assert_eq!(pins[0].declared_type.tag(), "String");
}

#[test]
fn infers_self_in_a_namespace() {
    let (api_map, _) = load("class Foo;end\n");
    let foo = api_map.get_path_pins("Foo")[0].clone();
    let pins = Probe::new(&api_map).infer_signature_pins("self", &foo, &[]);
    assert_eq!(pins.len(), 1);
    assert_eq!(pins[0].declared_type.namespace(), "Foo");
}

#[test]
fn resolves_element_types_from_type_hints() {
    let (api_map, map) = load("# @type [Array<Hash>]\nthings = array_of_hashes\n");
    let pins = Probe::new(&api_map).infer_signature_pins("things.first", map.root_pin(), map.locals());
    assert_eq!(pins[0].declared_type.namespace(), "Hash");
}

#[test]
fn resolves_indexed_access_on_keyed_containers() {
    let (api_map, map) = load("# @type [Hash{Symbol => Integer}]\ncounts = {}\n");
    let probe = Probe::new(&api_map);
    assert_eq!(
        probe.infer_signature_type("counts[:a]", map.root_pin(), map.locals()).tag(),
        "Integer"
    );
    assert_eq!(
        probe.infer_signature_type("counts.keys", map.root_pin(), map.locals()).tag(),
        "Array<Symbol>"
    );
}

#[test]
fn infers_method_bodies_and_inherited_tags() {
    let (api_map, map) = load(
        "class Sup\n  # @return [String]\n  def name; end\n\n  def label\n    'x'\n  end\nend\nclass Sub < Sup\n  def name\n    nil\n  end\nend\n",
    );
    let probe = Probe::new(&api_map);
    let root = map.root_pin();
    assert_eq!(probe.infer_signature_type("Sup.new.label", root, &[]).tag(), "String");
    assert_eq!(probe.infer_signature_type("Sub.new.name", root, &[]).tag(), "String");
}

#[test]
fn substitutes_self_with_the_receiver() {
    let (api_map, map) = load(
        "class Sup\n  # @return [self]\n  def me; end\nend\nclass Sub < Sup\nend\n",
    );
    let ty = Probe::new(&api_map).infer_signature_type("Sub.new.me", map.root_pin(), &[]);
    assert_eq!(ty.tag(), "Sub");
}

#[test]
fn unions_conditional_branches() {
    let (api_map, map) = load(
        "class Foo\n  def pick(x)\n    if x\n      'a'\n    else\n      1\n    end\n  end\nend\n",
    );
    let ty = Probe::new(&api_map).infer_signature_type("Foo.new.pick", map.root_pin(), &[]);
    assert_eq!(ty.tag(), "String, Integer");
}

#[test]
fn hides_private_methods_from_explicit_receivers() {
    let (api_map, map) = load(
        "class Foo\n  def open\n    secret\n  end\n\n  private\n\n  def secret\n    'x'\n  end\nend\n",
    );
    let probe = Probe::new(&api_map);
    assert!(probe
        .infer_signature_pins("Foo.new.secret", map.root_pin(), &[])
        .is_empty());
    let open = map.first_pin("Foo#open").unwrap();
    assert_eq!(probe.infer_signature_type("secret", open, &[]).tag(), "String");
    assert_eq!(probe.infer_signature_type("Foo.new.open", map.root_pin(), &[]).tag(), "String");
}

#[test]
fn breaks_inference_cycles() {
    let (api_map, map) = load("class Foo\n  def a\n    b\n  end\n\n  def b\n    a\n  end\nend\n");
    let probe = Probe::new(&api_map);
    assert!(probe.infer_signature_type("Foo.new.a", map.root_pin(), &[]).is_undefined());

    // The cut-short result is not memoized; a fresh probe still terminates.
    let method = map.first_pin("Foo#a").unwrap();
    assert!(method.inferred().is_none());
    assert!(Probe::new(&api_map).infer_pin_type(method).is_undefined());
}

#[test]
fn memoizes_completed_inferences() {
    let (api_map, map) = load("class Foo\n  def bar\n    :sym\n  end\nend\n");
    let method = map.first_pin("Foo#bar").unwrap();
    assert_eq!(Probe::new(&api_map).infer_pin_type(method).tag(), "Symbol");
    assert_eq!(method.inferred().map(|t| t.tag()).as_deref(), Some("Symbol"));
}

#[test]
fn gives_up_on_overlong_signatures() {
    let (api_map, map) = load("x = 'a'\n");
    let signature = format!("x{}", ".upcase".repeat(40));
    let probe = Probe::new(&api_map);
    assert!(probe.infer_signature_type(&signature, map.root_pin(), map.locals()).is_undefined());
    assert_eq!(
        probe.infer_signature_type("x.upcase.downcase", map.root_pin(), map.locals()).tag(),
        "String"
    );
}

#[test]
fn infers_parameters_from_tags_and_kinds() {
    let (api_map, map) = load(
        "class Foo\n  # @param name [String]\n  def bar(name, *rest, &block)\n    name\n  end\nend\n",
    );
    let probe = Probe::new(&api_map);
    let method = map.first_pin("Foo#bar").unwrap();
    let params = method.parameters();
    assert_eq!(probe.infer_pin_type(&params[0]).tag(), "String");
    assert_eq!(probe.infer_pin_type(&params[1]).tag(), "Array");
    assert_eq!(probe.infer_pin_type(&params[2]).tag(), "Proc");
    assert_eq!(probe.infer_pin_type(method).tag(), "String");
}

#[test]
fn resolves_keyword_literal_heads() {
    let (api_map, map) = load("x = 1\n");
    let probe = Probe::new(&api_map);
    assert_eq!(probe.infer_signature_type("true.to_s", map.root_pin(), &[]).tag(), "String");
    assert_eq!(probe.infer_signature_type("nil.to_s", map.root_pin(), &[]).tag(), "String");
    assert_eq!(probe.infer_signature_type("false", map.root_pin(), &[]).tag(), "Boolean");
}
