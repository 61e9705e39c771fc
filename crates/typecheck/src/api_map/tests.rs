use std::sync::Arc;

use super::ApiMap;
use crate::complex_type::ComplexType;
use crate::pin::Scope;
use crate::source::Source;

fn api_map(code: &str) -> ApiMap {
    ApiMap::from_sources(vec![Arc::new(Source::load_string(code, "test.rb"))])
}

fn names(pins: &[Arc<crate::pin::Pin>]) -> Vec<&str> {
    pins.iter().map(|p| p.name.as_str()).collect()
}

#[test]
fn orders_ancestors_by_lookup() {
    let api_map = api_map(
        "module Pre; end\nmodule A; end\nmodule B; end\nclass Base; end\nclass Foo < Base\n  include A\n  include B\n  prepend Pre\nend\n",
    );
    let ancestors = api_map.ancestors("Foo");
    assert_eq!(
        &ancestors[..5],
        &["Pre", "Foo", "B", "A", "Base"].map(String::from)
    );
    assert_eq!(&ancestors[5..], &["Object", "Kernel", "BasicObject"].map(String::from));
}

#[test]
fn survives_cyclic_inclusion() {
    let api_map = api_map("module A\n  include B\nend\nmodule B\n  include A\nend\n");
    let ancestors = api_map.ancestors("A");
    assert_eq!(ancestors, vec!["A".to_string(), "B".to_string()]);
}

#[test]
fn defaults_superclasses() {
    let api_map = api_map("class Foo; end\nmodule Bar; end\n");
    assert_eq!(api_map.superclass_of("Foo").as_deref(), Some("Object"));
    assert_eq!(api_map.superclass_of("Object").as_deref(), Some("BasicObject"));
    assert_eq!(api_map.superclass_of("BasicObject"), None);
    assert_eq!(api_map.superclass_of("Bar"), None);
    assert_eq!(api_map.superclass_of("").as_deref(), Some("Object"));
}

#[test]
fn qualifies_lexically_then_by_ancestry() {
    let api_map = api_map(
        "module Outer\n  class Inner; end\n  class User\n  end\nend\nclass Base\n  class Helper; end\nend\nclass Child < Base\nend\nclass Inner; end\n",
    );
    assert_eq!(api_map.qualify("Inner", "Outer::User").as_deref(), Some("Outer::Inner"));
    assert_eq!(api_map.qualify("Inner", "").as_deref(), Some("Inner"));
    assert_eq!(api_map.qualify("::Inner", "Outer").as_deref(), Some("Inner"));
    assert_eq!(api_map.qualify("Helper", "Child").as_deref(), Some("Base::Helper"));
    assert_eq!(api_map.qualify("Child::Helper", "").as_deref(), Some("Base::Helper"));
    assert_eq!(api_map.qualify("Outer::Inner", "Base").as_deref(), Some("Outer::Inner"));
    assert_eq!(api_map.qualify("Missing", "Outer"), None);
    assert_eq!(api_map.qualify("String", "Outer").as_deref(), Some("String"));
}

#[test]
fn resolves_superclasses_in_lexical_scope() {
    let api_map = api_map(
        "module Auth\n  class User; end\n  class Admin < User; end\nend\nclass User; end\n",
    );
    assert_eq!(api_map.superclass_of("Auth::Admin").as_deref(), Some("Auth::User"));
}

#[test]
fn shadows_overridden_methods() {
    let api_map = api_map(
        "class Sup\n  def a; end\n  def b; end\nend\nclass Sub < Sup\n  def b; end\n  def b; end\nend\n",
    );
    let methods = api_map.methods("Sub", Scope::Instance);
    let b: Vec<_> = methods.iter().filter(|p| p.name == "b").collect();
    assert_eq!(b.len(), 1);
    assert_eq!(b[0].path, "Sub#b");
    assert_eq!(b[0].location.range.start.line, 6);
    assert!(methods.iter().any(|p| p.path == "Sup#a"));

    let stack = api_map.get_method_stack("Sub", "b", Scope::Instance);
    assert_eq!(stack.len(), 3);
    assert_eq!(stack[2].path, "Sup#b");
}

#[test]
fn finds_class_side_methods() {
    let api_map = api_map(
        "module Helpers\n  def help; end\nend\nclass Sup\n  extend Helpers\n  def self.build; end\nend\nclass Sub < Sup\nend\n",
    );
    let methods = api_map.methods("Sub", Scope::Class);
    let found = names(&methods);
    assert!(found.contains(&"build"));
    assert!(found.contains(&"help"));
    assert!(found.contains(&"new"));
    assert!(!found.contains(&"upcase"));
    assert!(api_map.get_method("Sub", "help", Scope::Instance).is_none());
}

#[test]
fn hides_private_methods_from_public_lookup() {
    let api_map = api_map(
        "class Foo\n  attr_writer :name\n  private :name=\n  private\n  def secret; end\nend\n",
    );
    assert!(api_map.get_method("Foo", "secret", Scope::Instance).is_some());
    assert!(api_map.get_public_method("Foo", "secret", Scope::Instance).is_none());
    assert!(api_map.get_public_method("Foo", "name=", Scope::Instance).is_some());
}

#[test]
fn reports_open_namespaces() {
    let api_map = api_map(
        "class Closed; end\nclass Dynamic\n  def method_missing(name, *args); end\nend\nclass Extended < Unknown\nend\nclass Grandchild < Extended; end\n",
    );
    assert!(!api_map.is_open("Closed"));
    assert!(api_map.is_open("Dynamic"));
    assert!(api_map.is_open("Extended"));
    assert!(api_map.is_open("Grandchild"));
    assert!(api_map.is_open("NoSuchThing"));
}

#[test]
fn computes_ancestors_once_per_snapshot() {
    let api_map = api_map("module A; end\nclass Base; end\nclass Foo < Base\n  include A\nend\n");
    let cached = api_map.ancestry.get("Foo").unwrap();
    assert_eq!(cached, &api_map.walk_ancestors("Foo"));
    assert_eq!(api_map.ancestors("Foo"), vec!["Foo", "A", "Base", "Object", "Kernel", "BasicObject"]);
}

#[test]
fn module_instance_methods_reach_object() {
    let api_map = api_map("module Helpers\n  def helper; end\nend\n");
    let frozen = api_map.get_method("Helpers", "frozen?", Scope::Instance).unwrap();
    assert_eq!(frozen.closure.namespace, "Kernel");
    assert!(api_map.get_method("Helpers", "helper", Scope::Instance).is_some());
    assert!(!api_map.ancestors("Helpers").contains(&"Object".to_string()));
    assert!(api_map.get_method("Helpers", "frozen?", Scope::Class).is_some());
}

#[test]
fn finds_variables_and_constants() {
    let api_map = api_map(
        "class Base\n  LIMIT = 10\nend\nclass Foo < Base\n  @@count = 0\n  @level = 1\n  def bar\n    @name = 'x'\n  end\nend\n$verbose = true\n",
    );
    assert_eq!(names(&api_map.get_instance_variable_pins("Foo", Scope::Instance)), vec!["@name"]);
    assert_eq!(names(&api_map.get_instance_variable_pins("Foo", Scope::Class)), vec!["@level"]);
    assert_eq!(names(&api_map.get_class_variable_pins("Foo")), vec!["@@count"]);
    assert_eq!(names(api_map.get_global_variable_pins()), vec!["$verbose"]);
    assert!(names(&api_map.get_constants("Foo")).contains(&"LIMIT"));
    assert_eq!(api_map.visible_pins("LIMIT", "Foo")[0].path, "Base::LIMIT");
    assert!(names(&api_map.namespace_pins("Foo")).contains(&"bar"));
}

#[test]
fn checks_type_compatibility() {
    let api_map = api_map("class Sup; end\nclass Sub < Sup; end\n");
    let ok = |expected: &str, actual: &str| {
        api_map.compatible(&ComplexType::parse(expected), &ComplexType::parse(actual), "")
    };
    assert!(ok("Sup", "Sub"));
    assert!(!ok("Sub", "Sup"));
    assert!(ok("Class<Sup>", "Class<Sub>"));
    assert!(!ok("Class<Sub>", "Class<Sup>"));
    assert!(ok("Array<String>", "Array"));
    assert!(ok("Hash{String => Integer}", "Hash"));
    assert!(!ok("Hash{Symbol => Integer}", "Hash{String => Integer}"));
    assert!(ok("Boolean", "TrueClass"));
    assert!(!ok("Boolean", "Integer"));
    assert!(ok("String, nil", "NilClass"));
    assert!(!ok("String", "NilClass"));
    assert!(ok("#to_s", "Integer"));
    assert!(!ok("#upcase", "Integer"));
    assert!(ok("Hash, Array", "Array"));
    assert!(!ok("Hash, Array", "String"));
    assert!(ok("Object", "Sub"));
    assert!(ok("Numeric", "Integer"));
    assert!(ok("Sub", "UnknownThing"));
    assert!(ok("String", "undefined"));
}

#[test]
fn qualifies_types_and_checks_resolvability() {
    let api_map = api_map("module Outer\n  class Inner; end\nend\n");
    let ty = api_map.qualify_type(&ComplexType::parse("Array<Inner>, nil"), "Outer");
    assert_eq!(ty.tag(), "Array<Outer::Inner>, NilClass");
    assert!(api_map.resolvable(&ComplexType::parse("Inner, #to_s, Boolean"), "Outer"));
    assert!(!api_map.resolvable(&ComplexType::parse("Array<Missing>"), "Outer"));
}
