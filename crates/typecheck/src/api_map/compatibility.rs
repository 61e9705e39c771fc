use super::ApiMap;
use crate::complex_type::{ComplexType, UniqueType};
use crate::pin::{NamespaceKind, Scope};

impl ApiMap {
    /// Whether a value of type `actual` may be used where `expected` is
    /// documented. Names are qualified in `context`; whatever cannot be
    /// known is accepted.
    pub fn compatible(&self, expected: &ComplexType, actual: &ComplexType, context: &str) -> bool {
        if expected.is_undefined() || actual.is_undefined() {
            return true;
        }
        if expected
            .items()
            .iter()
            .any(|e| matches!(e.name.as_str(), "Object" | "BasicObject" | "undefined"))
        {
            return true;
        }
        actual.items().iter().all(|a| {
            expected
                .items()
                .iter()
                .any(|e| self.unique_compatible(e, a, expected, context))
        })
    }

    fn unique_compatible(
        &self,
        expected: &UniqueType,
        actual: &UniqueType,
        expected_union: &ComplexType,
        context: &str,
    ) -> bool {
        if let Some(member) = expected.duck_member() {
            return self.responds_to(actual, member);
        }
        if actual.is_duck() || expected.is_self() || expected.is_generic() || actual.is_generic() {
            return true;
        }
        if actual.is_nil() {
            return expected.is_nil() || expected_union.is_nullable();
        }
        if expected.is_boolean() {
            return matches!(
                actual.name.as_str(),
                "Boolean" | "TrueClass" | "FalseClass" | "true" | "false"
            );
        }
        if actual.is_boolean() {
            return matches!(expected.name.as_str(), "TrueClass" | "FalseClass");
        }

        let (Some(expected_name), Some(actual_name)) = (
            self.qualify_name(&expected.name, context),
            self.qualify_name(&actual.name, context),
        ) else {
            return true;
        };
        if expected_name != actual_name && !self.ancestors(&actual_name).contains(&expected_name) {
            return false;
        }
        self.parameters_compatible(expected, actual, context)
    }

    fn qualify_name(&self, name: &str, context: &str) -> Option<String> {
        match name {
            "nil" => Some("NilClass".to_string()),
            "true" => Some("TrueClass".to_string()),
            "false" => Some("FalseClass".to_string()),
            _ => self.qualify(name, context),
        }
    }

    /// An unparameterized side matches any parameters.
    fn parameters_compatible(&self, expected: &UniqueType, actual: &UniqueType, context: &str) -> bool {
        if !expected.is_parameterized() || !actual.is_parameterized() {
            return true;
        }
        if expected.is_keyed_container() || actual.is_keyed_container() {
            return self.compatible(&expected.key_type(), &actual.key_type(), context)
                && self.compatible(&expected.element_type(), &actual.element_type(), context);
        }
        self.compatible(&expected.element_type(), &actual.element_type(), context)
    }

    /// Whether a value of type `actual` exposes a public method `member`.
    /// Types whose method tables are unknown or incomplete pass.
    pub fn responds_to(&self, actual: &UniqueType, member: &str) -> bool {
        if actual.is_duck() || actual.is_self() || actual.is_generic() {
            return true;
        }
        let namespace = if actual.is_nil() {
            "NilClass"
        } else {
            actual.namespace()
        };
        if self.is_open(namespace) {
            return true;
        }
        if !actual.is_meta() && self.namespace_kind(namespace) == Some(NamespaceKind::Module) {
            return true;
        }
        let scope = if actual.is_meta() {
            Scope::Class
        } else {
            Scope::Instance
        };
        self.get_public_method(namespace, member, scope).is_some()
    }
}
