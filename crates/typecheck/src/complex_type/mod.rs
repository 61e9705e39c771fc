//! Type tags as written in YARD documentation and produced by inference.
//!
//! A [`ComplexType`] is a union of [`UniqueType`] alternatives. The empty
//! union is the `undefined` type: nothing is known, and every compatibility
//! check against it passes. `void` is a distinct, explicit tag.

mod parser;
mod unique_type;

use std::fmt;

use smallvec::SmallVec;
use tracing::debug;

pub use parser::TypeParseError;
pub use unique_type::UniqueType;

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ComplexType {
    items: SmallVec<[UniqueType; 1]>,
}

impl ComplexType {
    pub fn undefined() -> Self {
        Self::default()
    }

    /// Parses a tag list, degrading malformed tags to `undefined`.
    pub fn parse(tag: &str) -> Self {
        match Self::try_parse(tag) {
            Ok(parsed) => parsed,
            Err(e) => {
                debug!("{e}");
                Self::undefined()
            }
        }
    }

    pub fn try_parse(tag: &str) -> Result<Self, TypeParseError> {
        parser::TagParser::new(tag).parse()
    }

    /// Parses each tag string of a YARD tag's type list and unions them.
    pub fn parse_all<'a>(tags: impl IntoIterator<Item = &'a str>) -> Self {
        Self::union_all(tags.into_iter().map(Self::parse).collect::<Vec<_>>().iter())
    }

    pub fn from_name(name: &str) -> Self {
        Self::from_unique([UniqueType::new(name)])
    }

    /// Builds a union, dropping duplicate alternatives.
    pub fn from_unique(items: impl IntoIterator<Item = UniqueType>) -> Self {
        let mut out: SmallVec<[UniqueType; 1]> = SmallVec::new();
        for item in items {
            if !out.contains(&item) {
                out.push(item);
            }
        }
        Self { items: out }
    }

    pub fn union_all<'a>(types: impl Iterator<Item = &'a ComplexType>) -> Self {
        Self::from_unique(types.flat_map(|t| t.items.iter().cloned()))
    }

    pub fn union(&self, other: &ComplexType) -> Self {
        Self::union_all([self, other].into_iter())
    }

    pub fn items(&self) -> &[UniqueType] {
        &self.items
    }

    pub fn first(&self) -> Option<&UniqueType> {
        self.items.first()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_undefined(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_defined(&self) -> bool {
        !self.is_undefined()
    }

    pub fn is_void(&self) -> bool {
        self.items.iter().any(UniqueType::is_void)
    }

    pub fn is_duck(&self) -> bool {
        !self.items.is_empty() && self.items.iter().all(UniqueType::is_duck)
    }

    pub fn is_self(&self) -> bool {
        self.items.len() == 1 && self.items[0].is_self()
    }

    pub fn is_meta(&self) -> bool {
        self.items.len() == 1 && self.items[0].is_meta()
    }

    pub fn is_nullable(&self) -> bool {
        self.items.iter().any(|t| t.nullable || t.is_nil())
    }

    /// The namespace of the first alternative; empty when undefined.
    pub fn namespace(&self) -> &str {
        self.first().map(UniqueType::namespace).unwrap_or_default()
    }

    /// Canonical tag text.
    pub fn tag(&self) -> String {
        self.to_string()
    }

    /// `Class<Foo>` becomes `Foo`; instance types are kept.
    pub fn instance_type(&self) -> Self {
        Self::from_unique(self.items.iter().flat_map(|t| match t.instance_type() {
            Some(inner) => inner.items.to_vec(),
            None => vec![t.clone()],
        }))
    }

    /// Replaces `self` tags, at any depth, with `receiver`.
    pub fn self_to(&self, receiver: &ComplexType) -> Self {
        if receiver.is_undefined() || !self.contains(&|t: &UniqueType| t.is_self()) {
            return self.clone();
        }
        self.substitute(&mut |t| t.is_self().then(|| receiver.clone()))
    }

    /// Resolves `generic<T>`, `generic<K>` and `generic<V>` placeholders
    /// against a parameterized receiver. Unknown parameters become undefined.
    pub fn resolve_generics(&self, receiver: &UniqueType) -> Self {
        if !self.contains(&|t: &UniqueType| t.is_generic()) {
            return self.clone();
        }
        self.substitute(&mut |t| {
            if !t.is_generic() {
                return None;
            }
            let resolved = match t.subtypes.first().map(|p| p.namespace()) {
                Some("K") => receiver.key_type(),
                Some("V") => receiver.element_type(),
                _ => receiver.element_type(),
            };
            Some(resolved)
        })
    }

    pub fn contains(&self, predicate: &impl Fn(&UniqueType) -> bool) -> bool {
        self.items.iter().any(|t| {
            predicate(t)
                || t.subtypes
                    .iter()
                    .chain(&t.key_types)
                    .chain(&t.value_types)
                    .any(|p| p.contains(predicate))
        })
    }

    fn substitute(&self, f: &mut impl FnMut(&UniqueType) -> Option<ComplexType>) -> Self {
        let mut out = Vec::with_capacity(self.items.len());
        for item in &self.items {
            match f(item) {
                Some(replacement) => out.extend(replacement.items),
                None => out.push(item.map_params(&mut |p| p.substitute(f))),
            }
        }
        Self::from_unique(out)
    }
}

impl fmt::Display for ComplexType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.items.is_empty() {
            return f.write_str("undefined");
        }
        for (i, item) in self.items.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{item}")?;
        }
        Ok(())
    }
}

impl From<UniqueType> for ComplexType {
    fn from(value: UniqueType) -> Self {
        Self::from_unique([value])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_and_union_tags() {
        let t = ComplexType::parse("String, Integer");
        assert_eq!(t.len(), 2);
        assert_eq!(t.items()[0].name, "String");
        assert_eq!(t.items()[1].name, "Integer");
        assert_eq!(t.tag(), "String, Integer");
    }

    #[test]
    fn parses_ordered_and_keyed_parameters() {
        let array = ComplexType::parse("Array<Hash{Symbol => String}>");
        let outer = array.first().unwrap();
        assert_eq!(outer.name, "Array");
        let inner = outer.subtypes[0].first().unwrap();
        assert_eq!(inner.name, "Hash");
        assert_eq!(inner.key_types[0].tag(), "Symbol");
        assert_eq!(inner.value_types[0].tag(), "String");
        assert_eq!(array.tag(), "Array<Hash{Symbol => String}>");
    }

    #[test]
    fn normalizes_whitespace_when_formatting() {
        let t = ComplexType::parse("Hash{ Symbol=>Array<String,Integer> }");
        assert_eq!(t.tag(), "Hash{Symbol => Array<String, Integer>}");
        assert_eq!(ComplexType::parse(&t.tag()), t);
    }

    #[test]
    fn parses_flags() {
        let duck = ComplexType::parse("#to_s");
        assert!(duck.is_duck());
        assert_eq!(duck.first().unwrap().duck_member(), Some("to_s"));

        let nullable = ComplexType::parse("String?");
        assert!(nullable.first().unwrap().nullable);
        assert!(nullable.is_nullable());

        assert!(ComplexType::parse("void").is_void());
        assert!(ComplexType::parse("self").is_self());
        assert!(ComplexType::parse("undefined").is_undefined());
        assert!(ComplexType::parse("Array").first().unwrap().parameters_unknown());
        assert!(ComplexType::parse("#[]=").is_duck());
    }

    #[test]
    fn meta_types_expose_their_namespace() {
        let t = ComplexType::parse("Class<Foo::Bar>");
        assert!(t.is_meta());
        assert_eq!(t.namespace(), "Foo::Bar");
        assert_eq!(t.instance_type().tag(), "Foo::Bar");
    }

    #[test]
    fn malformed_tags_degrade_to_undefined() {
        assert!(ComplexType::try_parse("Array<String").is_err());
        assert!(ComplexType::try_parse("Hash{String}").is_err());
        assert!(ComplexType::parse("Array<String").is_undefined());
    }

    #[test]
    fn rejects_trailing_characters() {
        let err = ComplexType::try_parse("String]").unwrap_err();
        assert!(err.to_string().contains("unexpected `]`"));
    }

    #[test]
    fn substitutes_self_in_nested_positions() {
        let t = ComplexType::parse("Class<self>, self");
        let resolved = t.self_to(&ComplexType::from_name("Foo"));
        assert_eq!(resolved.tag(), "Class<Foo>, Foo");
    }

    #[test]
    fn resolves_generic_placeholders() {
        let hash = ComplexType::parse("Hash{Symbol => Integer}");
        let receiver = hash.first().unwrap();
        assert_eq!(
            ComplexType::parse("generic<K>").resolve_generics(receiver).tag(),
            "Symbol"
        );
        assert_eq!(
            ComplexType::parse("generic<V>").resolve_generics(receiver).tag(),
            "Integer"
        );

        let array = ComplexType::parse("Array<String>");
        assert_eq!(
            ComplexType::parse("generic<T>")
                .resolve_generics(array.first().unwrap())
                .tag(),
            "String"
        );
        let bare = ComplexType::parse("Array");
        assert!(
            ComplexType::parse("generic<T>")
                .resolve_generics(bare.first().unwrap())
                .is_undefined()
        );
    }

    #[test]
    fn unions_drop_duplicates() {
        let t = ComplexType::parse("String").union(&ComplexType::parse("String, Symbol"));
        assert_eq!(t.tag(), "String, Symbol");
    }
}
