use std::fmt;

use super::ComplexType;

/// Containers whose parameters describe their elements.
const ORDERED_CONTAINERS: &[&str] = &["Array", "Set", "Enumerable", "Enumerator", "Range"];
const KEYED_CONTAINERS: &[&str] = &["Hash"];

/// One alternative of a [`ComplexType`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UniqueType {
    pub name: String,
    /// Ordered parameters: `Array<String>`, `Class<Foo>`, `generic<T>`.
    pub subtypes: Vec<ComplexType>,
    /// Keyed parameters: `Hash{Symbol => String}`.
    pub key_types: Vec<ComplexType>,
    pub value_types: Vec<ComplexType>,
    pub nullable: bool,
}

impl UniqueType {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            subtypes: Vec::new(),
            key_types: Vec::new(),
            value_types: Vec::new(),
            nullable: false,
        }
    }

    pub fn with_subtypes(name: impl Into<String>, subtypes: Vec<ComplexType>) -> Self {
        Self {
            subtypes,
            ..Self::new(name)
        }
    }

    pub fn keyed(name: impl Into<String>, keys: Vec<ComplexType>, values: Vec<ComplexType>) -> Self {
        Self {
            key_types: keys,
            value_types: values,
            ..Self::new(name)
        }
    }

    /// `Class<name>` or `Module<name>`.
    pub fn meta(namespace: &str, module: bool) -> Self {
        let wrapper = if module { "Module" } else { "Class" };
        Self::with_subtypes(wrapper, vec![ComplexType::from_name(namespace)])
    }

    pub fn is_duck(&self) -> bool {
        self.name.starts_with('#')
    }

    /// The member a duck tag requires, without the `#`.
    pub fn duck_member(&self) -> Option<&str> {
        self.name.strip_prefix('#')
    }

    pub fn is_void(&self) -> bool {
        self.name == "void"
    }

    pub fn is_self(&self) -> bool {
        self.name == "self"
    }

    pub fn is_nil(&self) -> bool {
        self.name == "nil" || self.name == "NilClass"
    }

    pub fn is_boolean(&self) -> bool {
        self.name == "Boolean"
    }

    pub fn is_generic(&self) -> bool {
        self.name == "generic"
    }

    /// `Class<Foo>` or `Module<Foo>`.
    pub fn is_meta(&self) -> bool {
        (self.name == "Class" || self.name == "Module") && self.subtypes.len() == 1
    }

    pub fn is_parameterized(&self) -> bool {
        !self.subtypes.is_empty() || !self.key_types.is_empty() || !self.value_types.is_empty()
    }

    /// A known container written without its parameters, e.g. a bare `Array`.
    pub fn parameters_unknown(&self) -> bool {
        !self.is_parameterized()
            && (ORDERED_CONTAINERS.contains(&self.name.as_str())
                || KEYED_CONTAINERS.contains(&self.name.as_str()))
    }

    /// Tags that never name a namespace and so never need qualifying.
    pub fn is_pseudo(&self) -> bool {
        self.is_duck()
            || self.is_void()
            || self.is_self()
            || self.is_boolean()
            || self.is_generic()
            || matches!(self.name.as_str(), "nil" | "undefined" | "true" | "false" | "bool")
    }

    /// Namespace the tag refers to. For `Class<Foo>` this is `Foo`.
    pub fn namespace(&self) -> &str {
        if self.is_meta()
            && let Some(inner) = self.subtypes[0].first()
        {
            return inner.namespace();
        }
        match self.name.as_str() {
            "nil" => "NilClass",
            "true" => "TrueClass",
            "false" => "FalseClass",
            _ => &self.name,
        }
    }

    /// For `Class<Foo>` the instance type `Foo`.
    pub fn instance_type(&self) -> Option<&ComplexType> {
        if self.is_meta() {
            self.subtypes.first()
        } else {
            None
        }
    }

    /// Element type produced by indexing an ordered container or the value
    /// type of a keyed one.
    pub fn element_type(&self) -> ComplexType {
        if !self.value_types.is_empty() {
            return ComplexType::union_all(self.value_types.iter());
        }
        if KEYED_CONTAINERS.contains(&self.name.as_str()) && self.subtypes.len() == 2 {
            return self.subtypes[1].clone();
        }
        ComplexType::union_all(self.subtypes.iter())
    }

    pub fn key_type(&self) -> ComplexType {
        if !self.key_types.is_empty() {
            return ComplexType::union_all(self.key_types.iter());
        }
        if KEYED_CONTAINERS.contains(&self.name.as_str()) && self.subtypes.len() == 2 {
            return self.subtypes[0].clone();
        }
        ComplexType::undefined()
    }

    pub fn is_keyed_container(&self) -> bool {
        KEYED_CONTAINERS.contains(&self.name.as_str()) || !self.value_types.is_empty()
    }

    /// Applies `f` to every nested parameter.
    pub(crate) fn map_params(&self, f: &mut impl FnMut(&ComplexType) -> ComplexType) -> Self {
        Self {
            name: self.name.clone(),
            subtypes: self.subtypes.iter().map(&mut *f).collect(),
            key_types: self.key_types.iter().map(&mut *f).collect(),
            value_types: self.value_types.iter().map(&mut *f).collect(),
            nullable: self.nullable,
        }
    }
}

impl fmt::Display for UniqueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        if !self.key_types.is_empty() || !self.value_types.is_empty() {
            write!(
                f,
                "{{{} => {}}}",
                join(&self.key_types),
                join(&self.value_types)
            )?;
        } else if !self.subtypes.is_empty() {
            write!(f, "<{}>", join(&self.subtypes))?;
        }
        if self.nullable {
            f.write_str("?")?;
        }
        Ok(())
    }
}

fn join(types: &[ComplexType]) -> String {
    types
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
