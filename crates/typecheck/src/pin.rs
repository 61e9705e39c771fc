//! Declaration records.
//!
//! A [`Pin`] is produced once per declaration occurrence while mapping a
//! source. The owning scope is referenced by path through [`Closure`], never
//! by pointer, so pins form no ownership cycles. The only interior state is
//! the inference memo, which is written at most once.

use std::fmt;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use ruby_syntax::{Position, Range, SyntaxNode};
use serde::Serialize;

use crate::complex_type::ComplexType;
use crate::docstring::Docstring;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    Instance,
    Class,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Public,
    Protected,
    Private,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NamespaceKind {
    Class,
    Module,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParameterKind {
    Required,
    Optional,
    Splat,
    Keyword,
    OptionalKeyword,
    DoubleSplat,
    Block,
}

impl ParameterKind {
    /// Rest parameters consume an unbounded set of arguments.
    pub fn is_rest(self) -> bool {
        matches!(self, Self::Splat | Self::DoubleSplat)
    }

    pub fn is_keyword(self) -> bool {
        matches!(self, Self::Keyword | Self::OptionalKeyword)
    }

    pub fn is_positional(self) -> bool {
        matches!(self, Self::Required | Self::Optional)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferenceKind {
    Include,
    Extend,
    Prepend,
}

/// Path-keyed reference to the scope that owns a pin.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Closure {
    /// Path of the owning namespace or method pin.
    pub path: String,
    /// Enclosing namespace.
    pub namespace: String,
    /// What `self` is inside the owner.
    pub scope: Scope,
}

impl Closure {
    pub fn root() -> Self {
        Self {
            path: String::new(),
            namespace: String::new(),
            scope: Scope::Instance,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Location {
    pub filename: String,
    pub range: Range,
}

impl Location {
    pub fn new(filename: impl Into<String>, range: Range) -> Self {
        Self {
            filename: filename.into(),
            range,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.filename, self.range.start)
    }
}

/// Where a local variable or parameter can be seen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalScope {
    /// Enclosing block, or the hard scope when not in a block.
    pub presence: Range,
    /// Enclosing method, class, module or program.
    pub hard_scope: Range,
    pub visible_from: Position,
}

impl LocalScope {
    pub fn is_visible(&self, position: Position, innermost_hard_scope: Range) -> bool {
        self.presence.contains(position)
            && self.hard_scope == innermost_hard_scope
            && self.visible_from <= position
    }
}

#[derive(Debug, Clone)]
pub struct MethodDetail {
    pub scope: Scope,
    pub visibility: Visibility,
    pub parameters: Vec<Arc<Pin>>,
    /// Generated by `attr_reader`, `attr_writer` or `attr_accessor`.
    pub attribute: bool,
    pub node: Option<Arc<SyntaxNode>>,
}

impl MethodDetail {
    pub fn body(&self) -> impl Iterator<Item = &Arc<SyntaxNode>> {
        self.node.iter().flat_map(|n| n.statements())
    }
}

#[derive(Debug, Clone)]
pub enum PinKind {
    Namespace {
        kind: NamespaceKind,
        superclass: Option<String>,
        /// Lexical nesting, innermost first, ending with the root.
        gates: Vec<String>,
    },
    Method(MethodDetail),
    Parameter {
        kind: ParameterKind,
        index: usize,
        local: LocalScope,
    },
    LocalVariable {
        assignment: Option<Arc<SyntaxNode>>,
        local: LocalScope,
    },
    InstanceVariable {
        assignment: Option<Arc<SyntaxNode>>,
    },
    ClassVariable {
        assignment: Option<Arc<SyntaxNode>>,
    },
    GlobalVariable {
        assignment: Option<Arc<SyntaxNode>>,
    },
    Constant {
        assignment: Option<Arc<SyntaxNode>>,
    },
    Reference {
        kind: ReferenceKind,
        gates: Vec<String>,
    },
    /// Resolver output carrying a receiver-specific type.
    Proxy,
}

#[derive(Debug, Clone)]
pub struct Pin {
    pub name: String,
    pub path: String,
    pub closure: Closure,
    pub location: Location,
    pub comments: String,
    pub docstring: Docstring,
    /// Type known without inference: tags, meta types, proxies.
    pub declared_type: ComplexType,
    pub kind: PinKind,
    inferred: OnceCell<ComplexType>,
}

impl Pin {
    pub fn new(
        name: impl Into<String>,
        path: impl Into<String>,
        kind: PinKind,
        closure: Closure,
        location: Location,
        comments: Option<&str>,
    ) -> Self {
        let comments = comments.unwrap_or_default().to_string();
        let docstring = Docstring::parse(&comments);
        let path = path.into();
        let declared_type = match &kind {
            PinKind::Namespace { kind, .. } => {
                ComplexType::from(crate::complex_type::UniqueType::meta(
                    &path,
                    *kind == NamespaceKind::Module,
                ))
            }
            PinKind::Method(_) => docstring.return_type().unwrap_or_default(),
            PinKind::LocalVariable { .. }
            | PinKind::InstanceVariable { .. }
            | PinKind::ClassVariable { .. }
            | PinKind::GlobalVariable { .. }
            | PinKind::Constant { .. } => docstring.type_hint().unwrap_or_default(),
            _ => ComplexType::undefined(),
        };
        Self {
            name: name.into(),
            path,
            closure,
            location,
            comments,
            docstring,
            declared_type,
            kind,
            inferred: OnceCell::new(),
        }
    }

    /// A resolver result: `pin`'s identity with a specialized type.
    pub fn proxy(pin: &Pin, ty: ComplexType) -> Self {
        let mut proxy = Self::new(
            pin.name.clone(),
            pin.path.clone(),
            PinKind::Proxy,
            pin.closure.clone(),
            pin.location.clone(),
            None,
        );
        proxy.declared_type = ty;
        proxy
    }

    pub fn with_declared_type(mut self, ty: ComplexType) -> Self {
        self.declared_type = ty;
        self
    }

    pub fn method(&self) -> Option<&MethodDetail> {
        match &self.kind {
            PinKind::Method(detail) => Some(detail),
            _ => None,
        }
    }

    pub fn is_method(&self) -> bool {
        self.method().is_some()
    }

    pub fn is_attribute(&self) -> bool {
        self.method().is_some_and(|m| m.attribute)
    }

    pub fn is_namespace(&self) -> bool {
        matches!(self.kind, PinKind::Namespace { .. })
    }

    pub fn namespace_kind(&self) -> Option<NamespaceKind> {
        match &self.kind {
            PinKind::Namespace { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    pub fn gates(&self) -> &[String] {
        match &self.kind {
            PinKind::Namespace { gates, .. } | PinKind::Reference { gates, .. } => gates,
            _ => &[],
        }
    }

    /// Method scope, or the self scope of the closure for other pins.
    pub fn scope(&self) -> Scope {
        match &self.kind {
            PinKind::Method(m) => m.scope,
            PinKind::Namespace { .. } => Scope::Class,
            _ => self.closure.scope,
        }
    }

    pub fn visibility(&self) -> Visibility {
        self.method().map(|m| m.visibility).unwrap_or_default()
    }

    pub fn parameters(&self) -> &[Arc<Pin>] {
        self.method().map(|m| m.parameters.as_slice()).unwrap_or_default()
    }

    pub fn parameter_kind(&self) -> Option<ParameterKind> {
        match &self.kind {
            PinKind::Parameter { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    pub fn local_scope(&self) -> Option<&LocalScope> {
        match &self.kind {
            PinKind::Parameter { local, .. } | PinKind::LocalVariable { local, .. } => Some(local),
            _ => None,
        }
    }

    pub fn assignment(&self) -> Option<&Arc<SyntaxNode>> {
        match &self.kind {
            PinKind::LocalVariable { assignment, .. }
            | PinKind::InstanceVariable { assignment }
            | PinKind::ClassVariable { assignment }
            | PinKind::GlobalVariable { assignment }
            | PinKind::Constant { assignment } => assignment.as_ref(),
            _ => None,
        }
    }

    /// Namespace that `self` refers to inside this pin.
    pub fn context_namespace(&self) -> &str {
        match &self.kind {
            PinKind::Namespace { .. } => &self.path,
            _ => &self.closure.namespace,
        }
    }

    /// The closure of code written inside this pin: a namespace body, a
    /// method body, or the pin's own closure for everything else.
    pub fn inner_closure(&self) -> Closure {
        match &self.kind {
            PinKind::Namespace { .. } => Closure {
                path: self.path.clone(),
                namespace: self.path.clone(),
                scope: if self.path.is_empty() {
                    Scope::Instance
                } else {
                    Scope::Class
                },
            },
            PinKind::Method(detail) => Closure {
                path: self.path.clone(),
                namespace: self.closure.namespace.clone(),
                scope: detail.scope,
            },
            _ => self.closure.clone(),
        }
    }

    pub fn inferred(&self) -> Option<&ComplexType> {
        self.inferred.get()
    }

    /// Stores an inference result. A concurrent writer may have won; both
    /// computed the same value.
    pub fn memoize(&self, ty: ComplexType) {
        let _ = self.inferred.set(ty);
    }

    pub fn is_local(&self) -> bool {
        self.local_scope().is_some()
    }
}

impl fmt::Display for Pin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            f.write_str(&self.name)
        } else {
            f.write_str(&self.path)
        }
    }
}

/// Path of a method named `name` in `namespace`.
pub fn method_path(namespace: &str, name: &str, scope: Scope) -> String {
    let separator = match scope {
        Scope::Instance => '#',
        Scope::Class => '.',
    };
    format!("{namespace}{separator}{name}")
}

/// Joins a namespace and a relative name.
pub fn join_path(namespace: &str, name: &str) -> String {
    if namespace.is_empty() {
        name.to_string()
    } else {
        format!("{namespace}::{name}")
    }
}
