use std::sync::Arc;

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::pin::{NamespaceKind, Pin, PinKind, ReferenceKind, Scope};

/// Raw indices over every pin of a snapshot.
///
/// Nothing here is qualified: superclass and mixin references keep the text
/// they were written with. [`super::ApiMap`] qualifies them once the whole
/// store is known.
#[derive(Debug, Default)]
pub(crate) struct Store {
    /// Every pin in insertion order: the core library first, then sources.
    pins: Vec<Arc<Pin>>,

    /// Pins by path.
    ///
    /// Example entries:
    /// - `"Foo::Bar"` -> every `class Foo::Bar` occurrence
    /// - `"Foo#baz"` -> instance method definitions
    /// - `"Foo.make"` -> singleton method definitions
    paths: FxHashMap<String, SmallVec<[Arc<Pin>; 2]>>,

    /// Declared namespaces and their kind. The root namespace is `""`.
    namespaces: FxHashMap<String, NamespaceKind>,

    /// Method pins by owning namespace and scope, in definition order.
    ///
    /// Example: `("User", Scope::Instance)` -> `[save, update, email]`
    methods: FxHashMap<(String, Scope), Vec<Arc<Pin>>>,

    /// Variables, constants and child namespaces by enclosing namespace.
    members: FxHashMap<String, Vec<Arc<Pin>>>,

    /// First explicit superclass of each class, with the lexical gates that
    /// surround the class statement.
    ///
    /// Example: `"Admin"` -> `("User", ["Auth", ""])`
    superclasses: FxHashMap<String, (String, Vec<String>)>,

    /// `include`, `extend` and `prepend` reference pins by namespace, in
    /// declaration order.
    references: FxHashMap<String, Vec<Arc<Pin>>>,

    globals: Vec<Arc<Pin>>,
}

impl Store {
    pub fn new(pins: impl IntoIterator<Item = Arc<Pin>>) -> Self {
        let mut store = Self::default();
        for pin in pins {
            store.add(pin);
        }
        store
    }

    fn add(&mut self, pin: Arc<Pin>) {
        match &pin.kind {
            PinKind::Namespace {
                kind,
                superclass,
                gates,
            } => {
                self.namespaces.entry(pin.path.clone()).or_insert(*kind);
                if let Some(superclass) = superclass {
                    self.superclasses
                        .entry(pin.path.clone())
                        .or_insert_with(|| (superclass.clone(), gates.get(1..).unwrap_or_default().to_vec()));
                }
                if !pin.path.is_empty() {
                    self.members
                        .entry(pin.closure.namespace.clone())
                        .or_default()
                        .push(pin.clone());
                }
            }
            PinKind::Method(detail) => {
                self.methods
                    .entry((pin.closure.namespace.clone(), detail.scope))
                    .or_default()
                    .push(pin.clone());
            }
            PinKind::Reference { .. } => {
                self.references
                    .entry(pin.closure.namespace.clone())
                    .or_default()
                    .push(pin.clone());
            }
            PinKind::GlobalVariable { .. } => self.globals.push(pin.clone()),
            PinKind::InstanceVariable { .. }
            | PinKind::ClassVariable { .. }
            | PinKind::Constant { .. } => {
                self.members
                    .entry(pin.closure.namespace.clone())
                    .or_default()
                    .push(pin.clone());
            }
            PinKind::Parameter { .. } | PinKind::LocalVariable { .. } | PinKind::Proxy => {}
        }
        self.paths.entry(pin.path.clone()).or_default().push(pin.clone());
        self.pins.push(pin);
    }

    pub fn pins(&self) -> &[Arc<Pin>] {
        &self.pins
    }

    pub fn path_pins(&self, path: &str) -> &[Arc<Pin>] {
        self.paths.get(path).map(|p| p.as_slice()).unwrap_or_default()
    }

    pub fn namespace_kind(&self, path: &str) -> Option<NamespaceKind> {
        self.namespaces.get(path).copied()
    }

    pub fn namespaces(&self) -> impl Iterator<Item = (&str, NamespaceKind)> {
        self.namespaces.iter().map(|(path, kind)| (path.as_str(), *kind))
    }

    pub fn methods(&self, namespace: &str, scope: Scope) -> &[Arc<Pin>] {
        self.methods
            .get(&(namespace.to_string(), scope))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn members(&self, namespace: &str) -> &[Arc<Pin>] {
        self.members
            .get(namespace)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn superclass_reference(&self, path: &str) -> Option<&(String, Vec<String>)> {
        self.superclasses.get(path)
    }

    pub fn references(&self, namespace: &str, kind: ReferenceKind) -> impl Iterator<Item = &Arc<Pin>> {
        self.references
            .get(namespace)
            .into_iter()
            .flatten()
            .filter(move |pin| matches!(&pin.kind, PinKind::Reference { kind: k, .. } if *k == kind))
    }

    pub fn globals(&self) -> &[Arc<Pin>] {
        &self.globals
    }

    pub fn is_constant(&self, path: &str) -> bool {
        self.path_pins(path)
            .iter()
            .any(|p| matches!(p.kind, PinKind::Constant { .. }))
    }
}
