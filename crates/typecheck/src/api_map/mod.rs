//! The symbol index.
//!
//! An [`ApiMap`] is an immutable snapshot over the core library and every
//! mapped source. All relations between namespaces (superclasses, mixins)
//! are qualified once when the snapshot is built; ancestor lists are then
//! derived on demand with a visited set, so cyclic or duplicate inclusion
//! never repeats a namespace.
//!
//! ## Method lookup order
//!
//! For instance methods of `Foo`:
//! 1. Modules prepended to `Foo`
//! 2. `Foo` itself
//! 3. Modules included in `Foo`, last included first
//! 4. The superclass, following the same pattern recursively
//!
//! For class methods, the singleton side of `Foo` and its extended modules
//! come first, then the superclass's singleton side, and finally the
//! instance methods of `Class` (or `Module`).

mod compatibility;
pub mod probe;
mod store;

#[cfg(test)]
mod tests;

use std::sync::Arc;

use rayon::prelude::*;
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;

use crate::complex_type::{ComplexType, UniqueType};
use crate::core_library;
use crate::pin::{NamespaceKind, Pin, PinKind, ReferenceKind, Scope, Visibility, join_path};
use crate::source::Source;
use crate::source_map::SourceMap;
use store::Store;

pub use probe::{Inference, Probe};

const REFERENCE_KINDS: [ReferenceKind; 3] = [
    ReferenceKind::Include,
    ReferenceKind::Extend,
    ReferenceKind::Prepend,
];

#[derive(Debug)]
pub struct ApiMap {
    store: Store,
    source_maps: FxHashMap<String, Arc<SourceMap>>,
    /// Filenames in the order the sources were given.
    filenames: Vec<String>,
    /// Qualified explicit superclasses.
    superclasses: FxHashMap<String, String>,
    /// Qualified mixins by namespace and reference kind, in declaration order.
    mixins: FxHashMap<(String, ReferenceKind), Vec<String>>,
    /// Namespaces with a superclass or mixin reference that could not be
    /// qualified. Their method tables are incomplete.
    open: FxHashSet<String>,
    /// Ancestor lists of every declared namespace, computed once per
    /// snapshot.
    ancestry: FxHashMap<String, Vec<String>>,
}

impl ApiMap {
    /// Builds a snapshot from loose pins plus the core library.
    pub fn index(pins: impl IntoIterator<Item = Arc<Pin>>) -> Self {
        Self::build(pins.into_iter().collect(), Vec::new())
    }

    /// Maps every source (in parallel) and builds a snapshot over them.
    pub fn from_sources(sources: Vec<Arc<Source>>) -> Self {
        let maps: Vec<Arc<SourceMap>> = sources
            .into_par_iter()
            .map(|source| Arc::new(SourceMap::map(source)))
            .collect();
        Self::from_source_maps(maps)
    }

    pub fn from_source_maps(maps: Vec<Arc<SourceMap>>) -> Self {
        let pins = maps
            .iter()
            .flat_map(|map| map.pins().iter().cloned())
            .collect();
        Self::build(pins, maps)
    }

    fn build(pins: Vec<Arc<Pin>>, maps: Vec<Arc<SourceMap>>) -> Self {
        let store = Store::new(core_library::pins().iter().cloned().chain(pins));
        let filenames = maps.iter().map(|m| m.filename().to_string()).collect();
        let source_maps = maps
            .into_iter()
            .map(|m| (m.filename().to_string(), m))
            .collect();
        let mut api_map = Self {
            store,
            source_maps,
            filenames,
            superclasses: FxHashMap::default(),
            mixins: FxHashMap::default(),
            open: FxHashSet::default(),
            ancestry: FxHashMap::default(),
        };
        api_map.resolve_references();
        api_map.ancestry = api_map
            .store
            .namespaces()
            .map(|(path, _)| (path.to_string(), api_map.walk_ancestors(path)))
            .collect();
        debug!(
            pins = api_map.store.pins().len(),
            sources = api_map.filenames.len(),
            open = api_map.open.len(),
            "indexed api map"
        );
        api_map
    }

    /// Qualifies superclass and mixin references lexically.
    fn resolve_references(&mut self) {
        let mut superclasses = FxHashMap::default();
        let mut mixins: FxHashMap<(String, ReferenceKind), Vec<String>> = FxHashMap::default();
        let mut open = FxHashSet::default();

        for (path, _) in self.store.namespaces() {
            if let Some((name, gates)) = self.store.superclass_reference(path) {
                match self.qualify_lexical(name, gates) {
                    Some(qualified) if qualified != path => {
                        superclasses.insert(path.to_string(), qualified);
                    }
                    _ => {
                        debug!(namespace = path, superclass = %name, "unresolved superclass");
                        open.insert(path.to_string());
                    }
                }
            }
            for kind in REFERENCE_KINDS {
                for reference in self.store.references(path, kind) {
                    match self.qualify_lexical(&reference.name, reference.gates()) {
                        Some(qualified) => mixins
                            .entry((path.to_string(), kind))
                            .or_default()
                            .push(qualified),
                        None => {
                            open.insert(path.to_string());
                        }
                    }
                }
            }
        }

        self.superclasses = superclasses;
        self.mixins = mixins;
        self.open = open;
    }

    fn qualify_lexical(&self, name: &str, gates: &[String]) -> Option<String> {
        if let Some(absolute) = name.strip_prefix("::") {
            return self.exists(absolute).then(|| absolute.to_string());
        }
        gates
            .iter()
            .map(|gate| join_path(gate, name))
            .find(|candidate| self.exists(candidate))
    }

    pub fn pins(&self) -> &[Arc<Pin>] {
        self.store.pins()
    }

    pub fn get_path_pins(&self, path: &str) -> &[Arc<Pin>] {
        self.store.path_pins(path)
    }

    pub fn source_map(&self, filename: &str) -> Option<&Arc<SourceMap>> {
        self.source_maps.get(filename)
    }

    pub fn source_maps(&self) -> impl Iterator<Item = &Arc<SourceMap>> {
        self.filenames
            .iter()
            .filter_map(|name| self.source_maps.get(name))
    }

    pub fn namespace_kind(&self, path: &str) -> Option<NamespaceKind> {
        self.store.namespace_kind(path)
    }

    pub fn namespace_exists(&self, path: &str) -> bool {
        self.store.namespace_kind(path).is_some()
    }

    fn exists(&self, path: &str) -> bool {
        self.namespace_exists(path) || self.store.is_constant(path)
    }

    /// Lexical nesting of a namespace, innermost first.
    fn gates_of(&self, context: &str) -> Vec<String> {
        if let Some(pin) = self
            .store
            .path_pins(context)
            .iter()
            .find(|p| p.is_namespace())
        {
            return pin.gates().to_vec();
        }
        let mut gates = Vec::new();
        let mut current = context;
        while !current.is_empty() {
            gates.push(current.to_string());
            current = current.rsplit_once("::").map(|(parent, _)| parent).unwrap_or("");
        }
        gates.push(String::new());
        gates
    }

    /// Resolves a constant reference written inside `context` to a fully
    /// qualified path: lexical scopes first, then the context's ancestors,
    /// then the top level.
    pub fn qualify(&self, name: &str, context: &str) -> Option<String> {
        let name = name.trim();
        if name.is_empty() {
            return None;
        }
        if let Some(absolute) = name.strip_prefix("::") {
            return self.qualify(absolute, "");
        }
        let (head, tail) = match name.split_once("::") {
            Some((head, tail)) => (head, Some(tail)),
            None => (name, None),
        };

        let found = self
            .gates_of(context)
            .iter()
            .filter(|gate| !gate.is_empty())
            .map(|gate| join_path(gate, head))
            .find(|candidate| self.exists(candidate))
            .or_else(|| {
                self.ancestors(context)
                    .iter()
                    .filter(|ancestor| !ancestor.is_empty() && ancestor.as_str() != "Object")
                    .map(|ancestor| join_path(ancestor, head))
                    .find(|candidate| self.exists(candidate))
            })
            .or_else(|| self.exists(head).then(|| head.to_string()))?;

        match tail {
            Some(rest) => self.qualify_member(&found, rest),
            None => Some(found),
        }
    }

    fn qualify_member(&self, namespace: &str, rest: &str) -> Option<String> {
        let mut current = namespace.to_string();
        for part in rest.split("::") {
            let direct = join_path(&current, part);
            current = if self.exists(&direct) {
                direct
            } else {
                self.ancestors(&current)
                    .iter()
                    .map(|ancestor| join_path(ancestor, part))
                    .find(|candidate| self.exists(candidate))?
            };
        }
        Some(current)
    }

    pub fn superclass_of(&self, path: &str) -> Option<String> {
        if path.is_empty() {
            return Some("Object".to_string());
        }
        if let Some(superclass) = self.superclasses.get(path) {
            return Some(superclass.clone());
        }
        match self.store.namespace_kind(path) {
            Some(NamespaceKind::Class) => match path {
                "BasicObject" => None,
                "Object" => Some("BasicObject".to_string()),
                _ => Some("Object".to_string()),
            },
            _ => None,
        }
    }

    fn mixins(&self, path: &str, kind: ReferenceKind) -> &[String] {
        self.mixins
            .get(&(path.to_string(), kind))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Ancestors of a namespace, nearest first, each at most once.
    pub fn ancestors(&self, path: &str) -> Vec<String> {
        match self.ancestry.get(path) {
            Some(ancestors) => ancestors.clone(),
            None => self.walk_ancestors(path),
        }
    }

    fn walk_ancestors(&self, path: &str) -> Vec<String> {
        let mut out = Vec::new();
        let mut visited = FxHashSet::default();
        let mut current = Some(path.to_string());
        while let Some(namespace) = current {
            if !visited.insert(namespace.clone()) {
                break;
            }
            for prepended in self.mixins(&namespace, ReferenceKind::Prepend).iter().rev() {
                self.collect_module(prepended, &mut out, &mut visited);
            }
            out.push(namespace.clone());
            for included in self.mixins(&namespace, ReferenceKind::Include).iter().rev() {
                self.collect_module(included, &mut out, &mut visited);
            }
            current = self.superclass_of(&namespace);
        }
        out
    }

    fn collect_module(&self, module: &str, out: &mut Vec<String>, visited: &mut FxHashSet<String>) {
        if !visited.insert(module.to_string()) {
            return;
        }
        for prepended in self.mixins(module, ReferenceKind::Prepend).iter().rev() {
            self.collect_module(prepended, out, visited);
        }
        out.push(module.to_string());
        for included in self.mixins(module, ReferenceKind::Include).iter().rev() {
            self.collect_module(included, out, visited);
        }
    }

    /// Where methods for `(path, scope)` are looked up, in lookup order.
    fn method_sources(&self, path: &str, scope: Scope) -> Vec<(String, Scope)> {
        match scope {
            Scope::Instance => {
                let mut ancestors = self.ancestors(path);
                // Whatever includes a module is an Object.
                if self.store.namespace_kind(path) == Some(NamespaceKind::Module) {
                    for ancestor in self.ancestors("Object") {
                        if !ancestors.contains(&ancestor) {
                            ancestors.push(ancestor);
                        }
                    }
                }
                ancestors.into_iter().map(|a| (a, Scope::Instance)).collect()
            }
            Scope::Class => {
                let mut out = Vec::new();
                let mut visited = FxHashSet::default();
                let mut current = Some(path.to_string());
                while let Some(namespace) = current {
                    if !visited.insert(namespace.clone()) {
                        break;
                    }
                    out.push((namespace.clone(), Scope::Class));
                    for extended in self.mixins(&namespace, ReferenceKind::Extend).iter().rev() {
                        let mut module_ancestors = Vec::new();
                        self.collect_module(extended, &mut module_ancestors, &mut FxHashSet::default());
                        out.extend(module_ancestors.into_iter().map(|a| (a, Scope::Instance)));
                    }
                    current = match self.store.namespace_kind(&namespace) {
                        Some(NamespaceKind::Class) => self.superclass_of(&namespace),
                        _ => None,
                    };
                }
                let meta = match self.store.namespace_kind(path) {
                    Some(NamespaceKind::Module) => "Module",
                    _ => "Class",
                };
                out.extend(self.ancestors(meta).into_iter().map(|a| (a, Scope::Instance)));
                out
            }
        }
    }

    /// Methods visible on a namespace. A method defined nearer in the lookup
    /// order shadows same-named methods further up; within one namespace the
    /// last definition wins.
    pub fn methods(&self, path: &str, scope: Scope) -> Vec<Arc<Pin>> {
        let mut seen = FxHashSet::default();
        let mut out = Vec::new();
        for (namespace, source_scope) in self.method_sources(path, scope) {
            for pin in self.store.methods(&namespace, source_scope).iter().rev() {
                if seen.insert(pin.name.clone()) {
                    out.push(pin.clone());
                }
            }
        }
        out
    }

    /// Every method named `name` along the lookup order, nearest first.
    pub fn get_method_stack(&self, path: &str, name: &str, scope: Scope) -> Vec<Arc<Pin>> {
        self.method_sources(path, scope)
            .iter()
            .flat_map(|(namespace, source_scope)| {
                self.store
                    .methods(namespace, *source_scope)
                    .iter()
                    .rev()
                    .filter(|pin| pin.name == name)
                    .cloned()
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    pub fn get_method(&self, path: &str, name: &str, scope: Scope) -> Option<Arc<Pin>> {
        self.method_sources(path, scope)
            .iter()
            .find_map(|(namespace, source_scope)| {
                self.store
                    .methods(namespace, *source_scope)
                    .iter()
                    .rev()
                    .find(|pin| pin.name == name)
                    .cloned()
            })
    }

    /// Like [`Self::get_method`], hiding private methods.
    pub fn get_public_method(&self, path: &str, name: &str, scope: Scope) -> Option<Arc<Pin>> {
        self.get_method(path, name, scope)
            .filter(|pin| pin.visibility() != Visibility::Private || name.ends_with('='))
    }

    pub fn get_instance_variable_pins(&self, namespace: &str, scope: Scope) -> Vec<Arc<Pin>> {
        self.store
            .members(namespace)
            .iter()
            .filter(|pin| {
                matches!(pin.kind, PinKind::InstanceVariable { .. }) && pin.closure.scope == scope
            })
            .cloned()
            .collect()
    }

    pub fn get_class_variable_pins(&self, namespace: &str) -> Vec<Arc<Pin>> {
        self.store
            .members(namespace)
            .iter()
            .filter(|pin| matches!(pin.kind, PinKind::ClassVariable { .. }))
            .cloned()
            .collect()
    }

    pub fn get_global_variable_pins(&self) -> &[Arc<Pin>] {
        self.store.globals()
    }

    /// Constants and child namespaces of a namespace and its ancestors.
    pub fn get_constants(&self, path: &str) -> Vec<Arc<Pin>> {
        let mut seen = FxHashSet::default();
        self.ancestors(path)
            .iter()
            .flat_map(|ancestor| self.store.members(ancestor).iter())
            .filter(|pin| matches!(pin.kind, PinKind::Constant { .. } | PinKind::Namespace { .. }))
            .filter(|pin| seen.insert(pin.name.clone()))
            .cloned()
            .collect()
    }

    /// Namespace and constant pins an unqualified `name` refers to from
    /// `context`.
    pub fn visible_pins(&self, name: &str, context: &str) -> Vec<Arc<Pin>> {
        self.qualify(name, context)
            .map(|path| {
                self.store
                    .path_pins(&path)
                    .iter()
                    .filter(|p| matches!(p.kind, PinKind::Namespace { .. } | PinKind::Constant { .. }))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Members of a namespace and its ancestors: methods of both scopes,
    /// constants and variables.
    pub fn namespace_pins(&self, path: &str) -> Vec<Arc<Pin>> {
        let mut out = self.methods(path, Scope::Instance);
        out.extend(self.methods(path, Scope::Class));
        out.extend(self.get_constants(path));
        out.extend(
            self.store
                .members(path)
                .iter()
                .filter(|pin| !matches!(pin.kind, PinKind::Constant { .. } | PinKind::Namespace { .. }))
                .cloned(),
        );
        out
    }

    /// The `@return` tag that documents `method`: its own, else the nearest
    /// tag on a method it overrides. Returned with the namespace the tag was
    /// written in.
    pub fn return_tag(&self, method: &Pin) -> Option<(ComplexType, String)> {
        if method.declared_type.is_defined() {
            return Some((method.declared_type.clone(), method.closure.namespace.clone()));
        }
        self.get_method_stack(&method.closure.namespace, &method.name, method.scope())
            .iter()
            .find(|pin| pin.declared_type.is_defined())
            .map(|pin| (pin.declared_type.clone(), pin.closure.namespace.clone()))
    }

    /// The `@param` tag for `name`, own or inherited like [`Self::return_tag`].
    pub fn param_tag(&self, method: &Pin, name: &str) -> Option<(ComplexType, String)> {
        if let Some(ty) = method.docstring.param_type(name) {
            return Some((ty, method.closure.namespace.clone()));
        }
        self.get_method_stack(&method.closure.namespace, &method.name, method.scope())
            .iter()
            .find_map(|pin| {
                pin.docstring
                    .param_type(name)
                    .map(|ty| (ty, pin.closure.namespace.clone()))
            })
    }

    /// A namespace is open when its method table may be incomplete: it is
    /// unknown, an ancestor reference could not be resolved, or it handles
    /// missing methods dynamically.
    pub fn is_open(&self, path: &str) -> bool {
        if !path.is_empty() && !self.namespace_exists(path) {
            return true;
        }
        self.ancestors(path).iter().any(|a| self.open.contains(a))
            || self.get_method(path, "method_missing", Scope::Instance).is_some()
    }

    /// Qualifies every namespace named in `ty`. Names that cannot be
    /// qualified are kept as written.
    pub fn qualify_type(&self, ty: &ComplexType, context: &str) -> ComplexType {
        ComplexType::from_unique(ty.items().iter().map(|item| self.qualify_unique(item, context)))
    }

    fn qualify_unique(&self, item: &UniqueType, context: &str) -> UniqueType {
        let mut qualified = item.map_params(&mut |p| self.qualify_type(p, context));
        if item.is_nil() {
            qualified.name = "NilClass".to_string();
        } else if !item.is_pseudo()
            && let Some(path) = self.qualify(&item.name, context)
        {
            qualified.name = path;
        }
        qualified
    }

    /// True when every namespace named in `ty` can be qualified.
    pub fn resolvable(&self, ty: &ComplexType, context: &str) -> bool {
        !ty.contains(&|item: &UniqueType| {
            !item.is_pseudo() && !item.is_nil() && self.qualify(&item.name, context).is_none()
        })
    }
}
