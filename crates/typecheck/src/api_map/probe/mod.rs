//! Type resolution for signatures and expressions.
//!
//! A [`Probe`] answers "what is this?" against one [`ApiMap`] snapshot. It
//! is created per query batch, holds only a recursion guard, and is never
//! shared across threads. Inferred pin types are memoized on the pins
//! themselves, except when a result was cut short by a cycle or by the depth
//! limit.

mod chain;
mod infer;

#[cfg(test)]
mod tests;

use std::cell::{Cell, RefCell};
use std::sync::Arc;

use ruby_syntax::Position;
use rustc_hash::FxHashSet;
use tracing::trace;

use super::ApiMap;
use crate::complex_type::{ComplexType, UniqueType};
use crate::core_library::CORE_FILENAME;
use crate::pin::{Closure, NamespaceKind, ParameterKind, Pin, PinKind, Scope};
use chain::Segment;

/// Longest signature that is resolved.
const MAX_SEGMENTS: usize = 32;
/// Deepest chain of nested pin inferences.
const MAX_DEPTH: usize = 24;

/// Outcome of resolving a signature or expression.
#[derive(Debug, Clone, Default)]
pub struct Inference {
    pub ty: ComplexType,
    /// Pins the last step resolved to.
    pub pins: Vec<Arc<Pin>>,
    /// First name in the chain that did not resolve.
    pub unresolved: Option<String>,
}

impl Inference {
    fn typed(ty: ComplexType) -> Self {
        Self {
            ty,
            ..Self::default()
        }
    }

    fn unresolved(name: &str) -> Self {
        Self {
            unresolved: Some(name.to_string()),
            ..Self::default()
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.unresolved.is_none()
    }
}

/// Where an expression is evaluated.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Site<'s> {
    pub closure: &'s Closure,
    pub filename: &'s str,
}

/// Which locals a bare word may refer to.
#[derive(Debug, Clone, Copy)]
enum Locals<'l> {
    Given(&'l [Arc<Pin>]),
    /// Locals visible at a position of the site's file.
    At(Position),
}

struct InferenceGuard<'a> {
    set: &'a RefCell<FxHashSet<usize>>,
    depth: &'a Cell<usize>,
    key: usize,
}

impl Drop for InferenceGuard<'_> {
    fn drop(&mut self) {
        self.set.borrow_mut().remove(&self.key);
        self.depth.set(self.depth.get() - 1);
    }
}

pub struct Probe<'a> {
    api_map: &'a ApiMap,
    /// Pins whose inference is under way, keyed by address.
    in_progress: RefCell<FxHashSet<usize>>,
    depth: Cell<usize>,
    /// Number of inferences cut short so far.
    cutoffs: Cell<usize>,
}

impl<'a> Probe<'a> {
    pub fn new(api_map: &'a ApiMap) -> Self {
        Self {
            api_map,
            in_progress: RefCell::default(),
            depth: Cell::new(0),
            cutoffs: Cell::new(0),
        }
    }

    pub fn api_map(&self) -> &'a ApiMap {
        self.api_map
    }

    pub fn infer_signature_type(
        &self,
        signature: &str,
        context: &Pin,
        locals: &[Arc<Pin>],
    ) -> ComplexType {
        self.resolve(signature, context, locals).ty
    }

    /// Pins a signature resolves to. When the resolved type is more specific
    /// than a pin's own declaration, e.g. a generic return resolved against
    /// its receiver, the pin is returned as a proxy carrying that type.
    pub fn infer_signature_pins(
        &self,
        signature: &str,
        context: &Pin,
        locals: &[Arc<Pin>],
    ) -> Vec<Arc<Pin>> {
        let inference = self.resolve(signature, context, locals);
        if !inference.is_resolved() {
            return Vec::new();
        }
        let ty = inference.ty;
        inference
            .pins
            .into_iter()
            .map(|pin| {
                if ty.is_undefined() || pin.declared_type == ty {
                    pin
                } else {
                    Arc::new(Pin::proxy(&pin, ty.clone()))
                }
            })
            .collect()
    }

    /// Resolves a signature written inside `context`.
    pub fn resolve(&self, signature: &str, context: &Pin, locals: &[Arc<Pin>]) -> Inference {
        let Some(segments) = chain::tokenize(signature) else {
            trace!(signature, "malformed signature");
            return Inference::unresolved(signature);
        };
        if segments.len() > MAX_SEGMENTS {
            trace!(signature, "signature too long");
            return Inference::unresolved(signature);
        }
        let closure = context.inner_closure();
        let site = Site {
            closure: &closure,
            filename: &context.location.filename,
        };
        let mut segments = segments.into_iter();
        let Some(head) = segments.next() else {
            return Inference::unresolved(signature);
        };
        let mut current = self.resolve_head(&head, site, Locals::Given(locals));
        for segment in segments {
            if !current.is_resolved() || current.ty.is_undefined() {
                return Inference {
                    ty: ComplexType::undefined(),
                    pins: Vec::new(),
                    unresolved: current.unresolved.or_else(|| Some(signature.to_string())),
                };
            }
            current = match segment {
                Segment::Index => self.index(&current.ty),
                Segment::Word(name) => self.call_method(&current.ty, &name, true),
                _ => return Inference::unresolved(signature),
            };
        }
        current
    }

    fn resolve_head(&self, segment: &Segment, site: Site<'_>, locals: Locals<'_>) -> Inference {
        match segment {
            Segment::SelfRef => self.self_reference(site),
            Segment::Literal(name) => Inference::typed(ComplexType::from_name(name)),
            Segment::Word(name) => self.word(name, site, locals),
            Segment::Constant(name) => self.constant(name, site),
            Segment::InstanceVariable(name) => self.instance_variable(name, site),
            Segment::ClassVariable(name) => self.class_variable(name, site),
            Segment::GlobalVariable(name) => self.global_variable(name),
            Segment::Index => Inference::unresolved("[]"),
        }
    }

    /// Type of `self` inside a closure. Top-level code runs in an `Object`
    /// instance.
    pub fn self_type(&self, closure: &Closure) -> ComplexType {
        let namespace = closure.namespace.as_str();
        if namespace.is_empty() {
            return ComplexType::from_name("Object");
        }
        match closure.scope {
            Scope::Instance => ComplexType::from_name(namespace),
            Scope::Class => ComplexType::from(UniqueType::meta(
                namespace,
                self.api_map.namespace_kind(namespace) == Some(NamespaceKind::Module),
            )),
        }
    }

    fn self_reference(&self, site: Site<'_>) -> Inference {
        let pins = self
            .api_map
            .get_path_pins(&site.closure.namespace)
            .iter()
            .find(|pin| pin.is_namespace())
            .cloned()
            .into_iter()
            .collect();
        Inference {
            ty: self.self_type(site.closure),
            pins,
            unresolved: None,
        }
    }

    /// A bare word: a local variable, else a method on `self`.
    fn word(&self, name: &str, site: Site<'_>, locals: Locals<'_>) -> Inference {
        if let Some(local) = self.find_local(name, site, locals) {
            return Inference {
                ty: self.infer_pin_type(&local),
                pins: vec![local],
                unresolved: None,
            };
        }
        self.call_method(&self.self_type(site.closure), name, false)
    }

    fn find_local(&self, name: &str, site: Site<'_>, locals: Locals<'_>) -> Option<Arc<Pin>> {
        match locals {
            Locals::Given(locals) => locals.iter().rev().find(|l| l.name == name).cloned(),
            Locals::At(position) => self
                .api_map
                .source_map(site.filename)?
                .locals_at(position)
                .into_iter()
                .rev()
                .find(|l| l.name == name),
        }
    }

    fn constant(&self, name: &str, site: Site<'_>) -> Inference {
        let Some(path) = self.api_map.qualify(name, &site.closure.namespace) else {
            return Inference::unresolved(name);
        };
        let pins: Vec<Arc<Pin>> = self
            .api_map
            .get_path_pins(&path)
            .iter()
            .filter(|pin| matches!(pin.kind, PinKind::Namespace { .. } | PinKind::Constant { .. }))
            .cloned()
            .collect();
        let ty = match pins.iter().find(|pin| pin.is_namespace()) {
            Some(namespace) => namespace.declared_type.clone(),
            None => self.union_of(&pins),
        };
        Inference {
            ty,
            pins,
            unresolved: None,
        }
    }

    fn instance_variable(&self, name: &str, site: Site<'_>) -> Inference {
        let pins: Vec<Arc<Pin>> = self
            .api_map
            .get_instance_variable_pins(&site.closure.namespace, site.closure.scope)
            .into_iter()
            .filter(|pin| pin.name == name)
            .collect();
        self.variable(name, pins)
    }

    fn class_variable(&self, name: &str, site: Site<'_>) -> Inference {
        let pins: Vec<Arc<Pin>> = self
            .api_map
            .get_class_variable_pins(&site.closure.namespace)
            .into_iter()
            .filter(|pin| pin.name == name)
            .collect();
        self.variable(name, pins)
    }

    fn global_variable(&self, name: &str) -> Inference {
        let pins: Vec<Arc<Pin>> = self
            .api_map
            .get_global_variable_pins()
            .iter()
            .filter(|pin| pin.name == name)
            .cloned()
            .collect();
        self.variable(name, pins)
    }

    fn variable(&self, name: &str, pins: Vec<Arc<Pin>>) -> Inference {
        if pins.is_empty() {
            return Inference::unresolved(name);
        }
        Inference {
            ty: self.union_of(&pins),
            pins,
            unresolved: None,
        }
    }

    fn union_of(&self, pins: &[Arc<Pin>]) -> ComplexType {
        let types: Vec<ComplexType> = pins.iter().map(|pin| self.infer_pin_type(pin)).collect();
        ComplexType::union_all(types.iter())
    }

    /// Calls `name` on every alternative of `receiver`. Private methods are
    /// only reachable without an explicit receiver.
    pub(crate) fn call_method(&self, receiver: &ComplexType, name: &str, explicit: bool) -> Inference {
        let mut types = Vec::new();
        let mut pins = Vec::new();
        for item in receiver.items() {
            if item.is_duck() || item.is_void() || item.is_generic() {
                continue;
            }
            let namespace = item.namespace();
            if item.is_meta() && name == "new" {
                let constructor = self
                    .api_map
                    .get_method(namespace, "initialize", Scope::Instance)
                    .filter(|pin| pin.closure.namespace != "BasicObject")
                    .or_else(|| self.api_map.get_method(namespace, "new", Scope::Class));
                if let Some(pin) = constructor {
                    pins.push(pin);
                }
                types.push(item.instance_type().cloned().unwrap_or_default());
                continue;
            }
            let scope = if item.is_meta() {
                Scope::Class
            } else {
                Scope::Instance
            };
            let method = if explicit {
                self.api_map.get_public_method(namespace, name, scope)
            } else {
                self.api_map.get_method(namespace, name, scope)
            };
            let Some(method) = method else {
                if name == "class" && !item.is_meta() {
                    types.push(ComplexType::from(UniqueType::meta(
                        namespace,
                        self.api_map.namespace_kind(namespace) == Some(NamespaceKind::Module),
                    )));
                }
                continue;
            };
            let ty = self.infer_pin_type(&method);
            types.push(self.specialize(&ty, item, &method.closure.namespace));
            pins.push(method);
        }
        if pins.is_empty() && types.is_empty() {
            return Inference::unresolved(name);
        }
        Inference {
            ty: ComplexType::union_all(types.iter()),
            pins,
            unresolved: None,
        }
    }

    /// Substitutes `self` and generic placeholders with the receiver and
    /// qualifies what is left in the method's namespace.
    pub(crate) fn specialize(&self, ty: &ComplexType, receiver: &UniqueType, namespace: &str) -> ComplexType {
        let ty = ty
            .self_to(&ComplexType::from(receiver.clone()))
            .resolve_generics(receiver);
        self.api_map.qualify_type(&ty, namespace)
    }

    /// `receiver[...]`.
    fn index(&self, receiver: &ComplexType) -> Inference {
        let mut types = Vec::new();
        let mut pins = Vec::new();
        for item in receiver.items() {
            if item.is_parameterized() && !item.is_meta() {
                types.push(item.element_type());
                if let Some(method) =
                    self.api_map
                        .get_method(item.namespace(), "[]", Scope::Instance)
                {
                    pins.push(method);
                }
                continue;
            }
            let call = self.call_method(&ComplexType::from(item.clone()), "[]", true);
            types.push(call.ty);
            pins.extend(call.pins);
        }
        if pins.is_empty() && types.iter().all(ComplexType::is_undefined) {
            return Inference::unresolved("[]");
        }
        Inference {
            ty: ComplexType::union_all(types.iter()),
            pins,
            unresolved: None,
        }
    }

    /// Type of a pin: its declaration, else an inference from its
    /// assignment, body or documentation. For methods this is the return
    /// type before receiver substitution, taken from an inherited `@return`
    /// tag when the method has none of its own. Memoized.
    pub fn infer_pin_type(&self, pin: &Arc<Pin>) -> ComplexType {
        if pin.declared_type.is_defined() {
            return pin.declared_type.clone();
        }
        if let Some(ty) = pin.inferred() {
            return ty.clone();
        }
        let Some(_guard) = self.enter(pin) else {
            self.cutoffs.set(self.cutoffs.get() + 1);
            trace!(pin = %pin, "inference cut short");
            return ComplexType::undefined();
        };
        let cutoffs = self.cutoffs.get();
        let ty = match &pin.kind {
            PinKind::Method(_) => match self.api_map.return_tag(pin) {
                Some((ty, namespace)) => self.api_map.qualify_type(&ty, &namespace),
                None => self.infer_method_return(pin),
            },
            PinKind::Parameter { kind, local, .. } => {
                let own_method = local.presence == local.hard_scope;
                self.parameter_type(pin, *kind, own_method)
            }
            PinKind::LocalVariable { .. }
            | PinKind::InstanceVariable { .. }
            | PinKind::ClassVariable { .. }
            | PinKind::GlobalVariable { .. }
            | PinKind::Constant { .. } => match pin.assignment() {
                Some(node) => {
                    let site = Site {
                        closure: &pin.closure,
                        filename: &pin.location.filename,
                    };
                    self.node(node, site).ty
                }
                None => ComplexType::undefined(),
            },
            PinKind::Namespace { .. } | PinKind::Reference { .. } | PinKind::Proxy => {
                ComplexType::undefined()
            }
        };
        if self.cutoffs.get() == cutoffs && pin.location.filename != CORE_FILENAME {
            pin.memoize(ty.clone());
        }
        ty
    }

    /// A parameter's type from an inherited `@param` tag, else what its
    /// kind implies.
    fn parameter_type(&self, pin: &Pin, kind: ParameterKind, own_method: bool) -> ComplexType {
        if own_method
            && let Some(method) = self.owning_method(pin)
            && let Some((ty, namespace)) = self.api_map.param_tag(&method, &pin.name)
        {
            return self.api_map.qualify_type(&ty, &namespace);
        }
        match kind {
            ParameterKind::Splat => ComplexType::from_name("Array"),
            ParameterKind::DoubleSplat => ComplexType::from_name("Hash"),
            ParameterKind::Block => ComplexType::from_name("Proc"),
            _ => ComplexType::undefined(),
        }
    }

    fn owning_method(&self, parameter: &Pin) -> Option<Arc<Pin>> {
        self.api_map
            .get_path_pins(&parameter.closure.path)
            .iter()
            .find(|method| {
                method
                    .parameters()
                    .iter()
                    .any(|p| std::ptr::eq(Arc::as_ptr(p), parameter))
            })
            .cloned()
    }

    fn enter(&self, pin: &Arc<Pin>) -> Option<InferenceGuard<'_>> {
        if self.depth.get() >= MAX_DEPTH {
            return None;
        }
        let key = Arc::as_ptr(pin) as usize;
        if !self.in_progress.borrow_mut().insert(key) {
            return None;
        }
        self.depth.set(self.depth.get() + 1);
        Some(InferenceGuard {
            set: &self.in_progress,
            depth: &self.depth,
            key,
        })
    }
}
