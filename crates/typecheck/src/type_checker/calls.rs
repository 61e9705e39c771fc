use std::sync::Arc;

use ruby_syntax::{Field, NodeKind, SyntaxNode};

use super::Problem;
use crate::api_map::{ApiMap, Probe};
use crate::complex_type::{ComplexType, UniqueType};
use crate::pin::{Location, NamespaceKind, Pin, Scope};
use crate::source_map::SourceMap;

/// Walks a syntax tree checking call arguments against `@param` tags and
/// reporting calls that reach no method.
pub(super) struct CallChecker<'p, 'a> {
    probe: &'p Probe<'a>,
    map: &'p SourceMap,
    problems: Vec<Problem>,
}

impl<'p, 'a> CallChecker<'p, 'a> {
    pub(super) fn new(probe: &'p Probe<'a>, map: &'p SourceMap) -> Self {
        Self {
            probe,
            map,
            problems: Vec::new(),
        }
    }

    pub(super) fn check(mut self, tree: &Arc<SyntaxNode>) -> Vec<Problem> {
        self.visit(tree);
        self.problems
    }

    fn visit(&mut self, node: &Arc<SyntaxNode>) {
        match node.kind {
            NodeKind::Parameters
            | NodeKind::LeftAssignmentList
            | NodeKind::Other("alias" | "undef" | "exception_variable") => return,
            NodeKind::Assignment | NodeKind::OperatorAssignment => {
                self.visit_assignment(node);
                return;
            }
            NodeKind::Identifier => {
                if !matches!(
                    node.field,
                    Some(Field::Name | Field::Method | Field::Key | Field::Pattern)
                ) {
                    self.check_identifier(node);
                }
                return;
            }
            NodeKind::Call => self.check_call(node),
            _ => {}
        }
        for child in &node.children {
            self.visit(child);
        }
    }

    fn visit_assignment(&mut self, node: &Arc<SyntaxNode>) {
        let right = node.child(Field::Right);
        if let Some(left) = node.child(Field::Left) {
            match left.kind {
                NodeKind::Call => {
                    if node.kind == NodeKind::Assignment {
                        self.check_setter(left, right);
                    }
                    for child in left.children.iter().filter(|c| c.field != Some(Field::Method)) {
                        self.visit(child);
                    }
                }
                NodeKind::ElementReference => {
                    if node.kind == NodeKind::Assignment {
                        self.check_index_assignment(left, right);
                    }
                    for child in &left.children {
                        self.visit(child);
                    }
                }
                NodeKind::Identifier
                | NodeKind::InstanceVariable
                | NodeKind::ClassVariable
                | NodeKind::GlobalVariable
                | NodeKind::Constant
                | NodeKind::LeftAssignmentList => {}
                _ => self.visit(left),
            }
        }
        if let Some(right) = right {
            self.visit(right);
        }
    }

    /// A bare word must be a visible local or a method reachable from
    /// `self`.
    fn check_identifier(&mut self, node: &SyntaxNode) {
        let position = node.range.start;
        let name = node.text();
        if self
            .map
            .locals_at(position)
            .iter()
            .any(|local| local.name == name)
        {
            return;
        }
        let context = self.map.closure_at(position);
        let receiver = self.probe.self_type(&context.inner_closure());
        self.check_resolved(&receiver, name, false, node);
    }

    fn check_call(&mut self, node: &SyntaxNode) {
        let Some(name) = node.name() else {
            return;
        };
        let context = self.map.closure_at(node.range.start);
        let (receiver, explicit) = match node.child(Field::Receiver) {
            Some(receiver) => (
                self.probe.infer_node_type(receiver, context),
                receiver.kind != NodeKind::SelfRef,
            ),
            None => (self.probe.self_type(&context.inner_closure()), false),
        };
        if receiver.is_undefined() {
            return;
        }
        self.check_resolved(&receiver, name, explicit, node);
        let args: Vec<&Arc<SyntaxNode>> = node
            .child(Field::Arguments)
            .map(|list| list.statements().collect())
            .unwrap_or_default();
        if !args.is_empty() {
            self.check_arguments(&receiver, name, explicit, &args, context);
        }
    }

    /// `receiver.name = value`
    fn check_setter(&mut self, left: &SyntaxNode, right: Option<&Arc<SyntaxNode>>) {
        let (Some(name), Some(receiver), Some(value)) =
            (left.name(), left.child(Field::Receiver), right)
        else {
            return;
        };
        let context = self.map.closure_at(left.range.start);
        let receiver_type = self.probe.infer_node_type(receiver, context);
        if receiver_type.is_undefined() {
            return;
        }
        let explicit = receiver.kind != NodeKind::SelfRef;
        let setter = format!("{name}=");
        self.check_resolved(&receiver_type, &setter, explicit, left);
        self.check_arguments(&receiver_type, &setter, explicit, &[value], context);
    }

    /// `object[index] = value`
    fn check_index_assignment(&mut self, left: &SyntaxNode, right: Option<&Arc<SyntaxNode>>) {
        let (Some(object), Some(value)) = (left.child(Field::Object), right) else {
            return;
        };
        let context = self.map.closure_at(left.range.start);
        let receiver_type = self.probe.infer_node_type(object, context);
        if receiver_type.is_undefined() {
            return;
        }
        let mut args: Vec<&Arc<SyntaxNode>> = left.statements().collect();
        args.push(value);
        self.check_arguments(&receiver_type, "[]=", true, &args, context);
    }

    /// Reports `name` when every alternative of `receiver` is a namespace
    /// with a complete method table and none of them has the method.
    fn check_resolved(&mut self, receiver: &ComplexType, name: &str, explicit: bool, node: &SyntaxNode) {
        let api_map = self.probe.api_map();
        let closed = receiver.items().iter().all(|item| {
            !item.is_duck()
                && !item.is_generic()
                && !item.is_self()
                && !item.is_void()
                && !api_map.is_open(item.namespace())
                && !is_mixin_instance(api_map, item)
        });
        if !closed || self.probe.call_method(receiver, name, explicit).is_resolved() {
            return;
        }
        let location = self.location(node);
        self.problems
            .push(Problem::error(location, format!("Unresolved call to `{name}`")));
    }

    /// Checks arguments against the first alternative of `receiver` that
    /// has the method.
    fn check_arguments(
        &mut self,
        receiver: &ComplexType,
        name: &str,
        explicit: bool,
        args: &[&Arc<SyntaxNode>],
        context: &Pin,
    ) {
        let Some((method, item)) = receiver
            .items()
            .iter()
            .find_map(|item| self.callee(item, name, explicit).map(|m| (m, item)))
        else {
            return;
        };
        let params = method.parameters();
        let mut positional = params
            .iter()
            .filter(|p| p.parameter_kind().is_some_and(|kind| kind.is_positional()));
        let mut aligned = true;
        for arg in args {
            match arg.kind {
                NodeKind::SplatArgument => aligned = false,
                NodeKind::HashSplatArgument | NodeKind::BlockArgument => {}
                NodeKind::Pair => {
                    let (Some(key), Some(value)) = (arg.child(Field::Key), arg.child(Field::Value))
                    else {
                        continue;
                    };
                    let key = key.text().trim_start_matches(':').trim_end_matches(':');
                    let param = params.iter().find(|p| {
                        p.name == key && p.parameter_kind().is_some_and(|kind| kind.is_keyword())
                    });
                    if let Some(param) = param {
                        self.check_argument(&method, param, item, value, context);
                    }
                }
                _ if aligned => {
                    if let Some(param) = positional.next() {
                        self.check_argument(&method, param, item, arg, context);
                    }
                }
                _ => {}
            }
        }
    }

    fn check_argument(
        &mut self,
        method: &Pin,
        param: &Pin,
        receiver: &UniqueType,
        arg: &SyntaxNode,
        context: &Pin,
    ) {
        let api_map = self.probe.api_map();
        let (expected, namespace) = if param.declared_type.is_defined() {
            (param.declared_type.clone(), method.closure.namespace.clone())
        } else {
            match api_map.param_tag(method, &param.name) {
                Some(tag) => tag,
                None => return,
            }
        };
        let instance = if receiver.is_meta() && method.name == "initialize" {
            receiver
                .instance_type()
                .and_then(|ty| ty.first())
                .cloned()
                .unwrap_or_else(|| receiver.clone())
        } else {
            receiver.clone()
        };
        let expected = self.probe.specialize(&expected, &instance, &namespace);
        let actual = self.probe.infer_node_type(arg, context);
        if api_map.compatible(&expected, &actual, &namespace) {
            return;
        }
        let location = self.location(arg);
        self.problems.push(Problem::error(
            location,
            format!(
                "Wrong parameter type for `{}`: `{}` expected `{}`, received `{}`",
                method.path, param.name, expected, actual
            ),
        ));
    }

    /// The method a call reaches on one receiver alternative. `new` on a
    /// class reaches its `initialize`.
    fn callee(&self, item: &UniqueType, name: &str, explicit: bool) -> Option<Arc<Pin>> {
        let api_map = self.probe.api_map();
        let namespace = item.namespace();
        if item.is_meta() && name == "new" {
            return api_map
                .get_method(namespace, "initialize", Scope::Instance)
                .filter(|pin| pin.closure.namespace != "BasicObject");
        }
        let scope = if item.is_meta() {
            Scope::Class
        } else {
            Scope::Instance
        };
        if explicit {
            api_map.get_public_method(namespace, name, scope)
        } else {
            api_map.get_method(namespace, name, scope)
        }
    }

    fn location(&self, node: &SyntaxNode) -> Location {
        Location::new(self.map.filename(), node.range)
    }
}

/// `self` inside a module's instance method is whatever includes the module,
/// so its method table is never complete.
fn is_mixin_instance(api_map: &ApiMap, item: &UniqueType) -> bool {
    !item.is_meta() && api_map.namespace_kind(item.namespace()) == Some(NamespaceKind::Module)
}
