use std::sync::Arc;

use ruby_syntax::{Field, NodeKind, SyntaxNode};

use super::{Inference, Locals, Probe, Site};
use crate::complex_type::ComplexType;
use crate::pin::Pin;
use crate::source_map::literal_type;

impl Probe<'_> {
    /// Type of an expression written inside `context`.
    pub fn infer_node_type(&self, node: &SyntaxNode, context: &Pin) -> ComplexType {
        self.resolve_node(node, context).ty
    }

    /// Resolves an expression written inside `context`. Bare words see the
    /// locals visible at their own position.
    pub fn resolve_node(&self, node: &SyntaxNode, context: &Pin) -> Inference {
        let closure = context.inner_closure();
        let site = Site {
            closure: &closure,
            filename: &context.location.filename,
        };
        self.node(node, site)
    }

    pub(crate) fn node(&self, node: &SyntaxNode, site: Site<'_>) -> Inference {
        if let Some(ty) = literal_type(node) {
            return Inference::typed(ty);
        }
        match node.kind {
            NodeKind::SelfRef => self.self_reference(site),
            NodeKind::Identifier => self.word(node.text(), site, Locals::At(node.range.start)),
            NodeKind::Constant | NodeKind::ScopeResolution => self.constant(node.text(), site),
            NodeKind::InstanceVariable => self.instance_variable(node.text(), site),
            NodeKind::ClassVariable => self.class_variable(node.text(), site),
            NodeKind::GlobalVariable => self.global_variable(node.text()),
            NodeKind::Call => self.call(node, site),
            NodeKind::ElementReference => match node.child(Field::Object) {
                Some(object) => {
                    let receiver = self.node(object, site);
                    if receiver.ty.is_undefined() {
                        return receiver;
                    }
                    self.index(&receiver.ty)
                }
                None => Inference::default(),
            },
            NodeKind::Assignment | NodeKind::OperatorAssignment => node
                .child(Field::Right)
                .map(|right| self.node(right, site))
                .unwrap_or_default(),
            NodeKind::Parenthesized | NodeKind::Begin | NodeKind::Then | NodeKind::Else => {
                last_value(node)
                    .map(|last| self.node(last, site))
                    .unwrap_or_default()
            }
            NodeKind::If
            | NodeKind::Unless
            | NodeKind::Elsif
            | NodeKind::Conditional
            | NodeKind::Case => Inference::typed(self.branches(node, site)),
            NodeKind::Return => Inference::typed(self.return_value(node, site)),
            NodeKind::Other("binary") => self.binary(node, site),
            NodeKind::Other("unary") => self.unary(node, site),
            _ => Inference::default(),
        }
    }

    fn call(&self, node: &SyntaxNode, site: Site<'_>) -> Inference {
        let Some(name) = node.name() else {
            return Inference::default();
        };
        match node.child(Field::Receiver) {
            Some(receiver) => {
                let resolved = self.node(receiver, site);
                if resolved.ty.is_undefined() {
                    return Inference {
                        unresolved: resolved.unresolved,
                        ..Inference::default()
                    };
                }
                self.call_method(&resolved.ty, name, receiver.kind != NodeKind::SelfRef)
            }
            None => self.call_method(&self.self_type(site.closure), name, false),
        }
    }

    fn binary(&self, node: &SyntaxNode, site: Site<'_>) -> Inference {
        let operator = node.child(Field::Operator).map(|o| o.text()).unwrap_or_default();
        let Some(left) = node.child(Field::Left) else {
            return Inference::default();
        };
        let left = self.node(left, site);
        match operator {
            "&&" | "||" | "and" | "or" => {
                let right = node
                    .child(Field::Right)
                    .map(|right| self.node(right, site).ty)
                    .unwrap_or_default();
                if left.ty.is_undefined() || right.is_undefined() {
                    return Inference::default();
                }
                Inference::typed(left.ty.union(&right))
            }
            _ if left.ty.is_undefined() => Inference::default(),
            _ => self.call_method(&left.ty, operator, true),
        }
    }

    fn unary(&self, node: &SyntaxNode, site: Site<'_>) -> Inference {
        match node.child(Field::Operator).map(|o| o.text()) {
            Some("!" | "not") => Inference::typed(ComplexType::from_name("Boolean")),
            Some("defined?") => Inference::typed(ComplexType::from_name("String")),
            Some("-" | "+") => node
                .statements()
                .next()
                .map(|operand| self.node(operand, site))
                .unwrap_or_default(),
            _ => Inference::default(),
        }
    }

    /// Union of the values each branch of a conditional can produce.
    fn branches(&self, node: &SyntaxNode, site: Site<'_>) -> ComplexType {
        let mut types = Vec::new();
        match node.kind {
            NodeKind::Case => {
                for branch in &node.children {
                    match branch.kind {
                        NodeKind::When => {
                            if let Some(body) = branch.child(Field::Body) {
                                types.push(self.node(body, site).ty);
                            }
                        }
                        NodeKind::Else => types.push(self.node(branch, site).ty),
                        _ => {}
                    }
                }
            }
            _ => {
                let consequence = node
                    .child(Field::Consequence)
                    .or_else(|| node.child(Field::Body));
                for branch in consequence.into_iter().chain(node.child(Field::Alternative)) {
                    types.push(self.node(branch, site).ty);
                }
            }
        }
        defined_union(types)
    }

    fn return_value(&self, node: &SyntaxNode, site: Site<'_>) -> ComplexType {
        let values: Vec<&Arc<SyntaxNode>> = node
            .children
            .iter()
            .find(|c| c.kind == NodeKind::ArgumentList)
            .map(|list| list.statements().collect())
            .unwrap_or_else(|| node.statements().collect());
        match values.as_slice() {
            [] => ComplexType::from_name("NilClass"),
            [value] => self.node(value, site).ty,
            _ => ComplexType::from_name("Array"),
        }
    }

    /// Union of the explicit `return` values and the last expression of a
    /// method body, ignoring the parts that infer to nothing.
    pub(crate) fn infer_method_return(&self, method: &Pin) -> ComplexType {
        let Some(body) = method.method().and_then(|m| m.node.as_ref()) else {
            return ComplexType::undefined();
        };
        let closure = method.inner_closure();
        let site = Site {
            closure: &closure,
            filename: &method.location.filename,
        };
        let mut returns = Vec::new();
        for statement in body.statements() {
            collect_returns(statement, &mut returns);
        }
        let mut types: Vec<ComplexType> = returns
            .iter()
            .map(|node| self.return_value(node, site))
            .collect();
        if let Some(last) = last_value(body) {
            types.push(self.node(last, site).ty);
        }
        defined_union(types)
    }
}

fn defined_union(types: Vec<ComplexType>) -> ComplexType {
    ComplexType::union_all(types.iter().filter(|ty| ty.is_defined()))
}

/// Last statement that produces the value of a body.
fn last_value(node: &SyntaxNode) -> Option<&Arc<SyntaxNode>> {
    node.statements()
        .filter(|s| {
            !matches!(
                s.kind,
                NodeKind::Other("rescue" | "ensure") | NodeKind::Else
            )
        })
        .last()
}

/// `return` statements that exit the enclosing method.
fn collect_returns<'n>(node: &'n Arc<SyntaxNode>, out: &mut Vec<&'n Arc<SyntaxNode>>) {
    match node.kind {
        NodeKind::Return => out.push(node),
        NodeKind::Method
        | NodeKind::SingletonMethod
        | NodeKind::Class
        | NodeKind::Module
        | NodeKind::SingletonClass
        | NodeKind::Lambda => {}
        _ => {
            for child in &node.children {
                collect_returns(child, out);
            }
        }
    }
}
