//! Node processors: turn a syntax tree into pins and locals.

use std::sync::Arc;

use ruby_syntax::{Field, NodeKind, Range, SyntaxNode};
use tracing::trace;

use crate::complex_type::ComplexType;
use crate::docstring::Docstring;
use crate::pin::{
    Closure, LocalScope, Location, MethodDetail, NamespaceKind, ParameterKind, Pin, PinKind,
    ReferenceKind, Scope, Visibility, join_path, method_path,
};

/// Output of mapping one tree.
pub(crate) struct Mapped {
    pub pins: Vec<Arc<Pin>>,
    pub locals: Vec<Arc<Pin>>,
    pub hard_scopes: Vec<Range>,
}

/// Lexical state while walking a body.
#[derive(Debug, Clone)]
struct Region {
    closure: Closure,
    /// Scope of methods defined with a plain `def`.
    def_scope: Scope,
    visibility: Visibility,
    gates: Vec<String>,
    hard_scope: Range,
    presence: Range,
    /// True directly inside a class or module body.
    namespace_body: bool,
}

pub(crate) struct Mapper<'a> {
    filename: &'a str,
    pins: Vec<Pin>,
    locals: Vec<Arc<Pin>>,
    hard_scopes: Vec<Range>,
}

impl<'a> Mapper<'a> {
    pub fn new(filename: &'a str) -> Self {
        Self {
            filename,
            pins: Vec::new(),
            locals: Vec::new(),
            hard_scopes: Vec::new(),
        }
    }

    pub fn map(mut self, root: Option<&Arc<SyntaxNode>>) -> Mapped {
        let range = root.map(|r| r.range).unwrap_or_default();
        self.pins.push(Pin::new(
            "",
            "",
            PinKind::Namespace {
                kind: NamespaceKind::Class,
                superclass: None,
                gates: vec![String::new()],
            },
            Closure::root(),
            self.location(range),
            None,
        ));
        self.hard_scopes.push(range);

        if let Some(root) = root {
            let mut region = Region {
                closure: Closure::root(),
                def_scope: Scope::Instance,
                visibility: Visibility::Public,
                gates: vec![String::new()],
                hard_scope: range,
                presence: range,
                namespace_body: true,
            };
            for child in &root.children {
                self.process(child, &mut region);
            }
        }

        trace!(
            filename = self.filename,
            pins = self.pins.len(),
            locals = self.locals.len(),
            "mapped source"
        );
        Mapped {
            pins: self.pins.into_iter().map(Arc::new).collect(),
            locals: self.locals,
            hard_scopes: self.hard_scopes,
        }
    }

    fn location(&self, range: Range) -> Location {
        Location::new(self.filename, range)
    }

    fn process(&mut self, node: &Arc<SyntaxNode>, region: &mut Region) {
        match node.kind {
            NodeKind::Class | NodeKind::Module => self.process_namespace(node, region),
            NodeKind::SingletonClass => self.process_singleton_class(node, region),
            NodeKind::Method => self.process_method(node, region, region.def_scope),
            NodeKind::SingletonMethod => {
                if node.child(Field::Object).is_some_and(|o| o.kind == NodeKind::SelfRef) {
                    self.process_method(node, region, Scope::Class);
                }
            }
            NodeKind::Assignment | NodeKind::OperatorAssignment => {
                self.process_assignment(node, region)
            }
            NodeKind::Call => self.process_call(node, region),
            NodeKind::Identifier if region.namespace_body => {
                if let Some(visibility) = visibility_keyword(node.text()) {
                    region.visibility = visibility;
                }
            }
            NodeKind::Block | NodeKind::Lambda => self.process_block(node, region),
            NodeKind::Other("exception_variable") => {
                for name in node.children.iter().filter(|c| c.kind == NodeKind::Identifier) {
                    self.local_variable(name.text(), node, None, region);
                }
            }
            NodeKind::Other("for") => {
                if let Some(pattern) = node.child(Field::Pattern) {
                    let targets: Vec<&Arc<SyntaxNode>> = match pattern.kind {
                        NodeKind::Identifier => vec![pattern],
                        _ => pattern
                            .children
                            .iter()
                            .filter(|c| c.kind == NodeKind::Identifier)
                            .collect(),
                    };
                    for target in targets {
                        self.local_variable(target.text(), pattern, None, region);
                    }
                }
                for child in node.children.iter().filter(|c| c.field != Some(Field::Pattern)) {
                    self.process(child, region);
                }
            }
            _ => self.process_children(node, region),
        }
    }

    fn process_children(&mut self, node: &Arc<SyntaxNode>, region: &mut Region) {
        for child in &node.children {
            self.process(child, region);
        }
    }

    fn process_namespace(&mut self, node: &Arc<SyntaxNode>, region: &Region) {
        let Some(name) = node.child(Field::Name).map(|n| n.text()) else {
            return;
        };
        let path = match name.strip_prefix("::") {
            Some(absolute) => absolute.to_string(),
            None => join_path(&region.closure.namespace, name),
        };
        let (parent, short_name) = match path.rsplit_once("::") {
            Some((parent, short)) => (parent.to_string(), short.to_string()),
            None => (String::new(), path.clone()),
        };
        let kind = if node.kind == NodeKind::Module {
            NamespaceKind::Module
        } else {
            NamespaceKind::Class
        };
        let superclass = node
            .child(Field::Superclass)
            .and_then(|s| s.statements().next())
            .filter(|s| matches!(s.kind, NodeKind::Constant | NodeKind::ScopeResolution))
            .map(|s| s.text().to_string());
        let mut gates = Vec::with_capacity(region.gates.len() + 1);
        gates.push(path.clone());
        gates.extend(region.gates.iter().cloned());

        self.pins.push(Pin::new(
            short_name,
            path.clone(),
            PinKind::Namespace {
                kind,
                superclass,
                gates: gates.clone(),
            },
            Closure {
                path: parent.clone(),
                namespace: parent,
                scope: Scope::Class,
            },
            self.location(node.range),
            node.comments.as_deref(),
        ));
        self.hard_scopes.push(node.range);

        let mut inner = Region {
            closure: Closure {
                path: path.clone(),
                namespace: path,
                scope: Scope::Class,
            },
            def_scope: Scope::Instance,
            visibility: Visibility::Public,
            gates,
            hard_scope: node.range,
            presence: node.range,
            namespace_body: true,
        };
        for child in node.statements() {
            self.process(child, &mut inner);
        }
    }

    fn process_singleton_class(&mut self, node: &Arc<SyntaxNode>, region: &Region) {
        if !node.child(Field::Value).is_some_and(|v| v.kind == NodeKind::SelfRef) {
            return;
        }
        self.hard_scopes.push(node.range);
        let mut inner = Region {
            closure: Closure {
                scope: Scope::Class,
                ..region.closure.clone()
            },
            def_scope: Scope::Class,
            visibility: Visibility::Public,
            gates: region.gates.clone(),
            hard_scope: node.range,
            presence: node.range,
            namespace_body: true,
        };
        for child in node.statements() {
            self.process(child, &mut inner);
        }
    }

    fn process_method(&mut self, node: &Arc<SyntaxNode>, region: &Region, scope: Scope) {
        let Some(name) = node.name().map(str::to_string) else {
            return;
        };
        // Top-level definitions become methods of Object.
        let namespace = if region.closure.namespace.is_empty() {
            "Object".to_string()
        } else {
            region.closure.namespace.clone()
        };
        let path = method_path(&namespace, &name, scope);
        let closure = Closure {
            path: path.clone(),
            namespace: namespace.clone(),
            scope,
        };
        let docstring = Docstring::parse(node.comments.as_deref().unwrap_or_default());
        let parameters = match node.child(Field::Parameters) {
            Some(params) => self.parameters(params, &closure, &docstring, node.range, node.range),
            None => Vec::new(),
        };
        let visibility = if name == "initialize" {
            Visibility::Private
        } else {
            region.visibility
        };

        self.pins.push(Pin::new(
            name,
            path,
            PinKind::Method(MethodDetail {
                scope,
                visibility,
                parameters,
                attribute: false,
                node: Some(node.clone()),
            }),
            Closure {
                path: namespace.clone(),
                namespace,
                scope: Scope::Class,
            },
            self.location(node.range),
            node.comments.as_deref(),
        ));
        self.hard_scopes.push(node.range);

        let mut inner = Region {
            closure,
            def_scope: Scope::Instance,
            visibility: Visibility::Public,
            gates: region.gates.clone(),
            hard_scope: node.range,
            presence: node.range,
            namespace_body: false,
        };
        for child in node.statements() {
            self.process(child, &mut inner);
        }
    }

    /// Parameter pins, also registered as locals.
    fn parameters(
        &mut self,
        params: &SyntaxNode,
        closure: &Closure,
        docstring: &Docstring,
        presence: Range,
        hard_scope: Range,
    ) -> Vec<Arc<Pin>> {
        let local = LocalScope {
            presence,
            hard_scope,
            visible_from: presence.start,
        };
        let mut out = Vec::new();
        for (index, param) in params.children.iter().enumerate() {
            let kind = match param.kind {
                NodeKind::RequiredParameter => ParameterKind::Required,
                NodeKind::OptionalParameter => ParameterKind::Optional,
                NodeKind::SplatParameter => ParameterKind::Splat,
                NodeKind::HashSplatParameter => ParameterKind::DoubleSplat,
                NodeKind::BlockParameter => ParameterKind::Block,
                NodeKind::KeywordParameter if param.child(Field::Value).is_some() => {
                    ParameterKind::OptionalKeyword
                }
                NodeKind::KeywordParameter => ParameterKind::Keyword,
                // `|(a, b)|` binds each name.
                NodeKind::Other("destructured_parameter") => {
                    for name in param.children.iter().filter(|c| c.kind == NodeKind::Identifier) {
                        let pin = self.parameter(
                            name.text(),
                            ParameterKind::Required,
                            index,
                            name.range,
                            closure,
                            docstring,
                            local,
                        );
                        out.push(pin);
                    }
                    continue;
                }
                _ => continue,
            };
            let name = if kind == ParameterKind::Required {
                param.text()
            } else {
                param.name().unwrap_or_default()
            };
            if name.is_empty() {
                continue;
            }
            let pin = self.parameter(name, kind, index, param.range, closure, docstring, local);
            out.push(pin);
        }
        out
    }

    fn parameter(
        &mut self,
        name: &str,
        kind: ParameterKind,
        index: usize,
        range: Range,
        closure: &Closure,
        docstring: &Docstring,
        local: LocalScope,
    ) -> Arc<Pin> {
        let pin = Pin::new(
            name,
            name,
            PinKind::Parameter { kind, index, local },
            closure.clone(),
            self.location(range),
            None,
        )
        .with_declared_type(docstring.param_type(name).unwrap_or_default());
        let pin = Arc::new(pin);
        self.locals.push(pin.clone());
        pin
    }

    fn process_block(&mut self, node: &Arc<SyntaxNode>, region: &Region) {
        let mut inner = Region {
            presence: node.range,
            namespace_body: false,
            ..region.clone()
        };
        if let Some(params) = node.child(Field::Parameters) {
            self.parameters(
                params,
                &region.closure,
                &Docstring::default(),
                node.range,
                region.hard_scope,
            );
        }
        for child in node.children.iter().filter(|c| c.field != Some(Field::Parameters)) {
            self.process(child, &mut inner);
        }
    }

    fn process_assignment(&mut self, node: &Arc<SyntaxNode>, region: &mut Region) {
        let right = node.child(Field::Right).cloned();
        if let Some(left) = node.child(Field::Left) {
            match left.kind {
                NodeKind::Identifier => {
                    self.local_variable(left.text(), node, right.clone(), region)
                }
                NodeKind::LeftAssignmentList => {
                    for target in left.children.iter().filter(|c| c.kind == NodeKind::Identifier) {
                        self.local_variable(target.text(), target, None, region);
                    }
                }
                NodeKind::InstanceVariable => self.variable(
                    left.text(),
                    PinKind::InstanceVariable {
                        assignment: right.clone(),
                    },
                    node,
                    region,
                ),
                NodeKind::ClassVariable => self.variable(
                    left.text(),
                    PinKind::ClassVariable {
                        assignment: right.clone(),
                    },
                    node,
                    region,
                ),
                NodeKind::GlobalVariable => self.variable(
                    left.text(),
                    PinKind::GlobalVariable {
                        assignment: right.clone(),
                    },
                    node,
                    region,
                ),
                NodeKind::Constant => {
                    let path = join_path(&region.closure.namespace, left.text());
                    self.pins.push(Pin::new(
                        left.text(),
                        path,
                        PinKind::Constant {
                            assignment: right.clone(),
                        },
                        region.closure.clone(),
                        self.location(node.range),
                        node.comments.as_deref(),
                    ));
                }
                _ => self.process(left, region),
            }
        }
        if let Some(right) = &right {
            self.process(right, region);
        }
    }

    fn local_variable(
        &mut self,
        name: &str,
        node: &SyntaxNode,
        assignment: Option<Arc<SyntaxNode>>,
        region: &Region,
    ) {
        let pin = Pin::new(
            name,
            name,
            PinKind::LocalVariable {
                assignment,
                local: LocalScope {
                    presence: region.presence,
                    hard_scope: region.hard_scope,
                    visible_from: node.range.end,
                },
            },
            region.closure.clone(),
            self.location(node.range),
            node.comments.as_deref(),
        );
        self.locals.push(Arc::new(pin));
    }

    fn variable(&mut self, name: &str, kind: PinKind, node: &SyntaxNode, region: &Region) {
        let path = format!("{}#{}", region.closure.namespace, name);
        self.pins.push(Pin::new(
            name,
            path,
            kind,
            region.closure.clone(),
            self.location(node.range),
            node.comments.as_deref(),
        ));
    }

    fn process_call(&mut self, node: &Arc<SyntaxNode>, region: &mut Region) {
        if region.namespace_body && node.child(Field::Receiver).is_none() {
            let name = node.name().unwrap_or_default();
            let arguments: Vec<Arc<SyntaxNode>> = node
                .child(Field::Arguments)
                .map(|a| a.statements().cloned().collect())
                .unwrap_or_default();
            match name {
                "include" => self.references(&arguments, ReferenceKind::Include, region),
                "extend" => self.references(&arguments, ReferenceKind::Extend, region),
                "prepend" => self.references(&arguments, ReferenceKind::Prepend, region),
                "attr_reader" | "attr_writer" | "attr_accessor" | "attr" => {
                    self.attributes(node, name, &arguments, region);
                }
                "private" | "public" | "protected" => {
                    if let Some(visibility) = visibility_keyword(name) {
                        self.apply_visibility(visibility, &arguments, region);
                        return;
                    }
                }
                _ => {}
            }
        }
        self.process_children(node, region);
    }

    fn references(&mut self, arguments: &[Arc<SyntaxNode>], kind: ReferenceKind, region: &Region) {
        for argument in arguments {
            if !matches!(argument.kind, NodeKind::Constant | NodeKind::ScopeResolution) {
                continue;
            }
            self.pins.push(Pin::new(
                argument.text(),
                argument.text(),
                PinKind::Reference {
                    kind,
                    gates: region.gates.clone(),
                },
                region.closure.clone(),
                self.location(argument.range),
                None,
            ));
        }
    }

    fn attributes(
        &mut self,
        node: &SyntaxNode,
        call: &str,
        arguments: &[Arc<SyntaxNode>],
        region: &Region,
    ) {
        let reader = call != "attr_writer";
        let writer = call == "attr_writer" || call == "attr_accessor";
        let comments = node.comments.as_deref();
        let docstring = Docstring::parse(comments.unwrap_or_default());
        let namespace = &region.closure.namespace;

        for argument in arguments {
            if !matches!(argument.kind, NodeKind::Symbol | NodeKind::String) {
                continue;
            }
            let name = symbol_name(argument.text());
            if name.is_empty() {
                continue;
            }
            let scope = region.def_scope;
            if reader {
                let pin = self.attribute_pin(
                    name.to_string(),
                    scope,
                    Vec::new(),
                    region,
                    argument.range,
                    comments,
                );
                self.pins.push(pin);
            }
            if writer {
                let setter = format!("{name}=");
                let closure = Closure {
                    path: method_path(namespace, &setter, scope),
                    namespace: namespace.clone(),
                    scope,
                };
                let value = Pin::new(
                    "value",
                    "value",
                    PinKind::Parameter {
                        kind: ParameterKind::Required,
                        index: 0,
                        local: LocalScope {
                            presence: argument.range,
                            hard_scope: argument.range,
                            visible_from: argument.range.start,
                        },
                    },
                    closure,
                    self.location(argument.range),
                    None,
                )
                .with_declared_type(docstring.return_type().unwrap_or_default());
                let pin = self.attribute_pin(
                    setter,
                    scope,
                    vec![Arc::new(value)],
                    region,
                    argument.range,
                    comments,
                );
                self.pins.push(pin);
            }
        }
    }

    fn attribute_pin(
        &self,
        name: String,
        scope: Scope,
        parameters: Vec<Arc<Pin>>,
        region: &Region,
        range: Range,
        comments: Option<&str>,
    ) -> Pin {
        let path = method_path(&region.closure.namespace, &name, scope);
        Pin::new(
            name,
            path,
            PinKind::Method(MethodDetail {
                scope,
                visibility: region.visibility,
                parameters,
                attribute: true,
                node: None,
            }),
            region.closure.clone(),
            self.location(range),
            comments,
        )
    }

    /// `private` with no arguments changes the default for later
    /// definitions; with symbols it changes existing methods; with a `def`
    /// it defines a method with that visibility.
    fn apply_visibility(
        &mut self,
        visibility: Visibility,
        arguments: &[Arc<SyntaxNode>],
        region: &mut Region,
    ) {
        if arguments.is_empty() {
            region.visibility = visibility;
            return;
        }
        for argument in arguments {
            match argument.kind {
                NodeKind::Symbol | NodeKind::String => {
                    let name = symbol_name(argument.text());
                    let namespace = region.closure.namespace.as_str();
                    for pin in self.pins.iter_mut().rev() {
                        if pin.name == name
                            && pin.closure.namespace == namespace
                            && let PinKind::Method(detail) = &mut pin.kind
                            && detail.scope == region.def_scope
                        {
                            detail.visibility = visibility;
                            break;
                        }
                    }
                }
                _ => {
                    let mut scoped = Region {
                        visibility,
                        ..region.clone()
                    };
                    self.process(argument, &mut scoped);
                }
            }
        }
    }
}

fn visibility_keyword(name: &str) -> Option<Visibility> {
    match name {
        "public" => Some(Visibility::Public),
        "protected" => Some(Visibility::Protected),
        "private" => Some(Visibility::Private),
        _ => None,
    }
}

/// `:foo`, `"foo"` and `'foo'` all name `foo`.
fn symbol_name(text: &str) -> &str {
    text.trim_start_matches(':').trim_matches(|c| c == '"' || c == '\'')
}

/// Type of a literal node, or `None` when the node is not a literal.
pub(crate) fn literal_type(node: &SyntaxNode) -> Option<ComplexType> {
    let name = match node.kind {
        NodeKind::String => "String",
        NodeKind::Symbol => "Symbol",
        NodeKind::Integer => "Integer",
        NodeKind::Float => "Float",
        NodeKind::Array => "Array",
        NodeKind::Hash => "Hash",
        NodeKind::True | NodeKind::False => "Boolean",
        NodeKind::Nil => "NilClass",
        NodeKind::Regex => "Regexp",
        NodeKind::Range => "Range",
        NodeKind::Lambda => "Proc",
        _ => return None,
    };
    Some(ComplexType::from_name(name))
}
