//! JSX/Script Lowering for the widget compiler
//!
//! Walks an oxc AST and produces the owned [`crate::ir`] program. JSX
//! elements become pragma calls in the classic form
//! `factory(tag, props | null, ...children)`; fragments pass the fragment
//! factory as the tag. Syntax outside the view language lowers to
//! `Unsupported` nodes that throw when executed.

use crate::ir::{
    ArrayItem, AssignTarget, BinaryOp, DeclKind, Expr, FunctionBody, FunctionDef, Literal,
    LogicalOp, MemberKey, Pattern, Program, PropItem, PropKey, Stmt, UnaryOp,
};
use oxc_ast::ast::*;
use oxc_syntax::operator::{
    AssignmentOperator, BinaryOperator, LogicalOperator, UnaryOperator, UpdateOperator,
};
use std::rc::Rc;

// ═══════════════════════════════════════════════════════════════════════════════
// JSX LOWERER
// Transforms JSX elements into pragma calls and the rest of the AST into IR
// ═══════════════════════════════════════════════════════════════════════════════

pub struct JsxLowerer {
    jsx_factory: String,
    fragment_factory: String,
}

impl JsxLowerer {
    pub fn new(jsx_factory: &str, fragment_factory: &str) -> Self {
        Self {
            jsx_factory: jsx_factory.to_string(),
            fragment_factory: fragment_factory.to_string(),
        }
    }

    pub fn lower_program(&self, program: &oxc_ast::ast::Program<'_>) -> Program {
        Program {
            body: self.lower_statements(&program.body),
        }
    }

    fn lower_jsx_element(&self, element: &JSXElement<'_>) -> Expr {
        let tag = self.get_tag_name(&element.opening_element.name);

        let mut props = Vec::new();
        for item in &element.opening_element.attributes {
            match item {
                JSXAttributeItem::Attribute(attr) => {
                    let name = match &attr.name {
                        JSXAttributeName::Identifier(id) => id.name.to_string(),
                        JSXAttributeName::NamespacedName(ns) => {
                            format!("{}:{}", ns.namespace.name, ns.name.name)
                        }
                    };

                    let value = match &attr.value {
                        Some(JSXAttributeValue::StringLiteral(s)) => {
                            Expr::Literal(Literal::String(decode_entities(&s.value)))
                        }
                        Some(JSXAttributeValue::Element(el)) => self.lower_jsx_element(el),
                        Some(JSXAttributeValue::ExpressionContainer(container)) => {
                            match container.expression.as_expression() {
                                Some(e) => self.lower_expression(e),
                                None => Expr::Literal(Literal::Undefined),
                            }
                        }
                        Some(JSXAttributeValue::Fragment(frag)) => self.lower_jsx_fragment(frag),
                        None => Expr::Literal(Literal::Bool(true)),
                    };

                    props.push(PropItem::Property {
                        key: PropKey::Static(name),
                        value,
                    });
                }
                JSXAttributeItem::SpreadAttribute(spread) => {
                    props.push(PropItem::Spread(self.lower_expression(&spread.argument)));
                }
            }
        }

        let props_expr = if props.is_empty() {
            Expr::null()
        } else {
            Expr::Object(props)
        };

        let mut arguments = vec![ArrayItem::Expr(tag), ArrayItem::Expr(props_expr)];
        arguments.extend(self.lower_jsx_children(&element.children));
        self.pragma_call(arguments)
    }

    fn lower_jsx_fragment(&self, fragment: &JSXFragment<'_>) -> Expr {
        let mut arguments = vec![
            ArrayItem::Expr(Expr::Ident(self.fragment_factory.clone())),
            ArrayItem::Expr(Expr::null()),
        ];
        arguments.extend(self.lower_jsx_children(&fragment.children));
        self.pragma_call(arguments)
    }

    fn lower_jsx_children(&self, children: &[JSXChild<'_>]) -> Vec<ArrayItem> {
        let mut out = Vec::new();
        for child in children {
            match child {
                JSXChild::Text(t) => {
                    if let Some(text) = clean_jsx_text(&t.value) {
                        out.push(ArrayItem::Expr(Expr::Literal(Literal::String(text))));
                    }
                }
                JSXChild::Element(el) => out.push(ArrayItem::Expr(self.lower_jsx_element(el))),
                JSXChild::Fragment(frag) => {
                    out.push(ArrayItem::Expr(self.lower_jsx_fragment(frag)))
                }
                JSXChild::ExpressionContainer(container) => {
                    if let Some(e) = self.lower_jsx_expression(&container.expression) {
                        out.push(ArrayItem::Expr(e));
                    }
                }
                JSXChild::Spread(spread) => {
                    out.push(ArrayItem::Spread(self.lower_expression(&spread.expression)));
                }
            }
        }
        out
    }

    fn pragma_call(&self, arguments: Vec<ArrayItem>) -> Expr {
        Expr::Call {
            callee: Box::new(Expr::Ident(self.jsx_factory.clone())),
            arguments,
            optional: false,
        }
    }

    /// Intrinsic tags (lowercase or dashed) become strings, anything else a reference.
    fn get_tag_name(&self, name: &JSXElementName<'_>) -> Expr {
        match name {
            JSXElementName::Identifier(id) => Expr::string(&id.name),
            JSXElementName::IdentifierReference(id) => Expr::Ident(id.name.to_string()),
            JSXElementName::NamespacedName(ns) => {
                Expr::string(&format!("{}:{}", ns.namespace.name, ns.name.name))
            }
            JSXElementName::MemberExpression(me) => self.get_member_name(me),
            JSXElementName::ThisExpression(_) => Expr::This,
        }
    }

    fn get_member_name(&self, me: &JSXMemberExpression<'_>) -> Expr {
        let object = match &me.object {
            JSXMemberExpressionObject::IdentifierReference(id) => Expr::Ident(id.name.to_string()),
            JSXMemberExpressionObject::MemberExpression(inner) => self.get_member_name(inner),
            JSXMemberExpressionObject::ThisExpression(_) => Expr::This,
        };
        Expr::member(object, &me.property.name)
    }

    fn lower_jsx_expression(&self, jsx_expr: &JSXExpression<'_>) -> Option<Expr> {
        jsx_expr.as_expression().map(|e| self.lower_expression(e))
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // STATEMENTS
    // ═══════════════════════════════════════════════════════════════════════════

    fn lower_statements(&self, statements: &[Statement<'_>]) -> Vec<Stmt> {
        statements
            .iter()
            .map(|s| self.lower_statement(s))
            .collect()
    }

    fn lower_statement(&self, stmt: &Statement<'_>) -> Stmt {
        match stmt {
            Statement::BlockStatement(block) => Stmt::Block(self.lower_statements(&block.body)),
            Statement::BreakStatement(b) if b.label.is_none() => Stmt::Break,
            Statement::ContinueStatement(c) if c.label.is_none() => Stmt::Continue,
            Statement::EmptyStatement(_) | Statement::DebuggerStatement(_) => Stmt::Empty,
            Statement::ExpressionStatement(e) => Stmt::Expr(self.lower_expression(&e.expression)),
            Statement::IfStatement(i) => Stmt::If {
                test: self.lower_expression(&i.test),
                consequent: Box::new(self.lower_statement(&i.consequent)),
                alternate: i
                    .alternate
                    .as_ref()
                    .map(|alt| Box::new(self.lower_statement(alt))),
            },
            Statement::ReturnStatement(r) => {
                Stmt::Return(r.argument.as_ref().map(|a| self.lower_expression(a)))
            }
            Statement::ThrowStatement(t) => Stmt::Throw(self.lower_expression(&t.argument)),
            Statement::TryStatement(t) => Stmt::Try {
                block: self.lower_statements(&t.block.body),
                param: t
                    .handler
                    .as_ref()
                    .and_then(|h| h.param.as_ref())
                    .map(|p| self.lower_pattern(&p.pattern)),
                handler: t
                    .handler
                    .as_ref()
                    .map(|h| self.lower_statements(&h.body.body)),
                finalizer: t
                    .finalizer
                    .as_ref()
                    .map(|f| self.lower_statements(&f.body)),
            },
            Statement::WithStatement(w) => Stmt::With {
                object: self.lower_expression(&w.object),
                body: Box::new(self.lower_statement(&w.body)),
            },
            Statement::ForOfStatement(f) if !f.r#await => self.lower_for_of(f),
            Statement::VariableDeclaration(decl) => self.lower_variable_declaration(decl),
            Statement::FunctionDeclaration(func) => match self.lower_function(func) {
                Some(def) => Stmt::Function(Rc::new(def)),
                None => Stmt::Unsupported("Unsupported function declaration".to_string()),
            },
            Statement::TSTypeAliasDeclaration(_) | Statement::TSInterfaceDeclaration(_) => {
                Stmt::Empty
            }
            _ => Stmt::Unsupported("Unsupported statement in view source".to_string()),
        }
    }

    fn lower_for_of(&self, stmt: &ForOfStatement<'_>) -> Stmt {
        let (kind, target) = match &stmt.left {
            ForStatementLeft::VariableDeclaration(decl) => match decl.declarations.first() {
                Some(declarator) => (
                    decl_kind(decl.kind),
                    self.lower_pattern(&declarator.id),
                ),
                None => return Stmt::Unsupported("Empty for...of binding".to_string()),
            },
            ForStatementLeft::AssignmentTargetIdentifier(id) => {
                (None, Pattern::Ident(id.name.to_string()))
            }
            _ => return Stmt::Unsupported("Unsupported for...of target".to_string()),
        };
        Stmt::ForOf {
            kind,
            target,
            iterable: self.lower_expression(&stmt.right),
            body: Box::new(self.lower_statement(&stmt.body)),
        }
    }

    fn lower_variable_declaration(&self, decl: &VariableDeclaration<'_>) -> Stmt {
        let Some(kind) = decl_kind(decl.kind) else {
            return Stmt::Unsupported("Unsupported declaration kind".to_string());
        };
        Stmt::Decl {
            kind,
            declarations: decl
                .declarations
                .iter()
                .map(|d| {
                    (
                        self.lower_pattern(&d.id),
                        d.init.as_ref().map(|init| self.lower_expression(init)),
                    )
                })
                .collect(),
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // FUNCTIONS & PATTERNS
    // ═══════════════════════════════════════════════════════════════════════════

    fn lower_function(&self, func: &Function<'_>) -> Option<FunctionDef> {
        if func.generator || func.r#async {
            return None;
        }
        let (params, rest) = self.lower_params(&func.params);
        let body = func
            .body
            .as_ref()
            .map(|b| self.lower_statements(&b.statements))
            .unwrap_or_default();
        Some(FunctionDef {
            name: func.id.as_ref().map(|id| id.name.to_string()),
            params,
            rest,
            body: FunctionBody::Block(body),
            arrow: false,
        })
    }

    fn lower_arrow(&self, arrow: &ArrowFunctionExpression<'_>) -> Option<FunctionDef> {
        if arrow.r#async {
            return None;
        }
        let (params, rest) = self.lower_params(&arrow.params);
        let body = if arrow.expression {
            // Expression bodies are stored as a single expression statement.
            match arrow.body.statements.first() {
                Some(Statement::ExpressionStatement(e)) => {
                    FunctionBody::Expr(self.lower_expression(&e.expression))
                }
                _ => FunctionBody::Block(self.lower_statements(&arrow.body.statements)),
            }
        } else {
            FunctionBody::Block(self.lower_statements(&arrow.body.statements))
        };
        Some(FunctionDef {
            name: None,
            params,
            rest,
            body,
            arrow: true,
        })
    }

    fn lower_params(&self, params: &FormalParameters<'_>) -> (Vec<Pattern>, Option<Pattern>) {
        let items = params
            .items
            .iter()
            .map(|param| {
                let pattern = self.lower_pattern(&param.pattern);
                match &param.initializer {
                    Some(init) => Pattern::Default {
                        target: Box::new(pattern),
                        default: self.lower_expression(init),
                    },
                    None => pattern,
                }
            })
            .collect();
        let rest = params
            .rest
            .as_ref()
            .map(|r| self.lower_pattern(&r.rest.argument));
        (items, rest)
    }

    fn lower_pattern(&self, pattern: &BindingPattern<'_>) -> Pattern {
        match pattern {
            BindingPattern::BindingIdentifier(id) => Pattern::Ident(id.name.to_string()),
            BindingPattern::ObjectPattern(obj) => Pattern::Object {
                properties: obj
                    .properties
                    .iter()
                    .map(|p| {
                        (
                            self.lower_property_key(&p.key, p.computed),
                            self.lower_pattern(&p.value),
                        )
                    })
                    .collect(),
                rest: obj
                    .rest
                    .as_ref()
                    .map(|r| Box::new(self.lower_pattern(&r.argument))),
            },
            BindingPattern::ArrayPattern(arr) => Pattern::Array {
                elements: arr
                    .elements
                    .iter()
                    .map(|el| el.as_ref().map(|p| self.lower_pattern(p)))
                    .collect(),
                rest: arr
                    .rest
                    .as_ref()
                    .map(|r| Box::new(self.lower_pattern(&r.argument))),
            },
            BindingPattern::AssignmentPattern(assign) => Pattern::Default {
                target: Box::new(self.lower_pattern(&assign.left)),
                default: self.lower_expression(&assign.right),
            },
        }
    }

    fn lower_property_key(&self, key: &PropertyKey<'_>, computed: bool) -> PropKey {
        if !computed {
            if let Some(name) = key.static_name() {
                return PropKey::Static(name.into_owned());
            }
        }
        match key.as_expression() {
            Some(e) => PropKey::Computed(self.lower_expression(e)),
            None => PropKey::Static(String::new()),
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // EXPRESSIONS
    // ═══════════════════════════════════════════════════════════════════════════

    pub fn lower_expression(&self, expr: &Expression<'_>) -> Expr {
        match expr {
            Expression::BooleanLiteral(b) => Expr::Literal(Literal::Bool(b.value)),
            Expression::NullLiteral(_) => Expr::null(),
            Expression::NumericLiteral(n) => Expr::Literal(Literal::Number(n.value)),
            Expression::StringLiteral(s) => Expr::string(&s.value),
            Expression::TemplateLiteral(t) => Expr::Template {
                quasis: t
                    .quasis
                    .iter()
                    .map(|q| match &q.value.cooked {
                        Some(cooked) => cooked.to_string(),
                        None => q.value.raw.to_string(),
                    })
                    .collect(),
                expressions: t
                    .expressions
                    .iter()
                    .map(|e| self.lower_expression(e))
                    .collect(),
            },
            Expression::Identifier(id) => Expr::Ident(id.name.to_string()),
            Expression::ThisExpression(_) => Expr::This,
            Expression::ArrayExpression(arr) => Expr::Array(
                arr.elements
                    .iter()
                    .map(|el| match el {
                        ArrayExpressionElement::SpreadElement(s) => {
                            ArrayItem::Spread(self.lower_expression(&s.argument))
                        }
                        ArrayExpressionElement::Elision(_) => ArrayItem::Hole,
                        _ => match el.as_expression() {
                            Some(e) => ArrayItem::Expr(self.lower_expression(e)),
                            None => ArrayItem::Hole,
                        },
                    })
                    .collect(),
            ),
            Expression::ObjectExpression(obj) => Expr::Object(
                obj.properties
                    .iter()
                    .map(|prop| match prop {
                        ObjectPropertyKind::ObjectProperty(p) => {
                            let value = if matches!(p.kind, PropertyKind::Init) {
                                self.lower_expression(&p.value)
                            } else {
                                Expr::Unsupported("Accessor properties are not supported".to_string())
                            };
                            PropItem::Property {
                                key: self.lower_property_key(&p.key, p.computed),
                                value,
                            }
                        }
                        ObjectPropertyKind::SpreadProperty(s) => {
                            PropItem::Spread(self.lower_expression(&s.argument))
                        }
                    })
                    .collect(),
            ),
            Expression::ArrowFunctionExpression(arrow) => match self.lower_arrow(arrow) {
                Some(def) => Expr::Function(Rc::new(def)),
                None => Expr::Unsupported("Async functions are not supported".to_string()),
            },
            Expression::FunctionExpression(func) => match self.lower_function(func) {
                Some(def) => Expr::Function(Rc::new(def)),
                None => Expr::Unsupported(
                    "Async and generator functions are not supported".to_string(),
                ),
            },
            Expression::CallExpression(call) => self.lower_call(call),
            Expression::NewExpression(new) => Expr::New {
                callee: Box::new(self.lower_expression(&new.callee)),
                arguments: self.lower_arguments(&new.arguments),
            },
            Expression::StaticMemberExpression(m) => self.lower_static_member(m),
            Expression::ComputedMemberExpression(m) => self.lower_computed_member(m),
            Expression::ChainExpression(chain) => {
                Expr::Chain(Box::new(self.lower_chain_element(&chain.expression)))
            }
            Expression::ConditionalExpression(c) => Expr::Conditional {
                test: Box::new(self.lower_expression(&c.test)),
                consequent: Box::new(self.lower_expression(&c.consequent)),
                alternate: Box::new(self.lower_expression(&c.alternate)),
            },
            Expression::LogicalExpression(l) => Expr::Logical {
                op: match l.operator {
                    LogicalOperator::And => LogicalOp::And,
                    LogicalOperator::Or => LogicalOp::Or,
                    LogicalOperator::Coalesce => LogicalOp::Coalesce,
                },
                left: Box::new(self.lower_expression(&l.left)),
                right: Box::new(self.lower_expression(&l.right)),
            },
            Expression::BinaryExpression(b) => Expr::Binary {
                op: binary_op(b.operator),
                left: Box::new(self.lower_expression(&b.left)),
                right: Box::new(self.lower_expression(&b.right)),
            },
            Expression::UnaryExpression(u) => Expr::Unary {
                op: match u.operator {
                    UnaryOperator::UnaryPlus => UnaryOp::Plus,
                    UnaryOperator::UnaryNegation => UnaryOp::Minus,
                    UnaryOperator::LogicalNot => UnaryOp::Not,
                    UnaryOperator::BitwiseNot => UnaryOp::BitNot,
                    UnaryOperator::Typeof => UnaryOp::TypeOf,
                    UnaryOperator::Void => UnaryOp::Void,
                    UnaryOperator::Delete => UnaryOp::Delete,
                },
                argument: Box::new(self.lower_expression(&u.argument)),
            },
            Expression::UpdateExpression(u) => match self.lower_simple_target(&u.argument) {
                Some(target) => Expr::Update {
                    increment: matches!(u.operator, UpdateOperator::Increment),
                    prefix: u.prefix,
                    target: Box::new(target),
                },
                None => Expr::Unsupported("Invalid update target".to_string()),
            },
            Expression::AssignmentExpression(a) => self.lower_assignment(a),
            Expression::SequenceExpression(s) => Expr::Sequence(
                s.expressions
                    .iter()
                    .map(|e| self.lower_expression(e))
                    .collect(),
            ),
            Expression::ParenthesizedExpression(p) => self.lower_expression(&p.expression),
            Expression::JSXElement(el) => self.lower_jsx_element(el),
            Expression::JSXFragment(frag) => self.lower_jsx_fragment(frag),
            Expression::TSAsExpression(e) => self.lower_expression(&e.expression),
            Expression::TSSatisfiesExpression(e) => self.lower_expression(&e.expression),
            Expression::TSTypeAssertion(e) => self.lower_expression(&e.expression),
            Expression::TSNonNullExpression(e) => self.lower_expression(&e.expression),
            Expression::TSInstantiationExpression(e) => self.lower_expression(&e.expression),
            _ => Expr::Unsupported("Unsupported expression in view source".to_string()),
        }
    }

    fn lower_call(&self, call: &CallExpression<'_>) -> Expr {
        Expr::Call {
            callee: Box::new(self.lower_expression(&call.callee)),
            arguments: self.lower_arguments(&call.arguments),
            optional: call.optional,
        }
    }

    fn lower_static_member(&self, m: &StaticMemberExpression<'_>) -> Expr {
        Expr::Member {
            object: Box::new(self.lower_expression(&m.object)),
            property: MemberKey::Static(m.property.name.to_string()),
            optional: m.optional,
        }
    }

    fn lower_computed_member(&self, m: &ComputedMemberExpression<'_>) -> Expr {
        Expr::Member {
            object: Box::new(self.lower_expression(&m.object)),
            property: MemberKey::Computed(Box::new(self.lower_expression(&m.expression))),
            optional: m.optional,
        }
    }

    fn lower_chain_element(&self, element: &ChainElement<'_>) -> Expr {
        match element {
            ChainElement::CallExpression(call) => self.lower_call(call),
            ChainElement::TSNonNullExpression(e) => self.lower_expression(&e.expression),
            ChainElement::StaticMemberExpression(m) => self.lower_static_member(m),
            ChainElement::ComputedMemberExpression(m) => self.lower_computed_member(m),
            _ => Expr::Unsupported("Private fields are not supported".to_string()),
        }
    }

    fn lower_arguments(&self, arguments: &[Argument<'_>]) -> Vec<ArrayItem> {
        arguments
            .iter()
            .map(|arg| match arg {
                Argument::SpreadElement(s) => ArrayItem::Spread(self.lower_expression(&s.argument)),
                _ => match arg.as_expression() {
                    Some(e) => ArrayItem::Expr(self.lower_expression(e)),
                    None => ArrayItem::Hole,
                },
            })
            .collect()
    }

    fn lower_assignment(&self, assign: &AssignmentExpression<'_>) -> Expr {
        let op = match assign.operator {
            AssignmentOperator::Assign => None,
            AssignmentOperator::Addition => Some(BinaryOp::Add),
            AssignmentOperator::Subtraction => Some(BinaryOp::Sub),
            AssignmentOperator::Multiplication => Some(BinaryOp::Mul),
            AssignmentOperator::Division => Some(BinaryOp::Div),
            AssignmentOperator::Remainder => Some(BinaryOp::Rem),
            AssignmentOperator::Exponential => Some(BinaryOp::Exp),
            AssignmentOperator::ShiftLeft => Some(BinaryOp::Shl),
            AssignmentOperator::ShiftRight => Some(BinaryOp::Shr),
            AssignmentOperator::ShiftRightZeroFill => Some(BinaryOp::UShr),
            AssignmentOperator::BitwiseOR => Some(BinaryOp::BitOr),
            AssignmentOperator::BitwiseXOR => Some(BinaryOp::BitXor),
            AssignmentOperator::BitwiseAnd => Some(BinaryOp::BitAnd),
            _ => {
                return Expr::Unsupported("Logical assignment is not supported".to_string())
            }
        };
        let target = match &assign.left {
            AssignmentTarget::AssignmentTargetIdentifier(id) => {
                AssignTarget::Ident(id.name.to_string())
            }
            AssignmentTarget::StaticMemberExpression(m) => AssignTarget::Member {
                object: self.lower_expression(&m.object),
                property: MemberKey::Static(m.property.name.to_string()),
            },
            AssignmentTarget::ComputedMemberExpression(m) => AssignTarget::Member {
                object: self.lower_expression(&m.object),
                property: MemberKey::Computed(Box::new(self.lower_expression(&m.expression))),
            },
            _ => return Expr::Unsupported("Destructuring assignment is not supported".to_string()),
        };
        Expr::Assign {
            op,
            target: Box::new(target),
            value: Box::new(self.lower_expression(&assign.right)),
        }
    }

    fn lower_simple_target(&self, target: &SimpleAssignmentTarget<'_>) -> Option<AssignTarget> {
        match target {
            SimpleAssignmentTarget::AssignmentTargetIdentifier(id) => {
                Some(AssignTarget::Ident(id.name.to_string()))
            }
            SimpleAssignmentTarget::StaticMemberExpression(m) => Some(AssignTarget::Member {
                object: self.lower_expression(&m.object),
                property: MemberKey::Static(m.property.name.to_string()),
            }),
            SimpleAssignmentTarget::ComputedMemberExpression(m) => Some(AssignTarget::Member {
                object: self.lower_expression(&m.object),
                property: MemberKey::Computed(Box::new(self.lower_expression(&m.expression))),
            }),
            _ => None,
        }
    }
}

fn decl_kind(kind: VariableDeclarationKind) -> Option<DeclKind> {
    match kind {
        VariableDeclarationKind::Var => Some(DeclKind::Var),
        VariableDeclarationKind::Let => Some(DeclKind::Let),
        VariableDeclarationKind::Const => Some(DeclKind::Const),
        _ => None,
    }
}

fn binary_op(op: BinaryOperator) -> BinaryOp {
    match op {
        BinaryOperator::Equality => BinaryOp::Eq,
        BinaryOperator::Inequality => BinaryOp::NotEq,
        BinaryOperator::StrictEquality => BinaryOp::StrictEq,
        BinaryOperator::StrictInequality => BinaryOp::StrictNotEq,
        BinaryOperator::LessThan => BinaryOp::Lt,
        BinaryOperator::LessEqualThan => BinaryOp::LtEq,
        BinaryOperator::GreaterThan => BinaryOp::Gt,
        BinaryOperator::GreaterEqualThan => BinaryOp::GtEq,
        BinaryOperator::Addition => BinaryOp::Add,
        BinaryOperator::Subtraction => BinaryOp::Sub,
        BinaryOperator::Multiplication => BinaryOp::Mul,
        BinaryOperator::Division => BinaryOp::Div,
        BinaryOperator::Remainder => BinaryOp::Rem,
        BinaryOperator::Exponential => BinaryOp::Exp,
        BinaryOperator::ShiftLeft => BinaryOp::Shl,
        BinaryOperator::ShiftRight => BinaryOp::Shr,
        BinaryOperator::ShiftRightZeroFill => BinaryOp::UShr,
        BinaryOperator::BitwiseOR => BinaryOp::BitOr,
        BinaryOperator::BitwiseXOR => BinaryOp::BitXor,
        BinaryOperator::BitwiseAnd => BinaryOp::BitAnd,
        BinaryOperator::In => BinaryOp::In,
        BinaryOperator::Instanceof => BinaryOp::InstanceOf,
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// JSX TEXT
// ═══════════════════════════════════════════════════════════════════════════════

/// Applies the classic JSX whitespace rules: lines are trimmed (except the
/// outer edges of the first and last line), blank lines dropped, and the rest
/// joined with single spaces. Returns `None` when nothing remains.
pub(crate) fn clean_jsx_text(raw: &str) -> Option<String> {
    let lines: Vec<&str> = raw.split('\n').collect();
    let last = lines.len() - 1;
    let mut parts: Vec<String> = Vec::new();

    for (i, line) in lines.iter().enumerate() {
        let line = line.trim_end_matches('\r');
        let mut text = line.replace('\t', " ");
        if i != 0 {
            text = text.trim_start().to_string();
        }
        if i != last {
            text = text.trim_end().to_string();
        }
        if !text.is_empty() {
            parts.push(text);
        }
    }

    if parts.is_empty() {
        None
    } else {
        Some(decode_entities(&parts.join(" ")))
    }
}

pub(crate) fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find('&') {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];
        let decoded = tail.find(';').filter(|end| *end <= 10).and_then(|end| {
            let entity = &tail[1..end];
            let ch = match entity {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                "nbsp" => Some('\u{a0}'),
                _ => entity
                    .strip_prefix("#x")
                    .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                    .or_else(|| entity.strip_prefix('#').and_then(|dec| dec.parse().ok()))
                    .and_then(char::from_u32),
            };
            ch.map(|c| (c, end))
        });
        match decoded {
            Some((c, end)) => {
                out.push(c);
                rest = &tail[end + 1..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}
