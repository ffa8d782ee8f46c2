//! Tree-walking evaluator for view programs.
//!
//! Identifier resolution walks an explicit scope chain. Declarative frames
//! hold `let`/`const`/parameter bindings; object frames created by `with`
//! resolve a name when the object owns that key. This is how bare state
//! field names become visible inside the render harness.

use crate::builtins;
use crate::ir::{
    ArrayItem, AssignTarget, BinaryOp, DeclKind, Expr, FunctionBody, FunctionDef, Literal,
    LogicalOp, MemberKey, Pattern, Program, PropItem, PropKey, Stmt, UnaryOp,
};
use crate::value::{
    check_string_length, number_to_string, Exception, Function, PropertyMap, Value,
    MAX_STRING_LENGTH,
};
use indexmap::IndexMap;
use std::cell::RefCell;
use std::cmp::Ordering;
use std::rc::Rc;

pub const MAX_CALL_DEPTH: usize = 128;
const THIS_BINDING: &str = "this";

// ═══════════════════════════════════════════════════════════════════════════════
// SCOPES
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Clone)]
pub struct Scope(Rc<Frame>);

struct Frame {
    kind: FrameKind,
    parent: Option<Scope>,
}

enum FrameKind {
    Declarative {
        bindings: RefCell<IndexMap<String, Binding>>,
        function: bool,
    },
    With(Value),
}

struct Binding {
    value: Value,
    mutable: bool,
}

impl Scope {
    pub fn root() -> Self {
        Scope(Rc::new(Frame {
            kind: FrameKind::Declarative {
                bindings: RefCell::new(IndexMap::new()),
                function: true,
            },
            parent: None,
        }))
    }

    pub fn child(&self, function: bool) -> Self {
        Scope(Rc::new(Frame {
            kind: FrameKind::Declarative {
                bindings: RefCell::new(IndexMap::new()),
                function,
            },
            parent: Some(self.clone()),
        }))
    }

    pub fn with_object(&self, object: Value) -> Self {
        Scope(Rc::new(Frame {
            kind: FrameKind::With(object),
            parent: Some(self.clone()),
        }))
    }

    /// Declares on the nearest declarative frame, shadowing outer bindings.
    pub fn declare(&self, name: &str, value: Value, mutable: bool) {
        let mut current = Some(self);
        while let Some(scope) = current {
            if let FrameKind::Declarative { bindings, .. } = &scope.0.kind {
                bindings
                    .borrow_mut()
                    .insert(name.to_string(), Binding { value, mutable });
                return;
            }
            current = scope.0.parent.as_ref();
        }
    }

    /// Nearest frame that belongs to a function body (target of `var`).
    fn function_scope(&self) -> Scope {
        let mut current = self.clone();
        loop {
            if let FrameKind::Declarative { function: true, .. } = current.0.kind {
                return current;
            }
            match current.0.parent.clone() {
                Some(parent) => current = parent,
                None => return current,
            }
        }
    }

    pub fn lookup(&self, name: &str) -> Option<Value> {
        self.resolve(name).map(|(value, _)| value)
    }

    /// Like [`Scope::lookup`], also returning the `with` object the name was
    /// found on. Calls through such a name use that object as `this`.
    pub fn resolve(&self, name: &str) -> Option<(Value, Option<Value>)> {
        let mut current = Some(self);
        while let Some(scope) = current {
            match &scope.0.kind {
                FrameKind::Declarative { bindings, .. } => {
                    if let Some(binding) = bindings.borrow().get(name) {
                        return Some((binding.value.clone(), None));
                    }
                }
                FrameKind::With(object) => {
                    if let Some(value) =
                        own_property(object, name).or_else(|| inherited_property(object, name))
                    {
                        return Some((value, Some(object.clone())));
                    }
                }
            }
            current = scope.0.parent.as_ref();
        }
        None
    }

    /// Drops every binding of a declarative frame.
    fn clear(&self) {
        if let FrameKind::Declarative { bindings, .. } = &self.0.kind {
            let drained: Vec<Binding> = bindings.borrow_mut().drain(..).map(|(_, b)| b).collect();
            drop(drained);
        }
    }

    /// Returns `Ok(false)` when no binding with `name` exists.
    fn assign(&self, name: &str, value: Value) -> Result<bool, Exception> {
        let mut current = Some(self);
        while let Some(scope) = current {
            match &scope.0.kind {
                FrameKind::Declarative { bindings, .. } => {
                    if let Some(binding) = bindings.borrow_mut().get_mut(name) {
                        if !binding.mutable {
                            return Err(Exception::type_error("Assignment to constant variable."));
                        }
                        binding.value = value;
                        return Ok(true);
                    }
                }
                FrameKind::With(object) => {
                    if let Value::Object(map) = object {
                        if let Some(slot) = map.borrow_mut().get_mut(name) {
                            *slot = value;
                            return Ok(true);
                        }
                    }
                }
            }
            current = scope.0.parent.as_ref();
        }
        Ok(false)
    }
}

fn own_property(object: &Value, name: &str) -> Option<Value> {
    match object {
        Value::Object(map) => map.borrow().get(name).cloned(),
        Value::Array(items) => {
            let items = items.borrow();
            if name == "length" {
                return Some(Value::Number(items.len() as f64));
            }
            array_index(name).and_then(|i| items.get(i).cloned())
        }
        _ => None,
    }
}

/// Array indices stop one short of the largest array length.
const MAX_ARRAY_INDEX: usize = u32::MAX as usize;

/// Most elements an array may hold. Arrays are dense, so lengths that are
/// valid but larger than this fail instead of allocating.
pub(crate) const MAX_DENSE_ARRAY_LENGTH: usize = 1 << 22;

/// Validates an array length, failing with `RangeError` like an engine would
/// or when the dense backing store would grow past its limit.
pub(crate) fn dense_array_length(len: f64) -> Result<usize, Exception> {
    if !(0.0..=u32::MAX as f64).contains(&len) || len.fract() != 0.0 {
        return Err(Exception::range_error("Invalid array length"));
    }
    if len > MAX_DENSE_ARRAY_LENGTH as f64 {
        return Err(Exception::range_error(format!(
            "Array length {} exceeds the supported maximum of {}",
            number_to_string(len),
            MAX_DENSE_ARRAY_LENGTH
        )));
    }
    Ok(len as usize)
}

/// Members every object inherits, visible as bare names inside `with`.
fn inherited_property(object: &Value, name: &str) -> Option<Value> {
    match object {
        Value::Object(_) | Value::Array(_) => builtins::object_method(name),
        _ => None,
    }
}

/// Canonical array index (`"3"`, not `"03"`).
pub(crate) fn array_index(key: &str) -> Option<usize> {
    let index = key.parse::<usize>().ok()?;
    (index.to_string() == key).then_some(index)
}

// ═══════════════════════════════════════════════════════════════════════════════
// INTERPRETER
// ═══════════════════════════════════════════════════════════════════════════════

enum Flow {
    Normal,
    Return(Value),
    Break,
    Continue,
}

#[derive(Clone, Copy)]
enum Binder {
    Declare { mutable: bool },
    Assign,
}

pub struct Interpreter {
    globals: Scope,
    depth: usize,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Interpreter {
    fn drop(&mut self) {
        // Global closures reference the global frame.
        self.globals.clear();
    }
}

impl Interpreter {
    /// A fresh interpreter whose global scope holds only the language intrinsics.
    pub fn new() -> Self {
        let globals = Scope::root();
        builtins::install(&globals);
        globals.declare(THIS_BINDING, Value::Undefined, false);
        Self { globals, depth: 0 }
    }

    pub fn define_global(&self, name: &str, value: Value) {
        self.globals.declare(name, value, false);
    }

    pub fn run(&mut self, program: &Program) -> Result<(), Exception> {
        let scope = self.globals.child(true);
        self.exec_statements(&program.body, &scope)?;
        Ok(())
    }

    pub fn call(&mut self, func: &Value, this: Value, args: Vec<Value>) -> Result<Value, Exception> {
        let Value::Function(function) = func else {
            return Err(Exception::type_error(format!(
                "{} is not a function",
                func.to_js_string()
            )));
        };
        if self.depth >= MAX_CALL_DEPTH {
            return Err(Exception::range_error("Maximum call stack size exceeded"));
        }
        self.depth += 1;
        let result = match function.as_ref() {
            Function::Native { call, .. } => {
                let call = Rc::clone(call);
                call(self, &this, &args)
            }
            Function::Closure { def, env } => self.call_closure(def, env, this, args),
        };
        self.depth -= 1;
        result
    }

    fn call_closure(
        &mut self,
        def: &Rc<FunctionDef>,
        env: &Scope,
        this: Value,
        args: Vec<Value>,
    ) -> Result<Value, Exception> {
        let scope = env.child(true);
        if !def.arrow {
            scope.declare(THIS_BINDING, this, false);
        }
        let binder = Binder::Declare { mutable: true };
        for (i, param) in def.params.iter().enumerate() {
            let arg = args.get(i).cloned().unwrap_or_default();
            self.bind_pattern(param, arg, binder, &scope)?;
        }
        if let Some(rest) = &def.rest {
            let extra = args.iter().skip(def.params.len()).cloned().collect();
            self.bind_pattern(rest, Value::array(extra), binder, &scope)?;
        }

        match &def.body {
            FunctionBody::Expr(expr) => self.eval(expr, &scope),
            FunctionBody::Block(stmts) => match self.exec_statements(stmts, &scope)? {
                Flow::Return(value) => Ok(value),
                _ => Ok(Value::Undefined),
            },
        }
    }

    fn construct(&mut self, callee: &Value, args: Vec<Value>) -> Result<Value, Exception> {
        match callee {
            Value::Function(function) => match function.as_ref() {
                Function::Native { name, .. }
                    if name.chars().next().is_some_and(|c| c.is_ascii_uppercase()) =>
                {
                    self.call(callee, Value::Undefined, args)
                }
                Function::Closure { def, .. } if !def.arrow => {
                    let instance = Value::object(PropertyMap::new());
                    let result = self.call(callee, instance.clone(), args)?;
                    Ok(match result {
                        Value::Object(_) | Value::Array(_) => result,
                        _ => instance,
                    })
                }
                _ => Err(Exception::type_error(format!(
                    "{} is not a constructor",
                    function.name()
                ))),
            },
            other => Err(Exception::type_error(format!(
                "{} is not a constructor",
                other.to_js_string()
            ))),
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // STATEMENTS
    // ═══════════════════════════════════════════════════════════════════════════

    fn exec_statements(&mut self, stmts: &[Stmt], scope: &Scope) -> Result<Flow, Exception> {
        for stmt in stmts {
            if let Stmt::Function(def) = stmt {
                if let Some(name) = &def.name {
                    let closure = self.make_closure(def, scope);
                    scope.declare(name, closure, true);
                }
            }
        }
        for stmt in stmts {
            match self.exec_statement(stmt, scope)? {
                Flow::Normal => {}
                flow => return Ok(flow),
            }
        }
        Ok(Flow::Normal)
    }

    fn exec_statement(&mut self, stmt: &Stmt, scope: &Scope) -> Result<Flow, Exception> {
        match stmt {
            Stmt::Expr(expr) => {
                self.eval(expr, scope)?;
                Ok(Flow::Normal)
            }
            Stmt::Decl { kind, declarations } => {
                let target = match kind {
                    DeclKind::Var => scope.function_scope(),
                    DeclKind::Let | DeclKind::Const => scope.clone(),
                };
                let binder = Binder::Declare {
                    mutable: *kind != DeclKind::Const,
                };
                for (pattern, init) in declarations {
                    let value = match init {
                        Some(expr) => self.eval(expr, scope)?,
                        None => Value::Undefined,
                    };
                    self.bind_pattern(pattern, value, binder, &target)?;
                }
                Ok(Flow::Normal)
            }
            Stmt::Function(_) | Stmt::Empty => Ok(Flow::Normal),
            Stmt::Return(expr) => {
                let value = match expr {
                    Some(expr) => self.eval(expr, scope)?,
                    None => Value::Undefined,
                };
                Ok(Flow::Return(value))
            }
            Stmt::If {
                test,
                consequent,
                alternate,
            } => {
                if self.eval(test, scope)?.truthy() {
                    self.exec_statement(consequent, scope)
                } else if let Some(alternate) = alternate {
                    self.exec_statement(alternate, scope)
                } else {
                    Ok(Flow::Normal)
                }
            }
            Stmt::Block(stmts) => self.exec_statements(stmts, &scope.child(false)),
            Stmt::With { object, body } => {
                let object = self.eval(object, scope)?;
                if object.is_nullish() {
                    return Err(Exception::type_error(
                        "Cannot convert undefined or null to object",
                    ));
                }
                self.exec_statement(body, &scope.with_object(object))
            }
            Stmt::ForOf {
                kind,
                target,
                iterable,
                body,
            } => {
                let iterable = self.eval(iterable, scope)?;
                for item in self.iterate(&iterable)? {
                    let iteration = scope.child(false);
                    let binder = match kind {
                        Some(kind) => Binder::Declare {
                            mutable: *kind != DeclKind::Const,
                        },
                        None => Binder::Assign,
                    };
                    self.bind_pattern(target, item, binder, &iteration)?;
                    match self.exec_statement(body, &iteration)? {
                        Flow::Break => break,
                        Flow::Return(value) => return Ok(Flow::Return(value)),
                        Flow::Normal | Flow::Continue => {}
                    }
                }
                Ok(Flow::Normal)
            }
            Stmt::Try {
                block,
                param,
                handler,
                finalizer,
            } => {
                let result = match (self.exec_statements(block, &scope.child(false)), handler) {
                    (Err(exception), Some(handler)) => {
                        let catch_scope = scope.child(false);
                        let bound = match param {
                            Some(param) => self.bind_pattern(
                                param,
                                exception.value,
                                Binder::Declare { mutable: true },
                                &catch_scope,
                            ),
                            None => Ok(()),
                        };
                        bound.and_then(|_| self.exec_statements(handler, &catch_scope))
                    }
                    (result, _) => result,
                };
                if let Some(finalizer) = finalizer {
                    match self.exec_statements(finalizer, &scope.child(false))? {
                        Flow::Normal => {}
                        flow => return Ok(flow),
                    }
                }
                result
            }
            Stmt::Throw(expr) => Err(Exception::new(self.eval(expr, scope)?)),
            Stmt::Break => Ok(Flow::Break),
            Stmt::Continue => Ok(Flow::Continue),
            Stmt::Unsupported(message) => Err(Exception::syntax_error(message.clone())),
        }
    }

    fn bind_pattern(
        &mut self,
        pattern: &Pattern,
        value: Value,
        binder: Binder,
        scope: &Scope,
    ) -> Result<(), Exception> {
        match pattern {
            Pattern::Ident(name) => match binder {
                Binder::Declare { mutable } => {
                    scope.declare(name, value, mutable);
                    Ok(())
                }
                Binder::Assign => self.assign_identifier(name, value, scope),
            },
            Pattern::Default { target, default } => {
                let value = match value {
                    Value::Undefined => self.eval(default, scope)?,
                    other => other,
                };
                self.bind_pattern(target, value, binder, scope)
            }
            Pattern::Object { properties, rest } => {
                if value.is_nullish() {
                    return Err(Exception::type_error(format!(
                        "Cannot destructure '{}' as it is {}.",
                        value.to_js_string(),
                        value.to_js_string()
                    )));
                }
                let mut used = Vec::with_capacity(properties.len());
                for (key, target) in properties {
                    let key = self.prop_key(key, scope)?;
                    let property = self.get_property(&value, &key)?;
                    self.bind_pattern(target, property, binder, scope)?;
                    used.push(key);
                }
                if let Some(rest) = rest {
                    let remaining: PropertyMap = match &value {
                        Value::Object(map) => map
                            .borrow()
                            .iter()
                            .filter(|(k, _)| !used.contains(k))
                            .map(|(k, v)| (k.clone(), v.clone()))
                            .collect(),
                        _ => PropertyMap::new(),
                    };
                    self.bind_pattern(rest, Value::object(remaining), binder, scope)?;
                }
                Ok(())
            }
            Pattern::Array { elements, rest } => {
                let items = self.iterate(&value)?;
                for (i, element) in elements.iter().enumerate() {
                    if let Some(target) = element {
                        let item = items.get(i).cloned().unwrap_or_default();
                        self.bind_pattern(target, item, binder, scope)?;
                    }
                }
                if let Some(rest) = rest {
                    let tail = items.iter().skip(elements.len()).cloned().collect();
                    self.bind_pattern(rest, Value::array(tail), binder, scope)?;
                }
                Ok(())
            }
        }
    }

    fn assign_identifier(&mut self, name: &str, value: Value, scope: &Scope) -> Result<(), Exception> {
        if scope.assign(name, value)? {
            Ok(())
        } else {
            Err(Exception::reference_error(format!("{} is not defined", name)))
        }
    }

    pub(crate) fn iterate(&self, value: &Value) -> Result<Vec<Value>, Exception> {
        match value {
            Value::Array(items) => Ok(items.borrow().clone()),
            Value::String(s) => Ok(s.chars().map(|c| Value::string(&c.to_string())).collect()),
            other => Err(Exception::type_error(format!(
                "{} is not iterable",
                other.to_js_string()
            ))),
        }
    }

    fn make_closure(&self, def: &Rc<FunctionDef>, scope: &Scope) -> Value {
        Value::Function(Rc::new(Function::Closure {
            def: Rc::clone(def),
            env: scope.clone(),
        }))
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // EXPRESSIONS
    // ═══════════════════════════════════════════════════════════════════════════

    pub fn eval(&mut self, expr: &Expr, scope: &Scope) -> Result<Value, Exception> {
        match expr {
            Expr::Literal(literal) => Ok(match literal {
                Literal::Undefined => Value::Undefined,
                Literal::Null => Value::Null,
                Literal::Bool(b) => Value::Bool(*b),
                Literal::Number(n) => Value::Number(*n),
                Literal::String(s) => Value::string(s),
            }),
            Expr::Template {
                quasis,
                expressions,
            } => {
                let mut out = String::new();
                for (i, quasi) in quasis.iter().enumerate() {
                    out.push_str(quasi);
                    if let Some(expr) = expressions.get(i) {
                        out.push_str(&self.eval(expr, scope)?.to_js_string());
                        if out.len() > MAX_STRING_LENGTH {
                            check_string_length(out.encode_utf16().count() as f64)?;
                        }
                    }
                }
                Ok(Value::string(&out))
            }
            Expr::Ident(name) => scope
                .lookup(name)
                .ok_or_else(|| Exception::reference_error(format!("{} is not defined", name))),
            Expr::This => Ok(scope.lookup(THIS_BINDING).unwrap_or_default()),
            Expr::Array(items) => Ok(Value::array(self.eval_items(items, scope)?)),
            Expr::Object(props) => self.eval_object(props, scope),
            Expr::Function(def) => Ok(self.make_closure(def, scope)),
            Expr::Member { .. } | Expr::Call { .. } | Expr::Chain(_) => {
                Ok(self.eval_optional(expr, scope)?.unwrap_or_default())
            }
            Expr::New { callee, arguments } => {
                let callee = self.eval(callee, scope)?;
                let args = self.eval_items(arguments, scope)?;
                self.construct(&callee, args)
            }
            Expr::Conditional {
                test,
                consequent,
                alternate,
            } => {
                if self.eval(test, scope)?.truthy() {
                    self.eval(consequent, scope)
                } else {
                    self.eval(alternate, scope)
                }
            }
            Expr::Logical { op, left, right } => {
                let left = self.eval(left, scope)?;
                let short_circuit = match op {
                    LogicalOp::And => !left.truthy(),
                    LogicalOp::Or => left.truthy(),
                    LogicalOp::Coalesce => !left.is_nullish(),
                };
                if short_circuit {
                    Ok(left)
                } else {
                    self.eval(right, scope)
                }
            }
            Expr::Binary { op, left, right } => {
                let left = self.eval(left, scope)?;
                let right = self.eval(right, scope)?;
                self.binary(*op, left, right)
            }
            Expr::Unary { op, argument } => self.eval_unary(*op, argument, scope),
            Expr::Update {
                increment,
                prefix,
                target,
            } => {
                let old = self.read_target(target, scope)?.to_number();
                let new = if *increment { old + 1.0 } else { old - 1.0 };
                self.write_target(target, Value::Number(new), scope)?;
                Ok(Value::Number(if *prefix { new } else { old }))
            }
            Expr::Assign { op, target, value } => {
                let new = match op {
                    None => self.eval(value, scope)?,
                    Some(op) => {
                        let current = self.read_target(target, scope)?;
                        let rhs = self.eval(value, scope)?;
                        self.binary(*op, current, rhs)?
                    }
                };
                self.write_target(target, new.clone(), scope)?;
                Ok(new)
            }
            Expr::Sequence(exprs) => {
                let mut last = Value::Undefined;
                for expr in exprs {
                    last = self.eval(expr, scope)?;
                }
                Ok(last)
            }
            Expr::Unsupported(message) => Err(Exception::syntax_error(message.clone())),
        }
    }

    /// Evaluates member/call chains. `None` means an optional link short-circuited.
    fn eval_optional(&mut self, expr: &Expr, scope: &Scope) -> Result<Option<Value>, Exception> {
        match expr {
            Expr::Member {
                object,
                property,
                optional,
            } => {
                let Some(target) = self.eval_optional(object, scope)? else {
                    return Ok(None);
                };
                if *optional && target.is_nullish() {
                    return Ok(None);
                }
                let key = self.member_key(property, scope)?;
                self.get_property(&target, &key).map(Some)
            }
            Expr::Call {
                callee,
                arguments,
                optional,
            } => {
                let (this, func) = match callee.as_ref() {
                    Expr::Member {
                        object,
                        property,
                        optional: member_optional,
                    } => {
                        let Some(target) = self.eval_optional(object, scope)? else {
                            return Ok(None);
                        };
                        if *member_optional && target.is_nullish() {
                            return Ok(None);
                        }
                        let key = self.member_key(property, scope)?;
                        let func = self.get_property(&target, &key)?;
                        (target, func)
                    }
                    Expr::Ident(name) => match scope.resolve(name) {
                        Some((func, base)) => (base.unwrap_or_default(), func),
                        None => {
                            return Err(Exception::reference_error(format!(
                                "{} is not defined",
                                name
                            )))
                        }
                    },
                    other => {
                        let Some(func) = self.eval_optional(other, scope)? else {
                            return Ok(None);
                        };
                        (Value::Undefined, func)
                    }
                };
                if *optional && func.is_nullish() {
                    return Ok(None);
                }
                let args = self.eval_items(arguments, scope)?;
                if !matches!(func, Value::Function(_)) {
                    return Err(Exception::type_error(format!(
                        "{} is not a function",
                        describe(callee)
                    )));
                }
                self.call(&func, this, args).map(Some)
            }
            Expr::Chain(inner) => Ok(Some(self.eval_optional(inner, scope)?.unwrap_or_default())),
            other => self.eval(other, scope).map(Some),
        }
    }

    fn eval_items(&mut self, items: &[ArrayItem], scope: &Scope) -> Result<Vec<Value>, Exception> {
        let mut out = Vec::with_capacity(items.len());
        for item in items {
            match item {
                ArrayItem::Expr(expr) => out.push(self.eval(expr, scope)?),
                ArrayItem::Spread(expr) => {
                    let value = self.eval(expr, scope)?;
                    out.extend(self.iterate(&value)?);
                }
                ArrayItem::Hole => out.push(Value::Undefined),
            }
        }
        Ok(out)
    }

    fn eval_object(&mut self, props: &[PropItem], scope: &Scope) -> Result<Value, Exception> {
        let mut map = PropertyMap::new();
        for prop in props {
            match prop {
                PropItem::Property { key, value } => {
                    let key = self.prop_key(key, scope)?;
                    let value = self.eval(value, scope)?;
                    map.insert(key, value);
                }
                PropItem::Spread(expr) => match self.eval(expr, scope)? {
                    Value::Object(source) => {
                        for (k, v) in source.borrow().iter() {
                            map.insert(k.clone(), v.clone());
                        }
                    }
                    Value::Array(items) => {
                        for (i, v) in items.borrow().iter().enumerate() {
                            map.insert(i.to_string(), v.clone());
                        }
                    }
                    Value::String(s) => {
                        for (i, unit) in Value::string_units(&s).into_iter().enumerate() {
                            map.insert(i.to_string(), unit);
                        }
                    }
                    _ => {}
                },
            }
        }
        Ok(Value::object(map))
    }

    fn eval_unary(&mut self, op: UnaryOp, argument: &Expr, scope: &Scope) -> Result<Value, Exception> {
        match op {
            UnaryOp::TypeOf => {
                // `typeof undeclared` is not an error.
                if let Expr::Ident(name) = argument {
                    return Ok(Value::string(
                        scope.lookup(name).map(|v| v.type_of()).unwrap_or("undefined"),
                    ));
                }
                Ok(Value::string(self.eval(argument, scope)?.type_of()))
            }
            UnaryOp::Delete => {
                if let Expr::Member {
                    object, property, ..
                } = argument
                {
                    let target = self.eval(object, scope)?;
                    let key = self.member_key(property, scope)?;
                    if let Value::Object(map) = target {
                        map.borrow_mut().shift_remove(&key);
                    }
                }
                Ok(Value::Bool(true))
            }
            _ => {
                let value = self.eval(argument, scope)?;
                Ok(match op {
                    UnaryOp::Plus => Value::Number(value.to_number()),
                    UnaryOp::Minus => Value::Number(-value.to_number()),
                    UnaryOp::Not => Value::Bool(!value.truthy()),
                    UnaryOp::BitNot => Value::Number(!to_int32(value.to_number()) as f64),
                    _ => Value::Undefined,
                })
            }
        }
    }

    pub(crate) fn binary(&mut self, op: BinaryOp, left: Value, right: Value) -> Result<Value, Exception> {
        let number = |f: fn(f64, f64) -> f64| Value::Number(f(left.to_number(), right.to_number()));
        Ok(match op {
            BinaryOp::Add => {
                let (l, r) = (to_primitive(&left), to_primitive(&right));
                if matches!(l, Value::String(_)) || matches!(r, Value::String(_)) {
                    let (l, r) = (l.to_js_string(), r.to_js_string());
                    if l.len() + r.len() > MAX_STRING_LENGTH {
                        check_string_length(
                            (l.encode_utf16().count() + r.encode_utf16().count()) as f64,
                        )?;
                    }
                    Value::string(&format!("{}{}", l, r))
                } else {
                    Value::Number(l.to_number() + r.to_number())
                }
            }
            BinaryOp::Sub => number(|a, b| a - b),
            BinaryOp::Mul => number(|a, b| a * b),
            BinaryOp::Div => number(|a, b| a / b),
            BinaryOp::Rem => number(|a, b| a % b),
            BinaryOp::Exp => number(f64::powf),
            BinaryOp::Eq => Value::Bool(left.loose_equals(&right)),
            BinaryOp::NotEq => Value::Bool(!left.loose_equals(&right)),
            BinaryOp::StrictEq => Value::Bool(left.strict_equals(&right)),
            BinaryOp::StrictNotEq => Value::Bool(!left.strict_equals(&right)),
            BinaryOp::Lt => Value::Bool(compare(&left, &right) == Some(Ordering::Less)),
            BinaryOp::Gt => Value::Bool(compare(&left, &right) == Some(Ordering::Greater)),
            BinaryOp::LtEq => Value::Bool(matches!(
                compare(&left, &right),
                Some(Ordering::Less | Ordering::Equal)
            )),
            BinaryOp::GtEq => Value::Bool(matches!(
                compare(&left, &right),
                Some(Ordering::Greater | Ordering::Equal)
            )),
            BinaryOp::Shl => int_op(&left, &right, |a, b| a.wrapping_shl(b & 31)),
            BinaryOp::Shr => int_op(&left, &right, |a, b| a >> (b & 31)),
            BinaryOp::UShr => {
                let shifted = (to_int32(left.to_number()) as u32) >> (to_int32(right.to_number()) as u32 & 31);
                Value::Number(shifted as f64)
            }
            BinaryOp::BitOr => int_op(&left, &right, |a, b| a | b as i32),
            BinaryOp::BitXor => int_op(&left, &right, |a, b| a ^ b as i32),
            BinaryOp::BitAnd => int_op(&left, &right, |a, b| a & b as i32),
            BinaryOp::In => {
                let key = to_property_key(&left);
                match &right {
                    Value::Object(map) => Value::Bool(map.borrow().contains_key(&key)),
                    Value::Array(items) => Value::Bool(
                        key == "length"
                            || array_index(&key).is_some_and(|i| i < items.borrow().len()),
                    ),
                    Value::Function(_) => Value::Bool(false),
                    other => {
                        return Err(Exception::type_error(format!(
                            "Cannot use 'in' operator to search for '{}' in {}",
                            key,
                            other.to_js_string()
                        )))
                    }
                }
            }
            BinaryOp::InstanceOf => Value::Bool(instance_of(&left, &right)?),
        })
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // PROPERTIES
    // ═══════════════════════════════════════════════════════════════════════════

    fn member_key(&mut self, key: &MemberKey, scope: &Scope) -> Result<String, Exception> {
        match key {
            MemberKey::Static(name) => Ok(name.clone()),
            MemberKey::Computed(expr) => Ok(to_property_key(&self.eval(expr, scope)?)),
        }
    }

    fn prop_key(&mut self, key: &PropKey, scope: &Scope) -> Result<String, Exception> {
        match key {
            PropKey::Static(name) => Ok(name.clone()),
            PropKey::Computed(expr) => Ok(to_property_key(&self.eval(expr, scope)?)),
        }
    }

    pub fn get_property(&mut self, target: &Value, key: &str) -> Result<Value, Exception> {
        match target {
            Value::Undefined | Value::Null => Err(Exception::type_error(format!(
                "Cannot read properties of {} (reading '{}')",
                target.to_js_string(),
                key
            ))),
            Value::Object(map) => {
                if let Some(value) = map.borrow().get(key) {
                    return Ok(value.clone());
                }
                Ok(builtins::object_method(key).unwrap_or_default())
            }
            Value::Array(_) => {
                if let Some(value) = own_property(target, key) {
                    return Ok(value);
                }
                if array_index(key).is_some() {
                    return Ok(Value::Undefined);
                }
                Ok(builtins::array_method(key).unwrap_or_default())
            }
            Value::String(s) => {
                if key == "length" {
                    return Ok(Value::Number(s.encode_utf16().count() as f64));
                }
                if let Some(index) = array_index(key) {
                    return Ok(s
                        .encode_utf16()
                        .nth(index)
                        .map(|unit| Value::string(&String::from_utf16_lossy(&[unit])))
                        .unwrap_or_default());
                }
                Ok(builtins::string_method(key).unwrap_or_default())
            }
            Value::Number(_) => Ok(builtins::number_method(key).unwrap_or_default()),
            Value::Bool(_) => Ok(builtins::object_method(key).unwrap_or_default()),
            Value::Function(function) => Ok(match function.as_ref() {
                _ if key == "name" => Value::string(function.name()),
                Function::Native { statics, .. } => statics.get(key).cloned().unwrap_or_default(),
                Function::Closure { .. } => Value::Undefined,
            }),
        }
    }

    pub fn set_property(&mut self, target: &Value, key: &str, value: Value) -> Result<(), Exception> {
        match target {
            Value::Undefined | Value::Null => Err(Exception::type_error(format!(
                "Cannot set properties of {} (setting '{}')",
                target.to_js_string(),
                key
            ))),
            Value::Object(map) => {
                map.borrow_mut().insert(key.to_string(), value);
                Ok(())
            }
            Value::Array(items) => {
                let mut items = items.borrow_mut();
                if key == "length" {
                    let len = dense_array_length(value.to_number())?;
                    items.resize(len, Value::Undefined);
                } else if let Some(index) = array_index(key).filter(|&i| i < MAX_ARRAY_INDEX) {
                    if index >= items.len() {
                        let len = dense_array_length(index as f64 + 1.0)?;
                        items.resize(len, Value::Undefined);
                    }
                    items[index] = value;
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn read_target(&mut self, target: &AssignTarget, scope: &Scope) -> Result<Value, Exception> {
        match target {
            AssignTarget::Ident(name) => scope
                .lookup(name)
                .ok_or_else(|| Exception::reference_error(format!("{} is not defined", name))),
            AssignTarget::Member { object, property } => {
                let target = self.eval(object, scope)?;
                let key = self.member_key(property, scope)?;
                self.get_property(&target, &key)
            }
        }
    }

    fn write_target(&mut self, target: &AssignTarget, value: Value, scope: &Scope) -> Result<(), Exception> {
        match target {
            AssignTarget::Ident(name) => self.assign_identifier(name, value, scope),
            AssignTarget::Member { object, property } => {
                let target = self.eval(object, scope)?;
                let key = self.member_key(property, scope)?;
                self.set_property(&target, &key, value)
            }
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// CONVERSIONS
// ═══════════════════════════════════════════════════════════════════════════════

pub(crate) fn to_property_key(value: &Value) -> String {
    match value {
        Value::Number(n) => number_to_string(*n),
        other => other.to_js_string(),
    }
}

fn to_primitive(value: &Value) -> Value {
    match value {
        Value::Array(_) | Value::Object(_) | Value::Function(_) => {
            Value::string(&value.to_js_string())
        }
        other => other.clone(),
    }
}

pub(crate) fn to_int32(n: f64) -> i32 {
    if !n.is_finite() {
        return 0;
    }
    (n.trunc() as i64 & 0xFFFF_FFFF) as u32 as i32
}

fn int_op(left: &Value, right: &Value, f: fn(i32, u32) -> i32) -> Value {
    let a = to_int32(left.to_number());
    let b = to_int32(right.to_number()) as u32;
    Value::Number(f(a, b) as f64)
}

pub(crate) fn compare(left: &Value, right: &Value) -> Option<Ordering> {
    let (l, r) = (to_primitive(left), to_primitive(right));
    match (&l, &r) {
        (Value::String(a), Value::String(b)) => Some(a.as_ref().cmp(b.as_ref())),
        _ => l.to_number().partial_cmp(&r.to_number()),
    }
}

fn instance_of(left: &Value, right: &Value) -> Result<bool, Exception> {
    let Value::Function(function) = right else {
        return Err(Exception::type_error(
            "Right-hand side of 'instanceof' is not callable",
        ));
    };
    Ok(match (function.name(), left) {
        ("Array", Value::Array(_)) => true,
        ("Object", Value::Array(_) | Value::Object(_) | Value::Function(_)) => true,
        ("Function", Value::Function(_)) => true,
        (ctor, Value::Object(map)) if ctor.ends_with("Error") => {
            match map.borrow().get("name") {
                Some(Value::String(name)) => ctor == "Error" || **name == *ctor,
                _ => false,
            }
        }
        _ => false,
    })
}

/// Source-ish rendering of a callee for "is not a function" messages.
fn describe(expr: &Expr) -> String {
    match expr {
        Expr::Ident(name) => name.clone(),
        Expr::This => "this".to_string(),
        Expr::Member {
            object, property, ..
        } => match property {
            MemberKey::Static(name) => format!("{}.{}", describe(object), name),
            MemberKey::Computed(_) => format!("{}[...]", describe(object)),
        },
        Expr::Chain(inner) => describe(inner),
        Expr::Call { callee, .. } => format!("{}(...)", describe(callee)),
        _ => "expression".to_string(),
    }
}
