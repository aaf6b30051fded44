use crate::ast::*;
use crate::builtins;
use crate::error::{ExprError, Result};
use crate::value::{self, compare, loose_eq, strict_eq, to_js_string, to_number, truthy, type_of};
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::rc::Rc;

/// Resource limits that keep every program finite
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Evaluation steps (expressions + statements) before aborting
    pub max_steps: u64,
    /// Nested function calls before aborting
    pub max_call_depth: usize,
    /// Nested expression and statement evaluations, across calls
    pub max_nesting: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_steps: 1_000_000,
            max_call_depth: 64,
            max_nesting: 256,
        }
    }
}

/// A function value: an arrow plus the scope depth it was defined at
#[derive(Debug, Clone)]
pub(crate) struct Callable {
    func: Rc<ArrowFn>,
    depth: usize,
}

/// Evaluated call argument
#[derive(Debug, Clone)]
pub(crate) enum Arg {
    Value(Value),
    Func(Callable),
}

impl Arg {
    pub(crate) fn value(&self) -> Value {
        match self {
            Arg::Value(v) => v.clone(),
            Arg::Func(_) => Value::Null,
        }
    }
}

#[derive(Debug, Clone)]
enum Slot {
    Value(Value),
    Function(Callable),
}

#[derive(Debug, Clone)]
struct Binding {
    slot: Slot,
    constant: bool,
}

type Scope = HashMap<String, Binding>;

enum Flow {
    Normal,
    Return(Value),
    Break,
    Continue,
}

/// Assignable location: a variable followed by property keys
struct Place {
    root: String,
    keys: Vec<Value>,
}

/// Tree-walking evaluator over JSON values
pub struct Interpreter {
    scopes: Vec<Scope>,
    limits: Limits,
    steps: u64,
    call_depth: usize,
    nesting: usize,
}

impl Interpreter {
    pub fn new(limits: Limits) -> Self {
        Self {
            scopes: vec![Scope::new()],
            limits,
            steps: 0,
            call_depth: 0,
            nesting: 0,
        }
    }

    /// Bind a value in the outermost scope
    pub fn bind(&mut self, name: impl Into<String>, value: Value) {
        self.scopes[0].insert(
            name.into(),
            Binding {
                slot: Slot::Value(value),
                constant: false,
            },
        );
    }

    /// Run a statement list as a function body; no `return` yields null
    pub fn run(&mut self, body: &[Stmt]) -> Result<Value> {
        match self.exec_scoped(body)? {
            Flow::Return(value) => Ok(value),
            Flow::Normal => Ok(Value::Null),
            Flow::Break | Flow::Continue => Err(ExprError::runtime("Illegal break or continue statement")),
        }
    }

    fn tick(&mut self) -> Result<()> {
        self.steps += 1;
        if self.steps > self.limits.max_steps {
            return Err(ExprError::runtime(format!(
                "Execution step limit of {} exceeded",
                self.limits.max_steps
            )));
        }
        Ok(())
    }

    fn nested<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        self.tick()?;
        if self.nesting >= self.limits.max_nesting {
            return Err(ExprError::runtime("Maximum nesting depth exceeded"));
        }
        self.nesting += 1;
        let result = f(self);
        self.nesting -= 1;
        result
    }

    // ---------------------------------------------------------------
    // scopes
    // ---------------------------------------------------------------

    fn lookup(&self, name: &str) -> Option<&Binding> {
        self.scopes.iter().rev().find_map(|scope| scope.get(name))
    }

    fn lookup_mut(&mut self, name: &str) -> Option<&mut Binding> {
        self.scopes.iter_mut().rev().find_map(|scope| scope.get_mut(name))
    }

    fn declare(&mut self, name: &str, slot: Slot, kind: DeclKind) -> Result<()> {
        let scope = self
            .scopes
            .last_mut()
            .ok_or_else(|| ExprError::runtime("No active scope"))?;
        if kind != DeclKind::Var && scope.contains_key(name) {
            return Err(ExprError::runtime(format!(
                "Identifier '{}' has already been declared",
                name
            )));
        }
        scope.insert(
            name.to_string(),
            Binding {
                slot,
                constant: kind == DeclKind::Const,
            },
        );
        Ok(())
    }

    fn declare_pattern(&mut self, pattern: &Pattern, value: Value, kind: DeclKind) -> Result<()> {
        match pattern {
            Pattern::Ident(name) => self.declare(name, Slot::Value(value), kind),
            Pattern::Array(names) => {
                let items = builtins::iterate(value)?;
                for (i, name) in names.iter().enumerate() {
                    if let Some(name) = name {
                        let item = items.get(i).cloned().unwrap_or(Value::Null);
                        self.declare(name, Slot::Value(item), kind)?;
                    }
                }
                Ok(())
            }
            Pattern::Object(names) => {
                if value.is_null() {
                    return Err(ExprError::runtime("Cannot destructure null"));
                }
                for name in names {
                    let item = get_property(&value, &Value::String(name.clone()))?;
                    self.declare(name, Slot::Value(item), kind)?;
                }
                Ok(())
            }
        }
    }

    fn exec_scoped(&mut self, stmts: &[Stmt]) -> Result<Flow> {
        self.scopes.push(Scope::new());
        let result = self.exec_list(stmts);
        self.scopes.pop();
        result
    }

    fn exec_list(&mut self, stmts: &[Stmt]) -> Result<Flow> {
        for stmt in stmts {
            match self.exec(stmt)? {
                Flow::Normal => {}
                other => return Ok(other),
            }
        }
        Ok(Flow::Normal)
    }

    // ---------------------------------------------------------------
    // statements
    // ---------------------------------------------------------------

    fn exec(&mut self, stmt: &Stmt) -> Result<Flow> {
        self.nested(|this| this.exec_stmt(stmt))
    }

    fn exec_stmt(&mut self, stmt: &Stmt) -> Result<Flow> {
        match stmt {
            Stmt::Declare {
                kind,
                pattern,
                init,
            } => {
                if let (Pattern::Ident(name), Some(Expr::Arrow(func))) = (pattern, init) {
                    let callable = Callable {
                        func: Rc::clone(func),
                        depth: self.scopes.len(),
                    };
                    self.declare(name, Slot::Function(callable), *kind)?;
                    return Ok(Flow::Normal);
                }
                let value = match init {
                    Some(expr) => self.eval(expr)?,
                    None => Value::Null,
                };
                self.declare_pattern(pattern, value, *kind)?;
                Ok(Flow::Normal)
            }
            Stmt::Assign { target, op, value } => {
                let place = self.place(target)?;
                let rhs = self.eval(value)?;
                let new_value = match op {
                    AssignOp::Assign => rhs,
                    AssignOp::Add => binary_op(BinaryOp::Add, self.read_place(&place)?, rhs)?,
                    AssignOp::Sub => binary_op(BinaryOp::Sub, self.read_place(&place)?, rhs)?,
                    AssignOp::Mul => binary_op(BinaryOp::Mul, self.read_place(&place)?, rhs)?,
                    AssignOp::Div => binary_op(BinaryOp::Div, self.read_place(&place)?, rhs)?,
                };
                self.write_place(&place, new_value, false)?;
                Ok(Flow::Normal)
            }
            Stmt::Return(expr) => {
                let value = match expr {
                    Some(expr) => self.eval(expr)?,
                    None => Value::Null,
                };
                Ok(Flow::Return(value))
            }
            Stmt::If {
                test,
                consequent,
                alternate,
            } => {
                if truthy(&self.eval(test)?) {
                    self.exec_scoped(consequent)
                } else if let Some(alternate) = alternate {
                    self.exec_scoped(alternate)
                } else {
                    Ok(Flow::Normal)
                }
            }
            Stmt::ForOf {
                kind,
                pattern,
                iterable,
                body,
            } => {
                let items = builtins::iterate(self.eval(iterable)?)?;
                for item in items {
                    self.scopes.push(Scope::new());
                    let flow = self
                        .declare_pattern(pattern, item, *kind)
                        .and_then(|_| self.exec_list(body));
                    self.scopes.pop();
                    match flow? {
                        Flow::Break => break,
                        Flow::Normal | Flow::Continue => {}
                        Flow::Return(value) => return Ok(Flow::Return(value)),
                    }
                }
                Ok(Flow::Normal)
            }
            Stmt::Break => Ok(Flow::Break),
            Stmt::Continue => Ok(Flow::Continue),
            Stmt::Block(stmts) => self.exec_scoped(stmts),
            Stmt::Expr(expr) => {
                self.eval(expr)?;
                Ok(Flow::Normal)
            }
        }
    }

    // ---------------------------------------------------------------
    // places
    // ---------------------------------------------------------------

    fn member_key(&mut self, key: &MemberKey) -> Result<Value> {
        match key {
            MemberKey::Named(name) => Ok(Value::String(name.clone())),
            MemberKey::Computed(expr) => self.eval(expr),
        }
    }

    fn place(&mut self, expr: &Expr) -> Result<Place> {
        match expr {
            Expr::Ident(name) => Ok(Place {
                root: name.clone(),
                keys: Vec::new(),
            }),
            Expr::Member { object, key, .. } => {
                let mut place = self.place(object)?;
                let key = self.member_key(key)?;
                place.keys.push(key);
                Ok(place)
            }
            _ => Err(ExprError::runtime("Invalid assignment target")),
        }
    }

    fn read_place(&self, place: &Place) -> Result<Value> {
        let mut current = self.variable(&place.root)?;
        for key in &place.keys {
            current = get_property(&current, key)?;
        }
        Ok(current)
    }

    /// Store into a place; `in_place` marks a mutating method call, which is
    /// allowed on const bindings
    fn write_place(&mut self, place: &Place, value: Value, in_place: bool) -> Result<()> {
        let binding = self
            .lookup_mut(&place.root)
            .ok_or_else(|| not_defined(&place.root))?;

        let Some((last, parents)) = place.keys.split_last() else {
            if binding.constant && !in_place {
                return Err(ExprError::runtime("Assignment to constant variable."));
            }
            binding.slot = Slot::Value(value);
            return Ok(());
        };

        let Slot::Value(root) = &mut binding.slot else {
            return Err(ExprError::runtime(format!(
                "Cannot set properties of function '{}'",
                place.root
            )));
        };
        let mut target = root;
        for key in parents {
            target = child_mut(target, key)?;
        }
        set_property(target, last, value)
    }

    fn variable(&self, name: &str) -> Result<Value> {
        match self.lookup(name) {
            Some(Binding {
                slot: Slot::Value(value),
                ..
            }) => Ok(value.clone()),
            Some(Binding {
                slot: Slot::Function(_),
                ..
            }) => Err(ExprError::runtime(format!(
                "'{}' is a function and can only be called or passed to a built-in method",
                name
            ))),
            None => Err(not_defined(name)),
        }
    }

    // ---------------------------------------------------------------
    // expressions
    // ---------------------------------------------------------------

    pub fn eval(&mut self, expr: &Expr) -> Result<Value> {
        self.nested(|this| this.eval_expr(expr))
    }

    fn eval_expr(&mut self, expr: &Expr) -> Result<Value> {
        match expr {
            Expr::Literal(value) => Ok(value.clone()),
            Expr::Ident(name) => self.variable(name),
            Expr::Array(elements) => {
                let mut items = Vec::with_capacity(elements.len());
                for element in elements {
                    match element {
                        Element::Item(expr) => items.push(self.eval(expr)?),
                        Element::Spread(expr) => {
                            let more = builtins::iterate(self.eval(expr)?)?;
                            builtins::ensure_array_length(items.len() + more.len())?;
                            items.extend(more);
                        }
                    }
                }
                Ok(Value::Array(items))
            }
            Expr::Object(props) => {
                let mut map = Map::new();
                for prop in props {
                    match prop {
                        Property::KeyValue(key, expr) => {
                            let value = self.eval(expr)?;
                            map.insert(key.clone(), value);
                        }
                        Property::Computed(key, expr) => {
                            let key = to_js_string(&self.eval(key)?);
                            let value = self.eval(expr)?;
                            map.insert(key, value);
                        }
                        Property::Spread(expr) => spread_into(&mut map, self.eval(expr)?),
                    }
                }
                Ok(Value::Object(map))
            }
            Expr::Template(parts) => {
                let mut out = String::new();
                for part in parts {
                    match part {
                        TemplatePart::Text(text) => out.push_str(text),
                        TemplatePart::Expr(expr) => out.push_str(&to_js_string(&self.eval(expr)?)),
                    }
                    builtins::ensure_string_length(out.len())?;
                }
                Ok(Value::String(out))
            }
            Expr::Member { .. } | Expr::Call { .. } => {
                Ok(self.eval_chain(expr)?.unwrap_or(Value::Null))
            }
            Expr::Unary { op, operand } => {
                if *op == UnaryOp::Typeof {
                    if let Expr::Ident(name) = operand.as_ref() {
                        return Ok(Value::String(
                            match self.lookup(name) {
                                None => "undefined",
                                Some(Binding {
                                    slot: Slot::Function(_),
                                    ..
                                }) => "function",
                                Some(Binding {
                                    slot: Slot::Value(value),
                                    ..
                                }) => type_of(value),
                            }
                            .to_string(),
                        ));
                    }
                }
                let value = self.eval(operand)?;
                Ok(match op {
                    UnaryOp::Not => Value::Bool(!truthy(&value)),
                    UnaryOp::Neg => value::number(-to_number(&value)),
                    UnaryOp::Plus => value::number(to_number(&value)),
                    UnaryOp::Typeof => Value::String(type_of(&value).to_string()),
                })
            }
            Expr::Binary { op, left, right } => {
                let left = self.eval(left)?;
                let right = self.eval(right)?;
                binary_op(*op, left, right)
            }
            Expr::Logical { op, left, right } => {
                let left = self.eval(left)?;
                let short_circuit = match op {
                    LogicalOp::And => !truthy(&left),
                    LogicalOp::Or => truthy(&left),
                    LogicalOp::Nullish => !left.is_null(),
                };
                if short_circuit {
                    Ok(left)
                } else {
                    self.eval(right)
                }
            }
            Expr::Conditional {
                test,
                consequent,
                alternate,
            } => {
                if truthy(&self.eval(test)?) {
                    self.eval(consequent)
                } else {
                    self.eval(alternate)
                }
            }
            Expr::Arrow(_) => Err(ExprError::runtime(
                "Functions can only be declared with const/let or passed to a built-in method",
            )),
        }
    }

    /// Member and call chains; `None` means an optional link short-circuited
    fn eval_chain(&mut self, expr: &Expr) -> Result<Option<Value>> {
        match expr {
            Expr::Member {
                object,
                key,
                optional,
            } => {
                if let (Expr::Ident(ns), MemberKey::Named(name)) = (object.as_ref(), key) {
                    if self.lookup(ns).is_none() {
                        if let Some(constant) = builtins::namespace_constant(ns, name) {
                            return Ok(Some(constant));
                        }
                    }
                }
                let Some(target) = self.eval_chain(object)? else {
                    return Ok(None);
                };
                if *optional && target.is_null() {
                    return Ok(None);
                }
                let key = self.member_key(key)?;
                get_property(&target, &key).map(Some)
            }
            Expr::Call { callee, args } => self.eval_call(callee, args),
            other => self.eval(other).map(Some),
        }
    }

    fn eval_call(&mut self, callee: &Expr, args: &[Element]) -> Result<Option<Value>> {
        match callee {
            Expr::Member {
                object,
                key,
                optional,
            } => {
                let name = match key {
                    MemberKey::Named(name) => name.clone(),
                    MemberKey::Computed(expr) => to_js_string(&self.eval(expr)?),
                };

                if let Expr::Ident(ns) = object.as_ref() {
                    if self.lookup(ns).is_none() && builtins::is_namespace(ns) {
                        let args = self.eval_args(args)?;
                        return builtins::call_static(self, ns, &name, args).map(Some);
                    }
                }

                if builtins::is_mutating(&name) && object.is_place() {
                    let place = self.place(object)?;
                    let mut receiver = self.read_place(&place)?;
                    if matches!(receiver, Value::Array(_)) {
                        let args = self.eval_args(args)?;
                        let result = builtins::call_method(self, &mut receiver, &name, args)?;
                        self.write_place(&place, receiver, true)?;
                        return Ok(Some(result));
                    }
                }

                let Some(mut receiver) = self.eval_chain(object)? else {
                    return Ok(None);
                };
                if *optional && receiver.is_null() {
                    return Ok(None);
                }
                let args = self.eval_args(args)?;
                builtins::call_method(self, &mut receiver, &name, args).map(Some)
            }
            Expr::Ident(name) => {
                let callable = match self.lookup(name) {
                    Some(Binding {
                        slot: Slot::Function(callable),
                        ..
                    }) => Some(callable.clone()),
                    Some(_) => return Err(ExprError::runtime(format!("{} is not a function", name))),
                    None => None,
                };
                let args = self.eval_args(args)?;
                match callable {
                    Some(callable) => {
                        let values = args.iter().map(Arg::value).collect();
                        self.call(&callable, values).map(Some)
                    }
                    None => builtins::call_global(name, args).map(Some),
                }
            }
            _ => Err(ExprError::runtime("Expression is not callable")),
        }
    }

    fn function_named(&self, expr: &Expr) -> Option<Callable> {
        let Expr::Ident(name) = expr else {
            return None;
        };
        match self.lookup(name) {
            Some(Binding {
                slot: Slot::Function(callable),
                ..
            }) => Some(callable.clone()),
            _ => None,
        }
    }

    fn eval_args(&mut self, args: &[Element]) -> Result<Vec<Arg>> {
        let mut out = Vec::with_capacity(args.len());
        for arg in args {
            match arg {
                Element::Item(Expr::Arrow(func)) => out.push(Arg::Func(Callable {
                    func: Rc::clone(func),
                    depth: self.scopes.len(),
                })),
                Element::Item(expr) => match self.function_named(expr) {
                    Some(callable) => out.push(Arg::Func(callable)),
                    None => out.push(Arg::Value(self.eval(expr)?)),
                },
                Element::Spread(expr) => {
                    let items = builtins::iterate(self.eval(expr)?)?;
                    out.extend(items.into_iter().map(Arg::Value));
                }
            }
        }
        Ok(out)
    }

    /// Invoke a function with lexical scoping: only the scopes that existed
    /// where it was defined are visible
    pub(crate) fn call(&mut self, callable: &Callable, args: Vec<Value>) -> Result<Value> {
        if self.call_depth >= self.limits.max_call_depth {
            return Err(ExprError::runtime("Maximum call stack size exceeded"));
        }
        let depth = callable.depth.min(self.scopes.len());
        let hidden = self.scopes.split_off(depth);
        self.scopes.push(Scope::new());
        self.call_depth += 1;

        let result = self.invoke(&callable.func, args);

        self.call_depth -= 1;
        self.scopes.truncate(depth);
        self.scopes.extend(hidden);
        result
    }

    fn invoke(&mut self, func: &ArrowFn, args: Vec<Value>) -> Result<Value> {
        let mut args = args.into_iter();
        for param in &func.params {
            let value = args.next().unwrap_or(Value::Null);
            self.declare_pattern(param, value, DeclKind::Let)?;
        }
        match &func.body {
            ArrowBody::Expr(expr) => self.eval(expr),
            ArrowBody::Block(stmts) => match self.exec_list(stmts)? {
                Flow::Return(value) => Ok(value),
                Flow::Normal => Ok(Value::Null),
                Flow::Break | Flow::Continue => {
                    Err(ExprError::runtime("Illegal break or continue statement"))
                }
            },
        }
    }
}

fn not_defined(name: &str) -> ExprError {
    ExprError::runtime(format!("{} is not defined", name))
}

pub(crate) fn binary_op(op: BinaryOp, left: Value, right: Value) -> Result<Value> {
    Ok(match op {
        BinaryOp::Add => {
            let concat = |v: &Value| {
                matches!(v, Value::String(_) | Value::Array(_) | Value::Object(_))
            };
            if concat(&left) || concat(&right) {
                let mut out = to_js_string(&left);
                let right = to_js_string(&right);
                builtins::ensure_string_length(out.len() + right.len())?;
                out.push_str(&right);
                Value::String(out)
            } else {
                value::number(to_number(&left) + to_number(&right))
            }
        }
        BinaryOp::Sub => value::number(to_number(&left) - to_number(&right)),
        BinaryOp::Mul => value::number(to_number(&left) * to_number(&right)),
        BinaryOp::Div => value::number(to_number(&left) / to_number(&right)),
        BinaryOp::Rem => value::number(to_number(&left) % to_number(&right)),
        BinaryOp::Eq => Value::Bool(loose_eq(&left, &right)),
        BinaryOp::NotEq => Value::Bool(!loose_eq(&left, &right)),
        BinaryOp::StrictEq => Value::Bool(strict_eq(&left, &right)),
        BinaryOp::StrictNotEq => Value::Bool(!strict_eq(&left, &right)),
        BinaryOp::Lt => Value::Bool(compare(&left, &right) == Some(Ordering::Less)),
        BinaryOp::LtEq => Value::Bool(matches!(
            compare(&left, &right),
            Some(Ordering::Less | Ordering::Equal)
        )),
        BinaryOp::Gt => Value::Bool(compare(&left, &right) == Some(Ordering::Greater)),
        BinaryOp::GtEq => Value::Bool(matches!(
            compare(&left, &right),
            Some(Ordering::Greater | Ordering::Equal)
        )),
    })
}

/// Integer array index named by a key, if any
pub(crate) fn array_index(key: &Value) -> Option<usize> {
    match key {
        Value::Number(n) => n
            .as_f64()
            .filter(|f| *f >= 0.0 && f.fract() == 0.0)
            .map(|f| f as usize),
        Value::String(s) => s
            .parse::<usize>()
            .ok()
            .filter(|i| i.to_string() == *s),
        _ => None,
    }
}

/// Property read with JavaScript semantics; missing properties are null
pub(crate) fn get_property(target: &Value, key: &Value) -> Result<Value> {
    let name = to_js_string(key);
    match target {
        Value::Null => Err(ExprError::runtime(format!(
            "Cannot read properties of null (reading '{}')",
            name
        ))),
        Value::Object(map) => Ok(map.get(&name).cloned().unwrap_or(Value::Null)),
        Value::Array(items) => {
            if name == "length" {
                return Ok(Value::from(items.len()));
            }
            Ok(array_index(key)
                .and_then(|i| items.get(i).cloned())
                .unwrap_or(Value::Null))
        }
        Value::String(s) => {
            if name == "length" {
                return Ok(Value::from(s.chars().count()));
            }
            Ok(array_index(key)
                .and_then(|i| s.chars().nth(i))
                .map(|c| Value::String(c.to_string()))
                .unwrap_or(Value::Null))
        }
        Value::Bool(_) | Value::Number(_) => Ok(Value::Null),
    }
}

fn child_mut<'v>(target: &'v mut Value, key: &Value) -> Result<&'v mut Value> {
    let name = to_js_string(key);
    let child = match target {
        Value::Object(map) => map.get_mut(&name),
        Value::Array(items) => array_index(key).and_then(move |i| items.get_mut(i)),
        _ => None,
    };
    child.ok_or_else(|| {
        ExprError::runtime(format!(
            "Cannot set properties of undefined (reading '{}')",
            name
        ))
    })
}

/// Largest gap an index assignment may pad with nulls
const MAX_ARRAY_GAP: usize = 10_000;

fn set_property(target: &mut Value, key: &Value, value: Value) -> Result<()> {
    let name = to_js_string(key);
    match target {
        Value::Object(map) => {
            map.insert(name, value);
            Ok(())
        }
        Value::Array(items) => {
            let index = array_index(key).ok_or_else(|| {
                ExprError::runtime(format!("Cannot set property '{}' on an array", name))
            })?;
            if index >= items.len() {
                if index - items.len() > MAX_ARRAY_GAP {
                    return Err(ExprError::runtime(format!(
                        "Array index {} is too far past the end",
                        index
                    )));
                }
                items.resize(index + 1, Value::Null);
            }
            items[index] = value;
            Ok(())
        }
        Value::Null => Err(ExprError::runtime(format!(
            "Cannot set properties of null (setting '{}')",
            name
        ))),
        other => Err(ExprError::runtime(format!(
            "Cannot create property '{}' on {}",
            name,
            type_of(other)
        ))),
    }
}

fn spread_into(map: &mut Map<String, Value>, value: Value) {
    match value {
        Value::Object(other) => map.extend(other),
        Value::Array(items) => {
            for (i, item) in items.into_iter().enumerate() {
                map.insert(i.to_string(), item);
            }
        }
        Value::String(s) => {
            for (i, c) in s.chars().enumerate() {
                map.insert(i.to_string(), Value::String(c.to_string()));
            }
        }
        Value::Null | Value::Bool(_) | Value::Number(_) => {}
    }
}
