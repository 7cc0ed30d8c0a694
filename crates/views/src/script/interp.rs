//! Tree-walking evaluator for parsed map functions.

use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};
use std::time::Instant;

use super::parser::{AssignOp, BinaryOp, Expr, Function, LogicalOp, Stmt, UnaryOp};
use super::value::{NODE_BYTES, Value};
use super::{Emitted, ScriptBudget, ScriptError};

type Eval<T> = Result<T, ScriptError>;

// The wall clock is consulted every this many steps, and on every charge at
// least this large.
const CLOCK_INTERVAL: u64 = 1024;

// Copying or building this many bytes of values costs one step.
const BYTES_PER_STEP: u64 = 64;

/// Deepest array/object nesting a script may build. Emitted rows stay
/// readable by JSON parsers that stop at 128 levels.
pub(crate) const MAX_VALUE_DEPTH: usize = 100;

const GLOBALS: &[&str] = &["Array", "Object", "JSON"];

enum Flow {
    Normal,
    Break,
    Continue,
    Return,
}

/// One isolated evaluation of a map function.
///
/// Every run owns its scopes and emit buffer; nothing survives the call.
pub(crate) struct Interpreter<'a> {
    budget: &'a ScriptBudget,
    scopes: Vec<HashMap<String, Value>>,
    steps: u64,
    allocated: u64,
    started: Instant,
    emitted: Vec<Emitted>,
}

impl<'a> Interpreter<'a> {
    pub(crate) fn new(budget: &'a ScriptBudget) -> Self {
        Self {
            budget,
            scopes: Vec::new(),
            steps: 0,
            allocated: 0,
            started: Instant::now(),
            emitted: Vec::new(),
        }
    }

    /// Runs `function` with `arg` bound to its parameter and returns what it
    /// emitted.
    pub(crate) fn call(mut self, function: &Function, arg: Value) -> Eval<Vec<Emitted>> {
        let mut frame = HashMap::new();
        if let Some(param) = &function.param {
            frame.insert(param.clone(), arg);
        }
        self.scopes.push(frame);
        for stmt in &function.body {
            if let Flow::Return = self.exec(stmt)? {
                break;
            }
        }
        Ok(self.emitted)
    }

    fn tick(&mut self) -> Eval<()> {
        self.charge(1)
    }

    fn charge(&mut self, steps: u64) -> Eval<()> {
        self.steps = self.steps.saturating_add(steps);
        if self.steps > self.budget.fuel {
            return Err(ScriptError::FuelExhausted(self.budget.fuel));
        }
        let clock_due = steps >= CLOCK_INTERVAL || self.steps % CLOCK_INTERVAL < steps;
        if clock_due && self.started.elapsed() > self.budget.timeout {
            return Err(ScriptError::Timeout(self.budget.timeout.as_millis() as u64));
        }
        Ok(())
    }

    /// Accounts for `bytes` of values that were just copied or built.
    fn allocate(&mut self, bytes: u64) -> Eval<()> {
        self.allocated = self.allocated.saturating_add(bytes);
        if self.allocated > self.budget.max_value_bytes {
            return Err(ScriptError::MemoryExceeded(self.budget.max_value_bytes));
        }
        self.charge(bytes / BYTES_PER_STEP)
    }

    /// Accounts for a freshly built array or object whose elements were
    /// already accounted for.
    fn built(&mut self, value: Value) -> Eval<Value> {
        if value.footprint().depth > MAX_VALUE_DEPTH {
            return Err(ScriptError::NestingTooDeep(MAX_VALUE_DEPTH));
        }
        self.allocate(value.shallow_bytes())?;
        Ok(value)
    }

    /// Array slots a write may still create before a limit is hit, and the
    /// error raised past that.
    fn slot_headroom(&self) -> (u64, ScriptError) {
        let by_fuel =
            self.budget.fuel.saturating_sub(self.steps).saturating_mul(BYTES_PER_STEP) / NODE_BYTES;
        let by_memory = self.budget.max_value_bytes.saturating_sub(self.allocated) / NODE_BYTES;
        if by_memory < by_fuel {
            (by_memory, ScriptError::MemoryExceeded(self.budget.max_value_bytes))
        } else {
            (by_fuel, ScriptError::FuelExhausted(self.budget.fuel))
        }
    }

    fn is_bound(&self, name: &str) -> bool {
        self.scopes.iter().any(|scope| scope.contains_key(name))
    }

    fn lookup_mut(&mut self, name: &str) -> Eval<&mut Value> {
        self.scopes
            .iter_mut()
            .rev()
            .find_map(|scope| scope.get_mut(name))
            .ok_or_else(|| ScriptError::Reference(format!("{name} is not defined")))
    }

    fn scoped<T>(&mut self, f: impl FnOnce(&mut Self) -> Eval<T>) -> Eval<T> {
        self.scopes.push(HashMap::new());
        let result = f(self);
        self.scopes.pop();
        result
    }

    fn declare(&mut self, name: &str, value: Value) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string(), value);
        }
    }

    fn exec_block(&mut self, stmts: &[Stmt]) -> Eval<Flow> {
        for stmt in stmts {
            match self.exec(stmt)? {
                Flow::Normal => {}
                flow => return Ok(flow),
            }
        }
        Ok(Flow::Normal)
    }

    fn exec(&mut self, stmt: &Stmt) -> Eval<Flow> {
        self.tick()?;
        match stmt {
            Stmt::Empty => Ok(Flow::Normal),
            Stmt::Expr(Expr::Assign(op, target, value)) => {
                self.assign_expr(*op, target, value, false)?;
                Ok(Flow::Normal)
            }
            Stmt::Expr(expr) => {
                self.eval(expr)?;
                Ok(Flow::Normal)
            }
            Stmt::Declare(bindings) => {
                for (name, init) in bindings {
                    let value = match init {
                        Some(expr) => self.eval(expr)?,
                        None => Value::Undefined,
                    };
                    self.declare(name, value);
                }
                Ok(Flow::Normal)
            }
            Stmt::Block(stmts) => self.scoped(|this| this.exec_block(stmts)),
            Stmt::If(test, then, otherwise) => {
                if self.eval(test)?.truthy() {
                    self.exec(then)
                } else if let Some(otherwise) = otherwise {
                    self.exec(otherwise)
                } else {
                    Ok(Flow::Normal)
                }
            }
            Stmt::While(test, body) => {
                while self.eval(test)?.truthy() {
                    match self.exec(body)? {
                        Flow::Break => break,
                        Flow::Return => return Ok(Flow::Return),
                        Flow::Normal | Flow::Continue => {}
                    }
                }
                Ok(Flow::Normal)
            }
            Stmt::For {
                init,
                test,
                update,
                body,
            } => self.scoped(|this| {
                if let Some(init) = init {
                    this.exec(init)?;
                }
                loop {
                    if let Some(test) = test
                        && !this.eval(test)?.truthy()
                    {
                        break;
                    }
                    match this.exec(body)? {
                        Flow::Break => break,
                        Flow::Return => return Ok(Flow::Return),
                        Flow::Normal | Flow::Continue => {}
                    }
                    if let Some(update) = update {
                        this.eval(update)?;
                    }
                }
                Ok(Flow::Normal)
            }),
            Stmt::ForOf(name, source, body) => {
                let items = match self.eval(source)? {
                    Value::Array(items) => items,
                    Value::String(s) => {
                        let chars: Vec<Value> =
                            s.chars().map(|c| Value::String(c.to_string())).collect();
                        self.allocate(list_bytes(&chars))?;
                        chars
                    }
                    other => {
                        return Err(ScriptError::Type(format!(
                            "{} is not iterable",
                            other.to_display()
                        )));
                    }
                };
                self.iterate(name, items, body)
            }
            Stmt::ForIn(name, source, body) => {
                let keys: Vec<Value> = own_keys(&self.eval(source)?)
                    .into_iter()
                    .map(Value::String)
                    .collect();
                self.allocate(list_bytes(&keys))?;
                self.iterate(name, keys, body)
            }
            Stmt::Break => Ok(Flow::Break),
            Stmt::Continue => Ok(Flow::Continue),
            Stmt::Return(value) => {
                if let Some(value) = value {
                    self.eval(value)?;
                }
                Ok(Flow::Return)
            }
            Stmt::Throw(value) => {
                let thrown = self.eval(value)?;
                let message = match thrown {
                    Value::String(s) => s,
                    other => other.to_json().to_string(),
                };
                Err(ScriptError::Thrown(message))
            }
        }
    }

    fn iterate(&mut self, name: &str, items: Vec<Value>, body: &Stmt) -> Eval<Flow> {
        for item in items {
            self.tick()?;
            let flow = self.scoped(|this| {
                this.declare(name, item);
                this.exec(body)
            })?;
            match flow {
                Flow::Break => break,
                Flow::Return => return Ok(Flow::Return),
                Flow::Normal | Flow::Continue => {}
            }
        }
        Ok(Flow::Normal)
    }

    fn eval(&mut self, expr: &Expr) -> Eval<Value> {
        self.tick()?;
        match expr {
            Expr::Literal(value) => Ok(value.clone()),
            Expr::Ident(_) | Expr::Member(..) => self.read(expr),
            Expr::Array(items) => {
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    values.push(self.eval(item)?);
                }
                self.built(Value::Array(values))
            }
            Expr::Object(fields) => {
                let mut map = BTreeMap::new();
                for (key, value) in fields {
                    map.insert(key.clone(), self.eval(value)?);
                }
                self.built(Value::Object(map))
            }
            Expr::Call(callee, args) => self.call_expr(callee, args),
            Expr::Unary(UnaryOp::TypeOf, operand)
                if matches!(operand.as_ref(), Expr::Ident(name) if !self.is_bound(name)) =>
            {
                Ok(Value::String("undefined".to_string()))
            }
            Expr::Unary(op, operand) => {
                let value = self.eval(operand)?;
                Ok(match op {
                    UnaryOp::Not => Value::Bool(!value.truthy()),
                    UnaryOp::Neg => Value::Number(-value.to_number()),
                    UnaryOp::Plus => Value::Number(value.to_number()),
                    UnaryOp::TypeOf => Value::String(value.type_of().to_string()),
                })
            }
            Expr::Update {
                increment,
                prefix,
                target,
            } => {
                let old = self.eval(target)?.to_number();
                let new = if *increment { old + 1.0 } else { old - 1.0 };
                self.assign(target, Value::Number(new))?;
                Ok(Value::Number(if *prefix { new } else { old }))
            }
            Expr::Binary(op, left, right) => {
                let left = self.eval(left)?;
                let right = self.eval(right)?;
                self.combine(*op, &left, &right)
            }
            Expr::Logical(op, left, right) => {
                let left = self.eval(left)?;
                match (op, left.truthy()) {
                    (LogicalOp::And, false) | (LogicalOp::Or, true) => Ok(left),
                    _ => self.eval(right),
                }
            }
            Expr::Conditional(test, then, otherwise) => {
                if self.eval(test)?.truthy() {
                    self.eval(then)
                } else {
                    self.eval(otherwise)
                }
            }
            Expr::Assign(op, target, value) => self.assign_expr(*op, target, value, true),
        }
    }

    /// Reads an identifier or member chain.
    ///
    /// The chain is walked by reference when it starts at a variable, so
    /// only the value it ends at is copied and paid for.
    fn read(&mut self, expr: &Expr) -> Eval<Value> {
        let mut properties = Vec::new();
        let mut cursor = expr;
        while let Expr::Member(object, property) = cursor {
            properties.push(property.as_ref());
            cursor = object.as_ref();
        }
        properties.reverse();

        let Expr::Ident(root) = cursor else {
            let mut value = self.eval(cursor)?;
            for property in properties {
                let key = self.eval(property)?;
                value = get_member(&value, &key)?;
            }
            return Ok(value);
        };

        let mut keys = Vec::with_capacity(properties.len());
        for property in properties {
            keys.push(self.eval(property)?);
        }
        let bytes = match resolve(&self.scopes, root, &keys)? {
            Cow::Borrowed(value) => value.footprint().bytes,
            Cow::Owned(value) => value.shallow_bytes(),
        };
        self.allocate(bytes)?;
        Ok(resolve(&self.scopes, root, &keys)?.into_owned())
    }

    fn combine(&mut self, op: BinaryOp, left: &Value, right: &Value) -> Eval<Value> {
        let result = binary(op, left, right);
        self.allocate(result.shallow_bytes())?;
        Ok(result)
    }

    /// Evaluates an assignment. The assigned value is only copied when the
    /// expression's result is used.
    fn assign_expr(
        &mut self,
        op: AssignOp,
        target: &Expr,
        value: &Expr,
        keep: bool,
    ) -> Eval<Value> {
        let mut value = self.eval(value)?;
        if op != AssignOp::Set {
            let current = self.eval(target)?;
            let op = if op == AssignOp::Add {
                BinaryOp::Add
            } else {
                BinaryOp::Sub
            };
            value = self.combine(op, &current, &value)?;
        }
        if !keep {
            self.assign(target, value)?;
            return Ok(Value::Undefined);
        }
        self.allocate(value.footprint().bytes)?;
        self.assign(target, value.clone())?;
        Ok(value)
    }

    /// Writes `value` through an identifier or member chain, updating the
    /// root variable in place.
    fn assign(&mut self, target: &Expr, value: Value) -> Eval<()> {
        let mut path = Vec::new();
        let mut cursor = target;
        while let Expr::Member(object, property) = cursor {
            path.push(self.eval(property)?);
            cursor = object.as_ref();
        }
        let Expr::Ident(root) = cursor else {
            return Err(ScriptError::Type("invalid assignment target".to_string()));
        };
        path.reverse();

        // The root grows at most this deep; everything else already fits.
        if !path.is_empty() && path.len() + value.footprint().depth > MAX_VALUE_DEPTH {
            return Err(ScriptError::NestingTooDeep(MAX_VALUE_DEPTH));
        }

        let (headroom, exhausted) = self.slot_headroom();
        let slot = self.lookup_mut(root)?;
        let Some((last, parents)) = path.split_last() else {
            *slot = value;
            return Ok(());
        };
        let mut slot = slot;
        for key in parents {
            slot = child_mut(slot, key)?;
        }
        let grown = set_child(slot, last, value, headroom, exhausted)?;
        self.allocate(grown * NODE_BYTES)
    }

    fn eval_args(&mut self, args: &[Expr]) -> Eval<Vec<Value>> {
        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            values.push(self.eval(arg)?);
        }
        Ok(values)
    }

    fn call_expr(&mut self, callee: &Expr, args: &[Expr]) -> Eval<Value> {
        let result = match callee {
            Expr::Ident(name) if name == "emit" && !self.is_bound(name) => {
                let args = self.eval_args(args)?;
                return self.emit(args);
            }
            Expr::Member(object, property) => {
                if let Expr::Ident(global) = object.as_ref()
                    && GLOBALS.contains(&global.as_str())
                    && !self.is_bound(global)
                {
                    let method = self.eval(property)?.to_display();
                    let args = self.eval_args(args)?;
                    call_global(global, &method, &args)?
                } else {
                    let receiver = self.eval(object)?;
                    let method = self.eval(property)?.to_display();
                    let args = self.eval_args(args)?;
                    call_method(&receiver, &method, &args)?
                }
            }
            Expr::Ident(name) if !self.is_bound(name) => {
                return Err(ScriptError::Reference(format!("{name} is not defined")));
            }
            _ => return Err(ScriptError::Type("expression is not a function".to_string())),
        };
        self.allocate(result.footprint().bytes)?;
        Ok(result)
    }

    fn emit(&mut self, mut args: Vec<Value>) -> Eval<Value> {
        if self.emitted.len() >= self.budget.max_emits {
            return Err(ScriptError::TooManyEmits(self.budget.max_emits));
        }
        args.resize(2, Value::Undefined);
        self.emitted.push(Emitted {
            key: args[0].to_json(),
            value: args[1].to_json(),
        });
        Ok(Value::Undefined)
    }
}

fn list_bytes(items: &[Value]) -> u64 {
    items
        .iter()
        .map(|item| NODE_BYTES + item.shallow_bytes())
        .sum()
}

/// Follows `keys` from the variable `root` without copying intermediate
/// values.
fn resolve<'v>(
    scopes: &'v [HashMap<String, Value>],
    root: &str,
    keys: &[Value],
) -> Eval<Cow<'v, Value>> {
    let mut current = scopes
        .iter()
        .rev()
        .find_map(|scope| scope.get(root))
        .map(Cow::Borrowed)
        .ok_or_else(|| ScriptError::Reference(format!("{root} is not defined")))?;
    for key in keys {
        current = match current {
            Cow::Borrowed(object) => match child_ref(object, key) {
                Some(child) => Cow::Borrowed(child),
                None => Cow::Owned(get_member(object, key)?),
            },
            Cow::Owned(object) => Cow::Owned(get_member(&object, key)?),
        };
    }
    Ok(current)
}

fn child_ref<'v>(object: &'v Value, key: &Value) -> Option<&'v Value> {
    match object {
        Value::Object(map) => map.get(&key.to_display()),
        Value::Array(items) => array_index(key).and_then(|i| items.get(i)),
        _ => None,
    }
}

fn array_index(key: &Value) -> Option<usize> {
    match key {
        Value::Number(n) if *n >= 0.0 && n.fract() == 0.0 => Some(*n as usize),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn own_keys(value: &Value) -> Vec<String> {
    match value {
        Value::Object(map) => map.keys().cloned().collect(),
        Value::Array(items) => (0..items.len()).map(|i| i.to_string()).collect(),
        Value::String(s) => (0..s.chars().count()).map(|i| i.to_string()).collect(),
        _ => Vec::new(),
    }
}

fn get_member(object: &Value, key: &Value) -> Eval<Value> {
    let name = key.to_display();
    match object {
        Value::Undefined | Value::Null => Err(ScriptError::Type(format!(
            "cannot read property '{name}' of {}",
            object.to_display()
        ))),
        Value::Array(items) if name == "length" => Ok(Value::Number(items.len() as f64)),
        Value::Array(items) => Ok(array_index(key)
            .and_then(|i| items.get(i).cloned())
            .unwrap_or(Value::Undefined)),
        Value::String(s) if name == "length" => Ok(Value::Number(s.chars().count() as f64)),
        Value::String(s) => Ok(array_index(key)
            .and_then(|i| s.chars().nth(i))
            .map(|c| Value::String(c.to_string()))
            .unwrap_or(Value::Undefined)),
        Value::Object(map) => Ok(map.get(&name).cloned().unwrap_or(Value::Undefined)),
        _ => Ok(Value::Undefined),
    }
}

fn child_mut<'v>(slot: &'v mut Value, key: &Value) -> Eval<&'v mut Value> {
    let name = key.to_display();
    let child = match slot {
        Value::Object(map) => map.get_mut(&name),
        Value::Array(items) => array_index(key).and_then(|i| items.get_mut(i)),
        _ => None,
    };
    child.ok_or_else(|| ScriptError::Type(format!("cannot set property of undefined '{name}'")))
}

/// Sets one property, returning how many array slots had to be created.
/// Creating more than `headroom` slots fails with `exhausted`.
fn set_child(
    slot: &mut Value,
    key: &Value,
    value: Value,
    headroom: u64,
    exhausted: ScriptError,
) -> Eval<u64> {
    match slot {
        Value::Object(map) => {
            map.insert(key.to_display(), value);
            Ok(0)
        }
        Value::Array(items) => {
            let Some(index) = array_index(key) else {
                return Err(ScriptError::Type(format!(
                    "invalid array index '{}'",
                    key.to_display()
                )));
            };
            let grown = (index + 1).saturating_sub(items.len()) as u64;
            if grown > headroom {
                return Err(exhausted);
            }
            if grown > 0 {
                items.resize(index + 1, Value::Undefined);
            }
            items[index] = value;
            Ok(grown)
        }
        other => Err(ScriptError::Type(format!(
            "cannot set property '{}' on {}",
            key.to_display(),
            other.type_of()
        ))),
    }
}

fn binary(op: BinaryOp, left: &Value, right: &Value) -> Value {
    let numeric = |f: fn(f64, f64) -> f64| Value::Number(f(left.to_number(), right.to_number()));
    let compare = |f: fn(std::cmp::Ordering) -> bool| match (left, right) {
        (Value::String(a), Value::String(b)) => Value::Bool(f(a.cmp(b))),
        _ => Value::Bool(
            left.to_number()
                .partial_cmp(&right.to_number())
                .is_some_and(f),
        ),
    };
    match op {
        BinaryOp::Add => match (left, right) {
            (Value::Number(_) | Value::Bool(_) | Value::Null | Value::Undefined, _)
                if matches!(
                    right,
                    Value::Number(_) | Value::Bool(_) | Value::Null | Value::Undefined
                ) =>
            {
                numeric(|a, b| a + b)
            }
            _ => Value::String(format!("{}{}", left.to_display(), right.to_display())),
        },
        BinaryOp::Sub => numeric(|a, b| a - b),
        BinaryOp::Mul => numeric(|a, b| a * b),
        BinaryOp::Div => numeric(|a, b| a / b),
        BinaryOp::Rem => numeric(|a, b| a % b),
        BinaryOp::Lt => compare(|o| o.is_lt()),
        BinaryOp::Le => compare(|o| o.is_le()),
        BinaryOp::Gt => compare(|o| o.is_gt()),
        BinaryOp::Ge => compare(|o| o.is_ge()),
        BinaryOp::Eq => Value::Bool(left.loose_eq(right)),
        BinaryOp::Ne => Value::Bool(!left.loose_eq(right)),
        BinaryOp::StrictEq => Value::Bool(left.strict_eq(right)),
        BinaryOp::StrictNe => Value::Bool(!left.strict_eq(right)),
    }
}

fn call_global(global: &str, method: &str, args: &[Value]) -> Eval<Value> {
    let first = args.first().unwrap_or(&Value::Undefined);
    match (global, method) {
        ("Array", "isArray") => Ok(Value::Bool(matches!(first, Value::Array(_)))),
        ("Object", "keys") => match first {
            Value::Undefined | Value::Null => Err(ScriptError::Type(
                "cannot convert undefined or null to object".to_string(),
            )),
            other => Ok(Value::Array(
                own_keys(other).into_iter().map(Value::String).collect(),
            )),
        },
        ("JSON", "stringify") => Ok(match first {
            Value::Undefined => Value::Undefined,
            other => Value::String(other.to_json().to_string()),
        }),
        _ => Err(ScriptError::Type(format!("{global}.{method} is not a function"))),
    }
}

fn call_method(receiver: &Value, method: &str, args: &[Value]) -> Eval<Value> {
    let first = args.first().unwrap_or(&Value::Undefined);
    match (receiver, method) {
        (Value::String(s), "toLowerCase") => Ok(Value::String(s.to_lowercase())),
        (Value::String(s), "toUpperCase") => Ok(Value::String(s.to_uppercase())),
        (Value::String(s), "trim") => Ok(Value::String(s.trim().to_string())),
        (Value::String(s), "indexOf") => {
            let needle = first.to_display();
            Ok(Value::Number(match s.find(&needle) {
                Some(byte) => s[..byte].chars().count() as f64,
                None => -1.0,
            }))
        }
        (Value::String(s), "includes") => Ok(Value::Bool(s.contains(&first.to_display()))),
        (Value::String(s), "split") => {
            let parts: Vec<Value> = match first {
                Value::Undefined => vec![Value::String(s.clone())],
                separator => {
                    let separator = separator.to_display();
                    if separator.is_empty() {
                        s.chars().map(|c| Value::String(c.to_string())).collect()
                    } else {
                        s.split(separator.as_str())
                            .map(|part| Value::String(part.to_string()))
                            .collect()
                    }
                }
            };
            Ok(Value::Array(parts))
        }
        (Value::Array(items), "indexOf") => Ok(Value::Number(
            items
                .iter()
                .position(|item| item.strict_eq(first))
                .map_or(-1.0, |i| i as f64),
        )),
        (Value::Array(items), "includes") => {
            Ok(Value::Bool(items.iter().any(|item| item.strict_eq(first))))
        }
        (Value::Array(items), "join") => {
            let separator = match first {
                Value::Undefined => ",".to_string(),
                other => other.to_display(),
            };
            let joined = items
                .iter()
                .map(|item| match item {
                    Value::Undefined | Value::Null => String::new(),
                    other => other.to_display(),
                })
                .collect::<Vec<_>>()
                .join(&separator);
            Ok(Value::String(joined))
        }
        (Value::Undefined | Value::Null, _) => Err(ScriptError::Type(format!(
            "cannot read property '{method}' of {}",
            receiver.to_display()
        ))),
        _ => Err(ScriptError::Type(format!(
            "{}.{method} is not a function",
            receiver.type_of()
        ))),
    }
}
