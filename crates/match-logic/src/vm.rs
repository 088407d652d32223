//! Tree-walking interpreter for strategy scripts.
//!
//! The interpreter has no ambient capabilities: the only names a script can
//! resolve are its own locals, `context` and `Math`. Every statement and
//! expression burns one unit of fuel, the wall-clock deadline is polled
//! every few hundred steps, and every string or list the script builds is
//! charged against a byte budget. Lists are immutable, so the history
//! snapshots handed in through `context` cannot be modified.
//!
//! Recursion follows the syntax tree, whose depth the parser already caps.

use std::borrow::Cow;
use std::rc::Rc;
use std::time::Instant;

use crate::ast::{AssignOp, BinaryOp, Expr, Literal, LogicalOp, Program, Stmt, UnaryOp};
use crate::error::ScriptError;
use crate::random::SeededRng;
use crate::sandbox::SandboxLimits;
use crate::strategy::{Move, RoundContext};

// ── Constants ────────────────────────────────────────────────────────

/// Steps between wall-clock checks.
const DEADLINE_CHECK_INTERVAL: u64 = 256;

/// Bytes charged per list element.
const LIST_SLOT_BYTES: usize = std::mem::size_of::<Value>();

// ── Values ───────────────────────────────────────────────────────────

#[derive(Clone, Debug)]
pub enum Value {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    Str(Rc<str>),
    List(Rc<[Value]>),
    /// The `context` object
    Context,
    /// The `Math` namespace
    Math,
}

impl Value {
    /// Decode a script's return value. Only the exact strings `C` and `D` count.
    pub fn as_move(&self) -> Option<Move> {
        match self {
            Value::Str(s) => Move::from_symbol(s),
            _ => None,
        }
    }

    pub(crate) fn type_name(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::Str(_) => "string",
            Value::List(_) => "array",
            Value::Context | Value::Math => "object",
        }
    }

    fn truthy(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::Str(s) => !s.is_empty(),
            Value::List(_) | Value::Context | Value::Math => true,
        }
    }

    fn to_number(&self) -> Result<f64, ScriptError> {
        match self {
            Value::Undefined => Ok(f64::NAN),
            Value::Null => Ok(0.0),
            Value::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
            Value::Number(n) => Ok(*n),
            Value::Str(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    Ok(0.0)
                } else {
                    Ok(trimmed.parse().unwrap_or(f64::NAN))
                }
            }
            other => Err(runtime(format!("cannot convert {} to a number", other.type_name()))),
        }
    }
}

fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        (if n > 0.0 { "Infinity" } else { "-Infinity" }).to_string()
    } else if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

fn strict_equals(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Number(x), Value::Number(y)) => x == y,
        (Value::Str(x), Value::Str(y)) => x == y,
        (Value::List(x), Value::List(y)) => Rc::ptr_eq(x, y),
        (Value::Context, Value::Context) | (Value::Math, Value::Math) => true,
        _ => false,
    }
}

fn loose_equals(a: &Value, b: &Value) -> Result<bool, ScriptError> {
    match (a, b) {
        (Value::Undefined | Value::Null, Value::Undefined | Value::Null) => Ok(true),
        (Value::Undefined | Value::Null, _) | (_, Value::Undefined | Value::Null) => Ok(false),
        (Value::Number(_) | Value::Bool(_), Value::Str(_) | Value::Bool(_))
        | (Value::Str(_) | Value::Bool(_), Value::Number(_) | Value::Bool(_)) => {
            Ok(a.to_number()? == b.to_number()?)
        }
        _ => Ok(strict_equals(a, b)),
    }
}

fn runtime(message: impl Into<String>) -> ScriptError {
    ScriptError::Runtime(message.into())
}

// ── Execution ────────────────────────────────────────────────────────

/// Run a parsed script against one round's context.
///
/// Returns whatever the script returned (`undefined` if it fell off the end);
/// validating that value as a move is the caller's job.
pub fn run(
    program: &Program,
    ctx: RoundContext<'_>,
    rng: &mut SeededRng,
    limits: &SandboxLimits,
) -> Result<Value, ScriptError> {
    let mut machine = Machine::new(ctx, rng, limits);
    for stmt in &program.body {
        match machine.exec(stmt)? {
            Flow::Normal => {}
            Flow::Return(value) => return Ok(value),
            Flow::Break | Flow::Continue => return Err(runtime("break/continue outside of a loop")),
        }
    }
    Ok(Value::Undefined)
}

enum Flow {
    Normal,
    Break,
    Continue,
    Return(Value),
}

struct Local<'p> {
    name: &'p str,
    value: Value,
    constant: bool,
}

struct Machine<'p, 'c> {
    ctx: RoundContext<'c>,
    rng: &'c mut SeededRng,
    limits: &'c SandboxLimits,
    deadline: Option<Instant>,
    steps: u64,
    allocated: usize,
    locals: Vec<Local<'p>>,
    /// Start index into `locals` of each open block scope
    scopes: Vec<usize>,
    cooperate: Rc<str>,
    defect: Rc<str>,
    my_history: Option<Rc<[Value]>>,
    opponent_history: Option<Rc<[Value]>>,
    payoff_history: Option<Rc<[Value]>>,
}

impl<'p, 'c> Machine<'p, 'c> {
    fn new(ctx: RoundContext<'c>, rng: &'c mut SeededRng, limits: &'c SandboxLimits) -> Self {
        Self {
            ctx,
            rng,
            limits,
            deadline: limits.timeout().map(|timeout| Instant::now() + timeout),
            steps: 0,
            allocated: 0,
            locals: Vec::new(),
            scopes: vec![0],
            cooperate: Rc::from("C"),
            defect: Rc::from("D"),
            my_history: None,
            opponent_history: None,
            payoff_history: None,
        }
    }

    // -- Quotas --

    fn tick(&mut self) -> Result<(), ScriptError> {
        self.steps += 1;
        if self.steps > self.limits.fuel {
            return Err(ScriptError::FuelExhausted(self.limits.fuel));
        }
        if self.steps % DEADLINE_CHECK_INTERVAL == 0 {
            if let (Some(deadline), Some(timeout)) = (self.deadline, self.limits.timeout()) {
                if Instant::now() >= deadline {
                    return Err(ScriptError::Timeout(timeout));
                }
            }
        }
        Ok(())
    }

    fn charge(&mut self, bytes: usize) -> Result<(), ScriptError> {
        self.allocated = self.allocated.saturating_add(bytes);
        if self.allocated > self.limits.memory {
            return Err(ScriptError::MemoryExceeded(self.limits.memory));
        }
        Ok(())
    }

    fn new_list(&mut self, items: Vec<Value>) -> Result<Value, ScriptError> {
        self.charge(items.len().saturating_mul(LIST_SLOT_BYTES))?;
        Ok(Value::List(Rc::from(items)))
    }

    fn new_string(&mut self, text: String) -> Result<Value, ScriptError> {
        self.charge(text.len())?;
        Ok(Value::Str(Rc::from(text)))
    }

    /// Append the string form of `value` to `out`.
    ///
    /// Lists can share children, so their text may be far larger than the
    /// slots charged when they were built. Every element visited burns fuel
    /// and every byte is charged before it is written.
    fn stringify(&mut self, value: &Value, out: &mut String) -> Result<(), ScriptError> {
        let mut pending: Vec<(&Value, bool)> = vec![(value, false)];
        while let Some((value, separated)) = pending.pop() {
            self.tick()?;
            if separated {
                self.charge(1)?;
                out.push(',');
            }
            let text: Cow<'_, str> = match value {
                Value::List(items) => {
                    self.charge(items.len().saturating_mul(LIST_SLOT_BYTES))?;
                    pending.extend(items.iter().enumerate().rev().map(|(i, item)| (item, i > 0)));
                    continue;
                }
                Value::Str(s) => Cow::Borrowed(&**s),
                Value::Undefined => Cow::Borrowed("undefined"),
                Value::Null => Cow::Borrowed("null"),
                Value::Bool(b) => Cow::Borrowed(if *b { "true" } else { "false" }),
                Value::Number(n) => Cow::Owned(format_number(*n)),
                Value::Context | Value::Math => Cow::Borrowed("[object Object]"),
            };
            self.charge(text.len())?;
            out.push_str(&text);
        }
        Ok(())
    }

    // -- Scopes --

    fn push_scope(&mut self) {
        self.scopes.push(self.locals.len());
    }

    fn pop_scope(&mut self) {
        if let Some(start) = self.scopes.pop() {
            self.locals.truncate(start);
        }
    }

    fn declare(&mut self, name: &'p str, value: Value, constant: bool) -> Result<(), ScriptError> {
        let start = self.scopes.last().copied().unwrap_or(0);
        if self.locals[start..].iter().any(|local| local.name == name) {
            return Err(runtime(format!("'{}' has already been declared", name)));
        }
        self.locals.push(Local { name, value, constant });
        Ok(())
    }

    fn resolve(&self, name: &str) -> Result<Value, ScriptError> {
        if let Some(local) = self.locals.iter().rev().find(|local| local.name == name) {
            return Ok(local.value.clone());
        }
        match name {
            "context" => Ok(Value::Context),
            "Math" => Ok(Value::Math),
            _ => Err(runtime(format!("'{}' is not defined", name))),
        }
    }

    fn assign(&mut self, name: &str, op: AssignOp, rhs: Value) -> Result<(), ScriptError> {
        let index = self
            .locals
            .iter()
            .rposition(|local| local.name == name)
            .ok_or_else(|| runtime(format!("cannot assign to undeclared '{}'", name)))?;
        if self.locals[index].constant {
            return Err(runtime(format!("assignment to constant '{}'", name)));
        }
        let current = self.locals[index].value.clone();
        let value = match op {
            AssignOp::Set => rhs,
            AssignOp::Add => self.binary(BinaryOp::Add, current, rhs)?,
            AssignOp::Sub => self.binary(BinaryOp::Sub, current, rhs)?,
        };
        self.locals[index].value = value;
        Ok(())
    }

    // -- Statements --

    fn exec(&mut self, stmt: &'p Stmt) -> Result<Flow, ScriptError> {
        self.tick()?;
        match stmt {
            Stmt::Let { name, init, constant } => {
                let value = match init {
                    Some(expr) => self.eval(expr)?,
                    None => Value::Undefined,
                };
                self.declare(name, value, *constant)?;
                Ok(Flow::Normal)
            }
            Stmt::Assign { name, op, value } => {
                let rhs = self.eval(value)?;
                self.assign(name, *op, rhs)?;
                Ok(Flow::Normal)
            }
            Stmt::Expr(expr) => {
                self.eval(expr)?;
                Ok(Flow::Normal)
            }
            Stmt::If { test, consequent, alternate } => {
                if self.eval(test)?.truthy() {
                    self.exec(consequent)
                } else if let Some(alternate) = alternate {
                    self.exec(alternate)
                } else {
                    Ok(Flow::Normal)
                }
            }
            Stmt::While { test, body } => {
                loop {
                    self.tick()?;
                    if !self.eval(test)?.truthy() {
                        break;
                    }
                    match self.exec(body)? {
                        Flow::Break => break,
                        Flow::Normal | Flow::Continue => {}
                        ret @ Flow::Return(_) => return Ok(ret),
                    }
                }
                Ok(Flow::Normal)
            }
            Stmt::For { init, test, update, body } => {
                self.push_scope();
                let flow = self.exec_for(init.as_deref(), test.as_ref(), update.as_deref(), body);
                self.pop_scope();
                flow
            }
            Stmt::Block(body) => {
                self.push_scope();
                let mut flow = Ok(Flow::Normal);
                for stmt in body {
                    flow = self.exec(stmt);
                    if !matches!(flow, Ok(Flow::Normal)) {
                        break;
                    }
                }
                self.pop_scope();
                flow
            }
            Stmt::Break => Ok(Flow::Break),
            Stmt::Continue => Ok(Flow::Continue),
            Stmt::Return(value) => {
                let value = match value {
                    Some(expr) => self.eval(expr)?,
                    None => Value::Undefined,
                };
                Ok(Flow::Return(value))
            }
            Stmt::Throw(expr) => {
                let value = self.eval(expr)?;
                let mut message = String::new();
                self.stringify(&value, &mut message)?;
                Err(ScriptError::Thrown(message))
            }
            Stmt::Empty => Ok(Flow::Normal),
        }
    }

    fn exec_for(
        &mut self,
        init: Option<&'p Stmt>,
        test: Option<&'p Expr>,
        update: Option<&'p Stmt>,
        body: &'p Stmt,
    ) -> Result<Flow, ScriptError> {
        if let Some(init) = init {
            self.exec(init)?;
        }
        loop {
            self.tick()?;
            if let Some(test) = test {
                if !self.eval(test)?.truthy() {
                    break;
                }
            }
            match self.exec(body)? {
                Flow::Break => break,
                Flow::Normal | Flow::Continue => {}
                ret @ Flow::Return(_) => return Ok(ret),
            }
            if let Some(update) = update {
                self.exec(update)?;
            }
        }
        Ok(Flow::Normal)
    }

    // -- Expressions --

    fn eval(&mut self, expr: &'p Expr) -> Result<Value, ScriptError> {
        self.tick()?;
        match expr {
            Expr::Literal(literal) => Ok(match literal {
                Literal::Number(n) => Value::Number(*n),
                Literal::Str(s) => match s.as_str() {
                    "C" => Value::Str(self.cooperate.clone()),
                    "D" => Value::Str(self.defect.clone()),
                    other => Value::Str(Rc::from(other)),
                },
                Literal::Bool(b) => Value::Bool(*b),
                Literal::Null => Value::Null,
                Literal::Undefined => Value::Undefined,
            }),
            Expr::Array(items) => {
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    values.push(self.eval(item)?);
                }
                self.new_list(values)
            }
            Expr::Ident(name) => self.resolve(name),
            Expr::Member { object, property } => {
                let target = self.eval(object)?;
                self.member(target, property)
            }
            Expr::Index { object, index } => {
                let target = self.eval(object)?;
                let index = self.eval(index)?;
                self.index(target, index)
            }
            Expr::Call { callee, args } => match &**callee {
                Expr::Member { object, property } => {
                    let target = self.eval(object)?;
                    self.call_method(target, property, args)
                }
                other => {
                    let value = self.eval(other)?;
                    Err(runtime(format!("{} is not a function", value.type_name())))
                }
            },
            Expr::Lambda { .. } => Err(runtime("arrow functions are only allowed as call arguments")),
            Expr::Unary { op, operand } => {
                let value = self.eval(operand)?;
                Ok(match op {
                    UnaryOp::Not => Value::Bool(!value.truthy()),
                    UnaryOp::Neg => Value::Number(-value.to_number()?),
                    UnaryOp::Plus => Value::Number(value.to_number()?),
                })
            }
            Expr::Binary { op, lhs, rhs } => {
                let lhs = self.eval(lhs)?;
                let rhs = self.eval(rhs)?;
                self.binary(*op, lhs, rhs)
            }
            Expr::Logical { op, lhs, rhs } => {
                let lhs = self.eval(lhs)?;
                match (op, lhs.truthy()) {
                    (LogicalOp::And, false) | (LogicalOp::Or, true) => Ok(lhs),
                    _ => self.eval(rhs),
                }
            }
            Expr::Conditional { test, consequent, alternate } => {
                if self.eval(test)?.truthy() {
                    self.eval(consequent)
                } else {
                    self.eval(alternate)
                }
            }
        }
    }

    fn binary(&mut self, op: BinaryOp, lhs: Value, rhs: Value) -> Result<Value, ScriptError> {
        let value = match op {
            BinaryOp::Add => {
                if matches!(lhs, Value::Str(_)) || matches!(rhs, Value::Str(_)) {
                    let mut text = String::new();
                    self.stringify(&lhs, &mut text)?;
                    self.stringify(&rhs, &mut text)?;
                    return Ok(Value::Str(Rc::from(text)));
                }
                Value::Number(lhs.to_number()? + rhs.to_number()?)
            }
            BinaryOp::Sub => Value::Number(lhs.to_number()? - rhs.to_number()?),
            BinaryOp::Mul => Value::Number(lhs.to_number()? * rhs.to_number()?),
            BinaryOp::Div => Value::Number(lhs.to_number()? / rhs.to_number()?),
            BinaryOp::Rem => Value::Number(lhs.to_number()? % rhs.to_number()?),
            BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
                let ordering = match (&lhs, &rhs) {
                    (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
                    _ => lhs.to_number()?.partial_cmp(&rhs.to_number()?),
                };
                let Some(ordering) = ordering else {
                    // NaN compares false both ways
                    return Ok(Value::Bool(false));
                };
                Value::Bool(match op {
                    BinaryOp::Lt => ordering.is_lt(),
                    BinaryOp::Le => ordering.is_le(),
                    BinaryOp::Gt => ordering.is_gt(),
                    _ => ordering.is_ge(),
                })
            }
            BinaryOp::StrictEq => Value::Bool(strict_equals(&lhs, &rhs)),
            BinaryOp::StrictNotEq => Value::Bool(!strict_equals(&lhs, &rhs)),
            BinaryOp::Eq => Value::Bool(loose_equals(&lhs, &rhs)?),
            BinaryOp::NotEq => Value::Bool(!loose_equals(&lhs, &rhs)?),
        };
        Ok(value)
    }

    // -- Objects --

    fn history(&mut self, field: HistoryField) -> Value {
        let cached = match field {
            HistoryField::Mine => &self.my_history,
            HistoryField::Opponent => &self.opponent_history,
            HistoryField::Payoff => &self.payoff_history,
        };
        if let Some(list) = cached {
            return Value::List(list.clone());
        }
        let items: Rc<[Value]> = match field {
            HistoryField::Mine => self.moves(self.ctx.my_history),
            HistoryField::Opponent => self.moves(self.ctx.opponent_history),
            HistoryField::Payoff => self
                .ctx
                .payoff_history
                .iter()
                .map(|&score| Value::Number(score as f64))
                .collect(),
        };
        let slot = match field {
            HistoryField::Mine => &mut self.my_history,
            HistoryField::Opponent => &mut self.opponent_history,
            HistoryField::Payoff => &mut self.payoff_history,
        };
        *slot = Some(items.clone());
        Value::List(items)
    }

    fn moves(&self, history: &[Move]) -> Rc<[Value]> {
        history
            .iter()
            .map(|m| match m {
                Move::Cooperate => Value::Str(self.cooperate.clone()),
                Move::Defect => Value::Str(self.defect.clone()),
            })
            .collect()
    }

    fn member(&mut self, target: Value, property: &str) -> Result<Value, ScriptError> {
        match (&target, property) {
            (Value::Context, "round") => Ok(Value::Number(self.ctx.round as f64)),
            (Value::Context, "totalRounds") => Ok(Value::Number(self.ctx.total_rounds as f64)),
            (Value::Context, "myHistory") => Ok(self.history(HistoryField::Mine)),
            (Value::Context, "opponentHistory") => Ok(self.history(HistoryField::Opponent)),
            (Value::Context, "payoffHistory") => Ok(self.history(HistoryField::Payoff)),
            (Value::List(items), "length") => Ok(Value::Number(items.len() as f64)),
            (Value::Str(s), "length") => Ok(Value::Number(s.chars().count() as f64)),
            (Value::Undefined | Value::Null, _) => Err(runtime(format!(
                "cannot read property '{}' of {}",
                property,
                target.type_name()
            ))),
            _ => Err(runtime(format!("{} has no property '{}'", target.type_name(), property))),
        }
    }

    fn index(&mut self, target: Value, index: Value) -> Result<Value, ScriptError> {
        match (&target, &index) {
            (Value::Undefined | Value::Null, _) => {
                Err(runtime(format!("cannot index {}", target.type_name())))
            }
            (Value::Context, Value::Str(name)) => self.member(target.clone(), name),
            (Value::List(items), _) => {
                Ok(position(&index, items.len())?.map_or(Value::Undefined, |i| items[i].clone()))
            }
            (Value::Str(s), _) => {
                let len = s.chars().count();
                match position(&index, len)? {
                    Some(i) => {
                        let ch = s.chars().nth(i).map(String::from).unwrap_or_default();
                        self.new_string(ch)
                    }
                    None => Ok(Value::Undefined),
                }
            }
            _ => Ok(Value::Undefined),
        }
    }

    fn call_method(
        &mut self,
        target: Value,
        name: &str,
        args: &'p [Expr],
    ) -> Result<Value, ScriptError> {
        match target {
            Value::Math => self.call_math(name, args),
            Value::List(items) => self.call_list(&items, name, args),
            Value::Undefined | Value::Null => Err(runtime(format!(
                "cannot call '{}' on {}",
                name,
                target.type_name()
            ))),
            other => Err(runtime(format!("{}.{} is not a function", other.type_name(), name))),
        }
    }

    fn arg(&mut self, args: &'p [Expr], i: usize) -> Result<Value, ScriptError> {
        match args.get(i) {
            Some(expr) => self.eval(expr),
            None => Ok(Value::Undefined),
        }
    }

    fn number_arg(&mut self, args: &'p [Expr], i: usize) -> Result<f64, ScriptError> {
        self.arg(args, i)?.to_number()
    }

    fn call_math(&mut self, name: &str, args: &'p [Expr]) -> Result<Value, ScriptError> {
        let n = match name {
            "random" => self.rng.next_f64(),
            "floor" => self.number_arg(args, 0)?.floor(),
            "ceil" => self.number_arg(args, 0)?.ceil(),
            "round" => (self.number_arg(args, 0)? + 0.5).floor(),
            "abs" => self.number_arg(args, 0)?.abs(),
            "min" | "max" => {
                let mut acc = if name == "min" { f64::INFINITY } else { f64::NEG_INFINITY };
                for i in 0..args.len() {
                    let v = self.number_arg(args, i)?;
                    if v.is_nan() {
                        acc = f64::NAN;
                    } else if !acc.is_nan() {
                        acc = if name == "min" { acc.min(v) } else { acc.max(v) };
                    }
                }
                acc
            }
            _ => return Err(runtime(format!("Math.{} is not a function", name))),
        };
        Ok(Value::Number(n))
    }

    fn call_list(
        &mut self,
        items: &Rc<[Value]>,
        name: &str,
        args: &'p [Expr],
    ) -> Result<Value, ScriptError> {
        match name {
            "includes" => {
                let needle = self.arg(args, 0)?;
                Ok(Value::Bool(items.iter().any(|v| strict_equals(v, &needle))))
            }
            "indexOf" => {
                let needle = self.arg(args, 0)?;
                let found = items.iter().position(|v| strict_equals(v, &needle));
                Ok(Value::Number(found.map_or(-1.0, |i| i as f64)))
            }
            "count" => {
                let needle = self.arg(args, 0)?;
                let count = items.iter().filter(|v| strict_equals(v, &needle)).count();
                Ok(Value::Number(count as f64))
            }
            "at" => {
                let len = items.len() as f64;
                let mut i = self.number_arg(args, 0)?.trunc();
                if i.is_nan() {
                    i = 0.0;
                }
                if i < 0.0 {
                    i += len;
                }
                if i >= 0.0 && i < len {
                    Ok(items[i as usize].clone())
                } else {
                    Ok(Value::Undefined)
                }
            }
            "slice" => {
                let len = items.len();
                let start = match self.arg(args, 0)? {
                    Value::Undefined => 0,
                    v => relative_index(v.to_number()?, len),
                };
                let end = match self.arg(args, 1)? {
                    Value::Undefined => len,
                    v => relative_index(v.to_number()?, len),
                };
                let slice = if start < end { items[start..end].to_vec() } else { Vec::new() };
                for _ in 0..slice.len() {
                    self.tick()?;
                }
                self.new_list(slice)
            }
            "filter" | "map" | "some" | "every" | "find" => {
                let (param, body) = lambda(args, name)?;
                let mut kept = Vec::new();
                for item in items.iter() {
                    let result = self.apply(param, body, item.clone())?;
                    match name {
                        "filter" if result.truthy() => kept.push(item.clone()),
                        "map" => kept.push(result),
                        "some" if result.truthy() => return Ok(Value::Bool(true)),
                        "every" if !result.truthy() => return Ok(Value::Bool(false)),
                        "find" if result.truthy() => return Ok(item.clone()),
                        _ => {}
                    }
                }
                match name {
                    "some" => Ok(Value::Bool(false)),
                    "every" => Ok(Value::Bool(true)),
                    "find" => Ok(Value::Undefined),
                    _ => self.new_list(kept),
                }
            }
            _ => Err(runtime(format!("array.{} is not a function", name))),
        }
    }

    /// Evaluate an arrow function body with its parameter bound
    fn apply(&mut self, param: &'p str, body: &'p Expr, arg: Value) -> Result<Value, ScriptError> {
        self.push_scope();
        let result = self.declare(param, arg, false).and_then(|()| self.eval(body));
        self.pop_scope();
        result
    }
}

#[derive(Clone, Copy)]
enum HistoryField {
    Mine,
    Opponent,
    Payoff,
}

fn lambda<'p>(args: &'p [Expr], method: &str) -> Result<(&'p str, &'p Expr), ScriptError> {
    match args.first() {
        Some(Expr::Lambda { param, body }) => Ok((param.as_str(), body.as_ref())),
        _ => Err(runtime(format!("{} expects an arrow function", method))),
    }
}

/// In-bounds integer index, or None for anything `arr[i]` would miss
fn position(index: &Value, len: usize) -> Result<Option<usize>, ScriptError> {
    let i = match index {
        Value::Number(n) => *n,
        Value::Str(_) => index.to_number()?,
        _ => return Ok(None),
    };
    if i.fract() != 0.0 || i < 0.0 || i >= len as f64 {
        return Ok(None);
    }
    Ok(Some(i as usize))
}

/// `slice` argument semantics: negative counts from the end, clamp to [0, len]
fn relative_index(n: f64, len: usize) -> usize {
    if n.is_nan() {
        return 0;
    }
    let n = n.trunc();
    let len_f = len as f64;
    let resolved = if n < 0.0 { (len_f + n).max(0.0) } else { n.min(len_f) };
    resolved as usize
}

// ── Tests ────────────────────────────────────────────────────────────
