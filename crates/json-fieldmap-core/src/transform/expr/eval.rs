//! Tree-walking evaluator with JavaScript-flavoured coercions.
//!
//! The only input is the bound `value`; there is no environment, no mutation
//! and no looping construct, so evaluation is bounded by the size of the tree.

use serde_json::{Map, Value};

use super::ast::{BinaryOp, Expr, Global, LogicalOp, MathFn, Node, NodeId, UnaryOp};
use crate::error::MappingError;
use crate::transform::coerce::{format_f64, number_value};

/// Runtime value. Distinguishes `undefined` from `null` and allows the
/// non-finite numbers JSON cannot carry.
#[derive(Debug, Clone, PartialEq)]
pub enum Val {
    Undefined,
    Null,
    Bool(bool),
    Num(f64),
    Str(String),
    Array(Vec<Val>),
    Object(Map<String, Value>),
}

impl From<&Value> for Val {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => Val::Null,
            Value::Bool(b) => Val::Bool(*b),
            Value::Number(n) => Val::Num(n.as_f64().unwrap_or(f64::NAN)),
            Value::String(s) => Val::Str(s.clone()),
            Value::Array(items) => Val::Array(items.iter().map(Val::from).collect()),
            Value::Object(map) => Val::Object(map.clone()),
        }
    }
}

impl Val {
    /// JSON form of the result. `undefined` and non-finite numbers become null.
    pub fn into_json(self) -> Value {
        match self {
            Val::Undefined | Val::Null => Value::Null,
            Val::Bool(b) => Value::Bool(b),
            Val::Num(n) => number_value(n).unwrap_or(Value::Null),
            Val::Str(s) => Value::String(s),
            Val::Array(items) => Value::Array(items.into_iter().map(Val::into_json).collect()),
            Val::Object(map) => Value::Object(map),
        }
    }

    fn type_name(&self) -> &'static str {
        match self {
            Val::Undefined => "undefined",
            Val::Null => "null",
            Val::Bool(_) => "boolean",
            Val::Num(_) => "number",
            Val::Str(_) => "string",
            Val::Array(_) => "array",
            Val::Object(_) => "object",
        }
    }

    pub fn truthy(&self) -> bool {
        match self {
            Val::Undefined | Val::Null => false,
            Val::Bool(b) => *b,
            Val::Num(n) => *n != 0.0 && !n.is_nan(),
            Val::Str(s) => !s.is_empty(),
            Val::Array(_) | Val::Object(_) => true,
        }
    }

    pub fn to_js_string(&self) -> String {
        match self {
            Val::Undefined => "undefined".to_string(),
            Val::Null => "null".to_string(),
            Val::Bool(b) => b.to_string(),
            Val::Num(n) => format_f64(*n),
            Val::Str(s) => s.clone(),
            Val::Array(items) => items
                .iter()
                .map(|v| match v {
                    Val::Undefined | Val::Null => String::new(),
                    other => other.to_js_string(),
                })
                .collect::<Vec<_>>()
                .join(","),
            Val::Object(_) => "[object Object]".to_string(),
        }
    }

    pub fn to_js_number(&self) -> f64 {
        match self {
            Val::Undefined | Val::Object(_) => f64::NAN,
            Val::Null => 0.0,
            Val::Bool(b) => f64::from(u8::from(*b)),
            Val::Num(n) => *n,
            Val::Str(s) => string_to_number(s),
            Val::Array(_) => string_to_number(&self.to_js_string()),
        }
    }

    fn is_primitive(&self) -> bool {
        !matches!(self, Val::Array(_) | Val::Object(_))
    }
}

fn string_to_number(s: &str) -> f64 {
    let t = s.trim();
    match t {
        "" => 0.0,
        "Infinity" | "+Infinity" => f64::INFINITY,
        "-Infinity" => f64::NEG_INFINITY,
        _ if t.contains(|c: char| c.is_ascii_alphabetic() && c != 'e' && c != 'E') => f64::NAN,
        _ => t.parse::<f64>().unwrap_or(f64::NAN),
    }
}

fn fail(message: impl Into<String>) -> MappingError {
    MappingError::ExpressionEval(message.into())
}

// ---------------------------------------------------------------------------
// Operators
// ---------------------------------------------------------------------------

fn strict_equals(a: &Val, b: &Val) -> bool {
    match (a, b) {
        (Val::Num(x), Val::Num(y)) => x == y,
        _ => a == b,
    }
}

fn loose_equals(a: &Val, b: &Val) -> bool {
    match (a, b) {
        (Val::Undefined | Val::Null, Val::Undefined | Val::Null) => true,
        (Val::Undefined | Val::Null, _) | (_, Val::Undefined | Val::Null) => false,
        (Val::Num(_), Val::Str(_)) | (Val::Str(_), Val::Num(_)) | (Val::Bool(_), _) | (_, Val::Bool(_)) => {
            a.to_js_number() == b.to_js_number()
        }
        (x, y) if x.is_primitive() != y.is_primitive() => {
            let (obj, prim) = if x.is_primitive() { (y, x) } else { (x, y) };
            loose_equals(&Val::Str(obj.to_js_string()), prim)
        }
        _ => strict_equals(a, b),
    }
}

fn compare(op: BinaryOp, a: &Val, b: &Val) -> bool {
    if let (Val::Str(x), Val::Str(y)) = (a, b) {
        return match op {
            BinaryOp::Lt => x < y,
            BinaryOp::LtEq => x <= y,
            BinaryOp::Gt => x > y,
            _ => x >= y,
        };
    }
    let (x, y) = (a.to_js_number(), b.to_js_number());
    match op {
        BinaryOp::Lt => x < y,
        BinaryOp::LtEq => x <= y,
        BinaryOp::Gt => x > y,
        _ => x >= y,
    }
}

fn binary(op: BinaryOp, a: Val, b: Val) -> Val {
    match op {
        BinaryOp::Add => {
            let stringy = |v: &Val| matches!(v, Val::Str(_) | Val::Array(_) | Val::Object(_));
            if stringy(&a) || stringy(&b) {
                Val::Str(a.to_js_string() + &b.to_js_string())
            } else {
                Val::Num(a.to_js_number() + b.to_js_number())
            }
        }
        BinaryOp::Sub => Val::Num(a.to_js_number() - b.to_js_number()),
        BinaryOp::Mul => Val::Num(a.to_js_number() * b.to_js_number()),
        BinaryOp::Div => Val::Num(a.to_js_number() / b.to_js_number()),
        BinaryOp::Rem => Val::Num(a.to_js_number() % b.to_js_number()),
        BinaryOp::Pow => Val::Num(a.to_js_number().powf(b.to_js_number())),
        BinaryOp::Eq => Val::Bool(loose_equals(&a, &b)),
        BinaryOp::NotEq => Val::Bool(!loose_equals(&a, &b)),
        BinaryOp::StrictEq => Val::Bool(strict_equals(&a, &b)),
        BinaryOp::StrictNotEq => Val::Bool(!strict_equals(&a, &b)),
        BinaryOp::Lt | BinaryOp::LtEq | BinaryOp::Gt | BinaryOp::GtEq => {
            Val::Bool(compare(op, &a, &b))
        }
    }
}

// ---------------------------------------------------------------------------
// Member and index access
// ---------------------------------------------------------------------------

fn member(object: &Val, property: &str) -> Result<Val, MappingError> {
    match object {
        Val::Undefined | Val::Null => Err(fail(format!(
            "cannot read property `{}` of {}",
            property,
            object.type_name()
        ))),
        Val::Str(s) if property == "length" => Ok(Val::Num(s.chars().count() as f64)),
        Val::Array(items) if property == "length" => Ok(Val::Num(items.len() as f64)),
        Val::Object(map) => Ok(map.get(property).map(Val::from).unwrap_or(Val::Undefined)),
        _ => Ok(Val::Undefined),
    }
}

fn index(object: &Val, key: &Val) -> Result<Val, MappingError> {
    let position = || {
        let n = key.to_js_number();
        (n >= 0.0 && n.fract() == 0.0).then_some(n as usize)
    };
    match object {
        Val::Array(items) => Ok(position()
            .and_then(|i| items.get(i).cloned())
            .unwrap_or(Val::Undefined)),
        Val::Str(s) => Ok(position()
            .and_then(|i| s.chars().nth(i))
            .map(|c| Val::Str(c.to_string()))
            .unwrap_or(Val::Undefined)),
        _ => member(object, &key.to_js_string()),
    }
}

// ---------------------------------------------------------------------------
// Methods and functions
// ---------------------------------------------------------------------------

fn arg(args: &[Val], i: usize) -> &Val {
    args.get(i).unwrap_or(&Val::Undefined)
}

/// Resolve a relative `slice` bound against `len`.
fn slice_bound(v: &Val, len: usize, default: usize) -> usize {
    if matches!(v, Val::Undefined) {
        return default;
    }
    let n = v.to_js_number();
    if n.is_nan() {
        return 0;
    }
    let n = n.trunc();
    if n < 0.0 {
        (len as f64 + n).max(0.0) as usize
    } else {
        (n as usize).min(len)
    }
}

/// Resolve a `substring` bound: negatives and NaN clamp to zero.
fn substring_bound(v: &Val, len: usize, default: usize) -> usize {
    if matches!(v, Val::Undefined) {
        return default;
    }
    let n = v.to_js_number();
    if n.is_nan() || n < 0.0 {
        0
    } else {
        (n.trunc() as usize).min(len)
    }
}

fn char_slice(s: &str, start: usize, end: usize) -> String {
    if end <= start {
        return String::new();
    }
    s.chars().skip(start).take(end - start).collect()
}

fn string_method(s: &str, method: &str, args: &[Val]) -> Result<Val, MappingError> {
    let len = s.chars().count();
    let text_arg = |i: usize| arg(args, i).to_js_string();
    Ok(match method {
        "toUpperCase" => Val::Str(s.to_uppercase()),
        "toLowerCase" => Val::Str(s.to_lowercase()),
        "trim" => Val::Str(s.trim().to_string()),
        "toString" => Val::Str(s.to_string()),
        "includes" => Val::Bool(s.contains(text_arg(0).as_str())),
        "startsWith" => Val::Bool(s.starts_with(text_arg(0).as_str())),
        "endsWith" => Val::Bool(s.ends_with(text_arg(0).as_str())),
        "indexOf" => {
            let needle = text_arg(0);
            Val::Num(match s.find(needle.as_str()) {
                Some(byte) => s[..byte].chars().count() as f64,
                None => -1.0,
            })
        }
        "slice" => {
            let start = slice_bound(arg(args, 0), len, 0);
            let end = slice_bound(arg(args, 1), len, len);
            Val::Str(char_slice(s, start, end))
        }
        "substring" => {
            let a = substring_bound(arg(args, 0), len, 0);
            let b = substring_bound(arg(args, 1), len, len);
            Val::Str(char_slice(s, a.min(b), a.max(b)))
        }
        "split" => {
            let parts: Vec<Val> = match arg(args, 0) {
                Val::Undefined => vec![Val::Str(s.to_string())],
                sep => {
                    let sep = sep.to_js_string();
                    if sep.is_empty() {
                        s.chars().map(|c| Val::Str(c.to_string())).collect()
                    } else {
                        s.split(sep.as_str()).map(|p| Val::Str(p.to_string())).collect()
                    }
                }
            };
            match arg(args, 1) {
                Val::Undefined => Val::Array(parts),
                limit => {
                    let n = limit.to_js_number();
                    let n = if n.is_nan() || n < 0.0 { 0 } else { n as usize };
                    Val::Array(parts.into_iter().take(n).collect())
                }
            }
        }
        "replace" => Val::Str(s.replacen(text_arg(0).as_str(), &text_arg(1), 1)),
        other => return Err(fail(format!("strings have no method `{}`", other))),
    })
}

fn array_method(items: &[Val], method: &str, args: &[Val]) -> Result<Val, MappingError> {
    let len = items.len();
    Ok(match method {
        "includes" => Val::Bool(items.iter().any(|v| {
            strict_equals(v, arg(args, 0))
                || matches!((v, arg(args, 0)), (Val::Num(a), Val::Num(b)) if a.is_nan() && b.is_nan())
        })),
        "indexOf" => Val::Num(
            items
                .iter()
                .position(|v| strict_equals(v, arg(args, 0)))
                .map(|i| i as f64)
                .unwrap_or(-1.0),
        ),
        "join" => {
            let sep = match arg(args, 0) {
                Val::Undefined => ",".to_string(),
                v => v.to_js_string(),
            };
            Val::Str(
                items
                    .iter()
                    .map(|v| match v {
                        Val::Undefined | Val::Null => String::new(),
                        other => other.to_js_string(),
                    })
                    .collect::<Vec<_>>()
                    .join(&sep),
            )
        }
        "slice" => {
            let start = slice_bound(arg(args, 0), len, 0);
            let end = slice_bound(arg(args, 1), len, len);
            Val::Array(if end > start {
                items[start..end].to_vec()
            } else {
                Vec::new()
            })
        }
        "toString" => Val::Str(Val::Array(items.to_vec()).to_js_string()),
        other => return Err(fail(format!("arrays have no method `{}`", other))),
    })
}

fn number_method(n: f64, method: &str, args: &[Val]) -> Result<Val, MappingError> {
    match method {
        "toString" => Ok(Val::Str(format_f64(n))),
        "toFixed" => {
            let digits = match arg(args, 0) {
                Val::Undefined => 0.0,
                v => v.to_js_number().trunc(),
            };
            if !(0.0..=100.0).contains(&digits) {
                return Err(fail("toFixed() digits must be between 0 and 100"));
            }
            if !n.is_finite() {
                return Ok(Val::Str(format_f64(n)));
            }
            Ok(Val::Str(format!("{:.*}", digits as usize, n)))
        }
        other => Err(fail(format!("numbers have no method `{}`", other))),
    }
}

fn call_method(receiver: &Val, method: &str, args: &[Val]) -> Result<Val, MappingError> {
    match receiver {
        Val::Str(s) => string_method(s, method, args),
        Val::Array(items) => array_method(items, method, args),
        Val::Num(n) => number_method(*n, method, args),
        Val::Bool(b) if method == "toString" => Ok(Val::Str(b.to_string())),
        other => Err(fail(format!(
            "cannot call `{}` on {}",
            method,
            other.type_name()
        ))),
    }
}

fn call_math(function: MathFn, args: &[Val]) -> Val {
    let x = arg(args, 0).to_js_number();
    Val::Num(match function {
        MathFn::Round => (x + 0.5).floor(),
        MathFn::Floor => x.floor(),
        MathFn::Ceil => x.ceil(),
        MathFn::Abs => x.abs(),
        MathFn::Sqrt => x.sqrt(),
        MathFn::Pow => x.powf(arg(args, 1).to_js_number()),
        MathFn::Min => args
            .iter()
            .map(Val::to_js_number)
            .fold(f64::INFINITY, |acc, n| if n.is_nan() || acc.is_nan() { f64::NAN } else { acc.min(n) }),
        MathFn::Max => args
            .iter()
            .map(Val::to_js_number)
            .fold(f64::NEG_INFINITY, |acc, n| if n.is_nan() || acc.is_nan() { f64::NAN } else { acc.max(n) }),
    })
}

/// Longest leading integer in `radix`, after optional whitespace and sign.
fn parse_int(s: &str, radix: Option<u32>) -> f64 {
    let t = s.trim_start();
    let (negative, t) = match t.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, t.strip_prefix('+').unwrap_or(t)),
    };
    let (radix, t) = match radix {
        Some(16) | None if t.starts_with("0x") || t.starts_with("0X") => (16, &t[2..]),
        Some(r) => (r, t),
        None => (10, t),
    };
    if !(2..=36).contains(&radix) {
        return f64::NAN;
    }
    let digits: String = t.chars().take_while(|c| c.is_digit(radix)).collect();
    if digits.is_empty() {
        return f64::NAN;
    }
    let magnitude = digits
        .chars()
        .filter_map(|c| c.to_digit(radix))
        .fold(0.0, |acc, d| acc * f64::from(radix) + f64::from(d));
    if negative {
        -magnitude
    } else {
        magnitude
    }
}

/// Longest leading decimal literal.
fn parse_float(s: &str) -> f64 {
    let t = s.trim_start();
    for (prefix, inf) in [
        ("Infinity", f64::INFINITY),
        ("+Infinity", f64::INFINITY),
        ("-Infinity", f64::NEG_INFINITY),
    ] {
        if t.starts_with(prefix) {
            return inf;
        }
    }
    let bytes = t.as_bytes();
    let mut end = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end = 1;
    }
    let mut seen_digit = false;
    let mut seen_dot = false;
    while end < bytes.len() {
        match bytes[end] {
            b'0'..=b'9' => seen_digit = true,
            b'.' if !seen_dot => seen_dot = true,
            _ => break,
        }
        end += 1;
    }
    if !seen_digit {
        return f64::NAN;
    }
    if end < bytes.len() && matches!(bytes[end], b'e' | b'E') {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+' | b'-')) {
            exp_end += 1;
        }
        let digits_start = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > digits_start {
            end = exp_end;
        }
    }
    t[..end].parse::<f64>().unwrap_or(f64::NAN)
}

fn call_global(function: Global, args: &[Val]) -> Val {
    let first = arg(args, 0);
    match function {
        Global::Number => Val::Num(if args.is_empty() { 0.0 } else { first.to_js_number() }),
        Global::String => Val::Str(if args.is_empty() {
            String::new()
        } else {
            first.to_js_string()
        }),
        Global::Boolean => Val::Bool(first.truthy()),
        Global::ParseInt => {
            let radix = match arg(args, 1) {
                Val::Undefined => None,
                r => {
                    let n = r.to_js_number();
                    if n.is_nan() || n == 0.0 {
                        None
                    } else {
                        Some(n.trunc() as u32)
                    }
                }
            };
            Val::Num(parse_int(&first.to_js_string(), radix))
        }
        Global::ParseFloat => Val::Num(parse_float(&first.to_js_string())),
        Global::IsNaN => Val::Bool(first.to_js_number().is_nan()),
    }
}

// ---------------------------------------------------------------------------
// Evaluation
// ---------------------------------------------------------------------------

struct Evaluator<'a> {
    expr: &'a Expr,
    input: Val,
}

impl Evaluator<'_> {
    fn eval(&self, id: NodeId) -> Result<Val, MappingError> {
        match self.expr.node(id) {
            Node::Number(n) => Ok(Val::Num(*n)),
            Node::Str(s) => Ok(Val::Str(s.clone())),
            Node::Bool(b) => Ok(Val::Bool(*b)),
            Node::Null => Ok(Val::Null),
            Node::Undefined => Ok(Val::Undefined),
            Node::Input => Ok(self.input.clone()),
            Node::Array(items) => Ok(Val::Array(self.eval_all(items)?)),
            Node::Unary { op, operand } => {
                let v = self.eval(*operand)?;
                Ok(match op {
                    UnaryOp::Neg => Val::Num(-v.to_js_number()),
                    UnaryOp::Plus => Val::Num(v.to_js_number()),
                    UnaryOp::Not => Val::Bool(!v.truthy()),
                })
            }
            Node::Binary { op, lhs, rhs } => {
                let a = self.eval(*lhs)?;
                let b = self.eval(*rhs)?;
                Ok(binary(*op, a, b))
            }
            Node::Logical { op, lhs, rhs } => {
                let a = self.eval(*lhs)?;
                match (op, a.truthy()) {
                    (LogicalOp::And, false) | (LogicalOp::Or, true) => Ok(a),
                    _ => self.eval(*rhs),
                }
            }
            Node::Conditional {
                test,
                then,
                otherwise,
            } => {
                if self.eval(*test)?.truthy() {
                    self.eval(*then)
                } else {
                    self.eval(*otherwise)
                }
            }
            Node::Member { object, property } => member(&self.eval(*object)?, property),
            Node::Index { object, index: key } => {
                let object = self.eval(*object)?;
                let key = self.eval(*key)?;
                index(&object, &key)
            }
            Node::MethodCall {
                receiver,
                method,
                args,
            } => {
                let receiver = self.eval(*receiver)?;
                let args = self.eval_all(args)?;
                call_method(&receiver, method, &args)
            }
            Node::MathCall { function, args } => Ok(call_math(*function, &self.eval_all(args)?)),
            Node::GlobalCall { function, args } => {
                Ok(call_global(*function, &self.eval_all(args)?))
            }
        }
    }

    fn eval_all(&self, ids: &[NodeId]) -> Result<Vec<Val>, MappingError> {
        ids.iter().map(|id| self.eval(*id)).collect()
    }
}

/// Evaluate a parsed expression with `value` bound to `input`.
pub fn eval(expr: &Expr, input: &Value) -> Result<Val, MappingError> {
    let root = expr.root().ok_or_else(|| fail("empty expression"))?;
    let evaluator = Evaluator {
        expr,
        input: Val::from(input),
    };
    evaluator.eval(root)
}
