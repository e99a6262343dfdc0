//! Evaluates a parsed template against a context.

use super::parser::{Command, Node, Operand, Pipeline};
use super::{RenderContext, RenderError, Value};

/// Upper bound for the iterations of all `{{range}}` blocks in one render.
pub const MAX_RANGE_ITERATIONS: i64 = 100_000;

/// Upper bound for the string data one render may produce, counting output,
/// copies of field values and function results.
pub const MAX_RENDER_BYTES: usize = 1 << 20;

/// Widths above this print `%!(BADWIDTH)`.
pub const MAX_PRINTF_WIDTH: usize = 1_000_000;

/// What `.` (or any expression) currently refers to.
#[derive(Debug, Clone, PartialEq)]
enum Datum {
    Context,
    Value(Value),
}

impl Datum {
    fn is_truthy(&self) -> bool {
        match self {
            Datum::Context => true,
            Datum::Value(v) => v.is_truthy(),
        }
    }
}

pub fn execute(nodes: &[Node], ctx: &RenderContext) -> Result<String, RenderError> {
    let mut state = State {
        ctx,
        out: String::new(),
        line: 1,
        iterations_left: MAX_RANGE_ITERATIONS,
        bytes_left: MAX_RENDER_BYTES,
    };
    state.walk(nodes, &Datum::Context)?;
    Ok(state.out)
}

fn exec_error(line: usize, message: impl Into<String>) -> RenderError {
    RenderError::Exec {
        line,
        message: message.into(),
    }
}

fn budget_error(line: usize) -> RenderError {
    exec_error(
        line,
        format!("output exceeds the limit of {} bytes", MAX_RENDER_BYTES),
    )
}

struct State<'a> {
    ctx: &'a RenderContext,
    out: String,
    /// Line of the last action entered, for errors raised on text.
    line: usize,
    iterations_left: i64,
    bytes_left: usize,
}

impl State<'_> {
    fn charge(&mut self, line: usize, bytes: usize) -> Result<(), RenderError> {
        self.bytes_left = self
            .bytes_left
            .checked_sub(bytes)
            .ok_or_else(|| budget_error(line))?;
        Ok(())
    }

    fn emit(&mut self, line: usize, text: &str) -> Result<(), RenderError> {
        self.charge(line, text.len())?;
        self.out.push_str(text);
        Ok(())
    }

    fn walk(&mut self, nodes: &[Node], dot: &Datum) -> Result<(), RenderError> {
        for node in nodes {
            match node {
                Node::Text(text) => self.emit(self.line, text)?,
                Node::Action { line, pipe } => {
                    self.line = *line;
                    let value = self.eval_pipeline(*line, pipe, dot)?;
                    let value = require_value(*line, value)?;
                    self.emit(*line, &value.to_string())?;
                }
                Node::If {
                    line,
                    branches,
                    otherwise,
                } => {
                    self.line = *line;
                    let mut taken = false;
                    for (cond, body) in branches {
                        if self.eval_pipeline(*line, cond, dot)?.is_truthy() {
                            self.walk(body, dot)?;
                            taken = true;
                            break;
                        }
                    }
                    if !taken && let Some(otherwise) = otherwise {
                        self.walk(otherwise, dot)?;
                    }
                }
                Node::Range {
                    line,
                    pipe,
                    body,
                    otherwise,
                } => {
                    self.line = *line;
                    let count = match self.eval_pipeline(*line, pipe, dot)? {
                        Datum::Value(Value::Int(n)) => n,
                        Datum::Value(other) => {
                            return Err(exec_error(
                                *line,
                                format!("range can't iterate over {}", other.type_name()),
                            ));
                        }
                        Datum::Context => {
                            return Err(exec_error(*line, "range can't iterate over the context"));
                        }
                    };
                    if count > self.iterations_left {
                        return Err(exec_error(
                            *line,
                            format!(
                                "range iterations exceed the limit of {} per render",
                                MAX_RANGE_ITERATIONS
                            ),
                        ));
                    }
                    if count <= 0 {
                        if let Some(otherwise) = otherwise {
                            self.walk(otherwise, dot)?;
                        }
                    } else {
                        self.iterations_left -= count;
                        for i in 0..count {
                            self.walk(body, &Datum::Value(Value::Int(i)))?;
                        }
                    }
                }
                Node::With {
                    line,
                    pipe,
                    body,
                    otherwise,
                } => {
                    self.line = *line;
                    let value = self.eval_pipeline(*line, pipe, dot)?;
                    if value.is_truthy() {
                        self.walk(body, &value)?;
                    } else if let Some(otherwise) = otherwise {
                        self.walk(otherwise, dot)?;
                    }
                }
            }
        }
        Ok(())
    }

    fn eval_pipeline(&mut self, line: usize, pipe: &Pipeline, dot: &Datum) -> Result<Datum, RenderError> {
        let mut piped: Option<Datum> = None;
        for cmd in &pipe.cmds {
            piped = Some(self.eval_command(line, cmd, dot, piped)?);
        }
        piped.ok_or_else(|| exec_error(line, "empty pipeline"))
    }

    fn eval_command(
        &mut self,
        line: usize,
        cmd: &Command,
        dot: &Datum,
        piped: Option<Datum>,
    ) -> Result<Datum, RenderError> {
        match cmd.args.split_first() {
            Some((Operand::Func(name), args)) => self.call(line, name, args, dot, piped),
            Some((operand, [])) => {
                if piped.is_some() {
                    return Err(exec_error(line, "can't give argument to non-function"));
                }
                self.eval_operand(line, operand, dot)
            }
            _ => Err(exec_error(line, "can't give argument to non-function")),
        }
    }

    fn eval_operand(&mut self, line: usize, operand: &Operand, dot: &Datum) -> Result<Datum, RenderError> {
        match operand {
            Operand::Dot => {
                if let Datum::Value(Value::Str(s)) = dot {
                    self.charge(line, s.len())?;
                }
                Ok(dot.clone())
            }
            Operand::Root => Ok(Datum::Context),
            Operand::Field(name) => match dot {
                Datum::Context => self.lookup(line, name),
                Datum::Value(v) => Err(exec_error(
                    line,
                    format!("can't evaluate field {} in type {}", name, v.type_name()),
                )),
            },
            Operand::RootField(name) => self.lookup(line, name),
            Operand::Func(name) => self.call(line, name, &[], dot, None),
            Operand::Str(s) => Ok(Datum::Value(Value::Str(s.clone()))),
            Operand::Int(n) => Ok(Datum::Value(Value::Int(*n))),
            Operand::Bool(b) => Ok(Datum::Value(Value::Bool(*b))),
            Operand::Sub(pipe) => self.eval_pipeline(line, pipe, dot),
        }
    }

    fn lookup(&mut self, line: usize, name: &str) -> Result<Datum, RenderError> {
        let ctx = self.ctx;
        let value = ctx
            .get(name)
            .ok_or_else(|| exec_error(line, format!("no field {} in context", name)))?;
        if let Value::Str(s) = value {
            self.charge(line, s.len())?;
        }
        Ok(Datum::Value(value.clone()))
    }

    fn call(
        &mut self,
        line: usize,
        name: &str,
        args: &[Operand],
        dot: &Datum,
        piped: Option<Datum>,
    ) -> Result<Datum, RenderError> {
        // and/or evaluate lazily and return the deciding operand.
        if name == "and" || name == "or" {
            let want = name == "or";
            let total = args.len() + usize::from(piped.is_some());
            if total == 0 {
                return Err(exec_error(
                    line,
                    format!("wrong number of args for {}: want at least 1 got 0", name),
                ));
            }
            let mut last = None;
            for arg in args {
                let value = self.eval_operand(line, arg, dot)?;
                if value.is_truthy() == want {
                    return Ok(value);
                }
                last = Some(value);
            }
            if let Some(value) = piped {
                return Ok(value);
            }
            return last.ok_or_else(|| exec_error(line, "empty and/or"));
        }

        let mut values = Vec::with_capacity(args.len() + 1);
        for arg in args {
            values.push(require_value(line, self.eval_operand(line, arg, dot)?)?);
        }
        if let Some(value) = piped {
            values.push(require_value(line, value)?);
        }

        let result = match name {
            "not" => {
                let [value] = expect_args::<1>(line, name, values)?;
                Value::Bool(!value.is_truthy())
            }
            "len" => {
                let [value] = expect_args::<1>(line, name, values)?;
                match value {
                    Value::Str(s) => Value::Int(s.len() as i64),
                    other => {
                        return Err(exec_error(
                            line,
                            format!("len of type {}", other.type_name()),
                        ));
                    }
                }
            }
            "eq" => {
                if values.len() < 2 {
                    return Err(exec_error(line, "missing argument for comparison"));
                }
                let first = &values[0];
                let mut equal = false;
                for other in &values[1..] {
                    if compare_eq(line, first, other)? {
                        equal = true;
                    }
                }
                Value::Bool(equal)
            }
            "ne" => {
                let [a, b] = expect_args::<2>(line, name, values)?;
                Value::Bool(!compare_eq(line, &a, &b)?)
            }
            "lt" | "le" | "gt" | "ge" => {
                let [a, b] = expect_args::<2>(line, name, values)?;
                let ordering = compare_ord(line, &a, &b)?;
                Value::Bool(match name {
                    "lt" => ordering.is_lt(),
                    "le" => ordering.is_le(),
                    "gt" => ordering.is_gt(),
                    _ => ordering.is_ge(),
                })
            }
            "print" => {
                let text = sprint(&values, self.bytes_left).ok_or_else(|| budget_error(line))?;
                self.charge(line, text.len())?;
                Value::Str(text)
            }
            "printf" => {
                let Some((Value::Str(format), rest)) = values.split_first() else {
                    return Err(exec_error(line, "printf requires a format string"));
                };
                let text =
                    sprintf(format, rest, self.bytes_left).ok_or_else(|| budget_error(line))?;
                self.charge(line, text.len())?;
                Value::Str(text)
            }
            other => return Err(exec_error(line, format!("function \"{}\" not defined", other))),
        };
        Ok(Datum::Value(result))
    }
}

fn require_value(line: usize, datum: Datum) -> Result<Value, RenderError> {
    match datum {
        Datum::Value(v) => Ok(v),
        Datum::Context => Err(exec_error(
            line,
            "the context itself cannot be used as a value; reference a field such as .Name",
        )),
    }
}

fn expect_args<const N: usize>(
    line: usize,
    name: &str,
    values: Vec<Value>,
) -> Result<[Value; N], RenderError> {
    let got = values.len();
    values.try_into().map_err(|_| {
        exec_error(
            line,
            format!("wrong number of args for {}: want {} got {}", name, N, got),
        )
    })
}

fn compare_eq(line: usize, a: &Value, b: &Value) -> Result<bool, RenderError> {
    match (a, b) {
        (Value::Str(x), Value::Str(y)) => Ok(x == y),
        (Value::Int(x), Value::Int(y)) => Ok(x == y),
        (Value::Bool(x), Value::Bool(y)) => Ok(x == y),
        _ => Err(exec_error(
            line,
            format!(
                "incompatible types for comparison: {} and {}",
                a.type_name(),
                b.type_name()
            ),
        )),
    }
}

fn compare_ord(line: usize, a: &Value, b: &Value) -> Result<std::cmp::Ordering, RenderError> {
    match (a, b) {
        (Value::Str(x), Value::Str(y)) => Ok(x.cmp(y)),
        (Value::Int(x), Value::Int(y)) => Ok(x.cmp(y)),
        (Value::Bool(_), Value::Bool(_)) => Err(exec_error(line, "invalid type for comparison")),
        _ => Err(exec_error(
            line,
            format!(
                "incompatible types for comparison: {} and {}",
                a.type_name(),
                b.type_name()
            ),
        )),
    }
}

/// Spaces go between operands when neither is a string. `None` once the
/// result grows past `limit` bytes.
fn sprint(values: &[Value], limit: usize) -> Option<String> {
    let mut out = String::new();
    for (i, value) in values.iter().enumerate() {
        if i > 0
            && !matches!(value, Value::Str(_))
            && !matches!(values[i - 1], Value::Str(_))
        {
            out.push(' ');
        }
        out.push_str(&value.to_string());
        if out.len() > limit {
            return None;
        }
    }
    Some(out)
}

/// printf with `%v %s %d %t %q %%`, `-`/`0` flags and a width. `None` once
/// the result grows past `limit` bytes.
fn sprintf(format: &str, args: &[Value], limit: usize) -> Option<String> {
    let mut out = String::new();
    let mut args = args.iter();
    let mut chars = format.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }

        let mut left = false;
        let mut zero = false;
        while let Some(&flag) = chars.peek() {
            match flag {
                '-' => left = true,
                '0' => zero = true,
                _ => break,
            }
            chars.next();
        }
        let mut width = Some(0usize);
        while let Some(digit) = chars.peek().and_then(|c| c.to_digit(10)) {
            width = width
                .and_then(|w| w.checked_mul(10))
                .and_then(|w| w.checked_add(digit as usize))
                .filter(|w| *w <= MAX_PRINTF_WIDTH);
            chars.next();
        }
        let width = match width {
            Some(width) => width,
            None => {
                out.push_str("%!(BADWIDTH)");
                0
            }
        };

        let Some(verb) = chars.next() else {
            out.push_str("%!(NOVERB)");
            break;
        };
        if verb == '%' {
            out.push('%');
            continue;
        }
        let Some(arg) = args.next() else {
            out.push_str(&format!("%!{}(MISSING)", verb));
            continue;
        };

        let formatted = match (verb, arg) {
            ('v', value) => value.to_string(),
            ('s', Value::Str(s)) => s.clone(),
            ('d', Value::Int(n)) => n.to_string(),
            ('t', Value::Bool(b)) => b.to_string(),
            ('q', Value::Str(s)) => format!("{:?}", s),
            (verb, value) => format!("%!{}({}={})", verb, value.type_name(), value),
        };
        out.push_str(&pad(formatted, width, left, zero && matches!(arg, Value::Int(_))));
        if out.len() > limit {
            return None;
        }
    }

    let extra: Vec<String> = args
        .map(|v| format!("{}={}", v.type_name(), v))
        .collect();
    if !extra.is_empty() {
        out.push_str(&format!("%!(EXTRA {})", extra.join(", ")));
    }
    (out.len() <= limit).then_some(out)
}

fn pad(s: String, width: usize, left: bool, zero: bool) -> String {
    let len = s.chars().count();
    if len >= width {
        return s;
    }
    let fill = width - len;
    if left {
        format!("{}{}", s, " ".repeat(fill))
    } else if zero {
        match s.strip_prefix('-') {
            Some(digits) => format!("-{}{}", "0".repeat(fill), digits),
            None => format!("{}{}", "0".repeat(fill), s),
        }
    } else {
        format!("{}{}", " ".repeat(fill), s)
    }
}
