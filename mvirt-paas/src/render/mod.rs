//! Template text language.
//!
//! A subset of Go's `text/template`, enough for configuration bodies:
//!
//! ```text
//! {{ .Name }}                      field interpolation
//! {{- .OS -}}                      whitespace trimming
//! {{/* comment */}}
//! {{if eq .OS "linux"}}…{{else if …}}…{{else}}…{{end}}
//! {{range .NodeCount}}node-{{.}}{{end}}
//! {{with .Region}}region: {{.}}{{end}}
//! {{.Name | printf "%q"}}          pipelines, and/or/not/eq/ne/lt/le/gt/ge/len/print/printf
//! ```
//!
//! Unlike Go, every field referenced anywhere in a template must exist in the
//! [`RenderContext`], even inside branches that are never taken.
//!
//! Templates come from callers, so parsing and execution are bounded:
//!
//! - [`MAX_NESTING_DEPTH`]: nested blocks, and nested parentheses in one action
//! - [`MAX_RANGE_ITERATIONS`]: iterations of all ranges in one render
//! - [`MAX_RENDER_BYTES`]: string data produced by one render

mod exec;
mod lexer;
mod parser;

pub use exec::{MAX_PRINTF_WIDTH, MAX_RANGE_ITERATIONS, MAX_RENDER_BYTES};
pub use parser::MAX_NESTING_DEPTH;

use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

use parser::{Node, Operand, Pipeline};

/// Template parse or execution failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    #[error("template: line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("template: line {line}: unknown field .{name} (available: {available})")]
    UnknownField {
        line: usize,
        name: String,
        available: String,
    },

    #[error("template: line {line}: {message}")]
    Exec { line: usize, message: String },
}

/// Scalar placeholder value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Str(String),
    Int(i64),
    Bool(bool),
}

impl Value {
    /// Go truthiness: `false`, `0` and `""` are false.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Str(s) => !s.is_empty(),
            Value::Int(n) => *n != 0,
            Value::Bool(b) => *b,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Str(_) => "string",
            Value::Int(_) => "int",
            Value::Bool(_) => "bool",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Str(s) => f.write_str(s),
            Value::Int(n) => write!(f, "{}", n),
            Value::Bool(b) => write!(f, "{}", b),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(n.into())
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

/// Flat placeholder name → value mapping fed into a template.
///
/// The set of names is fixed when the context is created; binding a name
/// outside that set is a programming error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderContext {
    allowed: &'static [&'static str],
    values: BTreeMap<&'static str, Value>,
}

impl RenderContext {
    pub fn new(allowed: &'static [&'static str]) -> Self {
        Self {
            allowed,
            values: BTreeMap::new(),
        }
    }

    /// Bind a placeholder. Names outside the allowed set are dropped.
    pub fn with(mut self, name: &'static str, value: Value) -> Self {
        debug_assert!(
            self.allowed.contains(&name),
            "placeholder {} is not declared",
            name
        );
        if self.allowed.contains(&name) {
            self.values.insert(name, value);
        }
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn keys(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.values.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Parsed template, reusable across contexts.
#[derive(Debug, Clone)]
pub struct CompiledTemplate {
    nodes: Vec<Node>,
}

impl CompiledTemplate {
    pub fn parse(src: &str) -> Result<Self, RenderError> {
        Ok(Self {
            nodes: parser::parse(src)?,
        })
    }

    /// Ensure every referenced field is bound in `ctx`.
    pub fn check_fields(&self, ctx: &RenderContext) -> Result<(), RenderError> {
        let mut refs = Vec::new();
        collect_fields(&self.nodes, &mut refs);
        for (line, name) in refs {
            if ctx.get(name).is_none() {
                return Err(RenderError::UnknownField {
                    line,
                    name: name.to_string(),
                    available: ctx.keys().collect::<Vec<_>>().join(", "),
                });
            }
        }
        Ok(())
    }

    /// Check fields, then render.
    pub fn execute(&self, ctx: &RenderContext) -> Result<String, RenderError> {
        self.check_fields(ctx)?;
        exec::execute(&self.nodes, ctx)
    }
}

/// Parse and execute in one step.
pub fn render(src: &str, ctx: &RenderContext) -> Result<String, RenderError> {
    CompiledTemplate::parse(src)?.execute(ctx)
}

fn collect_fields<'a>(nodes: &'a [Node], out: &mut Vec<(usize, &'a str)>) {
    for node in nodes {
        match node {
            Node::Text(_) => {}
            Node::Action { line, pipe } => collect_pipeline(*line, pipe, out),
            Node::If {
                line,
                branches,
                otherwise,
            } => {
                for (cond, body) in branches {
                    collect_pipeline(*line, cond, out);
                    collect_fields(body, out);
                }
                if let Some(otherwise) = otherwise {
                    collect_fields(otherwise, out);
                }
            }
            Node::Range {
                line,
                pipe,
                body,
                otherwise,
            }
            | Node::With {
                line,
                pipe,
                body,
                otherwise,
            } => {
                collect_pipeline(*line, pipe, out);
                collect_fields(body, out);
                if let Some(otherwise) = otherwise {
                    collect_fields(otherwise, out);
                }
            }
        }
    }
}

fn collect_pipeline<'a>(line: usize, pipe: &'a Pipeline, out: &mut Vec<(usize, &'a str)>) {
    for cmd in &pipe.cmds {
        for arg in &cmd.args {
            match arg {
                Operand::Field(name) | Operand::RootField(name) => out.push((line, name)),
                Operand::Sub(sub) => collect_pipeline(line, sub, out),
                _ => {}
            }
        }
    }
}
