//! A small JavaScript-flavoured expression language over JSON values.
//!
//! Two entry points share one interpreter:
//!
//! * [`Expression`] evaluates a single expression, as used by `={{ ... }}`
//!   parameter templates.
//! * [`Script`] runs a statement list with `return`, as used by code nodes.
//!
//! Values are [`serde_json::Value`]s. `undefined`, `NaN` and the infinities
//! have no JSON form and are all represented as `null`. Every evaluation is
//! bounded by [`Limits`], so no program can run forever.

mod ast;
mod builtins;
mod error;
mod interpreter;
mod lexer;
mod parser;
pub mod value;

pub use error::{ExprError, Result};
pub use interpreter::Limits;

use interpreter::Interpreter;
use serde_json::Value;

/// A parsed expression, reusable across evaluations
#[derive(Debug, Clone)]
pub struct Expression {
    source: String,
    expr: ast::Expr,
}

impl Expression {
    pub fn parse(source: &str) -> Result<Self> {
        Ok(Self {
            source: source.to_string(),
            expr: parser::parse_expression(source)?,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Evaluate with the given variables in scope
    pub fn evaluate<'a, I>(&self, bindings: I) -> Result<Value>
    where
        I: IntoIterator<Item = (&'a str, Value)>,
    {
        self.evaluate_with_limits(bindings, Limits::default())
    }

    pub fn evaluate_with_limits<'a, I>(&self, bindings: I, limits: Limits) -> Result<Value>
    where
        I: IntoIterator<Item = (&'a str, Value)>,
    {
        let mut interp = Interpreter::new(limits);
        for (name, value) in bindings {
            interp.bind(name, value);
        }
        interp.eval(&self.expr)
    }
}

/// A parsed function body; evaluates to whatever it `return`s, or null
#[derive(Debug, Clone)]
pub struct Script {
    body: Vec<ast::Stmt>,
}

impl Script {
    pub fn parse(source: &str) -> Result<Self> {
        Ok(Self {
            body: parser::parse_program(source)?,
        })
    }

    pub fn run<'a, I>(&self, bindings: I) -> Result<Value>
    where
        I: IntoIterator<Item = (&'a str, Value)>,
    {
        self.run_with_limits(bindings, Limits::default())
    }

    pub fn run_with_limits<'a, I>(&self, bindings: I, limits: Limits) -> Result<Value>
    where
        I: IntoIterator<Item = (&'a str, Value)>,
    {
        let mut interp = Interpreter::new(limits);
        for (name, value) in bindings {
            interp.bind(name, value);
        }
        let result = interp.run(&self.body);
        tracing::trace!(ok = result.is_ok(), "script finished");
        result
    }
}
