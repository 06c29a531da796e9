pub mod syntax;
pub mod geometry;
pub mod runtime;
pub mod error;
pub mod namespaces;
mod stack;

pub use error::{Error, ErrorCode, EvalError, EvalErrorKind, SyntaxError};
pub use geometry::{Coord, Geometry, GeometryKind};
pub use syntax::token::{Token, TokenKind};
pub use runtime::scope::{LAST_RESULT, Scope};
pub use runtime::value::Value;

use std::rc::Rc;

use runtime::interpreter::Interpreter;
use syntax::ast::Expr;

// ─── Public API ───────────────────────────────────────────────────────────────

/// Lex and parse source text into a single sequence expression.
pub fn parse(source: &str) -> Result<Expr, SyntaxError> {
    let tokens = syntax::lexer::Lexer::new(source).tokenize()?;
    syntax::parser::Parser::new(tokens).parse()
}

/// Evaluate source text and return the value of its last expression.
///
/// Passing a scope lets bindings survive between calls, as a REPL needs;
/// with `None` a fresh [`Scope::global`] is used and discarded afterwards.
/// On success the result is also stored as `$?` in the scope used. Call
/// frames left unreachable by the evaluation are released before returning.
pub fn evaluate(source: &str, scope: Option<Rc<Scope>>) -> Result<Value, Error> {
    let scope = scope.unwrap_or_else(Scope::global);

    let expr = parse(source).inspect_err(|e| {
        tracing::debug!(code = %e.code, line = e.line, column = e.column, "syntax error");
    })?;

    let result = Interpreter::new().eval(&expr, &scope);
    drop(expr);
    if let Ok(value) = &result {
        scope.store(LAST_RESULT, value.clone());
    }
    let released = scope.collect_cycles();
    tracing::trace!(released, live = scope.live_frames(), "collected frames");

    let value = result.inspect_err(|e| {
        tracing::debug!(line = e.line, error = %e.kind, "evaluation failed");
    })?;
    tracing::debug!(len = source.len(), result = runtime::value::value_type_name(&value), "evaluated");
    Ok(value)
}
