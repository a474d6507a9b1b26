//! Statement-level foreach expansion.
//!
//! Each iteration runs in a child evaluation scope so loop variables
//! shadow outer bindings and disappear when the iteration ends. Inline
//! path foreach is different machinery: it is expanded textually at
//! parse time and never reaches this module.

use crate::ast::{EvaluateClause, ForeachLoop, ForeachValue};
use crate::log::debug;
use crate::render::context::{EvalContext, Value};
use crate::render::eval;
use crate::render::Renderer;

/// Expand a foreach loop into the SVG elements its body produces.
pub fn expand(renderer: &mut Renderer, stmt: &ForeachLoop) -> Vec<String> {
    let mut elements = Vec::new();

    for value in &stmt.values {
        let handle = renderer.ctx.enter_child();

        bind_variables(&mut renderer.ctx, &stmt.variables, value);
        if let Some(clause) = &stmt.evaluate {
            apply_evaluate(&mut renderer.ctx, clause);
        }

        for body_stmt in &stmt.body {
            if let Some(element) = renderer.visit_statement(body_stmt) {
                elements.push(element);
            }
        }

        renderer.ctx.restore(handle);
    }

    elements
}

fn bind_variables(ctx: &mut EvalContext, variables: &[String], value: &ForeachValue) {
    match (variables, value) {
        ([var], ForeachValue::Num(n)) => {
            ctx.set_variable(var, Value::Num(*n));
        }
        ([var], ForeachValue::Str(s)) => {
            ctx.set_variable(var, coerce(s, ctx));
        }
        (vars, ForeachValue::Tuple(parts)) => {
            for (var, part) in vars.iter().zip(parts) {
                let value = coerce(part, ctx);
                ctx.set_variable(var, value);
            }
        }
        ([var, ..], value) => {
            // More variables than the value provides: bind the first,
            // leave the rest unset.
            match value {
                ForeachValue::Num(n) => ctx.set_variable(var, Value::Num(*n)),
                ForeachValue::Str(s) => {
                    let value = coerce(s, ctx);
                    ctx.set_variable(var, value);
                }
                ForeachValue::Tuple(_) => unreachable!("tuples handled above"),
            }
        }
        ([], _) => {}
    }
}

/// Evaluate a raw list item if it reads as math, keep it textual if not.
fn coerce(raw: &str, ctx: &EvalContext) -> Value {
    match eval::evaluate(raw, ctx) {
        Ok(n) => Value::Num(n),
        Err(_) => Value::Str(raw.to_string()),
    }
}

fn apply_evaluate(ctx: &mut EvalContext, clause: &EvaluateClause) {
    match eval::evaluate(&clause.expression, ctx) {
        Ok(n) => ctx.set_variable(&clause.target, Value::Num(n)),
        Err(_) => {
            debug!(
                target = clause.target.as_str(),
                expression = clause.expression.as_str(),
                "evaluate clause failed, leaving target unset"
            );
        }
    }
}
