//! Error types with rich diagnostics using miette
//!
//! Only parse errors are fatal. Evaluation and resolution failures are
//! recovered from with documented fallbacks, so [`EvalError`] mostly shows
//! up as a `Result::Err` that a caller turns into a default value.

use miette::Diagnostic;
use thiserror::Error;

/// Errors that occur during parsing
#[derive(Error, Diagnostic, Debug)]
pub enum ParseError {
    #[error("syntax error: {message}")]
    #[diagnostic(code(tikzru::parse::syntax))]
    Syntax { message: String },
}

impl From<pest::error::Error<crate::Rule>> for ParseError {
    fn from(e: pest::error::Error<crate::Rule>) -> Self {
        ParseError::Syntax {
            message: e.to_string(),
        }
    }
}

/// Errors that occur during expression evaluation
#[derive(Error, Diagnostic, Debug)]
pub enum EvalError {
    #[error("undefined variable: \\{name}")]
    #[diagnostic(code(tikzru::eval::undefined_variable))]
    UndefinedVariable { name: String },

    #[error("unknown function: {name}")]
    #[diagnostic(code(tikzru::eval::unknown_function))]
    UnknownFunction { name: String },

    #[error("division by zero in `{expr}`")]
    #[diagnostic(code(tikzru::eval::division_by_zero))]
    DivisionByZero { expr: String },

    #[error("invalid expression `{expr}`: {message}")]
    #[diagnostic(code(tikzru::eval::invalid_expression))]
    InvalidExpression { expr: String, message: String },

    #[error("expression `{expr}` produced a NaN or infinite value")]
    #[diagnostic(code(tikzru::eval::invalid_numeric))]
    InvalidNumeric { expr: String },
}

/// Errors in the caller-supplied render settings
#[derive(Error, Diagnostic, Debug)]
pub enum RenderError {
    #[error("invalid scale: {value}")]
    #[diagnostic(code(tikzru::render::invalid_scale))]
    InvalidScale { value: f64 },
}
