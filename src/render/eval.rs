//! Expression evaluation functions
//!
//! Expressions reach the renderer as raw strings (`"2*\r"`, `"sin(30)"`).
//! Evaluation substitutes `\var` references from the [`EvalContext`], then
//! runs a small tokenizer and recursive-descent evaluator. Trig functions
//! take degrees, matching TikZ. Results must be finite.

use crate::ast::{OptionMap, OptionValue};
use crate::errors::EvalError;

use super::context::EvalContext;

/// Unit suffixes accepted on numeric literals, in drawing units (1 = 1cm).
const UNITS: &[(&str, f64)] = &[
    ("cm", 1.0),
    ("mm", 0.1),
    ("pt", 1.0 / 28.35),
    ("in", 2.54),
];

/// Evaluate a math expression against the active scope.
///
/// The empty string evaluates to zero; a plain number short-circuits the
/// whole pipeline. Anything else is substituted, tokenized and reduced.
pub fn evaluate(expr: &str, ctx: &EvalContext) -> Result<f64, EvalError> {
    let expr = expr.trim();
    if expr.is_empty() {
        return Ok(0.0);
    }
    if let Ok(n) = expr.parse::<f64>() {
        return Ok(n);
    }

    let substituted = substitute_variables(expr, ctx);
    let tokens = tokenize(&substituted).map_err(|message| EvalError::InvalidExpression {
        expr: expr.to_string(),
        message,
    })?;
    let mut parser = ExprParser { tokens, pos: 0 };
    let result = parser.expr(expr)?;
    if !parser.at_end() {
        return Err(EvalError::InvalidExpression {
            expr: expr.to_string(),
            message: "trailing input after expression".to_string(),
        });
    }
    if !result.is_finite() {
        return Err(EvalError::InvalidNumeric {
            expr: expr.to_string(),
        });
    }
    Ok(result)
}

/// Replace `\var` references in a string with their display values. Unknown
/// references are left untouched.
pub fn eval_string(text: &str, ctx: &EvalContext) -> String {
    if !text.contains('\\') {
        return text.to_string();
    }
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(pos) = rest.find('\\') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos + 1..];
        let len = ident_len(tail);
        if len == 0 {
            out.push('\\');
            rest = tail;
            continue;
        }
        let name = &tail[..len];
        match ctx.get_variable(name) {
            Some(value) => out.push_str(&value.to_string()),
            None => {
                out.push('\\');
                out.push_str(name);
            }
        }
        rest = &tail[len..];
    }
    out.push_str(rest);
    out
}

/// Evaluate expression-looking option values in place. Bare words are tried
/// as variable references; strings containing operators or `\` go through
/// the evaluator. Failures keep the original value.
pub fn process_options(options: &OptionMap, ctx: &EvalContext) -> OptionMap {
    let mut out = OptionMap::with_capacity(options.len());
    for (key, value) in options {
        out.insert(key.clone(), safe_evaluate(value, ctx));
    }
    out
}

/// Evaluate one option value with fallback to the original on failure.
pub fn safe_evaluate(value: &OptionValue, ctx: &EvalContext) -> OptionValue {
    let OptionValue::Str(s) = value else {
        return value.clone();
    };

    let word = s.trim();
    if word.chars().all(|c| c.is_ascii_alphabetic())
        && !word.is_empty()
        && !matches!(word, "true" | "false" | "none")
    {
        if let Ok(n) = evaluate(&format!("\\{word}"), ctx) {
            return OptionValue::Num(n);
        }
    }

    let looks_evaluable = s.contains('\\') || s.contains(['+', '-', '*', '/', '(']);
    if looks_evaluable {
        if let Ok(n) = evaluate(s, ctx) {
            return OptionValue::Num(n);
        }
    }
    value.clone()
}

fn substitute_variables(expr: &str, ctx: &EvalContext) -> String {
    eval_string(expr, ctx)
}

fn ident_len(s: &str) -> usize {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return 0,
    }
    1 + chars
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '_')
        .count()
}

// ============================================================================
// Tokenizer
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Num(f64),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
    Comma,
}

fn tokenize(input: &str) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let bytes = input.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        let c = bytes[i] as char;
        match c {
            ' ' | '\t' | '\n' | '\r' => i += 1,
            '+' => {
                tokens.push(Token::Plus);
                i += 1;
            }
            '-' => {
                tokens.push(Token::Minus);
                i += 1;
            }
            '*' => {
                tokens.push(Token::Star);
                i += 1;
            }
            '/' => {
                tokens.push(Token::Slash);
                i += 1;
            }
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            ',' => {
                tokens.push(Token::Comma);
                i += 1;
            }
            '\\' => {
                // An unresolved variable reference; surface its name so the
                // error can point at it.
                let rest = &input[i + 1..];
                let len = ident_len(rest);
                if len == 0 {
                    return Err("stray backslash".to_string());
                }
                tokens.push(Token::Ident(format!("\\{}", &rest[..len])));
                i += 1 + len;
            }
            c if c.is_ascii_digit() || c == '.' => {
                let start = i;
                while i < bytes.len() && ((bytes[i] as char).is_ascii_digit() || bytes[i] == b'.') {
                    i += 1;
                }
                let number: f64 = input[start..i]
                    .parse()
                    .map_err(|_| format!("bad number `{}`", &input[start..i]))?;
                // Unit suffix folds into the literal (2cm, 5pt).
                let mut scaled = number;
                for (unit, factor) in UNITS {
                    if input[i..].starts_with(unit) {
                        let after = &input[i + unit.len()..];
                        let boundary =
                            !matches!(after.chars().next(), Some(c) if c.is_ascii_alphanumeric());
                        if boundary {
                            scaled = number * factor;
                            i += unit.len();
                            break;
                        }
                    }
                }
                tokens.push(Token::Num(scaled));
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let len = ident_len(&input[i..]);
                tokens.push(Token::Ident(input[i..i + len].to_string()));
                i += len;
            }
            other => return Err(format!("unexpected character `{other}`")),
        }
    }
    Ok(tokens)
}

// ============================================================================
// Recursive descent evaluator
// ============================================================================

struct ExprParser {
    tokens: Vec<Token>,
    pos: usize,
}

impl ExprParser {
    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn bump(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn expr(&mut self, source: &str) -> Result<f64, EvalError> {
        let mut value = self.term(source)?;
        loop {
            match self.peek() {
                Some(Token::Plus) => {
                    self.pos += 1;
                    value += self.term(source)?;
                }
                Some(Token::Minus) => {
                    self.pos += 1;
                    value -= self.term(source)?;
                }
                _ => break,
            }
        }
        Ok(value)
    }

    fn term(&mut self, source: &str) -> Result<f64, EvalError> {
        let mut value = self.factor(source)?;
        loop {
            match self.peek() {
                Some(Token::Star) => {
                    self.pos += 1;
                    value *= self.factor(source)?;
                }
                Some(Token::Slash) => {
                    self.pos += 1;
                    let divisor = self.factor(source)?;
                    if divisor == 0.0 {
                        return Err(EvalError::DivisionByZero {
                            expr: source.to_string(),
                        });
                    }
                    value /= divisor;
                }
                _ => break,
            }
        }
        Ok(value)
    }

    fn factor(&mut self, source: &str) -> Result<f64, EvalError> {
        match self.peek() {
            Some(Token::Minus) => {
                self.pos += 1;
                Ok(-self.factor(source)?)
            }
            Some(Token::Plus) => {
                self.pos += 1;
                self.factor(source)
            }
            _ => self.primary(source),
        }
    }

    fn primary(&mut self, source: &str) -> Result<f64, EvalError> {
        match self.bump() {
            Some(Token::Num(n)) => Ok(n),
            Some(Token::LParen) => {
                let value = self.expr(source)?;
                match self.bump() {
                    Some(Token::RParen) => Ok(value),
                    _ => Err(EvalError::InvalidExpression {
                        expr: source.to_string(),
                        message: "missing closing parenthesis".to_string(),
                    }),
                }
            }
            Some(Token::Ident(name)) => {
                if let Some(stripped) = name.strip_prefix('\\') {
                    return Err(EvalError::UndefinedVariable {
                        name: stripped.to_string(),
                    });
                }
                match self.peek() {
                    Some(Token::LParen) => {
                        self.pos += 1;
                        let args = self.arguments(source)?;
                        apply_function(&name, &args, source)
                    }
                    // A bare identifier is an unbound name.
                    _ => Err(EvalError::UndefinedVariable { name }),
                }
            }
            other => Err(EvalError::InvalidExpression {
                expr: source.to_string(),
                message: format!("unexpected token {other:?}"),
            }),
        }
    }

    fn arguments(&mut self, source: &str) -> Result<Vec<f64>, EvalError> {
        let mut args = vec![self.expr(source)?];
        loop {
            match self.bump() {
                Some(Token::Comma) => args.push(self.expr(source)?),
                Some(Token::RParen) => return Ok(args),
                _ => {
                    return Err(EvalError::InvalidExpression {
                        expr: source.to_string(),
                        message: "malformed argument list".to_string(),
                    });
                }
            }
        }
    }
}

fn apply_function(name: &str, args: &[f64], source: &str) -> Result<f64, EvalError> {
    let one = |args: &[f64]| -> Result<f64, EvalError> {
        if args.len() == 1 {
            Ok(args[0])
        } else {
            Err(EvalError::InvalidExpression {
                expr: source.to_string(),
                message: format!("{name} takes one argument"),
            })
        }
    };

    let result = match name {
        // TikZ trig is degree-based
        "sin" => one(args)?.to_radians().sin(),
        "cos" => one(args)?.to_radians().cos(),
        "tan" => one(args)?.to_radians().tan(),
        "sqrt" => one(args)?.sqrt(),
        "abs" => one(args)?.abs(),
        "exp" => one(args)?.exp(),
        "ln" => one(args)?.ln(),
        "log" => one(args)?.log10(),
        "floor" => one(args)?.floor(),
        "ceil" => one(args)?.ceil(),
        "round" => one(args)?.round(),
        "min" => args.iter().copied().fold(f64::INFINITY, f64::min),
        "max" => args.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        _ => {
            return Err(EvalError::UnknownFunction {
                name: name.to_string(),
            });
        }
    };
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::context::Value;

    fn ctx() -> EvalContext {
        EvalContext::new()
    }

    #[test]
    fn plain_numbers_short_circuit() {
        assert_eq!(evaluate("1.5", &ctx()).unwrap(), 1.5);
        assert_eq!(evaluate("-2", &ctx()).unwrap(), -2.0);
        assert_eq!(evaluate("", &ctx()).unwrap(), 0.0);
    }

    #[test]
    fn precedence_and_parens() {
        assert_eq!(evaluate("2+3*4", &ctx()).unwrap(), 14.0);
        assert_eq!(evaluate("(2+3)*4", &ctx()).unwrap(), 20.0);
        assert_eq!(evaluate("1 - 2 - 3", &ctx()).unwrap(), -4.0);
        assert_eq!(evaluate("8/2/2", &ctx()).unwrap(), 2.0);
    }

    #[test]
    fn unary_signs() {
        assert_eq!(evaluate("-(3)+5", &ctx()).unwrap(), 2.0);
        assert_eq!(evaluate("--2", &ctx()).unwrap(), 2.0);
    }

    #[test]
    fn trig_uses_degrees() {
        assert!((evaluate("sin(90)", &ctx()).unwrap() - 1.0).abs() < 1e-12);
        assert!((evaluate("cos(0)", &ctx()).unwrap() - 1.0).abs() < 1e-12);
        assert!((evaluate("cos(60)", &ctx()).unwrap() - 0.5).abs() < 1e-12);
        assert!((evaluate("tan(45)", &ctx()).unwrap() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn function_inventory() {
        let c = ctx();
        assert_eq!(evaluate("sqrt(4)", &c).unwrap(), 2.0);
        assert_eq!(evaluate("abs(-3)", &c).unwrap(), 3.0);
        assert_eq!(evaluate("log(100)", &c).unwrap(), 2.0);
        assert!((evaluate("ln(exp(1))", &c).unwrap() - 1.0).abs() < 1e-12);
        assert_eq!(evaluate("floor(2.7)", &c).unwrap(), 2.0);
        assert_eq!(evaluate("ceil(2.1)", &c).unwrap(), 3.0);
        assert_eq!(evaluate("round(2.5)", &c).unwrap(), 3.0);
        assert_eq!(evaluate("min(3,1,2)", &c).unwrap(), 1.0);
        assert_eq!(evaluate("max(3,1,2)", &c).unwrap(), 3.0);
    }

    #[test]
    fn variable_substitution() {
        let mut c = ctx();
        c.set_variable("r", Value::Num(1.5));
        assert_eq!(evaluate("2*\\r", &c).unwrap(), 3.0);
        assert_eq!(evaluate("\\r+\\r", &c).unwrap(), 3.0);
    }

    #[test]
    fn undefined_variable_errors() {
        assert!(matches!(
            evaluate("2*\\nope", &ctx()),
            Err(EvalError::UndefinedVariable { name }) if name == "nope"
        ));
    }

    #[test]
    fn division_by_zero_errors() {
        assert!(matches!(
            evaluate("1/0", &ctx()),
            Err(EvalError::DivisionByZero { .. })
        ));
    }

    #[test]
    fn unknown_function_errors() {
        assert!(matches!(
            evaluate("frobnicate(1)", &ctx()),
            Err(EvalError::UnknownFunction { .. })
        ));
    }

    #[test]
    fn unit_suffixes() {
        let c = ctx();
        assert_eq!(evaluate("2cm", &c).unwrap(), 2.0);
        assert!((evaluate("10mm", &c).unwrap() - 1.0).abs() < 1e-12);
        assert!((evaluate("28.35pt", &c).unwrap() - 1.0).abs() < 1e-12);
        assert!((evaluate("1in", &c).unwrap() - 2.54).abs() < 1e-12);
        assert_eq!(evaluate("1cm+5mm", &c).unwrap(), 1.5);
    }

    #[test]
    fn string_evaluation() {
        let mut c = ctx();
        c.set_variable("i", Value::Num(5.0));
        assert_eq!(eval_string("P\\i", &c), "P5");
        assert_eq!(eval_string("\\i-\\j", &c), "5-\\j");
        assert_eq!(eval_string("no vars", &c), "no vars");
    }

    #[test]
    fn option_processing() {
        let mut c = ctx();
        c.set_variable("r", Value::Num(2.0));
        let mut opts = OptionMap::new();
        opts.insert("radius".to_string(), OptionValue::Str("\\r".to_string()));
        opts.insert("color".to_string(), OptionValue::Str("red".to_string()));
        opts.insert("width".to_string(), OptionValue::Str("1+1".to_string()));
        let processed = process_options(&opts, &c);
        assert_eq!(processed.get("radius"), Some(&OptionValue::Num(2.0)));
        assert_eq!(
            processed.get("color"),
            Some(&OptionValue::Str("red".to_string()))
        );
        assert_eq!(processed.get("width"), Some(&OptionValue::Num(2.0)));
    }

    #[test]
    fn bare_word_option_tries_variable() {
        let mut c = ctx();
        c.set_variable("myradius", Value::Num(4.0));
        let v = safe_evaluate(&OptionValue::Str("myradius".to_string()), &c);
        assert_eq!(v, OptionValue::Num(4.0));
        // unbound words stay textual
        let v = safe_evaluate(&OptionValue::Str("dotted".to_string()), &c);
        assert_eq!(v, OptionValue::Str("dotted".to_string()));
    }
}
