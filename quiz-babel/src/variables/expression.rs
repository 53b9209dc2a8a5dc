//! Arithmetic over sampled variables
//!
//! Expressions are evaluated element-wise: every variable is an array of
//! samples and literals broadcast against them.
//!
//! ```text
//! expr  := term (("+" | "-") term)*
//! term  := unary (("*" | "/") unary)*
//! unary := ("-" | "+") unary | power
//! power := atom (("**" | "^") unary)?
//! atom  := number | name | name "(" expr ("," expr)* ")" | "(" expr ")"
//! ```
//!
//! Function names may carry an `np.` or `math.` prefix.

use logos::Logos;

#[derive(Logos, Debug, PartialEq, Clone)]
#[logos(skip r"[ \t\r\n]+")]
pub enum Token {
    #[regex(r"[0-9]+(\.[0-9]*)?([eE][+-]?[0-9]+)?|\.[0-9]+([eE][+-]?[0-9]+)?", |lex| lex.slice().parse::<f64>().ok())]
    Number(f64),
    #[regex(r"[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)*", |lex| lex.slice().to_string())]
    Name(String),
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("**")]
    #[token("^")]
    Power,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("(")]
    OpenParen,
    #[token(")")]
    CloseParen,
    #[token(",")]
    Comma,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EvalError {
    /// A name that is neither a variable, a constant nor a function.
    Undefined(String),
    Syntax(String),
}

/// A scalar or one value per sample.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Scalar(f64),
    Array(Vec<f64>),
}

impl Value {
    fn map(self, f: impl Fn(f64) -> f64) -> Value {
        match self {
            Value::Scalar(x) => Value::Scalar(f(x)),
            Value::Array(xs) => Value::Array(xs.into_iter().map(f).collect()),
        }
    }

    fn zip(self, other: Value, f: impl Fn(f64, f64) -> f64) -> Result<Value, EvalError> {
        Ok(match (self, other) {
            (Value::Scalar(a), Value::Scalar(b)) => Value::Scalar(f(a, b)),
            (Value::Scalar(a), Value::Array(bs)) => {
                Value::Array(bs.into_iter().map(|b| f(a, b)).collect())
            }
            (Value::Array(xs), Value::Scalar(b)) => {
                Value::Array(xs.into_iter().map(|a| f(a, b)).collect())
            }
            (Value::Array(xs), Value::Array(ys)) => {
                if xs.len() != ys.len() {
                    return Err(EvalError::Syntax(format!(
                        "operands have {} and {} samples",
                        xs.len(),
                        ys.len()
                    )));
                }
                Value::Array(xs.into_iter().zip(ys).map(|(a, b)| f(a, b)).collect())
            }
        })
    }

    /// Expand to `count` samples.
    pub fn into_samples(self, count: usize) -> Vec<f64> {
        match self {
            Value::Scalar(x) => vec![x; count],
            Value::Array(xs) => xs,
        }
    }
}

/// Split an expression into tokens.
pub fn tokenize(expression: &str) -> Result<Vec<Token>, EvalError> {
    let mut tokens = Vec::new();
    for (token, span) in Token::lexer(expression).spanned() {
        match token {
            Ok(token) => tokens.push(token),
            Err(()) => {
                return Err(EvalError::Syntax(format!(
                    "unexpected '{}'",
                    &expression[span]
                )))
            }
        }
    }
    Ok(tokens)
}

/// Every name an expression uses outside a function call position.
pub fn referenced_names(expression: &str) -> Vec<String> {
    let Ok(tokens) = tokenize(expression) else {
        return Vec::new();
    };
    let mut names = Vec::new();
    for (index, token) in tokens.iter().enumerate() {
        if let Token::Name(name) = token {
            let is_call = matches!(tokens.get(index + 1), Some(Token::OpenParen));
            if !is_call && !names.contains(name) {
                names.push(name.clone());
            }
        }
    }
    names
}

fn strip_module(name: &str) -> &str {
    name.strip_prefix("np.")
        .or_else(|| name.strip_prefix("numpy."))
        .or_else(|| name.strip_prefix("math."))
        .unwrap_or(name)
}

fn constant(name: &str) -> Option<f64> {
    match strip_module(name) {
        "pi" => Some(std::f64::consts::PI),
        "e" => Some(std::f64::consts::E),
        _ => None,
    }
}

fn function(name: &str) -> Option<fn(f64) -> f64> {
    let f: fn(f64) -> f64 = match strip_module(name) {
        "sqrt" => f64::sqrt,
        "exp" => f64::exp,
        "log" => f64::ln,
        "log10" => f64::log10,
        "log2" => f64::log2,
        "sin" => f64::sin,
        "cos" => f64::cos,
        "tan" => f64::tan,
        "asin" | "arcsin" => f64::asin,
        "acos" | "arccos" => f64::acos,
        "atan" | "arctan" => f64::atan,
        "sinh" => f64::sinh,
        "cosh" => f64::cosh,
        "tanh" => f64::tanh,
        "abs" | "fabs" => f64::abs,
        "floor" => f64::floor,
        "ceil" => f64::ceil,
        _ => return None,
    };
    Some(f)
}

/// Evaluate `expression`, resolving variable names through `lookup`.
///
/// Variables shadow the constants `pi` and `e`.
pub fn evaluate<'a>(
    expression: &str,
    lookup: impl Fn(&str) -> Option<&'a [f64]>,
) -> Result<Value, EvalError> {
    let tokens = tokenize(expression)?;
    let mut parser = Parser {
        tokens: &tokens,
        position: 0,
        lookup: &lookup,
    };
    let value = parser.expr()?;
    if parser.position != tokens.len() {
        return Err(EvalError::Syntax(format!(
            "unexpected {:?}",
            tokens[parser.position]
        )));
    }
    Ok(value)
}

struct Parser<'t, 'l, F> {
    tokens: &'t [Token],
    position: usize,
    lookup: &'l F,
}

impl<'a, F> Parser<'_, '_, F>
where
    F: Fn(&str) -> Option<&'a [f64]>,
{
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.position)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.position).cloned();
        self.position += 1;
        token
    }

    fn expect(&mut self, expected: Token) -> Result<(), EvalError> {
        match self.advance() {
            Some(token) if token == expected => Ok(()),
            Some(token) => Err(EvalError::Syntax(format!(
                "expected {expected:?}, found {token:?}"
            ))),
            None => Err(EvalError::Syntax(format!(
                "expected {expected:?}, found end of expression"
            ))),
        }
    }

    fn expr(&mut self) -> Result<Value, EvalError> {
        let mut value = self.term()?;
        loop {
            match self.peek() {
                Some(Token::Plus) => {
                    self.advance();
                    value = value.zip(self.term()?, |a, b| a + b)?;
                }
                Some(Token::Minus) => {
                    self.advance();
                    value = value.zip(self.term()?, |a, b| a - b)?;
                }
                _ => return Ok(value),
            }
        }
    }

    fn term(&mut self) -> Result<Value, EvalError> {
        let mut value = self.unary()?;
        loop {
            match self.peek() {
                Some(Token::Star) => {
                    self.advance();
                    value = value.zip(self.unary()?, |a, b| a * b)?;
                }
                Some(Token::Slash) => {
                    self.advance();
                    value = value.zip(self.unary()?, |a, b| a / b)?;
                }
                _ => return Ok(value),
            }
        }
    }

    fn unary(&mut self) -> Result<Value, EvalError> {
        match self.peek() {
            Some(Token::Minus) => {
                self.advance();
                Ok(self.unary()?.map(|x| -x))
            }
            Some(Token::Plus) => {
                self.advance();
                self.unary()
            }
            _ => self.power(),
        }
    }

    fn power(&mut self) -> Result<Value, EvalError> {
        let base = self.atom()?;
        if matches!(self.peek(), Some(Token::Power)) {
            self.advance();
            let exponent = self.unary()?;
            return base.zip(exponent, f64::powf);
        }
        Ok(base)
    }

    fn atom(&mut self) -> Result<Value, EvalError> {
        match self.advance() {
            Some(Token::Number(x)) => Ok(Value::Scalar(x)),
            Some(Token::OpenParen) => {
                let value = self.expr()?;
                self.expect(Token::CloseParen)?;
                Ok(value)
            }
            Some(Token::Name(name)) => {
                if matches!(self.peek(), Some(Token::OpenParen)) {
                    self.advance();
                    return self.call(&name);
                }
                if let Some(values) = (self.lookup)(&name) {
                    return Ok(Value::Array(values.to_vec()));
                }
                constant(&name)
                    .map(Value::Scalar)
                    .ok_or(EvalError::Undefined(name))
            }
            Some(token) => Err(EvalError::Syntax(format!("unexpected {token:?}"))),
            None => Err(EvalError::Syntax("unexpected end of expression".into())),
        }
    }

    fn call(&mut self, name: &str) -> Result<Value, EvalError> {
        let mut args = vec![self.expr()?];
        while matches!(self.peek(), Some(Token::Comma)) {
            self.advance();
            args.push(self.expr()?);
        }
        self.expect(Token::CloseParen)?;

        match (strip_module(name), args.len()) {
            ("pow" | "power", 2) => {
                let exponent = args.pop().unwrap_or(Value::Scalar(1.0));
                let base = args.pop().unwrap_or(Value::Scalar(0.0));
                base.zip(exponent, f64::powf)
            }
            ("atan2" | "arctan2", 2) => {
                let x = args.pop().unwrap_or(Value::Scalar(1.0));
                let y = args.pop().unwrap_or(Value::Scalar(0.0));
                y.zip(x, f64::atan2)
            }
            (_, 1) => match function(name) {
                Some(f) => Ok(args.remove(0).map(f)),
                None => Err(EvalError::Undefined(name.to_string())),
            },
            _ => Err(EvalError::Syntax(format!(
                "{name} does not take {} arguments",
                args.len()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(expression: &str, vars: &[(&str, Vec<f64>)]) -> Result<Value, EvalError> {
        evaluate(expression, |name| {
            vars.iter()
                .find(|(n, _)| *n == name)
                .map(|(_, v)| v.as_slice())
        })
    }

    #[test]
    fn precedence_and_power() {
        assert_eq!(eval("1 + 2 * 3", &[]), Ok(Value::Scalar(7.0)));
        assert_eq!(eval("2 ** 3 ** 2", &[]), Ok(Value::Scalar(512.0)));
        assert_eq!(eval("-2 ** 2", &[]), Ok(Value::Scalar(-4.0)));
        assert_eq!(eval("2^-1", &[]), Ok(Value::Scalar(0.5)));
        assert_eq!(eval("(1 + 2) * 3", &[]), Ok(Value::Scalar(9.0)));
    }

    #[test]
    fn elementwise_over_samples() {
        let out = eval("a * b + 1", &[("a", vec![1.0, 2.0]), ("b", vec![3.0, 4.0])]);
        assert_eq!(out, Ok(Value::Array(vec![4.0, 9.0])));
    }

    #[test]
    fn functions_and_constants() {
        assert_eq!(eval("np.sqrt(16)", &[]), Ok(Value::Scalar(4.0)));
        assert_eq!(eval("math.log10(1000)", &[]), Ok(Value::Scalar(3.0)));
        assert_eq!(eval("cos(0) + abs(-2)", &[]), Ok(Value::Scalar(3.0)));
        assert_eq!(eval("pow(2, 10)", &[]), Ok(Value::Scalar(1024.0)));
        match eval("np.pi", &[]) {
            Ok(Value::Scalar(x)) => assert!((x - std::f64::consts::PI).abs() < 1e-15),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn variables_shadow_constants() {
        assert_eq!(eval("e", &[("e", vec![5.0])]), Ok(Value::Array(vec![5.0])));
    }

    #[test]
    fn undefined_names_are_reported() {
        assert_eq!(eval("a + zz", &[("a", vec![1.0])]), Err(EvalError::Undefined("zz".into())));
        assert_eq!(eval("nosuch(1)", &[]), Err(EvalError::Undefined("nosuch".into())));
    }

    #[test]
    fn syntax_errors() {
        assert!(matches!(eval("1 +", &[]), Err(EvalError::Syntax(_))));
        assert!(matches!(eval("(1", &[]), Err(EvalError::Syntax(_))));
        assert!(matches!(eval("1 $ 2", &[]), Err(EvalError::Syntax(_))));
        assert!(matches!(eval("1 2", &[]), Err(EvalError::Syntax(_))));
    }

    #[test]
    fn lists_referenced_names() {
        assert_eq!(
            referenced_names("np.sqrt(a**2 + b) * pi / a"),
            vec!["a".to_string(), "b".to_string(), "pi".to_string()]
        );
    }
}
