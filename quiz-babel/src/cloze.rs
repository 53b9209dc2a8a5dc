//! Inline answer constructors for cloze bodies
//!
//! Authors write calls such as `MULTICHOICE("kW", ["J", ["kJ", 50]])` in the
//! body of a cloze question. Each call is replaced by the embedded-answer
//! token Moodle understands, e.g. `{1:MULTICHOICE_S:=kW~J~%50%kJ}`.
//!
//! Arguments are literal data only: strings, numbers, lists, and keyword
//! arguments for `NUMERICAL`.

use logos::Logos;

use crate::common::brackets::{extract_balanced, Delimiters};
use crate::common::number::format_number;
use crate::error::{QuizError, Result};

/// Relative tolerance `NUMERICAL` uses when none is given.
pub const DEFAULT_PRECISION: f64 = 0.0125;
/// Absolute tolerance added to answers that are exactly zero.
pub const DEFAULT_ACCURACY: f64 = 0.01;

/// Constructors in the order they are expanded.
pub const CONSTRUCTORS: [&str; 3] = ["MULTICHOICE", "NUMERICAL", "SHORTANSWER"];

fn unquote(slice: &str) -> String {
    let inner = &slice[1..slice.len() - 1];
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some(other @ ('\\' | '\'' | '"')) => out.push(other),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

#[derive(Logos, Debug, PartialEq, Clone)]
#[logos(skip r"[ \t\r\n]+")]
enum Token {
    #[token("[")]
    OpenBracket,
    #[token("]")]
    CloseBracket,
    #[token(",")]
    Comma,
    #[token("=")]
    Equals,
    #[regex(r#""([^"\\]|\\.)*""#, |lex| unquote(lex.slice()))]
    #[regex(r#"'([^'\\]|\\.)*'"#, |lex| unquote(lex.slice()))]
    Str(String),
    #[regex(r"[+-]?[0-9]+", |lex| lex.slice().parse::<i64>().ok(), priority = 3)]
    Int(i64),
    #[regex(r"[+-]?([0-9]+\.[0-9]*|\.[0-9]+)([eE][+-]?[0-9]+)?|[+-]?[0-9]+[eE][+-]?[0-9]+", |lex| lex.slice().parse::<f64>().ok())]
    Float(f64),
    #[regex(r"[A-Za-z_][A-Za-z0-9_]*", |lex| lex.slice().to_string())]
    Ident(String),
}

/// A number that remembers whether it was written as an integer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Num {
    Int(i64),
    Float(f64),
}

impl Num {
    fn value(self) -> f64 {
        match self {
            Num::Int(i) => i as f64,
            Num::Float(x) => x,
        }
    }

    fn is_zero(self) -> bool {
        self.value() == 0.0
    }

    fn mul(self, other: Num) -> Num {
        match (self, other) {
            (Num::Int(a), Num::Int(b)) => a.checked_mul(b).map_or(Num::Float(a as f64 * b as f64), Num::Int),
            (a, b) => Num::Float(a.value() * b.value()),
        }
    }

    fn add(self, other: Num) -> Num {
        match (self, other) {
            (Num::Int(a), Num::Int(b)) => a.checked_add(b).map_or(Num::Float(a as f64 + b as f64), Num::Int),
            (a, b) => Num::Float(a.value() + b.value()),
        }
    }
}

impl std::fmt::Display for Num {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Num::Int(i) => write!(f, "{i}"),
            Num::Float(x) => f.write_str(&format_number(*x)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Str(String),
    Num(Num),
    List(Vec<Literal>),
}

impl Literal {
    /// Text as it appears inside a token.
    fn render(&self) -> Option<String> {
        match self {
            Literal::Str(s) => Some(s.clone()),
            Literal::Num(n) => Some(n.to_string()),
            Literal::List(_) => None,
        }
    }

    fn num(&self) -> Option<Num> {
        match self {
            Literal::Num(n) => Some(*n),
            _ => None,
        }
    }
}

/// One call argument; `keyword` is set for `name=value`.
#[derive(Debug, Clone, PartialEq)]
pub struct Argument {
    pub keyword: Option<String>,
    pub value: Literal,
}

struct ArgParser {
    tokens: Vec<Token>,
    position: usize,
}

impl ArgParser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.position)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.position).cloned();
        self.position += 1;
        token
    }

    fn arguments(&mut self) -> CallResult<Vec<Argument>> {
        let mut args = Vec::new();
        while self.peek().is_some() {
            let keyword = match (self.tokens.get(self.position), self.tokens.get(self.position + 1)) {
                (Some(Token::Ident(name)), Some(Token::Equals)) => {
                    let name = name.clone();
                    self.position += 2;
                    Some(name)
                }
                _ => None,
            };
            args.push(Argument {
                keyword,
                value: self.literal()?,
            });
            match self.next() {
                None => break,
                Some(Token::Comma) => continue,
                Some(token) => return Err(invalid(format!("expected ',' but found {token:?}"))),
            }
        }
        Ok(args)
    }

    fn literal(&mut self) -> CallResult<Literal> {
        match self.next() {
            Some(Token::Str(s)) => Ok(Literal::Str(s)),
            Some(Token::Int(i)) => Ok(Literal::Num(Num::Int(i))),
            Some(Token::Float(x)) => Ok(Literal::Num(Num::Float(x))),
            Some(Token::OpenBracket) => {
                let mut items = Vec::new();
                loop {
                    if matches!(self.peek(), Some(Token::CloseBracket)) {
                        self.position += 1;
                        return Ok(Literal::List(items));
                    }
                    items.push(self.literal()?);
                    match self.next() {
                        Some(Token::Comma) => {}
                        Some(Token::CloseBracket) => return Ok(Literal::List(items)),
                        other => return Err(invalid(format!("unterminated list near {other:?}"))),
                    }
                }
            }
            Some(Token::Ident(name)) => Err(CallError::Undefined(name)),
            Some(token) => Err(invalid(format!("unexpected {token:?}"))),
            None => Err(invalid("missing value")),
        }
    }
}

/// Parse the text between a constructor's parentheses.
pub fn parse_arguments(source: &str) -> CallResult<Vec<Argument>> {
    let mut tokens = Vec::new();
    for (token, span) in Token::lexer(source).spanned() {
        match token {
            Ok(token) => tokens.push(token),
            Err(()) => return Err(invalid(format!("unexpected '{}'", &source[span]))),
        }
    }
    ArgParser {
        tokens,
        position: 0,
    }
    .arguments()
}

/// A `[text, weight]` pair.
fn weighted(item: &Literal) -> Option<(String, String)> {
    match item {
        Literal::List(pair) if pair.len() == 2 => Some((pair[0].render()?, pair[1].render()?)),
        _ => None,
    }
}

/// Why a single call could not be expanded.
#[derive(Debug, Clone, PartialEq)]
pub enum CallError {
    /// A bare name where a literal was expected.
    Undefined(String),
    Invalid(String),
}

pub type CallResult<T> = std::result::Result<T, CallError>;

fn invalid(message: impl Into<String>) -> CallError {
    CallError::Invalid(message.into())
}

fn multichoice(args: &[Argument]) -> CallResult<String> {
    let [correct, wrong] = args else {
        return Err(invalid("expected a correct answer and a list of wrong answers"));
    };
    let correct = correct
        .value
        .render()
        .ok_or_else(|| invalid("the correct answer must be text or a number"))?;
    let Literal::List(wrong) = &wrong.value else {
        return Err(invalid("wrong answers must be a list"));
    };

    let mut token = format!("{{1:MULTICHOICE_S:={correct}");
    for item in wrong {
        match (item.render(), weighted(item)) {
            (Some(text), _) => {
                token.push('~');
                token.push_str(&text);
            }
            (None, Some((text, weight))) => token.push_str(&format!("~%{weight}%{text}")),
            (None, None) => return Err(invalid(format!("unknown answer shape {item:?}"))),
        }
    }
    token.push('}');
    Ok(token)
}

fn shortanswer(args: &[Argument]) -> CallResult<String> {
    let [answers] = args else {
        return Err(invalid("expected one answer or a list of answers"));
    };
    let entries = match &answers.value {
        Literal::List(items) => items
            .iter()
            .map(|item| match (item.render(), weighted(item)) {
                (Some(text), _) => Ok(format!("={text}")),
                (None, Some((text, weight))) => Ok(format!("%{weight}%{text}")),
                (None, None) => Err(invalid(format!("unknown answer shape {item:?}"))),
            })
            .collect::<CallResult<Vec<_>>>()?,
        single => vec![format!(
            "={}",
            single.render().ok_or_else(|| invalid("unsupported answer"))?
        )],
    };
    Ok(format!("{{1:SHORTANSWER:{}}}", entries.join("~")))
}

fn numerical(args: &[Argument]) -> CallResult<String> {
    let mut answer = None;
    let mut precision = Num::Float(DEFAULT_PRECISION);
    let mut accuracy = Num::Float(DEFAULT_ACCURACY);
    let mut additional: &[Literal] = &[];

    for (index, argument) in args.iter().enumerate() {
        let slot = match argument.keyword.as_deref() {
            Some("answer") => 0,
            Some("precision") => 1,
            Some("accuracy") => 2,
            Some("additional_answers") => 3,
            Some(other) => return Err(invalid(format!("unknown keyword '{other}'"))),
            None => index,
        };
        match slot {
            0 => answer = argument.value.num(),
            1 => {
                precision = argument
                    .value
                    .num()
                    .ok_or_else(|| invalid("precision must be a number"))?
            }
            2 => {
                accuracy = argument
                    .value
                    .num()
                    .ok_or_else(|| invalid("accuracy must be a number"))?
            }
            3 => match &argument.value {
                Literal::List(items) => additional = items,
                _ => return Err(invalid("additional answers must be a list")),
            },
            _ => return Err(invalid("too many arguments")),
        }
    }
    let answer = answer.ok_or_else(|| invalid("the answer must be a number"))?;

    let tolerance = |value: Num| {
        let offset = if value.is_zero() { accuracy } else { Num::Int(0) };
        precision.mul(value).add(offset)
    };

    let mut token = format!("{{1:NUMERICAL:={answer}:{}", tolerance(answer));
    for item in additional {
        let pair = match item {
            Literal::List(pair) if pair.len() == 2 => pair,
            _ => return Err(invalid(format!("unknown answer shape {item:?}"))),
        };
        let (Some(value), Some(weight)) = (pair[0].num(), pair[1].render()) else {
            return Err(invalid("additional answers are [value, weight] pairs"));
        };
        token.push_str(&format!("~%{weight}%{value}:{}", tolerance(value)));
    }
    token.push('}');
    Ok(token)
}

/// Expand every constructor call in the body of `question`.
pub fn evaluate_cloze(question: &str, text: &str) -> Result<String> {
    let fail = |call: &str, error: CallError| match error {
        CallError::Undefined(name) => QuizError::undefined(question, name),
        CallError::Invalid(message) => QuizError::Cloze {
            question: question.to_string(),
            call: call.to_string(),
            message,
        },
    };
    let mut text = text.to_string();
    for call in CONSTRUCTORS {
        let arguments: Vec<String> = extract_balanced(&text, call, Delimiters::PARENS)
            .into_iter()
            .map(str::to_string)
            .collect();
        for source in arguments {
            let args = parse_arguments(&source).map_err(|e| fail(call, e))?;
            let token = match call {
                "MULTICHOICE" => multichoice(&args),
                "NUMERICAL" => numerical(&args),
                _ => shortanswer(&args),
            }
            .map_err(|e| fail(call, e))?;
            text = text.replace(&format!("{call}({source})"), &token);
        }
    }
    Ok(text)
}
