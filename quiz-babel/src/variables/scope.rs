use std::collections::HashMap;

use super::expression::{evaluate, EvalError, Value};
use super::generator::{from_expression, rng_for, sample, DEFAULT_SIGFIGS};
use super::Variable;
use crate::error::{QuizError, Result};

/// Sample count, document seed and the question being built (for errors).
#[derive(Debug, Clone, Copy)]
pub struct SamplingContext<'a> {
    pub n_samples: usize,
    pub seed: u64,
    pub question: &'a str,
}

/// Right-hand side of one `name=...` declaration.
#[derive(Debug, Clone, PartialEq)]
pub enum Definition {
    Range { min: String, max: String },
    Expression(String),
}

/// One parsed `name=...` or `name={... sigfigs:N}` declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    pub name: String,
    pub definition: Definition,
    pub sigfigs: u32,
}

impl Declaration {
    /// Parse a single declaration; `source` has no trailing `;`.
    pub fn parse(source: &str) -> Result<Self> {
        let (name, rhs) = source
            .split_once('=')
            .ok_or_else(|| QuizError::Parse(format!("variable declaration without '=': {source}")))?;
        let name = name.trim();
        let valid_name = name
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
            && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
        if !valid_name {
            return Err(QuizError::Parse(format!("invalid variable name '{name}'")));
        }

        let mut rhs = rhs.trim();
        let mut sigfigs = DEFAULT_SIGFIGS;
        if let Some(inner) = rhs.strip_prefix('{').and_then(|r| r.strip_suffix('}')) {
            rhs = inner.trim();
            if let Some((body, figures)) = rhs.split_once("sigfigs:") {
                sigfigs = figures.trim().parse().map_err(|_| {
                    QuizError::Parse(format!("invalid sigfigs for '{name}': {}", figures.trim()))
                })?;
                rhs = body.trim();
            }
        }

        let definition = match rhs.strip_prefix('[').and_then(|r| r.strip_suffix(']')) {
            Some(bounds) => {
                let (min, max) = bounds.split_once(',').ok_or_else(|| {
                    QuizError::Parse(format!("range for '{name}' needs two bounds: [{bounds}]"))
                })?;
                Definition::Range {
                    min: min.trim().to_string(),
                    max: max.trim().to_string(),
                }
            }
            None if rhs.is_empty() => {
                return Err(QuizError::Parse(format!("empty definition for '{name}'")))
            }
            None => Definition::Expression(rhs.to_string()),
        };

        Ok(Declaration {
            name: name.to_string(),
            definition,
            sigfigs,
        })
    }

    /// Split a `SHARED_VARS:` / `PRIVATE_VARS:` line into declarations.
    pub fn parse_line(line: &str) -> Result<Vec<Self>> {
        line.split(';')
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(Declaration::parse)
            .collect()
    }
}

/// Variables visible to one block of declarations.
///
/// Lookups fall through to `parent`, so a question's private scope sees the
/// shared variables of its category.
#[derive(Debug)]
pub struct Scope<'p> {
    key: String,
    shared: bool,
    parent: Option<&'p Scope<'p>>,
    variables: Vec<Variable>,
    sources: HashMap<String, Declaration>,
}

impl<'p> Scope<'p> {
    /// Scope for the shared variables of the category `key`.
    pub fn shared(key: impl Into<String>) -> Self {
        Scope {
            key: key.into(),
            shared: true,
            parent: None,
            variables: Vec::new(),
            sources: HashMap::new(),
        }
    }

    /// Scope for one question's private variables.
    pub fn private(key: impl Into<String>, parent: &'p Scope<'p>) -> Self {
        Scope {
            key: key.into(),
            shared: false,
            parent: Some(parent),
            variables: Vec::new(),
            sources: HashMap::new(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Variable> {
        self.variables
            .iter()
            .find(|v| v.name == name)
            .or_else(|| self.parent.and_then(|p| p.get(name)))
    }

    /// Variables defined in this scope, in definition order.
    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    /// Where the visible `name` was defined, as `(scope depth, index)`.
    /// Parent definitions sort before this scope's own.
    pub fn position(&self, name: &str) -> Option<(usize, usize)> {
        match self.variables.iter().position(|v| v.name == name) {
            Some(index) => Some((self.depth(), index)),
            None => self.parent.and_then(|p| p.position(name)),
        }
    }

    fn depth(&self) -> usize {
        self.parent.map_or(0, |p| p.depth() + 1)
    }

    /// Define a variable.
    ///
    /// A repeated name keeps the first definition. In a shared scope a
    /// repeat with a different definition is a [`QuizError::ConflictingDefinition`].
    pub fn define(&mut self, declaration: &Declaration, context: &SamplingContext<'_>) -> Result<()> {
        if let Some(existing) = self.sources.get(&declaration.name) {
            if self.shared && existing != declaration {
                return Err(QuizError::ConflictingDefinition {
                    category: self.key.clone(),
                    name: declaration.name.clone(),
                });
            }
            tracing::warn!(
                question = context.question,
                name = %declaration.name,
                "variable declared twice, keeping the first definition"
            );
            return Ok(());
        }

        let variable = match &declaration.definition {
            Definition::Range { min, max } => {
                let min = self.bound(min, context)?;
                let max = self.bound(max, context)?;
                let mut rng = rng_for(context.seed, &self.key, &declaration.name);
                sample(
                    &declaration.name,
                    (min, max),
                    context.n_samples,
                    self.shared,
                    None,
                    declaration.sigfigs,
                    &mut rng,
                )
            }
            Definition::Expression(expression) => {
                let values = self
                    .evaluate(expression, context)?
                    .into_samples(context.n_samples);
                from_expression(
                    &declaration.name,
                    &values,
                    declaration.sigfigs,
                    1,
                    self.variables.len() as u32,
                    expression,
                    self.shared,
                )
            }
        };
        self.sources
            .insert(declaration.name.clone(), declaration.clone());
        self.variables.push(variable);
        Ok(())
    }

    fn bound(&self, source: &str, context: &SamplingContext<'_>) -> Result<f64> {
        match self.evaluate(source, context)? {
            Value::Scalar(x) => Ok(x),
            Value::Array(_) => Err(QuizError::Expression {
                expression: source.to_string(),
                message: "range bounds must be constants".into(),
            }),
        }
    }

    /// Evaluate `expression` against the variables visible here.
    pub fn evaluate(&self, expression: &str, context: &SamplingContext<'_>) -> Result<Value> {
        evaluate(expression, |name| self.get(name).map(|v| v.values.as_slice())).map_err(
            |err| match err {
                EvalError::Undefined(name) => QuizError::undefined(context.question, name),
                EvalError::Syntax(message) => QuizError::Expression {
                    expression: expression.to_string(),
                    message,
                },
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> SamplingContext<'static> {
        SamplingContext {
            n_samples: 10,
            seed: 3,
            question: "q1",
        }
    }

    fn define_all(scope: &mut Scope<'_>, line: &str) -> Result<()> {
        for declaration in Declaration::parse_line(line)? {
            scope.define(&declaration, &context())?;
        }
        Ok(())
    }

    #[test]
    fn parses_declaration_shapes() {
        let plain = Declaration::parse("a=[1, 10]").unwrap();
        assert_eq!(
            plain.definition,
            Definition::Range {
                min: "1".into(),
                max: "10".into()
            }
        );
        assert_eq!(plain.sigfigs, 3);

        let braced = Declaration::parse(" b = {[1.0, 10.0] sigfigs:4}").unwrap();
        assert_eq!(braced.name, "b");
        assert_eq!(braced.sigfigs, 4);

        let expression = Declaration::parse("c={a*b sigfigs:2}").unwrap();
        assert_eq!(expression.definition, Definition::Expression("a*b".into()));
        assert_eq!(expression.sigfigs, 2);

        assert!(Declaration::parse("1x=[1,2]").is_err());
        assert!(Declaration::parse("x").is_err());
    }

    #[test]
    fn expressions_see_earlier_variables() {
        let mut scope = Scope::shared("cat");
        define_all(&mut scope, "a=[1,10]; b=a*2; c={a+b sigfigs:4};").unwrap();
        let a = scope.get("a").unwrap().clone();
        let b = scope.get("b").unwrap();
        assert_eq!(b.order, 1);
        assert!(b.shared);
        for (x, y) in a.values.iter().zip(&b.values) {
            assert!((x * 2.0 - y).abs() < 0.05 * y.abs());
        }
        assert_eq!(scope.get("c").unwrap().order, 2);
    }

    #[test]
    fn forward_references_are_undefined() {
        let mut scope = Scope::shared("cat");
        let err = define_all(&mut scope, "b=a*2; a=[1,10]").unwrap_err();
        assert!(matches!(err, QuizError::UndefinedReference { name, .. } if name == "a"));
    }

    #[test]
    fn private_scope_layers_on_shared() {
        let mut shared = Scope::shared("cat");
        define_all(&mut shared, "a=[1,10]").unwrap();
        let mut private = Scope::private("q1", &shared);
        define_all(&mut private, "p={a*3 sigfigs:2}").unwrap();
        let p = private.get("p").unwrap();
        assert!(!p.shared);
        assert_eq!(p.order, 0);
        assert!(private.get("a").is_some());
        assert_eq!(private.variables().len(), 1);
    }

    #[test]
    fn shared_redeclarations() {
        let mut scope = Scope::shared("cat");
        define_all(&mut scope, "a=[1,10]; a=[1, 10]").unwrap();
        assert_eq!(scope.variables().len(), 1);

        let err = define_all(&mut scope, "a=[1,20]").unwrap_err();
        assert!(matches!(err, QuizError::ConflictingDefinition { name, .. } if name == "a"));
    }

    #[test]
    fn private_duplicates_keep_the_first() {
        let shared = Scope::shared("cat");
        let mut private = Scope::private("q", &shared);
        define_all(&mut private, "x=[1,2]; x=[5,6]").unwrap();
        assert_eq!(private.variables().len(), 1);
        assert!(private.get("x").unwrap().max <= 2.0);
    }

    #[test]
    fn constant_expressions_broadcast() {
        let mut scope = Scope::shared("cat");
        define_all(&mut scope, "k=2*pi").unwrap();
        assert_eq!(scope.get("k").unwrap().values.len(), 10);
    }
}
