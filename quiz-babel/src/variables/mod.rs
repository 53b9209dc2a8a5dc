//! Datasets for calculated questions
//!
//! A [`Variable`] is a named array of sample values. Variables are either
//! drawn uniformly from a range ([`sample`]) or computed from an expression
//! over variables defined before them ([`from_expression`]).
//!
//! Declarations are resolved through a [`Scope`]. A category's shared
//! variables live in one scope; each question gets a private scope layered
//! on top of it.

pub mod expression;
mod generator;
mod scope;

pub use generator::{from_expression, rng_for, sample, DEFAULT_SIGFIGS};
pub use scope::{Declaration, Definition, SamplingContext, Scope};

/// A named dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub name: String,
    pub min: f64,
    pub max: f64,
    pub decimals: u32,
    pub sigfigs: u32,
    pub values: Vec<f64>,
    pub shared: bool,
    /// Source of an expression-defined variable.
    pub expression: Option<String>,
    /// Position of an expression-defined variable in its scope; `0` for
    /// sampled variables.
    pub order: u32,
}

impl Variable {
    /// The range as it is written back: `[min, max]`.
    pub fn range_literal(&self) -> String {
        format!(
            "[{}, {}]",
            crate::common::number::format_number(self.min),
            crate::common::number::format_number(self.max)
        )
    }

    /// Sort key used when listing a question's variables.
    pub fn sort_key(&self) -> (u32, &str) {
        (self.order, self.name.as_str())
    }
}
