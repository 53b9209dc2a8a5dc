//! Format implementations
//!
//! Each submodule converts between the quiz model and one encoding.

pub mod text;
pub mod xml;

pub use text::{TextFormat, TextOptions};
pub use xml::{XmlFormat, XmlOptions};
