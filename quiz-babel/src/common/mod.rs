//! Helpers shared by the codecs and engines

pub mod brackets;
pub mod images;
pub mod latex;
pub mod natural;
pub mod number;
pub mod sigfig;
