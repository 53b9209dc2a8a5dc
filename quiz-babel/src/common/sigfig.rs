//! Rounding to a number of significant figures
//!
//! Rounding goes through Rust's exact decimal formatting, so ties are broken
//! half-to-even on the exact binary value, the same way `round(x, ndigits)`
//! behaves in most numeric environments.

/// Magnitudes below this are treated as exactly zero.
pub const ZERO_THRESHOLD: f64 = 1e-100;

/// `floor(log10(|x|))`, or `0` for values indistinguishable from zero.
pub fn magnitude(x: f64) -> i32 {
    if x.abs() < ZERO_THRESHOLD || !x.is_finite() {
        0
    } else {
        x.abs().log10().floor() as i32
    }
}

/// Round `x` to `sigfigs` significant figures.
pub fn round_to_sigfigs(x: f64, sigfigs: u32) -> f64 {
    if x.abs() < ZERO_THRESHOLD {
        return 0.0;
    }
    if !x.is_finite() {
        return x;
    }
    let digits = sigfigs.max(1) as usize - 1;
    format!("{x:.digits$e}").parse().unwrap_or(x)
}

fn scaled(x: f64, sigfigs: u32, step: fn(f64) -> f64) -> f64 {
    if x.abs() < ZERO_THRESHOLD {
        return 0.0;
    }
    let shift = sigfigs as i32 - 1 - magnitude(x);
    let up = 10f64.powi(shift);
    let down = 10f64.powi(-shift);
    round_to_sigfigs(step(x * up) * down, sigfigs)
}

/// Largest value with `sigfigs` significant figures that is `<= x`.
pub fn floor_to_sigfigs(x: f64, sigfigs: u32) -> f64 {
    scaled(x, sigfigs, f64::floor)
}

/// Smallest value with `sigfigs` significant figures that is `>= x`.
pub fn ceil_to_sigfigs(x: f64, sigfigs: u32) -> f64 {
    scaled(x, sigfigs, f64::ceil)
}

/// Elementwise [`round_to_sigfigs`].
pub fn round_all(values: &[f64], sigfigs: u32) -> Vec<f64> {
    values.iter().map(|&v| round_to_sigfigs(v, sigfigs)).collect()
}

/// Number of decimals needed to show `sigfigs` figures of the larger range
/// endpoint. Never negative.
pub fn decimals_for(min: f64, max: f64, sigfigs: u32) -> u32 {
    let widest = min.abs().max(max.abs());
    let decimals = sigfigs as i32 - 1 - magnitude(widest);
    decimals.max(0) as u32
}

/// Count the significant digits of a decimal literal once trailing zeros are
/// dropped: `"0.0021"` has 2, `"100"` has 1, `"1.50"` has 2.
pub fn count_sigfigs(literal: &str) -> u32 {
    let literal = literal.trim().trim_start_matches(['+', '-']);
    let mantissa = literal
        .split(['e', 'E'])
        .next()
        .unwrap_or(literal);
    let digits: String = mantissa.chars().filter(char::is_ascii_digit).collect();
    let significant = digits.trim_start_matches('0').trim_end_matches('0');
    significant.len().max(1) as u32
}
