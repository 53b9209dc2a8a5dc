use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::Variable;
use crate::common::sigfig::{ceil_to_sigfigs, decimals_for, floor_to_sigfigs, round_all, round_to_sigfigs};

pub const DEFAULT_SIGFIGS: u32 = 3;

fn fnv1a(bytes: impl IntoIterator<Item = u8>, mut hash: u64) -> u64 {
    for byte in bytes {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(0x0100_0000_01b3);
    }
    hash
}

/// A generator for one variable, stable across runs and platforms.
pub fn rng_for(seed: u64, scope: &str, name: &str) -> StdRng {
    let hash = fnv1a(seed.to_le_bytes(), 0xcbf2_9ce4_8422_2325);
    let hash = fnv1a(scope.bytes().chain([0]).chain(name.bytes()), hash);
    StdRng::seed_from_u64(hash)
}

/// Draw `count` uniform samples from `range`, each rounded to `sigfigs`.
///
/// `decimals` defaults to the number of places `sigfigs` needs at the
/// range's largest magnitude.
pub fn sample(
    name: &str,
    range: (f64, f64),
    count: usize,
    shared: bool,
    decimals: Option<u32>,
    sigfigs: u32,
    rng: &mut impl Rng,
) -> Variable {
    let (min, max) = range;
    let (low, high) = if min <= max { (min, max) } else { (max, min) };
    let values = (0..count)
        .map(|_| {
            let x = if low < high { rng.gen_range(low..high) } else { low };
            round_to_sigfigs(x, sigfigs)
        })
        .collect();
    Variable {
        name: name.to_string(),
        min,
        max,
        decimals: decimals.unwrap_or_else(|| decimals_for(min, max, sigfigs)),
        sigfigs,
        values,
        shared,
        expression: None,
        order: 0,
    }
}

/// Build a variable from already computed values.
///
/// The recorded range is the rounded values' extrema widened outwards to
/// `extrema_sigfigs` figures.
pub fn from_expression(
    name: &str,
    values: &[f64],
    sigfigs: u32,
    extrema_sigfigs: u32,
    order: u32,
    expression: &str,
    shared: bool,
) -> Variable {
    let values = round_all(values, sigfigs);
    let finite = values.iter().copied().filter(|v| v.is_finite());
    let (low, high) = finite.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    let (min, max) = if low <= high {
        (
            floor_to_sigfigs(low, extrema_sigfigs),
            ceil_to_sigfigs(high, extrema_sigfigs),
        )
    } else {
        (0.0, 0.0)
    };
    Variable {
        name: name.to_string(),
        min,
        max,
        decimals: decimals_for(min, max, sigfigs),
        sigfigs,
        values,
        shared,
        expression: Some(expression.to_string()),
        order,
    }
}
