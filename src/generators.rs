//! Random input generators seeding the fuzzing loops.

use rand::Rng;
use rand_distr::{Distribution, Exp};

/// Smallest fresh random input, in bytes.
const MIN_SIZE: usize = 1;
/// Largest fresh random input, in bytes.
const MAX_SIZE: usize = 1024;

/// A random string of exactly `size` bytes, each uniform in
/// `[min_char, max_char]`.
pub fn random_string(rng: &mut impl Rng, size: usize, min_char: u8, max_char: u8) -> Vec<u8> {
    debug_assert!(min_char <= max_char);
    (0..size).map(|_| rng.gen_range(min_char..=max_char)).collect()
}

/// The decimal representation of an integer uniform in `[min, max]`.
pub fn random_num(rng: &mut impl Rng, min: u64, max: u64) -> Vec<u8> {
    rng.gen_range(min..=max).to_string().into_bytes()
}

pub fn random_ascii(rng: &mut impl Rng) -> u8 {
    rng.gen_range(32..=126)
}

pub fn random_digit(rng: &mut impl Rng) -> u8 {
    rng.gen_range(b'0'..=b'9')
}

/// A fresh input for a trial: with equal probability either a printable
/// string of length `[1, 1024]` or a decimal number in `[1, 1000000]`.
pub fn random_input(rng: &mut impl Rng) -> Vec<u8> {
    if rng.gen_bool(0.5) {
        let size = rng.gen_range(MIN_SIZE..=MAX_SIZE);
        random_string(rng, size, 33, 126)
    } else {
        random_num(rng, 1, 1_000_000)
    }
}

/// Draw `1 + Exp(lambda)` rounded to the nearest integer. Block lengths and
/// mutation counts follow this shape.
pub(crate) fn one_plus_exp(rng: &mut impl Rng, lambda: f64) -> usize {
    let dist = Exp::new(lambda).expect("exponential rate must be positive");
    1 + dist.sample(rng).round() as usize
}
