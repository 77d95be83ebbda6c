//! Byte-level mutators applied to existing seeds.
//!
//! Every mutator edits the string in place and keeps it non-empty. The
//! printable-ASCII mutators guarantee their output stays in `[32, 127]`.

use rand::Rng;

use crate::generators::{self, one_plus_exp};

/// Delete a block of `1 + Exp(1)` bytes starting at a random position.
/// Never produces the empty string.
pub fn delete_block(rng: &mut impl Rng, s: &mut Vec<u8>) {
    if s.len() <= 1 {
        return;
    }

    let block = one_plus_exp(rng, 1.0);
    if block >= s.len() {
        return;
    }

    let start = rng.gen_range(0..=s.len() - 2);
    let block = block.min(s.len() - start);
    s.drain(start..start + block);
}

/// Insert a block of `1 + Exp(1)` fresh printable bytes at a random position.
pub fn insert_block(rng: &mut impl Rng, s: &mut Vec<u8>) {
    let len = one_plus_exp(rng, 1.0);
    let at = rng.gen_range(0..=s.len());
    let block = generators::random_string(rng, len, 32, 126);
    s.splice(at..at, block);
}

/// Insert one decimal digit at a random position.
pub fn insert_digit(rng: &mut impl Rng, s: &mut Vec<u8>) {
    let at = rng.gen_range(0..=s.len());
    s.insert(at, generators::random_digit(rng));
}

/// Insert `'\n'` at a random position.
pub fn insert_newline(rng: &mut impl Rng, s: &mut Vec<u8>) {
    let at = rng.gen_range(0..=s.len());
    s.insert(at, b'\n');
}

/// XOR one of the low seven bits of a random byte, lifting the result back
/// into printable range when it drops below 32.
pub fn flip_bit_ascii(rng: &mut impl Rng, s: &mut Vec<u8>) {
    if s.is_empty() {
        return;
    }

    let pos = rng.gen_range(0..s.len());
    let bit = 1u8 << rng.gen_range(0..7);
    s[pos] ^= bit;
    if s[pos] < 32 {
        s[pos] += 32;
    }
}

/// Add `±(1 + Exp(1))` to a random byte modulo 128, clamped into `[32, 127]`.
pub fn add_ascii(rng: &mut impl Rng, s: &mut Vec<u8>) {
    if s.is_empty() {
        return;
    }

    let pos = rng.gen_range(0..s.len());
    let mut val = one_plus_exp(rng, 1.0) as i32;
    if rng.gen_bool(0.5) {
        val = -val;
    }

    let mut byte = (i32::from(s[pos]) + val) & 0x7f;
    if byte < 32 {
        byte += 32;
    }
    s[pos] = byte as u8;
}

/// If the whole string is a decimal number of fewer than 19 digits, shift it
/// by `±(1 + Exp(1/4))`. No-op otherwise. A shift that would cross zero is
/// applied upward instead, so the output stays all-digits and the value
/// always changes.
pub fn change_num(rng: &mut impl Rng, s: &mut Vec<u8>) {
    if s.is_empty() || s.len() >= 19 {
        return;
    }
    if !s.iter().all(u8::is_ascii_digit) {
        return;
    }

    let num: i64 = match std::str::from_utf8(s.as_slice())
        .ok()
        .and_then(|t| t.parse().ok())
    {
        Some(num) => num,
        None => return,
    };

    let delta = one_plus_exp(rng, 0.25) as i64;
    let next = if rng.gen_bool(0.5) && num >= delta {
        num - delta
    } else {
        num + delta
    };

    *s = next.to_string().into_bytes();
}

/// Append another seed's bytes.
pub fn concat(s: &mut Vec<u8>, other: &[u8]) {
    s.extend_from_slice(other);
}

/// Apply one mutator chosen uniformly at random.
pub fn random_mutant(rng: &mut impl Rng, s: &mut Vec<u8>) {
    match rng.gen_range(0..6) {
        0 => delete_block(rng, s),
        1 => insert_block(rng, s),
        2 => change_num(rng, s),
        3 => insert_digit(rng, s),
        4 => add_ascii(rng, s),
        5 => flip_bit_ascii(rng, s),
        _ => unreachable!(),
    }
}

/// Apply `1 + Exp(1)` random mutations in sequence.
pub fn random_number_of_random_mutants(rng: &mut impl Rng, s: &mut Vec<u8>) {
    for _ in 0..one_plus_exp(rng, 1.0) {
        random_mutant(rng, s);
    }
}
