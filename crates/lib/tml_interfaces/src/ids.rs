//! Random document identifier generation.
//!
//! Pure generation only — uniqueness against a collection is the
//! repository's job (it re-generates on collision).

use rand::{Rng, rng};

/// Upper-case letters and digits, the default identifier alphabet.
pub const ALPHANUMERIC: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Digits only, for numeric codes.
pub const NUMERIC: &str = "0123456789";

/// Default identifier length.
pub const DEFAULT_LENGTH: usize = 5;

/// Generate a random string of exactly `length` characters drawn uniformly
/// (with replacement) from `alphabet`.
pub fn generate(length: usize, alphabet: &str) -> String {
    let chars: Vec<char> = alphabet.chars().collect();
    if chars.is_empty() {
        return String::new();
    }
    let mut rng = rng();
    (0..length)
        .map(|_| chars[rng.random_range(0..chars.len())])
        .collect()
}

/// Generate an identifier with the default length and alphabet.
pub fn generate_default() -> String {
    generate(DEFAULT_LENGTH, ALPHANUMERIC)
}
