//! Bearer credential shape.
//!
//! Token plaintexts are 26 characters from the RFC 4648 base-32 alphabet,
//! the unpadded encoding of 128 random bits.

use rand::Rng;

/// Length of a token plaintext.
pub const TOKEN_LENGTH: usize = 26;

const ALPHABET: &[u8; 32] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ234567";

/// Whether `token` is a syntactically well-formed token plaintext.
pub fn validate(token: &str) -> bool {
    token.len() == TOKEN_LENGTH && token.bytes().all(|b| ALPHABET.contains(&b))
}

/// Generate a fresh random token plaintext.
pub fn generate() -> String {
    let mut rng = rand::thread_rng();
    (0..TOKEN_LENGTH)
        .map(|_| char::from(ALPHABET[rng.gen_range(0..ALPHABET.len())]))
        .collect()
}
