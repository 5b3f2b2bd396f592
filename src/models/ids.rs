//! Document identifiers
//!
//! Every stored document is keyed by a string made of the creation time in
//! base-36 milliseconds followed by a short random base-36 suffix.

use chrono::{DateTime, Utc};
use rand::Rng;

const ALPHABET: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const RANDOM_LEN: usize = 8;

/// Generate a new identifier for the current instant
pub fn generate_id() -> String {
    generate_id_at(Utc::now())
}

/// Generate an identifier whose timestamp prefix encodes `at`
pub fn generate_id_at(at: DateTime<Utc>) -> String {
    let millis = at.timestamp_millis().max(0) as u64;
    let mut id = to_base36(millis);

    let mut rng = rand::thread_rng();
    id.extend((0..RANDOM_LEN).map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char));
    id
}

fn to_base36(mut value: u64) -> String {
    if value == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while value > 0 {
        digits.push(ALPHABET[(value % 36) as usize]);
        value /= 36;
    }
    digits.reverse();
    String::from_utf8(digits).unwrap_or_default()
}
