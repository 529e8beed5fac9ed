//! Idempotency key generation
//!
//! One key per logical creation attempt, generated before the first
//! network call and reused across transport retries. Never regenerated
//! on retry.

use rand::Rng;

const BASE36: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const RANDOM_LEN: usize = 13;

/// Generate an idempotency key: base-36 millisecond timestamp plus a
/// base-36 random suffix, e.g. `mf3k2hq1-4g8zq0d2k7x1b`.
///
/// Practically unique across calls in the same process.
pub fn generate_key() -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    let mut rng = rand::thread_rng();
    let random: String = (0..RANDOM_LEN)
        .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
        .collect();
    format!("{}-{}", to_base36(millis as u64), random)
}

fn to_base36(mut value: u64) -> String {
    if value == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while value > 0 {
        digits.push(BASE36[(value % 36) as usize]);
        value /= 36;
    }
    digits.reverse();
    String::from_utf8(digits).expect("base36 digits are ASCII")
}
