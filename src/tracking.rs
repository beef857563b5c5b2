//! Human-shareable order tracking codes of the form `TRK-XXXX-XXXX`.

use rand::Rng;

/// Upper-case letters and digits without the look-alikes `0`, `1`, `I` and `O`.
const ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
const PREFIX: &str = "TRK";

pub fn generate_tracking_number() -> String {
    let mut rng = rand::rng();
    let mut segment = || -> String {
        (0..4)
            .map(|_| char::from(ALPHABET[rng.random_range(0..ALPHABET.len())]))
            .collect()
    };
    let first = segment();
    let second = segment();
    format!("{PREFIX}-{first}-{second}")
}

/// Canonical lookup form: trimmed and upper-cased. `None` for blank input.
pub fn normalize_tracking_number(input: &str) -> Option<String> {
    let trimmed = input.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_ascii_uppercase())
}

pub fn is_tracking_number(code: &str) -> bool {
    let mut parts = code.split('-');
    let (Some(prefix), Some(first), Some(second), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return false;
    };
    let segment_ok = |s: &str| {
        s.len() == 4 && s.bytes().all(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
    };
    prefix == PREFIX && segment_ok(first) && segment_ok(second)
}
