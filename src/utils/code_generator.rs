//! Identifier generation for affiliate codes, link short codes and withdrawal
//! references.
//!
//! Generators only produce candidates. Uniqueness is enforced by the store's
//! unique constraints, and callers retry with the next candidate on conflict.
//! Affiliate codes continue from the highest numeric suffix already taken for
//! their base, so repeated display names never exhaust the retry budget.

use crate::error::AppError;
use chrono::{DateTime, Utc};
use rand::Rng;
use serde_json::json;

/// Maximum characters taken from the display name.
const AFFILIATE_CODE_PREFIX_MAX: usize = 8;

/// Codes shorter than this are padded with random characters.
const AFFILIATE_CODE_MIN_LENGTH: usize = 6;

const PAD_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Longest numeric suffix recognised on an affiliate code; keeps the value
/// inside `i64` for the store.
pub const MAX_SUFFIX_DIGITS: usize = 18;

/// Random bytes behind a short code (hex-encoded to 8 characters).
const SHORT_CODE_BYTES: usize = 4;

/// Random bytes behind the suffix of a withdrawal reference.
const REFERENCE_BYTES: usize = 4;

/// Maximum attempts for any generate-insert-retry loop.
pub const MAX_GENERATION_ATTEMPTS: usize = 10;

fn random_bytes<const N: usize>() -> Result<[u8; N], AppError> {
    let mut buffer = [0u8; N];
    getrandom::fill(&mut buffer).map_err(|e| {
        AppError::internal(
            "Failed to generate random bytes",
            json!({ "reason": e.to_string() }),
        )
    })?;
    Ok(buffer)
}

/// Builds the base affiliate code for a display name.
///
/// Keeps the lowercase ASCII alphanumerics of the name, truncates them to 8
/// characters and pads with random `[a-z0-9]` up to 6 characters.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(affiliate_code_base("Jane Doe!"), "janedoe");
/// assert_eq!(affiliate_code_base("Bartholomew Smith"), "bartholo");
/// assert_eq!(affiliate_code_base("Al").len(), 6);
/// ```
pub fn affiliate_code_base(display_name: &str) -> String {
    let mut code: String = display_name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .take(AFFILIATE_CODE_PREFIX_MAX)
        .collect();

    let mut rng = rand::rng();
    while code.len() < AFFILIATE_CODE_MIN_LENGTH {
        let idx = rng.random_range(0..PAD_ALPHABET.len());
        code.push(PAD_ALPHABET[idx] as char);
    }

    code
}

/// Returns the candidate for a suffix: the base itself for 0, otherwise the
/// base with the number appended.
pub fn affiliate_code_candidate(base: &str, suffix: u64) -> String {
    if suffix == 0 {
        base.to_string()
    } else {
        format!("{base}{suffix}")
    }
}

/// Returns the numeric suffix `code` carries on top of `base`, or `None` when
/// `code` was not derived from `base`.
///
/// ```ignore
/// assert_eq!(code_suffix("jonathan", "jonathan"), Some(0));
/// assert_eq!(code_suffix("jonathan", "jonathan12"), Some(12));
/// assert_eq!(code_suffix("jonathan", "jonathanx"), None);
/// ```
pub fn code_suffix(base: &str, code: &str) -> Option<u64> {
    let rest = code.strip_prefix(base)?;
    if rest.is_empty() {
        return Some(0);
    }
    if rest.len() > MAX_SUFFIX_DIGITS || !rest.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    rest.parse().ok()
}

/// Generates an 8-character lowercase hexadecimal short code.
pub fn generate_short_code() -> Result<String, AppError> {
    Ok(hex::encode(random_bytes::<SHORT_CODE_BYTES>()?))
}

/// Generates a withdrawal reference of the form `WD-20261019-9f86d081`.
pub fn generate_withdrawal_reference(at: DateTime<Utc>) -> Result<String, AppError> {
    Ok(format!(
        "WD-{}-{}",
        at.format("%Y%m%d"),
        hex::encode(random_bytes::<REFERENCE_BYTES>()?)
    ))
}
