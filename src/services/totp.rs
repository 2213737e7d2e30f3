//! RFC 6238 time-based one-time passwords (SHA-1, 6 digits, 30 s step).

use chrono::Utc;
use data_encoding::BASE32_NOPAD;
use hmac::{Hmac, Mac};
use sha1::Sha1;
use url::form_urlencoded;

use crate::errors::AppError;

type HmacSha1 = Hmac<Sha1>;

pub const DIGITS: u32 = 6;
pub const PERIOD_SECS: u64 = 30;
const SECRET_LEN: usize = 20;

fn hotp(secret: &[u8], counter: u64) -> Option<u32> {
    let mut mac = HmacSha1::new_from_slice(secret).ok()?;
    mac.update(&counter.to_be_bytes());
    let hash = mac.finalize().into_bytes();
    let offset = (hash[19] & 0x0f) as usize;
    let bin_code = ((hash[offset] as u32 & 0x7f) << 24)
        | ((hash[offset + 1] as u32) << 16)
        | ((hash[offset + 2] as u32) << 8)
        | (hash[offset + 3] as u32);
    Some(bin_code)
}

/// The zero-padded code valid at unix time `time`.
pub fn code_at(secret: &[u8], time: u64) -> Option<String> {
    let code = hotp(secret, time / PERIOD_SECS)? % 10u32.pow(DIGITS);
    Some(format!("{:0width$}", code, width = DIGITS as usize))
}

/// Accepts the current step and one step either side to absorb clock drift.
pub fn verify_code(secret: &[u8], code: &str, now: u64) -> bool {
    if code.len() != DIGITS as usize || !code.chars().all(|c| c.is_ascii_digit()) {
        return false;
    }
    [
        now.saturating_sub(PERIOD_SECS),
        now,
        now.saturating_add(PERIOD_SECS),
    ]
    .iter()
    .filter_map(|t| code_at(secret, *t))
    .any(|expected| expected == code)
}

pub fn unix_now() -> u64 {
    u64::try_from(Utc::now().timestamp()).unwrap_or(0)
}

pub fn generate_secret() -> Result<Vec<u8>, AppError> {
    let mut bytes = vec![0u8; SECRET_LEN];
    getrandom::getrandom(&mut bytes).map_err(|e| {
        log::error!("OS random source failed: {}", e);
        AppError::Internal
    })?;
    Ok(bytes)
}

pub fn encode_secret(secret: &[u8]) -> String {
    BASE32_NOPAD.encode(secret)
}

/// Accepts padded or unpadded base32.
pub fn decode_secret(encoded: &str) -> Option<Vec<u8>> {
    BASE32_NOPAD
        .decode(encoded.trim_end_matches('=').as_bytes())
        .ok()
}

/// Provisioning URI understood by authenticator apps.
pub fn otpauth_url(issuer: &str, account: &str, secret_b32: &str) -> String {
    let label: String =
        form_urlencoded::byte_serialize(format!("{}:{}", issuer, account).as_bytes()).collect();
    let query = form_urlencoded::Serializer::new(String::new())
        .append_pair("secret", secret_b32)
        .append_pair("issuer", issuer)
        .append_pair("algorithm", "SHA1")
        .append_pair("digits", &DIGITS.to_string())
        .append_pair("period", &PERIOD_SECS.to_string())
        .finish();
    format!("otpauth://totp/{}?{}", label, query)
}
