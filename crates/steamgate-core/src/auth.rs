//! Steam Guard one-time codes.
//!
//! A code is a pure function of the account's shared secret and the server
//! time. The time must come from the Steam servers, which is what
//! [`current_code`] asks the worker for.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use hmac::{Hmac, Mac};
use serde::Serialize;
use sha1::Sha1;

use crate::error::{Error, Result};
use crate::execute::Executor;

type HmacSha1 = Hmac<Sha1>;

/// Symbols a code is drawn from.
pub const CODE_ALPHABET: &[u8; 26] = b"23456789BCDFGHJKMNPQRTVWXY";

/// Symbols per code.
pub const CODE_LENGTH: usize = 5;

/// Seconds each code stays valid.
pub const CODE_PERIOD: u64 = 30;

/// A generated code and the server time it was generated for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthCode {
    pub code: String,
    pub server_time: u64,
}

impl AuthCode {
    /// First second of the validity window.
    pub fn window_start(&self) -> u64 {
        self.server_time - self.server_time % CODE_PERIOD
    }

    /// First second at which the next code takes over.
    pub fn expires_at(&self) -> u64 {
        self.window_start() + CODE_PERIOD
    }

    /// Seconds left at `now`, zero once expired.
    pub fn seconds_remaining(&self, now: u64) -> u64 {
        self.expires_at().saturating_sub(now)
    }
}

/// Generate the code for a base64 shared secret at `server_time`.
pub fn generate_code(shared_secret: &str, server_time: u64) -> Result<AuthCode> {
    let key = STANDARD
        .decode(shared_secret.trim())
        .map_err(|e| Error::InvalidSecret(e.to_string()))?;
    generate_code_from_key(&key, server_time)
}

/// Generate the code for an already decoded secret.
pub fn generate_code_from_key(key: &[u8], server_time: u64) -> Result<AuthCode> {
    let counter = (server_time / CODE_PERIOD).to_be_bytes();

    let mut mac =
        HmacSha1::new_from_slice(key).map_err(|e| Error::InvalidSecret(e.to_string()))?;
    mac.update(&counter);
    let digest = mac.finalize().into_bytes();

    let offset = (digest[19] & 0x0F) as usize;
    let mut raw = u32::from_be_bytes([
        digest[offset],
        digest[offset + 1],
        digest[offset + 2],
        digest[offset + 3],
    ]) & 0x7FFF_FFFF;

    let radix = CODE_ALPHABET.len() as u32;
    let mut code = String::with_capacity(CODE_LENGTH);
    for _ in 0..CODE_LENGTH {
        code.push(CODE_ALPHABET[(raw % radix) as usize] as char);
        raw /= radix;
    }

    Ok(AuthCode { code, server_time })
}

/// Ask the worker for the server time and generate the current code.
pub fn current_code(executor: &mut Executor, shared_secret: &str) -> Result<AuthCode> {
    let server_time = executor.server_time()?;
    tracing::debug!("Generating code for server time {}", server_time);
    generate_code(shared_secret, server_time)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "AAAAAAAAAAAAAAAA";

    #[test]
    fn test_known_codes() {
        assert_eq!(generate_code(SECRET, 0).unwrap().code, "RYH4D");
        assert_eq!(generate_code(SECRET, 30).unwrap().code, "DR2DK");
        assert_eq!(generate_code(SECRET, 1_700_000_000).unwrap().code, "THTN4");
        assert_eq!(
            generate_code("MTIzNDU2Nzg5MDEyMzQ1Njc4OTA=", 1_700_000_000)
                .unwrap()
                .code,
            "R87JJ"
        );
    }

    #[test]
    fn test_code_is_stable_within_window() {
        let first = generate_code(SECRET, 30).unwrap();
        let last = generate_code(SECRET, 59).unwrap();
        assert_eq!(first.code, last.code);
        assert_eq!(generate_code(SECRET, 29).unwrap().code, "RYH4D");
    }

    #[test]
    fn test_code_shape() {
        for time in [0, 31, 12_345, 1_700_000_000] {
            let code = generate_code(SECRET, time).unwrap().code;
            assert_eq!(code.len(), CODE_LENGTH);
            assert!(code.bytes().all(|b| CODE_ALPHABET.contains(&b)));
        }
    }

    #[test]
    fn test_surrounding_whitespace_is_ignored() {
        let padded = generate_code("  AAAAAAAAAAAAAAAA\n", 0).unwrap();
        assert_eq!(padded.code, "RYH4D");
    }

    #[test]
    fn test_invalid_secret() {
        let err = generate_code("not base64!", 0).unwrap_err();
        assert!(matches!(err, Error::InvalidSecret(_)));
    }

    #[test]
    fn test_window_helpers() {
        let code = generate_code(SECRET, 1_700_000_007).unwrap();
        assert_eq!(code.server_time, 1_700_000_007);
        assert_eq!(code.window_start(), 1_699_999_980);
        assert_eq!(code.expires_at(), 1_700_000_010);
        assert_eq!(code.seconds_remaining(1_700_000_007), 3);
        assert_eq!(code.seconds_remaining(1_700_000_040), 0);
    }

    #[test]
    fn test_serializes_to_json() {
        let code = generate_code(SECRET, 0).unwrap();
        let json = serde_json::to_value(&code).unwrap();
        assert_eq!(json["code"], "RYH4D");
        assert_eq!(json["server_time"], 0);
    }
}
