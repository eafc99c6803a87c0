//! Time-based one-time passwords (RFC 6238) as shown by authenticator apps.

use anyhow::anyhow;
use data_encoding::{Encoding, BASE32_NOPAD};
use hmac::{Hmac, Mac};
use sha1::Sha1;

pub const STEP_SECS: u64 = 30;
const DIGITS: u32 = 6;
const MIN_SECRET_LEN: usize = 16;

type HmacSha1 = Hmac<Sha1>;

/// Drops whitespace and uppercases, `bk5v tvq7` -> `BK5VTVQ7`.
pub fn normalize(secret: &str) -> String {
    secret.chars().filter(|c| !c.is_whitespace()).collect::<String>().to_uppercase()
}

pub fn is_valid_secret(secret: &str) -> bool {
    let secret = normalize(secret);
    secret.len() >= MIN_SECRET_LEN && secret.chars().all(|c| c.is_ascii_uppercase() || ('2'..='7').contains(&c))
}

fn base32() -> anyhow::Result<Encoding> {
    let mut spec = BASE32_NOPAD.specification();
    spec.check_trailing_bits = false;
    spec.encoding().map_err(|e| anyhow!("{}", e))
}

/// Code for the 30 second window containing `unix_time`.
pub fn generate(secret: &str, unix_time: u64) -> anyhow::Result<String> {
    let normalized = normalize(secret);
    let key = base32()?
        .decode(normalized.trim_end_matches('=').as_bytes())
        .map_err(|e| anyhow!("secret is not base32: {}", e))?;
    let counter = unix_time / STEP_SECS;
    let mut mac = HmacSha1::new_from_slice(&key).map_err(|e| anyhow!("{}", e))?;
    mac.update(&counter.to_be_bytes());
    let digest = mac.finalize().into_bytes();
    let offset = usize::from(digest[digest.len() - 1] & 0x0f);
    let binary = u32::from_be_bytes([digest[offset] & 0x7f, digest[offset + 1], digest[offset + 2], digest[offset + 3]]);
    Ok(format!("{:0width$}", binary % 10u32.pow(DIGITS), width = DIGITS as usize))
}

/// Seconds until the code generated at `unix_time` expires.
pub fn remaining_secs(unix_time: u64) -> u64 {
    STEP_SECS - unix_time % STEP_SECS
}

#[cfg(test)]
mod tests {
    use super::*;

    // base32 of the ascii key "12345678901234567890" from the rfc
    const RFC_SECRET: &str = "GEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQ";

    #[test]
    fn rfc_6238_sha1_vectors() {
        assert_eq!(generate(RFC_SECRET, 59).unwrap(), "287082");
        assert_eq!(generate(RFC_SECRET, 1111111109).unwrap(), "081804");
        assert_eq!(generate(RFC_SECRET, 1111111111).unwrap(), "050471");
        assert_eq!(generate(RFC_SECRET, 1234567890).unwrap(), "005924");
        assert_eq!(generate(RFC_SECRET, 2000000000).unwrap(), "279037");
    }

    #[test]
    fn spaced_lowercase_secret_is_accepted() {
        let spaced = "gezd gnbv gy3t qojq gezd gnbv gy3t qojq";
        assert!(is_valid_secret(spaced));
        assert_eq!(generate(spaced, 59).unwrap(), "287082");
    }

    #[test]
    fn validation() {
        assert!(is_valid_secret("BK5V TVQ7 D2RB XYZA"));
        assert!(!is_valid_secret("BK5VTVQ7"));
        assert!(!is_valid_secret("BK5VTVQ7D2RBXYZ1"));
        assert!(!is_valid_secret("BK5VTVQ7D2RBXYZ!"));
    }

    #[test]
    fn remaining_window() {
        assert_eq!(remaining_secs(0), 30);
        assert_eq!(remaining_secs(59), 1);
        assert_eq!(remaining_secs(61), 29);
    }
}
