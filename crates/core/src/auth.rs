use sha2::{Digest, Sha256};

pub const SECRET_KEY_PREFIXES: [&str; 4] = ["sk_test_", "sk_live_", "rk_test_", "rk_live_"];

/// Stable identifier for a Stripe credential: lowercase hex SHA-256 of the key.
pub fn fingerprint(stripe_secret_key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(stripe_secret_key.as_bytes());
    format!("{:x}", hasher.finalize())
}

pub fn is_valid_secret_key(raw: &str) -> bool {
    SECRET_KEY_PREFIXES.iter().any(|prefix| {
        raw.strip_prefix(prefix).is_some_and(|tail| {
            !tail.is_empty() && tail.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        })
    })
}
