//! Fingerprint computation for voucher records.
//!
//! A deterministic hash of the identifying fields, scoped by router and
//! profile so identical codes under different profiles never collide.

use sha2::{Digest, Sha256};

/// Compute a voucher record fingerprint.
///
/// Inputs: router_id, profile_id, identity key (`value` for vouchers,
/// `username:password` for pairs).
pub fn compute_voucher(router_id: &str, profile_id: &str, identity_key: &str) -> String {
    hash(&format!("VOUCHER:{router_id}:{profile_id}:{identity_key}"))
}

/// SHA-256 hash a string and return hex-encoded digest.
fn hash(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_inputs_same_fingerprint() {
        let fp1 = compute_voucher("r1", "p1", "AB1234");
        let fp2 = compute_voucher("r1", "p1", "AB1234");
        assert_eq!(fp1, fp2);
    }

    #[test]
    fn different_code_different_fingerprint() {
        let fp1 = compute_voucher("r1", "p1", "AB1234");
        let fp2 = compute_voucher("r1", "p1", "AB1235");
        assert_ne!(fp1, fp2);
    }

    #[test]
    fn different_profile_different_fingerprint() {
        let fp1 = compute_voucher("r1", "p1", "AB1234");
        let fp2 = compute_voucher("r1", "p2", "AB1234");
        assert_ne!(fp1, fp2);
    }

    #[test]
    fn pair_key_distinct_from_voucher_key() {
        let voucher = compute_voucher("r1", "p1", "jh23");
        let pair = compute_voucher("r1", "p1", "jh23:pass1");
        assert_ne!(voucher, pair);
    }

    #[test]
    fn fingerprint_is_hex_sha256() {
        let fp = compute_voucher("r1", "p1", "AB1234");
        assert_eq!(fp.len(), 64);
        assert!(fp.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
