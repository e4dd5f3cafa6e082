//! Content identity and storage naming for uploads.
//!
//! Every upload is stored, repeated hashes included; the hash exists for
//! identity and audit, not for dedup-skip. Stored names carry a timestamp
//! and a hash prefix so two uploads of the same file never collide.

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

/// Hex SHA-256 of the uploaded bytes.
pub fn content_sha256(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Keep file names shell- and URL-safe before they become storage keys.
pub fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.trim_matches('_').is_empty() {
        "document".to_string()
    } else {
        cleaned
    }
}

/// Collision-resistant stored name: timestamp, first 8 hash hex chars,
/// then the sanitized original name.
pub fn stored_file_name(original: &str, content_hash: &str, at: DateTime<Utc>) -> String {
    let prefix = &content_hash[..content_hash.len().min(8)];
    format!(
        "{}_{prefix}_{}",
        at.format("%Y%m%d%H%M%S"),
        sanitize_file_name(original)
    )
}

/// Blob key for a stored upload, partitioned by month.
pub fn storage_key(stored_name: &str, at: DateTime<Utc>) -> String {
    format!("uploads/{}/{stored_name}", at.format("%Y/%m"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn hashing_is_stable() {
        assert_eq!(content_sha256(b"abc"), content_sha256(b"abc"));
        assert_ne!(content_sha256(b"abc"), content_sha256(b"abd"));
        assert_eq!(content_sha256(b"").len(), 64);
    }

    #[test]
    fn awkward_names_are_sanitized() {
        assert_eq!(sanitize_file_name("claim form (final).pdf"), "claim_form__final_.pdf");
        assert_eq!(sanitize_file_name("///"), "document");
    }

    #[test]
    fn stored_names_embed_timestamp_and_hash_prefix() {
        let at = Utc.with_ymd_and_hms(2025, 6, 3, 10, 0, 0).unwrap();
        let hash = content_sha256(b"%PDF-1.4");
        let name = stored_file_name("schedule.pdf", &hash, at);
        assert!(name.starts_with("20250603100000_"));
        assert!(name.ends_with("_schedule.pdf"));
        assert_eq!(storage_key(&name, at), format!("uploads/2025/06/{name}"));
    }

    #[test]
    fn same_file_twice_gets_distinct_names_over_time() {
        let hash = content_sha256(b"same bytes");
        let first = Utc.with_ymd_and_hms(2025, 6, 3, 10, 0, 0).unwrap();
        let second = Utc.with_ymd_and_hms(2025, 6, 3, 10, 0, 1).unwrap();
        assert_ne!(
            stored_file_name("a.pdf", &hash, first),
            stored_file_name("a.pdf", &hash, second)
        );
    }
}
