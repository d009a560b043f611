//! DNS name validation.

/// Checks a domain name: non-empty, at most 255 octets, every label
/// non-empty, at most 63 octets, alphanumeric with interior hyphens.
/// Comparison elsewhere is case-insensitive; the stored form keeps the
/// caller's spelling.
pub fn validate_domain_name(name: &str) -> bool {
    let name = name.strip_suffix('.').unwrap_or(name);
    if name.is_empty() || name.len() > 255 {
        return false;
    }
    name.split('.').all(valid_label)
}

fn valid_label(label: &str) -> bool {
    if label.is_empty() || label.len() > 63 {
        return false;
    }
    let bytes = label.as_bytes();
    let edge = |b: u8| b.is_ascii_alphanumeric();
    if !edge(bytes[0]) || !edge(bytes[bytes.len() - 1]) {
        return false;
    }
    bytes
        .iter()
        .all(|&b| b.is_ascii_alphanumeric() || b == b'-')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_simple_names() {
        assert!(validate_domain_name("c1"));
        assert!(validate_domain_name("example.internal"));
        assert!(validate_domain_name("a-b.c-d.e"));
        assert!(validate_domain_name("Example.Internal"));
    }

    #[test]
    fn test_trailing_dot_allowed() {
        assert!(validate_domain_name("c1.example.internal."));
    }

    #[test]
    fn test_rejects_bad_labels() {
        assert!(!validate_domain_name(""));
        assert!(!validate_domain_name("."));
        assert!(!validate_domain_name("a..b"));
        assert!(!validate_domain_name("-leading.hyphen"));
        assert!(!validate_domain_name("trailing-.hyphen"));
        assert!(!validate_domain_name("under_score.example"));
    }

    #[test]
    fn test_rejects_oversized_names() {
        let long_label = "a".repeat(64);
        assert!(!validate_domain_name(&long_label));
        assert!(validate_domain_name(&"a".repeat(63)));

        let max_name = vec!["a".repeat(63); 4].join(".");
        assert_eq!(max_name.len(), 255);
        assert!(validate_domain_name(&max_name));

        let long_name = vec!["a".repeat(63); 5].join(".");
        assert!(!validate_domain_name(&long_name));
    }
}
