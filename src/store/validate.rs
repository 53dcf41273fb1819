//! Naming rules for buckets and object keys. Pure functions of the input.

const BUCKET_NAME_MIN_LEN: usize = 3;
const BUCKET_NAME_MAX_LEN: usize = 63;
const MAX_OBJECT_KEY_LEN: usize = 1024;

/// S3-style bucket naming: 3-63 chars, lowercase letters, digits, dots and
/// hyphens, starting and ending with a lowercase letter or digit.
/// Returns the first rule the name breaks, or None for a valid name.
pub fn bucket_name_violation(name: &str) -> Option<&'static str> {
    let bytes = name.as_bytes();
    if bytes.len() < BUCKET_NAME_MIN_LEN || bytes.len() > BUCKET_NAME_MAX_LEN {
        return Some("must be between 3 and 63 characters");
    }
    if !is_lower_alnum(bytes[0]) || !is_lower_alnum(bytes[bytes.len() - 1]) {
        return Some("must start and end with a lowercase letter or digit");
    }
    if !bytes
        .iter()
        .all(|&b| is_lower_alnum(b) || b == b'-' || b == b'.')
    {
        return Some("allowed characters are lowercase letters, digits, dots, and hyphens");
    }
    None
}

/// Object keys: 1-1024 chars drawn from `[A-Za-z0-9._/+-]`.
pub fn is_valid_object_key(key: &str) -> bool {
    if key.is_empty() || key.len() > MAX_OBJECT_KEY_LEN {
        return false;
    }
    key.bytes().all(|b| {
        b.is_ascii_alphanumeric()
            || matches!(b, b'.' | b'-' | b'_' | b'/' | b'+')
    })
}

fn is_lower_alnum(b: u8) -> bool {
    b.is_ascii_lowercase() || b.is_ascii_digit()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_valid_bucket_name(name: &str) -> bool {
        bucket_name_violation(name).is_none()
    }

    #[test]
    fn bucket_name_length_bounds() {
        assert!(!is_valid_bucket_name("ab"));
        assert!(is_valid_bucket_name("abc"));
        assert!(is_valid_bucket_name(&"a".repeat(63)));
        assert!(!is_valid_bucket_name(&"a".repeat(64)));
    }

    #[test]
    fn bucket_name_charset_and_edges() {
        assert!(is_valid_bucket_name("my-bucket"));
        assert!(is_valid_bucket_name("my.bucket.2024"));
        assert!(!is_valid_bucket_name("My-Bucket"));
        assert!(!is_valid_bucket_name("-bucket"));
        assert!(!is_valid_bucket_name("bucket-"));
        assert!(!is_valid_bucket_name(".bucket"));
        assert!(!is_valid_bucket_name("bu_cket"));
        assert!(!is_valid_bucket_name("bu cket"));
    }

    #[test]
    fn object_key_length_bounds() {
        assert!(!is_valid_object_key(""));
        assert!(is_valid_object_key("a"));
        assert!(is_valid_object_key(&"k".repeat(1024)));
        assert!(!is_valid_object_key(&"k".repeat(1025)));
    }

    #[test]
    fn object_key_charset() {
        assert!(is_valid_object_key("photos/2024/cat.jpg"));
        assert!(is_valid_object_key("a_b-c.d+e"));
        assert!(is_valid_object_key("MiXeD.CaSe"));
        assert!(!is_valid_object_key("space key"));
        assert!(!is_valid_object_key("a\\b"));
        assert!(!is_valid_object_key("key?"));
    }

    #[test]
    fn validation_is_pure() {
        for _ in 0..3 {
            assert!(is_valid_bucket_name("my-bucket"));
            assert!(!is_valid_bucket_name("My-Bucket"));
            assert!(is_valid_object_key("file.txt"));
        }
    }
}
