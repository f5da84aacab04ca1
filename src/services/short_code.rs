use uuid::Uuid;

/// Service for generating candidate short codes.
pub struct CodeGenerator;

impl CodeGenerator {
    /// Generate a candidate short code.
    ///
    /// Takes the first `length` characters of a random 128-bit UUID in its
    /// hyphen-free lowercase hex form. The default length of 8 carries 32
    /// bits of entropy, so collisions are possible at scale; detecting and
    /// retrying them is the store's job, not the generator's.
    ///
    /// Pure and infallible. Each call draws independent randomness, so it is
    /// safe to call concurrently with no shared state.
    pub fn generate(length: usize) -> String {
        let hex = Uuid::new_v4().simple().to_string();
        let length = length.min(hex.len());
        hex[..length].to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_length_and_charset() {
        let code = CodeGenerator::generate(8);
        assert_eq!(code.len(), 8);
        assert!(code.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_generate_widened_length() {
        let code = CodeGenerator::generate(12);
        assert_eq!(code.len(), 12);
    }

    #[test]
    fn test_generate_caps_at_uuid_hex_length() {
        // A UUID yields 32 hex characters; requests beyond that are clamped.
        let code = CodeGenerator::generate(64);
        assert_eq!(code.len(), 32);
    }

    #[test]
    fn test_generate_is_statistically_unique() {
        let a = CodeGenerator::generate(32);
        let b = CodeGenerator::generate(32);
        assert_ne!(a, b);
    }
}
