//! Password Hashing and Verification
//!
//! - Configurable composition policy ([`PasswordPolicy`])
//! - Argon2id hashing (memory-hard, recommended by OWASP)
//! - Zeroization of sensitive data
//! - Optional pepper
//!
//! Input is NFKC-normalized before any check or hash so that visually
//! identical passwords hash identically.

use std::fmt;

use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString};
use rand::rngs::OsRng;
use thiserror::Error;
use unicode_normalization::UnicodeNormalization;
use zeroize::{Zeroize, ZeroizeOnDrop};

// ============================================================================
// Constants
// ============================================================================

/// Default minimum password length
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Maximum password length
pub const MAX_PASSWORD_LENGTH: usize = 128;

// ============================================================================
// Error Types
// ============================================================================

/// Password policy violation errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PasswordPolicyError {
    #[error("Password must be at least {min} characters")]
    TooShort { min: usize, actual: usize },

    #[error("Password must be at most {max} characters")]
    TooLong { max: usize, actual: usize },

    #[error("Password cannot be empty or contain only whitespace")]
    EmptyOrWhitespace,

    #[error("Password contains invalid control characters")]
    InvalidCharacter,

    #[error("Password must contain at least one digit ('0'-'9')")]
    RequiresDigit,

    #[error("Password must contain at least one lowercase letter ('a'-'z')")]
    RequiresLowercase,

    #[error("Password must contain at least one uppercase letter ('A'-'Z')")]
    RequiresUppercase,

    #[error("Password must contain at least one non-alphanumeric character")]
    RequiresNonAlphanumeric,

    #[error("Password must use at least {min} different characters")]
    RequiresUniqueChars { min: usize },
}

/// Password hashing/verification errors
#[derive(Debug, Error)]
pub enum PasswordHashError {
    #[error("Password hashing failed: {0}")]
    HashingFailed(String),

    #[error("Invalid password hash format")]
    InvalidHashFormat,
}

// ============================================================================
// Policy
// ============================================================================

/// Password composition rules
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordPolicy {
    pub required_length: usize,
    pub max_length: usize,
    pub required_unique_chars: usize,
    pub require_digit: bool,
    pub require_lowercase: bool,
    pub require_uppercase: bool,
    pub require_non_alphanumeric: bool,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            required_length: MIN_PASSWORD_LENGTH,
            max_length: MAX_PASSWORD_LENGTH,
            required_unique_chars: 1,
            require_digit: true,
            require_lowercase: true,
            require_uppercase: false,
            require_non_alphanumeric: false,
        }
    }
}

impl PasswordPolicy {
    /// Check a normalized password and collect every violation
    ///
    /// Lengths are counted in Unicode code points, not bytes.
    pub fn violations(&self, normalized: &str) -> Vec<PasswordPolicyError> {
        if normalized.trim().is_empty() {
            return vec![PasswordPolicyError::EmptyOrWhitespace];
        }

        let mut errors = Vec::new();
        let char_count = normalized.chars().count();

        if char_count < self.required_length {
            errors.push(PasswordPolicyError::TooShort {
                min: self.required_length,
                actual: char_count,
            });
        }
        if char_count > self.max_length {
            errors.push(PasswordPolicyError::TooLong {
                max: self.max_length,
                actual: char_count,
            });
        }

        // Control characters other than space, tab, newline
        if normalized
            .chars()
            .any(|ch| ch.is_control() && ch != '\t' && ch != '\n')
        {
            errors.push(PasswordPolicyError::InvalidCharacter);
        }

        if self.require_digit && !normalized.chars().any(|c| c.is_ascii_digit()) {
            errors.push(PasswordPolicyError::RequiresDigit);
        }
        if self.require_lowercase && !normalized.chars().any(|c| c.is_ascii_lowercase()) {
            errors.push(PasswordPolicyError::RequiresLowercase);
        }
        if self.require_uppercase && !normalized.chars().any(|c| c.is_ascii_uppercase()) {
            errors.push(PasswordPolicyError::RequiresUppercase);
        }
        if self.require_non_alphanumeric && normalized.chars().all(|c| c.is_ascii_alphanumeric()) {
            errors.push(PasswordPolicyError::RequiresNonAlphanumeric);
        }

        let mut unique: Vec<char> = normalized.chars().collect();
        unique.sort_unstable();
        unique.dedup();
        if unique.len() < self.required_unique_chars {
            errors.push(PasswordPolicyError::RequiresUniqueChars {
                min: self.required_unique_chars,
            });
        }

        errors
    }
}

// ============================================================================
// Clear Text Password (Zeroized on drop)
// ============================================================================

/// Clear text password with automatic memory zeroization
///
/// ## Security
/// - Implements `Zeroize` and `ZeroizeOnDrop`
/// - Does not implement `Clone` to prevent accidental copies
/// - Debug output is redacted
///
/// ## Examples
/// ```rust
/// use platform::password::{ClearTextPassword, PasswordPolicy};
///
/// let password = ClearTextPassword::new("correct horse 1".to_string(), &PasswordPolicy::default())
///     .unwrap();
/// let hashed = password.hash(None).unwrap();
/// assert!(hashed.verify(&password, None));
/// ```
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct ClearTextPassword(String);

impl ClearTextPassword {
    /// Create a new clear text password, enforcing `policy`
    pub fn new(mut raw: String, policy: &PasswordPolicy) -> Result<Self, Vec<PasswordPolicyError>> {
        let normalized: String = raw.nfkc().collect();
        raw.zeroize();

        let errors = policy.violations(&normalized);
        if errors.is_empty() {
            Ok(Self(normalized))
        } else {
            let mut normalized = normalized;
            normalized.zeroize();
            Err(errors)
        }
    }

    /// Normalize without policy checks
    ///
    /// For verifying an existing password, which may predate the current policy.
    pub fn for_verification(mut raw: String) -> Self {
        let normalized: String = raw.nfkc().collect();
        raw.zeroize();
        Self(normalized)
    }

    /// Get the password as bytes for hashing
    pub(crate) fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    fn peppered(&self, pepper: Option<&[u8]>) -> Vec<u8> {
        match pepper {
            Some(p) => {
                let mut combined = self.as_bytes().to_vec();
                combined.extend_from_slice(p);
                combined
            }
            None => self.as_bytes().to_vec(),
        }
    }

    /// Hash the password using Argon2id
    ///
    /// ## Arguments
    /// * `pepper` - Optional application-wide secret for additional security
    ///
    /// ## Returns
    /// PHC-formatted hash string wrapped in `HashedPassword`
    pub fn hash(&self, pepper: Option<&[u8]>) -> Result<HashedPassword, PasswordHashError> {
        let mut password_bytes = self.peppered(pepper);

        // Generate random salt (128 bits = 16 bytes)
        let salt = SaltString::generate(OsRng);

        // OWASP recommended Argon2id parameters:
        // m=19456 (19 MiB), t=2, p=1
        let argon2 = Argon2::default();

        let result = argon2
            .hash_password(&password_bytes, &salt)
            .map(|hash| HashedPassword {
                hash: hash.to_string(),
            })
            .map_err(|e| PasswordHashError::HashingFailed(e.to_string()));
        password_bytes.zeroize();
        result
    }
}

impl fmt::Debug for ClearTextPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ClearTextPassword")
            .field(&"[REDACTED]")
            .finish()
    }
}

// ============================================================================
// Hashed Password (Safe to store)
// ============================================================================

/// Hashed password in PHC string format
#[derive(Clone, PartialEq, Eq)]
pub struct HashedPassword {
    hash: String,
}

impl HashedPassword {
    /// Create from PHC string (e.g., from database)
    pub fn from_phc_string(s: impl Into<String>) -> Result<Self, PasswordHashError> {
        let hash = s.into();

        // Validate it's a valid PHC string
        PasswordHash::new(&hash).map_err(|_| PasswordHashError::InvalidHashFormat)?;

        Ok(Self { hash })
    }

    /// Get the PHC string for storage
    pub fn as_phc_string(&self) -> &str {
        &self.hash
    }

    /// Verify a password against this hash
    ///
    /// ## Arguments
    /// * `password` - The clear text password to verify
    /// * `pepper` - Optional pepper (must match the one used during hashing)
    pub fn verify(&self, password: &ClearTextPassword, pepper: Option<&[u8]>) -> bool {
        let mut password_bytes = password.peppered(pepper);

        let verified = match PasswordHash::new(&self.hash) {
            // Argon2 uses constant-time comparison internally
            Ok(parsed) => Argon2::default()
                .verify_password(&password_bytes, &parsed)
                .is_ok(),
            Err(_) => false,
        };
        password_bytes.zeroize();
        verified
    }
}

impl fmt::Debug for HashedPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HashedPassword")
            .field("hash", &"[HASH]")
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> PasswordPolicy {
        PasswordPolicy::default()
    }

    #[test]
    fn test_password_too_short() {
        let errors = ClearTextPassword::new("abc1".to_string(), &policy()).unwrap_err();
        assert!(matches!(errors[0], PasswordPolicyError::TooShort { min: 8, actual: 4 }));
    }

    #[test]
    fn test_password_too_long() {
        let long_password = format!("a1{}", "b".repeat(MAX_PASSWORD_LENGTH));
        let errors = ClearTextPassword::new(long_password, &policy()).unwrap_err();
        assert!(errors.contains(&PasswordPolicyError::TooLong {
            max: MAX_PASSWORD_LENGTH,
            actual: MAX_PASSWORD_LENGTH + 2
        }));
    }

    #[test]
    fn test_password_whitespace_only() {
        let errors = ClearTextPassword::new("        ".to_string(), &policy()).unwrap_err();
        assert_eq!(errors, vec![PasswordPolicyError::EmptyOrWhitespace]);
    }

    #[test]
    fn test_collects_all_composition_errors() {
        let strict = PasswordPolicy {
            require_uppercase: true,
            require_non_alphanumeric: true,
            ..PasswordPolicy::default()
        };
        let errors = ClearTextPassword::new("ABCDEFGH".to_string(), &strict).unwrap_err();
        assert!(errors.contains(&PasswordPolicyError::RequiresDigit));
        assert!(errors.contains(&PasswordPolicyError::RequiresLowercase));
        assert!(errors.contains(&PasswordPolicyError::RequiresNonAlphanumeric));
        assert!(!errors.contains(&PasswordPolicyError::RequiresUppercase));
    }

    #[test]
    fn test_unique_chars() {
        let policy = PasswordPolicy {
            required_unique_chars: 4,
            ..PasswordPolicy::default()
        };
        let errors = ClearTextPassword::new("a1a1a1a1".to_string(), &policy).unwrap_err();
        assert_eq!(errors, vec![PasswordPolicyError::RequiresUniqueChars { min: 4 }]);
    }

    #[test]
    fn test_valid_password() {
        assert!(ClearTextPassword::new("mysecurepass2024".to_string(), &policy()).is_ok());
    }

    #[test]
    fn test_nfkc_normalization() {
        // Fullwidth digits normalize to ASCII digits
        let password = ClearTextPassword::new("password１".to_string(), &policy()).unwrap();
        let hashed = password.hash(None).unwrap();
        let ascii = ClearTextPassword::for_verification("password1".to_string());
        assert!(hashed.verify(&ascii, None));
    }

    #[test]
    fn test_hash_and_verify() {
        let password = ClearTextPassword::for_verification("TestPassword123!".to_string());
        let hashed = password.hash(None).unwrap();

        assert!(hashed.verify(&password, None));

        let wrong_password = ClearTextPassword::for_verification("WrongPassword123!".to_string());
        assert!(!hashed.verify(&wrong_password, None));
    }

    #[test]
    fn test_hash_with_pepper() {
        let password = ClearTextPassword::for_verification("TestPassword123!".to_string());
        let pepper = b"my_secret_pepper";
        let hashed = password.hash(Some(pepper)).unwrap();

        assert!(hashed.verify(&password, Some(pepper)));
        assert!(!hashed.verify(&password, None));
        assert!(!hashed.verify(&password, Some(b"wrong_pepper")));
    }

    #[test]
    fn test_phc_string_roundtrip() {
        let password = ClearTextPassword::for_verification("TestPassword123!".to_string());
        let hashed = password.hash(None).unwrap();

        let restored = HashedPassword::from_phc_string(hashed.as_phc_string()).unwrap();
        assert!(restored.as_phc_string().starts_with("$argon2id$"));
        assert!(restored.verify(&password, None));
    }

    #[test]
    fn test_invalid_phc_string() {
        assert!(HashedPassword::from_phc_string("not_a_valid_hash").is_err());
    }

    #[test]
    fn test_debug_redaction() {
        let password = ClearTextPassword::for_verification("secret".to_string());
        let debug_output = format!("{:?}", password);
        assert!(debug_output.contains("REDACTED"));
        assert!(!debug_output.contains("secret"));
    }
}
