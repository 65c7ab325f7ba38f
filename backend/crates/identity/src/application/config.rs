//! Application Configuration
//!
//! Configuration for the Identity application layer, loaded from the
//! environment by [`IdentityConfig::from_env`].

use chrono::Duration;
use platform::password::PasswordPolicy;
use thiserror::Error;

/// Minimum JWT signing key length in bytes
pub const MIN_JWT_KEY_LENGTH: usize = 32;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} has an invalid value: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Access token (JWT) settings
#[derive(Clone)]
pub struct JwtConfig {
    /// HMAC signing key
    pub key: Vec<u8>,
    pub issuer: String,
    pub expiration_period: Duration,
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("key", &"[REDACTED]")
            .field("issuer", &self.issuer)
            .field("expiration_period", &self.expiration_period)
            .finish()
    }
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            key: Vec::new(),
            issuer: "identity".to_string(),
            expiration_period: Duration::days(1),
        }
    }
}

/// Identity application configuration
#[derive(Debug, Clone)]
pub struct IdentityConfig {
    /// Only one live session token per user
    pub restrict_single_login: bool,
    /// With `restrict_single_login`, a new login replaces the live session
    /// instead of being rejected
    pub logout_on_new_login: bool,
    /// Tokens only work from the device they logged in with
    pub restrict_single_device: bool,
    /// Send numeric codes instead of long tokens for email flows
    pub numeric_verification_token: bool,
    pub numeric_token_length: usize,
    /// A live session older than this no longer blocks a new login
    pub session_expiration_period: Duration,
    pub require_confirmed_email: bool,
    pub require_confirmed_phone_number: bool,
    pub lockout_on_failure: bool,
    /// Lifetime of a verification code
    pub token_expiration_period: Duration,
    /// Minimum time between two codes of the same type for a user
    pub token_reset_period: Duration,
    pub max_token_tries: u8,
    /// `country_code * 100 + national_length`; empty accepts every number
    pub accepted_codes: Vec<u32>,
    pub password_policy: PasswordPolicy,
    pub jwt: JwtConfig,
    /// Password pepper (optional, application-wide secret)
    pub password_pepper: Option<Vec<u8>>,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            restrict_single_login: false,
            logout_on_new_login: false,
            restrict_single_device: false,
            numeric_verification_token: false,
            numeric_token_length: 6,
            session_expiration_period: Duration::hours(24),
            require_confirmed_email: true,
            require_confirmed_phone_number: false,
            lockout_on_failure: true,
            token_expiration_period: Duration::minutes(60),
            token_reset_period: Duration::minutes(5),
            max_token_tries: 5,
            accepted_codes: Vec::new(),
            password_policy: PasswordPolicy::default(),
            jwt: JwtConfig::default(),
            password_pepper: None,
        }
    }
}

impl IdentityConfig {
    /// Create config with a random JWT key (for development)
    pub fn with_random_secret() -> Self {
        Self {
            jwt: JwtConfig {
                key: platform::crypto::random_bytes(64),
                ..JwtConfig::default()
            },
            ..Default::default()
        }
    }

    /// Create config for development (no email confirmation required)
    pub fn development() -> Self {
        Self {
            require_confirmed_email: false,
            ..Self::with_random_secret()
        }
    }

    /// Load from process environment variables
    ///
    /// `JWT_KEY` is required in release builds; debug builds fall back to a
    /// random key.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok(), cfg!(debug_assertions))
    }

    /// Load from an arbitrary variable source
    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
        allow_random_key: bool,
    ) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let var = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let flag = |name: &'static str, default: bool| -> Result<bool, ConfigError> {
            match var(name) {
                None => Ok(default),
                Some(v) => match v.to_ascii_lowercase().as_str() {
                    "1" | "true" | "yes" | "on" => Ok(true),
                    "0" | "false" | "no" | "off" => Ok(false),
                    _ => Err(ConfigError::Invalid {
                        name,
                        reason: format!("expected a boolean, got {:?}", v),
                    }),
                },
            }
        };

        let number = |name: &'static str, default: i64| -> Result<i64, ConfigError> {
            match var(name) {
                None => Ok(default),
                Some(v) => v
                    .parse::<i64>()
                    .ok()
                    .filter(|n| *n > 0)
                    .ok_or_else(|| ConfigError::Invalid {
                        name,
                        reason: format!("expected a positive integer, got {:?}", v),
                    }),
            }
        };

        let key = match var("JWT_KEY") {
            Some(key) if key.len() >= MIN_JWT_KEY_LENGTH => key.into_bytes(),
            Some(_) => {
                return Err(ConfigError::Invalid {
                    name: "JWT_KEY",
                    reason: format!("must be at least {} bytes", MIN_JWT_KEY_LENGTH),
                });
            }
            None if allow_random_key => {
                tracing::warn!("JWT_KEY not set, using a random key");
                platform::crypto::random_bytes(64)
            }
            None => return Err(ConfigError::Missing("JWT_KEY")),
        };

        let password_pepper = var("PASSWORD_PEPPER")
            .map(|v| {
                platform::crypto::from_base64(&v).map_err(|e| ConfigError::Invalid {
                    name: "PASSWORD_PEPPER",
                    reason: e.to_string(),
                })
            })
            .transpose()?;

        let accepted_codes = match var("IDENTITY_ACCEPTED_PHONE_CODES") {
            None => Vec::new(),
            Some(list) => list
                .split(',')
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(|c| {
                    c.parse::<u32>().map_err(|_| ConfigError::Invalid {
                        name: "IDENTITY_ACCEPTED_PHONE_CODES",
                        reason: format!("{:?} is not a number", c),
                    })
                })
                .collect::<Result<Vec<_>, _>>()?,
        };

        let policy_defaults = &defaults.password_policy;
        let password_policy = PasswordPolicy {
            required_length: number(
                "IDENTITY_PASSWORD_REQUIRED_LENGTH",
                policy_defaults.required_length as i64,
            )? as usize,
            required_unique_chars: number(
                "IDENTITY_PASSWORD_REQUIRED_UNIQUE_CHARS",
                policy_defaults.required_unique_chars as i64,
            )? as usize,
            require_digit: flag("IDENTITY_PASSWORD_REQUIRE_DIGIT", policy_defaults.require_digit)?,
            require_lowercase: flag(
                "IDENTITY_PASSWORD_REQUIRE_LOWERCASE",
                policy_defaults.require_lowercase,
            )?,
            require_uppercase: flag(
                "IDENTITY_PASSWORD_REQUIRE_UPPERCASE",
                policy_defaults.require_uppercase,
            )?,
            require_non_alphanumeric: flag(
                "IDENTITY_PASSWORD_REQUIRE_NON_ALPHANUMERIC",
                policy_defaults.require_non_alphanumeric,
            )?,
            ..policy_defaults.clone()
        };

        let numeric_token_length = number(
            "IDENTITY_NUMERIC_TOKEN_LENGTH",
            defaults.numeric_token_length as i64,
        )?;
        if numeric_token_length > 12 {
            return Err(ConfigError::Invalid {
                name: "IDENTITY_NUMERIC_TOKEN_LENGTH",
                reason: "must be at most 12".to_string(),
            });
        }

        let config = Self {
            restrict_single_login: flag(
                "IDENTITY_RESTRICT_SINGLE_LOGIN",
                defaults.restrict_single_login,
            )?,
            logout_on_new_login: flag(
                "IDENTITY_LOGOUT_ON_NEW_LOGIN",
                defaults.logout_on_new_login,
            )?,
            restrict_single_device: flag(
                "IDENTITY_RESTRICT_SINGLE_DEVICE",
                defaults.restrict_single_device,
            )?,
            numeric_verification_token: flag(
                "IDENTITY_NUMERIC_VERIFICATION_TOKEN",
                defaults.numeric_verification_token,
            )?,
            numeric_token_length: numeric_token_length as usize,
            session_expiration_period: Duration::hours(number(
                "IDENTITY_SESSION_EXPIRATION_HOURS",
                defaults.session_expiration_period.num_hours(),
            )?),
            require_confirmed_email: flag(
                "IDENTITY_REQUIRE_CONFIRMED_EMAIL",
                defaults.require_confirmed_email,
            )?,
            require_confirmed_phone_number: flag(
                "IDENTITY_REQUIRE_CONFIRMED_PHONE_NUMBER",
                defaults.require_confirmed_phone_number,
            )?,
            lockout_on_failure: flag("IDENTITY_LOCKOUT_ON_FAILURE", defaults.lockout_on_failure)?,
            token_expiration_period: Duration::minutes(number(
                "IDENTITY_TOKEN_EXPIRATION_MINUTES",
                defaults.token_expiration_period.num_minutes(),
            )?),
            token_reset_period: Duration::minutes(number(
                "IDENTITY_TOKEN_RESET_MINUTES",
                defaults.token_reset_period.num_minutes(),
            )?),
            max_token_tries: defaults.max_token_tries,
            accepted_codes,
            password_policy,
            jwt: JwtConfig {
                key,
                issuer: var("JWT_ISSUER").unwrap_or(defaults.jwt.issuer),
                expiration_period: Duration::days(number(
                    "JWT_EXPIRATION_DAYS",
                    defaults.jwt.expiration_period.num_days(),
                )?),
            },
            password_pepper,
        };

        if config.token_reset_period > config.token_expiration_period {
            return Err(ConfigError::Invalid {
                name: "IDENTITY_TOKEN_RESET_MINUTES",
                reason: "must not exceed IDENTITY_TOKEN_EXPIRATION_MINUTES".to_string(),
            });
        }

        Ok(config)
    }

    /// Get password pepper as slice
    pub fn pepper(&self) -> Option<&[u8]> {
        self.password_pepper.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    const KEY: &str = "0123456789abcdef0123456789abcdef";

    #[test]
    fn test_defaults() {
        let config = IdentityConfig::from_lookup(lookup(&[("JWT_KEY", KEY)]), false).unwrap();
        assert!(!config.restrict_single_login);
        assert_eq!(config.numeric_token_length, 6);
        assert_eq!(config.session_expiration_period, Duration::hours(24));
        assert_eq!(config.token_expiration_period, Duration::minutes(60));
        assert_eq!(config.token_reset_period, Duration::minutes(5));
        assert_eq!(config.max_token_tries, 5);
        assert_eq!(config.jwt.issuer, "identity");
        assert_eq!(config.jwt.expiration_period, Duration::days(1));
        assert!(config.require_confirmed_email);
        assert!(config.accepted_codes.is_empty());
        assert!(config.pepper().is_none());
    }

    #[test]
    fn test_overrides() {
        let config = IdentityConfig::from_lookup(
            lookup(&[
                ("JWT_KEY", KEY),
                ("IDENTITY_RESTRICT_SINGLE_LOGIN", "true"),
                ("IDENTITY_RESTRICT_SINGLE_DEVICE", "1"),
                ("IDENTITY_SESSION_EXPIRATION_HOURS", "2"),
                ("IDENTITY_ACCEPTED_PHONE_CODES", "2010, 96609"),
                ("IDENTITY_PASSWORD_REQUIRE_UPPERCASE", "yes"),
                ("PASSWORD_PEPPER", "cGVwcGVy"),
            ]),
            false,
        )
        .unwrap();
        assert!(config.restrict_single_login);
        assert!(config.restrict_single_device);
        assert_eq!(config.session_expiration_period, Duration::hours(2));
        assert_eq!(config.accepted_codes, vec![2010, 96609]);
        assert!(config.password_policy.require_uppercase);
        assert_eq!(config.pepper(), Some(b"pepper".as_slice()));
    }

    #[test]
    fn test_jwt_key_required_without_fallback() {
        let err = IdentityConfig::from_lookup(lookup(&[]), false).unwrap_err();
        assert_eq!(err, ConfigError::Missing("JWT_KEY"));

        let config = IdentityConfig::from_lookup(lookup(&[]), true).unwrap();
        assert_eq!(config.jwt.key.len(), 64);
    }

    #[test]
    fn test_short_jwt_key_rejected() {
        let err = IdentityConfig::from_lookup(lookup(&[("JWT_KEY", "short")]), true).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "JWT_KEY", .. }));
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(
            IdentityConfig::from_lookup(
                lookup(&[("JWT_KEY", KEY), ("IDENTITY_LOGOUT_ON_NEW_LOGIN", "maybe")]),
                false
            )
            .is_err()
        );
        assert!(
            IdentityConfig::from_lookup(
                lookup(&[("JWT_KEY", KEY), ("IDENTITY_TOKEN_RESET_MINUTES", "90")]),
                false
            )
            .is_err()
        );
    }

    #[test]
    fn test_debug_redacts_jwt_key() {
        let config = IdentityConfig::with_random_secret();
        assert!(format!("{:?}", config).contains("[REDACTED]"));
    }
}
