//! User Name Value Object
//!
//! ユーザー名はログインと表示に使う公開ハンドル。
//!
//! ## 不変条件
//! - 長さ: 3〜30文字
//! - 使用可能文字: `a-z` `A-Z` `0-9` `.` `_`
//! - 先頭・末尾: 英数字
//! - `.` と `_` は連続不可（`..` `._` `__` など）
//!
//! 入力の大文字小文字は保持し、一意性判定には小文字の canonical を使う。

use std::fmt;

use kernel::error::app_error::{AppError, AppResult};
use serde::Serialize;

/// Minimum length for user name (in characters)
pub const USER_NAME_MIN_LENGTH: usize = 3;

/// Maximum length for user name (in characters)
pub const USER_NAME_MAX_LENGTH: usize = 30;

const FIELD: &str = "userName";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct UserName(String);

impl UserName {
    /// Create a new user name with validation
    pub fn new(raw: impl Into<String>) -> AppResult<Self> {
        let raw = raw.into();
        let value = raw.trim();

        let len = value.chars().count();
        if !(USER_NAME_MIN_LENGTH..=USER_NAME_MAX_LENGTH).contains(&len) {
            return Err(AppError::validation(
                FIELD,
                format!(
                    "User name must be between {} and {} characters",
                    USER_NAME_MIN_LENGTH, USER_NAME_MAX_LENGTH
                ),
            ));
        }

        if !value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || Self::is_separator(c))
        {
            return Err(AppError::validation(
                FIELD,
                "User name may only contain letters, digits, '.' and '_'",
            ));
        }

        let starts_ok = value.chars().next().is_some_and(|c| c.is_ascii_alphanumeric());
        let ends_ok = value.chars().last().is_some_and(|c| c.is_ascii_alphanumeric());
        if !starts_ok || !ends_ok {
            return Err(AppError::validation(
                FIELD,
                "User name must start and end with a letter or digit",
            ));
        }

        let bytes = value.as_bytes();
        if bytes
            .windows(2)
            .any(|w| Self::is_separator(w[0] as char) && Self::is_separator(w[1] as char))
        {
            return Err(AppError::validation(
                FIELD,
                "User name cannot contain consecutive '.' or '_'",
            ));
        }

        Ok(Self(value.to_string()))
    }

    #[inline]
    fn is_separator(c: char) -> bool {
        c == '.' || c == '_'
    }

    /// Create from database value (assumed already validated)
    pub fn from_db(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// As entered by the user
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Lowercase form used for uniqueness and lookup
    pub fn canonical(&self) -> String {
        self.0.to_ascii_lowercase()
    }
}

impl fmt::Display for UserName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
