//! Error Kind - Classification of errors
//!
//! Defines the [`ErrorKind`] enum that maps to HTTP status codes and
//! to the `type` URI of an RFC 7807 problem details body.

use serde::Serialize;

/// エラー種別
///
/// HTTP ステータスコードと Problem Details の `type` に対応する分類。
///
/// ## Examples
/// ```rust
/// use kernel::error::kind::ErrorKind;
///
/// let kind = ErrorKind::NotFound;
/// assert_eq!(kind.status_code(), 404);
/// assert_eq!(kind.as_str(), "Not Found");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[non_exhaustive]
pub enum ErrorKind {
    /// 400 - リクエストが不正
    BadRequest,
    /// 401 - 認証が必要
    Unauthorized,
    /// 403 - アクセス権限なし
    Forbidden,
    /// 404 - リソースが見つからない
    NotFound,
    /// 408 - タイムアウト
    RequestTimeout,
    /// 409 - 現在の状態と競合
    Conflict,
    /// 410 - 期限切れ
    Gone,
    /// 422 - 入力検証エラー
    UnprocessableEntity,
    /// 423 - アカウントロック中
    Locked,
    /// 429 - 再試行が早すぎる
    TooManyRequests,
    /// 500 - サーバー内部エラー
    InternalServerError,
    /// 503 - サービス利用不可
    ServiceUnavailable,
    /// 505 - クライアントのバージョンが非対応
    HttpVersionNotSupported,
}

impl ErrorKind {
    /// HTTP ステータスコード
    ///
    /// ## Examples
    /// ```rust
    /// use kernel::error::kind::ErrorKind;
    /// assert_eq!(ErrorKind::Locked.status_code(), 423);
    /// assert_eq!(ErrorKind::HttpVersionNotSupported.status_code(), 505);
    /// ```
    #[inline]
    pub const fn status_code(&self) -> u16 {
        match self {
            ErrorKind::BadRequest => 400,
            ErrorKind::Unauthorized => 401,
            ErrorKind::Forbidden => 403,
            ErrorKind::NotFound => 404,
            ErrorKind::RequestTimeout => 408,
            ErrorKind::Conflict => 409,
            ErrorKind::Gone => 410,
            ErrorKind::UnprocessableEntity => 422,
            ErrorKind::Locked => 423,
            ErrorKind::TooManyRequests => 429,
            ErrorKind::InternalServerError => 500,
            ErrorKind::ServiceUnavailable => 503,
            ErrorKind::HttpVersionNotSupported => 505,
        }
    }

    /// 標準の理由フレーズ（Problem Details の `title` に使用）
    #[inline]
    pub const fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::BadRequest => "Bad Request",
            ErrorKind::Unauthorized => "Unauthorized",
            ErrorKind::Forbidden => "Forbidden",
            ErrorKind::NotFound => "Not Found",
            ErrorKind::RequestTimeout => "Request Timeout",
            ErrorKind::Conflict => "Conflict",
            ErrorKind::Gone => "Gone",
            ErrorKind::UnprocessableEntity => "Unprocessable Entity",
            ErrorKind::Locked => "Locked",
            ErrorKind::TooManyRequests => "Too Many Requests",
            ErrorKind::InternalServerError => "Internal Server Error",
            ErrorKind::ServiceUnavailable => "Service Unavailable",
            ErrorKind::HttpVersionNotSupported => "HTTP Version Not Supported",
        }
    }

    /// Problem Details の `type` URI
    ///
    /// RFC 7231 に定義されたステータスは該当セクションを指す。
    pub const fn type_uri(&self) -> &'static str {
        match self {
            ErrorKind::BadRequest | ErrorKind::UnprocessableEntity => {
                "https://tools.ietf.org/html/rfc7231#section-6.5.1"
            }
            ErrorKind::Unauthorized => "https://tools.ietf.org/html/rfc7235#section-3.1",
            ErrorKind::Forbidden => "https://tools.ietf.org/html/rfc7231#section-6.5.3",
            ErrorKind::NotFound => "https://tools.ietf.org/html/rfc7231#section-6.5.4",
            ErrorKind::RequestTimeout => "https://tools.ietf.org/html/rfc7231#section-6.5.7",
            ErrorKind::Conflict => "https://tools.ietf.org/html/rfc7231#section-6.5.8",
            ErrorKind::Gone => "https://tools.ietf.org/html/rfc7231#section-6.5.9",
            ErrorKind::Locked => "https://tools.ietf.org/html/rfc4918#section-11.3",
            ErrorKind::TooManyRequests => "https://tools.ietf.org/html/rfc6585#section-4",
            ErrorKind::InternalServerError => "https://tools.ietf.org/html/rfc7231#section-6.6.1",
            ErrorKind::ServiceUnavailable => "https://tools.ietf.org/html/rfc7231#section-6.6.4",
            ErrorKind::HttpVersionNotSupported => {
                "https://tools.ietf.org/html/rfc7231#section-6.6.6"
            }
        }
    }

    /// 5xx 系かどうか（ログ対象）
    #[inline]
    pub const fn is_server_error(&self) -> bool {
        self.status_code() >= 500
    }

    /// 4xx 系かどうか
    #[inline]
    pub const fn is_client_error(&self) -> bool {
        let code = self.status_code();
        code >= 400 && code < 500
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
