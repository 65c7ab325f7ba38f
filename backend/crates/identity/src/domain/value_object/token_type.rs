//! Verification Token Type
//!
//! 検証コードの用途。ユーザーごと・用途ごとに有効なコードは最大 1 つ。

use derive_more::Display;
use serde::{Deserialize, Serialize};

use super::UserId;

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TokenType {
    #[display("confirmemail")]
    ConfirmEmail,
    #[display("changeemail")]
    ChangeEmail,
    #[display("resetpassword")]
    ResetPassword,
    #[display("confirmphonenumber")]
    ConfirmPhoneNumber,
    #[display("changephonenumber")]
    ChangePhoneNumber,
}

impl TokenType {
    pub const ALL: [TokenType; 5] = [
        TokenType::ConfirmEmail,
        TokenType::ChangeEmail,
        TokenType::ResetPassword,
        TokenType::ConfirmPhoneNumber,
        TokenType::ChangePhoneNumber,
    ];

    /// 電話番号向けのコードは常に数字
    #[inline]
    pub const fn is_phone(&self) -> bool {
        matches!(self, TokenType::ConfirmPhoneNumber | TokenType::ChangePhoneNumber)
    }

    /// ストアのキー: `"{type}-{userId}"`
    pub fn cache_key(&self, user_id: &UserId) -> String {
        format!("{}-{}", self, user_id)
    }
}
