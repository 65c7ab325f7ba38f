//! Value Object Module

pub mod email;
pub mod mac_address;
pub mod phone_number;
pub mod token_type;
pub mod user_name;
pub mod user_role;

pub use kernel::id::UserId;
