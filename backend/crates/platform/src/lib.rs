//! Platform Crate - Technical Infrastructure
//!
//! This crate provides shared technical foundations:
//! - Cryptographic utilities (random tokens, numeric codes, Base64)
//! - Password hashing (Argon2id) and a configurable password policy
//! - Clock abstraction for time-dependent domain logic
//! - Request header helpers (bearer token, device MAC, client version)

pub mod client;
pub mod clock;
pub mod crypto;
pub mod password;
