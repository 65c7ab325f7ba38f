//! Infrastructure Layer
//!
//! Database implementations, in-memory stores, and delivery adapters.

pub mod memory;
pub mod postgres;
pub mod sender;
pub mod token_store;

pub use memory::InMemoryIdentityRepository;
pub use postgres::PgIdentityRepository;
pub use sender::{RecordingSender, TracingSender};
pub use token_store::MemoryTokenStore;
