pub mod auth;

pub use auth::{bearer_token, hash_password, verify_password, Claims, TokenKeys};
