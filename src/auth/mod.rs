//! Account credentials: Argon2id password hashes and HS256 bearer tokens.

pub mod password;
pub mod token;

pub use password::{hash_password, verify_password};
pub use token::{Claims, TokenError, issue_token, verify_token};
