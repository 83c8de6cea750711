//! Auth Module
//!
//! Password hashing, token issuing and the flows built on them.

pub mod password;
pub mod service;
pub mod token;

pub use password::{hash_password, verify_password, PasswordVerification};
pub use service::AuthService;
pub use token::{Claims, TokenIssuer};
