//! Authentication for Perkhub
//!
//! Provides:
//! - JWT token generation and validation
//! - Session cookie transport
//! - Password hashing with Argon2

pub mod cookie;
pub mod jwt;
pub mod password;

pub use cookie::{clear_session_cookie, extract_session_token, session_cookie, SESSION_COOKIE};
pub use jwt::{extract_token_from_header, Caller, Claims, JwtValidator, TokenInput, TokenValidationResult};
pub use password::{hash_password, verify_password};
