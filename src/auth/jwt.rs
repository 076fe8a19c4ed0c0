//! JWT session tokens
//!
//! Tokens are HS256 signed and carry the user id and email. They travel in
//! the `token` cookie (see `cookie`), with `Authorization: Bearer` accepted
//! for API clients.

use bson::oid::ObjectId;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::types::PerkhubError;

/// Minimum accepted secret length for HS256
const MIN_SECRET_LEN: usize = 32;

/// Payload stored in JWT token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User document id (hex ObjectId)
    pub user_id: String,
    /// User email at issue time
    pub email: String,
    /// Issued at (Unix timestamp)
    pub iat: u64,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
}

/// Input for creating a new token
#[derive(Debug, Clone)]
pub struct TokenInput {
    pub user_id: String,
    pub email: String,
}

/// Result of token validation
#[derive(Debug)]
pub struct TokenValidationResult {
    pub valid: bool,
    pub claims: Option<Claims>,
    pub error: Option<String>,
}

impl TokenValidationResult {
    pub fn valid(claims: Claims) -> Self {
        Self {
            valid: true,
            claims: Some(claims),
            error: None,
        }
    }

    pub fn invalid(error: impl Into<String>) -> Self {
        Self {
            valid: false,
            claims: None,
            error: Some(error.into()),
        }
    }
}

/// Authenticated identity resolved from a session token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub user_id: ObjectId,
    pub email: String,
}

impl Caller {
    /// Build a caller from verified claims.
    ///
    /// Returns None if the embedded user id is not a valid ObjectId.
    pub fn from_claims(claims: &Claims) -> Option<Self> {
        let user_id = ObjectId::parse_str(&claims.user_id).ok()?;
        Some(Self {
            user_id,
            email: claims.email.clone(),
        })
    }
}

/// JWT validator and generator
#[derive(Clone)]
pub struct JwtValidator {
    secret: String,
    expiry_seconds: u64,
}

impl JwtValidator {
    /// Create a new JWT validator
    ///
    /// Returns an error if the secret is empty or too short
    pub fn new(secret: String, expiry_seconds: u64) -> Result<Self, PerkhubError> {
        if secret.is_empty() {
            return Err(PerkhubError::Config(
                "JWT_SECRET is required in production mode".into(),
            ));
        }

        if secret.len() < MIN_SECRET_LEN {
            return Err(PerkhubError::Config(format!(
                "JWT_SECRET must be at least {MIN_SECRET_LEN} characters"
            )));
        }

        Ok(Self {
            secret,
            expiry_seconds,
        })
    }

    /// Token lifetime in seconds
    pub fn expiry_seconds(&self) -> u64 {
        self.expiry_seconds
    }

    /// Generate a JWT token for an authenticated user
    pub fn generate_token(&self, input: TokenInput) -> Result<String, PerkhubError> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| PerkhubError::Auth(format!("System time error: {}", e)))?
            .as_secs();

        let claims = Claims {
            user_id: input.user_id,
            email: input.email,
            iat: now,
            exp: now + self.expiry_seconds,
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )?;

        Ok(token)
    }

    /// Verify and decode a JWT token
    pub fn verify_token(&self, token: &str) -> TokenValidationResult {
        let validation = Validation::default();

        match decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &validation,
        ) {
            Ok(token_data) => TokenValidationResult::valid(token_data.claims),
            Err(err) => {
                use jsonwebtoken::errors::ErrorKind;
                let error_msg = match err.kind() {
                    ErrorKind::ExpiredSignature => "Token expired",
                    ErrorKind::InvalidToken => "Invalid token",
                    ErrorKind::InvalidSignature => "Invalid signature",
                    _ => "Token validation failed",
                };
                TokenValidationResult::invalid(error_msg)
            }
        }
    }

    /// Verify a token and resolve it to a caller identity
    pub fn caller_from_token(&self, token: &str) -> Option<Caller> {
        let result = self.verify_token(token);
        result.claims.as_ref().and_then(Caller::from_claims)
    }
}

/// Extract token from Authorization header.
/// Supports "Bearer <token>" format only.
pub fn extract_token_from_header(auth_header: Option<&str>) -> Option<&str> {
    let token = auth_header?.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}
