//! Configuration for Perkhub
//!
//! CLI arguments and environment variable handling using clap.

use clap::Parser;
use std::net::SocketAddr;

/// Secret used when running in dev mode without JWT_SECRET
const DEV_JWT_SECRET: &str = "dev-mode-secret-not-for-production-use-123456";

/// Perkhub - partner deal catalog and claim service
#[derive(Parser, Debug, Clone)]
#[command(name = "perkhub")]
#[command(about = "Partner deal catalog and claim service")]
pub struct Args {
    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:3000")]
    pub listen: SocketAddr,

    /// Enable development mode (in-memory fallback, insecure cookies, self-verification)
    #[arg(long, env = "DEV_MODE", default_value = "false")]
    pub dev_mode: bool,

    /// MongoDB connection URI
    #[arg(long, env = "MONGODB_URI", default_value = "mongodb://localhost:27017")]
    pub mongodb_uri: String,

    /// MongoDB database name
    #[arg(long, env = "MONGODB_DB", default_value = "startup-benefits")]
    pub mongodb_db: String,

    /// JWT secret for token signing (required in production)
    #[arg(long, env = "JWT_SECRET")]
    pub jwt_secret: Option<String>,

    /// JWT token and session cookie lifetime in seconds
    #[arg(long, env = "JWT_EXPIRY_SECONDS", default_value = "604800")]
    pub jwt_expiry_seconds: u64,

    /// Let signed-in users mark their own account as verified
    #[arg(long, env = "ALLOW_SELF_VERIFY", default_value = "false")]
    pub allow_self_verify: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Args {
    /// Get effective JWT secret (uses default in dev mode)
    pub fn jwt_secret(&self) -> Option<String> {
        match (&self.jwt_secret, self.dev_mode) {
            (Some(secret), _) => Some(secret.clone()),
            (None, true) => Some(DEV_JWT_SECRET.to_string()),
            (None, false) => None,
        }
    }

    /// Whether the session cookie carries the `Secure` attribute
    pub fn secure_cookies(&self) -> bool {
        !self.dev_mode
    }

    /// Whether `POST /api/auth/verify` is enabled
    pub fn self_verify_enabled(&self) -> bool {
        self.dev_mode || self.allow_self_verify
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if !self.dev_mode && self.jwt_secret.is_none() {
            return Err("JWT_SECRET is required in production mode".to_string());
        }

        if self.jwt_expiry_seconds == 0 {
            return Err("JWT_EXPIRY_SECONDS must be greater than zero".to_string());
        }

        Ok(())
    }
}
