//! Typed runtime configuration.
//!
//! Values come from CLI flags or their environment fallbacks (see `cli`);
//! this module only holds the resolved settings and their defaults.

use std::net::SocketAddr;

use chrono::Duration;

/// Session tokens are valid for one day unless configured otherwise.
pub const DEFAULT_TOKEN_TTL_HOURS: i64 = 24;

/// Upper bound for the token lifetime: one year.
pub const MAX_TOKEN_TTL_HOURS: i64 = 24 * 365;

/// Used when no secret is configured. Fine for local development only.
pub const DEV_JWT_SECRET: &str = "finapi-dev-secret";

pub const DEFAULT_BIND: &str = "127.0.0.1:3333";

#[derive(Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub token_ttl: Duration,
}

impl AuthConfig {
    pub fn new(jwt_secret: impl Into<String>, token_ttl: Duration) -> Self {
        Self {
            jwt_secret: jwt_secret.into(),
            token_ttl,
        }
    }

    /// Build from an optional secret, falling back to the development default.
    /// The lifetime must lie in `1..=MAX_TOKEN_TTL_HOURS`.
    pub fn from_secret(jwt_secret: Option<String>, token_ttl_hours: i64) -> anyhow::Result<Self> {
        anyhow::ensure!(
            (1..=MAX_TOKEN_TTL_HOURS).contains(&token_ttl_hours),
            "token TTL must be between 1 and {} hours, got {}",
            MAX_TOKEN_TTL_HOURS,
            token_ttl_hours
        );

        let jwt_secret = match jwt_secret.filter(|s| !s.is_empty()) {
            Some(secret) => secret,
            None => {
                tracing::warn!("JWT_SECRET not set; using insecure dev default");
                DEV_JWT_SECRET.to_string()
            }
        };
        Ok(Self::new(jwt_secret, Duration::hours(token_ttl_hours)))
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self::new(DEV_JWT_SECRET, Duration::hours(DEFAULT_TOKEN_TTL_HOURS))
    }
}

// Keep the secret out of logs
impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"<redacted>")
            .field("token_ttl", &self.token_ttl)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind: SocketAddr,
    pub auth: AuthConfig,
}
