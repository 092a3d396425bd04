use std::fmt::Debug;
use std::str::FromStr;

use crate::auth::jwt::JwtConfig;

/// Server configuration loaded from environment variables.
///
/// Every field except the JWT secret has a development default.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS`.
    pub cors_origins: Vec<String>,
    pub request_timeout_secs: u64,
    /// Time allowed for background tasks to drain after the listener stops.
    pub shutdown_timeout_secs: u64,
    /// Lifetime of cached lookups (categories, dashboard) in seconds.
    pub cache_ttl_secs: u64,
    /// How often the reminder job runs, in seconds.
    pub reminder_interval_secs: u64,
    /// Certifications expiring within this many days are reminded.
    pub reminder_lookahead_days: i64,
    pub login: LoginPolicy,
    pub jwt: JwtConfig,
}

/// Account lockout after repeated wrong passwords.
#[derive(Debug, Clone, Copy)]
pub struct LoginPolicy {
    /// Consecutive failures that lock the account.
    pub max_failed_attempts: i32,
    /// How long a locked account stays locked.
    pub lockout_mins: i64,
}

impl Default for LoginPolicy {
    fn default() -> Self {
        Self {
            max_failed_attempts: 5,
            lockout_mins: 15,
        }
    }
}

/// Read `name` and parse it, falling back to `default` when unset.
///
/// # Panics
///
/// Panics when the variable is set but does not parse.
pub(crate) fn env_or<T>(name: &str, default: T) -> T
where
    T: FromStr,
    T::Err: Debug,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .unwrap_or_else(|e| panic!("{name} has an invalid value '{raw}': {e:?}")),
        Err(_) => default,
    }
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                     | Default                 |
    /// |-----------------------------|-------------------------|
    /// | `HOST`                      | `0.0.0.0`               |
    /// | `PORT`                      | `3000`                  |
    /// | `CORS_ORIGINS`              | `http://localhost:5173` |
    /// | `REQUEST_TIMEOUT_SECS`      | `30`                    |
    /// | `SHUTDOWN_TIMEOUT_SECS`     | `30`                    |
    /// | `CACHE_TTL_SECS`            | `60`                    |
    /// | `REMINDER_INTERVAL_SECS`    | `3600`                  |
    /// | `REMINDER_LOOKAHEAD_DAYS`   | `30`                    |
    /// | `LOGIN_MAX_FAILED_ATTEMPTS` | `5`                     |
    /// | `LOGIN_LOCKOUT_MINS`        | `15`                    |
    pub fn from_env() -> Self {
        let cors_origins = env_or("CORS_ORIGINS", "http://localhost:5173".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let reminder_interval_secs: u64 = env_or("REMINDER_INTERVAL_SECS", 3600);
        assert!(reminder_interval_secs > 0, "REMINDER_INTERVAL_SECS must be positive");

        let defaults = LoginPolicy::default();
        let login = LoginPolicy {
            max_failed_attempts: env_or("LOGIN_MAX_FAILED_ATTEMPTS", defaults.max_failed_attempts),
            lockout_mins: env_or("LOGIN_LOCKOUT_MINS", defaults.lockout_mins),
        };
        assert!(login.max_failed_attempts > 0, "LOGIN_MAX_FAILED_ATTEMPTS must be positive");

        Self {
            host: env_or("HOST", "0.0.0.0".to_string()),
            port: env_or("PORT", 3000),
            cors_origins,
            request_timeout_secs: env_or("REQUEST_TIMEOUT_SECS", 30),
            shutdown_timeout_secs: env_or("SHUTDOWN_TIMEOUT_SECS", 30),
            cache_ttl_secs: env_or("CACHE_TTL_SECS", 60),
            reminder_interval_secs,
            reminder_lookahead_days: env_or("REMINDER_LOOKAHEAD_DAYS", 30),
            login,
            jwt: JwtConfig::from_env(),
        }
    }
}
