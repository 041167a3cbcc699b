/// Configuration management for the API server
///
/// Configuration is read once at startup into an explicit [`Config`] and
/// shared through `AppState`. Nothing else reads the environment.
///
/// # Environment Variables
///
/// - `API_HOST`: Host to bind to (default: 0.0.0.0)
/// - `API_PORT`: Port to bind to (default: 5000)
/// - `APP_ENV`: `production` or anything else (default: development)
/// - `DATABASE_URL`: PostgreSQL connection string (required in production;
///   without it the server runs on the in-memory store)
/// - `DATABASE_MAX_CONNECTIONS`: Pool size (default: 10)
/// - `JWT_ACCESS_SECRET`: Access token secret, at least 32 characters (required)
/// - `JWT_REFRESH_SECRET`: Refresh token secret, at least 32 characters and
///   different from the access secret (required)
/// - `JWT_ACCESS_EXPIRES_IN`: Access token lifetime (default: 15m)
/// - `JWT_REFRESH_EXPIRES_IN`: Refresh token lifetime (default: 7d)
/// - `LOG_FORMAT`: `pretty` or `json` (default: pretty)
/// - `RUST_LOG`: Log filter
///
/// # Example
///
/// ```no_run
/// use taskdesk_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use std::env;
use std::fmt;
use std::time::Duration;
use taskdesk_shared::auth::jwt::{TokenSettings, DEFAULT_ACCESS_TTL, DEFAULT_REFRESH_TTL};

/// Shortest accepted signing secret
pub const MIN_SECRET_LENGTH: usize = 32;

/// Complete application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// API server configuration
    pub api: ApiConfig,

    /// Database configuration; `None` selects the in-memory store
    pub database: Option<DatabaseConfig>,

    /// JWT configuration
    pub jwt: JwtConfig,

    /// Log output format
    pub log_format: LogFormat,
}

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Host to bind to
    pub host: String,

    /// Port to bind to
    pub port: u16,

    /// Environment name as given in `APP_ENV`
    pub environment: String,
}

impl ApiConfig {
    /// Secure cookies, HSTS and hidden 500 details
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in pool
    pub max_connections: u32,
}

/// JWT configuration
#[derive(Clone)]
pub struct JwtConfig {
    /// Access token HMAC secret
    pub access_secret: String,

    /// Refresh token HMAC secret
    pub refresh_secret: String,

    pub access_expires_in: Duration,
    pub refresh_expires_in: Duration,
}

impl fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtConfig")
            .field("access_secret", &"[REDACTED]")
            .field("refresh_secret", &"[REDACTED]")
            .field("access_expires_in", &self.access_expires_in)
            .field("refresh_expires_in", &self.refresh_expires_in)
            .finish()
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl Config {
    /// Loads configuration from environment variables
    ///
    /// A `.env` file is loaded first if present.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Required environment variables are missing
    /// - Environment variables have invalid values
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if present (for development)
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds configuration from an arbitrary variable source
    ///
    /// Used by [`from_env`](Self::from_env) and by tests.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let host = get("API_HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = match get("API_PORT") {
            Some(v) => v
                .parse::<u16>()
                .map_err(|e| anyhow::anyhow!("API_PORT is not a valid port: {}", e))?,
            None => 5000,
        };
        let environment = get("APP_ENV").unwrap_or_else(|| "development".to_string());

        let api = ApiConfig {
            host,
            port,
            environment,
        };

        let max_connections = match get("DATABASE_MAX_CONNECTIONS") {
            Some(v) => v
                .parse::<u32>()
                .map_err(|e| anyhow::anyhow!("DATABASE_MAX_CONNECTIONS is invalid: {}", e))?,
            None => 10,
        };
        let database = get("DATABASE_URL").map(|url| DatabaseConfig {
            url,
            max_connections,
        });

        if database.is_none() && api.is_production() {
            anyhow::bail!("DATABASE_URL environment variable is required in production");
        }

        let access_secret = get("JWT_ACCESS_SECRET")
            .ok_or_else(|| anyhow::anyhow!("JWT_ACCESS_SECRET environment variable is required"))?;
        let refresh_secret = get("JWT_REFRESH_SECRET")
            .ok_or_else(|| anyhow::anyhow!("JWT_REFRESH_SECRET environment variable is required"))?;

        if access_secret.len() < MIN_SECRET_LENGTH {
            anyhow::bail!("JWT_ACCESS_SECRET must be at least {} characters long", MIN_SECRET_LENGTH);
        }
        if refresh_secret.len() < MIN_SECRET_LENGTH {
            anyhow::bail!("JWT_REFRESH_SECRET must be at least {} characters long", MIN_SECRET_LENGTH);
        }
        if access_secret == refresh_secret {
            anyhow::bail!("JWT_ACCESS_SECRET and JWT_REFRESH_SECRET must differ");
        }

        let access_expires_in = parse_ttl(get("JWT_ACCESS_EXPIRES_IN"), "JWT_ACCESS_EXPIRES_IN", DEFAULT_ACCESS_TTL)?;
        let refresh_expires_in = parse_ttl(get("JWT_REFRESH_EXPIRES_IN"), "JWT_REFRESH_EXPIRES_IN", DEFAULT_REFRESH_TTL)?;

        let log_format = match get("LOG_FORMAT").as_deref() {
            Some("json") => LogFormat::Json,
            Some("pretty") | None => LogFormat::Pretty,
            Some(other) => anyhow::bail!("LOG_FORMAT must be pretty or json, got {}", other),
        };

        Ok(Self {
            api,
            database,
            jwt: JwtConfig {
                access_secret,
                refresh_secret,
                access_expires_in,
                refresh_expires_in,
            },
            log_format,
        })
    }

    /// Returns the full bind address (host:port)
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }

    /// Token service settings derived from the JWT section
    pub fn token_settings(&self) -> TokenSettings {
        TokenSettings {
            access_secret: self.jwt.access_secret.clone(),
            refresh_secret: self.jwt.refresh_secret.clone(),
            access_ttl: self.jwt.access_expires_in,
            refresh_ttl: self.jwt.refresh_expires_in,
        }
    }
}

fn parse_ttl(value: Option<String>, key: &str, default: Duration) -> anyhow::Result<Duration> {
    let Some(value) = value else {
        return Ok(default);
    };

    let ttl = humantime::parse_duration(&value)
        .map_err(|e| anyhow::anyhow!("{} is not a valid duration: {}", key, e))?;
    if ttl.is_zero() {
        anyhow::bail!("{} must be greater than zero", key);
    }
    Ok(ttl)
}
