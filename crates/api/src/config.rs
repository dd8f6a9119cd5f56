use std::time::Duration;

/// Upper bound on `RESULT_RETENTION_SECS` (30 days).
pub const MAX_RESULT_RETENTION_SECS: u64 = 30 * 24 * 60 * 60;

/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `8000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Number of background workers (default: `4`).
    pub worker_count: usize,
    /// How long terminal results stay retrievable, in seconds (default: `3600`).
    pub result_retention_secs: u64,
    /// Postgres URL for the result store; in-memory store when unset.
    pub database_url: Option<String>,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                 | Default                    |
    /// |-------------------------|----------------------------|
    /// | `HOST`                  | `0.0.0.0`                  |
    /// | `PORT`                  | `8000`                     |
    /// | `CORS_ORIGINS`          | `http://localhost:3000`    |
    /// | `REQUEST_TIMEOUT_SECS`  | `30`                       |
    /// | `WORKER_COUNT`          | `4`                        |
    /// | `RESULT_RETENTION_SECS` | `3600`, max 30 days        |
    /// | `DATABASE_URL`          | unset                      |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "8000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:3000".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let worker_count: usize = std::env::var("WORKER_COUNT")
            .unwrap_or_else(|_| "4".into())
            .parse()
            .expect("WORKER_COUNT must be a valid usize");
        assert!(worker_count > 0, "WORKER_COUNT must be at least 1");

        let mut result_retention_secs: u64 = std::env::var("RESULT_RETENTION_SECS")
            .unwrap_or_else(|_| "3600".into())
            .parse()
            .expect("RESULT_RETENTION_SECS must be a valid u64");
        if result_retention_secs > MAX_RESULT_RETENTION_SECS {
            tracing::warn!(
                requested = result_retention_secs,
                max = MAX_RESULT_RETENTION_SECS,
                "RESULT_RETENTION_SECS too large, clamping",
            );
            result_retention_secs = MAX_RESULT_RETENTION_SECS;
        }

        let database_url = std::env::var("DATABASE_URL")
            .ok()
            .filter(|url| !url.is_empty());

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            worker_count,
            result_retention_secs,
            database_url,
        }
    }

    /// Retention window for results and finished job bookkeeping, capped
    /// at [`MAX_RESULT_RETENTION_SECS`].
    pub fn result_retention(&self) -> Duration {
        Duration::from_secs(self.result_retention_secs.min(MAX_RESULT_RETENTION_SECS))
    }
}
