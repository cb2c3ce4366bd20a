//! API server configuration.

/// Configuration for the API server.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    /// Address to bind the HTTP listener (e.g. "127.0.0.1:3000").
    pub bind_addr: String,
    /// PostgreSQL connection URL.
    pub database_url: String,
    /// Allowed CORS origin. `None` allows any origin.
    pub cors_origin: Option<String>,
}

impl ApiConfig {
    /// Reads configuration from environment variables with sensible defaults.
    ///
    /// | Variable          | Default                              |
    /// |-------------------|--------------------------------------|
    /// | `BIND_ADDR`       | `127.0.0.1:3000`                     |
    /// | `DATABASE_URL`    | `postgres://localhost:5432/bazaar`   |
    /// | `FRONTEND_ORIGIN` | any origin                           |
    pub fn from_env() -> Self {
        Self {
            bind_addr: std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:3000".into()),
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgres://localhost:5432/bazaar".into()),
            cors_origin: std::env::var("FRONTEND_ORIGIN")
                .ok()
                .filter(|o| !o.is_empty() && o != "*"),
        }
    }
}
