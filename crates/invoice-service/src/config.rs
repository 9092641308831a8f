//! Application configuration loaded from environment variables.

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST` — bind address (default: `"0.0.0.0"`)
/// - `PORT` — listen port (default: `3001`)
/// - `UPLOAD_DIR` — invoice PDF directory (default: `"./uploads"`)
/// - `DATABASE_URL` — PostgreSQL connection URL; when absent the service
///   runs with in-memory storage
/// - `BROKER_URL` — Redis connection URL; when absent the service runs
///   with the in-memory broker
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub upload_dir: String,
    pub database_url: Option<String>,
    pub broker_url: Option<String>,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3001),
            upload_dir: std::env::var("UPLOAD_DIR").unwrap_or_else(|_| "./uploads".to_string()),
            database_url: std::env::var("DATABASE_URL").ok(),
            broker_url: std::env::var("BROKER_URL").ok(),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3001,
            upload_dir: "./uploads".to_string(),
            database_url: None,
            broker_url: None,
        }
    }
}
