use serde::Deserialize;

/// Credit cap used when no academic period record matches an enrollment's label.
pub const DEFAULT_CREDIT_LIMIT: i32 = 32;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Postgres URL. `None` runs the API in local mode on the in-memory store.
    pub database_url: Option<String>,
    pub port: u16,
    /// Local-mode user; requests without `userId` fall back to it.
    pub default_user_id: Option<i32>,
    pub default_credit_limit: i32,
    pub db_max_connections: u32,
    pub rate_limit_per_second: u64,
    pub rate_limit_burst: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: None,
            port: 3000,
            default_user_id: Some(1),
            default_credit_limit: DEFAULT_CREDIT_LIMIT,
            db_max_connections: 10,
            rate_limit_per_second: 10,
            rate_limit_burst: 20,
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            database_url: match std::env::var("DB_URL").or_else(|_| std::env::var("DATABASE_URL"))
            {
                Ok(url) => {
                    if url.trim().is_empty() {
                        anyhow::bail!("DB_URL cannot be empty");
                    }
                    if !url.starts_with("postgresql://") && !url.starts_with("postgres://") {
                        anyhow::bail!("DB_URL must start with postgresql:// or postgres://");
                    }
                    Some(url)
                }
                Err(_) => None,
            },
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number between 1-65535"))?,
            default_user_id: match std::env::var("DEFAULT_USER_ID") {
                Ok(raw) if !raw.trim().is_empty() => {
                    let id: i32 = raw.trim().parse().map_err(|_| {
                        anyhow::anyhow!("DEFAULT_USER_ID must be a positive integer")
                    })?;
                    if id <= 0 {
                        anyhow::bail!("DEFAULT_USER_ID must be a positive integer");
                    }
                    Some(id)
                }
                _ => None,
            },
            default_credit_limit: std::env::var("DEFAULT_CREDIT_LIMIT")
                .unwrap_or_else(|_| DEFAULT_CREDIT_LIMIT.to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("DEFAULT_CREDIT_LIMIT must be an integer"))
                .and_then(|limit: i32| {
                    if limit <= 0 {
                        anyhow::bail!("DEFAULT_CREDIT_LIMIT must be greater than zero");
                    }
                    Ok(limit)
                })?,
            db_max_connections: std::env::var("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("DB_MAX_CONNECTIONS must be a valid number"))?,
            rate_limit_per_second: std::env::var("RATE_LIMIT_PER_SECOND")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("RATE_LIMIT_PER_SECOND must be a valid number"))?,
            rate_limit_burst: std::env::var("RATE_LIMIT_BURST")
                .unwrap_or_else(|_| "20".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("RATE_LIMIT_BURST must be a valid number"))?,
        };

        // Log successful configuration load (without sensitive values)
        tracing::info!("Configuration loaded successfully");
        match config.database_url {
            Some(ref url) => tracing::debug!("Database URL: {}...", url_preview(url)),
            None => tracing::warn!("No DATABASE_URL set, running in local mode (in-memory store)"),
        }
        match config.default_user_id {
            Some(id) => tracing::info!("Local mode user id: {}", id),
            None => tracing::info!("No DEFAULT_USER_ID, requests must carry userId"),
        }
        tracing::debug!("Default credit limit: {}", config.default_credit_limit);
        tracing::debug!("Server Port: {}", config.port);

        Ok(config)
    }
}

/// First 20 characters of a connection string, for logs.
fn url_preview(url: &str) -> String {
    url.chars().take(20).collect()
}
