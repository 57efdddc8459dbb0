use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub admin_token: Option<String>,
    pub notify_gateway_url: Option<String>,
    pub notify_gateway_token: Option<String>,
    pub inspection_archive_path: String,
    pub default_phone_region: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            database_url: std::env::var("DB_URL")
                .or_else(|_| std::env::var("DATABASE_URL"))
                .map_err(|_| {
                    anyhow::anyhow!("DB_URL or DATABASE_URL environment variable required")
                })
                .and_then(|url| {
                    if url.trim().is_empty() {
                        anyhow::bail!("DB_URL cannot be empty");
                    }
                    if !url.starts_with("postgresql://") && !url.starts_with("postgres://") {
                        anyhow::bail!("DB_URL must start with postgresql:// or postgres://");
                    }
                    Ok(url)
                })?,
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number between 1-65535"))?,
            admin_token: std::env::var("ADMIN_TOKEN")
                .ok()
                .filter(|s| !s.trim().is_empty()),
            notify_gateway_url: std::env::var("NOTIFY_GATEWAY_URL")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .map(|url| {
                    if !url.starts_with("http://") && !url.starts_with("https://") {
                        anyhow::bail!("NOTIFY_GATEWAY_URL must start with http:// or https://");
                    }
                    Ok(url)
                })
                .transpose()?,
            notify_gateway_token: std::env::var("NOTIFY_GATEWAY_TOKEN")
                .ok()
                .filter(|s| !s.trim().is_empty()),
            inspection_archive_path: std::env::var("INSPECTION_ARCHIVE_PATH")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| "inspections.json".to_string()),
            default_phone_region: std::env::var("DEFAULT_PHONE_REGION")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .map(|region| {
                    if region.len() != 2 || !region.chars().all(|c| c.is_ascii_alphabetic()) {
                        anyhow::bail!(
                            "DEFAULT_PHONE_REGION must be a two-letter country code (e.g. US)"
                        );
                    }
                    Ok(region.to_uppercase())
                })
                .transpose()?
                .unwrap_or_else(|| "US".to_string()),
        };

        // Log successful configuration load (without sensitive values)
        tracing::info!("Configuration loaded successfully");
        tracing::debug!(
            "Database URL: {}...",
            &config.database_url[..20.min(config.database_url.len())]
        );
        tracing::debug!("Server Port: {}", config.port);
        tracing::debug!(
            "Inspection archive path: {}",
            config.inspection_archive_path
        );
        tracing::debug!("Default phone region: {}", config.default_phone_region);
        if config.admin_token.is_none() {
            tracing::warn!("ADMIN_TOKEN not set - admin endpoints are unprotected");
        }
        match &config.notify_gateway_url {
            Some(url) => tracing::info!("Notification gateway configured: {}", url),
            None => tracing::warn!(
                "NOTIFY_GATEWAY_URL not set - booking notifications are disabled"
            ),
        }

        Ok(config)
    }
}
