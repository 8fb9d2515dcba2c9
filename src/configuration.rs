use config::ConfigError;
use sqlx::postgres::PgConnectOptions;
use std::time::Duration;

#[derive(serde::Deserialize, Clone)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub application: ApplicationSettings,
    pub jwt: JwtSettings,
    pub maintenance: MaintenanceSettings,
}

#[derive(serde::Deserialize, Clone)]
pub struct ApplicationSettings {
    pub host: String,
    pub port: u16,
}

#[derive(serde::Deserialize, Clone)]
pub struct DatabaseSettings {
    pub username: String,
    pub password: String,
    pub port: u16,
    pub host: String,
    pub database_name: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub max_lifetime_seconds: u64,
}

impl DatabaseSettings {
    /// Server-level options, used to create a throwaway test database.
    pub fn without_db(&self) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&self.host)
            .username(&self.username)
            .password(&self.password)
            .port(self.port)
    }

    pub fn with_db(&self) -> PgConnectOptions {
        self.without_db().database(&self.database_name)
    }

    pub fn max_lifetime(&self) -> Duration {
        Duration::from_secs(self.max_lifetime_seconds)
    }
}

/// Token lifecycle settings
#[derive(serde::Deserialize, Clone)]
pub struct JwtSettings {
    /// Signing secret. A random one is generated at startup when absent.
    #[serde(default)]
    pub secret: Option<String>,
    pub issuer: String,
    pub access_token_expiry: i64,   // seconds (e.g., 900 for 15 minutes)
    pub refresh_token_expiry: i64,  // seconds (e.g., 604800 for 7 days)
    pub refresh_token_bytes: usize, // random bytes before encoding
    pub hash_cost: u32,             // bcrypt cost for refresh token hashes
    pub refresh_cookie_path: String,
}

impl JwtSettings {
    pub fn access_token_lifetime(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.access_token_expiry)
    }

    pub fn refresh_token_lifetime(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.refresh_token_expiry)
    }
}

#[derive(serde::Deserialize, Clone)]
pub struct MaintenanceSettings {
    /// Zero disables the expired/revoked refresh token sweep.
    pub sweep_interval_seconds: u64,
}

impl MaintenanceSettings {
    pub fn sweep_interval(&self) -> Option<Duration> {
        match self.sweep_interval_seconds {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}

/// Layered configuration: built-in defaults, then an optional
/// `configuration.{yaml,toml,json}` file, then `APP_` environment
/// variables (e.g. `APP_DATABASE__HOST`, `APP_JWT__SECRET`).
pub fn get_configuration() -> Result<Settings, ConfigError> {
    let settings = config::Config::builder()
        .set_default("application.host", "127.0.0.1")?
        .set_default("application.port", 8080)?
        .set_default("database.host", "localhost")?
        .set_default("database.port", 5432)?
        .set_default("database.username", "postgres")?
        .set_default("database.password", "")?
        .set_default("database.database_name", "blog")?
        .set_default("database.max_connections", 100)?
        .set_default("database.min_connections", 10)?
        .set_default("database.max_lifetime_seconds", 3600)?
        .set_default("jwt.issuer", "blog_server")?
        .set_default("jwt.access_token_expiry", 900)?
        .set_default("jwt.refresh_token_expiry", 604_800)?
        .set_default("jwt.refresh_token_bytes", 32)?
        .set_default("jwt.hash_cost", 12)?
        .set_default("jwt.refresh_cookie_path", "/auth/refresh")?
        .set_default("maintenance.sweep_interval_seconds", 3600)?
        .add_source(config::File::with_name("configuration").required(false))
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;
    settings.try_deserialize::<Settings>()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_token_policy() {
        let settings = get_configuration().expect("Failed to load configuration");

        assert_eq!(settings.jwt.access_token_expiry, 900);
        assert_eq!(settings.jwt.refresh_token_expiry, 604_800);
        assert_eq!(settings.jwt.refresh_token_bytes, 32);
        assert_eq!(settings.database.max_connections, 100);
        assert_eq!(settings.database.max_lifetime(), Duration::from_secs(3600));
    }

    #[test]
    fn test_zero_interval_disables_sweep() {
        let maintenance = MaintenanceSettings {
            sweep_interval_seconds: 0,
        };
        assert!(maintenance.sweep_interval().is_none());

        let maintenance = MaintenanceSettings {
            sweep_interval_seconds: 60,
        };
        assert_eq!(maintenance.sweep_interval(), Some(Duration::from_secs(60)));
    }
}
