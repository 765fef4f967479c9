use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub database: DatabaseConfig,
    pub api: ApiConfig,
    pub security: SecurityConfig,
    pub sync: SyncConfig,
    pub notify: NotifyConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub max_connections: u32,
    pub connection_timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub enable_request_logging: bool,
    pub max_request_size_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// Privileged credential that bypasses per-user permission checks
    #[serde(skip_serializing)]
    pub service_credential: String,
    #[serde(skip_serializing)]
    pub jwt_secret: String,
    pub jwt_audience: Option<String>,
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyPolicy {
    /// Rows keep their ids and are updated in place
    Stable,
    /// Rows are deleted and reinserted with fresh ids on every save
    Reissue,
}

impl KeyPolicy {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "stable" => Some(Self::Stable),
            "reissue" | "replace" => Some(Self::Reissue),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    pub consent_page_size: i32,
    pub menu_key_policy: KeyPolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyConfig {
    pub revalidate_url: Option<String>,
    #[serde(skip_serializing)]
    pub revalidate_secret: Option<String>,
    pub activity_log_enabled: bool,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Database overrides
        if let Ok(v) = env::var("DATABASE_URL") {
            self.database.url = Some(v);
        }
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }

        // API overrides
        if let Ok(v) = env::var("API_ENABLE_REQUEST_LOGGING") {
            self.api.enable_request_logging = v.parse().unwrap_or(self.api.enable_request_logging);
        }
        if let Ok(v) = env::var("API_MAX_REQUEST_SIZE_BYTES") {
            self.api.max_request_size_bytes = v.parse().unwrap_or(self.api.max_request_size_bytes);
        }

        // Security overrides
        if let Ok(v) = env::var("SERVICE_ROLE_KEY") {
            self.security.service_credential = v;
        }
        if let Ok(v) = env::var("JWT_SECRET") {
            self.security.jwt_secret = v;
        }
        if let Ok(v) = env::var("JWT_AUDIENCE") {
            self.security.jwt_audience = Some(v).filter(|s| !s.is_empty());
        }
        if let Ok(v) = env::var("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = v.split(',').map(|s| s.trim().to_string()).collect();
        }

        // Sync overrides
        if let Ok(v) = env::var("SYNC_CONSENT_PAGE_SIZE") {
            self.sync.consent_page_size = parse_page_size(&v).unwrap_or(self.sync.consent_page_size);
        }
        if let Ok(v) = env::var("SYNC_MENU_KEY_POLICY") {
            self.sync.menu_key_policy = KeyPolicy::parse(&v).unwrap_or(self.sync.menu_key_policy);
        }

        // Notify overrides
        if let Ok(v) = env::var("NOTIFY_REVALIDATE_URL") {
            self.notify.revalidate_url = Some(v).filter(|s| !s.is_empty());
        }
        if let Ok(v) = env::var("NOTIFY_REVALIDATE_SECRET") {
            self.notify.revalidate_secret = Some(v).filter(|s| !s.is_empty());
        }
        if let Ok(v) = env::var("NOTIFY_ACTIVITY_LOG_ENABLED") {
            self.notify.activity_log_enabled = v.parse().unwrap_or(self.notify.activity_log_enabled);
        }

        self
    }

    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            database: DatabaseConfig {
                url: None,
                max_connections: 10,
                connection_timeout: 30,
            },
            api: ApiConfig {
                enable_request_logging: true,
                max_request_size_bytes: 10 * 1024 * 1024, // 10MB
            },
            security: SecurityConfig {
                service_credential: String::new(),
                jwt_secret: String::new(),
                jwt_audience: None,
                cors_origins: vec!["http://localhost:3000".to_string(), "http://localhost:5173".to_string()],
            },
            sync: SyncConfig {
                consent_page_size: 100,
                menu_key_policy: KeyPolicy::Stable,
            },
            notify: NotifyConfig {
                revalidate_url: None,
                revalidate_secret: None,
                activity_log_enabled: true,
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            database: DatabaseConfig {
                url: None,
                max_connections: 20,
                connection_timeout: 10,
            },
            api: ApiConfig {
                enable_request_logging: true,
                max_request_size_bytes: 5 * 1024 * 1024, // 5MB
            },
            security: SecurityConfig {
                service_credential: String::new(),
                jwt_secret: String::new(),
                jwt_audience: Some("authenticated".to_string()),
                cors_origins: vec!["https://staging.example.com".to_string()],
            },
            sync: SyncConfig {
                consent_page_size: 100,
                menu_key_policy: KeyPolicy::Stable,
            },
            notify: NotifyConfig {
                revalidate_url: None,
                revalidate_secret: None,
                activity_log_enabled: true,
            },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            database: DatabaseConfig {
                url: None,
                max_connections: 50,
                connection_timeout: 5,
            },
            api: ApiConfig {
                enable_request_logging: false,
                max_request_size_bytes: 2 * 1024 * 1024, // 2MB
            },
            security: SecurityConfig {
                service_credential: String::new(),
                jwt_secret: String::new(),
                jwt_audience: Some("authenticated".to_string()),
                cors_origins: vec!["https://app.example.com".to_string()],
            },
            sync: SyncConfig {
                consent_page_size: 50,
                menu_key_policy: KeyPolicy::Stable,
            },
            notify: NotifyConfig {
                revalidate_url: None,
                revalidate_secret: None,
                activity_log_enabled: true,
            },
        }
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}

/// A page size override; negative or non-numeric values are ignored
fn parse_page_size(raw: &str) -> Option<i32> {
    raw.trim().parse::<i32>().ok().filter(|n| *n >= 0)
}
