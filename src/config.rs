use anyhow::Result;
use domain::pagination::PageLimits;
use domain::throttle::LoginThrottle;
use sea_orm::Database;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::schemas::AppState;

/// Optional configuration file read from the working directory.
pub const CONFIG_FILE: &str = "expense-tracker";

/// Runtime settings.
///
/// Sources, later ones winning: built-in defaults, `expense-tracker.toml`,
/// then `APP_*` environment variables with `__` between nested keys
/// (`APP_HTTP__MIRROR_STATUS=true`).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub app: AppSettings,
    pub http: HttpSettings,
    pub auth: AuthSettings,
    pub pagination: PaginationSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    pub name: String,
    /// Public base URL; prefixes the `path` and page links of paginated listings
    pub url: String,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            name: "Expense Tracker API".to_string(),
            url: "http://localhost:3000".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpSettings {
    /// Send the envelope status as the transport status instead of 200
    pub mirror_status: bool,
    pub timeout_secs: u64,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            mirror_status: false,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuthSettings {
    pub max_login_attempts: u32,
    pub decay_secs: u64,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            max_login_attempts: domain::throttle::DEFAULT_MAX_ATTEMPTS,
            decay_secs: domain::throttle::DEFAULT_DECAY.as_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PaginationSettings {
    pub per_page: u64,
    /// Largest `perPage` a listing accepts
    pub max_per_page: u64,
}

impl Default for PaginationSettings {
    fn default() -> Self {
        Self {
            per_page: domain::pagination::DEFAULT_PER_PAGE,
            max_per_page: domain::pagination::MAX_PER_PAGE,
        }
    }
}

impl PaginationSettings {
    pub fn limits(&self) -> PageLimits {
        PageLimits {
            per_page: self.per_page,
            max_per_page: self.max_per_page,
        }
    }
}

impl Settings {
    /// Load settings from `.env`, the optional config file and the environment
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let settings = config::Config::builder()
            .add_source(config::File::with_name(CONFIG_FILE).required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let settings: Settings = settings.try_deserialize()?;
        debug!("Loaded settings: {:?}", settings);
        Ok(settings)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.http.timeout_secs.max(1))
    }

    pub fn login_throttle(&self) -> LoginThrottle {
        LoginThrottle::new(
            self.auth.max_login_attempts.max(1),
            Duration::from_secs(self.auth.decay_secs.max(1)),
        )
    }
}

/// Connect to the database and build the shared application state
pub async fn initialize_app_state_with_url(database_url: &str, settings: Settings) -> Result<AppState> {
    info!("Connecting to database: {}", database_url);
    let db = Database::connect(database_url).await?;

    Ok(AppState {
        db,
        throttle: settings.login_throttle(),
        settings: Arc::new(settings),
    })
}
