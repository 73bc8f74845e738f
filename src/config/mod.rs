use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    pub environment: Environment,
    pub query: QueryConfig,
    pub notify: NotifyConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryConfig {
    pub max_limit: Option<usize>,
    pub debug_logging: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyConfig {
    /// Observers running longer than this are logged at WARN level.
    pub slow_observer_warn_ms: u64,
}

impl RuntimeConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("DATAHOOK_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        if let Ok(v) = env::var("DATAHOOK_QUERY_MAX_LIMIT") {
            self.query.max_limit = v.parse().ok();
        }
        if let Ok(v) = env::var("DATAHOOK_QUERY_DEBUG_LOGGING") {
            self.query.debug_logging = v.parse().unwrap_or(self.query.debug_logging);
        }
        if let Ok(v) = env::var("DATAHOOK_SLOW_OBSERVER_WARN_MS") {
            self.notify.slow_observer_warn_ms =
                v.parse().unwrap_or(self.notify.slow_observer_warn_ms);
        }

        self
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            query: QueryConfig {
                max_limit: None,
                debug_logging: true,
            },
            notify: NotifyConfig {
                slow_observer_warn_ms: 1000,
            },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            query: QueryConfig {
                max_limit: Some(1000),
                debug_logging: false,
            },
            notify: NotifyConfig {
                slow_observer_warn_ms: 250,
            },
        }
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<RuntimeConfig> = Lazy::new(RuntimeConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static RuntimeConfig {
    &CONFIG
}
