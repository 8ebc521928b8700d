use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;

use crate::pii::GateLimits;

/// Placeholder shipped in sample `.env` files; treated the same as no key
pub const OPENAI_KEY_PLACEHOLDER: &str = "your_openai_api_key_here";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub ai: AiConfig,
    pub pii: PiiConfig,
    pub database: DatabaseConfig,
    pub api: ApiConfig,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub request_timeout_secs: u64,
    pub store: bool,
}

impl AiConfig {
    /// Usable key, if one was configured
    pub fn api_key(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty() && *key != OPENAI_KEY_PLACEHOLDER)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PiiConfig {
    pub max_messages: usize,
    pub max_content_bytes: usize,
}

impl PiiConfig {
    pub fn limits(&self) -> GateLimits {
        GateLimits {
            max_messages: self.max_messages,
            max_content_bytes: self.max_content_bytes,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(skip_serializing)]
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
    pub enable_cors: bool,
    pub cors_origins: Vec<String>,
    /// 64 hex chars (AES-256) used to encrypt financial entry payloads at rest
    #[serde(skip_serializing)]
    pub encryption_key: Option<String>,
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
        // AI provider overrides
        if let Ok(v) = env::var("OPENAI_KEY") {
            self.ai.api_key = Some(v);
        }
        if let Ok(v) = env::var("AI_MODEL") {
            self.ai.model = v;
        }
        if let Ok(v) = env::var("AI_BASE_URL") {
            self.ai.base_url = v.trim_end_matches('/').to_string();
        }
        if let Ok(v) = env::var("AI_TIMEOUT_SECS") {
            self.ai.request_timeout_secs = v.parse().unwrap_or(self.ai.request_timeout_secs);
        }
        if let Ok(v) = env::var("AI_STORE") {
            self.ai.store = v.parse().unwrap_or(self.ai.store);
        }

        // PII gate overrides
        if let Ok(v) = env::var("PII_MAX_MESSAGES") {
            self.pii.max_messages = v.parse().unwrap_or(self.pii.max_messages);
        }
        if let Ok(v) = env::var("PII_MAX_CONTENT_BYTES") {
            self.pii.max_content_bytes = v.parse().unwrap_or(self.pii.max_content_bytes);
        }

        // Database overrides
        if let Ok(v) = env::var("DATABASE_URL") {
            self.database.url = Some(v).filter(|url| !url.trim().is_empty());
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
        if let Ok(v) = env::var("SECURITY_ENABLE_CORS") {
            self.security.enable_cors = v.parse().unwrap_or(self.security.enable_cors);
        }
        if let Ok(v) = env::var("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = v.split(',').map(|s| s.trim().to_string()).collect();
        }
        if let Ok(v) = env::var("SECURITY_ENCRYPTION_KEY") {
            self.security.encryption_key = Some(v).filter(|key| !key.trim().is_empty());
        }

        self
    }

    fn ai_defaults() -> AiConfig {
        AiConfig {
            api_key: None,
            model: "gpt-4o-mini".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            request_timeout_secs: 60,
            store: true,
        }
    }

    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            ai: Self::ai_defaults(),
            pii: PiiConfig {
                max_messages: 200,
                max_content_bytes: 64 * 1024,
            },
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
                enable_cors: true,
                cors_origins: vec!["http://localhost:3000".to_string(), "http://localhost:8081".to_string()],
                encryption_key: None,
            },
        }
    }

    pub fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            ai: Self::ai_defaults(),
            pii: PiiConfig {
                max_messages: 100,
                max_content_bytes: 32 * 1024,
            },
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
                enable_cors: true,
                cors_origins: vec!["https://staging.example.com".to_string()],
                encryption_key: None,
            },
        }
    }

    pub fn production() -> Self {
        Self {
            environment: Environment::Production,
            ai: Self::ai_defaults(),
            pii: PiiConfig {
                max_messages: 50,
                max_content_bytes: 16 * 1024,
            },
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
                enable_cors: true,
                cors_origins: vec!["https://app.example.com".to_string()],
                encryption_key: None,
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

#[macro_export]
macro_rules! is_production {
    () => {
        matches!($crate::config::CONFIG.environment, $crate::config::Environment::Production)
    };
}
