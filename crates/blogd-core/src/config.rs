//! Configuration module
//!
//! Env-driven configuration for the blogd service. Values are read once at
//! startup via [`Config::from_env`]; handlers only ever see getter methods.
//!
//! The delivery strategy is an explicit configuration value
//! (`DELIVERY_MODE=direct|proxy-redirect`), not a runtime capability probe:
//! deployments behind a front-end proxy opt into internal-redirect delivery
//! and everything else streams file bytes directly.

use std::env;

use crate::constants::{
    ATTACHMENT_SPACE_MARGIN_BYTES, DISK_CRITICAL_USAGE_PERCENT, DISK_WARN_USAGE_PERCENT,
    IMAGE_SPACE_MARGIN_BYTES, MAX_ATTACHMENT_SIZE_BYTES, MAX_IMAGE_SIZE_BYTES,
};
use crate::models::AttachmentClass;

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 10;
const DEFAULT_DB_TIMEOUT_SECS: u64 = 30;
const DEFAULT_SESSION_TTL_HOURS: i64 = 24;

/// How stored files are delivered to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryMode {
    /// The application reads and streams the bytes itself.
    Direct,
    /// The application answers with an internal-redirect header and the
    /// front-end proxy streams the bytes from an internal-only location.
    ProxyRedirect,
}

impl DeliveryMode {
    fn parse(value: &str) -> Result<Self, anyhow::Error> {
        match value.to_lowercase().as_str() {
            "direct" => Ok(DeliveryMode::Direct),
            "proxy-redirect" | "proxy_redirect" => Ok(DeliveryMode::ProxyRedirect),
            other => Err(anyhow::anyhow!(
                "invalid DELIVERY_MODE '{}': expected 'direct' or 'proxy-redirect'",
                other
            )),
        }
    }
}

/// Size cap, free-space margin, and the two independently editable
/// allow-list tables for one attachment class.
#[derive(Debug, Clone)]
pub struct ClassRules {
    pub max_size_bytes: u64,
    pub space_margin_bytes: u64,
    pub allowed_mime_types: Vec<String>,
    pub allowed_extensions: Vec<String>,
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    server_port: u16,
    environment: String,
    database_url: String,
    db_max_connections: u32,
    db_timeout_seconds: u64,
    app_root: String,
    upload_root: String,
    delivery_mode: DeliveryMode,
    proxy_internal_prefix: String,
    session_secret: String,
    session_ttl_hours: i64,
    disk_warn_usage_percent: f64,
    disk_critical_usage_percent: f64,
    image_max_size_bytes: u64,
    image_allowed_mime_types: Vec<String>,
    image_allowed_extensions: Vec<String>,
    file_max_size_bytes: u64,
    file_allowed_mime_types: Vec<String>,
    file_allowed_extensions: Vec<String>,
}

fn env_list(name: &str, default: &[&str]) -> Vec<String> {
    env::var(name)
        .map(|v| {
            v.split(',')
                .map(|s| s.trim().to_lowercase())
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_else(|_| default.iter().map(|s| s.to_string()).collect())
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let config = Config {
            server_port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(DEFAULT_PORT),
            environment,
            database_url: env::var("DATABASE_URL")
                .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?,
            db_max_connections: env::var("DB_MAX_CONNECTIONS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_DB_MAX_CONNECTIONS),
            db_timeout_seconds: env::var("DB_TIMEOUT_SECONDS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_DB_TIMEOUT_SECS),
            app_root: env::var("APP_ROOT").unwrap_or_else(|_| ".".to_string()),
            upload_root: env::var("UPLOAD_ROOT").unwrap_or_else(|_| "uploads".to_string()),
            delivery_mode: DeliveryMode::parse(
                &env::var("DELIVERY_MODE").unwrap_or_else(|_| "direct".to_string()),
            )?,
            proxy_internal_prefix: env::var("PROXY_INTERNAL_PREFIX")
                .unwrap_or_else(|_| "/internal".to_string()),
            session_secret: env::var("SESSION_SECRET")
                .or_else(|_| env::var("CSRF_SECRET"))
                .unwrap_or_default(),
            session_ttl_hours: env::var("SESSION_TTL_HOURS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_SESSION_TTL_HOURS),
            disk_warn_usage_percent: env::var("DISK_WARN_USAGE_PERCENT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DISK_WARN_USAGE_PERCENT),
            disk_critical_usage_percent: env::var("DISK_CRITICAL_USAGE_PERCENT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DISK_CRITICAL_USAGE_PERCENT),
            image_max_size_bytes: env::var("MAX_IMAGE_SIZE_MB")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .map(|mb| mb * 1024 * 1024)
                .unwrap_or(MAX_IMAGE_SIZE_BYTES),
            image_allowed_mime_types: env_list(
                "IMAGE_ALLOWED_CONTENT_TYPES",
                &["image/jpeg", "image/jpg", "image/png", "image/gif", "image/webp"],
            ),
            image_allowed_extensions: env_list(
                "IMAGE_ALLOWED_EXTENSIONS",
                &["jpg", "jpeg", "png", "gif", "webp"],
            ),
            file_max_size_bytes: env::var("MAX_ATTACHMENT_SIZE_MB")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .map(|mb| mb * 1024 * 1024)
                .unwrap_or(MAX_ATTACHMENT_SIZE_BYTES),
            // MIME list is deliberately short; the extension list already
            // carries the office formats queued up for future enablement.
            file_allowed_mime_types: env_list(
                "FILE_ALLOWED_CONTENT_TYPES",
                &["application/pdf", "application/msword"],
            ),
            file_allowed_extensions: env_list(
                "FILE_ALLOWED_EXTENSIONS",
                &[
                    "pdf", "doc", "docx", "xls", "xlsx", "ppt", "pptx", "zip", "txt", "csv",
                ],
            ),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.is_production() && self.session_secret.is_empty() {
            return Err(anyhow::anyhow!(
                "SESSION_SECRET must be set in production environments"
            ));
        }
        if self.disk_warn_usage_percent > self.disk_critical_usage_percent {
            return Err(anyhow::anyhow!(
                "DISK_WARN_USAGE_PERCENT must not exceed DISK_CRITICAL_USAGE_PERCENT"
            ));
        }
        Ok(())
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn server_port(&self) -> u16 {
        self.server_port
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn database_url(&self) -> &str {
        &self.database_url
    }

    pub fn db_max_connections(&self) -> u32 {
        self.db_max_connections
    }

    pub fn db_timeout_seconds(&self) -> u64 {
        self.db_timeout_seconds
    }

    /// Application root; attachment `relative_path` values resolve under it.
    pub fn app_root(&self) -> &str {
        &self.app_root
    }

    /// Upload root relative to the application root.
    pub fn upload_root(&self) -> &str {
        &self.upload_root
    }

    pub fn delivery_mode(&self) -> DeliveryMode {
        self.delivery_mode
    }

    /// Location prefix the front-end proxy maps to the application root for
    /// internal-redirect delivery.
    pub fn proxy_internal_prefix(&self) -> &str {
        &self.proxy_internal_prefix
    }

    pub fn session_secret(&self) -> &str {
        &self.session_secret
    }

    pub fn session_ttl_hours(&self) -> i64 {
        self.session_ttl_hours
    }

    pub fn disk_warn_usage_percent(&self) -> f64 {
        self.disk_warn_usage_percent
    }

    pub fn disk_critical_usage_percent(&self) -> f64 {
        self.disk_critical_usage_percent
    }

    /// Rules table for the given attachment class. MIME types and extensions
    /// are two independent tables; membership in both is required.
    pub fn rules_for(&self, class: AttachmentClass) -> ClassRules {
        match class {
            AttachmentClass::Image => ClassRules {
                max_size_bytes: self.image_max_size_bytes,
                space_margin_bytes: IMAGE_SPACE_MARGIN_BYTES,
                allowed_mime_types: self.image_allowed_mime_types.clone(),
                allowed_extensions: self.image_allowed_extensions.clone(),
            },
            AttachmentClass::File => ClassRules {
                max_size_bytes: self.file_max_size_bytes,
                space_margin_bytes: ATTACHMENT_SPACE_MARGIN_BYTES,
                allowed_mime_types: self.file_allowed_mime_types.clone(),
                allowed_extensions: self.file_allowed_extensions.clone(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delivery_mode_parses_both_spellings() {
        assert_eq!(DeliveryMode::parse("direct").unwrap(), DeliveryMode::Direct);
        assert_eq!(
            DeliveryMode::parse("proxy-redirect").unwrap(),
            DeliveryMode::ProxyRedirect
        );
        assert_eq!(
            DeliveryMode::parse("PROXY_REDIRECT").unwrap(),
            DeliveryMode::ProxyRedirect
        );
        assert!(DeliveryMode::parse("apache").is_err());
    }
}
