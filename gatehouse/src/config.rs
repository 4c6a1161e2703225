// This file is part of the product Gatehouse.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use crate::security::FileTypeRegistry;
use log::warn;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub const CONFIG_FILE_NAME: &str = "config.yaml";
pub const DEFAULT_MAX_FILE_SIZE_BYTES: u64 = 10 * 1024 * 1024;
const MIN_JWT_SECRET_CHARS: usize = 16;
/// Ten years.
pub const MAX_JWT_EXPIRATION_HOURS: u64 = 87_600;

#[derive(Debug)]
pub enum ConfigError {
    LoadError(String),
    ValidationError(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::LoadError(msg) => write!(f, "Configuration load error: {}", msg),
            ConfigError::ValidationError(msg) => {
                write!(f, "Configuration validation error: {}", msg)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_workers")]
    pub workers: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            workers: default_workers(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    7080
}

fn default_workers() -> usize {
    4
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    #[serde(default = "default_app_name")]
    pub name: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: default_app_name(),
        }
    }
}

fn default_app_name() -> String {
    "Gatehouse".to_string()
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SessionMode {
    #[default]
    Jwt,
    Remote,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct JwtConfig {
    pub secret: String,
    #[serde(default = "default_jwt_issuer")]
    pub issuer: String,
    #[serde(default = "default_jwt_audience")]
    pub audience: String,
    #[serde(default = "default_jwt_expiration_hours")]
    pub expiration_hours: u64,
    #[serde(default)]
    pub disable_refresh: bool,
    #[serde(default = "default_jwt_refresh_threshold_percentage")]
    pub refresh_threshold_percentage: u32,
}

fn default_jwt_issuer() -> String {
    "gatehouse".to_string()
}

fn default_jwt_audience() -> String {
    "gatehouse-users".to_string()
}

fn default_jwt_expiration_hours() -> u64 {
    12
}

fn default_jwt_refresh_threshold_percentage() -> u32 {
    50
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RemoteSessionConfig {
    /// Endpoint returning the user behind a bearer token (e.g. `<project>/auth/v1/user`).
    pub user_endpoint: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_remote_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_remote_timeout_ms() -> u64 {
    3000
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SessionConfig {
    #[serde(default = "default_session_cookie_name")]
    pub cookie_name: String,
    #[serde(default)]
    pub mode: SessionMode,
    #[serde(default)]
    pub jwt: Option<JwtConfig>,
    #[serde(default)]
    pub remote: Option<RemoteSessionConfig>,
}

fn default_session_cookie_name() -> String {
    "gatehouse_session".to_string()
}

#[derive(Debug, Clone)]
pub enum SessionVerifierConfig {
    Jwt(JwtConfig),
    Remote(RemoteSessionConfig),
}

#[derive(Debug, Clone)]
pub struct ValidatedSessionConfig {
    pub cookie_name: String,
    pub verifier: SessionVerifierConfig,
}

impl ValidatedSessionConfig {
    pub fn jwt(&self) -> Option<&JwtConfig> {
        match &self.verifier {
            SessionVerifierConfig::Jwt(jwt) => Some(jwt),
            SessionVerifierConfig::Remote(_) => None,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RoutesConfig {
    #[serde(default = "default_protected_prefixes")]
    pub protected_prefixes: Vec<String>,
    #[serde(default = "default_auth_only_prefixes")]
    pub auth_only_prefixes: Vec<String>,
    #[serde(default = "default_login_path")]
    pub login_path: String,
    #[serde(default = "default_landing_path")]
    pub landing_path: String,
    #[serde(default = "default_return_param")]
    pub return_param: String,
}

impl Default for RoutesConfig {
    fn default() -> Self {
        Self {
            protected_prefixes: default_protected_prefixes(),
            auth_only_prefixes: default_auth_only_prefixes(),
            login_path: default_login_path(),
            landing_path: default_landing_path(),
            return_param: default_return_param(),
        }
    }
}

fn default_protected_prefixes() -> Vec<String> {
    vec![
        "/dashboard".to_string(),
        "/settings".to_string(),
        "/account".to_string(),
    ]
}

fn default_auth_only_prefixes() -> Vec<String> {
    vec!["/login".to_string(), "/signup".to_string()]
}

fn default_login_path() -> String {
    "/login".to_string()
}

fn default_landing_path() -> String {
    "/dashboard".to_string()
}

fn default_return_param() -> String {
    "redirect".to_string()
}

/// One accepted upload type: MIME type, its extensions and the hex-encoded magic bytes.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct FileTypeConfig {
    pub mime: String,
    pub extensions: Vec<String>,
    pub signature: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct UploadConfig {
    #[serde(default = "default_max_file_size_bytes")]
    pub max_file_size_bytes: u64,
    #[serde(default = "default_file_types")]
    pub file_types: Vec<FileTypeConfig>,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_file_size_bytes: default_max_file_size_bytes(),
            file_types: default_file_types(),
        }
    }
}

fn default_max_file_size_bytes() -> u64 {
    DEFAULT_MAX_FILE_SIZE_BYTES
}

fn file_type(mime: &str, extensions: &[&str], signature: &str) -> FileTypeConfig {
    FileTypeConfig {
        mime: mime.to_string(),
        extensions: extensions.iter().map(|ext| ext.to_string()).collect(),
        signature: signature.to_string(),
    }
}

pub fn default_file_types() -> Vec<FileTypeConfig> {
    vec![
        file_type("image/jpeg", &["jpg", "jpeg"], "ffd8ff"),
        file_type("image/png", &["png"], "89504e470d0a1a0a"),
        file_type("image/gif", &["gif"], "47494638"),
        // RIFF container; WEBP fourcc sits at offset 8
        file_type("image/webp", &["webp"], "52494646"),
        file_type("application/pdf", &["pdf"], "25504446"),
    ]
}

#[derive(Debug, Clone)]
pub struct ValidatedUploadConfig {
    pub max_file_size_bytes: u64,
    pub registry: FileTypeRegistry,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SsrfConfig {
    #[serde(default = "default_blocked_hosts")]
    pub blocked_hosts: Vec<String>,
    #[serde(default = "default_blocked_scheme_markers")]
    pub blocked_scheme_markers: Vec<String>,
}

impl Default for SsrfConfig {
    fn default() -> Self {
        Self {
            blocked_hosts: default_blocked_hosts(),
            blocked_scheme_markers: default_blocked_scheme_markers(),
        }
    }
}

fn default_blocked_hosts() -> Vec<String> {
    [
        "localhost",
        "127.0.0.1",
        "0.0.0.0",
        "::1",
        "169.254.169.254",
        "metadata.google.internal",
        "metadata.azure.com",
    ]
    .iter()
    .map(|host| host.to_string())
    .collect()
}

fn default_blocked_scheme_markers() -> Vec<String> {
    [
        "file:",
        "ftp:",
        "gopher:",
        "data:",
        "javascript:",
        "vbscript:",
        "dict:",
        "ldap:",
        "jar:",
        "tftp:",
        "sftp:",
    ]
    .iter()
    .map(|marker| marker.to_string())
    .collect()
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SecurityConfig {
    #[serde(default = "default_hsts_enabled")]
    pub hsts_enabled: bool,
    #[serde(default = "default_hsts_max_age")]
    pub hsts_max_age: u64,
    #[serde(default = "default_hsts_include_subdomains")]
    pub hsts_include_subdomains: bool,
    #[serde(default)]
    pub hsts_preload: bool,
    #[serde(default = "default_content_security_policy")]
    pub content_security_policy: String,
    #[serde(default = "default_frame_options")]
    pub frame_options: String,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            hsts_enabled: default_hsts_enabled(),
            hsts_max_age: default_hsts_max_age(),
            hsts_include_subdomains: default_hsts_include_subdomains(),
            hsts_preload: false,
            content_security_policy: default_content_security_policy(),
            frame_options: default_frame_options(),
        }
    }
}

fn default_hsts_enabled() -> bool {
    false
}

fn default_hsts_max_age() -> u64 {
    31536000
}

fn default_hsts_include_subdomains() -> bool {
    true
}

fn default_content_security_policy() -> String {
    "default-src 'self'; img-src 'self' data:; style-src 'self'; script-src 'self'; object-src 'none'; frame-ancestors 'none'; base-uri 'self'; form-action 'self';".to_string()
}

fn default_frame_options() -> String {
    "DENY".to_string()
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub app: AppConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    pub session: SessionConfig,
    #[serde(default)]
    pub routes: RoutesConfig,
    #[serde(default)]
    pub uploads: UploadConfig,
    #[serde(default)]
    pub ssrf: SsrfConfig,
    #[serde(default)]
    pub security: SecurityConfig,
}

#[derive(Debug, Clone)]
pub struct ValidatedConfig {
    pub server: ServerConfig,
    pub app: AppConfig,
    pub logging: LoggingConfig,
    pub session: ValidatedSessionConfig,
    pub routes: RoutesConfig,
    pub uploads: ValidatedUploadConfig,
    pub ssrf: SsrfConfig,
    pub security: SecurityConfig,
}

impl Config {
    pub fn load(root: &Path) -> Result<Self, ConfigError> {
        let config_path = root.join(CONFIG_FILE_NAME);
        let config_content = fs::read_to_string(&config_path).map_err(|e| {
            ConfigError::LoadError(format!(
                "Failed to read config file '{}': {}",
                config_path.display(),
                e
            ))
        })?;
        Self::from_yaml_str(&config_content).map_err(|e| match e {
            ConfigError::LoadError(msg) => ConfigError::LoadError(format!(
                "Failed to parse config file '{}': {}",
                config_path.display(),
                msg
            )),
            other => other,
        })
    }

    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(content).map_err(|e| ConfigError::LoadError(e.to_string()))
    }

    /// Loads and validates configuration at startup. If validation fails, the application
    /// should not start.
    pub fn load_and_validate(root: &Path) -> Result<ValidatedConfig, ConfigError> {
        Self::load(root)?.validate()
    }

    pub fn validate(self) -> Result<ValidatedConfig, ConfigError> {
        let session = Self::validate_session(self.session)?;
        Self::validate_routes(&self.routes)?;
        let uploads = Self::validate_uploads(&self.uploads)?;
        Self::validate_ssrf(&self.ssrf)?;
        Self::validate_logging(&self.logging)?;

        if self.server.workers == 0 {
            return Err(ConfigError::ValidationError(
                "server.workers must be at least 1".to_string(),
            ));
        }

        if !self.security.hsts_enabled
            && !matches!(self.server.host.as_str(), "127.0.0.1" | "localhost" | "::1")
        {
            warn!(
                "HSTS is disabled while listening on {}; enable security.hsts_enabled behind TLS",
                self.server.host
            );
        }

        Ok(ValidatedConfig {
            server: self.server,
            app: self.app,
            logging: self.logging,
            session,
            routes: self.routes,
            uploads,
            ssrf: self.ssrf,
            security: self.security,
        })
    }

    fn validate_session(session: SessionConfig) -> Result<ValidatedSessionConfig, ConfigError> {
        if session.cookie_name.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "session.cookie_name cannot be empty".to_string(),
            ));
        }

        let verifier = match session.mode {
            SessionMode::Jwt => {
                let jwt = session.jwt.ok_or_else(|| {
                    ConfigError::ValidationError(
                        "Session mode 'jwt' requires a 'session.jwt' section".to_string(),
                    )
                })?;
                if jwt.secret.chars().count() < MIN_JWT_SECRET_CHARS {
                    return Err(ConfigError::ValidationError(format!(
                        "session.jwt.secret must be at least {} characters",
                        MIN_JWT_SECRET_CHARS
                    )));
                }
                if !(10..=90).contains(&jwt.refresh_threshold_percentage) {
                    return Err(ConfigError::ValidationError(format!(
                        "JWT refresh_threshold_percentage must be between 10 and 90, got: {}",
                        jwt.refresh_threshold_percentage
                    )));
                }
                if !(1..=MAX_JWT_EXPIRATION_HOURS).contains(&jwt.expiration_hours) {
                    return Err(ConfigError::ValidationError(format!(
                        "JWT expiration_hours must be between 1 and {}, got: {}",
                        MAX_JWT_EXPIRATION_HOURS, jwt.expiration_hours
                    )));
                }
                SessionVerifierConfig::Jwt(jwt)
            }
            SessionMode::Remote => {
                let remote = session.remote.ok_or_else(|| {
                    ConfigError::ValidationError(
                        "Session mode 'remote' requires a 'session.remote' section".to_string(),
                    )
                })?;
                let endpoint = url::Url::parse(&remote.user_endpoint).map_err(|e| {
                    ConfigError::ValidationError(format!(
                        "session.remote.user_endpoint is not a valid URL: {}",
                        e
                    ))
                })?;
                if !matches!(endpoint.scheme(), "http" | "https") {
                    return Err(ConfigError::ValidationError(
                        "session.remote.user_endpoint must use http or https".to_string(),
                    ));
                }
                if remote.timeout_ms == 0 {
                    return Err(ConfigError::ValidationError(
                        "session.remote.timeout_ms must be greater than 0".to_string(),
                    ));
                }
                SessionVerifierConfig::Remote(remote)
            }
        };

        Ok(ValidatedSessionConfig {
            cookie_name: session.cookie_name,
            verifier,
        })
    }

    fn validate_routes(routes: &RoutesConfig) -> Result<(), ConfigError> {
        let named_paths = [
            ("routes.login_path", routes.login_path.as_str()),
            ("routes.landing_path", routes.landing_path.as_str()),
        ];
        let prefixes = routes
            .protected_prefixes
            .iter()
            .map(|p| ("routes.protected_prefixes", p.as_str()))
            .chain(
                routes
                    .auth_only_prefixes
                    .iter()
                    .map(|p| ("routes.auth_only_prefixes", p.as_str())),
            );

        for (field, path) in named_paths.into_iter().chain(prefixes) {
            if !path.starts_with('/') || path.starts_with("//") {
                return Err(ConfigError::ValidationError(format!(
                    "{} entries must be absolute local paths, got: '{}'",
                    field, path
                )));
            }
        }

        if routes.return_param.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "routes.return_param cannot be empty".to_string(),
            ));
        }

        // A protected login page would redirect to itself forever
        if routes
            .protected_prefixes
            .iter()
            .any(|prefix| crate::security::path_matches_prefix(&routes.login_path, prefix))
        {
            return Err(ConfigError::ValidationError(format!(
                "routes.login_path '{}' cannot be inside a protected prefix",
                routes.login_path
            )));
        }

        if routes
            .auth_only_prefixes
            .iter()
            .any(|prefix| crate::security::path_matches_prefix(&routes.landing_path, prefix))
        {
            return Err(ConfigError::ValidationError(format!(
                "routes.landing_path '{}' cannot be inside an auth-only prefix",
                routes.landing_path
            )));
        }

        Ok(())
    }

    fn validate_uploads(uploads: &UploadConfig) -> Result<ValidatedUploadConfig, ConfigError> {
        if uploads.max_file_size_bytes == 0 {
            return Err(ConfigError::ValidationError(
                "uploads.max_file_size_bytes must be greater than 0".to_string(),
            ));
        }
        let registry = FileTypeRegistry::from_config(&uploads.file_types)
            .map_err(|e| ConfigError::ValidationError(format!("uploads.file_types: {}", e)))?;
        if registry.is_empty() {
            return Err(ConfigError::ValidationError(
                "uploads.file_types must register at least one type".to_string(),
            ));
        }
        Ok(ValidatedUploadConfig {
            max_file_size_bytes: uploads.max_file_size_bytes,
            registry,
        })
    }

    fn validate_ssrf(ssrf: &SsrfConfig) -> Result<(), ConfigError> {
        if ssrf
            .blocked_scheme_markers
            .iter()
            .any(|marker| marker.trim().is_empty())
        {
            return Err(ConfigError::ValidationError(
                "ssrf.blocked_scheme_markers cannot contain empty entries".to_string(),
            ));
        }
        if ssrf.blocked_hosts.iter().any(|host| host.trim().is_empty()) {
            return Err(ConfigError::ValidationError(
                "ssrf.blocked_hosts cannot contain empty entries".to_string(),
            ));
        }
        Ok(())
    }

    fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
        match logging.level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
            other => Err(ConfigError::ValidationError(format!(
                "logging.level must be one of trace, debug, info, warn, error; got: {}",
                other
            ))),
        }
    }
}

impl ValidatedConfig {
    pub fn is_localhost_only(&self) -> bool {
        matches!(self.server.host.as_str(), "127.0.0.1" | "localhost" | "::1")
    }

    pub fn log_level(&self) -> log::LevelFilter {
        match self.logging.level.to_lowercase().as_str() {
            "trace" => log::LevelFilter::Trace,
            "debug" => log::LevelFilter::Debug,
            "warn" => log::LevelFilter::Warn,
            "error" => log::LevelFilter::Error,
            _ => log::LevelFilter::Info,
        }
    }
}
