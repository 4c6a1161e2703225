// This file is part of the product Gatehouse.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

#![allow(dead_code)]

use crate::config::{
    AppConfig, Config, JwtConfig, LoggingConfig, RemoteSessionConfig, RoutesConfig,
    SecurityConfig, ServerConfig, SessionConfig, SessionMode, SsrfConfig, UploadConfig,
    ValidatedConfig,
};

pub const TEST_JWT_SECRET: &str = "test-secret-0123456789abcdef";

#[derive(Debug)]
pub struct TestConfigBuilder {
    config: Config,
}

impl Default for TestConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TestConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config {
                server: ServerConfig {
                    host: "127.0.0.1".to_string(),
                    port: 5466,
                    workers: 1,
                },
                app: AppConfig {
                    name: "Test App".to_string(),
                },
                logging: LoggingConfig::default(),
                session: SessionConfig {
                    cookie_name: "test_session".to_string(),
                    mode: SessionMode::Jwt,
                    jwt: Some(JwtConfig {
                        secret: TEST_JWT_SECRET.to_string(),
                        issuer: "gatehouse".to_string(),
                        audience: "gatehouse-users".to_string(),
                        expiration_hours: 12,
                        disable_refresh: false,
                        refresh_threshold_percentage: 50,
                    }),
                    remote: None,
                },
                routes: RoutesConfig::default(),
                uploads: UploadConfig::default(),
                ssrf: SsrfConfig::default(),
                security: SecurityConfig::default(),
            },
        }
    }

    pub fn with_app_name(mut self, name: &str) -> Self {
        self.config.app.name = name.to_string();
        self
    }

    pub fn with_protected_prefixes(mut self, prefixes: &[&str]) -> Self {
        self.config.routes.protected_prefixes = prefixes.iter().map(|p| p.to_string()).collect();
        self
    }

    pub fn with_return_param(mut self, name: &str) -> Self {
        self.config.routes.return_param = name.to_string();
        self
    }

    pub fn with_max_file_size(mut self, bytes: u64) -> Self {
        self.config.uploads.max_file_size_bytes = bytes;
        self
    }

    pub fn with_remote_session(mut self, user_endpoint: &str) -> Self {
        self.config.session.mode = SessionMode::Remote;
        self.config.session.remote = Some(RemoteSessionConfig {
            user_endpoint: user_endpoint.to_string(),
            api_key: None,
            timeout_ms: 500,
        });
        self
    }

    pub fn with_hsts(mut self, enabled: bool) -> Self {
        self.config.security.hsts_enabled = enabled;
        self
    }

    pub fn build(self) -> ValidatedConfig {
        self.config
            .validate()
            .expect("test configuration should validate")
    }
}

pub fn test_config() -> ValidatedConfig {
    TestConfigBuilder::new().build()
}
