// This file is part of the product Gatehouse.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use crate::config::{Config, ConfigError, ValidatedConfig};
use std::error::Error;
use std::fmt;
use std::path::Path;

pub mod config;

#[derive(Debug)]
pub struct BootstrapResult {
    pub validated_config: ValidatedConfig,
    pub created_config: bool,
}

#[derive(Debug)]
pub enum BootstrapError {
    Config(ConfigError),
    Io(std::io::Error),
}

impl fmt::Display for BootstrapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BootstrapError::Config(err) => write!(f, "{}", err),
            BootstrapError::Io(err) => write!(f, "Bootstrap I/O error: {}", err),
        }
    }
}

impl Error for BootstrapError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            BootstrapError::Config(err) => Some(err),
            BootstrapError::Io(err) => Some(err),
        }
    }
}

impl From<ConfigError> for BootstrapError {
    fn from(err: ConfigError) -> Self {
        BootstrapError::Config(err)
    }
}

impl From<std::io::Error> for BootstrapError {
    fn from(err: std::io::Error) -> Self {
        BootstrapError::Io(err)
    }
}

pub fn bootstrap_runtime(root: &Path) -> Result<BootstrapResult, BootstrapError> {
    let created_config = config::ensure_config(root)?;

    let validated_config = Config::load_and_validate(root).map_err(BootstrapError::Config)?;

    Ok(BootstrapResult {
        validated_config,
        created_config,
    })
}

pub(crate) fn log_action(message: impl AsRef<str>) {
    eprintln!("[bootstrap] {}", message.as_ref());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SessionVerifierConfig;
    use crate::util::test_fixtures::TestFixtureRoot;
    use std::fs;

    #[test]
    fn bootstrap_creates_defaults_when_missing() {
        let fixture = TestFixtureRoot::new_unique("bootstrap-default").unwrap();
        let result = bootstrap_runtime(fixture.path()).expect("bootstrap should succeed");

        assert!(result.created_config);
        let config = result.validated_config;
        assert_eq!(config.server.port, 7080);
        assert_eq!(config.routes.login_path, "/login");
        assert_eq!(config.uploads.max_file_size_bytes, 10 * 1024 * 1024);
        match &config.session.verifier {
            SessionVerifierConfig::Jwt(jwt) => assert_eq!(jwt.secret.len(), 64),
            SessionVerifierConfig::Remote(_) => panic!("expected jwt mode"),
        }
    }

    #[test]
    fn bootstrap_is_idempotent() {
        let fixture = TestFixtureRoot::new_unique("bootstrap-idempotent").unwrap();
        let first = bootstrap_runtime(fixture.path()).expect("bootstrap should succeed");
        assert!(first.created_config);

        let config_path = fixture.config_file();
        let config_before = fs::read_to_string(&config_path).unwrap();

        let second = bootstrap_runtime(fixture.path()).expect("bootstrap should succeed");
        assert!(!second.created_config);
        assert_eq!(config_before, fs::read_to_string(&config_path).unwrap());
    }

    #[test]
    fn bootstrap_reports_invalid_existing_config() {
        let fixture = TestFixtureRoot::new_unique("bootstrap-invalid").unwrap();
        fixture
            .write_config("session:\n  jwt:\n    secret: \"short\"\n")
            .unwrap();

        let err = bootstrap_runtime(fixture.path()).unwrap_err();
        assert!(matches!(err, BootstrapError::Config(ConfigError::ValidationError(_))));
    }

    #[test]
    fn bootstrap_creates_missing_root() {
        let fixture = TestFixtureRoot::new_unique("bootstrap-nested").unwrap();
        let nested = fixture.path().join("a").join("b");
        let result = bootstrap_runtime(&nested).expect("bootstrap should succeed");
        assert!(result.created_config);
        assert!(nested.join("config.yaml").exists());
    }
}
