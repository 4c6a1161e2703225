// This file is part of the product Gatehouse.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use std::sync::Arc;

use crate::config::ValidatedConfig;
use crate::iam::{SessionError, SessionVerifier, build_session_verifier};
use crate::security::{RouteGuardPolicy, SsrfGuard, UploadValidator};

/// Shared, immutable request-time collaborators. One instance per process.
pub struct AppState {
    pub config: Arc<ValidatedConfig>,
    pub ssrf_guard: SsrfGuard,
    pub upload_validator: UploadValidator,
    pub route_policy: Arc<RouteGuardPolicy>,
    pub session_verifier: Arc<dyn SessionVerifier>,
}

impl AppState {
    pub fn new(config: Arc<ValidatedConfig>) -> Result<Self, SessionError> {
        let session_verifier = build_session_verifier(&config)?;
        Ok(Self::with_verifier(config, session_verifier))
    }

    /// Builds the state around an existing verifier, e.g. one shared with a login flow.
    pub fn with_verifier(
        config: Arc<ValidatedConfig>,
        session_verifier: Arc<dyn SessionVerifier>,
    ) -> Self {
        Self {
            ssrf_guard: SsrfGuard::new(&config.ssrf),
            upload_validator: UploadValidator::new(
                config.uploads.max_file_size_bytes,
                config.uploads.registry.clone(),
            ),
            route_policy: Arc::new(RouteGuardPolicy::from_config(&config.routes)),
            session_verifier,
            config,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::test_config;

    #[test]
    fn state_follows_configuration() {
        let state = AppState::new(Arc::new(test_config())).expect("app state");
        assert_eq!(state.route_policy.login_path(), "/login");
        assert!(state.route_policy.is_protected("/dashboard/reports"));
        assert_eq!(state.upload_validator.max_file_size(), 10 * 1024 * 1024);
        assert!(!state.ssrf_guard.is_allowed("http://127.0.0.1/"));
    }
}
