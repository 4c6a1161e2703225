// This file is part of the product Gatehouse.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use super::jwt::JwtSessionVerifier;
use super::remote::RemoteSessionVerifier;
use super::types::Principal;
use crate::config::{SessionVerifierConfig, ValidatedConfig};
use actix_web::cookie::Cookie;
use async_trait::async_trait;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub enum SessionError {
    /// Token is malformed, expired or rejected by the issuer.
    Invalid,
    /// The verifier could not reach a verdict (network, timeout, bad response).
    Unavailable,
    Configuration(String),
}

impl SessionError {
    pub fn kind(&self) -> &'static str {
        match self {
            SessionError::Invalid => "invalid",
            SessionError::Unavailable => "unavailable",
            SessionError::Configuration(_) => "configuration",
        }
    }
}

impl std::fmt::Display for SessionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionError::Invalid => write!(f, "Session token is invalid"),
            SessionError::Unavailable => write!(f, "Session verifier is unavailable"),
            SessionError::Configuration(msg) => write!(f, "Session configuration error: {}", msg),
        }
    }
}

impl std::error::Error for SessionError {}

#[derive(Debug, Clone)]
pub struct VerifiedSession {
    pub principal: Principal,
    /// Replacement session cookie to send back with the response, if any.
    pub refreshed_cookie: Option<Cookie<'static>>,
}

impl VerifiedSession {
    pub fn new(principal: Principal) -> Self {
        Self {
            principal,
            refreshed_cookie: None,
        }
    }
}

/// Turns a session token into a principal.
#[async_trait]
pub trait SessionVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<VerifiedSession, SessionError>;
}

pub fn build_session_verifier(
    config: &ValidatedConfig,
) -> Result<Arc<dyn SessionVerifier>, SessionError> {
    let cookie_name = &config.session.cookie_name;
    match &config.session.verifier {
        SessionVerifierConfig::Jwt(jwt) => Ok(Arc::new(JwtSessionVerifier::new(
            jwt,
            cookie_name,
            config.is_localhost_only(),
        ))),
        SessionVerifierConfig::Remote(remote) => {
            Ok(Arc::new(RemoteSessionVerifier::new(remote)?))
        }
    }
}
