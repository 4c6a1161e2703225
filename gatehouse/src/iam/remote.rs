// This file is part of the product Gatehouse.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use super::session::{SessionError, SessionVerifier, VerifiedSession};
use super::types::Principal;
use crate::config::RemoteSessionConfig;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;

const API_KEY_HEADER: &str = "apikey";

#[derive(Debug, Deserialize)]
struct RemoteUser {
    id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    user_metadata: RemoteUserMetadata,
}

#[derive(Debug, Default, Deserialize)]
struct RemoteUserMetadata {
    #[serde(default)]
    full_name: Option<String>,
    #[serde(default)]
    name: Option<String>,
}

impl RemoteUser {
    fn into_principal(self) -> Principal {
        let display_name = self
            .user_metadata
            .full_name
            .or(self.user_metadata.name)
            .filter(|name| !name.trim().is_empty())
            .or_else(|| self.email.clone())
            .unwrap_or_else(|| self.id.clone());
        Principal {
            subject: self.id,
            display_name,
            email: self.email,
        }
    }
}

/// Asks a hosted auth service who owns a bearer token. One request per check,
/// bounded by the configured timeout, no retries.
pub struct RemoteSessionVerifier {
    client: Client,
    user_endpoint: String,
    api_key: Option<String>,
}

impl RemoteSessionVerifier {
    pub fn new(config: &RemoteSessionConfig) -> Result<Self, SessionError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| SessionError::Configuration(e.to_string()))?;
        Ok(Self {
            client,
            user_endpoint: config.user_endpoint.clone(),
            api_key: config.api_key.clone(),
        })
    }
}

fn status_error(status: StatusCode) -> SessionError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => SessionError::Invalid,
        _ => SessionError::Unavailable,
    }
}

#[async_trait]
impl SessionVerifier for RemoteSessionVerifier {
    async fn verify(&self, token: &str) -> Result<VerifiedSession, SessionError> {
        let mut request = self.client.get(&self.user_endpoint).bearer_auth(token);
        if let Some(api_key) = &self.api_key {
            request = request.header(API_KEY_HEADER, api_key);
        }

        let response = request.send().await.map_err(|e| {
            log::debug!("Remote session check failed: timeout={}", e.is_timeout());
            SessionError::Unavailable
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(status_error(status));
        }

        let user: RemoteUser = response
            .json()
            .await
            .map_err(|_| SessionError::Unavailable)?;
        if user.id.trim().is_empty() {
            return Err(SessionError::Invalid);
        }

        Ok(VerifiedSession::new(user.into_principal()))
    }
}
