// This file is part of the product Gatehouse.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

#![allow(dead_code)]

use actix_web::cookie::Cookie;
use actix_web::dev::ServiceResponse;
use actix_web::{body::MessageBody, test};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use gatehouse::app_state::AppState;
use gatehouse::config::ValidatedConfig;
use gatehouse::iam::jwt::Claims;
use gatehouse::iam::{
    JwtSessionVerifier, Principal, SessionError, SessionVerifier, VerifiedSession,
};
use gatehouse::util::test_config::{TEST_JWT_SECRET, TestConfigBuilder};
use jsonwebtoken::{EncodingKey, Header, encode};
use serde_json::Value;
use std::sync::Arc;

pub const JPEG_BYTES: &[u8] = &[
    0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, 0x4A, 0x46, 0x49, 0x46, 0x00, 0x01, 0x01, 0x00, 0x00, 0x01,
];
pub const PNG_BYTES: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44, 0x52,
];

pub struct TestHarness {
    pub config: Arc<ValidatedConfig>,
    pub app_state: Arc<AppState>,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_builder(TestConfigBuilder::new())
    }

    pub fn with_builder(builder: TestConfigBuilder) -> Self {
        let config = Arc::new(builder.build());
        let app_state = Arc::new(AppState::new(config.clone()).expect("app state"));
        Self { config, app_state }
    }

    /// Harness whose session verifier always fails, as an unreachable auth backend would.
    pub fn with_unavailable_verifier() -> Self {
        let config = Arc::new(TestConfigBuilder::new().build());
        let app_state = Arc::new(AppState::with_verifier(
            config.clone(),
            Arc::new(UnavailableVerifier),
        ));
        Self { config, app_state }
    }

    fn jwt_verifier(&self) -> JwtSessionVerifier {
        let jwt = self.config.session.jwt().expect("jwt session config");
        JwtSessionVerifier::new(jwt, &self.config.session.cookie_name, true)
    }

    pub fn session_cookie(&self, principal: &Principal) -> Cookie<'static> {
        let verifier = self.jwt_verifier();
        let token = verifier.create_token(principal).expect("session token");
        verifier.create_auth_cookie(&token)
    }

    /// Cookie whose token was issued `age_hours` ago, for exercising sliding refresh.
    pub fn aged_session_cookie(&self, principal: &Principal, age_hours: i64) -> Cookie<'static> {
        let jwt = self.config.session.jwt().expect("jwt session config");
        let issued = Utc::now() - Duration::hours(age_hours);
        let claims = Claims {
            sub: principal.subject.clone(),
            name: principal.display_name.clone(),
            email: principal.email.clone(),
            iat: issued.timestamp(),
            exp: (issued + Duration::hours(jwt.expiration_hours as i64)).timestamp(),
            iss: jwt.issuer.clone(),
            aud: jwt.audience.clone(),
            jti: "aged-token".to_string(),
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(TEST_JWT_SECRET.as_bytes()),
        )
        .expect("encode aged token");
        Cookie::new(self.config.session.cookie_name.clone(), token)
    }

    pub fn cookie_name(&self) -> &str {
        &self.config.session.cookie_name
    }
}

pub fn alice() -> Principal {
    Principal::new("user-alice", "Alice").with_email("alice@example.com")
}

struct UnavailableVerifier;

#[async_trait]
impl SessionVerifier for UnavailableVerifier {
    async fn verify(&self, _token: &str) -> Result<VerifiedSession, SessionError> {
        Err(SessionError::Unavailable)
    }
}

pub fn location<B>(resp: &ServiceResponse<B>) -> Option<String> {
    resp.headers()
        .get("location")
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

pub fn header<B>(resp: &ServiceResponse<B>, name: &str) -> Option<String> {
    resp.headers()
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

pub async fn read_json<B: MessageBody>(resp: ServiceResponse<B>) -> Value {
    let body = test::read_body(resp).await;
    serde_json::from_slice(&body).expect("json body")
}

pub async fn read_text<B: MessageBody>(resp: ServiceResponse<B>) -> String {
    let body = test::read_body(resp).await;
    String::from_utf8(body.to_vec()).expect("utf-8 body")
}
