// This file is part of the product Gatehouse.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use super::types::{Claims, JwtError};
use crate::config::{JwtConfig, MAX_JWT_EXPIRATION_HOURS};
use crate::iam::Principal;
use crate::iam::session::{SessionError, SessionVerifier, VerifiedSession};
use actix_web::cookie::{Cookie, SameSite};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use uuid::Uuid;

/// Local HS256 session tokens with sliding refresh.
pub struct JwtSessionVerifier {
    secret: String,
    issuer: String,
    audience: String,
    lifetime: Duration,
    cookie_name: String,
    is_localhost: bool,
    disable_refresh: bool,
    refresh_threshold_percentage: u32,
}

impl JwtSessionVerifier {
    pub fn new(config: &JwtConfig, cookie_name: &str, is_localhost: bool) -> Self {
        JwtSessionVerifier {
            secret: config.secret.clone(),
            issuer: config.issuer.clone(),
            audience: config.audience.clone(),
            lifetime: token_lifetime(config.expiration_hours),
            cookie_name: cookie_name.to_string(),
            is_localhost,
            disable_refresh: config.disable_refresh,
            refresh_threshold_percentage: config.refresh_threshold_percentage,
        }
    }

    fn sign(&self, claims: &Claims) -> Result<String, JwtError> {
        encode(
            &Header::new(Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(self.secret.as_ref()),
        )
        .map_err(|e| JwtError::TokenCreationError(e.to_string()))
    }

    /// Create a session token for a principal
    pub fn create_token(&self, principal: &Principal) -> Result<String, JwtError> {
        let now = Utc::now();
        let expiration = now + self.lifetime;

        let claims = Claims {
            sub: principal.subject.clone(),
            name: principal.display_name.clone(),
            email: principal.email.clone(),
            iat: now.timestamp(),
            exp: expiration.timestamp(),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            jti: Uuid::new_v4().to_string(),
        };

        self.sign(&claims)
    }

    /// Verify a token and return its claims
    pub fn verify_token(&self, token: &str) -> Result<Claims, JwtError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.issuer]);
        validation.set_audience(&[&self.audience]);

        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_ref()),
            &validation,
        )
        .map_err(|e| JwtError::TokenVerificationError(e.to_string()))?;

        Ok(token_data.claims)
    }

    /// HTTP-only session cookie carrying `token`. `Secure` unless serving localhost only.
    pub fn create_auth_cookie(&self, token: &str) -> Cookie<'static> {
        let expiration = Utc::now() + self.lifetime;

        let expires = match actix_web::cookie::time::OffsetDateTime::from_unix_timestamp(
            expiration.timestamp(),
        ) {
            Ok(val) => val,
            Err(e) => {
                log::error!(
                    "Failed to convert expiration timestamp for session cookie: {}",
                    e
                );
                actix_web::cookie::time::OffsetDateTime::UNIX_EPOCH
            }
        };

        Cookie::build(self.cookie_name.clone(), token.to_string())
            .path("/")
            .secure(!self.is_localhost)
            .http_only(true)
            .same_site(SameSite::Lax)
            .expires(expires)
            .finish()
    }

    /// True once the token has used up the configured share of its lifetime
    pub fn should_refresh_token(&self, claims: &Claims) -> bool {
        if self.disable_refresh {
            return false;
        }

        let now = Utc::now().timestamp();
        let token_age_seconds = now - claims.iat;
        let token_lifetime_seconds = claims.exp - claims.iat;
        let threshold_seconds = (token_lifetime_seconds as f64
            * self.refresh_threshold_percentage as f64
            / 100.0) as i64;

        token_age_seconds >= threshold_seconds
    }

    /// Same identity, fresh timestamps and JWT ID
    pub fn create_refreshed_token(&self, old_claims: &Claims) -> Result<String, JwtError> {
        let now = Utc::now();
        let expiration = now + self.lifetime;

        let new_claims = Claims {
            sub: old_claims.sub.clone(),
            name: old_claims.name.clone(),
            email: old_claims.email.clone(),
            iat: now.timestamp(),
            exp: expiration.timestamp(),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            jti: Uuid::new_v4().to_string(),
        };

        self.sign(&new_claims)
    }
}

/// Clamped so an unvalidated config cannot overflow the timestamp range.
fn token_lifetime(expiration_hours: u64) -> Duration {
    let hours = expiration_hours.clamp(1, MAX_JWT_EXPIRATION_HOURS) as i64;
    Duration::hours(hours)
}

#[async_trait]
impl SessionVerifier for JwtSessionVerifier {
    async fn verify(&self, token: &str) -> Result<VerifiedSession, SessionError> {
        let claims = self.verify_token(token).map_err(|_| SessionError::Invalid)?;
        let mut session = VerifiedSession::new(claims.principal());

        if self.should_refresh_token(&claims) {
            match self.create_refreshed_token(&claims) {
                Ok(new_token) => {
                    session.refreshed_cookie = Some(self.create_auth_cookie(&new_token));
                    log::debug!("Session token refreshed for subject: {}", claims.sub);
                }
                Err(e) => {
                    log::error!(
                        "Failed to create refreshed token for subject {}: {}",
                        claims.sub,
                        e
                    );
                }
            }
        }

        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_verifier(expiration_hours: u64, refresh_percentage: u32) -> JwtSessionVerifier {
        let config = JwtConfig {
            secret: "test-secret-key-0123456789".to_string(),
            issuer: "test-issuer".to_string(),
            audience: "test-audience".to_string(),
            expiration_hours,
            disable_refresh: false,
            refresh_threshold_percentage: refresh_percentage,
        };
        JwtSessionVerifier::new(&config, "test_session", true)
    }

    fn create_test_claims(iat_hours_ago: i64, exp_hours_from_now: i64) -> Claims {
        let now = Utc::now();
        Claims {
            sub: "user-42".to_string(),
            name: "Test User".to_string(),
            email: Some("test@example.com".to_string()),
            iat: (now - Duration::hours(iat_hours_ago)).timestamp(),
            exp: (now + Duration::hours(exp_hours_from_now)).timestamp(),
            iss: "test-issuer".to_string(),
            aud: "test-audience".to_string(),
            jti: "test-jti".to_string(),
        }
    }

    #[test]
    fn oversized_lifetime_is_clamped() {
        let verifier = create_test_verifier(10_000_000_000_000, 50);
        assert_eq!(verifier.lifetime, Duration::hours(87_600));
        let token = verifier
            .create_token(&Principal::new("u", "U"))
            .expect("token with clamped lifetime");
        let claims = verifier.verify_token(&token).expect("token verifies");
        assert!(claims.exp > claims.iat);
        assert!(!verifier.should_refresh_token(&claims));
    }

    #[test]
    fn fresh_token_is_not_refreshed() {
        let verifier = create_test_verifier(2, 50);
        assert!(!verifier.should_refresh_token(&create_test_claims(0, 2)));
    }

    #[test]
    fn token_past_threshold_is_refreshed() {
        let verifier = create_test_verifier(2, 50);
        assert!(verifier.should_refresh_token(&create_test_claims(1, 1)));
    }

    #[test]
    fn refresh_can_be_disabled() {
        let mut verifier = create_test_verifier(2, 10);
        verifier.disable_refresh = true;
        assert!(!verifier.should_refresh_token(&create_test_claims(1, 1)));
    }

    #[test]
    fn token_round_trip_preserves_principal() {
        let verifier = create_test_verifier(12, 50);
        let principal = Principal::new("user-7", "Ada").with_email("ada@example.com");
        let token = verifier.create_token(&principal).unwrap();
        let claims = verifier.verify_token(&token).unwrap();
        assert_eq!(claims.principal(), principal);
    }

    #[test]
    fn tokens_from_other_secrets_are_rejected() {
        let verifier = create_test_verifier(12, 50);
        let other = JwtSessionVerifier::new(
            &JwtConfig {
                secret: "another-secret-value-000000".to_string(),
                issuer: "test-issuer".to_string(),
                audience: "test-audience".to_string(),
                expiration_hours: 12,
                disable_refresh: false,
                refresh_threshold_percentage: 50,
            },
            "test_session",
            true,
        );
        let token = other.create_token(&Principal::new("x", "X")).unwrap();
        assert!(verifier.verify_token(&token).is_err());
        assert!(verifier.verify_token("not-a-jwt").is_err());
    }

    #[test]
    fn expired_tokens_are_rejected() {
        let verifier = create_test_verifier(2, 50);
        let token = verifier.sign(&create_test_claims(4, -2)).unwrap();
        assert!(verifier.verify_token(&token).is_err());
    }

    #[test]
    fn create_refreshed_token_keeps_identity() {
        let verifier = create_test_verifier(12, 50);
        let old_claims = create_test_claims(6, 6);

        let new_token = verifier.create_refreshed_token(&old_claims).unwrap();
        let new_claims = verifier.verify_token(&new_token).unwrap();

        assert_eq!(new_claims.sub, old_claims.sub);
        assert_eq!(new_claims.name, old_claims.name);
        assert_eq!(new_claims.email, old_claims.email);
        assert!(new_claims.iat > old_claims.iat);
        assert!(new_claims.exp > old_claims.exp);
        assert_ne!(new_claims.jti, old_claims.jti);
    }

    #[test]
    fn localhost_cookie_is_not_secure() {
        let cookie = create_test_verifier(12, 50).create_auth_cookie("tok");
        assert_eq!(cookie.name(), "test_session");
        assert_eq!(cookie.http_only(), Some(true));
        assert_ne!(cookie.secure(), Some(true));

        let config = JwtConfig {
            secret: "test-secret-key-0123456789".to_string(),
            issuer: "i".to_string(),
            audience: "a".to_string(),
            expiration_hours: 1,
            disable_refresh: false,
            refresh_threshold_percentage: 50,
        };
        let public = JwtSessionVerifier::new(&config, "s", false).create_auth_cookie("tok");
        assert_eq!(public.secure(), Some(true));
    }

    #[actix_web::test]
    async fn verify_attaches_refresh_cookie_for_aging_tokens() {
        let verifier = create_test_verifier(12, 50);

        let fresh = verifier.create_token(&Principal::new("u", "U")).unwrap();
        let session = verifier.verify(&fresh).await.unwrap();
        assert_eq!(session.principal.subject, "u");
        assert!(session.refreshed_cookie.is_none());

        let aging = verifier.sign(&create_test_claims(7, 5)).unwrap();
        let session = verifier.verify(&aging).await.unwrap();
        assert_eq!(session.principal.subject, "user-42");
        assert!(session.refreshed_cookie.is_some());

        assert!(matches!(
            verifier.verify("garbage").await,
            Err(SessionError::Invalid)
        ));
    }
}
