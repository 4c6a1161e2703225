// This file is part of the product Gatehouse.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use crate::config::SecurityConfig;
use crate::security::RouteGuardPolicy;
use actix_web::dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready};
use actix_web::http::header::{
    CACHE_CONTROL, CONTENT_SECURITY_POLICY, HeaderMap, HeaderName, HeaderValue, PRAGMA,
    STRICT_TRANSPORT_SECURITY, X_CONTENT_TYPE_OPTIONS, X_FRAME_OPTIONS,
};
use actix_web::{Error, HttpMessage, HttpRequest};
use futures_util::future::{LocalBoxFuture, Ready, ok};
use std::sync::Arc;

const DYNAMIC_CACHE_CONTROL: &str = "no-cache, no-store, must-revalidate";
const REFERRER_POLICY: &str = "strict-origin-when-cross-origin";
const PERMISSIONS_POLICY: &str = "accelerometer=(), camera=(), geolocation=(), gyroscope=(), magnetometer=(), microphone=(), payment=(), usb=(), xr-spatial-tracking=()";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum CacheDirective {
    #[default]
    Default,
    NoStore,
}

/// Marks the current response as not cacheable regardless of its path.
pub fn set_cache_directive(req: &HttpRequest, directive: CacheDirective) {
    req.extensions_mut().insert(directive);
}

/// Header values resolved once from configuration.
#[derive(Debug)]
struct HeaderSet {
    content_security_policy: Option<HeaderValue>,
    frame_options: Option<HeaderValue>,
    strict_transport_security: Option<HeaderValue>,
}

impl HeaderSet {
    fn from_config(security: &SecurityConfig) -> Self {
        let hsts = if security.hsts_enabled {
            let mut hsts_val = format!("max-age={}", security.hsts_max_age);
            if security.hsts_include_subdomains {
                hsts_val.push_str("; includeSubDomains");
            }
            if security.hsts_preload {
                hsts_val.push_str("; preload");
            }
            Some(hsts_val)
        } else {
            None
        };

        Self {
            content_security_policy: header_value(
                "Content-Security-Policy",
                &security.content_security_policy,
            ),
            frame_options: header_value("X-Frame-Options", &security.frame_options),
            strict_transport_security: hsts
                .and_then(|value| header_value("Strict-Transport-Security", &value)),
        }
    }
}

fn header_value(name: &str, value: &str) -> Option<HeaderValue> {
    if value.trim().is_empty() {
        return None;
    }
    match HeaderValue::from_str(value.trim()) {
        Ok(value) => Some(value),
        Err(_) => {
            log::warn!("Ignoring invalid {} header value from configuration", name);
            None
        }
    }
}

/// Applies the configured security headers to every response, and forces
/// no-store caching on guarded paths.
pub struct SecurityHeaders {
    headers: Arc<HeaderSet>,
    policy: Arc<RouteGuardPolicy>,
}

impl SecurityHeaders {
    pub fn new(security: &SecurityConfig, policy: Arc<RouteGuardPolicy>) -> Self {
        SecurityHeaders {
            headers: Arc::new(HeaderSet::from_config(security)),
            policy,
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for SecurityHeaders
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = SecurityHeadersMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(SecurityHeadersMiddleware {
            service,
            headers: self.headers.clone(),
            policy: self.policy.clone(),
        })
    }
}

pub struct SecurityHeadersMiddleware<S> {
    service: S,
    headers: Arc<HeaderSet>,
    policy: Arc<RouteGuardPolicy>,
}

impl<S, B> Service<ServiceRequest> for SecurityHeadersMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let path = req.path().to_string();
        let fut = self.service.call(req);
        let headers = self.headers.clone();
        let policy = self.policy.clone();

        Box::pin(async move {
            let mut res = fut.await?;

            let directive = res
                .request()
                .extensions()
                .get::<CacheDirective>()
                .copied()
                .unwrap_or_default();

            let map = res.headers_mut();
            map.insert(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
            map.insert(
                HeaderName::from_static("referrer-policy"),
                HeaderValue::from_static(REFERRER_POLICY),
            );
            map.insert(
                HeaderName::from_static("permissions-policy"),
                HeaderValue::from_static(PERMISSIONS_POLICY),
            );
            set_or_remove(map, X_FRAME_OPTIONS, headers.frame_options.as_ref());
            set_or_remove(
                map,
                CONTENT_SECURITY_POLICY,
                headers.content_security_policy.as_ref(),
            );
            set_or_remove(
                map,
                STRICT_TRANSPORT_SECURITY,
                headers.strict_transport_security.as_ref(),
            );

            let guarded = policy.is_protected(&path) || policy.is_auth_only(&path);
            if guarded || directive == CacheDirective::NoStore {
                apply_no_cache_headers(map);
            }

            Ok(res)
        })
    }
}

fn apply_no_cache_headers(headers: &mut HeaderMap) {
    headers.insert(
        CACHE_CONTROL,
        HeaderValue::from_static(DYNAMIC_CACHE_CONTROL),
    );
    headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));
}

fn set_or_remove(headers: &mut HeaderMap, name: HeaderName, value: Option<&HeaderValue>) {
    match value {
        Some(value) => {
            headers.insert(name, value.clone());
        }
        None => {
            headers.remove(name);
        }
    }
}
