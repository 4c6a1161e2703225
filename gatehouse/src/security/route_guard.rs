// This file is part of the product Gatehouse.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use crate::config::RoutesConfig;
use crate::iam::AuthRequest;
use actix_web::{
    Error, HttpResponse,
    body::EitherBody,
    dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready},
    http::header::LOCATION,
};
use futures_util::future::LocalBoxFuture;
use std::future::{Ready, ready};
use std::sync::Arc;
use url::form_urlencoded;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteDecision {
    Allow,
    Redirect(String),
}

/// Segment-aware prefix match: `/dashboard` matches `/dashboard` and
/// `/dashboard/x`, never `/dashboards`.
pub fn path_matches_prefix(path: &str, prefix: &str) -> bool {
    let prefix = prefix.trim_end_matches('/');
    if prefix.is_empty() {
        return path.starts_with('/');
    }
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

/// Returns `raw` when it is a same-origin absolute path that is safe to put in
/// a `Location` header.
pub fn safe_return_path(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    if trimmed.chars().any(|c| c.is_control() || c == '\\') {
        return None;
    }
    if !trimmed.starts_with('/') || trimmed.starts_with("//") {
        return None;
    }
    Some(trimmed.to_string())
}

/// Percent-decodes, collapses repeated slashes and resolves dot segments so
/// `/x/../dashboard` and `//dashboard` are judged like `/dashboard`.
fn canonical_path(path: &str) -> String {
    let decoded = urlencoding::decode(path)
        .map(|cow| cow.into_owned())
        .unwrap_or_else(|_| path.to_string());

    let mut segments: Vec<&str> = Vec::new();
    for segment in decoded.split(['/', '\\']) {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    format!("/{}", segments.join("/"))
}

fn encode_return_target(target: &str) -> String {
    urlencoding::encode(target).replace("%2F", "/")
}

#[derive(Debug, Clone)]
pub struct RouteGuardPolicy {
    protected_prefixes: Vec<String>,
    auth_only_prefixes: Vec<String>,
    login_path: String,
    landing_path: String,
    return_param: String,
}

impl RouteGuardPolicy {
    pub fn from_config(routes: &RoutesConfig) -> Self {
        Self {
            protected_prefixes: routes.protected_prefixes.clone(),
            auth_only_prefixes: routes.auth_only_prefixes.clone(),
            login_path: routes.login_path.clone(),
            landing_path: routes.landing_path.clone(),
            return_param: routes.return_param.clone(),
        }
    }

    pub fn login_path(&self) -> &str {
        &self.login_path
    }

    pub fn landing_path(&self) -> &str {
        &self.landing_path
    }

    pub fn return_param(&self) -> &str {
        &self.return_param
    }

    fn matches_any(prefixes: &[String], path: &str) -> bool {
        let canonical = canonical_path(path);
        prefixes.iter().any(|prefix| {
            path_matches_prefix(path, prefix) || path_matches_prefix(&canonical, prefix)
        })
    }

    pub fn is_protected(&self, path: &str) -> bool {
        Self::matches_any(&self.protected_prefixes, path)
    }

    pub fn is_auth_only(&self, path: &str) -> bool {
        Self::matches_any(&self.auth_only_prefixes, path)
    }

    /// Allow/redirect decision for one request. `query` is the raw query string
    /// without the leading `?`.
    pub fn decide(&self, path: &str, query: Option<&str>, authenticated: bool) -> RouteDecision {
        if !authenticated && self.is_protected(path) {
            let original = match query {
                Some(q) if !q.is_empty() => format!("{}?{}", path, q),
                _ => path.to_string(),
            };
            return RouteDecision::Redirect(format!(
                "{}?{}={}",
                self.login_path,
                self.return_param,
                encode_return_target(&original)
            ));
        }

        if authenticated && self.is_auth_only(path) {
            let target = query
                .and_then(|q| self.requested_return_path(q))
                .unwrap_or_else(|| self.landing_path.clone());
            return RouteDecision::Redirect(target);
        }

        RouteDecision::Allow
    }

    fn requested_return_path(&self, query: &str) -> Option<String> {
        form_urlencoded::parse(query.as_bytes())
            .find(|(key, _)| key == self.return_param.as_str())
            .and_then(|(_, value)| safe_return_path(&value))
            .filter(|target| {
                let target_path = target.split(['?', '#']).next().unwrap_or_default();
                !self.is_auth_only(target_path)
            })
    }
}

/// Middleware applying [`RouteGuardPolicy`] to every request. Must run inside the
/// session middleware so the principal is already attached.
pub struct RouteGuard {
    policy: Arc<RouteGuardPolicy>,
}

impl RouteGuard {
    pub fn new(policy: Arc<RouteGuardPolicy>) -> Self {
        Self { policy }
    }
}

impl<S, B> Transform<S, ServiceRequest> for RouteGuard
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = RouteGuardMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RouteGuardMiddleware {
            service,
            policy: self.policy.clone(),
        }))
    }
}

pub struct RouteGuardMiddleware<S> {
    service: S,
    policy: Arc<RouteGuardPolicy>,
}

impl<S, B> Service<ServiceRequest> for RouteGuardMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let authenticated = req.request().is_authenticated();
        let query = req.query_string();
        let query = if query.is_empty() { None } else { Some(query) };
        let decision = self.policy.decide(req.path(), query, authenticated);

        if let RouteDecision::Redirect(location) = decision {
            log::debug!(
                "Route guard redirect: path={} authenticated={}",
                req.path(),
                authenticated
            );
            let (req, _) = req.into_parts();
            let response = HttpResponse::Found()
                .insert_header((LOCATION, location))
                .finish()
                .map_into_right_body();
            return Box::pin(async move { Ok(ServiceResponse::new(req, response)) });
        }

        let fut = self.service.call(req);
        Box::pin(async move { fut.await.map(ServiceResponse::map_into_left_body) })
    }
}
