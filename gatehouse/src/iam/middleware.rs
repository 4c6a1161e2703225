// This file is part of the product Gatehouse.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use actix_web::Error;
use actix_web::cookie::Cookie;
use actix_web::dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready};
use actix_web::{HttpMessage, HttpRequest};
use futures_util::future::LocalBoxFuture;
use std::future::{Ready, ready};
use std::rc::Rc;
use std::sync::Arc;

use super::session::SessionVerifier;
use super::types::Principal;

/// Trait to add authentication methods to HttpRequest
pub trait AuthRequest {
    fn principal(&self) -> Option<Principal>;

    fn is_authenticated(&self) -> bool;
}

impl AuthRequest for HttpRequest {
    fn principal(&self) -> Option<Principal> {
        self.extensions().get::<Principal>().cloned()
    }

    fn is_authenticated(&self) -> bool {
        self.extensions().get::<Principal>().is_some()
    }
}

/// Resolves the session cookie into a [`Principal`] and stores it in the request
/// extensions. Any verifier failure leaves the request unauthenticated.
pub struct SessionMiddlewareFactory {
    verifier: Arc<dyn SessionVerifier>,
    cookie_name: Rc<str>,
}

impl SessionMiddlewareFactory {
    pub fn new(verifier: Arc<dyn SessionVerifier>, cookie_name: &str) -> Self {
        Self {
            verifier,
            cookie_name: Rc::from(cookie_name),
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for SessionMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = SessionMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(SessionMiddleware {
            service: Rc::new(service),
            verifier: self.verifier.clone(),
            cookie_name: self.cookie_name.clone(),
        }))
    }
}

pub struct SessionMiddleware<S> {
    service: Rc<S>,
    verifier: Arc<dyn SessionVerifier>,
    cookie_name: Rc<str>,
}

impl<S, B> Service<ServiceRequest> for SessionMiddleware<S>
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
        let service = self.service.clone();
        let verifier = self.verifier.clone();
        let token = req
            .cookie(&self.cookie_name)
            .map(|cookie| cookie.value().to_string())
            .filter(|value| !value.is_empty());

        Box::pin(async move {
            let mut refresh_cookie: Option<Cookie<'static>> = None;

            if let Some(token) = token {
                match verifier.verify(&token).await {
                    Ok(session) => {
                        req.extensions_mut().insert(session.principal);
                        refresh_cookie = session.refreshed_cookie;
                    }
                    Err(e) => {
                        log::warn!("Session rejected: {}", e.kind());
                    }
                }
            }

            let mut res = service.call(req).await?;

            if let Some(cookie) = refresh_cookie {
                res.response_mut().add_cookie(&cookie).map_err(|e| {
                    log::error!("Failed to set refresh cookie: {}", e);
                    actix_web::error::ErrorInternalServerError("Failed to set refresh cookie")
                })?;
            }

            Ok(res)
        })
    }
}
