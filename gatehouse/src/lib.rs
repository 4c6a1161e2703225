// This file is part of the product Gatehouse.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

pub mod api;
pub mod app_state;
pub mod bootstrap;
pub mod config;
pub mod headers;
pub mod iam;
pub mod pages;
pub mod security;
pub mod util;

use actix_web::body::MessageBody;
use actix_web::dev::{ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{App, middleware::Logger, web};
use std::sync::Arc;

use app_state::AppState;
use headers::SecurityHeaders;
use iam::SessionMiddlewareFactory;
use security::RouteGuard;

pub const ACCESS_LOG_FORMAT: &str = r#"%a "%r" %s %b "%{Referer}i" "%{User-Agent}i" %T"#;

/// The full middleware stack and routes. Requests pass through the access log,
/// security headers, session resolution and the route guard, in that order.
pub fn build_app(
    state: Arc<AppState>,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse<impl MessageBody>,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    let routes = state.config.routes.clone();

    App::new()
        .app_data(web::Data::from(state.clone()))
        .wrap(RouteGuard::new(state.route_policy.clone()))
        .wrap(SessionMiddlewareFactory::new(
            state.session_verifier.clone(),
            &state.config.session.cookie_name,
        ))
        .wrap(SecurityHeaders::new(
            &state.config.security,
            state.route_policy.clone(),
        ))
        .wrap(Logger::new(ACCESS_LOG_FORMAT))
        .configure(api::configure)
        .configure(move |cfg| pages::configure(cfg, &routes))
}
