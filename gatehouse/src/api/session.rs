// This file is part of the product Gatehouse.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use actix_web::{HttpRequest, HttpResponse, web};
use serde::Serialize;

use crate::app_state::AppState;
use crate::headers::{CacheDirective, set_cache_directive};
use crate::iam::AuthRequest;

#[derive(Serialize)]
struct SessionResponse {
    authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    login_path: Option<String>,
}

pub async fn get_session(req: HttpRequest, state: web::Data<AppState>) -> HttpResponse {
    set_cache_directive(&req, CacheDirective::NoStore);

    let Some(principal) = req.principal() else {
        return HttpResponse::Ok().json(SessionResponse {
            authenticated: false,
            display_name: None,
            login_path: Some(state.route_policy.login_path().to_string()),
        });
    };

    HttpResponse::Ok().json(SessionResponse {
        authenticated: true,
        display_name: Some(principal.display_name),
        login_path: None,
    })
}
