// This file is part of the product Gatehouse.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use actix_web::{HttpRequest, HttpResponse, http::StatusCode, web};
use serde::{Deserialize, Serialize};

use super::rejection_response;
use crate::app_state::AppState;
use crate::headers::{CacheDirective, set_cache_directive};

#[derive(Deserialize)]
pub struct UrlCheckRequest {
    url: String,
}

#[derive(Serialize)]
struct UrlCheckResponse {
    allowed: bool,
    url: String,
}

pub async fn check_url(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: web::Json<UrlCheckRequest>,
) -> HttpResponse {
    set_cache_directive(&req, CacheDirective::NoStore);

    match state.ssrf_guard.check(&body.url) {
        Ok(url) => HttpResponse::Ok().json(UrlCheckResponse {
            allowed: true,
            url: url.to_string(),
        }),
        Err(rejection) => {
            log::info!("URL rejected: {}", rejection.kind());
            rejection_response(
                StatusCode::BAD_REQUEST,
                rejection.kind(),
                rejection.to_string(),
            )
        }
    }
}
