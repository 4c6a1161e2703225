// This file is part of the product Gatehouse.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use actix_web::error::{InternalError, JsonPayloadError, QueryPayloadError};
use actix_web::{HttpRequest, HttpResponse, http::StatusCode, web};
use serde::Serialize;

mod session;
mod uploads;
mod url_check;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .app_data(web::JsonConfig::default().error_handler(json_error))
            .app_data(web::QueryConfig::default().error_handler(query_error))
            .route("/session", web::get().to(session::get_session))
            .route("/url-check", web::post().to(url_check::check_url))
            .route("/uploads", web::post().to(uploads::upload)),
    );
}

#[derive(Serialize)]
struct RejectionBody<'a> {
    error: &'a str,
    message: String,
}

/// JSON body shared by every validation failure: `{"error": kind, "message": ...}`.
fn rejection_response(status: StatusCode, kind: &str, message: String) -> HttpResponse {
    HttpResponse::build(status).json(RejectionBody {
        error: kind,
        message,
    })
}

fn json_error(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    log::debug!("Rejected JSON body: {}", err);
    let response = rejection_response(
        StatusCode::BAD_REQUEST,
        "invalid_body",
        "Request body must be a JSON object with the expected fields".to_string(),
    );
    InternalError::from_response(err, response).into()
}

fn query_error(err: QueryPayloadError, _req: &HttpRequest) -> actix_web::Error {
    log::debug!("Rejected query string: {}", err);
    let response = rejection_response(
        StatusCode::BAD_REQUEST,
        "invalid_query",
        "Query string could not be parsed".to_string(),
    );
    InternalError::from_response(err, response).into()
}
