// This file is part of the product Gatehouse.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use actix_web::http::header::{CONTENT_LENGTH, CONTENT_TYPE, HeaderName};
use actix_web::{HttpRequest, HttpResponse, http::StatusCode, web};
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};

use super::rejection_response;
use crate::app_state::AppState;
use crate::headers::{CacheDirective, set_cache_directive};
use crate::security::{FileCandidate, UploadRejection, generate_safe_name};

#[derive(Deserialize)]
pub struct UploadQuery {
    #[serde(default)]
    filename: Option<String>,
}

#[derive(Serialize)]
struct UploadAccepted {
    stored_name: String,
    content_type: String,
    size: u64,
}

fn reject(rejection: &UploadRejection) -> HttpResponse {
    log::info!("Upload rejected: {}", rejection.kind());
    let status = match rejection {
        UploadRejection::FileTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
        _ => StatusCode::BAD_REQUEST,
    };
    rejection_response(status, rejection.kind(), rejection.to_string())
}

fn header_str<'a>(req: &'a HttpRequest, name: HeaderName) -> Option<&'a str> {
    req.headers().get(name).and_then(|value| value.to_str().ok())
}

/// Validates a raw upload body. Only the signature prefix is kept in memory; the
/// rest is counted and dropped. Nothing is written to disk.
pub async fn upload(
    req: HttpRequest,
    state: web::Data<AppState>,
    query: web::Query<UploadQuery>,
    mut payload: web::Payload,
) -> HttpResponse {
    set_cache_directive(&req, CacheDirective::NoStore);

    // A missing name carries no extension and fails the extension check
    let filename = query.filename.as_deref().unwrap_or_default();
    let validator = &state.upload_validator;
    let content_type = header_str(&req, CONTENT_TYPE).unwrap_or_default();

    // Reject on declared metadata before reading the body
    if let Some(declared_size) =
        header_str(&req, CONTENT_LENGTH).and_then(|value| value.trim().parse::<u64>().ok())
    {
        let declared = FileCandidate::new(filename, content_type, declared_size);
        match validator.validate_metadata(&declared) {
            Ok(file_type) => log::debug!("Upload declared as {}", file_type.mime()),
            Err(rejection) => return reject(&rejection),
        }
    }

    let prefix_len = validator.prefix_len();
    let mut prefix: Vec<u8> = Vec::with_capacity(prefix_len);
    let mut received: u64 = 0;

    while let Some(chunk) = payload.next().await {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(e) => {
                log::debug!("Upload body read failed: {}", e);
                return rejection_response(
                    StatusCode::BAD_REQUEST,
                    "invalid_body",
                    "Upload body could not be read".to_string(),
                );
            }
        };

        received += chunk.len() as u64;
        if received > validator.max_file_size() {
            return reject(&UploadRejection::FileTooLarge {
                size: received,
                max: validator.max_file_size(),
            });
        }

        if prefix.len() < prefix_len {
            let take = (prefix_len - prefix.len()).min(chunk.len());
            prefix.extend_from_slice(&chunk[..take]);
        }
    }

    let candidate = FileCandidate::new(filename, content_type, received);
    match validator.validate_prefix(&candidate, &prefix) {
        Ok(accepted) => HttpResponse::Ok().json(UploadAccepted {
            stored_name: generate_safe_name(filename),
            content_type: accepted.content_type,
            size: received,
        }),
        Err(rejection) => reject(&rejection),
    }
}
