// This file is part of the product Gatehouse.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

pub mod encoding;
mod filename;
mod route_guard;
mod ssrf;
mod upload;

pub use encoding::{
    Encoded, EncodingContext, HtmlSanitizer, OutputContext, contexts, encode, encode_css_value,
    encode_script_literal, encode_url_param, escape_html, sanitize_rich_html, strip_tags,
};
pub use filename::{file_extension, generate_safe_name, sanitize_name};
pub use route_guard::{
    RouteDecision, RouteGuard, RouteGuardPolicy, path_matches_prefix, safe_return_path,
};
pub use ssrf::{SsrfGuard, SsrfRejection, is_internal_ip};
pub use upload::{
    AcceptedFile, FileCandidate, FileType, FileTypeRegistry, UploadRejection, UploadValidator,
    normalize_content_type,
};
