// This file is part of the product Gatehouse.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use uuid::Uuid;

const FALLBACK_EXTENSION: &str = "bin";
const FALLBACK_NAME: &str = "file";

/// Lower-cased text after the last dot of the final path component, if any.
pub fn file_extension(file_name: &str) -> Option<String> {
    let base = file_name.rsplit(['/', '\\']).next().unwrap_or(file_name);
    let (_, ext) = base.rsplit_once('.')?;
    if ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Generates a storage name of the form `<uuid-v4>.<ext>`.
/// Only the extension of the original name survives, and only if it is plain ASCII alphanumeric.
pub fn generate_safe_name(original_name: &str) -> String {
    let extension = file_extension(original_name)
        .filter(|ext| ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or_else(|| FALLBACK_EXTENSION.to_string());
    format!("{}.{}", Uuid::new_v4(), extension)
}

/// Best-effort cleanup for names that must be partially preserved.
/// Prefer [`generate_safe_name`] whenever uniqueness is acceptable.
pub fn sanitize_name(original_name: &str) -> String {
    let mut name = original_name.replace('\0', "");
    while name.contains("..") {
        name = name.replace("..", "");
    }

    let sanitized: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect();

    if sanitized.is_empty() {
        return FALLBACK_NAME.to_string();
    }
    sanitized
}
