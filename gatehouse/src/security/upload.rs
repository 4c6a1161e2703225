// This file is part of the product Gatehouse.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use super::filename::file_extension;
use crate::config::FileTypeConfig;
use log::debug;
use std::fmt;
use std::io::Read;

/// An accepted upload type. Extension, MIME type and magic bytes live together so
/// they cannot drift apart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileType {
    mime: String,
    extensions: Vec<String>,
    signature: Vec<u8>,
}

impl FileType {
    pub fn mime(&self) -> &str {
        &self.mime
    }

    pub fn matches_signature(&self, prefix: &[u8]) -> bool {
        prefix.starts_with(&self.signature)
    }
}

/// Registry of accepted upload types keyed by MIME type, in registration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileTypeRegistry {
    entries: Vec<FileType>,
}

impl FileTypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The reference table: JPEG, PNG, GIF, WebP and PDF.
    pub fn reference() -> Self {
        let mut registry = Self::new();
        for (mime, extensions, signature) in [
            ("image/jpeg", &["jpg", "jpeg"][..], &[0xFF, 0xD8, 0xFF][..]),
            (
                "image/png",
                &["png"][..],
                &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A][..],
            ),
            ("image/gif", &["gif"][..], &[0x47, 0x49, 0x46, 0x38][..]),
            ("image/webp", &["webp"][..], &[0x52, 0x49, 0x46, 0x46][..]),
            ("application/pdf", &["pdf"][..], &[0x25, 0x50, 0x44, 0x46][..]),
        ] {
            let _ = registry.register(mime, extensions, signature);
        }
        registry
    }

    pub fn from_config(types: &[FileTypeConfig]) -> Result<Self, String> {
        let mut registry = Self::new();
        for entry in types {
            let signature = hex::decode(entry.signature.trim()).map_err(|e| {
                format!("signature for '{}' is not valid hex: {}", entry.mime, e)
            })?;
            let extensions: Vec<&str> = entry.extensions.iter().map(String::as_str).collect();
            registry.register(&entry.mime, &extensions, &signature)?;
        }
        Ok(registry)
    }

    pub fn register(
        &mut self,
        mime: &str,
        extensions: &[&str],
        signature: &[u8],
    ) -> Result<(), String> {
        let mime = normalize_content_type(mime);
        if mime.is_empty() || !mime.contains('/') {
            return Err(format!("'{}' is not a MIME type", mime));
        }
        if self.get(&mime).is_some() {
            return Err(format!("'{}' is registered twice", mime));
        }
        if signature.is_empty() {
            return Err(format!("'{}' needs a non-empty signature", mime));
        }
        if extensions.is_empty() {
            return Err(format!("'{}' needs at least one extension", mime));
        }

        let mut normalized = Vec::with_capacity(extensions.len());
        for ext in extensions {
            let ext = ext.trim().trim_start_matches('.').to_ascii_lowercase();
            if ext.is_empty() || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
                return Err(format!("'{}' has an invalid extension '{}'", mime, ext));
            }
            if !normalized.contains(&ext) {
                normalized.push(ext);
            }
        }

        self.entries.push(FileType {
            mime,
            extensions: normalized,
            signature: signature.to_vec(),
        });
        Ok(())
    }

    pub fn get(&self, content_type: &str) -> Option<&FileType> {
        let wanted = normalize_content_type(content_type);
        self.entries.iter().find(|entry| entry.mime == wanted)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn allowed_extensions(&self) -> Vec<&str> {
        let mut allowed: Vec<&str> = Vec::new();
        for ext in self.entries.iter().flat_map(|entry| entry.extensions.iter()) {
            if !allowed.contains(&ext.as_str()) {
                allowed.push(ext);
            }
        }
        allowed
    }

    pub fn allowed_mime_types(&self) -> Vec<&str> {
        self.entries.iter().map(|entry| entry.mime.as_str()).collect()
    }

    pub fn is_allowed_extension(&self, ext: &str) -> bool {
        self.entries
            .iter()
            .any(|entry| entry.extensions.iter().any(|allowed| allowed == ext))
    }

    /// Number of leading bytes needed to check any registered signature.
    pub fn max_signature_len(&self) -> usize {
        self.entries
            .iter()
            .map(|entry| entry.signature.len())
            .max()
            .unwrap_or(0)
    }
}

/// Lower-cases a declared content type and drops parameters such as `; charset=...`.
pub fn normalize_content_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Caller-declared facts about an upload. The bytes travel separately.
#[derive(Debug, Clone)]
pub struct FileCandidate {
    pub file_name: String,
    pub content_type: String,
    pub declared_size: u64,
}

impl FileCandidate {
    pub fn new(file_name: &str, content_type: &str, declared_size: u64) -> Self {
        Self {
            file_name: file_name.to_string(),
            content_type: content_type.to_string(),
            declared_size,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcceptedFile {
    pub content_type: String,
    pub extension: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadRejection {
    FileTooLarge { size: u64, max: u64 },
    EmptyFile,
    InvalidExtension { extension: String, allowed: Vec<String> },
    InvalidMimeType { allowed: Vec<String> },
    SignatureMismatch { content_type: String },
    ExtensionMismatch { extension: String, content_type: String },
}

impl UploadRejection {
    pub fn kind(&self) -> &'static str {
        match self {
            UploadRejection::FileTooLarge { .. } => "file_too_large",
            UploadRejection::EmptyFile => "empty_file",
            UploadRejection::InvalidExtension { .. } => "invalid_extension",
            UploadRejection::InvalidMimeType { .. } => "invalid_mime_type",
            UploadRejection::SignatureMismatch { .. } => "signature_mismatch",
            UploadRejection::ExtensionMismatch { .. } => "extension_mismatch",
        }
    }
}

fn dotted_list(extensions: &[String]) -> String {
    extensions
        .iter()
        .map(|ext| format!(".{}", ext))
        .collect::<Vec<_>>()
        .join(", ")
}

impl fmt::Display for UploadRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UploadRejection::FileTooLarge { max, .. } => {
                write!(f, "File too large. Maximum size: {} bytes", max)
            }
            UploadRejection::EmptyFile => write!(f, "File is empty"),
            UploadRejection::InvalidExtension { extension, allowed } => {
                let shown = if extension.is_empty() {
                    "(none)".to_string()
                } else {
                    format!(".{}", extension)
                };
                write!(
                    f,
                    "Invalid extension: {}. Allowed: {}",
                    shown,
                    dotted_list(allowed)
                )
            }
            UploadRejection::InvalidMimeType { allowed } => {
                write!(f, "Invalid file type. Allowed: {}", allowed.join(", "))
            }
            UploadRejection::SignatureMismatch { content_type } => write!(
                f,
                "File content does not match the declared type {}",
                content_type
            ),
            UploadRejection::ExtensionMismatch {
                extension,
                content_type,
            } => write!(
                f,
                "Extension .{} does not match the declared type {}",
                extension, content_type
            ),
        }
    }
}

impl std::error::Error for UploadRejection {}

/// Validates uploads against a size limit and a [`FileTypeRegistry`].
#[derive(Debug, Clone)]
pub struct UploadValidator {
    max_file_size: u64,
    registry: FileTypeRegistry,
}

impl UploadValidator {
    pub fn new(max_file_size: u64, registry: FileTypeRegistry) -> Self {
        Self {
            max_file_size,
            registry,
        }
    }

    pub fn max_file_size(&self) -> u64 {
        self.max_file_size
    }

    pub fn prefix_len(&self) -> usize {
        self.registry.max_signature_len()
    }

    /// Size, extension and declared type checks. Cheap, needs no bytes.
    pub fn validate_metadata(
        &self,
        candidate: &FileCandidate,
    ) -> Result<&FileType, UploadRejection> {
        if candidate.declared_size > self.max_file_size {
            return Err(UploadRejection::FileTooLarge {
                size: candidate.declared_size,
                max: self.max_file_size,
            });
        }
        if candidate.declared_size == 0 {
            return Err(UploadRejection::EmptyFile);
        }

        let extension = file_extension(&candidate.file_name).unwrap_or_default();
        if !self.registry.is_allowed_extension(&extension) {
            return Err(UploadRejection::InvalidExtension {
                extension,
                allowed: self
                    .registry
                    .allowed_extensions()
                    .into_iter()
                    .map(str::to_string)
                    .collect(),
            });
        }

        self.registry
            .get(&candidate.content_type)
            .ok_or_else(|| UploadRejection::InvalidMimeType {
                allowed: self
                    .registry
                    .allowed_mime_types()
                    .into_iter()
                    .map(str::to_string)
                    .collect(),
            })
    }

    /// Full validation given the leading bytes of the file.
    pub fn validate_prefix(
        &self,
        candidate: &FileCandidate,
        prefix: &[u8],
    ) -> Result<AcceptedFile, UploadRejection> {
        let file_type = self.validate_metadata(candidate)?;

        if !file_type.matches_signature(prefix) {
            return Err(UploadRejection::SignatureMismatch {
                content_type: file_type.mime.clone(),
            });
        }

        let extension = file_extension(&candidate.file_name).unwrap_or_default();
        if !file_type.extensions.contains(&extension) {
            return Err(UploadRejection::ExtensionMismatch {
                extension,
                content_type: file_type.mime.clone(),
            });
        }

        Ok(AcceptedFile {
            content_type: file_type.mime.clone(),
            extension,
        })
    }

    /// Full validation reading at most [`Self::prefix_len`] bytes from `source`.
    pub fn validate_reader<R: Read>(
        &self,
        candidate: &FileCandidate,
        source: R,
    ) -> Result<AcceptedFile, UploadRejection> {
        let file_type = self.validate_metadata(candidate)?;

        let mut prefix = Vec::with_capacity(self.prefix_len());
        if let Err(e) = source
            .take(self.prefix_len() as u64)
            .read_to_end(&mut prefix)
        {
            // Unreadable content cannot be verified
            debug!("Upload signature read failed: {}", e.kind());
            return Err(UploadRejection::SignatureMismatch {
                content_type: file_type.mime.clone(),
            });
        }

        self.validate_prefix(candidate, &prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const MAX: u64 = 10 * 1024 * 1024;
    const JPEG: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, 0x4A, 0x46, 0x49, 0x46];
    const PNG: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00];

    fn validator() -> UploadValidator {
        UploadValidator::new(MAX, FileTypeRegistry::reference())
    }

    #[test]
    fn accepts_jpeg_within_limits() {
        let v = validator();
        for size in [1, 4096, MAX] {
            let candidate = FileCandidate::new("photo.jpg", "image/jpeg", size);
            let accepted = v.validate_prefix(&candidate, JPEG).expect("jpeg accepted");
            assert_eq!(accepted.content_type, "image/jpeg");
            assert_eq!(accepted.extension, "jpg");
        }
    }

    #[test]
    fn jpeg_bytes_declared_as_pdf_mismatch() {
        let candidate = FileCandidate::new("photo.jpg", "application/pdf", 2048);
        assert_eq!(
            validator().validate_prefix(&candidate, JPEG),
            Err(UploadRejection::SignatureMismatch {
                content_type: "application/pdf".to_string()
            })
        );
    }

    #[test]
    fn empty_file_rejected_regardless_of_type() {
        for (name, mime) in [
            ("a.jpg", "image/jpeg"),
            ("a.exe", "application/x-msdownload"),
            ("a.pdf", "application/pdf"),
        ] {
            let candidate = FileCandidate::new(name, mime, 0);
            assert_eq!(
                validator().validate_prefix(&candidate, &[]),
                Err(UploadRejection::EmptyFile)
            );
        }
    }

    #[test]
    fn size_check_runs_first() {
        let candidate = FileCandidate::new("virus.exe", "application/x-msdownload", MAX + 1);
        let err = validator().validate_prefix(&candidate, JPEG).unwrap_err();
        assert_eq!(err.kind(), "file_too_large");
    }

    #[test]
    fn invalid_extension_lists_allowed_set() {
        let candidate = FileCandidate::new("setup.EXE", "image/jpeg", 10);
        let err = validator().validate_prefix(&candidate, JPEG).unwrap_err();
        assert_eq!(err.kind(), "invalid_extension");
        assert_eq!(
            err.to_string(),
            "Invalid extension: .exe. Allowed: .jpg, .jpeg, .png, .gif, .webp, .pdf"
        );

        let candidate = FileCandidate::new("README", "image/jpeg", 10);
        let err = validator().validate_prefix(&candidate, JPEG).unwrap_err();
        assert!(err.to_string().starts_with("Invalid extension: (none)."));
    }

    #[test]
    fn unknown_content_type_rejected() {
        let candidate = FileCandidate::new("photo.jpg", "image/tiff", 10);
        let err = validator().validate_prefix(&candidate, JPEG).unwrap_err();
        assert_eq!(err.kind(), "invalid_mime_type");
    }

    #[test]
    fn content_type_parameters_and_case_are_ignored() {
        let candidate = FileCandidate::new("Photo.JPEG", " Image/JPEG; charset=binary", 10);
        assert!(validator().validate_prefix(&candidate, JPEG).is_ok());
    }

    #[test]
    fn short_prefix_is_a_mismatch() {
        let candidate = FileCandidate::new("image.png", "image/png", 3);
        let err = validator().validate_prefix(&candidate, &PNG[..3]).unwrap_err();
        assert_eq!(err.kind(), "signature_mismatch");
    }

    #[test]
    fn extension_must_belong_to_declared_type() {
        let candidate = FileCandidate::new("image.png", "image/jpeg", 10);
        let err = validator().validate_prefix(&candidate, JPEG).unwrap_err();
        assert_eq!(
            err,
            UploadRejection::ExtensionMismatch {
                extension: "png".to_string(),
                content_type: "image/jpeg".to_string()
            }
        );
    }

    #[test]
    fn reader_only_consumes_signature_prefix() {
        let v = validator();
        let mut body = PNG.to_vec();
        body.extend(std::iter::repeat_n(0u8, 64 * 1024));
        let mut cursor = Cursor::new(body);
        let candidate = FileCandidate::new("image.png", "image/png", 64 * 1024 + 9);

        assert!(v.validate_reader(&candidate, &mut cursor).is_ok());
        assert_eq!(cursor.position() as usize, v.prefix_len());
        assert_eq!(v.prefix_len(), 8);
    }

    #[test]
    fn registry_rejects_inconsistent_entries() {
        let mut registry = FileTypeRegistry::reference();
        assert!(registry.register("image/png", &["png"], &[0x89]).is_err());
        assert!(registry.register("image/bmp", &[], &[0x42, 0x4D]).is_err());
        assert!(registry.register("image/bmp", &["bmp"], &[]).is_err());
        assert!(registry.register("bmp", &["bmp"], &[0x42]).is_err());
        assert!(registry.register("image/bmp", &["b/mp"], &[0x42]).is_err());
        assert!(registry.register("image/bmp", &[".BMP"], &[0x42, 0x4D]).is_ok());
        assert!(registry.is_allowed_extension("bmp"));
    }
}
