// This file is part of the product Gatehouse.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use super::{BootstrapError, log_action};
use crate::config::CONFIG_FILE_NAME;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use rand_core::{OsRng, RngCore};

const DEFAULT_PORT: u16 = 7080;
const DEFAULT_WORKERS: u16 = 4;

pub fn ensure_config(root: &Path) -> Result<bool, BootstrapError> {
    let root_path = normalize_root(root)?;
    let config_path = root_path.join(CONFIG_FILE_NAME);

    if config_path.exists() {
        return Ok(false);
    }

    let jwt_secret = generate_jwt_secret()?;
    let contents = default_config_yaml(&jwt_secret);

    let mut file = match OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&config_path)
    {
        Ok(file) => file,
        Err(err) if err.kind() == io::ErrorKind::AlreadyExists => return Ok(false),
        Err(err) => return Err(BootstrapError::Io(err)),
    };

    file.write_all(contents.as_bytes())?;
    file.sync_all()?;

    log_action(format!(
        "created {} listening on 127.0.0.1:{}",
        CONFIG_FILE_NAME, DEFAULT_PORT
    ));

    Ok(true)
}

fn normalize_root(root: &Path) -> Result<PathBuf, BootstrapError> {
    let root_path = if root.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        root.to_path_buf()
    };

    if root_path.exists() {
        if !root_path.is_dir() {
            return Err(BootstrapError::Io(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("Runtime root is not a directory: {}", root_path.display()),
            )));
        }
        return Ok(root_path);
    }

    fs::create_dir_all(&root_path)?;
    log_action(format!(
        "created runtime root directory {}",
        root_path.display()
    ));
    Ok(root_path)
}

/// 32 bytes from the OS RNG, hex-encoded.
fn generate_jwt_secret() -> Result<String, BootstrapError> {
    let mut bytes = [0u8; 32];
    OsRng.try_fill_bytes(&mut bytes).map_err(|err| {
        BootstrapError::Io(io::Error::other(format!(
            "Failed to generate JWT secret: {}",
            err
        )))
    })?;
    Ok(hex::encode(bytes))
}

fn default_config_yaml(jwt_secret: &str) -> String {
    format!(
        "server:\n  host: \"127.0.0.1\"\n  port: {port}\n  workers: {workers}\n\napp:\n  name: \"Gatehouse\"\n\nlogging:\n  level: \"info\"\n\nsession:\n  cookie_name: \"gatehouse_session\"\n  mode: \"jwt\"\n  jwt:\n    secret: \"{jwt_secret}\"\n    expiration_hours: 12\n    refresh_threshold_percentage: 50\n\nroutes:\n  protected_prefixes:\n    - \"/dashboard\"\n    - \"/settings\"\n    - \"/account\"\n  auth_only_prefixes:\n    - \"/login\"\n    - \"/signup\"\n  login_path: \"/login\"\n  landing_path: \"/dashboard\"\n  return_param: \"redirect\"\n\nuploads:\n  max_file_size_bytes: 10485760\n\nsecurity:\n  hsts_enabled: false\n  hsts_max_age: 31536000\n  hsts_include_subdomains: true\n  hsts_preload: false\n  frame_options: \"DENY\"\n",
        port = DEFAULT_PORT,
        workers = DEFAULT_WORKERS,
        jwt_secret = jwt_secret,
    )
}
