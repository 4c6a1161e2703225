// This file is part of the product Gatehouse.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use actix_web::HttpServer;
use actix_web::rt::System;
use log::info;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use gatehouse::app_state::AppState;
use gatehouse::bootstrap::{self, BootstrapResult};
use gatehouse::build_app;
use gatehouse::config::{SessionVerifierConfig, ValidatedConfig};
use gatehouse::util::{default_demotions, init_logger};

const HELP_TEXT: &str = "Usage: gatehouse [-C <root>] [-h|--help]\n\n  -C <root>   runtime directory holding config.yaml (default: .)\n  -h, --help  print this help\n";

#[derive(Debug)]
struct ParsedArgs {
    runtime_root: PathBuf,
    help: bool,
}

fn main() {
    let exit_code = run();
    std::process::exit(exit_code);
}

fn run() -> i32 {
    let parsed_args = match parse_args() {
        Ok(args) => args,
        Err(error) => {
            eprintln!("❌ Invalid command line arguments: {}", error);
            eprintln!("❌ Use -C <root> to set the runtime directory.");
            return 1;
        }
    };

    if parsed_args.help {
        print!("{}", HELP_TEXT);
        return 0;
    }

    let bootstrap = match bootstrap::bootstrap_runtime(&parsed_args.runtime_root) {
        Ok(result) => result,
        Err(error) => {
            eprintln!("❌ Bootstrap error: {}", error);
            eprintln!("❌ Application cannot start with invalid configuration.");
            return 1;
        }
    };

    match System::new().block_on(run_server(bootstrap)) {
        Ok(()) => 0,
        Err(error) => {
            eprintln!("❌ Server failed to start: {}", error);
            1
        }
    }
}

async fn run_server(bootstrap: BootstrapResult) -> std::io::Result<()> {
    let validated_config = Arc::new(bootstrap.validated_config);

    // Configure logging with a stable format
    let logger = env_logger::Builder::from_default_env()
        .filter_level(validated_config.log_level())
        .target(env_logger::Target::Stdout)
        .format(|buf, record| {
            writeln!(
                buf,
                "{} [{}] {}: {}",
                chrono::Utc::now().format("%Y-%m-%d %H:%M:%S%.3f UTC"),
                record.level(),
                record.target(),
                record.args()
            )
        })
        .build();

    init_logger(default_demotions(), logger).map_err(|error| {
        eprintln!("❌ Failed to initialize logger: {}", error);
        std::io::Error::other(error.to_string())
    })?;

    if bootstrap.created_config {
        info!("Created default configuration");
    }
    log_startup_info(&validated_config);

    let app_state = match AppState::new(validated_config.clone()) {
        Ok(state) => Arc::new(state),
        Err(error) => {
            eprintln!("❌ Failed to initialize session verifier: {}", error);
            return Err(std::io::Error::other(error.to_string()));
        }
    };
    info!("✅ App state initialized");

    let host = validated_config.server.host.clone();
    let port = validated_config.server.port;
    let workers = validated_config.server.workers;

    info!("🚀 Listening on http://{}:{}", host, port);
    HttpServer::new(move || build_app(app_state.clone()))
        .workers(workers)
        .bind((host.as_str(), port))?
        .run()
        .await
}

fn log_startup_info(config: &ValidatedConfig) {
    info!("Starting {}", config.app.name);
    let mode = match &config.session.verifier {
        SessionVerifierConfig::Jwt(_) => "jwt",
        SessionVerifierConfig::Remote(_) => "remote",
    };
    info!("Session verification: {}", mode);
    info!(
        "Protected prefixes: {}",
        config.routes.protected_prefixes.join(", ")
    );
    info!(
        "Upload limit: {} bytes, types: {}",
        config.uploads.max_file_size_bytes,
        config.uploads.registry.allowed_mime_types().join(", ")
    );
    if !config.security.hsts_enabled && !config.is_localhost_only() {
        info!("HSTS disabled; terminate TLS in front of this server before exposing it");
    }
}

fn parse_args() -> Result<ParsedArgs, String> {
    parse_args_from(std::env::args().skip(1))
}

fn parse_args_from<I>(args: I) -> Result<ParsedArgs, String>
where
    I: IntoIterator<Item = String>,
{
    let args: Vec<String> = args.into_iter().collect();
    if args.iter().any(|arg| is_help_flag(arg)) {
        return Ok(ParsedArgs {
            runtime_root: PathBuf::from("."),
            help: true,
        });
    }

    let mut args = args.into_iter();
    let mut runtime_root = PathBuf::from(".");

    while let Some(arg) = args.next() {
        if arg == "--" {
            continue;
        } else if arg == "-C" {
            let value = args
                .next()
                .ok_or_else(|| "Missing value for -C".to_string())?;
            runtime_root = PathBuf::from(value);
        } else {
            return Err(format!("Unexpected argument: {}", arg));
        }
    }

    let runtime_root = make_runtime_root_absolute(runtime_root)?;
    Ok(ParsedArgs {
        runtime_root,
        help: false,
    })
}

fn is_help_flag(arg: &str) -> bool {
    arg == "-h" || arg == "--help"
}

fn make_runtime_root_absolute(runtime_root: PathBuf) -> Result<PathBuf, String> {
    if runtime_root.is_absolute() {
        return Ok(runtime_root);
    }

    let current_dir = std::env::current_dir()
        .map_err(|error| format!("Failed to resolve current directory: {}", error))?;
    Ok(current_dir.join(runtime_root))
}
