// This file is part of the product Gatehouse.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use env_logger::Logger;
use log::{Level, Log, Metadata, Record, SetLoggerError};

/// Rewrites records from `target_prefix` logged at `from` to level `to`.
/// Used to quiet chatty dependencies without raising the global level.
#[derive(Debug, Clone)]
pub struct LevelDemotion {
    pub target_prefix: String,
    pub from: Level,
    pub to: Level,
}

impl LevelDemotion {
    pub fn new(target_prefix: &str, from: Level, to: Level) -> Self {
        Self {
            target_prefix: target_prefix.to_string(),
            from,
            to,
        }
    }
}

/// Third-party targets that log request internals at debug level.
pub fn default_demotions() -> Vec<LevelDemotion> {
    vec![
        LevelDemotion::new("html5ever", Level::Debug, Level::Trace),
        LevelDemotion::new("reqwest", Level::Debug, Level::Trace),
        LevelDemotion::new("hyper", Level::Debug, Level::Trace),
    ]
}

struct DemotingLogger {
    inner: Logger,
    demotions: Vec<LevelDemotion>,
}

impl DemotingLogger {
    fn level_for(&self, target: &str, original_level: Level) -> Level {
        self.demotions
            .iter()
            .find(|rule| target.starts_with(&rule.target_prefix) && rule.from == original_level)
            .map(|rule| rule.to)
            .unwrap_or(original_level)
    }
}

impl Log for DemotingLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        let level = self.level_for(metadata.target(), metadata.level());
        let adjusted = Metadata::builder()
            .level(level)
            .target(metadata.target())
            .build();
        self.inner.enabled(&adjusted)
    }

    fn log(&self, record: &Record) {
        let level = self.level_for(record.target(), record.level());
        let adjusted = Record::builder()
            .level(level)
            .target(record.target())
            .args(*record.args())
            .module_path(record.module_path())
            .file(record.file())
            .line(record.line())
            .build();
        self.inner.log(&adjusted);
    }

    fn flush(&self) {
        self.inner.flush();
    }
}

pub fn init_logger(demotions: Vec<LevelDemotion>, logger: Logger) -> Result<(), SetLoggerError> {
    let max_level = logger.filter();
    log::set_boxed_logger(Box::new(DemotingLogger {
        inner: logger,
        demotions,
    }))?;
    log::set_max_level(max_level);
    Ok(())
}
