//-
// Copyright (c) 2020, 2023, Jason Lingle
//
// This file is part of Peekmap.
//
// Peekmap is free software: you can  redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free
// Software Foundation, either version 3 of the License, or (at your option)
// any later version.
//
// Peekmap is distributed  in the hope that  it will be useful,  but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or
// FITNESS FOR A PARTICULAR PURPOSE. See the GNU General Public License for
// more details.
//
// You should have received a copy of the GNU General Public License along with
// Peekmap. If not, see <http://www.gnu.org/licenses/>.

use std::path::Path;

use log::LevelFilter;
use log4rs::append::console::{ConsoleAppender, Target};
use log4rs::config::{Appender, Config, Root};
use log4rs::encode::pattern::PatternEncoder;

use super::error::Error;
use super::system_config::LoggingConfig;

const PATTERN: &str = "{d(%Y-%m-%d %H:%M:%S%.3f)} [{l}][{t}] {m}{n}";

/// Install the process-wide logger.
///
/// If `config` names a `log4rs` configuration file that exists, that file
/// fully controls logging. Otherwise, everything at `Info` and above goes to
/// standard error.
pub fn init(config: &LoggingConfig) -> Result<(), Error> {
    match config.config_file {
        Some(ref path) if path.is_file() => init_file(path),
        _ => init_simple_log(LevelFilter::Info),
    }
}

fn init_file(path: &Path) -> Result<(), Error> {
    log4rs::init_file(path, Default::default())
        .map_err(|e| Error::Logging(format!("{}: {}", path.display(), e)))
}

/// Install a logger which writes to standard error at the given level.
pub fn init_simple_log(level: LevelFilter) -> Result<(), Error> {
    let config = simple_config(level)?;
    log4rs::init_config(config)
        .map(|_| ())
        .map_err(|e| Error::Logging(e.to_string()))
}

fn simple_config(level: LevelFilter) -> Result<Config, Error> {
    let stderr = ConsoleAppender::builder()
        .target(Target::Stderr)
        .encoder(Box::new(PatternEncoder::new(PATTERN)))
        .build();

    Config::builder()
        .appender(Appender::builder().build("stderr", Box::new(stderr)))
        .build(Root::builder().appender("stderr").build(level))
        .map_err(|e| Error::Logging(e.to_string()))
}
