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

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::error::Error;

/// The system-wide configuration for Peekmap.
///
/// This is normally stored in a file named `peekmap.toml` next to the logging
/// configuration. Every field has a default, so an empty file is a valid
/// configuration.
#[derive(Clone, Debug, Deserialize, Serialize, Default)]
pub struct SystemConfig {
    /// Behaviour of selected mailboxes.
    #[serde(default)]
    pub mailbox: MailboxConfig,

    /// Where to find the `log4rs` configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct MailboxConfig {
    /// If true, closing a mailbox opened with `SELECT` permanently removes
    /// all messages with the `\Deleted` flag, as RFC 3501 requires of
    /// `CLOSE`. This applies equally to the implicit close when another
    /// mailbox is opened and when the session disconnects. `UNSELECT` never
    /// expunges.
    ///
    /// Closing a mailbox opened with `EXAMINE` never expunges anything.
    pub expunge_on_close: bool,

    /// Whether clients may create new keywords. Controls whether `\*` is
    /// included in `PERMANENTFLAGS` for read-write sessions.
    pub allow_keywords: bool,

    /// Mailboxes which are created when the registry is set up.
    ///
    /// `INBOX` always exists regardless of this setting.
    pub default_mailboxes: Vec<String>,
}

impl Default for MailboxConfig {
    fn default() -> Self {
        MailboxConfig {
            expunge_on_close: true,
            allow_keywords: true,
            default_mailboxes: vec!["INBOX".to_owned()],
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Path to a `log4rs` TOML configuration file.
    ///
    /// Relative paths are resolved against the directory containing the
    /// system configuration. If unset or the file does not exist, logging
    /// goes to standard error.
    pub config_file: Option<PathBuf>,
}

impl SystemConfig {
    /// Load the configuration from the TOML file at `path`.
    ///
    /// Relative paths in the file are made absolute with respect to the
    /// directory containing `path`.
    pub fn load(path: &Path) -> Result<Self, Error> {
        let text = fs::read_to_string(path)?;
        let mut config = Self::parse(&text)?;

        if let (Some(dir), Some(file)) =
            (path.parent(), config.logging.config_file.as_mut())
        {
            if file.is_relative() {
                let absolute = dir.join(&*file);
                *file = absolute;
            }
        }

        Ok(config)
    }

    /// Parse the configuration from TOML text.
    pub fn parse(text: &str) -> Result<Self, Error> {
        Ok(toml::from_str(text)?)
    }
}
