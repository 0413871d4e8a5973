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

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use chrono::prelude::*;
use log::{error, info};

use super::shared::{MailboxRef, SharedMailbox};
use crate::support::error::Error;
use crate::support::log_prefix::LogPrefix;
use crate::support::safe_name::is_safe_mailbox_name;
use crate::support::system_config::MailboxConfig;

/// The server-owned map from mailbox names to mailboxes.
///
/// The map itself is only locked for lookup and creation; once a session has
/// a `MailboxRef`, it only ever contends on that one mailbox.
#[derive(Debug)]
pub struct MailboxRegistry {
    config: MailboxConfig,
    mailboxes: RwLock<HashMap<String, MailboxRef>>,
    next_session: AtomicU64,
    last_uid_validity: AtomicU32,
}

impl MailboxRegistry {
    /// Create a registry containing the configured default mailboxes.
    pub fn new(config: MailboxConfig) -> Result<Self, Error> {
        let this = MailboxRegistry {
            config,
            mailboxes: RwLock::new(HashMap::new()),
            next_session: AtomicU64::new(1),
            last_uid_validity: AtomicU32::new(0),
        };

        let log_prefix = LogPrefix::new("registry".to_owned(), 0);
        let defaults = std::iter::once("INBOX".to_owned())
            .chain(this.config.default_mailboxes.iter().cloned())
            .collect::<Vec<_>>();
        for name in defaults {
            match this.create(&log_prefix, &name) {
                Ok(_) | Err(Error::MailboxExists) => (),
                Err(e) => return Err(e),
            }
        }

        Ok(this)
    }

    pub fn config(&self) -> &MailboxConfig {
        &self.config
    }

    /// Allocate a new, never-before-used session id.
    pub fn new_session_id(&self) -> u64 {
        self.next_session.fetch_add(1, Ordering::Relaxed)
    }

    /// Look up the mailbox with the given name.
    pub fn get(&self, name: &str) -> Result<MailboxRef, Error> {
        let key = normalise(name);
        self.mailboxes
            .read()
            .map_err(|_| Error::ConcurrentModification)?
            .get(&key)
            .cloned()
            .ok_or(Error::NxMailbox)
    }

    /// Create a new, empty mailbox.
    pub fn create(
        &self,
        log_prefix: &LogPrefix,
        name: &str,
    ) -> Result<MailboxRef, Error> {
        if !is_safe_mailbox_name(name) {
            return Err(Error::UnsafeName);
        }

        let key = normalise(name);
        let mut mailboxes = self.mailboxes.write().map_err(|_| {
            error!("{} Mailbox registry lock is poisoned", log_prefix);
            Error::ConcurrentModification
        })?;

        if mailboxes.contains_key(&key) {
            return Err(Error::MailboxExists);
        }

        let uid_validity = self.next_uid_validity();
        let mailbox = Arc::new(SharedMailbox::new(key.clone(), uid_validity));
        mailboxes.insert(key, Arc::clone(&mailbox));
        info!(
            "{} Created mailbox {} with UID validity {}",
            log_prefix,
            mailbox.name(),
            uid_validity
        );
        Ok(mailbox)
    }

    /// The names of all mailboxes, sorted.
    pub fn names(&self) -> Result<Vec<String>, Error> {
        let mut names = self
            .mailboxes
            .read()
            .map_err(|_| Error::ConcurrentModification)?
            .keys()
            .cloned()
            .collect::<Vec<_>>();
        names.sort();
        Ok(names)
    }

    /// Pick a UID validity for a new mailbox.
    ///
    /// This is the current time in seconds, but always strictly greater than
    /// the last value handed out so that a mailbox recreated in the same
    /// second still gets a distinct value.
    fn next_uid_validity(&self) -> u32 {
        let now = Utc::now().timestamp().max(1) as u32;
        let next = |prev: u32| now.max(prev.wrapping_add(1)).max(1);
        // The closure never returns None, so this can't fail
        let prev = self
            .last_uid_validity
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |prev| {
                Some(next(prev))
            })
            .unwrap_or_else(|prev| prev);
        next(prev)
    }
}

/// `INBOX` is case-insensitive; every other name is case-sensitive.
fn normalise(name: &str) -> String {
    if name.eq_ignore_ascii_case("INBOX") {
        "INBOX".to_owned()
    } else {
        name.to_owned()
    }
}
