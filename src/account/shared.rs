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

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::prelude::*;
use log::error;

use super::mailbox_state::{MailboxState, MessageSnapshot};
use super::model::*;
use super::relay::{MailboxEvent, NotificationRelay};
use crate::support::error::Error;
use crate::support::log_prefix::LogPrefix;

/// A mailbox as shared between every session that can reach it.
///
/// All access to the mailbox's state and to its relay goes through a single
/// mutex. This is the serialisation boundary for the mailbox: anything done
/// under one `lock()` call is atomic with respect to every other session.
#[derive(Debug)]
pub struct SharedMailbox {
    name: String,
    inner: Mutex<LockedMailbox>,
}

/// The contents of a `SharedMailbox` while its lock is held.
#[derive(Debug)]
pub struct LockedMailbox {
    pub state: MailboxState,
    pub relay: NotificationRelay,
}

impl SharedMailbox {
    pub fn new(name: String, uid_validity: u32) -> Self {
        SharedMailbox {
            name,
            inner: Mutex::new(LockedMailbox {
                state: MailboxState::new(uid_validity),
                relay: NotificationRelay::new(),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Lock the mailbox.
    ///
    /// A poisoned lock means some session panicked half-way through a
    /// mutation. The state can't be trusted after that, so every further
    /// access fails.
    pub fn lock(
        &self,
        log_prefix: &LogPrefix,
    ) -> Result<MutexGuard<'_, LockedMailbox>, Error> {
        self.inner.lock().map_err(|_| {
            error!(
                "{} Lock on mailbox {} is poisoned; refusing access",
                log_prefix, self.name
            );
            Error::ConcurrentModification
        })
    }

    /// Append a message and tell every open session about it.
    ///
    /// `origin` is the session doing the append, if any. It is notified as
    /// well.
    pub fn append(
        &self,
        log_prefix: &LogPrefix,
        origin: Option<u64>,
        data: Arc<[u8]>,
        flags: &[Flag],
        internal_date: Option<DateTime<FixedOffset>>,
    ) -> Result<AppendResponse, Error> {
        let internal_date = internal_date.unwrap_or_else(|| {
            let now = Local::now();
            now.with_timezone(now.offset())
        });

        let mut locked = self.lock(log_prefix)?;
        let uid = locked.state.append_message(data, flags, internal_date)?;
        locked.relay.publish(origin, MailboxEvent::Appended(uid));

        Ok(AppendResponse {
            uid_validity: locked.state.uid_validity(),
            uid,
        })
    }

    /// Append copies of messages from another mailbox, under one lock.
    ///
    /// Returns the UID validity of this mailbox and the new UIDs, parallel to
    /// `messages`. Either every message is added or none is.
    pub fn append_copies(
        &self,
        log_prefix: &LogPrefix,
        origin: Option<u64>,
        messages: &[MessageSnapshot],
    ) -> Result<(u32, Vec<Uid>), Error> {
        let mut locked = self.lock(log_prefix)?;
        if !locked.state.has_room_for(messages.len()) {
            return Err(Error::MailboxFull);
        }

        let mut uids = Vec::with_capacity(messages.len());
        for message in messages {
            let uid = locked.state.append_message(
                Arc::clone(&message.data),
                &message.flags,
                message.internal_date,
            )?;
            locked.relay.publish(origin, MailboxEvent::Appended(uid));
            uids.push(uid);
        }

        Ok((locked.state.uid_validity(), uids))
    }
}

/// Shorthand for the way mailboxes are passed around.
pub type MailboxRef = Arc<SharedMailbox>;
