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

//! The authoritative in-memory state of one mailbox.
//!
//! `MailboxState` knows nothing about sessions or permissions. It is only
//! ever reached through `SharedMailbox`, whose lock serialises every read and
//! write, and the read-only checks happen in the controller before anything
//! here is called. What it does guarantee is that nothing is silently
//! ignored: each mutation either happens or returns an error.

use std::sync::Arc;

use chrono::prelude::*;

use super::flag_set::{FlagId, FlagSet};
use super::model::*;
use super::recency::RecencyToken;
use crate::support::error::Error;

/// A message stored in a mailbox.
#[derive(Clone, Debug)]
pub struct Message {
    uid: Uid,
    flags: FlagSet,
    internal_date: DateTime<FixedOffset>,
    data: Arc<[u8]>,
}

impl Message {
    pub fn uid(&self) -> Uid {
        self.uid
    }

    pub fn flags(&self) -> &FlagSet {
        &self.flags
    }

    pub fn internal_date(&self) -> DateTime<FixedOffset> {
        self.internal_date
    }

    pub fn data(&self) -> &Arc<[u8]> {
        &self.data
    }
}

/// A detached copy of a message, with its flags resolved, as needed to copy
/// it into another mailbox.
#[derive(Clone, Debug)]
pub struct MessageSnapshot {
    pub uid: Uid,
    pub flags: Vec<Flag>,
    pub internal_date: DateTime<FixedOffset>,
    pub data: Arc<[u8]>,
}

#[derive(Clone, Debug)]
pub struct MailboxState {
    /// All messages, sorted ascending by UID. The shared sequence number of a
    /// message is its index plus one.
    messages: Vec<Message>,
    /// Every flag ever used in this mailbox, indexed by `FlagId`.
    flags: Vec<Flag>,
    /// The UID the next message will get, or `None` once the UID space is
    /// used up.
    next_uid: Option<Uid>,
    uid_validity: u32,
    recency: RecencyToken,
}

impl MailboxState {
    pub fn new(uid_validity: u32) -> Self {
        MailboxState {
            messages: Vec::new(),
            flags: Flag::system_flags().to_vec(),
            next_uid: Some(Uid::MIN),
            uid_validity,
            recency: RecencyToken::new(),
        }
    }

    pub fn uid_validity(&self) -> u32 {
        self.uid_validity
    }

    /// The UID that the next appended message will receive.
    ///
    /// If the UID space is exhausted, this is `Uid::MAX`, which is already
    /// taken; this matches what `UIDNEXT` should report in that case.
    pub fn next_uid(&self) -> Uid {
        self.next_uid.unwrap_or(Uid::MAX)
    }

    /// Whether `count` more messages can be appended before the UID space
    /// runs out.
    pub fn has_room_for(&self, count: usize) -> bool {
        self.next_uid.map_or(0 == count, |next| {
            (u32::MAX - next.0.get()) as u64 + 1 >= count as u64
        })
    }

    /// Pretend that every UID below `uid` has already been used.
    #[cfg(test)]
    pub(crate) fn skip_uids_to(&mut self, uid: Uid) {
        self.next_uid = Some(uid);
    }

    pub fn num_messages(&self) -> usize {
        self.messages.len()
    }

    pub fn max_uid(&self) -> Option<Uid> {
        self.messages.last().map(Message::uid)
    }

    pub fn uids<'a>(&'a self) -> impl Iterator<Item = Uid> + 'a {
        self.messages.iter().map(Message::uid)
    }

    pub fn message(&self, uid: Uid) -> Option<&Message> {
        self.uid_index(uid).map(|ix| &self.messages[ix])
    }

    pub fn contains(&self, uid: Uid) -> bool {
        self.uid_index(uid).is_some()
    }

    fn uid_index(&self, uid: Uid) -> Option<usize> {
        self.messages.binary_search_by_key(&uid, Message::uid).ok()
    }

    /// The current position of `uid` in the mailbox.
    pub fn uid_to_seqnum(&self, uid: Uid) -> Option<Seqnum> {
        self.uid_index(uid).map(Seqnum::from_index)
    }

    pub fn seqnum_to_uid(&self, seqnum: Seqnum) -> Option<Uid> {
        self.messages.get(seqnum.to_index()).map(Message::uid)
    }

    /// The sequence number of the first message lacking `\Seen`.
    pub fn first_unseen(&self) -> Option<Seqnum> {
        let seen = self.flag_id(&Flag::Seen);
        self.messages
            .iter()
            .position(|m| !seen.map_or(false, |fid| m.flags.contains(fid)))
            .map(Seqnum::from_index)
    }

    /// Look up the id of `flag`, if it has ever been used in this mailbox.
    pub fn flag_id(&self, flag: &Flag) -> Option<FlagId> {
        self.flags.iter().position(|f| f == flag).map(FlagId)
    }

    /// Look up the id of `flag`, interning it if it is new.
    pub fn flag_id_mut(&mut self, flag: Flag) -> FlagId {
        if let Some(id) = self.flag_id(&flag) {
            id
        } else {
            self.flags.push(flag);
            FlagId(self.flags.len() - 1)
        }
    }

    pub fn flag(&self, id: FlagId) -> Option<&Flag> {
        self.flags.get(id.0)
    }

    /// All flags defined in this mailbox, system flags first.
    pub fn defined_flags(&self) -> Vec<Flag> {
        self.flags.clone()
    }

    /// The flags set on `uid`, or `None` if there is no such message.
    pub fn flags_of(&self, uid: Uid) -> Option<Vec<Flag>> {
        let message = self.message(uid)?;
        Some(
            message
                .flags
                .iter()
                .filter_map(|fid| self.flag(fid).cloned())
                .collect(),
        )
    }

    pub fn snapshot_message(&self, uid: Uid) -> Option<MessageSnapshot> {
        let message = self.message(uid)?;
        Some(MessageSnapshot {
            uid,
            flags: self.flags_of(uid)?,
            internal_date: message.internal_date,
            data: Arc::clone(&message.data),
        })
    }

    pub fn test_flag(&self, flag: &Flag, uid: Uid) -> bool {
        match (self.flag_id(flag), self.message(uid)) {
            (Some(fid), Some(message)) => message.flags.contains(fid),
            _ => false,
        }
    }

    /// Add a new message to the end of the mailbox.
    ///
    /// The new UID is above the recency frontier, so the message is part of
    /// the recent set until some read-write session claims it.
    pub fn append_message(
        &mut self,
        data: Arc<[u8]>,
        flags: &[Flag],
        internal_date: DateTime<FixedOffset>,
    ) -> Result<Uid, Error> {
        let uid = self.next_uid.ok_or(Error::MailboxFull)?;

        let mut flag_set = FlagSet::new();
        for flag in flags {
            flag_set.insert(self.flag_id_mut(flag.clone()));
        }

        self.messages.push(Message {
            uid,
            flags: flag_set,
            internal_date,
            data,
        });
        self.next_uid = uid.next();
        Ok(uid)
    }

    /// Set (`on`) or clear a single flag on `uid`.
    ///
    /// Returns whether the flag actually changed.
    pub fn set_flag(
        &mut self,
        uid: Uid,
        flag: &Flag,
        on: bool,
    ) -> Result<bool, Error> {
        let mode = if on { StoreMode::Add } else { StoreMode::Remove };
        self.store(uid, std::slice::from_ref(flag), mode)
    }

    /// Apply one message's part of a `STORE`.
    ///
    /// Returns whether the flags of the message changed.
    pub fn store(
        &mut self,
        uid: Uid,
        flags: &[Flag],
        mode: StoreMode,
    ) -> Result<bool, Error> {
        let ix = self.uid_index(uid).ok_or(Error::NxMessage)?;

        // Removing a flag never seen before is a no-op, so there's no need to
        // intern it.
        let ids: Vec<FlagId> = if StoreMode::Remove == mode {
            flags.iter().filter_map(|f| self.flag_id(f)).collect()
        } else {
            flags.iter().map(|f| self.flag_id_mut(f.clone())).collect()
        };

        let message_flags = &mut self.messages[ix].flags;
        let mut changed = false;
        match mode {
            StoreMode::Add => {
                for &id in &ids {
                    changed |= message_flags.insert(id);
                }
            }
            StoreMode::Remove => {
                for &id in &ids {
                    changed |= message_flags.remove(id);
                }
            }
            StoreMode::Replace => {
                let mut replacement = FlagSet::new();
                for &id in &ids {
                    replacement.insert(id);
                }
                changed = *message_flags != replacement;
                *message_flags = replacement;
            }
        }

        Ok(changed)
    }

    /// Remove every message in `candidates` which has the `\Deleted` flag.
    ///
    /// Returns the removed UIDs in ascending order.
    pub fn expunge(&mut self, candidates: &SeqRange<Uid>) -> Vec<Uid> {
        let deleted = match self.flag_id(&Flag::Deleted) {
            Some(deleted) => deleted,
            None => return Vec::new(),
        };

        self.remove_where(|m| {
            m.flags.contains(deleted) && candidates.contains(m.uid)
        })
    }

    /// Remove the given messages regardless of their flags.
    ///
    /// This is the second half of `MOVE`. Returns the UIDs which were actually
    /// present, ascending.
    pub fn remove_messages(&mut self, uids: &SeqRange<Uid>) -> Vec<Uid> {
        self.remove_where(|m| uids.contains(m.uid))
    }

    fn remove_where(
        &mut self,
        mut pred: impl FnMut(&Message) -> bool,
    ) -> Vec<Uid> {
        let mut removed = Vec::new();
        self.messages.retain(|m| {
            if pred(m) {
                removed.push(m.uid);
                false
            } else {
                true
            }
        });
        removed
    }

    /// Determine the recent set for a session that is opening the mailbox.
    ///
    /// A read-write open (`SELECT`) drains the recent set, so nobody else
    /// will see these messages as recent. A read-only open (`EXAMINE`) gets
    /// the same answer but leaves the recent set untouched.
    pub fn snapshot_recent_set(&mut self, read_only: bool) -> Vec<Uid> {
        match (self.messages.first(), self.messages.last()) {
            (Some(first), Some(last)) => {
                let (first, last) = (first.uid, last.uid);
                self.claim_recent(first, last, read_only)
            }
            _ => Vec::new(),
        }
    }

    /// Claim recency for messages `min..=max` which a session is discovering
    /// for the first time (e.g. new arrivals noticed during a poll).
    ///
    /// Returns the UIDs in that range which the session should report as
    /// `\Recent`.
    pub fn claim_recent(
        &mut self,
        min: Uid,
        max: Uid,
        read_only: bool,
    ) -> Vec<Uid> {
        match self.recency.claim(min, max, read_only) {
            Some(start) => self
                .uids()
                .filter(|&uid| uid >= start && uid <= max)
                .collect(),
            None => Vec::new(),
        }
    }

    /// The UIDs currently in the mailbox-wide recent set.
    pub fn recent_set(&self) -> Vec<Uid> {
        let frontier = self.recency.frontier();
        self.uids()
            .filter(|&uid| frontier.map_or(true, |f| uid > f))
            .collect()
    }
}
