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

//! Bookkeeping for the `\Recent` "flag".
//!
//! RFC 3501 describes `\Recent` as a flag, but it behaves nothing like one.
//! It is immutable, and its value differs between sessions: a message is
//! `\Recent` in a session if and only if no read-write session had assigned
//! it a sequence number before. Every read-only session up to that point, and
//! the first read-write session itself, see it as `\Recent`; everyone
//! afterwards does not.
//!
//! Since UIDs are assigned in strictly ascending order, the "recent set" of a
//! mailbox is always a suffix of its UID space. We therefore only track one
//! value, the _frontier_: the greatest UID that any read-write session has
//! claimed. Claims are range-based. The claimant offers the range of UIDs it
//! is about to assign sequence numbers to, and gets back the lower bound of
//! the part of that range it should mark `\Recent` (the upper bound is the
//! end of the offered range).
//!
//! A read-write claim advances the frontier, so the same UIDs can never be
//! claimed by another read-write session. A read-only claim leaves the
//! frontier where it is, which is what makes `EXAMINE` free of side effects.
//!
//! The token lives inside `MailboxState`, so claims are serialised by the
//! mailbox lock and two concurrent `SELECT`s can never both claim a message.

use super::model::Uid;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RecencyToken {
    frontier: Option<Uid>,
}

impl RecencyToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// The greatest UID claimed by a read-write session, if any.
    pub fn frontier(&self) -> Option<Uid> {
        self.frontier
    }

    /// Go through the recency claim process for the UIDs `min_uid..=max_uid`.
    ///
    /// If any of them should be considered `\Recent`, returns the minimum
    /// such UID; everything from there up to `max_uid` is recent.
    pub fn claim(
        &mut self,
        min_uid: Uid,
        max_uid: Uid,
        read_only: bool,
    ) -> Option<Uid> {
        if min_uid > max_uid {
            return None;
        }

        let first_unclaimed = match self.frontier {
            None => Uid::MIN,
            Some(frontier) if frontier >= max_uid => return None,
            // frontier < max_uid, so there is always a next UID
            Some(frontier) => frontier.next()?,
        };

        if !read_only {
            self.frontier = Some(max_uid);
        }

        Some(first_unclaimed.max(min_uid))
    }
}
