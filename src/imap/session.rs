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

//! A session's relationship with the mailbox it has open.
//!
//! The mailbox itself is shared; what is private to a session is its _view_:
//! the sequence number mapping it has told the client about, the set of
//! messages it reports as `\Recent`, and the queue of changes made by other
//! sessions that it has yet to report. The view only changes at poll points,
//! so sequence numbers stay stable between them no matter what other sessions
//! do.
//!
//! Whether the session may change the mailbox is decided by
//! `SessionAccessMode`. Mutating operations live on `WritableMailbox`, which
//! can only be obtained from a `Selected` mode, so an `Examined` session has
//! no way to reach them.

use std::collections::BTreeSet;
use std::fmt;
use std::mem;
use std::sync::Arc;

use log::{debug, info, warn};

use crate::account::mailbox_state::MessageSnapshot;
use crate::account::model::*;
use crate::account::relay::{EventReceiver, MailboxEvent};
use crate::account::shared::MailboxRef;
use crate::support::error::Error;
use crate::support::log_prefix::LogPrefix;
use crate::support::system_config::MailboxConfig;

pub enum SessionAccessMode {
    /// No mailbox is open.
    Closed,
    /// A mailbox is open read-write (`SELECT`).
    Selected(OpenMailbox),
    /// A mailbox is open read-only (`EXAMINE`).
    Examined(OpenMailbox),
}

impl Default for SessionAccessMode {
    fn default() -> Self {
        SessionAccessMode::Closed
    }
}

impl fmt::Debug for SessionAccessMode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            SessionAccessMode::Closed => write!(f, "Closed"),
            SessionAccessMode::Selected(ref open) => {
                write!(f, "Selected({})", open.mailbox.name())
            }
            SessionAccessMode::Examined(ref open) => {
                write!(f, "Examined({})", open.mailbox.name())
            }
        }
    }
}

impl SessionAccessMode {
    pub fn is_open(&self) -> bool {
        !matches!(*self, SessionAccessMode::Closed)
    }

    pub fn is_read_only(&self) -> bool {
        matches!(*self, SessionAccessMode::Examined(_))
    }

    /// The open mailbox, in either mode.
    pub fn open_mailbox(&self) -> Result<&OpenMailbox, Error> {
        match *self {
            SessionAccessMode::Closed => Err(Error::NoMailboxSelected),
            SessionAccessMode::Selected(ref open)
            | SessionAccessMode::Examined(ref open) => Ok(open),
        }
    }

    pub fn open_mailbox_mut(&mut self) -> Result<&mut OpenMailbox, Error> {
        match *self {
            SessionAccessMode::Closed => Err(Error::NoMailboxSelected),
            SessionAccessMode::Selected(ref mut open)
            | SessionAccessMode::Examined(ref mut open) => Ok(open),
        }
    }

    /// Check that the session may change the mailbox, without doing so.
    ///
    /// This is the only place the read-only contract is decided.
    pub fn require_writable(&self) -> Result<(), Error> {
        match *self {
            SessionAccessMode::Closed => Err(Error::NoMailboxSelected),
            SessionAccessMode::Examined(_) => Err(Error::MailboxReadOnly),
            SessionAccessMode::Selected(_) => Ok(()),
        }
    }

    /// Obtain a handle that can change the mailbox.
    pub fn writable(&mut self) -> Result<WritableMailbox<'_>, Error> {
        self.require_writable()?;
        match *self {
            SessionAccessMode::Selected(ref mut open) => {
                Ok(WritableMailbox(open))
            }
            _ => Err(Error::MailboxReadOnly),
        }
    }

    /// Leave the current mode, returning to `Closed`.
    ///
    /// If the mailbox was open read-write and `expunge` is true, messages
    /// marked `\Deleted` are expunged first. Failure of that expunge is
    /// logged but does not prevent the close. A read-only mailbox is never
    /// expunged.
    pub fn close(&mut self, expunge: bool) -> Result<(), Error> {
        match mem::take(self) {
            SessionAccessMode::Closed => Err(Error::NoMailboxSelected),
            SessionAccessMode::Selected(mut open) => {
                if expunge {
                    let result = WritableMailbox(&mut open).expunge(None);
                    if let Err(e) = result {
                        warn!(
                            "{} Implicit expunge on close failed: {}",
                            open.log_prefix, e
                        );
                    }
                }
                open.release();
                Ok(())
            }
            SessionAccessMode::Examined(open) => {
                open.release();
                Ok(())
            }
        }
    }
}

/// A mailbox as seen by one session.
pub struct OpenMailbox {
    mailbox: MailboxRef,
    session: u64,
    log_prefix: LogPrefix,
    read_only: bool,
    events: EventReceiver,
    /// The UIDs the client knows about, in sequence number order.
    uids: Vec<Uid>,
    /// The greatest UID that has ever been part of `uids`.
    max_seen: Option<Uid>,
    /// The UIDs this session reports as `\Recent`.
    recent: BTreeSet<Uid>,
    /// Messages expunged by other sessions which are still in `uids` because
    /// the client hasn't been told yet.
    pending_expunge: BTreeSet<Uid>,
}

impl OpenMailbox {
    /// Open `mailbox` for the session identified by `session`.
    ///
    /// Subscribing to the relay, copying the message list, and claiming the
    /// recent set all happen under one lock acquisition, so the session's
    /// view and its event queue start from the same point.
    pub fn open(
        mailbox: MailboxRef,
        session: u64,
        log_prefix: LogPrefix,
        read_only: bool,
        config: &MailboxConfig,
    ) -> Result<(Self, SelectResponse), Error> {
        let (events, uids, recent, response) = {
            let mut locked = mailbox.lock(&log_prefix)?;
            let events = locked.relay.subscribe(session);
            let uids = locked.state.uids().collect::<Vec<_>>();
            let recent = locked
                .state
                .snapshot_recent_set(read_only)
                .into_iter()
                .collect::<BTreeSet<_>>();
            let flags = locked.state.defined_flags();

            let response = SelectResponse {
                permanent_flags: if read_only {
                    vec![]
                } else {
                    flags.clone()
                },
                keywords_allowed: !read_only && config.allow_keywords,
                flags,
                exists: uids.len(),
                recent: recent.len(),
                unseen: locked.state.first_unseen(),
                uidnext: locked.state.next_uid(),
                uidvalidity: locked.state.uid_validity(),
                read_only,
            };

            (events, uids, recent, response)
        };

        Ok((
            OpenMailbox {
                max_seen: uids.last().copied(),
                mailbox,
                session,
                log_prefix,
                read_only,
                events,
                uids,
                recent,
                pending_expunge: BTreeSet::new(),
            },
            response,
        ))
    }

    pub fn name(&self) -> &str {
        self.mailbox.name()
    }

    pub fn read_only(&self) -> bool {
        self.read_only
    }

    /// The number of messages in this session's view.
    pub fn exists(&self) -> usize {
        self.uids.len()
    }

    /// The greatest sequence number currently valid, for `*`.
    pub fn max_seqnum(&self) -> Option<Seqnum> {
        if self.uids.is_empty() {
            None
        } else {
            Some(Seqnum::from_index(self.uids.len() - 1))
        }
    }

    /// The value of `*` in a UID set.
    pub fn max_uid(&self) -> Option<Uid> {
        self.uids.last().copied()
    }

    pub fn is_recent(&self, uid: Uid) -> bool {
        self.recent.contains(&uid)
    }

    pub fn seqnum_of(&self, uid: Uid) -> Option<Seqnum> {
        self.uids.binary_search(&uid).ok().map(Seqnum::from_index)
    }

    pub fn uid_of(&self, seqnum: Seqnum) -> Result<Uid, Error> {
        self.uids
            .get(seqnum.to_index())
            .copied()
            .ok_or(Error::NxMessage)
    }

    /// Translate sequence numbers into UIDs.
    ///
    /// Every sequence number must be within the view; otherwise nothing is
    /// translated and the result is `NxMessage`.
    pub fn resolve_seqnums(
        &self,
        ids: &SeqRange<Seqnum>,
    ) -> Result<Vec<Uid>, Error> {
        if ids.max().map_or(false, |max| max as usize > self.uids.len()) {
            return Err(Error::NxMessage);
        }

        ids.items(self.uids.len() as u32)
            .map(|seqnum| self.uid_of(seqnum))
            .collect()
    }

    /// Filter `ids` down to the UIDs in the view.
    ///
    /// Clients may name UIDs that don't exist, so those are silently
    /// dropped.
    pub fn resolve_uids(&self, ids: &SeqRange<Uid>) -> Vec<Uid> {
        self.uids
            .iter()
            .copied()
            .filter(|&uid| ids.contains(uid))
            .collect()
    }

    /// Fetch the given messages.
    ///
    /// If the request would set `\Seen` and the mailbox is open read-write,
    /// the flag is set and other sessions are told. Under `EXAMINE`, the
    /// mailbox is left exactly as it was.
    pub fn fetch<ID>(
        &mut self,
        uids: &[Uid],
        request: &FetchRequest<ID>,
    ) -> Result<FetchResponse, Error>
    where
        SeqRange<ID>: fmt::Debug,
    {
        let mark_seen = request.sets_seen() && !self.read_only;
        let mailbox = Arc::clone(&self.mailbox);
        let mut locked = mailbox.lock(&self.log_prefix)?;
        let locked = &mut *locked;

        let mut response = FetchResponse {
            messages: Vec::with_capacity(uids.len()),
            ok: true,
        };

        for &uid in uids {
            let seqnum = match self.seqnum_of(uid) {
                Some(seqnum) => seqnum,
                None => continue,
            };

            if !locked.state.contains(uid) {
                response.ok = false;
                continue;
            }

            let mut seen_changed = false;
            if mark_seen {
                match locked.state.set_flag(uid, &Flag::Seen, true) {
                    Ok(changed) => seen_changed = changed,
                    Err(e) => warn!(
                        "{} Failed to implicitly set \\Seen on {:?}: {}",
                        self.log_prefix, uid, e
                    ),
                }

                if seen_changed {
                    locked.relay.publish(
                        Some(self.session),
                        MailboxEvent::FlagsChanged(uid),
                    );
                }
            }

            let flags = if request.flags || seen_changed {
                locked.state.flags_of(uid).map(|flags| FlagsUpdate {
                    seqnum,
                    uid,
                    flags,
                    recent: self.recent.contains(&uid),
                })
            } else {
                None
            };

            let body = if request.body {
                locked.state.message(uid).map(|m| Arc::clone(m.data()))
            } else {
                None
            };

            response.messages.push(FetchedMessage {
                seqnum,
                uid: if request.uid { Some(uid) } else { None },
                flags,
                body,
            });
        }

        Ok(response)
    }

    /// Take copies of the given messages for `COPY` or `MOVE`.
    ///
    /// Fails with `ExpungedMessage` without copying anything if any of them
    /// has been expunged by another session.
    pub fn snapshot_messages(
        &self,
        uids: &[Uid],
    ) -> Result<Vec<MessageSnapshot>, Error> {
        let locked = self.mailbox.lock(&self.log_prefix)?;
        uids.iter()
            .map(|&uid| {
                locked
                    .state
                    .snapshot_message(uid)
                    .ok_or(Error::ExpungedMessage)
            })
            .collect()
    }

    /// Catch up with changes made by other sessions.
    ///
    /// A full poll removes expunged messages from the view. A mini poll
    /// (`full == false`) is for use after commands during which RFC 3501
    /// forbids `EXPUNGE` responses; it only reports new messages and flag
    /// changes, and leaves expunges queued for the next full poll.
    pub fn poll(&mut self, full: bool) -> Result<PollResponse, Error> {
        let mailbox = Arc::clone(&self.mailbox);
        let mut locked = mailbox.lock(&self.log_prefix)?;

        let mut changed = BTreeSet::new();
        for event in self.events.try_iter() {
            match event {
                MailboxEvent::Appended(_) => (),
                MailboxEvent::FlagsChanged(uid) => {
                    changed.insert(uid);
                }
                MailboxEvent::Expunged(uid) => {
                    self.pending_expunge.insert(uid);
                }
            }
        }

        let mut response = PollResponse::default();

        if full && !self.pending_expunge.is_empty() {
            let gone = mem::take(&mut self.pending_expunge);
            response.expunge = self.remove_from_view(&gone);
        }

        let max_seen = self.max_seen;
        let new_uids = locked
            .state
            .uids()
            .filter(|&uid| max_seen.map_or(true, |max| uid > max))
            .collect::<Vec<_>>();
        if let (Some(&first), Some(&last)) = (new_uids.first(), new_uids.last())
        {
            self.recent.extend(
                locked.state.claim_recent(first, last, self.read_only),
            );
            self.uids.extend_from_slice(&new_uids);
            self.max_seen = Some(last);
            response.exists = Some(self.uids.len());
            response.recent = Some(self.recent.len());
        }

        for uid in changed {
            if self.pending_expunge.contains(&uid) {
                continue;
            }

            let seqnum = match self.seqnum_of(uid) {
                Some(seqnum) => seqnum,
                None => continue,
            };

            if let Some(flags) = locked.state.flags_of(uid) {
                response.fetch.push(FlagsUpdate {
                    seqnum,
                    uid,
                    flags,
                    recent: self.recent.contains(&uid),
                });
            }
        }

        if !response.is_empty() {
            debug!(
                "{} Poll: {} expunged, {} new, {} flag updates",
                self.log_prefix,
                response.expunge.len(),
                new_uids.len(),
                response.fetch.len()
            );
        }

        Ok(response)
    }

    /// Remove `gone` from the view, returning the removed messages in
    /// descending sequence number order.
    fn remove_from_view(&mut self, gone: &BTreeSet<Uid>) -> Vec<(Seqnum, Uid)> {
        let removed = self
            .uids
            .iter()
            .enumerate()
            .rev()
            .filter(|&(_, uid)| gone.contains(uid))
            .map(|(ix, &uid)| (Seqnum::from_index(ix), uid))
            .collect::<Vec<_>>();

        self.uids.retain(|uid| !gone.contains(uid));
        for uid in gone {
            self.recent.remove(uid);
        }

        removed
    }

    /// Stop receiving events for this mailbox.
    fn release(self) {
        // If this fails, the receiver is still dropped and the relay forgets
        // it on the next publish.
        if let Ok(mut locked) = self.mailbox.lock(&self.log_prefix) {
            locked.relay.unsubscribe(self.session);
        }

        info!("{} Closed {}", self.log_prefix, self.mailbox.name());
    }
}

/// An open mailbox which this session may modify.
///
/// Only `SessionAccessMode::writable()` creates these.
pub struct WritableMailbox<'a>(&'a mut OpenMailbox);

impl<'a> WritableMailbox<'a> {
    /// Apply a `STORE` to the given messages under one lock acquisition.
    ///
    /// Messages expunged by another session are skipped and reported by
    /// clearing `ok`; the rest of the batch is still applied.
    pub fn store(
        &mut self,
        uids: &[Uid],
        flags: &[Flag],
        mode: StoreMode,
        loud: bool,
    ) -> Result<StoreResponse, Error> {
        let open = &mut *self.0;
        let mailbox = Arc::clone(&open.mailbox);
        let mut locked = mailbox.lock(&open.log_prefix)?;
        let locked = &mut *locked;

        let mut response = StoreResponse {
            fetch: Vec::new(),
            ok: true,
        };

        for &uid in uids {
            let seqnum = match open.seqnum_of(uid) {
                Some(seqnum) => seqnum,
                None => continue,
            };

            if !locked.state.contains(uid) {
                response.ok = false;
                continue;
            }

            let changed = locked.state.store(uid, flags, mode)?;
            if changed {
                locked.relay.publish(
                    Some(open.session),
                    MailboxEvent::FlagsChanged(uid),
                );
            }

            if changed || loud {
                if let Some(flags) = locked.state.flags_of(uid) {
                    response.fetch.push(FlagsUpdate {
                        seqnum,
                        uid,
                        flags,
                        recent: open.recent.contains(&uid),
                    });
                }
            }
        }

        Ok(response)
    }

    /// Expunge `\Deleted` messages.
    ///
    /// If `candidates` is given (`UID EXPUNGE`), only those messages are
    /// considered. Either way, only messages in this session's view are
    /// affected.
    pub fn expunge(
        &mut self,
        candidates: Option<&SeqRange<Uid>>,
    ) -> Result<ExpungeResponse, Error> {
        let open = &mut *self.0;
        let mut restricted = SeqRange::new();
        for &uid in &open.uids {
            if candidates.map_or(true, |c| c.contains(uid)) {
                restricted.insert(uid, uid);
            }
        }

        let removed = {
            let mut locked = open.mailbox.lock(&open.log_prefix)?;
            let removed = locked.state.expunge(&restricted);
            for &uid in &removed {
                locked
                    .relay
                    .publish(Some(open.session), MailboxEvent::Expunged(uid));
            }
            removed
        };

        if !removed.is_empty() {
            info!(
                "{} Expunged {} message(s)",
                open.log_prefix,
                removed.len()
            );
        }

        let gone = removed.into_iter().collect::<BTreeSet<_>>();
        Ok(ExpungeResponse {
            expunged: open.remove_from_view(&gone),
        })
    }

    /// Remove the given messages regardless of their flags, as the second
    /// half of `MOVE`.
    pub fn remove(
        &mut self,
        uids: &[Uid],
    ) -> Result<Vec<(Seqnum, Uid)>, Error> {
        let open = &mut *self.0;
        let mut targets = SeqRange::new();
        for &uid in uids {
            targets.insert(uid, uid);
        }

        let removed = {
            let mut locked = open.mailbox.lock(&open.log_prefix)?;
            let removed = locked.state.remove_messages(&targets);
            for &uid in &removed {
                locked
                    .relay
                    .publish(Some(open.session), MailboxEvent::Expunged(uid));
            }
            removed
        };

        let gone = removed.into_iter().collect::<BTreeSet<_>>();
        Ok(open.remove_from_view(&gone))
    }
}
