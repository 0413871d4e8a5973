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

use std::fmt;
use std::sync::Arc;

use log::{info, warn};

use super::session::{OpenMailbox, SessionAccessMode};
use crate::account::model::*;
use crate::account::registry::MailboxRegistry;
use crate::support::error::Error;
use crate::support::log_prefix::LogPrefix;

/// Mediates every mailbox command of one session.
///
/// Each command is checked against the session's access mode before anything
/// in the shared mailbox is touched. Sequence numbers are validated up front
/// as well, so a rejected command never has any partial effect.
///
/// Dropping the controller is equivalent to a disconnect.
pub struct MailboxSessionController {
    registry: Arc<MailboxRegistry>,
    session: u64,
    log_prefix: LogPrefix,
    mode: SessionAccessMode,
}

impl fmt::Debug for MailboxSessionController {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "MailboxSessionController({}, {:?})",
            self.log_prefix, self.mode
        )
    }
}

impl MailboxSessionController {
    /// Create a controller for a session authenticated as `user`.
    pub fn new(registry: Arc<MailboxRegistry>, user: &str) -> Self {
        let session = registry.new_session_id();
        let log_prefix = LogPrefix::new("imap".to_owned(), session);
        log_prefix.set_user(user.to_owned());
        info!("{} Session started", log_prefix);

        MailboxSessionController {
            registry,
            session,
            log_prefix,
            mode: SessionAccessMode::Closed,
        }
    }

    pub fn session_id(&self) -> u64 {
        self.session
    }

    pub fn log_prefix(&self) -> &LogPrefix {
        &self.log_prefix
    }

    pub fn mode(&self) -> &SessionAccessMode {
        &self.mode
    }

    pub fn select(&mut self, mailbox: &str) -> Result<SelectResponse, Error> {
        self.open(mailbox, false)
    }

    pub fn examine(&mut self, mailbox: &str) -> Result<SelectResponse, Error> {
        self.open(mailbox, true)
    }

    fn open(
        &mut self,
        name: &str,
        read_only: bool,
    ) -> Result<SelectResponse, Error> {
        // Whatever happens next, the old mailbox is no longer selected. This
        // is an implicit CLOSE, so a read-write mailbox is expunged per the
        // configuration.
        if self.mode.is_open() {
            let expunge = self.registry.config().expunge_on_close;
            self.mode.close(expunge)?;
            self.log_prefix.set_mailbox(None);
        }

        let mailbox = self.registry.get(name)?;
        let (open, response) = OpenMailbox::open(
            mailbox,
            self.session,
            self.log_prefix.clone(),
            read_only,
            self.registry.config(),
        )?;

        self.log_prefix.set_mailbox(Some(open.name()));
        info!(
            "{} {} with {} messages, {} recent",
            self.log_prefix,
            if read_only { "Examined" } else { "Selected" },
            response.exists,
            response.recent
        );

        self.mode = if read_only {
            SessionAccessMode::Examined(open)
        } else {
            SessionAccessMode::Selected(open)
        };

        Ok(response)
    }

    /// `CLOSE`: deselect, expunging first if the mailbox was selected
    /// read-write and the configuration asks for it.
    pub fn close(&mut self) -> Result<(), Error> {
        let expunge = self.registry.config().expunge_on_close;
        self.mode.close(expunge)?;
        self.log_prefix.set_mailbox(None);
        Ok(())
    }

    /// `UNSELECT` (RFC 3691): deselect without expunging.
    pub fn unselect(&mut self) -> Result<(), Error> {
        self.mode.close(false)?;
        self.log_prefix.set_mailbox(None);
        Ok(())
    }

    /// End the session.
    ///
    /// The open mailbox, if any, is closed the same way as by `CLOSE`.
    pub fn logout(&mut self) {
        if self.mode.is_open() {
            let expunge = self.registry.config().expunge_on_close;
            if let Err(e) = self.mode.close(expunge) {
                warn!(
                    "{} Closing mailbox on logout failed: {}",
                    self.log_prefix, e
                );
            }
            self.log_prefix.set_mailbox(None);
        }
    }

    /// Report changes made by other sessions.
    ///
    /// With no mailbox open, there is nothing to report.
    pub fn poll(&mut self) -> Result<PollResponse, Error> {
        match self.mode.open_mailbox_mut() {
            Ok(open) => open.poll(true),
            Err(_) => Ok(PollResponse::default()),
        }
    }

    /// Like `poll()`, but holds back `EXPUNGE` responses, for use after
    /// commands which address messages by sequence number.
    pub fn mini_poll(&mut self) -> Result<PollResponse, Error> {
        match self.mode.open_mailbox_mut() {
            Ok(open) => open.poll(false),
            Err(_) => Ok(PollResponse::default()),
        }
    }

    pub fn seqnum_fetch(
        &mut self,
        request: &FetchRequest<Seqnum>,
    ) -> Result<FetchResponse, Error> {
        let open = self.mode.open_mailbox_mut()?;
        let uids = open.resolve_seqnums(&request.ids)?;
        open.fetch(&uids, request)
    }

    pub fn uid_fetch(
        &mut self,
        request: &FetchRequest<Uid>,
    ) -> Result<FetchResponse, Error> {
        let open = self.mode.open_mailbox_mut()?;
        let uids = open.resolve_uids(&request.ids);
        open.fetch(&uids, request)
    }

    pub fn seqnum_store(
        &mut self,
        request: &StoreRequest<'_, Seqnum>,
    ) -> Result<StoreResponse, Error> {
        self.mode.require_writable()?;
        let uids = self.mode.open_mailbox()?.resolve_seqnums(request.ids)?;
        self.mode
            .writable()?
            .store(&uids, request.flags, request.mode, request.loud)
    }

    pub fn uid_store(
        &mut self,
        request: &StoreRequest<'_, Uid>,
    ) -> Result<StoreResponse, Error> {
        self.mode.require_writable()?;
        let uids = self.mode.open_mailbox()?.resolve_uids(request.ids);
        self.mode
            .writable()?
            .store(&uids, request.flags, request.mode, request.loud)
    }

    /// `EXPUNGE`: remove every `\Deleted` message.
    pub fn expunge(&mut self) -> Result<ExpungeResponse, Error> {
        self.mode.writable()?.expunge(None)
    }

    /// `UID EXPUNGE` (RFC 4315): remove the `\Deleted` messages among `uids`.
    pub fn uid_expunge(
        &mut self,
        uids: &SeqRange<Uid>,
    ) -> Result<ExpungeResponse, Error> {
        self.mode.writable()?.expunge(Some(uids))
    }

    pub fn seqnum_copy(
        &mut self,
        ids: &SeqRange<Seqnum>,
        dst: &str,
    ) -> Result<CopyResponse, Error> {
        let uids = self.mode.open_mailbox()?.resolve_seqnums(ids)?;
        self.copy(&uids, dst, false)
    }

    pub fn uid_copy(
        &mut self,
        ids: &SeqRange<Uid>,
        dst: &str,
    ) -> Result<CopyResponse, Error> {
        let uids = self.mode.open_mailbox()?.resolve_uids(ids);
        self.copy(&uids, dst, false)
    }

    /// `MOVE` (RFC 6851). Not permitted on a read-only mailbox.
    pub fn seqnum_move(
        &mut self,
        ids: &SeqRange<Seqnum>,
        dst: &str,
    ) -> Result<CopyResponse, Error> {
        self.mode.require_writable()?;
        let uids = self.mode.open_mailbox()?.resolve_seqnums(ids)?;
        self.copy(&uids, dst, true)
    }

    pub fn uid_move(
        &mut self,
        ids: &SeqRange<Uid>,
        dst: &str,
    ) -> Result<CopyResponse, Error> {
        self.mode.require_writable()?;
        let uids = self.mode.open_mailbox()?.resolve_uids(ids);
        self.copy(&uids, dst, true)
    }

    fn copy(
        &mut self,
        uids: &[Uid],
        dst: &str,
        is_move: bool,
    ) -> Result<CopyResponse, Error> {
        if is_move {
            self.mode.require_writable()?;
        }

        let dst = self.registry.get(dst)?;
        let snapshots = self.mode.open_mailbox()?.snapshot_messages(uids)?;
        let (uid_validity, to_uids) = dst.append_copies(
            &self.log_prefix,
            Some(self.session),
            &snapshots,
        )?;

        let mut response = CopyResponse {
            uid_validity,
            ..CopyResponse::default()
        };
        for (&from, &to) in uids.iter().zip(&to_uids) {
            response.from_uids.insert(from, from);
            response.to_uids.insert(to, to);
        }

        if is_move {
            response.expunged = self.mode.writable()?.remove(uids)?;
            info!(
                "{} Moved {} message(s) to {}",
                self.log_prefix,
                uids.len(),
                dst.name()
            );
        }

        Ok(response)
    }

    /// `APPEND` to any mailbox, regardless of the access mode.
    pub fn append(
        &mut self,
        request: AppendRequest,
    ) -> Result<AppendResponse, Error> {
        let dst = self.registry.get(&request.mailbox)?;
        dst.append(
            &self.log_prefix,
            Some(self.session),
            Arc::from(request.data),
            &request.flags,
            request.internal_date,
        )
    }

    /// `CREATE` a new, empty mailbox.
    pub fn create(&mut self, name: &str) -> Result<(), Error> {
        self.registry.create(&self.log_prefix, name).map(|_| ())
    }
}

impl Drop for MailboxSessionController {
    fn drop(&mut self) {
        self.logout();
    }
}
