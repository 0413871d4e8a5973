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

//! The commands the controller understands, as delivered by the protocol
//! layer after parsing, and the outcomes it produces.

use super::controller::MailboxSessionController;
use crate::account::model::*;
use crate::support::error::Error;

/// A parsed mailbox command.
#[derive(Clone, Debug)]
pub enum Command {
    Select(String),
    Examine(String),
    Create(String),
    Close,
    Unselect,
    Logout,
    Noop,
    Append(AppendRequest),
    Fetch(FetchRequest<Seqnum>),
    UidFetch(FetchRequest<Uid>),
    Store(StoreCommand<Seqnum>),
    UidStore(StoreCommand<Uid>),
    Expunge,
    UidExpunge(SeqRange<Uid>),
    Copy(SeqRange<Seqnum>, String),
    UidCopy(SeqRange<Uid>, String),
    Move(SeqRange<Seqnum>, String),
    UidMove(SeqRange<Uid>, String),
}

/// The owned form of a `StoreRequest`.
#[derive(Clone, Debug)]
pub struct StoreCommand<ID>
where
    SeqRange<ID>: std::fmt::Debug,
{
    pub ids: SeqRange<ID>,
    pub flags: Vec<Flag>,
    pub mode: StoreMode,
    pub loud: bool,
}

impl<ID> StoreCommand<ID>
where
    SeqRange<ID>: std::fmt::Debug,
{
    fn request(&self) -> StoreRequest<'_, ID> {
        StoreRequest {
            ids: &self.ids,
            flags: &self.flags,
            mode: self.mode,
            loud: self.loud,
        }
    }
}

impl Command {
    /// The IMAP command name, as used in the tagged response.
    pub fn name(&self) -> &'static str {
        match *self {
            Command::Select(_) => "SELECT",
            Command::Examine(_) => "EXAMINE",
            Command::Create(_) => "CREATE",
            Command::Close => "CLOSE",
            Command::Unselect => "UNSELECT",
            Command::Logout => "LOGOUT",
            Command::Noop => "NOOP",
            Command::Append(_) => "APPEND",
            Command::Fetch(_) => "FETCH",
            Command::UidFetch(_) => "UID FETCH",
            Command::Store(_) => "STORE",
            Command::UidStore(_) => "UID STORE",
            Command::Expunge => "EXPUNGE",
            Command::UidExpunge(_) => "UID EXPUNGE",
            Command::Copy(..) => "COPY",
            Command::UidCopy(..) => "UID COPY",
            Command::Move(..) => "MOVE",
            Command::UidMove(..) => "UID MOVE",
        }
    }

    /// Whether the command addresses messages by sequence number.
    ///
    /// RFC 3501 forbids sending `EXPUNGE` during such commands, since the
    /// client could not otherwise tell which messages they applied to.
    fn uses_seqnums(&self) -> bool {
        matches!(
            *self,
            Command::Fetch(_) | Command::Store(_) | Command::Copy(..)
        )
    }
}

/// What a successfully executed command produced.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    Selected(SelectResponse),
    Fetched(FetchResponse),
    Stored(StoreResponse),
    Expunged(ExpungeResponse),
    Appended(AppendResponse),
    Copied(CopyResponse),
    Moved(CopyResponse),
    LoggedOut,
    Done,
}

/// The full result of one command: its own outcome, plus whatever changes by
/// other sessions need to be reported before the tagged response.
#[derive(Debug)]
pub struct CommandResponse {
    pub command: &'static str,
    pub outcome: Result<Outcome, Error>,
    pub poll: PollResponse,
}

impl MailboxSessionController {
    /// Execute `command`, then poll for changes by other sessions.
    pub fn handle(&mut self, command: Command) -> CommandResponse {
        let name = command.name();
        let full_poll = !command.uses_seqnums();
        let outcome = self.dispatch(command);

        let poll = if matches!(outcome, Ok(Outcome::LoggedOut)) {
            Ok(PollResponse::default())
        } else if full_poll {
            self.poll()
        } else {
            self.mini_poll()
        };

        match poll {
            Ok(poll) => CommandResponse {
                command: name,
                outcome,
                poll,
            },
            // The command may well have worked, but if polling failed, the
            // mailbox is unusable and that is what matters to the client.
            Err(e) => CommandResponse {
                command: name,
                outcome: outcome.and(Err(e)),
                poll: PollResponse::default(),
            },
        }
    }

    fn dispatch(&mut self, command: Command) -> Result<Outcome, Error> {
        match command {
            Command::Select(mailbox) => {
                self.select(&mailbox).map(Outcome::Selected)
            }
            Command::Examine(mailbox) => {
                self.examine(&mailbox).map(Outcome::Selected)
            }
            Command::Create(mailbox) => {
                self.create(&mailbox).map(|_| Outcome::Done)
            }
            Command::Close => self.close().map(|_| Outcome::Done),
            Command::Unselect => self.unselect().map(|_| Outcome::Done),
            Command::Logout => {
                self.logout();
                Ok(Outcome::LoggedOut)
            }
            Command::Noop => Ok(Outcome::Done),
            Command::Append(request) => {
                self.append(request).map(Outcome::Appended)
            }
            Command::Fetch(request) => {
                self.seqnum_fetch(&request).map(Outcome::Fetched)
            }
            Command::UidFetch(request) => {
                self.uid_fetch(&request).map(Outcome::Fetched)
            }
            Command::Store(store) => {
                self.seqnum_store(&store.request()).map(Outcome::Stored)
            }
            Command::UidStore(store) => {
                self.uid_store(&store.request()).map(Outcome::Stored)
            }
            Command::Expunge => self.expunge().map(Outcome::Expunged),
            Command::UidExpunge(uids) => {
                self.uid_expunge(&uids).map(Outcome::Expunged)
            }
            Command::Copy(ids, dst) => {
                self.seqnum_copy(&ids, &dst).map(Outcome::Copied)
            }
            Command::UidCopy(ids, dst) => {
                self.uid_copy(&ids, &dst).map(Outcome::Copied)
            }
            Command::Move(ids, dst) => {
                self.seqnum_move(&ids, &dst).map(Outcome::Moved)
            }
            Command::UidMove(ids, dst) => {
                self.uid_move(&ids, &dst).map(Outcome::Moved)
            }
        }
    }
}
