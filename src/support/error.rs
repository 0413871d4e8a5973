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

use std::io;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Mailbox is read-only")]
    MailboxReadOnly,
    #[error("No mailbox selected")]
    NoMailboxSelected,
    #[error("Message sequence number or UID out of range")]
    NxMessage,
    #[error("Message has been expunged")]
    ExpungedMessage,
    #[error("No such mailbox")]
    NxMailbox,
    #[error("Mailbox already exists")]
    MailboxExists,
    #[error("Unsafe mailbox name")]
    UnsafeName,
    #[error("Non-existent or non-settable flag")]
    NxFlag,
    #[error("Mailbox UID space exhausted")]
    MailboxFull,
    #[error("Mailbox state was left inconsistent by a failed operation")]
    ConcurrentModification,
    #[error("Logging initialisation failed: {0}")]
    Logging(String),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    ConfigSyntax(#[from] toml::de::Error),
}
