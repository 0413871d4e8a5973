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

//! Rendering of command outcomes as IMAP response text.

use std::fmt::Write as _;
use std::io::{self, Write};

use super::command::{CommandResponse, Outcome};
use crate::account::model::*;
use crate::support::error::Error;

/// Writes the responses to commands to some byte sink, typically the client
/// connection.
///
/// Every line is terminated with CRLF. Message bodies are written as
/// synchronising literals.
pub struct ResponseWriter<W> {
    out: W,
}

impl<W: Write> ResponseWriter<W> {
    pub fn new(out: W) -> Self {
        ResponseWriter { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    /// Write everything for one command: its untagged data, the untagged
    /// results of the poll that followed it, and finally the tagged status.
    pub fn write_response(
        &mut self,
        tag: &str,
        response: &CommandResponse,
    ) -> io::Result<()> {
        match response.outcome {
            Ok(ref outcome) => {
                self.write_outcome_data(outcome)?;
                self.write_poll(&response.poll)?;
                self.write_tagged_ok(tag, response.command, outcome)
            }
            Err(ref error) => {
                self.write_poll(&response.poll)?;
                self.write_tagged_error(tag, error)
            }
        }
    }

    fn line(&mut self, line: &str) -> io::Result<()> {
        self.out.write_all(line.as_bytes())?;
        self.out.write_all(b"\r\n")
    }

    fn write_outcome_data(&mut self, outcome: &Outcome) -> io::Result<()> {
        match *outcome {
            Outcome::Selected(ref r) => self.write_select(r),
            Outcome::Fetched(ref r) => {
                for message in &r.messages {
                    self.write_fetched(message)?;
                }
                Ok(())
            }
            Outcome::Stored(ref r) => {
                for update in &r.fetch {
                    self.write_flags_update(update)?;
                }
                Ok(())
            }
            Outcome::Expunged(ref r) => self.write_expunges(&r.expunged),
            Outcome::Moved(ref r) => {
                if let Some(code) = copyuid(r) {
                    self.line(&format!("* OK [{}] Moved", code))?;
                }
                self.write_expunges(&r.expunged)
            }
            Outcome::LoggedOut => self.line("* BYE Logging out"),
            Outcome::Appended(_) | Outcome::Copied(_) | Outcome::Done => {
                Ok(())
            }
        }
    }

    fn write_select(&mut self, r: &SelectResponse) -> io::Result<()> {
        self.line(&format!("* FLAGS {}", flag_list(&r.flags, false)))?;

        let mut permanent = r
            .permanent_flags
            .iter()
            .map(|f| f.to_string())
            .collect::<Vec<_>>();
        if r.keywords_allowed {
            permanent.push("\\*".to_owned());
        }
        self.line(&format!(
            "* OK [PERMANENTFLAGS ({})] {}",
            permanent.join(" "),
            if r.read_only {
                "Read-only mailbox"
            } else {
                "Flags permitted"
            }
        ))?;

        self.line(&format!("* {} EXISTS", r.exists))?;
        self.line(&format!("* {} RECENT", r.recent))?;
        if let Some(unseen) = r.unseen {
            self.line(&format!("* OK [UNSEEN {}] First unseen", unseen.0))?;
        }
        self.line(&format!(
            "* OK [UIDVALIDITY {}] UIDs valid",
            r.uidvalidity
        ))?;
        self.line(&format!(
            "* OK [UIDNEXT {}] Predicted next UID",
            r.uidnext.0
        ))
    }

    fn write_fetched(&mut self, message: &FetchedMessage) -> io::Result<()> {
        let mut items = Vec::new();
        if let Some(uid) = message.uid {
            items.push(format!("UID {}", uid.0));
        }
        if let Some(ref flags) = message.flags {
            items.push(format!(
                "FLAGS {}",
                flag_list(&flags.flags, flags.recent)
            ));
        }

        let mut head =
            format!("* {} FETCH ({}", message.seqnum.0, items.join(" "));
        match message.body {
            Some(ref body) => {
                if !items.is_empty() {
                    head.push(' ');
                }
                let _ = write!(head, "BODY[] {{{}}}", body.len());
                self.line(&head)?;
                self.out.write_all(body)?;
                self.line(")")
            }
            None => {
                head.push(')');
                self.line(&head)
            }
        }
    }

    fn write_flags_update(&mut self, update: &FlagsUpdate) -> io::Result<()> {
        self.line(&format!(
            "* {} FETCH (UID {} FLAGS {})",
            update.seqnum.0,
            update.uid.0,
            flag_list(&update.flags, update.recent)
        ))
    }

    fn write_expunges(
        &mut self,
        expunged: &[(Seqnum, Uid)],
    ) -> io::Result<()> {
        for &(seqnum, _) in expunged {
            self.line(&format!("* {} EXPUNGE", seqnum.0))?;
        }
        Ok(())
    }

    fn write_poll(&mut self, poll: &PollResponse) -> io::Result<()> {
        self.write_expunges(&poll.expunge)?;
        if let Some(exists) = poll.exists {
            self.line(&format!("* {} EXISTS", exists))?;
        }
        if let Some(recent) = poll.recent {
            self.line(&format!("* {} RECENT", recent))?;
        }
        for update in &poll.fetch {
            self.write_flags_update(update)?;
        }
        Ok(())
    }

    fn write_tagged_ok(
        &mut self,
        tag: &str,
        command: &str,
        outcome: &Outcome,
    ) -> io::Result<()> {
        let status = match *outcome {
            Outcome::Selected(ref r) => format!(
                "OK [{}] {} completed",
                if r.read_only { "READ-ONLY" } else { "READ-WRITE" },
                command
            ),
            Outcome::Fetched(FetchResponse { ok: false, .. })
            | Outcome::Stored(StoreResponse { ok: false, .. }) => {
                "NO [EXPUNGEISSUED] Some messages have been expunged"
                    .to_owned()
            }
            Outcome::Appended(ref r) => format!(
                "OK [APPENDUID {} {}] {} completed",
                r.uid_validity, r.uid.0, command
            ),
            Outcome::Copied(ref r) => match copyuid(r) {
                Some(code) => format!("OK [{}] {} completed", code, command),
                None => format!("OK {} completed", command),
            },
            _ => format!("OK {} completed", command),
        };

        self.line(&format!("{} {}", tag, status))
    }

    fn write_tagged_error(
        &mut self,
        tag: &str,
        error: &Error,
    ) -> io::Result<()> {
        let (cond, code) = match *error {
            Error::MailboxReadOnly => ("NO", Some("CANNOT")),
            Error::UnsafeName => ("NO", Some("CANNOT")),
            Error::NxMessage => ("BAD", Some("CLIENTBUG")),
            Error::NoMailboxSelected => ("BAD", None),
            Error::NxFlag => ("BAD", None),
            Error::NxMailbox => ("NO", Some("NONEXISTENT")),
            Error::MailboxExists => ("NO", Some("ALREADYEXISTS")),
            Error::ExpungedMessage => ("NO", Some("EXPUNGEISSUED")),
            Error::MailboxFull => ("NO", Some("LIMIT")),
            _ => ("NO", Some("SERVERBUG")),
        };

        match code {
            Some(code) => {
                self.line(&format!("{} {} [{}] {}", tag, cond, code, error))
            }
            None => self.line(&format!("{} {} {}", tag, cond, error)),
        }
    }
}

/// Format a parenthesised flag list, with `\Recent` at the end if `recent`.
fn flag_list(flags: &[Flag], recent: bool) -> String {
    let mut s = "(".to_owned();
    for (ix, flag) in flags.iter().enumerate() {
        if ix > 0 {
            s.push(' ');
        }
        let _ = write!(s, "{}", flag);
    }
    if recent {
        if !flags.is_empty() {
            s.push(' ');
        }
        s.push_str("\\Recent");
    }
    s.push(')');
    s
}

fn copyuid(r: &CopyResponse) -> Option<String> {
    if r.from_uids.is_empty() {
        None
    } else {
        Some(format!(
            "COPYUID {} {} {}",
            r.uid_validity, r.from_uids, r.to_uids
        ))
    }
}
