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

use std::sync::Arc;

use crate::account::model::*;
use crate::account::registry::MailboxRegistry;
use crate::imap::command::{Command, CommandResponse, StoreCommand};
use crate::imap::controller::MailboxSessionController;
use crate::imap::response_writer::ResponseWriter;
use crate::support::log_prefix::LogPrefix;
use crate::support::system_config::MailboxConfig;

pub use crate::imap::command::Command as C;

pub const TEST_MESSAGE: &[u8] =
    b"From: test@test.com\r\nSubject: Test\r\n\r\ntest\r\n";

#[derive(Clone, Debug)]
pub struct Setup {
    pub registry: Arc<MailboxRegistry>,
}

pub fn set_up() -> Setup {
    set_up_with(MailboxConfig::default())
}

pub fn set_up_with(config: MailboxConfig) -> Setup {
    crate::init_test_log();
    Setup {
        registry: Arc::new(MailboxRegistry::new(config).unwrap()),
    }
}

/// Everything about a mailbox that a session could possibly influence.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Fingerprint {
    pub messages: Vec<(Uid, Vec<Flag>)>,
    pub recent: Vec<Uid>,
    pub defined_flags: Vec<Flag>,
    pub next_uid: Uid,
}

impl Setup {
    pub fn connect(&self, user: &str) -> TestClient {
        TestClient {
            controller: MailboxSessionController::new(
                Arc::clone(&self.registry),
                user,
            ),
            next_tag: 1,
        }
    }

    /// Add a message to `mailbox` the way an MTA would, from outside any
    /// session.
    pub fn deliver(&self, mailbox: &str, flags: &[Flag]) -> Uid {
        self.registry
            .get(mailbox)
            .unwrap()
            .append(
                &LogPrefix::new("delivery".to_owned(), 0),
                None,
                Arc::from(TEST_MESSAGE),
                flags,
                None,
            )
            .unwrap()
            .uid
    }

    pub fn fingerprint(&self, mailbox: &str) -> Fingerprint {
        let mailbox = self.registry.get(mailbox).unwrap();
        let locked = mailbox
            .lock(&LogPrefix::new("fingerprint".to_owned(), 0))
            .unwrap();
        let state = &locked.state;

        let fingerprint = Fingerprint {
            messages: state
                .uids()
                .map(|uid| (uid, state.flags_of(uid).unwrap()))
                .collect(),
            recent: state.recent_set(),
            defined_flags: state.defined_flags(),
            next_uid: state.next_uid(),
        };
        fingerprint
    }
}

pub struct TestClient {
    pub controller: MailboxSessionController,
    next_tag: u32,
}

impl TestClient {
    /// Run `command` and return its full response text, one entry per line.
    pub fn command(&mut self, command: Command) -> Vec<String> {
        let tag = format!("A{}", self.next_tag);
        self.next_tag += 1;

        let response = self.controller.handle(command);
        render(&tag, &response)
    }

    /// Parse a sequence set relative to this session's view.
    pub fn seqs(&self, raw: &str) -> SeqRange<Seqnum> {
        let max = self
            .controller
            .mode()
            .open_mailbox()
            .ok()
            .and_then(|open| open.max_seqnum())
            .unwrap_or(Seqnum::MIN);
        SeqRange::parse(raw, max).unwrap()
    }

    pub fn uids(&self, raw: &str) -> SeqRange<Uid> {
        let max = self
            .controller
            .mode()
            .open_mailbox()
            .ok()
            .and_then(|open| open.max_uid())
            .unwrap_or(Uid::MIN);
        SeqRange::parse(raw, max).unwrap()
    }

    pub fn fetch_flags(&self, raw: &str) -> Command {
        C::Fetch(FetchRequest {
            ids: self.seqs(raw),
            flags: true,
            ..FetchRequest::default()
        })
    }

    /// `FETCH x RFC822`, which implicitly sets `\Seen`.
    pub fn fetch_body(&self, raw: &str) -> Command {
        C::Fetch(FetchRequest {
            ids: self.seqs(raw),
            body: true,
            ..FetchRequest::default()
        })
    }

    pub fn store(
        &self,
        raw: &str,
        mode: StoreMode,
        flags: &[Flag],
    ) -> Command {
        C::Store(StoreCommand {
            ids: self.seqs(raw),
            flags: flags.to_vec(),
            mode,
            loud: true,
        })
    }
}

pub fn render(tag: &str, response: &CommandResponse) -> Vec<String> {
    let mut writer = ResponseWriter::new(Vec::new());
    writer.write_response(tag, response).unwrap();
    String::from_utf8_lossy(&writer.into_inner())
        .split("\r\n")
        .filter(|line| !line.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Assert that the tagged response is `OK`.
pub fn assert_tagged_ok(lines: &[String]) {
    assert_tagged(lines, "OK");
}

/// Assert that the final line is the tagged response and begins with
/// `status` after the tag.
pub fn assert_tagged(lines: &[String], status: &str) {
    let last = lines.last().expect("No response lines");
    let mut parts = last.splitn(2, ' ');
    let tag = parts.next().unwrap_or("");
    let rest = parts.next().unwrap_or("");
    assert!(
        tag.starts_with('A') && rest.starts_with(status),
        "Expected tagged {:?}, got:\n{}",
        status,
        lines.join("\n")
    );
}

pub fn assert_has_line(lines: &[String], expected: &str) {
    assert!(
        lines.iter().any(|line| line == expected),
        "Expected line {:?} in:\n{}",
        expected,
        lines.join("\n")
    );
}

pub fn assert_has_line_containing(lines: &[String], expected: &str) {
    assert!(
        lines.iter().any(|line| line.contains(expected)),
        "Expected a line containing {:?} in:\n{}",
        expected,
        lines.join("\n")
    );
}

pub fn assert_no_line_containing(lines: &[String], unexpected: &str) {
    assert!(
        !lines.iter().any(|line| line.contains(unexpected)),
        "Unexpected line containing {:?} in:\n{}",
        unexpected,
        lines.join("\n")
    );
}

/// Extract the flags reported for `seqnum` by a `FETCH` response.
pub fn flags_in(lines: &[String], seqnum: u32) -> String {
    let prefix = format!("* {} FETCH (", seqnum);
    let line = lines
        .iter()
        .find(|line| line.starts_with(&prefix))
        .unwrap_or_else(|| {
            panic!("No FETCH for {} in:\n{}", seqnum, lines.join("\n"))
        });
    let start = line.find("FLAGS (").expect("No FLAGS") + "FLAGS ".len();
    let end =
        start + line[start..].find(')').expect("Unterminated FLAGS") + 1;
    line[start..end].to_owned()
}

macro_rules! ok_command {
    ($client:expr, $command:expr) => {{
        let command = $command;
        let lines = $client.command(command);
        assert_tagged_ok(&lines);
        lines
    }};
}
