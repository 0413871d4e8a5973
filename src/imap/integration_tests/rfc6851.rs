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

use super::defs::*;
use crate::account::model::*;

fn set_up_archive() -> (Setup, TestClient) {
    let setup = set_up();
    let mut client = setup.connect("azure");
    ok_command!(client, C::Create("Archive".to_owned()));
    (setup, client)
}

#[test]
fn move_basics() {
    let (setup, mut client) = set_up_archive();
    setup.deliver("INBOX", &[Flag::Flagged]);
    setup.deliver("INBOX", &[]);
    setup.deliver("INBOX", &[]);

    ok_command!(client, C::Select("INBOX".to_owned()));
    let lines = ok_command!(
        client,
        C::Move(client.seqs("1:2"), "Archive".to_owned())
    );
    assert_has_line_containing(&lines, " 1:2 1:2] Moved");
    assert_eq!(
        vec!["* 2 EXPUNGE".to_owned(), "* 1 EXPUNGE".to_owned()],
        lines
            .iter()
            .filter(|line| line.ends_with("EXPUNGE"))
            .cloned()
            .collect::<Vec<_>>()
    );

    assert_eq!(1, setup.fingerprint("INBOX").messages.len());
    let archive = setup.fingerprint("Archive");
    assert_eq!(
        vec![(Uid::u(1), vec![Flag::Flagged]), (Uid::u(2), vec![])],
        archive.messages
    );

    let lines = ok_command!(client, client.fetch_flags("1:*"));
    assert_has_line_containing(&lines, "* 1 FETCH");
    assert_no_line_containing(&lines, "* 2 FETCH");
}

#[test]
fn uid_move_ignores_unknown_uids() {
    let (setup, mut client) = set_up_archive();
    setup.deliver("INBOX", &[]);
    setup.deliver("INBOX", &[]);

    ok_command!(client, C::Select("INBOX".to_owned()));
    let lines = ok_command!(
        client,
        C::UidMove(
            SeqRange::range(Uid::u(2), Uid::u(50)),
            "Archive".to_owned()
        )
    );
    assert_has_line_containing(&lines, " 2 1] Moved");
    assert_has_line(&lines, "* 2 EXPUNGE");
}

#[test]
fn move_rejected_under_examine() {
    let (setup, mut client) = set_up_archive();
    setup.deliver("INBOX", &[]);
    let inbox = setup.fingerprint("INBOX");
    let archive = setup.fingerprint("Archive");

    ok_command!(client, C::Examine("INBOX".to_owned()));
    let lines =
        client.command(C::Move(client.seqs("1"), "Archive".to_owned()));
    assert_tagged(&lines, "NO [CANNOT]");
    let lines =
        client.command(C::UidMove(client.uids("1"), "Archive".to_owned()));
    assert_tagged(&lines, "NO [CANNOT]");

    assert_eq!(inbox, setup.fingerprint("INBOX"));
    assert_eq!(archive, setup.fingerprint("Archive"));
}

#[test]
fn copy_permitted_under_examine() {
    let (setup, mut client) = set_up_archive();
    setup.deliver("INBOX", &[Flag::Seen]);
    let inbox = setup.fingerprint("INBOX");

    ok_command!(client, C::Examine("INBOX".to_owned()));
    let lines = ok_command!(
        client,
        C::Copy(client.seqs("1"), "Archive".to_owned())
    );
    assert_tagged(&lines, "OK [COPYUID ");

    assert_eq!(inbox, setup.fingerprint("INBOX"));
    assert_eq!(
        vec![(Uid::u(1), vec![Flag::Seen])],
        setup.fingerprint("Archive").messages
    );
}

#[test]
fn move_to_missing_mailbox() {
    let (setup, mut client) = set_up_archive();
    setup.deliver("INBOX", &[]);

    ok_command!(client, C::Select("INBOX".to_owned()));
    let lines =
        client.command(C::Move(client.seqs("1"), "Nowhere".to_owned()));
    assert_tagged(&lines, "NO [NONEXISTENT]");
    assert_eq!(1, setup.fingerprint("INBOX").messages.len());
}
