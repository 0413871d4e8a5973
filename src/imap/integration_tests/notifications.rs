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

#[test]
fn flag_changes_reported_to_other_sessions() {
    let setup = set_up();
    setup.deliver("INBOX", &[]);

    let mut writer = setup.connect("azure");
    ok_command!(writer, C::Select("INBOX".to_owned()));
    let mut reader = setup.connect("azure");
    ok_command!(reader, C::Examine("INBOX".to_owned()));

    let lines = ok_command!(
        writer,
        writer.store("1", StoreMode::Add, &[Flag::Flagged])
    );
    assert_has_line(&lines, "* 1 FETCH (UID 1 FLAGS (\\Flagged \\Recent))");

    let lines = ok_command!(reader, C::Noop);
    assert_has_line(&lines, "* 1 FETCH (UID 1 FLAGS (\\Flagged))");

    // Nothing further to report
    let lines = ok_command!(reader, C::Noop);
    assert_eq!(1, lines.len());
}

#[test]
fn silent_store_still_notifies_others() {
    let setup = set_up();
    setup.deliver("INBOX", &[]);

    let mut writer = setup.connect("azure");
    ok_command!(writer, C::Select("INBOX".to_owned()));
    let mut reader = setup.connect("azure");
    ok_command!(reader, C::Select("INBOX".to_owned()));

    let mut command = writer.store("1", StoreMode::Add, &[Flag::Answered]);
    if let C::Store(ref mut store) = command {
        store.loud = false;
    }
    let lines = ok_command!(writer, command);
    assert_no_line_containing(&lines, "FETCH");

    let lines = ok_command!(reader, C::Noop);
    assert_has_line(&lines, "* 1 FETCH (UID 1 FLAGS (\\Answered))");
}

#[test]
fn expunges_use_each_sessions_own_seqnums() {
    let setup = set_up();
    for _ in 0..3 {
        setup.deliver("INBOX", &[]);
    }

    let mut first = setup.connect("azure");
    ok_command!(first, C::Select("INBOX".to_owned()));
    let mut second = setup.connect("azure");
    ok_command!(second, C::Select("INBOX".to_owned()));

    ok_command!(first, first.store("2", StoreMode::Add, &[Flag::Deleted]));
    let lines = ok_command!(first, C::Expunge);
    assert_has_line(&lines, "* 2 EXPUNGE");

    // A sequence-number FETCH may not be told about the expunge, so the
    // message is still addressable but its content is gone.
    let lines = second.command(second.fetch_flags("1:3"));
    assert_no_line_containing(&lines, "EXPUNGE");
    assert_has_line_containing(&lines, "* 1 FETCH");
    assert_has_line_containing(&lines, "* 3 FETCH");
    assert_no_line_containing(&lines, "* 2 FETCH");
    assert_tagged(&lines, "NO [EXPUNGEISSUED]");

    let lines = ok_command!(second, C::Noop);
    assert_has_line(&lines, "* 2 EXPUNGE");

    let lines = ok_command!(second, second.fetch_flags("1:*"));
    assert_has_line_containing(&lines, "* 1 FETCH");
    assert_has_line_containing(&lines, "* 2 FETCH");
    assert_no_line_containing(&lines, "* 3 FETCH");
}

#[test]
fn uid_fetch_receives_expunges() {
    let setup = set_up();
    setup.deliver("INBOX", &[]);
    setup.deliver("INBOX", &[]);

    let mut first = setup.connect("azure");
    ok_command!(first, C::Select("INBOX".to_owned()));
    let mut second = setup.connect("azure");
    ok_command!(second, C::Examine("INBOX".to_owned()));

    ok_command!(first, first.store("1", StoreMode::Add, &[Flag::Deleted]));
    ok_command!(first, C::Expunge);

    let lines = ok_command!(
        second,
        C::UidFetch(FetchRequest {
            ids: second.uids("2"),
            uid: true,
            flags: true,
            ..FetchRequest::default()
        })
    );
    assert_has_line(&lines, "* 1 EXPUNGE");
}

#[test]
fn new_messages_announced() {
    let setup = set_up();

    let mut client = setup.connect("azure");
    let lines = ok_command!(client, C::Select("INBOX".to_owned()));
    assert_has_line(&lines, "* 0 EXISTS");

    setup.deliver("INBOX", &[]);
    let lines = ok_command!(client, C::Noop);
    assert_has_line(&lines, "* 1 EXISTS");
    assert_has_line(&lines, "* 1 RECENT");

    let lines = ok_command!(
        client,
        C::Append(AppendRequest {
            mailbox: "INBOX".to_owned(),
            flags: vec![],
            internal_date: None,
            data: TEST_MESSAGE.to_vec(),
        })
    );
    assert_has_line(&lines, "* 2 EXISTS");
    assert_has_line(&lines, "* 2 RECENT");
    assert_tagged(&lines, "OK [APPENDUID ");
}

#[test]
fn new_messages_recent_to_only_one_session() {
    let setup = set_up();

    let mut first = setup.connect("azure");
    ok_command!(first, C::Select("INBOX".to_owned()));
    let mut second = setup.connect("azure");
    ok_command!(second, C::Select("INBOX".to_owned()));
    let mut observer = setup.connect("azure");
    ok_command!(observer, C::Examine("INBOX".to_owned()));

    setup.deliver("INBOX", &[]);

    let lines = ok_command!(observer, C::Noop);
    assert_has_line(&lines, "* 1 RECENT");
    let lines = ok_command!(second, C::Noop);
    assert_has_line(&lines, "* 1 EXISTS");
    assert_has_line(&lines, "* 1 RECENT");
    let lines = ok_command!(first, C::Noop);
    assert_has_line(&lines, "* 1 EXISTS");
    assert_has_line(&lines, "* 0 RECENT");
}

#[test]
fn examined_session_generates_no_events() {
    let setup = set_up();
    setup.deliver("INBOX", &[]);

    let mut writer = setup.connect("azure");
    ok_command!(writer, C::Select("INBOX".to_owned()));
    let mut reader = setup.connect("azure");
    ok_command!(reader, C::Examine("INBOX".to_owned()));

    ok_command!(reader, reader.fetch_body("1"));
    reader.command(reader.store("1", StoreMode::Add, &[Flag::Deleted]));
    reader.command(C::Expunge);
    ok_command!(reader, C::Close);

    let lines = ok_command!(writer, C::Noop);
    assert_eq!(1, lines.len(), "Unexpected: {:?}", lines);
}

#[test]
fn closed_session_stops_receiving_events() {
    let setup = set_up();
    setup.deliver("INBOX", &[]);

    let mut writer = setup.connect("azure");
    ok_command!(writer, C::Select("INBOX".to_owned()));
    let mut reader = setup.connect("azure");
    ok_command!(reader, C::Select("INBOX".to_owned()));
    ok_command!(reader, C::Unselect);

    ok_command!(writer, writer.store("1", StoreMode::Add, &[Flag::Seen]));
    let lines = ok_command!(reader, C::Noop);
    assert_eq!(1, lines.len(), "Unexpected: {:?}", lines);

    let inbox = setup.registry.get("INBOX").unwrap();
    let locked = inbox
        .lock(&crate::support::log_prefix::LogPrefix::new(
            "test".to_owned(),
            0,
        ))
        .unwrap();
    assert_eq!(1, locked.relay.num_subscribers());
}
