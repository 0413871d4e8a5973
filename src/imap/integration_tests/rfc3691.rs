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
fn unselect_does_not_expunge() {
    let setup = set_up();
    setup.deliver("INBOX", &[]);
    setup.deliver("INBOX", &[]);

    let mut client = setup.connect("azure");
    ok_command!(client, C::Select("INBOX".to_owned()));
    ok_command!(
        client,
        client.store("1:*", StoreMode::Add, &[Flag::Deleted])
    );
    ok_command!(client, C::Unselect);

    let lines = client.command(C::Unselect);
    assert_tagged(&lines, "BAD");
    let lines = client.command(C::Expunge);
    assert_tagged(&lines, "BAD");

    let lines = ok_command!(client, C::Select("INBOX".to_owned()));
    assert_has_line(&lines, "* 2 EXISTS");
    ok_command!(client, C::Close);

    let lines = ok_command!(client, C::Select("INBOX".to_owned()));
    assert_has_line(&lines, "* 0 EXISTS");
}

#[test]
fn unselect_examined() {
    let setup = set_up();
    setup.deliver("INBOX", &[Flag::Deleted]);

    let mut client = setup.connect("azure");
    ok_command!(client, C::Examine("INBOX".to_owned()));
    ok_command!(client, C::Unselect);
    assert!(!client.controller.mode().is_open());
    assert_eq!(1, setup.fingerprint("INBOX").messages.len());
}

#[test]
fn close_respects_configuration() {
    let setup = set_up_with(crate::support::system_config::MailboxConfig {
        expunge_on_close: false,
        ..Default::default()
    });
    setup.deliver("INBOX", &[Flag::Deleted]);

    let mut client = setup.connect("azure");
    ok_command!(client, C::Select("INBOX".to_owned()));
    ok_command!(client, C::Close);
    assert_eq!(1, setup.fingerprint("INBOX").messages.len());
}
