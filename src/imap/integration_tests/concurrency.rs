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

use rayon::prelude::*;

use super::defs::*;
use crate::account::model::*;

#[test]
fn concurrent_selects_share_recent_exactly_once() {
    let setup = set_up();
    for _ in 0..20 {
        setup.deliver("INBOX", &[]);
    }

    let recent = (0..16)
        .into_par_iter()
        .map(|ix| {
            let mut client = setup.connect("azure");
            let response = if 0 == ix % 2 {
                client.controller.select("INBOX").unwrap()
            } else {
                client.controller.examine("INBOX").unwrap()
            };
            (response.read_only, response.recent)
        })
        .collect::<Vec<_>>();

    let claimed = recent
        .iter()
        .filter(|&&(read_only, _)| !read_only)
        .map(|&(_, recent)| recent)
        .collect::<Vec<_>>();
    assert_eq!(20, claimed.iter().sum::<usize>());
    assert_eq!(1, claimed.iter().filter(|&&r| r != 0).count());

    // Examiners only ever see all or nothing, depending on whether a
    // selecting session got there first.
    for &(_, recent) in &recent {
        assert!(0 == recent || 20 == recent, "Saw {} recent", recent);
    }

    assert!(setup.fingerprint("INBOX").recent.is_empty());
}

#[test]
fn arrivals_recent_to_exactly_one_session() {
    const ARRIVALS: u32 = 50;

    let setup = set_up();
    let mut clients = (0..4)
        .map(|_| {
            let mut client = setup.connect("azure");
            ok_command!(client, C::Select("INBOX".to_owned()));
            client
        })
        .collect::<Vec<_>>();
    let mut observer = setup.connect("azure");
    ok_command!(observer, C::Examine("INBOX".to_owned()));

    rayon::join(
        || {
            for _ in 0..ARRIVALS {
                setup.deliver("INBOX", &[]);
            }
        },
        || {
            clients.par_iter_mut().for_each(|client| {
                for _ in 0..25 {
                    client.controller.poll().unwrap();
                }
            })
        },
    );

    for client in &mut clients {
        client.controller.poll().unwrap();
    }
    observer.controller.poll().unwrap();

    for uid in 1..=ARRIVALS {
        let uid = Uid::u(uid);
        let claimed_by = clients
            .iter()
            .filter(|client| {
                let open = client.controller.mode().open_mailbox().unwrap();
                open.is_recent(uid)
            })
            .count();
        assert_eq!(
            1, claimed_by,
            "{:?} recent to {} sessions",
            uid, claimed_by
        );
    }

    let view = observer.controller.mode().open_mailbox().unwrap();
    assert_eq!(ARRIVALS as usize, view.exists());
    assert!(setup.fingerprint("INBOX").recent.is_empty());
}

#[test]
fn concurrent_stores_all_land() {
    let setup = set_up();
    for _ in 0..8 {
        setup.deliver("INBOX", &[]);
    }

    let keywords = (0..8).map(|ix| format!("kw{}", ix)).collect::<Vec<_>>();
    keywords.par_iter().for_each(|keyword| {
        let mut client = setup.connect("azure");
        ok_command!(client, C::Select("INBOX".to_owned()));
        ok_command!(
            client,
            client.store(
                "1:*",
                StoreMode::Add,
                &[Flag::Keyword(keyword.clone())]
            )
        );
        ok_command!(client, C::Close);
    });

    let fingerprint = setup.fingerprint("INBOX");
    assert_eq!(8, fingerprint.messages.len());
    for (_, flags) in &fingerprint.messages {
        assert_eq!(8, flags.len(), "Flags: {:?}", flags);
    }
}
