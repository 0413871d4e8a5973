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
use std::sync::{Arc, Mutex};

/// Tracks text that should be included in at the start of every log statement.
///
/// Clones of a `LogPrefix` share the same underlying data, so the controller
/// and anything it hands the prefix to see the same selected mailbox.
#[derive(Clone)]
pub struct LogPrefix {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Clone)]
struct Inner {
    protocol: String,
    session: u64,
    user: Option<String>,
    mailbox: Option<String>,
}

impl LogPrefix {
    pub fn new(protocol: String, session: u64) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                protocol,
                session,
                user: None,
                mailbox: None,
            })),
        }
    }

    pub fn set_user(&self, user: String) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.user = Some(sanitise(user));
        }
    }

    pub fn set_mailbox(&self, mailbox: Option<&str>) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.mailbox = mailbox.map(|m| sanitise(m.to_owned()));
        }
    }
}

impl fmt::Display for LogPrefix {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let inner = match self.inner.lock() {
            Ok(inner) => inner,
            Err(_) => return write!(f, "<poisoned>"),
        };

        write!(f, "{}#{}", inner.protocol, inner.session)?;
        if let Some(ref user) = inner.user {
            write!(f, "[{user}")?;
            if let Some(ref mailbox) = inner.mailbox {
                write!(f, ":{mailbox}")?;
            }
            write!(f, "]")?;
        } else if let Some(ref mailbox) = inner.mailbox {
            write!(f, "[:{mailbox}]")?;
        }

        Ok(())
    }
}

fn sanitise(mut s: String) -> String {
    s.retain(|c| !c.is_control());
    if let Some((truncate_len, _)) = s.char_indices().nth(64) {
        s.truncate(truncate_len);
    }

    s
}
