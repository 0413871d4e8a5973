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

//! Propagation of mailbox changes between the sessions that have the mailbox
//! open.
//!
//! Every open session holds the receiving end of an unbounded channel; the
//! relay holds only the senders. Publication always happens while the
//! publisher holds the mailbox lock, so every receiver observes events in the
//! order they were applied to the mailbox.

use crossbeam::channel::{self, Receiver, Sender};

use super::model::Uid;

/// A change to a mailbox that other sessions need to hear about.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MailboxEvent {
    /// A message with this UID was added.
    Appended(Uid),
    /// The flags of this message changed.
    FlagsChanged(Uid),
    /// This message was removed.
    Expunged(Uid),
}

/// The receiving end of a subscription.
pub type EventReceiver = Receiver<MailboxEvent>;

#[derive(Debug, Default)]
pub struct NotificationRelay {
    subscribers: Vec<(u64, Sender<MailboxEvent>)>,
}

impl NotificationRelay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register session `session` and return its event queue.
    ///
    /// A session that re-subscribes replaces its old queue.
    pub fn subscribe(&mut self, session: u64) -> EventReceiver {
        self.unsubscribe(session);
        let (sender, receiver) = channel::unbounded();
        self.subscribers.push((session, sender));
        receiver
    }

    pub fn unsubscribe(&mut self, session: u64) {
        self.subscribers.retain(|&(id, _)| id != session);
    }

    pub fn num_subscribers(&self) -> usize {
        self.subscribers.len()
    }

    /// Deliver `event` to every subscriber other than `origin`.
    ///
    /// `Appended` events are also delivered to `origin`, since the appending
    /// session's view of the mailbox does not include the new message yet.
    ///
    /// Subscribers whose receivers have been dropped are forgotten.
    pub fn publish(&mut self, origin: Option<u64>, event: MailboxEvent) {
        let include_origin = matches!(event, MailboxEvent::Appended(_));
        self.subscribers.retain(|&(id, ref sender)| {
            if !include_origin && Some(id) == origin {
                return true;
            }

            sender.send(event).is_ok()
        });
    }
}
