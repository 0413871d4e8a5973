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

//! Scenario tests which drive one or more sessions through
//! `MailboxSessionController::handle` and check the rendered protocol text,
//! the way a client would see it.
//!
//! Each test gets its own `MailboxRegistry`, standing in for a freshly
//! provisioned account, so tests never interfere with each other.

#[macro_use]
mod defs;

mod concurrency;
mod notifications;
mod rfc3691;
mod rfc6851;
