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

/// Determine whether `name` is acceptable as the name of a new mailbox.
///
/// This excludes empty names and anything that would be ambiguous or
/// meaningful inside IMAP mailbox syntax: `/` is the hierarchy delimiter and
/// may not appear at either end or twice in a row, names beginning with `#`
/// are namespaces, and `*` and `%` are `LIST` wildcards.
pub fn is_safe_mailbox_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('/')
        && !name.ends_with('/')
        && !name.contains("//")
        && !name.starts_with('#')
        && !name.contains(|c: char| c.is_control())
        && !name.contains(|c| '*' == c || '%' == c)
}
