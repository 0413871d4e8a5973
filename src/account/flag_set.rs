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

/// Identifies a flag within one mailbox's flag table.
///
/// System flags always occupy the first few ids, in the order of
/// `Flag::system_flags()`; keywords are interned after them as they are first
/// used.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FlagId(pub usize);

/// The set of flags on a single message.
///
/// The first 64 flag ids (which always include every system flag) are kept
/// inline; only mailboxes with an unusual number of keywords spill into the
/// heap.
#[derive(Clone, Default)]
pub struct FlagSet {
    near: u64,
    far: Vec<u64>,
}

impl PartialEq for FlagSet {
    fn eq(&self, other: &Self) -> bool {
        fn significant(far: &[u64]) -> &[u64] {
            let len = far.iter().rposition(|&w| 0 != w).map_or(0, |p| p + 1);
            &far[..len]
        }

        self.near == other.near
            && significant(&self.far) == significant(&other.far)
    }
}

impl Eq for FlagSet {}

impl fmt::Debug for FlagSet {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "FlagSet")?;
        f.debug_list().entries(self.iter().map(|id| id.0)).finish()
    }
}

impl FlagSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `flag`, returning whether it was not already present.
    pub fn insert(&mut self, flag: FlagId) -> bool {
        let (word, bit) = self.word_mut(flag);
        let added = 0 == *word & bit;
        *word |= bit;
        added
    }

    /// Remove `flag`, returning whether it was present.
    pub fn remove(&mut self, flag: FlagId) -> bool {
        let (word, bit) = self.word_mut(flag);
        let removed = 0 != *word & bit;
        *word &= !bit;
        removed
    }

    pub fn contains(&self, flag: FlagId) -> bool {
        let (ix, bit) = split(flag);
        let word = if 0 == ix {
            self.near
        } else {
            self.far.get(ix - 1).copied().unwrap_or(0)
        };
        0 != word & bit
    }

    pub fn is_empty(&self) -> bool {
        0 == self.near && self.far.iter().all(|&w| 0 == w)
    }

    /// Iterate the members of the set in ascending order.
    pub fn iter<'a>(&'a self) -> impl Iterator<Item = FlagId> + 'a {
        std::iter::once(&self.near)
            .chain(self.far.iter())
            .enumerate()
            .flat_map(|(ix, &word)| {
                (0..64)
                    .filter(move |&b| 0 != word & (1u64 << b))
                    .map(move |b| FlagId(ix * 64 + b))
            })
    }

    fn word_mut(&mut self, flag: FlagId) -> (&mut u64, u64) {
        let (ix, bit) = split(flag);
        if 0 == ix {
            (&mut self.near, bit)
        } else {
            if self.far.len() < ix {
                self.far.resize(ix, 0);
            }
            (&mut self.far[ix - 1], bit)
        }
    }
}

fn split(flag: FlagId) -> (usize, u64) {
    (flag.0 / 64, 1u64 << (flag.0 % 64))
}
