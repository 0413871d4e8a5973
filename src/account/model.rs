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

use std::collections::BTreeMap;
use std::convert::TryFrom;
use std::fmt;
use std::marker::PhantomData;
use std::num::NonZeroU32;
use std::str::FromStr;
use std::sync::Arc;

use chrono::prelude::*;

use crate::support::error::Error;

/// Uniquely identifies a message within a single mailbox.
///
/// UIDs start at 1 and are assigned strictly sequentially as messages are
/// appended. They are never reused, even after the message is expunged.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Uid(pub NonZeroU32);

impl fmt::Debug for Uid {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Uid({})", self.0.get())
    }
}

impl Default for Uid {
    fn default() -> Self {
        Uid::MIN
    }
}

impl Uid {
    // Unsafe because new() isn't const for some reason
    pub const MIN: Self = unsafe { Uid(NonZeroU32::new_unchecked(1)) };
    pub const MAX: Self = unsafe { Uid(NonZeroU32::new_unchecked(u32::MAX)) };

    pub fn of(uid: u32) -> Option<Self> {
        NonZeroU32::new(uid).map(Uid)
    }

    pub fn next(self) -> Option<Self> {
        self.0.get().checked_add(1).and_then(Uid::of)
    }

    #[cfg(test)]
    pub fn u(uid: u32) -> Self {
        Uid::of(uid).unwrap()
    }
}

impl TryFrom<u32> for Uid {
    type Error = ();

    fn try_from(v: u32) -> Result<Self, ()> {
        Self::of(v).ok_or(())
    }
}

impl From<Uid> for u32 {
    fn from(uid: Uid) -> u32 {
        uid.0.get()
    }
}

/// The position of a message within a session's view of a mailbox, starting
/// from 1.
///
/// Unlike UIDs, sequence numbers shift whenever a message before them is
/// expunged. Each session keeps its own mapping, which only changes at points
/// where the session is told about the expunge.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Seqnum(pub NonZeroU32);

impl Default for Seqnum {
    fn default() -> Self {
        Seqnum::MIN
    }
}

impl Seqnum {
    // Unsafe because new() isn't const for some reason
    pub const MIN: Self = unsafe { Seqnum(NonZeroU32::new_unchecked(1)) };

    pub fn of(seqnum: u32) -> Option<Self> {
        NonZeroU32::new(seqnum).map(Seqnum)
    }

    #[cfg(test)]
    pub fn u(seqnum: u32) -> Self {
        Seqnum::of(seqnum).unwrap()
    }

    pub fn to_index(self) -> usize {
        self.0.get() as usize - 1
    }

    /// Convert a 0-based index into a sequence number.
    ///
    /// Mailboxes are bounded by the UID space, so an index always fits.
    pub fn from_index(ix: usize) -> Self {
        let raw = u32::try_from(ix.saturating_add(1)).unwrap_or(u32::MAX);
        Seqnum::of(raw).unwrap_or(Seqnum::MIN)
    }
}

impl TryFrom<u32> for Seqnum {
    type Error = ();

    fn try_from(v: u32) -> Result<Self, ()> {
        Self::of(v).ok_or(())
    }
}

impl From<Seqnum> for u32 {
    fn from(seqnum: Seqnum) -> u32 {
        seqnum.0.get()
    }
}

impl fmt::Debug for Seqnum {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Seqnum({})", self.0.get())
    }
}

/// A set of sequence numbers or UIDs, as found in IMAP sequence sets.
///
/// Stored as a map from the start of each maximal run of consecutive values to
/// its (inclusive) end, so `1:3,5` and `5,2,1,3` are the same value.
#[derive(Clone, PartialEq, Eq)]
pub struct SeqRange<T> {
    runs: BTreeMap<u32, u32>,
    _t: PhantomData<T>,
}

impl<T> SeqRange<T> {
    pub fn new() -> Self {
        SeqRange {
            runs: BTreeMap::new(),
            _t: PhantomData,
        }
    }

    /// Return whether this set is empty (which IMAP cannot express).
    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    /// The greatest raw value in the set.
    pub fn max(&self) -> Option<u32> {
        self.runs.values().next_back().copied()
    }

    /// The number of distinct values in the set.
    pub fn len(&self) -> usize {
        self.runs
            .iter()
            .map(|(&start, &end)| (end - start) as usize + 1)
            .sum()
    }

    fn add_run(&mut self, mut start: u32, mut end: u32) {
        // Absorb every run which overlaps or touches [start, end]. A run that
        // begins before `start` can only touch it if it is the last such run.
        if let Some((&prev_start, &prev_end)) =
            self.runs.range(..start).next_back()
        {
            if prev_end.saturating_add(1) >= start {
                start = prev_start;
                end = end.max(prev_end);
            }
        }

        let absorbed = self
            .runs
            .range(start..=end.saturating_add(1))
            .map(|(&s, &e)| (s, e))
            .collect::<Vec<_>>();
        for (s, e) in absorbed {
            self.runs.remove(&s);
            end = end.max(e);
        }

        self.runs.insert(start, end);
    }
}

impl<T: TryFrom<u32> + Into<u32> + Copy> SeqRange<T> {
    /// A set containing exactly `item`.
    pub fn just(item: T) -> Self {
        let mut this = Self::new();
        this.insert(item, item);
        this
    }

    /// A set containing every value between `start` and `end`, inclusive.
    pub fn range(start: T, end: T) -> Self {
        let mut this = Self::new();
        this.insert(start, end);
        this
    }

    /// Add every value between the two endpoints, in either order.
    pub fn insert(&mut self, a: T, b: T) {
        let (a, b): (u32, u32) = (a.into(), b.into());
        self.add_run(a.min(b), a.max(b));
    }

    pub fn contains(&self, item: T) -> bool {
        let v: u32 = item.into();
        self.runs
            .range(..=v)
            .next_back()
            .map_or(false, |(_, &end)| end >= v)
    }

    /// Iterate the members of this set in ascending order, stopping at `max`.
    pub fn items<'a>(
        &'a self,
        max: impl Into<u32>,
    ) -> impl Iterator<Item = T> + 'a {
        let max: u32 = max.into();
        self.runs
            .iter()
            .take_while(move |&(&start, _)| start <= max)
            .flat_map(move |(&start, &end)| start..=end.min(max))
            .filter_map(|v| T::try_from(v).ok())
    }

    /// Parse an IMAP sequence set such as `1:3,7,9:*`.
    ///
    /// `*` stands for `splat`, i.e. the greatest value currently in use.
    /// Returns `None` on any syntax error.
    pub fn parse(raw: &str, splat: T) -> Option<Self> {
        let splat: u32 = splat.into();
        let value = |s: &str| -> Option<u32> {
            if "*" == s {
                Some(splat)
            } else if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) {
                s.parse().ok().filter(|&v| v > 0)
            } else {
                None
            }
        };

        let mut this = Self::new();
        for part in raw.split(',') {
            let (a, b) = match part.find(':') {
                Some(colon) => {
                    (value(&part[..colon])?, value(&part[colon + 1..])?)
                }
                None => {
                    let v = value(part)?;
                    (v, v)
                }
            };
            this.add_run(a.min(b), a.max(b));
        }

        Some(this)
    }
}

impl<T> Default for SeqRange<T> {
    fn default() -> Self {
        SeqRange::new()
    }
}

impl<T> fmt::Display for SeqRange<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut delim = "";
        for (&start, &end) in &self.runs {
            if start == end {
                write!(f, "{}{}", delim, start)?;
            } else {
                write!(f, "{}{}:{}", delim, start, end)?;
            }
            delim = ",";
        }
        Ok(())
    }
}

impl fmt::Debug for SeqRange<Seqnum> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "[Seqnum {}]", self)
    }
}

impl fmt::Debug for SeqRange<Uid> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "[Uid {}]", self)
    }
}

/// A message flag.
///
/// System flags are top-level enum values; keywords are in the `Keyword`
/// case. `\Recent` is deliberately absent: it is a per-session property
/// derived from the recency claim, never something stored on a message, so a
/// client cannot set or clear it and no mailbox can hold it.
///
/// `Display` produces the wire form; `FromStr` is the reverse, accepting any
/// ASCII casing of the system flags.
#[derive(Clone)]
pub enum Flag {
    Answered,
    Deleted,
    Draft,
    Flagged,
    Seen,
    Keyword(String),
}

impl Flag {
    /// The system flags, in the order they are interned in every mailbox.
    pub fn system_flags() -> [Flag; 5] {
        [
            Flag::Answered,
            Flag::Deleted,
            Flag::Draft,
            Flag::Flagged,
            Flag::Seen,
        ]
    }
}

impl fmt::Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Flag::Answered => write!(f, "\\Answered"),
            Flag::Deleted => write!(f, "\\Deleted"),
            Flag::Draft => write!(f, "\\Draft"),
            Flag::Flagged => write!(f, "\\Flagged"),
            Flag::Seen => write!(f, "\\Seen"),
            Flag::Keyword(ref kw) => write!(f, "{}", kw),
        }
    }
}

impl fmt::Debug for Flag {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        <Flag as fmt::Display>::fmt(self, f)
    }
}

impl FromStr for Flag {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        let system = Flag::system_flags();
        if let Some(flag) = system
            .iter()
            .find(|f| f.to_string().eq_ignore_ascii_case(s))
        {
            Ok(flag.clone())
        } else if s.starts_with('\\') {
            // Includes \Recent, which clients may never STORE or APPEND
            Err(Error::NxFlag)
        } else if !s.is_empty() && s.bytes().all(is_atom_char) {
            Ok(Flag::Keyword(s.to_owned()))
        } else {
            Err(Error::NxFlag)
        }
    }
}

fn is_atom_char(ch: u8) -> bool {
    !matches!(
        ch,
        0..=b' '
            | 127..=255
            | b'(' | b')' | b'{' | b'*' | b'%' | b'\\' | b'"' | b']'
    )
}

impl PartialEq for Flag {
    fn eq(&self, other: &Flag) -> bool {
        match (self, other) {
            (&Flag::Answered, &Flag::Answered)
            | (&Flag::Deleted, &Flag::Deleted)
            | (&Flag::Draft, &Flag::Draft)
            | (&Flag::Flagged, &Flag::Flagged)
            | (&Flag::Seen, &Flag::Seen) => true,
            // Keywords are compared ASCII-case-insensitively, which is what
            // clients expect even though RFC 3501 does not say so.
            (&Flag::Keyword(ref a), &Flag::Keyword(ref b)) => {
                a.eq_ignore_ascii_case(b)
            }
            _ => false,
        }
    }
}

impl Eq for Flag {}

/// All information needed to produce a response to a `SELECT` or `EXAMINE`
/// command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectResponse {
    /// The flags currently defined in the mailbox.
    /// `* FLAGS (flags...)`
    pub flags: Vec<Flag>,
    /// The flags the client may change permanently. Empty for `EXAMINE`.
    /// `* OK [PERMANENTFLAGS (permanent_flags... \*)]`
    pub permanent_flags: Vec<Flag>,
    /// Whether `\*` belongs in `PERMANENTFLAGS`. Always false for `EXAMINE`.
    pub keywords_allowed: bool,
    /// The number of messages that currently exist.
    /// `* exists EXISTS`
    pub exists: usize,
    /// The number of messages this session sees as `\Recent`.
    /// `* recent RECENT`
    pub recent: usize,
    /// The sequence number of the first message without `\Seen`, if any.
    /// `* OK [UNSEEN unseen]`
    pub unseen: Option<Seqnum>,
    /// The next UID to be assigned.
    /// `* OK [UIDNEXT uidnext]`
    pub uidnext: Uid,
    /// `* OK [UIDVALIDITY uidvalidity]`
    pub uidvalidity: u32,
    /// `TAG OK [READ-WRITE|READ-ONLY]`
    pub read_only: bool,
}

/// Unsolicited responses produced when a session catches up with changes
/// other sessions made to its mailbox.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PollResponse {
    /// Messages to report as expunged, in *descending* order so that each
    /// sequence number is still valid at the point it is sent.
    ///
    /// ```text
    /// * expunge[0].0 EXPUNGE
    /// * expunge[1].0 EXPUNGE
    /// ...
    /// ```
    pub expunge: Vec<(Seqnum, Uid)>,
    /// If the mailbox size has changed, the new size.
    /// `* exists EXISTS`
    pub exists: Option<usize>,
    /// If there are new messages, the new recent count.
    /// `* recent RECENT`
    pub recent: Option<usize>,
    /// Messages whose flags changed.
    /// `* seqnum FETCH (UID uid FLAGS (...))`
    pub fetch: Vec<FlagsUpdate>,
}

impl PollResponse {
    pub fn is_empty(&self) -> bool {
        self.expunge.is_empty()
            && self.exists.is_none()
            && self.recent.is_none()
            && self.fetch.is_empty()
    }
}

/// The current flags of one message, as seen by one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlagsUpdate {
    pub seqnum: Seqnum,
    pub uid: Uid,
    pub flags: Vec<Flag>,
    /// Whether to prefix the flags with `\Recent`.
    pub recent: bool,
}

/// How a `STORE` combines the requested flags with the existing ones.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreMode {
    /// `+FLAGS`
    Add,
    /// `-FLAGS`
    Remove,
    /// `FLAGS`
    Replace,
}

/// Request information for `STORE` and `UID STORE`.
#[derive(Clone, Debug)]
pub struct StoreRequest<'a, ID>
where
    SeqRange<ID>: fmt::Debug,
{
    /// The message(s) to affect.
    pub ids: &'a SeqRange<ID>,
    /// The flags to control.
    pub flags: &'a [Flag],
    pub mode: StoreMode,
    /// If true, report the resulting flags of every affected message, even
    /// ones which did not change. False for `.SILENT`.
    pub loud: bool,
}

/// Response information for `STORE` and `UID STORE`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoreResponse {
    /// The `FETCH` responses to send before the tagged response.
    pub fetch: Vec<FlagsUpdate>,
    /// False if some requested message was expunged by another session
    /// before the store happened. The rest of the batch is still applied;
    /// this becomes `NO [EXPUNGEISSUED]`.
    pub ok: bool,
}

/// Request information for `FETCH` and `UID FETCH`.
#[derive(Clone, Debug, Default)]
pub struct FetchRequest<ID>
where
    SeqRange<ID>: fmt::Debug,
{
    /// The messages to fetch.
    pub ids: SeqRange<ID>,
    /// Return UIDs? Always true for `UID FETCH`.
    pub uid: bool,
    /// Return flags?
    pub flags: bool,
    /// Return the full message (`RFC822` / `BODY[]`)?
    pub body: bool,
    /// If true, fetching the body does not implicitly set `\Seen`
    /// (`BODY.PEEK[]`).
    pub peek: bool,
}

impl<ID> FetchRequest<ID>
where
    SeqRange<ID>: fmt::Debug,
{
    /// Whether this fetch would set `\Seen` on a read-write mailbox.
    pub fn sets_seen(&self) -> bool {
        self.body && !self.peek
    }
}

/// One message returned by `FETCH`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchedMessage {
    pub seqnum: Seqnum,
    pub uid: Option<Uid>,
    pub flags: Option<FlagsUpdate>,
    pub body: Option<Arc<[u8]>>,
}

/// Response information for `FETCH` and `UID FETCH`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchResponse {
    pub messages: Vec<FetchedMessage>,
    /// False if some requested message has since been expunged by another
    /// session. This becomes `NO [EXPUNGEISSUED]`.
    pub ok: bool,
}

/// Response for `EXPUNGE` and `UID EXPUNGE`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExpungeResponse {
    /// Removed messages in descending sequence-number order, relative to the
    /// session that requested the expunge.
    pub expunged: Vec<(Seqnum, Uid)>,
}

/// A message to be added with `APPEND`.
#[derive(Clone, Debug)]
pub struct AppendRequest {
    pub mailbox: String,
    pub flags: Vec<Flag>,
    pub internal_date: Option<DateTime<FixedOffset>>,
    pub data: Vec<u8>,
}

/// The response for the `APPEND` command, per RFC 4315.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppendResponse {
    pub uid_validity: u32,
    pub uid: Uid,
}

/// Response for `COPY` and `MOVE`, per RFC 4315.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CopyResponse {
    /// The UID validity value of the destination mailbox.
    pub uid_validity: u32,
    /// The UIDs of the copied messages in the source mailbox.
    pub from_uids: SeqRange<Uid>,
    /// The UIDs of the new messages, parallel to `from_uids`.
    pub to_uids: SeqRange<Uid>,
    /// For `MOVE`, the messages removed from the source mailbox.
    pub expunged: Vec<(Seqnum, Uid)>,
}
