//! Address substitution
//!
//! Two passes turn 20-byte address literals into compact references:
//! saved addresses (indices owned by an external registry) become
//! [`Segment::SavedAddressRef`], and the remaining ABI-encoded addresses of a
//! single payload become [`Segment::NewAddressRef`] into a per-call table that
//! is written to the output header.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::encoding::{decode_calldata, MAX_U24};
use crate::error::CompressError;
use crate::segment::{push_literal, Segment};

pub const ADDRESS_LEN: usize = 20;

/// ABI words left-pad addresses with this many zero bytes.
pub const ABI_ADDRESS_PADDING: usize = 12;

pub const ABI_WORD_LEN: usize = 32;

pub const SELECTOR_LEN: usize = 4;

/// Integers below 2^80 fill the address slot of a word the same way an
/// address does. Windows with more leading zero bytes than this are read as
/// integers.
pub const MAX_ADDRESS_LEADING_ZEROS: usize = 10;

/// New-address indices are one byte, and the header count is one byte.
pub const MAX_NEW_ADDRESSES: usize = 255;

pub type Address = [u8; ADDRESS_LEN];

pub const ZERO_ADDRESS: Address = [0u8; ADDRESS_LEN];

/// Parse a 20-byte address from hex, `0x` optional, any case.
pub fn parse_address(text: &str) -> Result<Address, CompressError> {
    let bytes = decode_calldata(text)?;
    bytes
        .try_into()
        .map_err(|_| CompressError::InvalidAddress(text.to_string()))
}

/// Registry entry for one address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressEntry {
    pub saved: bool,
    /// Stable index, or [`AddressEntry::UNSUBSTITUTED`].
    pub index: i64,
}

impl AddressEntry {
    /// Registered, but never replaced by a reference.
    pub const UNSUBSTITUTED: i64 = -1;

    pub fn saved(index: u32) -> Self {
        Self {
            saved: true,
            index: i64::from(index),
        }
    }

    /// The index to emit for this entry, if it takes part in substitution.
    pub fn substitution_index(&self) -> Option<u32> {
        if !self.saved || self.index == Self::UNSUBSTITUTED {
            return None;
        }
        u32::try_from(self.index).ok().filter(|&i| i <= MAX_U24)
    }
}

/// Caller-owned saved-address registry. Read-only during compression.
#[derive(Debug, Clone, Default)]
pub struct AddressTable {
    entries: HashMap<Address, AddressEntry>,
}

impl AddressTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an entry, rejecting indices that do not fit in three bytes.
    pub fn insert(
        &mut self,
        address: Address,
        entry: AddressEntry,
    ) -> Result<Option<AddressEntry>, CompressError> {
        if entry.index != AddressEntry::UNSUBSTITUTED
            && !(0..=i64::from(MAX_U24)).contains(&entry.index)
        {
            return Err(CompressError::IndexOutOfRange {
                index: entry.index,
                max: MAX_U24,
            });
        }
        Ok(self.entries.insert(address, entry))
    }

    /// Build a table from a JSON object keyed by hex address:
    /// `{ "0xabc…": { "saved": true, "index": 7 } }`.
    pub fn from_json(json: &str) -> Result<Self, CompressError> {
        let raw: HashMap<String, AddressEntry> = serde_json::from_str(json)?;
        let mut table = Self::new();
        for (key, entry) in raw {
            table.insert(parse_address(&key)?, entry)?;
        }
        Ok(table)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, CompressError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn get(&self, address: &Address) -> Option<&AddressEntry> {
        self.entries.get(address)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Address, &AddressEntry)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn substitution_index(&self, window: &[u8]) -> Option<u32> {
        let address: &Address = window.try_into().ok()?;
        if *address == ZERO_ADDRESS {
            return None;
        }
        self.entries.get(address)?.substitution_index()
    }
}

/// Replace every saved address in `data` with a reference.
///
/// Matches are leftmost-first and never overlap. Returns the segment stream
/// and the number of references emitted.
pub fn substitute_saved(data: &[u8], table: &AddressTable) -> (Vec<Segment>, usize) {
    let mut segments = Vec::new();
    if table.is_empty() {
        push_literal(&mut segments, data);
        return (segments, 0);
    }

    let mut refs = 0;
    let mut literal_start = 0;
    let mut i = 0;
    while i + ADDRESS_LEN <= data.len() {
        match table.substitution_index(&data[i..i + ADDRESS_LEN]) {
            Some(index) => {
                push_literal(&mut segments, &data[literal_start..i]);
                segments.push(Segment::SavedAddressRef(index));
                refs += 1;
                i += ADDRESS_LEN;
                literal_start = i;
            }
            None => i += 1,
        }
    }
    push_literal(&mut segments, &data[literal_start..]);
    (segments, refs)
}

/// Replace ABI-encoded addresses with per-call references.
///
/// Returns the rewritten stream and the new-address table in index order.
/// Indices follow first-seen order and at most [`MAX_NEW_ADDRESSES`] are
/// assigned. Every returned address is referenced at least once.
pub fn substitute_new(segments: Vec<Segment>) -> (Vec<Segment>, Vec<Address>) {
    let mut kept: Vec<Address> = discover_candidates(&segments)
        .into_iter()
        .take(MAX_NEW_ADDRESSES)
        .collect();
    if kept.is_empty() {
        return (segments, kept);
    }

    // An earlier address can consume the bytes of a later, overlapping one.
    // Dropping it can shift which windows match first, so repeat until every
    // kept address is still used.
    loop {
        let lookup = index_map(&kept);
        let uses = count_occurrences(&segments, &lookup);
        if uses.iter().all(|&n| n > 0) {
            let out = replace_new(&segments, &lookup);
            return (out, kept);
        }
        kept = kept
            .into_iter()
            .zip(uses)
            .filter(|&(_, n)| n > 0)
            .map(|(address, _)| address)
            .collect();
    }
}

/// Where ABI words start: after a 4-byte selector when the length says there
/// is one, otherwise at offset 0.
fn word_base(segments: &[Segment]) -> usize {
    let raw_len: usize = segments
        .iter()
        .map(|segment| match segment {
            Segment::Literal(bytes) => bytes.len(),
            _ => ADDRESS_LEN,
        })
        .sum();
    if raw_len % ABI_WORD_LEN == SELECTOR_LEN {
        SELECTOR_LEN
    } else {
        0
    }
}

/// Address slots of literal ABI words, distinct, in first-seen order.
///
/// A slot is the last 20 bytes of a word whose first 12 bytes are zero. The
/// slot keeps any leading zero bytes of the address; it is skipped when it is
/// the zero address or has more than [`MAX_ADDRESS_LEADING_ZEROS`] of them.
fn discover_candidates(segments: &[Segment]) -> Vec<Address> {
    let slot = (word_base(segments) + ABI_ADDRESS_PADDING) % ABI_WORD_LEN;
    let mut seen = HashSet::new();
    let mut candidates = Vec::new();
    let mut offset = 0;
    for segment in segments {
        let Segment::Literal(bytes) = segment else {
            offset += ADDRESS_LEN;
            continue;
        };
        let mut i = (slot + ABI_WORD_LEN - offset % ABI_WORD_LEN) % ABI_WORD_LEN;
        while i < ABI_ADDRESS_PADDING {
            i += ABI_WORD_LEN;
        }
        while i + ADDRESS_LEN <= bytes.len() {
            let padded = bytes[i - ABI_ADDRESS_PADDING..i].iter().all(|&b| b == 0);
            let window = &bytes[i..i + ADDRESS_LEN];
            let leading_zeros = window.iter().take_while(|&&b| b == 0).count();
            if padded && leading_zeros <= MAX_ADDRESS_LEADING_ZEROS {
                let mut address = ZERO_ADDRESS;
                address.copy_from_slice(window);
                if seen.insert(address) {
                    candidates.push(address);
                }
            }
            i += ABI_WORD_LEN;
        }
        offset += bytes.len();
    }
    candidates
}

fn index_map(addresses: &[Address]) -> HashMap<Address, usize> {
    addresses
        .iter()
        .enumerate()
        .map(|(i, address)| (*address, i))
        .collect()
}

enum Piece<'a> {
    Bytes(&'a [u8]),
    Hit(usize),
}

/// Leftmost, non-overlapping split of a literal run on known addresses.
fn split_on_addresses<'a>(bytes: &'a [u8], lookup: &HashMap<Address, usize>) -> Vec<Piece<'a>> {
    let mut pieces = Vec::new();
    let mut literal_start = 0;
    let mut i = 0;
    while i + ADDRESS_LEN <= bytes.len() {
        let hit = <&Address>::try_from(&bytes[i..i + ADDRESS_LEN])
            .ok()
            .and_then(|address| lookup.get(address));
        match hit {
            Some(&index) => {
                if literal_start < i {
                    pieces.push(Piece::Bytes(&bytes[literal_start..i]));
                }
                pieces.push(Piece::Hit(index));
                i += ADDRESS_LEN;
                literal_start = i;
            }
            None => i += 1,
        }
    }
    if literal_start < bytes.len() {
        pieces.push(Piece::Bytes(&bytes[literal_start..]));
    }
    pieces
}

fn count_occurrences(segments: &[Segment], lookup: &HashMap<Address, usize>) -> Vec<usize> {
    let mut counts = vec![0usize; lookup.len()];
    for segment in segments {
        if let Segment::Literal(bytes) = segment {
            for piece in split_on_addresses(bytes, lookup) {
                if let Piece::Hit(index) = piece {
                    counts[index] += 1;
                }
            }
        }
    }
    counts
}

fn replace_new(segments: &[Segment], lookup: &HashMap<Address, usize>) -> Vec<Segment> {
    let mut out = Vec::with_capacity(segments.len());
    for segment in segments {
        match segment {
            Segment::Literal(bytes) => {
                for piece in split_on_addresses(bytes, lookup) {
                    match piece {
                        Piece::Bytes(b) => push_literal(&mut out, b),
                        // lookup holds at most MAX_NEW_ADDRESSES entries
                        Piece::Hit(index) => out.push(Segment::NewAddressRef(index as u8)),
                    }
                }
            }
            other => out.push(other.clone()),
        }
    }
    out
}
