//! Marker-byte allocation
//!
//! Markers are byte values absent from the compacted stream, so a decoder can
//! recognise them without escaping. 0x00 belongs to zero runs and is never
//! handed out.
//!
//! The two address prefixes only have to avoid literal bytes: a decoder that
//! meets a prefix consumes the index bytes behind it whole. They may also be
//! 0xFF, which the escape pass restores before any prefix is read. Duplicate
//! markers are matched anywhere in the escaped payload, so they avoid index
//! bytes as well as 0xFF, the sentinel.

use crate::segment::Segment;

pub const MAX_DUPLICATE_MARKERS: usize = 6;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Markers {
    pub address_prefix: Option<u8>,
    pub new_address_prefix: Option<u8>,
    pub duplicate: Vec<u8>,
}

/// Which required marker could not be found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocationShortfall {
    AddressPrefix,
    NewAddressPrefix,
}

/// Values in use by literal bytes and, with `with_indices`, by reference
/// index bytes.
pub fn used_bytes(segments: &[Segment], with_indices: bool) -> [bool; 256] {
    let mut used = [false; 256];
    for segment in segments {
        if with_indices || matches!(segment, Segment::Literal(_)) {
            for b in segment.payload_bytes() {
                used[b as usize] = true;
            }
        }
    }
    used
}

/// Pick markers in priority order: address prefix, new-address prefix, then
/// up to six duplicate markers.
pub fn allocate(
    segments: &[Segment],
    need_address_prefix: bool,
    need_new_address_prefix: bool,
) -> Result<Markers, AllocationShortfall> {
    let literal = used_bytes(segments, false);
    let mut prefixes = (0x01..=0xffu8).filter(|&b| !literal[b as usize]);

    let mut markers = Markers::default();
    if need_address_prefix {
        markers.address_prefix = Some(prefixes.next().ok_or(AllocationShortfall::AddressPrefix)?);
    }
    if need_new_address_prefix {
        markers.new_address_prefix =
            Some(prefixes.next().ok_or(AllocationShortfall::NewAddressPrefix)?);
    }

    let used = used_bytes(segments, true);
    let taken = [markers.address_prefix, markers.new_address_prefix];
    markers.duplicate = (0x01..=0xfeu8)
        .filter(|&b| !used[b as usize] && !taken.contains(&Some(b)))
        .take(MAX_DUPLICATE_MARKERS)
        .collect();
    Ok(markers)
}
