//! Tagged intermediate representation used between address substitution and
//! marker materialization.
//!
//! Address references are whole segments, so byte-level passes can never
//! split one or read its index bytes as data.

use std::fmt;

use crate::encoding::{to_byte, to_bytes3, u24_be};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(Vec<u8>),
    SavedAddressRef(u32),
    NewAddressRef(u8),
}

impl Segment {
    /// Bytes this segment contributes once markers are materialized,
    /// excluding the marker itself.
    pub fn payload_bytes(&self) -> Vec<u8> {
        match self {
            Segment::Literal(bytes) => bytes.clone(),
            Segment::SavedAddressRef(index) => u24_be(*index).to_vec(),
            Segment::NewAddressRef(index) => vec![*index],
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Literal(bytes) => write!(f, "{}", hex::encode(bytes)),
            Segment::SavedAddressRef(index) => write!(f, "[saved:{}]", to_bytes3(*index)),
            Segment::NewAddressRef(index) => write!(f, "[new:{}]", to_byte(u32::from(*index))),
        }
    }
}

/// Appends literal bytes, merging with a trailing literal segment.
pub fn push_literal(segments: &mut Vec<Segment>, bytes: &[u8]) {
    if bytes.is_empty() {
        return;
    }
    match segments.last_mut() {
        Some(Segment::Literal(last)) => last.extend_from_slice(bytes),
        _ => segments.push(Segment::Literal(bytes.to_vec())),
    }
}

/// Renders a segment stream for trace output.
pub fn render(segments: &[Segment]) -> String {
    segments.iter().map(ToString::to_string).collect()
}

/// Serializes the stream with the given marker bytes in front of each
/// reference.
///
/// A reference whose prefix is `None` is an internal error: the tier that
/// produced it must also have allocated its marker.
pub fn materialize(
    segments: &[Segment],
    address_prefix: Option<u8>,
    new_address_prefix: Option<u8>,
) -> Option<Vec<u8>> {
    let mut out = Vec::new();
    for segment in segments {
        match segment {
            Segment::Literal(bytes) => out.extend_from_slice(bytes),
            Segment::SavedAddressRef(index) => {
                out.push(address_prefix?);
                out.extend_from_slice(&u24_be(*index));
            }
            Segment::NewAddressRef(index) => {
                out.push(new_address_prefix?);
                out.push(*index);
            }
        }
    }
    Some(out)
}
