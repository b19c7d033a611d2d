//! Byte-run substitution
//!
//! One encoder serves two passes: zero-run compaction over the segment
//! stream, and 0xFF escaping of the materialized payload after the sentinel
//! is inserted. Runs become `[value][length]` pairs with lengths in
//! `1..=254`; longer runs are split into 254-byte chunks.

use tracing::trace;

use crate::segment::Segment;

/// Longest run a single `[value][length]` pair can describe.
pub const MAX_RUN_CHUNK: usize = 254;

/// Start-of-payload sentinel, also the escaped byte.
pub const SENTINEL: u8 = 0xff;

/// Parameters of the run encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunEncoding {
    pub value: u8,
    /// Length byte written for a chunk of exactly one byte.
    pub singleton_length: u8,
}

pub const ZERO_RUNS: RunEncoding = RunEncoding {
    value: 0x00,
    singleton_length: 0x01,
};

/// A lone 0xFF is written as `ff 00`, never `ff 01`.
pub const FF_ESCAPE: RunEncoding = RunEncoding {
    value: SENTINEL,
    singleton_length: 0x00,
};

impl RunEncoding {
    fn length_byte(&self, n: usize) -> u8 {
        debug_assert!((1..=MAX_RUN_CHUNK).contains(&n));
        if n == 1 {
            self.singleton_length
        } else {
            n as u8
        }
    }

    /// Encode `data` into `out`, appending every emitted length byte to
    /// `lengths`.
    pub fn encode_into(&self, data: &[u8], out: &mut Vec<u8>, lengths: &mut Vec<u8>) {
        let mut i = 0;
        while i < data.len() {
            if data[i] != self.value {
                out.push(data[i]);
                i += 1;
                continue;
            }
            let run = data[i..].iter().take_while(|&&b| b == self.value).count();
            let mut remaining = run;
            while remaining > 0 {
                let chunk = remaining.min(MAX_RUN_CHUNK);
                let length = self.length_byte(chunk);
                out.push(self.value);
                out.push(length);
                lengths.push(length);
                remaining -= chunk;
            }
            i += run;
        }
    }

    /// Encode `data`, returning the output and the emitted length bytes.
    pub fn encode(&self, data: &[u8]) -> (Vec<u8>, Vec<u8>) {
        let mut out = Vec::with_capacity(data.len());
        let mut lengths = Vec::new();
        self.encode_into(data, &mut out, &mut lengths);
        (out, lengths)
    }
}

/// Zero-compacted segment stream.
#[derive(Debug, Clone)]
pub struct ZeroCompaction {
    pub segments: Vec<Segment>,
    /// Run length a decoder assumes when a `00` has no length byte.
    pub max_byte_in_zeroes: u8,
    pub runs: usize,
    pub folded: usize,
}

/// Compact zero runs in every literal segment, then fold the majority run
/// length.
///
/// References are separate segments, so a run never crosses one.
pub fn compact_zeros(segments: &[Segment]) -> ZeroCompaction {
    let mut compacted = Vec::with_capacity(segments.len());
    let mut lengths = Vec::new();
    for segment in segments {
        match segment {
            Segment::Literal(bytes) => {
                let mut out = Vec::with_capacity(bytes.len());
                ZERO_RUNS.encode_into(bytes, &mut out, &mut lengths);
                compacted.push(Segment::Literal(out));
            }
            reference => compacted.push(reference.clone()),
        }
    }

    let max_byte_in_zeroes = most_frequent(&lengths);
    let (segments, folded) = fold(compacted, max_byte_in_zeroes);
    trace!(
        runs = lengths.len(),
        max_byte_in_zeroes,
        folded,
        "zero runs compacted"
    );
    ZeroCompaction {
        segments,
        max_byte_in_zeroes,
        runs: lengths.len(),
        folded,
    }
}

/// Most frequent length byte; ties go to the smaller value, 0x00 when empty.
pub fn most_frequent(lengths: &[u8]) -> u8 {
    let mut histogram = [0usize; 256];
    for &b in lengths {
        histogram[b as usize] += 1;
    }
    let mut best = 0u8;
    for value in 1..=255u8 {
        if histogram[value as usize] > histogram[best as usize] {
            best = value;
        }
    }
    best
}

/// Drop the length byte of `00 m` pairs whose successor cannot itself be
/// read as a length byte.
///
/// Literal segments are maximal, so whatever follows the end of a literal is
/// either an address reference or the end of the stream.
fn fold(segments: Vec<Segment>, m: u8) -> (Vec<Segment>, usize) {
    if m == 0 {
        return (segments, 0);
    }
    let mut folded = 0;
    let out = segments
        .into_iter()
        .map(|segment| match segment {
            Segment::Literal(bytes) => {
                let mut out = Vec::with_capacity(bytes.len());
                let mut i = 0;
                while i < bytes.len() {
                    let b = bytes[i];
                    out.push(b);
                    i += 1;
                    if b != 0 {
                        continue;
                    }
                    let Some(&length) = bytes.get(i) else {
                        break;
                    };
                    i += 1;
                    let unambiguous = match bytes.get(i) {
                        None => true,
                        Some(&next) => next == 0x00 || next == SENTINEL,
                    };
                    if length == m && unambiguous {
                        folded += 1;
                    } else {
                        out.push(length);
                    }
                }
                Segment::Literal(out)
            }
            reference => reference,
        })
        .collect();
    (out, folded)
}

/// Prepend the sentinel and escape every 0xFF after it.
pub fn insert_sentinel(payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(payload.len() + 1);
    out.push(SENTINEL);
    let mut lengths = Vec::new();
    FF_ESCAPE.encode_into(payload, &mut out, &mut lengths);
    out
}
