//! calldata-compress: reversible compression of ABI-encoded calldata for L2
//! data posting.
//!
//! The L2 cost model charges 4 units per zero byte and 16 per non-zero byte,
//! so every pass is scored against that model rather than raw length:
//! - Saved-address substitution against a caller-owned registry
//! - Per-call new-address table for addresses that repeat
//! - Zero-run compaction with majority run-length folding
//! - Marker allocation with fallback to fewer features
//! - 0xFF sentinel and escaping
//! - Cost-weighted duplicated-substring back-references
//!
//! Output layout (hex, `0x` prefixed):
//! `address_prefix | new_address_count | [new_address_prefix | addresses] |
//! max_byte_in_zeroes | payload | 00 | duplicate markers`.

pub mod address;
pub mod config;
pub mod cost;
pub mod dedup;
pub mod encoding;
pub mod error;
pub mod markers;
pub mod run_length;
pub mod segment;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::address::{Address, AddressTable};
use crate::config::CompressionConfig;
use crate::encoding::to_byte;
use crate::error::CompressError;
use crate::markers::{AllocationShortfall, Markers};
use crate::segment::Segment;

/// Feature subsets tried in order when markers run out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeatureTier {
    Full,
    SavedAddressesOnly,
    NoAddressSubstitution,
}

impl FeatureTier {
    fn starting(config: &CompressionConfig) -> Self {
        if config.skip_address_substitution {
            FeatureTier::NoAddressSubstitution
        } else if config.skip_new_address_substitution {
            FeatureTier::SavedAddressesOnly
        } else {
            FeatureTier::Full
        }
    }

    pub fn saved_addresses(self) -> bool {
        self != FeatureTier::NoAddressSubstitution
    }

    pub fn new_addresses(self) -> bool {
        self == FeatureTier::Full
    }

    fn fallback(self, shortfall: AllocationShortfall) -> Option<Self> {
        match (self, shortfall) {
            (FeatureTier::NoAddressSubstitution, _) => None,
            (_, AllocationShortfall::AddressPrefix) => Some(FeatureTier::NoAddressSubstitution),
            (FeatureTier::Full, AllocationShortfall::NewAddressPrefix) => {
                Some(FeatureTier::SavedAddressesOnly)
            }
            (FeatureTier::SavedAddressesOnly, AllocationShortfall::NewAddressPrefix) => None,
        }
    }
}

/// Compressed calldata and its cost before and after
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompressResult {
    pub compressed_data: String,
    pub initial_cost: u64,
    pub final_cost: u64,
    pub metadata: CompressionMetadata,
}

/// Metadata about the compression process
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompressionMetadata {
    pub tier: FeatureTier,
    pub saved_address_refs: usize,
    pub new_address_count: usize,
    pub max_byte_in_zeroes: u8,
    pub folded_zero_runs: usize,
    pub duplicate_markers: Vec<u8>,
}

/// Output of the passes that run before markers are materialized.
struct Prepared {
    segments: Vec<Segment>,
    new_addresses: Vec<Address>,
    saved_address_refs: usize,
    max_byte_in_zeroes: u8,
    folded_zero_runs: usize,
    markers: Markers,
}

/// The main compressor
#[derive(Debug, Clone, Default)]
pub struct Compressor {
    config: CompressionConfig,
}

impl Compressor {
    /// Create a new compressor with the given configuration
    pub fn new(config: CompressionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CompressionConfig {
        &self.config
    }

    /// Compress hex calldata (`0x` optional) against a saved-address table.
    pub fn compress(
        &self,
        calldata: &str,
        table: &AddressTable,
    ) -> Result<CompressResult, CompressError> {
        let raw = encoding::decode_calldata(calldata)?;
        let initial_cost = cost::cost(&raw);

        let mut tier = FeatureTier::starting(&self.config);
        let prepared = loop {
            match prepare(&raw, table, tier) {
                Ok(prepared) => break prepared,
                Err(shortfall) => {
                    let next = tier.fallback(shortfall).ok_or_else(|| {
                        CompressError::InvariantViolation(format!(
                            "no fallback from {tier:?} after {shortfall:?}"
                        ))
                    })?;
                    debug!(?tier, ?shortfall, ?next, "marker allocation fell short");
                    tier = next;
                }
            }
        };

        let Prepared {
            segments,
            new_addresses,
            saved_address_refs,
            max_byte_in_zeroes,
            folded_zero_runs,
            markers,
        } = prepared;

        let payload = segment::materialize(
            &segments,
            markers.address_prefix,
            markers.new_address_prefix,
        )
        .ok_or_else(|| {
            CompressError::InvariantViolation("address reference without a marker".into())
        })?;
        let payload = run_length::insert_sentinel(&payload);
        let (payload, duplicate_markers) = dedup::back_reference(payload, &markers.duplicate);

        let compressed_data = assemble(
            markers.address_prefix.unwrap_or(0),
            markers.new_address_prefix,
            &new_addresses,
            max_byte_in_zeroes,
            &payload,
            &duplicate_markers,
        );
        if compressed_data.len() % 2 != 0 {
            return Err(CompressError::InvariantViolation(format!(
                "compressed output has odd length {}",
                compressed_data.len()
            )));
        }
        let final_cost = cost::cost_hex(&compressed_data);

        debug!(
            ?tier,
            initial_cost,
            final_cost,
            saved_address_refs,
            new_addresses = new_addresses.len(),
            duplicate_markers = duplicate_markers.len(),
            "calldata compressed"
        );

        Ok(CompressResult {
            compressed_data,
            initial_cost,
            final_cost,
            metadata: CompressionMetadata {
                tier,
                saved_address_refs,
                new_address_count: new_addresses.len(),
                max_byte_in_zeroes,
                folded_zero_runs,
                duplicate_markers,
            },
        })
    }
}

/// Compress with a one-off configuration.
pub fn compress(
    calldata: &str,
    table: &AddressTable,
    config: &CompressionConfig,
) -> Result<CompressResult, CompressError> {
    Compressor::new(config.clone()).compress(calldata, table)
}

/// Address substitution, zero compaction and marker allocation for one tier.
fn prepare(
    raw: &[u8],
    table: &AddressTable,
    tier: FeatureTier,
) -> Result<Prepared, AllocationShortfall> {
    let (segments, saved_address_refs) = if tier.saved_addresses() {
        address::substitute_saved(raw, table)
    } else {
        let mut segments = Vec::new();
        segment::push_literal(&mut segments, raw);
        (segments, 0)
    };

    let (segments, new_addresses) = if tier.new_addresses() {
        address::substitute_new(segments)
    } else {
        (segments, Vec::new())
    };
    trace!(stream = %segment::render(&segments), "addresses substituted");

    let zeros = run_length::compact_zeros(&segments);
    let markers = markers::allocate(
        &zeros.segments,
        tier.saved_addresses(),
        !new_addresses.is_empty(),
    )?;

    Ok(Prepared {
        segments: zeros.segments,
        new_addresses,
        saved_address_refs,
        max_byte_in_zeroes: zeros.max_byte_in_zeroes,
        folded_zero_runs: zeros.folded,
        markers,
    })
}

fn assemble(
    address_prefix: u8,
    new_address_prefix: Option<u8>,
    new_addresses: &[Address],
    max_byte_in_zeroes: u8,
    payload: &[u8],
    duplicate_markers: &[u8],
) -> String {
    let mut out = String::with_capacity(2 * (payload.len() + 20 * new_addresses.len() + 12) + 2);
    out.push_str("0x");
    out.push_str(&to_byte(u32::from(address_prefix)));
    out.push_str(&to_byte(new_addresses.len() as u32));
    if let Some(prefix) = new_address_prefix {
        out.push_str(&to_byte(u32::from(prefix)));
        for address in new_addresses {
            out.push_str(&hex::encode(address));
        }
    }
    out.push_str(&to_byte(u32::from(max_byte_in_zeroes)));
    out.push_str(&hex::encode(payload));
    out.push_str("00");
    for &marker in duplicate_markers {
        out.push_str(&to_byte(u32::from(marker)));
    }
    out
}
