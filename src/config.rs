//! Configuration for calldata-compress

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CompressionConfig {
    /// Disable both saved- and new-address substitution.
    pub skip_address_substitution: bool,
    /// Disable only the per-call new-address table.
    pub skip_new_address_substitution: bool,
    /// Target network. Accepted for per-chain tuning, not read yet.
    pub network: Option<String>,
}
