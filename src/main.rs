use std::io::Read;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use calldata_compress::address::AddressTable;
use calldata_compress::config::CompressionConfig;
use calldata_compress::Compressor;

/// Compress ABI-encoded calldata for L2 data posting.
#[derive(Parser, Debug)]
#[command(name = "calldata-compress", version, about)]
struct Cli {
    /// Calldata as hex (`0x` optional). Read from stdin when omitted.
    calldata: Option<String>,

    /// Saved-address table as JSON: { "0x…": { "saved": true, "index": 7 } }
    #[arg(long)]
    table: Option<PathBuf>,

    #[arg(long)]
    skip_address_substitution: bool,

    #[arg(long)]
    skip_new_address_substitution: bool,

    /// Target network name, reserved for per-chain tuning.
    #[arg(long)]
    network: Option<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let calldata = match cli.calldata {
        Some(data) => data,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("reading calldata from stdin")?;
            buf.trim().to_string()
        }
    };

    let table = match &cli.table {
        Some(path) => AddressTable::load(path)
            .with_context(|| format!("loading address table {}", path.display()))?,
        None => AddressTable::new(),
    };

    let compressor = Compressor::new(CompressionConfig {
        skip_address_substitution: cli.skip_address_substitution,
        skip_new_address_substitution: cli.skip_new_address_substitution,
        network: cli.network,
    });
    let result = compressor
        .compress(&calldata, &table)
        .context("compressing calldata")?;

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
