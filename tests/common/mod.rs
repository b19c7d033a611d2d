//! Reference decoder for the compressed wire format, used to prove the
//! compressor is reversible.

#![allow(dead_code)]

use std::collections::HashMap;

use calldata_compress::address::{Address, AddressTable, ADDRESS_LEN};

pub fn decompress(compressed: &str, table: &AddressTable) -> Vec<u8> {
    let digits = compressed
        .strip_prefix("0x")
        .expect("compressed data is 0x-prefixed");
    let bytes = hex::decode(digits).expect("compressed data is valid hex");

    let address_prefix = bytes[0];
    let new_address_count = bytes[1] as usize;
    let mut pos = 2;
    let mut new_address_prefix = None;
    let mut new_addresses = Vec::with_capacity(new_address_count);
    if new_address_count > 0 {
        new_address_prefix = Some(bytes[pos]);
        pos += 1;
        for _ in 0..new_address_count {
            new_addresses.push(bytes[pos..pos + ADDRESS_LEN].to_vec());
            pos += ADDRESS_LEN;
        }
    }
    let max_byte_in_zeroes = bytes[pos];
    pos += 1;

    let trailer = bytes
        .iter()
        .rposition(|&b| b == 0)
        .expect("trailer byte present");
    assert!(trailer >= pos, "trailer inside header");
    let markers = &bytes[trailer + 1..];
    assert!(markers.len() <= 6);

    let mut payload = bytes[pos..trailer].to_vec();
    for &marker in markers.iter().rev() {
        payload = expand_back_references(&payload, marker);
    }
    assert_eq!(payload.first(), Some(&0xff), "sentinel missing");
    let unescaped = unescape_ff(&payload[1..]);

    let saved: HashMap<u32, Address> = table
        .iter()
        .filter_map(|(address, entry)| entry.substitution_index().map(|i| (i, *address)))
        .collect();

    let mut out = Vec::new();
    let mut i = 0;
    while i < unescaped.len() {
        let b = unescaped[i];
        if address_prefix != 0 && b == address_prefix {
            let index = u32::from_be_bytes([0, unescaped[i + 1], unescaped[i + 2], unescaped[i + 3]]);
            out.extend_from_slice(&saved[&index]);
            i += 4;
        } else if Some(b) == new_address_prefix {
            out.extend_from_slice(&new_addresses[unescaped[i + 1] as usize]);
            i += 2;
        } else if b == 0 {
            match unescaped.get(i + 1) {
                Some(&len)
                    if (1..=254).contains(&len)
                        && len != address_prefix
                        && Some(len) != new_address_prefix =>
                {
                    out.extend(std::iter::repeat(0u8).take(len as usize));
                    i += 2;
                }
                _ => {
                    out.extend(std::iter::repeat(0u8).take(max_byte_in_zeroes as usize));
                    i += 1;
                }
            }
        } else {
            out.push(b);
            i += 1;
        }
    }
    out
}

fn expand_back_references(data: &[u8], marker: u8) -> Vec<u8> {
    let open = data
        .iter()
        .position(|&b| b == marker)
        .expect("marker definition present");
    let close = open
        + 1
        + data[open + 1..]
            .iter()
            .position(|&b| b == marker)
            .expect("marker definition closed");
    let pattern = &data[open + 1..close];
    let mut out = data[..open].to_vec();
    out.extend_from_slice(pattern);
    for &b in &data[close + 1..] {
        if b == marker {
            out.extend_from_slice(pattern);
        } else {
            out.push(b);
        }
    }
    out
}

fn unescape_ff(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len());
    let mut i = 0;
    while i < data.len() {
        if data[i] == 0xff {
            let len = match data[i + 1] {
                0 => 1,
                n => n as usize,
            };
            out.extend(std::iter::repeat(0xffu8).take(len));
            i += 2;
        } else {
            out.push(data[i]);
            i += 1;
        }
    }
    out
}

/// ABI word holding a left-padded address.
pub fn address_word(address: &Address) -> Vec<u8> {
    let mut word = vec![0u8; 12];
    word.extend_from_slice(address);
    word
}

/// ABI word holding a small unsigned integer.
pub fn uint_word(value: u64) -> Vec<u8> {
    let mut word = vec![0u8; 24];
    word.extend_from_slice(&value.to_be_bytes());
    word
}

pub fn to_hex(data: &[u8]) -> String {
    format!("0x{}", hex::encode(data))
}
