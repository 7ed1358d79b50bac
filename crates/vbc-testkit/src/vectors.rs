//! Golden key vectors.
//!
//! Ledger keys must stay byte-compatible with stores written by earlier
//! releases, so the varint encoding is pinned here.

use vbc_core::{decode_varint, encode_varint};

/// A golden key vector.
#[derive(Debug, Clone)]
pub struct KeyVector {
    /// Human-readable name for the vector.
    pub name: &'static str,
    /// The ID being encoded.
    pub value: i64,
    /// Expected encoding (hex).
    pub expected_key: &'static str,
}

/// Get all golden key vectors.
pub fn all_vectors() -> Vec<KeyVector> {
    vec![
        KeyVector {
            name: "zero",
            value: 0,
            expected_key: "00",
        },
        KeyVector {
            name: "one",
            value: 1,
            expected_key: "02",
        },
        KeyVector {
            name: "minus one",
            value: -1,
            expected_key: "01",
        },
        KeyVector {
            name: "largest single byte",
            value: 63,
            expected_key: "7e",
        },
        KeyVector {
            name: "smallest single byte",
            value: -64,
            expected_key: "7f",
        },
        KeyVector {
            name: "first two byte",
            value: 64,
            expected_key: "8001",
        },
        KeyVector {
            name: "small account id",
            value: 150,
            expected_key: "ac02",
        },
        KeyVector {
            name: "snowflake status id",
            value: 110_000_000_000_000_042,
            expected_key: "d480d8d4d99ae68603",
        },
        KeyVector {
            name: "i64 max",
            value: i64::MAX,
            expected_key: "feffffffffffffffff01",
        },
        KeyVector {
            name: "i64 min",
            value: i64::MIN,
            expected_key: "ffffffffffffffffff01",
        },
    ]
}

/// Check one vector, returning a description of the first mismatch.
pub fn verify_vector(vector: &KeyVector) -> Result<(), String> {
    let encoded = hex::encode(encode_varint(vector.value));
    if encoded != vector.expected_key {
        return Err(format!(
            "{}: encoded {} as {}, expected {}",
            vector.name, vector.value, encoded, vector.expected_key
        ));
    }

    let bytes = hex::decode(vector.expected_key).map_err(|e| format!("{}: {}", vector.name, e))?;
    match decode_varint(&bytes) {
        Ok((value, read)) if value == vector.value && read == bytes.len() => Ok(()),
        Ok((value, read)) => Err(format!(
            "{}: decoded {} ({} bytes), expected {}",
            vector.name, value, read, vector.value
        )),
        Err(e) => Err(format!("{}: {}", vector.name, e)),
    }
}
