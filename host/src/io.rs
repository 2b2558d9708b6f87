//! I/O utilities for the host
//!
//! JSON loading and saving of circuit inputs and query files, and
//! formatting of commitments for display.

use anyhow::{Context, Result};
use serde::{de::DeserializeOwned, Serialize};
use shadow_query_core::types::Hash;
use shadow_query_core::{CircuitInput, Fr};
use std::fs;
use std::path::Path;

/// Load any JSON document
pub fn load_json<T: DeserializeOwned, P: AsRef<Path>>(path: P) -> Result<T> {
    let path = path.as_ref();
    let json =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&json).with_context(|| format!("Failed to parse {}", path.display()))
}

/// Save any value as pretty JSON
pub fn save_json<T: Serialize, P: AsRef<Path>>(value: &T, path: P) -> Result<()> {
    let path = path.as_ref();
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))
}

/// Save a CircuitInput to a JSON file
pub fn save_input_json<P: AsRef<Path>>(input: &CircuitInput, path: P) -> Result<()> {
    save_json(input, path)
}

/// Load a CircuitInput from a JSON file
pub fn load_input_json<P: AsRef<Path>>(path: P) -> Result<CircuitInput> {
    load_json(path)
}

/// Format a hash as a hex string
pub fn format_hash(hash: &Hash) -> String {
    format!("0x{}", hex::encode(hash.as_slice()))
}

fn format_fr(value: &Fr) -> String {
    format_hash(&value.to_b256())
}

/// Format the public commitments of an input for display
pub fn format_commitments(input: &CircuitInput) -> String {
    let output = input
        .output_commitment()
        .map(|c| format_hash(&c.hash()))
        .unwrap_or_else(|| "<not dry-run>".to_string());
    format!(
        "CircuitInput {{\n  \
         chain_id: {},\n  \
         data_points: {},\n  \
         input_commitments_root: {},\n  \
         toggles_commitment: {},\n  \
         output_commitment: {},\n  \
         output: 0x{}\n\
         }}",
        input.chain_id(),
        input.data_points(),
        format_fr(&input.input_commitments_root()),
        format_fr(&input.toggles_commitment()),
        output,
        hex::encode(input.output()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use shadow_query_core::{Allocation, DataInput, DummyTable};

    fn input() -> CircuitInput {
        let allocation = Allocation::new(32, 0, 0);
        let dummies = DummyTable::builtin().resolve(1, &allocation).unwrap();
        CircuitInput::commit(1, DataInput::new(&allocation), allocation, dummies).unwrap()
    }

    #[test]
    fn test_input_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("input.json");
        let input = input();
        save_input_json(&input, &path).unwrap();
        let back = load_input_json(&path).unwrap();
        assert_eq!(back.hash().unwrap(), input.hash().unwrap());
    }

    #[test]
    fn test_format_commitments() {
        let text = format_commitments(&input());
        assert!(text.contains("data_points: 32"));
        assert!(text.contains("<not dry-run>"));
    }

    #[test]
    fn test_format_hash() {
        assert_eq!(format_hash(&Hash::with_last_byte(1)).len(), 66);
    }

    #[test]
    fn test_missing_file_has_context() {
        let err = load_input_json("/nonexistent/input.json").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/input.json"));
    }
}
