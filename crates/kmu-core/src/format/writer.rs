use std::fs;
use std::path::Path;

use serde_json::{Map, Value};
use tracing::{debug, info};

use super::blocks::blocks_to_contents;
use super::field;
use crate::block::Block;
use crate::error::KmuResult;
use crate::kmu::{Kmu, KEYSTORE_VERSION};
use crate::logging::subsystem;

/// Serialize a container to a JSON value.
///
/// Transaction containers holding U or X blocks are refused.
pub fn to_value(kmu: &Kmu, pretty: bool) -> KmuResult<Value> {
    kmu.validate_for_export()?;

    let mut root = Map::new();
    root.insert(field::VERSION.into(), Value::from(kmu.version()));
    if let (Some(handle), Some(admin)) = (kmu.handle(), kmu.admin_contact()) {
        root.insert(field::KMU_HANDLE.into(), Value::from(handle));
        root.insert(field::ADMIN_EMAIL.into(), Value::from(admin));
    }
    root.insert(
        field::CONTENTS.into(),
        Value::Object(blocks_to_contents(kmu.blocks(), pretty)),
    );
    Ok(Value::Object(root))
}

/// Serialize a container to JSON text.
pub fn to_string(kmu: &Kmu, pretty: bool) -> KmuResult<String> {
    render(&to_value(kmu, pretty)?, pretty)
}

/// Serialize only the U and X blocks, wrapped as a keystore.
///
/// Used to split local key material out of a working container.
pub fn write_keys(kmu: &Kmu, pretty: bool) -> KmuResult<String> {
    let keys: Vec<&Block> = kmu
        .blocks()
        .filter(|b| b.block_type().is_private())
        .collect();
    debug!(subsystem = subsystem::FORMAT, block_count = keys.len(), "Emitting key blocks");

    let mut root = Map::new();
    root.insert(field::VERSION.into(), Value::from(KEYSTORE_VERSION));
    root.insert(
        field::CONTENTS.into(),
        Value::Object(blocks_to_contents(keys, pretty)),
    );
    render(&Value::Object(root), pretty)
}

/// Write a container to `path`, replacing any existing file.
pub fn write_file(kmu: &Kmu, path: impl AsRef<Path>, pretty: bool) -> KmuResult<()> {
    let path = path.as_ref();
    let text = to_string(kmu, pretty)?;
    fs::write(path, text)?;
    info!(
        subsystem = subsystem::FORMAT,
        op = "write",
        path = %path.display(),
        block_count = kmu.len(),
        "Container written"
    );
    Ok(())
}

fn render(value: &Value, pretty: bool) -> KmuResult<String> {
    Ok(if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::BlockType;
    use crate::error::KmuError;
    use crate::kmu::TRANSACTION_VERSION;

    #[test]
    fn test_keystore_has_no_handle_fields() {
        let mut kmu = Kmu::keystore();
        kmu.add_block(Block::with_handle("a", BlockType::D).with("k", "v"))
            .unwrap();
        let value = to_value(&kmu, false).unwrap();

        let keys: Vec<_> = value.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, ["Version", "Contents"]);
        assert_eq!(value["Contents"]["a-D"]["k"], "v");
    }

    #[test]
    fn test_transaction_header_order() {
        let kmu = Kmu::transaction_with_handle("tx1-T", "admin@example.com").unwrap();
        let value = to_value(&kmu, true).unwrap();

        let keys: Vec<_> = value.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, ["Version", "KMUHandle", "AdminEmail", "Contents"]);
        assert_eq!(value["Version"], TRANSACTION_VERSION);
        assert_eq!(value["KMUHandle"], "tx1-T");
    }

    #[test]
    fn test_write_keys_filters_private_blocks() {
        let mut kmu = Kmu::keystore();
        kmu.add_blocks([
            Block::with_handle("a", BlockType::D).with("k", "v"),
            Block::with_handle("k1", BlockType::U).with("S", "s"),
            Block::with_handle("k1", BlockType::P).with("P", "p"),
            Block::with_handle("k2", BlockType::X).with("X", "x"),
        ])
        .unwrap();

        let text = write_keys(&kmu, false).unwrap();
        let value: Value = serde_json::from_str(&text).unwrap();
        let names: Vec<_> = value["Contents"].as_object().unwrap().keys().cloned().collect();
        assert_eq!(names, ["k1-U", "k2-X"]);
        assert_eq!(value["Version"], KEYSTORE_VERSION);
    }

    #[test]
    fn test_write_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kmu.json");
        let mut kmu = Kmu::keystore();
        kmu.add_block(Block::with_handle("a", BlockType::D).with("k", "v"))
            .unwrap();

        write_file(&kmu, &path, true).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"a-D\""));
    }

    #[test]
    fn test_unwritable_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("kmu.json");
        assert!(matches!(
            write_file(&Kmu::keystore(), &path, false),
            Err(KmuError::Io(_))
        ));
    }
}
