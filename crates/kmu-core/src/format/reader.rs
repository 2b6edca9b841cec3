use std::fs;
use std::path::Path;

use serde_json::{Map, Value};
use tracing::{info, warn};

use super::blocks::contents_to_blocks;
use super::field;
use crate::error::{KmuError, KmuResult};
use crate::kmu::{Kmu, KEYSTORE_VERSION, TRANSACTION_VERSION};
use crate::logging::subsystem;

/// Parse a container from a JSON value.
///
/// The version picks the flavor. Transactions must carry `KMUHandle` and
/// `AdminEmail`, and any U or X block in one fails the whole read.
pub fn from_value(value: &Value) -> KmuResult<Kmu> {
    let root = value
        .as_object()
        .ok_or_else(|| KmuError::InvalidFormat("container is not a JSON object".into()))?;

    let version = string_field(root, field::VERSION)?;
    let mut kmu = match version {
        KEYSTORE_VERSION => Kmu::keystore(),
        TRANSACTION_VERSION => Kmu::transaction_with_handle(
            string_field(root, field::KMU_HANDLE)?,
            string_field(root, field::ADMIN_EMAIL)?,
        )?,
        other => {
            warn!(subsystem = subsystem::FORMAT, version = other, "Unsupported container version");
            return Err(KmuError::UnsupportedVersion(other.to_string()));
        }
    };

    let contents = root
        .get(field::CONTENTS)
        .and_then(Value::as_object)
        .ok_or_else(|| KmuError::InvalidFormat("Contents must be an object".into()))?;
    kmu.add_blocks(contents_to_blocks(contents)?)?;
    Ok(kmu)
}

/// Parse a container from JSON text.
pub fn from_str(text: &str) -> KmuResult<Kmu> {
    let value: Value = serde_json::from_str(text)?;
    from_value(&value)
}

/// Read a container from `path`.
pub fn read_file(path: impl AsRef<Path>) -> KmuResult<Kmu> {
    let path = path.as_ref();
    let kmu = from_str(&fs::read_to_string(path)?)?;
    info!(
        subsystem = subsystem::FORMAT,
        op = "read",
        path = %path.display(),
        block_count = kmu.len(),
        "Container read"
    );
    Ok(kmu)
}

fn string_field<'a>(root: &'a Map<String, Value>, name: &str) -> KmuResult<&'a str> {
    root.get(name)
        .and_then(Value::as_str)
        .ok_or_else(|| KmuError::InvalidFormat(format!("missing string field {}", name)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_read_keystore() {
        let value = json!({
            "Version": KEYSTORE_VERSION,
            "Contents": {
                "k-U": { "KeyUsage": "Signing", "S": ["abc", "def"] },
                "d-D": { "x": "y" }
            }
        });
        let kmu = from_value(&value).unwrap();
        assert!(!kmu.is_transaction());
        let names: Vec<_> = kmu.names().collect();
        assert_eq!(names, ["k-U", "d-D"]);
        assert_eq!(kmu.get("k-U").unwrap().get("S"), Some("abcdef"));
    }

    #[test]
    fn test_read_transaction() {
        let value = json!({
            "Version": TRANSACTION_VERSION,
            "KMUHandle": "tx-T",
            "AdminEmail": "admin@example.com",
            "Contents": { "d-D": { "x": "y" } }
        });
        let kmu = from_value(&value).unwrap();
        assert_eq!(kmu.handle(), Some("tx-T"));
        assert_eq!(kmu.admin_contact(), Some("admin@example.com"));
    }

    #[test]
    fn test_transaction_with_private_block_rejected() {
        let value = json!({
            "Version": TRANSACTION_VERSION,
            "KMUHandle": "tx-T",
            "AdminEmail": "admin@example.com",
            "Contents": { "d-D": {}, "k-X": { "X": "sealed" } }
        });
        assert!(matches!(
            from_value(&value),
            Err(KmuError::IllegalBlockTypeForExport(ref name)) if name == "k-X"
        ));
    }

    #[test]
    fn test_transaction_missing_handle() {
        let value = json!({
            "Version": TRANSACTION_VERSION,
            "AdminEmail": "admin@example.com",
            "Contents": {}
        });
        assert!(matches!(from_value(&value), Err(KmuError::InvalidFormat(_))));
    }

    #[test]
    fn test_unknown_version() {
        let value = json!({ "Version": "Some Other Format 2.0", "Contents": {} });
        assert!(matches!(
            from_value(&value),
            Err(KmuError::UnsupportedVersion(ref v)) if v == "Some Other Format 2.0"
        ));
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(from_str("{ not json"), Err(KmuError::Json(_))));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            read_file(dir.path().join("absent.json")),
            Err(KmuError::Io(_))
        ));
    }
}
