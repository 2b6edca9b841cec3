use serde_json::{Map, Value};

use crate::block::{Block, BlockType};
use crate::error::{KmuError, KmuResult};
use crate::sig::{entry, split_data_refs, DATA_REFS_SEPARATOR};

/// Width of one line when long values are split in pretty mode.
pub const LINE_WIDTH: usize = 72;

/// Render blocks as a `Contents` object, one member per block in order.
///
/// In pretty mode values longer than [`LINE_WIDTH`] become arrays of
/// fixed-width chunks, and a signature block's `DataRefs` becomes an array of
/// tokens when splitting and rejoining gives back the same text. A
/// signature `DataRefs` that would not survive that stays a single string.
pub fn blocks_to_contents<'a, I>(blocks: I, pretty: bool) -> Map<String, Value>
where
    I: IntoIterator<Item = &'a Block>,
{
    let mut contents = Map::new();
    for block in blocks {
        let mut obj = Map::new();
        for (key, value) in block.entries() {
            obj.insert(key.to_string(), entry_value(block, key, value, pretty));
        }
        contents.insert(block.name().to_string(), Value::Object(obj));
    }
    contents
}

fn entry_value(block: &Block, key: &str, value: &str, pretty: bool) -> Value {
    if !pretty {
        return Value::String(value.to_string());
    }
    if is_token_list(block.name(), key) {
        let tokens = split_data_refs(value);
        if !tokens.is_empty() && tokens.join(DATA_REFS_SEPARATOR) == value {
            return Value::Array(tokens.into_iter().map(Value::String).collect());
        }
        return Value::String(value.to_string());
    }
    if value.chars().count() > LINE_WIDTH {
        return Value::Array(split_lines(value, LINE_WIDTH).into_iter().map(Value::String).collect());
    }
    Value::String(value.to_string())
}

/// Split into chunks of `width` characters; the last chunk may be shorter.
fn split_lines(value: &str, width: usize) -> Vec<String> {
    let chars: Vec<char> = value.chars().collect();
    chars.chunks(width).map(|c| c.iter().collect()).collect()
}

/// Rebuild blocks from a `Contents` object.
///
/// Array values are joined back together: a signature block's `DataRefs`
/// with `", "`, anything else with no separator. Block names must carry a
/// known type letter.
pub fn contents_to_blocks(contents: &Map<String, Value>) -> KmuResult<Vec<Block>> {
    let mut blocks = Vec::with_capacity(contents.len());
    for (name, body) in contents {
        let mut block = Block::from_name(name)?;
        let obj = body
            .as_object()
            .ok_or_else(|| KmuError::InvalidFormat(format!("block {} is not an object", name)))?;
        for (key, value) in obj {
            block.put(key.as_str(), join_value(name, key, value)?);
        }
        blocks.push(block);
    }
    Ok(blocks)
}

/// `DataRefs` of a signature block is written as a token array.
fn is_token_list(block_name: &str, key: &str) -> bool {
    key == entry::DATA_REFS && matches!(BlockType::of(block_name), Ok(BlockType::S))
}

fn join_value(block: &str, key: &str, value: &Value) -> KmuResult<String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Array(items) => {
            let parts = items
                .iter()
                .map(|item| {
                    item.as_str().ok_or_else(|| {
                        KmuError::InvalidFormat(format!("{}:{} has a non-string element", block, key))
                    })
                })
                .collect::<KmuResult<Vec<_>>>()?;
            if is_token_list(block, key) {
                Ok(parts.join(DATA_REFS_SEPARATOR))
            } else {
                Ok(parts.concat())
            }
        }
        _ => Err(KmuError::InvalidFormat(format!(
            "{}:{} must be a string or an array of strings",
            block, key
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_plain_mode_keeps_strings() {
        let long = "a".repeat(200);
        let block = Block::with_handle("h", BlockType::D).with("k", long.as_str());
        let contents = blocks_to_contents([&block], false);
        assert_eq!(contents["h-D"]["k"], Value::String(long));
    }

    #[test]
    fn test_pretty_splits_long_values() {
        let long = "b".repeat(150);
        let block = Block::with_handle("h", BlockType::D)
            .with("short", "x")
            .with("long", long.as_str());
        let contents = blocks_to_contents([&block], true);

        let lines = contents["h-D"]["long"].as_array().unwrap();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0].as_str().unwrap().len(), 72);
        assert_eq!(lines[2].as_str().unwrap().len(), 6);
        assert_eq!(contents["h-D"]["short"], json!("x"));
    }

    #[test]
    fn test_exact_width_value_not_split() {
        let value = "c".repeat(LINE_WIDTH);
        let block = Block::with_handle("h", BlockType::D).with("k", value.as_str());
        let contents = blocks_to_contents([&block], true);
        assert!(contents["h-D"]["k"].is_string());
    }

    #[test]
    fn test_pretty_data_refs_as_tokens() {
        let block = Block::with_handle("s", BlockType::S).with("DataRefs", "s-S:CreatedOn, .SignedBy");
        let contents = blocks_to_contents([&block], true);
        assert_eq!(contents["s-S"]["DataRefs"], json!(["s-S:CreatedOn", ".SignedBy"]));

        let back = contents_to_blocks(&contents).unwrap();
        assert_eq!(back[0].get("DataRefs"), Some("s-S:CreatedOn, .SignedBy"));
    }

    #[test]
    fn test_data_refs_outside_signatures_roundtrip() {
        let odd = "a,b,,c";
        let long = format!("{}, {}", "d-D:k".repeat(20), ".x".repeat(10));
        let blocks = [
            Block::with_handle("h", BlockType::D).with("DataRefs", odd),
            Block::with_handle("c", BlockType::C).with("DataRefs", long.as_str()),
            Block::with_handle("s", BlockType::S).with("DataRefs", "s-S:CreatedOn,.SignedBy"),
        ];

        let contents = blocks_to_contents(&blocks, true);
        assert_eq!(contents["h-D"]["DataRefs"], json!(odd));
        assert!(contents["c-C"]["DataRefs"].is_array());
        assert!(contents["s-S"]["DataRefs"].is_string());

        let back = contents_to_blocks(&contents).unwrap();
        assert_eq!(back, blocks);
    }

    #[test]
    fn test_read_preserves_order() {
        let contents = json!({
            "z-D": { "b": "1", "a": ["2", "3"] },
            "a-C": { "name": "x" }
        });
        let blocks = contents_to_blocks(contents.as_object().unwrap()).unwrap();
        let names: Vec<_> = blocks.iter().map(|b| b.name()).collect();
        assert_eq!(names, ["z-D", "a-C"]);

        let keys: Vec<_> = blocks[0].keys().collect();
        assert_eq!(keys, ["b", "a"]);
        assert_eq!(blocks[0].get("a"), Some("23"));
    }

    #[test]
    fn test_read_rejects_bad_shapes() {
        let unknown = json!({ "h-Q": {} });
        assert!(matches!(
            contents_to_blocks(unknown.as_object().unwrap()),
            Err(KmuError::UnknownBlockType(_))
        ));

        let numeric = json!({ "h-D": { "k": 5 } });
        assert!(matches!(
            contents_to_blocks(numeric.as_object().unwrap()),
            Err(KmuError::InvalidFormat(_))
        ));
    }
}
