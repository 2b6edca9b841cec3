use crate::block::{Block, BlockType};
use crate::error::KmuResult;
use crate::handle::Handle;

/// Entry names of a signature block, in the order they are written.
pub mod entry {
    pub const CREATED_ON: &str = "CreatedOn";
    pub const DIGEST_ALGORITHM: &str = "DigestAlgorithm";
    pub const SIGNED_WITH: &str = "SignedWith";
    pub const SIGNED_BY: &str = "SignedBy";
    pub const SIGNATURE: &str = "s";
    pub const DATA_REFS: &str = "DataRefs";
}

/// Separator between DataRefs tokens.
pub const DATA_REFS_SEPARATOR: &str = ", ";

/// Signature metadata fixed before hashing starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureMetadata {
    pub handle: Handle,
    /// Formatted creation time; this exact string is hashed.
    pub created_on: String,
    /// Digest tag as written.
    pub digest_algorithm: String,
    /// Handle of the signing key.
    pub signed_with: String,
    /// Free-text signer label.
    pub signed_by: String,
}

impl SignatureMetadata {
    /// `<handle>-S`.
    pub fn block_name(&self) -> String {
        format!("{}-{}", self.handle, BlockType::S)
    }
}

/// A finished signature: metadata, base64url attached signature, and the
/// reference tokens that say what was hashed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub metadata: SignatureMetadata,
    pub signature: String,
    pub data_refs: Vec<String>,
}

impl Signature {
    /// Tokens joined by `", "`.
    pub fn data_refs_string(&self) -> String {
        self.data_refs.join(DATA_REFS_SEPARATOR)
    }

    /// The `-S` block to append to a container.
    pub fn to_block(&self) -> Block {
        Block::with_handle(self.metadata.handle.clone(), BlockType::S)
            .with(entry::CREATED_ON, self.metadata.created_on.as_str())
            .with(entry::DIGEST_ALGORITHM, self.metadata.digest_algorithm.as_str())
            .with(entry::SIGNED_WITH, self.metadata.signed_with.as_str())
            .with(entry::SIGNED_BY, self.metadata.signed_by.as_str())
            .with(entry::SIGNATURE, self.signature.as_str())
            .with(entry::DATA_REFS, self.data_refs_string())
    }

    /// Read a `-S` block. Tokens are split on commas and trimmed.
    pub fn from_block(block: &Block) -> KmuResult<Self> {
        Ok(Self {
            metadata: SignatureMetadata {
                handle: Handle::from(block.base_handle()),
                created_on: block.require(entry::CREATED_ON)?.to_string(),
                digest_algorithm: block.require(entry::DIGEST_ALGORITHM)?.to_string(),
                signed_with: block.require(entry::SIGNED_WITH)?.to_string(),
                signed_by: block.require(entry::SIGNED_BY)?.to_string(),
            },
            signature: block.require(entry::SIGNATURE)?.to_string(),
            data_refs: split_data_refs(block.require(entry::DATA_REFS)?),
        })
    }
}

/// Split a DataRefs value into trimmed tokens.
///
/// Empty tokens between commas are kept so they fail to resolve. A blank
/// value yields no tokens.
pub fn split_data_refs(data_refs: &str) -> Vec<String> {
    if data_refs.trim().is_empty() {
        return Vec::new();
    }
    data_refs.split(',').map(|t| t.trim().to_string()).collect()
}
