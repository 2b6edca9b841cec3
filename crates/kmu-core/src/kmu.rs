//! The key material unit: an ordered set of uniquely named blocks.
//!
//! Two flavors exist. A keystore may hold open (`-U`) and protected (`-X`)
//! keys and has no handle. A transaction carries a `<handle>-T` and an admin
//! contact and must never contain `-U` or `-X` blocks; the rule is checked
//! whenever a block enters the container.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::block::{Block, BlockType};
use crate::error::{KmuError, KmuResult};
use crate::handle::Handle;
use crate::key::KeyUsage;
use crate::logging::subsystem;

/// Version string of a keystore container.
pub const KEYSTORE_VERSION: &str = "KMU Keystore Format 1.0";

/// Version string of a transaction container.
pub const TRANSACTION_VERSION: &str = "KMU Transaction Format 1.0";

/// Container flavor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Flavor {
    Keystore,
    Transaction {
        /// `<base62>-T`.
        handle: String,
        admin_contact: String,
    },
}

/// Key material unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Kmu {
    flavor: Flavor,
    blocks: Vec<Block>,
    aliases: BTreeMap<String, String>,
}

impl Kmu {
    /// Empty keystore.
    pub fn keystore() -> Self {
        Self {
            flavor: Flavor::Keystore,
            blocks: Vec::new(),
            aliases: BTreeMap::new(),
        }
    }

    /// Empty transaction with a fresh handle.
    pub fn transaction(admin_contact: impl Into<String>) -> Self {
        Self {
            flavor: Flavor::Transaction {
                handle: format!("{}-{}", Handle::generate(), BlockType::T),
                admin_contact: admin_contact.into(),
            },
            blocks: Vec::new(),
            aliases: BTreeMap::new(),
        }
    }

    /// Empty transaction with a caller-supplied handle, which must end in `-T`.
    pub fn transaction_with_handle(
        handle: impl Into<String>,
        admin_contact: impl Into<String>,
    ) -> KmuResult<Self> {
        let handle = handle.into();
        if BlockType::of(&handle)? != BlockType::T {
            return Err(KmuError::InvalidFormat(format!(
                "transaction handle must end in -T: {}",
                handle
            )));
        }
        Ok(Self {
            flavor: Flavor::Transaction {
                handle,
                admin_contact: admin_contact.into(),
            },
            blocks: Vec::new(),
            aliases: BTreeMap::new(),
        })
    }

    pub fn flavor(&self) -> &Flavor {
        &self.flavor
    }

    pub fn is_transaction(&self) -> bool {
        matches!(self.flavor, Flavor::Transaction { .. })
    }

    /// Version string for the container's flavor.
    pub fn version(&self) -> &'static str {
        match self.flavor {
            Flavor::Keystore => KEYSTORE_VERSION,
            Flavor::Transaction { .. } => TRANSACTION_VERSION,
        }
    }

    pub fn handle(&self) -> Option<&str> {
        match &self.flavor {
            Flavor::Keystore => None,
            Flavor::Transaction { handle, .. } => Some(handle),
        }
    }

    pub fn admin_contact(&self) -> Option<&str> {
        match &self.flavor {
            Flavor::Keystore => None,
            Flavor::Transaction { admin_contact, .. } => Some(admin_contact),
        }
    }

    fn check_admissible(&self, block: &Block) -> KmuResult<()> {
        if self.is_transaction() && block.block_type().is_private() {
            warn!(
                subsystem = subsystem::CONTAINER,
                op = "add_block",
                block = block.name(),
                "Rejected private key block in transaction container"
            );
            return Err(KmuError::IllegalBlockTypeForExport(block.name().to_string()));
        }
        Ok(())
    }

    /// Insert a block, replacing any block of the same name in place.
    pub fn add_block(&mut self, block: Block) -> KmuResult<&mut Self> {
        self.check_admissible(&block)?;
        match self.position(block.name()) {
            Some(index) => self.blocks[index] = block,
            None => self.blocks.push(block),
        }
        Ok(self)
    }

    /// Insert blocks in iteration order.
    pub fn add_blocks<I>(&mut self, blocks: I) -> KmuResult<&mut Self>
    where
        I: IntoIterator<Item = Block>,
    {
        for block in blocks {
            self.add_block(block)?;
        }
        Ok(self)
    }

    /// Swap the block named `old_name` for `block`, keeping its position.
    ///
    /// Used when a block changes type and therefore name.
    pub fn replace_block(&mut self, old_name: &str, block: Block) -> KmuResult<()> {
        self.check_admissible(&block)?;
        let index = self
            .position(old_name)
            .ok_or_else(|| KmuError::InvalidFormat(format!("no block named {}", old_name)))?;
        if block.name() != old_name && self.position(block.name()).is_some() {
            return Err(KmuError::InvalidFormat(format!(
                "block {} already present",
                block.name()
            )));
        }
        self.blocks[index] = block;
        Ok(())
    }

    pub fn remove_block(&mut self, name: &str) -> Option<Block> {
        let index = self.position(name)?;
        Some(self.blocks.remove(index))
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.blocks.iter().position(|b| b.name() == name)
    }

    pub fn get(&self, name: &str) -> Option<&Block> {
        self.blocks.iter().find(|b| b.name() == name)
    }

    /// Set one entry on a named block. Does nothing and returns `false` if the block is absent.
    pub fn update_entry(
        &mut self,
        block_name: &str,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> bool {
        match self.blocks.iter_mut().find(|b| b.name() == block_name) {
            Some(block) => {
                block.put(key, value);
                true
            }
            None => {
                debug!(block = block_name, "update_entry on absent block ignored");
                false
            }
        }
    }

    /// Remove one entry from a named block; `None` if either is absent.
    pub fn remove_entry(&mut self, block_name: &str, key: &str) -> Option<String> {
        self.blocks
            .iter_mut()
            .find(|b| b.name() == block_name)
            .and_then(|b| b.remove(key))
    }

    /// First block of the given type in container order.
    pub fn find_first(&self, kind: BlockType) -> Option<&Block> {
        self.blocks.iter().find(|b| b.block_type() == kind)
    }

    /// All blocks of the given type in container order.
    pub fn find_all(&self, kind: BlockType) -> impl Iterator<Item = &Block> {
        self.blocks.iter().filter(move |b| b.block_type() == kind)
    }

    /// Blocks in insertion order.
    pub fn blocks(&self) -> impl Iterator<Item = &Block> {
        self.blocks.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.blocks.iter().map(|b| b.name())
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Combine with `other`; blocks already present here win.
    pub fn merge(mut self, other: &Kmu) -> KmuResult<Self> {
        for block in other.blocks() {
            if self.position(block.name()).is_none() {
                self.add_block(block.clone())?;
            }
        }
        for (alias, target) in &other.aliases {
            self.aliases
                .entry(alias.clone())
                .or_insert_with(|| target.clone());
        }
        Ok(self)
    }

    fn first_key(&self, kind: BlockType, usage: KeyUsage) -> Option<&Block> {
        let found = self
            .find_all(kind)
            .find(|b| b.key_usage() == Some(usage));
        debug!(
            kind = %kind,
            usage = %usage,
            found = found.map(|b| b.name()).unwrap_or("(none)"),
            "Key lookup"
        );
        found
    }

    /// First open signing key.
    pub fn signing_key(&self) -> Option<&Block> {
        self.first_key(BlockType::U, KeyUsage::Signing)
    }

    /// First open boxing key.
    pub fn boxing_key(&self) -> Option<&Block> {
        self.first_key(BlockType::U, KeyUsage::Boxing)
    }

    /// First open secret-box key.
    pub fn secret_box_key(&self) -> Option<&Block> {
        self.first_key(BlockType::U, KeyUsage::SecretBox)
    }

    /// First published signing key.
    pub fn signing_pub_key(&self) -> Option<&Block> {
        self.first_key(BlockType::P, KeyUsage::Signing)
    }

    /// First published boxing key.
    pub fn boxing_pub_key(&self) -> Option<&Block> {
        self.first_key(BlockType::P, KeyUsage::Boxing)
    }

    /// Map a short alias to a block name.
    pub fn set_alias(&mut self, alias: impl Into<String>, name: impl Into<String>) {
        self.aliases.insert(alias.into(), name.into());
    }

    /// Block behind an alias.
    pub fn get_by_alias(&self, alias: &str) -> Option<&Block> {
        self.aliases.get(alias).and_then(|name| self.get(name))
    }

    pub fn aliases(&self) -> impl Iterator<Item = (&str, &str)> {
        self.aliases.iter().map(|(a, n)| (a.as_str(), n.as_str()))
    }

    /// Fail if the container may not be written out as-is.
    pub fn validate_for_export(&self) -> KmuResult<()> {
        if self.is_transaction() {
            if let Some(block) = self.blocks.iter().find(|b| b.block_type().is_private()) {
                return Err(KmuError::IllegalBlockTypeForExport(block.name().to_string()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data(handle: &str) -> Block {
        Block::with_handle(handle, BlockType::D).with("k", handle)
    }

    fn key(handle: &str, kind: BlockType, usage: &str) -> Block {
        Block::with_handle(handle, kind).with("KeyUsage", usage)
    }

    #[test]
    fn test_flavors() {
        let ks = Kmu::keystore();
        assert_eq!(ks.version(), KEYSTORE_VERSION);
        assert_eq!(ks.handle(), None);

        let tx = Kmu::transaction("admin@example.com");
        assert_eq!(tx.version(), TRANSACTION_VERSION);
        assert!(tx.handle().unwrap().ends_with("-T"));
        assert_eq!(tx.admin_contact(), Some("admin@example.com"));
    }

    #[test]
    fn test_transaction_handle_must_end_in_t() {
        assert!(Kmu::transaction_with_handle("abc-T", "a").is_ok());
        assert!(Kmu::transaction_with_handle("abc-D", "a").is_err());
    }

    #[test]
    fn test_add_block_last_write_wins_in_place() {
        let mut kmu = Kmu::keystore();
        kmu.add_block(data("a"))
            .unwrap()
            .add_block(data("b"))
            .unwrap()
            .add_block(Block::with_handle("a", BlockType::D).with("k", "replaced"))
            .unwrap();

        let names: Vec<_> = kmu.names().collect();
        assert_eq!(names, ["a-D", "b-D"]);
        assert_eq!(kmu.get("a-D").unwrap().get("k"), Some("replaced"));
    }

    #[test]
    fn test_transaction_rejects_private_blocks() {
        let mut tx = Kmu::transaction("admin@example.com");
        for kind in [BlockType::U, BlockType::X] {
            let result = tx.add_block(Block::with_handle("k", kind));
            assert!(matches!(
                result,
                Err(KmuError::IllegalBlockTypeForExport(_))
            ));
        }
        assert!(tx.is_empty());
        assert!(tx.validate_for_export().is_ok());
    }

    #[test]
    fn test_keystore_accepts_private_blocks() {
        let mut ks = Kmu::keystore();
        ks.add_block(Block::with_handle("k", BlockType::U)).unwrap();
        ks.add_block(Block::with_handle("j", BlockType::X)).unwrap();
        assert!(ks.validate_for_export().is_ok());
    }

    #[test]
    fn test_update_and_remove_entry_on_absent_block_are_noops() {
        let mut kmu = Kmu::keystore();
        kmu.add_block(data("a")).unwrap();

        assert!(!kmu.update_entry("missing-D", "k", "v"));
        assert_eq!(kmu.remove_entry("missing-D", "k"), None);

        assert!(kmu.update_entry("a-D", "k2", "v2"));
        assert_eq!(kmu.remove_entry("a-D", "k"), Some("a".to_string()));
        let keys: Vec<_> = kmu.get("a-D").unwrap().keys().collect();
        assert_eq!(keys, ["k2"]);
    }

    #[test]
    fn test_find_first_in_order() {
        let mut kmu = Kmu::keystore();
        kmu.add_blocks([data("x"), data("y")]).unwrap();
        assert_eq!(kmu.find_first(BlockType::D).unwrap().name(), "x-D");
        assert!(kmu.find_first(BlockType::S).is_none());
    }

    #[test]
    fn test_merge_first_wins() {
        let mut left = Kmu::keystore();
        left.add_block(Block::with_handle("a", BlockType::D).with("k", "left"))
            .unwrap();

        let mut right = Kmu::keystore();
        right
            .add_blocks([
                Block::with_handle("a", BlockType::D).with("k", "right"),
                data("b"),
            ])
            .unwrap();

        let merged = left.merge(&right).unwrap();
        assert_eq!(merged.len(), 2);
        assert_eq!(merged.get("a-D").unwrap().get("k"), Some("left"));
        assert!(merged.get("b-D").is_some());
    }

    #[test]
    fn test_merge_into_transaction_still_guarded() {
        let tx = Kmu::transaction("admin@example.com");
        let mut ks = Kmu::keystore();
        ks.add_block(Block::with_handle("k", BlockType::U)).unwrap();

        assert!(tx.merge(&ks).is_err());
    }

    #[test]
    fn test_key_lookups_by_usage() {
        let mut kmu = Kmu::keystore();
        kmu.add_blocks([
            key("b1", BlockType::U, "Boxing"),
            key("s1", BlockType::U, "Signing"),
            key("s2", BlockType::U, "Signing"),
            key("p1", BlockType::P, "Boxing"),
            key("p2", BlockType::P, "Signing"),
        ])
        .unwrap();

        assert_eq!(kmu.signing_key().unwrap().name(), "s1-U");
        assert_eq!(kmu.boxing_key().unwrap().name(), "b1-U");
        assert_eq!(kmu.boxing_pub_key().unwrap().name(), "p1-P");
        assert_eq!(kmu.signing_pub_key().unwrap().name(), "p2-P");
        assert!(kmu.secret_box_key().is_none());
    }

    #[test]
    fn test_replace_block_keeps_position() {
        let mut kmu = Kmu::keystore();
        kmu.add_blocks([data("a"), Block::with_handle("k", BlockType::U), data("z")])
            .unwrap();

        let renamed = kmu.get("k-U").unwrap().clone().retyped(BlockType::X);
        kmu.replace_block("k-U", renamed).unwrap();

        let names: Vec<_> = kmu.names().collect();
        assert_eq!(names, ["a-D", "k-X", "z-D"]);
    }

    #[test]
    fn test_aliases() {
        let mut kmu = Kmu::keystore();
        kmu.add_block(data("a")).unwrap();
        kmu.set_alias("main", "a-D");

        assert_eq!(kmu.get_by_alias("main").unwrap().name(), "a-D");
        assert!(kmu.get_by_alias("other").is_none());
    }
}
