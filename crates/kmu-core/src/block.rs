//! Blocks: named, typed, insertion-ordered string maps.
//!
//! A block name is `<handle>-<Letter>`. The handle is immutable; changing a
//! block's type yields a new name built from that handle and the new letter.

use std::collections::HashMap;
use std::fmt;

use rand::{CryptoRng, RngCore};

use crate::error::{KmuError, KmuResult};
use crate::handle::Handle;
use crate::key::KeyUsage;

/// Block type, carried as the trailing letter of the block name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockType {
    /// Ephemeral key-agreement material.
    A,
    /// Contact information.
    C,
    /// Arbitrary data.
    D,
    /// Encrypted payload envelope.
    E,
    /// Public key for publication.
    P,
    /// Open (unprotected) private or secret key.
    U,
    /// Password-protected private or secret key.
    X,
    /// Signature.
    S,
    /// Transaction marker.
    T,
}

impl BlockType {
    pub const ALL: [BlockType; 9] = [
        Self::A,
        Self::C,
        Self::D,
        Self::E,
        Self::P,
        Self::U,
        Self::X,
        Self::S,
        Self::T,
    ];

    pub fn letter(&self) -> char {
        match self {
            Self::A => 'A',
            Self::C => 'C',
            Self::D => 'D',
            Self::E => 'E',
            Self::P => 'P',
            Self::U => 'U',
            Self::X => 'X',
            Self::S => 'S',
            Self::T => 'T',
        }
    }

    pub fn from_letter(letter: char) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.letter() == letter)
    }

    /// Type of a block name.
    pub fn of(name: &str) -> KmuResult<Self> {
        split_name(name).map(|(_, kind)| kind)
    }

    /// True for U and X, the types barred from transaction containers.
    pub fn is_private(&self) -> bool {
        matches!(self, Self::U | Self::X)
    }
}

impl fmt::Display for BlockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

fn split_name(name: &str) -> KmuResult<(&str, BlockType)> {
    let (base, suffix) = name
        .rsplit_once('-')
        .ok_or_else(|| KmuError::UnknownBlockType(name.to_string()))?;

    let mut chars = suffix.chars();
    let kind = match (chars.next(), chars.next()) {
        (Some(letter), None) => BlockType::from_letter(letter),
        _ => None,
    }
    .ok_or_else(|| KmuError::UnknownBlockType(name.to_string()))?;

    if base.is_empty() {
        return Err(KmuError::UnknownBlockType(name.to_string()));
    }
    Ok((base, kind))
}

/// An ordered string map with a typed name.
///
/// Re-inserting an existing key replaces its value in place; order is the
/// order of first insertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    name: String,
    kind: BlockType,
    entries: Vec<(String, String)>,
}

impl Block {
    /// Empty block with a fresh random handle.
    pub fn new(kind: BlockType) -> Self {
        Self::with_handle(Handle::generate(), kind)
    }

    /// Empty block with a handle drawn from `rng`.
    pub fn new_with_rng<R: RngCore + CryptoRng>(kind: BlockType, rng: &mut R) -> Self {
        Self::with_handle(Handle::random(rng), kind)
    }

    /// Empty block named `<handle>-<Letter>`.
    pub fn with_handle(handle: impl Into<Handle>, kind: BlockType) -> Self {
        let handle = handle.into();
        Self {
            name: format!("{}-{}", handle, kind.letter()),
            kind,
            entries: Vec::new(),
        }
    }

    /// Empty block from a full name; fails with `UnknownBlockType`.
    pub fn from_name(name: &str) -> KmuResult<Self> {
        let (_, kind) = split_name(name)?;
        Ok(Self {
            name: name.to_string(),
            kind,
            entries: Vec::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn block_type(&self) -> BlockType {
        self.kind
    }

    /// The name with its `-<Letter>` suffix removed.
    pub fn base_handle(&self) -> &str {
        &self.name[..self.name.len() - 2]
    }

    /// Same handle and entries under a new type.
    pub fn retyped(mut self, kind: BlockType) -> Self {
        self.name = format!("{}-{}", self.base_handle(), kind.letter());
        self.kind = kind;
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Entry value or `MissingEntry`.
    pub fn require(&self, key: &str) -> KmuResult<&str> {
        self.get(key)
            .ok_or_else(|| KmuError::missing_entry(&self.name, key))
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    /// Insert or replace; returns the previous value.
    pub fn put(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => Some(std::mem::replace(existing, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    /// Builder form of [`Block::put`].
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.put(key, value);
        self
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        let index = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(index).1)
    }

    /// Entries in insertion order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_protected(&self) -> bool {
        self.kind == BlockType::X
    }

    pub fn is_open(&self) -> bool {
        self.kind == BlockType::U
    }

    pub fn is_publication(&self) -> bool {
        self.kind == BlockType::P
    }

    pub fn is_signature(&self) -> bool {
        self.kind == BlockType::S
    }

    /// `KeyUsage` entry, when present and recognised.
    pub fn key_usage(&self) -> Option<KeyUsage> {
        self.get("KeyUsage").and_then(|v| v.parse().ok())
    }

    /// Insert every entry as `<name>:<key> -> value`.
    pub fn load_into_scope(&self, scope: &mut HashMap<String, String>) {
        for (key, value) in &self.entries {
            scope.insert(format!("{}:{}", self.name, key), value.clone());
        }
    }
}
