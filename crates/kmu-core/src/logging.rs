//! Structured logging schema for kmu.
//!
//! Every event carries a `subsystem` field whose value comes from
//! [`subsystem`], so log aggregation can filter the library and the
//! command-line tool the same way.
//!
//! ## Field Names
//!
//! | Field | Meaning |
//! |-------|---------|
//! | `subsystem` | Originating subsystem, one of [`subsystem`] |
//! | `op` | Logical operation (`sign`, `verify`, `protect`, `open`, `read`, `write`) |
//! | `block` | Block name being operated on |
//! | `signature` | Signature block name |
//! | `signed_with` | Handle of the signing key |
//! | `key_block` | Public key block chosen to verify a signature |
//! | `digest_alg` | Digest algorithm tag |
//! | `block_count` / `token_count` | Sizes of the operation |
//! | `duration_ms` | Wall-clock duration in milliseconds |
//! | `error` | Error message when an operation fails |
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Command failed, nothing written |
//! | WARN  | Input rejected (bad signature, illegal block, wrong password) |
//! | INFO  | Operation completions (signed, verified, protected, opened, written) |
//! | DEBUG | Decision points, digest choice, key lookups, config choices |
//! | TRACE | Per-block and per-token iteration |
//!
//! Secret values (key bytes, passwords, PBE strings) are never logged.

/// Values of the `subsystem` field.
pub mod subsystem {
    pub const CONTAINER: &str = "container";
    pub const SIGNATURE: &str = "signature";
    pub const PROTECT: &str = "protect";
    pub const ENVELOPE: &str = "envelope";
    pub const FORMAT: &str = "format";
    pub const CLI: &str = "cli";
}

#[cfg(test)]
mod tests {
    use super::subsystem;

    #[test]
    fn test_subsystem_values_distinct() {
        let all = [
            subsystem::CONTAINER,
            subsystem::SIGNATURE,
            subsystem::PROTECT,
            subsystem::ENVELOPE,
            subsystem::FORMAT,
            subsystem::CLI,
        ];
        let unique: std::collections::HashSet<_> = all.iter().collect();
        assert_eq!(unique.len(), all.len());
    }
}
