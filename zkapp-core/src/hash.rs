//! Domain-separated hashing over field elements
//!
//! Every commitment in this crate goes through the [`Hasher`] trait, so the
//! concrete hash function is a configuration choice. Prefix strings are
//! padded with `*` to 20 bytes and absorbed before the fields.

use crate::types::Field;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt::Debug;
use std::sync::Arc;

/// Width of a padded domain prefix
pub const PREFIX_LENGTH: usize = 20;

/// Domain prefixes
pub mod prefixes {
    /// Account-update tree node
    pub const ACCOUNT_UPDATE_NODE: &str = "MinaAcctUpdateNode";
    /// Forest cons cell
    pub const ACCOUNT_UPDATE_CONS: &str = "MinaAcctUpdateCons";
    /// Account-update body on mainnet
    pub const ZKAPP_BODY_MAINNET: &str = "MainnetZkappBody";
    /// Account-update body on testnet
    pub const ZKAPP_BODY_TESTNET: &str = "TestnetZkappBody";
    /// Single event or action item
    pub const EVENT: &str = "MinaZkappEvent";
    /// Events list cons
    pub const EVENTS: &str = "MinaZkappEvents";
    /// Empty events list
    pub const EVENTS_EMPTY: &str = "MinaZkappEventsEmpty";
    /// Actions list cons
    pub const ACTIONS: &str = "MinaZkappSeqEvents";
    /// Empty actions list
    pub const ACTIONS_EMPTY: &str = "MinaZkappActionEmpty";
    /// Custom token id derivation
    pub const DERIVE_TOKEN_ID: &str = "MinaDeriveTokenId";
    /// Transaction memo
    pub const MEMO: &str = "MinaZkappMemo";

    /// Every prefix above
    pub const ALL: [&str; 11] = [
        ACCOUNT_UPDATE_NODE,
        ACCOUNT_UPDATE_CONS,
        ZKAPP_BODY_MAINNET,
        ZKAPP_BODY_TESTNET,
        EVENT,
        EVENTS,
        EVENTS_EMPTY,
        ACTIONS,
        ACTIONS_EMPTY,
        DERIVE_TOKEN_ID,
        MEMO,
    ];
}

// padding must never cut a named prefix
const _: () = {
    let mut i = 0;
    while i < prefixes::ALL.len() {
        assert!(prefixes::ALL[i].len() <= PREFIX_LENGTH);
        i += 1;
    }
};

/// Hash function interface
pub trait Hasher: Send + Sync + Debug {
    /// Hash ordered fields under a domain prefix
    fn hash(&self, prefix: &str, fields: &[Field]) -> Field;

    /// Hash of the empty input under a domain prefix
    fn empty_hash(&self, prefix: &str) -> Field {
        self.hash(prefix, &[])
    }
}

/// Pad a prefix to [`PREFIX_LENGTH`] bytes with `*`
///
/// Longer ad-hoc prefixes are cut to [`PREFIX_LENGTH`] bytes; the named
/// [`prefixes`] all fit.
pub fn padded_prefix(prefix: &str) -> [u8; PREFIX_LENGTH] {
    let mut out = [b'*'; PREFIX_LENGTH];
    let bytes = prefix.as_bytes();
    let n = bytes.len().min(PREFIX_LENGTH);
    out[..n].copy_from_slice(&bytes[..n]);
    out
}

/// SHA-256 hasher
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256Hasher;

impl Hasher for Sha256Hasher {
    fn hash(&self, prefix: &str, fields: &[Field]) -> Field {
        let mut hasher = Sha256::new();
        hasher.update(padded_prefix(prefix));
        for field in fields {
            hasher.update(field.as_bytes());
        }
        Field::from_bytes(hasher.finalize().into())
    }
}

/// BLAKE3 hasher
#[derive(Debug, Clone, Copy, Default)]
pub struct Blake3Hasher;

impl Hasher for Blake3Hasher {
    fn hash(&self, prefix: &str, fields: &[Field]) -> Field {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&padded_prefix(prefix));
        for field in fields {
            hasher.update(field.as_bytes());
        }
        Field::from_bytes(*hasher.finalize().as_bytes())
    }
}

/// Hash function selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HasherKind {
    /// SHA-256
    #[default]
    Sha256,
    /// BLAKE3
    Blake3,
}

impl HasherKind {
    /// Instantiate the selected hasher
    pub fn build(self) -> Arc<dyn Hasher> {
        match self {
            HasherKind::Sha256 => Arc::new(Sha256Hasher),
            HasherKind::Blake3 => Arc::new(Blake3Hasher),
        }
    }
}

impl std::str::FromStr for HasherKind {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "sha256" => Ok(HasherKind::Sha256),
            "blake3" => Ok(HasherKind::Blake3),
            other => Err(crate::Error::Config(format!("unknown hasher: {}", other))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_padded_prefix() {
        assert_eq!(&padded_prefix("MinaZkappEvent"), b"MinaZkappEvent******");
        assert_eq!(&padded_prefix(prefixes::ZKAPP_BODY_MAINNET), b"MainnetZkappBody****");
        assert_eq!(&padded_prefix(prefixes::ACTIONS_EMPTY), b"MinaZkappActionEmpty");
    }

    #[test]
    fn test_named_prefixes_survive_padding() {
        let mut seen = std::collections::HashSet::new();
        for prefix in prefixes::ALL {
            let padded = padded_prefix(prefix);
            assert!(prefix.len() <= PREFIX_LENGTH, "{} is too long", prefix);
            assert!(padded.starts_with(prefix.as_bytes()));
            assert!(seen.insert(padded), "{} collides after padding", prefix);
        }
    }

    #[test]
    fn test_domain_separation() {
        let h = Sha256Hasher;
        let fields = [Field::from_u64(1), Field::from_u64(2)];
        assert_ne!(
            h.hash(prefixes::EVENTS, &fields),
            h.hash(prefixes::ACTIONS, &fields)
        );
        assert_ne!(
            h.empty_hash(prefixes::EVENTS_EMPTY),
            h.empty_hash(prefixes::ACTIONS_EMPTY)
        );
    }

    #[test]
    fn test_order_sensitive() {
        for h in [HasherKind::Sha256.build(), HasherKind::Blake3.build()] {
            let a = h.hash("p", &[Field::from_u64(1), Field::from_u64(2)]);
            let b = h.hash("p", &[Field::from_u64(2), Field::from_u64(1)]);
            assert_ne!(a, b);
        }
    }

    #[test]
    fn test_hasher_kind_parse() {
        assert_eq!("BLAKE3".parse::<HasherKind>().unwrap(), HasherKind::Blake3);
        assert!("md5".parse::<HasherKind>().is_err());
    }
}
