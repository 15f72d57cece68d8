//! Core value types for the zkApp state-transition engine
//!
//! All types are designed for:
//! - Deterministic serialization (serde, hex-encoded field elements)
//! - Structural equality (identities compare by value)
//! - Checked arithmetic (no silent wrap-around on amounts)

use crate::hash::{prefixes, Hasher};
use crate::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Number of field elements in an account's zkApp state
pub const MAX_ZKAPP_STATE_FIELDS: usize = 8;

/// Number of checkpoints retained in the action-state ring buffer
pub const ACTION_STATE_LENGTH: usize = 5;

/// Fee charged for creating a new account (1 MINA in nanomina)
pub const DEFAULT_ACCOUNT_CREATION_FEE: u64 = 1_000_000_000;

/// Maximum token symbol length in bytes
pub const MAX_TOKEN_SYMBOL_LENGTH: usize = 6;

/// Opaque 32-byte field element
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Field([u8; 32]);

impl Field {
    /// The zero element
    pub const ZERO: Field = Field([0u8; 32]);

    /// Create from raw bytes
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Embed an unsigned integer (big-endian, low bytes)
    pub fn from_u64(value: u64) -> Self {
        let mut bytes = [0u8; 32];
        bytes[24..].copy_from_slice(&value.to_be_bytes());
        Self(bytes)
    }

    /// Embed a boolean as 0 or 1
    pub fn from_bool(value: bool) -> Self {
        Self::from_u64(value as u64)
    }

    /// Get raw bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Interpret as u64 if the element fits
    pub fn to_u64(&self) -> Option<u64> {
        if self.0[..24].iter().any(|b| *b != 0) {
            return None;
        }
        let mut low = [0u8; 8];
        low.copy_from_slice(&self.0[24..]);
        Some(u64::from_be_bytes(low))
    }

    /// Interpret as bool if the element is 0 or 1
    pub fn to_bool(&self) -> Option<bool> {
        match self.to_u64() {
            Some(0) => Some(false),
            Some(1) => Some(true),
            _ => None,
        }
    }

    /// Hex encoding
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from hex (64 characters)
    pub fn from_hex(s: &str) -> Result<Self> {
        let bytes = hex::decode(s)
            .map_err(|e| Error::Codec(format!("invalid field hex: {}", e)))?;
        let bytes: [u8; 32] = bytes
            .try_into()
            .map_err(|_| Error::Codec("field must be 32 bytes".to_string()))?;
        Ok(Self(bytes))
    }
}

impl From<u64> for Field {
    fn from(value: u64) -> Self {
        Self::from_u64(value)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_u64() {
            Some(v) => write!(f, "{}", v),
            None => write!(f, "0x{}", self.to_hex()),
        }
    }
}

impl Serialize for Field {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Field {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Field::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Ed25519 public key bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct PublicKey(Field);

impl PublicKey {
    /// The all-zero key, standing for "no key"
    pub fn empty() -> Self {
        Self(Field::ZERO)
    }

    /// Create from verifying-key bytes
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(Field::from_bytes(bytes))
    }

    /// Get raw bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        self.0.as_bytes()
    }

    /// Packed field representation
    pub fn to_field(&self) -> Field {
        self.0
    }

    /// Check whether this is the empty key
    pub fn is_empty(&self) -> bool {
        self.0 == Field::ZERO
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hex = self.0.to_hex();
        write!(f, "{}..{}", &hex[..8], &hex[56..])
    }
}

/// Token namespace identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TokenId(pub Field);

impl TokenId {
    /// The native token
    pub const MINA: TokenId = TokenId(Field::from_bytes([
        0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
        0, 1,
    ]));

    /// Derive the custom token id owned by `owner`
    pub fn derive(owner: &AccountId, hasher: &dyn Hasher) -> Self {
        TokenId(hasher.hash(
            prefixes::DERIVE_TOKEN_ID,
            &[owner.public_key.to_field(), owner.token_id.0],
        ))
    }
}

impl Default for TokenId {
    fn default() -> Self {
        TokenId::MINA
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == TokenId::MINA {
            write!(f, "MINA")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

/// Account identity: (public key, token id)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AccountId {
    /// Owner public key
    pub public_key: PublicKey,
    /// Token namespace
    pub token_id: TokenId,
}

impl AccountId {
    /// Create new account ID
    pub fn new(public_key: PublicKey, token_id: TokenId) -> Self {
        Self {
            public_key,
            token_id,
        }
    }

    /// Account ID in the native token
    pub fn mina(public_key: PublicKey) -> Self {
        Self::new(public_key, TokenId::MINA)
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.public_key, self.token_id)
    }
}

/// Token symbol (at most 6 bytes)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TokenSymbol(String);

impl TokenSymbol {
    /// Create a validated symbol
    pub fn new(symbol: impl Into<String>) -> Result<Self> {
        let symbol = symbol.into();
        if symbol.len() > MAX_TOKEN_SYMBOL_LENGTH {
            return Err(Error::InvalidInput(format!(
                "token symbol {:?} exceeds {} bytes",
                symbol, MAX_TOKEN_SYMBOL_LENGTH
            )));
        }
        Ok(Self(symbol))
    }

    /// Get as string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Packed field representation
    pub fn to_field(&self) -> Field {
        let mut bytes = [0u8; 32];
        bytes[..self.0.len()].copy_from_slice(self.0.as_bytes());
        Field::from_bytes(bytes)
    }
}

impl TryFrom<String> for TokenSymbol {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<TokenSymbol> for String {
    fn from(symbol: TokenSymbol) -> Self {
        symbol.0
    }
}

impl fmt::Display for TokenSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// zkApp URI
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ZkappUri(String);

impl ZkappUri {
    /// Create a URI
    pub fn new(uri: impl Into<String>) -> Self {
        Self(uri.into())
    }

    /// Get as string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Packed field representation (digest of the bytes)
    pub fn to_field(&self) -> Field {
        Field::from_bytes(crate::crypto::hash_bytes(self.0.as_bytes()))
    }
}

impl fmt::Display for ZkappUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Sign of a signed amount
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sign {
    /// Non-negative
    Positive,
    /// Negative
    Negative,
}

/// Signed 64-bit magnitude with explicit sign, range ±(2^64−1)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "RawSignedAmount")]
pub struct SignedAmount {
    /// Absolute value
    pub magnitude: u64,
    /// Sign
    pub sign: Sign,
}

/// Wire form of [`SignedAmount`], before negative zero is normalized
#[derive(Deserialize)]
struct RawSignedAmount {
    magnitude: u64,
    sign: Sign,
}

impl From<RawSignedAmount> for SignedAmount {
    fn from(raw: RawSignedAmount) -> Self {
        match raw.sign {
            Sign::Positive => SignedAmount::positive(raw.magnitude),
            Sign::Negative => SignedAmount::negative(raw.magnitude),
        }
    }
}

impl SignedAmount {
    /// Zero
    pub const ZERO: SignedAmount = SignedAmount {
        magnitude: 0,
        sign: Sign::Positive,
    };

    /// Positive amount
    pub fn positive(magnitude: u64) -> Self {
        Self {
            magnitude,
            sign: Sign::Positive,
        }
    }

    /// Negative amount (negative zero normalizes to zero)
    pub fn negative(magnitude: u64) -> Self {
        if magnitude == 0 {
            return Self::ZERO;
        }
        Self {
            magnitude,
            sign: Sign::Negative,
        }
    }

    /// Strictly below zero
    pub fn is_negative(&self) -> bool {
        self.sign == Sign::Negative && self.magnitude > 0
    }

    /// Strictly above zero
    pub fn is_positive(&self) -> bool {
        self.sign == Sign::Positive && self.magnitude > 0
    }

    /// Exactly zero
    pub fn is_zero(&self) -> bool {
        self.magnitude == 0
    }

    /// Flip the sign
    pub fn negate(self) -> Self {
        match self.sign {
            Sign::Positive => Self::negative(self.magnitude),
            Sign::Negative => Self::positive(self.magnitude),
        }
    }

    /// Widen to i128
    pub fn to_i128(self) -> i128 {
        match self.sign {
            Sign::Positive => self.magnitude as i128,
            Sign::Negative => -(self.magnitude as i128),
        }
    }

    /// Narrow from i128, `None` when outside ±(2^64−1)
    pub fn from_i128(value: i128) -> Option<Self> {
        let magnitude = u64::try_from(value.unsigned_abs()).ok()?;
        Some(if value < 0 {
            Self::negative(magnitude)
        } else {
            Self::positive(magnitude)
        })
    }

    /// Checked addition, `None` when the result is not representable
    pub fn checked_add(self, other: SignedAmount) -> Option<Self> {
        Self::from_i128(self.to_i128() + other.to_i128())
    }

    /// Packed field representation: magnitude then sign
    pub fn to_fields(&self) -> [Field; 2] {
        [
            Field::from_u64(self.magnitude),
            Field::from_bool(self.sign == Sign::Negative),
        ]
    }
}

impl Default for SignedAmount {
    fn default() -> Self {
        Self::ZERO
    }
}

impl fmt::Display for SignedAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_negative() {
            write!(f, "-{}", self.magnitude)
        } else {
            write!(f, "{}", self.magnitude)
        }
    }
}

/// Ed25519 signature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    #[serde(with = "serde_bytes")]
    bytes: [u8; 64],
}

impl Signature {
    /// Create from bytes
    pub fn from_bytes(bytes: [u8; 64]) -> Self {
        Self { bytes }
    }

    /// Get bytes
    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.bytes
    }
}

/// Opaque reference to a proof produced by an external prover
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProofRef(pub Field);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_u64_roundtrip() {
        let f = Field::from_u64(42);
        assert_eq!(f.to_u64(), Some(42));
        assert_eq!(Field::from_bool(true).to_bool(), Some(true));
        assert_eq!(Field::from_u64(7).to_bool(), None);
    }

    #[test]
    fn test_field_hex_serde() {
        let f = Field::from_u64(255);
        let json = serde_json::to_string(&f).unwrap();
        assert!(json.ends_with("ff\""));
        let back: Field = serde_json::from_str(&json).unwrap();
        assert_eq!(back, f);
    }

    #[test]
    fn test_field_rejects_short_hex() {
        assert!(Field::from_hex("abcd").is_err());
    }

    #[test]
    fn test_mina_token_id() {
        assert_eq!(TokenId::MINA.0, Field::from_u64(1));
        assert_eq!(TokenId::default(), TokenId::MINA);
    }

    #[test]
    fn test_derived_token_id_depends_on_owner() {
        let hasher = crate::hash::Sha256Hasher;
        let a = AccountId::mina(PublicKey::from_bytes([1u8; 32]));
        let b = AccountId::mina(PublicKey::from_bytes([2u8; 32]));
        let token = TokenId::derive(&a, &hasher);
        assert_ne!(token, TokenId::MINA);
        assert_eq!(token, TokenId::derive(&a, &hasher));
        assert_ne!(token, TokenId::derive(&b, &hasher));
    }

    #[test]
    fn test_signed_amount_checked_add() {
        let a = SignedAmount::positive(10);
        let b = SignedAmount::negative(15);
        assert_eq!(a.checked_add(b), Some(SignedAmount::negative(5)));
        assert_eq!(
            SignedAmount::positive(u64::MAX).checked_add(SignedAmount::positive(1)),
            None
        );
        assert_eq!(
            SignedAmount::negative(u64::MAX).checked_add(SignedAmount::negative(1)),
            None
        );
        assert_eq!(
            SignedAmount::negative(u64::MAX).checked_add(SignedAmount::positive(u64::MAX)),
            Some(SignedAmount::ZERO)
        );
    }

    #[test]
    fn test_negative_zero_is_zero() {
        assert_eq!(SignedAmount::negative(0), SignedAmount::ZERO);
        assert!(!SignedAmount::negative(0).is_negative());
        assert_eq!(SignedAmount::ZERO.negate(), SignedAmount::ZERO);

        let parsed: SignedAmount =
            serde_json::from_str(r#"{"magnitude":0,"sign":"Negative"}"#).unwrap();
        assert_eq!(parsed, SignedAmount::ZERO);
        assert!(parsed.is_zero());
        let parsed: SignedAmount =
            serde_json::from_str(r#"{"magnitude":3,"sign":"Negative"}"#).unwrap();
        assert_eq!(parsed, SignedAmount::negative(3));
    }

    #[test]
    fn test_token_symbol_length() {
        assert!(TokenSymbol::new("MINA").is_ok());
        assert!(TokenSymbol::new("TOOLONG").is_err());
    }
}
