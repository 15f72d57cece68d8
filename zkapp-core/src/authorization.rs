//! Authorization levels, declared authorization kinds and account permissions

use serde::{Deserialize, Serialize};
use std::fmt;

/// Declared authorization on an account update: `{is_signed, is_proved}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct AuthorizationKind {
    /// Carries a signature
    pub is_signed: bool,
    /// Carries a proof
    pub is_proved: bool,
}

impl AuthorizationKind {
    /// Neither signed nor proved
    pub const NONE: AuthorizationKind = AuthorizationKind {
        is_signed: false,
        is_proved: false,
    };
    /// Signed only
    pub const SIGNATURE: AuthorizationKind = AuthorizationKind {
        is_signed: true,
        is_proved: false,
    };
    /// Proved only
    pub const PROOF: AuthorizationKind = AuthorizationKind {
        is_signed: false,
        is_proved: true,
    };
    /// Signed and proved
    pub const SIGNATURE_AND_PROOF: AuthorizationKind = AuthorizationKind {
        is_signed: true,
        is_proved: true,
    };

    /// Canonical identifier
    pub fn identifier(&self) -> &'static str {
        match (self.is_signed, self.is_proved) {
            (false, false) => "None",
            (true, false) => "Signature",
            (false, true) => "Proof",
            (true, true) => "SignatureAndProof",
        }
    }
}

impl fmt::Display for AuthorizationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.identifier())
    }
}

/// Required authorization for one permission aspect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AuthorizationLevel {
    /// Never satisfiable
    Impossible,
    /// No authorization needed
    None,
    /// A proof is required
    Proof,
    /// A signature is required
    Signature,
    /// Either a proof or a signature
    ProofOrSignature,
}

impl AuthorizationLevel {
    /// Whether the level can only be met with a proof
    pub fn requires_proof(&self) -> bool {
        matches!(self, AuthorizationLevel::Proof)
    }

    /// Whether the level can only be met with a signature
    pub fn requires_signature(&self) -> bool {
        matches!(self, AuthorizationLevel::Signature)
    }

    /// Whether a declared kind meets this level
    pub fn is_satisfied(&self, kind: AuthorizationKind) -> bool {
        match self {
            AuthorizationLevel::Impossible => false,
            AuthorizationLevel::None => true,
            AuthorizationLevel::ProofOrSignature => kind.is_proved || kind.is_signed,
            AuthorizationLevel::Proof | AuthorizationLevel::Signature => {
                (!self.requires_proof() || kind.is_proved)
                    && (!self.requires_signature() || kind.is_signed)
            }
        }
    }

    /// Packed `(constant, signature_necessary, signature_sufficient)` bits
    pub fn to_bits(&self) -> [bool; 3] {
        match self {
            AuthorizationLevel::Impossible => [true, true, false],
            AuthorizationLevel::None => [true, false, true],
            AuthorizationLevel::Proof => [false, false, false],
            AuthorizationLevel::Signature => [false, true, true],
            AuthorizationLevel::ProofOrSignature => [false, false, true],
        }
    }
}

impl fmt::Display for AuthorizationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AuthorizationLevel::Impossible => "Impossible",
            AuthorizationLevel::None => "None",
            AuthorizationLevel::Proof => "Proof",
            AuthorizationLevel::Signature => "Signature",
            AuthorizationLevel::ProofOrSignature => "Either",
        };
        write!(f, "{}", name)
    }
}

/// Account aspect guarded by a permission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PermissionAspect {
    /// Any use of the account
    Access,
    /// Decreasing the balance
    Send,
    /// Increasing the balance
    Receive,
    /// Bumping the nonce
    IncrementNonce,
    /// Changing the delegate
    SetDelegate,
    /// Changing permissions
    SetPermissions,
    /// Changing the verification key
    SetVerificationKey,
    /// Changing the zkApp URI
    SetZkappUri,
    /// Changing the token symbol
    SetTokenSymbol,
    /// Changing the voting target
    SetVotingFor,
    /// Changing the vesting schedule
    SetTiming,
    /// Pushing actions
    EditActionState,
    /// Writing zkApp state
    EditState,
}

impl fmt::Display for PermissionAspect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PermissionAspect::Access => "access",
            PermissionAspect::Send => "send",
            PermissionAspect::Receive => "receive",
            PermissionAspect::IncrementNonce => "incrementNonce",
            PermissionAspect::SetDelegate => "setDelegate",
            PermissionAspect::SetPermissions => "setPermissions",
            PermissionAspect::SetVerificationKey => "setVerificationKey",
            PermissionAspect::SetZkappUri => "setZkappUri",
            PermissionAspect::SetTokenSymbol => "setTokenSymbol",
            PermissionAspect::SetVotingFor => "setVotingFor",
            PermissionAspect::SetTiming => "setTiming",
            PermissionAspect::EditActionState => "editActionState",
            PermissionAspect::EditState => "editState",
        };
        write!(f, "{}", name)
    }
}

/// Verification-key permission, tied to the protocol version it was set under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VerificationKeyPermission {
    /// Required level
    pub auth: AuthorizationLevel,
    /// Transaction version the permission was set under
    pub txn_version: u32,
}

/// Current transaction version
pub const TXN_VERSION_CURRENT: u32 = 3;

/// Required authorization per account aspect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Permissions {
    /// Any use of the account
    pub access: AuthorizationLevel,
    /// Negative balance change
    pub send: AuthorizationLevel,
    /// Positive balance change
    pub receive: AuthorizationLevel,
    /// Nonce increment
    pub increment_nonce: AuthorizationLevel,
    /// Delegate update
    pub set_delegate: AuthorizationLevel,
    /// Permissions update
    pub set_permissions: AuthorizationLevel,
    /// Verification key update
    pub set_verification_key: VerificationKeyPermission,
    /// zkApp URI update
    pub set_zkapp_uri: AuthorizationLevel,
    /// Token symbol update
    pub set_token_symbol: AuthorizationLevel,
    /// Voting target update
    pub set_voting_for: AuthorizationLevel,
    /// Timing update
    pub set_timing: AuthorizationLevel,
    /// Action pushes
    pub edit_action_state: AuthorizationLevel,
    /// State writes
    pub edit_state: AuthorizationLevel,
}

impl Permissions {
    /// Defaults for a freshly created account
    ///
    /// Sends and state/action edits need a proof; account settings need a
    /// signature. Nonce increments accept either.
    pub fn defaults() -> Self {
        use AuthorizationLevel::*;
        Self {
            access: None,
            send: Proof,
            receive: None,
            increment_nonce: ProofOrSignature,
            set_delegate: Signature,
            set_permissions: Signature,
            set_verification_key: VerificationKeyPermission {
                auth: Signature,
                txn_version: TXN_VERSION_CURRENT,
            },
            set_zkapp_uri: Signature,
            set_token_symbol: Signature,
            set_voting_for: Signature,
            set_timing: Signature,
            edit_action_state: Proof,
            edit_state: Proof,
        }
    }

    /// Permissions of a plain signature-controlled account
    pub fn initial() -> Self {
        Self {
            access: AuthorizationLevel::None,
            receive: AuthorizationLevel::None,
            ..Self::uniform(AuthorizationLevel::Signature)
        }
    }

    /// Nothing required for anything
    pub fn dummy() -> Self {
        Self::uniform(AuthorizationLevel::None)
    }

    /// Everything forbidden
    pub fn all_impossible() -> Self {
        Self::uniform(AuthorizationLevel::Impossible)
    }

    /// Same level for every aspect
    pub fn uniform(level: AuthorizationLevel) -> Self {
        Self {
            access: level,
            send: level,
            receive: level,
            increment_nonce: level,
            set_delegate: level,
            set_permissions: level,
            set_verification_key: VerificationKeyPermission {
                auth: level,
                txn_version: TXN_VERSION_CURRENT,
            },
            set_zkapp_uri: level,
            set_token_symbol: level,
            set_voting_for: level,
            set_timing: level,
            edit_action_state: level,
            edit_state: level,
        }
    }

    /// Required level for an aspect
    pub fn required(&self, aspect: PermissionAspect) -> AuthorizationLevel {
        match aspect {
            PermissionAspect::Access => self.access,
            PermissionAspect::Send => self.send,
            PermissionAspect::Receive => self.receive,
            PermissionAspect::IncrementNonce => self.increment_nonce,
            PermissionAspect::SetDelegate => self.set_delegate,
            PermissionAspect::SetPermissions => self.set_permissions,
            PermissionAspect::SetVerificationKey => self.set_verification_key.auth,
            PermissionAspect::SetZkappUri => self.set_zkapp_uri,
            PermissionAspect::SetTokenSymbol => self.set_token_symbol,
            PermissionAspect::SetVotingFor => self.set_voting_for,
            PermissionAspect::SetTiming => self.set_timing,
            PermissionAspect::EditActionState => self.edit_action_state,
            PermissionAspect::EditState => self.edit_state,
        }
    }

    /// Packed field representation, three bits per aspect plus the vk version
    pub fn to_fields(&self) -> Vec<crate::types::Field> {
        use crate::types::Field;
        let levels = [
            self.edit_state,
            self.access,
            self.send,
            self.receive,
            self.set_delegate,
            self.set_permissions,
            self.set_verification_key.auth,
            self.set_zkapp_uri,
            self.edit_action_state,
            self.set_token_symbol,
            self.increment_nonce,
            self.set_voting_for,
            self.set_timing,
        ];
        let mut fields: Vec<Field> = levels
            .iter()
            .flat_map(|l| l.to_bits())
            .map(Field::from_bool)
            .collect();
        fields.push(Field::from_u64(self.set_verification_key.txn_version as u64));
        fields
    }
}

impl Default for Permissions {
    fn default() -> Self {
        Self::defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_KINDS: [AuthorizationKind; 4] = [
        AuthorizationKind::NONE,
        AuthorizationKind::SIGNATURE,
        AuthorizationKind::PROOF,
        AuthorizationKind::SIGNATURE_AND_PROOF,
    ];

    #[test]
    fn test_impossible_never_satisfied() {
        for kind in ALL_KINDS {
            assert!(!AuthorizationLevel::Impossible.is_satisfied(kind));
        }
    }

    #[test]
    fn test_none_always_satisfied() {
        for kind in ALL_KINDS {
            assert!(AuthorizationLevel::None.is_satisfied(kind));
        }
    }

    #[test]
    fn test_proof_and_signature_levels() {
        assert!(AuthorizationLevel::Proof.is_satisfied(AuthorizationKind::PROOF));
        assert!(AuthorizationLevel::Proof.is_satisfied(AuthorizationKind::SIGNATURE_AND_PROOF));
        assert!(!AuthorizationLevel::Proof.is_satisfied(AuthorizationKind::SIGNATURE));
        assert!(AuthorizationLevel::Signature.is_satisfied(AuthorizationKind::SIGNATURE));
        assert!(!AuthorizationLevel::Signature.is_satisfied(AuthorizationKind::PROOF));
    }

    #[test]
    fn test_either_level() {
        let either = AuthorizationLevel::ProofOrSignature;
        assert!(!either.is_satisfied(AuthorizationKind::NONE));
        assert!(either.is_satisfied(AuthorizationKind::SIGNATURE));
        assert!(either.is_satisfied(AuthorizationKind::PROOF));
        assert!(!either.requires_proof());
        assert!(!either.requires_signature());
    }

    #[test]
    fn test_kind_identifiers() {
        let ids: Vec<_> = ALL_KINDS.iter().map(|k| k.identifier()).collect();
        assert_eq!(ids, vec!["None", "Signature", "Proof", "SignatureAndProof"]);
    }

    #[test]
    fn test_default_permissions() {
        let p = Permissions::defaults();
        assert_eq!(p.required(PermissionAspect::EditState), AuthorizationLevel::Proof);
        assert_eq!(p.required(PermissionAspect::SetDelegate), AuthorizationLevel::Signature);
        assert_eq!(p.required(PermissionAspect::Receive), AuthorizationLevel::None);
        assert_eq!(p.to_fields().len(), 13 * 3 + 1);
    }

    #[test]
    fn test_initial_permissions() {
        let p = Permissions::initial();
        assert_eq!(p.required(PermissionAspect::Send), AuthorizationLevel::Signature);
        assert_eq!(p.required(PermissionAspect::Receive), AuthorizationLevel::None);
        assert_eq!(p.required(PermissionAspect::Access), AuthorizationLevel::None);
        assert_eq!(
            Permissions::all_impossible().required(PermissionAspect::Access),
            AuthorizationLevel::Impossible
        );
    }
}
